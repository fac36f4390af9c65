//! # Emission Seam
//!
//! All writes into the host rendering context go through the [`OutputSink`]
//! trait: an opaque, fire-and-forget, order-preserving "attach an output
//! unit to the current cell" operation. The sequence of emissions is part of
//! the observable contract, which is what [`RecordingSink`] exists to
//! assert on.
//!
//! This module also owns the small amount of formatting shared by the write
//! path ([`crate::api::glue`]) and re-emission ([`crate::notebook::Notebook::reglue`]):
//! pairing a payload with its media-type key and tagging emissions with the
//! `scrapbook` metadata namespace.

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::schema::glue_media_key;
use crate::scrap::ScrapValue;

/// A rendered rich-display bundle: media-type key → payload, plus metadata.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct MimeBundle {
    pub data: Map<String, Value>,
    pub metadata: Map<String, Value>,
}

impl MimeBundle {
    /// A bundle holding a single media-type entry.
    pub fn single(media_type: impl Into<String>, payload: Value) -> Self {
        let mut data = Map::new();
        data.insert(media_type.into(), payload);
        Self {
            data,
            metadata: Map::new(),
        }
    }
}

/// Host display environment, consumed as an opaque collaborator.
///
/// Implementations must preserve call order; emissions are fire-and-forget.
pub trait OutputSink {
    /// Emit one output unit with a media-typed payload mapping and metadata.
    fn display(&mut self, data: &Map<String, Value>, metadata: &Map<String, Value>) -> Result<()>;

    /// Emit an informational message (used for non-raising misses).
    fn message(&mut self, text: &str) -> Result<()>;
}

/// One captured emission, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Display {
        data: Map<String, Value>,
        metadata: Map<String, Value>,
    },
    Message(String),
}

/// In-memory sink capturing every emission for exact-order assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub emissions: Vec<Emission>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the display emissions, in order.
    pub fn displays(&self) -> Vec<(&Map<String, Value>, &Map<String, Value>)> {
        self.emissions
            .iter()
            .filter_map(|e| match e {
                Emission::Display { data, metadata } => Some((data, metadata)),
                Emission::Message(_) => None,
            })
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn display(&mut self, data: &Map<String, Value>, metadata: &Map<String, Value>) -> Result<()> {
        self.emissions.push(Emission::Display {
            data: data.clone(),
            metadata: metadata.clone(),
        });
        Ok(())
    }

    fn message(&mut self, text: &str) -> Result<()> {
        self.emissions.push(Emission::Message(text.to_string()));
        Ok(())
    }
}

/// Renders a value into a display bundle. Media bundles pass through
/// verbatim; everything else renders as `text/plain`.
pub fn render_value(value: &ScrapValue) -> MimeBundle {
    match value {
        ScrapValue::Media(bundle) => bundle.clone(),
        other => MimeBundle::single("text/plain", Value::String(other.to_text())),
    }
}

/// Pairs a data payload with its media-type key and the data-tagging
/// metadata namespace.
pub(crate) fn prepare_data_format(
    name: &str,
    payload: Value,
    encoder: &str,
) -> (Map<String, Value>, Map<String, Value>) {
    let mut data = Map::new();
    data.insert(glue_media_key(encoder), payload);
    let mut metadata = Map::new();
    metadata.insert(
        "scrapbook".into(),
        json!({"name": name, "data": true, "display": false}),
    );
    (data, metadata)
}

/// Tags a rendered bundle with the display-tagging metadata namespace.
pub(crate) fn prepare_display_format(
    name: &str,
    data: Map<String, Value>,
    mut metadata: Map<String, Value>,
) -> (Map<String, Value>, Map<String, Value>) {
    metadata.insert(
        "scrapbook".into(),
        json!({"name": name, "data": false, "display": true}),
    );
    (data, metadata)
}

/// Removes the scrap-identifying namespaces (current and legacy) so a
/// re-emitted output is not itself mistaken for a persisted scrap.
pub(crate) fn strip_scrapbook_metadata(metadata: &Map<String, Value>) -> Map<String, Value> {
    let mut copied = metadata.clone();
    copied.remove("scrapbook");
    copied.remove("papermill");
    copied
}
