//! # Top-Level Operations
//!
//! The write side ([`glue`]) persists one named value into the current
//! display context; the read side ([`read_notebook`], [`read_notebooks`])
//! recovers everything previously persisted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::display::{prepare_data_format, prepare_display_format, render_value, OutputSink};
use crate::error::{Result, ScrapbookError};
use crate::notebook::Notebook;
use crate::payload::scrap_to_payload;
use crate::registry::{default_registry, Registry};
use crate::scrap::{Scrap, ScrapValue};
use crate::scrapbook::Scrapbook;

/// Optional knobs for [`glue_with`]. The defaults mean "probe for an
/// encoder, embed in the notebook, display only if the encoder says so".
#[derive(Debug, Clone, Default)]
pub struct GlueOptions {
    /// Encoder name; probed from the value when unset.
    pub encoder: Option<String>,
    /// Store name; probed (reference scheme or embedded) when unset.
    pub store: Option<String>,
    /// External locator, for reference-backed stores.
    pub reference: Option<String>,
    /// Force a rich-display emission on (or off). Unset defers to the
    /// encoder: the `display` encoder renders, everything else persists.
    pub display: Option<bool>,
}

/// Persists `value` under `name` using the built-in handlers.
pub fn glue(sink: &mut dyn OutputSink, name: &str, value: impl Into<ScrapValue>) -> Result<()> {
    glue_with(
        &default_registry(),
        sink,
        name,
        value,
        GlueOptions::default(),
    )
}

/// Persists `value` under `name`, with explicit handler selection.
///
/// When the value matches no encoder but a display was requested, the
/// emission degrades to display-only instead of failing: a renderable value
/// the crate cannot persist is still worth showing.
pub fn glue_with(
    registry: &Registry,
    sink: &mut dyn OutputSink,
    name: &str,
    value: impl Into<ScrapValue>,
    options: GlueOptions,
) -> Result<()> {
    let value = value.into();
    let determined = match &options.encoder {
        Some(encoder) => Ok(encoder.clone()),
        None => registry.determine_encoder_name(&value),
    };
    let encoder = match determined {
        Ok(encoder) => Some(encoder),
        Err(ScrapbookError::NotSupported(_)) if options.display == Some(true) => None,
        Err(err) => return Err(err),
    };
    let wants_display = options
        .display
        .unwrap_or(encoder.as_deref() == Some("display"));

    if let Some(encoder) = encoder.filter(|e| e != "display") {
        let scrap = Scrap::new(name)
            .with_data(Some(value.clone()))
            .with_encoder(Some(encoder))
            .with_store(options.store.clone())
            .with_reference(options.reference.clone());
        match registry.encode(scrap) {
            Ok(encoded) => {
                let encoder_name = encoded.encoder.as_deref().unwrap_or_default().to_string();
                let payload = scrap_to_payload(&encoded)?;
                let (data, metadata) = prepare_data_format(name, payload, &encoder_name);
                sink.display(&data, &metadata)?;
            }
            Err(ScrapbookError::NotSupported(_)) if wants_display => {
                // Renderable but not persistable: degrade to display-only.
            }
            Err(err) => return Err(err),
        }
    }

    if wants_display {
        let bundle = render_value(&value);
        let (data, metadata) = prepare_display_format(name, bundle.data, bundle.metadata);
        sink.display(&data, &metadata)?;
    }
    Ok(())
}

/// Loads one notebook with the built-in handlers.
pub fn read_notebook(path: impl AsRef<Path>) -> Result<Notebook> {
    Notebook::load(path)
}

pub fn read_notebook_with(path: impl AsRef<Path>, registry: Arc<Registry>) -> Result<Notebook> {
    Notebook::load_with(path, registry)
}

/// Loads every `.ipynb` file directly under `dir` into a [`Scrapbook`],
/// keyed by file stem, in lexicographic path order.
pub fn read_notebooks(dir: impl AsRef<Path>) -> Result<Scrapbook> {
    read_notebooks_with(dir, default_registry())
}

pub fn read_notebooks_with(dir: impl AsRef<Path>, registry: Arc<Registry>) -> Result<Scrapbook> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("ipynb"))
        .collect();
    paths.sort();

    let mut book = Scrapbook::new();
    for path in paths {
        let key = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| ScrapbookError::IncompatiblePath(path.display().to_string()))?;
        book.insert(key, Notebook::load_with(&path, registry.clone())?);
    }
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{Emission, MimeBundle, RecordingSink};
    use crate::registry::Registry;
    use serde_json::json;

    #[test]
    fn test_glue_emits_tagged_payload() {
        let mut sink = RecordingSink::new();
        glue(&mut sink, "answer", json!(42)).unwrap();

        let displays = sink.displays();
        assert_eq!(displays.len(), 1);
        let (data, metadata) = displays[0];
        assert_eq!(
            data["application/scrapbook.scrap.json+json"],
            json!({"name": "answer", "data": 42, "encoder": "json", "store": "notebook", "version": 1})
        );
        assert_eq!(
            metadata["scrapbook"],
            json!({"name": "answer", "data": true, "display": false})
        );
    }

    #[test]
    fn test_glue_with_explicit_missing_encoder() {
        let registry = Registry::builtin();
        let mut sink = RecordingSink::new();
        let options = GlueOptions {
            encoder: Some("nope".into()),
            ..Default::default()
        };
        assert!(matches!(
            glue_with(&registry, &mut sink, "x", json!(1), options),
            Err(ScrapbookError::MissingEncoder(name)) if name == "nope"
        ));
        assert!(sink.emissions.is_empty());
    }

    #[test]
    fn test_glue_media_value_renders_display_only() {
        let mut sink = RecordingSink::new();
        let bundle = MimeBundle::single("image/png", json!("deadbeef"));
        glue(&mut sink, "img", ScrapValue::Media(bundle)).unwrap();

        // Display emission only; nothing tried to persist a payload.
        let displays = sink.displays();
        assert_eq!(displays.len(), 1);
        let (data, metadata) = displays[0];
        assert_eq!(data["image/png"], json!("deadbeef"));
        assert_eq!(
            metadata["scrapbook"],
            json!({"name": "img", "data": false, "display": true})
        );
    }

    #[test]
    fn test_glue_data_and_display_when_requested() {
        let mut sink = RecordingSink::new();
        let registry = Registry::builtin();
        let options = GlueOptions {
            display: Some(true),
            ..Default::default()
        };
        glue_with(&registry, &mut sink, "both", json!("hello"), options).unwrap();

        let displays = sink.displays();
        assert_eq!(displays.len(), 2);
        // Data emission first, then the rendered display.
        assert!(displays[0]
            .0
            .contains_key("application/scrapbook.scrap.text+json"));
        assert_eq!(displays[1].0["text/plain"], json!("hello"));
    }

    #[test]
    fn test_glue_unsupported_value_with_display_degrades() {
        let registry = Registry::builtin();
        let mut sink = RecordingSink::new();
        let options = GlueOptions {
            display: Some(true),
            ..Default::default()
        };
        // Null matches no encoder's probe, but an explicit display request
        // still renders it.
        glue_with(&registry, &mut sink, "nul", json!(null), options).unwrap();
        let displays = sink.displays();
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[0].0["text/plain"], json!("null"));
        assert_eq!(
            displays[0].1["scrapbook"],
            json!({"name": "nul", "data": false, "display": true})
        );
    }

    #[test]
    fn test_glue_unsupported_value_without_display_errors() {
        let registry = Registry::builtin();
        let mut sink = RecordingSink::new();
        assert!(matches!(
            glue_with(
                &registry,
                &mut sink,
                "nul",
                json!(null),
                GlueOptions::default()
            ),
            Err(ScrapbookError::NotSupported(_))
        ));
        assert!(sink.emissions.is_empty());
    }

    #[test]
    fn test_read_notebooks_keys_by_stem_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let node = json!({
            "cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5
        });
        for name in ["b.ipynb", "a.ipynb", "notes.txt"] {
            std::fs::write(dir.path().join(name), node.to_string()).unwrap();
        }

        let book = read_notebooks(dir.path()).unwrap();
        let keys: Vec<&str> = book.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_glue_message_free_on_success() {
        let mut sink = RecordingSink::new();
        glue(&mut sink, "s", json!([1, 2, 3])).unwrap();
        assert!(sink
            .emissions
            .iter()
            .all(|e| matches!(e, Emission::Display { .. })));
    }
}
