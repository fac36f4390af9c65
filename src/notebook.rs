//! # Notebook Reading
//!
//! Deserializes executed notebook documents, scans their outputs for
//! persisted scraps, and re-emits scraps into a live display context
//! ([`Notebook::reglue`]).
//!
//! ## Scanning
//!
//! Every output unit of every cell is inspected exactly once, in document
//! order. An output can contribute a *data* scrap (a payload under a
//! recognized media-type key), a *display* scrap (an output whose metadata
//! names a scrap), or both. Unrecognized outputs are skipped silently; an
//! output that *is* recognized but whose payload is malformed fails the
//! whole scan, since silently dropping named data would corrupt downstream
//! results.
//!
//! Both the current `scrapbook` convention and the legacy `papermill` record
//! convention are understood. Scan results are memoized per notebook
//! instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::display::{
    prepare_data_format, prepare_display_format, strip_scrapbook_metadata, OutputSink,
};
use crate::error::{Result, ScrapbookError};
use crate::payload::{payload_to_scrap, scrap_to_payload};
use crate::registry::{default_registry, Registry};
use crate::schema::{GLUE_PAYLOAD_PREFIX, RECORD_PAYLOAD_PREFIX};
use crate::scrap::{Scrap, ScrapValue, Scraps};
use crate::store::notebook::NotebookManager;

/// One output unit of an executed cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub output_type: String,
    /// Media-type key to payload.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Fields this crate does not interpret (text, name, traceback, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One notebook cell. `source` keeps nbformat's string-or-list-of-strings
/// shape verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub source: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The raw nbformat document model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookNode {
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub nbformat: u64,
    #[serde(default)]
    pub nbformat_minor: u64,
}

/// An executed notebook plus lazily-scanned scrap state.
pub struct Notebook {
    node: NotebookNode,
    path: Option<PathBuf>,
    registry: Arc<Registry>,
    scraps: OnceCell<Scraps>,
    scrap_outputs: OnceCell<Vec<Output>>,
}

impl Notebook {
    /// Loads a notebook from an `.ipynb` file using the built-in handlers.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, default_registry())
    }

    /// Loads a notebook from an `.ipynb` file with an explicit registry.
    pub fn load_with(path: impl AsRef<Path>, registry: Arc<Registry>) -> Result<Self> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some("ipynb") {
            return Err(ScrapbookError::IncompatiblePath(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let node: NotebookNode = serde_json::from_str(&raw)?;
        let mut notebook = Self::from_node_with(node, registry);
        notebook.path = Some(path.to_path_buf());
        Ok(notebook)
    }

    /// Wraps an already-parsed document using the built-in handlers.
    pub fn from_node(node: NotebookNode) -> Self {
        Self::from_node_with(node, default_registry())
    }

    pub fn from_node_with(node: NotebookNode, registry: Arc<Registry>) -> Self {
        Self {
            node,
            path: None,
            registry,
            scraps: OnceCell::new(),
            scrap_outputs: OnceCell::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn filename(&self) -> Option<&str> {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
    }

    pub fn directory(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    pub fn node(&self) -> &NotebookNode {
        &self.node
    }

    pub fn cells(&self) -> &[Cell] {
        &self.node.cells
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.node.metadata
    }

    /// The parameters this notebook was executed with, when a parameterized
    /// runner recorded them in document metadata.
    pub fn parameters(&self) -> Map<String, Value> {
        self.node
            .metadata
            .get("papermill")
            .and_then(|p| p.get("parameters"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Per cell, its execution count. None for cells a kernel never ran,
    /// markdown cells included.
    pub fn execution_counts(&self) -> Vec<Option<u64>> {
        self.node
            .cells
            .iter()
            .map(|c| c.execution_count.filter(|&n| n != 0))
            .collect()
    }

    /// Per cell, its recorded execution duration in seconds. Cells a timing
    /// runner never saw report 0.0.
    pub fn cell_timing(&self) -> Vec<f64> {
        self.node
            .cells
            .iter()
            .map(|c| {
                c.metadata
                    .get("papermill")
                    .and_then(|p| p.get("duration"))
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// All scraps persisted in this notebook, in first-appearance order.
    /// Scanned once, memoized.
    pub fn scraps(&self) -> Result<&Scraps> {
        self.scraps.get_or_try_init(|| self.scan())
    }

    /// The raw output units recognized as scrap-bearing, in document order.
    pub fn scrap_outputs(&self) -> &[Output] {
        self.scrap_outputs.get_or_init(|| {
            self.outputs()
                .filter(|output| {
                    output.metadata.contains_key("scrapbook")
                        || output.metadata.contains_key("papermill")
                        || output.data.keys().any(|key| {
                            key.starts_with(GLUE_PAYLOAD_PREFIX)
                                || key.starts_with(RECORD_PAYLOAD_PREFIX)
                        })
                })
                .cloned()
                .collect()
        })
    }

    fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.node.cells.iter().flat_map(|c| c.outputs.iter())
    }

    fn scan(&self) -> Result<Scraps> {
        let mut scraps = Scraps::new();
        for output in self.outputs() {
            let data_scrap = self.extract_data_scrap(output)?;
            let display_name = extract_display_name(&output.metadata);

            // A display pairs with a data scrap only when both come from
            // this same output unit. Either way the result overwrites any
            // earlier scrap under the same name wholesale, so a later
            // display-only output supersedes a prior data scrap.
            match (data_scrap, display_name) {
                (Some(scrap), Some(name)) if name == scrap.name => {
                    scraps.insert(scrap.with_display(Some(output.clone())));
                }
                (data_scrap, display_name) => {
                    if let Some(scrap) = data_scrap {
                        scraps.insert(scrap);
                    }
                    if let Some(name) = display_name {
                        scraps.insert(
                            Scrap::new(name)
                                .with_encoder(Some("display".to_string()))
                                .with_store(Some(NotebookManager::STORE_NAME.to_string()))
                                .with_display(Some(output.clone())),
                        );
                    }
                }
            }
        }
        Ok(scraps)
    }

    /// Tries each data-payload convention against the output; the legacy
    /// record convention wins when an output somehow carries both. At most
    /// one data scrap is extracted per output.
    fn extract_data_scrap(&self, output: &Output) -> Result<Option<Scrap>> {
        for (key, payload) in &output.data {
            if let Some(tail) = key.strip_prefix(RECORD_PAYLOAD_PREFIX) {
                return Ok(Some(self.decode_record(tail, payload)?));
            }
        }
        for (key, payload) in &output.data {
            if key.starts_with(GLUE_PAYLOAD_PREFIX) {
                let scrap = payload_to_scrap(payload)?;
                return Ok(Some(self.registry.decode(scrap)?));
            }
        }
        Ok(None)
    }

    /// Legacy convention: the key carries the encoder (`...record+json`) and
    /// the payload is a single-entry `{name: value}` mapping.
    fn decode_record(&self, key_tail: &str, payload: &Value) -> Result<Scrap> {
        let encoder = key_tail.strip_prefix('+').unwrap_or(key_tail);
        let entry = payload
            .as_object()
            .filter(|map| map.len() == 1)
            .and_then(|map| map.iter().next());
        let Some((name, value)) = entry else {
            return Err(ScrapbookError::data_validation(
                "None",
                "record payload is not a single-entry name mapping",
                Vec::new(),
            ));
        };
        let scrap = Scrap::new(name)
            .with_data(Some(ScrapValue::Json(value.clone())))
            .with_encoder(Some(encoder.to_string()))
            .with_store(Some(NotebookManager::STORE_NAME.to_string()));
        self.registry.decode(scrap)
    }

    /// Re-emits a persisted scrap into a live display context, data payload
    /// first, then its rich display if one was captured.
    ///
    /// `unattached` re-emits the display without any scrap-identifying
    /// metadata, so the copy is not itself picked up by a later scan.
    pub fn reglue(
        &self,
        sink: &mut dyn OutputSink,
        name: &str,
        new_name: Option<&str>,
        raise_on_missing: bool,
        unattached: bool,
    ) -> Result<()> {
        let Some(scrap) = self.scraps()?.get(name) else {
            if raise_on_missing {
                return Err(ScrapbookError::ScrapNotFound(name.to_string()));
            }
            return sink.message(&format!(
                "No scrap found with name '{name}' in this notebook"
            ));
        };
        let scrap = match new_name {
            Some(new_name) => scrap.clone().with_name(new_name),
            None => scrap.clone(),
        };

        if scrap.has_payload() {
            let encoder = scrap.encoder.as_deref().ok_or_else(|| {
                ScrapbookError::data_validation(
                    &scrap.name,
                    "scrap has a payload but no encoder",
                    Vec::new(),
                )
            })?;
            let payload = scrap_to_payload(&scrap)?;
            let (data, metadata) = prepare_data_format(&scrap.name, payload, encoder);
            if unattached {
                sink.display(&data, &Map::new())?;
            } else {
                sink.display(&data, &metadata)?;
            }
        }
        if let Some(output) = &scrap.display {
            let stripped = strip_scrapbook_metadata(&output.metadata);
            if unattached {
                sink.display(&output.data, &stripped)?;
            } else {
                let (data, metadata) =
                    prepare_display_format(&scrap.name, output.data.clone(), stripped);
                sink.display(&data, &metadata)?;
            }
        }
        Ok(())
    }
}

/// Reads the scrap name an output's metadata points at, if any. The current
/// namespace wins over the legacy one and must explicitly flag itself as a
/// display; the legacy namespace only ever tagged displays, so a name alone
/// suffices there.
fn extract_display_name(metadata: &Map<String, Value>) -> Option<String> {
    if let Some(tag) = metadata.get("scrapbook") {
        let is_display = tag.get("display").and_then(Value::as_bool).unwrap_or(false);
        let name = tag.get("name").and_then(Value::as_str).unwrap_or("");
        if is_display && !name.is_empty() {
            return Some(name.to_string());
        }
        if tag.get("name").is_some() {
            // Tagged by this crate but not a display (e.g. a data output);
            // never fall through to the legacy namespace.
            return None;
        }
    }
    metadata
        .get("papermill")
        .and_then(|tag| tag.get("name"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
