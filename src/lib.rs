//! # Scrapbook Architecture
//!
//! Scrapbook is a **host-agnostic notebook persistence library**: it saves
//! named values ("scraps") into the outputs of an executing notebook and
//! recovers them from the saved document later. It is not tied to any
//! particular kernel or renderer—the display context is an injected
//! [`OutputSink`], and everything inward of it is plain Rust.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - glue() / read_notebook() / read_notebooks()              │
//! │  - The only surface most callers touch                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Registry (registry.rs)                                     │
//! │  - (encoder, store) handler table, capability probing       │
//! │  - Composes halves when no combined handler matches         │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                    │
//!                    ▼                    ▼
//! ┌──────────────────────────┐ ┌──────────────────────────────┐
//! │  Encoders (encoders.rs)  │ │  Stores (store/)             │
//! │  - value ⇄ wire form     │ │  - where the bytes live:     │
//! │  - text/json/arrow/      │ │    embedded (notebook) or    │
//! │    display               │ │    referenced (ObjectIo)     │
//! └──────────────────────────┘ └──────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Payload Codec (payload.rs, schema.rs)                      │
//! │  - versioned wire payloads, JSON Schema validation          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The read side ([`notebook`], [`scrapbook`]) runs the same machinery in
//! reverse: deserialize the document, scan outputs for recognized payloads,
//! recall-and-decode each one through the registry.
//!
//! ## Key Principle: No Host Assumptions in Core
//!
//! Writes go through the [`OutputSink`] seam and reads come from parsed
//! documents, so the whole crate is exercisable in ordinary tests with
//! [`RecordingSink`] and in-memory notebook nodes—no kernel required.
//!
//! ## Quick Tour
//!
//! ```no_run
//! use scrapbook::{glue, read_notebook, RecordingSink};
//! use serde_json::json;
//!
//! # fn main() -> scrapbook::Result<()> {
//! // During execution: persist a value into the current display context.
//! let mut sink = RecordingSink::new();
//! glue(&mut sink, "accuracy", json!(0.94))?;
//!
//! // Afterwards: recover it from the saved document.
//! let nb = read_notebook("trained.ipynb")?;
//! let accuracy = nb.scraps()?.get("accuracy");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod display;
pub mod encoders;
pub mod error;
pub mod notebook;
pub mod payload;
pub mod registry;
pub mod schema;
pub mod scrap;
pub mod scrapbook;
pub mod store;
pub mod table;

pub use api::{
    glue, glue_with, read_notebook, read_notebook_with, read_notebooks, read_notebooks_with,
    GlueOptions,
};
pub use display::{Emission, MimeBundle, OutputSink, RecordingSink};
pub use encoders::{DisplayEncoder, Encoder, JsonEncoder, TableEncoder, TextEncoder};
pub use error::{Result, ScrapbookError};
pub use notebook::{Cell, Notebook, NotebookNode, Output};
pub use registry::{default_registry, Handler, Registry};
pub use schema::{GLUE_PAYLOAD_PREFIX, LATEST_PAYLOAD_VERSION, RECORD_PAYLOAD_PREFIX};
pub use scrap::{Scrap, ScrapValue, Scraps};
pub use scrapbook::Scrapbook;
pub use store::notebook::NotebookManager;
pub use store::reference::{FsObjectIo, MemoryObjectIo, ObjectIo, ReferenceStore};
pub use store::{Manager, Store};
pub use table::{Column, Datum, Table};
