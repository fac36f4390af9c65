//! # Handler Registry
//!
//! The registry maps `(encoder name, store name)` pairs to handlers and
//! drives every encode/decode round. Three handler shapes coexist:
//! combined [`Manager`]s that do both halves, encoder-only entries, and
//! store-only entries. When no combined handler matches a scrap, the
//! registry composes an encoder half with a store half on the fly.
//!
//! Lookup by name is exact. Capability probing (no name on the scrap, or a
//! registered-but-unnamed half) walks insertion order in reverse, so the
//! most recently registered handler wins. Registering over an existing
//! `(encoder, store)` key replaces that entry in place.

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::encoders::{DisplayEncoder, Encoder, JsonEncoder, TableEncoder, TextEncoder};
use crate::error::{Result, ScrapbookError};
use crate::payload::scrap_to_payload;
use crate::scrap::{Scrap, ScrapValue};
use crate::store::notebook::NotebookManager;
use crate::store::reference::{FsObjectIo, ReferenceStore};
use crate::store::{Manager, Store};

/// A registered handler: a combined manager or a single half.
#[derive(Clone)]
pub enum Handler {
    Combined(Arc<dyn Manager>),
    EncoderOnly(Arc<dyn Encoder>),
    StoreOnly(Arc<dyn Store>),
}

impl Handler {
    fn encoder(&self) -> Option<&dyn Encoder> {
        match self {
            Handler::Combined(m) => Some(m.as_ref() as &dyn Encoder),
            Handler::EncoderOnly(e) => Some(e.as_ref()),
            Handler::StoreOnly(_) => None,
        }
    }

    fn store(&self) -> Option<&dyn Store> {
        match self {
            Handler::Combined(m) => Some(m.as_ref() as &dyn Store),
            Handler::StoreOnly(s) => Some(s.as_ref()),
            Handler::EncoderOnly(_) => None,
        }
    }
}

type HandlerKey = (Option<String>, Option<String>);

/// Registry of encode/store handlers keyed by `(encoder name, store name)`.
#[derive(Default)]
pub struct Registry {
    handlers: IndexMap<HandlerKey, Handler>,
}

impl Registry {
    /// An empty registry with no handlers at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with every built-in handler.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let notebook = Arc::new(NotebookManager);
        registry.register_manager(notebook.clone());
        registry.register_store(notebook);
        registry.register_encoder(Arc::new(TextEncoder));
        registry.register_encoder(Arc::new(JsonEncoder));
        registry.register_encoder(Arc::new(DisplayEncoder));
        registry.register_encoder(Arc::new(TableEncoder));
        registry.register_store(Arc::new(ReferenceStore::new(
            "file",
            Arc::new(FsObjectIo),
        )));
        registry
    }

    /// Registers a combined handler under both of its names.
    pub fn register_manager(&mut self, manager: Arc<dyn Manager>) {
        let key = (
            Some(Encoder::name(manager.as_ref()).to_string()),
            Some(Store::name(manager.as_ref()).to_string()),
        );
        self.handlers.insert(key, Handler::Combined(manager));
    }

    /// Registers an encoder half under `(name, None)`.
    pub fn register_encoder(&mut self, encoder: Arc<dyn Encoder>) {
        let key = (Some(encoder.name().to_string()), None);
        self.handlers.insert(key, Handler::EncoderOnly(encoder));
    }

    /// Registers a store half under `(None, name)`.
    pub fn register_store(&mut self, store: Arc<dyn Store>) {
        let key = (None, Some(store.name().to_string()));
        self.handlers.insert(key, Handler::StoreOnly(store));
    }

    /// Removes the handler at exactly this key, preserving the relative
    /// order of the remaining handlers.
    pub fn deregister(&mut self, encoder: Option<&str>, store: Option<&str>) {
        let key = (encoder.map(str::to_string), store.map(str::to_string));
        self.handlers.shift_remove(&key);
    }

    /// Drops every handler.
    pub fn reset(&mut self) {
        self.handlers.clear();
    }

    fn probe_reverse(&self) -> impl Iterator<Item = (&HandlerKey, &Handler)> {
        self.handlers.iter().rev()
    }

    /// Probes (most recent first) for any encoder half that claims the
    /// value, returning its registered name.
    pub fn determine_encoder_name(&self, value: &ScrapValue) -> Result<String> {
        for (_, handler) in self.probe_reverse() {
            if let Some(encoder) = handler.encoder() {
                if encoder.encodable(value) {
                    return Ok(encoder.name().to_string());
                }
            }
        }
        Err(ScrapbookError::NotSupported(
            "value matches no registered encoder".to_string(),
        ))
    }

    /// Finds a combined handler matching both of the scrap's names.
    ///
    /// With both names set this is an exact key lookup; otherwise handlers
    /// are probed most-recent-first against the scrap's capabilities.
    pub fn find_manager(&self, scrap: &Scrap) -> Option<&dyn Manager> {
        if let (Some(enc), Some(store)) = (&scrap.encoder, &scrap.store) {
            let key = (Some(enc.clone()), Some(store.clone()));
            return match self.handlers.get(&key) {
                Some(Handler::Combined(m)) => Some(m.as_ref()),
                _ => None,
            };
        }
        for (_, handler) in self.probe_reverse() {
            if let Handler::Combined(m) = handler {
                let encoder_matches = match &scrap.encoder {
                    Some(name) => Encoder::name(m.as_ref()) == name,
                    None => scrap
                        .data
                        .as_ref()
                        .is_some_and(|v| m.encodable(v)),
                };
                let store_matches = match &scrap.store {
                    Some(name) => Store::name(m.as_ref()) == name,
                    None => m.storable(scrap),
                };
                if encoder_matches && store_matches {
                    return Some(m.as_ref());
                }
            }
        }
        None
    }

    /// Finds an encoder half for the scrap, by name when set, otherwise by
    /// probing `encodable` most-recent-first.
    pub fn find_encoder(&self, scrap: &Scrap) -> Option<&dyn Encoder> {
        for (_, handler) in self.probe_reverse() {
            if let Some(encoder) = handler.encoder() {
                let matches = match &scrap.encoder {
                    Some(name) => encoder.name() == name,
                    None => scrap
                        .data
                        .as_ref()
                        .is_some_and(|v| encoder.encodable(v)),
                };
                if matches {
                    return Some(encoder);
                }
            }
        }
        None
    }

    /// Finds a store half for the scrap, by name when set, otherwise by
    /// probing `storable` most-recent-first.
    pub fn find_store(&self, scrap: &Scrap) -> Option<&dyn Store> {
        for (_, handler) in self.probe_reverse() {
            if let Some(store) = handler.store() {
                let matches = match &scrap.store {
                    Some(name) => store.name() == name,
                    None => store.storable(scrap),
                };
                if matches {
                    return Some(store);
                }
            }
        }
        None
    }

    fn fetch_encoder_and_store(&self, scrap: &Scrap) -> Result<(&dyn Encoder, &dyn Store)> {
        let encoder = self.find_encoder(scrap).ok_or_else(|| {
            ScrapbookError::MissingEncoder(
                scrap.encoder.clone().unwrap_or_else(|| "None".to_string()),
            )
        })?;
        let store = self.find_store(scrap).ok_or_else(|| {
            ScrapbookError::MissingStore {
                store: scrap.store.clone().unwrap_or_else(|| "None".to_string()),
                reference: scrap
                    .reference
                    .clone()
                    .unwrap_or_else(|| "None".to_string()),
            }
        })?;
        Ok((encoder, store))
    }

    /// Encodes and persists a scrap, stamping the handler names it used.
    ///
    /// The result is re-validated against the payload schema before it is
    /// returned, so a misbehaving handler cannot leak an unwritable scrap.
    pub fn encode(&self, scrap: Scrap) -> Result<Scrap> {
        let encoded = match self.find_manager(&scrap) {
            Some(manager) => {
                let scrap = scrap
                    .with_encoder(Some(Encoder::name(manager).to_string()))
                    .with_store(Some(Store::name(manager).to_string()));
                manager.encode_and_persist(scrap)?
            }
            None => {
                let (encoder, store) = self.fetch_encoder_and_store(&scrap)?;
                let scrap = scrap
                    .with_encoder(Some(encoder.name().to_string()))
                    .with_store(Some(store.name().to_string()));
                store.persist(encoder.encode(scrap)?)?
            }
        };
        scrap_to_payload(&encoded)?;
        Ok(encoded)
    }

    /// Recalls and decodes a scrap read back from a notebook, stamping the
    /// handler names it resolved to.
    ///
    /// The incoming scrap is validated up front so a corrupted payload
    /// fails before any handler runs.
    pub fn decode(&self, scrap: Scrap) -> Result<Scrap> {
        scrap_to_payload(&scrap)?;
        match self.find_manager(&scrap) {
            Some(manager) => {
                let scrap = scrap
                    .with_encoder(Some(Encoder::name(manager).to_string()))
                    .with_store(Some(Store::name(manager).to_string()));
                manager.recall_and_decode(scrap)
            }
            None => {
                let (encoder, store) = self.fetch_encoder_and_store(&scrap)?;
                let scrap = scrap
                    .with_encoder(Some(encoder.name().to_string()))
                    .with_store(Some(store.name().to_string()));
                encoder.decode(store.recall(scrap)?)
            }
        }
    }
}

static DEFAULT: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::builtin()));

/// The process-wide registry holding the built-in handlers.
pub fn default_registry() -> Arc<Registry> {
    DEFAULT.clone()
}
