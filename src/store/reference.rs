//! External reference storage.
//!
//! [`ReferenceStore`] keeps a scrap's content outside the notebook, leaving
//! only a `reference` locator in the payload. The actual byte transport is
//! behind the [`ObjectIo`] seam: resolving remote locators (object stores,
//! buckets) belongs to the host environment, so this crate ships a local
//! filesystem implementation and an in-memory one for tests, and callers
//! wire their own for anything remote.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{Result, ScrapbookError};
use crate::scrap::{Scrap, ScrapValue};
use crate::store::{append_stored_format, stored_as, strip_stored_format, Store};

/// Blocking byte-level I/O against an external object location.
pub trait ObjectIo: Send + Sync {
    /// Read the full contents at `reference`. No streaming.
    fn read(&self, reference: &str) -> Result<Vec<u8>>;

    /// Write `bytes` to `reference`, replacing any existing object.
    fn write(&self, reference: &str, bytes: &[u8]) -> Result<()>;
}

/// Resolves references against the local filesystem. A `file://` prefix is
/// accepted and stripped; anything else is taken as a plain path.
pub struct FsObjectIo;

fn as_path(reference: &str) -> &Path {
    Path::new(reference.strip_prefix("file://").unwrap_or(reference))
}

impl ObjectIo for FsObjectIo {
    fn read(&self, reference: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(as_path(reference))?)
    }

    fn write(&self, reference: &str, bytes: &[u8]) -> Result<()> {
        let path = as_path(reference);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(std::fs::write(path, bytes)?)
    }
}

/// In-memory object store for testing reference flows without I/O.
#[derive(Default)]
pub struct MemoryObjectIo {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.lock().contains_key(reference)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ObjectIo for MemoryObjectIo {
    fn read(&self, reference: &str) -> Result<Vec<u8>> {
        self.lock().get(reference).cloned().ok_or_else(|| {
            ScrapbookError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no object at '{reference}'"),
            ))
        })
    }

    fn write(&self, reference: &str, bytes: &[u8]) -> Result<()> {
        self.lock().insert(reference.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// A store keyed by a URI scheme prefix on the scrap's `reference`.
///
/// Text content is written as UTF-8; binary content is written raw and the
/// scrap tagged `binary` through the `stored_format` chain.
pub struct ReferenceStore {
    scheme: String,
    io: Arc<dyn ObjectIo>,
}

impl ReferenceStore {
    pub fn new(scheme: impl Into<String>, io: Arc<dyn ObjectIo>) -> Self {
        Self {
            scheme: scheme.into(),
            io,
        }
    }
}

impl Store for ReferenceStore {
    fn name(&self) -> &str {
        &self.scheme
    }

    fn storable(&self, scrap: &Scrap) -> bool {
        scrap
            .reference
            .as_deref()
            .is_some_and(|r| r.starts_with(&self.scheme))
    }

    fn persist(&self, scrap: Scrap) -> Result<Scrap> {
        let Some(reference) = scrap.reference.clone() else {
            return Err(ScrapbookError::data_validation(
                &scrap.name,
                format!("store \"{}\" requires a reference", self.scheme),
                Vec::new(),
            ));
        };
        let scrap = match &scrap.data {
            Some(ScrapValue::Bytes(bytes)) => {
                self.io.write(&reference, bytes)?;
                append_stored_format(scrap, "binary")
            }
            Some(ScrapValue::Json(value)) => {
                let text = match value.as_str() {
                    Some(s) => s.to_string(),
                    None => value.to_string(),
                };
                self.io.write(&reference, text.as_bytes())?;
                scrap
            }
            Some(_) => {
                return Err(ScrapbookError::data_validation(
                    &scrap.name,
                    "content must be encoded to bytes or JSON before external storage",
                    Vec::new(),
                ));
            }
            None => scrap,
        };
        Ok(scrap.with_data(None))
    }

    fn recall(&self, scrap: Scrap) -> Result<Scrap> {
        let Some(reference) = scrap.reference.clone() else {
            return Err(ScrapbookError::MissingStore {
                store: self.scheme.clone(),
                reference: "None".to_string(),
            });
        };
        let bytes = self.io.read(&reference)?;
        if stored_as(&scrap, "binary") {
            let scrap = scrap.with_data(Some(ScrapValue::Bytes(bytes)));
            Ok(strip_stored_format(scrap, "binary"))
        } else {
            let name = scrap.name.clone();
            let text = String::from_utf8(bytes)
                .map_err(|e| ScrapbookError::data_validation(name, e.to_string(), Vec::new()))?;
            Ok(scrap.with_data(Some(ScrapValue::Json(serde_json::Value::String(text)))))
        }
    }
}
