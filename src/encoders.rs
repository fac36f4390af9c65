//! # Encoders
//!
//! An [`Encoder`] converts a scrap's in-memory value to a storable form and
//! back. Encoders never decide *where* bytes live; that is the store's job
//! ([`crate::store`]). The built-ins:
//!
//! | name | claims | encode |
//! |---|---|---|
//! | `text` | JSON strings | stringify non-strings, track `stored_format` |
//! | `json` | any JSON value | parse string data (failures propagate) |
//! | `display` | media bundles | marker only, never invoked |
//! | `arrow` | [`Table`] values | columnar binary serialization |
//!
//! Probing order is decided by the registry, not here; see
//! [`crate::registry`] for the priority rules.

use serde_json::Value;

use crate::error::{Result, ScrapbookError};
use crate::scrap::{Scrap, ScrapValue};
use crate::table::Table;

/// A named strategy converting a value to/from a storable representation.
///
/// `encode`/`decode` take the scrap by value and return a new one: scraps
/// are immutable and every transform is copy-on-write.
pub trait Encoder: Send + Sync {
    /// Registered name; also the media-key segment for this encoder's data.
    fn name(&self) -> &str;

    /// Capability probe: can this encoder handle the given value?
    fn encodable(&self, value: &ScrapValue) -> bool;

    /// Translate in-memory data into its storable form.
    fn encode(&self, scrap: Scrap) -> Result<Scrap>;

    /// Reverse of [`Encoder::encode`].
    fn decode(&self, scrap: Scrap) -> Result<Scrap>;
}

/// Plain-text encoder. Byte-level sub-encodings are tracked through
/// `stored_format`; only `unicode` (no transform) and `utf-8` are supported.
pub struct TextEncoder;

impl TextEncoder {
    pub const NAME: &'static str = "text";
}

impl Encoder for TextEncoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn encodable(&self, value: &ScrapValue) -> bool {
        value.is_string()
    }

    fn encode(&self, scrap: Scrap) -> Result<Scrap> {
        let Some(data) = &scrap.data else {
            return Err(ScrapbookError::data_validation(
                &scrap.name,
                "text encoder requires data",
                Vec::new(),
            ));
        };
        let mut scrap = if data.is_string() {
            scrap
        } else {
            let text = data.to_text();
            scrap.with_data(Some(ScrapValue::Json(Value::String(text))))
        };

        match scrap.stored_format.as_deref() {
            None => {
                scrap = scrap.with_stored_format(Some("unicode".to_string()));
            }
            Some("unicode") => {}
            Some("utf-8") => {
                // Explicitly requested byte form.
                if let Some(text) = scrap.data.as_ref().and_then(ScrapValue::as_str) {
                    let bytes = text.as_bytes().to_vec();
                    scrap = scrap.with_data(Some(ScrapValue::Bytes(bytes)));
                }
            }
            Some(other) => {
                return Err(ScrapbookError::NotSupported(format!(
                    "text encoding '{other}' is not supported"
                )));
            }
        }
        Ok(scrap)
    }

    fn decode(&self, scrap: Scrap) -> Result<Scrap> {
        let mut scrap = scrap;
        if scrap.stored_format.as_deref() == Some("utf-8") {
            if let Some(ScrapValue::Bytes(bytes)) = scrap.data.clone() {
                let name = scrap.name.clone();
                let text = String::from_utf8(bytes).map_err(|e| {
                    ScrapbookError::data_validation(name, e.to_string(), Vec::new())
                })?;
                scrap = scrap.with_data(Some(ScrapValue::Json(Value::String(text))));
            }
        }
        // Just in case a non-string somehow got saved under the text encoder.
        if let Some(data) = &scrap.data {
            if !data.is_string() {
                let text = data.to_text();
                scrap = scrap.with_data(Some(ScrapValue::Json(Value::String(text))));
            }
        }
        Ok(scrap)
    }
}

/// JSON encoder. String data is parsed on encode (a caller asking for JSON
/// with a non-JSON string is a real error) but passed through unchanged on a
/// decode-side parse failure, since historical notebooks hold plain strings
/// under this encoder.
///
/// Probing declines strings so that untyped glues of plain text route to
/// the text encoder; JSON-in-a-string must be asked for by name.
pub struct JsonEncoder;

impl JsonEncoder {
    pub const NAME: &'static str = "json";
}

impl Encoder for JsonEncoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn encodable(&self, value: &ScrapValue) -> bool {
        matches!(value, ScrapValue::Json(v) if !v.is_null() && !v.is_string())
    }

    fn encode(&self, scrap: Scrap) -> Result<Scrap> {
        if let Some(text) = scrap.data.as_ref().and_then(ScrapValue::as_str) {
            let parsed: Value = serde_json::from_str(text)?;
            return Ok(scrap.with_data(Some(ScrapValue::Json(parsed))));
        }
        Ok(scrap)
    }

    fn decode(&self, scrap: Scrap) -> Result<Scrap> {
        if let Some(text) = scrap.data.as_ref().and_then(ScrapValue::as_str) {
            if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                return Ok(scrap.with_data(Some(ScrapValue::Json(parsed))));
            }
            // An actual string, not a JSON string: leave it alone.
        }
        Ok(scrap)
    }
}

/// Marker encoder for display-only scraps: "skip persistence, only render".
/// The transform methods must never run.
pub struct DisplayEncoder;

impl DisplayEncoder {
    pub const NAME: &'static str = "display";
}

impl Encoder for DisplayEncoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn encodable(&self, value: &ScrapValue) -> bool {
        matches!(value, ScrapValue::Media(_))
    }

    fn encode(&self, _scrap: Scrap) -> Result<Scrap> {
        Err(ScrapbookError::Internal(
            "the display encoder does not transform data",
        ))
    }

    fn decode(&self, _scrap: Scrap) -> Result<Scrap> {
        Err(ScrapbookError::Internal(
            "the display encoder does not transform data",
        ))
    }
}

/// Columnar table encoder, registered as `arrow` for media-key compatibility
/// with the original record convention. Serializes the table column-by-column
/// to bytes; base64 wrapping for embedded storage is the store's concern.
pub struct TableEncoder;

impl TableEncoder {
    pub const NAME: &'static str = "arrow";
}

impl Encoder for TableEncoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn encodable(&self, value: &ScrapValue) -> bool {
        matches!(value, ScrapValue::Table(_))
    }

    fn encode(&self, scrap: Scrap) -> Result<Scrap> {
        match &scrap.data {
            Some(ScrapValue::Table(table)) => {
                let bytes = table.to_bytes()?;
                Ok(scrap.with_data(Some(ScrapValue::Bytes(bytes))))
            }
            Some(ScrapValue::Bytes(_)) => Ok(scrap),
            _ => Err(ScrapbookError::data_validation(
                &scrap.name,
                "the arrow encoder requires a table value",
                Vec::new(),
            )),
        }
    }

    fn decode(&self, scrap: Scrap) -> Result<Scrap> {
        match &scrap.data {
            Some(ScrapValue::Bytes(bytes)) => {
                let table = Table::from_bytes(bytes)?;
                Ok(scrap.with_data(Some(ScrapValue::Table(table))))
            }
            Some(ScrapValue::Table(_)) => Ok(scrap),
            _ => Err(ScrapbookError::data_validation(
                &scrap.name,
                "the arrow encoder requires binary data to decode",
                Vec::new(),
            )),
        }
    }
}
