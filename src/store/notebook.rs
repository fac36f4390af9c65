//! Embedded storage: scrap content lives inside the notebook output unit.
//!
//! [`NotebookManager`] is both an encoder (identity over JSON-native values,
//! registered as `json`) and a store (registered as `notebook`). Binary
//! content is base64-wrapped for embedding, tagged through the
//! `stored_format` chain so the wrap is reversed on read.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

use crate::encoders::Encoder;
use crate::error::{Result, ScrapbookError};
use crate::scrap::{Scrap, ScrapValue};
use crate::store::{append_stored_format, stored_as, strip_stored_format, Store};

/// Manages data saved directly in notebook outputs.
pub struct NotebookManager;

impl NotebookManager {
    pub const STORE_NAME: &'static str = "notebook";
    /// As a combined handler this manager answers for plain JSON content.
    pub const ENCODER_NAME: &'static str = "json";
}

impl Encoder for NotebookManager {
    fn name(&self) -> &str {
        Self::ENCODER_NAME
    }

    fn encodable(&self, value: &ScrapValue) -> bool {
        // Only the common embedded shapes; anything else routes through a
        // stand-alone encoder first.
        matches!(
            value,
            ScrapValue::Json(Value::String(_))
                | ScrapValue::Json(Value::Array(_))
                | ScrapValue::Json(Value::Object(_))
        )
    }

    fn encode(&self, scrap: Scrap) -> Result<Scrap> {
        Ok(scrap)
    }

    fn decode(&self, scrap: Scrap) -> Result<Scrap> {
        Ok(scrap)
    }
}

impl Store for NotebookManager {
    fn name(&self) -> &str {
        Self::STORE_NAME
    }

    fn storable(&self, scrap: &Scrap) -> bool {
        // A reference means the content lives elsewhere; embedding does not
        // apply, so probing must fall through to a reference store.
        scrap.reference.is_none()
    }

    fn persist(&self, scrap: Scrap) -> Result<Scrap> {
        if let Some(ScrapValue::Bytes(bytes)) = &scrap.data {
            let encoded = BASE64.encode(bytes);
            let scrap = scrap.with_data(Some(ScrapValue::Json(Value::String(encoded))));
            return Ok(append_stored_format(scrap, "base64"));
        }
        Ok(scrap)
    }

    fn recall(&self, scrap: Scrap) -> Result<Scrap> {
        if stored_as(&scrap, "base64") {
            let Some(text) = scrap.data.as_ref().and_then(ScrapValue::as_str) else {
                return Err(ScrapbookError::data_validation(
                    &scrap.name,
                    "base64-tagged data is not a string",
                    Vec::new(),
                ));
            };
            let bytes = BASE64.decode(text).map_err(|e| {
                ScrapbookError::data_validation(&scrap.name, e.to_string(), Vec::new())
            })?;
            let scrap = scrap.with_data(Some(ScrapValue::Bytes(bytes)));
            return Ok(strip_stored_format(scrap, "base64"));
        }
        Ok(scrap)
    }
}
