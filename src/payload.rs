//! # Payload Codec
//!
//! Translates between [`Scrap`] values and their versioned wire payload
//! `{name, data?, reference?, encoder?, store?, stored_format?, version}`.
//!
//! Encoding always stamps the latest known version and validates strictly.
//! Decoding validates against the payload's own version, with two escape
//! hatches:
//! - a payload *newer* than this crate knows is loaded best-effort with a
//!   warning instead of failing;
//! - a payload with no version indicator is invalid and fails hard.
//!
//! Per-version upgrade rules run after validation; a version-1 payload with
//! no `store` field predates store selection and implicitly used the
//! embedded `"notebook"` store.

use serde_json::{Map, Value};

use crate::error::{Result, ScrapbookError};
use crate::schema::{payload_schema, LATEST_PAYLOAD_VERSION};
use crate::scrap::{Scrap, ScrapValue};

/// Builds the wire payload for a scrap, dropping absent fields, validating
/// against the latest schema and stamping `version`.
pub fn scrap_to_payload(scrap: &Scrap) -> Result<Value> {
    let mut payload = Map::new();
    payload.insert("name".into(), Value::String(scrap.name.clone()));
    if let Some(data) = &scrap.data {
        let json = data.as_json().ok_or_else(|| {
            ScrapbookError::data_validation(
                &scrap.name,
                "data is not in a JSON-serializable form; encode it first",
                Vec::new(),
            )
        })?;
        payload.insert("data".into(), json.clone());
    }
    if let Some(reference) = &scrap.reference {
        payload.insert("reference".into(), Value::String(reference.clone()));
    }
    if let Some(encoder) = &scrap.encoder {
        payload.insert("encoder".into(), Value::String(encoder.clone()));
    }
    if let Some(store) = &scrap.store {
        payload.insert("store".into(), Value::String(store.clone()));
    }
    if let Some(stored_format) = &scrap.stored_format {
        payload.insert("stored_format".into(), Value::String(stored_format.clone()));
    }
    payload.insert("version".into(), Value::from(LATEST_PAYLOAD_VERSION));

    let payload = Value::Object(payload);
    validate_payload(&payload, LATEST_PAYLOAD_VERSION, &scrap.name)?;
    Ok(payload)
}

/// Parses a wire payload back into a scrap.
pub fn payload_to_scrap(payload: &Value) -> Result<Scrap> {
    let name_hint = payload
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("None")
        .to_string();

    let Some(version) = payload.get("version").and_then(Value::as_u64) else {
        return Err(ScrapbookError::data_validation(
            &name_hint,
            "payload has no version indicator. This scrap is invalid and cannot be loaded",
            Vec::new(),
        ));
    };

    if version > LATEST_PAYLOAD_VERSION {
        log::warn!(
            "scrap payload (name={name_hint}) was saved with a later payload version \
             ({version}) than is known by this version of scrapbook \
             ({LATEST_PAYLOAD_VERSION}). Upgrade scrapbook to ensure data is being \
             loaded as intended"
        );
    } else {
        validate_payload(payload, version, &name_hint)?;
    }

    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ScrapbookError::data_validation(&name_hint, "payload has no name", Vec::new())
        })?;

    let mut scrap = Scrap::new(name)
        .with_data(payload.get("data").cloned().map(ScrapValue::Json))
        .with_reference(string_field(payload, "reference"))
        .with_encoder(string_field(payload, "encoder"))
        .with_store(string_field(payload, "store"))
        .with_stored_format(string_field(payload, "stored_format"));

    // Version-specific upgrade rules.
    if version == 1 && scrap.store.is_none() {
        // Embedded storage was the only option before stores existed.
        scrap = scrap.with_store(Some("notebook".to_string()));
    }

    Ok(scrap)
}

fn string_field(payload: &Value, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(str::to_string)
}

fn validate_payload(payload: &Value, version: u64, name: &str) -> Result<()> {
    let schema = payload_schema(version).ok_or_else(|| {
        ScrapbookError::data_validation(
            name,
            format!("no schema found for payload version {version}"),
            Vec::new(),
        )
    })?;
    if let Err(errors) = schema.validate(payload) {
        let violations: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(ScrapbookError::data_validation(
            name,
            violations.join("; "),
            violations,
        ));
    }
    Ok(())
}
