//! # Payload Schemas and Media-Type Keys
//!
//! The wire payload of a scrap is versioned independently of the crate
//! version so that old notebooks remain loadable by newer code (and newer
//! payloads degrade to a warning rather than a crash, see
//! [`crate::payload`]). Each known version has a JSON Schema, compiled once.

use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// Newest payload version this crate knows how to write and validate.
pub const LATEST_PAYLOAD_VERSION: u64 = 1;

/// Media-type prefix for data-carrying outputs written by this crate.
pub const GLUE_PAYLOAD_PREFIX: &str = "application/scrapbook.scrap";

/// Media-type prefix of the legacy papermill record convention
/// (read-only compatibility).
pub const RECORD_PAYLOAD_PREFIX: &str = "application/papermill.record";

/// Full media-type key for a data payload written with the given encoder.
pub fn glue_media_key(encoder: &str) -> String {
    format!("{GLUE_PAYLOAD_PREFIX}.{encoder}+json")
}

static SCHEMA_V1: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "scrapbook payload v1",
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "data": {},
            "reference": { "type": "string" },
            "encoder": { "type": "string" },
            "store": { "type": "string" },
            "stored_format": { "type": "string" },
            "version": { "type": "integer" }
        },
        "required": ["name", "version"],
        "additionalProperties": false,
        // data and reference are mutually exclusive, and either one
        // requires an encoder to reverse it on read
        "not": { "required": ["data", "reference"] },
        "dependencies": {
            "data": ["encoder"],
            "reference": ["encoder"]
        },
        "allOf": [
            {
                "if": {
                    "properties": { "encoder": { "const": "text" } },
                    "required": ["encoder", "data"]
                },
                "then": {
                    "properties": { "data": { "type": "string" } }
                }
            }
        ]
    })
});

static COMPILED_V1: Lazy<JSONSchema> =
    Lazy::new(|| JSONSchema::compile(&SCHEMA_V1).expect("builtin payload schema v1 compiles"));

/// The compiled schema for an exact payload version, if known.
pub fn payload_schema(version: u64) -> Option<&'static JSONSchema> {
    match version {
        1 => Some(&COMPILED_V1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_version_has_a_schema() {
        assert!(payload_schema(LATEST_PAYLOAD_VERSION).is_some());
        assert!(payload_schema(LATEST_PAYLOAD_VERSION + 1).is_none());
        assert!(payload_schema(0).is_none());
    }

    #[test]
    fn test_schema_accepts_minimal_payload() {
        let schema = payload_schema(1).unwrap();
        assert!(schema.is_valid(&json!({"name": "n", "version": 1})));
    }

    #[test]
    fn test_schema_rejects_data_and_reference_together() {
        let schema = payload_schema(1).unwrap();
        let payload = json!({
            "name": "n",
            "data": 1,
            "reference": "s3://x",
            "encoder": "json",
            "version": 1
        });
        assert!(!schema.is_valid(&payload));
    }

    #[test]
    fn test_schema_requires_encoder_with_data() {
        let schema = payload_schema(1).unwrap();
        assert!(!schema.is_valid(&json!({"name": "n", "data": [1], "version": 1})));
    }

    #[test]
    fn test_schema_constrains_text_encoder_data_shape() {
        let schema = payload_schema(1).unwrap();
        assert!(!schema.is_valid(
            &json!({"name": "n", "data": [1, 2], "encoder": "text", "version": 1})
        ));
        assert!(schema.is_valid(
            &json!({"name": "n", "data": "ok", "encoder": "text", "version": 1})
        ));
    }

    #[test]
    fn test_media_key_formatting() {
        assert_eq!(glue_media_key("json"), "application/scrapbook.scrap.json+json");
    }
}
