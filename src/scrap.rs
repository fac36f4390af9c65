//! # Scraps: Named Persisted Values
//!
//! A [`Scrap`] is one named value captured from notebook execution, together
//! with its persistence metadata. A scrap headed for the wire must carry
//! exactly one of `data` or `reference`, and an `encoder` whenever either is
//! set; these invariants are enforced by the payload schema
//! ([`crate::payload`]), not by this module.
//!
//! Scraps are immutable: all mutation is copy-on-write through the `with_*`
//! methods, each producing a new scrap with one field replaced.
//!
//! [`Scraps`] is the ordered name → scrap mapping a notebook scan produces.
//! Insertion order is first-appearance order; re-inserting a name overwrites
//! the value but keeps the original position.

use indexmap::IndexMap;
use serde_json::Value;

use crate::display::MimeBundle;
use crate::notebook::Output;
use crate::table::Table;

/// The closed universe of in-memory scrap values.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapValue {
    /// Strings, numbers, booleans, lists and mappings.
    Json(Value),
    /// A columnar dataframe value.
    Table(Table),
    /// Raw bytes, the intermediate form between a binary encoder and a store.
    Bytes(Vec<u8>),
    /// A rendered rich-display bundle.
    Media(MimeBundle),
}

impl ScrapValue {
    /// The JSON form of the value, if it has one. Non-JSON variants must be
    /// reduced by an encoder/store before they can enter a payload.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ScrapValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScrapValue::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        self.as_str().is_some()
    }

    /// Default string conversion, used by the text encoder for non-string
    /// inputs.
    pub fn to_text(&self) -> String {
        match self {
            ScrapValue::Json(Value::String(s)) => s.clone(),
            ScrapValue::Json(v) => v.to_string(),
            ScrapValue::Table(t) => t.to_string(),
            ScrapValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            ScrapValue::Media(bundle) => {
                let keys: Vec<&str> = bundle.data.keys().map(String::as_str).collect();
                format!("<display data: {}>", keys.join(", "))
            }
        }
    }
}

impl From<Value> for ScrapValue {
    fn from(value: Value) -> Self {
        ScrapValue::Json(value)
    }
}

impl From<Table> for ScrapValue {
    fn from(table: Table) -> Self {
        ScrapValue::Table(table)
    }
}

impl From<&str> for ScrapValue {
    fn from(s: &str) -> Self {
        ScrapValue::Json(Value::String(s.to_string()))
    }
}

/// One named value plus its persistence metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Scrap {
    pub name: String,
    /// The decoded in-memory value, when embedded.
    pub data: Option<ScrapValue>,
    /// External-store locator, when the bytes live outside the notebook.
    pub reference: Option<String>,
    /// Registered encoder name.
    pub encoder: Option<String>,
    /// Registered store name.
    pub store: Option<String>,
    /// Byte-level sub-encoding marker, possibly a colon-joined chain such as
    /// `"utf-8:base64"`, reversed innermost-last on read.
    pub stored_format: Option<String>,
    /// The raw rich-display output unit associated with this name, if any.
    pub display: Option<Output>,
}

impl Scrap {
    /// A scrap with only its (required) name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
            reference: None,
            encoder: None,
            store: None,
            stored_format: None,
            display: None,
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn with_data(self, data: Option<ScrapValue>) -> Self {
        Self { data, ..self }
    }

    pub fn with_reference(self, reference: Option<String>) -> Self {
        Self { reference, ..self }
    }

    pub fn with_encoder(self, encoder: Option<String>) -> Self {
        Self { encoder, ..self }
    }

    pub fn with_store(self, store: Option<String>) -> Self {
        Self { store, ..self }
    }

    pub fn with_stored_format(self, stored_format: Option<String>) -> Self {
        Self {
            stored_format,
            ..self
        }
    }

    pub fn with_display(self, display: Option<Output>) -> Self {
        Self { display, ..self }
    }

    /// True when the scrap carries persisted content (data or a reference).
    pub fn has_payload(&self) -> bool {
        self.data.is_some() || self.reference.is_some()
    }
}

/// Ordered mapping from scrap name to [`Scrap`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scraps {
    inner: IndexMap<String, Scrap>,
}

impl Scraps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a scrap under its own name. A repeated name overwrites the
    /// stored value but keeps the original position.
    pub fn insert(&mut self, scrap: Scrap) {
        self.inner.insert(scrap.name.clone(), scrap);
    }

    pub fn get(&self, name: &str) -> Option<&Scrap> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scrap)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Absorbs all entries of `other`, last writer winning per name.
    pub fn extend(&mut self, other: Scraps) {
        for (name, scrap) in other.inner {
            self.inner.insert(name, scrap);
        }
    }

    /// The sub-mapping of entries carrying data or a reference.
    pub fn data_scraps(&self) -> IndexMap<&str, &Scrap> {
        self.inner
            .iter()
            .filter(|(_, s)| s.has_payload())
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }

    /// Name → decoded value for every data scrap.
    pub fn data_dict(&self) -> IndexMap<&str, &ScrapValue> {
        self.inner
            .iter()
            .filter_map(|(k, s)| s.data.as_ref().map(|d| (k.as_str(), d)))
            .collect()
    }

    /// The sub-mapping of entries carrying a display output.
    pub fn display_scraps(&self) -> IndexMap<&str, &Scrap> {
        self.inner
            .iter()
            .filter(|(_, s)| s.display.is_some())
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }
}

impl FromIterator<Scrap> for Scraps {
    fn from_iter<T: IntoIterator<Item = Scrap>>(iter: T) -> Self {
        let mut scraps = Scraps::new();
        for scrap in iter {
            scraps.insert(scrap);
        }
        scraps
    }
}

impl IntoIterator for Scraps {
    type Item = (String, Scrap);
    type IntoIter = indexmap::map::IntoIter<String, Scrap>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_field_replaced_leaves_original_untouched() {
        let scrap = Scrap::new("one").with_data(Some(json!(1).into()));
        let renamed = scrap.clone().with_name("two");
        assert_eq!(scrap.name, "one");
        assert_eq!(renamed.name, "two");
        assert_eq!(renamed.data, scrap.data);
    }

    #[test]
    fn test_insert_preserves_first_appearance_order() {
        let mut scraps = Scraps::new();
        scraps.insert(Scrap::new("a"));
        scraps.insert(Scrap::new("b"));
        scraps.insert(Scrap::new("a").with_data(Some(json!(2).into())));
        let names: Vec<&str> = scraps.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(scraps.get("a").unwrap().data.is_some());
    }

    #[test]
    fn test_data_and_display_views() {
        let mut scraps = Scraps::new();
        scraps.insert(Scrap::new("data").with_data(Some(json!({"a": 1}).into())));
        scraps.insert(Scrap::new("ref").with_reference(Some("s3://bucket/key".into())));
        scraps.insert(
            Scrap::new("shown")
                .with_encoder(Some("display".into()))
                .with_display(Some(Output::default())),
        );

        let data: Vec<&str> = scraps.data_scraps().keys().copied().collect();
        assert_eq!(data, vec!["data", "ref"]);
        let displays: Vec<&str> = scraps.display_scraps().keys().copied().collect();
        assert_eq!(displays, vec!["shown"]);
        assert_eq!(scraps.data_dict().len(), 1);
    }

    #[test]
    fn test_to_text_conversion() {
        assert_eq!(ScrapValue::from("plain").to_text(), "plain");
        assert_eq!(ScrapValue::Json(json!([1, 2])).to_text(), "[1,2]");
        assert_eq!(ScrapValue::Bytes(b"abc".to_vec()).to_text(), "abc");
    }
}
