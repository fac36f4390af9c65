//! # Storage Layer
//!
//! A [`Store`] decides where a scrap's encoded bytes physically live:
//! embedded in the notebook output itself ([`notebook::NotebookManager`]) or
//! behind an external reference resolved through an object-I/O seam
//! ([`reference::ReferenceStore`]).
//!
//! ## stored_format chains
//!
//! Stores that wrap bytes for transport (base64 for embedding, raw binary
//! for external objects) record the wrap by appending a tag to the scrap's
//! `stored_format`, colon-joined: a utf-8 text scrap embedded in a notebook
//! ends up as `"utf-8:base64"`. Each reversal strips exactly its own
//! trailing tag, so unwinding happens innermost-last and partial strips
//! never cascade.

use crate::encoders::Encoder;
use crate::error::Result;
use crate::scrap::Scrap;

pub mod notebook;
pub mod reference;

/// A named strategy for where encoded scrap bytes live.
pub trait Store: Send + Sync {
    /// Registered name; matched against `Scrap::store`.
    fn name(&self) -> &str;

    /// Capability probe: can this store persist/recall the given scrap?
    fn storable(&self, scrap: &Scrap) -> bool;

    /// Move the scrap's encoded content into storage, returning the scrap in
    /// its wire-ready form.
    fn persist(&self, scrap: Scrap) -> Result<Scrap>;

    /// Reverse of [`Store::persist`]: bring the stored content back into the
    /// scrap's `data`.
    fn recall(&self, scrap: Scrap) -> Result<Scrap>;
}

/// A combined handler that both encodes and stores.
///
/// Blanket-implemented for anything that is both an [`Encoder`] and a
/// [`Store`]; the composition order is fixed (encode-then-persist,
/// recall-then-decode).
pub trait Manager: Encoder + Store {
    fn encode_and_persist(&self, scrap: Scrap) -> Result<Scrap> {
        self.persist(self.encode(scrap)?)
    }

    fn recall_and_decode(&self, scrap: Scrap) -> Result<Scrap> {
        self.decode(self.recall(scrap)?)
    }
}

impl<T: Encoder + Store + ?Sized> Manager for T {}

/// True when the scrap's `stored_format` chain ends with the given tag.
pub fn stored_as(scrap: &Scrap, format: &str) -> bool {
    scrap
        .stored_format
        .as_deref()
        .is_some_and(|f| f == format || f.ends_with(&format!(":{format}")))
}

/// Appends a wrapping tag to the `stored_format` chain.
pub fn append_stored_format(scrap: Scrap, format: &str) -> Scrap {
    let chained = match &scrap.stored_format {
        Some(existing) => format!("{existing}:{format}"),
        None => format.to_string(),
    };
    scrap.with_stored_format(Some(chained))
}

/// Strips the trailing tag from the `stored_format` chain, if present.
pub fn strip_stored_format(scrap: Scrap, format: &str) -> Scrap {
    let Some(existing) = scrap.stored_format.clone() else {
        return scrap;
    };
    if let Some(rest) = existing.strip_suffix(&format!(":{format}")) {
        scrap.with_stored_format(Some(rest.to_string()))
    } else if existing == format {
        scrap.with_stored_format(None)
    } else {
        scrap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_format_chain_append_and_strip() {
        let scrap = Scrap::new("s").with_stored_format(Some("utf-8".into()));
        let wrapped = append_stored_format(scrap, "base64");
        assert_eq!(wrapped.stored_format.as_deref(), Some("utf-8:base64"));
        assert!(stored_as(&wrapped, "base64"));
        assert!(!stored_as(&wrapped, "utf-8"));

        let unwrapped = strip_stored_format(wrapped, "base64");
        assert_eq!(unwrapped.stored_format.as_deref(), Some("utf-8"));
        assert!(stored_as(&unwrapped, "utf-8"));
    }

    #[test]
    fn test_single_tag_strips_to_none() {
        let scrap = append_stored_format(Scrap::new("s"), "base64");
        assert_eq!(scrap.stored_format.as_deref(), Some("base64"));
        let stripped = strip_stored_format(scrap, "base64");
        assert!(stripped.stored_format.is_none());
    }

    #[test]
    fn test_strip_ignores_non_matching_tag() {
        let scrap = Scrap::new("s").with_stored_format(Some("utf-8".into()));
        let unchanged = strip_stored_format(scrap, "base64");
        assert_eq!(unchanged.stored_format.as_deref(), Some("utf-8"));
    }
}
