//! An ordered collection of notebooks, merged-scraps view included.

use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::notebook::Notebook;
use crate::registry::Registry;
use crate::scrap::Scraps;

/// Notebooks keyed by caller-chosen names, in insertion order.
#[derive(Default)]
pub struct Scrapbook {
    notebooks: IndexMap<String, Notebook>,
}

impl Scrapbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a notebook under `key`, replacing any previous entry in place.
    pub fn insert(&mut self, key: impl Into<String>, notebook: Notebook) {
        self.notebooks.insert(key.into(), notebook);
    }

    /// Loads the notebook at `path` and adds it under `key`.
    pub fn insert_path(&mut self, key: impl Into<String>, path: impl AsRef<Path>) -> Result<()> {
        self.insert(key, Notebook::load(path)?);
        Ok(())
    }

    pub fn insert_path_with(
        &mut self,
        key: impl Into<String>,
        path: impl AsRef<Path>,
        registry: Arc<Registry>,
    ) -> Result<()> {
        self.insert(key, Notebook::load_with(path, registry)?);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Notebook> {
        self.notebooks.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.notebooks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.notebooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notebooks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Notebook)> {
        self.notebooks.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn notebooks(&self) -> impl Iterator<Item = &Notebook> {
        self.notebooks.values()
    }

    /// Each notebook's scraps, keyed the way the notebooks are.
    pub fn notebook_scraps(&self) -> Result<IndexMap<&str, &Scraps>> {
        let mut map = IndexMap::new();
        for (key, notebook) in self.iter() {
            map.insert(key, notebook.scraps()?);
        }
        Ok(map)
    }

    /// A single merged view over every notebook's scraps. On name
    /// collisions the scrap from the later-inserted notebook wins.
    pub fn scraps(&self) -> Result<Scraps> {
        let mut merged = Scraps::new();
        for notebook in self.notebooks() {
            merged.extend(notebook.scraps()?.clone());
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::{Cell, NotebookNode, Output};
    use serde_json::{json, Map};

    fn notebook_with_scrap(name: &str, data: serde_json::Value) -> Notebook {
        let output: Output = serde_json::from_value(json!({
            "output_type": "display_data",
            "data": {
                "application/scrapbook.scrap.json+json": {
                    "name": name, "data": data, "encoder": "json", "version": 1
                }
            },
            "metadata": {}
        }))
        .unwrap();
        Notebook::from_node(NotebookNode {
            cells: vec![Cell {
                cell_type: "code".into(),
                metadata: Map::new(),
                execution_count: Some(1),
                outputs: vec![output],
                source: json!(""),
                extra: Map::new(),
            }],
            metadata: Map::new(),
            nbformat: 4,
            nbformat_minor: 5,
        })
    }

    #[test]
    fn test_merged_scraps_later_notebook_wins() {
        let mut book = Scrapbook::new();
        book.insert("first", notebook_with_scrap("x", json!(1)));
        book.insert("second", notebook_with_scrap("x", json!(2)));

        let merged = book.scraps().unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("x").unwrap().data, Some(json!(2).into()));
    }

    #[test]
    fn test_notebook_scraps_keeps_notebook_keys() {
        let mut book = Scrapbook::new();
        book.insert("a", notebook_with_scrap("one", json!([1])));
        book.insert("b", notebook_with_scrap("two", json!([2])));

        let per_notebook = book.notebook_scraps().unwrap();
        let keys: Vec<&str> = per_notebook.keys().copied().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(per_notebook["a"].contains("one"));
        assert!(per_notebook["b"].contains("two"));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut book = Scrapbook::new();
        book.insert("a", notebook_with_scrap("one", json!(1)));
        book.insert("b", notebook_with_scrap("two", json!(2)));
        book.insert("a", notebook_with_scrap("three", json!(3)));

        let keys: Vec<&str> = book.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(book.get("a").unwrap().scraps().unwrap().contains("three"));
    }
}
