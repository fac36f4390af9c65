use scrapbook::{
    glue, glue_with, read_notebook, read_notebooks, Emission, GlueOptions, RecordingSink,
    ScrapValue, ScrapbookError,
};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

/// Builds an executed-notebook document whose single code cell carries one
/// output unit per recorded display emission.
fn notebook_json(sink: &RecordingSink) -> Value {
    let outputs: Vec<Value> = sink
        .emissions
        .iter()
        .filter_map(|e| match e {
            Emission::Display { data, metadata } => Some(json!({
                "output_type": "display_data",
                "data": data,
                "metadata": metadata,
            })),
            Emission::Message(_) => None,
        })
        .collect();
    json!({
        "cells": [{
            "cell_type": "code",
            "metadata": {},
            "execution_count": 1,
            "outputs": outputs,
            "source": "",
        }],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5,
    })
}

fn write_notebook(dir: &TempDir, name: &str, sink: &RecordingSink) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, notebook_json(sink).to_string()).unwrap();
    path
}

#[test]
fn test_glue_then_read_recovers_values() {
    let mut sink = RecordingSink::new();
    glue(&mut sink, "accuracy", json!(0.94)).unwrap();
    glue(&mut sink, "sizes", json!([10, 20, 30])).unwrap();
    glue(&mut sink, "note", "all good").unwrap();

    let dir = TempDir::new().unwrap();
    let path = write_notebook(&dir, "run.ipynb", &sink);

    let nb = read_notebook(&path).unwrap();
    let scraps = nb.scraps().unwrap();
    assert_eq!(scraps.len(), 3);

    let names: Vec<&str> = scraps.names().collect();
    assert_eq!(names, vec!["accuracy", "sizes", "note"]);

    assert_eq!(scraps.get("accuracy").unwrap().data, Some(json!(0.94).into()));
    assert_eq!(
        scraps.get("sizes").unwrap().data,
        Some(json!([10, 20, 30]).into())
    );
    let note = scraps.get("note").unwrap();
    assert_eq!(note.data.as_ref().unwrap().as_str(), Some("all good"));
    assert_eq!(note.encoder.as_deref(), Some("text"));
}

#[test]
fn test_reference_backed_scrap_roundtrips_through_file() {
    let dir = TempDir::new().unwrap();
    let reference = format!("file://{}", dir.path().join("model.json").display());

    let registry = scrapbook::default_registry();
    let mut sink = RecordingSink::new();
    let options = GlueOptions {
        reference: Some(reference.clone()),
        ..Default::default()
    };
    glue_with(&registry, &mut sink, "model", json!({"layers": 3}), options).unwrap();

    // The payload on the wire carries only the locator.
    let displays = sink.displays();
    let payload = &displays[0].0["application/scrapbook.scrap.json+json"];
    assert_eq!(payload["reference"], json!(reference));
    assert!(payload.get("data").is_none());

    let path = write_notebook(&dir, "ref.ipynb", &sink);
    let nb = read_notebook(&path).unwrap();
    let scrap = nb.scraps().unwrap().get("model").unwrap();
    assert_eq!(scrap.data, Some(json!({"layers": 3}).into()));
    assert_eq!(scrap.store.as_deref(), Some("file"));
}

#[test]
fn test_legacy_record_convention_is_readable() {
    let dir = TempDir::new().unwrap();
    let node = json!({
        "cells": [{
            "cell_type": "code",
            "metadata": {},
            "execution_count": 1,
            "outputs": [{
                "output_type": "display_data",
                "data": {"application/papermill.record+json": {"myname": {"a": 1}}},
                "metadata": {},
            }],
            "source": "",
        }],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5,
    });
    let path = dir.path().join("legacy.ipynb");
    std::fs::write(&path, node.to_string()).unwrap();

    let nb = read_notebook(&path).unwrap();
    let scrap = nb.scraps().unwrap().get("myname").unwrap();
    assert_eq!(scrap.data, Some(json!({"a": 1}).into()));
    assert_eq!(scrap.encoder.as_deref(), Some("json"));
    assert_eq!(scrap.store.as_deref(), Some("notebook"));
}

#[test]
fn test_newer_payload_version_loads_best_effort() {
    let dir = TempDir::new().unwrap();
    let node = json!({
        "cells": [{
            "cell_type": "code",
            "metadata": {},
            "execution_count": 1,
            "outputs": [{
                "output_type": "display_data",
                "data": {
                    "application/scrapbook.scrap.json+json": {
                        "name": "future", "data": [1], "encoder": "json", "version": 99
                    }
                },
                "metadata": {},
            }],
            "source": "",
        }],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5,
    });
    let path = dir.path().join("future.ipynb");
    std::fs::write(&path, node.to_string()).unwrap();

    let nb = read_notebook(&path).unwrap();
    let scrap = nb.scraps().unwrap().get("future").unwrap();
    assert_eq!(scrap.data, Some(json!([1]).into()));
}

#[test]
fn test_unknown_encoder_fails_the_scan() {
    let dir = TempDir::new().unwrap();
    let node = json!({
        "cells": [{
            "cell_type": "code",
            "metadata": {},
            "execution_count": 1,
            "outputs": [{
                "output_type": "display_data",
                "data": {
                    "application/scrapbook.scrap.custom+json": {
                        "name": "x", "data": 1, "encoder": "custom", "version": 1
                    }
                },
                "metadata": {},
            }],
            "source": "",
        }],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5,
    });
    let path = dir.path().join("unknown.ipynb");
    std::fs::write(&path, node.to_string()).unwrap();

    let nb = read_notebook(&path).unwrap();
    assert!(matches!(
        nb.scraps(),
        Err(ScrapbookError::MissingEncoder(name)) if name == "custom"
    ));
}

#[test]
fn test_display_glue_roundtrips_as_display_scrap() {
    let mut sink = RecordingSink::new();
    let mut data = Map::new();
    data.insert("image/png".to_string(), json!("iVBORw0KGgo="));
    let bundle = scrapbook::MimeBundle {
        data,
        metadata: Map::new(),
    };
    glue(&mut sink, "img", ScrapValue::Media(bundle)).unwrap();

    let dir = TempDir::new().unwrap();
    let path = write_notebook(&dir, "display.ipynb", &sink);

    let nb = read_notebook(&path).unwrap();
    let scraps = nb.scraps().unwrap();
    let scrap = scraps.get("img").unwrap();
    assert!(scrap.data.is_none());
    assert_eq!(scrap.encoder.as_deref(), Some("display"));
    let display = scrap.display.as_ref().unwrap();
    assert_eq!(display.data["image/png"], json!("iVBORw0KGgo="));
    assert_eq!(scraps.display_scraps().len(), 1);
    assert!(scraps.data_scraps().is_empty());
}

#[test]
fn test_read_notebooks_merges_last_writer_wins() {
    let dir = TempDir::new().unwrap();

    let mut first = RecordingSink::new();
    glue(&mut first, "shared", json!("from a")).unwrap();
    glue(&mut first, "only_a", json!(1)).unwrap();
    write_notebook(&dir, "a.ipynb", &first);

    let mut second = RecordingSink::new();
    glue(&mut second, "shared", json!("from b")).unwrap();
    write_notebook(&dir, "b.ipynb", &second);

    let book = read_notebooks(dir.path()).unwrap();
    assert_eq!(book.len(), 2);

    let merged = book.scraps().unwrap();
    assert_eq!(
        merged.get("shared").unwrap().data.as_ref().unwrap().as_str(),
        Some("from b")
    );
    assert!(merged.contains("only_a"));

    let per_notebook = book.notebook_scraps().unwrap();
    assert_eq!(
        per_notebook["a"]
            .get("shared")
            .unwrap()
            .data
            .as_ref()
            .unwrap()
            .as_str(),
        Some("from a")
    );
}
