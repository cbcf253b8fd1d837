//! End-to-end benchmark passes over generated PDFs.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfbench_core::extract::{CommandEngine, LopdfEngine};
use pdfbench_core::{
    run_benchmark, BenchError, BenchmarkRequest, Engine, NullProgress, RecordStatus, Similarity,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write a one-page PDF showing `text`.
fn write_pdf(path: &Path, text: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn request(input_dir: &Path, output_root: &Path) -> BenchmarkRequest {
    BenchmarkRequest {
        input_dir: input_dir.to_path_buf(),
        output_root: output_root.to_path_buf(),
        run_context: Some("generated".to_string()),
        summary_dir: "summary".to_string(),
        similarity: Similarity::default(),
    }
}

#[test]
fn test_failures_and_skips_do_not_stop_the_pass() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("corpus");
    fs::create_dir_all(&input).unwrap();
    write_pdf(&input.join("hello.pdf"), "Hello World");
    fs::write(input.join("broken.pdf"), b"this is not a pdf").unwrap();

    let engines = vec![
        Engine::Lopdf(LopdfEngine),
        Engine::Command(CommandEngine::new("missing", "pdfbench-no-such-program-xyz")),
    ];
    let output = tmp.path().join("out");
    let pass = run_benchmark(&request(&input, &output), &engines, &NullProgress).unwrap();

    // broken.pdf sorts first
    assert_eq!(pass.records.len(), 4);
    let broken = pass.records[0].raw();
    assert_eq!(broken.document_id, "broken.pdf");
    assert_eq!(broken.status, RecordStatus::Error);
    assert!(!broken.error_message.is_empty());
    assert!(!broken.error_message.contains('\n'));
    assert_eq!(pass.records[0].coverage_pct(), 0.0);
    assert_eq!(pass.records[0].consensus_pct(), 0.0);

    let skipped = pass.records[1].raw();
    assert_eq!(skipped.status, RecordStatus::Skipped);
    assert!(skipped.error_message.is_empty());

    let hello = &pass.records[2];
    assert_eq!(hello.raw().document_id, "hello.pdf");
    assert_eq!(hello.raw().status, RecordStatus::Ok);
    assert_eq!(hello.raw().page_count, 1);
    // Only peer is skipped
    assert_eq!(hello.consensus_pct(), 0.0);

    let export = output.join("lopdf").join("generated");
    assert!(export.join("hello").join("texts").join("hello.txt").exists());
    assert!(!export.join("broken").exists());
    assert!(output.join("missing").join("generated").join("benchmark_results.csv").exists());
}

#[test]
fn test_builtin_engines_run_on_a_simple_pdf() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("corpus");
    fs::create_dir_all(&input).unwrap();
    write_pdf(&input.join("hello.pdf"), "Hello World");

    let output = tmp.path().join("out");
    let pass = run_benchmark(&request(&input, &output), &Engine::builtin(), &NullProgress).unwrap();

    assert_eq!(pass.records.len(), 2);
    for record in &pass.records {
        assert!(record.coverage_pct() >= 0.0 && record.coverage_pct() <= 100.0);
        assert!(record.consensus_pct() >= 0.0 && record.consensus_pct() <= 100.0);
        assert_ne!(record.raw().status, RecordStatus::Skipped);
    }
}

#[test]
fn test_rerun_replaces_stale_artifacts() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("corpus");
    fs::create_dir_all(&input).unwrap();
    write_pdf(&input.join("hello.pdf"), "Hello");

    let output = tmp.path().join("out");
    let stale = output
        .join("lopdf")
        .join("generated")
        .join("hello")
        .join("tables")
        .join("hello_p9_t1.md");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "old").unwrap();

    let engines = vec![Engine::Lopdf(LopdfEngine)];
    run_benchmark(&request(&input, &output), &engines, &NullProgress).unwrap();
    assert!(!stale.exists());
}

#[test]
fn test_empty_corpus_is_a_setup_error() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("corpus");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("readme.txt"), "no pdfs here").unwrap();

    let output = tmp.path().join("out");
    let result = run_benchmark(&request(&input, &output), &Engine::builtin(), &NullProgress);
    assert!(matches!(result, Err(BenchError::NoDocuments(_))));
    assert!(!output.exists());
}
