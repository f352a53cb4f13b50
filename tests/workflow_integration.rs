mod common;

use std::sync::Arc;
use tempfile::tempdir;
use zendocs::contract::{DocStatus, MockTextGenerator, TextGenerator};
use zendocs::generate::FAILURE_MARKER;
use zendocs::workflow::Workflow;
use zendocs::ZenError;

use common::{entry_count, fast_config, write_zip, zip_bytes, zip_raw};

fn generator_failing_on(marker: &'static str) -> Arc<dyn TextGenerator> {
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().returning(move |prompt| {
        if prompt.contains(marker) {
            Err("Request failed with status code 429".into())
        } else {
            Ok(Some("## Purpose\n\nDoes things.".to_string()))
        }
    });
    Arc::new(generator)
}

/// One failing and one succeeding file still produce a stored document with
/// both sections, and the non-source file is ignored.
#[tokio::test]
async fn test_partial_failure_still_produces_document() {
    let data = tempdir().unwrap();
    let workflow = Workflow::new(fast_config(data.path()), Some(generator_failing_on("alpha")));
    let zip = zip_bytes(&[
        ("a.js", "const alpha = 1;"),
        ("b.ts", "export const beta = 2;"),
        ("c.txt", "notes"),
    ]);

    let report = workflow
        .generate_from_upload("project.zip", &zip)
        .await
        .expect("generation should succeed");

    assert_eq!(report.processed_files(), 2);
    assert_eq!(report.successful_files(), 1);

    let a = report.entries.iter().find(|e| e.file_name == "a.js").unwrap();
    assert_eq!(a.status, DocStatus::Error);
    assert!(a.summary.starts_with(FAILURE_MARKER));
    assert!(a.summary.contains("429"));

    let b = report.entries.iter().find(|e| e.file_name == "b.ts").unwrap();
    assert_eq!(b.status, DocStatus::Success);
    assert!(report.documentation.contains("## a.js"));
    assert!(report.documentation.contains("## b.ts"));
    assert!(!report.documentation.contains("c.txt"));

    let stored = workflow.documents().load(&report.document).await.unwrap();
    assert_eq!(stored, report.documentation);

    // Upload and working tree are gone, only the document remains.
    assert_eq!(entry_count(&workflow.config().uploads_dir()), 0);
    assert_eq!(entry_count(&workflow.config().parsed_code_dir()), 0);
    assert_eq!(entry_count(&workflow.config().generated_docs_dir()), 1);
}

/// A Latin-1 comment does not keep a file from being documented.
#[tokio::test]
async fn test_non_utf8_source_is_still_documented() {
    let data = tempdir().unwrap();
    let workflow = Workflow::new(fast_config(data.path()), Some(generator_failing_on("never")));
    let zip = zip_raw(&[
        ("a.js", &b"// caf\xe9\nconst a = 1;"[..]),
        ("b.js", &b"const b = 2;"[..]),
    ]);

    let report = workflow
        .generate_from_upload("project.zip", &zip)
        .await
        .expect("generation should succeed");

    assert_eq!(report.processed_files(), 2);
    assert_eq!(report.successful_files(), 2);
}

#[tokio::test]
async fn test_nested_files_are_discovered() {
    let data = tempdir().unwrap();
    let workflow = Workflow::new(fast_config(data.path()), Some(generator_failing_on("never")));
    let zip = zip_bytes(&[
        ("src/lib/util.js", "module.exports = {};"),
        ("src/index.ts", "import './lib/util';"),
        ("README.md", "# hi"),
    ]);

    let report = workflow.generate_from_upload("p.zip", &zip).await.unwrap();

    assert_eq!(report.processed_files(), 2);
    assert_eq!(report.successful_files(), 2);
    let util = report.entries.iter().find(|e| e.file_name == "util.js").unwrap();
    assert!(util.full_path.ends_with("src/lib/util.js"));
}

/// No source files means no generation calls and no stored document.
#[tokio::test]
async fn test_no_matching_files_is_rejected() {
    let data = tempdir().unwrap();
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().times(0);
    let workflow = Workflow::new(fast_config(data.path()), Some(Arc::new(generator)));
    let zip = zip_bytes(&[("README.md", "# nothing"), ("data.json", "{}")]);

    let err = workflow
        .generate_from_upload("p.zip", &zip)
        .await
        .expect_err("expected rejection");

    assert!(matches!(err, ZenError::NoMatchingFiles { .. }));
    assert!(err.is_client_error());
    assert_eq!(entry_count(&workflow.config().generated_docs_dir()), 0);
    assert_eq!(entry_count(&workflow.config().uploads_dir()), 0);
    assert_eq!(entry_count(&workflow.config().parsed_code_dir()), 0);
}

/// Without a generation key nothing is written at all.
#[tokio::test]
async fn test_missing_generator_fails_fast() {
    let data = tempdir().unwrap();
    let workflow = Workflow::new(fast_config(data.path()), None);
    let zip = zip_bytes(&[("a.js", "x")]);

    let err = workflow.generate_from_upload("p.zip", &zip).await.unwrap_err();

    assert!(matches!(err, ZenError::MissingConfig("OPENROUTER_API_KEY")));
    assert!(!workflow.config().uploads_dir().exists());
    assert!(!workflow.config().generated_docs_dir().exists());
}

#[tokio::test]
async fn test_corrupt_archive_is_a_client_error() {
    let data = tempdir().unwrap();
    let workflow = Workflow::new(fast_config(data.path()), Some(generator_failing_on("never")));

    let err = workflow
        .generate_from_upload("p.zip", b"definitely not a zip")
        .await
        .unwrap_err();

    assert!(matches!(err, ZenError::Archive { .. }));
    assert!(err.is_client_error());
    assert_eq!(entry_count(&workflow.config().uploads_dir()), 0);
}

/// The archive given to `generate_from_archive` belongs to the caller and is
/// left in place.
#[tokio::test]
async fn test_generate_from_local_archive() {
    let data = tempdir().unwrap();
    let src = tempdir().unwrap();
    let archive = write_zip(src.path(), "project.zip", &[("main.js", "console.log(1)")]);
    let workflow = Workflow::new(fast_config(data.path()), Some(generator_failing_on("never")));

    let report = workflow.generate_from_archive(&archive).await.unwrap();

    assert_eq!(report.entries.len(), 1);
    assert!(report.document.starts_with("docs-"));
    assert!(report.document.ends_with(".md"));
    assert!(archive.exists());
}

#[tokio::test]
async fn test_documents_have_distinct_names() {
    let data = tempdir().unwrap();
    let workflow = Workflow::new(fast_config(data.path()), Some(generator_failing_on("never")));
    let zip = zip_bytes(&[("a.js", "x")]);

    let first = workflow.generate_from_upload("p.zip", &zip).await.unwrap();
    let second = workflow.generate_from_upload("p.zip", &zip).await.unwrap();

    assert_ne!(first.document, second.document);
    assert_eq!(entry_count(&workflow.config().generated_docs_dir()), 2);
}
