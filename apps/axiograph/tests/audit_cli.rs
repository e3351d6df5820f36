//! # CLI Integration Tests
//!
//! Drives the command implementations against real files in temporary
//! directories: snapshot in, corpus in, report and exit code out.

use axiograph::cli::{collect_documents, extract_corpus, run_audit};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SNAPSHOT: &str = r#"
[[formula]]
id = "einstein_energy"
category = "established"
display_variants = ["$$E = mc^2$$", "E = mc^2"]

[[formula]]
id = "relativistic_energy"
category = "derived"
display_variants = ["$$E^2 = (pc)^2 + (mc^2)^2$$"]
parent_formula_ids = ["einstein_energy"]
derivation_steps = ["Generalize to nonzero momentum"]
"#;

fn write_file(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, contents).expect("write");
}

fn setup(corpus_files: &[(&str, &str)]) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let database = dir.path().join("formulas.toml");
    fs::write(&database, SNAPSHOT).expect("write snapshot");

    let corpus = dir.path().join("docs");
    fs::create_dir_all(&corpus).expect("mkdir corpus");
    for (name, contents) in corpus_files {
        write_file(&corpus, name, contents);
    }
    (dir, database, corpus)
}

// =============================================================================
// CORPUS DISCOVERY
// =============================================================================

#[test]
fn discovery_is_recursive_sorted_and_filtered() {
    let (_dir, _database, corpus) = setup(&[
        ("zeta.md", "$z$"),
        ("sub/alpha.html", "<p>$a$</p>"),
        ("notes.txt", "$n$"),
        ("ignored.png", "binary"),
        ("also_ignored.rs", "fn main() {}"),
    ]);

    let documents = collect_documents(&corpus).expect("collect");
    let ids: Vec<&str> = documents.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["notes.txt", "sub/alpha.html", "zeta.md"]);
}

#[test]
fn missing_corpus_directory_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let result = collect_documents(&dir.path().join("nowhere"));
    assert!(result.is_err());
}

// =============================================================================
// PARALLEL EXTRACTION
// =============================================================================

#[test]
fn fan_out_preserves_corpus_order() {
    let documents: Vec<(String, String)> = (0..32)
        .map(|i| (format!("doc{i:02}.md"), format!("$eq_{i}$\n")))
        .collect();

    let (occurrences, warnings) = extract_corpus(&documents);
    assert!(warnings.is_empty());
    assert_eq!(occurrences.len(), 32);
    for (i, occurrence) in occurrences.iter().enumerate() {
        assert_eq!(occurrence.document_id, format!("doc{i:02}.md"));
    }
}

#[test]
fn fan_out_matches_sequential_extraction() {
    let documents: Vec<(String, String)> = vec![
        ("a.md".to_string(), "# One\n$$x = 1$$\nbroken $\n".to_string()),
        ("b.md".to_string(), "$y = 2$ and \\(z = 3\\)\n".to_string()),
    ];

    let (parallel_occ, parallel_warn) = extract_corpus(&documents);

    let mut sequential_occ = Vec::new();
    let mut sequential_warn = Vec::new();
    for (id, text) in &documents {
        let outcome = axiograph_core::extract_document(id, text);
        sequential_occ.extend(outcome.occurrences);
        sequential_warn.extend(outcome.warnings);
    }

    assert_eq!(parallel_occ, sequential_occ);
    assert_eq!(parallel_warn, sequential_warn);
}

// =============================================================================
// END-TO-END AUDIT
// =============================================================================

#[test]
fn audit_reconciles_matched_and_source_only() {
    let (_dir, database, corpus) = setup(&[(
        "energy.md",
        "# Mass-Energy\n$$E = mc^2$$\n$S = k \\ln W$\n",
    )]);

    let report = run_audit(&database, &corpus).expect("audit");
    assert_eq!(report.counts.documents, 1);
    assert_eq!(report.counts.matched, 1);
    assert_eq!(report.counts.source_only, 1);
    assert_eq!(report.counts.target_only, 1);
    assert!(!report.has_structural_violations());
    assert_eq!(report.exit_code(false), 0);
    assert_eq!(report.exit_code(true), 1);
}

#[test]
fn audit_runs_are_byte_identical() {
    let (_dir, database, corpus) = setup(&[
        ("a.md", "$$E = mc^2$$\n"),
        ("b/nested.md", "## Deep\n$q = r$\n"),
    ]);

    let first = run_audit(&database, &corpus).expect("first audit");
    let second = run_audit(&database, &corpus).expect("second audit");
    assert_eq!(
        first.to_json().expect("json"),
        second.to_json().expect("json")
    );
    assert_eq!(first.checksum, second.checksum);
}

#[test]
fn missing_snapshot_is_an_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let corpus = dir.path().join("docs");
    fs::create_dir_all(&corpus).expect("mkdir");

    let result = run_audit(&dir.path().join("absent.toml"), &corpus);
    assert!(result.is_err());
}

#[test]
fn empty_corpus_still_produces_a_full_report() {
    let (_dir, database, corpus) = setup(&[]);

    let report = run_audit(&database, &corpus).expect("audit");
    assert_eq!(report.counts.documents, 0);
    assert_eq!(report.counts.occurrences, 0);
    // every formula is target-only when nothing was scanned
    assert_eq!(report.counts.target_only, 2);
    assert_eq!(report.exit_code(false), 0);
}
