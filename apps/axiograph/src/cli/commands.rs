//! # CLI Command Implementations
//!
//! File I/O, corpus walking and worker fan-out around the pure engine.

use crate::cli::OutputFormat;
use axiograph_core::{
    AuditError, AuditReport, EquationOccurrence, ExtractionOutcome, ExtractionWarning,
    extract_document, load_snapshot,
    primitives::DOCUMENT_EXTENSIONS,
    reconcile,
    report::derivation_markdown,
    validate,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for the database snapshot (16 MB).
///
/// This prevents memory exhaustion from malicious or accidental large
/// files.
const MAX_SNAPSHOT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum file size for a single corpus document (8 MB).
const MAX_DOCUMENT_FILE_SIZE: u64 = 8 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), AuditError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AuditError::Io(format!("Cannot read metadata of {:?}: {}", path, e)))?;

    if metadata.len() > max_size {
        return Err(AuditError::Io(format!(
            "File {:?} is {} bytes, more than the {} byte limit",
            path,
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Read a text file with a size guard.
fn read_text_file(path: &Path, max_size: u64) -> Result<String, AuditError> {
    validate_file_size(path, max_size)?;
    std::fs::read_to_string(path)
        .map_err(|e| AuditError::Io(format!("Cannot read {:?}: {}", path, e)))
}

// =============================================================================
// CORPUS DISCOVERY
// =============================================================================

/// Recursively discover corpus documents.
///
/// Returns (document id, absolute path) pairs sorted by document id; the
/// id is the corpus-relative path with `/` separators, so reports are
/// stable across platforms.
pub fn collect_documents(corpus: &Path) -> Result<Vec<(String, PathBuf)>, AuditError> {
    if !corpus.is_dir() {
        return Err(AuditError::Io(format!(
            "Corpus path {:?} is not a directory",
            corpus
        )));
    }

    let mut documents = Vec::new();
    for entry in walkdir::WalkDir::new(corpus).follow_links(false) {
        let entry = entry.map_err(|e| AuditError::Io(format!("Corpus walk failed: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let extension = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if !DOCUMENT_EXTENSIONS.contains(&extension) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(corpus)
            .map_err(|e| AuditError::Io(format!("Corpus walk failed: {}", e)))?;
        let document_id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        documents.push((document_id, entry.path().to_path_buf()));
    }

    documents.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(documents)
}

// =============================================================================
// PARALLEL EXTRACTION
// =============================================================================

/// Extract every document, fanning chunks out to worker threads.
///
/// Extraction is pure and documents share no state, so workers each take
/// a disjoint chunk; chunk results are reassembled in corpus order, which
/// keeps the output independent of scheduling.
pub fn extract_corpus(
    documents: &[(String, String)],
) -> (Vec<EquationOccurrence>, Vec<ExtractionWarning>) {
    let workers = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    let chunk_size = documents.len().div_ceil(workers).max(1);

    let outcomes: Vec<ExtractionOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = documents
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|(document_id, text)| extract_document(document_id, text))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(chunk_outcomes) => chunk_outcomes,
                Err(_) => {
                    tracing::error!("extraction worker terminated abnormally");
                    Vec::new()
                }
            })
            .collect()
    });

    let mut occurrences = Vec::new();
    let mut warnings = Vec::new();
    for outcome in outcomes {
        occurrences.extend(outcome.occurrences);
        warnings.extend(outcome.warnings);
    }
    (occurrences, warnings)
}

// =============================================================================
// AUDIT COMMAND
// =============================================================================

/// Run the full pipeline and assemble the report.
pub fn run_audit(database: &Path, corpus: &Path) -> Result<AuditReport, AuditError> {
    let snapshot_text = read_text_file(database, MAX_SNAPSHOT_FILE_SIZE)?;
    let load = load_snapshot(&snapshot_text)?;
    tracing::info!(
        formulas = load.store.len(),
        skipped = load.violations.len(),
        "snapshot loaded"
    );

    let derivation = validate(&load.store);

    let discovered = collect_documents(corpus)?;
    let mut documents = Vec::with_capacity(discovered.len());
    for (document_id, path) in discovered {
        let text = read_text_file(&path, MAX_DOCUMENT_FILE_SIZE)?;
        documents.push((document_id, text));
    }
    tracing::info!(documents = documents.len(), "corpus read");

    let (occurrences, warnings) = extract_corpus(&documents);
    for warning in &warnings {
        tracing::debug!(
            document = %warning.document_id,
            line = warning.line,
            "extraction warning: {}",
            warning.reason
        );
    }
    tracing::info!(
        occurrences = occurrences.len(),
        warnings = warnings.len(),
        "extraction finished"
    );

    let consistency = reconcile(&load.store, occurrences);
    AuditReport::assemble(
        derivation,
        consistency,
        load.violations,
        warnings,
        documents.len(),
    )
}

/// Full audit: graph validation plus corpus reconciliation.
pub fn cmd_audit(
    database: &Path,
    corpus: &Path,
    format: OutputFormat,
    strict: bool,
) -> Result<i32, AuditError> {
    let report = run_audit(database, corpus)?;

    match format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Md => println!("{}", report.to_markdown()),
    }

    Ok(report.exit_code(strict))
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Graph invariants only: no corpus is read.
pub fn cmd_validate(database: &Path, format: OutputFormat) -> Result<i32, AuditError> {
    let snapshot_text = read_text_file(database, MAX_SNAPSHOT_FILE_SIZE)?;
    let load = load_snapshot(&snapshot_text)?;
    let summary = validate(&load.store);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "registration_violations": load.violations,
                "derivation": summary,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output)
                    .map_err(|e| AuditError::Serialization(e.to_string()))?
            );
        }
        OutputFormat::Md => {
            print!("{}", derivation_markdown(&summary));
            for violation in &load.violations {
                println!("- registration: {}", violation.message);
            }
        }
    }

    let failed = summary.has_violations() || !load.violations.is_empty();
    Ok(i32::from(failed))
}

// =============================================================================
// EXTRACT COMMAND
// =============================================================================

/// Debug aid: show what the extractor sees in one document.
pub fn cmd_extract(file: &Path, format: OutputFormat) -> Result<i32, AuditError> {
    let text = read_text_file(file, MAX_DOCUMENT_FILE_SIZE)?;
    let document_id = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string_lossy().to_string());
    let outcome = extract_document(&document_id, &text);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "occurrences": outcome.occurrences,
                "warnings": outcome.warnings,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output)
                    .map_err(|e| AuditError::Serialization(e.to_string()))?
            );
        }
        OutputFormat::Md => {
            let mut out = String::new();
            let _ = writeln!(out, "| # | Line | Section | Kind | Equation |");
            let _ = writeln!(out, "|---|---|---|---|---|");
            for occurrence in &outcome.occurrences {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {:?} | `{}` |",
                    occurrence.ordinal,
                    occurrence.line,
                    occurrence.section_id.replace('|', "\\|"),
                    occurrence.kind,
                    occurrence.normalized_text.replace('|', "\\|"),
                );
            }
            for warning in &outcome.warnings {
                let _ = writeln!(out, "- warning (line {}): {}", warning.line, warning.reason);
            }
            print!("{out}");
        }
    }

    Ok(0)
}
