//! # Report Generator
//!
//! Assembles the derivation validation summary and the consistency report
//! into one stable, serializable audit report.
//!
//! Every list is re-sorted at assembly so the ordering contract holds no
//! matter how the inputs were produced: occurrences by
//! (document, section, ordinal), target-only ids lexicographically, graph
//! findings by offending id, warnings by (document, line). Two runs on
//! unchanged inputs serialize byte-identically, which is what makes
//! diff-based regression checks between audits possible; the embedded
//! digest makes those checks one string comparison.

use crate::matcher::ConsistencyReport;
use crate::types::{AuditError, ExtractionWarning, RegistrationViolation};
use crate::validator::DerivationValidationSummary;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

// =============================================================================
// REPORT STRUCTURE
// =============================================================================

/// Per-category finding counts, duplicated from the itemized lists for
/// at-a-glance reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReportCounts {
    /// Formula records examined.
    pub formulas: usize,
    /// Documents scanned.
    pub documents: usize,
    /// Equation occurrences extracted.
    pub occurrences: usize,
    /// Occurrences reconciled to a formula.
    pub matched: usize,
    /// Occurrences with no database counterpart.
    pub source_only: usize,
    /// Formulas never matched in the corpus.
    pub target_only: usize,
    /// Dependency cycles.
    pub cycles: usize,
    /// Records without an established ancestor.
    pub unrooted: usize,
    /// Dangling dependency references.
    pub reference_errors: usize,
    /// Records rejected at registration.
    pub registration_violations: usize,
    /// Extraction warnings.
    pub extraction_warnings: usize,
}

/// The complete audit output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Per-category counts.
    pub counts: ReportCounts,

    /// Whole-graph invariant findings.
    pub derivation: DerivationValidationSummary,

    /// Corpus reconciliation findings.
    pub consistency: ConsistencyReport,

    /// Records the snapshot loader had to skip.
    pub registration_violations: Vec<RegistrationViolation>,

    /// Per-document extraction problems.
    pub extraction_warnings: Vec<ExtractionWarning>,

    /// Deterministic digest of everything above, hex-encoded.
    pub checksum: String,
}

impl AuditReport {
    /// Assemble and finalize a report: sort every list, fill the counts,
    /// compute the digest.
    pub fn assemble(
        derivation: DerivationValidationSummary,
        consistency: ConsistencyReport,
        registration_violations: Vec<RegistrationViolation>,
        extraction_warnings: Vec<ExtractionWarning>,
        documents: usize,
    ) -> Result<Self, AuditError> {
        let mut report = Self {
            counts: ReportCounts::default(),
            derivation,
            consistency,
            registration_violations,
            extraction_warnings,
            checksum: String::new(),
        };
        report.sort_lists();
        report.counts = ReportCounts {
            formulas: report.derivation.total,
            documents,
            occurrences: report.consistency.matched_pairs.len()
                + report.consistency.source_only.len(),
            matched: report.consistency.matched_pairs.len(),
            source_only: report.consistency.source_only.len(),
            target_only: report.consistency.target_only.len(),
            cycles: report.derivation.cycles.len(),
            unrooted: report.derivation.unrooted.len(),
            reference_errors: report.derivation.reference_errors.len(),
            registration_violations: report.registration_violations.len(),
            extraction_warnings: report.extraction_warnings.len(),
        };

        // digest over the serialized body with the checksum field empty
        let body = serde_json::to_vec(&report)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;
        report.checksum = digest_hex(&body);
        Ok(report)
    }

    fn sort_lists(&mut self) {
        self.derivation
            .cycles
            .sort_by(|a, b| a.path.cmp(&b.path));
        self.derivation.unrooted.sort();
        self.derivation.reference_errors.sort();
        self.consistency.matched_pairs.sort_by(|a, b| {
            (&a.document_id, &a.section_id, a.ordinal)
                .cmp(&(&b.document_id, &b.section_id, b.ordinal))
        });
        self.consistency.source_only.sort_by(|a, b| {
            (&a.document_id, &a.section_id, a.ordinal)
                .cmp(&(&b.document_id, &b.section_id, b.ordinal))
        });
        self.consistency.target_only.sort();
        self.registration_violations.sort();
        self.extraction_warnings
            .sort_by(|a, b| (&a.document_id, a.line).cmp(&(&b.document_id, b.line)));
    }

    /// Whether any structural (exit-code-affecting) violation is present.
    #[must_use]
    pub fn has_structural_violations(&self) -> bool {
        self.derivation.has_violations() || !self.registration_violations.is_empty()
    }

    /// Process exit code under the given strictness.
    ///
    /// Structural violations always fail; `strict` additionally turns
    /// source-only findings into failures.
    #[must_use]
    pub fn exit_code(&self, strict: bool) -> i32 {
        if self.has_structural_violations() {
            return 1;
        }
        if strict && self.consistency.has_source_only() {
            return 1;
        }
        0
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String, AuditError> {
        serde_json::to_string_pretty(self).map_err(|e| AuditError::Serialization(e.to_string()))
    }

    /// Render as Markdown tables.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Audit Report");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Metric | Count |");
        let _ = writeln!(out, "|---|---|");
        let c = &self.counts;
        for (name, value) in [
            ("Formulas", c.formulas),
            ("Documents", c.documents),
            ("Occurrences", c.occurrences),
            ("Matched", c.matched),
            ("Source-only", c.source_only),
            ("Target-only", c.target_only),
            ("Cycles", c.cycles),
            ("Unrooted", c.unrooted),
            ("Reference errors", c.reference_errors),
            ("Registration violations", c.registration_violations),
            ("Extraction warnings", c.extraction_warnings),
        ] {
            let _ = writeln!(out, "| {name} | {value} |");
        }
        let _ = writeln!(out);

        out.push_str(&derivation_markdown(&self.derivation));

        if !self.registration_violations.is_empty() {
            let _ = writeln!(out, "## Registration Violations");
            let _ = writeln!(out);
            let _ = writeln!(out, "| Id | Kind | Message |");
            let _ = writeln!(out, "|---|---|---|");
            for violation in &self.registration_violations {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} |",
                    cell(violation.id.as_str()),
                    violation.kind,
                    cell(&violation.message)
                );
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "## Cross-Source Consistency");
        let _ = writeln!(out);
        if !self.consistency.matched_pairs.is_empty() {
            let _ = writeln!(out, "### Matched");
            let _ = writeln!(out);
            let _ = writeln!(out, "| Document | Section | # | Formula |");
            let _ = writeln!(out, "|---|---|---|---|");
            for pair in &self.consistency.matched_pairs {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    cell(&pair.document_id),
                    cell(&pair.section_id),
                    pair.ordinal,
                    cell(pair.formula_id.as_str())
                );
            }
            let _ = writeln!(out);
        }
        if !self.consistency.source_only.is_empty() {
            let _ = writeln!(out, "### Source-only Equations");
            let _ = writeln!(out);
            let _ = writeln!(out, "| Document | Section | # | Equation |");
            let _ = writeln!(out, "|---|---|---|---|");
            for occurrence in &self.consistency.source_only {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | `{}` |",
                    cell(&occurrence.document_id),
                    cell(&occurrence.section_id),
                    occurrence.ordinal,
                    cell(&occurrence.normalized_text)
                );
            }
            let _ = writeln!(out);
        }
        if !self.consistency.target_only.is_empty() {
            let _ = writeln!(out, "### Target-only Formulas");
            let _ = writeln!(out);
            for id in &self.consistency.target_only {
                let _ = writeln!(out, "- {id}");
            }
            let _ = writeln!(out);
        }

        if !self.extraction_warnings.is_empty() {
            let _ = writeln!(out, "## Extraction Warnings");
            let _ = writeln!(out);
            let _ = writeln!(out, "| Document | Line | Section | Reason |");
            let _ = writeln!(out, "|---|---|---|---|");
            for warning in &self.extraction_warnings {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    cell(&warning.document_id),
                    warning.line,
                    cell(&warning.section_id),
                    cell(&warning.reason)
                );
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "Checksum: `{}`", self.checksum);
        out
    }
}

/// Render the graph-invariant section; shared with the validate-only
/// command.
#[must_use]
pub fn derivation_markdown(summary: &DerivationValidationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Derivation Validation");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} of {} records have a verified chain to established physics.",
        summary.valid_count, summary.total
    );
    let _ = writeln!(out);

    if !summary.cycles.is_empty() {
        let _ = writeln!(out, "### Cycles");
        let _ = writeln!(out);
        for cycle in &summary.cycles {
            let ids: Vec<&str> = cycle.path.iter().map(|id| id.as_str()).collect();
            let _ = writeln!(out, "- {}", ids.join(" -> "));
        }
        let _ = writeln!(out);
    }
    if !summary.unrooted.is_empty() {
        let _ = writeln!(out, "### Unrooted Chains");
        let _ = writeln!(out);
        for id in &summary.unrooted {
            let _ = writeln!(out, "- {id}");
        }
        let _ = writeln!(out);
    }
    if !summary.reference_errors.is_empty() {
        let _ = writeln!(out, "### Reference Errors");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Record | Missing Parent |");
        let _ = writeln!(out, "|---|---|");
        for error in &summary.reference_errors {
            let _ = writeln!(
                out,
                "| {} | {} |",
                cell(error.id.as_str()),
                cell(error.missing_parent.as_str())
            );
        }
        let _ = writeln!(out);
    }
    out
}

/// Escape a value for use inside a Markdown table cell.
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

// =============================================================================
// DIGEST
// =============================================================================

/// BLAKE3 digest of the report body.
#[cfg(feature = "crypto-hash")]
fn digest_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// XOR-rotate digest of the report body.
///
/// Not cryptographic: detects accidental divergence between runs, which
/// is all regression diffing needs. Enable `crypto-hash` for BLAKE3.
#[cfg(not(feature = "crypto-hash"))]
fn digest_hex(bytes: &[u8]) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for (i, byte) in bytes.iter().enumerate() {
        hash ^= u64::from(*byte).rotate_left((i % 59) as u32);
        hash = hash.rotate_left(7);
    }
    format!("{hash:016x}")
}

// =============================================================================
// TESTS
// =============================================================================
