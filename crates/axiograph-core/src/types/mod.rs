//! # Core Type Definitions
//!
//! This module contains all core types for the Axiograph audit engine:
//! - Formula identity and classification (`FormulaId`, `Category`)
//! - The formula record itself (`FormulaRecord`, `ExperimentalComparison`)
//! - Extraction output (`EquationOccurrence`, `EquationKind`,
//!   `ExtractionWarning`)
//! - Error types (`AuditError`)
//! - Collected registration findings (`RegistrationViolation`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` where they are used as `BTreeMap`/`BTreeSet` keys
//! - Carry experimental comparison values as opaque data only — the engine
//!   never performs arithmetic on them

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// FORMULA IDENTITY
// =============================================================================

/// Unique, immutable, stable string key for a formula record.
///
/// Ids are the join key between the database snapshot, the derivation graph
/// and the audit report, so they must never be rewritten once assigned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaId(pub String);

impl FormulaId {
    /// Create a new formula id from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormulaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed classification of a formula record.
///
/// ESTABLISHED records are axioms: cited to prior literature, no derivation
/// chain required. Everything else must eventually derive from one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Axiomatic entry cited to prior literature.
    Established,
    /// A theoretical framework formula.
    Theory,
    /// Derived from parents via recorded derivation steps.
    Derived,
    /// A prediction to be compared against experiment.
    Prediction,
}

impl Category {
    /// Whether this category denotes an axiomatic (established) record.
    #[must_use]
    pub const fn is_established(self) -> bool {
        matches!(self, Category::Established)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Established => "established",
            Category::Theory => "theory",
            Category::Derived => "derived",
            Category::Prediction => "prediction",
        };
        f.write_str(name)
    }
}

// =============================================================================
// FORMULA RECORD
// =============================================================================

/// Experimental comparison data carried verbatim from the snapshot.
///
/// The audit engine treats these as opaque payload: they appear in reports
/// but are never computed on (numeric simulation is out of scope).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentalComparison {
    /// Value predicted by the formula.
    pub predicted_value: f64,
    /// Value measured by experiment.
    pub experimental_value: f64,
    /// Reported measurement uncertainty, when the source gives one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<f64>,
}

/// A single formula in the knowledge graph.
///
/// `parent_formula_ids` and `established_physics_ids` overlap semantically
/// (both are dependency edges) but are tracked separately for provenance:
/// the latter cite axiomatic sources directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaRecord {
    /// Stable string key, unique across the snapshot.
    pub id: FormulaId,

    /// Closed classification.
    pub category: Category,

    /// Rendered display strings (plain/HTML/LaTeX). At least one required.
    pub display_variants: Vec<String>,

    /// Ids of formulas this record is derived from.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub parent_formula_ids: BTreeSet<FormulaId>,

    /// Ids of axiomatic sources cited directly.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub established_physics_ids: BTreeSet<FormulaId>,

    /// Ordered human-readable derivation steps. May be empty for
    /// ESTABLISHED records.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derivation_steps: Vec<String>,

    /// Optional experimental comparison payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<ExperimentalComparison>,
}

impl FormulaRecord {
    /// Create a record with the given id and category and no other data.
    #[must_use]
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: FormulaId::new(id),
            category,
            display_variants: Vec::new(),
            parent_formula_ids: BTreeSet::new(),
            established_physics_ids: BTreeSet::new(),
            derivation_steps: Vec::new(),
            experiment: None,
        }
    }

    /// Add a display variant.
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.display_variants.push(variant.into());
        self
    }

    /// Add a parent formula dependency.
    #[must_use]
    pub fn with_parent(mut self, id: impl Into<String>) -> Self {
        self.parent_formula_ids.insert(FormulaId::new(id));
        self
    }

    /// Add an established-physics citation.
    #[must_use]
    pub fn with_established(mut self, id: impl Into<String>) -> Self {
        self.established_physics_ids.insert(FormulaId::new(id));
        self
    }

    /// Add a derivation step.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.derivation_steps.push(step.into());
        self
    }
}

// =============================================================================
// EQUATION OCCURRENCES
// =============================================================================

/// How an equation was marked up in its source document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EquationKind {
    /// Block math (`$$ … $$` or `\[ … \]`).
    Display,
    /// Inline math (`$ … $` or `\( … \)`).
    Inline,
}

/// One equation found in a document by the extractor.
///
/// Occurrences live for a single audit run: created by the extractor,
/// consumed by the matcher, discarded with the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationOccurrence {
    /// Corpus-relative path of the source document.
    pub document_id: String,

    /// Text of the nearest preceding section heading; empty before the
    /// first heading.
    pub section_id: String,

    /// 0-based order of this occurrence within its document.
    pub ordinal: usize,

    /// 1-based line on which the math region opens.
    pub line: usize,

    /// The region verbatim, delimiters included.
    pub raw_text: String,

    /// Markup convention the region used.
    pub kind: EquationKind,

    /// Canonical comparison string derived from `raw_text`.
    pub normalized_text: String,

    /// Assigned by the matcher when the normalized text hits the display
    /// index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_formula_id: Option<FormulaId>,
}

/// A recoverable problem found while extracting one document.
///
/// Warnings are isolated to their document and never stop the run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtractionWarning {
    /// Corpus-relative path of the document.
    pub document_id: String,

    /// 1-based line where the problem was detected.
    pub line: usize,

    /// Section heading in effect at the problem site.
    pub section_id: String,

    /// Human-readable description of the problem.
    pub reason: String,
}

// =============================================================================
// REGISTRATION FINDINGS
// =============================================================================

/// A structural violation collected while loading the snapshot.
///
/// Registration failures do not abort loading: the offending record is
/// skipped, the violation is recorded here and surfaced in the report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistrationViolation {
    /// Id of the record that failed to register.
    pub id: FormulaId,

    /// Stable machine-readable violation kind.
    pub kind: String,

    /// Full human-readable message.
    pub message: String,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the Axiograph engine.
///
/// - No silent failures
/// - Structural findings are collected, not thrown mid-audit; these error
///   values surface at API boundaries (`register`, `get_record`, parsing)
/// - The engine never panics; all errors are recoverable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// A record violated a registration-time graph invariant.
    #[error("invariant violation for '{id}' in field {field}: {reason}")]
    InvariantViolation {
        /// Offending record id.
        id: FormulaId,
        /// Record field the invariant constrains.
        field: &'static str,
        /// What the invariant requires.
        reason: String,
    },

    /// A record id was registered twice.
    #[error("formula id '{0}' is already registered")]
    DuplicateId(FormulaId),

    /// A display variant normalizes to a string already indexed for a
    /// different formula, making exact matching ambiguous.
    #[error("display variant '{variant}' of '{id}' already maps to '{existing}'")]
    DuplicateDisplayConflict {
        /// Record being registered.
        id: FormulaId,
        /// Record that owns the index entry.
        existing: FormulaId,
        /// The conflicting variant, as written.
        variant: String,
    },

    /// The requested formula id is not in the store.
    #[error("formula not found: '{0}'")]
    NotFound(FormulaId),

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred (app layer only; the core does no I/O).
    #[error("I/O error: {0}")]
    Io(String),
}

impl AuditError {
    /// Stable machine-readable kind slug, used by collected report entries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AuditError::InvariantViolation { .. } => "invariant-violation",
            AuditError::DuplicateId(_) => "duplicate-id",
            AuditError::DuplicateDisplayConflict { .. } => "duplicate-display-conflict",
            AuditError::NotFound(_) => "not-found",
            AuditError::Serialization(_) => "serialization",
            AuditError::Io(_) => "io",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
