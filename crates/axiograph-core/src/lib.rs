//! # axiograph-core
//!
//! The deterministic audit engine for Axiograph - THE LOGIC.
//!
//! This crate models formula records as nodes in a dependency graph rooted
//! in established physics, validates the graph's structural invariants,
//! extracts delimiter-marked equations from document text, normalizes both
//! sides to canonical comparison strings, reconciles them, and assembles a
//! byte-stable audit report.
//!
//! ## Architectural Constraints
//!
//! - The engine is pure: no async, no network, no file I/O (the binary
//!   owns all I/O)
//! - Deterministic: `BTreeMap`/`BTreeSet` only; identical inputs produce
//!   byte-identical reports
//! - Collected failures: structural findings accumulate across the whole
//!   graph and corpus; the engine never aborts an audit on the first one
//! - Textual matching only: equations are compared as canonicalized
//!   strings, never as mathematics

// =============================================================================
// MODULES
// =============================================================================

pub mod extractor;
pub mod formats;
pub mod matcher;
pub mod normalizer;
pub mod primitives;
pub mod report;
pub mod store;
pub mod types;
pub mod validator;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AuditError, Category, EquationKind, EquationOccurrence, ExperimentalComparison,
    ExtractionWarning, FormulaId, FormulaRecord, RegistrationViolation,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use extractor::{ExtractionOutcome, extract_document};
pub use formats::{SnapshotLoad, load_snapshot};
pub use matcher::{ConsistencyReport, MatchedPair, reconcile};
pub use normalizer::normalize;
pub use report::{AuditReport, ReportCounts};
pub use store::KnowledgeGraphStore;
pub use validator::{Cycle, DerivationValidationSummary, ReferenceError, validate};
