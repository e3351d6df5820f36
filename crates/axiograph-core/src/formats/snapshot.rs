//! # Snapshot Format
//!
//! TOML parsing for the formula-database snapshot.
//!
//! A snapshot is a `[[formula]]` array of tables in author order; author
//! order defines the store's insertion order and therefore report
//! iteration order.
//!
//! ```toml
//! [[formula]]
//! id = "einstein_energy"
//! category = "established"
//! display_variants = ["$$E = mc^2$$", "E = mc^2"]
//!
//! [[formula]]
//! id = "relativistic_momentum"
//! category = "derived"
//! display_variants = ["$$E^2 = (pc)^2 + (mc^2)^2$$"]
//! parent_formula_ids = ["einstein_energy"]
//! derivation_steps = ["Square the energy-momentum relation"]
//! ```
//!
//! Registration failures (duplicate ids, display conflicts, invariant
//! violations) are COLLECTED, not thrown: the offending record is skipped
//! and loading continues, so one pass surfaces every structural problem in
//! the snapshot.

use crate::primitives::MAX_SNAPSHOT_RECORDS;
use crate::store::KnowledgeGraphStore;
use crate::types::{AuditError, FormulaRecord, RegistrationViolation};
use serde::Deserialize;

// =============================================================================
// SNAPSHOT DOCUMENT
// =============================================================================

#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    formula: Vec<FormulaRecord>,
}

/// A parsed snapshot: the populated store plus every registration
/// violation collected along the way.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLoad {
    /// Store holding every record that registered cleanly.
    pub store: KnowledgeGraphStore,
    /// Violations for records that were skipped.
    pub violations: Vec<RegistrationViolation>,
}

// =============================================================================
// LOADING
// =============================================================================

/// Parse a snapshot document and build a fresh store from it.
///
/// # Errors
///
/// `Serialization` if the document is not valid TOML or exceeds the
/// record limit. Per-record structural problems do not error: they are
/// collected into `SnapshotLoad::violations`.
pub fn load_snapshot(text: &str) -> Result<SnapshotLoad, AuditError> {
    let document: SnapshotDocument =
        toml::from_str(text).map_err(|e| AuditError::Serialization(e.to_string()))?;

    if document.formula.len() > MAX_SNAPSHOT_RECORDS {
        return Err(AuditError::Serialization(format!(
            "snapshot holds {} records, more than the {} record limit",
            document.formula.len(),
            MAX_SNAPSHOT_RECORDS
        )));
    }

    let mut load = SnapshotLoad::default();
    for record in document.formula {
        let id = record.id.clone();
        if let Err(error) = load.store.register(record) {
            load.violations.push(RegistrationViolation {
                id,
                kind: error.kind().to_string(),
                message: error.to_string(),
            });
        }
    }
    load.violations.sort();

    Ok(load)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, FormulaId};

    const GOOD_SNAPSHOT: &str = r#"
[[formula]]
id = "einstein_energy"
category = "established"
display_variants = ["$$E = mc^2$$"]

[[formula]]
id = "relativistic_momentum"
category = "derived"
display_variants = ["$$E^2 = (pc)^2 + (mc^2)^2$$"]
parent_formula_ids = ["einstein_energy"]
derivation_steps = ["Square the energy-momentum relation"]

[[formula]]
id = "gut_scale"
category = "prediction"
display_variants = ["M_{GUT} \\approx 2 \\times 10^{16}\\,\\mathrm{GeV}"]
established_physics_ids = ["einstein_energy"]

[formula.experiment]
predicted_value = 2.0e16
experimental_value = 1.8e16
uncertainty = 0.4e16
"#;

    #[test]
    fn loads_records_in_author_order() {
        let load = load_snapshot(GOOD_SNAPSHOT).expect("load");
        assert!(load.violations.is_empty());
        assert_eq!(load.store.len(), 3);
        assert_eq!(
            load.store.all_ids()[0],
            FormulaId::new("einstein_energy")
        );
        assert_eq!(
            load.store.all_ids()[2],
            FormulaId::new("gut_scale")
        );
    }

    #[test]
    fn experiment_subtable_is_carried() {
        let load = load_snapshot(GOOD_SNAPSHOT).expect("load");
        let record = load
            .store
            .get_record(&FormulaId::new("gut_scale"))
            .expect("get");
        assert_eq!(record.category, Category::Prediction);
        let experiment = record.experiment.as_ref().expect("experiment");
        assert!(experiment.uncertainty.is_some());
    }

    #[test]
    fn bad_records_are_collected_not_fatal() {
        let snapshot = r#"
[[formula]]
id = "good"
category = "established"
display_variants = ["x = y"]

[[formula]]
id = "orphan"
category = "derived"
display_variants = ["q = r"]

[[formula]]
id = "also_good"
category = "derived"
display_variants = ["z = w"]
parent_formula_ids = ["good"]
"#;
        let load = load_snapshot(snapshot).expect("load");
        assert_eq!(load.store.len(), 2);
        assert_eq!(load.violations.len(), 1);
        assert_eq!(load.violations[0].id, FormulaId::new("orphan"));
        assert_eq!(load.violations[0].kind, "invariant-violation");
    }

    #[test]
    fn display_conflicts_surface_before_any_scan() {
        let snapshot = r#"
[[formula]]
id = "first"
category = "established"
display_variants = ["E = mc^2"]

[[formula]]
id = "second"
category = "established"
display_variants = ["$$E  =  mc^2$$"]
"#;
        let load = load_snapshot(snapshot).expect("load");
        assert_eq!(load.store.len(), 1);
        assert_eq!(load.violations.len(), 1);
        assert_eq!(load.violations[0].kind, "duplicate-display-conflict");
    }

    #[test]
    fn invalid_toml_is_a_serialization_error() {
        let result = load_snapshot("[[formula]\nid = broken");
        assert!(matches!(result, Err(AuditError::Serialization(_))));
    }

    #[test]
    fn unknown_category_is_a_serialization_error() {
        let snapshot = r#"
[[formula]]
id = "x"
category = "axiomatic"
display_variants = ["x = y"]
"#;
        let result = load_snapshot(snapshot);
        assert!(matches!(result, Err(AuditError::Serialization(_))));
    }

    #[test]
    fn empty_snapshot_yields_empty_store() {
        let load = load_snapshot("").expect("load");
        assert!(load.store.is_empty());
        assert!(load.violations.is_empty());
    }
}
