//! # Knowledge Graph Store
//!
//! The deterministic formula store for the Axiograph engine.
//!
//! All data structures use `BTreeMap`/`BTreeSet`; the only insertion-order
//! state is the explicit id list, kept so reports iterate records exactly
//! as the snapshot authored them.
//!
//! The store is write-once per run: records are registered while loading
//! the snapshot, then the store is only read. Registration checks the
//! local invariants (axioms list no parents; everything else lists at
//! least one) and maintains the display index; whole-graph invariants
//! (acyclicity, rootedness) need full-graph context and are deferred to
//! the validator.

use crate::normalizer::normalize;
use crate::primitives::MAX_DISPLAY_VARIANT_LENGTH;
use crate::types::{AuditError, FormulaId, FormulaRecord};
use std::collections::BTreeMap;

// =============================================================================
// STORE
// =============================================================================

/// Immutable-after-load store of formula records and their adjacency.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraphStore {
    /// Record storage: id -> record.
    records: BTreeMap<FormulaId, FormulaRecord>,

    /// Ids in registration order, for reproducible report iteration.
    insertion_order: Vec<FormulaId>,

    /// Display index: normalized display string -> owning id.
    /// One-to-one-or-absent by construction (conflicts are rejected).
    display_index: BTreeMap<String, FormulaId>,
}

impl KnowledgeGraphStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record, validating the local invariants.
    ///
    /// On any failure the store is left untouched: all checks run before
    /// the first mutation.
    ///
    /// # Errors
    ///
    /// - `DuplicateId` if the id is already registered
    /// - `InvariantViolation` if the record has no display variants, an
    ///   over-long variant, an ESTABLISHED record lists dependencies, or a
    ///   non-ESTABLISHED record lists none
    /// - `DuplicateDisplayConflict` if a variant normalizes to a string
    ///   already indexed for a different id
    pub fn register(&mut self, record: FormulaRecord) -> Result<(), AuditError> {
        if self.records.contains_key(&record.id) {
            return Err(AuditError::DuplicateId(record.id));
        }

        if record.display_variants.is_empty() {
            return Err(AuditError::InvariantViolation {
                id: record.id,
                field: "display_variants",
                reason: "at least one display variant is required".to_string(),
            });
        }
        if let Some(oversized) = record
            .display_variants
            .iter()
            .find(|v| v.len() > MAX_DISPLAY_VARIANT_LENGTH)
        {
            return Err(AuditError::InvariantViolation {
                id: record.id,
                field: "display_variants",
                reason: format!(
                    "variant of {} bytes exceeds the {} byte limit",
                    oversized.len(),
                    MAX_DISPLAY_VARIANT_LENGTH
                ),
            });
        }

        if record.category.is_established() {
            // Axioms are roots by definition: they depend on nothing.
            if !record.parent_formula_ids.is_empty() {
                return Err(AuditError::InvariantViolation {
                    id: record.id,
                    field: "parent_formula_ids",
                    reason: "established formulas must not list parent formulas".to_string(),
                });
            }
            if !record.established_physics_ids.is_empty() {
                return Err(AuditError::InvariantViolation {
                    id: record.id,
                    field: "established_physics_ids",
                    reason: "established formulas must not cite established physics".to_string(),
                });
            }
        } else if record.parent_formula_ids.is_empty()
            && record.established_physics_ids.is_empty()
        {
            return Err(AuditError::InvariantViolation {
                id: record.id,
                field: "parent_formula_ids",
                reason: format!(
                    "{} formulas must list at least one parent or established citation",
                    record.category
                ),
            });
        }

        // Validate every variant against the display index before touching
        // it, so a rejected record leaves no partial index entries.
        let mut normalized_variants = Vec::with_capacity(record.display_variants.len());
        for variant in &record.display_variants {
            let normalized = normalize(variant);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing) = self.display_index.get(&normalized) {
                if *existing != record.id {
                    return Err(AuditError::DuplicateDisplayConflict {
                        id: record.id,
                        existing: existing.clone(),
                        variant: variant.clone(),
                    });
                }
            }
            normalized_variants.push(normalized);
        }

        for normalized in normalized_variants {
            self.display_index.insert(normalized, record.id.clone());
        }
        self.insertion_order.push(record.id.clone());
        self.records.insert(record.id.clone(), record);

        Ok(())
    }

    /// Look up a record by id.
    pub fn get_record(&self, id: &FormulaId) -> Result<&FormulaRecord, AuditError> {
        self.records
            .get(id)
            .ok_or_else(|| AuditError::NotFound(id.clone()))
    }

    /// Whether the store contains the given id.
    #[must_use]
    pub fn contains(&self, id: &FormulaId) -> bool {
        self.records.contains_key(id)
    }

    /// All dependency edges of a record: the sorted union of
    /// `parent_formula_ids` and `established_physics_ids`.
    pub fn parents_of(&self, id: &FormulaId) -> Result<Vec<FormulaId>, AuditError> {
        let record = self.get_record(id)?;
        // union of two sorted sets iterates in sorted order
        Ok(record
            .parent_formula_ids
            .union(&record.established_physics_ids)
            .cloned()
            .collect())
    }

    /// Ids in registration order.
    #[must_use]
    pub fn all_ids(&self) -> &[FormulaId] {
        &self.insertion_order
    }

    /// Records in registration order.
    pub fn records(&self) -> impl Iterator<Item = &FormulaRecord> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.records.get(id))
    }

    /// The completed display index (normalized string -> id).
    #[must_use]
    pub fn display_index(&self) -> &BTreeMap<String, FormulaId> {
        &self.display_index
    }

    /// Number of registered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
