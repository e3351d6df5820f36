//! # Cross-Source Matcher
//!
//! Reconciles extracted equation occurrences against the store's display
//! index.
//!
//! Matching is exact string equality after normalization, nothing more: no
//! fuzzy matching, no algebraic equivalence. The display index is
//! one-to-one-or-absent by construction (the store rejects conflicting
//! variants at registration), so a lookup either names the unique owning
//! formula or misses.

use crate::store::KnowledgeGraphStore;
use crate::types::{EquationOccurrence, FormulaId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// REPORT TYPES
// =============================================================================

/// One reconciled occurrence-to-formula assignment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchedPair {
    /// Document the occurrence came from.
    pub document_id: String,
    /// Section heading in effect at the occurrence.
    pub section_id: String,
    /// Order of the occurrence within its document.
    pub ordinal: usize,
    /// The formula the normalized text resolved to.
    pub formula_id: FormulaId,
    /// The canonical string both sides agreed on.
    pub normalized_text: String,
}

/// The corpus-versus-database reconciliation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConsistencyReport {
    /// Occurrences that resolved to a formula, sorted by
    /// (document, section, ordinal).
    pub matched_pairs: Vec<MatchedPair>,

    /// Occurrences with no database counterpart, same sort.
    pub source_only: Vec<EquationOccurrence>,

    /// Formula ids never matched by any occurrence, sorted
    /// lexicographically.
    pub target_only: Vec<FormulaId>,
}

impl ConsistencyReport {
    /// Whether any corpus equation failed to reconcile.
    #[must_use]
    pub fn has_source_only(&self) -> bool {
        !self.source_only.is_empty()
    }
}

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Reconcile all extracted occurrences against the store.
///
/// Occurrences arrive with `normalized_text` already derived by the
/// extractor; the store's display index was normalized the same way at
/// registration, so the comparison is canonical on both sides.
#[must_use]
pub fn reconcile(
    store: &KnowledgeGraphStore,
    occurrences: Vec<EquationOccurrence>,
) -> ConsistencyReport {
    let index = store.display_index();
    let mut matched_ids: BTreeSet<FormulaId> = BTreeSet::new();
    let mut matched_pairs = Vec::new();
    let mut source_only = Vec::new();

    for mut occurrence in occurrences {
        match index.get(&occurrence.normalized_text) {
            Some(formula_id) => {
                occurrence.matched_formula_id = Some(formula_id.clone());
                matched_ids.insert(formula_id.clone());
                matched_pairs.push(MatchedPair {
                    document_id: occurrence.document_id,
                    section_id: occurrence.section_id,
                    ordinal: occurrence.ordinal,
                    formula_id: formula_id.clone(),
                    normalized_text: occurrence.normalized_text,
                });
            }
            None => source_only.push(occurrence),
        }
    }

    let mut target_only: Vec<FormulaId> = store
        .all_ids()
        .iter()
        .filter(|id| !matched_ids.contains(*id))
        .cloned()
        .collect();
    target_only.sort();

    matched_pairs.sort_by(|a, b| {
        (&a.document_id, &a.section_id, a.ordinal).cmp(&(&b.document_id, &b.section_id, b.ordinal))
    });
    source_only.sort_by(|a, b| {
        (&a.document_id, &a.section_id, a.ordinal).cmp(&(&b.document_id, &b.section_id, b.ordinal))
    });

    ConsistencyReport {
        matched_pairs,
        source_only,
        target_only,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::extract_document;
    use crate::types::{Category, FormulaRecord};

    fn store_with_einstein() -> KnowledgeGraphStore {
        let mut store = KnowledgeGraphStore::new();
        store
            .register(
                FormulaRecord::new("einstein_energy", Category::Established)
                    .with_variant("$$E = mc^2$$"),
            )
            .expect("register");
        store
            .register(
                FormulaRecord::new("planck_energy", Category::Established)
                    .with_variant("E = h\\nu"),
            )
            .expect("register");
        store
    }

    #[test]
    fn one_match_two_source_only() {
        let store = store_with_einstein();
        let outcome = extract_document(
            "doc.md",
            "# Energy\n$$E =   mc^2$$\n$F = ma$\n$p = mv$\n",
        );

        let report = reconcile(&store, outcome.occurrences);
        assert_eq!(report.matched_pairs.len(), 1);
        assert_eq!(
            report.matched_pairs[0].formula_id,
            FormulaId::new("einstein_energy")
        );
        assert_eq!(report.source_only.len(), 2);
    }

    #[test]
    fn whitespace_differences_do_not_block_matches() {
        let store = store_with_einstein();
        let outcome = extract_document("doc.md", "\\[ E\n= mc^2 \\]\n");

        let report = reconcile(&store, outcome.occurrences);
        assert_eq!(report.matched_pairs.len(), 1);
        assert!(report.source_only.is_empty());
    }

    #[test]
    fn unmatched_formulas_become_target_only() {
        let store = store_with_einstein();
        let outcome = extract_document("doc.md", "$$E = mc^2$$\n");

        let report = reconcile(&store, outcome.occurrences);
        assert_eq!(report.target_only, vec![FormulaId::new("planck_energy")]);
    }

    #[test]
    fn empty_corpus_reports_every_formula_target_only() {
        let store = store_with_einstein();
        let report = reconcile(&store, Vec::new());

        assert_eq!(report.target_only.len(), 2);
        // lexicographic, not insertion, order
        assert_eq!(
            report.target_only,
            vec![
                FormulaId::new("einstein_energy"),
                FormulaId::new("planck_energy"),
            ]
        );
    }

    #[test]
    fn repeated_matches_count_the_formula_once() {
        let store = store_with_einstein();
        let outcome =
            extract_document("doc.md", "$$E = mc^2$$ and again $E = mc^2$\n");

        let report = reconcile(&store, outcome.occurrences);
        assert_eq!(report.matched_pairs.len(), 2);
        assert_eq!(report.target_only, vec![FormulaId::new("planck_energy")]);
    }

    #[test]
    fn output_sorted_across_documents() {
        let store = store_with_einstein();
        let mut occurrences = Vec::new();
        occurrences.extend(extract_document("z.md", "$a$\n").occurrences);
        occurrences.extend(extract_document("a.md", "$b$\n").occurrences);

        let report = reconcile(&store, occurrences);
        assert_eq!(report.source_only[0].document_id, "a.md");
        assert_eq!(report.source_only[1].document_id, "z.md");
    }
}
