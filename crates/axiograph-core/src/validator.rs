//! # Derivation Chain Validator
//!
//! Whole-graph invariant checking over the knowledge-graph store.
//!
//! Two invariants need full-graph context and are checked here rather than
//! at registration: the dependency graph must be acyclic, and every
//! non-established record's ancestry must reach an established record
//! (rootedness).
//!
//! The pass is a single three-color depth-first traversal over
//! `parents_of`, started from every id in insertion order. It never stops
//! at the first finding: every cycle, dangling reference and unrooted
//! chain across the whole graph is collected before the summary returns,
//! so one run surfaces every problem.

use crate::store::KnowledgeGraphStore;
use crate::types::FormulaId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// FINDINGS
// =============================================================================

/// A dependency cycle.
///
/// `path` lists the ids in cycle order starting at the node where the
/// cycle closed, each cycle member once: a self-loop has a path of length
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Cycle members in cycle order.
    pub path: Vec<FormulaId>,
}

/// A dependency edge pointing at an id absent from the store.
///
/// Reported distinctly from cycles because the remediation differs: add
/// the missing formula rather than break a loop.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferenceError {
    /// Record that lists the dangling dependency.
    pub id: FormulaId,
    /// The id that could not be resolved.
    pub missing_parent: FormulaId,
}

/// Result of validating the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DerivationValidationSummary {
    /// Number of records examined.
    pub total: usize,

    /// Records with a verified chain to an established ancestor.
    pub valid_count: usize,

    /// Dependency cycles, sorted by the id the cycle closed on.
    pub cycles: Vec<Cycle>,

    /// Non-established records whose ancestry never reaches an
    /// established record, sorted by id.
    pub unrooted: Vec<FormulaId>,

    /// Dangling dependency edges, sorted by (id, missing parent).
    pub reference_errors: Vec<ReferenceError>,

    /// Verified chain to root for every passing id: the record itself,
    /// then parents, ending at its established ancestor.
    pub chains: BTreeMap<FormulaId, Vec<FormulaId>>,
}

impl DerivationValidationSummary {
    /// Whether any structural graph violation was found.
    #[must_use]
    pub fn has_violations(&self) -> bool {
        !self.cycles.is_empty() || !self.unrooted.is_empty() || !self.reference_errors.is_empty()
    }
}

// =============================================================================
// TRAVERSAL STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

struct Traversal<'a> {
    store: &'a KnowledgeGraphStore,
    colors: BTreeMap<FormulaId, Color>,
    /// Ids on the current DFS path, in visit order.
    path: Vec<FormulaId>,
    /// Memoized: does this id's closure (including itself) reach an
    /// established record?
    reaches_root: BTreeMap<FormulaId, bool>,
    cycles: Vec<Cycle>,
    cycle_members: BTreeSet<FormulaId>,
    reference_errors: BTreeSet<ReferenceError>,
}

impl<'a> Traversal<'a> {
    fn new(store: &'a KnowledgeGraphStore) -> Self {
        Self {
            store,
            colors: BTreeMap::new(),
            path: Vec::new(),
            reaches_root: BTreeMap::new(),
            cycles: Vec::new(),
            cycle_members: BTreeSet::new(),
            reference_errors: BTreeSet::new(),
        }
    }

    fn color(&self, id: &FormulaId) -> Color {
        self.colors.get(id).copied().unwrap_or(Color::White)
    }

    /// Visit one node; returns whether its closure reaches an established
    /// record.
    fn visit(&mut self, id: &FormulaId) -> bool {
        match self.color(id) {
            Color::Black => return self.reaches_root.get(id).copied().unwrap_or(false),
            Color::Gray => {
                // Back edge: the cycle is the path suffix from the first
                // occurrence of this id.
                if let Some(start) = self.path.iter().position(|p| p == id) {
                    let members = self.path[start..].to_vec();
                    self.cycle_members.extend(members.iter().cloned());
                    self.cycles.push(Cycle { path: members });
                }
                return false;
            }
            Color::White => {}
        }

        self.colors.insert(id.clone(), Color::Gray);
        self.path.push(id.clone());

        // parents_of cannot fail here: only known ids are visited.
        let parents = self.store.parents_of(id).unwrap_or_default();
        let mut reaches = self
            .store
            .get_record(id)
            .map(|r| r.category.is_established())
            .unwrap_or(false);

        for parent in parents {
            if self.store.contains(&parent) {
                if self.visit(&parent) {
                    reaches = true;
                }
            } else {
                self.reference_errors.insert(ReferenceError {
                    id: id.clone(),
                    missing_parent: parent,
                });
            }
        }

        self.path.pop();
        self.colors.insert(id.clone(), Color::Black);
        self.reaches_root.insert(id.clone(), reaches);
        reaches
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Verify acyclicity and rootedness over the whole store.
///
/// O(V+E): every node is traversed once; subsequent starts hit black
/// nodes and return memoized results.
#[must_use]
pub fn validate(store: &KnowledgeGraphStore) -> DerivationValidationSummary {
    let mut traversal = Traversal::new(store);
    for id in store.all_ids() {
        traversal.visit(id);
    }

    let Traversal {
        reaches_root,
        mut cycles,
        cycle_members,
        reference_errors,
        ..
    } = traversal;

    let ref_error_ids: BTreeSet<FormulaId> =
        reference_errors.iter().map(|e| e.id.clone()).collect();

    let mut unrooted = Vec::new();
    let mut chains = BTreeMap::new();
    let mut valid_count = 0usize;

    for id in store.all_ids() {
        // Cycle members and dangling-reference records are already
        // reported; they are not double-reported as unrooted.
        if cycle_members.contains(id) || ref_error_ids.contains(id) {
            continue;
        }
        if reaches_root.get(id).copied().unwrap_or(false) {
            if let Some(chain) = chain_to_root(store, id) {
                chains.insert(id.clone(), chain);
            }
            valid_count += 1;
        } else {
            unrooted.push(id.clone());
        }
    }

    cycles.sort_by(|a, b| a.path.cmp(&b.path));
    unrooted.sort();

    DerivationValidationSummary {
        total: store.all_ids().len(),
        valid_count,
        cycles,
        unrooted,
        reference_errors: reference_errors.into_iter().collect(),
        chains,
    }
}

/// Deterministic shortest path from `id` to its lexicographically-smallest
/// established ancestor.
///
/// Breadth-first over sorted parents with first-discovery predecessors:
/// equal-length paths tie-break toward the parent that sorts first, so the
/// chain is reproducible across runs.
fn chain_to_root(store: &KnowledgeGraphStore, id: &FormulaId) -> Option<Vec<FormulaId>> {
    let mut predecessors: BTreeMap<FormulaId, FormulaId> = BTreeMap::new();
    let mut visited: BTreeSet<FormulaId> = BTreeSet::new();
    let mut queue: VecDeque<FormulaId> = VecDeque::new();
    let mut established: Vec<FormulaId> = Vec::new();

    visited.insert(id.clone());
    queue.push_back(id.clone());

    while let Some(current) = queue.pop_front() {
        if let Ok(record) = store.get_record(&current) {
            if record.category.is_established() {
                established.push(current.clone());
            }
        }
        let parents = store.parents_of(&current).unwrap_or_default();
        for parent in parents {
            if store.contains(&parent) && visited.insert(parent.clone()) {
                predecessors.insert(parent.clone(), current.clone());
                queue.push_back(parent);
            }
        }
    }

    // Target: the smallest established ancestor, then walk predecessors
    // back to the starting record.
    let target = established.into_iter().min()?;
    let mut chain = vec![target.clone()];
    let mut cursor = target;
    while let Some(prev) = predecessors.get(&cursor) {
        chain.push(prev.clone());
        cursor = prev.clone();
    }
    chain.reverse();
    Some(chain)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, FormulaRecord};

    fn axiom(id: &str) -> FormulaRecord {
        FormulaRecord::new(id, Category::Established).with_variant(format!("{id} = 0"))
    }

    fn derived(id: &str, parents: &[&str]) -> FormulaRecord {
        let mut record =
            FormulaRecord::new(id, Category::Derived).with_variant(format!("{id} = 1"));
        for parent in parents {
            record = record.with_parent(*parent);
        }
        record
    }

    fn store_of(records: Vec<FormulaRecord>) -> KnowledgeGraphStore {
        let mut store = KnowledgeGraphStore::new();
        for record in records {
            store.register(record).expect("register");
        }
        store
    }

    #[test]
    fn clean_linear_chain_validates() {
        let store = store_of(vec![
            axiom("a"),
            derived("b", &["a"]),
            derived("c", &["b"]),
        ]);

        let summary = validate(&store);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.valid_count, 3);
        assert!(summary.cycles.is_empty());
        assert!(summary.unrooted.is_empty());
        assert!(summary.reference_errors.is_empty());
        assert!(!summary.has_violations());
    }

    #[test]
    fn chain_to_root_lists_child_to_ancestor() {
        let store = store_of(vec![
            axiom("a"),
            derived("b", &["a"]),
            derived("c", &["b"]),
        ]);

        let summary = validate(&store);
        let chain = summary.chains.get(&FormulaId::new("c")).expect("chain");
        assert_eq!(
            chain,
            &vec![FormulaId::new("c"), FormulaId::new("b"), FormulaId::new("a")]
        );
    }

    #[test]
    fn chain_targets_lexicographically_smallest_ancestor() {
        // d reaches both axioms; the chain must end at "m", not "z".
        let store = store_of(vec![
            axiom("z"),
            axiom("m"),
            derived("d", &["z", "m"]),
        ]);

        let summary = validate(&store);
        let chain = summary.chains.get(&FormulaId::new("d")).expect("chain");
        assert_eq!(chain, &vec![FormulaId::new("d"), FormulaId::new("m")]);
    }

    #[test]
    fn self_loop_yields_cycle_of_length_one() {
        let store = store_of(vec![derived("ouroboros", &["ouroboros"])]);

        let summary = validate(&store);
        assert_eq!(summary.cycles.len(), 1);
        assert_eq!(summary.cycles[0].path, vec![FormulaId::new("ouroboros")]);
        assert_eq!(summary.valid_count, 0);
        // Reported as a cycle, not additionally as unrooted.
        assert!(summary.unrooted.is_empty());
    }

    #[test]
    fn two_node_cycle_reported_exactly_once() {
        let store = store_of(vec![derived("x", &["y"]), derived("y", &["x"])]);

        let summary = validate(&store);
        assert_eq!(summary.cycles.len(), 1);
        let members: BTreeSet<_> = summary.cycles[0].path.iter().cloned().collect();
        assert_eq!(
            members,
            BTreeSet::from([FormulaId::new("x"), FormulaId::new("y")])
        );
        assert_eq!(summary.valid_count, 0);
    }

    #[test]
    fn dangling_parent_reported_as_reference_error() {
        let store = store_of(vec![axiom("a"), derived("b", &["a", "phantom"])]);

        let summary = validate(&store);
        assert_eq!(summary.reference_errors.len(), 1);
        assert_eq!(
            summary.reference_errors[0],
            ReferenceError {
                id: FormulaId::new("b"),
                missing_parent: FormulaId::new("phantom"),
            }
        );
        // A record with a dangling edge does not count as valid even
        // though another edge reaches an axiom.
        assert_eq!(summary.valid_count, 1);
        assert!(summary.unrooted.is_empty());
    }

    #[test]
    fn chain_without_axiom_is_unrooted() {
        let store = store_of(vec![derived("p", &["q"]), derived("q", &["p2"])]);

        let summary = validate(&store);
        // p2 is dangling -> q has a reference error; p is unrooted.
        assert_eq!(summary.unrooted, vec![FormulaId::new("p")]);
        assert_eq!(summary.reference_errors.len(), 1);
        assert_eq!(summary.valid_count, 0);
    }

    #[test]
    fn descendants_of_a_rooted_cycle_member_stay_valid() {
        // x <-> y, x also depends on axiom a; z depends on x.
        let store = store_of(vec![
            axiom("a"),
            derived("x", &["y", "a"]),
            derived("y", &["x"]),
            derived("z", &["x"]),
        ]);

        let summary = validate(&store);
        assert_eq!(summary.cycles.len(), 1);
        assert!(summary.chains.contains_key(&FormulaId::new("z")));
        // a and z pass; x and y are cycle members.
        assert_eq!(summary.valid_count, 2);
    }

    #[test]
    fn all_violations_collected_in_one_pass() {
        let store = store_of(vec![
            axiom("a"),
            derived("loop", &["loop"]),
            derived("dangling", &["nowhere"]),
            derived("ok", &["a"]),
        ]);

        let summary = validate(&store);
        assert_eq!(summary.cycles.len(), 1);
        assert_eq!(summary.reference_errors.len(), 1);
        assert_eq!(summary.valid_count, 2);
        assert!(summary.has_violations());
    }

    #[test]
    fn established_record_chains_to_itself() {
        let store = store_of(vec![axiom("a")]);
        let summary = validate(&store);
        assert_eq!(
            summary.chains.get(&FormulaId::new("a")),
            Some(&vec![FormulaId::new("a")])
        );
    }
}
