//! Global enablement registry
//!
//! Collects components enabled for the whole deployment with a priority, in
//! two phases:
//!
//! 1. **Scan**: any number of scanner threads append to a shared
//!    [`GlobalEnablementBuilder`] through `&self`.
//! 2. **Freeze**: once every scanner has been joined, [`GlobalEnablementBuilder::freeze`]
//!    consumes the builder, sorts each category exactly once and returns an
//!    immutable [`GlobalEnablement`] snapshot.
//!
//! Appending after the freeze is impossible because the builder no longer
//! exists.

use crate::identity::{Category, ComponentIdentity, EnablementRecord, Priority};
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::thread;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

// =============================================================================
// Builder (scan phase)
// =============================================================================

/// Concurrent, append-only collection of one category's global declarations.
///
/// Keyed by identity so that the same component seen by two scanners lands in
/// one entry; every declared priority is kept until the freeze decides whether
/// the declarations agree.
struct Ledger {
    entries: DashMap<ComponentIdentity, Vec<Priority>, RandomState>,
}

impl Ledger {
    fn new() -> Self {
        Self {
            // Scanners write in bursts; 16 shards keeps contention low without
            // the num_cpus * 4 default.
            entries: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                16,
            ),
        }
    }

    #[inline]
    fn push(&self, identity: ComponentIdentity, priority: Priority) {
        self.entries.entry(identity).or_default().push(priority);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sort the ledger into its final order.
    fn into_ranked(
        self,
        category: Category,
        collapsed: &mut Vec<CollapsedDeclaration>,
    ) -> Result<RankedList> {
        let mut declared: Vec<(ComponentIdentity, Vec<Priority>)> =
            self.entries.into_iter().collect();
        // Visit identities in a stable order so the reported conflict does not
        // depend on shard iteration order.
        declared.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut records = Vec::with_capacity(declared.len());
        for (identity, mut priorities) in declared {
            priorities.sort_unstable();
            let declarations = priorities.len();
            priorities.dedup();

            if let [first, second, ..] = priorities[..] {
                return Err(DiError::ConflictingPriority {
                    category,
                    identity,
                    first,
                    second,
                });
            }

            if declarations > 1 {
                #[cfg(feature = "logging")]
                warn!(
                    target: "di_enablement",
                    category = %category,
                    component = identity.name(),
                    priority = priorities[0].value(),
                    declarations,
                    "Component enabled globally more than once with the same priority; keeping one"
                );

                collapsed.push(CollapsedDeclaration {
                    category,
                    identity: identity.clone(),
                    priority: priorities[0],
                    declarations,
                });
            }

            records.push(EnablementRecord::ranked(identity, priorities[0]));
        }

        records.sort_by(EnablementRecord::compare);
        Ok(RankedList::from_sorted(records))
    }
}

/// Scan-phase collector of globally enabled alternatives, interceptors and
/// decorators.
///
/// All appends take `&self` and are safe from any number of threads. No
/// uniqueness check happens here; repeated declarations are reconciled by
/// [`freeze`](Self::freeze).
///
/// # Examples
///
/// ```rust
/// use di_enablement::{ComponentIdentity, GlobalEnablementBuilder, Priority};
///
/// let builder = GlobalEnablementBuilder::new();
/// builder.add_interceptor(ComponentIdentity::class("com.acme.Tx").unwrap(), Priority::new(20));
/// builder.add_interceptor(ComponentIdentity::class("com.acme.Audit").unwrap(), Priority::new(10));
///
/// let global = builder.freeze().unwrap();
/// let names: Vec<_> = global.interceptors().iter().map(|c| c.name()).collect();
/// assert_eq!(names, ["com.acme.Audit", "com.acme.Tx"]);
/// ```
pub struct GlobalEnablementBuilder {
    alternatives: Ledger,
    interceptors: Ledger,
    decorators: Ledger,
}

impl GlobalEnablementBuilder {
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "di_enablement",
            "Creating global enablement builder"
        );

        Self {
            alternatives: Ledger::new(),
            interceptors: Ledger::new(),
            decorators: Ledger::new(),
        }
    }

    #[inline]
    fn ledger(&self, category: Category) -> &Ledger {
        match category {
            Category::Alternative => &self.alternatives,
            Category::Interceptor => &self.interceptors,
            Category::Decorator => &self.decorators,
        }
    }

    /// Record a global enablement of `identity` in `category`.
    pub fn add(&self, category: Category, identity: ComponentIdentity, priority: impl Into<Priority>) {
        let priority = priority.into();

        #[cfg(feature = "logging")]
        trace!(
            target: "di_enablement",
            category = %category,
            component = identity.name(),
            priority = priority.value(),
            "Global enablement declared"
        );

        self.ledger(category).push(identity, priority);
    }

    #[inline]
    pub fn add_alternative(&self, identity: ComponentIdentity, priority: impl Into<Priority>) {
        self.add(Category::Alternative, identity, priority);
    }

    #[inline]
    pub fn add_interceptor(&self, identity: ComponentIdentity, priority: impl Into<Priority>) {
        self.add(Category::Interceptor, identity, priority);
    }

    #[inline]
    pub fn add_decorator(&self, identity: ComponentIdentity, priority: impl Into<Priority>) {
        self.add(Category::Decorator, identity, priority);
    }

    /// Run every scanner on its own thread against this builder and wait for
    /// all of them.
    ///
    /// Returning from this call is the barrier the freeze relies on: no
    /// scanner started here can still be appending afterwards.
    pub fn scan_parallel<I, F>(&self, scanners: I)
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(&Self) + Send,
    {
        thread::scope(|s| {
            for scanner in scanners {
                s.spawn(move || scanner(self));
            }
        });
    }

    /// Number of distinct identities declared so far in `category`.
    #[inline]
    pub fn len(&self, category: Category) -> usize {
        self.ledger(category).len()
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.len(*c) == 0)
    }

    /// End the scan phase and sort every category once.
    ///
    /// The caller must have joined every scanner before calling this; taking
    /// `self` by value enforces it for scanners that borrowed the builder.
    ///
    /// Repeated declarations of one identity with the same priority collapse
    /// into one record and are reported by
    /// [`GlobalEnablement::collapsed_declarations`]. Different priorities for one identity fail with
    /// [`DiError::ConflictingPriority`].
    pub fn freeze(self) -> Result<GlobalEnablement> {
        let mut collapsed = Vec::new();
        let global = GlobalEnablement {
            alternatives: self
                .alternatives
                .into_ranked(Category::Alternative, &mut collapsed)?,
            interceptors: self
                .interceptors
                .into_ranked(Category::Interceptor, &mut collapsed)?,
            decorators: self
                .decorators
                .into_ranked(Category::Decorator, &mut collapsed)?,
            alternative_ranks: OnceCell::new(),
            collapsed,
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "di_enablement",
            alternatives = global.alternatives.len(),
            interceptors = global.interceptors.len(),
            decorators = global.decorators.len(),
            "Global enablement frozen"
        );

        Ok(global)
    }
}

impl Default for GlobalEnablementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GlobalEnablementBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalEnablementBuilder")
            .field("alternatives", &self.alternatives.len())
            .field("interceptors", &self.interceptors.len())
            .field("decorators", &self.decorators.len())
            .finish()
    }
}

// =============================================================================
// Frozen snapshot (read phase)
// =============================================================================

/// A component enabled globally more than once with the same priority, kept
/// as a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedDeclaration {
    pub category: Category,
    pub identity: ComponentIdentity,
    pub priority: Priority,
    /// How many times it was declared.
    pub declarations: usize,
}

impl fmt::Display for CollapsedDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} enabled globally {} times with priority {}; kept once",
            self.category, self.identity, self.declarations, self.priority
        )
    }
}

/// One category in final order.
struct RankedList {
    identities: Vec<ComponentIdentity>,
    priorities: Vec<Priority>,
    members: HashSet<ComponentIdentity, RandomState>,
}

impl RankedList {
    fn from_sorted(records: Vec<EnablementRecord>) -> Self {
        let mut identities = Vec::with_capacity(records.len());
        let mut priorities = Vec::with_capacity(records.len());
        for record in records {
            if let Some(priority) = record.priority() {
                priorities.push(priority);
                identities.push(record.into_identity());
            }
        }
        let members = identities.iter().cloned().collect();
        Self {
            identities,
            priorities,
            members,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.identities.len()
    }

    fn records(&self) -> impl Iterator<Item = (&ComponentIdentity, Priority)> {
        self.identities.iter().zip(self.priorities.iter().copied())
    }
}

/// Rank of each globally enabled alternative: its position in final sorted
/// order, 0 being the highest priority.
#[derive(Debug, Clone, Default)]
pub struct AlternativeRanks {
    ranks: HashMap<ComponentIdentity, usize, RandomState>,
}

impl AlternativeRanks {
    fn from_sorted(alternatives: &[ComponentIdentity]) -> Self {
        let ranks = alternatives
            .iter()
            .enumerate()
            .map(|(rank, identity)| (identity.clone(), rank))
            .collect();
        Self { ranks }
    }

    #[inline]
    pub fn get(&self, identity: &ComponentIdentity) -> Option<usize> {
        self.ranks.get(identity).copied()
    }

    #[inline]
    pub fn contains(&self, identity: &ComponentIdentity) -> bool {
        self.ranks.contains_key(identity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentIdentity, usize)> {
        self.ranks.iter().map(|(identity, rank)| (identity, *rank))
    }
}

/// Immutable, sorted view of every globally enabled component.
///
/// Accessors return the same slices on every call; nothing is re-sorted. The
/// alternative rank map is built on first request and shared afterwards.
pub struct GlobalEnablement {
    alternatives: RankedList,
    interceptors: RankedList,
    decorators: RankedList,
    alternative_ranks: OnceCell<Arc<AlternativeRanks>>,
    collapsed: Vec<CollapsedDeclaration>,
}

impl GlobalEnablement {
    /// A snapshot with nothing enabled globally.
    pub fn empty() -> Self {
        Self {
            alternatives: RankedList::from_sorted(Vec::new()),
            interceptors: RankedList::from_sorted(Vec::new()),
            decorators: RankedList::from_sorted(Vec::new()),
            alternative_ranks: OnceCell::new(),
            collapsed: Vec::new(),
        }
    }

    #[inline]
    fn list(&self, category: Category) -> &RankedList {
        match category {
            Category::Alternative => &self.alternatives,
            Category::Interceptor => &self.interceptors,
            Category::Decorator => &self.decorators,
        }
    }

    /// Identities of `category` in final order, priorities stripped.
    #[inline]
    pub fn list_of(&self, category: Category) -> &[ComponentIdentity] {
        &self.list(category).identities
    }

    #[inline]
    pub fn alternatives(&self) -> &[ComponentIdentity] {
        self.list_of(Category::Alternative)
    }

    #[inline]
    pub fn interceptors(&self) -> &[ComponentIdentity] {
        self.list_of(Category::Interceptor)
    }

    #[inline]
    pub fn decorators(&self) -> &[ComponentIdentity] {
        self.list_of(Category::Decorator)
    }

    /// Whether `identity` is globally enabled in `category`.
    #[inline]
    pub fn contains(&self, category: Category, identity: &ComponentIdentity) -> bool {
        self.list(category).members.contains(identity)
    }

    /// The priority `identity` was enabled with in `category`, if any.
    pub fn priority_of(&self, category: Category, identity: &ComponentIdentity) -> Option<Priority> {
        self.list(category)
            .records()
            .find(|(candidate, _)| *candidate == identity)
            .map(|(_, priority)| priority)
    }

    /// Repeated same-priority global declarations merged by the freeze, in
    /// category then name order.
    #[inline]
    pub fn collapsed_declarations(&self) -> &[CollapsedDeclaration] {
        &self.collapsed
    }

    /// Identity to rank mapping of the global alternatives.
    pub fn alternative_ranks(&self) -> Arc<AlternativeRanks> {
        Arc::clone(self.alternative_ranks.get_or_init(|| {
            #[cfg(feature = "logging")]
            trace!(
                target: "di_enablement",
                alternatives = self.alternatives.len(),
                "Computing global alternative ranks"
            );
            Arc::new(AlternativeRanks::from_sorted(&self.alternatives.identities))
        }))
    }

    /// Release every list once bootstrap is over.
    ///
    /// Per-module results keep their own copies (and the shared rank map), so
    /// nothing at runtime depends on the snapshot after this.
    pub fn cleanup_after_boot(self) {
        #[cfg(feature = "logging")]
        debug!(
            target: "di_enablement",
            alternatives = self.alternatives.len(),
            interceptors = self.interceptors.len(),
            decorators = self.decorators.len(),
            "Releasing global enablement after boot"
        );
        drop(self);
    }
}

impl Default for GlobalEnablement {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for GlobalEnablement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = |list: &RankedList| {
            list.records()
                .map(|(identity, priority)| format!("{identity}@{priority}"))
                .collect::<Vec<_>>()
        };
        f.debug_struct("GlobalEnablement")
            .field("alternatives", &entries(&self.alternatives))
            .field("interceptors", &entries(&self.interceptors))
            .field("decorators", &entries(&self.decorators))
            .field("collapsed", &self.collapsed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> ComponentIdentity {
        ComponentIdentity::class(name).unwrap()
    }

    fn names(list: &[ComponentIdentity]) -> Vec<&str> {
        list.iter().map(ComponentIdentity::name).collect()
    }

    #[test]
    fn test_sorted_by_priority_then_name() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_interceptor(class("com.acme.C"), 30);
        builder.add_interceptor(class("com.acme.B"), 10);
        builder.add_interceptor(class("com.acme.A"), 10);

        let global = builder.freeze().unwrap();
        assert_eq!(
            names(global.interceptors()),
            ["com.acme.A", "com.acme.B", "com.acme.C"]
        );
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let decorators = [("x.D1", 5), ("x.D2", 5), ("x.D0", 1), ("x.D3", 5)];

        let forward = GlobalEnablementBuilder::new();
        for (name, priority) in decorators {
            forward.add_decorator(class(name), priority);
        }
        let backward = GlobalEnablementBuilder::new();
        for (name, priority) in decorators.iter().rev() {
            backward.add_decorator(class(name), *priority);
        }

        let forward = forward.freeze().unwrap();
        let backward = backward.freeze().unwrap();
        assert_eq!(forward.decorators(), backward.decorators());
        assert_eq!(names(forward.decorators()), ["x.D0", "x.D1", "x.D2", "x.D3"]);
    }

    #[test]
    fn test_accessors_return_the_same_slice() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_alternative(class("x.B"), 2);
        builder.add_alternative(class("x.A"), 1);
        let global = builder.freeze().unwrap();

        let first = global.alternatives();
        for _ in 0..10 {
            assert!(std::ptr::eq(first, global.alternatives()));
        }
        assert_eq!(names(first), ["x.A", "x.B"]);
    }

    #[test]
    fn test_alternative_ranks_cached() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_alternative(class("x.Y"), 20);
        builder.add_alternative(class("x.X"), 10);
        let global = builder.freeze().unwrap();

        let ranks = global.alternative_ranks();
        assert_eq!(ranks.get(&class("x.X")), Some(0));
        assert_eq!(ranks.get(&class("x.Y")), Some(1));
        assert_eq!(ranks.get(&class("x.Z")), None);
        assert!(Arc::ptr_eq(&ranks, &global.alternative_ranks()));
    }

    #[test]
    fn test_same_priority_twice_collapses() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_interceptor(class("x.Audit"), 100);
        builder.add_interceptor(class("x.Audit"), 100);
        let global = builder.freeze().unwrap();

        assert_eq!(names(global.interceptors()), ["x.Audit"]);
        assert_eq!(
            global.priority_of(Category::Interceptor, &class("x.Audit")),
            Some(Priority::new(100))
        );

        let collapsed = global.collapsed_declarations();
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[0].category, Category::Interceptor);
        assert_eq!(collapsed[0].identity, class("x.Audit"));
        assert_eq!(collapsed[0].declarations, 2);
        assert!(collapsed[0].to_string().contains("x.Audit"));
    }

    #[test]
    fn test_single_declarations_are_not_reported() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_interceptor(class("x.A"), 1);
        builder.add_decorator(class("x.A"), 1);
        let global = builder.freeze().unwrap();
        assert!(global.collapsed_declarations().is_empty());
    }

    #[test]
    fn test_conflicting_priorities_fail_freeze() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_decorator(class("x.Deco"), 7);
        builder.add_decorator(class("x.Deco"), 3);

        match builder.freeze() {
            Err(DiError::ConflictingPriority {
                category,
                identity,
                first,
                second,
            }) => {
                assert_eq!(category, Category::Decorator);
                assert_eq!(identity, class("x.Deco"));
                assert_eq!((first.value(), second.value()), (3, 7));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_categories_are_independent() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_interceptor(class("x.Shared"), 1);
        builder.add_decorator(class("x.Shared"), 2);
        let global = builder.freeze().unwrap();

        assert!(global.contains(Category::Interceptor, &class("x.Shared")));
        assert!(global.contains(Category::Decorator, &class("x.Shared")));
        assert!(!global.contains(Category::Alternative, &class("x.Shared")));
    }

    #[test]
    fn test_concurrent_scanners() {
        let builder = GlobalEnablementBuilder::new();

        thread::scope(|s| {
            for t in 0..8 {
                let builder = &builder;
                s.spawn(move || {
                    for i in 0..50 {
                        builder.add_interceptor(class(&format!("scan{t}.I{i:02}")), i);
                    }
                });
            }
        });

        assert_eq!(builder.len(Category::Interceptor), 400);
        let global = builder.freeze().unwrap();
        let interceptors = global.interceptors();
        assert_eq!(interceptors.len(), 400);
        // priority 0 group, sorted by name across scanners
        assert_eq!(interceptors[0].name(), "scan0.I00");
        assert_eq!(interceptors[7].name(), "scan7.I00");
        assert_eq!(interceptors[399].name(), "scan7.I49");
    }

    #[test]
    fn test_scan_parallel_joins_every_scanner() {
        let builder = GlobalEnablementBuilder::new();
        let scanners = (0..4).map(|module| {
            move |b: &GlobalEnablementBuilder| {
                b.add_alternative(class(&format!("m{module}.Alt")), 100 - module);
            }
        });
        builder.scan_parallel(scanners);

        let global = builder.freeze().unwrap();
        assert_eq!(
            names(global.alternatives()),
            ["m3.Alt", "m2.Alt", "m1.Alt", "m0.Alt"]
        );
    }

    #[test]
    fn test_empty_snapshot() {
        let global = GlobalEnablement::empty();
        assert!(global.interceptors().is_empty());
        assert!(global.alternative_ranks().is_empty());
        global.cleanup_after_boot();
    }
}
