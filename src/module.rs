//! Resolved per-module enablement
//!
//! [`ModuleEnablement`] is what the rest of the container consumes once
//! bootstrap is over: the final interceptor and decorator order for the module,
//! and the data needed to pick among alternatives. It is immutable and
//! `Send + Sync`, so a single `Arc<ModuleEnablement>` serves every invocation
//! thread.

use crate::descriptor::ModuleId;
use crate::identity::ComponentIdentity;
use crate::registry::AlternativeRanks;
use ahash::RandomState;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn positions(list: &[ComponentIdentity]) -> HashMap<ComponentIdentity, usize, RandomState> {
    let mut map = HashMap::with_capacity_and_hasher(list.len(), RandomState::new());
    for (position, identity) in list.iter().enumerate() {
        map.entry(identity.clone()).or_insert(position);
    }
    map
}

/// Final enablement of one module.
pub struct ModuleEnablement {
    module: ModuleId,
    interceptors: Vec<ComponentIdentity>,
    interceptor_positions: HashMap<ComponentIdentity, usize, RandomState>,
    decorators: Vec<ComponentIdentity>,
    decorator_positions: HashMap<ComponentIdentity, usize, RandomState>,
    alternative_ranks: Arc<AlternativeRanks>,
    local_alternative_classes: HashSet<ComponentIdentity, RandomState>,
    local_alternative_stereotypes: HashSet<ComponentIdentity, RandomState>,
}

impl ModuleEnablement {
    pub(crate) fn new(
        module: ModuleId,
        interceptors: Vec<ComponentIdentity>,
        decorators: Vec<ComponentIdentity>,
        alternative_ranks: Arc<AlternativeRanks>,
        local_alternative_classes: HashSet<ComponentIdentity, RandomState>,
        local_alternative_stereotypes: HashSet<ComponentIdentity, RandomState>,
    ) -> Self {
        Self {
            module,
            interceptor_positions: positions(&interceptors),
            interceptors,
            decorator_positions: positions(&decorators),
            decorators,
            alternative_ranks,
            local_alternative_classes,
            local_alternative_stereotypes,
        }
    }

    #[inline]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    // =========================================================================
    // Interceptors and decorators
    // =========================================================================

    /// Enabled interceptors: global ones in priority order, then the module's
    /// own in declaration order.
    #[inline]
    pub fn interceptors(&self) -> &[ComponentIdentity] {
        &self.interceptors
    }

    /// Enabled decorators, ordered like [`interceptors`](Self::interceptors).
    #[inline]
    pub fn decorators(&self) -> &[ComponentIdentity] {
        &self.decorators
    }

    #[inline]
    pub fn is_interceptor_enabled(&self, identity: &ComponentIdentity) -> bool {
        self.interceptor_positions.contains_key(identity)
    }

    #[inline]
    pub fn is_decorator_enabled(&self, identity: &ComponentIdentity) -> bool {
        self.decorator_positions.contains_key(identity)
    }

    #[inline]
    pub fn interceptor_position(&self, identity: &ComponentIdentity) -> Option<usize> {
        self.interceptor_positions.get(identity).copied()
    }

    #[inline]
    pub fn decorator_position(&self, identity: &ComponentIdentity) -> Option<usize> {
        self.decorator_positions.get(identity).copied()
    }

    /// Order two interceptors by their position. `None` if either is not
    /// enabled in this module.
    pub fn compare_interceptors(
        &self,
        a: &ComponentIdentity,
        b: &ComponentIdentity,
    ) -> Option<Ordering> {
        Some(self.interceptor_position(a)?.cmp(&self.interceptor_position(b)?))
    }

    /// Order two decorators by their position. `None` if either is not enabled
    /// in this module.
    pub fn compare_decorators(
        &self,
        a: &ComponentIdentity,
        b: &ComponentIdentity,
    ) -> Option<Ordering> {
        Some(self.decorator_position(a)?.cmp(&self.decorator_position(b)?))
    }

    // =========================================================================
    // Alternatives
    // =========================================================================

    /// Whether the module selects this alternative class in its descriptor.
    #[inline]
    pub fn is_enabled_alternative_class(&self, identity: &ComponentIdentity) -> bool {
        self.local_alternative_classes.contains(identity)
    }

    /// Whether the module selects this alternative stereotype in its descriptor.
    #[inline]
    pub fn is_enabled_alternative_stereotype(&self, stereotype: &ComponentIdentity) -> bool {
        self.local_alternative_stereotypes.contains(stereotype)
    }

    /// Whether an alternative with these stereotypes is selected in this
    /// module, by class or by any of its stereotypes.
    pub fn is_selected_alternative(
        &self,
        identity: &ComponentIdentity,
        stereotypes: &[ComponentIdentity],
    ) -> bool {
        self.is_enabled_alternative_class(identity)
            || stereotypes
                .iter()
                .any(|s| self.is_enabled_alternative_stereotype(s))
    }

    /// Global rank of an alternative, 0 being the highest priority.
    #[inline]
    pub fn alternative_rank(&self, identity: &ComponentIdentity) -> Option<usize> {
        self.alternative_ranks.get(identity)
    }

    /// The rank map shared by every module of the deployment.
    #[inline]
    pub fn global_alternatives(&self) -> &Arc<AlternativeRanks> {
        &self.alternative_ranks
    }

    pub fn local_alternative_classes(&self) -> impl Iterator<Item = &ComponentIdentity> {
        self.local_alternative_classes.iter()
    }

    pub fn local_alternative_stereotypes(&self) -> impl Iterator<Item = &ComponentIdentity> {
        self.local_alternative_stereotypes.iter()
    }
}

impl std::fmt::Debug for ModuleEnablement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEnablement")
            .field("module", &self.module)
            .field("interceptors", &self.interceptors)
            .field("decorators", &self.decorators)
            .field("global_alternatives", &self.alternative_ranks.len())
            .field("local_alternative_classes", &self.local_alternative_classes)
            .field(
                "local_alternative_stereotypes",
                &self.local_alternative_stereotypes,
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> ComponentIdentity {
        ComponentIdentity::class(name).unwrap()
    }

    fn enablement() -> ModuleEnablement {
        let stereotype = ComponentIdentity::annotation("x.Mock").unwrap();
        ModuleEnablement::new(
            ModuleId::new("m"),
            vec![class("x.I1"), class("x.I2")],
            vec![class("x.D1")],
            Arc::new(AlternativeRanks::default()),
            [class("x.Alt")].into_iter().collect(),
            [stereotype].into_iter().collect(),
        )
    }

    #[test]
    fn test_positions() {
        let module = enablement();
        assert_eq!(module.interceptor_position(&class("x.I2")), Some(1));
        assert_eq!(module.decorator_position(&class("x.D1")), Some(0));
        assert!(!module.is_interceptor_enabled(&class("x.D1")));
        assert_eq!(
            module.compare_interceptors(&class("x.I2"), &class("x.I1")),
            Some(Ordering::Greater)
        );
        assert_eq!(
            module.compare_interceptors(&class("x.I2"), &class("x.Nope")),
            None
        );
    }

    #[test]
    fn test_alternative_selection() {
        let module = enablement();
        let mock = ComponentIdentity::annotation("x.Mock").unwrap();
        assert!(module.is_selected_alternative(&class("x.Alt"), &[]));
        assert!(module.is_selected_alternative(&class("x.Other"), &[mock]));
        assert!(!module.is_selected_alternative(&class("x.Other"), &[]));
        assert_eq!(module.alternative_rank(&class("x.Alt")), None);
    }

    #[test]
    fn test_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModuleEnablement>();
    }
}
