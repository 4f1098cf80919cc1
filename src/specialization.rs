//! Specialization closure
//!
//! A specializing bean replaces the bean it specializes everywhere. This
//! records `specialized -> specializing` pairs and answers which bean a chain
//! of specializations ends at.

use crate::identity::ComponentIdentity;
use crate::{DiError, Result};
use ahash::RandomState;
use std::collections::HashMap;

/// Known specializations of one deployment.
#[derive(Debug, Clone, Default)]
pub struct Specializations {
    overrides: HashMap<ComponentIdentity, ComponentIdentity, RandomState>,
}

impl Specializations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `specializing` specializes `target`.
    ///
    /// Fails if `target` is already specialized by another bean, or if the
    /// pair would close a cycle.
    pub fn add(&mut self, target: ComponentIdentity, specializing: ComponentIdentity) -> Result<()> {
        if let Some(existing) = self.overrides.get(&target) {
            if *existing == specializing {
                return Ok(());
            }
            return Err(DiError::invalid_argument(format!(
                "{target} is specialized by both {existing} and {specializing}"
            )));
        }
        if self.most_specialized(&specializing) == &target {
            return Err(DiError::invalid_argument(format!(
                "specializing {target} with {specializing} creates a cycle"
            )));
        }
        self.overrides.insert(target, specializing);
        Ok(())
    }

    /// The bean directly specializing `target`, if any.
    #[inline]
    pub fn specialized_by(&self, target: &ComponentIdentity) -> Option<&ComponentIdentity> {
        self.overrides.get(target)
    }

    #[inline]
    pub fn is_specialized(&self, target: &ComponentIdentity) -> bool {
        self.overrides.contains_key(target)
    }

    /// Follow the specialization chain from `bean` to its end.
    pub fn most_specialized<'a>(&'a self, bean: &'a ComponentIdentity) -> &'a ComponentIdentity {
        let mut most = bean;
        while let Some(next) = self.overrides.get(most) {
            most = next;
        }
        most
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}
