//! Duplicate and cross-scope conflict detection
//!
//! Two rules:
//!
//! - the same reference twice in one descriptor section is a fatal
//!   [`DiError::DuplicateDeclaration`], and so are two references that
//!   resolve to the same component;
//! - a local declaration of something already enabled globally is only a
//!   [`RedundantDeclaration`] warning, and the local entry is dropped so the
//!   component is invoked once, at its global position.

use crate::config::RedundantPolicy;
use crate::descriptor::{Declaration, DescriptorSection, Location, ModuleId};
use crate::identity::{Category, ComponentIdentity};
use crate::registry::GlobalEnablement;
use crate::{DiError, Result};
use ahash::RandomState;
use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "logging")]
use tracing::warn;

/// Fail if any reference occurs twice in one section of a descriptor.
///
/// The error names the second occurrence and the location of the first.
pub fn check_for_duplicates(
    module: &ModuleId,
    section: DescriptorSection,
    declarations: &[Declaration],
) -> Result<()> {
    let mut seen: HashMap<&str, &Location, RandomState> =
        HashMap::with_capacity_and_hasher(declarations.len(), RandomState::new());

    for declaration in declarations {
        if let Some(previous) = seen.insert(declaration.reference(), declaration.location()) {
            return Err(DiError::DuplicateDeclaration {
                module: module.clone(),
                section,
                value: declaration.reference().to_owned(),
                location: declaration.location().clone(),
                previous: previous.clone(),
            });
        }
    }
    Ok(())
}

/// Fail if two resolved declarations of one section name the same component.
///
/// Catches spellings that differ as text but load the same type. The error
/// names the component and both locations.
pub fn check_for_resolved_duplicates(
    module: &ModuleId,
    section: DescriptorSection,
    resolved: &[(ComponentIdentity, Location)],
) -> Result<()> {
    let mut seen: HashMap<&ComponentIdentity, &Location, RandomState> =
        HashMap::with_capacity_and_hasher(resolved.len(), RandomState::new());

    for (identity, location) in resolved {
        if let Some(previous) = seen.insert(identity, location) {
            return Err(DiError::DuplicateDeclaration {
                module: module.clone(),
                section,
                value: identity.name().to_owned(),
                location: location.clone(),
                previous: previous.clone(),
            });
        }
    }
    Ok(())
}

/// A local declaration suppressed because the component is already enabled
/// for the whole application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundantDeclaration {
    pub module: ModuleId,
    pub category: Category,
    pub identity: ComponentIdentity,
    pub location: Location,
}

impl fmt::Display for RedundantDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} declared at {} is enabled for the application and also in module {}; \
             the module declaration is ignored",
            self.category, self.identity, self.location, self.module
        )
    }
}

/// Drop local entries that are already globally enabled in `category`.
///
/// Kept entries retain their declaration order. Under
/// [`RedundantPolicy::Reject`] the first overlap is returned as an error
/// instead.
pub fn filter_redundant(
    module: &ModuleId,
    category: Category,
    local: Vec<(ComponentIdentity, Location)>,
    global: &GlobalEnablement,
    policy: RedundantPolicy,
    warnings: &mut Vec<RedundantDeclaration>,
) -> Result<Vec<ComponentIdentity>> {
    let mut kept = Vec::with_capacity(local.len());

    for (identity, location) in local {
        if !global.contains(category, &identity) {
            kept.push(identity);
            continue;
        }

        if policy == RedundantPolicy::Reject {
            return Err(DiError::RedundantDeclaration {
                module: module.clone(),
                category,
                identity,
            });
        }

        #[cfg(feature = "logging")]
        warn!(
            target: "di_enablement",
            module = module.as_str(),
            category = %category,
            component = identity.name(),
            location = location.as_str(),
            "Component enabled for the application and also in module descriptor; ignoring module declaration"
        );

        warnings.push(RedundantDeclaration {
            module: module.clone(),
            category,
            identity,
            location,
        });
    }

    Ok(kept)
}
