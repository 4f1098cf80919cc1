//! Class-by-name resolution
//!
//! Turning a textual reference from a descriptor into a [`ComponentIdentity`]
//! is the job of the hosting container's class loading. [`ClassResolver`] is
//! the seam; [`StaticClassResolver`] is an in-memory implementation for
//! embedders that know their types up front, and for tests.

use crate::descriptor::{Declaration, DescriptorSection, ModuleId};
use crate::error::LoadError;
use crate::identity::{ComponentIdentity, TypeKind};
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;

#[cfg(feature = "logging")]
use tracing::trace;

/// Resolves textual type names visible to a module.
pub trait ClassResolver: Send + Sync {
    /// Look up a type by its fully-qualified name.
    fn class_for_name(&self, name: &str) -> std::result::Result<ComponentIdentity, LoadError>;
}

impl<F> ClassResolver for F
where
    F: Fn(&str) -> std::result::Result<ComponentIdentity, LoadError> + Send + Sync,
{
    #[inline]
    fn class_for_name(&self, name: &str) -> std::result::Result<ComponentIdentity, LoadError> {
        self(name)
    }
}

/// Resolve one descriptor declaration, checking it has the kind its section
/// requires.
///
/// Any failure is wrapped into [`DiError::UnresolvableReference`] carrying the
/// module, the reference text and its declaration location.
pub fn resolve_declaration(
    resolver: &dyn ClassResolver,
    module: &ModuleId,
    section: DescriptorSection,
    declaration: &Declaration,
) -> Result<ComponentIdentity> {
    let wrap = |source| {
        DiError::unresolvable(
            module.clone(),
            declaration.reference(),
            declaration.location().clone(),
            source,
        )
    };

    let identity = resolver
        .class_for_name(declaration.reference())
        .map_err(wrap)?;

    let expected = section.expected_kind();
    if identity.kind() != expected {
        return Err(wrap(LoadError::WrongKind {
            name: declaration.reference().to_owned(),
            expected,
            found: identity.kind(),
        }));
    }

    #[cfg(feature = "logging")]
    trace!(
        target: "di_enablement",
        reference = declaration.reference(),
        location = declaration.location().as_str(),
        section = %section,
        "Resolved descriptor reference"
    );

    Ok(identity)
}

/// In-memory resolver backed by a concurrent map of known types.
///
/// # Examples
///
/// ```rust
/// use di_enablement::{ClassResolver, StaticClassResolver};
///
/// let resolver = StaticClassResolver::new();
/// resolver.register_class("com.acme.Audit").unwrap();
///
/// assert!(resolver.class_for_name("com.acme.Audit").is_ok());
/// assert!(resolver.class_for_name("com.acme.Missing").is_err());
/// ```
#[derive(Debug)]
pub struct StaticClassResolver {
    types: DashMap<String, ComponentIdentity, RandomState>,
}

impl StaticClassResolver {
    pub fn new() -> Self {
        Self {
            types: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Make a type visible, returning its identity.
    pub fn register(&self, name: &str, kind: TypeKind) -> Result<ComponentIdentity> {
        let identity = ComponentIdentity::new(name, kind)?;
        self.types.insert(name.to_owned(), identity.clone());
        Ok(identity)
    }

    #[inline]
    pub fn register_class(&self, name: &str) -> Result<ComponentIdentity> {
        self.register(name, TypeKind::Class)
    }

    #[inline]
    pub fn register_annotation(&self, name: &str) -> Result<ComponentIdentity> {
        self.register(name, TypeKind::Annotation)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for StaticClassResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassResolver for StaticClassResolver {
    fn class_for_name(&self, name: &str) -> std::result::Result<ComponentIdentity, LoadError> {
        self.types
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LoadError::NotFound {
                name: name.to_owned(),
            })
    }
}
