//! Error types for enablement resolution
//!
//! Every variant except [`DiError::UnsatisfiedContract`] and
//! [`DiError::AmbiguousContract`] is a deployment error: it aborts bootstrap of
//! the whole application and is never retried.

use crate::descriptor::{DescriptorSection, Location, ModuleId};
use crate::identity::{Category, ComponentIdentity, Priority, TypeKind};
use thiserror::Error;

/// Errors raised by a [`ClassResolver`](crate::ClassResolver) when a textual
/// name cannot be turned into an identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No type with that name is visible to the module
    #[error("type not found: {name}")]
    NotFound { name: String },

    /// The type exists but is not of the required kind
    #[error("{name} is a {found}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: TypeKind,
        found: TypeKind,
    },

    /// Any other loading failure reported by the collaborator
    #[error("{0}")]
    Other(String),
}

/// Errors that can occur while building or consulting enablement data
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Null or malformed input reaching a primitive
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Same identity declared twice in one section of one module descriptor
    #[error(
        "{section} {value} specified twice in module {module}: at {location} and previously at {previous}"
    )]
    DuplicateDeclaration {
        module: ModuleId,
        section: DescriptorSection,
        value: String,
        location: Location,
        previous: Location,
    },

    /// Same identity enabled globally twice with different priorities
    #[error("{category} {identity} enabled globally with conflicting priorities {first} and {second}")]
    ConflictingPriority {
        category: Category,
        identity: ComponentIdentity,
        first: Priority,
        second: Priority,
    },

    /// Descriptor entry that cannot be resolved to a type
    #[error("Error loading {reference} defined in {location} of module {module}: {source}")]
    UnresolvableReference {
        module: ModuleId,
        reference: String,
        location: Location,
        #[source]
        source: LoadError,
    },

    /// Local declaration of a globally enabled component, when running with
    /// [`RedundantPolicy::Reject`](crate::RedundantPolicy::Reject)
    #[error("{category} {identity} is enabled for the application and also in module {module}")]
    RedundantDeclaration {
        module: ModuleId,
        category: Category,
        identity: ComponentIdentity,
    },

    /// No eligible implementation of a contract in a module
    #[error("Unsatisfied dependency: no enabled implementation of {contract} in module {module}")]
    UnsatisfiedContract { module: ModuleId, contract: String },

    /// Several eligible implementations and no rule to pick one
    #[error("Ambiguous dependency: {contract} in module {module} resolves to {candidates:?}")]
    AmbiguousContract {
        module: ModuleId,
        contract: String,
        candidates: Vec<ComponentIdentity>,
    },

    /// Internal error
    #[error("Internal enablement error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create an InvalidArgument error
    #[inline]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create an UnresolvableReference error for a declaration that failed to load
    #[inline]
    pub fn unresolvable(
        module: ModuleId,
        reference: impl Into<String>,
        location: Location,
        source: LoadError,
    ) -> Self {
        Self::UnresolvableReference {
            module,
            reference: reference.into(),
            location,
            source,
        }
    }

    /// True for errors that abort bootstrap
    #[inline]
    pub fn is_deployment_error(&self) -> bool {
        !matches!(
            self,
            Self::UnsatisfiedContract { .. } | Self::AmbiguousContract { .. }
        )
    }
}

/// Result type alias for enablement operations
pub type Result<T> = std::result::Result<T, DiError>;
