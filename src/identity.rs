//! Component identities, priorities and the enablement ordering primitive
//!
//! Every interceptor, decorator and alternative is known to the container by a
//! [`ComponentIdentity`]: its fully-qualified type name plus whether that type
//! is a class or an annotation (stereotype).
//!
//! An [`EnablementRecord`] is one declared enablement of such a component. It is
//! either globally ranked (it carries a [`Priority`]) or locally declared in a
//! module descriptor (it carries its position in that descriptor). The two
//! variants never compare by priority against each other: ranked records always
//! come first, local records follow in declaration order.

use crate::{DiError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// =============================================================================
// ComponentIdentity
// =============================================================================

/// What kind of type an identity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    /// A concrete class (interceptor, decorator, bean).
    Class,
    /// An annotation type (stereotype).
    Annotation,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => f.write_str("class"),
            Self::Annotation => f.write_str("annotation"),
        }
    }
}

/// Stable identity of a component type.
///
/// Cheap to clone (the name is shared). Equality, hashing and ordering use the
/// fully-qualified name and the kind, never any address or insertion index, so
/// the same deployment orders identically across restarts.
///
/// # Examples
///
/// ```rust
/// use di_enablement::ComponentIdentity;
///
/// let a = ComponentIdentity::class("com.acme.Audit").unwrap();
/// let b = ComponentIdentity::class("com.acme.Audit").unwrap();
/// assert_eq!(a, b);
///
/// assert!(ComponentIdentity::class("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentIdentity {
    name: Arc<str>,
    kind: TypeKind,
}

impl ComponentIdentity {
    /// Create an identity, validating the name.
    ///
    /// The name must be non-empty, contain no whitespace, and have no empty
    /// dot-separated segment.
    pub fn new(name: impl AsRef<str>, kind: TypeKind) -> Result<Self> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(DiError::invalid_argument("component name must not be empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(DiError::invalid_argument(format!(
                "component name '{name}' contains whitespace"
            )));
        }
        if name.split('.').any(str::is_empty) {
            return Err(DiError::invalid_argument(format!(
                "component name '{name}' has an empty segment"
            )));
        }
        Ok(Self {
            name: Arc::from(name),
            kind,
        })
    }

    /// Shorthand for a class identity.
    #[inline]
    pub fn class(name: impl AsRef<str>) -> Result<Self> {
        Self::new(name, TypeKind::Class)
    }

    /// Shorthand for an annotation identity.
    #[inline]
    pub fn annotation(name: impl AsRef<str>) -> Result<Self> {
        Self::new(name, TypeKind::Annotation)
    }

    /// Fully-qualified textual name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }
}

impl fmt::Debug for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TypeKind::Class => write!(f, "{}", self.name),
            TypeKind::Annotation => write!(f, "@{}", self.name),
        }
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// =============================================================================
// Priority
// =============================================================================

/// Numeric priority of a globally enabled component. Lower values run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(i32);

impl Priority {
    /// Start of the range for early platform components.
    pub const PLATFORM_BEFORE: Priority = Priority(0);
    /// Start of the range for early library components.
    pub const LIBRARY_BEFORE: Priority = Priority(1000);
    /// Start of the range for application components.
    pub const APPLICATION: Priority = Priority(2000);
    /// Start of the range for late library components.
    pub const LIBRARY_AFTER: Priority = Priority(3000);
    /// Start of the range for late platform components.
    pub const PLATFORM_AFTER: Priority = Priority(4000);

    #[inline]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for Priority {
    #[inline]
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Category
// =============================================================================

/// The three kinds of globally enabled components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Alternative,
    Interceptor,
    Decorator,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Alternative, Self::Interceptor, Self::Decorator];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alternative => f.write_str("alternative"),
            Self::Interceptor => f.write_str("interceptor"),
            Self::Decorator => f.write_str("decorator"),
        }
    }
}

// =============================================================================
// EnablementRecord
// =============================================================================

/// One declared enablement of an alternative, interceptor or decorator.
///
/// Two records are equal iff their identities are equal: the same component
/// re-declared with a different priority is still the same component.
#[derive(Clone)]
pub enum EnablementRecord {
    /// Enabled for the whole deployment with an explicit priority.
    GloballyRanked {
        identity: ComponentIdentity,
        priority: Priority,
    },
    /// Enabled by a module descriptor at the given list position.
    LocallyDeclared {
        identity: ComponentIdentity,
        position: usize,
    },
}

impl EnablementRecord {
    /// Create a record from an optional priority.
    ///
    /// With a priority the record is globally ranked; without one it is a
    /// local declaration at `position`.
    pub fn new(identity: ComponentIdentity, priority: Option<Priority>, position: usize) -> Self {
        match priority {
            Some(priority) => Self::GloballyRanked { identity, priority },
            None => Self::LocallyDeclared { identity, position },
        }
    }

    #[inline]
    pub fn ranked(identity: ComponentIdentity, priority: Priority) -> Self {
        Self::GloballyRanked { identity, priority }
    }

    #[inline]
    pub fn local(identity: ComponentIdentity, position: usize) -> Self {
        Self::LocallyDeclared { identity, position }
    }

    #[inline]
    pub fn identity(&self) -> &ComponentIdentity {
        match self {
            Self::GloballyRanked { identity, .. } | Self::LocallyDeclared { identity, .. } => {
                identity
            }
        }
    }

    #[inline]
    pub fn priority(&self) -> Option<Priority> {
        match self {
            Self::GloballyRanked { priority, .. } => Some(*priority),
            Self::LocallyDeclared { .. } => None,
        }
    }

    #[inline]
    pub fn into_identity(self) -> ComponentIdentity {
        match self {
            Self::GloballyRanked { identity, .. } | Self::LocallyDeclared { identity, .. } => {
                identity
            }
        }
    }

    /// Total order over records.
    ///
    /// Ranked records sort by ascending priority; equal priorities fall back to
    /// the lexicographic order of the fully-qualified name. Local records sort
    /// by descriptor position. Every ranked record sorts before every local one.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Self::GloballyRanked {
                    identity: a,
                    priority: pa,
                },
                Self::GloballyRanked {
                    identity: b,
                    priority: pb,
                },
            ) => pa
                .cmp(pb)
                .then_with(|| a.name().cmp(b.name()))
                .then_with(|| a.kind().cmp(&b.kind())),
            (
                Self::LocallyDeclared { position: a, .. },
                Self::LocallyDeclared { position: b, .. },
            ) => a.cmp(b),
            (Self::GloballyRanked { .. }, Self::LocallyDeclared { .. }) => Ordering::Less,
            (Self::LocallyDeclared { .. }, Self::GloballyRanked { .. }) => Ordering::Greater,
        }
    }
}

impl PartialEq for EnablementRecord {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for EnablementRecord {}

impl Hash for EnablementRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for EnablementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GloballyRanked { identity, priority } => {
                write!(f, "[class={identity:?}, priority={priority}]")
            }
            Self::LocallyDeclared { identity, position } => {
                write!(f, "[class={identity:?}, position={position}]")
            }
        }
    }
}
