//! Module descriptor declarations
//!
//! A module descriptor lists, per section, the textual class or annotation
//! names the module enables locally, each with the location it was declared
//! at. Parsing the descriptor is done elsewhere; this module only models the
//! parsed result.

use crate::identity::{Category, TypeKind};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Identifier of a deployment module (archive).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    #[inline]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a declaration came from, e.g. `WEB-INF/beans.xml:14`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location(Arc<str>);

impl Location {
    #[inline]
    pub fn new(location: impl AsRef<str>) -> Self {
        Self(Arc::from(location.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Location {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One textual reference in a descriptor, with its declaration location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    reference: String,
    location: Location,
}

impl Declaration {
    pub fn new(reference: impl Into<String>, location: impl Into<Location>) -> Self {
        Self {
            reference: reference.into(),
            location: location.into(),
        }
    }

    /// The class or annotation name exactly as written.
    #[inline]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    #[inline]
    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// The four lists of a module descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorSection {
    Interceptors,
    Decorators,
    AlternativeClasses,
    AlternativeStereotypes,
}

impl DescriptorSection {
    /// The kind of type every reference in this section must resolve to.
    #[inline]
    pub fn expected_kind(self) -> TypeKind {
        match self {
            Self::AlternativeStereotypes => TypeKind::Annotation,
            _ => TypeKind::Class,
        }
    }

    /// The global category this section overlaps with.
    #[inline]
    pub fn category(self) -> Category {
        match self {
            Self::Interceptors => Category::Interceptor,
            Self::Decorators => Category::Decorator,
            Self::AlternativeClasses | Self::AlternativeStereotypes => Category::Alternative,
        }
    }
}

impl fmt::Display for DescriptorSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interceptors => f.write_str("interceptor"),
            Self::Decorators => f.write_str("decorator"),
            Self::AlternativeClasses => f.write_str("alternative class"),
            Self::AlternativeStereotypes => f.write_str("alternative stereotype"),
        }
    }
}

/// Parsed enablement declarations of one module.
///
/// A module without a descriptor is represented by [`ModuleDescriptor::empty`]:
/// it sees the global interceptor and decorator lists verbatim and selects no
/// alternatives locally.
///
/// # Examples
///
/// ```rust
/// use di_enablement::ModuleDescriptor;
///
/// let descriptor = ModuleDescriptor::empty("shop.war")
///     .interceptor("com.acme.TxInterceptor", "WEB-INF/beans.xml:4")
///     .alternative_class("com.acme.MockPayments", "WEB-INF/beans.xml:9");
///
/// assert_eq!(descriptor.interceptors().len(), 1);
/// assert_eq!(descriptor.alternative_classes()[0].reference(), "com.acme.MockPayments");
/// ```
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    module: ModuleId,
    interceptors: Vec<Declaration>,
    decorators: Vec<Declaration>,
    alternative_classes: Vec<Declaration>,
    alternative_stereotypes: Vec<Declaration>,
}

impl ModuleDescriptor {
    /// A descriptor with no declarations.
    pub fn empty(module: impl Into<ModuleId>) -> Self {
        Self {
            module: module.into(),
            interceptors: Vec::new(),
            decorators: Vec::new(),
            alternative_classes: Vec::new(),
            alternative_stereotypes: Vec::new(),
        }
    }

    /// Append a declaration to the given section.
    pub fn declare(mut self, section: DescriptorSection, declaration: Declaration) -> Self {
        self.section_mut(section).push(declaration);
        self
    }

    pub fn interceptor(self, reference: &str, location: &str) -> Self {
        self.declare(
            DescriptorSection::Interceptors,
            Declaration::new(reference, location),
        )
    }

    pub fn decorator(self, reference: &str, location: &str) -> Self {
        self.declare(
            DescriptorSection::Decorators,
            Declaration::new(reference, location),
        )
    }

    pub fn alternative_class(self, reference: &str, location: &str) -> Self {
        self.declare(
            DescriptorSection::AlternativeClasses,
            Declaration::new(reference, location),
        )
    }

    pub fn alternative_stereotype(self, reference: &str, location: &str) -> Self {
        self.declare(
            DescriptorSection::AlternativeStereotypes,
            Declaration::new(reference, location),
        )
    }

    #[inline]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    #[inline]
    pub fn section(&self, section: DescriptorSection) -> &[Declaration] {
        match section {
            DescriptorSection::Interceptors => &self.interceptors,
            DescriptorSection::Decorators => &self.decorators,
            DescriptorSection::AlternativeClasses => &self.alternative_classes,
            DescriptorSection::AlternativeStereotypes => &self.alternative_stereotypes,
        }
    }

    fn section_mut(&mut self, section: DescriptorSection) -> &mut Vec<Declaration> {
        match section {
            DescriptorSection::Interceptors => &mut self.interceptors,
            DescriptorSection::Decorators => &mut self.decorators,
            DescriptorSection::AlternativeClasses => &mut self.alternative_classes,
            DescriptorSection::AlternativeStereotypes => &mut self.alternative_stereotypes,
        }
    }

    #[inline]
    pub fn interceptors(&self) -> &[Declaration] {
        &self.interceptors
    }

    #[inline]
    pub fn decorators(&self) -> &[Declaration] {
        &self.decorators
    }

    #[inline]
    pub fn alternative_classes(&self) -> &[Declaration] {
        &self.alternative_classes
    }

    #[inline]
    pub fn alternative_stereotypes(&self) -> &[Declaration] {
        &self.alternative_stereotypes
    }

    /// True when no section declares anything.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
            && self.decorators.is_empty()
            && self.alternative_classes.is_empty()
            && self.alternative_stereotypes.is_empty()
    }
}
