//! Per-module enablement resolution
//!
//! Combines the frozen global lists with one module's descriptor:
//!
//! 1. every descriptor section is checked for duplicates before anything is
//!    resolved or merged;
//! 2. each reference is resolved through the module's [`ClassResolver`], and
//!    references resolving to the same component are rejected;
//! 3. interceptors and decorators become `global (priority order) ++ local
//!    (declaration order)`, with local entries already enabled globally
//!    dropped and reported;
//! 4. alternative classes and stereotypes become selection sets, and the
//!    global alternative ranks are shared as-is.

use crate::config::RedundantPolicy;
use crate::descriptor::{DescriptorSection, Location, ModuleDescriptor};
use crate::identity::{Category, ComponentIdentity};
use crate::loader::{ClassResolver, resolve_declaration};
use crate::module::ModuleEnablement;
use crate::registry::GlobalEnablement;
use crate::validate::{
    RedundantDeclaration, check_for_duplicates, check_for_resolved_duplicates, filter_redundant,
};
use crate::Result;
use ahash::RandomState;
use std::collections::HashSet;

#[cfg(feature = "logging")]
use tracing::debug;

const SECTIONS: [DescriptorSection; 4] = [
    DescriptorSection::Interceptors,
    DescriptorSection::Decorators,
    DescriptorSection::AlternativeClasses,
    DescriptorSection::AlternativeStereotypes,
];

/// Outcome of resolving one module: the enablement plus any non-fatal
/// diagnostics produced along the way.
#[derive(Debug)]
pub struct ModuleResolution {
    pub enablement: ModuleEnablement,
    pub warnings: Vec<RedundantDeclaration>,
}

/// Builds [`ModuleEnablement`]s against one frozen global snapshot.
///
/// Only reads the snapshot, so one resolver can serve many threads at once.
///
/// # Examples
///
/// ```rust
/// use di_enablement::{
///     ComponentIdentity, GlobalEnablementBuilder, ModuleDescriptor, ModuleEnablementResolver,
///     StaticClassResolver,
/// };
///
/// let builder = GlobalEnablementBuilder::new();
/// builder.add_interceptor(ComponentIdentity::class("com.acme.A").unwrap(), 10);
/// let global = builder.freeze().unwrap();
///
/// let classes = StaticClassResolver::new();
/// classes.register_class("com.acme.C").unwrap();
///
/// let descriptor = ModuleDescriptor::empty("web.war").interceptor("com.acme.C", "beans.xml:3");
/// let resolution = ModuleEnablementResolver::new(&global)
///     .resolve(&descriptor, &classes)
///     .unwrap();
///
/// let order: Vec<_> = resolution.enablement.interceptors().iter().map(|c| c.name()).collect();
/// assert_eq!(order, ["com.acme.A", "com.acme.C"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ModuleEnablementResolver<'g> {
    global: &'g GlobalEnablement,
    policy: RedundantPolicy,
}

impl<'g> ModuleEnablementResolver<'g> {
    pub fn new(global: &'g GlobalEnablement) -> Self {
        Self {
            global,
            policy: RedundantPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RedundantPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve `descriptor` using the module's own class visibility.
    pub fn resolve(
        &self,
        descriptor: &ModuleDescriptor,
        classes: &dyn ClassResolver,
    ) -> Result<ModuleResolution> {
        let module = descriptor.module();

        for section in SECTIONS {
            check_for_duplicates(module, section, descriptor.section(section))?;
        }

        let mut warnings = Vec::new();

        let interceptors = self.merge(
            descriptor,
            classes,
            DescriptorSection::Interceptors,
            &mut warnings,
        )?;
        let decorators = self.merge(
            descriptor,
            classes,
            DescriptorSection::Decorators,
            &mut warnings,
        )?;

        let alternative_classes =
            Self::selection(descriptor, classes, DescriptorSection::AlternativeClasses)?;
        let alternative_stereotypes =
            Self::selection(descriptor, classes, DescriptorSection::AlternativeStereotypes)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "di_enablement",
            module = module.as_str(),
            interceptors = interceptors.len(),
            decorators = decorators.len(),
            alternative_classes = alternative_classes.len(),
            alternative_stereotypes = alternative_stereotypes.len(),
            suppressed = warnings.len(),
            "Module enablement resolved"
        );

        let enablement = ModuleEnablement::new(
            module.clone(),
            interceptors,
            decorators,
            self.global.alternative_ranks(),
            alternative_classes,
            alternative_stereotypes,
        );

        Ok(ModuleResolution {
            enablement,
            warnings,
        })
    }

    /// Global list followed by the surviving local declarations.
    fn merge(
        &self,
        descriptor: &ModuleDescriptor,
        classes: &dyn ClassResolver,
        section: DescriptorSection,
        warnings: &mut Vec<RedundantDeclaration>,
    ) -> Result<Vec<ComponentIdentity>> {
        let category: Category = section.category();
        let local = Self::resolve_section(descriptor, classes, section)?;
        let local = filter_redundant(
            descriptor.module(),
            category,
            local,
            self.global,
            self.policy,
            warnings,
        )?;

        let global = self.global.list_of(category);
        let mut merged = Vec::with_capacity(global.len() + local.len());
        merged.extend_from_slice(global);
        merged.extend(local);
        Ok(merged)
    }

    fn selection(
        descriptor: &ModuleDescriptor,
        classes: &dyn ClassResolver,
        section: DescriptorSection,
    ) -> Result<HashSet<ComponentIdentity, RandomState>> {
        Ok(Self::resolve_section(descriptor, classes, section)?
            .into_iter()
            .map(|(identity, _)| identity)
            .collect())
    }

    fn resolve_section(
        descriptor: &ModuleDescriptor,
        classes: &dyn ClassResolver,
        section: DescriptorSection,
    ) -> Result<Vec<(ComponentIdentity, Location)>> {
        let resolved: Vec<(ComponentIdentity, Location)> = descriptor
            .section(section)
            .iter()
            .map(|declaration| {
                resolve_declaration(classes, descriptor.module(), section, declaration)
                    .map(|identity| (identity, declaration.location().clone()))
            })
            .collect::<Result<_>>()?;

        check_for_resolved_duplicates(descriptor.module(), section, &resolved)?;
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::loader::StaticClassResolver;
    use crate::registry::GlobalEnablementBuilder;
    use crate::DiError;

    fn class(name: &str) -> ComponentIdentity {
        ComponentIdentity::class(name).unwrap()
    }

    fn classes(names: &[&str]) -> StaticClassResolver {
        let resolver = StaticClassResolver::new();
        for name in names {
            resolver.register_class(name).unwrap();
        }
        resolver
    }

    fn names(list: &[ComponentIdentity]) -> Vec<&str> {
        list.iter().map(ComponentIdentity::name).collect()
    }

    #[test]
    fn test_global_wins_over_local() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_interceptor(class("x.B"), 20);
        builder.add_interceptor(class("x.A"), 10);
        let global = builder.freeze().unwrap();

        let descriptor = ModuleDescriptor::empty("m")
            .interceptor("x.B", "beans.xml:1")
            .interceptor("x.C", "beans.xml:2");
        let resolution = ModuleEnablementResolver::new(&global)
            .resolve(&descriptor, &classes(&["x.B", "x.C"]))
            .unwrap();

        assert_eq!(
            names(resolution.enablement.interceptors()),
            ["x.A", "x.B", "x.C"]
        );
        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(resolution.warnings[0].identity, class("x.B"));
        assert_eq!(resolution.warnings[0].category, Category::Interceptor);
    }

    #[test]
    fn test_local_only_keeps_declaration_order() {
        let global = GlobalEnablement::empty();
        let descriptor = ModuleDescriptor::empty("m")
            .interceptor("x.P", "beans.xml:1")
            .interceptor("x.Q", "beans.xml:2");

        let resolution = ModuleEnablementResolver::new(&global)
            .resolve(&descriptor, &classes(&["x.P", "x.Q"]))
            .unwrap();

        assert_eq!(names(resolution.enablement.interceptors()), ["x.P", "x.Q"]);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_fails_before_resolution() {
        // x.C is not resolvable: the duplicate must be reported first
        let descriptor = ModuleDescriptor::empty("m")
            .decorator("x.C", "beans.xml:1")
            .decorator("x.C", "beans.xml:2");

        let err = ModuleEnablementResolver::new(&GlobalEnablement::empty())
            .resolve(&descriptor, &classes(&[]))
            .unwrap_err();
        assert!(matches!(err, DiError::DuplicateDeclaration { .. }));
    }

    #[test]
    fn test_aliased_references_are_duplicates() {
        let aliasing = |name: &str| {
            ComponentIdentity::class(name.replace('$', "."))
                .map_err(|e| LoadError::Other(e.to_string()))
        };
        let descriptor = ModuleDescriptor::empty("m")
            .interceptor("x.Outer$Inner", "beans.xml:1")
            .interceptor("x.Outer.Inner", "beans.xml:2");

        let err = ModuleEnablementResolver::new(&GlobalEnablement::empty())
            .resolve(&descriptor, &aliasing)
            .unwrap_err();

        match err {
            DiError::DuplicateDeclaration {
                section,
                value,
                location,
                previous,
                ..
            } => {
                assert_eq!(section, DescriptorSection::Interceptors);
                assert_eq!(value, "x.Outer.Inner");
                assert_eq!(location.as_str(), "beans.xml:2");
                assert_eq!(previous.as_str(), "beans.xml:1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unresolvable_reference() {
        let descriptor =
            ModuleDescriptor::empty("m").alternative_class("x.Ghost", "WEB-INF/beans.xml:12");

        let err = ModuleEnablementResolver::new(&GlobalEnablement::empty())
            .resolve(&descriptor, &classes(&[]))
            .unwrap_err();

        match err {
            DiError::UnresolvableReference {
                module,
                reference,
                location,
                source,
            } => {
                assert_eq!(module.as_str(), "m");
                assert_eq!(reference, "x.Ghost");
                assert_eq!(location.as_str(), "WEB-INF/beans.xml:12");
                assert_eq!(
                    source,
                    LoadError::NotFound {
                        name: "x.Ghost".into()
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_alternatives_are_selection_sets() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_alternative(class("x.X"), 1);
        builder.add_alternative(class("x.Y"), 2);
        let global = builder.freeze().unwrap();

        let resolver = classes(&["x.Y"]);
        resolver.register_annotation("x.Mock").unwrap();

        let descriptor = ModuleDescriptor::empty("m")
            .alternative_class("x.Y", "beans.xml:1")
            .alternative_stereotype("x.Mock", "beans.xml:2");
        let enablement = ModuleEnablementResolver::new(&global)
            .resolve(&descriptor, &resolver)
            .unwrap()
            .enablement;

        assert!(enablement.is_enabled_alternative_class(&class("x.Y")));
        assert!(!enablement.is_enabled_alternative_class(&class("x.X")));
        assert!(
            enablement.is_enabled_alternative_stereotype(
                &ComponentIdentity::annotation("x.Mock").unwrap()
            )
        );
        assert_eq!(enablement.alternative_rank(&class("x.X")), Some(0));
        assert_eq!(enablement.alternative_rank(&class("x.Y")), Some(1));
        assert!(enablement.interceptors().is_empty());
    }

    #[test]
    fn test_modules_share_rank_map() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_alternative(class("x.X"), 1);
        let global = builder.freeze().unwrap();
        let resolver = ModuleEnablementResolver::new(&global);
        let none = classes(&[]);

        let a = resolver.resolve(&ModuleDescriptor::empty("a"), &none).unwrap();
        let b = resolver.resolve(&ModuleDescriptor::empty("b"), &none).unwrap();
        assert!(std::sync::Arc::ptr_eq(
            a.enablement.global_alternatives(),
            b.enablement.global_alternatives()
        ));
    }

    #[test]
    fn test_empty_descriptor_sees_global_lists() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_decorator(class("x.D"), 5);
        let global = builder.freeze().unwrap();

        let enablement = ModuleEnablementResolver::new(&global)
            .resolve(&ModuleDescriptor::empty("m"), &classes(&[]))
            .unwrap()
            .enablement;
        assert_eq!(names(enablement.decorators()), ["x.D"]);
        assert_eq!(enablement.local_alternative_classes().count(), 0);
    }
}
