//! # DI Enablement - Deterministic Interceptor, Decorator and Alternative Ordering
//!
//! The enablement core of a modular dependency-injection container. Given a
//! deployment made of several modules, it decides, once at bootstrap:
//!
//! - which interceptors and decorators are active in each module, and in what
//!   order they run;
//! - which alternative implementations each module may inject, and which one
//!   wins when several compete for a contract.
//!
//! ## Features
//!
//! - 🔁 **Deterministic** - Equal priorities tie-break on the fully-qualified
//!   name, never on insertion order or addresses
//! - 🧵 **Parallel scanning** - Scanners append to one builder from many threads
//!   without external locking (`DashMap`)
//! - 🧊 **Freeze by construction** - Freezing consumes the builder, so nothing
//!   can be appended after the lists are sorted
//! - 🛑 **Fail fast** - Duplicate declarations and unresolvable references abort
//!   bootstrap with the offending name and location
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use di_enablement::prelude::*;
//!
//! // Scan phase: priority-annotated components found anywhere in the deployment
//! let builder = GlobalEnablementBuilder::new();
//! builder.add_interceptor(ComponentIdentity::class("com.acme.Audit").unwrap(), 10);
//! builder.add_interceptor(ComponentIdentity::class("com.acme.Tx").unwrap(), 20);
//!
//! // Module descriptors, parsed elsewhere
//! let classes = Arc::new(StaticClassResolver::new());
//! classes.register_class("com.acme.Tx").unwrap();
//! classes.register_class("com.acme.Metrics").unwrap();
//!
//! let web = ModuleDescriptor::empty("web.war")
//!     .interceptor("com.acme.Tx", "WEB-INF/beans.xml:5")
//!     .interceptor("com.acme.Metrics", "WEB-INF/beans.xml:6");
//!
//! let deployment = Deployment::bootstrap(
//!     builder,
//!     vec![DeploymentModule::new(web, classes)],
//!     &BootstrapConfig::new(),
//! )
//! .unwrap();
//!
//! // Global entries first (by priority), then local ones (by declaration);
//! // the local Tx declaration is suppressed with a warning.
//! let web = deployment.module("web.war").unwrap();
//! let order: Vec<_> = web.interceptors().iter().map(|c| c.name()).collect();
//! assert_eq!(order, ["com.acme.Audit", "com.acme.Tx", "com.acme.Metrics"]);
//! assert_eq!(deployment.warnings().len(), 1);
//! ```
//!
//! ## Choosing Among Alternatives
//!
//! ```rust
//! use di_enablement::prelude::*;
//!
//! let x = ComponentIdentity::class("com.acme.X").unwrap();
//! let y = ComponentIdentity::class("com.acme.Y").unwrap();
//!
//! let builder = GlobalEnablementBuilder::new();
//! builder.add_alternative(x.clone(), 1);
//! builder.add_alternative(y.clone(), 2);
//!
//! let classes = Arc::new(StaticClassResolver::new());
//! classes.register_class("com.acme.Y").unwrap();
//! let module = ModuleDescriptor::empty("app.jar").alternative_class("com.acme.Y", "beans.xml:3");
//!
//! let deployment = Deployment::bootstrap(
//!     builder,
//!     vec![DeploymentModule::new(module, classes)],
//!     &BootstrapConfig::new(),
//! )
//! .unwrap();
//! let module = deployment.module("app.jar").unwrap();
//!
//! // X outranks Y globally, but only Y is selected in this module
//! let candidates = [Candidate::alternative(x), Candidate::alternative(y.clone())];
//! let chosen = ContractResolver::new(module).resolve("com.acme.Service", &candidates).unwrap();
//! assert_eq!(chosen.identity(), &y);
//! ```

mod chain;
mod config;
mod deployment;
mod descriptor;
mod error;
mod identity;
mod loader;
#[cfg(feature = "logging")]
pub mod logging;
mod module;
mod registry;
mod resolver;
mod selection;
mod specialization;
mod validate;

pub use chain::*;
pub use config::*;
pub use deployment::*;
pub use descriptor::*;
pub use error::*;
pub use identity::*;
pub use loader::*;
pub use module::*;
pub use registry::*;
pub use resolver::*;
pub use selection::*;
pub use specialization::*;
pub use validate::*;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BootstrapConfig, Candidate, Category, ClassResolver, ComponentIdentity, ContractResolver,
        Deployment, DeploymentModule, DiError, GlobalEnablement, GlobalEnablementBuilder,
        InvocationChain, ModuleDescriptor, ModuleEnablement, ModuleEnablementResolver, Priority,
        RedundantPolicy, Result, StaticClassResolver,
    };
    pub use std::sync::Arc;
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

    fn resolver(names: &[&str]) -> Arc<StaticClassResolver> {
        let resolver = StaticClassResolver::new();
        for name in names {
            resolver.register_class(name).unwrap();
        }
        Arc::new(resolver)
    }

    fn deploy(
        builder: GlobalEnablementBuilder,
        descriptor: ModuleDescriptor,
        visible: &[&str],
    ) -> Result<Deployment> {
        Deployment::bootstrap(
            builder,
            vec![DeploymentModule::new(descriptor, resolver(visible))],
            &BootstrapConfig::new(),
        )
    }

    #[test]
    fn test_global_wins_over_local_end_to_end() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_interceptor(class("x.A"), 10);
        builder.add_interceptor(class("x.B"), 20);

        let descriptor = ModuleDescriptor::empty("m")
            .interceptor("x.B", "beans.xml:1")
            .interceptor("x.C", "beans.xml:2");
        let deployment = deploy(builder, descriptor, &["x.B", "x.C"]).unwrap();

        let module = deployment.module("m").unwrap();
        assert_eq!(names(module.interceptors()), ["x.A", "x.B", "x.C"]);
        assert_eq!(deployment.warnings().len(), 1);
        assert_eq!(deployment.warnings()[0].identity, class("x.B"));
    }

    #[test]
    fn test_duplicate_local_decorator_is_fatal() {
        let descriptor = ModuleDescriptor::empty("m")
            .decorator("x.C", "beans.xml:1")
            .decorator("x.C", "beans.xml:2");
        let err = deploy(GlobalEnablementBuilder::new(), descriptor, &["x.C"]).unwrap_err();

        assert!(matches!(err, DiError::DuplicateDeclaration { .. }));
        assert!(err.is_deployment_error());
    }

    #[test]
    fn test_unresolvable_reference_names_module_text_and_location() {
        let descriptor = ModuleDescriptor::empty("shop.war")
            .interceptor("x.DoesNotExist", "META-INF/beans.xml:42");
        let err = deploy(GlobalEnablementBuilder::new(), descriptor, &[]).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("x.DoesNotExist"));
        assert!(message.contains("META-INF/beans.xml:42"));
        assert!(message.contains("shop.war"));
    }

    #[test]
    fn test_local_only_interceptors() {
        let descriptor = ModuleDescriptor::empty("m")
            .interceptor("x.P", "beans.xml:1")
            .interceptor("x.Q", "beans.xml:2");
        let deployment =
            deploy(GlobalEnablementBuilder::new(), descriptor, &["x.P", "x.Q"]).unwrap();

        assert_eq!(
            names(deployment.module("m").unwrap().interceptors()),
            ["x.P", "x.Q"]
        );
        assert!(deployment.warnings().is_empty());
    }

    #[test]
    fn test_alternative_selection_is_local() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_alternative(class("x.X"), 100);
        builder.add_alternative(class("x.Y"), 200);

        let descriptor = ModuleDescriptor::empty("m").alternative_class("x.Y", "beans.xml:1");
        let deployment = deploy(builder, descriptor, &["x.Y"]).unwrap();
        let module = deployment.module("m").unwrap();

        assert_eq!(module.alternative_rank(&class("x.X")), Some(0));
        assert_eq!(module.alternative_rank(&class("x.Y")), Some(1));

        let candidates = [
            Candidate::alternative(class("x.X")),
            Candidate::alternative(class("x.Y")),
        ];
        let chosen = ContractResolver::new(module)
            .resolve("x.Contract", &candidates)
            .unwrap();
        assert_eq!(chosen.identity(), &class("x.Y"));
    }

    #[test]
    fn test_same_deployment_same_result() {
        let run = |reverse: bool| {
            let mut declared = vec![("x.I3", 5), ("x.I1", 5), ("x.I2", 1), ("x.I0", 5)];
            if reverse {
                declared.reverse();
            }
            let builder = GlobalEnablementBuilder::new();
            builder.scan_parallel(declared.into_iter().map(|(name, priority)| {
                move |b: &GlobalEnablementBuilder| b.add_interceptor(class(name), priority)
            }));
            let deployment = deploy(builder, ModuleDescriptor::empty("m"), &[]).unwrap();
            deployment.module("m").unwrap().interceptors().to_vec()
        };

        let first = run(false);
        assert_eq!(first, run(true));
        assert_eq!(names(&first), ["x.I2", "x.I0", "x.I1", "x.I3"]);
    }

    #[test]
    fn test_chain_uses_module_order() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_interceptor(class("x.Security"), Priority::PLATFORM_BEFORE);
        builder.add_decorator(class("x.Cache"), Priority::APPLICATION);

        let descriptor = ModuleDescriptor::empty("m").interceptor("x.Logging", "beans.xml:1");
        let deployment = deploy(builder, descriptor, &["x.Logging"]).unwrap();
        let module = deployment.module("m").unwrap();

        let chain = InvocationChain::build(
            module,
            &[class("x.Logging"), class("x.Security")],
            &[class("x.Cache")],
        );
        let order: Vec<_> = chain.links().iter().map(|l| l.identity().name()).collect();
        assert_eq!(order, ["x.Security", "x.Logging", "x.Cache"]);
    }

    #[test]
    fn test_modules_are_isolated() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_interceptor(class("x.Global"), 1);

        let a = ModuleDescriptor::empty("a.war").interceptor("x.OnlyA", "a/beans.xml:1");
        let b = ModuleDescriptor::empty("b.war");
        let deployment = Deployment::bootstrap(
            builder,
            vec![
                DeploymentModule::new(a, resolver(&["x.OnlyA"])),
                DeploymentModule::new(b, resolver(&[])),
            ],
            &BootstrapConfig::new().with_threads(2),
        )
        .unwrap();

        assert_eq!(
            names(deployment.module("a.war").unwrap().interceptors()),
            ["x.Global", "x.OnlyA"]
        );
        assert_eq!(
            names(deployment.module("b.war").unwrap().interceptors()),
            ["x.Global"]
        );
    }
}
