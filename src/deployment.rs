//! Deployment bootstrap
//!
//! Drives the enablement lifecycle of one deployment:
//!
//! ```text
//! scan (parallel appends) -> freeze -> resolve every module -> release global lists
//! ```
//!
//! Any deployment error aborts the whole bootstrap; no partially resolved
//! deployment is ever returned.

use crate::config::BootstrapConfig;
use crate::descriptor::{ModuleDescriptor, ModuleId};
use crate::loader::ClassResolver;
use crate::module::ModuleEnablement;
use crate::registry::{CollapsedDeclaration, GlobalEnablement, GlobalEnablementBuilder};
use crate::resolver::{ModuleEnablementResolver, ModuleResolution};
use crate::validate::RedundantDeclaration;
use crate::{DiError, Result};
use ahash::RandomState;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

#[cfg(feature = "logging")]
use tracing::{debug, info};

/// One module to bootstrap: its descriptor and the class visibility it
/// resolves references with.
#[derive(Clone)]
pub struct DeploymentModule {
    descriptor: ModuleDescriptor,
    classes: Arc<dyn ClassResolver>,
}

impl DeploymentModule {
    pub fn new(descriptor: ModuleDescriptor, classes: Arc<dyn ClassResolver>) -> Self {
        Self {
            descriptor,
            classes,
        }
    }

    #[inline]
    pub fn id(&self) -> &ModuleId {
        self.descriptor.module()
    }

    #[inline]
    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }
}

impl std::fmt::Debug for DeploymentModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentModule")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Resolved enablement of every module in a deployment.
///
/// Immutable once bootstrapped. Dropping it (or calling
/// [`undeploy`](Self::undeploy)) discards every module's enablement.
///
/// # Examples
///
/// ```rust
/// use di_enablement::{
///     BootstrapConfig, ComponentIdentity, Deployment, DeploymentModule,
///     GlobalEnablementBuilder, ModuleDescriptor, StaticClassResolver,
/// };
/// use std::sync::Arc;
///
/// let builder = GlobalEnablementBuilder::new();
/// builder.add_interceptor(ComponentIdentity::class("com.acme.Tx").unwrap(), 10);
///
/// let classes = Arc::new(StaticClassResolver::new());
/// classes.register_class("com.acme.Tx").unwrap();
///
/// let web = ModuleDescriptor::empty("web.war").interceptor("com.acme.Tx", "WEB-INF/beans.xml:3");
/// let modules = vec![DeploymentModule::new(web, classes)];
///
/// let deployment = Deployment::bootstrap(builder, modules, &BootstrapConfig::new()).unwrap();
/// assert_eq!(deployment.module("web.war").unwrap().interceptors().len(), 1);
/// assert_eq!(deployment.warnings().len(), 1);
/// ```
pub struct Deployment {
    modules: HashMap<ModuleId, Arc<ModuleEnablement>, RandomState>,
    order: Vec<ModuleId>,
    warnings: Vec<RedundantDeclaration>,
    collapsed: Vec<CollapsedDeclaration>,
}

impl Deployment {
    /// Freeze the global registry and resolve every module.
    ///
    /// The builder is consumed: every scanner must be done with it. Errors are
    /// reported for the first failing module in `modules` order, regardless
    /// of how resolution was parallelized.
    pub fn bootstrap(
        builder: GlobalEnablementBuilder,
        modules: Vec<DeploymentModule>,
        config: &BootstrapConfig,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity_and_hasher(modules.len(), RandomState::new());
        for module in &modules {
            if !seen.insert(module.id()) {
                return Err(DiError::invalid_argument(format!(
                    "module {} is deployed more than once",
                    module.id()
                )));
            }
        }

        let global = builder.freeze()?;

        #[cfg(feature = "logging")]
        debug!(
            target: "di_enablement",
            modules = modules.len(),
            threads = config.threads(),
            "Resolving module enablement"
        );

        let resolver =
            ModuleEnablementResolver::new(&global).with_policy(config.redundant_policy());
        let resolutions = Self::resolve_all(&resolver, &modules, config.threads())?;

        let mut deployment = Self {
            modules: HashMap::with_capacity_and_hasher(modules.len(), RandomState::new()),
            order: Vec::with_capacity(modules.len()),
            warnings: Vec::new(),
            collapsed: global.collapsed_declarations().to_vec(),
        };
        for resolution in resolutions {
            let ModuleResolution {
                enablement,
                warnings,
            } = resolution?;
            let id = enablement.module().clone();
            deployment.warnings.extend(warnings);
            deployment.order.push(id.clone());
            deployment.modules.insert(id, Arc::new(enablement));
        }

        global.cleanup_after_boot();

        #[cfg(feature = "logging")]
        info!(
            target: "di_enablement",
            modules = deployment.order.len(),
            warnings = deployment.warnings.len(),
            collapsed = deployment.collapsed.len(),
            "Enablement bootstrap complete"
        );

        Ok(deployment)
    }

    /// Resolve modules on up to `threads` workers, keeping input order.
    fn resolve_all(
        resolver: &ModuleEnablementResolver<'_>,
        modules: &[DeploymentModule],
        threads: usize,
    ) -> Result<Vec<Result<ModuleResolution>>> {
        let resolve_one =
            |module: &DeploymentModule| resolver.resolve(&module.descriptor, module.classes.as_ref());

        if threads <= 1 || modules.len() <= 1 {
            return Ok(modules.iter().map(resolve_one).collect());
        }

        let chunk = modules.len().div_ceil(threads);
        thread::scope(|s| {
            let workers: Vec<_> = modules
                .chunks(chunk)
                .map(|part| s.spawn(move || part.iter().map(resolve_one).collect::<Vec<_>>()))
                .collect();

            let mut resolutions = Vec::with_capacity(modules.len());
            for worker in workers {
                let part = worker
                    .join()
                    .map_err(|_| DiError::Internal("module resolution worker panicked".into()))?;
                resolutions.extend(part);
            }
            Ok(resolutions)
        })
    }

    /// Resolved enablement of one module.
    #[inline]
    pub fn module(&self, id: &str) -> Option<&Arc<ModuleEnablement>> {
        self.modules.get(id)
    }

    /// Every module, in the order it was given to [`bootstrap`](Self::bootstrap).
    pub fn modules(&self) -> impl Iterator<Item = &Arc<ModuleEnablement>> {
        self.order.iter().filter_map(|id| self.modules.get(id))
    }

    /// Every suppressed redundant declaration, in module order.
    #[inline]
    pub fn warnings(&self) -> &[RedundantDeclaration] {
        &self.warnings
    }

    /// Global declarations repeated with the same priority and kept once.
    #[inline]
    pub fn collapsed_declarations(&self) -> &[CollapsedDeclaration] {
        &self.collapsed
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Discard every module's enablement.
    pub fn undeploy(self) {
        #[cfg(feature = "logging")]
        debug!(
            target: "di_enablement",
            modules = self.order.len(),
            "Undeploying"
        );
    }
}

impl std::fmt::Debug for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("modules", &self.order)
            .field("warnings", &self.warnings.len())
            .field("collapsed", &self.collapsed.len())
            .finish()
    }
}

/// Resolve a single module against an already frozen snapshot.
///
/// Convenience for hosts that drive the lifecycle themselves.
pub fn resolve_module(
    global: &GlobalEnablement,
    module: &DeploymentModule,
    config: &BootstrapConfig,
) -> Result<ModuleResolution> {
    ModuleEnablementResolver::new(global)
        .with_policy(config.redundant_policy())
        .resolve(&module.descriptor, module.classes.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ComponentIdentity;
    use crate::loader::StaticClassResolver;

    fn class(name: &str) -> ComponentIdentity {
        ComponentIdentity::class(name).unwrap()
    }

    fn classes(names: &[&str]) -> Arc<StaticClassResolver> {
        let resolver = StaticClassResolver::new();
        for name in names {
            resolver.register_class(name).unwrap();
        }
        Arc::new(resolver)
    }

    fn many_modules(count: usize) -> Vec<DeploymentModule> {
        let shared = classes(&["x.Local"]);
        (0..count)
            .map(|i| {
                let descriptor = ModuleDescriptor::empty(format!("m{i:02}").as_str())
                    .interceptor("x.Local", "beans.xml:1")
                    .interceptor("x.Global", "beans.xml:2");
                let visible = classes(&["x.Local", "x.Global"]);
                let resolver: Arc<dyn ClassResolver> =
                    if i % 2 == 0 { visible } else { shared.clone() };
                DeploymentModule::new(descriptor, resolver)
            })
            .collect()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let bootstrap = |threads: usize| {
            let builder = GlobalEnablementBuilder::new();
            builder.add_interceptor(class("x.Global"), 1);
            // odd modules cannot see x.Global
            let modules = many_modules(10)
                .into_iter()
                .filter(|m| m.id().as_str().ends_with(['0', '2', '4', '6', '8']))
                .collect();
            Deployment::bootstrap(builder, modules, &BootstrapConfig::new().with_threads(threads))
                .unwrap()
        };

        let sequential = bootstrap(1);
        let parallel = bootstrap(4);

        let ids = |d: &Deployment| d.modules().map(|m| m.module().clone()).collect::<Vec<_>>();
        assert_eq!(ids(&sequential), ids(&parallel));
        assert_eq!(sequential.warnings(), parallel.warnings());
        assert_eq!(sequential.len(), 5);
        for (a, b) in sequential.modules().zip(parallel.modules()) {
            assert_eq!(a.interceptors(), b.interceptors());
            assert_eq!(a.interceptors(), [class("x.Global"), class("x.Local")]);
        }
    }

    #[test]
    fn test_first_failing_module_reported() {
        let builder = GlobalEnablementBuilder::new();
        // m01 and m03 cannot see x.Global
        let modules = many_modules(4);

        let err = Deployment::bootstrap(builder, modules, &BootstrapConfig::new().with_threads(3))
            .unwrap_err();
        match err {
            DiError::UnresolvableReference {
                module, reference, ..
            } => {
                assert_eq!(module.as_str(), "m01");
                assert_eq!(reference, "x.Global");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_module_id_rejected() {
        let modules = vec![
            DeploymentModule::new(ModuleDescriptor::empty("a.jar"), classes(&[])),
            DeploymentModule::new(ModuleDescriptor::empty("a.jar"), classes(&[])),
        ];
        let err = Deployment::bootstrap(
            GlobalEnablementBuilder::new(),
            modules,
            &BootstrapConfig::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DiError::InvalidArgument { .. }));
    }

    #[test]
    fn test_strict_policy_aborts() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_decorator(class("x.D"), 1);
        let descriptor = ModuleDescriptor::empty("a.jar").decorator("x.D", "beans.xml:1");
        let modules = vec![DeploymentModule::new(descriptor, classes(&["x.D"]))];

        let err = Deployment::bootstrap(builder, modules, &BootstrapConfig::new().strict())
            .unwrap_err();
        assert!(matches!(err, DiError::RedundantDeclaration { .. }));
    }

    #[test]
    fn test_conflicting_global_priorities_abort() {
        let builder = GlobalEnablementBuilder::new();
        builder.add_alternative(class("x.Alt"), 1);
        builder.add_alternative(class("x.Alt"), 2);

        let err = Deployment::bootstrap(builder, Vec::new(), &BootstrapConfig::new()).unwrap_err();
        assert!(matches!(err, DiError::ConflictingPriority { .. }));
    }

    #[test]
    fn test_repeated_global_declaration_reported() {
        let builder = GlobalEnablementBuilder::new();
        builder.scan_parallel((0..3).map(|_| {
            |b: &GlobalEnablementBuilder| b.add_interceptor(class("x.Audit"), 10)
        }));

        let deployment = Deployment::bootstrap(
            builder,
            vec![DeploymentModule::new(ModuleDescriptor::empty("a.jar"), classes(&[]))],
            &BootstrapConfig::new(),
        )
        .unwrap();

        assert_eq!(
            deployment.module("a.jar").unwrap().interceptors(),
            [class("x.Audit")]
        );
        let collapsed = deployment.collapsed_declarations();
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[0].identity, class("x.Audit"));
        assert_eq!(collapsed[0].declarations, 3);
        assert!(deployment.warnings().is_empty());
    }

    #[test]
    fn test_resolve_module_against_snapshot() {
        let global = GlobalEnablement::empty();
        let module = DeploymentModule::new(
            ModuleDescriptor::empty("a.jar").interceptor("x.Local", "beans.xml:1"),
            classes(&["x.Local"]),
        );
        let resolution = resolve_module(&global, &module, &BootstrapConfig::new()).unwrap();
        assert_eq!(resolution.enablement.interceptors(), [class("x.Local")]);
    }

    #[test]
    fn test_undeploy() {
        let deployment = Deployment::bootstrap(
            GlobalEnablementBuilder::new(),
            vec![DeploymentModule::new(ModuleDescriptor::empty("a.jar"), classes(&[]))],
            &BootstrapConfig::new(),
        )
        .unwrap();
        assert!(deployment.module("a.jar").is_some());
        assert!(deployment.module("b.jar").is_none());
        deployment.undeploy();
    }
}
