//! Invocation chain construction
//!
//! Given the interceptors and decorators bound to one method, produce the
//! order they run in for a module: every enabled interceptor, in module
//! order, then every enabled decorator, in module order. Bound components that
//! are not enabled in the module are left out.

use crate::identity::ComponentIdentity;
use crate::module::ModuleEnablement;

#[cfg(feature = "logging")]
use tracing::trace;

/// One step of an invocation chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Interceptor(ComponentIdentity),
    Decorator(ComponentIdentity),
}

impl Link {
    #[inline]
    pub fn identity(&self) -> &ComponentIdentity {
        match self {
            Self::Interceptor(identity) | Self::Decorator(identity) => identity,
        }
    }
}

/// Ordered interceptors and decorators for one method in one module.
///
/// # Examples
///
/// ```rust
/// use di_enablement::{ComponentIdentity, GlobalEnablementBuilder, InvocationChain,
///     ModuleDescriptor, ModuleEnablementResolver, StaticClassResolver};
///
/// let tx = ComponentIdentity::class("com.acme.Tx").unwrap();
/// let audit = ComponentIdentity::class("com.acme.Audit").unwrap();
/// let builder = GlobalEnablementBuilder::new();
/// builder.add_interceptor(tx.clone(), 200);
/// builder.add_interceptor(audit.clone(), 100);
/// let global = builder.freeze().unwrap();
///
/// let module = ModuleEnablementResolver::new(&global)
///     .resolve(&ModuleDescriptor::empty("app.jar"), &StaticClassResolver::new())
///     .unwrap()
///     .enablement;
///
/// let chain = InvocationChain::build(&module, &[tx.clone(), audit.clone()], &[]);
/// let order: Vec<_> = chain.links().iter().map(|l| l.identity().name()).collect();
/// assert_eq!(order, ["com.acme.Audit", "com.acme.Tx"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationChain {
    links: Vec<Link>,
}

impl InvocationChain {
    pub fn build(
        module: &ModuleEnablement,
        bound_interceptors: &[ComponentIdentity],
        bound_decorators: &[ComponentIdentity],
    ) -> Self {
        let interceptors = Self::ordered(bound_interceptors, |c| module.interceptor_position(c));
        let decorators = Self::ordered(bound_decorators, |c| module.decorator_position(c));

        #[cfg(feature = "logging")]
        trace!(
            target: "di_enablement",
            module = module.module().as_str(),
            bound = bound_interceptors.len() + bound_decorators.len(),
            interceptors = interceptors.len(),
            decorators = decorators.len(),
            "Built invocation chain"
        );

        let links = interceptors
            .into_iter()
            .map(Link::Interceptor)
            .chain(decorators.into_iter().map(Link::Decorator))
            .collect();
        Self { links }
    }

    /// Enabled entries of `bound` sorted by module position, without repeats.
    fn ordered<F>(bound: &[ComponentIdentity], position: F) -> Vec<ComponentIdentity>
    where
        F: Fn(&ComponentIdentity) -> Option<usize>,
    {
        let mut positioned: Vec<(usize, &ComponentIdentity)> = bound
            .iter()
            .filter_map(|c| Some((position(c)?, c)))
            .collect();
        positioned.sort_unstable_by_key(|(p, _)| *p);
        positioned.dedup_by_key(|(p, _)| *p);
        positioned.into_iter().map(|(_, c)| c.clone()).collect()
    }

    #[inline]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn interceptors(&self) -> impl Iterator<Item = &ComponentIdentity> {
        self.links.iter().filter_map(|link| match link {
            Link::Interceptor(identity) => Some(identity),
            Link::Decorator(_) => None,
        })
    }

    pub fn decorators(&self) -> impl Iterator<Item = &ComponentIdentity> {
        self.links.iter().filter_map(|link| match link {
            Link::Decorator(identity) => Some(identity),
            Link::Interceptor(_) => None,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
