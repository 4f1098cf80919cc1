//! Alternative-aware contract resolution
//!
//! Picks the single implementation of a contract to inject within a module.
//!
//! Rules, applied in order:
//!
//! 1. a candidate is eligible if it is not an alternative, or if the module
//!    selects it in its descriptor (by class or by one of its stereotypes);
//! 2. an eligible candidate specialized by another eligible candidate drops
//!    out;
//! 3. a single remaining candidate wins;
//! 4. otherwise the eligible alternative with the lowest global rank wins; an
//!    unranked candidate never beats a ranked one;
//! 5. otherwise a single unranked selected alternative beats plain beans;
//! 6. anything left is ambiguous.

use crate::identity::ComponentIdentity;
use crate::module::ModuleEnablement;
use crate::specialization::Specializations;
use crate::{DiError, Result};

#[cfg(feature = "logging")]
use tracing::trace;

/// One implementation competing for a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    identity: ComponentIdentity,
    alternative: bool,
    stereotypes: Vec<ComponentIdentity>,
}

impl Candidate {
    /// A regular, always-eligible implementation.
    pub fn bean(identity: ComponentIdentity) -> Self {
        Self {
            identity,
            alternative: false,
            stereotypes: Vec::new(),
        }
    }

    /// An implementation that is only eligible where selected.
    pub fn alternative(identity: ComponentIdentity) -> Self {
        Self {
            identity,
            alternative: true,
            stereotypes: Vec::new(),
        }
    }

    /// Annotate with a stereotype. A bean carrying an alternative stereotype
    /// is itself an alternative.
    pub fn with_stereotype(mut self, stereotype: ComponentIdentity) -> Self {
        self.alternative = true;
        self.stereotypes.push(stereotype);
        self
    }

    #[inline]
    pub fn identity(&self) -> &ComponentIdentity {
        &self.identity
    }

    #[inline]
    pub fn is_alternative(&self) -> bool {
        self.alternative
    }

    #[inline]
    pub fn stereotypes(&self) -> &[ComponentIdentity] {
        &self.stereotypes
    }
}

/// Resolves contracts within one module.
///
/// # Examples
///
/// ```rust
/// use di_enablement::{
///     Candidate, ComponentIdentity, ContractResolver, GlobalEnablement, ModuleDescriptor,
///     ModuleEnablementResolver, StaticClassResolver,
/// };
///
/// let classes = StaticClassResolver::new();
/// let mock = classes.register_class("com.acme.MockPayments").unwrap();
/// let real = ComponentIdentity::class("com.acme.CardPayments").unwrap();
///
/// let global = GlobalEnablement::empty();
/// let descriptor = ModuleDescriptor::empty("test.war")
///     .alternative_class("com.acme.MockPayments", "beans.xml:2");
/// let module = ModuleEnablementResolver::new(&global)
///     .resolve(&descriptor, &classes)
///     .unwrap()
///     .enablement;
///
/// let candidates = [Candidate::bean(real), Candidate::alternative(mock.clone())];
/// let chosen = ContractResolver::new(&module)
///     .resolve("com.acme.Payments", &candidates)
///     .unwrap();
/// assert_eq!(chosen.identity(), &mock);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ContractResolver<'m> {
    module: &'m ModuleEnablement,
    specializations: Option<&'m Specializations>,
}

impl<'m> ContractResolver<'m> {
    pub fn new(module: &'m ModuleEnablement) -> Self {
        Self {
            module,
            specializations: None,
        }
    }

    pub fn with_specializations(mut self, specializations: &'m Specializations) -> Self {
        self.specializations = Some(specializations);
        self
    }

    /// Whether `candidate` may be injected in this module at all.
    pub fn is_eligible(&self, candidate: &Candidate) -> bool {
        !candidate.alternative
            || self
                .module
                .is_selected_alternative(&candidate.identity, &candidate.stereotypes)
    }

    /// Choose the implementation of `contract` among `candidates`.
    pub fn resolve<'c>(&self, contract: &str, candidates: &'c [Candidate]) -> Result<&'c Candidate> {
        let eligible: Vec<&Candidate> = candidates.iter().filter(|c| self.is_eligible(c)).collect();
        let eligible = self.prune_specialized(eligible);

        let chosen = match eligible.as_slice() {
            [] => {
                return Err(DiError::UnsatisfiedContract {
                    module: self.module.module().clone(),
                    contract: contract.to_owned(),
                });
            }
            [only] => *only,
            _ => self.disambiguate(contract, &eligible)?,
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "di_enablement",
            module = self.module.module().as_str(),
            contract,
            chosen = chosen.identity.name(),
            candidates = candidates.len(),
            "Contract resolved"
        );

        Ok(chosen)
    }

    fn disambiguate<'c>(&self, contract: &str, eligible: &[&'c Candidate]) -> Result<&'c Candidate> {
        let ranked = eligible
            .iter()
            .filter(|c| c.alternative)
            .filter_map(|c| Some((self.module.alternative_rank(&c.identity)?, *c)))
            .min_by_key(|(rank, _)| *rank);
        if let Some((_, winner)) = ranked {
            return Ok(winner);
        }

        let alternatives: Vec<&'c Candidate> =
            eligible.iter().copied().filter(|c| c.alternative).collect();
        if let [only] = alternatives.as_slice() {
            return Ok(*only);
        }

        let contenders = if alternatives.is_empty() {
            eligible.to_vec()
        } else {
            alternatives
        };
        let mut names: Vec<ComponentIdentity> =
            contenders.iter().map(|c| c.identity.clone()).collect();
        names.sort();

        Err(DiError::AmbiguousContract {
            module: self.module.module().clone(),
            contract: contract.to_owned(),
            candidates: names,
        })
    }

    /// Drop candidates whose specialization chain reaches another eligible
    /// candidate.
    fn prune_specialized<'c>(&self, eligible: Vec<&'c Candidate>) -> Vec<&'c Candidate> {
        let Some(specializations) = self.specializations else {
            return eligible;
        };

        let replaced = |candidate: &Candidate| {
            let mut current = &candidate.identity;
            while let Some(next) = specializations.specialized_by(current) {
                if eligible.iter().any(|e| &e.identity == next) {
                    return true;
                }
                current = next;
            }
            false
        };

        let keep: Vec<bool> = eligible.iter().map(|c| !replaced(c)).collect();
        eligible
            .into_iter()
            .zip(keep)
            .filter_map(|(c, keep)| keep.then_some(c))
            .collect()
    }
}
