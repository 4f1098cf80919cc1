//! Bootstrap configuration
//!
//! Compile-time behavior is selected with cargo features (`logging`,
//! `logging-json`, `logging-pretty`). Runtime behavior of a deployment is set
//! with [`BootstrapConfig`].
//!
//! # Example
//!
//! ```rust
//! use di_enablement::{BootstrapConfig, RedundantPolicy};
//!
//! let config = BootstrapConfig::new().sequential().strict();
//! assert_eq!(config.threads(), 1);
//! assert_eq!(config.redundant_policy(), RedundantPolicy::Reject);
//! ```

use std::num::NonZeroUsize;
use std::thread;

/// What to do with a module-local declaration of a globally enabled
/// interceptor or decorator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedundantPolicy {
    /// Drop the local declaration and emit a warning. The component runs once,
    /// at its global position.
    #[default]
    Suppress,
    /// Treat the overlap as a deployment error.
    Reject,
}

/// Runtime options for [`Deployment::bootstrap`](crate::Deployment::bootstrap).
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    threads: NonZeroUsize,
    redundant_policy: RedundantPolicy,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            threads: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            redundant_policy: RedundantPolicy::Suppress,
        }
    }
}

impl BootstrapConfig {
    /// Default configuration: one worker per available core, suppress
    /// redundant declarations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of workers resolving modules in parallel. Zero is treated as one.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = NonZeroUsize::new(threads).unwrap_or(NonZeroUsize::MIN);
        self
    }

    /// Resolve modules on the calling thread.
    pub fn sequential(self) -> Self {
        self.with_threads(1)
    }

    pub fn with_redundant_policy(mut self, policy: RedundantPolicy) -> Self {
        self.redundant_policy = policy;
        self
    }

    /// Fail bootstrap on redundant local declarations.
    pub fn strict(self) -> Self {
        self.with_redundant_policy(RedundantPolicy::Reject)
    }

    #[inline]
    pub fn threads(&self) -> usize {
        self.threads.get()
    }

    #[inline]
    pub fn redundant_policy(&self) -> RedundantPolicy {
        self.redundant_policy
    }
}
