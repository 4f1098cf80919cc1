#![no_main]

//! Fuzz target for per-module resolution
//!
//! Whatever the descriptor, a successful resolution starts with the global
//! list, never repeats a component, and a failure is one of the deployment
//! errors.

use arbitrary::Arbitrary;
use di_enablement::{
    ComponentIdentity, DiError, GlobalEnablementBuilder, ModuleDescriptor,
    ModuleEnablementResolver, StaticClassResolver,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Scenario {
    global_interceptors: Vec<u8>,
    local_interceptors: Vec<u8>,
    local_decorators: Vec<u8>,
    /// Names the module cannot see
    invisible: Vec<u8>,
}

fn name(raw: u8) -> String {
    format!("fuzz.C{}", raw % 24)
}

fuzz_target!(|scenario: Scenario| {
    let builder = GlobalEnablementBuilder::new();
    for raw in scenario.global_interceptors.iter().take(32) {
        // priority derived from the name so the freeze never conflicts
        builder.add_interceptor(
            ComponentIdentity::class(name(*raw)).unwrap(),
            i32::from(*raw % 24),
        );
    }
    let global = builder.freeze().unwrap();

    let classes = StaticClassResolver::new();
    for raw in 0..24u8 {
        if !scenario.invisible.iter().any(|i| i % 24 == raw) {
            classes.register_class(&name(raw)).unwrap();
        }
    }

    let mut descriptor = ModuleDescriptor::empty("fuzz.jar");
    for (i, raw) in scenario.local_interceptors.iter().take(32).enumerate() {
        descriptor = descriptor.interceptor(&name(*raw), &format!("beans.xml:{i}"));
    }
    for (i, raw) in scenario.local_decorators.iter().take(32).enumerate() {
        descriptor = descriptor.decorator(&name(*raw), &format!("beans.xml:{}", 100 + i));
    }

    match ModuleEnablementResolver::new(&global).resolve(&descriptor, &classes) {
        Ok(resolution) => {
            let interceptors = resolution.enablement.interceptors();
            assert!(interceptors.starts_with(global.interceptors()));

            let mut unique = interceptors.to_vec();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), interceptors.len());
        }
        Err(DiError::DuplicateDeclaration { .. }) | Err(DiError::UnresolvableReference { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }
});
