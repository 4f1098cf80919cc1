#![no_main]

//! Fuzz target for global ordering
//!
//! The frozen order must not depend on the order declarations arrive in, and
//! must be sorted by (priority, name).

use arbitrary::Arbitrary;
use di_enablement::{Category, ComponentIdentity, DiError, GlobalEnablementBuilder};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Declared {
    /// Small name space so repeats are common
    name: u8,
    priority: i16,
    category: u8,
}

fn category(raw: u8) -> Category {
    Category::ALL[raw as usize % Category::ALL.len()]
}

fn identity(raw: u8) -> ComponentIdentity {
    ComponentIdentity::class(format!("fuzz.C{}", raw % 32)).unwrap()
}

fn freeze(declared: &[Declared]) -> Result<Vec<Vec<ComponentIdentity>>, DiError> {
    let builder = GlobalEnablementBuilder::new();
    for d in declared {
        builder.add(category(d.category), identity(d.name), i32::from(d.priority));
    }
    let global = builder.freeze()?;
    Ok(Category::ALL
        .iter()
        .map(|c| global.list_of(*c).to_vec())
        .collect())
}

fuzz_target!(|declared: Vec<Declared>| {
    let declared: Vec<Declared> = declared.into_iter().take(256).collect();
    let reversed: Vec<Declared> = declared
        .iter()
        .rev()
        .map(|d| Declared {
            name: d.name,
            priority: d.priority,
            category: d.category,
        })
        .collect();

    match (freeze(&declared), freeze(&reversed)) {
        (Ok(forward), Ok(backward)) => {
            assert_eq!(forward, backward, "order depends on arrival order");

            // Every identity appears at most once per category
            for list in &forward {
                let mut sorted = list.clone();
                sorted.sort();
                sorted.dedup();
                assert_eq!(sorted.len(), list.len(), "duplicate survived freeze");
            }
        }
        (Err(DiError::ConflictingPriority { .. }), Err(DiError::ConflictingPriority { .. })) => {}
        (a, b) => panic!("inconsistent outcome: {a:?} vs {b:?}"),
    }
});
