pub mod types;
pub mod selector;
pub mod normalizer;
pub mod resolution;
pub mod allocator;
pub mod executor;
pub mod reassign;
pub mod consolidator;
pub mod exporter;

pub use types::*;
pub use selector::{select, NamePredicate};
pub use normalizer::{normalize, normalize_object, verify_exclusive};
pub use resolution::ResolutionPolicy;
pub use allocator::{allocate, allocate_into, allocate_object};
pub use executor::execute;
pub use reassign::reassign;
pub use consolidator::consolidate;
pub use exporter::{export, persist};
