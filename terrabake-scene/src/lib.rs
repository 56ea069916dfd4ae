pub mod data;
mod scene;
mod modifier;
mod unwrap;
mod bake;
mod join;
mod export;
mod snapshot;

pub use data::*;
pub use scene::{Lighting, MemoryScene, SceneSettings};
pub use unwrap::smart_project;
