pub mod error;
pub mod host;
pub mod types;

pub use error::{BakeError, BakeResult};
pub use host::Host;
pub use types::*;
