pub mod error;
pub mod memory;
pub mod traits;
pub mod types;
pub mod wire;

pub use error::*;
pub use memory::*;
pub use traits::*;
pub use types::*;
