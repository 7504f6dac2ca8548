pub mod doubles;
pub mod harness;

pub use doubles::*;
pub use harness::*;
