pub mod candidate;
pub mod errors;

pub use candidate::*;
pub use errors::*;
