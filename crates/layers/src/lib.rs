pub mod clusters;
pub mod layer;

pub use layer::*;
