mod layer;
mod transfer;

pub use layer::*;
pub use transfer::*;
