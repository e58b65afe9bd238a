mod errors;
mod feed_forward;

pub use errors::*;
pub use feed_forward::*;
