mod config;
mod editors;
mod errors;
mod genome;
mod transcoders;

pub use config::*;
pub use errors::*;
pub use genome::*;
pub use transcoders::*;

#[cfg(test)]
pub(crate) use genome::tests::uniform_genome;
