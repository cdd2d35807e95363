pub mod bm25;
pub mod corpus;

mod error;

pub use bm25::Bm25Index;
pub use corpus::{Chunk, Corpus};
pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
