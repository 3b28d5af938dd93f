//! Domain types, error kinds, collaborator traits and the two pure
//! text-processing stages of the SOP pipeline (chunking and structured
//! response parsing).

pub mod chunker;
pub mod config;
pub mod error;
pub mod extract;
pub mod parser;
pub mod traits;
pub mod types;

pub use error::{Error, ParseError, Result};
