//! Infrastructure layer - external adapters (network, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod api;
pub mod storage;
pub mod token;

pub use api::RefernApi;
pub use token::load_token;
