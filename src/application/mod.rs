// Application layer - the operation lifecycle.
// Every read goes to the store; nothing is cached between calls.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
