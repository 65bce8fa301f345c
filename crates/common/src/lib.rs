//! Common types, protocol definitions, and errors shared across `card-stash` crates.

pub mod error;
pub mod model;
pub mod protocol;

pub use error::ServiceError;
pub use model::{RecordId, UserId};
