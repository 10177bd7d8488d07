//! Common types shared by the audit client crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
