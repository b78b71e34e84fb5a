//! Utility functions shared across the crate.
//!
//! - **Input hygiene**: stripping terminal control sequences from operator input
//! - **Endpoint validation**: HTTPS enforcement for the remote service base URLs

mod endpoint;
mod text;

pub use endpoint::{validate_endpoint, EndpointError};
pub use text::{clean_input, strip_control_chars};
