//! HTTP inbound adapter exposing REST endpoints.

pub mod error;
pub mod health;
pub mod localities;
pub mod registrations;
pub mod state;
#[cfg(test)]
pub mod test_utils;

pub use error::ApiResult;
