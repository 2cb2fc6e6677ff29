//! Registration API adapters.

mod http_api;

pub use http_api::HttpRegistrationApi;
