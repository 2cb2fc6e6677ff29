//! Form backend for fiscal (poll-watcher) volunteer registration.
//!
//! The [`domain`] holds the draft, validation rules, the reactive form
//! session and the submission state machine. [`outbound`] adapters reach the
//! CAPTCHA provider and the registration API; [`inbound`] exposes the form
//! over HTTP.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::RequestId;
