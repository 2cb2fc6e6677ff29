//! HTTP server configuration object.

use std::sync::Arc;

use fiscal_registration::inbound::http::state::HttpState;

/// Everything the server needs besides the health state.
pub struct ServerConfig {
    pub(crate) bind_addr: (String, u16),
    pub(crate) http_state: Arc<HttpState>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: (String, u16), http_state: HttpState) -> Self {
        Self {
            bind_addr,
            http_state: Arc::new(http_state),
        }
    }
}
