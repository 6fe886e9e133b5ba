//! Identity service: token validation gate and the endpoint catalog.
//!
//! The binary `identityd` wires these modules into a server; integration
//! tests in `tests/` drive [`api::router`] directly.

use std::sync::Arc;

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod store;

use catalog::endpoints::EndpointManager;
use catalog::registry::TemplateRegistry;
use middleware::validator::TokenValidator;
use store::IdentityStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IdentityStore>,
    pub validator: TokenValidator,
    pub templates: TemplateRegistry,
    pub endpoints: EndpointManager,
    pub config: Arc<config::Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn IdentityStore>, config: config::Config) -> Self {
        Self {
            validator: TokenValidator::new(store.clone()),
            templates: TemplateRegistry::new(store.clone()),
            endpoints: EndpointManager::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }
}
