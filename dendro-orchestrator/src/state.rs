//! Shared application state

use std::sync::Arc;

use crate::config::Config;
use crate::repository::{ComputeClientStore, IdentityResolver, JobStore, ServiceDirectory};
use crate::service::notifier::Notifier;

/// Everything a request handler needs, cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub compute_clients: Arc<dyn ComputeClientStore>,
    pub services: Arc<dyn ServiceDirectory>,
    pub identity: Arc<dyn IdentityResolver>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<Config>,
}
