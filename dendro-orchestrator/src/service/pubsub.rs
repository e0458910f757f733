//! Pub/sub Service

use dendro_core::event::JobEvent;

use super::error::{Result, ServiceError};
use super::job::load_service;
use super::{identity, notifier};
use crate::state::AppState;

/// Wake up every compute client listening on a service
pub async fn ping_compute_clients(
    state: &AppState,
    service_name: &str,
    token: Option<&str>,
) -> Result<()> {
    let user_id = identity::authenticate_user(state, token).await?;
    let service = load_service(state, service_name).await?;
    if !service.user_is_admin(&user_id) {
        return Err(ServiceError::Unauthorized(format!(
            "user {} is not an admin of service {}",
            user_id, service_name
        )));
    }

    notifier::publish(
        state.notifier.as_ref(),
        JobEvent::PingComputeClients {
            service_name: service.service_name,
        },
    );
    Ok(())
}
