//! Compute Client Service
//!
//! Registration and configuration of compute clients.

use dendro_core::clock::now_sec;
use dendro_core::domain::compute_client::ComputeClient;
use dendro_core::dto::compute_client::{
    RegisterComputeClientRequest, RegisterComputeClientResponse, SetComputeClientInfoRequest,
};
use dendro_core::ids;

use super::error::{Result, ServiceError};
use super::identity;
use crate::state::AppState;

pub(crate) async fn load_compute_client(
    state: &AppState,
    compute_client_id: &str,
) -> Result<ComputeClient> {
    state
        .compute_clients
        .find_by_id(compute_client_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Compute client {} not found", compute_client_id))
        })
}

/// The compute client, if `token` is its private key
pub async fn authenticate_compute_client(
    state: &AppState,
    compute_client_id: &str,
    token: Option<&str>,
) -> Result<ComputeClient> {
    let client = load_compute_client(state, compute_client_id).await?;
    match (client.compute_client_private_key.as_deref(), token) {
        (Some(expected), Some(given)) if expected == given => Ok(client),
        _ => Err(ServiceError::Unauthorized(format!(
            "invalid private key for compute client {}",
            compute_client_id
        ))),
    }
}

/// Load a compute client the caller owns
async fn load_owned(
    state: &AppState,
    compute_client_id: &str,
    token: Option<&str>,
) -> Result<ComputeClient> {
    let user_id = identity::authenticate_user(state, token).await?;
    let client = load_compute_client(state, compute_client_id).await?;
    if client.user_id != user_id {
        return Err(ServiceError::Unauthorized(format!(
            "user {} does not own compute client {}",
            user_id, compute_client_id
        )));
    }
    Ok(client)
}

pub async fn register_compute_client(
    state: &AppState,
    token: Option<&str>,
    req: RegisterComputeClientRequest,
) -> Result<RegisterComputeClientResponse> {
    let user_id = identity::authenticate_user(state, token).await?;

    let client = ComputeClient {
        compute_client_id: ids::generate_compute_client_id(),
        compute_client_private_key: Some(ids::generate_compute_client_private_key()),
        compute_client_name: req.compute_client_name,
        description: req.description,
        user_id,
        service_names: req.service_names,
        compute_slots: req.compute_slots,
        process_jobs_for_users: req.process_jobs_for_users,
        timestamp_created_sec: now_sec(),
        timestamp_last_active_sec: None,
    };
    state.compute_clients.insert(&client).await?;

    tracing::info!(
        compute_client_id = %client.compute_client_id,
        owner = %client.user_id,
        "Compute client registered"
    );

    Ok(RegisterComputeClientResponse {
        compute_client_id: client.compute_client_id,
        compute_client_private_key: client.compute_client_private_key.unwrap_or_default(),
    })
}

/// Public view of a compute client, without its private key
pub async fn get_compute_client(
    state: &AppState,
    compute_client_id: &str,
) -> Result<ComputeClient> {
    let mut client = load_compute_client(state, compute_client_id).await?;
    client.compute_client_private_key = None;
    Ok(client)
}

pub async fn set_compute_client_info(
    state: &AppState,
    compute_client_id: &str,
    token: Option<&str>,
    req: SetComputeClientInfoRequest,
) -> Result<()> {
    let patch = req.into_patch()?;
    load_owned(state, compute_client_id, token).await?;

    if !state.compute_clients.update(compute_client_id, &patch).await? {
        return Err(ServiceError::NotFound(format!(
            "Compute client {} not found",
            compute_client_id
        )));
    }
    tracing::info!(compute_client_id = %compute_client_id, "Compute client updated");
    Ok(())
}

pub async fn delete_compute_client(
    state: &AppState,
    compute_client_id: &str,
    token: Option<&str>,
) -> Result<()> {
    load_owned(state, compute_client_id, token).await?;
    state.compute_clients.delete(compute_client_id).await?;
    tracing::info!(compute_client_id = %compute_client_id, "Compute client deleted");
    Ok(())
}
