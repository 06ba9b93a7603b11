use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::application::connections::{
    ConnectCommand, ConnectOutcome, ConnectionError, LaunchCommand,
};
use crate::application::deploy::{DeployCommand, DeployError};
use crate::application::error::ErrorReport;
use crate::application::reconcile::PollTarget;
use crate::application::registry::{EnsureSiteCommand, RegistryError};
use crate::domain::types::ConnectionStatus;
use siteline_api_types::{
    ConnectRequest, ConnectResponse, ConnectionEventView, ConnectionView, DeployRequest,
    DeployResponse, DisconnectResponse, EnsureSiteRequest, EnsureSiteResponse, LaunchRequest,
    PollResponse,
};

use super::error::ApiError;
use super::state::ApiState;

pub async fn ensure_site(
    State(state): State<ApiState>,
    Json(payload): Json<EnsureSiteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ensured = state
        .registry
        .ensure_site(EnsureSiteCommand {
            project_id: payload.project_id,
            business_name: payload.business_name,
            lead_id: payload.lead_id,
            agency_id: payload.agency_id,
            user_id: payload.user_id,
            site_kind: payload.site_kind,
        })
        .await?;

    let status = if ensured.is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(EnsureSiteResponse {
            site_id: ensured.site_id,
            is_new: ensured.is_new,
            default_url: ensured.default_url,
        }),
    ))
}

pub async fn deploy_site(
    State(state): State<ApiState>,
    Path(site_id): Path<String>,
    Json(payload): Json<DeployRequest>,
) -> Result<Response, ApiError> {
    let result = state
        .deployer
        .deploy(DeployCommand {
            project_id: payload.project_id,
            site_id,
            html_content: payload.html_content,
            message: payload.message,
        })
        .await;

    match result {
        Ok(release) => Ok(Json(DeployResponse {
            success: true,
            site_url: Some(release.site_url),
            version_id: Some(release.version_id),
            release_id: Some(release.release_id),
            error: None,
        })
        .into_response()),
        Err(DeployError::Hosting(err)) => {
            let mut response = (
                StatusCode::BAD_GATEWAY,
                Json(DeployResponse {
                    success: false,
                    site_url: None,
                    version_id: None,
                    release_id: None,
                    error: Some(err.to_string()),
                }),
            )
                .into_response();
            ErrorReport::from_error("infra::http::api::deploy", StatusCode::BAD_GATEWAY, &err)
                .attach(&mut response);
            Ok(response)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn connect_domain(
    State(state): State<ApiState>,
    Json(payload): Json<ConnectRequest>,
) -> Result<Response, ApiError> {
    let result = state
        .connections
        .connect(ConnectCommand {
            project_id: None,
            domain: payload.domain,
            lead_id: payload.lead_id,
            agency_id: payload.agency_id,
            user_id: payload.user_id,
            business_name: payload.business_name,
            html_content: payload.html_content,
            method: payload.method,
        })
        .await;

    connect_response(result)
}

pub async fn launch_site(
    State(state): State<ApiState>,
    Json(payload): Json<LaunchRequest>,
) -> Result<Response, ApiError> {
    let result = state
        .connections
        .launch(LaunchCommand {
            project_id: None,
            lead_id: payload.lead_id,
            agency_id: payload.agency_id,
            user_id: payload.user_id,
            business_name: payload.business_name,
            html_content: payload.html_content,
        })
        .await;

    connect_response(result)
}

pub async fn get_connection(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionView>, ApiError> {
    let record = state.connections.get(id).await?;
    Ok(Json(record.to_view()))
}

pub async fn connection_events(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ConnectionEventView>>, ApiError> {
    let events = state.connections.history(id).await?;
    Ok(Json(events.iter().map(|event| event.to_view()).collect()))
}

pub async fn poll_connection(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PollResponse>, ApiError> {
    let outcome = state
        .reconciler
        .poll_once(PollTarget::connection(id))
        .await?;

    Ok(Json(PollResponse {
        is_complete: outcome.is_complete,
        requires_retry: outcome.requires_retry,
        next_check_delay_seconds: outcome.next_check_delay.map(|delay| delay.as_secs()),
        status: Some(outcome.status),
        error: outcome.error,
    }))
}

pub async fn disconnect(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DisconnectResponse>, ApiError> {
    let record = state.connections.disconnect(id).await?;

    Ok(Json(DisconnectResponse {
        connection_id: record.id,
        status: record.status,
    }))
}

fn connect_response(
    result: Result<ConnectOutcome, ConnectionError>,
) -> Result<Response, ApiError> {
    match result {
        Ok(outcome) => Ok((
            StatusCode::CREATED,
            Json(ConnectResponse {
                success: true,
                connection_id: Some(outcome.connection_id),
                site_id: Some(outcome.site_id),
                site_url: Some(outcome.site_url),
                status: Some(outcome.status),
                dns_records: outcome.dns_records,
                error: outcome.error,
            }),
        )
            .into_response()),
        Err(err) => match err.connection_id() {
            Some(connection_id) if !matches!(err, ConnectionError::NotFound(_)) => {
                let status = failed_connection_status(&err);
                let mut response = (
                    status,
                    Json(ConnectResponse {
                        success: false,
                        connection_id: Some(connection_id),
                        site_id: None,
                        site_url: None,
                        status: Some(ConnectionStatus::Error),
                        dns_records: Vec::new(),
                        error: Some(err.to_string()),
                    }),
                )
                    .into_response();
                ErrorReport::from_error("infra::http::api::connections", status, &err)
                    .attach(&mut response);
                Ok(response)
            }
            _ => Err(err.into()),
        },
    }
}

/// Failures recorded on an existing connection: invalid input is still the
/// caller's fault, everything else came from the provider.
fn failed_connection_status(err: &ConnectionError) -> StatusCode {
    match err {
        ConnectionError::Registry {
            source: RegistryError::Validation(_),
            ..
        }
        | ConnectionError::Deploy {
            source: DeployError::Validation(_),
            ..
        } => StatusCode::BAD_REQUEST,
        ConnectionError::Registry {
            source: RegistryError::Repo(_),
            ..
        }
        | ConnectionError::Deploy {
            source: DeployError::Repo(_),
            ..
        } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}
