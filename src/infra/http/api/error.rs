use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::connections::ConnectionError;
use crate::application::deploy::DeployError;
use crate::application::error::ErrorReport;
use crate::application::hosting::HostingError;
use crate::application::reconcile::ReconcileError;
use crate::application::registry::RegistryError;
use crate::application::repos::RepoError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const DOMAIN_CLAIMED: &str = "domain_claimed";
    pub const TARGET_MISMATCH: &str = "target_mismatch";
    pub const HOSTING: &str = "hosting_error";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// JSON error for failures that never produced a connection record.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: &'static str) -> Self {
        Self {
            status,
            code,
            message,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn bad_request(message: &'static str, hint: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message).with_hint(hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = ErrorReport::from_message(
            "infra::http::api",
            self.status,
            match self.hint.as_deref() {
                Some(hint) => format!("{}: {hint}", self.code),
                None => format!("{}: {}", self.code, self.message),
            },
        );
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code,
                message: self.message,
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::not_found("Resource not found"),
            RepoError::Duplicate { constraint } => {
                Self::new(StatusCode::CONFLICT, codes::DUPLICATE, "Duplicate record")
                    .with_hint(constraint)
            }
            RepoError::InvalidInput { message } => {
                Self::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, "Invalid input")
                    .with_hint(message)
            }
            RepoError::Integrity { message } => Self::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
            )
            .with_hint(message),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
            ),
            RepoError::Persistence(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
            )
            .with_hint(message),
        }
    }
}

impl From<HostingError> for ApiError {
    fn from(err: HostingError) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            codes::HOSTING,
            "Hosting provider request failed",
        )
        .with_hint(err.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(message) => Self::bad_request("Invalid site request", message),
            RegistryError::Hosting(err) => err.into(),
            RegistryError::Repo(err) => err.into(),
        }
    }
}

impl From<DeployError> for ApiError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::Validation(message) => {
                Self::bad_request("Invalid deploy request", message)
            }
            DeployError::SiteNotFound(site_id) => Self::not_found("Site not found").with_hint(site_id),
            DeployError::Hosting(err) => err.into(),
            DeployError::Repo(err) => err.into(),
        }
    }
}

impl From<ConnectionError> for ApiError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Validation(message) => {
                Self::bad_request("Invalid connection request", message)
            }
            ConnectionError::DomainClaimed {
                domain,
                connection_id,
            } => Self::new(
                StatusCode::CONFLICT,
                codes::DOMAIN_CLAIMED,
                "Domain already connected",
            )
            .with_hint(format!("{domain} is held by connection {connection_id}")),
            ConnectionError::NotFound(_) => Self::not_found("Connection not found"),
            ConnectionError::Registry { source, .. } => source.into(),
            ConnectionError::Deploy { source, .. } => source.into(),
            ConnectionError::Hosting { source, .. } => source.into(),
            ConnectionError::Repo(err) => err.into(),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::NotFound(_) => Self::not_found("Connection not found"),
            ReconcileError::TargetMismatch { field, value, .. } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::TARGET_MISMATCH,
                "Poll target does not match the connection",
            )
            .with_hint(format!("{field} `{value}`")),
            ReconcileError::Repo(err) => err.into(),
        }
    }
}
