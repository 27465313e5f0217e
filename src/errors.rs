// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One field-level validation failure, reported in the 400 body.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("MongoDB error: {0}")]
    MongoDB(mongodb::error::Error),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid match id: {0}")]
    InvalidObjectId(String),

    #[error("Match not found")]
    MatchNotFound,

    #[error("Duplicate value for field: {0}")]
    Duplicate(String),

    #[error("External API error: {0}")]
    ExternalApi(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::InvalidObjectId(_) => StatusCode::BAD_REQUEST,
            AppError::MatchNotFound => StatusCode::NOT_FOUND,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::ExternalApi(_) => StatusCode::BAD_GATEWAY,
            AppError::MongoDB(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        // 5xx detail stays internal outside of development
        let message = if status.is_server_error() && is_production() {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({
            "success": false,
            "status": status.as_u16(),
            "message": message,
        });

        match &self {
            AppError::Validation(errors) => {
                body["errors"] = json!(errors);
            }
            AppError::Duplicate(field) => {
                body["errors"] = json!([{
                    "field": field,
                    "message": format!("{} already exists", field),
                }]);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

fn is_production() -> bool {
    std::env::var("APP_ENV").map(|v| v == "production").unwrap_or(false)
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        // E11000 on the unique sparse apiId index
        if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we)) =
            &*err.kind
        {
            if we.code == 11000 {
                return AppError::Duplicate("apiId".to_string());
            }
        }
        AppError::MongoDB(err)
    }
}

impl From<bson::oid::Error> for AppError {
    fn from(err: bson::oid::Error) -> Self {
        AppError::InvalidObjectId(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(format!("HTTP request failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let errors = errs
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();
        AppError::Validation(errors)
    }
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError {
            field: field.into(),
            message: message.into(),
        }])
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
