use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ride_share_data_management::DataManagerError;
use ride_share_lib::ValidationError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("please enter the password")]
    MissingPassword,

    #[error("wrong password")]
    WrongPassword,

    #[error("not authorised")]
    Unauthorised,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Data(#[from] DataManagerError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::MissingPassword | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::WrongPassword | AppError::Unauthorised => StatusCode::FORBIDDEN,
            AppError::Data(err) => match err {
                DataManagerError::NotFound(..) => StatusCode::NOT_FOUND,
                DataManagerError::Validation(_) | DataManagerError::NotAttached(..) => StatusCode::BAD_REQUEST,
                DataManagerError::SeatsInsufficient(_)
                | DataManagerError::AlreadyMatched(_)
                | DataManagerError::Conflict(_) => StatusCode::CONFLICT,
                DataManagerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Message safe to show to the user.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Data(DataManagerError::Database(_)) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("Request failed with {status}: {self}");
        }

        (status, Json(json!({ "ok": false, "error": self.public_message() }))).into_response()
    }
}
