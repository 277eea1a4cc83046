//! Mapping of command failures onto HTTP responses

use crate::headers::with_das_headers;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use mydas_commands::DasError;
use mydas_core::DasStatus;

/// HTTP status reported alongside a DAS status
pub fn http_status(status: DasStatus) -> StatusCode {
    match status {
        DasStatus::Ok => StatusCode::OK,
        DasStatus::BadCommand | DasStatus::BadCommandArguments | DasStatus::CoordinateError => {
            StatusCode::BAD_REQUEST
        }
        DasStatus::BadDataSource | DasStatus::BadReferenceObject | DasStatus::BadStylesheet => {
            StatusCode::NOT_FOUND
        }
        DasStatus::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        DasStatus::UnimplementedFeature => StatusCode::NOT_IMPLEMENTED,
    }
}

/// A failed DAS request: the status travels in the headers, the body is empty
#[derive(Debug)]
pub struct DasFailure(pub DasStatus);

impl From<DasError> for DasFailure {
    fn from(error: DasError) -> Self {
        Self(error.status())
    }
}

impl IntoResponse for DasFailure {
    fn into_response(self) -> Response {
        with_das_headers(http_status(self.0).into_response(), self.0)
    }
}
