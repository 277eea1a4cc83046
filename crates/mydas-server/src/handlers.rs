//! HTTP handlers for the DAS commands

use crate::error::DasFailure;
use crate::headers::with_das_headers;
use crate::state::AppState;
use crate::xml::to_das_xml;
use axum::{
    extract::{Path, State},
    http::{
        header::{CONTENT_TYPE, LOCATION},
        StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use mydas_commands::DasDocument;
use mydas_core::DasStatus;
use serde_json::{json, Value};
use tracing::error;

const XML_CONTENT_TYPE: &str = "text/xml";
const STYLESHEET_CONTENT_TYPE: &str = "application/xml";

/// Configure the DAS routes
pub fn configure_routes() -> Router<AppState> {
    Router::new()
        .route("/das/dsn", get(dsn))
        .route("/das/sources", get(sources))
        .route("/das/{dsn}", get(datasource_sources))
        .route("/das/{dsn}/{command}", get(datasource_command))
}

/// Liveness probe reporting the number of loaded data sources
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let datasources = state.manager.registry().list().await.len();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "datasources": datasources,
    }))
}

/// List every loaded data source
pub async fn dsn(State(state): State<AppState>, uri: Uri) -> Result<Response, DasFailure> {
    serve(&state, None, "dsn", &uri).await
}

/// DAS 1.6 metadata of every loaded data source
pub async fn sources(State(state): State<AppState>, uri: Uri) -> Result<Response, DasFailure> {
    serve(&state, None, "sources", &uri).await
}

/// DAS 1.6 metadata of a single data source
pub async fn datasource_sources(
    State(state): State<AppState>,
    Path(dsn): Path<String>,
    uri: Uri,
) -> Result<Response, DasFailure> {
    serve(&state, Some(&dsn), "sources", &uri).await
}

pub async fn datasource_command(
    State(state): State<AppState>,
    Path((dsn, command)): Path<(String, String)>,
    uri: Uri,
) -> Result<Response, DasFailure> {
    serve(&state, Some(&dsn), &command, &uri).await
}

async fn serve(
    state: &AppState,
    dsn: Option<&str>,
    command: &str,
    uri: &Uri,
) -> Result<Response, DasFailure> {
    // Clauses are separated by ';', with '&' accepted as an alias. The
    // command layer decodes each clause once it has been split.
    let query = uri.query().unwrap_or("").replace('&', ";");

    let document = state.manager.execute(dsn, command, &query).await?;

    let response = match document {
        DasDocument::Redirect(url) => {
            (StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response()
        }
        DasDocument::Stylesheet(content) => {
            ([(CONTENT_TYPE, STYLESHEET_CONTENT_TYPE)], content).into_response()
        }
        document => {
            let href = request_href(&state.global().base_url, uri);
            let body = to_das_xml(&document, &href, state.global()).map_err(|e| {
                error!("Failed to write {} response: {}", document.command(), e);
                DasFailure(DasStatus::ServerError)
            })?;
            ([(CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response()
        }
    };

    Ok(with_das_headers(response, DasStatus::Ok))
}

/// Public URL of the request: the configured `/das/` root, the path below
/// it and the raw query string
pub fn request_href(base_url: &str, uri: &Uri) -> String {
    let path = uri.path();
    let relative = path
        .strip_prefix("/das/")
        .unwrap_or_else(|| path.trim_start_matches('/'));

    let mut href = format!("{}/{}", base_url.trim_end_matches('/'), relative);
    if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
        href.push('?');
        href.push_str(query);
    }
    href
}
