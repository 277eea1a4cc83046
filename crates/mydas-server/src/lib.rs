//! # mydas-server
//!
//! HTTP transport of the DAS command layer. Requests under `/das/` are
//! handed to the [`CommandManager`](mydas_commands::CommandManager) and its
//! documents are written as DAS XML.

pub mod error;
pub mod handlers;
pub mod headers;
pub mod routes;
pub mod state;
pub mod xml;

pub use error::{http_status, DasFailure};
pub use routes::create_router;
pub use state::AppState;
pub use xml::{to_das_xml, XmlError};
