//! DAS protocol status codes, reported in the `X-DAS-Status` header

use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the DAS status code
pub const X_DAS_STATUS: &str = "X-DAS-Status";
/// Header carrying the protocol version
pub const X_DAS_VERSION: &str = "X-DAS-Version";
/// Header naming the server implementation
pub const X_DAS_SERVER: &str = "X-DAS-Server";
/// Header listing the supported commands
pub const X_DAS_CAPABILITIES: &str = "X-DAS-Capabilities";

pub const DAS_VERSION: &str = "DAS/1.6";
pub const DAS_CAPABILITIES: &str = "dsn/1.0; dna/1.0; types/1.0; stylesheet/1.0; features/1.0; \
     entry_points/1.0; error-segment/1.0; unknown-segment/1.0; feature-by-id/1.0; \
     group-by-id/1.0; component/1.0; supercomponent/1.0; sequence/1.0; sources/1.0";

/// Fixed enumeration of DAS status codes
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DasStatus {
    /// Request succeeded
    Ok,
    /// Unrecognised command
    BadCommand,
    /// Unknown data source
    BadDataSource,
    /// Arguments to the command are not valid
    BadCommandArguments,
    /// Unknown segment id
    BadReferenceObject,
    /// Stylesheet missing or unreadable
    BadStylesheet,
    /// Coordinates outside the segment
    CoordinateError,
    /// Server-side fault
    ServerError,
    /// Command not supported by this data source
    UnimplementedFeature,
}

impl DasStatus {
    /// Numeric DAS status code
    pub fn code(self) -> u16 {
        match self {
            DasStatus::Ok => 200,
            DasStatus::BadCommand => 400,
            DasStatus::BadDataSource => 401,
            DasStatus::BadCommandArguments => 402,
            DasStatus::BadReferenceObject => 403,
            DasStatus::BadStylesheet => 404,
            DasStatus::CoordinateError => 405,
            DasStatus::ServerError => 500,
            DasStatus::UnimplementedFeature => 501,
        }
    }

    pub fn is_success(self) -> bool {
        self == DasStatus::Ok
    }

    /// Client errors are the caller's fault and are never retried
    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.code())
    }
}

impl fmt::Display for DasStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
