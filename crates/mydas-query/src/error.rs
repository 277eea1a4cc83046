use thiserror::Error;

/// Failures reported by data source plugins
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// The segment id is not known to the data source
    #[error("Bad reference object {segment_id}: {message}")]
    BadReferenceObject { segment_id: String, message: String },

    /// The requested coordinates fall outside the segment
    #[error("Coordinate error on {segment_id}: {message}")]
    CoordinateError { segment_id: String, message: String },

    /// The data source does not implement the requested operation
    #[error("Unimplemented feature: {0}")]
    UnimplementedFeature(String),

    /// Any other failure inside the data source
    #[error("Data source error: {0}")]
    DataSource(String),

    /// The data source could not be created from its configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl DataError {
    /// Create a "bad reference object" error for a segment id
    pub fn bad_reference(segment_id: impl Into<String>, message: impl Into<String>) -> Self {
        DataError::BadReferenceObject {
            segment_id: segment_id.into(),
            message: message.into(),
        }
    }

    /// Create a coordinate error for a segment id
    pub fn coordinate_error(segment_id: impl Into<String>, message: impl Into<String>) -> Self {
        DataError::CoordinateError {
            segment_id: segment_id.into(),
            message: message.into(),
        }
    }

    /// Create an unimplemented feature error
    pub fn unimplemented(msg: impl Into<String>) -> Self {
        DataError::UnimplementedFeature(msg.into())
    }

    /// Create a generic data source error
    pub fn data_source(msg: impl Into<String>) -> Self {
        DataError::DataSource(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        DataError::InvalidConfiguration(msg.into())
    }

    /// Errors about the requested segment rather than the server; commands
    /// that allow partial failure report these inline as unknown segments
    pub fn is_segment_error(&self) -> bool {
        matches!(
            self,
            DataError::BadReferenceObject { .. } | DataError::CoordinateError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_errors() {
        assert!(DataError::bad_reference("chr9", "unknown").is_segment_error());
        assert!(DataError::coordinate_error("chr1", "stop past end").is_segment_error());
        assert!(!DataError::data_source("timeout").is_segment_error());
        assert!(!DataError::unimplemented("sequence").is_segment_error());
    }

    #[test]
    fn test_error_messages() {
        let err = DataError::bad_reference("chr9", "Segment cannot be found.");
        assert_eq!(
            err.to_string(),
            "Bad reference object chr9: Segment cannot be found."
        );
    }
}
