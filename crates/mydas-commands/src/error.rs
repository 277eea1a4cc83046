use crate::parser::MalformedQuery;
use mydas_core::DasStatus;
use mydas_query::DataError;
use thiserror::Error;

/// Failure of a DAS command, carrying everything needed to pick the
/// `X-DAS-Status` of the response
#[derive(Error, Debug)]
pub enum DasError {
    #[error("Bad command: {0}")]
    BadCommand(String),

    #[error("Bad data source: {0}")]
    BadDataSource(String),

    #[error("Bad command arguments: {0}")]
    BadCommandArguments(String),

    #[error("Bad stylesheet: {0}")]
    BadStylesheet(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl DasError {
    pub fn status(&self) -> DasStatus {
        match self {
            DasError::BadCommand(_) => DasStatus::BadCommand,
            DasError::BadDataSource(_) => DasStatus::BadDataSource,
            DasError::BadCommandArguments(_) => DasStatus::BadCommandArguments,
            DasError::BadStylesheet(_) => DasStatus::BadStylesheet,
            DasError::ServerError(_) => DasStatus::ServerError,
            DasError::Data(data) => match data {
                DataError::BadReferenceObject { .. } => DasStatus::BadReferenceObject,
                DataError::CoordinateError { .. } => DasStatus::CoordinateError,
                DataError::UnimplementedFeature(_) => DasStatus::UnimplementedFeature,
                DataError::DataSource(_) | DataError::InvalidConfiguration(_) => {
                    DasStatus::ServerError
                }
            },
        }
    }

    pub fn bad_arguments(msg: impl Into<String>) -> Self {
        DasError::BadCommandArguments(msg.into())
    }
}

impl From<MalformedQuery> for DasError {
    fn from(err: MalformedQuery) -> Self {
        DasError::BadCommandArguments(err.0)
    }
}

pub type Result<T> = std::result::Result<T, DasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DasError::BadCommand("foo".into()).status().code(),
            400
        );
        assert_eq!(
            DasError::from(MalformedQuery("x".into())).status(),
            DasStatus::BadCommandArguments
        );
        assert_eq!(
            DasError::from(DataError::bad_reference("chr9", "unknown")).status().code(),
            403
        );
        assert_eq!(
            DasError::from(DataError::coordinate_error("chr1", "past end")).status().code(),
            405
        );
        assert_eq!(
            DasError::from(DataError::unimplemented("dna")).status().code(),
            501
        );
        assert_eq!(
            DasError::from(DataError::data_source("timeout")).status().code(),
            500
        );
        assert_eq!(DasError::BadStylesheet("none".into()).status().code(), 404);
    }
}
