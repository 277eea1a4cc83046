//! # mydas-commands
//!
//! The DAS command layer: reads query strings, checks them against each
//! command's argument rules, resolves segments through the shared cache and
//! the data source capabilities, and produces an abstract [`DasDocument`]
//! (or a [`DasError`] carrying the DAS status) for the transport to write.
//!
//! ```rust,no_run
//! use mydas_commands::CommandManager;
//! # async fn example(manager: CommandManager) {
//! let document = manager
//!     .execute(Some("ensembl"), "features", "segment=chr1:100,200;type=exon")
//!     .await;
//! # }
//! ```

pub mod adapter;
pub mod aggregator;
pub mod dispatcher;
pub mod documents;
pub mod error;
pub mod parser;

pub use adapter::BackendAdapter;
pub use aggregator::SegmentAggregator;
pub use dispatcher::{CommandManager, DasCommand};
pub use documents::{
    DasDocument, DsnEntry, EntryPointsDocument, FeaturesDocument, FoundSegment, SegmentResult,
    TypeSummary, TypesSegment, UnknownSegment, COMPLETE_SUMMARY_LABEL,
};
pub use error::{DasError, Result};
pub use parser::{
    parse_query, FeatureRequestFilter, MalformedQuery, ParsedQuery, QueryKind, RowRange,
    SegmentQuery,
};
