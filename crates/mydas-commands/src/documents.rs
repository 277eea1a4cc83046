//! Abstract responses handed to the serialization layer
//!
//! Every field the DAS vocabularies need is present here; absent values are
//! `None` and are never replaced by empty strings or zero counts.

use mydas_core::DataSourceConfig;
use mydas_query::{AnnotatedSegment, EntryPoint, Feature, FeatureType, Sequence};
use std::collections::BTreeMap;
use url::Url;

/// Occurrence count per feature type. `None` means the data source cannot
/// count that type.
pub type TypeSummary = BTreeMap<FeatureType, Option<u64>>;

/// A requested segment the data source resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FoundSegment {
    pub segment_id: String,
    pub start: u64,
    pub stop: u64,
    pub version: String,
    pub label: Option<String>,
    pub segment_type: Option<String>,
    pub features: Vec<Feature>,
}

impl FoundSegment {
    /// Whole segment as returned by the data source
    pub fn from_annotated(segment: &AnnotatedSegment) -> Self {
        Self {
            segment_id: segment.segment_id.clone(),
            start: segment.start,
            stop: segment.stop,
            version: segment.version.clone(),
            label: segment.label.clone(),
            segment_type: segment.segment_type.clone(),
            features: segment.features.clone(),
        }
    }
}

/// A requested segment the data source did not know or could not serve at
/// the requested coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSegment {
    pub segment_id: String,
    pub start: Option<u64>,
    pub stop: Option<u64>,
}

/// Outcome of resolving one requested segment
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentResult {
    Found(FoundSegment),
    Unknown(UnknownSegment),
}

impl SegmentResult {
    pub fn segment_id(&self) -> &str {
        match self {
            SegmentResult::Found(found) => &found.segment_id,
            SegmentResult::Unknown(unknown) => &unknown.segment_id,
        }
    }

    pub fn as_found(&self) -> Option<&FoundSegment> {
        match self {
            SegmentResult::Found(found) => Some(found),
            SegmentResult::Unknown(_) => None,
        }
    }
}

/// One row of the `dsn` listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsnEntry {
    pub id: String,
    pub version: Option<String>,
    /// Name shown for the source; the id when no name is configured
    pub name: String,
    pub mapmaster: String,
    pub description: Option<String>,
}

impl From<&DataSourceConfig> for DsnEntry {
    fn from(config: &DataSourceConfig) -> Self {
        Self {
            id: config.id.clone(),
            version: config.version.clone().filter(|v| !v.is_empty()),
            name: config.display_name().to_string(),
            mapmaster: config.mapmaster.clone(),
            description: config.description.clone().filter(|d| !d.is_empty()),
        }
    }
}

/// Type counts of one segment, or of the whole source when `segment_id`
/// is absent
#[derive(Debug, Clone, PartialEq)]
pub struct TypesSegment {
    pub segment_id: Option<String>,
    pub start: Option<u64>,
    pub stop: Option<u64>,
    pub segment_type: Option<String>,
    pub version: Option<String>,
    pub label: Option<String>,
    pub types: TypeSummary,
}

pub const COMPLETE_SUMMARY_LABEL: &str = "Complete datasource summary";

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturesDocument {
    pub segments: Vec<SegmentResult>,
    /// Report feature categories
    pub categorize: bool,
    /// Unknown segments of reference sources are error segments
    pub reference_source: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryPointsDocument {
    pub version: String,
    /// Number of entry points before paging
    pub total: usize,
    /// Requested rows, echoed when given
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub entry_points: Vec<EntryPoint>,
    /// Raw query string as received
    pub query: String,
}

/// Abstract result of a successful command
#[derive(Debug, Clone, PartialEq)]
pub enum DasDocument {
    Dsn(Vec<DsnEntry>),
    Sources(Vec<DataSourceConfig>),
    Dna(Vec<Sequence>),
    Sequence(Vec<Sequence>),
    Types(Vec<TypesSegment>),
    Features(FeaturesDocument),
    EntryPoints(EntryPointsDocument),
    /// Target of the link command
    Redirect(Url),
    Stylesheet(String),
}

impl DasDocument {
    /// Name of the command that produced this document
    pub fn command(&self) -> &'static str {
        match self {
            DasDocument::Dsn(_) => "dsn",
            DasDocument::Sources(_) => "sources",
            DasDocument::Dna(_) => "dna",
            DasDocument::Sequence(_) => "sequence",
            DasDocument::Types(_) => "types",
            DasDocument::Features(_) => "features",
            DasDocument::EntryPoints(_) => "entry_points",
            DasDocument::Redirect(_) => "link",
            DasDocument::Stylesheet(_) => "stylesheet",
        }
    }
}
