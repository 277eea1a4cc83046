use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capabilities a data source can declare
///
/// Every data source serves annotations. The remaining tags select which
/// retrieval calls the server may make.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Serves features for segments
    Annotation,
    /// Serves sequences and entry points
    Reference,
    /// Restricts features (and sequences, for reference sources) to a
    /// requested range itself
    RangeHandling,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Annotation => write!(f, "annotation"),
            Capability::Reference => write!(f, "reference"),
            Capability::RangeHandling => write!(f, "range-handling"),
        }
    }
}

/// Strand of a feature or entry point
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "+")]
    Positive,
    #[serde(rename = "-")]
    Negative,
    #[default]
    #[serde(rename = "0")]
    NotApplicable,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Positive => write!(f, "+"),
            Orientation::Negative => write!(f, "-"),
            Orientation::NotApplicable => write!(f, "0"),
        }
    }
}

/// Feature type as reported by the types command.
///
/// Used as the key of type summaries: two features share a summary row when
/// their type id, category and method all match.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureType {
    pub id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

impl FeatureType {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: None,
            method: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.id,
            self.category.as_deref().unwrap_or("null"),
            self.method.as_deref().unwrap_or("null")
        )
    }
}

/// Hyperlink attached to a feature or group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLink {
    pub href: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Alignment target of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTarget {
    pub id: String,
    pub start: u64,
    pub stop: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Group a feature belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroup {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub group_type: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub links: Vec<FeatureLink>,
}

/// A single annotation on a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub type_id: String,
    #[serde(default)]
    pub type_label: Option<String>,
    #[serde(default)]
    pub type_category: Option<String>,
    #[serde(default)]
    pub method_id: Option<String>,
    #[serde(default)]
    pub method_label: Option<String>,
    /// Zero start and stop mark a non-positional feature
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub stop: u64,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub orientation: Orientation,
    /// Reading frame 0-2, absent when not applicable
    #[serde(default)]
    pub phase: Option<u8>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub links: Vec<FeatureLink>,
    #[serde(default)]
    pub targets: Vec<FeatureTarget>,
    #[serde(default)]
    pub groups: Vec<FeatureGroup>,
}

impl Feature {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, start: u64, stop: u64) -> Self {
        Self {
            id: id.into(),
            label: None,
            type_id: type_id.into(),
            type_label: None,
            type_category: None,
            method_id: None,
            method_label: None,
            start,
            stop,
            score: None,
            orientation: Orientation::NotApplicable,
            phase: None,
            notes: Vec::new(),
            links: Vec::new(),
            targets: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Summary key of this feature's type
    pub fn feature_type(&self) -> FeatureType {
        FeatureType {
            id: self.type_id.clone(),
            category: self.type_category.clone(),
            method: self.method_id.clone(),
        }
    }

    pub fn is_positional(&self) -> bool {
        !(self.start == 0 && self.stop == 0)
    }

    /// Whether the feature lies entirely inside `[start, stop]`
    pub fn is_enclosed_by(&self, start: u64, stop: u64) -> bool {
        self.start >= start && self.stop <= stop
    }
}

/// Features of one segment as returned by a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSegment {
    pub segment_id: String,
    pub start: u64,
    pub stop: u64,
    pub version: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub segment_type: Option<String>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Kind of molecule a sequence describes
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum MoleculeType {
    #[default]
    #[serde(rename = "DNA")]
    Dna,
    #[serde(rename = "ssRNA")]
    SsRna,
    #[serde(rename = "dsRNA")]
    DsRna,
    #[serde(rename = "Protein")]
    Protein,
}

impl fmt::Display for MoleculeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoleculeType::Dna => write!(f, "DNA"),
            MoleculeType::SsRna => write!(f, "ssRNA"),
            MoleculeType::DsRna => write!(f, "dsRNA"),
            MoleculeType::Protein => write!(f, "Protein"),
        }
    }
}

/// Residues of a segment (or of a range of it)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub segment_id: String,
    /// Coordinate of the first residue in `residues`
    pub start: u64,
    pub version: String,
    #[serde(default)]
    pub molecule_type: MoleculeType,
    pub residues: String,
}

impl Sequence {
    /// Coordinate of the last residue
    pub fn stop(&self) -> u64 {
        self.start + (self.residues.len() as u64).saturating_sub(1)
    }
}

/// Top-level segment exposed by a reference source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub segment_id: String,
    pub start: u64,
    pub stop: u64,
    #[serde(default, rename = "type")]
    pub segment_type: Option<String>,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub has_subparts: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Fields the link command can resolve
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkField {
    Category,
    Feature,
    Method,
    Target,
    Type,
}

impl LinkField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkField::Category => "category",
            LinkField::Feature => "feature",
            LinkField::Method => "method",
            LinkField::Target => "target",
            LinkField::Type => "type",
        }
    }
}

impl fmt::Display for LinkField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(LinkField::Category),
            "feature" => Ok(LinkField::Feature),
            "method" => Ok(LinkField::Method),
            "target" => Ok(LinkField::Target),
            "type" => Ok(LinkField::Type),
            other => Err(format!("unknown link field: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_type_key() {
        let mut feature = Feature::new("f1", "exon", 10, 20);
        feature.type_category = Some("transcription".to_string());
        assert_eq!(
            feature.feature_type(),
            FeatureType::new("exon").with_category("transcription")
        );
        assert_eq!(feature.feature_type().to_string(), "exon/transcription/null");
    }

    #[test]
    fn test_feature_enclosure() {
        let feature = Feature::new("f1", "exon", 150, 160);
        assert!(feature.is_enclosed_by(100, 200));
        assert!(!feature.is_enclosed_by(155, 200));
        assert!(feature.is_positional());
        assert!(!Feature::new("f2", "note", 0, 0).is_positional());
    }

    #[test]
    fn test_sequence_stop() {
        let sequence = Sequence {
            segment_id: "chr1".to_string(),
            start: 100,
            version: "1".to_string(),
            molecule_type: MoleculeType::Dna,
            residues: "ACGT".to_string(),
        };
        assert_eq!(sequence.stop(), 103);
    }

    #[test]
    fn test_link_field_parse() {
        assert_eq!("target".parse::<LinkField>(), Ok(LinkField::Target));
        assert!("segment".parse::<LinkField>().is_err());
        assert_eq!(LinkField::Method.to_string(), "method");
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::Reference.to_string(), "reference");
        assert_eq!(Capability::RangeHandling.to_string(), "range-handling");
    }
}
