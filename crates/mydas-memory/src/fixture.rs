//! On-disk description of an in-memory data source

use mydas_query::{DataError, EntryPoint, Feature, FeatureType, MoleculeType, Orientation, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One segment with its residues and annotations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSegment {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub segment_type: Option<String>,
    /// Residues; when absent the segment has no sequence and `length` must be given
    #[serde(default)]
    pub sequence: Option<String>,
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub molecule_type: MoleculeType,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub has_subparts: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FixtureSegment {
    pub fn new(id: impl Into<String>, length: u64) -> Self {
        Self {
            id: id.into(),
            label: None,
            segment_type: None,
            sequence: None,
            length: Some(length),
            molecule_type: MoleculeType::Dna,
            orientation: Orientation::Positive,
            has_subparts: false,
            description: None,
            features: Vec::new(),
        }
    }

    pub fn with_sequence(mut self, residues: impl Into<String>) -> Self {
        let residues = residues.into();
        self.length = Some(residues.len() as u64);
        self.sequence = Some(residues);
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Length of the segment in residues
    pub fn len(&self) -> u64 {
        self.length
            .or_else(|| self.sequence.as_ref().map(|s| s.len() as u64))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry_point(&self) -> EntryPoint {
        EntryPoint {
            segment_id: self.id.clone(),
            start: 1,
            stop: self.len(),
            segment_type: self.segment_type.clone(),
            orientation: self.orientation,
            has_subparts: self.has_subparts,
            description: self.description.clone(),
        }
    }
}

/// Complete content of an in-memory data source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    /// Version reported on every segment
    #[serde(default = "default_version")]
    pub version: String,
    /// Serve sequences and entry points
    #[serde(default)]
    pub reference: bool,
    /// Restrict features and sequences to requested ranges
    #[serde(default)]
    pub range_handling: bool,
    /// Report global per-type feature counts
    #[serde(default)]
    pub count_types: bool,
    #[serde(default)]
    pub entry_point_version: Option<String>,
    /// Link command template; `{field}` and `{id}` are substituted
    #[serde(default)]
    pub link_template: Option<String>,
    /// Explicit type catalogue; derived from the features when absent
    #[serde(default)]
    pub types: Option<Vec<FeatureType>>,
    #[serde(default)]
    pub segments: Vec<FixtureSegment>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            version: default_version(),
            reference: false,
            range_handling: false,
            count_types: false,
            entry_point_version: None,
            link_template: None,
            types: None,
            segments: Vec::new(),
        }
    }
}

impl Fixture {
    /// Load a YAML (or JSON) fixture file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataError::invalid_configuration(format!(
                "Failed to read fixture {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let fixture: Fixture = serde_yaml::from_str(content)
            .map_err(|e| DataError::invalid_configuration(format!("Invalid fixture: {}", e)))?;
        fixture.validate()?;
        Ok(fixture)
    }

    pub fn validate(&self) -> Result<()> {
        for segment in &self.segments {
            if segment.length.is_none() && segment.sequence.is_none() {
                return Err(DataError::invalid_configuration(format!(
                    "Segment {} needs either a sequence or a length",
                    segment.id
                )));
            }
            if let (Some(length), Some(sequence)) = (segment.length, &segment.sequence) {
                if length != sequence.len() as u64 {
                    return Err(DataError::invalid_configuration(format!(
                        "Segment {} declares length {} but has {} residues",
                        segment.id,
                        length,
                        sequence.len()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn segment(&self, segment_id: &str) -> Option<&FixtureSegment> {
        self.segments.iter().find(|s| s.id == segment_id)
    }

    /// Type catalogue, in first-seen order when derived from the features
    pub fn type_catalogue(&self) -> Vec<FeatureType> {
        if let Some(types) = &self.types {
            return types.clone();
        }

        let mut catalogue: Vec<FeatureType> = Vec::new();
        for feature in self.segments.iter().flat_map(|s| s.features.iter()) {
            let feature_type = feature.feature_type();
            if !catalogue.contains(&feature_type) {
                catalogue.push(feature_type);
            }
        }
        catalogue
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixture() {
        let yaml = r#"
reference: true
entry_point_version: "38"
segments:
  - id: chr1
    sequence: ACGTACGTAC
    features:
      - id: e1
        type_id: exon
        start: 2
        stop: 5
      - id: e2
        type_id: exon
        type_category: transcription
        start: 6
        stop: 9
  - id: chr2
    length: 500
"#;
        let fixture = Fixture::from_yaml_str(yaml).unwrap();
        assert!(fixture.reference);
        assert!(!fixture.range_handling);
        assert_eq!(fixture.version, "1.0");
        assert_eq!(fixture.segment("chr1").unwrap().len(), 10);
        assert_eq!(fixture.segment("chr2").unwrap().len(), 500);
        assert_eq!(
            fixture.type_catalogue(),
            vec![
                FeatureType::new("exon"),
                FeatureType::new("exon").with_category("transcription"),
            ]
        );
    }

    #[test]
    fn test_segment_needs_length_or_sequence() {
        let err = Fixture::from_yaml_str("segments:\n  - id: chr1\n").unwrap_err();
        assert!(matches!(err, DataError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_length_must_match_sequence() {
        let yaml = "segments:\n  - id: chr1\n    sequence: ACGT\n    length: 5\n";
        assert!(Fixture::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_entry_point_from_segment() {
        let segment = FixtureSegment::new("chrX", 1000);
        let entry_point = segment.entry_point();
        assert_eq!(entry_point.start, 1);
        assert_eq!(entry_point.stop, 1000);
        assert_eq!(entry_point.orientation, Orientation::Positive);
    }
}
