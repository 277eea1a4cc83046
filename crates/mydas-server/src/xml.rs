//! DAS XML vocabularies
//!
//! Documents produced by the command layer are mapped onto serde structs
//! mirroring the DAS DTDs and written with `quick_xml::se`. Attributes use the
//! `@name` convention, element text uses `$text`.

use mydas_commands::{
    DasDocument, DsnEntry, EntryPointsDocument, FeaturesDocument, SegmentResult, TypesSegment,
};
use mydas_core::{DataSourceConfig, GlobalConfig};
use mydas_query::{EntryPoint, Feature, FeatureGroup, FeatureLink, Sequence};
use serde::Serialize;
use thiserror::Error;

pub const DTD_ROOT: &str = "http://www.biodas.org/dtd/";

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Failed to serialize {root}: {message}")]
    Serialize { root: &'static str, message: String },

    #[error("The {0} response is not an XML document")]
    NotXml(&'static str),
}

/// Serialize `document` as a complete DAS XML document.
///
/// `href` is the public URL of the request, echoed by the vocabularies that
/// carry one.
pub fn to_das_xml(
    document: &DasDocument,
    href: &str,
    global: &GlobalConfig,
) -> Result<String, XmlError> {
    match document {
        DasDocument::Dsn(entries) => write_document(
            "DASDSN",
            Some("dasdsn.dtd"),
            global.dsn_xslt.as_deref(),
            &DasDsn {
                dsn: entries.iter().map(DsnXml::from).collect(),
            },
        ),
        DasDocument::Sources(configs) => write_document(
            "SOURCES",
            None,
            None,
            &SourcesXml {
                sources: configs.iter().map(SourceXml::from).collect(),
            },
        ),
        DasDocument::Dna(sequences) => write_document(
            "DASDNA",
            Some("dasdna.dtd"),
            global.dna_xslt.as_deref(),
            &DasDna {
                sequences: sequences.iter().map(DnaSequenceXml::from).collect(),
            },
        ),
        DasDocument::Sequence(sequences) => write_document(
            "DASSEQUENCE",
            Some("dassequence.dtd"),
            global.sequence_xslt.as_deref(),
            &DasSequence {
                sequences: sequences.iter().map(SequenceXml::from).collect(),
            },
        ),
        DasDocument::Types(segments) => write_document(
            "DASTYPES",
            Some("dastypes.dtd"),
            global.types_xslt.as_deref(),
            &DasTypes {
                gff: TypesGff {
                    version: "1.0",
                    href: href.to_string(),
                    segments: segments.iter().map(TypesSegmentXml::from).collect(),
                },
            },
        ),
        DasDocument::Features(features) => write_document(
            "DASGFF",
            Some("dasgff.dtd"),
            global.features_xslt.as_deref(),
            &DasGff {
                gff: FeaturesGff::new(features, href),
            },
        ),
        DasDocument::EntryPoints(entry_points) => write_document(
            "DASEP",
            Some("dasep.dtd"),
            global.entry_points_xslt.as_deref(),
            &DasEp {
                entry_points: EntryPointsXml::new(entry_points, href),
            },
        ),
        DasDocument::Redirect(_) | DasDocument::Stylesheet(_) => {
            Err(XmlError::NotXml(document.command()))
        }
    }
}

fn write_document<T: Serialize>(
    root: &'static str,
    dtd: Option<&str>,
    xslt: Option<&str>,
    body: &T,
) -> Result<String, XmlError> {
    let mut xml = String::from("<?xml version=\"1.0\" standalone=\"no\"?>\n");
    if let Some(xslt) = xslt.filter(|x| !x.is_empty()) {
        xml.push_str(&format!(
            "<?xml-stylesheet type=\"text/xsl\" href=\"{}\"?>\n",
            quick_xml::escape::escape(xslt)
        ));
    }
    if let Some(dtd) = dtd {
        xml.push_str(&format!(
            "<!DOCTYPE {} SYSTEM \"{}{}\">\n",
            root, DTD_ROOT, dtd
        ));
    }

    let content = quick_xml::se::to_string(body).map_err(|e| XmlError::Serialize {
        root,
        message: e.to_string(),
    })?;
    xml.push_str(&content);
    Ok(xml)
}

// dsn

#[derive(Debug, Serialize)]
#[serde(rename = "DASDSN")]
struct DasDsn {
    #[serde(rename = "DSN")]
    dsn: Vec<DsnXml>,
}

#[derive(Debug, Serialize)]
struct DsnXml {
    #[serde(rename = "SOURCE")]
    source: DsnSourceXml,
    #[serde(rename = "MAPMASTER")]
    mapmaster: String,
    #[serde(rename = "DESCRIPTION", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct DsnSourceXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@version", skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(rename = "$text")]
    name: String,
}

impl From<&DsnEntry> for DsnXml {
    fn from(entry: &DsnEntry) -> Self {
        Self {
            source: DsnSourceXml {
                id: entry.id.clone(),
                version: entry.version.clone(),
                name: entry.name.clone(),
            },
            mapmaster: entry.mapmaster.clone(),
            description: entry.description.clone(),
        }
    }
}

// sources

#[derive(Debug, Serialize)]
#[serde(rename = "SOURCES")]
struct SourcesXml {
    #[serde(rename = "SOURCE")]
    sources: Vec<SourceXml>,
}

#[derive(Debug, Serialize)]
struct SourceXml {
    #[serde(rename = "@uri")]
    uri: String,
    #[serde(rename = "@title")]
    title: String,
    #[serde(rename = "@doc_href", skip_serializing_if = "Option::is_none")]
    doc_href: Option<String>,
    #[serde(rename = "@description")]
    description: String,
    #[serde(rename = "MAINTAINER")]
    maintainer: MaintainerXml,
    #[serde(rename = "VERSION")]
    versions: Vec<VersionXml>,
}

#[derive(Debug, Serialize)]
struct MaintainerXml {
    #[serde(rename = "@email")]
    email: String,
}

#[derive(Debug, Serialize)]
struct VersionXml {
    #[serde(rename = "@uri")]
    uri: String,
    #[serde(rename = "@created", skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    #[serde(rename = "COORDINATES")]
    coordinates: Vec<CoordinatesXml>,
    #[serde(rename = "CAPABILITY")]
    capabilities: Vec<CapabilityXml>,
    #[serde(rename = "PROPERTY")]
    properties: Vec<PropertyXml>,
}

#[derive(Debug, Serialize)]
struct CoordinatesXml {
    #[serde(rename = "@uri")]
    uri: String,
    #[serde(rename = "@source")]
    source: String,
    #[serde(rename = "@authority")]
    authority: String,
    #[serde(rename = "@taxid", skip_serializing_if = "Option::is_none")]
    taxid: Option<String>,
    #[serde(rename = "@version", skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(rename = "@test_range")]
    test_range: String,
    #[serde(rename = "$text")]
    description: String,
}

#[derive(Debug, Serialize)]
struct CapabilityXml {
    #[serde(rename = "@type")]
    capability_type: String,
    #[serde(rename = "@query_uri", skip_serializing_if = "Option::is_none")]
    query_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct PropertyXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value")]
    value: String,
}

impl From<&DataSourceConfig> for SourceXml {
    fn from(config: &DataSourceConfig) -> Self {
        let uri = config.uri.clone().unwrap_or_else(|| config.id.clone());
        let properties: Vec<PropertyXml> = config
            .properties
            .iter()
            .map(|(name, value)| PropertyXml {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        let mut versions: Vec<VersionXml> = config
            .versions
            .iter()
            .map(|version| VersionXml {
                uri: version.uri.clone(),
                created: Some(version.created.to_string()),
                coordinates: version
                    .coordinates
                    .iter()
                    .map(|c| CoordinatesXml {
                        uri: c.uri.clone(),
                        source: c.source.clone(),
                        authority: c.authority.clone(),
                        taxid: c.taxid.clone(),
                        version: c.version.clone(),
                        test_range: c.test_range.clone(),
                        description: c.description.clone(),
                    })
                    .collect(),
                capabilities: version
                    .capabilities
                    .iter()
                    .map(|c| CapabilityXml {
                        capability_type: c.capability_type.clone(),
                        query_uri: c.query_uri.clone(),
                    })
                    .collect(),
                properties: Vec::new(),
            })
            .collect();

        // A source always reports at least one version carrying its properties
        if versions.is_empty() {
            versions.push(VersionXml {
                uri: uri.clone(),
                created: None,
                coordinates: Vec::new(),
                capabilities: Vec::new(),
                properties: Vec::new(),
            });
        }
        for version in &mut versions {
            version.properties = properties
                .iter()
                .map(|p| PropertyXml {
                    name: p.name.clone(),
                    value: p.value.clone(),
                })
                .collect();
        }

        Self {
            uri,
            title: config
                .title
                .clone()
                .unwrap_or_else(|| config.display_name().to_string()),
            doc_href: config.doc_href.clone(),
            description: config.description.clone().unwrap_or_default(),
            maintainer: MaintainerXml {
                email: config.maintainer.email.clone(),
            },
            versions,
        }
    }
}

// dna and sequence

#[derive(Debug, Serialize)]
#[serde(rename = "DASDNA")]
struct DasDna {
    #[serde(rename = "SEQUENCE")]
    sequences: Vec<DnaSequenceXml>,
}

#[derive(Debug, Serialize)]
struct DnaSequenceXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@start")]
    start: u64,
    #[serde(rename = "@stop")]
    stop: u64,
    #[serde(rename = "@version")]
    version: String,
    #[serde(rename = "DNA")]
    dna: DnaXml,
}

#[derive(Debug, Serialize)]
struct DnaXml {
    #[serde(rename = "@length")]
    length: usize,
    #[serde(rename = "$text")]
    residues: String,
}

impl From<&Sequence> for DnaSequenceXml {
    fn from(sequence: &Sequence) -> Self {
        Self {
            id: sequence.segment_id.clone(),
            start: sequence.start,
            stop: sequence.stop(),
            version: sequence.version.clone(),
            dna: DnaXml {
                length: sequence.residues.len(),
                residues: sequence.residues.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "DASSEQUENCE")]
struct DasSequence {
    #[serde(rename = "SEQUENCE")]
    sequences: Vec<SequenceXml>,
}

#[derive(Debug, Serialize)]
struct SequenceXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@start")]
    start: u64,
    #[serde(rename = "@stop")]
    stop: u64,
    #[serde(rename = "@moltype")]
    moltype: String,
    #[serde(rename = "@version")]
    version: String,
    #[serde(rename = "$text")]
    residues: String,
}

impl From<&Sequence> for SequenceXml {
    fn from(sequence: &Sequence) -> Self {
        Self {
            id: sequence.segment_id.clone(),
            start: sequence.start,
            stop: sequence.stop(),
            moltype: sequence.molecule_type.to_string(),
            version: sequence.version.clone(),
            residues: sequence.residues.clone(),
        }
    }
}

// types

#[derive(Debug, Serialize)]
#[serde(rename = "DASTYPES")]
struct DasTypes {
    #[serde(rename = "GFF")]
    gff: TypesGff,
}

#[derive(Debug, Serialize)]
struct TypesGff {
    #[serde(rename = "@version")]
    version: &'static str,
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "SEGMENT")]
    segments: Vec<TypesSegmentXml>,
}

#[derive(Debug, Serialize)]
struct TypesSegmentXml {
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "@start", skip_serializing_if = "Option::is_none")]
    start: Option<u64>,
    #[serde(rename = "@stop", skip_serializing_if = "Option::is_none")]
    stop: Option<u64>,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    segment_type: Option<String>,
    #[serde(rename = "@version", skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(rename = "@label", skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(rename = "TYPE")]
    types: Vec<TypeCountXml>,
}

#[derive(Debug, Serialize)]
struct TypeCountXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@category", skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(rename = "@method", skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    /// Absent when the data source cannot count the type
    #[serde(rename = "$text", skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
}

impl From<&TypesSegment> for TypesSegmentXml {
    fn from(segment: &TypesSegment) -> Self {
        Self {
            id: segment.segment_id.clone(),
            start: segment.start,
            stop: segment.stop,
            segment_type: segment.segment_type.clone(),
            version: segment.version.clone(),
            label: segment.label.clone(),
            types: segment
                .types
                .iter()
                .map(|(feature_type, count)| TypeCountXml {
                    id: feature_type.id.clone(),
                    category: feature_type.category.clone(),
                    method: feature_type.method.clone(),
                    count: *count,
                })
                .collect(),
        }
    }
}

// features

#[derive(Debug, Serialize)]
#[serde(rename = "DASGFF")]
struct DasGff {
    #[serde(rename = "GFF")]
    gff: FeaturesGff,
}

#[derive(Debug, Serialize)]
struct FeaturesGff {
    #[serde(rename = "@version")]
    version: &'static str,
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "$value")]
    segments: Vec<GffSegment>,
}

/// Segments keep the order in which they were requested
#[derive(Debug, Serialize)]
enum GffSegment {
    #[serde(rename = "SEGMENT")]
    Found(FeatureSegmentXml),
    #[serde(rename = "ERRORSEGMENT")]
    Error(MissingSegmentXml),
    #[serde(rename = "UNKNOWNSEGMENT")]
    Unknown(MissingSegmentXml),
}

#[derive(Debug, Serialize)]
struct MissingSegmentXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@start", skip_serializing_if = "Option::is_none")]
    start: Option<u64>,
    #[serde(rename = "@stop", skip_serializing_if = "Option::is_none")]
    stop: Option<u64>,
}

#[derive(Debug, Serialize)]
struct FeatureSegmentXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@start")]
    start: u64,
    #[serde(rename = "@stop")]
    stop: u64,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    segment_type: Option<String>,
    #[serde(rename = "@version")]
    version: String,
    #[serde(rename = "@label", skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(rename = "FEATURE")]
    features: Vec<FeatureXml>,
}

#[derive(Debug, Serialize)]
struct FeatureXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@label", skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(rename = "TYPE")]
    feature_type: FeatureTypeXml,
    #[serde(rename = "METHOD")]
    method: MethodXml,
    #[serde(rename = "START")]
    start: u64,
    #[serde(rename = "END")]
    end: u64,
    #[serde(rename = "SCORE")]
    score: String,
    #[serde(rename = "ORIENTATION")]
    orientation: String,
    #[serde(rename = "PHASE")]
    phase: String,
    #[serde(rename = "NOTE")]
    notes: Vec<String>,
    #[serde(rename = "LINK")]
    links: Vec<LinkXml>,
    #[serde(rename = "TARGET")]
    targets: Vec<TargetXml>,
    #[serde(rename = "GROUP")]
    groups: Vec<GroupXml>,
}

#[derive(Debug, Serialize)]
struct FeatureTypeXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@category", skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(rename = "$text", skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

#[derive(Debug, Serialize)]
struct MethodXml {
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "$text", skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

#[derive(Debug, Serialize)]
struct LinkXml {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "$text", skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct TargetXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@start")]
    start: u64,
    #[serde(rename = "@stop")]
    stop: u64,
    #[serde(rename = "$text", skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct GroupXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@label", skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    group_type: Option<String>,
    #[serde(rename = "NOTE")]
    notes: Vec<String>,
    #[serde(rename = "LINK")]
    links: Vec<LinkXml>,
}

impl FeaturesGff {
    fn new(document: &FeaturesDocument, href: &str) -> Self {
        let segments = document
            .segments
            .iter()
            .map(|segment| match segment {
                SegmentResult::Found(found) => GffSegment::Found(FeatureSegmentXml {
                    id: found.segment_id.clone(),
                    start: found.start,
                    stop: found.stop,
                    segment_type: found.segment_type.clone(),
                    version: found.version.clone(),
                    label: found.label.clone(),
                    features: found
                        .features
                        .iter()
                        .map(|feature| FeatureXml::new(feature, document.categorize))
                        .collect(),
                }),
                SegmentResult::Unknown(unknown) => {
                    let missing = MissingSegmentXml {
                        id: unknown.segment_id.clone(),
                        start: unknown.start,
                        stop: unknown.stop,
                    };
                    if document.reference_source {
                        GffSegment::Error(missing)
                    } else {
                        GffSegment::Unknown(missing)
                    }
                }
            })
            .collect();

        Self {
            version: "1.0",
            href: href.to_string(),
            segments,
        }
    }
}

impl FeatureXml {
    fn new(feature: &Feature, categorize: bool) -> Self {
        Self {
            id: feature.id.clone(),
            label: feature.label.clone(),
            feature_type: FeatureTypeXml {
                id: feature.type_id.clone(),
                category: feature.type_category.clone().filter(|_| categorize),
                label: feature.type_label.clone(),
            },
            method: MethodXml {
                id: feature.method_id.clone(),
                label: feature.method_label.clone(),
            },
            start: feature.start,
            end: feature.stop,
            score: feature
                .score
                .map(|score| score.to_string())
                .unwrap_or_else(|| "-".to_string()),
            orientation: feature.orientation.to_string(),
            phase: feature
                .phase
                .map(|phase| phase.to_string())
                .unwrap_or_else(|| "-".to_string()),
            notes: feature.notes.clone(),
            links: feature.links.iter().map(LinkXml::from).collect(),
            targets: feature
                .targets
                .iter()
                .map(|target| TargetXml {
                    id: target.id.clone(),
                    start: target.start,
                    stop: target.stop,
                    name: target.name.clone(),
                })
                .collect(),
            groups: feature.groups.iter().map(GroupXml::from).collect(),
        }
    }
}

impl From<&FeatureLink> for LinkXml {
    fn from(link: &FeatureLink) -> Self {
        Self {
            href: link.href.clone(),
            text: link.text.clone(),
        }
    }
}

impl From<&FeatureGroup> for GroupXml {
    fn from(group: &FeatureGroup) -> Self {
        Self {
            id: group.id.clone(),
            label: group.label.clone(),
            group_type: group.group_type.clone(),
            notes: group.notes.clone(),
            links: group.links.iter().map(LinkXml::from).collect(),
        }
    }
}

// entry points

#[derive(Debug, Serialize)]
#[serde(rename = "DASEP")]
struct DasEp {
    #[serde(rename = "ENTRY_POINTS")]
    entry_points: EntryPointsXml,
}

#[derive(Debug, Serialize)]
struct EntryPointsXml {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@version")]
    version: String,
    #[serde(rename = "@total")]
    total: usize,
    #[serde(rename = "@start", skip_serializing_if = "Option::is_none")]
    start: Option<u64>,
    #[serde(rename = "@end", skip_serializing_if = "Option::is_none")]
    end: Option<u64>,
    #[serde(rename = "SEGMENT")]
    segments: Vec<EntryPointXml>,
}

#[derive(Debug, Serialize)]
struct EntryPointXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@start")]
    start: u64,
    #[serde(rename = "@stop")]
    stop: u64,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    segment_type: Option<String>,
    #[serde(rename = "@orientation")]
    orientation: String,
    #[serde(rename = "@subparts", skip_serializing_if = "Option::is_none")]
    subparts: Option<&'static str>,
    #[serde(rename = "$text", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl EntryPointsXml {
    fn new(document: &EntryPointsDocument, href: &str) -> Self {
        Self {
            href: href.to_string(),
            version: document.version.clone(),
            total: document.total,
            start: document.start,
            end: document.end,
            segments: document.entry_points.iter().map(EntryPointXml::from).collect(),
        }
    }
}

impl From<&EntryPoint> for EntryPointXml {
    fn from(entry_point: &EntryPoint) -> Self {
        Self {
            id: entry_point.segment_id.clone(),
            start: entry_point.start,
            stop: entry_point.stop,
            segment_type: entry_point.segment_type.clone(),
            orientation: entry_point.orientation.to_string(),
            subparts: entry_point.has_subparts.then_some("yes"),
            description: entry_point.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mydas_commands::{FoundSegment, UnknownSegment};
    use mydas_query::{FeatureType, MoleculeType};

    fn global() -> GlobalConfig {
        GlobalConfig::default()
    }

    #[test]
    fn test_dsn_document() {
        let document = DasDocument::Dsn(vec![DsnEntry {
            id: "ensembl".to_string(),
            version: Some("42".to_string()),
            name: "Ensembl & co".to_string(),
            mapmaster: "http://example.org/das/ensembl/".to_string(),
            description: None,
        }]);

        let xml = to_das_xml(&document, "http://localhost/das/dsn", &global()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" standalone=\"no\"?>"));
        assert!(xml.contains("<!DOCTYPE DASDSN SYSTEM \"http://www.biodas.org/dtd/dasdsn.dtd\">"));
        assert!(xml.contains("<SOURCE id=\"ensembl\" version=\"42\">Ensembl &amp; co</SOURCE>"));
        assert!(xml.contains("<MAPMASTER>http://example.org/das/ensembl/</MAPMASTER>"));
        assert!(!xml.contains("DESCRIPTION"));
    }

    #[test]
    fn test_stylesheet_instruction() {
        let mut global = global();
        global.dna_xslt = Some("/xslt/dna.xsl".to_string());
        let document = DasDocument::Dna(vec![Sequence {
            segment_id: "chr1".to_string(),
            start: 5,
            version: "38".to_string(),
            molecule_type: MoleculeType::Dna,
            residues: "ACGT".to_string(),
        }]);

        let xml = to_das_xml(&document, "", &global).unwrap();
        assert!(xml.contains("<?xml-stylesheet type=\"text/xsl\" href=\"/xslt/dna.xsl\"?>"));
        assert!(xml.contains("<SEQUENCE id=\"chr1\" start=\"5\" stop=\"8\" version=\"38\">"));
        assert!(xml.contains("<DNA length=\"4\">ACGT</DNA>"));
    }

    #[test]
    fn test_types_counts_absent_when_unknown() {
        let document = DasDocument::Types(vec![TypesSegment {
            segment_id: None,
            start: None,
            stop: None,
            segment_type: None,
            version: Some("7".to_string()),
            label: Some(mydas_commands::COMPLETE_SUMMARY_LABEL.to_string()),
            types: [
                (FeatureType::new("exon"), Some(3)),
                (FeatureType::new("intron"), None),
            ]
            .into_iter()
            .collect(),
        }]);

        let xml = to_das_xml(&document, "http://h/das/a/types", &global()).unwrap();
        assert!(xml.contains("<GFF version=\"1.0\" href=\"http://h/das/a/types\">"));
        assert!(xml.contains("<SEGMENT version=\"7\" label=\"Complete datasource summary\">"));
        assert!(xml.contains("<TYPE id=\"exon\">3</TYPE>"));
        assert!(xml.contains("<TYPE id=\"intron\"/>"));
    }

    #[test]
    fn test_features_keep_request_order() {
        let mut feature = Feature::new("e1", "exon", 150, 160);
        feature.type_category = Some("transcription".to_string());
        let document = FeaturesDocument {
            segments: vec![
                SegmentResult::Unknown(UnknownSegment {
                    segment_id: "chr9".to_string(),
                    start: Some(1),
                    stop: Some(10),
                }),
                SegmentResult::Found(FoundSegment {
                    segment_id: "chr1".to_string(),
                    start: 100,
                    stop: 200,
                    version: "7".to_string(),
                    label: Some("chr1".to_string()),
                    segment_type: None,
                    features: vec![feature],
                }),
            ],
            categorize: false,
            reference_source: false,
        };

        let xml = to_das_xml(&DasDocument::Features(document), "", &global()).unwrap();
        let unknown = xml.find("<UNKNOWNSEGMENT id=\"chr9\" start=\"1\" stop=\"10\"/>").unwrap();
        let found = xml.find("<SEGMENT id=\"chr1\"").unwrap();
        assert!(unknown < found);
        assert!(xml.contains("<TYPE id=\"exon\"/>"));
        assert!(xml.contains("<START>150</START><END>160</END><SCORE>-</SCORE>"));
    }

    #[test]
    fn test_redirect_is_not_xml() {
        let document = DasDocument::Stylesheet("<x/>".to_string());
        assert!(matches!(
            to_das_xml(&document, "", &global()),
            Err(XmlError::NotXml("stylesheet"))
        ));
    }
}
