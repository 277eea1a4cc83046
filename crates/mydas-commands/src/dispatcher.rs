use crate::adapter::{link_key, BackendAdapter};
use crate::aggregator::SegmentAggregator;
use crate::documents::{
    DasDocument, DsnEntry, EntryPointsDocument, FeaturesDocument, FoundSegment, SegmentResult,
    TypesSegment, COMPLETE_SUMMARY_LABEL,
};
use crate::error::{DasError, Result};
use crate::parser::{
    ignore_key_values, parse_link, parse_query, parse_rows, FeatureRequestFilter, QueryKind,
};
use mydas_core::{DasStatus, GlobalConfig};
use mydas_query::{DataError, DataSourceRegistry, LoadedSource, Sequence};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

/// Commands understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DasCommand {
    Dsn,
    Sources,
    Dna,
    Sequence,
    Types,
    Features,
    EntryPoints,
    Link,
    Stylesheet,
}

impl DasCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            DasCommand::Dsn => "dsn",
            DasCommand::Sources => "sources",
            DasCommand::Dna => "dna",
            DasCommand::Sequence => "sequence",
            DasCommand::Types => "types",
            DasCommand::Features => "features",
            DasCommand::EntryPoints => "entry_points",
            DasCommand::Link => "link",
            DasCommand::Stylesheet => "stylesheet",
        }
    }

    /// Commands answered for the whole server rather than one data source
    pub fn is_server_level(&self) -> bool {
        matches!(self, DasCommand::Dsn | DasCommand::Sources)
    }
}

impl fmt::Display for DasCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DasCommand {
    type Err = DasError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dsn" => Ok(DasCommand::Dsn),
            "sources" => Ok(DasCommand::Sources),
            "dna" => Ok(DasCommand::Dna),
            "sequence" => Ok(DasCommand::Sequence),
            "types" => Ok(DasCommand::Types),
            "features" => Ok(DasCommand::Features),
            "entry_points" => Ok(DasCommand::EntryPoints),
            "link" => Ok(DasCommand::Link),
            "stylesheet" => Ok(DasCommand::Stylesheet),
            other => Err(DasError::BadCommand(format!("unknown command '{}'", other))),
        }
    }
}

/// Runs DAS commands against the loaded data sources
pub struct CommandManager {
    registry: Arc<DataSourceRegistry>,
    global: GlobalConfig,
}

impl CommandManager {
    pub fn new(registry: Arc<DataSourceRegistry>, global: GlobalConfig) -> Self {
        Self { registry, global }
    }

    pub fn registry(&self) -> &Arc<DataSourceRegistry> {
        &self.registry
    }

    pub fn global(&self) -> &GlobalConfig {
        &self.global
    }

    /// Execute `command` with its raw query string.
    ///
    /// `dsn` is the data source named in the request path, absent for the
    /// server-level commands.
    pub async fn execute(
        &self,
        dsn: Option<&str>,
        command: &str,
        query: &str,
    ) -> Result<DasDocument> {
        let result = self.dispatch(dsn, command, query).await;

        match &result {
            Ok(document) => debug!(
                "Command {} on {} succeeded",
                document.command(),
                dsn.unwrap_or("server")
            ),
            Err(e) if e.status() == DasStatus::ServerError => {
                error!("Command {} on {} failed: {}", command, dsn.unwrap_or("server"), e)
            }
            Err(e) => debug!(
                "Command {} on {} rejected with {}: {}",
                command,
                dsn.unwrap_or("server"),
                e.status(),
                e
            ),
        }

        result
    }

    async fn dispatch(&self, dsn: Option<&str>, command: &str, query: &str) -> Result<DasDocument> {
        let command: DasCommand = command.parse()?;

        match (command, dsn) {
            (DasCommand::Dsn, None) => return self.dsn(query).await,
            (DasCommand::Sources, _) => return self.sources(dsn, query).await,
            _ => {}
        }

        let dsn = dsn.ok_or_else(|| {
            DasError::BadDataSource(format!("{} needs a data source", command))
        })?;
        let loaded = self
            .registry
            .get(dsn)
            .await
            .ok_or_else(|| DasError::BadDataSource(format!("unknown data source '{}'", dsn)))?;

        match command {
            DasCommand::Dna => self.dna(&loaded, query).await,
            DasCommand::Sequence => self.sequence(&loaded, query).await,
            DasCommand::Types => self.types(&loaded, query).await,
            DasCommand::Features => self.features(&loaded, query).await,
            DasCommand::EntryPoints => self.entry_points(&loaded, query).await,
            DasCommand::Link => self.link(&loaded, query).await,
            DasCommand::Stylesheet => self.stylesheet(&loaded, query).await,
            DasCommand::Dsn | DasCommand::Sources => Err(DasError::BadCommand(format!(
                "{} is not a data source command",
                command
            ))),
        }
    }

    fn aggregator<'a>(&'a self, loaded: &'a LoadedSource) -> SegmentAggregator<'a> {
        SegmentAggregator::new(self.registry.cache(), BackendAdapter::new(loaded))
    }

    async fn loaded_sources(&self) -> Result<Vec<Arc<LoadedSource>>> {
        let sources = self.registry.list().await;
        if sources.is_empty() {
            return Err(DasError::ServerError(
                "no data source has been initialised".to_string(),
            ));
        }
        Ok(sources)
    }

    async fn dsn(&self, query: &str) -> Result<DasDocument> {
        if !query.is_empty() {
            return Err(DasError::bad_arguments("dsn does not take arguments"));
        }

        let sources = self.loaded_sources().await?;
        Ok(DasDocument::Dsn(
            sources.iter().map(|s| DsnEntry::from(&s.config)).collect(),
        ))
    }

    async fn sources(&self, dsn: Option<&str>, query: &str) -> Result<DasDocument> {
        ignore_key_values(query)?;

        let mut sources = self.loaded_sources().await?;
        if let Some(dsn) = dsn {
            sources.retain(|s| s.id() == dsn);
            if sources.is_empty() {
                return Err(DasError::BadDataSource(format!(
                    "unknown data source '{}'",
                    dsn
                )));
            }
        }

        Ok(DasDocument::Sources(
            sources.iter().map(|s| s.config.clone()).collect(),
        ))
    }

    async fn dna(&self, loaded: &LoadedSource, query: &str) -> Result<DasDocument> {
        if !loaded.config.dna_command_enabled {
            return Err(DataError::unimplemented(format!(
                "the dna command is disabled for {}",
                loaded.id()
            ))
            .into());
        }
        Ok(DasDocument::Dna(self.sequences(loaded, query).await?))
    }

    async fn sequence(&self, loaded: &LoadedSource, query: &str) -> Result<DasDocument> {
        Ok(DasDocument::Sequence(self.sequences(loaded, query).await?))
    }

    async fn sequences(
        &self,
        loaded: &LoadedSource,
        query: &str,
    ) -> Result<Vec<Sequence>> {
        if !BackendAdapter::new(loaded).is_reference() {
            return Err(DataError::unimplemented(format!(
                "{} is an annotation source and serves no sequence",
                loaded.id()
            ))
            .into());
        }

        let parsed = parse_query(query, QueryKind::Sequence)?;
        if parsed.segments.is_empty() {
            return Err(DasError::bad_arguments(
                "the query string did not include any segments",
            ));
        }

        Ok(self
            .aggregator(loaded)
            .sequences_for_query(&parsed.segments)
            .await?)
    }

    async fn types(&self, loaded: &LoadedSource, query: &str) -> Result<DasDocument> {
        let parsed = parse_query(query, QueryKind::Annotation)?;
        let aggregator = self.aggregator(loaded);
        let type_ids = &parsed.filter.type_ids;

        if parsed.segments.is_empty() {
            let types = aggregator.type_summary_for_all_segments(type_ids).await?;
            return Ok(DasDocument::Types(vec![TypesSegment {
                segment_id: None,
                start: None,
                stop: None,
                segment_type: None,
                version: loaded.config.version.clone(),
                label: Some(COMPLETE_SUMMARY_LABEL.to_string()),
                types,
            }]));
        }

        let summaries = aggregator
            .type_summary_for_segments(
                &parsed.segments,
                type_ids,
                loaded.config.include_types_with_zero_count,
            )
            .await?;

        Ok(DasDocument::Types(
            summaries
                .into_iter()
                .map(|(found, types)| TypesSegment {
                    segment_id: Some(found.segment_id),
                    start: Some(found.start),
                    stop: Some(found.stop),
                    segment_type: found.segment_type,
                    version: Some(found.version),
                    label: found.label,
                    types,
                })
                .collect(),
        ))
    }

    async fn features(&self, loaded: &LoadedSource, query: &str) -> Result<DasDocument> {
        if query.is_empty() {
            return Err(DasError::bad_arguments(
                "features needs at least one segment or feature id",
            ));
        }

        let parsed = parse_query(query, QueryKind::Annotation)?;
        let filter = &parsed.filter;

        let segments: Vec<SegmentResult> = if !parsed.segments.is_empty() {
            self.aggregator(loaded)
                .resolve_segments(&parsed.segments, true)
                .await?
        } else if filter.has_id_lookup() {
            let feature_ids: Vec<String> = filter.feature_ids.iter().cloned().collect();
            let group_ids: Vec<String> = filter.group_ids.iter().cloned().collect();
            loaded
                .source
                .features_by_id(&feature_ids, &group_ids)
                .await?
                .unwrap_or_default()
                .iter()
                .map(|segment| SegmentResult::Found(FoundSegment::from_annotated(segment)))
                .collect()
        } else {
            return Err(DasError::bad_arguments(format!(
                "no segment or feature id in '{}'",
                query
            )));
        };

        let label_with_id = loaded.config.use_feature_id_for_feature_label;
        let segments = segments
            .into_iter()
            .map(|result| match result {
                SegmentResult::Found(found) => {
                    SegmentResult::Found(apply_filter(found, filter, label_with_id))
                }
                unknown => unknown,
            })
            .collect();

        Ok(DasDocument::Features(FeaturesDocument {
            segments,
            categorize: filter.categorize,
            reference_source: BackendAdapter::new(loaded).is_reference(),
        }))
    }

    async fn entry_points(&self, loaded: &LoadedSource, query: &str) -> Result<DasDocument> {
        let rows = parse_rows(query)?;

        if !BackendAdapter::new(loaded).is_reference() {
            return Err(DataError::unimplemented(format!(
                "{} is an annotation source and has no entry points",
                loaded.id()
            ))
            .into());
        }

        let entry_points = loaded.source.entry_points().await?;
        let version = loaded.source.entry_point_version().await?.ok_or_else(|| {
            DataError::data_source(format!(
                "{} reports no entry point version",
                loaded.id()
            ))
        })?;

        let total = entry_points.len();
        let (first, last) = match rows {
            Some(rows) => (rows.start as usize, (rows.stop as usize).min(total)),
            None => (1, total),
        };
        let page = if first > last {
            Vec::new()
        } else {
            entry_points[first - 1..last].to_vec()
        };

        Ok(DasDocument::EntryPoints(EntryPointsDocument {
            version,
            total,
            start: rows.map(|r| r.start),
            end: rows.map(|r| r.stop),
            entry_points: page,
            query: query.to_string(),
        }))
    }

    async fn link(&self, loaded: &LoadedSource, query: &str) -> Result<DasDocument> {
        let (field, id) = parse_link(query)?;
        let key = link_key(loaded.id(), field, &id);

        let url = self
            .registry
            .cache()
            .get_or_compute(&key, loaded.config.cache_group(), || {
                loaded.source.link_url(field, &id)
            })
            .await?;

        Ok(DasDocument::Redirect((*url).clone()))
    }

    async fn stylesheet(&self, loaded: &LoadedSource, query: &str) -> Result<DasDocument> {
        if !query.trim().is_empty() {
            return Err(DasError::bad_arguments(
                "stylesheet does not take arguments",
            ));
        }

        let name = [
            loaded.config.stylesheet.as_deref(),
            self.global.default_stylesheet.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .ok_or_else(|| {
            DasError::BadStylesheet(format!("{} has no stylesheet", loaded.id()))
        })?;

        let path = self.global.resource_dir.join(name);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            DasError::BadStylesheet(format!("cannot read {}: {}", path.display(), e))
        })?;
        if content.is_empty() {
            return Err(DasError::BadStylesheet(format!(
                "{} is empty",
                path.display()
            )));
        }

        Ok(DasDocument::Stylesheet(content))
    }
}

/// Keep the features a request admits, labelling unlabelled ones with
/// their id when configured to
fn apply_filter(
    mut found: FoundSegment,
    filter: &FeatureRequestFilter,
    label_with_id: bool,
) -> FoundSegment {
    found.features.retain(|feature| filter.admits(feature));
    if label_with_id {
        for feature in found.features.iter_mut() {
            if feature.label.is_none() {
                feature.label = Some(feature.id.clone());
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use mydas_query::Feature;

    #[test]
    fn test_command_names() {
        assert_eq!("entry_points".parse::<DasCommand>().unwrap(), DasCommand::EntryPoints);
        assert!(DasCommand::Sources.is_server_level());
        assert!(!DasCommand::Features.is_server_level());

        let err = "feature".parse::<DasCommand>().unwrap_err();
        assert_eq!(err.status(), DasStatus::BadCommand);
    }

    #[test]
    fn test_apply_filter_labels() {
        let mut labelled = Feature::new("f2", "exon", 5, 6);
        labelled.label = Some("second".to_string());
        let found = FoundSegment {
            segment_id: "chr1".to_string(),
            start: 1,
            stop: 10,
            version: "1".to_string(),
            label: None,
            segment_type: None,
            features: vec![
                Feature::new("f1", "exon", 1, 2),
                labelled,
                Feature::new("f3", "intron", 3, 4),
            ],
        };

        let mut filter = FeatureRequestFilter::default();
        filter.type_ids.insert("exon".to_string());

        let filtered = apply_filter(found.clone(), &filter, true);
        let labels: Vec<Option<&str>> = filtered
            .features
            .iter()
            .map(|f| f.label.as_deref())
            .collect();
        assert_eq!(labels, vec![Some("f1"), Some("second")]);

        let unlabelled = apply_filter(found, &FeatureRequestFilter::default(), false);
        assert_eq!(unlabelled.features.len(), 3);
        assert_eq!(unlabelled.features[0].label, None);
    }
}
