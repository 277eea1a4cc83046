//! Resolution of requested segments through the cache, and the type
//! summaries built on top of it

use crate::adapter::{all_types_key, type_count_key, BackendAdapter};
use crate::documents::{FoundSegment, SegmentResult, TypeSummary, UnknownSegment};
use crate::parser::SegmentQuery;
use mydas_core::CacheCoordinator;
use mydas_query::{AnnotatedSegment, DataError, FeatureType, Sequence};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

pub struct SegmentAggregator<'a> {
    cache: &'a CacheCoordinator,
    backend: BackendAdapter<'a>,
}

impl<'a> SegmentAggregator<'a> {
    pub fn new(cache: &'a CacheCoordinator, backend: BackendAdapter<'a>) -> Self {
        Self { cache, backend }
    }

    fn group(&self) -> &str {
        self.backend.loaded().config.cache_group()
    }

    fn strictly_enclosed(&self) -> bool {
        self.backend.loaded().config.features_strictly_enclosed
    }

    async fn annotated_segment(
        &self,
        query: &SegmentQuery,
    ) -> Result<Arc<AnnotatedSegment>, DataError> {
        let key = self.backend.features_key(query);
        self.cache
            .get_or_compute(&key, self.group(), || self.backend.features(query))
            .await
    }

    /// Resolve every requested segment in order.
    ///
    /// Unknown segment ids and coordinate errors become
    /// [`SegmentResult::Unknown`] when `allow_unknown` is set and abort the
    /// call otherwise. Any other failure always aborts.
    pub async fn resolve_segments(
        &self,
        segments: &[SegmentQuery],
        allow_unknown: bool,
    ) -> Result<Vec<SegmentResult>, DataError> {
        let mut results = Vec::with_capacity(segments.len());

        for query in segments {
            let outcome = self
                .annotated_segment(query)
                .await
                .and_then(|segment| self.found(&segment, query));

            match outcome {
                Ok(found) => results.push(SegmentResult::Found(found)),
                Err(e) if allow_unknown && e.is_segment_error() => {
                    debug!("Reporting {} as unknown segment: {}", query, e);
                    results.push(SegmentResult::Unknown(UnknownSegment {
                        segment_id: query.segment_id().to_string(),
                        start: query.start(),
                        stop: query.stop(),
                    }));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(results)
    }

    /// View of a retrieved segment restricted to what `query` asked for.
    ///
    /// With a range, the segment reports the requested coordinates and keeps
    /// the positional features overlapping it (or lying inside it, for
    /// sources configured as strictly enclosed). A range reaching past the
    /// segment is a coordinate error when the source returned the whole
    /// segment rather than checking the range itself.
    fn found(
        &self,
        segment: &AnnotatedSegment,
        query: &SegmentQuery,
    ) -> Result<FoundSegment, DataError> {
        let mut found = FoundSegment::from_annotated(segment);

        if let Some((start, stop)) = query.range() {
            if !self.backend.restricts_features() && (start < segment.start || stop > segment.stop)
            {
                return Err(DataError::coordinate_error(
                    query.segment_id(),
                    format!(
                        "Requested range {}-{} lies outside {}-{}",
                        start, stop, segment.start, segment.stop
                    ),
                ));
            }

            let strictly_enclosed = self.strictly_enclosed();
            found.start = start;
            found.stop = stop;
            found.features.retain(|feature| {
                if !feature.is_positional() {
                    true
                } else if strictly_enclosed {
                    feature.is_enclosed_by(start, stop)
                } else {
                    feature.stop >= start && feature.start <= stop
                }
            });
        }

        Ok(found)
    }

    /// Full type catalogue of the data source
    pub async fn all_types(&self) -> Result<Arc<Vec<FeatureType>>, DataError> {
        let key = all_types_key(self.backend.id());
        let source = self.backend.source();
        self.cache
            .get_or_compute(&key, self.group(), || source.types())
            .await
    }

    /// Counts for every catalogue type admitted by `type_ids`, each fetched
    /// (and cached) on its own
    pub async fn type_summary_for_all_segments(
        &self,
        type_ids: &BTreeSet<String>,
    ) -> Result<TypeSummary, DataError> {
        let catalogue = self.all_types().await?;
        let source = self.backend.source();
        let mut summary = TypeSummary::new();

        for feature_type in catalogue.iter() {
            if !type_ids.is_empty() && !type_ids.contains(&feature_type.id) {
                continue;
            }

            let key = type_count_key(self.backend.id(), feature_type);
            let count = self
                .cache
                .get_or_compute(&key, self.group(), || {
                    source.total_count_for_type(feature_type)
                })
                .await?;
            summary.insert(feature_type.clone(), *count);
        }

        Ok(summary)
    }

    /// Per-segment counts of the features admitted by `type_ids`.
    ///
    /// Unknown segments are left out. With `include_zero_counts` every
    /// admitted catalogue type is listed, counted or not.
    pub async fn type_summary_for_segments(
        &self,
        segments: &[SegmentQuery],
        type_ids: &BTreeSet<String>,
        include_zero_counts: bool,
    ) -> Result<Vec<(FoundSegment, TypeSummary)>, DataError> {
        let resolved = self.resolve_segments(segments, true).await?;
        let admits = |type_id: &str| type_ids.is_empty() || type_ids.contains(type_id);

        let seed: TypeSummary = if include_zero_counts {
            self.all_types()
                .await?
                .iter()
                .filter(|t| admits(t.id.as_str()))
                .map(|t| (t.clone(), Some(0)))
                .collect()
        } else {
            TypeSummary::new()
        };

        let mut summaries = Vec::new();
        for result in resolved {
            let SegmentResult::Found(found) = result else {
                continue;
            };

            let mut summary = seed.clone();
            for feature in found.features.iter().filter(|f| admits(f.type_id.as_str())) {
                let count = summary.entry(feature.feature_type()).or_insert(Some(0));
                *count = Some(count.unwrap_or(0) + 1);
            }
            summaries.push((found, summary));
        }

        Ok(summaries)
    }

    /// Sequences for every requested segment. Any failing segment aborts the
    /// whole call.
    pub async fn sequences_for_query(
        &self,
        segments: &[SegmentQuery],
    ) -> Result<Vec<Sequence>, DataError> {
        let mut sequences = Vec::with_capacity(segments.len());

        for query in segments {
            let key = self.backend.sequence_key(query);
            let sequence = self
                .cache
                .get_or_compute(&key, self.group(), || self.backend.sequence(query))
                .await?;
            sequences.push(restrict_sequence(&sequence, query)?);
        }

        Ok(sequences)
    }
}

/// Cut a sequence down to the range of `query`. Sources that handle ranges
/// already return exactly the range, which passes through unchanged.
fn restrict_sequence(sequence: &Sequence, query: &SegmentQuery) -> Result<Sequence, DataError> {
    let Some((start, stop)) = query.range() else {
        return Ok(sequence.clone());
    };

    if start < sequence.start || stop > sequence.stop() {
        return Err(DataError::coordinate_error(
            query.segment_id(),
            format!(
                "Requested range {}-{} lies outside {}-{}",
                start,
                stop,
                sequence.start,
                sequence.stop()
            ),
        ));
    }

    let offset = (start - sequence.start) as usize;
    let end = (stop - sequence.start + 1) as usize;
    let residues = sequence.residues.get(offset..end).ok_or_else(|| {
        DataError::coordinate_error(query.segment_id(), "Range does not fall on residues")
    })?;

    Ok(Sequence {
        start,
        residues: residues.to_string(),
        ..sequence.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mydas_query::MoleculeType;

    #[test]
    fn test_restrict_sequence() {
        let sequence = Sequence {
            segment_id: "chr1".to_string(),
            start: 1,
            version: "1".to_string(),
            molecule_type: MoleculeType::Dna,
            residues: "ACGTACGTAC".to_string(),
        };

        let whole = restrict_sequence(&sequence, &SegmentQuery::new("chr1")).unwrap();
        assert_eq!(whole.residues, "ACGTACGTAC");

        let query = SegmentQuery::with_range("chr1", 3, 5).unwrap();
        let part = restrict_sequence(&sequence, &query).unwrap();
        assert_eq!(part.residues, "GTA");
        assert_eq!(part.start, 3);

        let query = SegmentQuery::with_range("chr1", 8, 12).unwrap();
        assert!(matches!(
            restrict_sequence(&sequence, &query),
            Err(DataError::CoordinateError { .. })
        ));
    }
}
