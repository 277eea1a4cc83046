//! Query string grammar shared by the DAS commands
//!
//! A query is a `;` separated list of clauses. Segment clauses have the form
//! `segment=<id>[:<start>,<stop>]`; everything else is read as `key=value`.
//! Keys that no command understands are ignored so that newer clients keep
//! working against this server.
//!
//! Queries arrive still percent-encoded. Each piece is decoded only after the
//! clause has been split, so an encoded `;` or `=` stays part of its value.

use mydas_query::{Feature, LinkField};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

static SEGMENT_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^segment=([^:\s]*)(:(\d+),(\d+))?$").expect("valid segment range pattern")
});

/// A query string that cannot be turned into command arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed query: {0}")]
pub struct MalformedQuery(pub String);

impl MalformedQuery {
    fn new(msg: impl Into<String>) -> Self {
        MalformedQuery(msg.into())
    }
}

/// Segment id with an optional `[start, stop]` range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentQuery {
    segment_id: String,
    range: Option<(u64, u64)>,
}

impl SegmentQuery {
    /// Request for a whole segment
    pub fn new(segment_id: impl Into<String>) -> Self {
        Self {
            segment_id: segment_id.into(),
            range: None,
        }
    }

    /// Request for `[start, stop]` of a segment; `stop` must not be lower than `start`
    pub fn with_range(
        segment_id: impl Into<String>,
        start: u64,
        stop: u64,
    ) -> Result<Self, MalformedQuery> {
        let segment_id = segment_id.into();
        if stop < start {
            return Err(MalformedQuery::new(format!(
                "segment {} has stop {} lower than start {}",
                segment_id, stop, start
            )));
        }
        Ok(Self {
            segment_id,
            range: Some((start, stop)),
        })
    }

    /// Parse a single `segment=...` clause. Returns `None` when the clause
    /// does not follow the segment grammar.
    pub fn parse_clause(clause: &str) -> Option<Self> {
        let captures = SEGMENT_RANGE.captures(clause)?;
        let segment_id = captures.get(1)?.as_str();

        match (captures.get(3), captures.get(4)) {
            (Some(start), Some(stop)) => {
                let start = start.as_str().parse().ok()?;
                let stop = stop.as_str().parse().ok()?;
                Self::with_range(segment_id, start, stop).ok()
            }
            _ => Some(Self::new(segment_id)),
        }
    }

    pub fn segment_id(&self) -> &str {
        &self.segment_id
    }

    pub fn start(&self) -> Option<u64> {
        self.range.map(|(start, _)| start)
    }

    pub fn stop(&self) -> Option<u64> {
        self.range.map(|(_, stop)| stop)
    }

    pub fn range(&self) -> Option<(u64, u64)> {
        self.range
    }
}

impl fmt::Display for SegmentQuery {
    /// Canonical form used in cache keys: `id` or `id:start,stop`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range {
            Some((start, stop)) => write!(f, "{}:{},{}", self.segment_id, start, stop),
            None => write!(f, "{}", self.segment_id),
        }
    }
}

/// Restrictions requested on the features command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRequestFilter {
    pub type_ids: BTreeSet<String>,
    pub category_ids: BTreeSet<String>,
    pub feature_ids: BTreeSet<String>,
    pub group_ids: BTreeSet<String>,
    /// `categorize=no` drops feature categories from the response
    pub categorize: bool,
}

impl Default for FeatureRequestFilter {
    fn default() -> Self {
        Self {
            type_ids: BTreeSet::new(),
            category_ids: BTreeSet::new(),
            feature_ids: BTreeSet::new(),
            group_ids: BTreeSet::new(),
            categorize: true,
        }
    }
}

impl FeatureRequestFilter {
    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "type" => {
                self.type_ids.insert(value.to_string());
            }
            "category" => {
                self.category_ids.insert(value.to_string());
            }
            "categorize" => {
                if value == "no" {
                    self.categorize = false;
                }
            }
            "feature_id" => {
                self.feature_ids.insert(value.to_string());
            }
            "group_id" => {
                self.group_ids.insert(value.to_string());
            }
            _ => {}
        }
    }

    pub fn admits_type(&self, type_id: &str) -> bool {
        self.type_ids.is_empty() || self.type_ids.contains(type_id)
    }

    pub fn has_id_lookup(&self) -> bool {
        !self.feature_ids.is_empty() || !self.group_ids.is_empty()
    }

    /// Whether a feature passes every restriction. Feature and group ids
    /// are alternatives: matching either is enough.
    pub fn admits(&self, feature: &Feature) -> bool {
        let category_ok = self.category_ids.is_empty()
            || feature
                .type_category
                .as_ref()
                .is_some_and(|category| self.category_ids.contains(category));

        let id_ok = !self.has_id_lookup()
            || self.feature_ids.contains(&feature.id)
            || feature.groups.iter().any(|g| self.group_ids.contains(&g.id));

        self.admits_type(&feature.type_id) && category_ok && id_ok
    }
}

/// How strictly a command reads clauses that are not segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// dna and sequence: anything but a segment clause is skipped
    Sequence,
    /// features and types: every other clause must be a single `key=value`
    Annotation,
}

/// Segments and filters read from a query string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub segments: Vec<SegmentQuery>,
    pub filter: FeatureRequestFilter,
}

/// Split the way the DAS clients expect: trailing empty pieces are dropped,
/// so `a;b;` has two clauses and `type=` has a single piece.
fn split_clauses(input: &str, separator: char) -> Vec<&str> {
    let mut parts: Vec<&str> = input.split(separator).collect();
    while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
}

fn decode(piece: &str) -> Result<Cow<'_, str>, MalformedQuery> {
    urlencoding::decode(piece)
        .map_err(|_| MalformedQuery::new(format!("'{}' is not valid UTF-8 once decoded", piece)))
}

fn key_value(clause: &str) -> Option<(&str, &str)> {
    match split_clauses(clause, '=').as_slice() {
        [key, value] => Some((key, value)),
        _ => None,
    }
}

/// Read the segments and feature filters of `query`
pub fn parse_query(query: &str, kind: QueryKind) -> Result<ParsedQuery, MalformedQuery> {
    let mut parsed = ParsedQuery::default();
    if query.is_empty() {
        return Ok(parsed);
    }

    for clause in split_clauses(query, ';') {
        let segment = decode(clause)
            .ok()
            .and_then(|decoded| SegmentQuery::parse_clause(&decoded));
        if let Some(segment) = segment {
            parsed.segments.push(segment);
            continue;
        }

        if kind == QueryKind::Sequence {
            continue;
        }

        let (key, value) = key_value(clause)
            .ok_or_else(|| MalformedQuery::new(format!("cannot read clause '{}'", clause)))?;
        parsed.filter.apply(&decode(key)?, &decode(value)?);
    }

    Ok(parsed)
}

/// 1-based inclusive page of entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: u64,
    pub stop: u64,
}

/// Read the optional `rows=<start>-<stop>` argument of entry_points
pub fn parse_rows(query: &str) -> Result<Option<RowRange>, MalformedQuery> {
    let query = decode(query.trim())?;
    if query.is_empty() {
        return Ok(None);
    }

    let rows = match query.split_once('=') {
        Some(("rows", rows)) => rows,
        _ => {
            return Err(MalformedQuery::new(
                "entry_points only accepts a rows argument",
            ))
        }
    };

    let (start, stop) = rows
        .split_once('-')
        .ok_or_else(|| MalformedQuery::new(format!("rows '{}' is not a range", rows)))?;
    let start: u64 = start
        .parse()
        .map_err(|_| MalformedQuery::new(format!("rows start '{}' is not numeric", start)))?;
    let stop: u64 = stop
        .parse()
        .map_err(|_| MalformedQuery::new(format!("rows stop '{}' is not numeric", stop)))?;

    if start == 0 {
        return Err(MalformedQuery::new("rows are numbered from 1"));
    }
    if stop < start {
        return Err(MalformedQuery::new("rows stop is lower than start"));
    }

    Ok(Some(RowRange { start, stop }))
}

/// Read the `field` and `id` arguments of the link command
pub fn parse_link(query: &str) -> Result<(LinkField, String), MalformedQuery> {
    if query.is_empty() {
        return Err(MalformedQuery::new("link needs field and id arguments"));
    }

    let clauses = split_clauses(query, ';');
    if clauses.len() < 2 {
        return Err(MalformedQuery::new("not enough arguments for link"));
    }

    let mut field = None;
    let mut id = None;
    for clause in clauses {
        let (key, value) = key_value(clause)
            .ok_or_else(|| MalformedQuery::new(format!("cannot read clause '{}'", clause)))?;
        match decode(key)?.as_ref() {
            "field" => field = Some(decode(value)?),
            "id" => id = Some(decode(value)?),
            _ => {}
        }
    }

    let field = field
        .and_then(|f| f.parse::<LinkField>().ok())
        .ok_or_else(|| MalformedQuery::new("link needs a valid field argument"))?;
    let id = id.ok_or_else(|| MalformedQuery::new("link needs an id argument"))?;

    Ok((field, id.into_owned()))
}

/// Check a query that may only carry `key=value` clauses, which are ignored
pub fn ignore_key_values(query: &str) -> Result<(), MalformedQuery> {
    if query.trim().is_empty() {
        return Ok(());
    }
    for clause in split_clauses(query, ';') {
        if key_value(clause).is_none() {
            return Err(MalformedQuery::new(format!(
                "unexpected argument '{}'",
                clause
            )));
        }
    }
    Ok(())
}
