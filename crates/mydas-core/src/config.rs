//! Server and data source configuration
//!
//! The configuration is a single YAML (or JSON) document:
//!
//! ```yaml
//! global:
//!   base_url: http://localhost:8080/das/
//!   default_stylesheet: default.style
//! datasources:
//!   - id: demo
//!     backend: memory
//!     mapmaster: http://localhost:8080/das/demo/
//!     options:
//!       fixture: demo.yaml
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {details}")]
    InvalidConfiguration { details: String },
}

/// Settings shared by all data sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Public URL of the `/das/` root, used to rebuild `href` attributes
    pub base_url: String,
    /// Stylesheet served when a data source does not configure its own
    #[serde(default)]
    pub default_stylesheet: Option<String>,
    /// Directory stylesheet file names are resolved against
    #[serde(default = "default_resource_dir")]
    pub resource_dir: PathBuf,
    /// Whether responses may be gzip compressed
    #[serde(default = "default_true")]
    pub gzip: bool,
    #[serde(default)]
    pub dsn_xslt: Option<String>,
    #[serde(default)]
    pub dna_xslt: Option<String>,
    #[serde(default)]
    pub sequence_xslt: Option<String>,
    #[serde(default)]
    pub types_xslt: Option<String>,
    #[serde(default)]
    pub features_xslt: Option<String>,
    #[serde(default)]
    pub entry_points_xslt: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/das/".to_string(),
            default_stylesheet: None,
            resource_dir: default_resource_dir(),
            gzip: true,
            dsn_xslt: None,
            dna_xslt: None,
            sequence_xslt: None,
            types_xslt: None,
            features_xslt: None,
            entry_points_xslt: None,
        }
    }
}

/// Maintainer contact reported by the `sources` command
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Maintainer {
    pub email: String,
}

/// Coordinate system a data source version is annotated against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub uri: String,
    pub source: String,
    pub authority: String,
    #[serde(default)]
    pub taxid: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub test_range: String,
    /// Human readable description used as the element text
    pub description: String,
}

/// One advertised capability of a data source version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCapability {
    #[serde(rename = "type")]
    pub capability_type: String,
    #[serde(default)]
    pub query_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVersion {
    pub uri: String,
    pub created: NaiveDate,
    #[serde(default)]
    pub coordinates: Vec<Coordinates>,
    #[serde(default)]
    pub capabilities: Vec<SourceCapability>,
}

/// Configuration of one data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Unique id, also the URL path segment and the cache group
    pub id: String,
    /// Backend type used to pick the factory (e.g. "memory")
    pub backend: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub mapmaster: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stylesheet: Option<String>,
    #[serde(default = "default_true")]
    pub dna_command_enabled: bool,
    #[serde(default)]
    pub features_strictly_enclosed: bool,
    #[serde(default = "default_true")]
    pub use_feature_id_for_feature_label: bool,
    #[serde(default)]
    pub include_types_with_zero_count: bool,
    /// Backend specific options handed to the factory
    #[serde(default)]
    pub options: BTreeMap<String, String>,

    // DAS 1.6 source metadata
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub doc_href: Option<String>,
    #[serde(default)]
    pub maintainer: Maintainer,
    #[serde(default)]
    pub versions: Vec<SourceVersion>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl DataSourceConfig {
    pub fn new(id: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            backend: backend.into(),
            name: None,
            version: None,
            mapmaster: String::new(),
            description: None,
            stylesheet: None,
            dna_command_enabled: true,
            features_strictly_enclosed: false,
            use_feature_id_for_feature_label: true,
            include_types_with_zero_count: false,
            options: BTreeMap::new(),
            uri: None,
            title: None,
            doc_href: None,
            maintainer: Maintainer::default(),
            versions: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Cache group owning every cached result of this data source
    pub fn cache_group(&self) -> &str {
        &self.id
    }

    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub datasources: Vec<DataSourceConfig>,
}

impl ServerConfig {
    /// Parse a YAML (or JSON) document and validate it
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration file at `path`.
    ///
    /// A relative `resource_dir` is resolved against the directory holding
    /// the configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml_str(&content)?;
        if config.global.resource_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.global.resource_dir = parent.join(&config.global.resource_dir);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.datasources.is_empty() {
            return Err(ConfigError::InvalidConfiguration {
                details: "at least one data source must be configured".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for datasource in &self.datasources {
            if datasource.id.trim().is_empty() {
                return Err(ConfigError::InvalidConfiguration {
                    details: "data source id must not be empty".to_string(),
                });
            }
            if datasource.id.contains('/') {
                return Err(ConfigError::InvalidConfiguration {
                    details: format!("data source id '{}' must not contain '/'", datasource.id),
                });
            }
            if !seen.insert(datasource.id.as_str()) {
                return Err(ConfigError::InvalidConfiguration {
                    details: format!("duplicate data source id '{}'", datasource.id),
                });
            }
        }
        Ok(())
    }

    pub fn datasource(&self, id: &str) -> Option<&DataSourceConfig> {
        self.datasources.iter().find(|d| d.id == id)
    }
}

fn default_true() -> bool {
    true
}

fn default_resource_dir() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
global:
  base_url: http://example.org/das/
  default_stylesheet: default.style
  resource_dir: styles
datasources:
  - id: ensembl
    backend: memory
    name: Ensembl genes
    version: "42"
    mapmaster: http://example.org/das/ensembl/
    include_types_with_zero_count: true
    options:
      fixture: genes.yaml
    versions:
      - uri: ensembl.42
        created: 2024-05-01
        coordinates:
          - uri: http://www.dasregistry.org/dasregistry/coordsys/CS_DS40
            source: Chromosome
            authority: GRCh
            version: "38"
            taxid: "9606"
            test_range: "1:100,200"
            description: GRCh_38,Chromosome,Homo sapiens
        capabilities:
          - type: das1:features
            query_uri: http://example.org/das/ensembl/features
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = ServerConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.global.base_url, "http://example.org/das/");
        assert!(config.global.gzip);
        assert_eq!(config.datasources.len(), 1);

        let ds = config.datasource("ensembl").unwrap();
        assert_eq!(ds.display_name(), "Ensembl genes");
        assert_eq!(ds.cache_group(), "ensembl");
        assert!(ds.dna_command_enabled);
        assert!(ds.use_feature_id_for_feature_label);
        assert!(ds.include_types_with_zero_count);
        assert!(!ds.features_strictly_enclosed);
        assert_eq!(ds.options.get("fixture").map(String::as_str), Some("genes.yaml"));
        assert_eq!(ds.versions[0].capabilities[0].capability_type, "das1:features");
        assert_eq!(
            ds.versions[0].created,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let ds = DataSourceConfig::new("plain", "memory");
        assert_eq!(ds.display_name(), "plain");
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let yaml = r#"
datasources:
  - id: a
    backend: memory
  - id: a
    backend: memory
"#;
        let err = ServerConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_rejects_empty_datasource_list() {
        let err = ServerConfig::from_yaml_str("global:\n  base_url: http://x/das/\n").unwrap_err();
        assert!(err.to_string().contains("at least one data source"));
    }

    #[test]
    fn test_from_file_resolves_resource_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mydas.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.global.resource_dir, dir.path().join("styles"));
    }

    #[test]
    fn test_from_file_missing() {
        let err = ServerConfig::from_file("/nonexistent/mydas.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
