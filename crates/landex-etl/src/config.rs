//! Extractor configuration
//!
//! Configuration is a YAML document with three sections: the destination
//! database, the public S3 bucket with its file-to-table mapping, and
//! the API endpoint-to-table mapping. String values support
//! environment-variable substitution (`${VAR}` or `$VAR`, `$$` escapes a
//! literal dollar) applied to the raw document before parsing, so
//! credentials stay out of the file.
//!
//! Source mappings are order-preserving: extraction passes visit entries
//! in the order they appear in the file, and that order is observable
//! (truncation happens first, and a failure aborts the remainder of the
//! pass).

use crate::error::{ExtractError, Result};
use regex::Regex;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::path::Path;
use std::sync::LazyLock;

/// Default AWS region when the config omits one
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Top-level extractor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    pub database: DatabaseConfig,
    pub s3: S3Config,
    pub api: ApiConfig,
}

/// Destination database connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Public S3 source settings
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Optional custom endpoint (path-style URLs, e.g. a local minio);
    /// unset means the public AWS URL shape
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Storage key -> destination landing table, in configured order
    pub files: TableMapping,
}

/// HTTP API source settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Endpoint URL -> destination landing table, in configured order
    pub endpoints: TableMapping,
}

fn default_region() -> String {
    DEFAULT_S3_REGION.to_string()
}

/// An ordered source-ref -> table mapping
///
/// Deserialized from a YAML mapping; entries keep document order, which
/// a plain `HashMap` would lose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMapping(Vec<(String, String)>);

impl TableMapping {
    /// Iterate `(source_ref, table_name)` pairs in configured order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Destination table names in configured order
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(String, String)>> for TableMapping {
    fn from(entries: Vec<(String, String)>) -> Self {
        Self(entries)
    }
}

impl<'de> Deserialize<'de> for TableMapping {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = TableMapping;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a mapping of source ref to table name")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    entries.push((key, value));
                }
                Ok(TableMapping(entries))
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

// Matches `$$`, `${name}` and `$name`; anything else starting with `$`
// passes through untouched.
static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("valid regex")
});

/// Substitute environment variables into the raw config text.
///
/// Unknown variables are left as-is rather than failing, matching
/// lenient template substitution: a missing variable surfaces later as
/// an unusable literal value instead of blocking startup.
pub fn substitute_env(content: &str) -> String {
    substitute_with(content, |name| std::env::var(name).ok())
}

fn substitute_with<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR
        .replace_all(content, |caps: &regex::Captures| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match lookup(name) {
                Some(value) => value,
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

impl ExtractorConfig {
    /// Load configuration from a YAML file, substituting environment
    /// variables into the document first.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&substitute_env(&content))
    }

    /// Parse configuration from an already-substituted YAML string.
    ///
    /// Mapping keys are taken verbatim: storage keys and endpoint URLs
    /// are case-sensitive, so nothing here may fold their case.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| ExtractError::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
database:
  host: localhost
  port: 5432
  user: etl
  password: secret
  database: warehouse
s3:
  bucket_name: acme-raw
  files:
    sales/orders.csv: orders
    sales/stores.csv: stores
    catalog/products.json: products_raw
api:
  endpoints:
    https://api.example.com/customers: customers_raw
"#;

    #[test]
    fn test_parse_sample() {
        let cfg = ExtractorConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.database.host, "localhost");
        assert_eq!(cfg.database.port, 5432);
        assert_eq!(cfg.s3.bucket_name, "acme-raw");
        // Region falls back to the default when omitted
        assert_eq!(cfg.s3.region, DEFAULT_S3_REGION);
        assert_eq!(cfg.api.endpoints.len(), 1);
    }

    #[test]
    fn test_mapping_preserves_order() {
        let cfg = ExtractorConfig::from_yaml(SAMPLE).unwrap();
        let keys: Vec<&str> = cfg.s3.files.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "sales/orders.csv",
                "sales/stores.csv",
                "catalog/products.json"
            ]
        );
        let tables: Vec<&str> = cfg.s3.files.tables().collect();
        assert_eq!(tables, vec!["orders", "stores", "products_raw"]);
    }

    #[test]
    fn test_mapping_keys_keep_their_case() {
        // Storage keys and endpoint URLs are case-sensitive; parsing
        // must hand them through byte for byte.
        let yaml = SAMPLE
            .replace("sales/orders.csv", "Sales/Orders.CSV")
            .replace(
                "https://api.example.com/customers",
                "https://api.example.com/Customers",
            );
        let cfg = ExtractorConfig::from_yaml(&yaml).unwrap();

        let keys: Vec<&str> = cfg.s3.files.iter().map(|(k, _)| k).collect();
        assert_eq!(keys[0], "Sales/Orders.CSV");
        let endpoints: Vec<&str> = cfg.api.endpoints.iter().map(|(k, _)| k).collect();
        assert_eq!(endpoints, vec!["https://api.example.com/Customers"]);
    }

    #[test]
    fn test_substitute_known_variables() {
        let lookup = |name: &str| match name {
            "DB_USER" => Some("etl".to_string()),
            "DB_PASSWORD" => Some("hunter2".to_string()),
            _ => None,
        };
        let out = substitute_with("user: ${DB_USER}\npassword: $DB_PASSWORD", lookup);
        assert_eq!(out, "user: etl\npassword: hunter2");
    }

    #[test]
    fn test_substitute_leaves_unknown_untouched() {
        let out = substitute_with("password: ${NOT_SET}", |_| None);
        assert_eq!(out, "password: ${NOT_SET}");
    }

    #[test]
    fn test_substitute_dollar_escape() {
        let out = substitute_with("cost: $$5", |_| Some("x".to_string()));
        assert_eq!(out, "cost: $5");
    }

    #[test]
    fn test_load_from_file_substitutes_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::env::set_var("LANDEX_TEST_DB_HOST", "dbhost.test");
        std::fs::write(&path, SAMPLE.replace("localhost", "${LANDEX_TEST_DB_HOST}")).unwrap();

        let cfg = ExtractorConfig::load(&path).unwrap();
        assert_eq!(cfg.database.host, "dbhost.test");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ExtractorConfig::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }

    #[test]
    fn test_missing_section_is_config_error() {
        let err = ExtractorConfig::from_yaml("database:\n  host: x").unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }
}
