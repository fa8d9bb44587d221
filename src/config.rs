//! Configuration management for the metamodel engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (metamodel.toml)
//! - Environment variables (METAMODEL__*)
//!
//! ## Example config file (metamodel.toml):
//! ```toml
//! [schema]
//! universal_base_type = "java.lang.Object"
//! extra_scalar_types = ["com.acme.Status"]
//!
//! [validation]
//! method_prefix = "to"
//! return_type_policy = "lattice"
//! allowed_reducers = ["SUM", "AVG", "MIN", "MAX", "COUNT", "COUNT_DISTINCT"]
//! fail_on_warnings = false
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::compatibility::{CompatibilityChecker, ReturnTypePolicy};
use crate::types::ScalarCatalogue;

/// Main configuration for a metamodel run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetamodelConfig {
    /// Schema registry settings
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Projection validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Output settings for the binaries
    #[serde(default)]
    pub output: OutputConfig,
}

/// Schema registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Superclass walk stops at this type
    #[serde(default = "default_base_type")]
    pub universal_base_type: String,

    /// Added to the built-in scalar set
    #[serde(default)]
    pub extra_scalar_types: Vec<String>,
}

/// Projection validation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Prefix for derived computation method names (`to` + `FullName`)
    #[serde(default = "default_method_prefix")]
    pub method_prefix: String,

    /// How computation method return types are checked
    #[serde(default)]
    pub return_type_policy: ReturnTypePolicy,

    /// Accepted reducer names; empty accepts any
    #[serde(default = "default_reducers")]
    pub allowed_reducers: Vec<String>,

    /// Treat warnings as failures
    #[serde(default)]
    pub fail_on_warnings: bool,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON output format (pretty or compact)
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_base_type() -> String {
    "java.lang.Object".to_string()
}

fn default_method_prefix() -> String {
    "to".to_string()
}

fn default_reducers() -> Vec<String> {
    ["SUM", "AVG", "MIN", "MAX", "COUNT", "COUNT_DISTINCT"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            universal_base_type: default_base_type(),
            extra_scalar_types: Vec::new(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            method_prefix: default_method_prefix(),
            return_type_policy: ReturnTypePolicy::default(),
            allowed_reducers: default_reducers(),
            fail_on_warnings: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
        }
    }
}

impl SchemaConfig {
    /// Built-in scalars plus the configured extras
    pub fn scalar_catalogue(&self) -> ScalarCatalogue {
        let mut scalars = ScalarCatalogue::builtin();
        scalars.extend(&self.extra_scalar_types);
        scalars
    }
}

impl ValidationConfig {
    pub fn checker(&self) -> CompatibilityChecker {
        CompatibilityChecker::new().with_return_policy(self.return_type_policy)
    }

    /// Reducer names compare case-insensitively
    pub fn is_reducer_allowed(&self, name: &str) -> bool {
        self.allowed_reducers.is_empty()
            || self
                .allowed_reducers
                .iter()
                .any(|r| r.eq_ignore_ascii_case(name))
    }
}

impl MetamodelConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["metamodel.toml", ".metamodel.toml", "config/metamodel.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "metamodel") {
            let xdg_config = config_dir.config_dir().join("metamodel.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (METAMODEL__SECTION__KEY)
        builder = builder.add_source(
            Environment::with_prefix("METAMODEL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MetamodelConfig::default();
        assert_eq!(config.schema.universal_base_type, "java.lang.Object");
        assert_eq!(config.validation.method_prefix, "to");
        assert_eq!(config.validation.return_type_policy, ReturnTypePolicy::Lattice);
        assert_eq!(config.validation.allowed_reducers.len(), 6);
        assert_eq!(config.output.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_serialize_config() {
        let config = MetamodelConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[schema]"));
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("return_type_policy = \"lattice\""));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[validation]\nreturn_type_policy = \"exact\"\nallowed_reducers = []\n\n[schema]\nextra_scalar_types = [\"com.acme.Status\"]\n",
        )
        .unwrap();

        let config = MetamodelConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.validation.return_type_policy, ReturnTypePolicy::Exact);
        assert!(config.validation.is_reducer_allowed("MEDIAN"));
        assert!(config.schema.scalar_catalogue().contains_name("com.acme.Status"));
        assert_eq!(config.validation.method_prefix, "to");
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = MetamodelConfig::default();
        config.validation.fail_on_warnings = true;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = MetamodelConfig::load_from(path.to_str()).unwrap();
        assert!(loaded.validation.fail_on_warnings);
    }

    #[test]
    fn test_reducer_allow_list() {
        let validation = ValidationConfig::default();
        assert!(validation.is_reducer_allowed("SUM"));
        assert!(validation.is_reducer_allowed("count_distinct"));
        assert!(!validation.is_reducer_allowed("MEDIAN"));
    }
}
