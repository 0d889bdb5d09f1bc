//! CLI configuration.
//!
//! An optional JSON file supplies the schema catalog, the distribution rules
//! and the default page size. Without one, the catalog is inferred from the
//! specification being compiled and no rules are registered.

use factweave_core::{CoreError, FactTypeId, RoleId, TypeCatalog};
use factweave_distribution::{DistributionError, DistributionRules};
use factweave_spec::{parse_specification, SpecError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Page size used when neither the command line nor the file sets one
pub const DEFAULT_LIMIT: u32 = 100;

/// Failure to load or apply the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Cannot read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("Invalid config {path}: {source}")]
    Json {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// The configured catalog is inconsistent
    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CoreError),

    /// A rule specification does not parse
    #[error("Rule {index}: {source}")]
    RuleSyntax {
        /// Position of the rule in the file
        index: usize,
        /// Parse or validation failure
        source: SpecError,
    },

    /// A rule cannot be registered
    #[error("Rule {index}: {source}")]
    Rule {
        /// Position of the rule in the file
        index: usize,
        /// Registration failure
        source: DistributionError,
    },
}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Role entry of a configured fact type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Role name
    pub name: String,
    /// Role id
    pub id: i64,
}

/// Configured fact type and the roles it declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactTypeConfig {
    /// Fact type name
    pub name: String,
    /// Fact type id
    pub id: i64,
    /// Declared roles
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
}

/// Configured schema catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Known fact types
    #[serde(default)]
    pub fact_types: Vec<FactTypeConfig>,
}

/// Configured distribution rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Permitted specification, in descriptive text
    pub specification: String,
    /// Specification selecting the permitted users, if restricted
    #[serde(default)]
    pub user: Option<String>,
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Schema catalog; inferred per specification when absent
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
    /// Distribution rules
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    /// Default page size
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            rules: Vec::new(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl CliConfig {
    /// Load from `path`, or the defaults when no file is given
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the configured catalog, if any
    ///
    /// # Errors
    ///
    /// Returns error if a fact type or role is declared twice
    pub fn to_catalog(&self) -> ConfigResult<Option<TypeCatalog>> {
        let Some(config) = &self.catalog else {
            return Ok(None);
        };
        let mut catalog = TypeCatalog::new();
        for fact_type in &config.fact_types {
            catalog.insert_fact_type(fact_type.name.clone(), FactTypeId(fact_type.id))?;
        }
        for fact_type in &config.fact_types {
            for role in &fact_type.roles {
                catalog.insert_role(&fact_type.name, role.name.clone(), RoleId(role.id))?;
            }
        }
        Ok(Some(catalog))
    }

    /// Compile the configured rules
    ///
    /// # Errors
    ///
    /// Returns error if a rule does not parse or has no walk
    pub fn to_rules(&self) -> ConfigResult<DistributionRules> {
        let mut rules = DistributionRules::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let parse = |text: &str| {
                parse_specification(text).map_err(|source| ConfigError::RuleSyntax { index, source })
            };
            let specification = parse(&rule.specification)?;
            rules = match &rule.user {
                Some(user) => rules.only(specification, parse(user)?),
                None => rules.everyone(specification),
            }
            .map_err(|source| ConfigError::Rule { index, source })?;
        }
        Ok(rules)
    }
}
