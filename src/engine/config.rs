use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::TokenizerProgram;
use crate::error::{Result, ShadowError};
use crate::expr::dialect::DialectKind;
use crate::schema::DEFAULT_DERIVED_PREFIX;

/// Default name of the registered text index.
pub const DEFAULT_INDEX_NAME: &str = "TextIndex";

/// Default variable bound to array elements in recomputation clauses.
pub const DEFAULT_ELEMENT_VAR: &str = "elemt";

/// Configuration of the shadow-search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Marker prepended to the leaf name of derived fields.
    pub derived_prefix: String,
    /// Name of the weighted text index over the derived fields.
    pub index_name: String,
    /// Backend the tokenizer is compiled to in recomputation clauses.
    pub dialect: DialectKind,
    /// Variable bound to array elements; nested arrays append their depth.
    pub element_var: String,
    /// Tokenizer applied to source values.
    pub tokenizer: TokenizerProgram,
}

impl ShadowConfig {
    pub fn new() -> Self {
        Self {
            derived_prefix: DEFAULT_DERIVED_PREFIX.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            dialect: DialectKind::default(),
            element_var: DEFAULT_ELEMENT_VAR.to_string(),
            tokenizer: TokenizerProgram::default(),
        }
    }

    pub fn builder() -> ShadowConfigBuilder {
        ShadowConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration. Missing keys take their
    /// default value.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ShadowConfig = serde_json::from_str(json)
            .map_err(|e| ShadowError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.derived_prefix.is_empty() {
            return Err(ShadowError::invalid_config(
                "derived_prefix must not be empty",
            ));
        }
        if self.derived_prefix.contains('.') || self.derived_prefix.starts_with('$') {
            return Err(ShadowError::invalid_config(format!(
                "derived_prefix '{}' is not a valid field name prefix",
                self.derived_prefix
            )));
        }
        if self.index_name.trim().is_empty() {
            return Err(ShadowError::invalid_config("index_name must not be empty"));
        }
        let mut chars = self.element_var.chars();
        let valid_var = chars.next().is_some_and(|c| c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_var {
            return Err(ShadowError::invalid_config(format!(
                "element_var '{}' must start with a lowercase letter and be alphanumeric",
                self.element_var
            )));
        }
        Ok(())
    }
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct ShadowConfigBuilder {
    derived_prefix: Option<String>,
    index_name: Option<String>,
    dialect: Option<DialectKind>,
    element_var: Option<String>,
    tokenizer: Option<TokenizerProgram>,
}

impl ShadowConfigBuilder {
    pub fn derived_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.derived_prefix = Some(prefix.into());
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    pub fn dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn element_var(mut self, var: impl Into<String>) -> Self {
        self.element_var = Some(var.into());
        self
    }

    pub fn tokenizer(mut self, program: TokenizerProgram) -> Self {
        self.tokenizer = Some(program);
        self
    }

    pub fn build(self) -> ShadowConfig {
        let defaults = ShadowConfig::new();
        ShadowConfig {
            derived_prefix: self.derived_prefix.unwrap_or(defaults.derived_prefix),
            index_name: self.index_name.unwrap_or(defaults.index_name),
            dialect: self.dialect.unwrap_or(defaults.dialect),
            element_var: self.element_var.unwrap_or(defaults.element_var),
            tokenizer: self.tokenizer.unwrap_or(defaults.tokenizer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ShadowConfig::default();
        assert_eq!(config.derived_prefix, "__");
        assert_eq!(config.index_name, "TextIndex");
        assert_eq!(config.dialect, DialectKind::Mongo);
        assert_eq!(config.element_var, "elemt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = ShadowConfig::from_json_str(r#"{ "dialect": "portable", "index_name": "Search" }"#)
            .unwrap();
        assert_eq!(config.dialect, DialectKind::Portable);
        assert_eq!(config.index_name, "Search");
        assert_eq!(config.derived_prefix, "__");
        assert_eq!(config.tokenizer, TokenizerProgram::french());
    }

    #[test]
    fn test_invalid_json_config() {
        assert!(ShadowConfig::from_json_str(r#"{ "derived_prefix": "" }"#).is_err());
        assert!(ShadowConfig::from_json_str(r#"{ "element_var": "Elem" }"#).is_err());
        assert!(ShadowConfig::from_json_str(r#"{ "dialect": "sql" }"#).is_err());
        assert!(
            ShadowConfig::from_json_str(r#"{ "tokenizer": [{ "op": "split_whitespace" }] }"#)
                .is_err()
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "derived_prefix": "_s_" }}"#).unwrap();
        let config = ShadowConfig::from_file(file.path()).unwrap();
        assert_eq!(config.derived_prefix, "_s_");

        let missing = ShadowConfig::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ShadowError::Io(_))));
    }
}
