use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    ActformError, Result,
    graph::DEFAULT_DOMAIN_PREFIX,
    matcher::{KindRule, RuleTable},
};

const DEFAULT_FRAGMENT_CACHE_SIZE: usize = 256;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// matcher config
    pub matcher: MatcherConfig,
    /// template source config
    pub templates: TemplatesConfig,
    /// capacity of the parsed fragment cache, defaults to 256
    pub fragment_cache_size: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatcherConfig {
    /// type-tag prefix of domain-specific task kinds, defaults to `quantme:`
    pub domain_prefix: String,
    /// seed the rule table with the built-in task kinds
    pub builtin_rules: bool,
    /// additional or overriding kind rules
    pub rules: Vec<KindRule>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplatesConfig {
    /// directory of `*.json` template files
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            templates: TemplatesConfig::default(),
            fragment_cache_size: DEFAULT_FRAGMENT_CACHE_SIZE,
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            domain_prefix: DEFAULT_DOMAIN_PREFIX.to_string(),
            builtin_rules: true,
            rules: Vec::new(),
        }
    }
}

impl MatcherConfig {
    /// Built-in rules (when enabled) with the configured rules merged over them.
    pub fn rule_table(&self) -> RuleTable {
        let mut table = if self.builtin_rules { RuleTable::builtin() } else { RuleTable::new() };
        table.extend(self.rules.iter().cloned());
        table
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| ActformError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.matcher.domain_prefix.is_empty() {
            return Err(ActformError::Config("matcher.domain_prefix must not be empty".to_string()));
        }
        if self.fragment_cache_size == 0 {
            return Err(ActformError::Config("fragment_cache_size must be greater than 0".to_string()));
        }
        Ok(())
    }
}
