//! Per-kind attribute rules.
//!
//! Each domain-specific task kind maps to an ordered list of declarative
//! checks. The table is plain data; adding a kind never touches the matcher.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// One attribute comparison between a detector node and a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum PropertyCheck {
    /// A single attribute compared with [`matches_property`](super::matches_property).
    Single {
        attr: String,
        #[serde(default = "default_true")]
        required: bool,
    },
    /// Mutually exclusive attributes compared with
    /// [`match_alternative_properties`](super::match_alternative_properties).
    Alternative {
        attrs: Vec<String>,
        #[serde(default = "default_true")]
        required: bool,
    },
}

impl PropertyCheck {
    pub fn required(attr: impl Into<String>) -> Self {
        PropertyCheck::Single {
            attr: attr.into(),
            required: true,
        }
    }

    pub fn optional(attr: impl Into<String>) -> Self {
        PropertyCheck::Single {
            attr: attr.into(),
            required: false,
        }
    }

    pub fn alternative<I, S>(attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyCheck::Alternative {
            attrs: attrs.into_iter().map(Into::into).collect(),
            required: true,
        }
    }
}

/// Rules of one task kind, as written in configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KindRule {
    pub kind: String,
    #[serde(default)]
    pub checks: Vec<PropertyCheck>,
}

/// Mapping from task kind to its ordered checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    kinds: HashMap<String, Vec<PropertyCheck>>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules of the built-in quantum task kinds.
    pub fn builtin() -> Self {
        Self::new()
            .with_kind("quantme:QuantumComputationTask", vec![PropertyCheck::required("algorithm"), PropertyCheck::optional("provider")])
            .with_kind("quantme:QuantumCircuitLoadingTask", vec![PropertyCheck::alternative(["quantumCircuit", "url"])])
            .with_kind(
                "quantme:DataPreparationTask",
                vec![PropertyCheck::required("encodingSchema"), PropertyCheck::required("programmingLanguage")],
            )
            .with_kind(
                "quantme:OracleExpansionTask",
                vec![
                    PropertyCheck::required("oracleId"),
                    PropertyCheck::alternative(["oracleCircuit", "oracleURL"]),
                    PropertyCheck::required("programmingLanguage"),
                ],
            )
            .with_kind(
                "quantme:QuantumCircuitExecutionTask",
                vec![
                    PropertyCheck::required("provider"),
                    PropertyCheck::required("qpu"),
                    PropertyCheck::optional("shots"),
                    PropertyCheck::required("programmingLanguage"),
                ],
            )
            .with_kind(
                "quantme:ReadoutErrorMitigationTask",
                vec![PropertyCheck::required("unfoldingTechnique"), PropertyCheck::required("qpu"), PropertyCheck::optional("maxAge")],
            )
    }

    pub fn with_kind(
        mut self,
        kind: impl Into<String>,
        checks: Vec<PropertyCheck>,
    ) -> Self {
        self.insert(kind, checks);
        self
    }

    /// Adds or replaces the rules of a kind.
    pub fn insert(
        &mut self,
        kind: impl Into<String>,
        checks: Vec<PropertyCheck>,
    ) {
        self.kinds.insert(kind.into(), checks);
    }

    /// Merges configured rules over this table; a configured kind replaces
    /// the existing entry.
    pub fn extend<I>(
        &mut self,
        rules: I,
    ) where
        I: IntoIterator<Item = KindRule>,
    {
        for rule in rules {
            self.insert(rule.kind, rule.checks);
        }
    }

    pub fn get(
        &self,
        kind: &str,
    ) -> Option<&[PropertyCheck]> {
        self.kinds.get(kind).map(Vec::as_slice)
    }

    pub fn supports(
        &self,
        kind: &str,
    ) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds() {
        let table = RuleTable::builtin();
        assert_eq!(table.len(), 6);
        assert_eq!(table.get("quantme:QuantumCircuitLoadingTask"), Some(&[PropertyCheck::alternative(["quantumCircuit", "url"])][..]));
        assert!(!table.supports("quantme:Unknown"));
    }

    #[test]
    fn test_extend_replaces_kind() {
        let mut table = RuleTable::builtin();
        table.extend([KindRule {
            kind: "quantme:DataPreparationTask".to_string(),
            checks: vec![PropertyCheck::optional("encodingSchema")],
        }]);
        assert_eq!(table.get("quantme:DataPreparationTask").map(<[_]>::len), Some(1));
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_check_deserialize_defaults_required() {
        let rule: KindRule = toml::from_str(
            r#"
            kind = "quantme:CustomTask"
            checks = [
                { check = "single", attr = "a" },
                { check = "single", attr = "b", required = false },
                { check = "alternative", attrs = ["x", "y"] },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(
            rule.checks,
            vec![PropertyCheck::required("a"), PropertyCheck::optional("b"), PropertyCheck::alternative(["x", "y"])]
        );
    }
}
