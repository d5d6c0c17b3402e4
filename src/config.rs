//! Planner policy knobs.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::join::{Algorithm, DEFAULT_BLOCK_SIZE, JoinCondition};

/// How the [`Interpreter`][crate::interpreter::Interpreter] plans a statement.
///
/// Missing fields take their default when deserializing.
///
/// # Example
/// ```
/// use reldb::config::PlanConfig;
/// use reldb::join::Algorithm;
///
/// let config = PlanConfig::from_json(r#"{ "join_algorithm": "sort-merge" }"#).unwrap();
/// assert_eq!(config.join_algorithm, Some(Algorithm::SortMerge));
/// assert_eq!(config.block_size, 64);
/// assert!(PlanConfig::from_json(r#"{ "block_size": 0 }"#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    /// Algorithm used for every join; `None` picks one per join.
    pub join_algorithm: Option<Algorithm>,
    /// Left rows per block for the block nested-loop join.
    pub block_size: usize,
    /// Answer single-table comparisons through catalog indexes.
    pub index_selection: bool,
    /// Let joins reuse catalog indexes.
    pub reuse_indexes: bool,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            join_algorithm: None,
            block_size: DEFAULT_BLOCK_SIZE,
            index_selection: false,
            reuse_indexes: true,
        }
    }
}

impl PlanConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "block_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Forces `algorithm` for every join.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.join_algorithm = Some(algorithm);
        self
    }

    /// The algorithm for a join on `condition`: the forced one if any,
    /// otherwise hash for a single-column equi-join and nested loop for the rest.
    pub fn algorithm_for(&self, condition: &JoinCondition) -> Algorithm {
        if let Some(algorithm) = self.join_algorithm {
            return algorithm;
        }
        match condition {
            JoinCondition::Equi(pairs) if pairs.len() == 1 => Algorithm::Hash,
            _ => Algorithm::NestedLoop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{CompareOp, Predicate};

    #[test]
    fn test_defaults() {
        let config = PlanConfig::from_json("{}").unwrap();
        assert_eq!(config, PlanConfig::default());
        assert!(config.reuse_indexes);
        assert!(!config.index_selection);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            PlanConfig::from_json(r#"{ "block_size": 0 }"#),
            Err(ConfigError::InvalidValue {
                field: "block_size",
                ..
            })
        ));
        assert!(matches!(
            PlanConfig::from_json(r#"{ "join_algorithm": "merge" }"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            PlanConfig::from_json(r#"{ "blocksize": 3 }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let config = PlanConfig {
            block_size: 8,
            index_selection: true,
            ..PlanConfig::default()
        }
        .with_algorithm(Algorithm::BlockNestedLoop);
        let text = config.to_json().unwrap();
        assert_eq!(PlanConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_default_policy() {
        let config = PlanConfig::default();
        assert_eq!(
            config.algorithm_for(&JoinCondition::equi("a.k", "b.k")),
            Algorithm::Hash
        );
        assert_eq!(
            config.algorithm_for(&JoinCondition::Theta(Predicate::columns(
                "a.k",
                CompareOp::Lt,
                "b.k"
            ))),
            Algorithm::NestedLoop
        );
        assert_eq!(
            config
                .with_algorithm(Algorithm::SortMerge)
                .algorithm_for(&JoinCondition::Cross),
            Algorithm::SortMerge
        );
    }
}
