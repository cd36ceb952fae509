//! Engine configuration and rules tables.
//!
//! Tables are plain values handed to the engine when it is built, so tests
//! can swap any of them out.

use crate::attack::{default_attack_profiles, AttackTable};
use crate::location::{default_additional_hits, AdditionalHitTable};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One step of the horde attack bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HordeBonusStep {
    pub threshold: u32,
    pub bonus: i32,
}

/// Test modifiers contributed by conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionModifiers {
    /// Bonus for attacking a Stunned target.
    pub stunned_target: i32,
    /// Penalty to every test of a frightened combatant.
    pub fear: i32,
    /// Penalty to melee attacks of a Blinded combatant.
    pub blinded_melee: i32,
}

impl Default for ConditionModifiers {
    fn default() -> Self {
        Self {
            stunned_target: 20,
            fear: -10,
            blinded_melee: -30,
        }
    }
}

/// Advancement cost tables. Columns are indexed by matched aptitudes
/// (0, 1, 2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpTables {
    /// One row per characteristic advance tier.
    pub characteristic: [[u32; 3]; 5],
    /// One row per talent tier.
    pub talent: [[u32; 3]; 3],
    /// Skill cost per step and missing aptitude.
    pub skill_step: u32,
    /// Psy rating cost unit.
    pub psy_rating_step: u32,
}

impl Default for XpTables {
    fn default() -> Self {
        Self {
            characteristic: [
                [500, 250, 100],
                [750, 500, 250],
                [1000, 750, 500],
                [1500, 1000, 750],
                [2500, 1500, 1250],
            ],
            talent: [[600, 300, 200], [900, 450, 300], [1200, 600, 400]],
            skill_step: 100,
            psy_rating_step: 200,
        }
    }
}

/// Every lookup table the engine consults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesTables {
    pub attack_types: AttackTable,
    /// Attack modifier by target size 1..=10.
    pub size_modifiers: Vec<i32>,
    pub horde_attack_bonus: Vec<HordeBonusStep>,
    pub condition_modifiers: ConditionModifiers,
    pub additional_hits: AdditionalHitTable,
    pub experience: XpTables,
}

impl Default for RulesTables {
    fn default() -> Self {
        DEFAULT_TABLES.clone()
    }
}

fn build_default_tables() -> RulesTables {
    RulesTables {
        attack_types: default_attack_profiles(),
        size_modifiers: vec![-30, -20, -10, 0, 10, 20, 30, 40, 50, 60],
        horde_attack_bonus: vec![
            HordeBonusStep { threshold: 25, bonus: 30 },
            HordeBonusStep { threshold: 55, bonus: 40 },
            HordeBonusStep { threshold: 85, bonus: 50 },
            HordeBonusStep { threshold: 115, bonus: 60 },
        ],
        condition_modifiers: ConditionModifiers::default(),
        additional_hits: default_additional_hits(),
        experience: XpTables::default(),
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_TABLES: RulesTables = build_default_tables();
}

/// How experience spend is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceMode {
    /// Sum the cost recorded on each advance.
    Manual,
    /// Recompute every cost from the tables.
    #[default]
    Automatic,
}

/// Configuration for a [`RulesEngine`](crate::RulesEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub experience_mode: ExperienceMode,
    /// Raise the lowest damage die of an attack to its degrees of success.
    pub minimum_damage_houserule: bool,
    pub tables: RulesTables,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            experience_mode: ExperienceMode::default(),
            minimum_damage_houserule: true,
            tables: RulesTables::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_experience_mode(mut self, mode: ExperienceMode) -> Self {
        self.experience_mode = mode;
        self
    }

    pub fn with_minimum_damage_houserule(mut self, enabled: bool) -> Self {
        self.minimum_damage_houserule = enabled;
        self
    }

    pub fn with_tables(mut self, tables: RulesTables) -> Self {
        self.tables = tables;
        self
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::AttackType;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.minimum_damage_houserule);
        assert_eq!(config.experience_mode, ExperienceMode::Automatic);
        assert_eq!(config.tables.size_modifiers.len(), 10);
        assert_eq!(config.tables.attack_types[&AttackType::Standard].modifier, 10);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "minimum_damage_houserule": false }"#).unwrap();
        assert!(!config.minimum_damage_houserule);
        assert_eq!(config.tables, RulesTables::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("engine.json");

        let config = EngineConfig::new()
            .with_experience_mode(ExperienceMode::Manual)
            .with_minimum_damage_houserule(false);
        config.save_json(&path).await.expect("Save should succeed");

        let loaded = EngineConfig::load_json(&path)
            .await
            .expect("Load should succeed");
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = EngineConfig::load_json("/definitely/not/here.json").await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
