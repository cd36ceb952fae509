//! Scenario files: an encounter plus a list of actions, addressed by
//! combatant name.

use anyhow::{bail, Context, Result};
use dh_core::character::{CharacteristicKind, CombatantId};
use dh_core::target::Difficulty;
use dh_core::{
    AttackOptions, AttackType, Combatant, Encounter, EngineConfig, EvasionKind, Intent,
    PsychicMode, TestSubject,
};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Engine settings; defaults when absent.
    #[serde(default)]
    pub config: Option<EngineConfig>,
    pub combatants: Vec<Combatant>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// One step of a scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Action {
    Test {
        actor: String,
        #[serde(default)]
        characteristic: Option<CharacteristicKind>,
        #[serde(default)]
        skill: Option<String>,
        #[serde(default)]
        speciality: Option<String>,
        #[serde(default)]
        difficulty: Difficulty,
        #[serde(default)]
        situational: i32,
    },
    Attack {
        actor: String,
        target: String,
        weapon: String,
        attack_type: AttackType,
        #[serde(default)]
        options: AttackOptions,
    },
    Evade {
        actor: String,
        kind: EvasionKind,
        #[serde(default)]
        weapon: Option<String>,
        /// Trait text of the weapon being parried.
        #[serde(default)]
        against: Option<String>,
        #[serde(default)]
        difficulty: Difficulty,
    },
    FocusPower {
        actor: String,
        #[serde(default)]
        target: Option<String>,
        power: String,
        #[serde(default)]
        mode: PsychicMode,
        #[serde(default = "default_power_attack")]
        attack_type: AttackType,
        #[serde(default)]
        options: AttackOptions,
    },
    Reload {
        actor: String,
        weapon: String,
    },
    StartTurn {
        actor: String,
    },
}

fn default_power_attack() -> AttackType {
    AttackType::Bolt
}

impl Scenario {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn encounter(&self) -> Encounter {
        self.combatants
            .iter()
            .cloned()
            .fold(Encounter::new(self.name.clone()), Encounter::with_combatant)
    }
}

fn find(encounter: &Encounter, name: &str) -> Result<CombatantId> {
    match encounter.find_by_name(name) {
        Some(combatant) => Ok(combatant.id),
        None => bail!("no combatant named {name:?} in the scenario"),
    }
}

impl Action {
    /// Turn the named action into an intent against `encounter`.
    pub fn to_intent(&self, encounter: &Encounter) -> Result<Intent> {
        let intent = match self {
            Action::Test {
                actor,
                characteristic,
                skill,
                speciality,
                difficulty,
                situational,
            } => {
                let subject = match (skill, characteristic) {
                    (Some(name), _) => TestSubject::Skill {
                        name: name.clone(),
                        speciality: speciality.clone(),
                    },
                    (None, Some(kind)) => TestSubject::Characteristic(*kind),
                    (None, None) => bail!("test for {actor} names neither a skill nor a characteristic"),
                };
                Intent::Test {
                    character_id: find(encounter, actor)?,
                    subject,
                    difficulty: *difficulty,
                    situational: *situational,
                }
            }
            Action::Attack {
                actor,
                target,
                weapon,
                attack_type,
                options,
            } => Intent::Attack {
                attacker_id: find(encounter, actor)?,
                target_id: find(encounter, target)?,
                weapon_name: weapon.clone(),
                attack_type: *attack_type,
                options: options.clone(),
            },
            Action::Evade {
                actor,
                kind,
                weapon,
                against,
                difficulty,
            } => Intent::Evade {
                character_id: find(encounter, actor)?,
                kind: *kind,
                weapon_name: weapon.clone(),
                attacker_weapon_traits: against.clone(),
                difficulty: *difficulty,
                situational: 0,
            },
            Action::FocusPower {
                actor,
                target,
                power,
                mode,
                attack_type,
                options,
            } => Intent::FocusPower {
                psyker_id: find(encounter, actor)?,
                target_id: target.as_deref().map(|t| find(encounter, t)).transpose()?,
                power_name: power.clone(),
                mode: *mode,
                attack_type: *attack_type,
                options: options.clone(),
            },
            Action::Reload { actor, weapon } => Intent::Reload {
                character_id: find(encounter, actor)?,
                weapon_name: weapon.clone(),
            },
            Action::StartTurn { actor } => Intent::StartTurn {
                character_id: find(encounter, actor)?,
            },
        };
        Ok(intent)
    }
}
