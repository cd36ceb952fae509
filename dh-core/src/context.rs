//! The roll context: one per resolution, filled in stage by stage and handed
//! to presentation unchanged.

use crate::attack::AttackType;
use crate::character::{CharacteristicKind, CombatantId};
use crate::check::{Malfunction, PsychicMode, PsychicPhenomena, TestOutcome};
use crate::damage::HitDamage;
use crate::items::{PsychicPower, Weapon};
use crate::location::HitLocation;
use crate::target::{final_target, Modifier, Modifiers};
use crate::weapon_traits::WeaponTraits;
use crate::wounds::DamageReport;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of test was rolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RollKind {
    Characteristic {
        characteristic: CharacteristicKind,
    },
    Skill {
        skill: String,
        speciality: Option<String>,
    },
    Attack {
        attack_type: AttackType,
        weapon: String,
    },
    Evasion {
        skill: String,
    },
    FocusPower {
        power: String,
        mode: PsychicMode,
    },
    /// Shock test at the start of a turn.
    Shock,
}

/// Advisory outcome reported to the table. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "notice")]
pub enum Notice {
    NotEnoughAmmunition { needed: u32, loaded: u32 },
    WeaponJammed,
    WeaponOverheated,
    NoFatePoints,
    NoAmmunitionToReload { weapon: String },
    MissingCombatant { id: CombatantId },
    MissingWeapon { name: String },
    MissingPower { name: String },
    MissingSkill { name: String },
    AttackTypeNotAllowed { attack_type: AttackType },
    BlindedRangedAttack,
    HordeBroken { target: CombatantId },
    PerilsOfTheWarp { roll: u32 },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NotEnoughAmmunition { needed, loaded } => {
                write!(f, "Not enough ammunition ({loaded} loaded, {needed} needed)")
            }
            Notice::WeaponJammed => write!(f, "Weapon jammed"),
            Notice::WeaponOverheated => write!(f, "Weapon overheated"),
            Notice::NoFatePoints => write!(f, "No fate points left"),
            Notice::NoAmmunitionToReload { weapon } => {
                write!(f, "No ammunition to reload {weapon}")
            }
            Notice::MissingCombatant { id } => write!(f, "Unknown combatant {id}"),
            Notice::MissingWeapon { name } => write!(f, "Unknown weapon {name}"),
            Notice::MissingPower { name } => write!(f, "Unknown psychic power {name}"),
            Notice::MissingSkill { name } => write!(f, "Unknown skill {name}"),
            Notice::AttackTypeNotAllowed { attack_type } => {
                write!(f, "{attack_type} is not possible with this weapon")
            }
            Notice::BlindedRangedAttack => write!(f, "Blinded: ranged attack fails"),
            Notice::HordeBroken { .. } => write!(f, "The horde is broken"),
            Notice::PerilsOfTheWarp { roll } => write!(f, "Perils of the Warp ({roll})"),
        }
    }
}

/// Weapon or power an attack was made with, as it stood at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackSource {
    Weapon(Weapon),
    Power(PsychicPower),
}

/// Attack-specific part of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackDetails {
    pub attack_type: AttackType,
    pub source: AttackSource,
    pub traits: WeaponTraits,
    pub melee: bool,
    /// Rounds the attack spends.
    pub rounds: u32,
    pub called_location: Option<HitLocation>,
    pub evasion_dos: u32,
    pub hits: u32,
    pub damage: Vec<HitDamage>,
    /// Hit raised by the minimum-damage houserule.
    pub minimum_adjusted_hit: Option<usize>,
    pub applied: Option<DamageReport>,
}

/// Psychic part of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsychicDetails {
    pub mode: PsychicMode,
    pub effective_rating: u32,
    pub push: u32,
    pub phenomena: Option<PsychicPhenomena>,
}

/// Everything known about one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollContext {
    pub actor: CombatantId,
    pub actor_name: String,
    pub target: Option<CombatantId>,
    pub kind: RollKind,
    pub base_target: i32,
    pub modifiers: Modifiers,
    pub final_target: i32,
    pub outcome: Option<TestOutcome>,
    pub malfunction: Option<Malfunction>,
    pub attack: Option<AttackDetails>,
    pub psychic: Option<PsychicDetails>,
    pub notices: Vec<Notice>,
    /// Set when this resolution was bought with a Fate point.
    pub fate_reroll: bool,
}

impl RollContext {
    pub fn new(actor: CombatantId, actor_name: impl Into<String>, kind: RollKind) -> Self {
        Self {
            actor,
            actor_name: actor_name.into(),
            target: None,
            kind,
            base_target: 0,
            modifiers: Modifiers::new(),
            final_target: 0,
            outcome: None,
            malfunction: None,
            attack: None,
            psychic: None,
            notices: Vec::new(),
            fate_reroll: false,
        }
    }

    /// Fix the base target and modifiers, computing the final target.
    pub fn set_target(&mut self, base: i32, modifiers: Modifiers) {
        self.base_target = base;
        self.final_target = final_target(base, modifiers.sum());
        self.modifiers = modifiers;
    }

    pub fn modifier_entries(&self) -> &[Modifier] {
        self.modifiers.entries()
    }

    pub fn notice(&mut self, notice: Notice) {
        tracing::debug!(%notice, actor = %self.actor_name, "notice");
        self.notices.push(notice);
    }

    pub fn has_notice(&self, notice: &Notice) -> bool {
        self.notices.contains(notice)
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.is_some_and(|o| o.success)
    }

    pub fn dos(&self) -> u32 {
        self.outcome.map_or(0, |o| o.dos)
    }

    pub fn hits(&self) -> u32 {
        self.attack.as_ref().map_or(0, |a| a.hits)
    }
}
