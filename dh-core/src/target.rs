//! Target numbers.
//!
//! A test's target is its base value plus the sum of named modifier
//! contributions, with the sum clamped to ±60. Contributions are collected
//! in a fixed order so every term can be audited on the roll context.

use crate::attack::{AttackProfile, AttackType};
use crate::character::Combatant;
use crate::conditions::Condition;
use crate::config::RulesTables;
use crate::weapon_traits::WeaponTraits;
use serde::{Deserialize, Serialize};

/// Largest total modifier, in either direction, a test can carry.
pub const MODIFIER_CAP: i32 = 60;

/// Where a modifier came from. Declaration order is computation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierSource {
    Situational,
    Aim,
    Range,
    AttackType,
    Psychic,
    Difficulty,
    HordeSize,
    TargetCondition,
    ActorCondition,
    TargetSize,
    Weapon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub source: ModifierSource,
    pub value: i32,
    pub label: String,
}

/// Ordered modifier contributions of one test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    entries: Vec<Modifier>,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contribution. Zero contributions are not recorded.
    pub fn push(&mut self, source: ModifierSource, value: i32, label: impl Into<String>) {
        if value != 0 {
            self.entries.push(Modifier {
                source,
                value,
                label: label.into(),
            });
        }
    }

    pub fn entries(&self) -> &[Modifier] {
        &self.entries
    }

    pub fn sum(&self) -> i32 {
        self.entries.iter().map(|m| m.value).sum()
    }

    pub fn from_source(&self, source: ModifierSource) -> i32 {
        self.entries
            .iter()
            .filter(|m| m.source == source)
            .map(|m| m.value)
            .sum()
    }
}

/// `base + clamp(modifiers, −60, +60)`.
pub fn final_target(base: i32, modifiers: i32) -> i32 {
    base + modifiers.clamp(-MODIFIER_CAP, MODIFIER_CAP)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aim {
    #[default]
    None,
    Half,
    Full,
}

impl Aim {
    pub fn modifier(&self) -> i32 {
        match self {
            Aim::None => 0,
            Aim::Half => 10,
            Aim::Full => 20,
        }
    }

    pub fn is_aiming(&self) -> bool {
        !matches!(self, Aim::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBand {
    PointBlank,
    Short,
    #[default]
    Normal,
    Long,
    Extreme,
}

impl RangeBand {
    pub fn modifier(&self) -> i32 {
        match self {
            RangeBand::PointBlank => 30,
            RangeBand::Short => 10,
            RangeBand::Normal => 0,
            RangeBand::Long => -10,
            RangeBand::Extreme => -30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Trivial,
    Elementary,
    Simple,
    Easy,
    Routine,
    Ordinary,
    #[default]
    Challenging,
    Difficult,
    Hard,
    VeryHard,
    Arduous,
    Punishing,
    Hellish,
}

impl Difficulty {
    pub fn modifier(&self) -> i32 {
        match self {
            Difficulty::Trivial => 60,
            Difficulty::Elementary => 50,
            Difficulty::Simple => 40,
            Difficulty::Easy => 30,
            Difficulty::Routine => 20,
            Difficulty::Ordinary => 10,
            Difficulty::Challenging => 0,
            Difficulty::Difficult => -10,
            Difficulty::Hard => -20,
            Difficulty::VeryHard => -30,
            Difficulty::Arduous => -40,
            Difficulty::Punishing => -50,
            Difficulty::Hellish => -60,
        }
    }
}

/// Attack bonus a horde gets from its magnitude.
pub fn horde_attack_bonus(tables: &RulesTables, magnitude: u32) -> i32 {
    tables
        .horde_attack_bonus
        .iter()
        .filter(|step| magnitude >= step.threshold)
        .map(|step| step.bonus)
        .max()
        .unwrap_or(0)
}

/// Modifier for attacking a target of `size` (1..=10).
pub fn size_modifier(tables: &RulesTables, size: u8, immune: bool) -> i32 {
    if immune {
        return 0;
    }
    let len = tables.size_modifiers.len();
    if len == 0 {
        return 0;
    }
    let index = (size.max(1) as usize).min(len) - 1;
    tables.size_modifiers[index]
}

/// Conditions on the acting combatant.
pub fn actor_condition_modifier(tables: &RulesTables, actor: &Combatant, melee_attack: bool) -> i32 {
    let mut total = 0;
    if actor.has_condition(Condition::Fear) {
        total += tables.condition_modifiers.fear;
    }
    if melee_attack && actor.has_condition(Condition::Blinded) {
        total += tables.condition_modifiers.blinded_melee;
    }
    total
}

/// Conditions on the target that help the attacker.
pub fn target_condition_modifier(tables: &RulesTables, target: &Combatant) -> i32 {
    if target.has_condition(Condition::Stunned) {
        tables.condition_modifiers.stunned_target
    } else {
        0
    }
}

/// Everything that shapes an attack's target number.
#[derive(Debug, Clone)]
pub struct AttackSituation<'a> {
    pub attacker: &'a Combatant,
    pub target: Option<&'a Combatant>,
    pub melee: bool,
    pub attack_type: AttackType,
    pub profile: &'a AttackProfile,
    pub traits: &'a WeaponTraits,
    pub aim: Aim,
    pub range: RangeBand,
    pub difficulty: Difficulty,
    pub situational: i32,
    /// Psy-rating contribution of a Focus Power attack.
    pub psychic: i32,
}

/// Collect an attack's modifiers in computation order.
pub fn attack_modifiers(tables: &RulesTables, situation: &AttackSituation<'_>) -> Modifiers {
    let mut mods = Modifiers::new();

    mods.push(ModifierSource::Situational, situation.situational, "Situational");
    mods.push(ModifierSource::Aim, situation.aim.modifier(), "Aim");
    if !situation.melee {
        mods.push(ModifierSource::Range, situation.range.modifier(), "Range");
    }
    mods.push(
        ModifierSource::AttackType,
        situation.profile.modifier,
        situation.attack_type.label(),
    );
    mods.push(ModifierSource::Psychic, situation.psychic, "Psy Rating");
    mods.push(
        ModifierSource::Difficulty,
        situation.difficulty.modifier(),
        "Difficulty",
    );
    mods.push(
        ModifierSource::HordeSize,
        horde_attack_bonus(tables, situation.attacker.horde),
        "Horde",
    );
    if let Some(target) = situation.target {
        mods.push(
            ModifierSource::TargetCondition,
            target_condition_modifier(tables, target),
            "Target Condition",
        );
    }
    mods.push(
        ModifierSource::ActorCondition,
        actor_condition_modifier(tables, situation.attacker, situation.melee),
        "Condition",
    );
    if let Some(target) = situation.target {
        mods.push(
            ModifierSource::TargetSize,
            size_modifier(tables, target.size, target.ignores_size_modifier),
            "Size",
        );
    }

    let traits = situation.traits;
    if traits.twin_linked_bonus {
        mods.push(ModifierSource::Weapon, 10, "Twin-Linked");
    }
    if traits.accurate
        && !situation.melee
        && situation.aim.is_aiming()
        && situation.attack_type.is_single_shot()
    {
        mods.push(ModifierSource::Weapon, 10, "Accurate");
    }
    mods
}

/// Penalty to a Parry against an attacking weapon with these traits.
pub fn parried_weapon_modifier(attacking: &WeaponTraits) -> i32 {
    if attacking.unbalanced {
        -10
    } else {
        0
    }
}

/// Bonus the parrying weapon's own traits give to the Parry test.
pub fn parry_weapon_modifier(traits: &WeaponTraits) -> i32 {
    let mut total = 0;
    if traits.balanced {
        total += 10;
    }
    if traits.defensive {
        total += 15;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::default_attack_profiles;

    #[test]
    fn test_final_target_clamps() {
        assert_eq!(final_target(40, 0), 40);
        assert_eq!(final_target(40, 60), 100);
        assert_eq!(final_target(40, 75), 100);
        assert_eq!(final_target(40, -90), -20);
        assert_eq!(final_target(40, -60), -20);
    }

    #[test]
    fn test_modifier_list_skips_zero() {
        let mut mods = Modifiers::new();
        mods.push(ModifierSource::Aim, 10, "Aim");
        mods.push(ModifierSource::Range, -10, "Range");
        mods.push(ModifierSource::Difficulty, 0, "Difficulty");
        assert_eq!(mods.entries().len(), 2);
        assert_eq!(mods.sum(), 0);
        assert_eq!(final_target(40, mods.sum()), 40);
    }

    #[test]
    fn test_horde_bonus_steps() {
        let tables = RulesTables::default();
        assert_eq!(horde_attack_bonus(&tables, 0), 0);
        assert_eq!(horde_attack_bonus(&tables, 24), 0);
        assert_eq!(horde_attack_bonus(&tables, 25), 30);
        assert_eq!(horde_attack_bonus(&tables, 60), 40);
        assert_eq!(horde_attack_bonus(&tables, 85), 50);
        assert_eq!(horde_attack_bonus(&tables, 300), 60);
    }

    #[test]
    fn test_size_table() {
        let tables = RulesTables::default();
        assert_eq!(size_modifier(&tables, 1, false), -30);
        assert_eq!(size_modifier(&tables, 4, false), 0);
        assert_eq!(size_modifier(&tables, 10, false), 60);
        assert_eq!(size_modifier(&tables, 8, true), 0);
        assert_eq!(size_modifier(&tables, 0, false), -30);
        assert_eq!(size_modifier(&tables, 200, false), 60);
    }

    #[test]
    fn test_size_table_empty_or_long() {
        let mut tables = RulesTables::default();
        tables.size_modifiers.clear();
        assert_eq!(size_modifier(&tables, 4, false), 0);

        tables.size_modifiers = (0..300).collect();
        assert_eq!(size_modifier(&tables, 255, false), 254);
    }

    #[test]
    fn test_stunned_target_helps_attacker() {
        let tables = RulesTables::default();
        let profiles = default_attack_profiles();
        let attacker = Combatant::new("Attacker");
        let target = Combatant::new("Target").with_condition(Condition::Stunned);
        let traits = WeaponTraits::default();
        let profile = profiles[&AttackType::Standard];
        let situation = AttackSituation {
            attacker: &attacker,
            target: Some(&target),
            melee: true,
            attack_type: AttackType::Standard,
            profile: &profile,
            traits: &traits,
            aim: Aim::None,
            range: RangeBand::Normal,
            difficulty: Difficulty::Challenging,
            situational: 0,
            psychic: 0,
        };
        let mods = attack_modifiers(&tables, &situation);
        assert_eq!(mods.from_source(ModifierSource::TargetCondition), 20);
    }

    #[test]
    fn test_fear_and_blinded() {
        let tables = RulesTables::default();
        let actor = Combatant::new("Scared")
            .with_condition(Condition::Fear)
            .with_condition(Condition::Blinded);
        assert_eq!(actor_condition_modifier(&tables, &actor, true), -40);
        assert_eq!(actor_condition_modifier(&tables, &actor, false), -10);
    }

    #[test]
    fn test_accurate_needs_aimed_single_shot() {
        let tables = RulesTables::default();
        let profiles = default_attack_profiles();
        let attacker = Combatant::new("Marksman");
        let traits = WeaponTraits {
            accurate: true,
            ..WeaponTraits::default()
        };

        let mut situation = AttackSituation {
            attacker: &attacker,
            target: None,
            melee: false,
            attack_type: AttackType::Standard,
            profile: &profiles[&AttackType::Standard],
            traits: &traits,
            aim: Aim::Half,
            range: RangeBand::Normal,
            difficulty: Difficulty::Challenging,
            situational: 0,
            psychic: 0,
        };
        assert_eq!(
            attack_modifiers(&tables, &situation).from_source(ModifierSource::Weapon),
            10
        );

        situation.aim = Aim::None;
        assert_eq!(
            attack_modifiers(&tables, &situation).from_source(ModifierSource::Weapon),
            0
        );

        situation.aim = Aim::Full;
        situation.attack_type = AttackType::SemiAuto;
        situation.profile = &profiles[&AttackType::SemiAuto];
        assert_eq!(
            attack_modifiers(&tables, &situation).from_source(ModifierSource::Weapon),
            0
        );
    }

    #[test]
    fn test_parry_traits() {
        let unbalanced = WeaponTraits {
            unbalanced: true,
            ..WeaponTraits::default()
        };
        assert_eq!(parried_weapon_modifier(&unbalanced), -10);
        assert_eq!(parry_weapon_modifier(&unbalanced), 0);
        assert_eq!(parried_weapon_modifier(&WeaponTraits::default()), 0);
        let balanced = WeaponTraits {
            balanced: true,
            ..WeaponTraits::default()
        };
        assert_eq!(parry_weapon_modifier(&balanced), 10);
    }
}
