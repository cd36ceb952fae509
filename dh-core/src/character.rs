//! Combatant state: characteristics, skills, wounds, fatigue, armour,
//! psychic rating, fate and experience.
//!
//! Derived values (totals, bonuses, armour totals) are always computed from
//! the stored base fields and never written back.

use crate::conditions::{Condition, ConditionSet, Severity};
use crate::items::{Ammunition, PsychicPower, Talent, Weapon};
use crate::location::{worn_armour, ArmourItem, ArmourLocation, ByLocation, HitLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Characteristics
// ============================================================================

/// The ten characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicKind {
    WeaponSkill,
    BallisticSkill,
    Strength,
    Toughness,
    Agility,
    Intelligence,
    Perception,
    Willpower,
    Fellowship,
    Influence,
}

impl CharacteristicKind {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            CharacteristicKind::WeaponSkill => "WS",
            CharacteristicKind::BallisticSkill => "BS",
            CharacteristicKind::Strength => "S",
            CharacteristicKind::Toughness => "T",
            CharacteristicKind::Agility => "Ag",
            CharacteristicKind::Intelligence => "Int",
            CharacteristicKind::Perception => "Per",
            CharacteristicKind::Willpower => "WP",
            CharacteristicKind::Fellowship => "Fel",
            CharacteristicKind::Influence => "Inf",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacteristicKind::WeaponSkill => "Weapon Skill",
            CharacteristicKind::BallisticSkill => "Ballistic Skill",
            CharacteristicKind::Strength => "Strength",
            CharacteristicKind::Toughness => "Toughness",
            CharacteristicKind::Agility => "Agility",
            CharacteristicKind::Intelligence => "Intelligence",
            CharacteristicKind::Perception => "Perception",
            CharacteristicKind::Willpower => "Willpower",
            CharacteristicKind::Fellowship => "Fellowship",
            CharacteristicKind::Influence => "Influence",
        }
    }

    pub fn all() -> [CharacteristicKind; 10] {
        [
            CharacteristicKind::WeaponSkill,
            CharacteristicKind::BallisticSkill,
            CharacteristicKind::Strength,
            CharacteristicKind::Toughness,
            CharacteristicKind::Agility,
            CharacteristicKind::Intelligence,
            CharacteristicKind::Perception,
            CharacteristicKind::Willpower,
            CharacteristicKind::Fellowship,
            CharacteristicKind::Influence,
        ]
    }
}

impl fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Stored characteristic fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    pub base: i32,
    /// Purchased advances, a multiple of 5.
    #[serde(default)]
    pub advance: i32,
    #[serde(default)]
    pub temp_modifier: i32,
    #[serde(default)]
    pub unnatural: i32,
    #[serde(default)]
    pub aptitudes: Vec<String>,
    /// Manually recorded experience cost.
    #[serde(default)]
    pub cost: u32,
}

impl Characteristic {
    pub fn new(base: i32) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// Derived values for the given fatigue penalty.
    pub fn score(&self, fatigue_penalty: i32) -> CharacteristicScore {
        let total = (self.base + self.advance - fatigue_penalty).max(0);
        let display_total = total + self.temp_modifier;
        CharacteristicScore {
            total,
            bonus: total.div_euclid(10) + self.unnatural,
            display_total,
            display_bonus: display_total.div_euclid(10) + self.unnatural,
            unnatural: self.unnatural,
        }
    }
}

/// Values derived from a [`Characteristic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicScore {
    pub total: i32,
    pub bonus: i32,
    pub display_total: i32,
    pub display_bonus: i32,
    pub unnatural: i32,
}

/// All ten characteristics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristics {
    pub weapon_skill: Characteristic,
    pub ballistic_skill: Characteristic,
    pub strength: Characteristic,
    pub toughness: Characteristic,
    pub agility: Characteristic,
    pub intelligence: Characteristic,
    pub perception: Characteristic,
    pub willpower: Characteristic,
    pub fellowship: Characteristic,
    pub influence: Characteristic,
}

impl Characteristics {
    /// Every characteristic at the same base value.
    pub fn uniform(base: i32) -> Self {
        let mut chars = Self::default();
        for kind in CharacteristicKind::all() {
            chars.get_mut(kind).base = base;
        }
        chars
    }

    pub fn get(&self, kind: CharacteristicKind) -> &Characteristic {
        match kind {
            CharacteristicKind::WeaponSkill => &self.weapon_skill,
            CharacteristicKind::BallisticSkill => &self.ballistic_skill,
            CharacteristicKind::Strength => &self.strength,
            CharacteristicKind::Toughness => &self.toughness,
            CharacteristicKind::Agility => &self.agility,
            CharacteristicKind::Intelligence => &self.intelligence,
            CharacteristicKind::Perception => &self.perception,
            CharacteristicKind::Willpower => &self.willpower,
            CharacteristicKind::Fellowship => &self.fellowship,
            CharacteristicKind::Influence => &self.influence,
        }
    }

    pub fn get_mut(&mut self, kind: CharacteristicKind) -> &mut Characteristic {
        match kind {
            CharacteristicKind::WeaponSkill => &mut self.weapon_skill,
            CharacteristicKind::BallisticSkill => &mut self.ballistic_skill,
            CharacteristicKind::Strength => &mut self.strength,
            CharacteristicKind::Toughness => &mut self.toughness,
            CharacteristicKind::Agility => &mut self.agility,
            CharacteristicKind::Intelligence => &mut self.intelligence,
            CharacteristicKind::Perception => &mut self.perception,
            CharacteristicKind::Willpower => &mut self.willpower,
            CharacteristicKind::Fellowship => &mut self.fellowship,
            CharacteristicKind::Influence => &mut self.influence,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CharacteristicKind, &Characteristic)> {
        CharacteristicKind::all()
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}

// ============================================================================
// Skills
// ============================================================================

/// Untrained skills sit at −20.
pub const UNTRAINED: i32 = -20;

/// A named focus of a parent skill (e.g. Common Lore (Imperium)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speciality {
    pub name: String,
    #[serde(default = "untrained")]
    pub advance: i32,
    #[serde(default)]
    pub starter: bool,
    #[serde(default)]
    pub cost: u32,
}

fn untrained() -> i32 {
    UNTRAINED
}

impl Speciality {
    pub fn new(name: impl Into<String>, advance: i32) -> Self {
        Self {
            name: name.into(),
            advance,
            starter: false,
            cost: 0,
        }
    }

    pub fn is_known(&self) -> bool {
        is_known(self.advance, self.starter)
    }
}

/// A skill and its specialities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub characteristic: CharacteristicKind,
    /// One of −20, 0, 10, 20, 30.
    #[serde(default = "untrained")]
    pub advance: i32,
    #[serde(default)]
    pub starter: bool,
    #[serde(default)]
    pub aptitudes: Vec<String>,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub specialities: Vec<Speciality>,
}

impl Skill {
    pub fn new(name: impl Into<String>, characteristic: CharacteristicKind) -> Self {
        Self {
            name: name.into(),
            characteristic,
            advance: UNTRAINED,
            starter: false,
            aptitudes: Vec::new(),
            cost: 0,
            specialities: Vec::new(),
        }
    }

    pub fn with_advance(mut self, advance: i32) -> Self {
        self.advance = advance;
        self
    }

    pub fn with_aptitudes(mut self, aptitudes: &[&str]) -> Self {
        self.aptitudes = aptitudes.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn starter(mut self) -> Self {
        self.starter = true;
        self
    }

    pub fn with_speciality(mut self, speciality: Speciality) -> Self {
        self.specialities.push(speciality);
        self
    }

    pub fn is_known(&self) -> bool {
        is_known(self.advance, self.starter)
    }

    pub fn speciality(&self, name: &str) -> Option<&Speciality> {
        let name = name.to_lowercase();
        self.specialities
            .iter()
            .find(|s| s.name.to_lowercase() == name)
    }
}

fn is_known(advance: i32, starter: bool) -> bool {
    advance >= 0 || (advance == UNTRAINED && starter)
}

// ============================================================================
// Health
// ============================================================================

/// Damage taken. `value` fills up to `max`; anything beyond spills into
/// `critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wounds {
    pub value: u32,
    #[serde(default)]
    pub critical: u32,
    pub max: u32,
}

impl Wounds {
    pub fn new(max: u32) -> Self {
        Self {
            value: 0,
            critical: 0,
            max,
        }
    }

    /// Split `amount` into the part absorbed by ordinary wounds and the
    /// part that becomes critical damage.
    pub fn split(&self, amount: u32) -> (u32, u32) {
        let room = self.max.saturating_sub(self.value);
        let ordinary = amount.min(room);
        (ordinary, amount - ordinary)
    }

    /// Take damage with clamp-then-spill.
    pub fn take_damage(&mut self, amount: u32) -> WoundChange {
        let (ordinary, critical) = self.split(amount);
        self.value += ordinary;
        self.critical += critical;
        WoundChange { ordinary, critical }
    }

    pub fn total(&self) -> u32 {
        self.value + self.critical
    }
}

/// How one damage application was split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WoundChange {
    pub ordinary: u32,
    pub critical: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fatigue {
    pub value: u32,
    pub max: u32,
}

impl Fatigue {
    /// Add fatigue, capped at `max`. Returns the amount actually added.
    pub fn add(&mut self, amount: u32) -> u32 {
        let before = self.value;
        self.value = (self.value + amount).min(self.max);
        self.value - before
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fate {
    pub value: u32,
    pub max: u32,
}

// ============================================================================
// Psychic powers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsykerClass {
    #[default]
    Bound,
    Unbound,
    Daemonic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsyRating {
    pub rating: u32,
    #[serde(default)]
    pub class: PsykerClass,
    /// Number of powers currently sustained.
    #[serde(default)]
    pub sustained: u32,
}

// ============================================================================
// Experience
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    /// Total experience earned.
    pub value: u32,
    /// Spend recorded outside the other buckets.
    #[serde(default)]
    pub other: u32,
    /// Manually recorded psy rating cost.
    #[serde(default)]
    pub psy_rating_cost: u32,
}

// ============================================================================
// Combatant
// ============================================================================

/// Fatigue imposes this penalty on every characteristic while present.
pub const FATIGUE_PENALTY: i32 = 10;

/// Default size (average human).
pub const AVERAGE_SIZE: u8 = 4;

/// A character, NPC or horde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    #[serde(default)]
    pub id: CombatantId,
    pub name: String,
    #[serde(default)]
    pub characteristics: Characteristics,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub wounds: Wounds,
    #[serde(default)]
    pub fatigue: Fatigue,
    #[serde(default)]
    pub fate: Fate,
    #[serde(default)]
    pub armour: ByLocation<ArmourLocation>,
    #[serde(default)]
    pub armour_items: Vec<ArmourItem>,
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub ammunition: Vec<Ammunition>,
    #[serde(default)]
    pub psychic_powers: Vec<PsychicPower>,
    #[serde(default)]
    pub psy: PsyRating,
    /// Horde magnitude; zero for an individual.
    #[serde(default)]
    pub horde: u32,
    #[serde(default = "average_size")]
    pub size: u8,
    /// Attackers never get a size modifier against this combatant.
    #[serde(default)]
    pub ignores_size_modifier: bool,
    #[serde(default)]
    pub conditions: ConditionSet,
    #[serde(default)]
    pub aptitudes: Vec<String>,
    #[serde(default)]
    pub talents: Vec<Talent>,
    #[serde(default)]
    pub experience: Experience,
    /// Shock tests to roll at the start of this combatant's next turn.
    #[serde(default)]
    pub pending_shock_tests: u32,
}

fn average_size() -> u8 {
    AVERAGE_SIZE
}

impl Combatant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CombatantId::new(),
            name: name.into(),
            characteristics: Characteristics::default(),
            skills: Vec::new(),
            wounds: Wounds::default(),
            fatigue: Fatigue::default(),
            fate: Fate::default(),
            armour: ByLocation::default(),
            armour_items: Vec::new(),
            weapons: Vec::new(),
            ammunition: Vec::new(),
            psychic_powers: Vec::new(),
            psy: PsyRating::default(),
            horde: 0,
            size: AVERAGE_SIZE,
            ignores_size_modifier: false,
            conditions: ConditionSet::new(),
            aptitudes: Vec::new(),
            talents: Vec::new(),
            experience: Experience::default(),
            pending_shock_tests: 0,
        }
    }

    pub fn with_characteristics(mut self, characteristics: Characteristics) -> Self {
        self.characteristics = characteristics;
        self
    }

    pub fn with_characteristic(mut self, kind: CharacteristicKind, base: i32) -> Self {
        self.characteristics.get_mut(kind).base = base;
        self
    }

    pub fn with_wounds(mut self, max: u32) -> Self {
        self.wounds = Wounds::new(max);
        self
    }

    pub fn with_fatigue_max(mut self, max: u32) -> Self {
        self.fatigue.max = max;
        self
    }

    pub fn with_fate(mut self, value: u32) -> Self {
        self.fate = Fate { value, max: value };
        self
    }

    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapons.push(weapon);
        self
    }

    pub fn with_ammunition(mut self, ammunition: Ammunition) -> Self {
        self.ammunition.push(ammunition);
        self
    }

    pub fn with_power(mut self, power: PsychicPower) -> Self {
        self.psychic_powers.push(power);
        self
    }

    pub fn with_armour(mut self, item: ArmourItem) -> Self {
        self.armour_items.push(item);
        self
    }

    pub fn with_psy_rating(mut self, rating: u32, class: PsykerClass) -> Self {
        self.psy.rating = rating;
        self.psy.class = class;
        self
    }

    pub fn as_horde(mut self, magnitude: u32) -> Self {
        self.horde = magnitude;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.add(condition, Severity::Minor);
        self
    }

    pub fn is_horde(&self) -> bool {
        self.horde > 0
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.conditions.has(condition)
    }

    pub fn fatigue_penalty(&self) -> i32 {
        if self.fatigue.value > 0 {
            FATIGUE_PENALTY
        } else {
            0
        }
    }

    pub fn characteristic(&self, kind: CharacteristicKind) -> CharacteristicScore {
        self.characteristics
            .get(kind)
            .score(self.fatigue_penalty())
    }

    pub fn toughness_bonus(&self) -> i32 {
        self.characteristic(CharacteristicKind::Toughness)
            .display_bonus
    }

    pub fn skill(&self, name: &str) -> Option<&Skill> {
        let name = name.to_lowercase();
        self.skills.iter().find(|s| s.name.to_lowercase() == name)
    }

    /// Skill total: characteristic display total plus advance.
    pub fn skill_total(&self, skill: &Skill) -> i32 {
        self.characteristic(skill.characteristic).display_total + skill.advance
    }

    /// Speciality total, using the parent skill's characteristic.
    pub fn speciality_total(&self, skill: &Skill, speciality: &Speciality) -> i32 {
        self.characteristic(skill.characteristic).display_total + speciality.advance
    }

    pub fn weapon(&self, name: &str) -> Option<&Weapon> {
        let name = name.to_lowercase();
        self.weapons.iter().find(|w| w.name.to_lowercase() == name)
    }

    pub fn weapon_mut(&mut self, name: &str) -> Option<&mut Weapon> {
        let name = name.to_lowercase();
        self.weapons
            .iter_mut()
            .find(|w| w.name.to_lowercase() == name)
    }

    pub fn power(&self, name: &str) -> Option<&PsychicPower> {
        let name = name.to_lowercase();
        self.psychic_powers
            .iter()
            .find(|p| p.name.to_lowercase() == name)
    }

    pub fn ammunition_mut(&mut self, name: &str) -> Option<&mut Ammunition> {
        let name = name.to_lowercase();
        self.ammunition
            .iter_mut()
            .find(|a| a.name.to_lowercase() == name)
    }

    /// Effective armour at a location: toughness bonus + armour from the
    /// currently equipped items + temporary modifier. `felling` strips that
    /// much Unnatural Toughness (never below zero).
    pub fn armour_at(&self, location: HitLocation, felling: u32) -> i32 {
        let toughness = self.characteristic(CharacteristicKind::Toughness);
        let stripped = (felling as i32).min(toughness.unnatural.max(0));
        self.armour.get(location).total(
            toughness.display_bonus - stripped,
            worn_armour(&self.armour_items, location),
        )
    }
}
