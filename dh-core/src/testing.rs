//! Testing utilities for the rules engine.
//!
//! This module provides tools for integration testing:
//! - Sample combatants with known profiles
//! - `TestHarness` for scripted encounters with predetermined dice
//! - Assertion helpers for verifying combatant state

use crate::character::{
    CharacteristicKind, Characteristics, Combatant, CombatantId, PsykerClass, Skill,
};
use crate::context::Notice;
use crate::encounter::Encounter;
use crate::items::{get_weapon, Ammunition, PsychicPower};
use crate::location::{ArmourItem, ByLocation};
use crate::rules::{apply_effects, Intent, Resolution, RulesEngine};

pub use crate::dice::ScriptedDice;

// ============================================================================
// Sample combatants
// ============================================================================

/// Guardsman: 40 everywhere, 12 wounds, flak (2 AP), lasgun with two spare
/// charge packs and a knife.
pub fn sample_guardsman(name: &str) -> Combatant {
    let mut guard = Combatant::new(name)
        .with_characteristics(Characteristics::uniform(40))
        .with_wounds(12)
        .with_fatigue_max(4)
        .with_fate(2)
        .with_armour(ArmourItem::new("Flak Armour", ByLocation::uniform(2)))
        .with_skill(Skill::new("Dodge", CharacteristicKind::Agility).with_advance(0))
        .with_ammunition(Ammunition::new("Lasgun Charge Pack", 2));
    for weapon in ["Lasgun", "Knife"] {
        if let Some(weapon) = get_weapon(weapon) {
            guard = guard.with_weapon(weapon);
        }
    }
    guard
}

/// Bound psyker with psy rating 3 and Smite.
pub fn sample_psyker(name: &str) -> Combatant {
    let mut psyker = Combatant::new(name)
        .with_characteristics(Characteristics::uniform(35))
        .with_characteristic(CharacteristicKind::Willpower, 45)
        .with_wounds(10)
        .with_fatigue_max(4)
        .with_fate(1)
        .with_psy_rating(3, PsykerClass::Bound)
        .with_skill(Skill::new("Psyniscience", CharacteristicKind::Perception).with_advance(0));
    let smite = PsychicPower::new("Smite", CharacteristicKind::Willpower)
        .with_damage("1d10+PR", "0")
        .with_cost(100);
    psyker.with_power(smite)
}

/// Horde of cultists: unarmoured, 30 everywhere, autopistols.
pub fn sample_horde(name: &str, magnitude: u32) -> Combatant {
    let mut horde = Combatant::new(name)
        .with_characteristics(Characteristics::uniform(30))
        .as_horde(magnitude);
    if let Some(autopistol) = get_weapon("Autopistol") {
        horde = horde.with_weapon(autopistol);
    }
    horde
}

// ============================================================================
// Harness
// ============================================================================

/// An encounter plus a rules engine and a dice script.
pub struct TestHarness {
    pub engine: RulesEngine,
    pub encounter: Encounter,
    pub dice: ScriptedDice,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_engine(RulesEngine::new())
    }

    pub fn with_engine(engine: RulesEngine) -> Self {
        Self {
            engine,
            encounter: Encounter::new("Test Encounter"),
            dice: ScriptedDice::default(),
        }
    }

    /// Add a combatant and return its id.
    pub fn add(&mut self, combatant: Combatant) -> CombatantId {
        self.encounter.add(combatant)
    }

    /// Queue dice faces for the next resolutions.
    pub fn script(&mut self, faces: impl IntoIterator<Item = u32>) -> &mut Self {
        self.dice.push(faces);
        self
    }

    /// Resolve an intent without applying it.
    pub fn resolve(&mut self, intent: Intent) -> Resolution {
        self.engine.resolve(&self.encounter, intent, &mut self.dice)
    }

    /// Resolve an intent and apply its effects.
    pub fn act(&mut self, intent: Intent) -> Resolution {
        let resolution = self.resolve(intent);
        apply_effects(&mut self.encounter, &resolution.effects);
        resolution
    }

    pub fn combatant(&self, id: CombatantId) -> &Combatant {
        self.encounter
            .get(id)
            .unwrap_or_else(|| panic!("no combatant {id} in harness"))
    }

    /// Wounds as (value, critical).
    pub fn wounds(&self, id: CombatantId) -> (u32, u32) {
        let wounds = self.combatant(id).wounds;
        (wounds.value, wounds.critical)
    }

    pub fn magnitude(&self, id: CombatantId) -> u32 {
        self.combatant(id).horde
    }

    /// Loaded rounds of a weapon.
    pub fn loaded(&self, id: CombatantId, weapon: &str) -> u32 {
        self.combatant(id)
            .weapon(weapon)
            .map(|w| w.clip.value)
            .unwrap_or_else(|| panic!("no weapon {weapon}"))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert wounds are at (value, critical).
#[track_caller]
pub fn assert_wounds(harness: &TestHarness, id: CombatantId, value: u32, critical: u32) {
    let actual = harness.wounds(id);
    assert_eq!(
        actual,
        (value, critical),
        "Expected wounds {value} (+{critical} critical), got {} (+{} critical)",
        actual.0,
        actual.1
    );
}

#[track_caller]
pub fn assert_magnitude(harness: &TestHarness, id: CombatantId, magnitude: u32) {
    let actual = harness.magnitude(id);
    assert_eq!(actual, magnitude, "Expected magnitude {magnitude}, got {actual}");
}

#[track_caller]
pub fn assert_notice(resolution: &Resolution, notice: &Notice) {
    assert!(
        resolution.has_notice(notice),
        "Expected notice {notice:?}, got {:?}",
        resolution.all_notices().collect::<Vec<_>>()
    );
}
