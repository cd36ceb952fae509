//! Percentile test resolution.
//!
//! A test succeeds when the d100 result is at or under the final target.
//! Degrees count whole tens of margin plus one. Ranged weapons may jam or
//! overheat off the same die, and psychic tests may trigger phenomena on
//! doubles.

use crate::character::{PsyRating, PsykerClass};
use crate::dice::{roll_d100, DiceSource};
use crate::weapon_traits::WeaponTraits;
use serde::{Deserialize, Serialize};

/// Result of one resolved test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub roll: u32,
    pub target: i32,
    pub success: bool,
    /// Degrees of success, bonus degrees included. Zero on failure.
    pub dos: u32,
    /// Degrees of failure. Zero on success.
    pub dof: u32,
    /// Degrees added on top of the rolled margin.
    pub bonus_dos: u32,
    pub doubles: bool,
    /// Failed without rolling.
    #[serde(default)]
    pub automatic: bool,
}

/// Degrees of success and failure for a result against a target.
pub fn degrees(target: i32, roll: u32) -> (u32, u32) {
    let roll = roll as i32;
    if roll <= target {
        (1 + ((target - roll) / 10) as u32, 0)
    } else {
        (0, 1 + ((roll - target) / 10) as u32)
    }
}

/// `11, 22, … 99` and `100`.
pub fn is_double(roll: u32) -> bool {
    roll == 100 || (roll % 10 == (roll / 10) % 10)
}

/// Score a roll. On success, `bonus_dos` is added to the degrees.
pub fn evaluate(target: i32, roll: u32, bonus_dos: u32) -> TestOutcome {
    let (dos, dof) = degrees(target, roll);
    let success = dos > 0;
    let bonus_dos = if success { bonus_dos } else { 0 };
    TestOutcome {
        roll,
        target,
        success,
        dos: dos + bonus_dos,
        dof,
        bonus_dos,
        doubles: is_double(roll),
        automatic: false,
    }
}

/// Roll d100 against `target`.
pub fn roll_test(target: i32, bonus_dos: u32, dice: &mut dyn DiceSource) -> TestOutcome {
    let roll = roll_d100(dice);
    let outcome = evaluate(target, roll, bonus_dos);
    tracing::debug!(target, roll, dos = outcome.dos, dof = outcome.dof, "test rolled");
    outcome
}

/// A failure that happened without a roll, reported as a result of 100.
pub fn automatic_failure(target: i32) -> TestOutcome {
    let (_, dof) = degrees(target, 100);
    TestOutcome {
        roll: 100,
        target,
        success: false,
        dos: 0,
        dof,
        bonus_dos: 0,
        doubles: false,
        automatic: true,
    }
}

/// Extra degrees a successful test gains from Unnatural characteristics.
pub fn unnatural_bonus(unnatural: i32) -> u32 {
    (unnatural.max(0) / 2) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Malfunction {
    Jammed,
    Overheated,
}

/// Jam or overheat check for a ranged weapon, on the raw test die.
pub fn malfunction(roll: u32, traits: &WeaponTraits) -> Option<Malfunction> {
    if traits.overheats {
        return (roll >= 91).then_some(Malfunction::Overheated);
    }
    let jams = if traits.reliable {
        roll == 100
    } else if traits.unreliable {
        roll >= 91
    } else {
        roll >= 96
    };
    jams.then_some(Malfunction::Jammed)
}

// ============================================================================
// Psychic tests
// ============================================================================

/// How hard a psyker draws on the warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsychicMode {
    Fettered,
    #[default]
    Unfettered,
    /// Pushed beyond the rating by this many points.
    Pushed(u32),
}

impl PsychicMode {
    pub fn push(&self) -> u32 {
        match self {
            PsychicMode::Pushed(n) => *n,
            _ => 0,
        }
    }

    pub fn is_pushed(&self) -> bool {
        self.push() > 0
    }
}

/// Largest push a psyker of `class` can make.
pub fn max_push(class: PsykerClass) -> u32 {
    match class {
        PsykerClass::Bound => 2,
        PsykerClass::Unbound => 4,
        PsykerClass::Daemonic => 3,
    }
}

/// Psy rating in use for a manifestation, with the push clamped to what the
/// class allows. Returns `(effective rating, push)`.
pub fn effective_psy_rating(psy: &PsyRating, mode: PsychicMode) -> (u32, u32) {
    match mode {
        PsychicMode::Fettered => (psy.rating.div_ceil(2), 0),
        PsychicMode::Unfettered => (psy.rating, 0),
        PsychicMode::Pushed(push) => {
            let push = push.min(max_push(psy.class));
            (psy.rating + push, push)
        }
    }
}

/// Focus Power modifier from the rating in use and sustained powers.
pub fn psychic_modifier(effective_rating: u32, sustained: u32) -> i32 {
    5 * effective_rating as i32 - 10 * sustained.saturating_sub(1) as i32
}

/// Whether a psychic test result calls up phenomena, and whether an
/// Unbound psyker is overloaded.
pub fn phenomena_triggered(class: PsykerClass, mode: PsychicMode, doubles: bool) -> (bool, bool) {
    if class == PsykerClass::Bound && !mode.is_pushed() {
        return (false, false);
    }
    (doubles, doubles && class == PsykerClass::Unbound)
}

/// Phenomena rolled for one manifestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsychicPhenomena {
    pub roll: u32,
    pub perils: Option<u32>,
    pub overload: bool,
}

/// Above this, phenomena escalate to Perils of the Warp.
pub const PERILS_THRESHOLD: u32 = 75;

/// Roll phenomena, and Perils of the Warp when the phenomena roll is high
/// enough.
pub fn roll_phenomena(push: u32, overload: bool, dice: &mut dyn DiceSource) -> PsychicPhenomena {
    let roll = roll_d100(dice) + 10 * push;
    let perils = (roll > PERILS_THRESHOLD).then(|| roll_d100(dice));
    tracing::debug!(roll, ?perils, "psychic phenomena");
    PsychicPhenomena {
        roll,
        perils,
        overload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;

    #[test]
    fn test_success_degrees() {
        let outcome = evaluate(40, 35, 0);
        assert!(outcome.success);
        assert_eq!(outcome.dos, 1);
        assert_eq!(outcome.dof, 0);

        assert_eq!(degrees(40, 40), (1, 0));
        assert_eq!(degrees(40, 10), (4, 0));
        assert_eq!(degrees(40, 1), (4, 0));
    }

    #[test]
    fn test_failure_degrees() {
        assert_eq!(degrees(40, 41), (0, 1));
        assert_eq!(degrees(40, 50), (0, 2));
        assert_eq!(degrees(-10, 1), (0, 2));
        assert_eq!(degrees(0, 100), (0, 11));
    }

    #[test]
    fn test_degrees_over_range() {
        for target in -20..=120 {
            for roll in 1..=100u32 {
                let (dos, dof) = degrees(target, roll);
                if roll as i32 <= target {
                    assert!(dos >= 1);
                    assert_eq!(dof, 0);
                } else {
                    assert!(dof >= 1);
                    assert_eq!(dos, 0);
                }
            }
        }
    }

    #[test]
    fn test_bonus_only_on_success() {
        let outcome = evaluate(50, 20, 2);
        assert_eq!(outcome.dos, 6);
        assert_eq!(outcome.bonus_dos, 2);

        let outcome = evaluate(50, 80, 2);
        assert_eq!(outcome.dos, 0);
        assert_eq!(outcome.bonus_dos, 0);
    }

    #[test]
    fn test_unnatural_bonus_halves() {
        assert_eq!(unnatural_bonus(0), 0);
        assert_eq!(unnatural_bonus(3), 1);
        assert_eq!(unnatural_bonus(4), 2);
        assert_eq!(unnatural_bonus(-2), 0);
    }

    #[test]
    fn test_doubles() {
        assert!(is_double(11));
        assert!(is_double(99));
        assert!(is_double(100));
        assert!(!is_double(12));
        assert!(!is_double(5));
    }

    #[test]
    fn test_jam_thresholds() {
        let plain = WeaponTraits::default();
        assert_eq!(malfunction(95, &plain), None);
        assert_eq!(malfunction(96, &plain), Some(Malfunction::Jammed));

        let reliable = WeaponTraits {
            reliable: true,
            ..WeaponTraits::default()
        };
        assert_eq!(malfunction(99, &reliable), None);
        assert_eq!(malfunction(100, &reliable), Some(Malfunction::Jammed));

        let unreliable = WeaponTraits {
            unreliable: true,
            ..WeaponTraits::default()
        };
        assert_eq!(malfunction(91, &unreliable), Some(Malfunction::Jammed));

        let hot = WeaponTraits {
            overheats: true,
            reliable: true,
            ..WeaponTraits::default()
        };
        assert_eq!(malfunction(91, &hot), Some(Malfunction::Overheated));
        assert_eq!(malfunction(90, &hot), None);
    }

    #[test]
    fn test_automatic_failure_reports_100() {
        let outcome = automatic_failure(45);
        assert_eq!(outcome.roll, 100);
        assert!(!outcome.success);
        assert!(outcome.automatic);
        assert_eq!(outcome.dof, 6);
    }

    #[test]
    fn test_effective_rating() {
        let psy = PsyRating {
            rating: 3,
            class: PsykerClass::Bound,
            sustained: 0,
        };
        assert_eq!(effective_psy_rating(&psy, PsychicMode::Fettered), (2, 0));
        assert_eq!(effective_psy_rating(&psy, PsychicMode::Unfettered), (3, 0));
        assert_eq!(effective_psy_rating(&psy, PsychicMode::Pushed(5)), (5, 2));
    }

    #[test]
    fn test_psychic_modifier() {
        assert_eq!(psychic_modifier(3, 0), 15);
        assert_eq!(psychic_modifier(3, 1), 15);
        assert_eq!(psychic_modifier(3, 3), -5);
    }

    #[test]
    fn test_bound_unpushed_never_phenomena() {
        assert_eq!(
            phenomena_triggered(PsykerClass::Bound, PsychicMode::Unfettered, true),
            (false, false)
        );
        assert_eq!(
            phenomena_triggered(PsykerClass::Bound, PsychicMode::Pushed(1), true),
            (true, false)
        );
        assert_eq!(
            phenomena_triggered(PsykerClass::Unbound, PsychicMode::Fettered, true),
            (true, true)
        );
        assert_eq!(
            phenomena_triggered(PsykerClass::Daemonic, PsychicMode::Unfettered, false),
            (false, false)
        );
    }

    #[test]
    fn test_perils_on_high_phenomena() {
        let mut dice = ScriptedDice::new([60, 42]);
        let phenomena = roll_phenomena(2, false, &mut dice);
        assert_eq!(phenomena.roll, 80);
        assert_eq!(phenomena.perils, Some(42));

        let mut dice = ScriptedDice::new([75]);
        let phenomena = roll_phenomena(0, true, &mut dice);
        assert_eq!(phenomena.perils, None);
        assert!(phenomena.overload);
    }
}
