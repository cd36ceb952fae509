//! Applying damage to individuals and hordes.
//!
//! These functions only compute what an attack does to its target. The
//! resulting deltas are committed later as effects.

use crate::character::{Combatant, WoundChange};
use crate::damage::HitDamage;
use crate::location::HitLocation;
use crate::weapon_traits::WeaponTraits;
use serde::{Deserialize, Serialize};

/// Damage left after armour: `max(damage − max(armour − pen, 0), 0)`.
pub fn net_damage(damage: i32, armour: i32, penetration: i32) -> u32 {
    let soak = (armour - penetration).max(0);
    (damage - soak).max(0) as u32
}

/// One hit after armour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedHit {
    pub index: usize,
    pub location: HitLocation,
    pub armour: i32,
    pub damage: i32,
    pub penetration: i32,
    /// Damage through armour, before the Righteous Fury floor.
    pub net: u32,
    /// Wounds inflicted by this hit (individuals only).
    pub wounds: u32,
}

/// What an attack does to its target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    pub hits: Vec<AppliedHit>,
    /// Wounds split into ordinary and critical, for individuals.
    pub wounds: WoundChange,
    /// Magnitude removed from a horde.
    pub kills: u32,
    /// Horde magnitude after the attack.
    pub horde_remaining: Option<u32>,
    /// The target owes a Shock test.
    pub shock: bool,
}

impl DamageReport {
    pub fn total_wounds(&self) -> u32 {
        self.wounds.ordinary + self.wounds.critical
    }

    pub fn horde_broken(&self) -> bool {
        self.horde_remaining == Some(0)
    }
}

/// Resolve hits against a target, choosing the individual or horde rules.
pub fn resolve_hits(
    target: &Combatant,
    hits: &[HitDamage],
    traits: &WeaponTraits,
    melee: bool,
) -> DamageReport {
    if target.is_horde() {
        against_horde(target, hits, traits, melee)
    } else {
        against_individual(target, hits, traits)
    }
}

fn armour_pass(target: &Combatant, hits: &[HitDamage], traits: &WeaponTraits) -> Vec<AppliedHit> {
    let felling = traits.felling.unwrap_or(0);
    hits.iter()
        .map(|hit| {
            let armour = target.armour_at(hit.location, felling);
            AppliedHit {
                index: hit.index,
                location: hit.location,
                armour,
                damage: hit.total,
                penetration: hit.penetration,
                net: net_damage(hit.total, armour, hit.penetration),
                wounds: 0,
            }
        })
        .collect()
}

/// Wounds with clamp-then-spill. A Righteous Fury hit always inflicts at
/// least one wound.
pub fn against_individual(
    target: &Combatant,
    hits: &[HitDamage],
    traits: &WeaponTraits,
) -> DamageReport {
    let mut applied = armour_pass(target, hits, traits);
    let mut wounds = target.wounds;
    let mut change = WoundChange::default();

    for (hit, damage) in applied.iter_mut().zip(hits) {
        hit.wounds = if hit.net == 0 && damage.righteous_fury.is_some() {
            1
        } else {
            hit.net
        };
        let step = wounds.take_damage(hit.wounds);
        change.ordinary += step.ordinary;
        change.critical += step.critical;
    }

    let any_fury = hits.iter().any(|h| h.righteous_fury.is_some());
    let shock = traits.shocking && (change.ordinary + change.critical > 0 || any_fury);
    tracing::debug!(
        target = %target.name,
        ordinary = change.ordinary,
        critical = change.critical,
        "damage against individual"
    );

    DamageReport {
        hits: applied,
        wounds: change,
        kills: 0,
        horde_remaining: None,
        shock,
    }
}

/// Horde magnitude loss.
///
/// Each hit that gets through armour removes one; Force doubles melee kills;
/// Devastating(N) adds N per landed hit. Hordes never take critical
/// wounds and never fall below zero.
pub fn against_horde(
    target: &Combatant,
    hits: &[HitDamage],
    traits: &WeaponTraits,
    melee: bool,
) -> DamageReport {
    let applied = armour_pass(target, hits, traits);
    let penetrating = applied.iter().filter(|h| h.net > 0).count() as u32;

    let mut kills = penetrating;
    if melee && traits.force && kills > 0 {
        kills *= 2;
    }
    kills += hits.len() as u32 * traits.devastating.unwrap_or(0);

    let kills = kills.min(target.horde);
    let remaining = target.horde - kills;
    tracing::debug!(target = %target.name, kills, remaining, "damage against horde");

    DamageReport {
        hits: applied,
        wounds: WoundChange::default(),
        kills,
        horde_remaining: Some(remaining),
        shock: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacteristicKind;
    use crate::dice::DiceRoll;
    use crate::items::DamageType;

    fn hit(index: usize, total: i32, penetration: i32) -> HitDamage {
        HitDamage {
            index,
            location: HitLocation::Body,
            damage_type: DamageType::Impact,
            roll: DiceRoll {
                formula: String::new(),
                total,
                dice: Vec::new(),
            },
            accurate: None,
            horde: None,
            flat_bonus: 0,
            minimum_adjustment: 0,
            total,
            penetration,
            righteous_fury: None,
        }
    }

    fn soldier() -> Combatant {
        // TB 3, no armour
        Combatant::new("Soldier")
            .with_characteristic(CharacteristicKind::Toughness, 30)
            .with_wounds(10)
    }

    #[test]
    fn test_net_damage() {
        assert_eq!(net_damage(12, 7, 0), 5);
        assert_eq!(net_damage(12, 7, 4), 9);
        assert_eq!(net_damage(12, 3, 8), 12);
        assert_eq!(net_damage(2, 7, 0), 0);
    }

    #[test]
    fn test_wounds_fill_then_spill() {
        let mut target = soldier();
        target.wounds.value = 10;
        let report = against_individual(&target, &[hit(0, 6, 0)], &WeaponTraits::default());
        assert_eq!(report.wounds, WoundChange { ordinary: 0, critical: 3 });
    }

    #[test]
    fn test_sum_of_net_damage() {
        let target = soldier();
        let hits = [hit(0, 5, 0), hit(1, 4, 0), hit(2, 2, 0)];
        let report = against_individual(&target, &hits, &WeaponTraits::default());
        let expected: u32 = report.hits.iter().map(|h| h.net).sum();
        assert_eq!(expected, 2 + 1);
        assert_eq!(report.total_wounds(), expected);
        assert_eq!(report.wounds.critical, 0);
    }

    #[test]
    fn test_righteous_fury_minimum_wound() {
        let target = soldier();
        let mut fury = hit(0, 2, 0);
        fury.righteous_fury = Some(3);
        let report = against_individual(&target, &[fury], &WeaponTraits::default());
        assert_eq!(report.hits[0].net, 0);
        assert_eq!(report.total_wounds(), 1);
    }

    #[test]
    fn test_shocking_queues_test() {
        let target = soldier();
        let shocking = WeaponTraits {
            shocking: true,
            ..WeaponTraits::default()
        };
        assert!(against_individual(&target, &[hit(0, 8, 0)], &shocking).shock);
        assert!(!against_individual(&target, &[hit(0, 1, 0)], &shocking).shock);
        assert!(!against_individual(&target, &[hit(0, 8, 0)], &WeaponTraits::default()).shock);
    }

    #[test]
    fn test_horde_force_melee_doubles() {
        let horde = soldier().as_horde(60);
        let force = WeaponTraits {
            force: true,
            ..WeaponTraits::default()
        };
        let hits = [hit(0, 9, 0), hit(1, 7, 0)];
        let report = against_horde(&horde, &hits, &force, true);
        assert_eq!(report.kills, 4);
        assert_eq!(report.horde_remaining, Some(56));

        let report = against_horde(&horde, &hits, &force, false);
        assert_eq!(report.kills, 2);
    }

    #[test]
    fn test_horde_devastating() {
        let horde = soldier().as_horde(20);
        let devastating = WeaponTraits {
            devastating: Some(2),
            ..WeaponTraits::default()
        };
        let hits = [hit(0, 9, 0), hit(1, 1, 0), hit(2, 8, 0)];
        let report = against_horde(&horde, &hits, &devastating, false);
        assert_eq!(report.kills, 2 + 3 * 2);

        // Soaked hits still count
        let report = against_horde(&horde, &[hit(0, 2, 0)], &devastating, false);
        assert_eq!(report.kills, 2);
        assert_eq!(report.horde_remaining, Some(18));
    }

    #[test]
    fn test_horde_floors_at_zero() {
        let horde = soldier().as_horde(3);
        let hits = [hit(0, 9, 0), hit(1, 9, 0), hit(2, 9, 0), hit(3, 9, 0)];
        let report = resolve_hits(&horde, &hits, &WeaponTraits::default(), false);
        assert_eq!(report.kills, 3);
        assert!(report.horde_broken());
        assert_eq!(report.total_wounds(), 0);
    }
}
