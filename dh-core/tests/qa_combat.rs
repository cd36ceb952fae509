//! QA tests for attack resolution through the rules engine.
//!
//! Every test scripts its dice, so outcomes are exact.
//!
//! Run with: `cargo test -p dh-core --test qa_combat`

use dh_core::character::{CharacteristicKind, Characteristics, Combatant};
use dh_core::check::Malfunction;
use dh_core::conditions::Condition;
use dh_core::items::{get_weapon, Weapon, WeaponClass};
use dh_core::location::HitLocation;
use dh_core::rules::{Effect, EvasionKind};
use dh_core::target::{Aim, ModifierSource, RangeBand};
use dh_core::testing::{
    assert_magnitude, assert_notice, assert_wounds, sample_guardsman, sample_horde,
    sample_psyker, TestHarness,
};
use dh_core::{
    AttackOptions, AttackType, EngineConfig, Intent, Notice, PsychicMode, RulesEngine,
};

fn combatant(name: &str, base: i32, wounds: u32) -> Combatant {
    Combatant::new(name)
        .with_characteristics(Characteristics::uniform(base))
        .with_wounds(wounds)
        .with_fatigue_max(3)
}

fn attack(
    harness: &TestHarness,
    attacker: &str,
    target: &str,
    weapon: &str,
    attack_type: AttackType,
    options: AttackOptions,
) -> Intent {
    let find = |name: &str| {
        harness
            .encounter
            .find_by_name(name)
            .map(|c| c.id)
            .unwrap_or_else(|| panic!("no combatant {name}"))
    };
    Intent::Attack {
        attacker_id: find(attacker),
        target_id: find(target),
        weapon_name: weapon.to_string(),
        attack_type,
        options,
    }
}

// =============================================================================
// TARGET AND TEST
// =============================================================================

#[test]
fn test_aimed_long_range_shot_one_degree() {
    let mut harness = TestHarness::new();
    let laspistol = get_weapon("Laspistol").expect("laspistol");
    harness.add(combatant("Shooter", 30, 10).with_weapon(laspistol));
    let target = harness.add(combatant("Target", 30, 10));

    // 30 + 10 standard + 10 aim − 10 long range = 40; roll 35
    harness.script([35, 4]);
    let options = AttackOptions {
        aim: Aim::Half,
        range: RangeBand::Long,
        ..AttackOptions::default()
    };
    let intent = attack(&harness, "Shooter", "Target", "Laspistol", AttackType::Standard, options);
    let resolution = harness.act(intent);

    let ctx = resolution.context.as_ref().expect("attack context");
    assert_eq!(ctx.base_target, 30);
    assert_eq!(ctx.final_target, 40);
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Aim), 10);
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Range), -10);
    assert!(ctx.succeeded());
    assert_eq!(ctx.dos(), 1);
    assert_eq!(ctx.hits(), 1);

    // 4 + 2 damage against TB 3
    assert_wounds(&harness, target, 3, 0);
}

#[test]
fn test_stunned_target_is_easier_to_hit() {
    let mut harness = TestHarness::new();
    harness.add(combatant("Shooter", 30, 10).with_weapon(get_weapon("Autogun").expect("autogun")));
    harness.add(combatant("Target", 30, 10).with_condition(Condition::Stunned));

    harness.script([99]);
    let intent = attack(&harness, "Shooter", "Target", "Autogun", AttackType::Standard, AttackOptions::default());
    let resolution = harness.resolve(intent);

    let ctx = resolution.context.expect("attack context");
    assert_eq!(ctx.modifiers.from_source(ModifierSource::TargetCondition), 20);
    assert_eq!(ctx.final_target, 30 + 10 + 20);
}

#[test]
fn test_modifiers_clamp_at_sixty() {
    let mut harness = TestHarness::new();
    let shooter = harness.add(combatant("Shooter", 30, 10).with_weapon(get_weapon("Autogun").expect("autogun")));
    harness.add(combatant("Target", 30, 10).with_condition(Condition::Stunned));

    // +10 standard, +20 aim, +30 point blank, +20 stunned, +40 situational
    harness.script([50]);
    let options = AttackOptions {
        aim: Aim::Full,
        range: RangeBand::PointBlank,
        situational: 40,
        ..AttackOptions::default()
    };
    let intent = attack(&harness, "Shooter", "Target", "Autogun", AttackType::Standard, options);
    let ctx = harness.resolve(intent).context.expect("attack context");
    assert_eq!(ctx.modifiers.sum(), 120);
    assert_eq!(ctx.final_target, 90);
    assert_eq!(ctx.actor, shooter);
}

// =============================================================================
// RATE OF FIRE
// =============================================================================

fn carbine() -> Weapon {
    Weapon::new("Carbine", WeaponClass::Basic, "1d10")
        .with_rate_of_fire(1, 4, 0)
        .with_clip(20)
}

#[test]
fn test_semi_auto_three_hits() {
    let mut harness = TestHarness::new();
    let shooter = harness.add(combatant("Shooter", 60, 10).with_weapon(carbine()));
    let target = harness.add(combatant("Target", 30, 30));

    // 60 vs 20: 5 DoS → 1 + (5 − 1) / 2 = 3 hits, under the burst of 4
    harness.script([20, 5, 6, 7]);
    let intent = attack(&harness, "Shooter", "Target", "Carbine", AttackType::SemiAuto, AttackOptions::default());
    let resolution = harness.act(intent);

    let ctx = resolution.context.as_ref().expect("attack context");
    assert_eq!(ctx.dos(), 5);
    assert_eq!(ctx.hits(), 3);
    assert_eq!(harness.loaded(shooter, "Carbine"), 16);
    assert_wounds(&harness, target, (5 - 3) + (6 - 3) + (7 - 3), 0);
}

#[test]
fn test_evasion_removes_hits() {
    let mut harness = TestHarness::new();
    harness.add(combatant("Shooter", 60, 10).with_weapon(carbine()));
    harness.add(combatant("Target", 30, 30));

    harness.script([20, 5, 6, 7]);
    let options = AttackOptions {
        evasion_dos: 2,
        ..AttackOptions::default()
    };
    let intent = attack(&harness, "Shooter", "Target", "Carbine", AttackType::SemiAuto, options);
    let resolution = harness.resolve(intent);
    assert_eq!(resolution.context.as_ref().map(|c| c.hits()), Some(1));
}

#[test]
fn test_dodge_then_attack() {
    let mut harness = TestHarness::new();
    harness.add(combatant("Shooter", 60, 10).with_weapon(carbine()));
    let guard = harness.add(sample_guardsman("Guard"));

    // Dodge: Agility 40 + 0 advance, roll 18 → 3 DoS
    harness.script([18]);
    let dodge = harness.resolve(Intent::Evade {
        character_id: guard,
        kind: EvasionKind::Dodge,
        weapon_name: None,
        attacker_weapon_traits: None,
        difficulty: Default::default(),
        situational: 0,
    });
    let evasion_dos = dodge.context.as_ref().map_or(0, |c| c.dos());
    assert_eq!(evasion_dos, 3);

    harness.script([20]);
    let options = AttackOptions {
        evasion_dos,
        ..AttackOptions::default()
    };
    let intent = attack(&harness, "Shooter", "Guard", "Carbine", AttackType::SemiAuto, options);
    let resolution = harness.act(intent);
    assert_eq!(resolution.context.as_ref().map(|c| c.hits()), Some(0));
    assert_wounds(&harness, guard, 0, 0);
    assert!(resolution
        .effects
        .iter()
        .all(|e| matches!(e, Effect::AmmunitionSpent { rounds: 4, .. })));
}

#[test]
fn test_out_of_ammunition() {
    let mut harness = TestHarness::new();
    let mut weapon = carbine();
    weapon.clip.value = 3;
    let shooter = harness.add(combatant("Shooter", 60, 10).with_weapon(weapon));
    harness.add(combatant("Target", 30, 30));

    let intent = attack(&harness, "Shooter", "Target", "Carbine", AttackType::SemiAuto, AttackOptions::default());
    let resolution = harness.act(intent);
    assert_notice(&resolution, &Notice::NotEnoughAmmunition { needed: 4, loaded: 3 });
    assert!(resolution.context.as_ref().is_some_and(|c| c.outcome.is_none()));
    assert_eq!(harness.loaded(shooter, "Carbine"), 3);
}

// =============================================================================
// HIT LOCATION
// =============================================================================

#[test]
fn test_called_shot_hits_chosen_location() {
    let mut harness = TestHarness::new();
    harness.add(combatant("Shooter", 60, 10).with_weapon(carbine()));
    let target = harness.add(combatant("Target", 30, 20));

    // 60 − 20 called vs 36: 1 DoS; the roll alone would hit the body
    harness.script([36, 8]);
    let options = AttackOptions {
        called_location: Some(HitLocation::Head),
        ..AttackOptions::default()
    };
    let intent = attack(&harness, "Shooter", "Target", "Carbine", AttackType::CalledShot, options);
    let resolution = harness.act(intent);

    let ctx = resolution.context.as_ref().expect("attack context");
    assert_eq!(ctx.final_target, 40);
    assert_eq!(ctx.hits(), 1);
    let details = ctx.attack.as_ref().expect("attack details");
    assert_eq!(details.called_location, Some(HitLocation::Head));
    assert_eq!(details.damage[0].location, HitLocation::Head);
    assert_wounds(&harness, target, 8 - 3, 0);
}

#[test]
fn test_standard_attack_ignores_called_location() {
    let mut harness = TestHarness::new();
    harness.add(combatant("Shooter", 60, 10).with_weapon(carbine()));
    harness.add(combatant("Target", 30, 20));

    // 36 reverses to 63
    harness.script([36, 8]);
    let options = AttackOptions {
        called_location: Some(HitLocation::Head),
        ..AttackOptions::default()
    };
    let intent = attack(&harness, "Shooter", "Target", "Carbine", AttackType::Standard, options);
    let resolution = harness.act(intent);

    let details = resolution
        .context
        .as_ref()
        .and_then(|c| c.attack.as_ref())
        .expect("attack details");
    assert_eq!(details.called_location, None);
    assert_eq!(details.damage[0].location, HitLocation::Body);
}

// =============================================================================
// WEAPON TRAITS
// =============================================================================

#[test]
fn test_accurate_aimed_shot_adds_die() {
    let mut harness = TestHarness::new();
    let needle = Weapon::new("Needle Pistol", WeaponClass::Pistol, "1d10")
        .with_traits("Accurate")
        .with_clip(6);
    let shooter = harness.add(combatant("Shooter", 40, 10).with_weapon(needle));
    let target = harness.add(combatant("Target", 30, 20));

    // 40 + 10 standard + 10 aim + 10 accurate = 70 vs 36: 4 DoS → one extra d10
    harness.script([36, 6, 7]);
    let options = AttackOptions {
        aim: Aim::Half,
        ..AttackOptions::default()
    };
    let intent = attack(&harness, "Shooter", "Target", "Needle Pistol", AttackType::Standard, options);
    let resolution = harness.act(intent);

    let ctx = resolution.context.as_ref().expect("attack context");
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Weapon), 10);
    assert_eq!(ctx.dos(), 4);
    let details = ctx.attack.as_ref().expect("attack details");
    assert_eq!(details.damage[0].accurate.as_ref().map(|r| r.total), Some(7));
    assert_eq!(details.damage[0].total, 6 + 7);
    assert_eq!(harness.loaded(shooter, "Needle Pistol"), 5);
    assert_wounds(&harness, target, 6 + 7 - 3, 0);
}

#[test]
fn test_accurate_without_aim_rolls_no_extra_die() {
    let mut harness = TestHarness::new();
    let needle = Weapon::new("Needle Pistol", WeaponClass::Pistol, "1d10")
        .with_traits("Accurate")
        .with_clip(6);
    harness.add(combatant("Shooter", 50, 10).with_weapon(needle));
    let target = harness.add(combatant("Target", 30, 20));

    // 60 vs 26: 4 DoS, but only the formula die is rolled
    harness.script([26, 6]);
    let intent = attack(&harness, "Shooter", "Target", "Needle Pistol", AttackType::Standard, AttackOptions::default());
    let resolution = harness.act(intent);

    let ctx = resolution.context.as_ref().expect("attack context");
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Weapon), 0);
    let details = ctx.attack.as_ref().expect("attack details");
    assert!(details.damage[0].accurate.is_none());
    assert_wounds(&harness, target, 6 - 3, 0);
}

#[test]
fn test_storm_doubles_hits_and_ammunition() {
    let mut harness = TestHarness::new();
    let shooter = harness.add(combatant("Shooter", 60, 10).with_weapon(carbine().with_traits("Storm")));
    let target = harness.add(combatant("Target", 30, 40));

    // 60 vs 20: 5 DoS → 2 × (1 + 4 / 2) = 6 hits, 2 × 4 rounds
    harness.script([20, 5, 6, 7, 8, 9, 5]);
    let intent = attack(&harness, "Shooter", "Target", "Carbine", AttackType::SemiAuto, AttackOptions::default());
    let resolution = harness.act(intent);

    let ctx = resolution.context.as_ref().expect("attack context");
    assert_eq!(ctx.hits(), 6);
    assert!(resolution.effects.iter().any(|e| matches!(
        e,
        Effect::AmmunitionSpent { rounds: 8, .. }
    )));
    assert_eq!(harness.loaded(shooter, "Carbine"), 12);
    assert_wounds(&harness, target, 2 + 3 + 4 + 5 + 6 + 2, 0);
}

#[test]
fn test_twin_linked_adds_one_hit() {
    let mut harness = TestHarness::new();
    harness.add(combatant("Shooter", 60, 10).with_weapon(carbine().with_traits("Twin-Linked")));
    let target = harness.add(combatant("Target", 30, 20));

    // 70 vs 20: 6 DoS, one standard hit plus the twin
    harness.script([20, 6, 7]);
    let intent = attack(&harness, "Shooter", "Target", "Carbine", AttackType::Standard, AttackOptions::default());
    let resolution = harness.act(intent);

    let ctx = resolution.context.as_ref().expect("attack context");
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Weapon), 0);
    assert_eq!(ctx.hits(), 2);
    assert_wounds(&harness, target, (6 - 3) + (7 - 3), 0);
}

#[test]
fn test_twin_linked_bonus_variant_adds_ten() {
    let mut harness = TestHarness::new();
    harness.add(combatant("Shooter", 60, 10).with_weapon(carbine().with_traits("Twin-Linked +10")));
    let target = harness.add(combatant("Target", 30, 20));

    // 60 + 10 standard + 10 twin-linked = 80 vs 20: 7 DoS, still one hit
    harness.script([20, 8]);
    let intent = attack(&harness, "Shooter", "Target", "Carbine", AttackType::Standard, AttackOptions::default());
    let resolution = harness.act(intent);

    let ctx = resolution.context.as_ref().expect("attack context");
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Weapon), 10);
    assert_eq!(ctx.final_target, 80);
    assert_eq!(ctx.hits(), 1);
    assert_wounds(&harness, target, 8 - 3, 0);
}

#[test]
fn test_overheat_replaces_hits() {
    let mut harness = TestHarness::new();
    let plasma = Weapon::new("Plasma Pistol", WeaponClass::Pistol, "1d10+6")
        .with_traits("Overheats")
        .with_clip(10);
    let shooter = harness.add(combatant("Shooter", 60, 10).with_weapon(plasma));
    let target = harness.add(combatant("Target", 30, 20));

    // 60 + 10 + 20 aim + 30 point blank = 120, so 95 succeeds and overheats
    harness.script([95]);
    let options = AttackOptions {
        aim: Aim::Full,
        range: RangeBand::PointBlank,
        ..AttackOptions::default()
    };
    let intent = attack(&harness, "Shooter", "Target", "Plasma Pistol", AttackType::Standard, options);
    let resolution = harness.act(intent);

    let ctx = resolution.context.as_ref().expect("attack context");
    assert!(ctx.succeeded());
    assert_eq!(ctx.malfunction, Some(Malfunction::Overheated));
    assert_eq!(ctx.hits(), 0);
    assert_notice(&resolution, &Notice::WeaponOverheated);
    assert!(!resolution.all_notices().any(|n| *n == Notice::WeaponJammed));
    assert_eq!(harness.loaded(shooter, "Plasma Pistol"), 9);
    assert_wounds(&harness, target, 0, 0);
}

// =============================================================================
// EVASION
// =============================================================================

fn parry(harness: &TestHarness, defender: &str, weapon: &str, against: Option<&str>) -> Intent {
    let character_id = harness
        .encounter
        .find_by_name(defender)
        .map(|c| c.id)
        .unwrap_or_else(|| panic!("no combatant {defender}"));
    Intent::Evade {
        character_id,
        kind: EvasionKind::Parry,
        weapon_name: Some(weapon.to_string()),
        attacker_weapon_traits: against.map(str::to_string),
        difficulty: Default::default(),
        situational: 0,
    }
}

#[test]
fn test_parry_against_unbalanced_weapon() {
    let mut harness = TestHarness::new();
    let blade = Weapon::new("Blade", WeaponClass::Melee, "1d10+SB");
    harness.add(combatant("Defender", 40, 10).with_weapon(blade));

    harness.script([10]);
    let resolution = harness.resolve(parry(&harness, "Defender", "Blade", Some("Unbalanced")));
    let ctx = resolution.context.as_ref().expect("parry context");
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Weapon), -10);
}

#[test]
fn test_parry_with_unbalanced_weapon_has_no_penalty() {
    let mut harness = TestHarness::new();
    let axe = Weapon::new("Axe", WeaponClass::Melee, "1d10+SB").with_traits("Unbalanced");
    harness.add(combatant("Defender", 40, 10).with_weapon(axe));

    harness.script([10]);
    let resolution = harness.resolve(parry(&harness, "Defender", "Axe", None));
    let ctx = resolution.context.as_ref().expect("parry context");
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Weapon), 0);

    harness.script([10]);
    let resolution = harness.resolve(parry(&harness, "Defender", "Axe", Some("Balanced")));
    let ctx = resolution.context.as_ref().expect("parry context");
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Weapon), 0);
}

#[test]
fn test_parry_with_balanced_weapon_against_unbalanced() {
    let mut harness = TestHarness::new();
    let sabre = Weapon::new("Sabre", WeaponClass::Melee, "1d10+SB").with_traits("Balanced");
    harness.add(combatant("Defender", 40, 10).with_weapon(sabre));

    harness.script([10]);
    let resolution = harness.resolve(parry(&harness, "Defender", "Sabre", Some("Unbalanced")));
    let ctx = resolution.context.as_ref().expect("parry context");
    assert_eq!(ctx.modifiers.from_source(ModifierSource::Weapon), 10 - 10);
}

// =============================================================================
// HORDES
// =============================================================================

#[test]
fn test_force_melee_doubles_horde_kills() {
    let mut harness = TestHarness::new();
    let staff = get_weapon("Force Staff").expect("force staff");
    harness.add(
        combatant("Psyker", 30, 10)
            .with_characteristic(CharacteristicKind::WeaponSkill, 50)
            .with_weapon(staff),
    );
    let horde = harness.add(sample_horde("Cultists", 60));

    // WS 50 vs 25: 3 DoS → 2 swift hits; 6+3 and 5+3 both beat TB 3
    harness.script([25, 6, 5]);
    let intent = attack(&harness, "Psyker", "Cultists", "Force Staff", AttackType::Swift, AttackOptions::default());
    let resolution = harness.act(intent);

    assert_eq!(resolution.context.as_ref().map(|c| c.hits()), Some(2));
    assert!(resolution
        .effects
        .contains(&Effect::HordeReduced { target_id: horde, kills: 4, remaining: 56 }));
    assert_magnitude(&harness, horde, 56);
    assert_wounds(&harness, horde, 0, 0);
}

#[test]
fn test_horde_broken() {
    let mut harness = TestHarness::new();
    harness.add(combatant("Shooter", 60, 10).with_weapon(carbine()));
    let horde = harness.add(sample_horde("Stragglers", 2));

    harness.script([20, 9, 9, 9]);
    let intent = attack(&harness, "Shooter", "Stragglers", "Carbine", AttackType::SemiAuto, AttackOptions::default());
    let resolution = harness.act(intent);
    assert_notice(&resolution, &Notice::HordeBroken { target: horde });
    assert_magnitude(&harness, horde, 0);
}

// =============================================================================
// WOUNDS
// =============================================================================

#[test]
fn test_damage_beyond_max_is_critical() {
    let mut harness = TestHarness::new();
    harness.add(combatant("Shooter", 40, 10).with_weapon(get_weapon("Laspistol").expect("laspistol")));
    let mut target = combatant("Target", 30, 10);
    target.wounds.value = 10;
    let target = harness.add(target);

    // 50 vs 45: 1 DoS; 4 + 2 − TB 3 = 3
    harness.script([45, 4]);
    let intent = attack(&harness, "Shooter", "Target", "Laspistol", AttackType::Standard, AttackOptions::default());
    let resolution = harness.act(intent);

    assert!(resolution.effects.contains(&Effect::WoundsTaken {
        target_id: target,
        amount: 3,
        ordinary: 0,
        critical: 3
    }));
    assert_wounds(&harness, target, 10, 3);
}

#[test]
fn test_minimum_damage_houserule() {
    let engine = RulesEngine::with_config(EngineConfig::new());
    let mut harness = TestHarness::with_engine(engine);
    harness.add(combatant("Shooter", 40, 10).with_weapon(get_weapon("Laspistol").expect("laspistol")));
    let target = harness.add(combatant("Target", 30, 20));

    // 50 vs 10: 5 DoS; the die shows 2 and is raised to 5
    harness.script([10, 2]);
    let intent = attack(&harness, "Shooter", "Target", "Laspistol", AttackType::Standard, AttackOptions::default());
    let resolution = harness.act(intent);
    let details = resolution
        .context
        .as_ref()
        .and_then(|c| c.attack.as_ref())
        .expect("attack details");
    assert_eq!(details.minimum_adjusted_hit, Some(0));
    assert_eq!(details.damage[0].total, 5 + 2);
    assert_wounds(&harness, target, 4, 0);

    let plain = RulesEngine::with_config(EngineConfig::new().with_minimum_damage_houserule(false));
    let mut harness = TestHarness::with_engine(plain);
    harness.add(combatant("Shooter", 40, 10).with_weapon(get_weapon("Laspistol").expect("laspistol")));
    let target = harness.add(combatant("Target", 30, 20));
    harness.script([10, 2]);
    let intent = attack(&harness, "Shooter", "Target", "Laspistol", AttackType::Standard, AttackOptions::default());
    harness.act(intent);
    assert_wounds(&harness, target, 1, 0);
}

#[test]
fn test_shocking_weapon_queues_test_then_fatigue() {
    let mut harness = TestHarness::new();
    let shock_maul = Weapon::new("Shock Maul", WeaponClass::Melee, "1d10+SB").with_traits("Shocking");
    harness.add(combatant("Enforcer", 40, 10).with_weapon(shock_maul));
    let victim = harness.add(combatant("Victim", 30, 10));

    // WS 50 vs 41: 1 DoS; 5 + 4 − 3
    harness.script([41, 5]);
    let intent = attack(&harness, "Enforcer", "Victim", "Shock Maul", AttackType::Standard, AttackOptions::default());
    let resolution = harness.act(intent);
    assert!(resolution
        .effects
        .contains(&Effect::ShockTestQueued { target_id: victim }));
    assert_eq!(harness.combatant(victim).pending_shock_tests, 1);

    harness.script([88]);
    harness.act(Intent::StartTurn { character_id: victim });
    let victim = harness.combatant(victim);
    assert_eq!(victim.pending_shock_tests, 0);
    assert_eq!(victim.fatigue.value, 1);
}

// =============================================================================
// PSYCHIC POWERS
// =============================================================================

#[test]
fn test_smite_unfettered() {
    let mut harness = TestHarness::new();
    let psyker = harness.add(sample_psyker("Ilse"));
    let guard = harness.add(sample_guardsman("Guard"));

    // WP 45 + 15 psy rating = 60 vs 32: 3 DoS; 6 + PR 3 − (TB 4 + 2 flak)
    harness.script([32, 6]);
    let resolution = harness.act(Intent::FocusPower {
        psyker_id: psyker,
        target_id: Some(guard),
        power_name: "Smite".into(),
        mode: PsychicMode::Unfettered,
        attack_type: AttackType::Bolt,
        options: AttackOptions::default(),
    });

    let ctx = resolution.context.as_ref().expect("power context");
    assert_eq!(ctx.final_target, 60);
    assert_eq!(ctx.dos(), 3);
    assert!(ctx.psychic.is_some_and(|p| p.phenomena.is_none()));
    assert_wounds(&harness, guard, 3, 0);
}

#[test]
fn test_pushed_power_perils() {
    let mut harness = TestHarness::new();
    let psyker = harness.add(sample_psyker("Ilse"));

    // Push 5 clamps to 2 for a bound psyker: rating 5, +25, two bonus DoS.
    // 44 is a double, so phenomena roll 70 + 20 = 90 and perils follow.
    harness.script([44, 70, 30]);
    let resolution = harness.resolve(Intent::FocusPower {
        psyker_id: psyker,
        target_id: None,
        power_name: "Smite".into(),
        mode: PsychicMode::Pushed(5),
        attack_type: AttackType::Bolt,
        options: AttackOptions::default(),
    });

    let ctx = resolution.context.as_ref().expect("power context");
    assert_eq!(ctx.final_target, 70);
    assert_eq!(ctx.dos(), 3 + 2);
    let psychic = ctx.psychic.expect("psychic details");
    assert_eq!(psychic.effective_rating, 5);
    assert_eq!(psychic.push, 2);
    assert_eq!(psychic.phenomena.map(|p| p.roll), Some(90));
    assert_notice(&resolution, &Notice::PerilsOfTheWarp { roll: 30 });
}

#[test]
fn test_power_attack_type_must_be_psychic() {
    let mut harness = TestHarness::new();
    let psyker = harness.add(sample_psyker("Ilse"));
    let guard = harness.add(sample_guardsman("Guard"));
    let resolution = harness.resolve(Intent::FocusPower {
        psyker_id: psyker,
        target_id: Some(guard),
        power_name: "Smite".into(),
        mode: PsychicMode::Fettered,
        attack_type: AttackType::FullAuto,
        options: AttackOptions::default(),
    });
    assert_notice(
        &resolution,
        &Notice::AttackTypeNotAllowed { attack_type: AttackType::FullAuto },
    );
}
