//! Percentile-dice tabletop rules engine.
//!
//! This crate provides:
//! - d100 tests with degrees of success and failure
//! - Attack resolution: rate of fire, hit counting, hit locations, damage,
//!   armour and wounds, including hordes
//! - Focused psychic powers with phenomena and perils
//! - Weapon trait extraction from free text
//! - Experience spend accounting
//! - Intent/Effect rules system: resolutions never mutate state until their
//!   effects are applied
//!
//! # Quick Start
//!
//! ```ignore
//! use dh_core::{apply_effects, AttackOptions, AttackType, Encounter, Intent, RngDice, RulesEngine};
//! use dh_core::testing::{sample_guardsman, sample_horde};
//!
//! let mut encounter = Encounter::new("Hab Block 7");
//! let guard = encounter.add(sample_guardsman("Vex"));
//! let cultists = encounter.add(sample_horde("Cultists", 30));
//!
//! let engine = RulesEngine::new();
//! let resolution = engine.resolve(
//!     &encounter,
//!     Intent::Attack {
//!         attacker_id: guard,
//!         target_id: cultists,
//!         weapon_name: "Lasgun".into(),
//!         attack_type: AttackType::SemiAuto,
//!         options: AttackOptions::default(),
//!     },
//!     &mut RngDice::from_entropy(),
//! );
//! println!("{}", resolution.narrative);
//! apply_effects(&mut encounter, &resolution.effects);
//! ```

pub mod advancement;
pub mod attack;
pub mod character;
pub mod check;
pub mod conditions;
pub mod config;
pub mod context;
pub mod damage;
pub mod dice;
pub mod encounter;
pub mod items;
pub mod location;
pub mod rules;
pub mod target;
pub mod testing;
pub mod weapon_traits;
pub mod wounds;

// Primary public API
pub use attack::AttackType;
pub use character::{CharacteristicKind, Combatant, CombatantId};
pub use check::PsychicMode;
pub use config::{EngineConfig, ExperienceMode, RulesTables};
pub use context::{Notice, RollContext};
pub use dice::{DiceSource, RngDice, ScriptedDice};
pub use encounter::Encounter;
pub use rules::{
    apply_effects, AttackOptions, Effect, EvasionKind, Intent, Resolution, RulesEngine,
    TestSubject,
};
pub use weapon_traits::{TraitExtractor, WeaponTraits};
