//! Rules engine with the Intent/Effect pipeline.
//!
//! 1. A caller describes what a combatant wants to do as an [`Intent`]
//! 2. [`RulesEngine::resolve`] rolls the dice and fills a [`RollContext`]
//! 3. The resolution carries [`Effect`]s describing every state change
//! 4. [`apply_effects`] commits them to the [`Encounter`] in one step
//!
//! Resolving never touches the encounter, so an abandoned resolution leaves
//! no partial state behind.

use crate::advancement::{self, ExperienceSummary};
use crate::attack::{count_hits, AttackProfile, AttackType, HitRoll};
use crate::character::{
    CharacteristicKind, Combatant, CombatantId, UNTRAINED,
};
use crate::check::{
    automatic_failure, effective_psy_rating, malfunction, phenomena_triggered, psychic_modifier,
    roll_phenomena, roll_test, unnatural_bonus, Malfunction, PsychicMode, TestOutcome,
};
use crate::conditions::{Condition, Severity};
use crate::config::{EngineConfig, RulesTables};
use crate::context::{
    AttackDetails, AttackSource, Notice, PsychicDetails, RollContext, RollKind,
};
use crate::damage::{
    accurate_dice, apply_minimum_die, horde_dice, roll_damage, DamageRequest, FormulaTokens,
};
use crate::dice::DiceSource;
use crate::encounter::Encounter;
use crate::items::{DamageType, RateOfFire, Weapon, WeaponClass};
use crate::location::HitLocation;
use crate::target::{
    actor_condition_modifier, attack_modifiers, parried_weapon_modifier, parry_weapon_modifier,
    Aim, AttackSituation, Difficulty, ModifierSource, Modifiers, RangeBand,
};
use crate::weapon_traits::{TraitExtractor, WeaponTraits};
use crate::wounds::{resolve_hits, DamageReport};
use serde::{Deserialize, Serialize};

// ============================================================================
// Intents
// ============================================================================

/// What is being tested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestSubject {
    Characteristic(CharacteristicKind),
    Skill {
        name: String,
        speciality: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvasionKind {
    Dodge,
    Parry,
}

impl EvasionKind {
    /// Skill used and the characteristic behind it.
    pub fn skill(&self) -> (&'static str, CharacteristicKind) {
        match self {
            EvasionKind::Dodge => ("Dodge", CharacteristicKind::Agility),
            EvasionKind::Parry => ("Parry", CharacteristicKind::WeaponSkill),
        }
    }
}

/// Situational inputs to an attack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackOptions {
    pub aim: Aim,
    pub range: RangeBand,
    pub difficulty: Difficulty,
    pub situational: i32,
    /// Location chosen for a Called Shot. Ignored by other attack types.
    pub called_location: Option<HitLocation>,
    /// Degrees of success of the defender's evasion.
    pub evasion_dos: u32,
    /// Extra flat damage on every hit.
    pub damage_bonus: i32,
}

/// What a combatant wants to do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Intent {
    /// Characteristic or skill test
    Test {
        character_id: CombatantId,
        subject: TestSubject,
        difficulty: Difficulty,
        situational: i32,
    },

    /// Attack a target with a weapon
    Attack {
        attacker_id: CombatantId,
        target_id: CombatantId,
        weapon_name: String,
        attack_type: AttackType,
        options: AttackOptions,
    },

    /// Dodge or parry an incoming attack
    Evade {
        character_id: CombatantId,
        kind: EvasionKind,
        /// Weapon used to parry
        weapon_name: Option<String>,
        /// Trait text of the weapon being parried
        attacker_weapon_traits: Option<String>,
        difficulty: Difficulty,
        situational: i32,
    },

    /// Manifest a psychic power
    FocusPower {
        psyker_id: CombatantId,
        target_id: Option<CombatantId>,
        power_name: String,
        mode: PsychicMode,
        attack_type: AttackType,
        options: AttackOptions,
    },

    /// Spend a Fate point to resolve an intent again
    Reroll {
        character_id: CombatantId,
        intent: Box<Intent>,
    },

    /// Refill a weapon's clip from its linked ammunition
    Reload {
        character_id: CombatantId,
        weapon_name: String,
    },

    /// Start of a combatant's turn
    StartTurn { character_id: CombatantId },

    ApplyCondition {
        target_id: CombatantId,
        condition: Condition,
        severity: Severity,
    },

    RemoveCondition {
        target_id: CombatantId,
        condition: Condition,
    },
}

// ============================================================================
// Effects
// ============================================================================

/// A state change produced by a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Rounds taken from a weapon's clip
    AmmunitionSpent {
        character_id: CombatantId,
        weapon_name: String,
        rounds: u32,
    },

    /// Wounds inflicted; the split is what it was at resolution time
    WoundsTaken {
        target_id: CombatantId,
        amount: u32,
        ordinary: u32,
        critical: u32,
    },

    /// Horde magnitude lost
    HordeReduced {
        target_id: CombatantId,
        kills: u32,
        remaining: u32,
    },

    ShockTestQueued { target_id: CombatantId },

    /// Pending Shock tests were rolled
    ShockTestResolved {
        character_id: CombatantId,
        passed: bool,
    },

    FatigueGained {
        character_id: CombatantId,
        amount: u32,
    },

    FatePointSpent { character_id: CombatantId },

    /// One unit of ammunition used to refill a clip
    WeaponReloaded {
        character_id: CombatantId,
        weapon_name: String,
        ammunition: String,
    },

    ConditionApplied {
        target_id: CombatantId,
        condition: Condition,
        severity: Severity,
    },

    ConditionRemoved {
        target_id: CombatantId,
        condition: Condition,
    },
}

/// The result of resolving an intent.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Present for every intent that rolled (or would have rolled) a test.
    pub context: Option<RollContext>,
    pub effects: Vec<Effect>,
    /// Notices not tied to a roll.
    pub notices: Vec<Notice>,
    pub narrative: String,
}

impl Resolution {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self {
            context: None,
            effects: Vec::new(),
            notices: Vec::new(),
            narrative: narrative.into(),
        }
    }

    pub fn with_context(mut self, context: RollContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    /// Every notice, from the roll context and the resolution itself.
    pub fn all_notices(&self) -> impl Iterator<Item = &Notice> {
        self.context
            .iter()
            .flat_map(|c| c.notices.iter())
            .chain(self.notices.iter())
    }

    pub fn has_notice(&self, notice: &Notice) -> bool {
        self.all_notices().any(|n| n == notice)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Resolves intents into effects.
#[derive(Debug, Clone)]
pub struct RulesEngine {
    config: EngineConfig,
    traits: TraitExtractor,
}

/// One attack's damage stage inputs.
struct Strike<'a> {
    attacker: &'a Combatant,
    target: &'a Combatant,
    profile: AttackProfile,
    rate: RateOfFire,
    shots_fired: Option<u32>,
    damage: &'a str,
    penetration: &'a str,
    damage_type: DamageType,
    flat_bonus: i32,
    tokens: FormulaTokens,
    accurate_dice: u32,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            traits: TraitExtractor::default(),
        }
    }

    /// Replace the trait pattern table.
    pub fn with_trait_extractor(mut self, traits: TraitExtractor) -> Self {
        self.traits = traits;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tables(&self) -> &RulesTables {
        &self.config.tables
    }

    pub fn extract_traits(&self, text: &str) -> WeaponTraits {
        self.traits.extract(text)
    }

    /// Experience spend of a combatant under the configured mode.
    pub fn experience(&self, combatant: &Combatant) -> ExperienceSummary {
        advancement::summarize(
            combatant,
            self.config.experience_mode,
            &self.config.tables.experience,
        )
    }

    /// Resolve an intent and produce effects.
    pub fn resolve(
        &self,
        encounter: &Encounter,
        intent: Intent,
        dice: &mut dyn DiceSource,
    ) -> Resolution {
        match intent {
            Intent::Test {
                character_id,
                subject,
                difficulty,
                situational,
            } => self.resolve_test(encounter, character_id, subject, difficulty, situational, dice),
            Intent::Attack {
                attacker_id,
                target_id,
                weapon_name,
                attack_type,
                options,
            } => self.resolve_attack(
                encounter,
                attacker_id,
                target_id,
                &weapon_name,
                attack_type,
                &options,
                dice,
            ),
            Intent::Evade {
                character_id,
                kind,
                weapon_name,
                attacker_weapon_traits,
                difficulty,
                situational,
            } => self.resolve_evade(
                encounter,
                character_id,
                kind,
                weapon_name.as_deref(),
                attacker_weapon_traits.as_deref(),
                difficulty,
                situational,
                dice,
            ),
            Intent::FocusPower {
                psyker_id,
                target_id,
                power_name,
                mode,
                attack_type,
                options,
            } => self.resolve_focus_power(
                encounter,
                psyker_id,
                target_id,
                &power_name,
                mode,
                attack_type,
                &options,
                dice,
            ),
            Intent::Reroll {
                character_id,
                intent,
            } => self.resolve_reroll(encounter, character_id, *intent, dice),
            Intent::Reload {
                character_id,
                weapon_name,
            } => self.resolve_reload(encounter, character_id, &weapon_name),
            Intent::StartTurn { character_id } => {
                self.resolve_start_turn(encounter, character_id, dice)
            }
            Intent::ApplyCondition {
                target_id,
                condition,
                severity,
            } => self.resolve_apply_condition(encounter, target_id, condition, severity),
            Intent::RemoveCondition {
                target_id,
                condition,
            } => self.resolve_remove_condition(encounter, target_id, condition),
        }
    }

    // ------------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------------

    fn resolve_test(
        &self,
        encounter: &Encounter,
        character_id: CombatantId,
        subject: TestSubject,
        difficulty: Difficulty,
        situational: i32,
        dice: &mut dyn DiceSource,
    ) -> Resolution {
        let Some(actor) = encounter.get(character_id) else {
            return missing_combatant(character_id);
        };

        let (kind, base, characteristic) = match subject {
            TestSubject::Characteristic(characteristic) => (
                RollKind::Characteristic { characteristic },
                actor.characteristic(characteristic).display_total,
                characteristic,
            ),
            TestSubject::Skill { name, speciality } => {
                let target = skill_target(actor, &name, speciality.as_deref());
                let kind = RollKind::Skill {
                    skill: name.clone(),
                    speciality: speciality.clone(),
                };
                let Some((base, characteristic)) = target else {
                    let label = match &speciality {
                        Some(sp) => format!("{name} ({sp})"),
                        None => name,
                    };
                    tracing::warn!(actor = %actor.name, skill = %label, "skill not found");
                    let mut ctx = RollContext::new(actor.id, actor.name.clone(), kind);
                    ctx.notice(Notice::MissingSkill {
                        name: label.clone(),
                    });
                    return Resolution::new(format!("{} has no skill {label}", actor.name))
                        .with_context(ctx);
                };
                (kind, base, characteristic)
            }
        };

        let mut ctx = RollContext::new(actor.id, actor.name.clone(), kind);
        let mut mods = Modifiers::new();
        mods.push(ModifierSource::Situational, situational, "Situational");
        mods.push(ModifierSource::Difficulty, difficulty.modifier(), "Difficulty");
        mods.push(
            ModifierSource::ActorCondition,
            actor_condition_modifier(&self.config.tables, actor, false),
            "Condition",
        );
        ctx.set_target(base, mods);

        let unnatural = actor.characteristic(characteristic).unnatural;
        let outcome = roll_test(ctx.final_target, unnatural_bonus(unnatural), dice);
        ctx.outcome = Some(outcome);

        let narrative = format!("{} tests: {}", actor.name, describe_outcome(&outcome));
        Resolution::new(narrative).with_context(ctx)
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_evade(
        &self,
        encounter: &Encounter,
        character_id: CombatantId,
        kind: EvasionKind,
        weapon_name: Option<&str>,
        attacker_weapon_traits: Option<&str>,
        difficulty: Difficulty,
        situational: i32,
        dice: &mut dyn DiceSource,
    ) -> Resolution {
        let Some(actor) = encounter.get(character_id) else {
            return missing_combatant(character_id);
        };

        let (skill_name, characteristic) = kind.skill();
        let mut ctx = RollContext::new(
            actor.id,
            actor.name.clone(),
            RollKind::Evasion {
                skill: skill_name.to_string(),
            },
        );

        let mut mods = Modifiers::new();
        mods.push(ModifierSource::Situational, situational, "Situational");
        mods.push(ModifierSource::Difficulty, difficulty.modifier(), "Difficulty");
        mods.push(
            ModifierSource::ActorCondition,
            actor_condition_modifier(&self.config.tables, actor, false),
            "Condition",
        );
        if let (EvasionKind::Parry, Some(name)) = (kind, weapon_name) {
            match actor.weapon(name) {
                Some(weapon) => mods.push(
                    ModifierSource::Weapon,
                    parry_weapon_modifier(&self.traits.extract(&weapon.traits)),
                    weapon.name.clone(),
                ),
                None => {
                    tracing::warn!(actor = %actor.name, weapon = name, "parry weapon not found");
                    ctx.notice(Notice::MissingWeapon {
                        name: name.to_string(),
                    });
                }
            }
        }
        if let (EvasionKind::Parry, Some(text)) = (kind, attacker_weapon_traits) {
            mods.push(
                ModifierSource::Weapon,
                parried_weapon_modifier(&self.traits.extract(text)),
                "Parried weapon",
            );
        }

        let advance = actor.skill(skill_name).map_or(UNTRAINED, |s| s.advance);
        let score = actor.characteristic(characteristic);
        ctx.set_target(score.display_total + advance, mods);

        let outcome = roll_test(ctx.final_target, unnatural_bonus(score.unnatural), dice);
        ctx.outcome = Some(outcome);

        let narrative = format!(
            "{} attempts to {}: {}",
            actor.name,
            skill_name.to_lowercase(),
            describe_outcome(&outcome)
        );
        Resolution::new(narrative).with_context(ctx)
    }

    // ------------------------------------------------------------------------
    // Attacks
    // ------------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn resolve_attack(
        &self,
        encounter: &Encounter,
        attacker_id: CombatantId,
        target_id: CombatantId,
        weapon_name: &str,
        attack_type: AttackType,
        options: &AttackOptions,
        dice: &mut dyn DiceSource,
    ) -> Resolution {
        let Some(attacker) = encounter.get(attacker_id) else {
            return missing_combatant(attacker_id);
        };
        let Some(target) = encounter.get(target_id) else {
            return missing_combatant(target_id);
        };

        let mut ctx = RollContext::new(
            attacker.id,
            attacker.name.clone(),
            RollKind::Attack {
                attack_type,
                weapon: weapon_name.to_string(),
            },
        );
        ctx.target = Some(target.id);

        let Some(weapon) = attacker.weapon(weapon_name) else {
            tracing::warn!(attacker = %attacker.name, weapon = weapon_name, "weapon not found");
            ctx.notice(Notice::MissingWeapon {
                name: weapon_name.to_string(),
            });
            return Resolution::new(describe_attack(&ctx, &target.name)).with_context(ctx);
        };

        let melee = weapon.class.is_melee();
        let traits = self.traits.extract(&weapon.traits);
        let rate = if melee {
            melee_rate(weapon, attacker)
        } else {
            weapon.rate_of_fire
        };
        let allowed = if melee {
            attack_type.allows_melee()
        } else {
            attack_type.allows_ranged()
        };
        let profile = self
            .config
            .tables
            .attack_types
            .get(&attack_type)
            .copied()
            .filter(|p| allowed && (melee || p.rounds(&rate) > 0));
        let Some(profile) = profile else {
            ctx.notice(Notice::AttackTypeNotAllowed { attack_type });
            return Resolution::new(describe_attack(&ctx, &target.name)).with_context(ctx);
        };

        let storm = if traits.storm { 2 } else { 1 };
        let rounds = if melee { 0 } else { profile.rounds(&rate) * storm };
        if !melee && !weapon.clip.can_fire(rounds) {
            ctx.notice(Notice::NotEnoughAmmunition {
                needed: rounds,
                loaded: weapon.clip.value,
            });
            return Resolution::new(describe_attack(&ctx, &target.name)).with_context(ctx);
        }

        let situation = AttackSituation {
            attacker,
            target: Some(target),
            melee,
            attack_type,
            profile: &profile,
            traits: &traits,
            aim: options.aim,
            range: options.range,
            difficulty: options.difficulty,
            situational: options.situational,
            psychic: 0,
        };
        let score = attacker.characteristic(weapon.class.characteristic());
        ctx.set_target(
            score.display_total,
            attack_modifiers(&self.config.tables, &situation),
        );

        let mut effects = Vec::new();
        let outcome = if !melee && attacker.has_condition(Condition::Blinded) {
            ctx.notice(Notice::BlindedRangedAttack);
            automatic_failure(ctx.final_target)
        } else {
            roll_test(ctx.final_target, unnatural_bonus(score.unnatural), dice)
        };
        ctx.outcome = Some(outcome);

        if !melee {
            if !outcome.automatic {
                ctx.malfunction = malfunction(outcome.roll, &traits);
            }
            match ctx.malfunction {
                Some(Malfunction::Jammed) => ctx.notice(Notice::WeaponJammed),
                Some(Malfunction::Overheated) => ctx.notice(Notice::WeaponOverheated),
                None => {}
            }
            if !weapon.clip.is_unlimited() {
                effects.push(Effect::AmmunitionSpent {
                    character_id: attacker.id,
                    weapon_name: weapon.name.clone(),
                    rounds,
                });
            }
        }

        let accurate = if traits.accurate
            && weapon.class == WeaponClass::Pistol
            && attack_type.is_single_shot()
        {
            accurate_dice(outcome.dos)
        } else {
            0
        };

        let mut details = AttackDetails {
            attack_type,
            source: AttackSource::Weapon(weapon.clone()),
            traits,
            melee,
            rounds,
            called_location: called_location(attack_type, options),
            evasion_dos: options.evasion_dos,
            hits: 0,
            damage: Vec::new(),
            minimum_adjusted_hit: None,
            applied: None,
        };
        let strike = Strike {
            attacker,
            target,
            profile,
            rate,
            shots_fired: (!melee).then(|| profile.shots_fired(&rate)),
            damage: &weapon.damage,
            penetration: &weapon.penetration,
            damage_type: weapon.damage_type,
            flat_bonus: weapon.damage_bonus + options.damage_bonus,
            tokens: FormulaTokens::for_combatant(attacker),
            accurate_dice: accurate,
        };
        self.strike(&mut ctx, &mut details, strike, dice, &mut effects);
        ctx.attack = Some(details);

        Resolution::new(describe_attack(&ctx, &target.name))
            .with_context(ctx)
            .with_effects(effects)
    }

    /// Hits, damage and wounds of a successful attack.
    fn strike(
        &self,
        ctx: &mut RollContext,
        details: &mut AttackDetails,
        strike: Strike<'_>,
        dice: &mut dyn DiceSource,
        effects: &mut Vec<Effect>,
    ) {
        let Some(outcome) = ctx.outcome else {
            return;
        };
        if !outcome.success || ctx.malfunction.is_some() {
            return;
        }

        let traits = details.traits.clone();
        details.hits = count_hits(
            &strike.profile,
            &HitRoll {
                dos: outcome.dos,
                max_hits: strike.profile.max_hits.resolve(&strike.rate),
                shots_fired: strike.shots_fired,
                storm: traits.storm,
                twin_linked: traits.twin_linked,
                evasion_dos: details.evasion_dos,
            },
        );
        tracing::debug!(dos = outcome.dos, hits = details.hits, "hits counted");
        if details.hits == 0 {
            return;
        }

        let first_location = details
            .called_location
            .unwrap_or_else(|| HitLocation::from_attack_roll(outcome.roll));
        let request = DamageRequest {
            damage: strike.damage,
            penetration: strike.penetration,
            damage_type: strike.damage_type,
            flat_bonus: strike.flat_bonus,
            traits: &traits,
            tokens: &strike.tokens,
            dos: outcome.dos,
            hits: details.hits,
            first_location,
            additional_hits: &self.config.tables.additional_hits,
            accurate_dice: strike.accurate_dice,
            horde_dice: horde_dice(strike.attacker.horde),
        };
        let mut hits = roll_damage(&request, dice);
        if self.config.minimum_damage_houserule {
            details.minimum_adjusted_hit = apply_minimum_die(&mut hits, outcome.dos);
        }

        let report = resolve_hits(strike.target, &hits, &traits, details.melee);
        effects.extend(damage_effects(strike.target.id, &report));
        if report.kills > 0 && report.horde_broken() {
            ctx.notice(Notice::HordeBroken {
                target: strike.target.id,
            });
        }
        details.damage = hits;
        details.applied = Some(report);
    }

    // ------------------------------------------------------------------------
    // Psychic powers
    // ------------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn resolve_focus_power(
        &self,
        encounter: &Encounter,
        psyker_id: CombatantId,
        target_id: Option<CombatantId>,
        power_name: &str,
        mode: PsychicMode,
        attack_type: AttackType,
        options: &AttackOptions,
        dice: &mut dyn DiceSource,
    ) -> Resolution {
        let Some(psyker) = encounter.get(psyker_id) else {
            return missing_combatant(psyker_id);
        };
        let target = match target_id {
            Some(id) => match encounter.get(id) {
                Some(target) => Some(target),
                None => return missing_combatant(id),
            },
            None => None,
        };

        let mut ctx = RollContext::new(
            psyker.id,
            psyker.name.clone(),
            RollKind::FocusPower {
                power: power_name.to_string(),
                mode,
            },
        );
        ctx.target = target.map(|t| t.id);

        let Some(power) = psyker.power(power_name) else {
            tracing::warn!(psyker = %psyker.name, power = power_name, "power not found");
            ctx.notice(Notice::MissingPower {
                name: power_name.to_string(),
            });
            return Resolution::new(format!("{} does not know {power_name}", psyker.name))
                .with_context(ctx);
        };

        let (effective, push) = effective_psy_rating(&psyker.psy, mode);
        let traits = self.traits.extract(&power.traits);
        let psychic = psychic_modifier(effective, psyker.psy.sustained);
        let situational = options.situational + power.focus_modifier;

        // Damaging powers aimed at someone go through the attack table.
        let strike_at = match target.filter(|_| power.is_attack()) {
            Some(target) => {
                let profile = self
                    .config
                    .tables
                    .attack_types
                    .get(&attack_type)
                    .copied()
                    .filter(|_| attack_type.allows_psychic());
                let Some(profile) = profile else {
                    ctx.notice(Notice::AttackTypeNotAllowed { attack_type });
                    return Resolution::new(format!("{} cannot use {attack_type}", power.name))
                        .with_context(ctx);
                };
                Some((target, profile))
            }
            None => None,
        };

        let mods = match &strike_at {
            Some((target, profile)) => attack_modifiers(
                &self.config.tables,
                &AttackSituation {
                    attacker: psyker,
                    target: Some(*target),
                    melee: false,
                    attack_type,
                    profile,
                    traits: &traits,
                    aim: options.aim,
                    range: options.range,
                    difficulty: options.difficulty,
                    situational,
                    psychic,
                },
            ),
            None => {
                let mut mods = Modifiers::new();
                mods.push(ModifierSource::Situational, situational, "Situational");
                mods.push(ModifierSource::Psychic, psychic, "Psy Rating");
                mods.push(
                    ModifierSource::Difficulty,
                    options.difficulty.modifier(),
                    "Difficulty",
                );
                mods.push(
                    ModifierSource::ActorCondition,
                    actor_condition_modifier(&self.config.tables, psyker, false),
                    "Condition",
                );
                mods
            }
        };

        let score = psyker.characteristic(power.characteristic);
        ctx.set_target(score.display_total, mods);
        let outcome = roll_test(
            ctx.final_target,
            unnatural_bonus(score.unnatural) + push,
            dice,
        );
        ctx.outcome = Some(outcome);

        let (triggered, overload) = phenomena_triggered(psyker.psy.class, mode, outcome.doubles);
        let phenomena = triggered.then(|| roll_phenomena(push, overload, dice));
        if let Some(perils) = phenomena.and_then(|p| p.perils) {
            ctx.notice(Notice::PerilsOfTheWarp { roll: perils });
        }
        ctx.psychic = Some(PsychicDetails {
            mode,
            effective_rating: effective,
            push,
            phenomena,
        });

        let mut effects = Vec::new();
        if let Some((target, profile)) = strike_at {
            let mut details = AttackDetails {
                attack_type,
                source: AttackSource::Power(power.clone()),
                traits,
                melee: false,
                rounds: 0,
                called_location: called_location(attack_type, options),
                evasion_dos: options.evasion_dos,
                hits: 0,
                damage: Vec::new(),
                minimum_adjusted_hit: None,
                applied: None,
            };
            let strike = Strike {
                attacker: psyker,
                target,
                profile,
                rate: RateOfFire::new(1, effective, effective),
                shots_fired: None,
                damage: &power.damage,
                penetration: &power.penetration,
                damage_type: power.damage_type,
                flat_bonus: options.damage_bonus,
                tokens: FormulaTokens::for_combatant(psyker).with_psychic(effective, push),
                accurate_dice: 0,
            };
            self.strike(&mut ctx, &mut details, strike, dice, &mut effects);
            ctx.attack = Some(details);
        }

        let mut narrative = format!(
            "{} manifests {} at psy rating {effective}: {}",
            psyker.name,
            power.name,
            describe_outcome(&outcome)
        );
        if let Some(p) = phenomena {
            narrative.push_str(&format!(", psychic phenomena ({})", p.roll));
        }
        if let Some(target) = target {
            append_damage(&mut narrative, &ctx, &target.name);
        }
        Resolution::new(narrative)
            .with_context(ctx)
            .with_effects(effects)
    }

    // ------------------------------------------------------------------------
    // Fate, ammunition, turns, conditions
    // ------------------------------------------------------------------------

    fn resolve_reroll(
        &self,
        encounter: &Encounter,
        character_id: CombatantId,
        intent: Intent,
        dice: &mut dyn DiceSource,
    ) -> Resolution {
        let Some(actor) = encounter.get(character_id) else {
            return missing_combatant(character_id);
        };
        if actor.fate.value == 0 {
            return Resolution::new(format!("{} has no fate points left", actor.name))
                .with_notice(Notice::NoFatePoints);
        }

        let mut resolution = self.resolve(encounter, intent, dice);
        if let Some(ctx) = resolution.context.as_mut() {
            ctx.fate_reroll = true;
        }
        resolution
            .effects
            .insert(0, Effect::FatePointSpent { character_id });
        resolution.narrative = format!("{} spends a fate point. {}", actor.name, resolution.narrative);
        resolution
    }

    fn resolve_reload(
        &self,
        encounter: &Encounter,
        character_id: CombatantId,
        weapon_name: &str,
    ) -> Resolution {
        let Some(actor) = encounter.get(character_id) else {
            return missing_combatant(character_id);
        };
        let Some(weapon) = actor.weapon(weapon_name) else {
            tracing::warn!(actor = %actor.name, weapon = weapon_name, "weapon not found");
            return Resolution::new(format!("{} has no {weapon_name}", actor.name)).with_notice(
                Notice::MissingWeapon {
                    name: weapon_name.to_string(),
                },
            );
        };
        if weapon.clip.is_unlimited() {
            return Resolution::new(format!("{} never needs reloading", weapon.name));
        }

        let ammunition = weapon.ammunition.as_deref().and_then(|name| {
            actor
                .ammunition
                .iter()
                .find(|a| a.name.eq_ignore_ascii_case(name) && a.quantity > 0)
        });
        match ammunition {
            Some(ammo) => Resolution::new(format!("{} reloads {}", actor.name, weapon.name))
                .with_effect(Effect::WeaponReloaded {
                    character_id,
                    weapon_name: weapon.name.clone(),
                    ammunition: ammo.name.clone(),
                }),
            None => Resolution::new(format!("{} has nothing to reload {} with", actor.name, weapon.name))
                .with_notice(Notice::NoAmmunitionToReload {
                    weapon: weapon.name.clone(),
                }),
        }
    }

    /// Pending Shock tests are settled with one Toughness test.
    fn resolve_start_turn(
        &self,
        encounter: &Encounter,
        character_id: CombatantId,
        dice: &mut dyn DiceSource,
    ) -> Resolution {
        let Some(actor) = encounter.get(character_id) else {
            return missing_combatant(character_id);
        };
        if actor.pending_shock_tests == 0 {
            return Resolution::new(format!("{} starts their turn", actor.name));
        }

        let mut ctx = RollContext::new(actor.id, actor.name.clone(), RollKind::Shock);
        let mut mods = Modifiers::new();
        mods.push(
            ModifierSource::ActorCondition,
            actor_condition_modifier(&self.config.tables, actor, false),
            "Condition",
        );
        let toughness = actor.characteristic(CharacteristicKind::Toughness);
        ctx.set_target(toughness.display_total, mods);
        let outcome = roll_test(ctx.final_target, unnatural_bonus(toughness.unnatural), dice);
        ctx.outcome = Some(outcome);

        let mut resolution = Resolution::new(format!(
            "{} resists shock: {}",
            actor.name,
            describe_outcome(&outcome)
        ))
        .with_effect(Effect::ShockTestResolved {
            character_id,
            passed: outcome.success,
        });
        if !outcome.success {
            resolution = resolution.with_effect(Effect::FatigueGained {
                character_id,
                amount: 1,
            });
        }
        resolution.with_context(ctx)
    }

    fn resolve_apply_condition(
        &self,
        encounter: &Encounter,
        target_id: CombatantId,
        condition: Condition,
        severity: Severity,
    ) -> Resolution {
        let Some(target) = encounter.get(target_id) else {
            return missing_combatant(target_id);
        };
        Resolution::new(format!("{} is now {condition}", target.name)).with_effect(
            Effect::ConditionApplied {
                target_id,
                condition,
                severity,
            },
        )
    }

    fn resolve_remove_condition(
        &self,
        encounter: &Encounter,
        target_id: CombatantId,
        condition: Condition,
    ) -> Resolution {
        let Some(target) = encounter.get(target_id) else {
            return missing_combatant(target_id);
        };
        if !target.has_condition(condition) {
            return Resolution::new(format!("{} is not {condition}", target.name));
        }
        Resolution::new(format!("{} is no longer {condition}", target.name)).with_effect(
            Effect::ConditionRemoved {
                target_id,
                condition,
            },
        )
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn missing_combatant(id: CombatantId) -> Resolution {
    tracing::warn!(%id, "combatant not found");
    Resolution::new(format!("Unknown combatant {id}"))
        .with_notice(Notice::MissingCombatant { id })
}

/// Only a Called Shot picks its location.
fn called_location(attack_type: AttackType, options: &AttackOptions) -> Option<HitLocation> {
    options
        .called_location
        .filter(|_| attack_type == AttackType::CalledShot)
}

/// Target number and characteristic of a skill or speciality test.
fn skill_target(
    actor: &Combatant,
    name: &str,
    speciality: Option<&str>,
) -> Option<(i32, CharacteristicKind)> {
    let skill = actor.skill(name)?;
    let total = match speciality {
        Some(sp) => actor.speciality_total(skill, skill.speciality(sp)?),
        None => actor.skill_total(skill),
    };
    Some((total, skill.characteristic))
}

/// Melee rate of fire: the weapon's own values, or the wielder's Weapon
/// Skill bonus where the weapon gives none.
fn melee_rate(weapon: &Weapon, attacker: &Combatant) -> RateOfFire {
    let ws_bonus = attacker
        .characteristic(CharacteristicKind::WeaponSkill)
        .display_bonus
        .max(0) as u32;
    let pick = |value: u32| if value > 0 { value } else { ws_bonus };
    RateOfFire::new(
        1,
        pick(weapon.rate_of_fire.burst),
        pick(weapon.rate_of_fire.full),
    )
}

fn damage_effects(target_id: CombatantId, report: &DamageReport) -> Vec<Effect> {
    let mut effects = Vec::new();
    if report.total_wounds() > 0 {
        effects.push(Effect::WoundsTaken {
            target_id,
            amount: report.total_wounds(),
            ordinary: report.wounds.ordinary,
            critical: report.wounds.critical,
        });
    }
    if report.kills > 0 {
        effects.push(Effect::HordeReduced {
            target_id,
            kills: report.kills,
            remaining: report.horde_remaining.unwrap_or(0),
        });
    }
    if report.shock {
        effects.push(Effect::ShockTestQueued { target_id });
    }
    effects
}

fn describe_outcome(outcome: &TestOutcome) -> String {
    if outcome.success {
        format!(
            "rolled {} vs {}, success with {} DoS",
            outcome.roll, outcome.target, outcome.dos
        )
    } else {
        format!(
            "rolled {} vs {}, failure with {} DoF",
            outcome.roll, outcome.target, outcome.dof
        )
    }
}

fn describe_attack(ctx: &RollContext, target_name: &str) -> String {
    let mut text = format!("{} attacks {target_name}", ctx.actor_name);
    if let Some(outcome) = &ctx.outcome {
        text.push_str(&format!(": {}", describe_outcome(outcome)));
    }
    append_damage(&mut text, ctx, target_name);
    for notice in &ctx.notices {
        text.push_str(&format!(". {notice}"));
    }
    text
}

fn append_damage(text: &mut String, ctx: &RollContext, target_name: &str) {
    let Some(attack) = &ctx.attack else {
        return;
    };
    if attack.hits == 0 {
        return;
    }
    text.push_str(&format!(", {} hit(s)", attack.hits));
    if let Some(report) = &attack.applied {
        if report.horde_remaining.is_some() {
            text.push_str(&format!(", {} of {target_name} fall", report.kills));
        } else {
            text.push_str(&format!(
                ", {target_name} takes {} wound(s)",
                report.total_wounds()
            ));
        }
    }
}

// ============================================================================
// Applying effects
// ============================================================================

/// Apply effects to the encounter.
pub fn apply_effects(encounter: &mut Encounter, effects: &[Effect]) {
    for effect in effects {
        apply_effect(encounter, effect);
    }
}

/// Apply a single effect to the encounter.
pub fn apply_effect(encounter: &mut Encounter, effect: &Effect) {
    let id = effect_subject(effect);
    let Some(combatant) = encounter.get_mut(id) else {
        tracing::warn!(%id, ?effect, "effect for unknown combatant dropped");
        return;
    };

    match effect {
        Effect::AmmunitionSpent {
            weapon_name,
            rounds,
            ..
        } => {
            if let Some(weapon) = combatant.weapon_mut(weapon_name) {
                if !weapon.clip.is_unlimited() {
                    weapon.clip.value = weapon.clip.value.saturating_sub(*rounds);
                }
            }
        }
        Effect::WoundsTaken { amount, .. } => {
            combatant.wounds.take_damage(*amount);
        }
        Effect::HordeReduced { kills, .. } => {
            combatant.horde = combatant.horde.saturating_sub(*kills);
        }
        Effect::ShockTestQueued { .. } => {
            combatant.pending_shock_tests += 1;
        }
        Effect::ShockTestResolved { .. } => {
            combatant.pending_shock_tests = 0;
        }
        Effect::FatigueGained { amount, .. } => {
            combatant.fatigue.add(*amount);
        }
        Effect::FatePointSpent { .. } => {
            combatant.fate.value = combatant.fate.value.saturating_sub(1);
        }
        Effect::WeaponReloaded {
            weapon_name,
            ammunition,
            ..
        } => {
            let Some(ammo) = combatant.ammunition_mut(ammunition) else {
                tracing::warn!(ammunition = %ammunition, "reload ammunition missing");
                return;
            };
            if ammo.quantity == 0 {
                return;
            }
            ammo.quantity -= 1;
            if let Some(weapon) = combatant.weapon_mut(weapon_name) {
                weapon.clip.value = weapon.clip.max;
            }
        }
        Effect::ConditionApplied {
            condition,
            severity,
            ..
        } => {
            combatant.conditions.add(*condition, *severity);
        }
        Effect::ConditionRemoved { condition, .. } => {
            combatant.conditions.remove(*condition);
        }
    }
}

fn effect_subject(effect: &Effect) -> CombatantId {
    match effect {
        Effect::AmmunitionSpent { character_id, .. }
        | Effect::ShockTestResolved { character_id, .. }
        | Effect::FatigueGained { character_id, .. }
        | Effect::FatePointSpent { character_id }
        | Effect::WeaponReloaded { character_id, .. } => *character_id,
        Effect::WoundsTaken { target_id, .. }
        | Effect::HordeReduced { target_id, .. }
        | Effect::ShockTestQueued { target_id }
        | Effect::ConditionApplied { target_id, .. }
        | Effect::ConditionRemoved { target_id, .. } => *target_id,
    }
}
