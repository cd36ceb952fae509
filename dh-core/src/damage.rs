//! Damage resolution.
//!
//! Damage formulas may reference the attacker's characteristic bonuses
//! (`SB`, `TB`, ...) and psychic values (`PR`, `PP`). Tokens are substituted
//! first, then the formula is parsed, adjusted by the weapon's traits and
//! rolled once per hit.

use crate::character::{CharacteristicKind, Combatant};
use crate::dice::{DiceExpression, DiceRoll, DiceSource};
use crate::items::DamageType;
use crate::location::{location_for_hit, AdditionalHitTable, HitLocation};
use crate::weapon_traits::WeaponTraits;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Formula tokens
// ============================================================================

#[derive(Debug, Clone)]
struct TokenRule {
    pattern: Regex,
    token: Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Bonus(CharacteristicKind),
    PsyRating,
    Push,
}

const TOKEN_PATTERNS: &[(&str, Token)] = &[
    (r"\bWSB\b", Token::Bonus(CharacteristicKind::WeaponSkill)),
    (r"\bBSB\b", Token::Bonus(CharacteristicKind::BallisticSkill)),
    (r"\bSB\b", Token::Bonus(CharacteristicKind::Strength)),
    (r"\bTB\b", Token::Bonus(CharacteristicKind::Toughness)),
    (r"\bAgB\b|\bAB\b", Token::Bonus(CharacteristicKind::Agility)),
    (r"\bIntB\b|\bIB\b", Token::Bonus(CharacteristicKind::Intelligence)),
    (r"\bPerB\b", Token::Bonus(CharacteristicKind::Perception)),
    (r"\bWPB\b", Token::Bonus(CharacteristicKind::Willpower)),
    (r"\bFelB\b", Token::Bonus(CharacteristicKind::Fellowship)),
    (r"\bInfB\b", Token::Bonus(CharacteristicKind::Influence)),
    (r"\bPR\b", Token::PsyRating),
    (r"\bPP\b", Token::Push),
];

fn build_token_rules() -> Vec<TokenRule> {
    TOKEN_PATTERNS
        .iter()
        .filter_map(|(pattern, token)| match Regex::new(&format!("(?i){pattern}")) {
            Ok(pattern) => Some(TokenRule {
                pattern,
                token: *token,
            }),
            Err(err) => {
                tracing::warn!(pattern, error = %err, "skipping invalid token pattern");
                None
            }
        })
        .collect()
}

lazy_static::lazy_static! {
    static ref TOKEN_RULES: Vec<TokenRule> = build_token_rules();

    static ref BRACKET_OVERRIDE: Option<Regex> =
        Regex::new(r"^\s*(.*?)\s*[\[(]\s*(\d+)\s*[\])]\s*$").ok();
}

/// Values substituted into formula tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaTokens {
    pub bonuses: BTreeMap<CharacteristicKind, i32>,
    pub psy_rating: u32,
    pub push: u32,
}

impl FormulaTokens {
    /// Tokens for an attacker's current characteristic bonuses.
    pub fn for_combatant(attacker: &Combatant) -> Self {
        Self {
            bonuses: CharacteristicKind::all()
                .into_iter()
                .map(|kind| (kind, attacker.characteristic(kind).display_bonus))
                .collect(),
            psy_rating: 0,
            push: 0,
        }
    }

    pub fn with_psychic(mut self, psy_rating: u32, push: u32) -> Self {
        self.psy_rating = psy_rating;
        self.push = push;
        self
    }

    fn value(&self, token: Token) -> i32 {
        match token {
            Token::Bonus(kind) => self.bonuses.get(&kind).copied().unwrap_or(0),
            Token::PsyRating => self.psy_rating as i32,
            Token::Push => self.push as i32,
        }
    }
}

/// Replace every token in `formula` with its value.
pub fn substitute_tokens(formula: &str, tokens: &FormulaTokens) -> String {
    TOKEN_RULES.iter().fold(formula.to_string(), |text, rule| {
        let value = tokens.value(rule.token).to_string();
        rule.pattern.replace_all(&text, value.as_str()).into_owned()
    })
}

// ============================================================================
// Damage per hit
// ============================================================================

/// Parse a substituted damage formula and apply dice-shaping traits.
pub fn damage_expression(formula: &str, traits: &WeaponTraits) -> DiceExpression {
    let mut expr = DiceExpression::parse_lenient(formula);
    if traits.tearing {
        expr = expr.with_tearing();
    }
    shape_faces(expr, traits)
}

fn shape_faces(mut expr: DiceExpression, traits: &WeaponTraits) -> DiceExpression {
    if let Some(min) = traits.proven {
        expr = expr.with_min_face(min);
    }
    if let Some(max) = traits.primitive {
        expr = expr.with_max_face(max);
    }
    expr
}

/// Extra d10 an Accurate weapon adds to each hit.
pub fn accurate_dice(dos: u32) -> u32 {
    (dos.saturating_sub(1) / 2).min(2)
}

/// Bonus d10 a horde adds to its attack.
pub fn horde_dice(magnitude: u32) -> u32 {
    (magnitude / 10).min(2)
}

/// Does a roll contain a die at or above its Righteous Fury face?
pub fn triggers_righteous_fury(roll: &DiceRoll, traits: &WeaponTraits) -> bool {
    roll.kept().any(|die| {
        let face = traits
            .vengeful
            .filter(|v| *v > 0)
            .unwrap_or(die.sides);
        die.raw >= face
    })
}

/// Evaluate a penetration formula.
///
/// Razor Sharp doubles penetration at three or more degrees of success. A
/// formula written `X[Y]` or `X(Y)` uses `Y` instead of doubling.
pub fn roll_penetration(
    formula: &str,
    tokens: &FormulaTokens,
    dos: u32,
    traits: &WeaponTraits,
    dice: &mut dyn DiceSource,
) -> i32 {
    let (base, razor_value) = split_bracket(formula);
    let base = DiceExpression::parse_lenient(&substitute_tokens(base, tokens))
        .evaluate(dice)
        .total;

    if traits.razor_sharp && dos >= 3 {
        razor_value.unwrap_or(base * 2)
    } else {
        base
    }
}

fn split_bracket(formula: &str) -> (&str, Option<i32>) {
    let Some(re) = BRACKET_OVERRIDE.as_ref() else {
        return (formula, None);
    };
    match re.captures(formula) {
        Some(caps) => {
            let base = caps.get(1).map_or("", |m| m.as_str());
            let value = caps.get(2).and_then(|m| m.as_str().parse().ok());
            (base, value)
        }
        None => (formula, None),
    }
}

/// Damage dealt by one hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitDamage {
    pub index: usize,
    pub location: HitLocation,
    pub damage_type: DamageType,
    /// The formula dice.
    pub roll: DiceRoll,
    pub accurate: Option<DiceRoll>,
    pub horde: Option<DiceRoll>,
    pub flat_bonus: i32,
    /// Added by the minimum-damage houserule.
    pub minimum_adjustment: u32,
    pub total: i32,
    pub penetration: i32,
    /// 1d5 critical roll when Righteous Fury triggered.
    pub righteous_fury: Option<u32>,
}

impl HitDamage {
    fn recompute_total(&mut self) {
        self.total = self.roll.total
            + self.accurate.as_ref().map_or(0, |r| r.total)
            + self.horde.as_ref().map_or(0, |r| r.total)
            + self.flat_bonus
            + self.minimum_adjustment as i32;
    }
}

/// Everything needed to roll an attack's damage.
#[derive(Debug, Clone)]
pub struct DamageRequest<'a> {
    pub damage: &'a str,
    pub penetration: &'a str,
    pub damage_type: DamageType,
    pub flat_bonus: i32,
    pub traits: &'a WeaponTraits,
    pub tokens: &'a FormulaTokens,
    pub dos: u32,
    pub hits: u32,
    pub first_location: HitLocation,
    pub additional_hits: &'a AdditionalHitTable,
    /// Accurate d10 added to every hit.
    pub accurate_dice: u32,
    /// Horde d10 added to the first hit.
    pub horde_dice: u32,
}

/// Roll damage for every hit of an attack.
pub fn roll_damage(request: &DamageRequest<'_>, dice: &mut dyn DiceSource) -> Vec<HitDamage> {
    let formula = substitute_tokens(request.damage, request.tokens);
    let expr = damage_expression(&formula, request.traits);
    let accurate_expr = shape_faces(DiceExpression::dice(request.accurate_dice, 10), request.traits);
    tracing::debug!(formula = %formula, hits = request.hits, "rolling damage");

    (0..request.hits as usize)
        .map(|index| {
            let roll = expr.evaluate(dice);
            let accurate =
                (request.accurate_dice > 0).then(|| accurate_expr.evaluate(dice));
            let horde = (index == 0 && request.horde_dice > 0)
                .then(|| DiceExpression::dice(request.horde_dice, 10).evaluate(dice));

            let fury = triggers_righteous_fury(&roll, request.traits)
                || accurate
                    .as_ref()
                    .is_some_and(|r| triggers_righteous_fury(r, request.traits));
            let righteous_fury = fury.then(|| dice.roll_die(5));

            let penetration = roll_penetration(
                request.penetration,
                request.tokens,
                request.dos,
                request.traits,
                dice,
            );

            let mut hit = HitDamage {
                index,
                location: location_for_hit(request.additional_hits, request.first_location, index),
                damage_type: request.damage_type,
                roll,
                accurate,
                horde,
                flat_bonus: request.flat_bonus,
                minimum_adjustment: 0,
                total: 0,
                penetration,
                righteous_fury,
            };
            hit.recompute_total();
            hit
        })
        .collect()
}

/// Raise the attack's lowest formula die to its degrees of success.
///
/// Compares the smallest formula die across all hits with `dos` and adds
/// the shortfall to the first hit holding that die, once per attack. Returns
/// the index of the adjusted hit.
pub fn apply_minimum_die(hits: &mut [HitDamage], dos: u32) -> Option<usize> {
    let (index, min_die) = hits
        .iter()
        .enumerate()
        .filter_map(|(i, hit)| hit.roll.min_die().map(|m| (i, m)))
        .min_by_key(|&(i, m)| (m, i))?;

    if min_die >= dos {
        return None;
    }
    let hit = &mut hits[index];
    hit.minimum_adjustment = dos - min_die;
    hit.recompute_total();
    tracing::debug!(hit = index, shortfall = dos - min_die, "minimum damage raised");
    Some(index)
}
