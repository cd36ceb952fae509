//! Dice expressions and dice sources.
//!
//! Supports the notation used by weapon and power profiles: `NdM`, flat
//! modifiers, several terms joined with `+`/`-`, and a drop-lowest suffix
//! (`3d10dl1`). Faces can be clamped from below (Proven) or above
//! (Primitive) before totals are computed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
    #[error("Cannot drop {drop} dice when only rolling {count} (in {notation})")]
    InvalidDropCount {
        drop: u32,
        count: u32,
        notation: String,
    },
}

/// Anything that can produce uniformly distributed die faces.
///
/// The engine never depends on the order of calls beyond a single
/// resolution, so a scripted source is enough to make any pipeline
/// deterministic.
pub trait DiceSource {
    /// Roll one die with `sides` faces, returning a value in `1..=sides`.
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Dice backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngDice<R> {
    rng: R,
}

impl<R: Rng> RngDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngDice<StdRng> {
    /// Seeded dice, reproducible across runs.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Dice seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> DiceSource for RngDice<R> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        self.rng.gen_range(1..=sides)
    }
}

/// A queue of predetermined faces.
///
/// Each call pops the next face, reduced into `1..=sides`. When the queue
/// runs dry the source keeps answering `1`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    faces: VecDeque<u32>,
}

impl ScriptedDice {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
        }
    }

    /// Append more faces to the end of the script.
    pub fn push(&mut self, faces: impl IntoIterator<Item = u32>) {
        self.faces.extend(faces);
    }

    /// Faces not yet consumed.
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        match self.faces.pop_front() {
            Some(face) => ((face.max(1) - 1) % sides) + 1,
            None => 1,
        }
    }
}

/// One `NdM` term of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
    /// `-1` for subtracted terms.
    pub sign: i32,
    pub drop_lowest: u32,
    /// Every face below this value counts as this value.
    pub min_face: Option<u32>,
    /// Every face above this value counts as this value.
    pub max_face: Option<u32>,
}

impl DiceTerm {
    pub fn new(count: u32, sides: u32) -> Self {
        Self {
            count,
            sides,
            sign: 1,
            drop_lowest: 0,
            min_face: None,
            max_face: None,
        }
    }

    fn clamp_face(&self, raw: u32) -> u32 {
        let mut value = raw;
        if let Some(min) = self.min_face {
            value = value.max(min);
        }
        if let Some(max) = self.max_face {
            value = value.min(max);
        }
        value
    }
}

/// A complete dice expression (e.g. `2d10+3`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub terms: Vec<DiceTerm>,
    pub modifier: i32,
    pub original: String,
}

impl DiceExpression {
    /// A bare flat value with no dice.
    pub fn flat(value: i32) -> Self {
        Self {
            terms: Vec::new(),
            modifier: value,
            original: value.to_string(),
        }
    }

    /// `count` dice of `sides` faces.
    pub fn dice(count: u32, sides: u32) -> Self {
        Self {
            terms: vec![DiceTerm::new(count, sides)],
            modifier: 0,
            original: format!("{count}d{sides}"),
        }
    }

    /// Parse a dice notation string, failing on the first malformed term.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let normalized = notation.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut expr = DiceExpression {
            terms: Vec::new(),
            modifier: 0,
            original: normalized.clone(),
        };
        for (sign, term) in split_terms(&normalized) {
            expr.push_term(&term, sign)?;
        }

        if expr.terms.is_empty() && expr.modifier == 0 && !has_zero_literal(&normalized) {
            return Err(DiceError::NoDice);
        }
        Ok(expr)
    }

    /// Parse a notation string, dropping malformed terms instead of failing.
    ///
    /// Dropped terms count as zero. An expression with nothing usable left
    /// evaluates to zero.
    pub fn parse_lenient(notation: &str) -> Self {
        let normalized = notation.trim().to_lowercase();
        let mut expr = DiceExpression {
            terms: Vec::new(),
            modifier: 0,
            original: normalized.clone(),
        };
        for (sign, term) in split_terms(&normalized) {
            if let Err(err) = expr.push_term(&term, sign) {
                tracing::warn!(notation = %notation, term = %term, error = %err, "dropping malformed dice term");
            }
        }
        expr
    }

    fn push_term(&mut self, s: &str, sign: i32) -> Result<(), DiceError> {
        let Some(d_pos) = s.find('d') else {
            let value: i32 = s
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            self.modifier += sign * value;
            return Ok(());
        };

        let count_str = &s[..d_pos];
        let rest = &s[d_pos + 1..];

        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
        };

        let (sides_str, drop_lowest) = match rest.find("dl") {
            Some(dl_pos) => {
                let drop_str = &rest[dl_pos + 2..];
                let drop: u32 = if drop_str.is_empty() {
                    1
                } else {
                    drop_str
                        .parse()
                        .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
                };
                (&rest[..dl_pos], drop)
            }
            None => (rest, 0),
        };

        let sides: u32 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
        if sides == 0 {
            return Err(DiceError::InvalidDieSize(sides));
        }
        if drop_lowest >= count && count > 0 {
            return Err(DiceError::InvalidDropCount {
                drop: drop_lowest,
                count,
                notation: s.to_string(),
            });
        }

        self.terms.push(DiceTerm {
            count,
            sides,
            sign,
            drop_lowest,
            min_face: None,
            max_face: None,
        });
        Ok(())
    }

    /// Roll one extra die per term and drop the lowest (Tearing).
    pub fn with_tearing(mut self) -> Self {
        for term in &mut self.terms {
            term.count += 1;
            term.drop_lowest += 1;
        }
        self
    }

    /// Count every face below `min` as `min` (Proven).
    pub fn with_min_face(mut self, min: u32) -> Self {
        for term in &mut self.terms {
            term.min_face = Some(term.min_face.map_or(min, |m| m.max(min)));
        }
        self
    }

    /// Count every face above `max` as `max` (Primitive).
    pub fn with_max_face(mut self, max: u32) -> Self {
        for term in &mut self.terms {
            term.max_face = Some(term.max_face.map_or(max, |m| m.min(max)));
        }
        self
    }

    /// Add `count` extra dice as a separate term.
    pub fn with_extra_dice(mut self, count: u32, sides: u32) -> Self {
        if count > 0 {
            self.terms.push(DiceTerm::new(count, sides));
        }
        self
    }

    /// Add a flat amount.
    pub fn with_modifier(mut self, amount: i32) -> Self {
        self.modifier += amount;
        self
    }

    pub fn has_dice(&self) -> bool {
        self.terms.iter().any(|t| t.count > 0)
    }

    /// Roll the expression against a dice source.
    pub fn evaluate(&self, source: &mut dyn DiceSource) -> DiceRoll {
        let mut dice = Vec::new();
        let mut total = self.modifier;

        for (term_index, term) in self.terms.iter().enumerate() {
            let mut rolled: Vec<DieResult> = (0..term.count)
                .map(|_| {
                    let raw = source.roll_die(term.sides);
                    DieResult {
                        term: term_index,
                        sides: term.sides,
                        raw,
                        value: term.clamp_face(raw),
                        kept: true,
                    }
                })
                .collect();

            if term.drop_lowest > 0 {
                let mut order: Vec<usize> = (0..rolled.len()).collect();
                order.sort_by_key(|&i| (rolled[i].value, i));
                for &i in order.iter().take(term.drop_lowest as usize) {
                    rolled[i].kept = false;
                }
            }

            let subtotal: i32 = rolled
                .iter()
                .filter(|d| d.kept)
                .map(|d| d.value as i32)
                .sum();
            total += term.sign * subtotal;
            dice.extend(rolled);
        }

        DiceRoll {
            formula: self.original.clone(),
            total,
            dice,
        }
    }
}

/// Split a normalized expression into signed terms.
fn split_terms(notation: &str) -> Vec<(i32, String)> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut sign: i32 = 1;

    for ch in notation.chars() {
        match ch {
            '+' | '-' => {
                if !current.is_empty() {
                    terms.push((sign, std::mem::take(&mut current)));
                }
                sign = if ch == '+' { 1 } else { -1 };
            }
            c if c.is_whitespace() => continue,
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        terms.push((sign, current));
    }
    terms
}

fn has_zero_literal(notation: &str) -> bool {
    split_terms(notation)
        .iter()
        .any(|(_, t)| t.chars().all(|c| c == '0'))
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// One rolled die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieResult {
    /// Index of the term this die belongs to.
    pub term: usize,
    pub sides: u32,
    /// Face as rolled.
    pub raw: u32,
    /// Face after Proven/Primitive clamping.
    pub value: u32,
    /// False for dice removed by drop-lowest.
    pub kept: bool,
}

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub formula: String,
    pub total: i32,
    pub dice: Vec<DieResult>,
}

impl DiceRoll {
    /// Dice that count toward the total.
    pub fn kept(&self) -> impl Iterator<Item = &DieResult> {
        self.dice.iter().filter(|d| d.kept)
    }

    /// Smallest counted face, if any dice were rolled.
    pub fn min_die(&self) -> Option<u32> {
        self.kept().map(|d| d.value).min()
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<String> = self
            .dice
            .iter()
            .map(|d| {
                if d.kept {
                    d.value.to_string()
                } else {
                    format!("({})", d.value)
                }
            })
            .collect();
        write!(f, "[{}] = {}", shown.join(", "), self.total)
    }
}

/// Roll a single percentile die.
pub fn roll_d100(source: &mut dyn DiceSource) -> u32 {
    source.roll_die(100)
}

/// Convenience function to roll a notation string with fresh entropy.
pub fn roll(notation: &str) -> Result<DiceRoll, DiceError> {
    let expr = DiceExpression::parse(notation)?;
    Ok(expr.evaluate(&mut RngDice::from_entropy()))
}
