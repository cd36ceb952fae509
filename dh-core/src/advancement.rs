//! Experience spend.
//!
//! In manual mode the stored cost of every advance is summed. In automatic
//! mode every cost is recomputed from the advance itself and the aptitudes
//! it shares with the character.

use crate::character::{Characteristic, Combatant, Skill, Speciality};
use crate::config::{ExperienceMode, XpTables};
use crate::items::Talent;
use serde::{Deserialize, Serialize};

/// Every character has this aptitude.
pub const GENERAL_APTITUDE: &str = "General";

/// Aptitudes of an advance found among the character's, capped at two.
pub fn matched_aptitudes(tags: &[String], owned: &[String]) -> usize {
    tags.iter()
        .filter(|tag| {
            tag.eq_ignore_ascii_case(GENERAL_APTITUDE)
                || owned.iter().any(|o| o.eq_ignore_ascii_case(tag))
        })
        .count()
        .min(2)
}

/// Characteristic advance: one table step per five points.
pub fn characteristic_cost(tables: &XpTables, advance: i32, matched: usize) -> u32 {
    let steps = (advance.max(0) / 5) as usize;
    tables
        .characteristic
        .iter()
        .take(steps)
        .map(|row| row[matched.min(2)])
        .sum()
}

/// Ranks bought in a skill: known is one, each +10 after that another.
pub fn skill_ranks(advance: i32) -> u32 {
    if advance < 0 {
        0
    } else {
        (advance / 10) as u32 + 1
    }
}

/// Skill or speciality advance: `(step + 1) × (3 − matched) × 100` per
/// rank, skipping the first rank when it came free.
pub fn skill_cost(tables: &XpTables, advance: i32, starter: bool, matched: usize) -> u32 {
    let ranks = skill_ranks(advance);
    let first = if starter { 1 } else { 0 };
    let missing = 3 - matched.min(2) as u32;
    (first..ranks)
        .map(|step| (step + 1) * missing * tables.skill_step)
        .sum()
}

pub fn talent_cost(tables: &XpTables, tier: u8, starter: bool, matched: usize) -> u32 {
    if starter || !(1..=3).contains(&tier) {
        return 0;
    }
    tables.talent[tier as usize - 1][matched.min(2)]
}

/// `max(0, (R(R+1)/2 − 1) × step)`.
/// Saturates at `u32::MAX`.
pub fn psy_rating_cost(tables: &XpTables, rating: u32) -> u32 {
    let rating = u64::from(rating);
    let triangle = rating * (rating + 1) / 2;
    let cost = triangle
        .saturating_sub(1)
        .saturating_mul(u64::from(tables.psy_rating_step));
    u32::try_from(cost).unwrap_or(u32::MAX)
}

/// Spend per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceSummary {
    pub total: u32,
    pub characteristics: u32,
    pub skills: u32,
    pub talents: u32,
    pub psychic: u32,
    pub other: u32,
}

impl ExperienceSummary {
    pub fn total_spent(&self) -> u32 {
        [self.skills, self.talents, self.psychic, self.other]
            .into_iter()
            .fold(self.characteristics, u32::saturating_add)
    }

    /// Unspent experience. Negative when overspent.
    pub fn remaining(&self) -> i64 {
        self.total as i64 - self.total_spent() as i64
    }
}

/// Compute a combatant's experience spend.
pub fn summarize(combatant: &Combatant, mode: ExperienceMode, tables: &XpTables) -> ExperienceSummary {
    let owned = &combatant.aptitudes;
    let chars = &combatant.characteristics;
    let powers: u32 = combatant.psychic_powers.iter().map(|p| p.cost).sum();

    let summary = match mode {
        ExperienceMode::Manual => ExperienceSummary {
            total: combatant.experience.value,
            characteristics: chars.iter().map(|(_, c)| c.cost).sum(),
            skills: combatant
                .skills
                .iter()
                .map(|s| s.cost + s.specialities.iter().map(|sp| sp.cost).sum::<u32>())
                .sum(),
            talents: combatant.talents.iter().map(|t| t.cost).sum(),
            psychic: combatant.experience.psy_rating_cost + powers,
            other: combatant.experience.other,
        },
        ExperienceMode::Automatic => ExperienceSummary {
            total: combatant.experience.value,
            characteristics: chars
                .iter()
                .map(|(_, c)| auto_characteristic(tables, c, owned))
                .sum(),
            skills: combatant
                .skills
                .iter()
                .map(|s| auto_skill(tables, s, owned))
                .sum(),
            talents: combatant
                .talents
                .iter()
                .map(|t| auto_talent(tables, t, owned))
                .sum(),
            psychic: psy_rating_cost(tables, combatant.psy.rating).saturating_add(powers),
            other: combatant.experience.other,
        },
    };
    tracing::debug!(
        combatant = %combatant.name,
        spent = summary.total_spent(),
        remaining = summary.remaining(),
        "experience summary"
    );
    summary
}

fn auto_characteristic(tables: &XpTables, c: &Characteristic, owned: &[String]) -> u32 {
    characteristic_cost(tables, c.advance, matched_aptitudes(&c.aptitudes, owned))
}

fn auto_skill(tables: &XpTables, skill: &Skill, owned: &[String]) -> u32 {
    let matched = matched_aptitudes(&skill.aptitudes, owned);
    let own = skill_cost(tables, skill.advance, skill.starter, matched);
    let specialities: u32 = skill
        .specialities
        .iter()
        .map(|sp: &Speciality| skill_cost(tables, sp.advance, sp.starter, matched))
        .sum();
    own + specialities
}

fn auto_talent(tables: &XpTables, talent: &Talent, owned: &[String]) -> u32 {
    talent_cost(
        tables,
        talent.tier,
        talent.starter,
        matched_aptitudes(&talent.aptitudes, owned),
    )
}
