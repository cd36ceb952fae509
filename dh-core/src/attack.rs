//! Attack types and rate-of-fire resolution.
//!
//! Every attack type carries a profile `{modifier, hit_margin, max_hits}`.
//! Extra hits come from degrees of success beyond the first, one per
//! `hit_margin` degrees, capped by the profile and by the rounds that could
//! actually hit.

use crate::items::RateOfFire;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    Standard,
    Bolt,
    Blast,
    SemiAuto,
    Swift,
    Barrage,
    FullAuto,
    Lightning,
    WideAutoSemi,
    WideAutoFull,
    SuppressionSemi,
    SuppressionFull,
    CalledShot,
    Charge,
    AllOut,
}

impl AttackType {
    pub fn all() -> [AttackType; 15] {
        [
            AttackType::Standard,
            AttackType::Bolt,
            AttackType::Blast,
            AttackType::SemiAuto,
            AttackType::Swift,
            AttackType::Barrage,
            AttackType::FullAuto,
            AttackType::Lightning,
            AttackType::WideAutoSemi,
            AttackType::WideAutoFull,
            AttackType::SuppressionSemi,
            AttackType::SuppressionFull,
            AttackType::CalledShot,
            AttackType::Charge,
            AttackType::AllOut,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttackType::Standard => "Standard Attack",
            AttackType::Bolt => "Bolt",
            AttackType::Blast => "Blast",
            AttackType::SemiAuto => "Semi-Auto Burst",
            AttackType::Swift => "Swift Attack",
            AttackType::Barrage => "Barrage",
            AttackType::FullAuto => "Full-Auto Burst",
            AttackType::Lightning => "Lightning Attack",
            AttackType::WideAutoSemi => "Wide Auto (Semi)",
            AttackType::WideAutoFull => "Wide Auto (Full)",
            AttackType::SuppressionSemi => "Suppressing Fire (Semi)",
            AttackType::SuppressionFull => "Suppressing Fire (Full)",
            AttackType::CalledShot => "Called Shot",
            AttackType::Charge => "Charge",
            AttackType::AllOut => "All Out Attack",
        }
    }

    /// Usable with a melee weapon.
    pub fn allows_melee(&self) -> bool {
        matches!(
            self,
            AttackType::Standard
                | AttackType::Swift
                | AttackType::Lightning
                | AttackType::CalledShot
                | AttackType::Charge
                | AttackType::AllOut
        )
    }

    /// Usable with a ranged weapon.
    pub fn allows_ranged(&self) -> bool {
        matches!(
            self,
            AttackType::Standard
                | AttackType::SemiAuto
                | AttackType::FullAuto
                | AttackType::WideAutoSemi
                | AttackType::WideAutoFull
                | AttackType::SuppressionSemi
                | AttackType::SuppressionFull
                | AttackType::CalledShot
        )
    }

    /// Usable when manifesting a psychic power.
    pub fn allows_psychic(&self) -> bool {
        matches!(
            self,
            AttackType::Bolt | AttackType::Blast | AttackType::Barrage | AttackType::Lightning
        )
    }

    /// Attack types that fire one round.
    pub fn is_single_shot(&self) -> bool {
        matches!(
            self,
            AttackType::Standard | AttackType::CalledShot | AttackType::Bolt | AttackType::Blast
        )
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Which rate-of-fire value an attack draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    Single,
    Burst,
    Full,
}

/// Hit cap of an attack type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitCap {
    Fixed(u32),
    Burst,
    Full,
}

impl HitCap {
    pub fn resolve(&self, rate: &RateOfFire) -> u32 {
        match self {
            HitCap::Fixed(n) => *n,
            HitCap::Burst => rate.burst,
            HitCap::Full => rate.full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackProfile {
    pub modifier: i32,
    /// Degrees of success needed per additional hit.
    pub hit_margin: u32,
    pub max_hits: HitCap,
    pub mode: FireMode,
    /// Rounds of the volley that cannot hit (wide-auto, suppression).
    #[serde(default)]
    pub lost_shots: u32,
}

impl AttackProfile {
    pub fn new(modifier: i32, hit_margin: u32, max_hits: HitCap, mode: FireMode) -> Self {
        Self {
            modifier,
            hit_margin,
            max_hits,
            mode,
            lost_shots: 0,
        }
    }

    pub fn losing(mut self, shots: u32) -> Self {
        self.lost_shots = shots;
        self
    }

    /// Rounds an attack of this type fires from `rate`.
    pub fn rounds(&self, rate: &RateOfFire) -> u32 {
        match self.mode {
            FireMode::Single => 1,
            FireMode::Burst => rate.burst,
            FireMode::Full => rate.full,
        }
    }

    /// Rounds of the volley that can land.
    pub fn shots_fired(&self, rate: &RateOfFire) -> u32 {
        self.rounds(rate).saturating_sub(self.lost_shots)
    }
}

pub type AttackTable = BTreeMap<AttackType, AttackProfile>;

/// The built-in attack-type table.
pub fn default_attack_profiles() -> AttackTable {
    use AttackType::*;
    use FireMode::{Burst, Full, Single};

    BTreeMap::from([
        (Standard, AttackProfile::new(10, 1, HitCap::Fixed(1), Single)),
        (Bolt, AttackProfile::new(0, 1, HitCap::Fixed(1), Single)),
        (Blast, AttackProfile::new(0, 1, HitCap::Fixed(1), Single)),
        (SemiAuto, AttackProfile::new(0, 2, HitCap::Burst, Burst)),
        (Swift, AttackProfile::new(0, 2, HitCap::Burst, Burst)),
        (Barrage, AttackProfile::new(0, 2, HitCap::Burst, Burst)),
        (FullAuto, AttackProfile::new(-10, 1, HitCap::Full, Full)),
        (Lightning, AttackProfile::new(-10, 1, HitCap::Full, Full)),
        (WideAutoSemi, AttackProfile::new(0, 2, HitCap::Burst, Burst).losing(2)),
        (WideAutoFull, AttackProfile::new(-10, 1, HitCap::Full, Full).losing(2)),
        (SuppressionSemi, AttackProfile::new(-20, 2, HitCap::Burst, Burst).losing(2)),
        (SuppressionFull, AttackProfile::new(-20, 2, HitCap::Full, Full).losing(2)),
        (CalledShot, AttackProfile::new(-20, 1, HitCap::Fixed(1), Single)),
        (Charge, AttackProfile::new(20, 1, HitCap::Fixed(1), Single)),
        (AllOut, AttackProfile::new(30, 1, HitCap::Fixed(1), Single)),
    ])
}

/// Inputs to hit counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitRoll {
    pub dos: u32,
    pub max_hits: u32,
    /// Rounds that could land; `None` when unlimited (melee, psychic).
    pub shots_fired: Option<u32>,
    pub storm: bool,
    pub twin_linked: bool,
    pub evasion_dos: u32,
}

/// Number of hits an attack scores.
pub fn count_hits(profile: &AttackProfile, roll: &HitRoll) -> u32 {
    if roll.dos == 0 {
        return 0;
    }
    let storm = if roll.storm { 2 } else { 1 };
    let margin = profile.hit_margin.max(1);

    let mut hits = storm * (1 + (roll.dos - 1) / margin);
    hits = hits.min(roll.max_hits * storm);
    if let Some(shots) = roll.shots_fired {
        hits = hits.min(shots * storm);
    }

    hits = hits.saturating_sub(roll.evasion_dos);
    if roll.twin_linked && hits > 0 {
        hits += 1;
    }
    hits
}
