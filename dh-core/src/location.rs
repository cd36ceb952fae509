//! Hit locations and location-based armour.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six body locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitLocation {
    Head,
    RightArm,
    LeftArm,
    Body,
    RightLeg,
    LeftLeg,
}

impl HitLocation {
    pub fn all() -> [HitLocation; 6] {
        [
            HitLocation::Head,
            HitLocation::RightArm,
            HitLocation::LeftArm,
            HitLocation::Body,
            HitLocation::RightLeg,
            HitLocation::LeftLeg,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            HitLocation::Head => "Head",
            HitLocation::RightArm => "Right Arm",
            HitLocation::LeftArm => "Left Arm",
            HitLocation::Body => "Body",
            HitLocation::RightLeg => "Right Leg",
            HitLocation::LeftLeg => "Left Leg",
        }
    }

    /// Location struck by an attack whose test result was `roll`.
    ///
    /// The percentile result is read with its digits reversed (`42` → `24`,
    /// `5` → `50`, `100` → `1`) and bucketed.
    pub fn from_attack_roll(roll: u32) -> HitLocation {
        let digits = format!("{roll:02}");
        let reversed: String = digits.chars().rev().collect();
        let value: u32 = reversed.parse().unwrap_or(0);

        match value {
            0..=10 => HitLocation::Head,
            11..=20 => HitLocation::RightArm,
            21..=30 => HitLocation::LeftArm,
            31..=70 => HitLocation::Body,
            71..=85 => HitLocation::RightLeg,
            86..=100 => HitLocation::LeftLeg,
            _ => HitLocation::Body,
        }
    }
}

impl fmt::Display for HitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One value per body location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByLocation<T> {
    pub head: T,
    pub right_arm: T,
    pub left_arm: T,
    pub body: T,
    pub right_leg: T,
    pub left_leg: T,
}

impl<T: Clone> ByLocation<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            head: value.clone(),
            right_arm: value.clone(),
            left_arm: value.clone(),
            body: value.clone(),
            right_leg: value.clone(),
            left_leg: value,
        }
    }
}

impl<T> ByLocation<T> {
    pub fn get(&self, location: HitLocation) -> &T {
        match location {
            HitLocation::Head => &self.head,
            HitLocation::RightArm => &self.right_arm,
            HitLocation::LeftArm => &self.left_arm,
            HitLocation::Body => &self.body,
            HitLocation::RightLeg => &self.right_leg,
            HitLocation::LeftLeg => &self.left_leg,
        }
    }

    pub fn get_mut(&mut self, location: HitLocation) -> &mut T {
        match location {
            HitLocation::Head => &mut self.head,
            HitLocation::RightArm => &mut self.right_arm,
            HitLocation::LeftArm => &mut self.left_arm,
            HitLocation::Body => &mut self.body,
            HitLocation::RightLeg => &mut self.right_leg,
            HitLocation::LeftLeg => &mut self.left_leg,
        }
    }
}

/// Location sequence followed by the second and later hits of one attack,
/// keyed by where the first hit landed.
pub type AdditionalHitTable = ByLocation<[HitLocation; 5]>;

pub fn default_additional_hits() -> AdditionalHitTable {
    use HitLocation::*;
    ByLocation {
        head: [Head, RightArm, Body, LeftArm, Body],
        right_arm: [RightArm, RightArm, Head, Body, RightArm],
        left_arm: [LeftArm, LeftArm, Head, Body, LeftArm],
        body: [Body, RightArm, Head, LeftArm, Body],
        right_leg: [RightLeg, Body, RightArm, Head, Body],
        left_leg: [LeftLeg, Body, LeftArm, Head, Body],
    }
}

/// Location of hit number `index` (0-based) of an attack.
///
/// Indices past the end of the sequence stay on its last entry.
pub fn location_for_hit(table: &AdditionalHitTable, first: HitLocation, index: usize) -> HitLocation {
    if index == 0 {
        return first;
    }
    let sequence = table.get(first);
    sequence[index.min(sequence.len() - 1)]
}

/// One piece of worn armour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmourItem {
    pub name: String,
    pub points: ByLocation<i32>,
    /// Layered protection that stacks with other armour instead of
    /// competing with it.
    #[serde(default)]
    pub additive: bool,
    #[serde(default = "default_true")]
    pub equipped: bool,
}

fn default_true() -> bool {
    true
}

impl ArmourItem {
    pub fn new(name: impl Into<String>, points: ByLocation<i32>) -> Self {
        Self {
            name: name.into(),
            points,
            additive: false,
            equipped: true,
        }
    }

    pub fn additive(mut self) -> Self {
        self.additive = true;
        self
    }

    pub fn unequipped(mut self) -> Self {
        self.equipped = false;
        self
    }
}

/// Armour points worn at one location, before toughness.
///
/// Non-additive items compete (the best one counts); additive items stack.
pub fn worn_armour(items: &[ArmourItem], location: HitLocation) -> i32 {
    let equipped = items.iter().filter(|i| i.equipped);
    let best = equipped
        .clone()
        .filter(|i| !i.additive)
        .map(|i| *i.points.get(location))
        .max()
        .unwrap_or(0);
    let layered: i32 = equipped
        .filter(|i| i.additive)
        .map(|i| *i.points.get(location))
        .sum();
    best + layered
}

/// Per-location armour adjustments of a combatant. Worn armour itself is
/// always read from the equipped items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmourLocation {
    #[serde(default)]
    pub temp_modifier: i32,
}

impl ArmourLocation {
    pub fn total(&self, toughness_bonus: i32, worn: i32) -> i32 {
        toughness_bonus + worn + self.temp_modifier
    }
}
