//! Weapons, ammunition, psychic powers and talents, plus a small armoury of
//! standard weapon profiles that can be referenced by name.

use crate::character::CharacteristicKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weapon class. Everything except `Melee` fires ammunition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponClass {
    Melee,
    Pistol,
    Basic,
    Heavy,
    Thrown,
    Launcher,
}

impl WeaponClass {
    pub fn is_melee(&self) -> bool {
        matches!(self, WeaponClass::Melee)
    }

    pub fn is_ranged(&self) -> bool {
        !self.is_melee()
    }

    /// Characteristic used to attack with this class.
    pub fn characteristic(&self) -> CharacteristicKind {
        if self.is_melee() {
            CharacteristicKind::WeaponSkill
        } else {
            CharacteristicKind::BallisticSkill
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Energy,
    Explosive,
    #[default]
    Impact,
    Rending,
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DamageType::Energy => "Energy",
            DamageType::Explosive => "Explosive",
            DamageType::Impact => "Impact",
            DamageType::Rending => "Rending",
        };
        write!(f, "{name}")
    }
}

/// Rounds fired per attack mode. Zero means the mode is unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateOfFire {
    pub single: u32,
    pub burst: u32,
    pub full: u32,
}

impl RateOfFire {
    pub fn new(single: u32, burst: u32, full: u32) -> Self {
        Self {
            single,
            burst,
            full,
        }
    }
}

/// Loaded ammunition. A clip with `max == 0` never runs dry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub value: u32,
    pub max: u32,
}

impl Clip {
    pub fn full(max: u32) -> Self {
        Self { value: max, max }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max == 0
    }

    pub fn can_fire(&self, rounds: u32) -> bool {
        self.is_unlimited() || self.value >= rounds
    }
}

/// A weapon profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub class: WeaponClass,
    /// Damage formula, e.g. `1d10+3` or `1d10+SB`.
    pub damage: String,
    #[serde(default)]
    pub damage_type: DamageType,
    /// Penetration formula, usually a flat number.
    #[serde(default)]
    pub penetration: String,
    #[serde(default)]
    pub rate_of_fire: RateOfFire,
    #[serde(default)]
    pub clip: Clip,
    /// Free-text trait list.
    #[serde(default)]
    pub traits: String,
    /// Range in metres; zero for melee.
    #[serde(default)]
    pub range: u32,
    /// Flat damage added to every hit.
    #[serde(default)]
    pub damage_bonus: i32,
    /// Name of the linked ammunition used to reload.
    #[serde(default)]
    pub ammunition: Option<String>,
    #[serde(default)]
    pub cost: u32,
}

impl Weapon {
    pub fn new(name: impl Into<String>, class: WeaponClass, damage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class,
            damage: damage.into(),
            damage_type: DamageType::Impact,
            penetration: "0".to_string(),
            rate_of_fire: if class.is_melee() {
                RateOfFire::default()
            } else {
                RateOfFire::new(1, 0, 0)
            },
            clip: Clip::default(),
            traits: String::new(),
            range: 0,
            damage_bonus: 0,
            ammunition: None,
            cost: 0,
        }
    }

    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    pub fn with_penetration(mut self, penetration: impl Into<String>) -> Self {
        self.penetration = penetration.into();
        self
    }

    pub fn with_rate_of_fire(mut self, single: u32, burst: u32, full: u32) -> Self {
        self.rate_of_fire = RateOfFire::new(single, burst, full);
        self
    }

    pub fn with_clip(mut self, max: u32) -> Self {
        self.clip = Clip::full(max);
        self
    }

    pub fn with_traits(mut self, traits: impl Into<String>) -> Self {
        self.traits = traits.into();
        self
    }

    pub fn with_range(mut self, range: u32) -> Self {
        self.range = range;
        self
    }

    pub fn with_damage_bonus(mut self, bonus: i32) -> Self {
        self.damage_bonus = bonus;
        self
    }

    pub fn with_ammunition(mut self, name: impl Into<String>) -> Self {
        self.ammunition = Some(name.into());
        self
    }

    pub fn is_ranged(&self) -> bool {
        self.class.is_ranged()
    }
}

/// A stack of reloads for some weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ammunition {
    pub name: String,
    pub quantity: u32,
}

impl Ammunition {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// A psychic power. Powers with an empty damage formula are not attacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsychicPower {
    pub name: String,
    #[serde(default)]
    pub damage: String,
    #[serde(default)]
    pub damage_type: DamageType,
    #[serde(default)]
    pub penetration: String,
    #[serde(default)]
    pub traits: String,
    /// Modifier applied to the Focus Power test.
    #[serde(default)]
    pub focus_modifier: i32,
    pub characteristic: CharacteristicKind,
    #[serde(default)]
    pub cost: u32,
}

impl PsychicPower {
    pub fn new(name: impl Into<String>, characteristic: CharacteristicKind) -> Self {
        Self {
            name: name.into(),
            damage: String::new(),
            damage_type: DamageType::Energy,
            penetration: "0".to_string(),
            traits: String::new(),
            focus_modifier: 0,
            characteristic,
            cost: 0,
        }
    }

    pub fn with_damage(mut self, damage: impl Into<String>, penetration: impl Into<String>) -> Self {
        self.damage = damage.into();
        self.penetration = penetration.into();
        self
    }

    pub fn with_traits(mut self, traits: impl Into<String>) -> Self {
        self.traits = traits.into();
        self
    }

    pub fn with_focus_modifier(mut self, modifier: i32) -> Self {
        self.focus_modifier = modifier;
        self
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn is_attack(&self) -> bool {
        !self.damage.trim().is_empty()
    }
}

/// A talent. Tier 1..=3; talents outside that range cost nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talent {
    pub name: String,
    pub tier: u8,
    #[serde(default)]
    pub aptitudes: Vec<String>,
    #[serde(default)]
    pub starter: bool,
    #[serde(default)]
    pub cost: u32,
}

impl Talent {
    pub fn new(name: impl Into<String>, tier: u8, aptitudes: &[&str]) -> Self {
        Self {
            name: name.into(),
            tier,
            aptitudes: aptitudes.iter().map(|a| a.to_string()).collect(),
            starter: false,
            cost: 0,
        }
    }

    pub fn starter(mut self) -> Self {
        self.starter = true;
        self
    }
}

/// Get a standard weapon by name.
pub fn get_weapon(name: &str) -> Option<Weapon> {
    let name_lower = name.to_lowercase();
    WEAPONS
        .iter()
        .find(|w| w.name.to_lowercase() == name_lower)
        .cloned()
}

lazy_static::lazy_static! {
    /// Standard weapon profiles.
    pub static ref WEAPONS: Vec<Weapon> = vec![
        // Pistols
        Weapon::new("Laspistol", WeaponClass::Pistol, "1d10+2")
            .with_damage_type(DamageType::Energy)
            .with_rate_of_fire(1, 2, 0)
            .with_clip(30)
            .with_traits("Reliable")
            .with_range(30)
            .with_ammunition("Laspistol Charge Pack"),
        Weapon::new("Autopistol", WeaponClass::Pistol, "1d10+2")
            .with_rate_of_fire(1, 0, 6)
            .with_clip(18)
            .with_range(30)
            .with_ammunition("Autopistol Magazine"),
        Weapon::new("Stub Revolver", WeaponClass::Pistol, "1d10+3")
            .with_clip(6)
            .with_traits("Reliable")
            .with_range(30),
        Weapon::new("Bolt Pistol", WeaponClass::Pistol, "1d10+4")
            .with_damage_type(DamageType::Explosive)
            .with_penetration("4")
            .with_rate_of_fire(1, 2, 0)
            .with_clip(8)
            .with_traits("Tearing")
            .with_range(30)
            .with_ammunition("Bolt Shells"),

        // Basic
        Weapon::new("Lasgun", WeaponClass::Basic, "1d10+3")
            .with_damage_type(DamageType::Energy)
            .with_rate_of_fire(1, 3, 0)
            .with_clip(60)
            .with_traits("Reliable")
            .with_range(100)
            .with_ammunition("Lasgun Charge Pack"),
        Weapon::new("Autogun", WeaponClass::Basic, "1d10+3")
            .with_rate_of_fire(1, 3, 10)
            .with_clip(30)
            .with_range(90)
            .with_ammunition("Autogun Magazine"),
        Weapon::new("Boltgun", WeaponClass::Basic, "1d10+5")
            .with_damage_type(DamageType::Explosive)
            .with_penetration("4")
            .with_rate_of_fire(1, 3, 0)
            .with_clip(24)
            .with_traits("Tearing")
            .with_range(100)
            .with_ammunition("Bolt Shells"),
        Weapon::new("Plasma Gun", WeaponClass::Basic, "1d10+7")
            .with_damage_type(DamageType::Energy)
            .with_penetration("6")
            .with_rate_of_fire(1, 2, 0)
            .with_clip(40)
            .with_traits("Maximal, Overheats")
            .with_range(90),

        // Heavy
        Weapon::new("Heavy Stubber", WeaponClass::Heavy, "1d10+4")
            .with_penetration("3")
            .with_rate_of_fire(0, 0, 8)
            .with_clip(80)
            .with_range(120),

        // Melee
        Weapon::new("Knife", WeaponClass::Melee, "1d5+SB")
            .with_damage_type(DamageType::Rending),
        Weapon::new("Sword", WeaponClass::Melee, "1d10+SB")
            .with_damage_type(DamageType::Rending)
            .with_traits("Balanced"),
        Weapon::new("Chainsword", WeaponClass::Melee, "1d10+2+SB")
            .with_damage_type(DamageType::Rending)
            .with_penetration("2")
            .with_traits("Balanced, Tearing"),
        Weapon::new("Power Sword", WeaponClass::Melee, "1d10+5+SB")
            .with_damage_type(DamageType::Energy)
            .with_penetration("5")
            .with_traits("Balanced, Power Field"),
        Weapon::new("Great Weapon", WeaponClass::Melee, "2d10+SB")
            .with_damage_type(DamageType::Rending)
            .with_penetration("2")
            .with_traits("Unbalanced"),
        Weapon::new("Force Staff", WeaponClass::Melee, "1d10+SB")
            .with_traits("Force"),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_weapon_case_insensitive() {
        let weapon = get_weapon("lasgun").unwrap();
        assert_eq!(weapon.class, WeaponClass::Basic);
        assert_eq!(weapon.clip, Clip::full(60));
        assert!(get_weapon("Meltagun of Doom").is_none());
    }

    #[test]
    fn test_clip_limits() {
        assert!(Clip::default().can_fire(100));
        let clip = Clip { value: 2, max: 30 };
        assert!(clip.can_fire(2));
        assert!(!clip.can_fire(3));
    }

    #[test]
    fn test_melee_has_no_rate_of_fire() {
        let sword = get_weapon("Sword").unwrap();
        assert_eq!(sword.rate_of_fire, RateOfFire::default());
        assert!(!sword.is_ranged());
        assert_eq!(sword.class.characteristic(), CharacteristicKind::WeaponSkill);
    }
}
