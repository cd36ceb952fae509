//! Weapon and psychic-power trait extraction.
//!
//! Trait lists arrive as free text ("Proven (3), Tearing, Twin-Linked") in
//! either English or German. The extractor turns them into a fixed-shape
//! [`WeaponTraits`] record so the numeric pipeline never touches raw text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Every trait the extractor can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitFlag {
    Accurate,
    Balanced,
    Blast,
    Concussive,
    Crippling,
    Defensive,
    Devastating,
    Felling,
    Flame,
    Force,
    Haywire,
    Inaccurate,
    Maximal,
    Overheats,
    PowerField,
    Primitive,
    Proven,
    RazorSharp,
    Reliable,
    Sanctified,
    Scatter,
    Shocking,
    Spray,
    Storm,
    Tearing,
    Toxic,
    TwinLinked,
    TwinLinkedBonus,
    Unbalanced,
    Unreliable,
    Unwieldy,
    Vengeful,
}

impl TraitFlag {
    /// Traits that carry an embedded number, e.g. `Proven (3)`.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TraitFlag::Blast
                | TraitFlag::Concussive
                | TraitFlag::Crippling
                | TraitFlag::Devastating
                | TraitFlag::Felling
                | TraitFlag::Primitive
                | TraitFlag::Proven
                | TraitFlag::Toxic
                | TraitFlag::Vengeful
        )
    }
}

/// Structured trait set of a weapon or power.
///
/// Numeric traits are `Some(n)` when present; a numeric trait written
/// without a number reports `Some(0)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponTraits {
    pub accurate: bool,
    pub balanced: bool,
    pub blast: Option<u32>,
    pub concussive: Option<u32>,
    pub crippling: Option<u32>,
    pub defensive: bool,
    pub devastating: Option<u32>,
    pub felling: Option<u32>,
    pub flame: bool,
    pub force: bool,
    pub haywire: bool,
    pub inaccurate: bool,
    pub maximal: bool,
    pub overheats: bool,
    pub power_field: bool,
    pub primitive: Option<u32>,
    pub proven: Option<u32>,
    pub razor_sharp: bool,
    pub reliable: bool,
    pub sanctified: bool,
    pub scatter: bool,
    pub shocking: bool,
    pub spray: bool,
    pub storm: bool,
    pub tearing: bool,
    pub toxic: Option<u32>,
    pub twin_linked: bool,
    pub twin_linked_bonus: bool,
    pub unbalanced: bool,
    pub unreliable: bool,
    pub unwieldy: bool,
    pub vengeful: Option<u32>,
}

impl WeaponTraits {
    pub fn has(&self, flag: TraitFlag) -> bool {
        match flag {
            TraitFlag::Accurate => self.accurate,
            TraitFlag::Balanced => self.balanced,
            TraitFlag::Blast => self.blast.is_some(),
            TraitFlag::Concussive => self.concussive.is_some(),
            TraitFlag::Crippling => self.crippling.is_some(),
            TraitFlag::Defensive => self.defensive,
            TraitFlag::Devastating => self.devastating.is_some(),
            TraitFlag::Felling => self.felling.is_some(),
            TraitFlag::Flame => self.flame,
            TraitFlag::Force => self.force,
            TraitFlag::Haywire => self.haywire,
            TraitFlag::Inaccurate => self.inaccurate,
            TraitFlag::Maximal => self.maximal,
            TraitFlag::Overheats => self.overheats,
            TraitFlag::PowerField => self.power_field,
            TraitFlag::Primitive => self.primitive.is_some(),
            TraitFlag::Proven => self.proven.is_some(),
            TraitFlag::RazorSharp => self.razor_sharp,
            TraitFlag::Reliable => self.reliable,
            TraitFlag::Sanctified => self.sanctified,
            TraitFlag::Scatter => self.scatter,
            TraitFlag::Shocking => self.shocking,
            TraitFlag::Spray => self.spray,
            TraitFlag::Storm => self.storm,
            TraitFlag::Tearing => self.tearing,
            TraitFlag::Toxic => self.toxic.is_some(),
            TraitFlag::TwinLinked => self.twin_linked,
            TraitFlag::TwinLinkedBonus => self.twin_linked_bonus,
            TraitFlag::Unbalanced => self.unbalanced,
            TraitFlag::Unreliable => self.unreliable,
            TraitFlag::Unwieldy => self.unwieldy,
            TraitFlag::Vengeful => self.vengeful.is_some(),
        }
    }

    fn set(&mut self, flag: TraitFlag, value: Option<u32>) {
        let n = Some(value.unwrap_or(0));
        match flag {
            TraitFlag::Accurate => self.accurate = true,
            TraitFlag::Balanced => self.balanced = true,
            TraitFlag::Blast => self.blast = n,
            TraitFlag::Concussive => self.concussive = n,
            TraitFlag::Crippling => self.crippling = n,
            TraitFlag::Defensive => self.defensive = true,
            TraitFlag::Devastating => self.devastating = n,
            TraitFlag::Felling => self.felling = n,
            TraitFlag::Flame => self.flame = true,
            TraitFlag::Force => self.force = true,
            TraitFlag::Haywire => self.haywire = true,
            TraitFlag::Inaccurate => self.inaccurate = true,
            TraitFlag::Maximal => self.maximal = true,
            TraitFlag::Overheats => self.overheats = true,
            TraitFlag::PowerField => self.power_field = true,
            TraitFlag::Primitive => self.primitive = n,
            TraitFlag::Proven => self.proven = n,
            TraitFlag::RazorSharp => self.razor_sharp = true,
            TraitFlag::Reliable => self.reliable = true,
            TraitFlag::Sanctified => self.sanctified = true,
            TraitFlag::Scatter => self.scatter = true,
            TraitFlag::Shocking => self.shocking = true,
            TraitFlag::Spray => self.spray = true,
            TraitFlag::Storm => self.storm = true,
            TraitFlag::Tearing => self.tearing = true,
            TraitFlag::Toxic => self.toxic = n,
            TraitFlag::TwinLinked => self.twin_linked = true,
            TraitFlag::TwinLinkedBonus => self.twin_linked_bonus = true,
            TraitFlag::Unbalanced => self.unbalanced = true,
            TraitFlag::Unreliable => self.unreliable = true,
            TraitFlag::Unwieldy => self.unwieldy = true,
            TraitFlag::Vengeful => self.vengeful = n,
        }
    }
}

/// A single pattern → flag entry of the matcher table.
#[derive(Debug, Clone)]
pub struct TraitRule {
    pub flag: TraitFlag,
    pattern: Regex,
    /// Flags this rule hides when it matches (generic variants of a more
    /// specific trait).
    pub suppresses: Vec<TraitFlag>,
    /// Phrases blanked out before matching.
    excluding: Vec<Regex>,
}

impl TraitRule {
    /// Build a rule. The pattern is matched case-insensitively; for numeric
    /// flags its first capture group is read as the embedded number.
    pub fn new(flag: TraitFlag, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            flag,
            pattern: Regex::new(&format!("(?i){pattern}"))?,
            suppresses: Vec::new(),
            excluding: Vec::new(),
        })
    }

    /// Ignore text matching `pattern`, such as a longer name that contains
    /// this trait's word.
    pub fn excluding(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.excluding.push(Regex::new(&format!("(?i){pattern}"))?);
        Ok(self)
    }

    pub fn suppressing(mut self, flags: impl IntoIterator<Item = TraitFlag>) -> Self {
        self.suppresses.extend(flags);
        self
    }

    fn find(&self, text: &str) -> Option<Option<u32>> {
        let text = self
            .excluding
            .iter()
            .fold(Cow::Borrowed(text), |text, excluding| {
                Cow::Owned(excluding.replace_all(&text, " ").into_owned())
            });
        let caps = self.pattern.captures(&text)?;
        Some(caps.get(1).and_then(|m| m.as_str().parse().ok()))
    }
}

/// Optional `(N)` suffix shared by numeric traits.
const NUMBER: &str = r"(?:\s*\(\s*(\d+)\s*\))?";

/// Built-in bilingual matcher table, most specific variants first.
const DEFAULT_TABLE: &[(TraitFlag, &str, &[TraitFlag])] = &[
    (
        TraitFlag::TwinLinkedBonus,
        r"\b(?:twin[\s-]?linked|synchronisiert|zwillingsgekoppelt)\s*\+\s*10\b",
        &[TraitFlag::TwinLinked],
    ),
    (
        TraitFlag::TwinLinked,
        r"\b(?:twin[\s-]?linked|synchronisiert|zwillingsgekoppelt)\b",
        &[],
    ),
    (
        TraitFlag::Unreliable,
        r"\b(?:unreliable|unzuverlässig)\b",
        &[TraitFlag::Reliable],
    ),
    (TraitFlag::Reliable, r"\b(?:reliable|zuverlässig)\b", &[]),
    (
        TraitFlag::Inaccurate,
        r"\b(?:inaccurate|ungenau)\b",
        &[TraitFlag::Accurate],
    ),
    (TraitFlag::Accurate, r"\b(?:accurate|genau)\b", &[]),
    (
        TraitFlag::Unbalanced,
        r"\b(?:unbalanced|unausbalanciert|unausgewogen)\b",
        &[TraitFlag::Balanced],
    ),
    (
        TraitFlag::Balanced,
        r"\b(?:balanced|ausbalanciert|ausgewogen)\b",
        &[],
    ),
    (TraitFlag::Blast, r"\b(?:blast|explosiv)\b", &[]),
    (TraitFlag::Concussive, r"\b(?:concussive|erschütternd)\b", &[]),
    (TraitFlag::Crippling, r"\b(?:crippling|verkrüppelnd)\b", &[]),
    (TraitFlag::Defensive, r"\b(?:defensive|defensiv)\b", &[]),
    (TraitFlag::Devastating, r"\b(?:devastating|verheerend)\b", &[]),
    (TraitFlag::Felling, r"\b(?:felling|fällend)\b", &[]),
    (TraitFlag::Flame, r"\b(?:flame|flamme)\b", &[]),
    (TraitFlag::Force, r"\b(?:force|psi)\b", &[]),
    (TraitFlag::Haywire, r"\b(?:haywire|störfeld)\b", &[]),
    (TraitFlag::Maximal, r"\bmaximal\b", &[]),
    (
        TraitFlag::Overheats,
        r"\b(?:overheats?|überhitz(?:t|end))\b",
        &[],
    ),
    (
        TraitFlag::PowerField,
        r"\b(?:power[\s-]?field|energiefeld)\b",
        &[],
    ),
    (TraitFlag::Primitive, r"\b(?:primitive|primitiv)\b", &[]),
    (TraitFlag::Proven, r"\b(?:proven|bewährt|erprobt)\b", &[]),
    (
        TraitFlag::RazorSharp,
        r"\b(?:razor[\s-]?sharp|rasiermesserscharf)\b",
        &[],
    ),
    (TraitFlag::Sanctified, r"\b(?:sanctified|geheiligt)\b", &[]),
    (TraitFlag::Scatter, r"\b(?:scatter|streuung)\b", &[]),
    (TraitFlag::Shocking, r"\b(?:shocking|schock(?:end)?)\b", &[]),
    (TraitFlag::Spray, r"\b(?:spray|sprühen)\b", &[]),
    (TraitFlag::Storm, r"\b(?:storm|sturm)\b", &[]),
    (TraitFlag::Tearing, r"\b(?:tearing|reißend)\b", &[]),
    (TraitFlag::Toxic, r"\b(?:toxic|toxisch)\b", &[]),
    (TraitFlag::Unwieldy, r"\b(?:unwieldy|unhandlich)\b", &[]),
    (TraitFlag::Vengeful, r"\b(?:vengeful|rachsüchtig)\b", &[]),
];

/// Longer names that contain a trait's word without being that trait.
const EXCLUSIONS: &[(TraitFlag, &str)] = &[
    (TraitFlag::Force, r"\b(?:force|psi)[\s-]*field\b"),
];

fn build_default_rules() -> Vec<TraitRule> {
    DEFAULT_TABLE
        .iter()
        .filter_map(|(flag, pattern, suppresses)| {
            let pattern = if flag.is_numeric() {
                format!("{pattern}{NUMBER}")
            } else {
                (*pattern).to_string()
            };
            let rule = TraitRule::new(*flag, &pattern).and_then(|rule| {
                EXCLUSIONS
                    .iter()
                    .filter(|(excluded, _)| excluded == flag)
                    .try_fold(rule, |rule, (_, phrase)| rule.excluding(phrase))
            });
            match rule {
                Ok(rule) => Some(rule.suppressing(suppresses.iter().copied())),
                Err(err) => {
                    tracing::warn!(?flag, error = %err, "skipping invalid trait pattern");
                    None
                }
            }
        })
        .collect()
}

lazy_static::lazy_static! {
    static ref DEFAULT_RULES: Vec<TraitRule> = build_default_rules();
}

/// Pluggable pattern table turning trait text into [`WeaponTraits`].
#[derive(Debug, Clone)]
pub struct TraitExtractor {
    rules: Vec<TraitRule>,
}

impl TraitExtractor {
    /// An extractor with a custom table. Rules are tried in order; put
    /// specific variants before the generic ones they suppress.
    pub fn new(rules: Vec<TraitRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TraitRule] {
        &self.rules
    }

    /// Extract traits from free text. Never fails; unknown text yields an
    /// empty record.
    pub fn extract(&self, text: &str) -> WeaponTraits {
        let mut traits = WeaponTraits::default();
        let mut suppressed: Vec<TraitFlag> = Vec::new();

        for rule in &self.rules {
            if suppressed.contains(&rule.flag) {
                continue;
            }
            if let Some(value) = rule.find(text) {
                traits.set(rule.flag, value);
                suppressed.extend(rule.suppresses.iter().copied());
            }
        }
        traits
    }
}

impl Default for TraitExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.clone())
    }
}
