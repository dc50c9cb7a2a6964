//! The fixed tag vocabulary. Adding a tag means adding a variant here, which every
//! exhaustive match (category, priority, name) then forces to be handled.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    Meta,
    Opening,
    Exchange,
    Structure,
    Initiative,
    Tension,
    Maneuver,
    Prophylaxis,
    Sacrifice,
}

/// Every tag the tagger knows about, in catalogue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TagId {
    // meta
    FirstChoice,
    MissedTactic,
    TacticalSensitivity,
    ConversionPrecision,
    PanicMove,
    TacticalRecovery,
    RiskAvoidance,
    // opening
    OpeningCentralPawnMove,
    OpeningRookPawnMove,
    OpeningDevelopment,
    // exchange
    AccurateKnightBishopExchange,
    InaccurateKnightBishopExchange,
    BadKnightBishopExchange,
    // structure
    StructuralIntegrity,
    StructuralCompromiseDynamic,
    StructuralCompromiseStatic,
    StructuralBlockage,
    // initiative
    InitiativeExploitation,
    InitiativeAttempt,
    DeferredInitiative,
    PrematureAttack,
    // tension
    TensionCreation,
    NeutralTensionCreation,
    TensionRelease,
    FilePressure,
    // maneuver
    ConstructiveManeuver,
    ConstructiveManeuverPrepare,
    NeutralManeuver,
    MisplacedManeuver,
    ManeuverOpening,
    // prophylaxis
    ProphylacticMove,
    ProphylacticDirect,
    ProphylacticLatent,
    ProphylacticMeaningless,
    FailedProphylactic,
    ControlOverDynamics,
    CodSimplify,
    CodPlanKill,
    CodFreezeBind,
    CodBlockadePassed,
    CodFileSeal,
    CodKingSafetyShell,
    CodSpaceClamp,
    CodRegroupConsolidate,
    CodSlowdown,
    // sacrifice
    TacticalSacrifice,
    TacticalCombinationSacrifice,
    TacticalInitiativeSacrifice,
    PositionalSacrifice,
    PositionalStructureSacrifice,
    PositionalSpaceSacrifice,
    InaccurateTacticalSacrifice,
    SpeculativeSacrifice,
    DesperateSacrifice,
}

impl TagId {
    pub const COUNT: usize = 54;

    pub const ALL: [TagId; Self::COUNT] = [
        Self::FirstChoice,
        Self::MissedTactic,
        Self::TacticalSensitivity,
        Self::ConversionPrecision,
        Self::PanicMove,
        Self::TacticalRecovery,
        Self::RiskAvoidance,
        Self::OpeningCentralPawnMove,
        Self::OpeningRookPawnMove,
        Self::OpeningDevelopment,
        Self::AccurateKnightBishopExchange,
        Self::InaccurateKnightBishopExchange,
        Self::BadKnightBishopExchange,
        Self::StructuralIntegrity,
        Self::StructuralCompromiseDynamic,
        Self::StructuralCompromiseStatic,
        Self::StructuralBlockage,
        Self::InitiativeExploitation,
        Self::InitiativeAttempt,
        Self::DeferredInitiative,
        Self::PrematureAttack,
        Self::TensionCreation,
        Self::NeutralTensionCreation,
        Self::TensionRelease,
        Self::FilePressure,
        Self::ConstructiveManeuver,
        Self::ConstructiveManeuverPrepare,
        Self::NeutralManeuver,
        Self::MisplacedManeuver,
        Self::ManeuverOpening,
        Self::ProphylacticMove,
        Self::ProphylacticDirect,
        Self::ProphylacticLatent,
        Self::ProphylacticMeaningless,
        Self::FailedProphylactic,
        Self::ControlOverDynamics,
        Self::CodSimplify,
        Self::CodPlanKill,
        Self::CodFreezeBind,
        Self::CodBlockadePassed,
        Self::CodFileSeal,
        Self::CodKingSafetyShell,
        Self::CodSpaceClamp,
        Self::CodRegroupConsolidate,
        Self::CodSlowdown,
        Self::TacticalSacrifice,
        Self::TacticalCombinationSacrifice,
        Self::TacticalInitiativeSacrifice,
        Self::PositionalSacrifice,
        Self::PositionalStructureSacrifice,
        Self::PositionalSpaceSacrifice,
        Self::InaccurateTacticalSacrifice,
        Self::SpeculativeSacrifice,
        Self::DesperateSacrifice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstChoice => "first_choice",
            Self::MissedTactic => "missed_tactic",
            Self::TacticalSensitivity => "tactical_sensitivity",
            Self::ConversionPrecision => "conversion_precision",
            Self::PanicMove => "panic_move",
            Self::TacticalRecovery => "tactical_recovery",
            Self::RiskAvoidance => "risk_avoidance",
            Self::OpeningCentralPawnMove => "opening_central_pawn_move",
            Self::OpeningRookPawnMove => "opening_rook_pawn_move",
            Self::OpeningDevelopment => "opening_development",
            Self::AccurateKnightBishopExchange => "accurate_knight_bishop_exchange",
            Self::InaccurateKnightBishopExchange => "inaccurate_knight_bishop_exchange",
            Self::BadKnightBishopExchange => "bad_knight_bishop_exchange",
            Self::StructuralIntegrity => "structural_integrity",
            Self::StructuralCompromiseDynamic => "structural_compromise_dynamic",
            Self::StructuralCompromiseStatic => "structural_compromise_static",
            Self::StructuralBlockage => "structural_blockage",
            Self::InitiativeExploitation => "initiative_exploitation",
            Self::InitiativeAttempt => "initiative_attempt",
            Self::DeferredInitiative => "deferred_initiative",
            Self::PrematureAttack => "premature_attack",
            Self::TensionCreation => "tension_creation",
            Self::NeutralTensionCreation => "neutral_tension_creation",
            Self::TensionRelease => "tension_release",
            Self::FilePressure => "file_pressure",
            Self::ConstructiveManeuver => "constructive_maneuver",
            Self::ConstructiveManeuverPrepare => "constructive_maneuver_prepare",
            Self::NeutralManeuver => "neutral_maneuver",
            Self::MisplacedManeuver => "misplaced_maneuver",
            Self::ManeuverOpening => "maneuver_opening",
            Self::ProphylacticMove => "prophylactic_move",
            Self::ProphylacticDirect => "prophylactic_direct",
            Self::ProphylacticLatent => "prophylactic_latent",
            Self::ProphylacticMeaningless => "prophylactic_meaningless",
            Self::FailedProphylactic => "failed_prophylactic",
            Self::ControlOverDynamics => "control_over_dynamics",
            Self::CodSimplify => "cod_simplify",
            Self::CodPlanKill => "cod_plan_kill",
            Self::CodFreezeBind => "cod_freeze_bind",
            Self::CodBlockadePassed => "cod_blockade_passed",
            Self::CodFileSeal => "cod_file_seal",
            Self::CodKingSafetyShell => "cod_king_safety_shell",
            Self::CodSpaceClamp => "cod_space_clamp",
            Self::CodRegroupConsolidate => "cod_regroup_consolidate",
            Self::CodSlowdown => "cod_slowdown",
            Self::TacticalSacrifice => "tactical_sacrifice",
            Self::TacticalCombinationSacrifice => "tactical_combination_sacrifice",
            Self::TacticalInitiativeSacrifice => "tactical_initiative_sacrifice",
            Self::PositionalSacrifice => "positional_sacrifice",
            Self::PositionalStructureSacrifice => "positional_structure_sacrifice",
            Self::PositionalSpaceSacrifice => "positional_space_sacrifice",
            Self::InaccurateTacticalSacrifice => "inaccurate_tactical_sacrifice",
            Self::SpeculativeSacrifice => "speculative_sacrifice",
            Self::DesperateSacrifice => "desperate_sacrifice",
        }
    }

    pub fn category(&self) -> TagCategory {
        match self {
            Self::FirstChoice | Self::MissedTactic | Self::TacticalSensitivity | Self::ConversionPrecision | Self::PanicMove | Self::TacticalRecovery | Self::RiskAvoidance => TagCategory::Meta,
            Self::OpeningCentralPawnMove | Self::OpeningRookPawnMove | Self::OpeningDevelopment => TagCategory::Opening,
            Self::AccurateKnightBishopExchange | Self::InaccurateKnightBishopExchange | Self::BadKnightBishopExchange => TagCategory::Exchange,
            Self::StructuralIntegrity | Self::StructuralCompromiseDynamic | Self::StructuralCompromiseStatic | Self::StructuralBlockage => TagCategory::Structure,
            Self::InitiativeExploitation | Self::InitiativeAttempt | Self::DeferredInitiative | Self::PrematureAttack => TagCategory::Initiative,
            Self::TensionCreation | Self::NeutralTensionCreation | Self::TensionRelease | Self::FilePressure => TagCategory::Tension,
            Self::ConstructiveManeuver | Self::ConstructiveManeuverPrepare | Self::NeutralManeuver | Self::MisplacedManeuver | Self::ManeuverOpening => TagCategory::Maneuver,
            Self::ProphylacticMove | Self::ProphylacticDirect | Self::ProphylacticLatent | Self::ProphylacticMeaningless | Self::FailedProphylactic | Self::ControlOverDynamics | Self::CodSimplify | Self::CodPlanKill | Self::CodFreezeBind | Self::CodBlockadePassed | Self::CodFileSeal | Self::CodKingSafetyShell | Self::CodSpaceClamp | Self::CodRegroupConsolidate | Self::CodSlowdown => TagCategory::Prophylaxis,
            Self::TacticalSacrifice | Self::TacticalCombinationSacrifice | Self::TacticalInitiativeSacrifice | Self::PositionalSacrifice | Self::PositionalStructureSacrifice | Self::PositionalSpaceSacrifice | Self::InaccurateTacticalSacrifice | Self::SpeculativeSacrifice | Self::DesperateSacrifice => TagCategory::Sacrifice,
        }
    }

    /// Presentation priority, lower first. Has no say in which tag survives a conflict.
    pub fn priority(&self) -> u8 {
        match self {
            Self::TacticalSacrifice => 1,
            Self::TacticalCombinationSacrifice => 2,
            Self::TacticalInitiativeSacrifice => 3,
            Self::PositionalSacrifice => 4,
            Self::PositionalStructureSacrifice => 5,
            Self::PositionalSpaceSacrifice => 6,
            Self::InaccurateTacticalSacrifice => 7,
            Self::SpeculativeSacrifice => 8,
            Self::DesperateSacrifice => 9,
            Self::PanicMove => 10,
            Self::MissedTactic => 11,
            Self::ProphylacticDirect => 12,
            Self::ProphylacticLatent => 13,
            Self::ProphylacticMeaningless => 14,
            Self::FailedProphylactic => 15,
            Self::ProphylacticMove => 16,
            Self::CodSimplify => 17,
            Self::CodPlanKill => 18,
            Self::CodFreezeBind => 19,
            Self::CodBlockadePassed => 20,
            Self::CodFileSeal => 21,
            Self::CodKingSafetyShell => 22,
            Self::CodSpaceClamp => 23,
            Self::CodRegroupConsolidate => 24,
            Self::CodSlowdown => 25,
            Self::ControlOverDynamics => 26,
            Self::InitiativeExploitation => 27,
            Self::InitiativeAttempt => 28,
            Self::PrematureAttack => 29,
            Self::DeferredInitiative => 30,
            Self::TensionCreation => 31,
            Self::NeutralTensionCreation => 32,
            Self::TensionRelease => 33,
            Self::FilePressure => 34,
            Self::ConstructiveManeuver => 35,
            Self::ConstructiveManeuverPrepare => 36,
            Self::ManeuverOpening => 37,
            Self::NeutralManeuver => 38,
            Self::MisplacedManeuver => 39,
            Self::StructuralCompromiseDynamic => 40,
            Self::StructuralCompromiseStatic => 41,
            Self::StructuralIntegrity => 42,
            Self::StructuralBlockage => 43,
            Self::AccurateKnightBishopExchange => 44,
            Self::InaccurateKnightBishopExchange => 45,
            Self::BadKnightBishopExchange => 46,
            Self::FirstChoice => 47,
            Self::TacticalSensitivity => 48,
            Self::ConversionPrecision => 49,
            Self::TacticalRecovery => 50,
            Self::RiskAvoidance => 51,
            Self::OpeningCentralPawnMove => 52,
            Self::OpeningRookPawnMove => 53,
            Self::OpeningDevelopment => 54,
        }
    }

    /// Control-over-dynamics subtype slots that no detector fires yet.
    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            Self::CodSimplify
                | Self::CodPlanKill
                | Self::CodFreezeBind
                | Self::CodBlockadePassed
                | Self::CodFileSeal
                | Self::CodKingSafetyShell
                | Self::CodSpaceClamp
                | Self::CodRegroupConsolidate
                | Self::CodSlowdown
        )
    }

    fn index(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tag: {0}")]
pub struct UnknownTag(pub String);

impl FromStr for TagId {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}

/// A set of tags. Serializes as the full `name -> bool` table so every tag is visible
/// in the output, fired or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TagSet(u64);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: TagId) -> bool {
        let had = self.contains(tag);
        self.0 |= 1u64 << tag.index();
        !had
    }

    pub fn remove(&mut self, tag: TagId) -> bool {
        let had = self.contains(tag);
        self.0 &= !(1u64 << tag.index());
        had
    }

    pub fn contains(&self, tag: TagId) -> bool {
        self.0 & (1u64 << tag.index()) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in catalogue order.
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        TagId::ALL.into_iter().filter(move |tag| self.contains(*tag))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|tag| tag.as_str()).collect()
    }
}

impl FromIterator<TagId> for TagSet {
    fn from_iter<I: IntoIterator<Item = TagId>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(TagId::COUNT))?;
        for tag in TagId::ALL {
            map.serialize_entry(tag.as_str(), &self.contains(tag))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let table = BTreeMap::<String, bool>::deserialize(deserializer)?;
        let mut set = Self::new();
        for (name, fired) in table {
            let tag: TagId = name.parse().map_err(D::Error::custom)?;
            if fired {
                set.insert(tag);
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_and_priorities_are_unique() {
        let names: HashSet<_> = TagId::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(names.len(), TagId::COUNT);
        let priorities: HashSet<_> = TagId::ALL.iter().map(|t| t.priority()).collect();
        assert_eq!(priorities.len(), TagId::COUNT);
    }

    #[test]
    fn catalogue_has_nine_reserved_slots() {
        let reserved = TagId::ALL.iter().filter(|t| t.is_reserved()).count();
        assert_eq!(reserved, 9);
        assert_eq!(TagId::COUNT - reserved, 45);
        assert!(TagId::ALL.iter().filter(|t| t.is_reserved()).all(|t| t.category() == TagCategory::Prophylaxis));
    }

    #[test]
    fn names_parse_back() {
        for tag in TagId::ALL {
            assert_eq!(tag.as_str().parse::<TagId>().unwrap(), tag);
        }
        assert!("no_such_tag".parse::<TagId>().is_err());
    }

    #[test]
    fn serde_name_matches_as_str() {
        let json = serde_json::to_string(&TagId::TacticalSacrifice).unwrap();
        assert_eq!(json, "\"tactical_sacrifice\"");
    }

    #[test]
    fn set_operations() {
        let mut set = TagSet::new();
        assert!(set.insert(TagId::MissedTactic));
        assert!(!set.insert(TagId::MissedTactic));
        set.insert(TagId::DesperateSacrifice);
        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["missed_tactic", "desperate_sacrifice"]);
        assert!(set.remove(TagId::MissedTactic));
        assert!(!set.contains(TagId::MissedTactic));
    }

    #[test]
    fn set_serializes_every_tag() {
        let set: TagSet = [TagId::FirstChoice].into_iter().collect();
        let value = serde_json::to_value(set).unwrap();
        let table = value.as_object().unwrap();
        assert_eq!(table.len(), TagId::COUNT);
        assert_eq!(table["first_choice"], true);
        assert_eq!(table["cod_slowdown"], false);

        let back: TagSet = serde_json::from_value(value).unwrap();
        assert_eq!(back, set);
    }
}
