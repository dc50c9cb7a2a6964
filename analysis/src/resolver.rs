//! Suppression / priority resolver.
//!
//! Within each conflict hierarchy the first fired tag wins and the rest are recorded as
//! suppressed. Survivors are then ordered by [`TagId::priority`] for presentation only.

use serde::Serialize;

use crate::tags::{TagId, TagSet};

/// A named, ordered conflict group. Earlier entries win.
#[derive(Debug, Clone, Copy)]
pub struct Hierarchy {
    pub name: &'static str,
    pub order: &'static [TagId],
}

pub const HIERARCHIES: [Hierarchy; 9] = [
    Hierarchy {
        name: "sacrifice",
        order: &[
            TagId::TacticalSacrifice,
            TagId::TacticalCombinationSacrifice,
            TagId::TacticalInitiativeSacrifice,
            TagId::PositionalSacrifice,
            TagId::PositionalStructureSacrifice,
            TagId::PositionalSpaceSacrifice,
            TagId::InaccurateTacticalSacrifice,
            TagId::SpeculativeSacrifice,
            TagId::DesperateSacrifice,
        ],
    },
    Hierarchy {
        name: "prophylaxis_quality",
        order: &[
            TagId::ProphylacticDirect,
            TagId::ProphylacticLatent,
            TagId::ProphylacticMeaningless,
            TagId::FailedProphylactic,
        ],
    },
    Hierarchy {
        name: "control_over_dynamics",
        order: &[
            TagId::CodSimplify,
            TagId::CodPlanKill,
            TagId::CodFreezeBind,
            TagId::CodBlockadePassed,
            TagId::CodFileSeal,
            TagId::CodKingSafetyShell,
            TagId::CodSpaceClamp,
            TagId::CodRegroupConsolidate,
            TagId::CodSlowdown,
            TagId::ControlOverDynamics,
        ],
    },
    Hierarchy {
        name: "maneuver",
        order: &[
            TagId::ConstructiveManeuver,
            TagId::ConstructiveManeuverPrepare,
            TagId::ManeuverOpening,
            TagId::NeutralManeuver,
            TagId::MisplacedManeuver,
        ],
    },
    Hierarchy {
        name: "initiative",
        order: &[
            TagId::InitiativeExploitation,
            TagId::InitiativeAttempt,
            TagId::PrematureAttack,
            TagId::DeferredInitiative,
        ],
    },
    Hierarchy {
        name: "tension",
        order: &[
            TagId::TensionCreation,
            TagId::NeutralTensionCreation,
            TagId::TensionRelease,
        ],
    },
    Hierarchy {
        name: "structure",
        order: &[
            TagId::StructuralCompromiseDynamic,
            TagId::StructuralCompromiseStatic,
            TagId::StructuralIntegrity,
        ],
    },
    Hierarchy {
        name: "exchange",
        order: &[
            TagId::AccurateKnightBishopExchange,
            TagId::InaccurateKnightBishopExchange,
            TagId::BadKnightBishopExchange,
        ],
    },
    Hierarchy {
        name: "meta_severity",
        order: &[TagId::PanicMove, TagId::MissedTactic],
    },
];

/// A tag dropped because a higher-ranked tag of the same hierarchy fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suppressed {
    pub tag: TagId,
    pub by: TagId,
    pub hierarchy: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuppressionOutcome {
    /// Surviving tags, by presentation priority.
    pub primary: Vec<TagId>,
    pub suppressed: Vec<Suppressed>,
}

impl SuppressionOutcome {
    pub fn primary_set(&self) -> TagSet {
        self.primary.iter().copied().collect()
    }

    pub fn is_suppressed(&self, tag: TagId) -> bool {
        self.suppressed.iter().any(|s| s.tag == tag)
    }
}

pub fn resolve(fired: &TagSet) -> SuppressionOutcome {
    let mut kept = *fired;
    let mut suppressed = Vec::new();

    for hierarchy in &HIERARCHIES {
        let mut present = hierarchy.order.iter().copied().filter(|t| fired.contains(*t));
        let Some(winner) = present.next() else {
            continue;
        };
        for loser in present {
            kept.remove(loser);
            suppressed.push(Suppressed {
                tag: loser,
                by: winner,
                hierarchy: hierarchy.name,
                reason: format!("{} outranks {} in {}", winner, loser, hierarchy.name),
            });
        }
    }

    let mut primary: Vec<TagId> = kept.iter().collect();
    primary.sort_by_key(|t| t.priority());
    SuppressionOutcome {
        primary,
        suppressed,
    }
}
