//! Tactical Weight Model: one scalar in (0, 1) for how sharp the decision was.

use serde::{Deserialize, Serialize};

/// Normalized terms are capped so the sigmoid never saturates to exactly 0 or 1.
const TERM_CAP: f64 = 3.0;
const SIGMOID_OFFSET: f64 = 1.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightInputs {
    /// Played minus pre-move evaluation, centipawns.
    pub eval_delta_cp: f64,
    pub tactics_delta: f64,
    pub structure_delta: f64,
    pub depth_jump_cp: f64,
    pub deepening_gain_cp: f64,
    /// Best minus second-best candidate, centipawns.
    pub best_gap_cp: f64,
    pub contact_ratio: f64,
    pub phase_ratio: f64,
    pub best_is_forcing: bool,
    pub played_is_forcing: bool,
    pub mate_threat: bool,
}

fn term(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, TERM_CAP)
    } else {
        0.0
    }
}

/// Raw linear score before the sigmoid.
pub fn raw_tactical_score(inputs: &WeightInputs) -> f64 {
    let mut raw = 0.45 * term(inputs.eval_delta_cp.abs() / 120.0)
        + 0.75 * term(inputs.depth_jump_cp / 120.0)
        + 0.65 * term(inputs.deepening_gain_cp / 90.0)
        + 0.9 * term(inputs.best_gap_cp / 80.0)
        + 1.2 * term(inputs.tactics_delta.abs())
        + 0.7 * term(inputs.contact_ratio).min(1.0);

    if inputs.best_is_forcing {
        raw += 0.5;
        if !inputs.played_is_forcing {
            raw -= 0.25;
        }
    }
    if inputs.mate_threat {
        raw += 0.8;
    }

    let phase = term(inputs.phase_ratio).min(1.0);
    raw -= (1.0 - phase) * 0.7;
    raw -= term(inputs.structure_delta.abs() - 0.1) * 0.9;
    raw
}

/// Sigmoid of the raw score shifted so that a raw score of 1.3 maps to 0.5.
pub fn tactical_weight(inputs: &WeightInputs) -> f64 {
    let raw = raw_tactical_score(inputs);
    1.0 / (1.0 + (-(raw - SIGMOID_OFFSET)).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn quiet_opening_position_is_positional() {
        let weight = tactical_weight(&WeightInputs {
            phase_ratio: 1.0,
            ..Default::default()
        });
        assert!(weight < 0.25, "got {weight}");
    }

    #[test]
    fn forcing_sharp_position_crosses_one_half() {
        let weight = tactical_weight(&WeightInputs {
            eval_delta_cp: -150.0,
            tactics_delta: 0.3,
            depth_jump_cp: 80.0,
            best_gap_cp: 120.0,
            contact_ratio: 0.4,
            phase_ratio: 0.8,
            best_is_forcing: true,
            played_is_forcing: true,
            ..Default::default()
        });
        assert!(weight > 0.65, "got {weight}");
    }

    #[test]
    fn missing_the_forcing_move_costs_a_quarter_point() {
        let base = WeightInputs {
            phase_ratio: 1.0,
            best_is_forcing: true,
            played_is_forcing: true,
            ..Default::default()
        };
        let declined = WeightInputs {
            played_is_forcing: false,
            ..base
        };
        let diff = raw_tactical_score(&base) - raw_tactical_score(&declined);
        assert!((diff - 0.25).abs() < 1e-12);
    }

    #[test]
    fn structure_penalty_starts_past_a_tenth() {
        let base = WeightInputs {
            phase_ratio: 1.0,
            ..Default::default()
        };
        let small = WeightInputs {
            structure_delta: -0.1,
            ..base
        };
        let large = WeightInputs {
            structure_delta: -0.3,
            ..base
        };
        assert_eq!(raw_tactical_score(&small), raw_tactical_score(&base));
        assert!((raw_tactical_score(&base) - raw_tactical_score(&large) - 0.18).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn weight_is_strictly_inside_unit_interval(
            eval in -1e6f64..1e6,
            tactics in -10f64..10.0,
            structure in -10f64..10.0,
            jump in -5000f64..5000.0,
            gain in -5000f64..5000.0,
            gap in -5000f64..5000.0,
            contact in -1f64..2.0,
            phase in -1f64..2.0,
            best_forcing in any::<bool>(),
            played_forcing in any::<bool>(),
            mate in any::<bool>(),
        ) {
            let weight = tactical_weight(&WeightInputs {
                eval_delta_cp: eval,
                tactics_delta: tactics,
                structure_delta: structure,
                depth_jump_cp: jump,
                deepening_gain_cp: gain,
                best_gap_cp: gap,
                contact_ratio: contact,
                phase_ratio: phase,
                best_is_forcing: best_forcing,
                played_is_forcing: played_forcing,
                mate_threat: mate,
            });
            prop_assert!(weight > 0.0 && weight < 1.0);
        }
    }
}
