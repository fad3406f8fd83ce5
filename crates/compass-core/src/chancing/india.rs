/// India entrance-exam formula: JEE Advanced rank against the college's
/// opening/closing cutoff brackets for the student's reservation category.
use crate::chancing::types::*;
use crate::domain::{College, Factor, ProfileSnapshot, Region, ReservationCategory};

pub fn compute(snapshot: &ProfileSnapshot, college: &College) -> ChanceComputation {
    let regional = &snapshot.profile.regional;
    let mut factors = Vec::new();

    // Reservation category is not modeled on the profile yet; brackets
    // default to General.
    let category = ReservationCategory::General;

    let chance = match (
        regional.jee_advanced_rank,
        college
            .jee_cutoffs
            .as_ref()
            .and_then(|c| c.for_category(category)),
    ) {
        (Some(rank), Some(cutoff)) => {
            let closing = cutoff.closing_rank.max(1) as f64;
            let rank_f = rank as f64;
            let strong_limit = JEE_STRONG_FRACTION * closing;

            let value = if rank_f <= strong_limit {
                // Comfortably inside the bracket: 85 climbing toward 95.
                JEE_STRONG_BASE + JEE_STRONG_SPAN * (1.0 - rank_f / strong_limit)
            } else if rank_f <= closing {
                // Between the strong zone and closing: 85 decaying to 50.
                let span = closing - strong_limit;
                JEE_AT_CLOSING + (JEE_STRONG_BASE - JEE_AT_CLOSING) * (closing - rank_f) / span
            } else {
                // Past closing: decay linearly to the floor.
                let overshoot = ((rank_f - closing) / closing).min(1.0);
                (JEE_AT_CLOSING - 45.0 * overshoot).max(JEE_PAST_CLOSING_FLOOR)
            };

            factors.push(Factor::new(
                "jee_rank_vs_cutoff",
                1.0,
                value,
                format!("rank {} vs closing {}", rank, cutoff.closing_rank),
            ));
            value
        }
        (Some(rank), None) => {
            // No published cutoff: fall back to the acceptance-rate base.
            let base = college.acceptance_rate * 100.0;
            factors.push(Factor::new(
                "base_rate",
                1.0,
                base,
                format!("no cutoff data; rank {}", rank),
            ));
            base
        }
        (None, _) => {
            // JEE Main percentile only: coarse linear mapping.
            let percentile = regional.jee_main_percentile.unwrap_or(0.0);
            let value = 20.0 + percentile / 100.0 * 60.0;
            factors.push(Factor::new(
                "jee_main_percentile",
                1.0,
                value,
                format!("percentile {:.1}", percentile),
            ));
            value
        }
    };

    // Board marks give a small edge when strong.
    let mut chance = chance;
    if let Some(board) = regional.board_percentage {
        if board >= BOARD_PERCENTAGE_MIN {
            chance += BOARD_PERCENTAGE_BONUS;
            factors.push(Factor::new(
                "board_percentage",
                1.0,
                BOARD_PERCENTAGE_BONUS,
                format!("board {:.1}%", board),
            ));
        }
    }

    ChanceComputation {
        chance_percent: chance,
        category: regional_category(chance),
        region: Region::India,
        factors,
    }
}
