/// UK formula: predicted A-level grades (or IB points) against the
/// college's typical offer, with a selectivity adjustment.
use crate::chancing::types::*;
use crate::domain::{College, Factor, ProfileSnapshot, Region};

/// UCAS-style grade points: A* = 6 down to E = 1.
fn grade_points(grade: char) -> Option<i32> {
    match grade {
        'A' => Some(5),
        'B' => Some(4),
        'C' => Some(3),
        'D' => Some(2),
        'E' => Some(1),
        _ => None,
    }
}

/// Parse an offer string like "AAA", "A*AB" into total grade points.
/// Returns None when the string contains anything unexpected.
pub fn parse_offer(offer: &str) -> Option<i32> {
    let mut total = 0;
    let mut chars = offer.chars().peekable();
    while let Some(c) = chars.next() {
        let mut points = grade_points(c.to_ascii_uppercase())?;
        if c.to_ascii_uppercase() == 'A' && chars.peek() == Some(&'*') {
            chars.next();
            points = 6;
        }
        total += points;
    }
    if total == 0 {
        None
    } else {
        Some(total)
    }
}

pub fn compute(snapshot: &ProfileSnapshot, college: &College) -> ChanceComputation {
    let regional = &snapshot.profile.regional;
    let mut factors = Vec::new();

    // A-level offer match first; IB second.
    let offer_match = match (
        regional.predicted_a_levels.as_deref().and_then(parse_offer),
        college.typical_offer.as_deref().and_then(parse_offer),
    ) {
        (Some(predicted), Some(offer)) => {
            let diff = (predicted - offer) as f64;
            Some((
                diff * UK_POINTS_PER_ALEVEL_GRADE,
                format!("predicted {} vs offer {} grade points", predicted, offer),
            ))
        }
        _ => match (regional.ib_predicted, college.ib_typical_offer) {
            (Some(predicted), Some(offer)) => {
                let diff = (predicted - offer) as f64;
                Some((
                    diff * UK_POINTS_PER_IB_POINT,
                    format!("IB predicted {} vs offer {}", predicted, offer),
                ))
            }
            _ => None,
        },
    };

    let mut chance = match offer_match {
        Some((delta, evidence)) => {
            factors.push(Factor::new("offer_match", 1.0, delta, evidence));
            UK_BASE + delta
        }
        None => {
            let base = college.acceptance_rate * 100.0;
            factors.push(Factor::new("base_rate", 1.0, base, "no offer data"));
            base
        }
    };

    // Selectivity adjustment from the acceptance rate.
    let selectivity = if college.acceptance_rate >= UK_OPEN_ACCEPTANCE {
        UK_OPEN_SELECTIVITY_BONUS
    } else if college.acceptance_rate < UK_TIGHT_ACCEPTANCE {
        UK_TIGHT_SELECTIVITY_PENALTY
    } else {
        0.0
    };
    if selectivity != 0.0 {
        chance += selectivity;
        factors.push(Factor::new(
            "selectivity",
            1.0,
            selectivity,
            format!("acceptance rate {:.0}%", college.acceptance_rate * 100.0),
        ));
    }

    ChanceComputation {
        chance_percent: chance,
        category: regional_category(chance),
        region: Region::Uk,
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChanceCategory;
    use crate::testing::fixtures::{college_uk, snapshot_uk};

    #[test]
    fn test_parse_offer() {
        assert_eq!(parse_offer("AAA"), Some(15));
        assert_eq!(parse_offer("A*AA"), Some(16));
        assert_eq!(parse_offer("A*A*A*"), Some(18));
        assert_eq!(parse_offer("ABB"), Some(13));
        assert_eq!(parse_offer("aab"), Some(14));
        assert_eq!(parse_offer(""), None);
        assert_eq!(parse_offer("XYZ"), None);
    }

    #[test]
    fn test_matching_offer_is_coin_flip_plus_selectivity() {
        // Predicted AAA vs offer AAA at a 25% college: 50 + 0 + 0 = 50.
        let snapshot = snapshot_uk("AAA");
        let college = college_uk("AAA", 0.25);
        let result = compute(&snapshot, &college);
        assert_eq!(result.chance_percent, 50.0);
        assert_eq!(result.category, ChanceCategory::Target);
        assert_eq!(result.region, Region::Uk);
    }

    #[test]
    fn test_exceeding_offer_raises_chance() {
        // A*AA (16) vs AAB (14): +24, tight college −10 → 64.
        let snapshot = snapshot_uk("A*AA");
        let college = college_uk("AAB", 0.15);
        let result = compute(&snapshot, &college);
        assert_eq!(result.chance_percent, 50.0 + 24.0 - 10.0);
    }

    #[test]
    fn test_missing_offer_falls_back_to_base() {
        let snapshot = snapshot_uk("AAA");
        let mut college = college_uk("AAA", 0.60);
        college.typical_offer = None;
        let result = compute(&snapshot, &college);
        // base 60 + open-admissions bonus 10
        assert_eq!(result.chance_percent, 70.0);
    }

    #[test]
    fn test_ib_prediction_used_without_a_levels() {
        let mut snapshot = snapshot_uk("AAA");
        snapshot.profile.regional.predicted_a_levels = None;
        snapshot.profile.regional.ib_predicted = Some(42);
        let mut college = college_uk("AAA", 0.25);
        college.ib_typical_offer = Some(40);
        let result = compute(&snapshot, &college);
        // 50 + 2 × 4 = 58
        assert_eq!(result.chance_percent, 58.0);
    }
}
