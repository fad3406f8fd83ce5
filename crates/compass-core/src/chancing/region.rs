/// Region dispatch for the chancing calculator. First match wins:
/// JEE > A-Level/IB > Abitur > default (US/holistic).
use crate::domain::{College, Region, RegionalMetrics};

fn country_is(country: &str, names: &[&str]) -> bool {
    names.iter().any(|n| country.eq_ignore_ascii_case(n))
}

/// Pick the one formula that runs for this (profile, college) pair.
pub fn dispatch(college: &College, regional: &RegionalMetrics) -> Region {
    if country_is(&college.country, &["India"]) && regional.has_jee() {
        Region::India
    } else if country_is(&college.country, &["UK", "United Kingdom", "GB"])
        && regional.has_uk_predictions()
    {
        Region::Uk
    } else if country_is(&college.country, &["Germany", "DE"]) && regional.has_abitur() {
        Region::Germany
    } else {
        Region::Us
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{college_flagship, college_iit};

    fn jee_metrics() -> RegionalMetrics {
        RegionalMetrics {
            jee_advanced_rank: Some(2500),
            ..Default::default()
        }
    }

    #[test]
    fn test_jee_profile_at_indian_college() {
        assert_eq!(dispatch(&college_iit(), &jee_metrics()), Region::India);
    }

    #[test]
    fn test_jee_profile_at_us_college_falls_through() {
        // Region depends on the college's country, not just the profile.
        assert_eq!(dispatch(&college_flagship(), &jee_metrics()), Region::Us);
    }

    #[test]
    fn test_precedence_jee_over_uk() {
        // Profile with both JEE and A-level data at an Indian college: JEE wins.
        let metrics = RegionalMetrics {
            jee_advanced_rank: Some(1000),
            predicted_a_levels: Some("AAA".to_string()),
            ..Default::default()
        };
        assert_eq!(dispatch(&college_iit(), &metrics), Region::India);
    }

    #[test]
    fn test_uk_college_with_ib_prediction() {
        let mut college = college_flagship();
        college.country = "United Kingdom".to_string();
        let metrics = RegionalMetrics {
            ib_predicted: Some(40),
            ..Default::default()
        };
        assert_eq!(dispatch(&college, &metrics), Region::Uk);
    }

    #[test]
    fn test_german_college_without_abitur_uses_default() {
        let mut college = college_flagship();
        college.country = "Germany".to_string();
        assert_eq!(dispatch(&college, &RegionalMetrics::default()), Region::Us);
    }
}
