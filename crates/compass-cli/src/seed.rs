//! Demo data for local runs: a handful of colleges across regions and one
//! strong demo profile (user 1).

use anyhow::Result;
use chrono::{Duration, Utc};
use compass_api::AppState;
use compass_core::domain::*;
use compass_core::ports::CollegeStore;

fn college_base(name: &str, country: &str, acceptance_rate: f64) -> College {
    College {
        id: 0,
        name: name.to_string(),
        country: country.to_string(),
        state: None,
        acceptance_rate,
        test_percentiles: TestScorePercentiles::default(),
        gpa_percentiles: GpaPercentiles::default(),
        cost_of_attendance: None,
        meets_full_need: false,
        need_blind: false,
        is_public: false,
        majors: vec![],
        ranking: None,
        cds: CdsFactors::default(),
        deadlines: CollegeDeadlines::default(),
        requirements: RequirementProfile::default(),
        jee_cutoffs: None,
        typical_offer: None,
        ib_typical_offer: None,
        nc_cutoff: None,
        last_scraped: None,
        scraping_failures: 0,
        needs_manual_review: false,
    }
}

pub async fn run(state: &AppState) -> Result<()> {
    let now = Utc::now();

    let mut flagship = college_base("State Flagship University", "US", 0.55);
    flagship.state = Some("OH".to_string());
    flagship.is_public = true;
    flagship.gpa_percentiles = GpaPercentiles {
        p25: Some(3.4),
        p50: Some(3.7),
        p75: Some(3.9),
    };
    flagship.test_percentiles = TestScorePercentiles {
        sat25: Some(1270),
        sat50: Some(1380),
        sat75: Some(1460),
        act25: Some(26),
        act75: Some(32),
    };
    flagship.cost_of_attendance = Some(38_000.0);
    flagship.cds.residency = FactorImportance::Considered;
    flagship.deadlines.early_action = Some(now + Duration::days(61));
    flagship.deadlines.regular = Some(now + Duration::days(126));
    flagship.requirements = RequirementProfile {
        common_app_essay_required: true,
        supplemental_essays_count: 1,
        teacher_recommendations_required: 1,
        counselor_recommendation_required: true,
        ..Default::default()
    };

    let mut ivy = college_base("Ivy College", "US", 0.05);
    ivy.gpa_percentiles = GpaPercentiles {
        p25: Some(3.8),
        p50: Some(4.0),
        p75: None,
    };
    ivy.test_percentiles = TestScorePercentiles {
        sat25: Some(1480),
        sat50: Some(1550),
        sat75: Some(1580),
        act25: Some(33),
        act75: Some(36),
    };
    ivy.cost_of_attendance = Some(85_000.0);
    ivy.meets_full_need = true;
    ivy.need_blind = true;
    ivy.cds.rigor = FactorImportance::VeryImportant;
    ivy.cds.extracurricular = FactorImportance::VeryImportant;
    ivy.cds.legacy = FactorImportance::Considered;
    ivy.cds.first_generation = FactorImportance::Considered;
    ivy.deadlines.restrictive_ea = Some(now + Duration::days(61));
    ivy.deadlines.regular = Some(now + Duration::days(122));
    ivy.requirements = RequirementProfile {
        common_app_essay_required: true,
        supplemental_essays_count: 3,
        teacher_recommendations_required: 2,
        counselor_recommendation_required: true,
        interview_offered: true,
        toefl_min: Some(100),
        ..Default::default()
    };

    let mut iit = college_base("Indian Institute of Technology", "India", 0.02);
    iit.jee_cutoffs = Some(JeeCutoffs {
        general: Some(JeeCutoff {
            opening_rank: 100,
            closing_rank: 3000,
        }),
        obc: Some(JeeCutoff {
            opening_rank: 200,
            closing_rank: 5000,
        }),
        sc: None,
        st: None,
    });
    iit.deadlines.regular = Some(now + Duration::days(90));

    let mut oxbridge = college_base("Oxbridge College", "UK", 0.17);
    oxbridge.typical_offer = Some("A*AA".to_string());
    oxbridge.ib_typical_offer = Some(41);
    oxbridge.deadlines.regular = Some(now + Duration::days(45));
    oxbridge.requirements.interview_required = true;

    let mut tum = college_base("Technische Universität", "Germany", 0.35);
    tum.nc_cutoff = Some(1.5);
    tum.deadlines.regular = Some(now + Duration::days(150));

    let mut ids = Vec::new();
    for college in [flagship, ivy, iit, oxbridge, tum] {
        let stored = state.colleges.upsert_college(college).await?;
        println!("  seeded college {}: {}", stored.id, stored.name);
        ids.push(stored.id);
    }

    let profile = Profile {
        id: 0,
        user_id: 1,
        academic: AcademicMetrics {
            gpa_unweighted: Some(3.95),
            sat_total: Some(1520),
            ..Default::default()
        },
        regional: RegionalMetrics::default(),
        preferences: Preferences {
            intended_majors: vec!["Computer Science".to_string()],
            preferred_countries: vec!["US".to_string()],
            budget_max: Some(60_000.0),
            ..Default::default()
        },
        demographics: Demographics {
            state: Some("OH".to_string()),
            country: Some("US".to_string()),
            ..Default::default()
        },
        completeness: 0.0,
        updated_at: now,
    };
    let activities = vec![
        Activity {
            id: 0,
            profile_id: 0,
            name: "National robotics team".to_string(),
            description: Some("FRC worlds finalist".to_string()),
            tier: ActivityTier::Tier1,
            hours_per_week: 10.0,
            weeks_per_year: 40.0,
            years_participated: 3.0,
            is_leadership: true,
        },
        Activity {
            id: 0,
            profile_id: 0,
            name: "State debate".to_string(),
            description: None,
            tier: ActivityTier::Tier2,
            hours_per_week: 5.0,
            weeks_per_year: 30.0,
            years_participated: 2.0,
            is_leadership: false,
        },
    ];
    let coursework = vec![
        Coursework {
            id: 0,
            profile_id: 0,
            name: "AP Computer Science A".to_string(),
            level: CourseLevel::Ap,
            final_grade: Some("A".to_string()),
            exam_score: Some(5),
        },
        Coursework {
            id: 0,
            profile_id: 0,
            name: "AP Calculus BC".to_string(),
            level: CourseLevel::Ap,
            final_grade: Some("A".to_string()),
            exam_score: Some(5),
        },
    ];

    let (stored, snapshot_id) = state.save_profile(profile, activities, coursework).await?;
    println!(
        "  seeded profile {} for user 1 (snapshot {})",
        stored.id, snapshot_id
    );
    println!(
        "Try: compass fit {} {}   or: compass tasks create 1 {}",
        stored.id, ids[0], ids[0]
    );
    Ok(())
}
