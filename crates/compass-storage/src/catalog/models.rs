/// Database row types for catalog.db
use crate::convert::{from_millis, opt_from_millis, opt_to_millis};
use compass_core::domain::{
    CdsFactors, College, CollegeDeadlines, GpaPercentiles, JeeCutoffs, ModelVersion,
    RequirementProfile, TestPolicy, TestScorePercentiles,
};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CollegeRow {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub acceptance_rate: f64,
    pub sat25: Option<i64>,
    pub sat50: Option<i64>,
    pub sat75: Option<i64>,
    pub act25: Option<i64>,
    pub act75: Option<i64>,
    pub gpa25: Option<f64>,
    pub gpa50: Option<f64>,
    pub gpa75: Option<f64>,
    pub cost_of_attendance: Option<f64>,
    pub meets_full_need: i64,
    pub need_blind: i64,
    pub is_public: i64,
    pub majors: String,
    pub ranking: Option<i64>,
    pub cds_factors: String,
    pub deadline_early1: Option<i64>,
    pub deadline_early2: Option<i64>,
    pub deadline_early_action: Option<i64>,
    pub deadline_restrictive_ea: Option<i64>,
    pub deadline_regular: Option<i64>,
    pub deadline_rolling: Option<i64>,
    pub test_policy: String,
    pub common_app_essay_required: i64,
    pub supplemental_essays_count: i64,
    pub teacher_recommendations_required: i64,
    pub counselor_recommendation_required: i64,
    pub peer_recommendation_required: i64,
    pub interview_offered: i64,
    pub interview_required: i64,
    pub interview_type: Option<String>,
    pub portfolio_required: i64,
    pub audition_required: i64,
    pub toefl_min: Option<i64>,
    pub ielts_min: Option<f64>,
    pub jee_cutoffs: Option<String>,
    pub typical_offer: Option<String>,
    pub ib_typical_offer: Option<i64>,
    pub nc_cutoff: Option<f64>,
    pub last_scraped: Option<i64>,
    pub scraping_failures: i64,
    pub needs_manual_review: i64,
}

impl CollegeRow {
    pub fn into_domain(self) -> anyhow::Result<College> {
        let cds: CdsFactors = serde_json::from_str(&self.cds_factors)
            .unwrap_or_default();
        let majors: Vec<String> = serde_json::from_str(&self.majors).unwrap_or_default();
        let jee_cutoffs: Option<JeeCutoffs> = match self.jee_cutoffs {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };

        Ok(College {
            id: self.id,
            name: self.name,
            country: self.country,
            state: self.state,
            acceptance_rate: self.acceptance_rate,
            test_percentiles: TestScorePercentiles {
                sat25: self.sat25.map(|v| v as i32),
                sat50: self.sat50.map(|v| v as i32),
                sat75: self.sat75.map(|v| v as i32),
                act25: self.act25.map(|v| v as i32),
                act75: self.act75.map(|v| v as i32),
            },
            gpa_percentiles: GpaPercentiles {
                p25: self.gpa25,
                p50: self.gpa50,
                p75: self.gpa75,
            },
            cost_of_attendance: self.cost_of_attendance,
            meets_full_need: self.meets_full_need != 0,
            need_blind: self.need_blind != 0,
            is_public: self.is_public != 0,
            majors,
            ranking: self.ranking.map(|v| v as i32),
            cds,
            deadlines: CollegeDeadlines {
                early1: opt_from_millis(self.deadline_early1),
                early2: opt_from_millis(self.deadline_early2),
                early_action: opt_from_millis(self.deadline_early_action),
                restrictive_ea: opt_from_millis(self.deadline_restrictive_ea),
                regular: opt_from_millis(self.deadline_regular),
                rolling: opt_from_millis(self.deadline_rolling),
            },
            requirements: RequirementProfile {
                test_policy: TestPolicy::parse(&self.test_policy)
                    .unwrap_or(TestPolicy::Required),
                common_app_essay_required: self.common_app_essay_required != 0,
                supplemental_essays_count: self.supplemental_essays_count as u8,
                teacher_recommendations_required: self.teacher_recommendations_required as u8,
                counselor_recommendation_required: self.counselor_recommendation_required != 0,
                peer_recommendation_required: self.peer_recommendation_required != 0,
                interview_offered: self.interview_offered != 0,
                interview_required: self.interview_required != 0,
                interview_type: self.interview_type,
                portfolio_required: self.portfolio_required != 0,
                audition_required: self.audition_required != 0,
                toefl_min: self.toefl_min.map(|v| v as i32),
                ielts_min: self.ielts_min,
            },
            jee_cutoffs,
            typical_offer: self.typical_offer,
            ib_typical_offer: self.ib_typical_offer.map(|v| v as i32),
            nc_cutoff: self.nc_cutoff,
            last_scraped: opt_from_millis(self.last_scraped),
            scraping_failures: self.scraping_failures as u32,
            needs_manual_review: self.needs_manual_review != 0,
        })
    }
}

/// Column bundle for the insert/update side of the college upsert.
pub struct CollegeBindings {
    pub majors: String,
    pub cds_factors: String,
    pub jee_cutoffs: Option<String>,
    pub deadline_early1: Option<i64>,
    pub deadline_early2: Option<i64>,
    pub deadline_early_action: Option<i64>,
    pub deadline_restrictive_ea: Option<i64>,
    pub deadline_regular: Option<i64>,
    pub deadline_rolling: Option<i64>,
    pub last_scraped: Option<i64>,
}

impl CollegeBindings {
    pub fn from_domain(college: &College) -> anyhow::Result<Self> {
        Ok(Self {
            majors: serde_json::to_string(&college.majors)?,
            cds_factors: serde_json::to_string(&college.cds)?,
            jee_cutoffs: college
                .jee_cutoffs
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            deadline_early1: opt_to_millis(college.deadlines.early1),
            deadline_early2: opt_to_millis(college.deadlines.early2),
            deadline_early_action: opt_to_millis(college.deadlines.early_action),
            deadline_restrictive_ea: opt_to_millis(college.deadlines.restrictive_ea),
            deadline_regular: opt_to_millis(college.deadlines.regular),
            deadline_rolling: opt_to_millis(college.deadlines.rolling),
            last_scraped: opt_to_millis(college.last_scraped),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ModelVersionRow {
    pub id: i64,
    pub college_id: i64,
    pub version: i64,
    pub sample_count: i64,
    pub accuracy: f64,
    pub adjustment_pp: f64,
    pub deployed: i64,
    pub trained_at: i64,
}

impl ModelVersionRow {
    pub fn into_domain(self) -> ModelVersion {
        ModelVersion {
            id: self.id,
            college_id: self.college_id,
            version: self.version as i32,
            sample_count: self.sample_count,
            accuracy: self.accuracy,
            adjustment_pp: self.adjustment_pp,
            deployed: self.deployed != 0,
            trained_at: from_millis(self.trained_at),
        }
    }
}
