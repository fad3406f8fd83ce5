use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ===== Profile Models =====

/// Standardized academic metrics shared by every region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcademicMetrics {
    pub gpa_unweighted: Option<f64>,
    pub gpa_weighted: Option<f64>,
    pub sat_total: Option<i32>,
    pub sat_math: Option<i32>,
    pub sat_ebrw: Option<i32>,
    pub act_composite: Option<i32>,
    pub class_rank_percentile: Option<f64>,
}

impl AcademicMetrics {
    /// Best available test score expressed on the SAT scale, if any.
    pub fn has_test_score(&self) -> bool {
        self.sat_total.is_some() || self.act_composite.is_some()
    }

    pub fn has_gpa(&self) -> bool {
        self.gpa_unweighted.is_some() || self.gpa_weighted.is_some()
    }

    pub fn gpa(&self) -> Option<f64> {
        self.gpa_unweighted.or(self.gpa_weighted)
    }
}

/// Region-specific credentials. Which fields are populated decides the
/// chancing formula (precedence: JEE > A-Level/IB > Abitur > default).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionalMetrics {
    pub jee_advanced_rank: Option<i64>,
    pub jee_main_percentile: Option<f64>,
    pub predicted_a_levels: Option<String>,
    pub ib_predicted: Option<i32>,
    pub abitur_grade: Option<f64>,
    pub board_percentage: Option<f64>,
}

impl RegionalMetrics {
    pub fn has_jee(&self) -> bool {
        self.jee_advanced_rank.is_some() || self.jee_main_percentile.is_some()
    }

    pub fn has_uk_predictions(&self) -> bool {
        self.predicted_a_levels.is_some() || self.ib_predicted.is_some()
    }

    pub fn has_abitur(&self) -> bool {
        self.abitur_grade.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub intended_majors: Vec<String>,
    pub preferred_countries: Vec<String>,
    pub budget_max: Option<f64>,
    pub campus_size: Option<String>,
    pub setting: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub is_first_gen: bool,
    pub is_legacy: bool,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// A student profile. At most one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub academic: AcademicMetrics,
    pub regional: RegionalMetrics,
    pub preferences: Preferences,
    pub demographics: Demographics,
    /// Completeness percentage in [0, 100].
    pub completeness: f64,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Whether this student applies from outside the college's country.
    pub fn is_international_for(&self, college_country: &str) -> bool {
        match self.demographics.country.as_deref() {
            Some(c) => !c.eq_ignore_ascii_case(college_country),
            None => false,
        }
    }

    /// Fraction of profile sections populated, scaled to [0, 100].
    pub fn computed_completeness(&self, activities: usize, coursework: usize) -> f64 {
        let sections: [bool; 6] = [
            self.academic.has_gpa(),
            self.academic.has_test_score(),
            activities > 0,
            coursework > 0,
            self.preferences.budget_max.is_some(),
            self.demographics.country.is_some(),
        ];
        let filled = sections.iter().filter(|s| **s).count();
        filled as f64 / sections.len() as f64 * 100.0
    }
}

/// Activity tier: 1 national/international, 2 state/regional,
/// 3 school leadership, 4 participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityTier {
    Tier1 = 1,
    Tier2 = 2,
    Tier3 = 3,
    Tier4 = 4,
}

impl ActivityTier {
    pub fn parse(value: u8) -> std::result::Result<Self, String> {
        match value {
            1 => Ok(Self::Tier1),
            2 => Ok(Self::Tier2),
            3 => Ok(Self::Tier3),
            4 => Ok(Self::Tier4),
            other => Err(format!("Invalid activity tier: {}", other)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub profile_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tier: ActivityTier,
    pub hours_per_week: f64,
    pub weeks_per_year: f64,
    pub years_participated: f64,
    pub is_leadership: bool,
}

impl Activity {
    /// `totalHours = hoursPerWeek × weeksPerYear × yearsParticipated`.
    pub fn total_hours(&self) -> f64 {
        self.hours_per_week * self.weeks_per_year * self.years_participated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Ap,
    Ib,
    Honors,
    Regular,
    DualEnrollment,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Ap => "ap",
            CourseLevel::Ib => "ib",
            CourseLevel::Honors => "honors",
            CourseLevel::Regular => "regular",
            CourseLevel::DualEnrollment => "dual_enrollment",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "ap" => Ok(Self::Ap),
            "ib" => Ok(Self::Ib),
            "honors" => Ok(Self::Honors),
            "regular" => Ok(Self::Regular),
            "dual_enrollment" => Ok(Self::DualEnrollment),
            _ => Err(format!("Unknown course level: {}", s)),
        }
    }

    /// AP and IB courses count toward the rigor signal.
    pub fn is_rigorous(&self) -> bool {
        matches!(self, CourseLevel::Ap | CourseLevel::Ib)
    }
}

impl std::fmt::Display for CourseLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coursework {
    pub id: i64,
    pub profile_id: i64,
    pub name: String,
    pub level: CourseLevel,
    pub final_grade: Option<String>,
    pub exam_score: Option<i32>,
}

/// Immutable copy of a profile at a point in time. Every scored decision
/// references the snapshot it was computed from so it stays reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub id: i64,
    pub profile_id: i64,
    pub user_id: i64,
    pub taken_at: DateTime<Utc>,
    pub profile: Profile,
    pub activities: Vec<Activity>,
    pub coursework: Vec<Coursework>,
}

impl ProfileSnapshot {
    pub fn activity_tier_count(&self, tier: ActivityTier) -> usize {
        self.activities.iter().filter(|a| a.tier == tier).count()
    }

    pub fn leadership_count(&self) -> usize {
        self.activities.iter().filter(|a| a.is_leadership).count()
    }

    pub fn rigorous_course_count(&self) -> usize {
        self.coursework.iter().filter(|c| c.level.is_rigorous()).count()
    }
}

// ===== College Models =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestScorePercentiles {
    pub sat25: Option<i32>,
    pub sat50: Option<i32>,
    pub sat75: Option<i32>,
    pub act25: Option<i32>,
    pub act75: Option<i32>,
}

impl TestScorePercentiles {
    /// ACT median is not published in the CDS; approximate from the quartiles.
    pub fn act50(&self) -> Option<i32> {
        match (self.act25, self.act75) {
            (Some(lo), Some(hi)) => Some((lo + hi) / 2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpaPercentiles {
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
}

/// Common Data Set factor importance levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorImportance {
    NotConsidered,
    Considered,
    Important,
    VeryImportant,
}

impl Default for FactorImportance {
    fn default() -> Self {
        FactorImportance::NotConsidered
    }
}

impl FactorImportance {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorImportance::NotConsidered => "not_considered",
            FactorImportance::Considered => "considered",
            FactorImportance::Important => "important",
            FactorImportance::VeryImportant => "very_important",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "not_considered" => Ok(Self::NotConsidered),
            "considered" => Ok(Self::Considered),
            "important" => Ok(Self::Important),
            "very_important" => Ok(Self::VeryImportant),
            _ => Err(format!("Unknown factor importance: {}", s)),
        }
    }

    pub fn at_least_considered(&self) -> bool {
        *self >= FactorImportance::Considered
    }
}

/// CDS admission-factor weights published by the college.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CdsFactors {
    pub rigor: FactorImportance,
    pub gpa: FactorImportance,
    pub test_scores: FactorImportance,
    pub essay: FactorImportance,
    pub recommendation: FactorImportance,
    pub extracurricular: FactorImportance,
    pub first_generation: FactorImportance,
    pub legacy: FactorImportance,
    pub residency: FactorImportance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationRound {
    Early1,
    Early2,
    EarlyAction,
    RestrictiveEa,
    Regular,
    Rolling,
}

impl ApplicationRound {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationRound::Early1 => "early1",
            ApplicationRound::Early2 => "early2",
            ApplicationRound::EarlyAction => "early_action",
            ApplicationRound::RestrictiveEa => "restrictive_ea",
            ApplicationRound::Regular => "regular",
            ApplicationRound::Rolling => "rolling",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "early1" => Ok(Self::Early1),
            "early2" => Ok(Self::Early2),
            "early_action" => Ok(Self::EarlyAction),
            "restrictive_ea" => Ok(Self::RestrictiveEa),
            "regular" => Ok(Self::Regular),
            "rolling" => Ok(Self::Rolling),
            _ => Err(format!("Unknown application round: {}", s)),
        }
    }
}

impl std::fmt::Display for ApplicationRound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Published deadlines per application round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollegeDeadlines {
    pub early1: Option<DateTime<Utc>>,
    pub early2: Option<DateTime<Utc>>,
    pub early_action: Option<DateTime<Utc>>,
    pub restrictive_ea: Option<DateTime<Utc>>,
    pub regular: Option<DateTime<Utc>>,
    pub rolling: Option<DateTime<Utc>>,
}

impl CollegeDeadlines {
    pub fn for_round(&self, round: ApplicationRound) -> Option<DateTime<Utc>> {
        match round {
            ApplicationRound::Early1 => self.early1,
            ApplicationRound::Early2 => self.early2,
            ApplicationRound::EarlyAction => self.early_action,
            ApplicationRound::RestrictiveEa => self.restrictive_ea,
            ApplicationRound::Regular => self.regular,
            ApplicationRound::Rolling => self.rolling,
        }
    }

    /// Earliest deadline that is still in the future relative to `now`.
    pub fn earliest_upcoming(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        [
            self.early1,
            self.early2,
            self.early_action,
            self.restrictive_ea,
            self.regular,
            self.rolling,
        ]
        .into_iter()
        .flatten()
        .filter(|d| *d > now)
        .min()
    }

    pub fn iter_rounds(&self) -> Vec<(ApplicationRound, DateTime<Utc>)> {
        let mut out = Vec::new();
        for round in [
            ApplicationRound::Early1,
            ApplicationRound::Early2,
            ApplicationRound::EarlyAction,
            ApplicationRound::RestrictiveEa,
            ApplicationRound::Regular,
            ApplicationRound::Rolling,
        ] {
            if let Some(date) = self.for_round(round) {
                out.push((round, date));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPolicy {
    Required,
    Optional,
    TestBlind,
    Flexible,
}

impl Default for TestPolicy {
    fn default() -> Self {
        TestPolicy::Required
    }
}

impl TestPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestPolicy::Required => "required",
            TestPolicy::Optional => "optional",
            TestPolicy::TestBlind => "test_blind",
            TestPolicy::Flexible => "flexible",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "required" => Ok(Self::Required),
            "optional" => Ok(Self::Optional),
            "test_blind" => Ok(Self::TestBlind),
            "flexible" => Ok(Self::Flexible),
            _ => Err(format!("Unknown test policy: {}", s)),
        }
    }
}

/// What a college requires from an applicant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementProfile {
    pub test_policy: TestPolicy,
    pub common_app_essay_required: bool,
    pub supplemental_essays_count: u8,
    pub teacher_recommendations_required: u8,
    pub counselor_recommendation_required: bool,
    pub peer_recommendation_required: bool,
    pub interview_offered: bool,
    pub interview_required: bool,
    pub interview_type: Option<String>,
    pub portfolio_required: bool,
    pub audition_required: bool,
    pub toefl_min: Option<i32>,
    pub ielts_min: Option<f64>,
}

impl RequirementProfile {
    pub fn requires_english_proficiency(&self) -> bool {
        self.toefl_min.is_some() || self.ielts_min.is_some()
    }
}

/// Indian entrance-exam reservation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationCategory {
    General,
    Obc,
    Sc,
    St,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JeeCutoff {
    pub opening_rank: i64,
    pub closing_rank: i64,
}

/// JEE Advanced cutoff brackets per reservation category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JeeCutoffs {
    pub general: Option<JeeCutoff>,
    pub obc: Option<JeeCutoff>,
    pub sc: Option<JeeCutoff>,
    pub st: Option<JeeCutoff>,
}

impl JeeCutoffs {
    pub fn for_category(&self, category: ReservationCategory) -> Option<JeeCutoff> {
        match category {
            ReservationCategory::General => self.general,
            ReservationCategory::Obc => self.obc,
            ReservationCategory::Sc => self.sc,
            ReservationCategory::St => self.st,
        }
    }
}

/// Reconciled college record (the union view of the overlapping source
/// schemas; reconciliation happens at ingestion, not at query time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct College {
    pub id: i64,
    pub name: String,
    pub country: String,
    /// State/province, used for in-state residency bumps at public colleges.
    pub state: Option<String>,
    /// Fraction in [0, 1].
    pub acceptance_rate: f64,
    pub test_percentiles: TestScorePercentiles,
    pub gpa_percentiles: GpaPercentiles,
    pub cost_of_attendance: Option<f64>,
    pub meets_full_need: bool,
    pub need_blind: bool,
    pub is_public: bool,
    pub majors: Vec<String>,
    pub ranking: Option<i32>,
    pub cds: CdsFactors,
    pub deadlines: CollegeDeadlines,
    pub requirements: RequirementProfile,
    // Regional admissions data
    pub jee_cutoffs: Option<JeeCutoffs>,
    /// UK typical A-level offer, e.g. "AAA" or "A*AB".
    pub typical_offer: Option<String>,
    /// UK typical IB points offer.
    pub ib_typical_offer: Option<i32>,
    /// German numerus clausus cutoff (Abitur grade; lower is better).
    pub nc_cutoff: Option<f64>,
    // Scraping bookkeeping
    pub last_scraped: Option<DateTime<Utc>>,
    pub scraping_failures: u32,
    pub needs_manual_review: bool,
}

// ===== Decision Models (Fit / Chance) =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitCategory {
    Safety,
    Target,
    Reach,
    Unrealistic,
}

impl FitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitCategory::Safety => "safety",
            FitCategory::Target => "target",
            FitCategory::Reach => "reach",
            FitCategory::Unrealistic => "unrealistic",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "safety" => Ok(Self::Safety),
            "target" => Ok(Self::Target),
            "reach" => Ok(Self::Reach),
            "unrealistic" => Ok(Self::Unrealistic),
            _ => Err(format!("Unknown fit category: {}", s)),
        }
    }
}

impl std::fmt::Display for FitCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-dimension fit subscores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub academic: f64,
    pub profile: f64,
    pub financial: f64,
    pub timeline: f64,
}

/// User-overridable fit weights. Must sum to 1.0 ± 0.01.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitWeights {
    pub academic: f64,
    pub profile: f64,
    pub financial: f64,
    pub timeline: f64,
}

impl Default for FitWeights {
    /// `scoring.defaultWeights`: academic 0.40, profile 0.30,
    /// financial 0.15, timeline 0.15.
    fn default() -> Self {
        Self {
            academic: 0.40,
            profile: 0.30,
            financial: 0.15,
            timeline: 0.15,
        }
    }
}

impl FitWeights {
    pub fn sum(&self) -> f64 {
        self.academic + self.profile + self.financial + self.timeline
    }

    /// Weights are valid when they sum to 1.0 within ± 0.01.
    pub fn validate(&self) -> bool {
        (self.sum() - 1.0).abs() <= 0.01
    }
}

/// One signed factor contribution in a decision, kept for the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub weight: f64,
    pub contribution: f64,
    pub evidence: String,
}

impl Factor {
    pub fn new(
        name: impl Into<String>,
        weight: f64,
        contribution: f64,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            weight,
            contribution,
            evidence: evidence.into(),
        }
    }
}

/// Cached fit classification for a (snapshot, college) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub profile_snapshot_id: i64,
    pub college_id: i64,
    pub overall_score: f64,
    pub category: FitCategory,
    pub subscores: Subscores,
    /// Confidence in [0, 1]: 1 − missing_signals / 6.
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub factors: Vec<Factor>,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_manual_override: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChanceCategory {
    Safety,
    Target,
    Reach,
}

impl ChanceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChanceCategory::Safety => "Safety",
            ChanceCategory::Target => "Target",
            ChanceCategory::Reach => "Reach",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "Safety" => Ok(Self::Safety),
            "Target" => Ok(Self::Target),
            "Reach" => Ok(Self::Reach),
            _ => Err(format!("Unknown chance category: {}", s)),
        }
    }
}

impl std::fmt::Display for ChanceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Us,
    India,
    Uk,
    Germany,
    Eu,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::India => "India",
            Region::Uk => "UK",
            Region::Germany => "Germany",
            Region::Eu => "EU",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "US" => Ok(Self::Us),
            "India" => Ok(Self::India),
            "UK" => Ok(Self::Uk),
            "Germany" => Ok(Self::Germany),
            "EU" => Ok(Self::Eu),
            _ => Err(format!("Unknown region: {}", s)),
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic admission-chance estimate for a (snapshot, college) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChanceResult {
    pub profile_snapshot_id: i64,
    pub college_id: i64,
    /// Clamped to [0.5, 99.5].
    pub chance_percent: f64,
    pub category: ChanceCategory,
    pub region: Region,
    pub factors: Vec<Factor>,
    pub computed_at: DateTime<Utc>,
}

/// Append-only chance snapshot powering history comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChanceHistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub college_id: i64,
    pub chance_percent: f64,
    pub category: ChanceCategory,
    pub factors: Vec<Factor>,
    pub recorded_at: DateTime<Utc>,
}

// ===== Application & Task Models =====

/// Light join of user × college × round; owns the task set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub user_id: i64,
    pub college_id: i64,
    pub round: ApplicationRound,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Essay,
    Test,
    Transcript,
    Recommendation,
    Portfolio,
    Form,
    Interview,
    Other,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Essay => "essay",
            TaskType::Test => "test",
            TaskType::Transcript => "transcript",
            TaskType::Recommendation => "recommendation",
            TaskType::Portfolio => "portfolio",
            TaskType::Form => "form",
            TaskType::Interview => "interview",
            TaskType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "essay" => Ok(Self::Essay),
            "test" => Ok(Self::Test),
            "transcript" => Ok(Self::Transcript),
            "recommendation" => Ok(Self::Recommendation),
            "portfolio" => Ok(Self::Portfolio),
            "form" => Ok(Self::Form),
            "interview" => Ok(Self::Interview),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown task type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Blocked,
    Complete,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Complete => "complete",
            TaskStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "complete" => Ok(Self::Complete),
            "skipped" => Ok(Self::Skipped),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }

    /// A dependency is satisfied once its prerequisite is complete or skipped.
    pub fn satisfies_dependency(&self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Skipped)
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Complete | TaskStatus::Skipped)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical kinds emitted by the decomposer; reusable kinds link across
/// colleges via `reuse_template_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalTaskKind {
    MainForm,
    MainEssay,
    SupplementalEssay,
    TeacherRecommendation,
    CounselorRecommendation,
    PeerRecommendation,
    TestScores,
    EnglishProficiency,
    Interview,
    Portfolio,
    FinalSubmit,
}

impl CanonicalTaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalTaskKind::MainForm => "main_form",
            CanonicalTaskKind::MainEssay => "main_essay",
            CanonicalTaskKind::SupplementalEssay => "supplemental_essay",
            CanonicalTaskKind::TeacherRecommendation => "teacher_recommendation",
            CanonicalTaskKind::CounselorRecommendation => "counselor_recommendation",
            CanonicalTaskKind::PeerRecommendation => "peer_recommendation",
            CanonicalTaskKind::TestScores => "test_scores",
            CanonicalTaskKind::EnglishProficiency => "english_proficiency",
            CanonicalTaskKind::Interview => "interview",
            CanonicalTaskKind::Portfolio => "portfolio",
            CanonicalTaskKind::FinalSubmit => "final_submit",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "main_form" => Ok(Self::MainForm),
            "main_essay" => Ok(Self::MainEssay),
            "supplemental_essay" => Ok(Self::SupplementalEssay),
            "teacher_recommendation" => Ok(Self::TeacherRecommendation),
            "counselor_recommendation" => Ok(Self::CounselorRecommendation),
            "peer_recommendation" => Ok(Self::PeerRecommendation),
            "test_scores" => Ok(Self::TestScores),
            "english_proficiency" => Ok(Self::EnglishProficiency),
            "interview" => Ok(Self::Interview),
            "portfolio" => Ok(Self::Portfolio),
            "final_submit" => Ok(Self::FinalSubmit),
            _ => Err(format!("Unknown canonical task kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub application_id: i64,
    pub user_id: i64,
    pub college_id: i64,
    pub title: String,
    pub task_type: TaskType,
    pub canonical_kind: CanonicalTaskKind,
    /// Ordinal for repeated kinds (supplemental essay #k, teacher rec #k).
    pub ordinal: u8,
    pub status: TaskStatus,
    pub estimated_hours: f64,
    pub deadline: Option<DateTime<Utc>>,
    /// Priority 1 (highest) to 4.
    pub priority: u8,
    pub is_reusable: bool,
    pub reuse_template_id: Option<i64>,
    /// Set when the reuse template completed; the submission stays per-college.
    pub content_ready: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Blocks,
    SoftDepends,
    ShouldCompleteFirst,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Blocks => "blocks",
            DependencyType::SoftDepends => "soft_depends",
            DependencyType::ShouldCompleteFirst => "should_complete_first",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "blocks" => Ok(Self::Blocks),
            "soft_depends" => Ok(Self::SoftDepends),
            "should_complete_first" => Ok(Self::ShouldCompleteFirst),
            _ => Err(format!("Unknown dependency type: {}", s)),
        }
    }
}

/// Directed edge `task → depends_on_task`. The per-user graph is acyclic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDependency {
    pub task_id: i64,
    pub depends_on_task_id: i64,
    pub dependency_type: DependencyType,
    /// Advisory lead time for should-complete-first edges (days).
    pub lead_time_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusChange {
    pub id: i64,
    pub task_id: i64,
    pub from_status: TaskStatus,
    pub to_status: TaskStatus,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

// ===== Deadline & Risk Models =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineType {
    Official,
    Internal,
    Buffer,
    Personal,
}

impl DeadlineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineType::Official => "official",
            DeadlineType::Internal => "internal",
            DeadlineType::Buffer => "buffer",
            DeadlineType::Personal => "personal",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "official" => Ok(Self::Official),
            "internal" => Ok(Self::Internal),
            "buffer" => Ok(Self::Buffer),
            "personal" => Ok(Self::Personal),
            _ => Err(format!("Unknown deadline type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Tight,
    Critical,
    Impossible,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Tight => "tight",
            RiskLevel::Critical => "critical",
            RiskLevel::Impossible => "impossible",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "safe" => Ok(Self::Safe),
            "tight" => Ok(Self::Tight),
            "critical" => Ok(Self::Critical),
            "impossible" => Ok(Self::Impossible),
            _ => Err(format!("Unknown risk level: {}", s)),
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeadline {
    pub id: i64,
    pub user_id: i64,
    pub college_id: Option<i64>,
    pub application_id: Option<i64>,
    pub title: String,
    pub deadline_date: DateTime<Utc>,
    pub deadline_type: DeadlineType,
    pub risk_level: RiskLevel,
    pub buffer_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub severity: RiskLevel,
    pub detail: String,
}

/// Derived per-(user, college) risk state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub user_id: i64,
    pub college_id: i64,
    pub time_risk_level: RiskLevel,
    pub time_buffer_hours: f64,
    pub tasks_total: u32,
    pub tasks_completed: u32,
    pub tasks_blocked: u32,
    /// Overall risk in [0, 100]; higher is worse.
    pub overall_risk_score: f64,
    pub risk_factors: Vec<RiskFactor>,
    pub mitigations: Vec<String>,
    pub next_critical_date: Option<DateTime<Utc>>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Warning,
    Critical,
    Impossible,
    Reminder,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
            AlertLevel::Impossible => "impossible",
            AlertLevel::Reminder => "reminder",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            "impossible" => Ok(Self::Impossible),
            "reminder" => Ok(Self::Reminder),
            _ => Err(format!("Unknown alert level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineAlert {
    pub id: i64,
    pub user_id: i64,
    pub deadline_id: i64,
    pub college_id: Option<i64>,
    pub level: AlertLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

// ===== Override & Change Log Models =====

/// User-supplied value shadowing a computed one. The engine still records
/// the computed value in the ledger so diffs stay honest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Override {
    pub id: i64,
    pub user_id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub field_name: String,
    pub original_value: String,
    pub override_value: String,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Override {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp > now,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedBy {
    User,
    System,
    Import,
}

impl ChangedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangedBy::User => "user",
            ChangedBy::System => "system",
            ChangedBy::Import => "import",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            "import" => Ok(Self::Import),
            _ => Err(format!("Unknown change source: {}", s)),
        }
    }
}

/// Append-only audit record, totally ordered per (entity_type, entity_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: ChangedBy,
    pub at: DateTime<Utc>,
}

// ===== Ledger Models =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Fit,
    Chance,
    Risk,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Fit => "fit",
            DecisionKind::Chance => "chance",
            DecisionKind::Risk => "risk",
        }
    }

    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "fit" => Ok(Self::Fit),
            "chance" => Ok(Self::Chance),
            "risk" => Ok(Self::Risk),
            _ => Err(format!("Unknown decision kind: {}", s)),
        }
    }
}

/// Immutable per-decision record: inputs, weights, factor contributions,
/// and the final output. The single source of truth for explanations and
/// history diffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: i64,
    pub user_id: i64,
    pub college_id: i64,
    pub snapshot_id: i64,
    pub kind: DecisionKind,
    pub inputs: serde_json::Value,
    pub weights: serde_json::Value,
    pub factors: Vec<Factor>,
    pub output: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ===== Model Registry Models =====

/// A trained per-college chance-overlay model version. Only one version per
/// college is deployed at a time; the flip is atomic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    pub id: i64,
    pub college_id: i64,
    pub version: i32,
    pub sample_count: i64,
    /// Validated accuracy in [0, 1].
    pub accuracy: f64,
    /// Chance nudge in percentage points, clamped to ±5 when applied.
    pub adjustment_pp: f64,
    pub deployed: bool,
    pub trained_at: DateTime<Utc>,
}
