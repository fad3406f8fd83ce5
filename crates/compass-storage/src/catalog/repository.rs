use super::models::{CollegeBindings, CollegeRow, ModelVersionRow};
use crate::convert::to_millis;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compass_core::domain::{College, CollegeDeadlines, ModelVersion};
use compass_core::ports::CollegeStore;
use sqlx::{query, query_as, SqlitePool};

const COLLEGE_COLUMNS: &str = "id, name, country, state, acceptance_rate, sat25, sat50, sat75, \
     act25, act75, gpa25, gpa50, gpa75, cost_of_attendance, meets_full_need, need_blind, \
     is_public, majors, ranking, cds_factors, deadline_early1, deadline_early2, \
     deadline_early_action, deadline_restrictive_ea, deadline_regular, deadline_rolling, \
     test_policy, common_app_essay_required, supplemental_essays_count, \
     teacher_recommendations_required, counselor_recommendation_required, \
     peer_recommendation_required, interview_offered, interview_required, interview_type, \
     portfolio_required, audition_required, toefl_min, ielts_min, jee_cutoffs, typical_offer, \
     ib_typical_offer, nc_cutoff, last_scraped, scraping_failures, needs_manual_review";

pub struct SqliteCollegeStore {
    pool: SqlitePool,
}

impl SqliteCollegeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CollegeStore for SqliteCollegeStore {
    async fn get_college(&self, college_id: i64) -> anyhow::Result<Option<College>> {
        let sql = format!("SELECT {} FROM colleges WHERE id = ?", COLLEGE_COLUMNS);
        let row = query_as::<_, CollegeRow>(&sql)
            .bind(college_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CollegeRow::into_domain).transpose()
    }

    async fn get_colleges(&self, college_ids: Vec<i64>) -> anyhow::Result<Vec<College>> {
        if college_ids.is_empty() {
            return Ok(vec![]);
        }
        let placeholders = vec!["?"; college_ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM colleges WHERE id IN ({}) ORDER BY id",
            COLLEGE_COLUMNS, placeholders
        );
        let mut q = query_as::<_, CollegeRow>(&sql);
        for id in &college_ids {
            q = q.bind(id);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(CollegeRow::into_domain).collect()
    }

    async fn upsert_college(&self, college: College) -> anyhow::Result<College> {
        let b = CollegeBindings::from_domain(&college)?;
        let result = query(
            "INSERT INTO colleges (
                id, name, country, state, acceptance_rate, sat25, sat50, sat75, act25, act75,
                gpa25, gpa50, gpa75, cost_of_attendance, meets_full_need, need_blind, is_public,
                majors, ranking, cds_factors, deadline_early1, deadline_early2,
                deadline_early_action, deadline_restrictive_ea, deadline_regular,
                deadline_rolling, test_policy, common_app_essay_required,
                supplemental_essays_count, teacher_recommendations_required,
                counselor_recommendation_required, peer_recommendation_required,
                interview_offered, interview_required, interview_type, portfolio_required,
                audition_required, toefl_min, ielts_min, jee_cutoffs, typical_offer,
                ib_typical_offer, nc_cutoff, last_scraped, scraping_failures,
                needs_manual_review
             ) VALUES (
                nullif(?, 0), ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?,
                ?, ?, ?,
                ?, ?,
                ?, ?,
                ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?,
                ?
             )
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                country = excluded.country,
                state = excluded.state,
                acceptance_rate = excluded.acceptance_rate,
                sat25 = excluded.sat25, sat50 = excluded.sat50, sat75 = excluded.sat75,
                act25 = excluded.act25, act75 = excluded.act75,
                gpa25 = excluded.gpa25, gpa50 = excluded.gpa50, gpa75 = excluded.gpa75,
                cost_of_attendance = excluded.cost_of_attendance,
                meets_full_need = excluded.meets_full_need,
                need_blind = excluded.need_blind,
                is_public = excluded.is_public,
                majors = excluded.majors,
                ranking = excluded.ranking,
                cds_factors = excluded.cds_factors,
                deadline_early1 = excluded.deadline_early1,
                deadline_early2 = excluded.deadline_early2,
                deadline_early_action = excluded.deadline_early_action,
                deadline_restrictive_ea = excluded.deadline_restrictive_ea,
                deadline_regular = excluded.deadline_regular,
                deadline_rolling = excluded.deadline_rolling,
                test_policy = excluded.test_policy,
                common_app_essay_required = excluded.common_app_essay_required,
                supplemental_essays_count = excluded.supplemental_essays_count,
                teacher_recommendations_required = excluded.teacher_recommendations_required,
                counselor_recommendation_required = excluded.counselor_recommendation_required,
                peer_recommendation_required = excluded.peer_recommendation_required,
                interview_offered = excluded.interview_offered,
                interview_required = excluded.interview_required,
                interview_type = excluded.interview_type,
                portfolio_required = excluded.portfolio_required,
                audition_required = excluded.audition_required,
                toefl_min = excluded.toefl_min,
                ielts_min = excluded.ielts_min,
                jee_cutoffs = excluded.jee_cutoffs,
                typical_offer = excluded.typical_offer,
                ib_typical_offer = excluded.ib_typical_offer,
                nc_cutoff = excluded.nc_cutoff,
                last_scraped = excluded.last_scraped,
                scraping_failures = excluded.scraping_failures,
                needs_manual_review = excluded.needs_manual_review",
        )
        .bind(college.id)
        .bind(&college.name)
        .bind(&college.country)
        .bind(&college.state)
        .bind(college.acceptance_rate)
        .bind(college.test_percentiles.sat25)
        .bind(college.test_percentiles.sat50)
        .bind(college.test_percentiles.sat75)
        .bind(college.test_percentiles.act25)
        .bind(college.test_percentiles.act75)
        .bind(college.gpa_percentiles.p25)
        .bind(college.gpa_percentiles.p50)
        .bind(college.gpa_percentiles.p75)
        .bind(college.cost_of_attendance)
        .bind(college.meets_full_need as i64)
        .bind(college.need_blind as i64)
        .bind(college.is_public as i64)
        .bind(&b.majors)
        .bind(college.ranking)
        .bind(&b.cds_factors)
        .bind(b.deadline_early1)
        .bind(b.deadline_early2)
        .bind(b.deadline_early_action)
        .bind(b.deadline_restrictive_ea)
        .bind(b.deadline_regular)
        .bind(b.deadline_rolling)
        .bind(college.requirements.test_policy.as_str())
        .bind(college.requirements.common_app_essay_required as i64)
        .bind(college.requirements.supplemental_essays_count as i64)
        .bind(college.requirements.teacher_recommendations_required as i64)
        .bind(college.requirements.counselor_recommendation_required as i64)
        .bind(college.requirements.peer_recommendation_required as i64)
        .bind(college.requirements.interview_offered as i64)
        .bind(college.requirements.interview_required as i64)
        .bind(&college.requirements.interview_type)
        .bind(college.requirements.portfolio_required as i64)
        .bind(college.requirements.audition_required as i64)
        .bind(college.requirements.toefl_min)
        .bind(college.requirements.ielts_min)
        .bind(&b.jee_cutoffs)
        .bind(&college.typical_offer)
        .bind(college.ib_typical_offer)
        .bind(college.nc_cutoff)
        .bind(b.last_scraped)
        .bind(college.scraping_failures as i64)
        .bind(college.needs_manual_review as i64)
        .execute(&self.pool)
        .await?;

        let mut stored = college;
        if stored.id == 0 {
            stored.id = result.last_insert_rowid();
        }
        Ok(stored)
    }

    async fn update_deadlines(
        &self,
        college_id: i64,
        deadlines: CollegeDeadlines,
        scraped_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        query(
            "UPDATE colleges SET
                deadline_early1 = ?, deadline_early2 = ?, deadline_early_action = ?,
                deadline_restrictive_ea = ?, deadline_regular = ?, deadline_rolling = ?,
                last_scraped = ?, scraping_failures = 0
             WHERE id = ?",
        )
        .bind(deadlines.early1.map(to_millis))
        .bind(deadlines.early2.map(to_millis))
        .bind(deadlines.early_action.map(to_millis))
        .bind(deadlines.restrictive_ea.map(to_millis))
        .bind(deadlines.regular.map(to_millis))
        .bind(deadlines.rolling.map(to_millis))
        .bind(to_millis(scraped_at))
        .bind(college_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_scrape_failure(&self, college_id: i64) -> anyhow::Result<u32> {
        let row: Option<(i64,)> = query_as(
            "UPDATE colleges SET scraping_failures = scraping_failures + 1
             WHERE id = ? RETURNING scraping_failures",
        )
        .bind(college_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(count,)| count as u32).unwrap_or(0))
    }

    async fn mark_manual_review(&self, college_id: i64) -> anyhow::Result<()> {
        query("UPDATE colleges SET needs_manual_review = 1 WHERE id = ?")
            .bind(college_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn stale_colleges(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<College>> {
        let sql = format!(
            "SELECT {} FROM colleges
             WHERE last_scraped IS NULL OR last_scraped < ?
             ORDER BY RANDOM() LIMIT ?",
            COLLEGE_COLUMNS
        );
        let rows = query_as::<_, CollegeRow>(&sql)
            .bind(to_millis(cutoff))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(CollegeRow::into_domain).collect()
    }

    // ========================================================================
    // Model registry
    // ========================================================================

    async fn get_deployed_model(&self, college_id: i64) -> anyhow::Result<Option<ModelVersion>> {
        let row = query_as::<_, ModelVersionRow>(
            "SELECT id, college_id, version, sample_count, accuracy, adjustment_pp, deployed,
                    trained_at
             FROM model_versions WHERE college_id = ? AND deployed = 1",
        )
        .bind(college_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ModelVersionRow::into_domain))
    }

    async fn latest_model_version(
        &self,
        college_id: i64,
    ) -> anyhow::Result<Option<ModelVersion>> {
        let row = query_as::<_, ModelVersionRow>(
            "SELECT id, college_id, version, sample_count, accuracy, adjustment_pp, deployed,
                    trained_at
             FROM model_versions WHERE college_id = ?
             ORDER BY version DESC LIMIT 1",
        )
        .bind(college_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ModelVersionRow::into_domain))
    }

    async fn insert_model_version(&self, version: ModelVersion) -> anyhow::Result<ModelVersion> {
        let result = query(
            "INSERT INTO model_versions
                (college_id, version, sample_count, accuracy, adjustment_pp, deployed, trained_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(version.college_id)
        .bind(version.version)
        .bind(version.sample_count)
        .bind(version.accuracy)
        .bind(version.adjustment_pp)
        .bind(to_millis(version.trained_at))
        .execute(&self.pool)
        .await?;

        let mut stored = version;
        stored.id = result.last_insert_rowid();
        stored.deployed = false;
        Ok(stored)
    }

    async fn deploy_model(&self, college_id: i64, model_id: i64) -> anyhow::Result<()> {
        // Single transaction: readers never observe a half-installed model.
        let mut tx = self.pool.begin().await?;
        query("UPDATE model_versions SET deployed = 0 WHERE college_id = ?")
            .bind(college_id)
            .execute(&mut *tx)
            .await?;
        query("UPDATE model_versions SET deployed = 1 WHERE id = ? AND college_id = ?")
            .bind(model_id)
            .bind(college_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn training_sample_count(&self, college_id: i64) -> anyhow::Result<i64> {
        let row: (i64,) =
            query_as("SELECT COUNT(*) FROM training_samples WHERE college_id = ?")
                .bind(college_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    async fn add_training_sample(
        &self,
        college_id: i64,
        features: String,
        admitted: bool,
        recorded_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        query(
            "INSERT INTO training_samples (college_id, features, admitted, recorded_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(college_id)
        .bind(features)
        .bind(admitted as i64)
        .bind(to_millis(recorded_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
