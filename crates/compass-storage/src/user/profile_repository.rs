use super::models::{
    ActivityRow, CourseworkRow, ProfileRow, SnapshotPayload, SnapshotRow, WeightsRow,
};
use crate::convert::to_millis;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compass_core::domain::{Activity, Coursework, FitWeights, Profile, ProfileSnapshot};
use compass_core::ports::ProfileStore;
use sqlx::{query, query_as, Sqlite, SqlitePool, Transaction};

const PROFILE_COLUMNS: &str = "id, user_id, gpa_unweighted, gpa_weighted, sat_total, sat_math, \
     sat_ebrw, act_composite, class_rank_percentile, jee_advanced_rank, jee_main_percentile, \
     predicted_a_levels, ib_predicted, abitur_grade, board_percentage, preferences, \
     is_first_gen, is_legacy, state, country, completeness, updated_at";

pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_profile(&self, sql: &str, bind: i64) -> anyhow::Result<Option<Profile>> {
        let row = query_as::<_, ProfileRow>(sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ProfileRow::into_domain).transpose()
    }

    /// Insert a snapshot row from the given state within a transaction.
    async fn insert_snapshot_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        profile: &Profile,
        activities: &[Activity],
        coursework: &[Coursework],
        taken_at: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        let payload = SnapshotPayload {
            profile: profile.clone(),
            activities: activities.to_vec(),
            coursework: coursework.to_vec(),
        };
        let result = query(
            "INSERT INTO profile_snapshots (profile_id, user_id, taken_at, data)
             VALUES (?, ?, ?, ?)",
        )
        .bind(profile.id)
        .bind(profile.user_id)
        .bind(to_millis(taken_at))
        .bind(serde_json::to_string(&payload)?)
        .execute(&mut **tx)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get_profile(&self, profile_id: i64) -> anyhow::Result<Option<Profile>> {
        let sql = format!("SELECT {} FROM profiles WHERE id = ?", PROFILE_COLUMNS);
        self.fetch_profile(&sql, profile_id).await
    }

    async fn get_profile_by_user(&self, user_id: i64) -> anyhow::Result<Option<Profile>> {
        let sql = format!("SELECT {} FROM profiles WHERE user_id = ?", PROFILE_COLUMNS);
        self.fetch_profile(&sql, user_id).await
    }

    async fn get_activities(&self, profile_id: i64) -> anyhow::Result<Vec<Activity>> {
        let rows = query_as::<_, ActivityRow>(
            "SELECT id, profile_id, name, description, tier, hours_per_week, weeks_per_year,
                    years_participated, is_leadership
             FROM activities WHERE profile_id = ? ORDER BY id",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ActivityRow::into_domain).collect()
    }

    async fn get_coursework(&self, profile_id: i64) -> anyhow::Result<Vec<Coursework>> {
        let rows = query_as::<_, CourseworkRow>(
            "SELECT id, profile_id, name, level, final_grade, exam_score
             FROM coursework WHERE profile_id = ? ORDER BY id",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CourseworkRow::into_domain).collect()
    }

    async fn save_profile_with_snapshot(
        &self,
        profile: Profile,
        activities: Vec<Activity>,
        coursework: Vec<Coursework>,
        taken_at: DateTime<Utc>,
    ) -> anyhow::Result<(Profile, ProfileSnapshot)> {
        // One transaction for the whole write; SQLite's single writer gives
        // the per-profile serialization the engine expects.
        let mut tx = self.pool.begin().await?;

        let preferences = serde_json::to_string(&profile.preferences)?;
        query(
            "INSERT INTO profiles (
                user_id, gpa_unweighted, gpa_weighted, sat_total, sat_math, sat_ebrw,
                act_composite, class_rank_percentile, jee_advanced_rank, jee_main_percentile,
                predicted_a_levels, ib_predicted, abitur_grade, board_percentage, preferences,
                is_first_gen, is_legacy, state, country, completeness, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                gpa_unweighted = excluded.gpa_unweighted,
                gpa_weighted = excluded.gpa_weighted,
                sat_total = excluded.sat_total,
                sat_math = excluded.sat_math,
                sat_ebrw = excluded.sat_ebrw,
                act_composite = excluded.act_composite,
                class_rank_percentile = excluded.class_rank_percentile,
                jee_advanced_rank = excluded.jee_advanced_rank,
                jee_main_percentile = excluded.jee_main_percentile,
                predicted_a_levels = excluded.predicted_a_levels,
                ib_predicted = excluded.ib_predicted,
                abitur_grade = excluded.abitur_grade,
                board_percentage = excluded.board_percentage,
                preferences = excluded.preferences,
                is_first_gen = excluded.is_first_gen,
                is_legacy = excluded.is_legacy,
                state = excluded.state,
                country = excluded.country,
                completeness = excluded.completeness,
                updated_at = excluded.updated_at",
        )
        .bind(profile.user_id)
        .bind(profile.academic.gpa_unweighted)
        .bind(profile.academic.gpa_weighted)
        .bind(profile.academic.sat_total)
        .bind(profile.academic.sat_math)
        .bind(profile.academic.sat_ebrw)
        .bind(profile.academic.act_composite)
        .bind(profile.academic.class_rank_percentile)
        .bind(profile.regional.jee_advanced_rank)
        .bind(profile.regional.jee_main_percentile)
        .bind(&profile.regional.predicted_a_levels)
        .bind(profile.regional.ib_predicted)
        .bind(profile.regional.abitur_grade)
        .bind(profile.regional.board_percentage)
        .bind(&preferences)
        .bind(profile.demographics.is_first_gen as i64)
        .bind(profile.demographics.is_legacy as i64)
        .bind(&profile.demographics.state)
        .bind(&profile.demographics.country)
        .bind(profile.completeness)
        .bind(to_millis(profile.updated_at))
        .execute(&mut *tx)
        .await?;

        let (profile_id,): (i64,) = query_as("SELECT id FROM profiles WHERE user_id = ?")
            .bind(profile.user_id)
            .fetch_one(&mut *tx)
            .await?;

        // Activities and coursework are replaced wholesale on every save.
        query("DELETE FROM activities WHERE profile_id = ?")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;
        query("DELETE FROM coursework WHERE profile_id = ?")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;

        let mut stored_activities = Vec::with_capacity(activities.len());
        for activity in activities {
            let result = query(
                "INSERT INTO activities (profile_id, name, description, tier, hours_per_week,
                        weeks_per_year, years_participated, is_leadership)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(profile_id)
            .bind(&activity.name)
            .bind(&activity.description)
            .bind(activity.tier.as_u8() as i64)
            .bind(activity.hours_per_week)
            .bind(activity.weeks_per_year)
            .bind(activity.years_participated)
            .bind(activity.is_leadership as i64)
            .execute(&mut *tx)
            .await?;
            stored_activities.push(Activity {
                id: result.last_insert_rowid(),
                profile_id,
                ..activity
            });
        }

        let mut stored_coursework = Vec::with_capacity(coursework.len());
        for course in coursework {
            let result = query(
                "INSERT INTO coursework (profile_id, name, level, final_grade, exam_score)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(profile_id)
            .bind(&course.name)
            .bind(course.level.as_str())
            .bind(&course.final_grade)
            .bind(course.exam_score)
            .execute(&mut *tx)
            .await?;
            stored_coursework.push(Coursework {
                id: result.last_insert_rowid(),
                profile_id,
                ..course
            });
        }

        let mut stored_profile = profile;
        stored_profile.id = profile_id;

        let snapshot_id = Self::insert_snapshot_in_tx(
            &mut tx,
            &stored_profile,
            &stored_activities,
            &stored_coursework,
            taken_at,
        )
        .await?;

        tx.commit().await?;

        let snapshot = ProfileSnapshot {
            id: snapshot_id,
            profile_id,
            user_id: stored_profile.user_id,
            taken_at,
            profile: stored_profile.clone(),
            activities: stored_activities,
            coursework: stored_coursework,
        };
        Ok((stored_profile, snapshot))
    }

    async fn create_snapshot(
        &self,
        profile_id: i64,
        taken_at: DateTime<Utc>,
    ) -> anyhow::Result<ProfileSnapshot> {
        let profile = self
            .get_profile(profile_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("profile {} not found", profile_id))?;
        let activities = self.get_activities(profile_id).await?;
        let coursework = self.get_coursework(profile_id).await?;

        let mut tx = self.pool.begin().await?;
        let snapshot_id =
            Self::insert_snapshot_in_tx(&mut tx, &profile, &activities, &coursework, taken_at)
                .await?;
        tx.commit().await?;

        Ok(ProfileSnapshot {
            id: snapshot_id,
            profile_id,
            user_id: profile.user_id,
            taken_at,
            profile,
            activities,
            coursework,
        })
    }

    async fn latest_snapshot(&self, user_id: i64) -> anyhow::Result<Option<ProfileSnapshot>> {
        let row = query_as::<_, SnapshotRow>(
            "SELECT id, profile_id, user_id, taken_at, data
             FROM profile_snapshots WHERE user_id = ?
             ORDER BY taken_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SnapshotRow::into_domain).transpose()
    }

    async fn get_snapshot(&self, snapshot_id: i64) -> anyhow::Result<Option<ProfileSnapshot>> {
        let row = query_as::<_, SnapshotRow>(
            "SELECT id, profile_id, user_id, taken_at, data
             FROM profile_snapshots WHERE id = ?",
        )
        .bind(snapshot_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SnapshotRow::into_domain).transpose()
    }

    async fn get_user_weights(&self, user_id: i64) -> anyhow::Result<Option<FitWeights>> {
        let row = query_as::<_, WeightsRow>(
            "SELECT academic, profile, financial, timeline FROM user_weights WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|w| FitWeights {
            academic: w.academic,
            profile: w.profile,
            financial: w.financial,
            timeline: w.timeline,
        }))
    }

    async fn set_user_weights(&self, user_id: i64, weights: FitWeights) -> anyhow::Result<()> {
        query(
            "INSERT INTO user_weights (user_id, academic, profile, financial, timeline, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                academic = excluded.academic,
                profile = excluded.profile,
                financial = excluded.financial,
                timeline = excluded.timeline,
                updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(weights.academic)
        .bind(weights.profile)
        .bind(weights.financial)
        .bind(weights.timeline)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
