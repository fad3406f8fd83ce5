use crate::domain::{Activity, Coursework, FitWeights, Profile, ProfileSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get a profile by id
    async fn get_profile(&self, profile_id: i64) -> anyhow::Result<Option<Profile>>;

    /// Get the single profile owned by a user
    async fn get_profile_by_user(&self, user_id: i64) -> anyhow::Result<Option<Profile>>;

    /// Get activities owned by a profile
    async fn get_activities(&self, profile_id: i64) -> anyhow::Result<Vec<Activity>>;

    /// Get coursework owned by a profile
    async fn get_coursework(&self, profile_id: i64) -> anyhow::Result<Vec<Coursework>>;

    /// Atomically upsert a profile with its activities and coursework and
    /// record an immutable snapshot of the new state. Either everything
    /// commits or nothing does.
    ///
    /// Returns the stored profile (with assigned ids) and the snapshot.
    async fn save_profile_with_snapshot(
        &self,
        profile: Profile,
        activities: Vec<Activity>,
        coursework: Vec<Coursework>,
        taken_at: DateTime<Utc>,
    ) -> anyhow::Result<(Profile, ProfileSnapshot)>;

    /// Create a snapshot of the current stored state of a profile
    async fn create_snapshot(
        &self,
        profile_id: i64,
        taken_at: DateTime<Utc>,
    ) -> anyhow::Result<ProfileSnapshot>;

    /// Most recent snapshot for a user, if any
    async fn latest_snapshot(&self, user_id: i64) -> anyhow::Result<Option<ProfileSnapshot>>;

    /// Get a snapshot by id
    async fn get_snapshot(&self, snapshot_id: i64) -> anyhow::Result<Option<ProfileSnapshot>>;

    /// Get user-overridden fit weights, if set
    async fn get_user_weights(&self, user_id: i64) -> anyhow::Result<Option<FitWeights>>;

    /// Set user fit weights (validation happens in the service)
    async fn set_user_weights(&self, user_id: i64, weights: FitWeights) -> anyhow::Result<()>;
}
