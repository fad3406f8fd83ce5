use crate::domain::{
    Activity, ChangeLogEntry, ChangedBy, Coursework, DomainError, Profile, ProfileSnapshot,
};
use crate::ports::{Clock, DecisionStore, ProfileStore};
use crate::services::ledger_service::LedgerService;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, instrument};

/// Profile writes: every save produces an immutable snapshot and
/// invalidates the user's cached decisions before returning, so any
/// subsequent read observes the invalidation.
pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
    decisions: Arc<dyn DecisionStore>,
    ledger: Arc<LedgerService>,
    clock: Arc<dyn Clock>,
}

impl ProfileService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        decisions: Arc<dyn DecisionStore>,
        ledger: Arc<LedgerService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            profiles,
            decisions,
            ledger,
            clock,
        }
    }

    /// Upsert the user's single profile. Returns the stored profile and
    /// the snapshot taken at this write.
    #[instrument(skip(self, profile, activities, coursework))]
    pub async fn save_profile(
        &self,
        mut profile: Profile,
        activities: Vec<Activity>,
        coursework: Vec<Coursework>,
    ) -> Result<(Profile, ProfileSnapshot)> {
        let now = self.clock.now();
        profile.completeness =
            profile.computed_completeness(activities.len(), coursework.len());
        profile.updated_at = now;

        let user_id = profile.user_id;
        let (stored, snapshot) = self
            .profiles
            .save_profile_with_snapshot(profile, activities, coursework, now)
            .await?;

        // Invalidate cached decisions before returning: the new snapshot is
        // what every subsequent scoring read must see.
        self.decisions.delete_fits_for_user(user_id).await?;
        self.decisions.delete_chances_for_user(user_id).await?;

        self.ledger
            .log_change(ChangeLogEntry {
                id: 0,
                user_id: Some(user_id),
                entity_type: "profile".to_string(),
                entity_id: stored.id,
                action: "saved".to_string(),
                field_name: None,
                old_value: None,
                new_value: Some(format!("snapshot {}", snapshot.id)),
                changed_by: ChangedBy::User,
                at: now,
            })
            .await?;

        info!(user_id, profile_id = stored.id, snapshot_id = snapshot.id, "profile saved");
        Ok((stored, snapshot))
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<Profile> {
        self.profiles
            .get_profile_by_user(user_id)
            .await?
            .ok_or_else(|| DomainError::ProfileNotFound(user_id).into())
    }

    /// Latest snapshot for a user, creating one from the current profile
    /// when none exists yet.
    pub async fn snapshot_for_scoring(&self, user_id: i64) -> Result<ProfileSnapshot> {
        if let Some(snapshot) = self.profiles.latest_snapshot(user_id).await? {
            return Ok(snapshot);
        }
        let profile = self.get_profile(user_id).await?;
        Ok(self
            .profiles
            .create_snapshot(profile.id, self.clock.now())
            .await?)
    }
}
