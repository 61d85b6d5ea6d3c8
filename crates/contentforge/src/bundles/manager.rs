use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::diff::AttemptDiff;
use crate::db::attempt_repo::{self, BundleAttempt, NewAttempt};
use crate::db::bundle_repo::{self, Bundle};
use crate::db::content_repo::{self, ContentSummary};
use crate::db::Database;
use crate::error::{ForgeError, Result};
use crate::models::{new_id, Page};

/// A bundle with its attempt count and the content items it still resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleDetails {
    #[serde(flatten)]
    pub bundle: Bundle,
    pub attempt_count: u64,
    pub content_items: Vec<ContentSummary>,
}

/// CRUD for bundles and their numbered attempts.
///
/// Reads scoped to a user return `None` or an empty list when the entity is
/// missing or owned by someone else; mutations return `false` in both cases.
#[derive(Clone)]
pub struct BundleManager {
    db: Database,
}

impl BundleManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create_bundle(
        &self,
        user_id: &str,
        content_ids: Vec<String>,
        name: Option<String>,
    ) -> Result<Bundle> {
        validate_content_ids(&content_ids)?;

        let now = Utc::now();
        let bundle = Bundle {
            id: new_id(),
            user_id: user_id.to_string(),
            name,
            content_ids,
            created_at: now,
            updated_at: now,
        };
        bundle_repo::insert(&self.db, &bundle)?;

        info!(
            "Created bundle {} with {} items",
            bundle.id,
            bundle.content_ids.len()
        );
        Ok(bundle)
    }

    /// Lists a user's bundles newest-first with the total count.
    pub fn get_user_bundles(&self, user_id: &str, page: Page) -> Result<(Vec<Bundle>, u64)> {
        page.validate()?;
        Ok(bundle_repo::query_by_user(
            &self.db,
            user_id,
            page.limit,
            page.offset,
        )?)
    }

    pub fn get_bundle_by_id(&self, bundle_id: &str, user_id: &str) -> Result<Option<Bundle>> {
        Ok(bundle_repo::find_owned(&self.db, bundle_id, user_id)?)
    }

    /// Partially updates a bundle. Jobs and attempts created earlier keep
    /// their own snapshot of the content ids.
    pub fn update_bundle(
        &self,
        bundle_id: &str,
        user_id: &str,
        name: Option<&str>,
        content_ids: Option<&[String]>,
    ) -> Result<bool> {
        if let Some(ids) = content_ids {
            validate_content_ids(ids)?;
        }

        let updated =
            bundle_repo::update_owned(&self.db, bundle_id, user_id, name, content_ids, Utc::now())?;
        if updated {
            debug!("Updated bundle {}", bundle_id);
        }
        Ok(updated)
    }

    /// Deletes a bundle and its attempts. Content items are untouched.
    pub fn delete_bundle(&self, bundle_id: &str, user_id: &str) -> Result<bool> {
        let deleted = bundle_repo::delete_owned(&self.db, bundle_id, user_id)?;
        if deleted {
            info!("Deleted bundle {}", bundle_id);
        }
        Ok(deleted)
    }

    /// Records a new attempt under the next free number of its bundle.
    pub fn create_bundle_attempt(&self, attempt: &NewAttempt) -> Result<BundleAttempt> {
        let created = attempt_repo::insert_next(&self.db, attempt, Utc::now())?
            .ok_or_else(|| ForgeError::not_found("bundle", attempt.bundle_id.as_str()))?;

        info!(
            "Recorded attempt #{} for bundle {}",
            created.attempt_number, created.bundle_id
        );
        Ok(created)
    }

    /// Links a result to an attempt. Only the first call takes effect.
    pub fn update_bundle_attempt_result(&self, attempt_id: &str, result_path: &str) -> Result<bool> {
        Ok(attempt_repo::set_result_path(&self.db, attempt_id, result_path)?)
    }

    /// Lists attempts by ascending number.
    pub fn get_bundle_attempts(&self, bundle_id: &str, user_id: &str) -> Result<Vec<BundleAttempt>> {
        if bundle_repo::find_owned(&self.db, bundle_id, user_id)?.is_none() {
            return Ok(Vec::new());
        }
        Ok(attempt_repo::list_for_bundle(&self.db, bundle_id)?)
    }

    pub fn get_bundle_attempt_by_id(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> Result<Option<BundleAttempt>> {
        Ok(attempt_repo::find_owned(&self.db, attempt_id, user_id)?)
    }

    /// Compares two attempts of the same bundle. `None` when either is not
    /// visible to the user or they belong to different bundles.
    pub fn get_bundle_attempt_diff(
        &self,
        attempt_id1: &str,
        attempt_id2: &str,
        user_id: &str,
    ) -> Result<Option<AttemptDiff>> {
        let Some(first) = self.get_bundle_attempt_by_id(attempt_id1, user_id)? else {
            return Ok(None);
        };
        let Some(second) = self.get_bundle_attempt_by_id(attempt_id2, user_id)? else {
            return Ok(None);
        };

        let diff = AttemptDiff::between(&first, &second);
        match &diff {
            None => debug!(
                "Refusing to diff attempts {} and {} from different bundles",
                attempt_id1, attempt_id2
            ),
            Some(d) if !d.changes.any() => debug!(
                "Attempts #{} and #{} ran with identical settings",
                first.attempt_number, second.attempt_number
            ),
            Some(_) => {}
        }
        Ok(diff)
    }

    /// Deletes one attempt. Its number is not handed out again.
    pub fn delete_bundle_attempt(&self, attempt_id: &str, user_id: &str) -> Result<bool> {
        Ok(attempt_repo::delete_owned(&self.db, attempt_id, user_id)?)
    }

    pub fn get_bundle_with_details(
        &self,
        bundle_id: &str,
        user_id: &str,
    ) -> Result<Option<BundleDetails>> {
        let Some(bundle) = bundle_repo::find_owned(&self.db, bundle_id, user_id)? else {
            return Ok(None);
        };

        let attempt_count = attempt_repo::count_for_bundle(&self.db, &bundle.id)?;
        let content_items = content_repo::find_summaries(&self.db, &bundle.content_ids)?;

        Ok(Some(BundleDetails {
            bundle,
            attempt_count,
            content_items,
        }))
    }
}

fn validate_content_ids(content_ids: &[String]) -> Result<()> {
    if content_ids.is_empty() {
        return Err(ForgeError::Validation(
            "a bundle needs at least one content id".to_string(),
        ));
    }
    if content_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ForgeError::Validation(
            "content ids must not be blank".to_string(),
        ));
    }
    Ok(())
}
