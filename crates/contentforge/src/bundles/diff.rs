//! Field-level comparison of two attempts on the same bundle.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::attempt_repo::BundleAttempt;
use crate::models::ProcessingType;

/// The fields of an attempt shown side by side in a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptSummary {
    pub id: String,
    pub attempt_number: u32,
    pub processing_type: ProcessingType,
    pub output_language: String,
    pub custom_instructions: Option<String>,
    pub system_prompt: String,
    pub result_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&BundleAttempt> for AttemptSummary {
    fn from(attempt: &BundleAttempt) -> Self {
        Self {
            id: attempt.id.clone(),
            attempt_number: attempt.attempt_number,
            processing_type: attempt.processing_type,
            output_language: attempt.output_language.clone(),
            custom_instructions: attempt.custom_instructions.clone(),
            system_prompt: attempt.system_prompt.clone(),
            result_path: attempt.result_path.clone(),
            created_at: attempt.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttemptChanges {
    pub processing_type_changed: bool,
    pub language_changed: bool,
    pub custom_instructions_changed: bool,
    pub system_prompt_changed: bool,
}

impl AttemptChanges {
    pub fn any(&self) -> bool {
        self.processing_type_changed
            || self.language_changed
            || self.custom_instructions_changed
            || self.system_prompt_changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptDiff {
    pub bundle_id: String,
    pub attempt1: AttemptSummary,
    pub attempt2: AttemptSummary,
    pub changes: AttemptChanges,
}

impl AttemptDiff {
    /// Compares two attempts. Attempts of different bundles are not
    /// comparable and yield `None`.
    pub fn between(first: &BundleAttempt, second: &BundleAttempt) -> Option<Self> {
        if first.bundle_id != second.bundle_id {
            return None;
        }

        let changes = AttemptChanges {
            processing_type_changed: first.processing_type != second.processing_type,
            language_changed: first.output_language != second.output_language,
            custom_instructions_changed: first.custom_instructions != second.custom_instructions,
            system_prompt_changed: first.system_prompt != second.system_prompt,
        };

        Some(Self {
            bundle_id: first.bundle_id.clone(),
            attempt1: first.into(),
            attempt2: second.into(),
            changes,
        })
    }
}
