//! Grouped deletion
//!
//! Files are partitioned by owning policy and each group is deleted through
//! its own handler binding. A group never aborts another group: dispatch,
//! backend and cancellation failures are recorded against the group's policy
//! and the next group proceeds.
//!
//! Each group moves through `pending -> dispatched -> sessions-cancelled ->
//! deleted -> reported`. A group that fails to dispatch skips straight to
//! `reported` with every primary locator failed.
//!
//! [`FileSystem::remove_files`] builds on this: it drops the index records of
//! the files whose objects are confirmed gone and keeps the rest.

use depot_core::models::File;
use depot_core::DeleteErrorMode;
use depot_storage::DeleteOutcome;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::context::OpContext;
use crate::error::FsResult;
use crate::filesystem::FileSystem;

/// Locators that failed to delete, per policy id. An empty list means the
/// policy's group was fully deleted.
pub type FailedByPolicy = HashMap<Uuid, Vec<String>>;

/// Partition files by policy id, keeping first-seen group order.
pub fn group_by_policy(files: Vec<File>) -> Vec<(Uuid, Vec<File>)> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut groups: Vec<(Uuid, Vec<File>)> = Vec::new();

    for file in files {
        match index.get(&file.policy_id) {
            Some(&i) => groups[i].1.push(file),
            None => {
                index.insert(file.policy_id, groups.len());
                groups.push((file.policy_id, vec![file]));
            }
        }
    }

    groups
}

/// Outcome of [`FileSystem::remove_files`].
#[derive(Debug, Default)]
pub struct Removal {
    /// Files whose objects and records are both gone
    pub removed: Vec<Uuid>,
    pub failed: FailedByPolicy,
}

/// Files whose locator is absent from their policy's failure list.
///
/// A policy missing from `failed` never reported back, so its files are kept.
pub fn removable_files<'a>(files: &'a [File], failed: &FailedByPolicy) -> Vec<&'a File> {
    files
        .iter()
        .filter(|file| {
            failed
                .get(&file.policy_id)
                .is_some_and(|locators| !locators.contains(&file.source_name))
        })
        .collect()
}

/// Derived artifacts (sidecar thumbnails) are never reported as failures:
/// they are not authoritative, so a leftover one does not block removing the
/// file record.
pub fn exclude_derived_artifacts(failed: Vec<String>, derived: &HashSet<String>) -> Vec<String> {
    failed
        .into_iter()
        .filter(|locator| !derived.contains(locator))
        .collect()
}

/// Locators collected for one group before any backend call
struct GroupPlan {
    primary: Vec<String>,
    thumbs: HashSet<String>,
}

impl GroupPlan {
    fn new(files: &[File], thumb_suffix: &str) -> Self {
        let primary = files.iter().map(|f| f.source_name.clone()).collect();
        let thumbs = files
            .iter()
            .filter(|f| f.has_sidecar_thumb())
            .map(|f| f.thumb_file(thumb_suffix))
            .collect();
        Self { primary, thumbs }
    }

    /// Primary locators followed by thumbnail locators
    fn all_locators(&self) -> Vec<String> {
        let mut locators = self.primary.clone();
        locators.extend(self.thumbs.iter().cloned());
        locators
    }

    /// Turn a backend outcome into the group's reported failures.
    fn failures(&self, outcome: DeleteOutcome, mode: DeleteErrorMode, policy_id: Uuid) -> Vec<String> {
        let failed = match (outcome.error, mode) {
            (Some(e), DeleteErrorMode::FailGroup) => {
                tracing::error!(
                    error = %e,
                    policy_id = %policy_id,
                    "Batch delete returned an error, failing the whole group"
                );
                return self.primary.clone();
            }
            (Some(e), DeleteErrorMode::TrustFailedList) => {
                tracing::error!(
                    error = %e,
                    policy_id = %policy_id,
                    failed = outcome.failed.len(),
                    "Batch delete returned an error"
                );
                outcome.failed
            }
            (None, _) => outcome.failed,
        };

        let primary: HashSet<&String> = self.primary.iter().collect();
        let (known, unknown): (Vec<String>, Vec<String>) =
            exclude_derived_artifacts(failed, &self.thumbs)
                .into_iter()
                .partition(|locator| primary.contains(locator));

        if !unknown.is_empty() {
            tracing::warn!(
                policy_id = %policy_id,
                unknown = ?unknown,
                "Backend reported failures for locators that were not requested"
            );
        }

        known
    }
}

impl FileSystem {
    /// Delete the physical objects behind `files`, grouped by policy.
    ///
    /// The result has one entry per distinct policy. Only files whose locator
    /// is absent from their policy's list may be removed from the index.
    #[tracing::instrument(skip(self, ctx, files), fields(files = files.len(), user_id = %self.user().id))]
    pub async fn delete_grouped(&self, ctx: &OpContext, files: Vec<File>) -> FailedByPolicy {
        let start = std::time::Instant::now();
        let groups = group_by_policy(files);
        let group_count = groups.len();

        let results: Vec<(Uuid, Vec<String>)> = stream::iter(groups)
            .map(|(policy_id, files)| async move {
                let failed = self.delete_group(ctx, policy_id, files).await;
                (policy_id, failed)
            })
            .buffer_unordered(self.options().delete_concurrency.max(1))
            .collect()
            .await;

        let failed: FailedByPolicy = results.into_iter().collect();

        tracing::info!(
            groups = group_count,
            failed = failed.values().map(Vec::len).sum::<usize>(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Grouped deletion finished"
        );

        failed
    }

    /// Delete the objects behind `files`, then the records of every file
    /// whose objects are confirmed gone. Released bytes are credited back to
    /// the owner.
    #[tracing::instrument(skip(self, ctx, files), fields(files = files.len(), user_id = %self.user().id))]
    pub async fn remove_files(&self, ctx: &OpContext, files: Vec<File>) -> FsResult<Removal> {
        let owner = self.user().id;
        let failed = self.delete_grouped(ctx, files.clone()).await;

        let removable: Vec<&File> = removable_files(&files, &failed)
            .into_iter()
            .filter(|file| file.user_id == owner)
            .collect();
        if removable.is_empty() {
            return Ok(Removal {
                removed: Vec::new(),
                failed,
            });
        }

        let removed: Vec<Uuid> = removable.iter().map(|file| file.id).collect();
        let deleted = self.files().delete_files(&removed, owner).await?;

        let released: u64 = removable.iter().map(|file| file.size).sum();
        if let Err(e) = self.files().decrease_user_storage(owner, released).await {
            tracing::error!(
                error = %e,
                size_bytes = released,
                "Failed to release storage for removed files"
            );
        }

        tracing::info!(
            requested = files.len(),
            removed = deleted,
            size_bytes = released,
            "File records removed"
        );

        Ok(Removal { removed, failed })
    }

    #[tracing::instrument(skip(self, ctx, files), fields(policy_id = %policy_id, files = files.len()))]
    async fn delete_group(&self, ctx: &OpContext, policy_id: Uuid, files: Vec<File>) -> Vec<String> {
        let plan = GroupPlan::new(&files, &self.options().thumb_file_suffix);
        let sessions = self.collect_upload_sessions(&files).await;

        if ctx.is_cancelled() {
            tracing::warn!("Deletion cancelled before dispatch");
            return plan.primary;
        }

        let binding = match self.dispatcher().dispatch(policy_id).await {
            Ok(binding) => binding,
            Err(e) => {
                tracing::error!(error = %e, "Failed to dispatch handler, group not deleted");
                return plan.primary;
            }
        };

        self.cancel_upload_sessions(ctx, binding.handler.as_ref(), &sessions)
            .await;

        let locators = plan.all_locators();
        let outcome = match ctx.run(binding.handler.delete(&locators)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Batch delete interrupted");
                return plan.primary;
            }
        };

        plan.failures(outcome, self.options().delete_error_mode, policy_id)
    }
}
