//! Collection export orchestration.
//!
//! Collections are not served directly: a client requests an export job,
//! optionally reuses a recent one, polls until every job completes, and only
//! then downloads the archives. [`CollectionExporter`] owns that lifecycle
//! for the whole target set at once, so the service can process the jobs in
//! parallel while this client polls them together.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{AppError, ExportStatus, Result};
use crate::infrastructure::RefernApi;

/// The slice of the API the orchestrator needs: status, trigger, delete.
#[async_trait]
pub trait ExportApi: Send + Sync {
    /// Current export status, `None` if the collection was never exported.
    async fn export_status(&self, collection_id: &str) -> Result<Option<ExportStatus>>;

    /// Requests a new export job and returns its initial status.
    async fn trigger_export(&self, collection_id: &str, user_id: &str) -> Result<ExportStatus>;

    /// Deletes a prior export job.
    async fn delete_export(&self, collection_id: &str, export_id: &str) -> Result<()>;
}

#[async_trait]
impl ExportApi for RefernApi {
    async fn export_status(&self, collection_id: &str) -> Result<Option<ExportStatus>> {
        Self::export_status(self, collection_id).await
    }

    async fn trigger_export(&self, collection_id: &str, user_id: &str) -> Result<ExportStatus> {
        Self::trigger_export(self, collection_id, user_id).await
    }

    async fn delete_export(&self, collection_id: &str, export_id: &str) -> Result<()> {
        Self::delete_export(self, collection_id, export_id).await
    }
}

/// A collection the orchestrator is responsible for.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub collection_id: String,
    /// Human-readable name used in log lines.
    pub display_name: String,
}

/// Polling behavior for [`CollectionExporter::await_all_completed`].
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Pause between poll rounds.
    pub interval: Duration,
    /// Bound on poll rounds; `None` polls until the service finishes.
    pub max_attempts: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

/// Drives every target collection through the export job lifecycle.
///
/// Sole owner of the per-collection status map; constructed with the full
/// target set and discarded once the archives are downloaded.
pub struct CollectionExporter<'a, A: ExportApi> {
    api: &'a A,
    user_id: String,
    targets: Vec<ExportTarget>,
    statuses: HashMap<String, Option<ExportStatus>>,
}

impl<'a, A: ExportApi> CollectionExporter<'a, A> {
    /// Fetches one status snapshot per collection.
    pub async fn new(api: &'a A, user_id: &str, targets: Vec<ExportTarget>) -> Result<Self> {
        let mut statuses = HashMap::with_capacity(targets.len());
        for target in &targets {
            let status = api.export_status(&target.collection_id).await?;
            statuses.insert(target.collection_id.clone(), status);
        }

        Ok(Self {
            api,
            user_id: user_id.to_string(),
            targets,
            statuses,
        })
    }

    /// Triggers a fresh export wherever the existing one is missing or stale.
    ///
    /// Freshness is judged from the *latest* recorded export time; a status
    /// without any recorded time counts as stale. Stale jobs are deleted
    /// before re-triggering, since the service keeps at most one per
    /// collection.
    pub async fn refresh_if_stale(&mut self, max_age: chrono::Duration) -> Result<()> {
        let targets = self.targets.clone();
        for target in &targets {
            let current = self
                .statuses
                .get(&target.collection_id)
                .cloned()
                .flatten();

            match current {
                None => {
                    tracing::info!(
                        collection = %target.collection_id,
                        name = %target.display_name,
                        "Never exported; initiating export"
                    );
                    self.trigger(&target.collection_id).await?;
                }
                Some(status) => match status.last_export_time() {
                    Some(last) if Utc::now() - last <= max_age => {
                        tracing::info!(
                            collection = %target.collection_id,
                            name = %target.display_name,
                            last_export = %last,
                            "Using recent export"
                        );
                    }
                    last => {
                        tracing::info!(
                            collection = %target.collection_id,
                            name = %target.display_name,
                            last_export = ?last,
                            "Export is stale; initiating new export"
                        );
                        self.api
                            .delete_export(&target.collection_id, &status.id)
                            .await?;
                        self.trigger(&target.collection_id).await?;
                    }
                },
            }
        }

        Ok(())
    }

    /// Polls until every collection's status reports `completed`.
    ///
    /// Returns immediately, with zero fetches, when nothing is pending. Each
    /// round re-fetches status for exactly the pending subset after waiting
    /// `poll.interval`. With `poll.max_attempts` set, exceeding the bound is
    /// a `Timeout` error.
    pub async fn await_all_completed(&mut self, poll: &PollOptions) -> Result<()> {
        let mut attempts = 0u32;

        loop {
            let pending = self.pending_collection_ids();
            if pending.is_empty() {
                return Ok(());
            }

            if let Some(max) = poll.max_attempts {
                if attempts >= max {
                    return Err(AppError::Timeout { attempts });
                }
            }

            tracing::debug!(pending = pending.len(), "Waiting for export jobs");
            for id in &pending {
                let state = self
                    .statuses
                    .get(id)
                    .and_then(|s| s.as_ref())
                    .map_or_else(|| "none".to_string(), |s| s.state.to_string());
                tracing::debug!(collection = %id, status = %state, "Pending export");
            }

            tokio::time::sleep(poll.interval).await;
            attempts += 1;

            for id in pending {
                let status = self.api.export_status(&id).await?;
                self.statuses.insert(id, status);
            }
        }
    }

    /// Download URL of a completed export.
    ///
    /// # Errors
    /// `InvalidState` if the collection has not reached `completed`;
    /// `ProtocolMismatch` if a completed status lacks a URL.
    pub fn download_url(&self, collection_id: &str) -> Result<&str> {
        let status = self
            .statuses
            .get(collection_id)
            .and_then(|s| s.as_ref())
            .filter(|s| s.is_completed())
            .ok_or_else(|| {
                AppError::invalid_state(format!(
                    "Export for collection {collection_id} has not completed"
                ))
            })?;

        status.download_url.as_deref().ok_or_else(|| {
            AppError::protocol_mismatch(format!(
                "Completed export {} has no download URL",
                status.id
            ))
        })
    }

    async fn trigger(&mut self, collection_id: &str) -> Result<()> {
        let status = self.api.trigger_export(collection_id, &self.user_id).await?;
        self.statuses.insert(collection_id.to_string(), Some(status));
        Ok(())
    }

    fn pending_collection_ids(&self) -> Vec<String> {
        self.targets
            .iter()
            .filter(|t| {
                !self
                    .statuses
                    .get(&t.collection_id)
                    .and_then(|s| s.as_ref())
                    .is_some_and(ExportStatus::is_completed)
            })
            .map(|t| t.collection_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::domain::ExportState;

    /// Scripted API double that counts calls.
    ///
    /// Each collection gets a queue of status responses; the last entry is
    /// sticky so later polls keep seeing it.
    #[derive(Default)]
    struct MockApi {
        responses: Mutex<HashMap<String, VecDeque<Option<ExportStatus>>>>,
        status_calls: Mutex<Vec<String>>,
        trigger_calls: Mutex<Vec<String>>,
        delete_calls: Mutex<Vec<(String, String)>>,
    }

    impl MockApi {
        fn script(&self, collection_id: &str, responses: Vec<Option<ExportStatus>>) {
            self.responses
                .lock()
                .unwrap()
                .insert(collection_id.to_string(), responses.into());
        }

        fn clear_status_calls(&self) {
            self.status_calls.lock().unwrap().clear();
        }

        fn status_calls(&self) -> Vec<String> {
            self.status_calls.lock().unwrap().clone()
        }

        fn trigger_calls(&self) -> Vec<String> {
            self.trigger_calls.lock().unwrap().clone()
        }

        fn delete_calls(&self) -> Vec<(String, String)> {
            self.delete_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExportApi for MockApi {
        async fn export_status(&self, collection_id: &str) -> Result<Option<ExportStatus>> {
            self.status_calls
                .lock()
                .unwrap()
                .push(collection_id.to_string());

            let mut responses = self.responses.lock().unwrap();
            let queue = responses.get_mut(collection_id).unwrap();
            let value = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            };
            Ok(value)
        }

        async fn trigger_export(
            &self,
            collection_id: &str,
            _user_id: &str,
        ) -> Result<ExportStatus> {
            self.trigger_calls
                .lock()
                .unwrap()
                .push(collection_id.to_string());

            Ok(ExportStatus {
                id: format!("exp-{collection_id}"),
                state: ExportState::Started,
                export_times: vec![Utc::now().timestamp_millis()],
                download_url: None,
            })
        }

        async fn delete_export(&self, collection_id: &str, export_id: &str) -> Result<()> {
            self.delete_calls
                .lock()
                .unwrap()
                .push((collection_id.to_string(), export_id.to_string()));
            Ok(())
        }
    }

    fn target(id: &str) -> ExportTarget {
        ExportTarget {
            collection_id: id.to_string(),
            display_name: format!("Collection {id}"),
        }
    }

    fn status(export_id: &str, state: ExportState, age_hours: i64) -> ExportStatus {
        let ts = (Utc::now() - chrono::Duration::hours(age_hours)).timestamp_millis();
        ExportStatus {
            id: export_id.to_string(),
            state,
            export_times: vec![ts],
            download_url: matches!(state, ExportState::Completed)
                .then(|| format!("https://cdn.example/{export_id}.zip")),
        }
    }

    fn fast_poll(max_attempts: Option<u32>) -> PollOptions {
        PollOptions {
            interval: Duration::ZERO,
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_construction_fetches_one_status_per_collection() {
        let api = MockApi::default();
        api.script("c1", vec![None]);
        api.script("c2", vec![Some(status("e2", ExportState::Completed, 1))]);

        let _exporter = CollectionExporter::new(&api, "user", vec![target("c1"), target("c2")])
            .await
            .unwrap();

        assert_eq!(api.status_calls(), vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_refresh_triggers_when_never_exported() {
        let api = MockApi::default();
        api.script("c1", vec![None]);

        let mut exporter = CollectionExporter::new(&api, "user", vec![target("c1")])
            .await
            .unwrap();
        exporter
            .refresh_if_stale(chrono::Duration::hours(12))
            .await
            .unwrap();

        assert_eq!(api.trigger_calls(), vec!["c1"]);
        assert!(api.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_deletes_then_triggers_when_stale() {
        let api = MockApi::default();
        api.script("c1", vec![Some(status("e-old", ExportState::Completed, 24))]);

        let mut exporter = CollectionExporter::new(&api, "user", vec![target("c1")])
            .await
            .unwrap();
        exporter
            .refresh_if_stale(chrono::Duration::hours(12))
            .await
            .unwrap();

        assert_eq!(api.delete_calls(), vec![("c1".to_string(), "e-old".to_string())]);
        assert_eq!(api.trigger_calls(), vec!["c1"]);
    }

    #[tokio::test]
    async fn test_refresh_reuses_fresh_export() {
        let api = MockApi::default();
        api.script("c1", vec![Some(status("e1", ExportState::Completed, 1))]);

        let mut exporter = CollectionExporter::new(&api, "user", vec![target("c1")])
            .await
            .unwrap();
        exporter
            .refresh_if_stale(chrono::Duration::hours(12))
            .await
            .unwrap();

        assert!(api.trigger_calls().is_empty());
        assert!(api.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_treats_missing_export_times_as_stale() {
        let api = MockApi::default();
        api.script(
            "c1",
            vec![Some(ExportStatus {
                id: "e1".into(),
                state: ExportState::Started,
                export_times: Vec::new(),
                download_url: None,
            })],
        );

        let mut exporter = CollectionExporter::new(&api, "user", vec![target("c1")])
            .await
            .unwrap();
        exporter
            .refresh_if_stale(chrono::Duration::hours(12))
            .await
            .unwrap();

        assert_eq!(api.delete_calls(), vec![("c1".to_string(), "e1".to_string())]);
        assert_eq!(api.trigger_calls(), vec!["c1"]);
    }

    #[tokio::test]
    async fn test_await_returns_immediately_when_all_completed() {
        let api = MockApi::default();
        api.script("c1", vec![Some(status("e1", ExportState::Completed, 1))]);
        api.script("c2", vec![Some(status("e2", ExportState::Completed, 1))]);

        let mut exporter = CollectionExporter::new(&api, "user", vec![target("c1"), target("c2")])
            .await
            .unwrap();
        api.clear_status_calls();

        exporter.await_all_completed(&fast_poll(None)).await.unwrap();

        assert!(api.status_calls().is_empty());
    }

    #[tokio::test]
    async fn test_await_polls_only_pending_collections() {
        let api = MockApi::default();
        api.script("c1", vec![Some(status("e1", ExportState::Completed, 1))]);
        api.script(
            "c2",
            vec![
                Some(status("e2", ExportState::Started, 0)),
                Some(status("e2", ExportState::Completed, 0)),
            ],
        );

        let mut exporter = CollectionExporter::new(&api, "user", vec![target("c1"), target("c2")])
            .await
            .unwrap();
        api.clear_status_calls();

        exporter.await_all_completed(&fast_poll(None)).await.unwrap();

        // Only the started collection is ever re-polled.
        assert_eq!(api.status_calls(), vec!["c2"]);
    }

    #[tokio::test]
    async fn test_await_times_out_when_bounded() {
        let api = MockApi::default();
        api.script("c1", vec![Some(status("e1", ExportState::Started, 0))]);

        let mut exporter = CollectionExporter::new(&api, "user", vec![target("c1")])
            .await
            .unwrap();
        api.clear_status_calls();

        let err = exporter
            .await_all_completed(&fast_poll(Some(3)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout { attempts: 3 }));
        assert_eq!(api.status_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_deleted_status_counts_as_pending() {
        let api = MockApi::default();
        api.script(
            "c1",
            vec![
                Some(status("e1", ExportState::Deleted, 0)),
                Some(status("e2", ExportState::Completed, 0)),
            ],
        );

        let mut exporter = CollectionExporter::new(&api, "user", vec![target("c1")])
            .await
            .unwrap();
        api.clear_status_calls();

        exporter.await_all_completed(&fast_poll(None)).await.unwrap();
        assert_eq!(api.status_calls(), vec!["c1"]);
    }

    #[tokio::test]
    async fn test_download_url_for_completed_export() {
        let api = MockApi::default();
        api.script("c1", vec![Some(status("e1", ExportState::Completed, 1))]);

        let exporter = CollectionExporter::new(&api, "user", vec![target("c1")])
            .await
            .unwrap();

        assert_eq!(
            exporter.download_url("c1").unwrap(),
            "https://cdn.example/e1.zip"
        );
    }

    #[tokio::test]
    async fn test_download_url_before_completion_is_invalid_state() {
        let api = MockApi::default();
        api.script("c1", vec![Some(status("e1", ExportState::Started, 0))]);

        let exporter = CollectionExporter::new(&api, "user", vec![target("c1")])
            .await
            .unwrap();

        let err = exporter.download_url("c1").unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_download_url_completed_without_url_is_protocol_mismatch() {
        let api = MockApi::default();
        api.script(
            "c1",
            vec![Some(ExportStatus {
                id: "e1".into(),
                state: ExportState::Completed,
                export_times: vec![Utc::now().timestamp_millis()],
                download_url: None,
            })],
        );

        let exporter = CollectionExporter::new(&api, "user", vec![target("c1")])
            .await
            .unwrap();

        let err = exporter.download_url("c1").unwrap_err();
        assert!(matches!(err, AppError::ProtocolMismatch { .. }));
    }
}
