//! Submission records and the store that owns them.
//!
//! The bridge never keeps submissions around. It selects a set of ids, issues
//! bulk updates against that set, and drops the rows again. Everything goes
//! through [`SubmissionStore`], so the backing database stays outside this crate.
//!
//! [`MemoryStore`] is an in-process implementation for tests and demos.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::protocol::SubmissionId;

/// Lifecycle status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "QU")]
    Queued,
    #[serde(rename = "P")]
    Processing,
    #[serde(rename = "G")]
    Grading,
    #[serde(rename = "D")]
    Done,
    #[serde(rename = "IE")]
    InternalError,
    #[serde(rename = "CE")]
    CompileError,
    #[serde(rename = "AB")]
    Aborted,
}

impl SubmissionStatus {
    /// Statuses a submission may be (re)judged from: waiting, or finished.
    pub const JUDGEABLE: [SubmissionStatus; 2] = [SubmissionStatus::Queued, SubmissionStatus::Done];

    /// Short status code as stored and published.
    pub fn code(self) -> &'static str {
        match self {
            SubmissionStatus::Queued => "QU",
            SubmissionStatus::Processing => "P",
            SubmissionStatus::Grading => "G",
            SubmissionStatus::Done => "D",
            SubmissionStatus::InternalError => "IE",
            SubmissionStatus::CompileError => "CE",
            SubmissionStatus::Aborted => "AB",
        }
    }
}

/// Final verdict of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionResult {
    Ac,
    Wa,
    Tle,
    Mle,
    Ole,
    Ir,
    Rte,
    Ce,
    Ie,
    Sc,
    Ab,
}

/// Contest participation of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestEntry {
    /// Contest key.
    pub key: String,
    /// The contest only runs pretests until it ends.
    pub run_pretests_only: bool,
    /// The problem is marked as pretested within the contest.
    pub problem_is_pretested: bool,
}

impl ContestEntry {
    /// Whether a fresh judging of this submission should run pretests only.
    pub fn wants_pretests(&self) -> bool {
        self.run_pretests_only && self.problem_is_pretested
    }
}

/// A submission as the bridge sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: SubmissionId,
    pub user_id: u64,
    pub problem_code: String,
    pub problem_is_public: bool,
    pub language_key: String,
    pub source: String,
    pub status: SubmissionStatus,
    pub result: Option<SubmissionResult>,
    pub time: Option<f64>,
    pub memory: Option<f64>,
    pub points: Option<f64>,
    pub case_points: f64,
    pub case_total: f64,
    pub error: Option<String>,
    pub was_rejudged: bool,
    pub is_pretested: bool,
    pub contest: Option<ContestEntry>,
    /// Opaque token naming the submission's private event channel.
    pub id_secret: String,
}

impl WorkItem {
    /// A freshly queued submission with no results.
    pub fn new(
        id: SubmissionId,
        problem_code: impl Into<String>,
        language_key: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id,
            user_id: 0,
            problem_code: problem_code.into(),
            problem_is_public: true,
            language_key: language_key.into(),
            source: source.into(),
            status: SubmissionStatus::Queued,
            result: None,
            time: None,
            memory: None,
            points: None,
            case_points: 0.0,
            case_total: 0.0,
            error: None,
            was_rejudged: false,
            is_pretested: false,
            contest: None,
            id_secret: format!("{:016x}", id),
        }
    }

    /// Contest key, if the submission belongs to a contest.
    pub fn contest_key(&self) -> Option<&str> {
        self.contest.as_ref().map(|c| c.key.as_str())
    }
}

/// A sparse set of field assignments applied to many submissions at once.
///
/// `None` leaves a field untouched. For nullable fields, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionUpdate {
    pub status: Option<SubmissionStatus>,
    pub result: Option<Option<SubmissionResult>>,
    pub time: Option<Option<f64>>,
    pub memory: Option<Option<f64>>,
    pub points: Option<Option<f64>>,
    pub case_points: Option<f64>,
    pub case_total: Option<f64>,
    pub error: Option<Option<String>>,
    pub was_rejudged: Option<bool>,
    pub is_pretested: Option<bool>,
}

impl SubmissionUpdate {
    /// Clear every result field and put the submission back in the queue.
    pub fn rescheduled(was_rejudged: bool) -> Self {
        Self {
            status: Some(SubmissionStatus::Queued),
            result: Some(None),
            time: Some(None),
            memory: Some(None),
            points: Some(None),
            case_points: Some(0.0),
            case_total: Some(0.0),
            error: Some(None),
            was_rejudged: Some(was_rejudged),
            is_pretested: None,
        }
    }

    /// Mark the submission as failed inside the bridge rather than the judge.
    pub fn internal_error() -> Self {
        Self {
            status: Some(SubmissionStatus::InternalError),
            result: Some(Some(SubmissionResult::Ie)),
            ..Self::default()
        }
    }

    /// Mark the submission as aborted with no points.
    pub fn aborted() -> Self {
        Self {
            status: Some(SubmissionStatus::Aborted),
            result: Some(Some(SubmissionResult::Ab)),
            points: Some(Some(0.0)),
            ..Self::default()
        }
    }

    /// Mark the submission as judged on pretests only.
    pub fn pretested() -> Self {
        Self {
            is_pretested: Some(true),
            ..Self::default()
        }
    }

    /// Apply the assignments to one record.
    pub fn apply(&self, item: &mut WorkItem) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(result) = self.result {
            item.result = result;
        }
        if let Some(time) = self.time {
            item.time = time;
        }
        if let Some(memory) = self.memory {
            item.memory = memory;
        }
        if let Some(points) = self.points {
            item.points = points;
        }
        if let Some(case_points) = self.case_points {
            item.case_points = case_points;
        }
        if let Some(case_total) = self.case_total {
            item.case_total = case_total;
        }
        if let Some(error) = &self.error {
            item.error = error.clone();
        }
        if let Some(was_rejudged) = self.was_rejudged {
            item.was_rejudged = was_rejudged;
        }
        if let Some(is_pretested) = self.is_pretested {
            item.is_pretested = is_pretested;
        }
    }
}

/// Persistent storage of submissions.
///
/// Every method acts on the whole id set in one atomic operation.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Fetch the submissions among `ids`, restricted to `statuses` when given.
    ///
    /// Results are ordered by id.
    async fn select(
        &self,
        ids: &[SubmissionId],
        statuses: Option<&[SubmissionStatus]>,
    ) -> Result<Vec<WorkItem>>;

    /// Apply one update to every submission in `ids`.
    async fn bulk_update(&self, ids: &[SubmissionId], update: &SubmissionUpdate) -> Result<()>;

    /// Delete all per-test-case results recorded for `ids`.
    async fn delete_case_results(&self, ids: &[SubmissionId]) -> Result<()>;
}

#[derive(Default)]
struct MemoryTables {
    submissions: BTreeMap<SubmissionId, WorkItem>,
    case_results: HashMap<SubmissionId, usize>,
}

/// In-process [`SubmissionStore`] backed by a map.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a submission.
    pub async fn insert(&self, item: WorkItem) {
        self.tables.lock().await.submissions.insert(item.id, item);
    }

    /// Record `count` test-case results for a submission.
    pub async fn insert_case_results(&self, id: SubmissionId, count: usize) {
        *self.tables.lock().await.case_results.entry(id).or_default() += count;
    }

    /// Number of test-case results stored for a submission.
    pub async fn case_result_count(&self, id: SubmissionId) -> usize {
        self.tables
            .lock()
            .await
            .case_results
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    /// Fetch one submission.
    pub async fn get(&self, id: SubmissionId) -> Option<WorkItem> {
        self.tables.lock().await.submissions.get(&id).cloned()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn select(
        &self,
        ids: &[SubmissionId],
        statuses: Option<&[SubmissionStatus]>,
    ) -> Result<Vec<WorkItem>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .submissions
            .values()
            .filter(|item| ids.contains(&item.id))
            .filter(|item| statuses.map_or(true, |s| s.contains(&item.status)))
            .cloned()
            .collect())
    }

    async fn bulk_update(&self, ids: &[SubmissionId], update: &SubmissionUpdate) -> Result<()> {
        let mut tables = self.tables.lock().await;
        for id in ids {
            if let Some(item) = tables.submissions.get_mut(id) {
                update.apply(item);
            }
        }
        Ok(())
    }

    async fn delete_case_results(&self, ids: &[SubmissionId]) -> Result<()> {
        let mut tables = self.tables.lock().await;
        for id in ids {
            tables.case_results.remove(id);
        }
        Ok(())
    }
}
