// Job State Store - primary records, lifecycle states and the two derived indices

use crate::application::constants::{
    ACTIVATABLE_INDEX, DEADLINE_INDEX, DEFAULT_SCAN_PAGE_SIZE, INDEX_RECHECK_ATTEMPTS,
    STATE_INDEX,
};
use crate::application::scan::{IndexCursor, ScanControl, ScanOutcome};
use crate::domain::{keys, DomainError, JobKey, JobRecord, JobState, JobType, Retries};
use crate::error::{AppError, Result};
use crate::port::{KeyValueStore, Namespace, RecordCodec, WriteBatch};
use std::sync::Arc;
use tracing::{debug, error};

/// Job State Store
///
/// Keeps one primary record and one state entry per job, plus:
/// - a type index entry while the job is `Activatable`
/// - a deadline index entry while the job is `Activated`
///
/// Every mutation except `update_retries` commits as a single `WriteBatch`.
/// Mutations are expected from a single writer (the log applier); reads may
/// run concurrently.
pub struct JobStateStore {
    pub(crate) kv: Arc<dyn KeyValueStore>,
    pub(crate) codec: Arc<dyn RecordCodec>,
    pub(crate) page_size: usize,
}

impl JobStateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, codec: Arc<dyn RecordCodec>) -> Self {
        Self {
            kv,
            codec,
            page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }

    /// Override how many index entries a scan reads per substrate call
    pub fn with_page_size(mut self, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(AppError::Config(
                "scan page size must be greater than 0".to_string(),
            ));
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Insert a new job as `Activatable`
    pub async fn create(&self, key: JobKey, record: &JobRecord) -> Result<()> {
        let type_key = keys::activatable_key(&record.job_type, key)?;

        if self.exists(key).await? {
            return Err(AppError::Conflict(format!("Job {} already exists", key)));
        }

        let mut batch = WriteBatch::new();
        self.put_record(&mut batch, key, record, JobState::Activatable)?;
        batch.put(Namespace::Activatable, type_key, Vec::new());
        self.kv.write(batch).await?;

        debug!(job_key = key, job_type = %record.job_type, "Job created");
        Ok(())
    }

    /// Hand the job to a worker: type entry out, deadline entry in
    pub async fn activate(&self, key: JobKey, record: &JobRecord) -> Result<()> {
        self.transition("activate", key, record, JobState::Activated)
            .await
    }

    /// Deadline elapsed without a worker response: back to `Activatable`
    pub async fn timeout(&self, key: JobKey, record: &JobRecord) -> Result<()> {
        self.transition("timeout", key, record, JobState::Activatable)
            .await
    }

    /// Worker reported failure: `Activatable` while retries remain, else `Failed`
    pub async fn fail(&self, key: JobKey, record: &JobRecord) -> Result<()> {
        self.transition("fail", key, record, record.state_after_failure())
            .await
    }

    /// External resolution (e.g. retries were raised for a failed job)
    ///
    /// A job resolved while `Activated` also loses its deadline entry.
    pub async fn resolve(&self, key: JobKey, record: &JobRecord) -> Result<()> {
        self.transition("resolve", key, record, JobState::Activatable)
            .await
    }

    /// Remove the job and every index entry it owns
    ///
    /// The deadline entry is removed only when the stored state is `Activated`;
    /// the state is read before the batch is built.
    pub async fn delete(&self, key: JobKey, record: &JobRecord) -> Result<()> {
        let current = self.get_state(key).await?;
        let stored = self.get_job(key).await?;
        let indexed = stored.as_ref().unwrap_or(record);

        let job_key = keys::job_key(key);
        let mut batch = WriteBatch::new();
        batch.delete(Namespace::Jobs, job_key);
        batch.delete(Namespace::JobStates, job_key);
        batch.delete(
            Namespace::Activatable,
            keys::activatable_key(&indexed.job_type, key)?,
        );
        if current == Some(JobState::Activated) {
            batch.delete(
                Namespace::Deadlines,
                keys::deadline_key(indexed.deadline, key)?,
            );
        }
        self.kv.write(batch).await?;

        debug!(job_key = key, previous_state = ?current, "Job deleted");
        Ok(())
    }

    pub async fn exists(&self, key: JobKey) -> Result<bool> {
        self.kv.exists(Namespace::Jobs, &keys::job_key(key)).await
    }

    /// Stored lifecycle state, `None` if the job does not exist
    pub async fn get_state(&self, key: JobKey) -> Result<Option<JobState>> {
        match self
            .kv
            .get(Namespace::JobStates, &keys::job_key(key))
            .await?
        {
            Some(bytes) => Ok(Some(keys::decode_state_value(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn is_in_state(&self, key: JobKey, state: JobState) -> Result<bool> {
        Ok(self.get_state(key).await? == Some(state))
    }

    pub async fn get_job(&self, key: JobKey) -> Result<Option<JobRecord>> {
        match self.kv.get(Namespace::Jobs, &keys::job_key(key)).await? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Rewrite only the retries of the stored record
    ///
    /// Single-key write: state and indices are left as they are.
    pub async fn update_retries(&self, key: JobKey, retries: Retries) -> Result<Option<JobRecord>> {
        let Some(mut record) = self.get_job(key).await? else {
            return Ok(None);
        };

        record.retries = retries;
        let value = self.codec.encode(&record)?;
        self.kv
            .put(Namespace::Jobs, &keys::job_key(key), &value)
            .await?;

        debug!(job_key = key, retries, "Job retries updated");
        Ok(Some(record))
    }

    /// Visit activatable jobs of exactly `job_type` in ascending key order
    ///
    /// Entries of longer types sharing the prefix ("payroll" while scanning
    /// "pay") are skipped; the scan ends at the first key outside the prefix.
    /// Jobs removed by a batch committed while the scan runs are skipped.
    pub async fn for_each_activatable_job<F>(
        &self,
        job_type: &JobType,
        mut callback: F,
    ) -> Result<ScanOutcome>
    where
        F: FnMut(JobKey, JobRecord) -> ScanControl + Send,
    {
        let prefix = keys::activatable_prefix(job_type)?;
        let mut cursor = IndexCursor::new(
            self.kv.as_ref(),
            Namespace::Activatable,
            prefix.clone(),
            self.page_size,
        );
        let mut outcome = ScanOutcome::default();

        while let Some(entry) = cursor.next_entry().await? {
            if !entry.key.starts_with(&prefix) {
                break;
            }
            let (entry_type, key) = keys::decode_activatable_key(&entry.key)?;
            if entry_type != prefix.as_slice() {
                continue;
            }

            let Some(record) = self
                .indexed_job(key, Namespace::Activatable, &entry.key, ACTIVATABLE_INDEX)
                .await?
            else {
                continue;
            };
            outcome.visited += 1;
            if callback(key, record) == ScanControl::Stop {
                outcome.stopped = true;
                break;
            }
        }

        debug!(
            job_type = %job_type,
            visited = outcome.visited,
            stopped = outcome.stopped,
            "Activatable scan finished"
        );
        Ok(outcome)
    }

    /// Visit activated jobs with `deadline < upper_bound` in ascending deadline order
    ///
    /// The scan ends at the first entry at or past the bound.
    pub async fn for_each_timed_out_job<F>(
        &self,
        upper_bound: i64,
        mut callback: F,
    ) -> Result<ScanOutcome>
    where
        F: FnMut(JobKey, JobRecord) -> ScanControl + Send,
    {
        let mut cursor = IndexCursor::new(
            self.kv.as_ref(),
            Namespace::Deadlines,
            Vec::new(),
            self.page_size,
        );
        let mut outcome = ScanOutcome::default();

        while let Some(entry) = cursor.next_entry().await? {
            let (deadline, key) = keys::decode_deadline_key(&entry.key)?;
            if deadline >= upper_bound {
                break;
            }

            let Some(record) = self
                .indexed_job(key, Namespace::Deadlines, &entry.key, DEADLINE_INDEX)
                .await?
            else {
                continue;
            };
            outcome.visited += 1;
            if callback(key, record) == ScanControl::Stop {
                outcome.stopped = true;
                break;
            }
        }

        debug!(
            upper_bound,
            visited = outcome.visited,
            stopped = outcome.stopped,
            "Timed out scan finished"
        );
        Ok(outcome)
    }

    /// Shared body of activate/timeout/fail/resolve
    ///
    /// Clears the index entry implied by the stored state and record, then
    /// writes the new record, the new state and the entry `next` implies.
    async fn transition(
        &self,
        op: &'static str,
        key: JobKey,
        record: &JobRecord,
        next: JobState,
    ) -> Result<()> {
        let fresh = index_entry(key, record, next)?;

        let Some((current, stored)) = self.current(key).await? else {
            return Err(AppError::NotFound(format!(
                "Cannot {} job {}: no job found",
                op, key
            )));
        };
        let stale = index_entry(key, &stored, current)?;

        let mut batch = WriteBatch::new();
        if let Some((ns, stale_key)) = stale {
            batch.delete(ns, stale_key);
        }
        self.put_record(&mut batch, key, record, next)?;
        if let Some((ns, fresh_key)) = fresh {
            batch.put(ns, fresh_key, Vec::new());
        }
        self.kv.write(batch).await?;

        debug!(op, job_key = key, from = %current, to = %next, "Job state transition");
        Ok(())
    }

    /// Stored state and record, both or neither
    async fn current(&self, key: JobKey) -> Result<Option<(JobState, JobRecord)>> {
        match (self.get_state(key).await?, self.get_job(key).await?) {
            (Some(state), Some(record)) => Ok(Some((state, record))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(self.corruption(key, STATE_INDEX)),
            (None, Some(_)) => {
                error!(job_key = key, "Job record has no state entry");
                Err(AppError::Internal(format!(
                    "Job {} has a record but no state entry",
                    key
                )))
            }
        }
    }

    fn put_record(
        &self,
        batch: &mut WriteBatch,
        key: JobKey,
        record: &JobRecord,
        state: JobState,
    ) -> Result<()> {
        let job_key = keys::job_key(key);
        batch.put(Namespace::Jobs, job_key, self.codec.encode(record)?);
        batch.put(Namespace::JobStates, job_key, keys::state_value(state));
        Ok(())
    }

    /// Primary record behind an index entry read earlier by a scan
    ///
    /// A page can go stale before its records are read. An entry that is gone
    /// when rechecked was removed by a committed batch and is skipped (`None`).
    /// Only an entry that stays while its record stays missing is corruption.
    async fn indexed_job(
        &self,
        key: JobKey,
        ns: Namespace,
        entry_key: &[u8],
        index: &'static str,
    ) -> Result<Option<JobRecord>> {
        for _ in 0..=INDEX_RECHECK_ATTEMPTS {
            if let Some(record) = self.get_job(key).await? {
                return Ok(Some(record));
            }
            if !self.kv.exists(ns, entry_key).await? {
                debug!(job_key = key, index, "Index entry removed during scan, skipping");
                return Ok(None);
            }
        }
        Err(self.corruption(key, index))
    }

    fn corruption(&self, key: JobKey, index: &'static str) -> AppError {
        error!(job_key = key, index, "Index entry references a missing job");
        AppError::IndexCorruption {
            job_key: key,
            index,
        }
    }
}

/// Index entry a job in `state` owns, if any
fn index_entry(
    key: JobKey,
    record: &JobRecord,
    state: JobState,
) -> Result<Option<(Namespace, Vec<u8>)>> {
    if record.job_type.is_empty() {
        return Err(DomainError::EmptyJobType.into());
    }
    match state {
        JobState::Activatable => Ok(Some((
            Namespace::Activatable,
            keys::activatable_key(&record.job_type, key)?,
        ))),
        JobState::Activated => Ok(Some((
            Namespace::Deadlines,
            keys::deadline_key(record.deadline, key)?.to_vec(),
        ))),
        JobState::Failed => Ok(None),
    }
}
