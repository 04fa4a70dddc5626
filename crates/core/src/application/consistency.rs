// Consistency verification across the four job key spaces
//
// Read-only: reports divergence between primary records, states and the
// two indices. Repair is left to log replay or snapshot restore.

use crate::application::job_state::JobStateStore;
use crate::application::scan::IndexCursor;
use crate::domain::{keys, JobKey, JobRecord, JobState};
use crate::error::Result;
use crate::port::{KvEntry, Namespace};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// A single broken invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyViolation {
    /// Primary record without a state entry
    MissingState { job_key: JobKey },
    /// State entry without a primary record
    OrphanState { job_key: JobKey },
    /// Activatable job without its type index entry
    MissingTypeEntry { job_key: JobKey },
    /// Activated job without its deadline index entry
    MissingDeadlineEntry { job_key: JobKey },
    /// Type index entry not backed by an activatable job of that type
    StaleTypeEntry { job_key: JobKey, job_type: Vec<u8> },
    /// Deadline index entry not backed by an activated job with that deadline
    StaleDeadlineEntry { job_key: JobKey, deadline: i64 },
}

/// Result of a full consistency pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub jobs: usize,
    pub states: usize,
    pub activatable_entries: usize,
    pub deadline_entries: usize,
    pub violations: Vec<ConsistencyViolation>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

impl JobStateStore {
    /// Walk every namespace and report all invariant violations
    pub async fn verify_consistency(&self) -> Result<ConsistencyReport> {
        let mut jobs: BTreeMap<JobKey, JobRecord> = BTreeMap::new();
        for entry in self.scan_all(Namespace::Jobs).await? {
            jobs.insert(keys::decode_job_key(&entry.key)?, self.codec.decode(&entry.value)?);
        }

        let mut states: BTreeMap<JobKey, JobState> = BTreeMap::new();
        for entry in self.scan_all(Namespace::JobStates).await? {
            states.insert(
                keys::decode_job_key(&entry.key)?,
                keys::decode_state_value(&entry.value)?,
            );
        }

        let mut type_entries: BTreeSet<(Vec<u8>, JobKey)> = BTreeSet::new();
        for entry in self.scan_all(Namespace::Activatable).await? {
            let (job_type, key) = keys::decode_activatable_key(&entry.key)?;
            type_entries.insert((job_type.to_vec(), key));
        }

        let mut deadline_entries: BTreeSet<(i64, JobKey)> = BTreeSet::new();
        for entry in self.scan_all(Namespace::Deadlines).await? {
            deadline_entries.insert(keys::decode_deadline_key(&entry.key)?);
        }

        let mut report = ConsistencyReport {
            jobs: jobs.len(),
            states: states.len(),
            activatable_entries: type_entries.len(),
            deadline_entries: deadline_entries.len(),
            violations: Vec::new(),
        };

        for key in jobs.keys().filter(|key| !states.contains_key(*key)) {
            report
                .violations
                .push(ConsistencyViolation::MissingState { job_key: *key });
        }

        for (key, state) in &states {
            let Some(record) = jobs.get(key) else {
                report
                    .violations
                    .push(ConsistencyViolation::OrphanState { job_key: *key });
                continue;
            };
            match state {
                JobState::Activatable => {
                    if !type_entries.contains(&(record.job_type.as_bytes().to_vec(), *key)) {
                        report
                            .violations
                            .push(ConsistencyViolation::MissingTypeEntry { job_key: *key });
                    }
                }
                JobState::Activated => {
                    if !deadline_entries.contains(&(record.deadline, *key)) {
                        report
                            .violations
                            .push(ConsistencyViolation::MissingDeadlineEntry { job_key: *key });
                    }
                }
                JobState::Failed => {}
            }
        }

        for (job_type, key) in &type_entries {
            let backed = states.get(key) == Some(&JobState::Activatable)
                && jobs
                    .get(key)
                    .is_some_and(|record| record.job_type.as_bytes() == job_type.as_slice());
            if !backed {
                report.violations.push(ConsistencyViolation::StaleTypeEntry {
                    job_key: *key,
                    job_type: job_type.clone(),
                });
            }
        }

        for (deadline, key) in &deadline_entries {
            let backed = states.get(key) == Some(&JobState::Activated)
                && jobs.get(key).is_some_and(|record| record.deadline == *deadline);
            if !backed {
                report.violations.push(ConsistencyViolation::StaleDeadlineEntry {
                    job_key: *key,
                    deadline: *deadline,
                });
            }
        }

        if report.is_consistent() {
            info!(jobs = report.jobs, "Job state consistency check passed");
        } else {
            warn!(
                jobs = report.jobs,
                violations = report.violations.len(),
                "Job state consistency check found violations"
            );
        }
        Ok(report)
    }

    async fn scan_all(&self, ns: Namespace) -> Result<Vec<KvEntry>> {
        let mut cursor = IndexCursor::new(self.kv.as_ref(), ns, Vec::new(), self.page_size);
        let mut entries = Vec::new();
        while let Some(entry) = cursor.next_entry().await? {
            entries.push(entry);
        }
        Ok(entries)
    }
}
