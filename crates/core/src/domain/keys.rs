// Key codec for the four job key spaces
//
// All numeric fields are fixed-width big-endian so that unsigned
// lexicographic byte order equals numeric order.
//
//   jobs         <job_key:u64>                  -> record bytes
//   job states   <job_key:u64>                  -> 1 byte state code
//   activatable  <type bytes><job_key:u64>      -> empty
//   deadlines    <deadline:u64><job_key:u64>    -> empty

use crate::domain::error::{DomainError, Result};
use crate::domain::{JobKey, JobState, JobType};

/// Encoded width of a job key
pub const JOB_KEY_LEN: usize = 8;

/// Encoded width of a deadline index key
pub const DEADLINE_KEY_LEN: usize = 16;

/// Primary / state key for a job
pub fn job_key(key: JobKey) -> [u8; JOB_KEY_LEN] {
    key.to_be_bytes()
}

pub fn decode_job_key(bytes: &[u8]) -> Result<JobKey> {
    let raw: [u8; JOB_KEY_LEN] = bytes.try_into().map_err(|_| DomainError::MalformedKey {
        space: "job",
        len: bytes.len(),
    })?;
    Ok(JobKey::from_be_bytes(raw))
}

/// State value (single byte)
pub fn state_value(state: JobState) -> [u8; 1] {
    [state.code()]
}

pub fn decode_state_value(bytes: &[u8]) -> Result<JobState> {
    match bytes {
        [code] => JobState::from_code(*code),
        _ => Err(DomainError::MalformedKey {
            space: "job state value",
            len: bytes.len(),
        }),
    }
}

/// Prefix shared by every activatable entry of `job_type`
pub fn activatable_prefix(job_type: &JobType) -> Result<Vec<u8>> {
    if job_type.is_empty() {
        return Err(DomainError::EmptyJobType);
    }
    Ok(job_type.as_bytes().to_vec())
}

/// Type index key: type bytes followed by the job key
pub fn activatable_key(job_type: &JobType, key: JobKey) -> Result<Vec<u8>> {
    let mut buf = activatable_prefix(job_type)?;
    buf.extend_from_slice(&job_key(key));
    Ok(buf)
}

/// Split a type index key into its type bytes and job key
pub fn decode_activatable_key(bytes: &[u8]) -> Result<(&[u8], JobKey)> {
    if bytes.len() <= JOB_KEY_LEN {
        return Err(DomainError::MalformedKey {
            space: "activatable",
            len: bytes.len(),
        });
    }
    let (type_bytes, key_bytes) = bytes.split_at(bytes.len() - JOB_KEY_LEN);
    Ok((type_bytes, decode_job_key(key_bytes)?))
}

/// Deadline index key: deadline followed by the job key
///
/// Deadlines are strictly positive, so the unsigned big-endian form sorts
/// the same way as the signed value.
pub fn deadline_key(deadline: i64, key: JobKey) -> Result<[u8; DEADLINE_KEY_LEN]> {
    if deadline <= 0 {
        return Err(DomainError::NonPositiveDeadline(deadline));
    }
    let mut buf = [0u8; DEADLINE_KEY_LEN];
    buf[..JOB_KEY_LEN].copy_from_slice(&(deadline as u64).to_be_bytes());
    buf[JOB_KEY_LEN..].copy_from_slice(&job_key(key));
    Ok(buf)
}

pub fn decode_deadline_key(bytes: &[u8]) -> Result<(i64, JobKey)> {
    if bytes.len() != DEADLINE_KEY_LEN {
        return Err(DomainError::MalformedKey {
            space: "deadline",
            len: bytes.len(),
        });
    }
    let (deadline_bytes, key_bytes) = bytes.split_at(JOB_KEY_LEN);
    let deadline = u64::from_be_bytes(deadline_bytes.try_into().map_err(|_| {
        DomainError::MalformedKey {
            space: "deadline",
            len: bytes.len(),
        }
    })?);
    Ok((deadline as i64, decode_job_key(key_bytes)?))
}

/// Smallest key strictly greater than `key`
pub fn successor(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0);
    next
}
