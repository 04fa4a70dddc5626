// Job Record Codec Port

use crate::domain::JobRecord;
use crate::error::Result;

/// Converts job records to and from their stored bytes
pub trait RecordCodec: Send + Sync {
    fn encode(&self, record: &JobRecord) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<JobRecord>;
}

/// JSON record codec (production)
pub struct JsonRecordCodec;

impl RecordCodec for JsonRecordCodec {
    fn encode(&self, record: &JobRecord) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(record)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<JobRecord> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
