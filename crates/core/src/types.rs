/// Jobs are identified by a UUID (v4) generated at submission time.
/// Identifiers are unique for the lifetime of the process and never reused.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
