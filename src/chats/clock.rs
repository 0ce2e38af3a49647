//! Time and identifier sources injected into the repository

use chrono::Utc;
use uuid::Uuid;

/// Source of wall-clock timestamps in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// [`Clock`] backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Source of unique chat identifiers
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// [`IdGenerator`] producing random v4 UUIDs
///
/// # Examples
///
/// ```
/// use chatkeep::chats::{IdGenerator, UuidGenerator};
///
/// let id = UuidGenerator.new_id();
/// assert_eq!(id.len(), 36);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
