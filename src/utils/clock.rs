use chrono::{DateTime, Utc};

/// Represents an entity responsible for providing dates across application. This allows "now" to
/// be pinned during testing.
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always returns the same moment.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn time(&self) -> DateTime<Utc> {
        self.0
    }
}
