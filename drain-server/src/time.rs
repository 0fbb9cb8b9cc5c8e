use std::sync::{Arc, Mutex};

use time::OffsetDateTime;

pub trait TimeSource {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Clone)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to, for driving the grace window in tests.
#[derive(Clone)]
pub struct FixedTime {
    time: Arc<Mutex<OffsetDateTime>>,
}

impl FixedTime {
    pub fn new(time: OffsetDateTime) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    pub fn set(&self, time: OffsetDateTime) {
        *self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = time;
    }

    pub fn advance(&self, by: time::Duration) {
        let mut time = self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *time += by;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> OffsetDateTime {
        *self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
