use chrono::{Local, NaiveDateTime};

/// Source of the current local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Wall clock that follows tokio's (pausable) clock from a fixed base
#[cfg(test)]
pub struct TokioClock {
    base: NaiveDateTime,
    origin: tokio::time::Instant,
    skipped: std::sync::Mutex<chrono::Duration>,
}

#[cfg(test)]
impl TokioClock {
    pub fn starting_at(base: NaiveDateTime) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
            skipped: std::sync::Mutex::new(chrono::Duration::zero()),
        }
    }

    /// Move wall time forward without tokio time passing, like a resume
    pub fn jump(&self, by: chrono::Duration) {
        if let Ok(mut skipped) = self.skipped.lock() {
            *skipped += by;
        }
    }
}

#[cfg(test)]
impl Clock for TokioClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed()).unwrap_or_default();
        let skipped = self.skipped.lock().map(|s| *s).unwrap_or_default();
        self.base + elapsed + skipped
    }
}
