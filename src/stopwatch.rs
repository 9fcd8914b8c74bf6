use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    last: Instant,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.last.elapsed()
    }

    /// Time since the last tick (or reset), restarting the lap.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now - self.last;
        self.last = now;
        elapsed
    }
}

#[cfg(test)]
mod test {
    use std::{thread, time::Duration};

    use super::Stopwatch;

    #[test]
    fn test_tick_restarts_lap() {
        let mut sw = Stopwatch::new();
        thread::sleep(Duration::from_millis(5));
        let first = sw.tick();
        assert!(first >= Duration::from_millis(5));
        assert!(sw.elapsed() < first);
    }
}
