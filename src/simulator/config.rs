/// Simulator configuration.
use std::time::Duration;

/// Harness default pacing, applied when a task does not carry its own wait
/// bounds.
pub const DEFAULT_WAIT_MS: u64 = 1000;

/// Wait interval between task iterations, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTime {
    /// Minimum wait in milliseconds
    pub min_ms: u64,
    /// Maximum wait in milliseconds
    pub max_ms: u64,
}

impl WaitTime {
    /// Create a wait interval. Fails when min exceeds max.
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, String> {
        if min_ms > max_ms {
            return Err(format!(
                "Invalid wait interval: min {}ms exceeds max {}ms",
                min_ms, max_ms
            ));
        }
        Ok(Self { min_ms, max_ms })
    }

    /// Fixed wait interval.
    pub fn constant(ms: u64) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }

    /// Draw one wait duration. Each draw is independent and falls in the
    /// inclusive `[min_ms, max_ms]` range.
    pub fn sample(&self) -> Duration {
        let ms = if self.min_ms == self.max_ms {
            self.min_ms
        } else {
            fastrand::u64(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }
}

impl Default for WaitTime {
    fn default() -> Self {
        Self::constant(DEFAULT_WAIT_MS)
    }
}

/// Load simulator configuration.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of simulated users to spawn
    pub users: usize,
    /// Iterations each user performs; `None` runs until the stop signal
    pub iterations: Option<usize>,
    /// Users spawned per second during ramp-up
    pub spawn_rate: f64,
    /// Wait interval between iterations
    pub wait_time: WaitTime,
    /// Count iterations without sending any requests
    pub dry_run: bool,
}

impl SimulatorConfig {
    /// Create a config with default pacing and a 1 user/s ramp-up.
    pub fn new(users: usize, iterations: Option<usize>) -> Self {
        Self {
            users,
            iterations,
            spawn_rate: 1.0,
            wait_time: WaitTime::default(),
            dry_run: false,
        }
    }

    /// Parse a wait interval like `"5000-9000ms"` or `"1000ms"`.
    pub fn parse_wait_time(s: &str) -> Result<WaitTime, String> {
        let trimmed = s.trim();
        let value = trimmed
            .strip_suffix("ms")
            .ok_or_else(|| format!("Invalid wait interval '{}': expected 'ms' suffix", s))?;

        match value.split_once('-') {
            Some((min, max)) => {
                let min_ms = min
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid wait interval '{}': bad minimum", s))?;
                let max_ms = max
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid wait interval '{}': bad maximum", s))?;
                WaitTime::new(min_ms, max_ms)
            }
            None => {
                let ms = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid wait interval '{}'", s))?;
                Ok(WaitTime::constant(ms))
            }
        }
    }
}
