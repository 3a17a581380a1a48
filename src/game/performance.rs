//! Tick timing monitor
//!
//! Keeps a rolling window of tick durations and classifies them against the
//! tick budget. Purely observational: the driver logs the status, nothing
//! here changes the tick cadence or entity counts.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples kept in the rolling window
const WINDOW: usize = 120;
/// Samples required before the status moves off `Excellent`
const MIN_SAMPLES: usize = 10;

/// Performance status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceStatus {
    /// Under 30% of the budget
    Excellent,
    Good,
    /// Over 70% of the budget
    Warning,
    /// Over 90% of the budget
    Critical,
    /// Sustained overrun, over 150% of the budget
    Catastrophic,
}

impl PerformanceStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            PerformanceStatus::Warning | PerformanceStatus::Critical | PerformanceStatus::Catastrophic
        )
    }
}

/// Rolling tick-duration monitor
pub struct PerformanceMonitor {
    tick_durations: VecDeque<Duration>,
    /// Tick period
    budget: Duration,
    status: PerformanceStatus,
    tick_start: Option<Instant>,
    last_entity_count: usize,
    overruns: u64,
}

impl PerformanceMonitor {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            tick_durations: VecDeque::with_capacity(WINDOW),
            budget: Duration::from_millis(tick_ms.max(1)),
            status: PerformanceStatus::Excellent,
            tick_start: None,
            last_entity_count: 0,
            overruns: 0,
        }
    }

    /// Start timing a tick
    pub fn tick_start(&mut self) {
        self.tick_start = Some(Instant::now());
    }

    /// Stop timing; returns the measured duration if a tick was open
    pub fn tick_end(&mut self, entity_count: usize) -> Option<Duration> {
        let duration = self.tick_start.take()?.elapsed();
        self.record_tick(duration);
        self.last_entity_count = entity_count;
        Some(duration)
    }

    fn record_tick(&mut self, duration: Duration) {
        if duration > self.budget {
            self.overruns += 1;
        }
        self.tick_durations.push_back(duration);
        while self.tick_durations.len() > WINDOW {
            self.tick_durations.pop_front();
        }
        self.update_status();
    }

    fn update_status(&mut self) {
        if self.tick_durations.len() < MIN_SAMPLES {
            return;
        }

        let ratio = self.average_tick_duration().as_secs_f32() / self.budget.as_secs_f32();
        self.status = if ratio < 0.3 {
            PerformanceStatus::Excellent
        } else if ratio < 0.7 {
            PerformanceStatus::Good
        } else if ratio < 0.9 {
            PerformanceStatus::Warning
        } else if ratio < 1.5 {
            PerformanceStatus::Critical
        } else {
            PerformanceStatus::Catastrophic
        };
    }

    pub fn average_tick_duration(&self) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.tick_durations.iter().sum();
        sum / self.tick_durations.len() as u32
    }

    /// 95th percentile of the window
    pub fn p95_tick_duration(&self) -> Duration {
        let mut sorted: Vec<_> = self.tick_durations.iter().copied().collect();
        sorted.sort_unstable();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted
            .get(idx.min(sorted.len().saturating_sub(1)))
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn status(&self) -> PerformanceStatus {
        self.status
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Average tick time as a percentage of the budget (0-100+)
    pub fn budget_usage_percent(&self) -> f32 {
        self.average_tick_duration().as_secs_f32() / self.budget.as_secs_f32() * 100.0
    }

    /// Ticks that took longer than the budget since start
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn last_entity_count(&self) -> usize {
        self.last_entity_count
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget, {} entities",
            self.status,
            self.budget_usage_percent(),
            self.last_entity_count
        )
    }
}
