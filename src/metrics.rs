//! Prometheus-compatible metrics endpoint
//!
//! Exposes simulation counters in Prometheus text format and as JSON.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::game::engine::TickReport;
use crate::game::performance::PerformanceStatus;

const HISTORY: usize = 1000;

/// Metrics registry for the simulation
#[derive(Debug)]
pub struct Metrics {
    // Entity counts
    pub players: AtomicU64,
    pub sentinels: AtomicU64,
    pub projectiles: AtomicU64,
    pub statics: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    // 0=Excellent .. 4=Catastrophic
    pub performance_status: AtomicU64,
    pub budget_usage_percent: AtomicU64,

    pub tick_count: AtomicU64,
    pub static_rebuilds: AtomicU64,
    pub snapshots_sent: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
}

fn status_code(status: PerformanceStatus) -> u64 {
    match status {
        PerformanceStatus::Excellent => 0,
        PerformanceStatus::Good => 1,
        PerformanceStatus::Warning => 2,
        PerformanceStatus::Critical => 3,
        PerformanceStatus::Catastrophic => 4,
    }
}

fn status_name(code: u64) -> &'static str {
    match code {
        0 => "excellent",
        1 => "good",
        2 => "warning",
        3 => "critical",
        _ => "catastrophic",
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            players: AtomicU64::new(0),
            sentinels: AtomicU64::new(0),
            projectiles: AtomicU64::new(0),
            statics: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            performance_status: AtomicU64::new(0),
            budget_usage_percent: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            static_rebuilds: AtomicU64::new(0),
            snapshots_sent: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(HISTORY)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();
            let last = sorted.len() - 1;
            let p95 = ((sorted.len() as f32 * 0.95) as usize).min(last);
            let p99 = ((sorted.len() as f32 * 0.99) as usize).min(last);

            self.tick_time_p95_us.store(sorted[p95], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted[last], Ordering::Relaxed);
        }
    }

    /// Copy the entity counts of a finished tick
    pub fn observe(&self, report: &TickReport) {
        self.players.store(report.players as u64, Ordering::Relaxed);
        self.sentinels.store(report.sentinels as u64, Ordering::Relaxed);
        self.projectiles.store(report.projectiles as u64, Ordering::Relaxed);
        self.statics.store(report.statics as u64, Ordering::Relaxed);
        if report.static_rebuilt {
            self.static_rebuilds.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn set_performance(&self, status: PerformanceStatus, budget_percent: f32) {
        self.performance_status.store(status_code(status), Ordering::Relaxed);
        self.budget_usage_percent
            .store(budget_percent.max(0.0) as u64, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("netrunner_players", "Connected players", "gauge",
            self.players.load(Ordering::Relaxed));
        metric!("netrunner_sentinels", "Live sentinels including bosses", "gauge",
            self.sentinels.load(Ordering::Relaxed));
        metric!("netrunner_projectiles", "Projectiles in flight", "gauge",
            self.projectiles.load(Ordering::Relaxed));
        metric!("netrunner_static_objects", "Terrain, ore, data nodes and landmarks", "gauge",
            self.statics.load(Ordering::Relaxed));

        metric!("netrunner_tick_time_microseconds", "Last tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("netrunner_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("netrunner_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("netrunner_tick_time_max_microseconds", "Maximum tick time in the window", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("netrunner_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("netrunner_static_rebuilds_total", "Static index rebuilds", "counter",
            self.static_rebuilds.load(Ordering::Relaxed));
        metric!("netrunner_snapshots_sent_total", "Snapshots handed to the transport", "counter",
            self.snapshots_sent.load(Ordering::Relaxed));

        let status = self.performance_status.load(Ordering::Relaxed);
        metric!("netrunner_performance_status", "Performance status (0=Excellent, 4=Catastrophic)", "gauge",
            status);
        metric!("netrunner_budget_usage_percent", "Tick budget usage percentage", "gauge",
            self.budget_usage_percent.load(Ordering::Relaxed));
        output.push_str(&format!(
            "# HELP netrunner_performance_state Human-readable performance state\n# TYPE netrunner_performance_state gauge\nnetrunner_performance_state{{state=\"{}\"}} 1\n",
            status_name(status)
        ));

        metric!("netrunner_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// JSON variant for direct API access
    pub fn to_json(&self) -> String {
        let status = self.performance_status.load(Ordering::Relaxed);
        let value = json!({
            "entities": {
                "players": self.players.load(Ordering::Relaxed),
                "sentinels": self.sentinels.load(Ordering::Relaxed),
                "projectiles": self.projectiles.load(Ordering::Relaxed),
                "statics": self.statics.load(Ordering::Relaxed),
            },
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "tick_count": self.tick_count.load(Ordering::Relaxed),
                "static_rebuilds": self.static_rebuilds.load(Ordering::Relaxed),
                "status": status,
                "status_name": status_name(status),
                "budget_percent": self.budget_usage_percent.load(Ordering::Relaxed),
            },
            "snapshots_sent": self.snapshots_sent.load(Ordering::Relaxed),
            "uptime_seconds": self.uptime_seconds(),
        });
        serde_json::to_string_pretty(&value).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}

/// Route one request line to a full HTTP response
fn respond(metrics: &Metrics, request: &str) -> String {
    if request.starts_with("GET /metrics/json") || request.starts_with("GET /json") {
        http_response("application/json", &metrics.to_json())
    } else if request.starts_with("GET /metrics") {
        http_response("text/plain; version=0.0.4", &metrics.to_prometheus())
    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
        http_response("text/plain", "OK")
    } else {
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];
            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = respond(&metrics, &request);
                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("Failed to read from metrics socket {}: {}", peer, e),
            }
        });
    }
}
