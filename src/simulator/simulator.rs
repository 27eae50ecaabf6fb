/// Load simulator implementation.
use crate::error::AppError;
use crate::http::client::PredictTask;
use crate::simulator::config::SimulatorConfig;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;

/// Result of a single iteration.
#[derive(Debug, Clone)]
pub struct RequestResult {
    /// Success status
    pub success: bool,
    /// Latency in milliseconds
    pub latency_ms: u64,
    /// HTTP status code (if a response was received)
    pub status: Option<u16>,
    /// Index of the simulated user that made the request
    pub user: usize,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Load simulator.
///
/// Spawns independent simulated users, each running the
/// `{send request → wait → repeat}` loop with no shared mutable state
/// beyond the aggregate counters.
pub struct Simulator {
    config: SimulatorConfig,
}

impl Simulator {
    /// Create a new simulator.
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    /// Run the load test to completion with no external stop signal.
    pub async fn run<T: PredictTask + 'static>(
        &self,
        task: Arc<T>,
    ) -> Result<Vec<RequestResult>, AppError> {
        let (_stop_tx, stop_rx) = watch::channel(false);
        self.run_with_progress(task, None, stop_rx).await
    }

    /// Run the load test with optional progress bar and a stop signal.
    ///
    /// The stop signal aborts the current wait, an in-flight request, and
    /// any remaining ramp-up spawning; results collected so far are still
    /// returned.
    pub async fn run_with_progress<T: PredictTask + 'static>(
        &self,
        task: Arc<T>,
        progress_bar: Option<Arc<indicatif::ProgressBar>>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<RequestResult>, AppError> {
        let completed = Arc::new(AtomicUsize::new(0));
        let successful = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let total_latency = Arc::new(AtomicU64::new(0));
        let started = Instant::now();

        let mut handles = Vec::with_capacity(self.config.users);
        let mut spawn_signal = shutdown.clone();

        for user in 0..self.config.users {
            // Ramp-up: stagger user spawns by 1/spawn_rate seconds.
            if user > 0 && self.config.spawn_rate > 0.0 {
                let gap = Duration::from_secs_f64(1.0 / self.config.spawn_rate);
                tokio::select! {
                    _ = sleep(gap) => {}
                    _ = stopped(&mut spawn_signal) => break,
                }
            }
            if *spawn_signal.borrow() {
                break;
            }

            let task = task.clone();
            let config = self.config.clone();
            let progress = progress_bar.clone();
            let mut stop = shutdown.clone();
            let completed_clone = completed.clone();
            let successful_clone = successful.clone();
            let failed_clone = failed.clone();
            let total_latency_clone = total_latency.clone();

            let handle = tokio::spawn(async move {
                let mut results = Vec::new();
                let mut iteration = 0usize;

                loop {
                    if let Some(limit) = config.iterations {
                        if iteration >= limit {
                            break;
                        }
                    }
                    if *stop.borrow() {
                        break;
                    }

                    // Wait only between iterations: N iterations, N-1 waits.
                    if iteration > 0 {
                        tokio::select! {
                            _ = sleep(config.wait_time.sample()) => {}
                            _ = stopped(&mut stop) => break,
                        }
                    }

                    let result = tokio::select! {
                        result = Self::execute_request(task.as_ref(), &config, user) => result,
                        _ = stopped(&mut stop) => break,
                    };

                    // Update progress
                    let completed_count = completed_clone.fetch_add(1, Ordering::Relaxed) + 1;
                    if result.success {
                        successful_clone.fetch_add(1, Ordering::Relaxed);
                        total_latency_clone.fetch_add(result.latency_ms, Ordering::Relaxed);
                    } else {
                        failed_clone.fetch_add(1, Ordering::Relaxed);
                    }

                    if let Some(ref pb) = progress {
                        let success_count = successful_clone.load(Ordering::Relaxed);
                        let fail_count = failed_clone.load(Ordering::Relaxed);
                        let total_lat = total_latency_clone.load(Ordering::Relaxed);
                        let avg_latency = if success_count > 0 {
                            total_lat / success_count as u64
                        } else {
                            0
                        };

                        let elapsed = started.elapsed().as_secs_f64();
                        let throughput = if elapsed > 0.0 {
                            completed_count as f64 / elapsed
                        } else {
                            0.0
                        };

                        pb.set_message(format!(
                            "Success: {} | Failed: {} | Avg Latency: {}ms | Throughput: {:.1} req/s",
                            success_count, fail_count, avg_latency, throughput
                        ));
                        pb.set_position(completed_count as u64);
                    }

                    results.push(result);
                    iteration += 1;
                }

                results
            });

            handles.push(handle);
        }

        // Collect all results
        let mut collected_results = Vec::new();
        for (user, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(results) => collected_results.extend(results),
                Err(e) => collected_results.push(RequestResult {
                    success: false,
                    latency_ms: 0,
                    status: None,
                    user,
                    error: Some(format!("Task join error: {}", e)),
                }),
            }
        }

        // Finish progress bar
        if let Some(ref pb) = progress_bar {
            pb.finish_with_message("Load test completed");
        }

        Ok(collected_results)
    }

    /// Execute a single request. Failures are recorded, never retried.
    async fn execute_request<T: PredictTask + ?Sized>(
        task: &T,
        config: &SimulatorConfig,
        user: usize,
    ) -> RequestResult {
        if config.dry_run {
            return RequestResult {
                success: true,
                latency_ms: 0,
                status: None,
                user,
                error: None,
            };
        }

        let start = Instant::now();

        match task.send_request().await {
            Ok(response) => RequestResult {
                success: true,
                latency_ms: start.elapsed().as_millis() as u64,
                status: Some(response.status),
                user,
                error: None,
            },
            Err(e) => RequestResult {
                success: false,
                latency_ms: 0,
                status: None,
                user,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Resolves once the stop flag flips; never resolves when no signal is wired.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
