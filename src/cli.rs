use crate::error::AppError;
use crate::http::client::{ClientConfig, PredictTask, PredictTaskEnum};
use crate::http::tasks::empty_post::EmptyPostTask;
use crate::http::tasks::upload::{UploadTask, DEFAULT_UPLOAD_FILE};
use crate::simulator::config::{SimulatorConfig, WaitTime};
use crate::simulator::simulator::{RequestResult, Simulator};
/// CLI argument parsing and command execution.
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Predbench - Load generator for HTTP prediction endpoints.
#[derive(Parser, Debug)]
#[command(name = "predbench")]
#[command(about = "A fast CLI load generator for HTTP prediction endpoints")]
#[command(
    long_about = r#"Predbench - A load generator for HTTP prediction endpoints

Spawns simulated users against a prediction API. Each user loops
{send request -> wait -> repeat} until its iteration budget is spent or
Ctrl-C fires. Two request shapes are supported:

  empty-post   POST /predict with an empty body, pausing a random
               5000-9000ms between requests
  upload       POST /predict as a multipart upload of a local image
               (one part named "file"), with the default 1000ms pacing

EXAMPLES:
  # 10 users posting empty bodies, 100 iterations each
  predbench empty-post --base-url http://localhost:8080 --users 10 --iterations 100

  # Upload input.jpg continuously until Ctrl-C, ramping 2 users/s
  predbench upload --base-url http://localhost:8080 --users 50 --spawn-rate 2

  # Custom pacing and JSON report
  predbench upload --base-url http://localhost:8080 --iterations 10 \
      --wait-time 250-750ms --format json"#
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Hammer the prediction endpoint with empty POST requests
    #[command(name = "empty-post")]
    EmptyPost {
        /// Base URL of the target server (e.g., http://localhost:8080)
        #[arg(short, long)]
        base_url: String,

        /// Number of simulated users
        #[arg(short, long, default_value = "1")]
        users: usize,

        /// Users spawned per second during ramp-up
        #[arg(long, default_value = "1")]
        spawn_rate: f64,

        /// Iterations per user (default: run until interrupted)
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Wait between iterations (e.g., "5000-9000ms" or "1000ms")
        #[arg(long, default_value = "5000-9000ms")]
        wait_time: String,

        /// Request timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Extra request header ("Name: value"), repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Count iterations without sending any requests
        #[arg(long)]
        dry_run: bool,
    },

    /// Upload an image file to the prediction endpoint
    Upload {
        /// Base URL of the target server (e.g., http://localhost:8080)
        #[arg(short, long)]
        base_url: String,

        /// Image file uploaded on each iteration
        #[arg(short = 'F', long, default_value = DEFAULT_UPLOAD_FILE)]
        file: PathBuf,

        /// Number of simulated users
        #[arg(short, long, default_value = "1")]
        users: usize,

        /// Users spawned per second during ramp-up
        #[arg(long, default_value = "1")]
        spawn_rate: f64,

        /// Iterations per user (default: run until interrupted)
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Wait between iterations (default: the harness pacing of 1000ms)
        #[arg(long)]
        wait_time: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Extra request header ("Name: value"), repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Count iterations without sending any requests
        #[arg(long)]
        dry_run: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output
    Csv,
}

impl Cli {
    /// Execute the CLI command.
    pub fn run(self) -> Result<(), AppError> {
        match self.command {
            Command::EmptyPost {
                base_url,
                users,
                spawn_rate,
                iterations,
                wait_time,
                timeout,
                headers,
                format,
                dry_run,
            } => {
                let wait = SimulatorConfig::parse_wait_time(&wait_time).map_err(AppError::Config)?;
                let client_config = Self::build_client_config(&base_url, timeout, &headers)?;
                let task = PredictTaskEnum::EmptyPost(EmptyPostTask::new(client_config)?);
                Self::run_load_test(task, users, spawn_rate, iterations, wait, format, dry_run)
            }
            Command::Upload {
                base_url,
                file,
                users,
                spawn_rate,
                iterations,
                wait_time,
                timeout,
                headers,
                format,
                dry_run,
            } => {
                let wait = match wait_time {
                    Some(ref interval) => {
                        SimulatorConfig::parse_wait_time(interval).map_err(AppError::Config)?
                    }
                    None => WaitTime::default(),
                };
                let client_config = Self::build_client_config(&base_url, timeout, &headers)?;
                let task = PredictTaskEnum::Upload(UploadTask::new(client_config, file)?);
                Self::run_load_test(task, users, spawn_rate, iterations, wait, format, dry_run)
            }
        }
    }

    fn build_client_config(
        base_url: &str,
        timeout: u64,
        headers: &[String],
    ) -> Result<ClientConfig, AppError> {
        let mut parsed = Vec::with_capacity(headers.len());
        for header in headers {
            let (key, value) = header.split_once(':').ok_or_else(|| {
                AppError::Config(format!("Invalid header '{}': expected 'Name: value'", header))
            })?;
            parsed.push((key.trim().to_string(), value.trim().to_string()));
        }

        Ok(ClientConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(timeout),
            headers: parsed,
        })
    }

    /// Run the load test.
    fn run_load_test(
        task: PredictTaskEnum,
        users: usize,
        spawn_rate: f64,
        iterations: Option<usize>,
        wait: WaitTime,
        format: OutputFormat,
        dry_run: bool,
    ) -> Result<(), AppError> {
        let mut sim_config = SimulatorConfig::new(users, iterations);
        sim_config.spawn_rate = spawn_rate;
        sim_config.wait_time = wait;
        sim_config.dry_run = dry_run;

        if dry_run {
            eprintln!(
                "Dry run mode: No requests will be sent (task: {})",
                task.task_name()
            );
        } else {
            eprintln!(
                "Starting load test '{}' with {} users at {:.1} users/s",
                task.task_name(),
                users,
                spawn_rate
            );
        }

        let simulator = Simulator::new(sim_config);
        let task = Arc::new(task);

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| AppError::Config(format!("Failed to create async runtime: {}", e)))?;

        // Create progress bar
        let progress_bar = if !dry_run {
            let pb = match iterations {
                Some(per_user) => {
                    let pb = indicatif::ProgressBar::new((users * per_user) as u64);
                    pb.set_style(
                        indicatif::ProgressStyle::default_bar()
                            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                            .expect("valid progress bar template")
                            .progress_chars("#>-"),
                    );
                    pb
                }
                None => {
                    let pb = indicatif::ProgressBar::new_spinner();
                    pb.set_style(
                        indicatif::ProgressStyle::default_spinner()
                            .template("{spinner:.green} [{elapsed_precise}] {pos} requests {msg}")
                            .expect("valid progress bar template"),
                    );
                    pb
                }
            };
            pb.set_message("Starting load test...");
            Some(Arc::new(pb))
        } else {
            None
        };

        let results = rt.block_on(async {
            let (stop_tx, stop_rx) = watch::channel(false);

            // Ctrl-C feeds the stop signal; the simulator aborts waits and
            // in-flight requests, then reports what it has.
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = stop_tx.send(true);
                }
            });

            simulator
                .run_with_progress(task, progress_bar.clone(), stop_rx)
                .await
        })?;

        Self::display_results(&results, &format)
    }

    /// Display load test results.
    fn display_results(results: &[RequestResult], output_format: &OutputFormat) -> Result<(), AppError> {
        let total_requests = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        let failed = total_requests.saturating_sub(successful);
        let success_rate = if total_requests > 0 {
            (successful as f64 / total_requests as f64) * 100.0
        } else {
            0.0
        };
        let failure_rate = if total_requests > 0 {
            100.0 - success_rate
        } else {
            0.0
        };

        let mut latencies: Vec<u64> = results
            .iter()
            .filter_map(|r| if r.success { Some(r.latency_ms) } else { None })
            .collect();
        latencies.sort_unstable();

        let avg_latency = if !latencies.is_empty() {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        } else {
            0.0
        };

        let p50 = if latencies.is_empty() {
            0
        } else {
            latencies[latencies.len() / 2]
        };

        let p95 = if latencies.is_empty() {
            0
        } else {
            let index = ((latencies.len() as f64) * 0.95).ceil() as usize;
            latencies[index.clamp(0, latencies.len().saturating_sub(1))]
        };

        let mut status_counts: BTreeMap<u16, usize> = BTreeMap::new();
        for result in results {
            if let Some(status) = result.status {
                *status_counts.entry(status).or_default() += 1;
            }
        }

        match output_format {
            OutputFormat::Text => {
                println!("\n=== Load Test Results ===");
                println!("Total Requests: {}", total_requests);
                println!("Successful: {} ({:.1}%)", successful, success_rate);
                println!("Failed: {} ({:.1}%)", failed, failure_rate);
                println!("\nLatency (ms):");
                println!("  Average: {:.2}", avg_latency);
                println!("  p50: {}", p50);
                println!("  p95: {}", p95);

                if !status_counts.is_empty() {
                    println!("\nStatus Codes:");
                    for (code, count) in &status_counts {
                        println!("  {}: {}", code, count);
                    }
                }

                if let Some(err) = results
                    .iter()
                    .rev()
                    .find(|r| !r.success)
                    .and_then(|r| r.error.as_ref())
                {
                    println!("\nLast error: {}", err);
                }
            }
            OutputFormat::Json => {
                let status_json: serde_json::Map<String, serde_json::Value> = status_counts
                    .iter()
                    .map(|(code, count)| (code.to_string(), serde_json::Value::from(*count as u64)))
                    .collect();

                let json = serde_json::json!({
                    "total_requests": total_requests,
                    "successful": successful,
                    "failed": failed,
                    "success_rate": success_rate,
                    "latency_ms": {
                        "average": avg_latency,
                        "p50": p50,
                        "p95": p95,
                    },
                    "status_codes": status_json,
                });
                println!("{}", serde_json::to_string_pretty(&json).map_err(AppError::Json)?);
            }
            OutputFormat::Csv => {
                println!("total_requests,successful,failed,success_rate,avg_latency_ms,p50_latency_ms,p95_latency_ms");
                println!(
                    "{},{},{},{:.4},{:.2},{},{}",
                    total_requests, successful, failed, success_rate, avg_latency, p50, p95
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_post_defaults_to_locust_wait_bounds() {
        let cli = Cli::try_parse_from([
            "predbench",
            "empty-post",
            "--base-url",
            "http://localhost:8080",
            "--iterations",
            "3",
        ])
        .unwrap();

        match cli.command {
            Command::EmptyPost {
                users,
                wait_time,
                iterations,
                ..
            } => {
                assert_eq!(users, 1);
                assert_eq!(wait_time, "5000-9000ms");
                assert_eq!(iterations, Some(3));
            }
            _ => panic!("expected empty-post command"),
        }
    }

    #[test]
    fn upload_defaults_to_input_jpg_and_harness_pacing() {
        let cli = Cli::try_parse_from([
            "predbench",
            "upload",
            "--base-url",
            "http://localhost:8080",
        ])
        .unwrap();

        match cli.command {
            Command::Upload {
                file, wait_time, ..
            } => {
                assert_eq!(file, PathBuf::from("input.jpg"));
                assert!(wait_time.is_none());
            }
            _ => panic!("expected upload command"),
        }
    }

    #[test]
    fn base_url_is_required() {
        let result = Cli::try_parse_from(["predbench", "empty-post", "--iterations", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn build_client_config_parses_headers() {
        let config = Cli::build_client_config(
            "http://localhost:8080",
            30,
            &["X-Load-Test: predbench".to_string()],
        )
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(
            config.headers,
            vec![("X-Load-Test".to_string(), "predbench".to_string())]
        );
    }

    #[test]
    fn build_client_config_rejects_malformed_header() {
        let result =
            Cli::build_client_config("http://localhost:8080", 30, &["not-a-header".to_string()]);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
