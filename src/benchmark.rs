//! Benchmarking and experimentation over scheduling requests.
//!
//! Runs every request over a range of seeds, collects per-run results and
//! aggregates them into per-request statistics, with CSV export and a text
//! report. Each run constructs its own scheduler, so seed fan-out can use a
//! rayon pool without sharing any scheduler state.

use crate::distance::{DistanceError, DistanceTable};
use crate::request::{ScheduleReply, ScheduleRequest};
use crate::scheduler::{RouteScheduler, DEFAULT_AROUND_SCOPE, DEFAULT_MAX_ITERATION};

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Result of scheduling one request with one seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Request name (file stem for directory runs).
    pub request: String,
    pub suppliers: usize,
    pub riders: usize,
    pub seed: u64,
    pub feasible: bool,
    /// Travel cost of the returned plan; absent for empty replies.
    pub cost: Option<f64>,
    /// Number of visited suppliers.
    pub stops: usize,
    /// Wall-clock time in seconds.
    pub time: f64,
}

/// Aggregated statistics over all runs of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSummary {
    pub request: String,
    pub runs: usize,
    pub feasible_runs: usize,
    pub best_cost: f64,
    pub worst_cost: f64,
    pub avg_cost: f64,
    pub std_cost: f64,
    pub avg_time: f64,
    pub total_time: f64,
}

/// Benchmark configuration.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of seeds per request.
    pub num_runs: usize,
    /// First seed; runs use `base_seed..base_seed + num_runs`.
    pub base_seed: u64,
    /// Fan seeds out on the rayon pool.
    pub parallel: bool,
    pub around_scope: f64,
    pub max_iteration: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            base_seed: 0,
            parallel: true,
            around_scope: DEFAULT_AROUND_SCOPE,
            max_iteration: DEFAULT_MAX_ITERATION,
        }
    }
}

/// Benchmarking engine.
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    /// Schedule one request once with the given seed.
    fn run_once(&self, name: &str, request: &ScheduleRequest, seed: u64) -> Option<RunResult> {
        let scheduler =
            RouteScheduler::with_params(self.config.around_scope, self.config.max_iteration, seed);
        let start = std::time::Instant::now();
        let reply = match scheduler.schedule(request) {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("request {} failed with seed {}: {}", name, seed, e);
                return None;
            }
        };
        let time = start.elapsed().as_secs_f64();
        let cost = match reply_cost(request, &reply) {
            Ok(cost) => cost,
            Err(e) => {
                log::error!("request {}: could not evaluate reply: {}", name, e);
                None
            }
        };
        Some(RunResult {
            request: name.to_string(),
            suppliers: request.num_suppliers(),
            riders: request.num_riders(),
            seed,
            feasible: !reply.is_empty(),
            cost,
            stops: reply.route.len(),
            time,
        })
    }

    /// Run one request over the configured seed range.
    pub fn run_request(&mut self, name: &str, request: &ScheduleRequest) {
        let seeds: Vec<u64> = (0..self.config.num_runs)
            .map(|i| self.config.base_seed + i as u64)
            .collect();

        let batch: Vec<RunResult> = if self.config.parallel {
            seeds
                .par_iter()
                .filter_map(|&seed| self.run_once(name, request, seed))
                .collect()
        } else {
            seeds
                .iter()
                .filter_map(|&seed| self.run_once(name, request, seed))
                .collect()
        };
        self.results.extend(batch);
    }

    /// Run every request in a directory.
    pub fn run_directory<P: AsRef<Path>>(&mut self, dir: P) {
        let requests = load_requests_from_dir(dir);
        log::info!("benchmarking {} requests", requests.len());

        let bar = ProgressBar::new(requests.len() as u64);
        for (name, request) in &requests {
            self.run_request(name, request);
            bar.inc(1);
        }
        bar.finish_and_clear();
    }

    /// Aggregate results per request.
    pub fn compute_statistics(&self) -> Vec<RequestSummary> {
        let mut grouped: BTreeMap<&str, Vec<&RunResult>> = BTreeMap::new();
        for result in &self.results {
            grouped
                .entry(result.request.as_str())
                .or_default()
                .push(result);
        }

        let mut summaries = Vec::new();
        for (name, results) in grouped {
            let costs: Vec<f64> = results.iter().filter_map(|r| r.cost).collect();
            let times: Vec<f64> = results.iter().map(|r| r.time).collect();
            let feasible_runs = results.iter().filter(|r| r.feasible).count();

            let (best_cost, worst_cost, avg_cost, std_cost) = if costs.is_empty() {
                (f64::INFINITY, f64::INFINITY, f64::INFINITY, 0.0)
            } else {
                let best = costs.iter().cloned().fold(f64::INFINITY, f64::min);
                let worst = costs.iter().cloned().fold(0.0, f64::max);
                let avg = costs.iter().mean();
                let std = if costs.len() > 1 {
                    costs.iter().std_dev()
                } else {
                    0.0
                };
                (best, worst, avg, std)
            };

            summaries.push(RequestSummary {
                request: name.to_string(),
                runs: results.len(),
                feasible_runs,
                best_cost,
                worst_cost,
                avg_cost,
                std_cost,
                avg_time: times.iter().mean(),
                total_time: times.iter().sum(),
            });
        }
        summaries
    }

    /// Export per-run results to CSV.
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        for result in &self.results {
            writer.serialize(result)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export per-request statistics to CSV.
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        for summary in self.compute_statistics() {
            writer.serialize(summary)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Generate a summary report.
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("     DVPR Scheduler Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        report.push_str(&format!(
            "{:<25} {:>10} {:>12} {:>12} {:>12} {:>10}\n",
            "Request", "Feasible", "Avg Cost", "Best Cost", "Std Cost", "Avg Time"
        ));
        report.push_str("-".repeat(86).as_str());
        report.push('\n');

        for summary in self.compute_statistics() {
            report.push_str(&format!(
                "{:<25} {:>10} {:>12.2} {:>12.2} {:>12.2} {:>10.4}\n",
                summary.request,
                format!("{}/{}", summary.feasible_runs, summary.runs),
                summary.avg_cost,
                summary.best_cost,
                summary.std_cost,
                summary.avg_time
            ));
        }
        report.push_str("-".repeat(86).as_str());
        report.push('\n');

        report
    }

    /// All collected per-run results.
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }
}

/// Travel cost of a reply, recomputed from the request's distance table.
///
/// Returns `None` for the empty reply. The formula matches the scheduler's
/// own evaluation: rider to first stop, stop to stop, last stop to order.
pub fn reply_cost(
    request: &ScheduleRequest,
    reply: &ScheduleReply,
) -> Result<Option<f64>, DistanceError> {
    let (first, deliverer) = match (reply.route.first(), reply.deliverer_id) {
        (Some(first), Some(deliverer)) => (first, deliverer),
        _ => return Ok(None),
    };
    let table = DistanceTable::new(
        request.distance.clone(),
        request.num_suppliers(),
        request.num_riders(),
    )?;
    let rider_id = request.num_suppliers() + deliverer;

    let mut cost = table.get(rider_id, first.supplier_id)?;
    for pair in reply.route.windows(2) {
        cost += table.get(pair[0].supplier_id, pair[1].supplier_id)?;
    }
    cost += table.get(reply.route[reply.route.len() - 1].supplier_id, 0)?;
    Ok(Some(cost))
}

/// Load every `*.json` request in a directory, sorted by catalogue size.
pub fn load_requests_from_dir<P: AsRef<Path>>(dir: P) -> Vec<(String, ScheduleRequest)> {
    let mut requests = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match ScheduleRequest::from_file(&path) {
                    Ok(request) => requests.push((name, request)),
                    Err(e) => log::error!("skipping {}: {}", path.display(), e),
                }
            }
        }
    }

    requests.sort_by_key(|(_, request)| request.num_suppliers());
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ItemList;
    use std::collections::BTreeMap;

    fn items(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn single_supplier_request() -> ScheduleRequest {
        ScheduleRequest {
            request: ItemList {
                items: items(&[("a", 1.0)]),
            },
            itemlists: vec![ItemList {
                items: items(&[("a", 2.0)]),
            }],
            num_deliverer: 1,
            distance: vec![3.0, 5.0],
        }
    }

    #[test]
    fn test_benchmark_config_defaults() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 5);
        assert!(config.parallel);
    }

    #[test]
    fn test_reply_cost_matches_scheduler_formula() {
        let request = single_supplier_request();
        let reply = RouteScheduler::new().schedule(&request).unwrap();
        let cost = reply_cost(&request, &reply).unwrap();
        assert_eq!(cost, Some(8.0));
    }

    #[test]
    fn test_reply_cost_of_empty_reply_is_none() {
        let request = single_supplier_request();
        let cost = reply_cost(&request, &ScheduleReply::empty()).unwrap();
        assert_eq!(cost, None);
    }

    #[test]
    fn test_run_request_collects_all_seeds() {
        let request = single_supplier_request();
        let mut benchmark = Benchmark::new(BenchmarkConfig {
            num_runs: 3,
            parallel: false,
            ..Default::default()
        });
        benchmark.run_request("single", &request);

        assert_eq!(benchmark.results().len(), 3);
        let summaries = benchmark.compute_statistics();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].feasible_runs, 3);
        assert_eq!(summaries[0].best_cost, 8.0);
        assert_eq!(summaries[0].worst_cost, 8.0);
        assert_eq!(summaries[0].std_cost, 0.0);
    }
}
