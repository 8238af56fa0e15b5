//! The outer measurement loop.
//!
//! For every (driver, test case) pair the runner walks the full lifecycle:
//! `initialize`, `prepare`, a handful of untimed warmup runs, the timed
//! runs accumulated on one [`Instant`], then `finish`. Iteration counts
//! come from the parameter chain (`warmupIterations`, `runIterations`) or
//! from the caller's overrides; wall-clock budgets are out of scope.

use std::time::{Duration, Instant};

use log::{debug, error, warn};
#[cfg(feature = "multithreading")]
use rayon::prelude::*;

use crate::driver::Lifecycle;
use crate::drivers;
use crate::err::{ParamResult, Result};
use crate::params::Params;
use crate::report::{Report, ReportRow};
use crate::settings::CodecSettings;
use crate::suite::{CaseConfig, DriverConfig, SuiteConfig, TestCase};

pub const WARMUP_ITERATIONS: &str = "warmupIterations";
pub const RUN_ITERATIONS: &str = "runIterations";

pub const DEFAULT_WARMUP_ITERATIONS: u64 = 3;
pub const DEFAULT_RUN_ITERATIONS: u64 = 10;

/// Caller-side overrides for the iteration counts. `None` defers to the
/// parameter chain, which defers to the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationPlan {
    pub warmup: Option<u64>,
    pub runs: Option<u64>,
}

impl IterationPlan {
    fn resolve(&self, params: &Params) -> ParamResult<(u64, u64)> {
        let warmup = match self.warmup {
            Some(n) => n,
            None => match params.get_long(WARMUP_ITERATIONS)? {
                Some(n) if n >= 0 => n as u64,
                Some(n) => {
                    warn!("ignoring negative `{WARMUP_ITERATIONS}` of {n}");
                    DEFAULT_WARMUP_ITERATIONS
                }
                None => DEFAULT_WARMUP_ITERATIONS,
            },
        };
        let runs = match self.runs {
            Some(n) => n.max(1),
            None => match params.get_long(RUN_ITERATIONS)? {
                Some(n) if n > 0 => n as u64,
                Some(n) => {
                    warn!("ignoring non-positive `{RUN_ITERATIONS}` of {n}");
                    DEFAULT_RUN_ITERATIONS
                }
                None => DEFAULT_RUN_ITERATIONS,
            },
        };
        Ok((warmup, runs))
    }
}

/// Timing of one (driver, case) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Timed iterations; warmup runs are excluded.
    pub iterations: u64,
    /// Wall-clock time across all timed iterations.
    pub total: Duration,
}

impl Measurement {
    pub fn mean(&self) -> Duration {
        if self.iterations == 0 {
            return Duration::ZERO;
        }
        self.total / self.iterations as u32
    }

    /// Transactions per second, the classic result unit of this kind of
    /// harness.
    pub fn tps(&self) -> f64 {
        let seconds = self.total.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.iterations as f64 / seconds
    }
}

/// Runs every (driver, case) pair of the suite and collects a report.
///
/// Failures during `initialize`/`prepare`/`run` mark the pair as failed;
/// with `fail_fast` the first such failure aborts the whole suite instead.
/// `finish` failures only lose the size results, never the timings. With
/// the `multithreading` feature pairs run on the rayon pool, one pair per
/// logical thread, nothing shared but the immutable config.
pub fn run_suite(config: &SuiteConfig, plan: IterationPlan, fail_fast: bool) -> Result<Report> {
    let pairs: Vec<(&DriverConfig, &CaseConfig)> = config
        .drivers
        .iter()
        .flat_map(|driver| config.cases.iter().map(move |case| (driver, case)))
        .collect();

    #[cfg(feature = "multithreading")]
    let outcomes: Vec<Result<(Measurement, TestCase)>> = pairs
        .par_iter()
        .map(|(driver, case)| run_pair(config, driver, case, plan))
        .collect();

    #[cfg(not(feature = "multithreading"))]
    let outcomes: Vec<Result<(Measurement, TestCase)>> = pairs
        .iter()
        .map(|(driver, case)| run_pair(config, driver, case, plan))
        .collect();

    let mut rows = Vec::with_capacity(outcomes.len());
    for ((driver, case), outcome) in pairs.into_iter().zip(outcomes) {
        match outcome {
            Ok((measurement, finished)) => {
                rows.push(ReportRow::success(
                    &driver.name,
                    &case.name,
                    measurement,
                    finished.results().clone(),
                ));
            }
            Err(e) if fail_fast => return Err(e),
            Err(e) => {
                error!("driver `{}` failed on case `{}`: {e}", driver.name, case.name);
                rows.push(ReportRow::failure(&driver.name, &case.name, &e));
            }
        }
    }

    Ok(Report::new(&config.name, rows))
}

fn run_pair(
    config: &SuiteConfig,
    driver_config: &DriverConfig,
    case_config: &CaseConfig,
    plan: IterationPlan,
) -> Result<(Measurement, TestCase)> {
    let mut case = config.test_case(driver_config, case_config);
    let settings = CodecSettings::from_params(case.params())?;
    let (warmup, runs) = plan.resolve(case.params())?;

    let mut lifecycle = Lifecycle::new(drivers::create(&driver_config.name)?);
    lifecycle.initialize(&settings)?;
    lifecycle.prepare(&case)?;

    debug!(
        "driver `{}`, case `{}`: {warmup} warmup + {runs} timed iterations",
        driver_config.name, case_config.name
    );
    // A warmup run is the very same operation as a timed run.
    for _ in 0..warmup {
        lifecycle.run(&case)?;
    }

    let started = Instant::now();
    for _ in 0..runs {
        lifecycle.run(&case)?;
    }
    let total = started.elapsed();

    if let Err(e) = lifecycle.finish(&mut case) {
        warn!(
            "driver `{}`: finish failed on case `{}`, size results are lost: {e}",
            driver_config.name, case_config.name
        );
    }

    Ok((
        Measurement {
            iterations: runs,
            total,
        },
        case,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn plan_overrides_beat_params_beat_defaults() {
        let mut params = Params::new();
        params.insert(RUN_ITERATIONS, 50_i64);

        let plan = IterationPlan::default();
        assert_eq!(plan.resolve(&params).unwrap(), (DEFAULT_WARMUP_ITERATIONS, 50));

        let plan = IterationPlan {
            warmup: Some(0),
            runs: Some(2),
        };
        assert_eq!(plan.resolve(&params).unwrap(), (0, 2));

        assert_eq!(
            IterationPlan::default().resolve(&Params::new()).unwrap(),
            (DEFAULT_WARMUP_ITERATIONS, DEFAULT_RUN_ITERATIONS)
        );
    }

    #[test]
    fn non_positive_counts_fall_back_to_defaults() {
        let mut params = Params::new();
        params.insert(RUN_ITERATIONS, 0_i64);
        params.insert(WARMUP_ITERATIONS, -1_i64);

        let (warmup, runs) = IterationPlan::default().resolve(&params).unwrap();
        assert_eq!(warmup, DEFAULT_WARMUP_ITERATIONS);
        assert_eq!(runs, DEFAULT_RUN_ITERATIONS);
    }

    #[test]
    fn mistyped_counts_are_loud() {
        let mut params = Params::new();
        params.insert(RUN_ITERATIONS, "ten");
        assert!(IterationPlan::default().resolve(&params).is_err());
    }

    #[test]
    fn measurement_derives_mean_and_throughput() {
        let m = Measurement {
            iterations: 4,
            total: Duration::from_millis(200),
        };
        assert_eq!(m.mean(), Duration::from_millis(50));
        assert_eq!(m.tps(), 20.0);
    }

    #[test]
    fn a_failing_pair_is_reported_not_dropped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<doc>fine</doc>").unwrap();

        let raw = format!(
            r#"{{
                "name": "mixed",
                "params": {{"runIterations": 1, "warmupIterations": 0}},
                "drivers": [{{"name": "text-parse"}}],
                "cases": [
                    {{"name": "good", "input": {good:?}}},
                    {{"name": "gone", "input": "no-such-file.xml"}}
                ]
            }}"#,
            good = file.path()
        );
        let config = SuiteConfig::from_json_str(&raw).unwrap();

        let report = run_suite(&config, IterationPlan::default(), false).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert!(report.rows[0].error.is_none());
        assert!(report.rows[1].error.is_some());
        assert!(report.has_failures());

        // Fail-fast surfaces the error instead.
        assert!(run_suite(&config, IterationPlan::default(), true).is_err());
    }
}
