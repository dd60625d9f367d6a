//! `chainlint`: static linter for shell-based test scripts. Finds broken
//! `&&`-chains in `test_expect_success`/`test_expect_failure` bodies.
//!
//! Argument parsing is a manual `while i < args.len()` loop rather than a
//! derive-macro CLI crate, matching this codebase's existing fast-path
//! argument handling for small, focused entry points.

use anyhow::{anyhow, Result};
use chainlint::globs;
use chainlint::jobs::{self, FileOutcome};
use chainlint::stats::RunStats;
use std::env;
use std::process::ExitCode;

const USAGE: &str = "\
Usage: chainlint [OPTIONS] <PATH|GLOB>...

Detect broken &&-chains in test_expect_success/test_expect_failure bodies.

Options:
  --emit-all          emit a report for every test, not just flagged ones
  -j, --jobs N        worker thread count (N < 1 auto-detects CPU count)
  --stats, --show-stats
                      print per-worker and total counts plus timing to stderr
  -h, --help          print this message and exit

Environment:
  CHAINLINT_JOBS      same effect as -j/--jobs when the flag is not given
";

struct Config {
    emit_all: bool,
    jobs: Option<i64>,
    show_stats: bool,
    paths: Vec<String>,
}

fn parse_args(args: &[String]) -> Result<Config> {
    let mut emit_all = false;
    let mut jobs = None;
    let mut show_stats = false;
    let mut paths = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print!("{}", USAGE);
                std::process::exit(0);
            }
            "--emit-all" => emit_all = true,
            "--stats" | "--show-stats" => show_stats = true,
            "-j" | "--jobs" => {
                i += 1;
                let v = args.get(i).ok_or_else(|| anyhow!("-j/--jobs requires a value"))?;
                jobs = Some(v.parse::<i64>().map_err(|_| anyhow!("invalid -j value: '{v}'"))?);
            }
            other if other.starts_with("--jobs=") => {
                let v = &other["--jobs=".len()..];
                jobs = Some(v.parse::<i64>().map_err(|_| anyhow!("invalid --jobs value: '{v}'"))?);
            }
            other => paths.push(other.to_string()),
        }
        i += 1;
    }

    Ok(Config {
        emit_all,
        jobs,
        show_stats,
        paths,
    })
}

/// `-j`/`--jobs` resolution: explicit flag wins over `CHAINLINT_JOBS`, and
/// any value less than 1 (from either source, including an unset/garbled
/// environment variable) auto-detects the CPU count (§6/§9).
fn resolve_worker_count(flag: Option<i64>) -> usize {
    let requested = flag.or_else(|| {
        env::var("CHAINLINT_JOBS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
    });
    match requested {
        Some(n) if n >= 1 => n as usize,
        _ => num_cpus::get().max(1),
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("chainlint: {e}");
            eprint!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let paths = globs::expand_args(&config.paths);
    if paths.is_empty() {
        return ExitCode::SUCCESS;
    }

    let worker_count = resolve_worker_count(config.jobs);
    let stats_run = RunStats::start();
    let (outcomes, worker_stats) = jobs::run(paths, worker_count, config.emit_all);

    let mut found_annotation = false;
    for outcome in &outcomes {
        match outcome {
            FileOutcome::Reports { path, reports, .. } => {
                if reports.is_empty() {
                    continue;
                }
                println!("# chainlint: {path}");
                for report in reports {
                    if report.flagged {
                        found_annotation = true;
                    }
                    println!("# chainlint: {}", report.title);
                    print!("{}", report.body);
                }
            }
            FileOutcome::Failed { path, error } => {
                found_annotation = true;
                print!("{}", error.as_annotation(path));
            }
        }
    }

    if config.show_stats {
        let mut run_stats = stats_run;
        run_stats.workers = worker_stats;
        run_stats.report();
    }

    if found_annotation {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
