//! `--stats`/`--show-stats` reporting: wall-clock time, per-worker user
//! CPU time (via `libc::getrusage`), and per-worker/total file and test
//! counts, printed to stderr (§4.6/§6/§7).

use std::time::{Duration, Instant};

/// Counts accumulated by a single worker over its lifetime.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub files: u64,
    pub tests: u64,
    pub findings: u64,
}

/// Full run summary, printed once all workers have finished.
pub struct RunStats {
    start: Instant,
    pub workers: Vec<WorkerStats>,
}

impl RunStats {
    pub fn start() -> Self {
        RunStats {
            start: Instant::now(),
            workers: Vec::new(),
        }
    }

    pub fn wall_time(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn total_files(&self) -> u64 {
        self.workers.iter().map(|w| w.files).sum()
    }

    pub fn total_tests(&self) -> u64 {
        self.workers.iter().map(|w| w.tests).sum()
    }

    pub fn total_findings(&self) -> u64 {
        self.workers.iter().map(|w| w.findings).sum()
    }

    /// Print the summary to stderr. User CPU time reflects the whole
    /// process (all worker threads share one address space, so
    /// `getrusage(RUSAGE_SELF, ...)` already aggregates them); it is
    /// reported once, not per-worker.
    pub fn report(&self) {
        for w in &self.workers {
            eprintln!(
                "chainlint: worker {}: {} files, {} tests, {} findings",
                w.worker_id, w.files, w.tests, w.findings
            );
        }
        eprintln!(
            "chainlint: total: {} files, {} tests, {} findings",
            self.total_files(),
            self.total_tests(),
            self.total_findings()
        );
        eprintln!(
            "chainlint: wall time: {:.3}s, user time: {:.3}s",
            self.wall_time().as_secs_f64(),
            user_cpu_time().as_secs_f64()
        );
    }
}

/// User CPU time consumed by this process so far, via `getrusage(2)`.
pub fn user_cpu_time() -> Duration {
    unsafe {
        let mut usage: libc::rusage = std::mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut usage) != 0 {
            return Duration::ZERO;
        }
        let secs = usage.ru_utime.tv_sec.max(0) as u64;
        let micros = usage.ru_utime.tv_usec.max(0) as u32;
        Duration::new(secs, micros * 1000)
    }
}
