//! Worker pool fanning a list of file paths out across OS threads, each
//! running an independent lexer/parser/checker stack.
//!
//! This is a different shape than the fork-per-session worker pool this
//! codebase uses elsewhere for interactive shell jobs (`daemon::worker_pool`)
//! — there is no long-lived process, no IPC, and no session state to reset
//! between requests. The whole work-list is known up front, so a single
//! `mpsc` channel seeded with all paths before any worker starts is enough;
//! results are drained off a second channel by the main thread, which is
//! the sole writer to stdout.

use crate::error::ChainlintError;
use crate::parser::script_parser::{ScriptRecognizer, TestReport};
use crate::parser::{NoopAccumulator, Parser};
use crate::stats::WorkerStats;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

/// Either a complete set of annotated reports for one file, or a single
/// read/parse failure for it — per-file processing is atomic (§5).
pub enum FileOutcome {
    Reports {
        path: String,
        test_count: usize,
        reports: Vec<TestReport>,
    },
    Failed {
        path: String,
        error: ChainlintError,
    },
}

/// Lint the in-memory contents of one script. This is the single
/// operation the core exposes, per §1: "given the textual contents of a
/// shell script, produce a list of annotated test reports."
pub fn lint_source(src: &str, emit_all: bool) -> (usize, Vec<TestReport>) {
    let mut parser: Parser<NoopAccumulator, ScriptRecognizer> =
        Parser::with(src, NoopAccumulator, ScriptRecognizer::new(emit_all));
    parser.parse_all();
    let recognizer = parser.into_recognizer();
    (recognizer.test_count(), recognizer.into_reports())
}

fn lint_file(path: &str, emit_all: bool) -> FileOutcome {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(source) => {
            return FileOutcome::Failed {
                path: path.to_string(),
                error: ChainlintError::Io {
                    path: path.into(),
                    source,
                },
            };
        }
    };

    let result = catch_unwind(AssertUnwindSafe(|| lint_source(&contents, emit_all)));
    match result {
        Ok((test_count, reports)) => FileOutcome::Reports {
            path: path.to_string(),
            test_count,
            reports,
        },
        Err(_) => FileOutcome::Failed {
            path: path.to_string(),
            error: ChainlintError::Internal {
                detail: "parser panicked".to_string(),
            },
        },
    }
}

/// Run `paths` through a fixed-size pool of `worker_count` threads and
/// return `(outcomes, per_worker_stats)`. Ordering of `outcomes` matches
/// first-finished-first-drained, not input order (§4.6/§9 — decided and
/// documented in DESIGN.md, since §5 leaves it explicitly unspecified).
pub fn run(paths: Vec<String>, worker_count: usize, emit_all: bool) -> (Vec<FileOutcome>, Vec<WorkerStats>) {
    let worker_count = worker_count.max(1);
    let queue = Arc::new(Mutex::new(paths.into_iter()));
    let (tx, rx) = mpsc::channel::<FileOutcome>();

    let handles: Vec<_> = (0..worker_count)
        .map(|worker_id| {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            thread::spawn(move || {
                let mut stats = WorkerStats {
                    worker_id,
                    ..Default::default()
                };
                loop {
                    let next = queue.lock().expect("worker queue lock poisoned").next();
                    let Some(path) = next else { break };
                    let outcome = lint_file(&path, emit_all);
                    match &outcome {
                        FileOutcome::Reports {
                            test_count,
                            reports,
                            ..
                        } => {
                            stats.files += 1;
                            stats.tests += *test_count as u64;
                            stats.findings += reports.len() as u64;
                        }
                        FileOutcome::Failed { .. } => {
                            stats.files += 1;
                            stats.findings += 1;
                        }
                    }
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
                stats
            })
        })
        .collect();
    drop(tx);

    let outcomes: Vec<FileOutcome> = rx.into_iter().collect();
    let worker_stats: Vec<WorkerStats> = handles
        .into_iter()
        .map(|h| h.join().unwrap_or_default())
        .collect();

    (outcomes, worker_stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn clean_source_yields_no_reports() {
        let (count, reports) = lint_source("test_expect_success 'ok' 'foo && bar\n'\n", false);
        assert_eq!(count, 1);
        assert!(reports.is_empty());
    }

    #[test]
    fn broken_chain_in_source_yields_a_report() {
        let (count, reports) = lint_source("test_expect_success 'bad' 'foo\nbar\n'\n", false);
        assert_eq!(count, 1);
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn missing_file_produces_a_failed_outcome() {
        let (outcomes, stats) = run(vec!["/nonexistent/path.sh".to_string()], 2, false);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], FileOutcome::Failed { .. }));
        assert_eq!(stats.iter().map(|w| w.files).sum::<u64>(), 1);
    }

    #[test]
    fn multiple_files_are_all_processed_across_workers() {
        let dir = tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..6 {
            let p = dir.path().join(format!("t{i}.sh"));
            fs::write(&p, "test_expect_success 'x' 'foo\nbar\n'\n").unwrap();
            paths.push(p.to_string_lossy().into_owned());
        }
        let (outcomes, stats) = run(paths, 3, false);
        assert_eq!(outcomes.len(), 6);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, FileOutcome::Reports { reports, .. } if reports.len() == 1)));
        assert_eq!(stats.iter().map(|w| w.files).sum::<u64>(), 6);
    }
}
