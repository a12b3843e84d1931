//! Parallel comparison scheduling
//!
//! Enumerates the pairs worth comparing — every template against every
//! submission plus all submission pairs, never template against template,
//! never across languages — and runs them on a rayon pool. Pairs are
//! independent; the only cross-worker write is the progress counter. A
//! panicking pair is logged and dropped without taking the batch down.

use log::warn;
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::compare::Comparator;
use crate::model::Project;
use crate::report::Report;
use crate::types::{CompareConfig, Language};
use crate::ProgressReporter;

/// Root report of one compared pair, tagged with its language partition.
#[derive(Debug)]
pub struct PairReport {
    pub language: Language,
    pub report: Report,
}

/// Enumerate comparable pairs as index tuples into `projects`.
///
/// Within each language partition: template × submission for every
/// combination, plus every unordered submission pair. Template pairs are
/// normalised template-first.
pub fn enumerate_pairs(projects: &[Project]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..projects.len() {
        for j in (i + 1)..projects.len() {
            let (a, b) = (&projects[i], &projects[j]);
            if a.language != b.language {
                continue;
            }
            if a.is_template && b.is_template {
                continue;
            }
            if b.is_template {
                pairs.push((j, i));
            } else {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Compare all enumerated pairs in parallel and collect their reports.
///
/// Completion order is nondeterministic; callers sort before rendering.
pub fn compare_all(
    projects: &[Project],
    config: &CompareConfig,
    workers: usize,
    progress: Option<&dyn ProgressReporter>,
) -> Vec<PairReport> {
    let pairs = enumerate_pairs(projects);
    if let Some(p) = progress {
        p.start(pairs.len() as u64, "Comparing projects...");
    }
    let completed = AtomicUsize::new(0);

    let run = || -> Vec<PairReport> {
        pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    Comparator::new(&projects[i], &projects[j], config).compare_projects()
                }));
                completed.fetch_add(1, Ordering::Relaxed);
                if let Some(p) = progress {
                    p.inc(1);
                }
                match outcome {
                    Ok(report) => report.map(|report| PairReport {
                        language: projects[i].language,
                        report,
                    }),
                    Err(_) => {
                        warn!(
                            "comparison of '{}' and '{}' failed; pair dropped",
                            projects[i].name, projects[j].name
                        );
                        None
                    }
                }
            })
            .collect()
    };

    let reports = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(err) => {
            warn!("falling back to the global thread pool: {err}");
            run()
        }
    };

    if let Some(p) = progress {
        p.finish("Comparison complete");
    }
    debug_assert_eq!(completed.load(Ordering::Relaxed), pairs.len());
    reports
}
