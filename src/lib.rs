//! codesim - structural similarity detection library
//!
//! Detects likely plagiarism between student programming submissions. The
//! pipeline acquires project repositories, parses each project into an
//! entity tree, compares every same-language pair with a hierarchical
//! bijective matching algorithm, and renders the results as a cross-linked
//! spreadsheet. The CLI and any other frontend share this engine.

pub mod acquire;
pub mod compare;
pub mod index;
pub mod java;
pub mod matching;
pub mod model;
pub mod python;
pub mod render;
pub mod report;
pub mod schedule;
pub mod types;

use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::model::Project;
use crate::render::RenderOptions;
use crate::types::{CompareConfig, ConfigError, Language, PairSummary, RemoteConfig, RunConfig};

/// Trait for reporting progress during long-running operations
pub trait ProgressReporter: Send + Sync {
    fn start(&self, total: u64, message: &str);
    fn inc(&self, delta: u64);
    fn finish(&self, message: &str);
}

/// A no-op progress reporter that does nothing
pub struct NoopProgressReporter;
impl ProgressReporter for NoopProgressReporter {
    fn start(&self, _total: u64, _message: &str) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _message: &str) {}
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Projects successfully loaded (templates included).
    pub project_count: usize,
    /// Pairs actually compared.
    pub compared_pairs: usize,
    /// Root results, highest probability first.
    pub summaries: Vec<PairSummary>,
    /// Projects without parseable sources.
    pub skipped: Vec<String>,
    /// Catalogue entries that could not be acquired.
    pub unmatched: Vec<String>,
    /// Workbook location; absent for clone-only runs.
    pub output: Option<PathBuf>,
}

/// Core detection engine shared by the CLI and tests.
pub struct DetectionEngine<'a> {
    pub config: &'a RunConfig,
    pub progress: Option<&'a dyn ProgressReporter>,
}

impl<'a> DetectionEngine<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the full pipeline: acquire, load, compare, render.
    pub fn run(&self) -> Result<RunOutcome> {
        // Configuration problems (bad regex, unreadable env file) surface
        // here, before any worker starts.
        let remote = self.resolve_remote()?;

        let unmatched = if self.config.offline {
            Vec::new()
        } else {
            self.acquire_sources(&remote)?
        };
        if self.config.clone_only {
            return Ok(RunOutcome {
                project_count: 0,
                compared_pairs: 0,
                summaries: Vec::new(),
                skipped: Vec::new(),
                unmatched,
                output: None,
            });
        }

        let (projects, skipped) = self.load_projects()?;
        info!(
            "loaded {} projects ({} skipped)",
            projects.len(),
            skipped.len()
        );

        let mut reports = schedule::compare_all(
            &projects,
            &self.config.compare,
            self.config.workers,
            self.progress,
        );
        // Workers finish in arbitrary order; sort by name pair so the
        // workbook is reproducible.
        reports.sort_by(|a, b| {
            (a.language.label(), &a.report.first.name, &a.report.second.name).cmp(&(
                b.language.label(),
                &b.report.first.name,
                &b.report.second.name,
            ))
        });

        let mut summaries: Vec<PairSummary> = reports
            .iter()
            .map(|pair| PairSummary {
                first: pair.report.first.name.clone(),
                second: pair.report.second.name.clone(),
                language: pair.language,
                probability: pair.report.probability,
                weight: pair.report.weight,
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.probability
                .cmp(&a.probability)
                .then_with(|| a.first.cmp(&b.first))
                .then_with(|| a.second.cmp(&b.second))
        });

        let options = RenderOptions {
            include_weight: self.config.include_weight,
            color_mode: self.config.color_mode,
        };
        render::write_workbook(
            &self.config.output,
            &reports,
            &projects,
            &skipped,
            &unmatched,
            &options,
        )?;
        render::write_summaries(&self.config.output.with_extension("jsonl"), &summaries)?;

        Ok(RunOutcome {
            project_count: projects.len(),
            compared_pairs: reports.len(),
            summaries,
            skipped,
            unmatched,
            output: Some(self.config.output.clone()),
        })
    }

    /// Merge flag-level credentials with the env file and validate the
    /// project-name filter.
    fn resolve_remote(&self) -> Result<RemoteConfig> {
        let mut remote = self.config.remote.clone();
        if let Some(env_path) = &self.config.env_file {
            let values = acquire::parse_env_file(env_path)?;
            if remote.token.is_none() {
                remote.token = values.get("TOKEN").cloned();
            }
            if remote.group_id.is_none() {
                remote.group_id = values.get("GROUP_ID").cloned();
            }
        }
        acquire::name_filter(&remote)?;
        Ok(remote)
    }

    /// Fetch everything the catalogue files and the remote group describe.
    /// Individual failures are collected, not fatal.
    fn acquire_sources(&self, remote: &RemoteConfig) -> Result<Vec<String>> {
        let token = remote.token.as_deref();
        let mut unmatched = Vec::new();

        if let Some(path) = &self.config.projects_file {
            let entries = acquire::parse_catalogue(path)?;
            unmatched.extend(acquire::fetch_all(
                &entries,
                &self.config.projects_dir,
                token,
            ));
        }
        if let Some(path) = &self.config.templates_file {
            let entries = acquire::parse_catalogue(path)?;
            unmatched.extend(acquire::fetch_all(
                &entries,
                &self.config.templates_dir,
                token,
            ));
        }
        if remote.token.is_some() && remote.group_id.is_some() {
            match acquire::list_group_projects(remote) {
                Ok(entries) => unmatched.extend(acquire::fetch_all(
                    &entries,
                    &self.config.projects_dir,
                    token,
                )),
                Err(err) => warn!("remote enumeration failed: {err:#}"),
            }
        }

        unmatched.sort();
        unmatched.dedup();
        Ok(unmatched)
    }

    /// Load submissions and templates in parallel. Directories without
    /// parseable sources are reported as skipped.
    fn load_projects(&self) -> Result<(Vec<Project>, Vec<String>)> {
        if !self.config.projects_dir.is_dir() {
            return Err(ConfigError::MissingPath(self.config.projects_dir.clone()).into());
        }
        let mut candidates: Vec<(PathBuf, bool)> = index::project_dirs(&self.config.projects_dir)?
            .into_iter()
            .map(|dir| (dir, false))
            .collect();
        if self.config.templates_dir.is_dir() {
            candidates.extend(
                index::project_dirs(&self.config.templates_dir)?
                    .into_iter()
                    .map(|dir| (dir, true)),
            );
        }

        if let Some(p) = self.progress {
            p.start(candidates.len() as u64, "Loading projects...");
        }
        let loaded: Vec<(String, Option<Project>)> = candidates
            .par_iter()
            .map(|(dir, is_template)| {
                let name = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let project = load_one(dir, *is_template, &self.config.compare);
                if let Some(p) = self.progress {
                    p.inc(1);
                }
                (name, project)
            })
            .collect();
        if let Some(p) = self.progress {
            p.finish("Loading complete");
        }

        let mut projects = Vec::new();
        let mut skipped = Vec::new();
        for (name, project) in loaded {
            match project {
                Some(project) => projects.push(project),
                None => skipped.push(name),
            }
        }
        Ok((projects, skipped))
    }
}

/// Load one project directory: detect its language, parse its sources,
/// run the resolution pass. `None` means the directory has nothing to
/// compare and belongs on the skipped list.
fn load_one(dir: &Path, is_template: bool, config: &CompareConfig) -> Option<Project> {
    let language = index::detect_language(dir)?;
    let sources = index::source_files(dir, language);
    let name = dir.file_name()?.to_string_lossy().into_owned();
    let result = match language {
        Language::Java => java::load(&name, dir, &sources),
        Language::Python => python::load(&name, dir, &sources),
    };
    match result {
        Ok(mut project) => {
            if project.file_count() == 0 {
                warn!("no parseable sources in '{name}'");
                return None;
            }
            project.is_template = is_template;
            project.resolve(config);
            info!(
                "loaded '{}' ({language}, {} files)",
                project.name,
                project.file_count()
            );
            Some(project)
        }
        Err(err) => {
            warn!("could not load '{name}': {err:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    const COUNTER: &str = r#"
package app;

public class Counter {
    private int total;

    public int increment(int amount) {
        total = total + amount;
        return total;
    }
}
"#;

    const DIFFERENT: &str = r#"
package app;

public class Greeter {
    private String message;
    private boolean loud;

    public String greet(String name) {
        if (loud) {
            return message + name + "!";
        }
        return message + name;
    }

    public void configure(String message, boolean loud) {
        while (true) {
            break;
        }
    }
}
"#;

    fn write_project(root: &Path, name: &str, source: &str) {
        let dir = root.join(name).join("src");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Main.java"), source).unwrap();
    }

    fn run_config(root: &Path) -> RunConfig {
        RunConfig {
            projects_dir: root.join("projects"),
            templates_dir: root.join("templates"),
            output: root.join("out.xlsx"),
            env_file: None,
            projects_file: None,
            templates_file: None,
            offline: true,
            clone_only: false,
            workers: 2,
            include_weight: true,
            color_mode: Default::default(),
            remote: RemoteConfig::default(),
            compare: CompareConfig::default(),
        }
    }

    #[test]
    fn test_identical_projects_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let projects = root.path().join("projects");
        write_project(&projects, "alpha", COUNTER);
        write_project(&projects, "beta", COUNTER);
        let config = run_config(root.path());

        let outcome = DetectionEngine::new(&config).run().unwrap();

        assert_eq!(outcome.project_count, 2);
        assert_eq!(outcome.compared_pairs, 1);
        assert_eq!(outcome.summaries[0].probability, 100);
        assert!(outcome.skipped.is_empty());
        assert!(config.output.is_file());
        assert!(config.output.with_extension("jsonl").is_file());
    }

    #[test]
    fn test_empty_sibling_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let projects = root.path().join("projects");
        write_project(&projects, "alpha", COUNTER);
        write_project(&projects, "beta", COUNTER);
        fs::create_dir_all(projects.join("gamma")).unwrap();
        fs::write(projects.join("gamma/notes.txt"), "no code here").unwrap();
        let config = run_config(root.path());

        let outcome = DetectionEngine::new(&config).run().unwrap();

        assert_eq!(outcome.project_count, 2);
        assert_eq!(outcome.compared_pairs, 1);
        assert_eq!(outcome.skipped, vec!["gamma".to_string()]);
    }

    #[test]
    fn test_template_pairs_against_submissions_only() {
        let root = tempfile::tempdir().unwrap();
        let projects = root.path().join("projects");
        let templates = root.path().join("templates");
        write_project(&projects, "copied", COUNTER);
        write_project(&projects, "own-work", DIFFERENT);
        write_project(&templates, "starter", COUNTER);
        let config = run_config(root.path());

        let outcome = DetectionEngine::new(&config).run().unwrap();

        // starter×copied, starter×own-work, copied×own-work.
        assert_eq!(outcome.project_count, 3);
        assert_eq!(outcome.compared_pairs, 3);

        let verbatim = outcome
            .summaries
            .iter()
            .find(|s| {
                (s.first == "starter" && s.second == "copied")
                    || (s.first == "copied" && s.second == "starter")
            })
            .expect("template pair missing");
        assert_eq!(verbatim.probability, 100);
    }

    #[test]
    fn test_missing_projects_dir_is_a_config_error() {
        let root = tempfile::tempdir().unwrap();
        let config = run_config(root.path());

        let err = DetectionEngine::new(&config).run().unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_fast_scan_never_beats_full_scan() {
        let root = tempfile::tempdir().unwrap();
        let projects = root.path().join("projects");
        write_project(&projects, "alpha", COUNTER);
        write_project(&projects, "beta", DIFFERENT);
        let full_config = run_config(root.path());
        let fast_config = RunConfig {
            compare: CompareConfig {
                fast_scan: true,
                ..CompareConfig::default()
            },
            output: root.path().join("fast.xlsx"),
            ..full_config.clone()
        };

        let full = DetectionEngine::new(&full_config).run().unwrap();
        let fast = DetectionEngine::new(&fast_config).run().unwrap();

        assert!(fast.summaries[0].probability <= full.summaries[0].probability);
    }
}
