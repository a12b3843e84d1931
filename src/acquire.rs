//! Remote source acquisition
//!
//! Fills the projects and templates directories before a run: repositories
//! come either from catalogue files (`url [display-name]` lines) or from
//! enumerating a GitLab group tree through its REST API. Acquisition is
//! idempotent — an already-present repository is fetched instead of cloned —
//! and per-repository failures are logged and reported, never fatal.

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{ConfigError, RemoteConfig};

/// One repository to acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    pub url: String,
    /// Directory name the repository lands in.
    pub name: String,
}

/// Parse a `KEY=VALUE` environment file. Blank lines and `#` comments are
/// ignored; values may be quoted.
pub fn parse_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut values = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            values.insert(key.trim().to_string(), value.to_string());
        }
    }
    Ok(values)
}

/// Parse a catalogue file: one `url [display-name]` entry per line. A
/// missing display name is derived from the URL.
pub fn parse_catalogue(path: &Path) -> Result<Vec<CatalogueEntry>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (url, name) = match line.split_once(char::is_whitespace) {
            Some((url, rest)) => (url.trim(), rest.trim()),
            None => (line, ""),
        };
        let name = if name.is_empty() {
            derive_name(url)
        } else {
            name.to_string()
        };
        entries.push(CatalogueEntry {
            url: url.to_string(),
            name,
        });
    }
    Ok(entries)
}

/// Display name derived from a clone URL: the last path segment without a
/// `.git` suffix.
pub fn derive_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Compile the case-insensitive project-name filter, when configured.
pub fn name_filter(remote: &RemoteConfig) -> Result<Option<Regex>, ConfigError> {
    match &remote.project_name_regex {
        None => Ok(None),
        Some(pattern) => {
            let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
            Ok(Some(regex))
        }
    }
}

/// Enumerate the subgroups of the configured GitLab group and list every
/// project as a catalogue entry named `<subgroup>-<project>`.
pub fn list_group_projects(remote: &RemoteConfig) -> Result<Vec<CatalogueEntry>> {
    let token = remote
        .token
        .as_deref()
        .ok_or(ConfigError::MissingCredentials)?;
    let group_id = remote
        .group_id
        .as_deref()
        .ok_or(ConfigError::MissingCredentials)?;
    let filter = name_filter(remote)?;

    let client = reqwest::blocking::Client::new();
    let subgroups = gitlab_json(
        &client,
        token,
        &format!("https://gitlab.com/api/v4/groups/{group_id}/subgroups"),
    )?;

    let mut entries = Vec::new();
    for group in subgroups.as_array().into_iter().flatten() {
        let Some(group_id) = group.get("id").and_then(serde_json::Value::as_i64) else {
            continue;
        };
        let group_path = group
            .get("path")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let projects = gitlab_json(
            &client,
            token,
            &format!("https://gitlab.com/api/v4/groups/{group_id}/projects"),
        )?;
        for project in projects.as_array().into_iter().flatten() {
            let name = project
                .get("name")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            if let Some(filter) = &filter {
                if !filter.is_match(name) {
                    debug!("filtered out remote project '{name}'");
                    continue;
                }
            }
            let Some(namespace) = project
                .get("path_with_namespace")
                .and_then(serde_json::Value::as_str)
            else {
                continue;
            };
            let path = project
                .get("path")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(name);
            entries.push(CatalogueEntry {
                url: format!("https://gitlab.com/{namespace}.git"),
                name: format!("{group_path}-{path}"),
            });
        }
    }
    Ok(entries)
}

fn gitlab_json(
    client: &reqwest::blocking::Client,
    token: &str,
    url: &str,
) -> Result<serde_json::Value> {
    client
        .get(url)
        .header("PRIVATE-TOKEN", token)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .with_context(|| format!("GitLab request failed: {url}"))?
        .json()
        .with_context(|| format!("GitLab response was not JSON: {url}"))
}

/// Fetch every catalogue entry into `dest` in parallel. Returns the names
/// of the entries that could not be acquired.
pub fn fetch_all(entries: &[CatalogueEntry], dest: &Path, token: Option<&str>) -> Vec<String> {
    if entries.is_empty() {
        return Vec::new();
    }
    if let Err(err) = fs::create_dir_all(dest) {
        warn!("cannot create {}: {err}", dest.display());
        return entries.iter().map(|e| e.name.clone()).collect();
    }
    let mut failed: Vec<String> = entries
        .par_iter()
        .filter_map(|entry| match clone_or_update(entry, dest, token) {
            Ok(()) => None,
            Err(err) => {
                warn!("could not acquire '{}': {err:#}", entry.name);
                Some(entry.name.clone())
            }
        })
        .collect();
    failed.sort();
    failed
}

/// Clone a repository, or fetch its origin when the checkout already
/// exists.
fn clone_or_update(entry: &CatalogueEntry, dest: &Path, token: Option<&str>) -> Result<()> {
    let target: PathBuf = dest.join(&entry.name);
    if target.exists() {
        info!("updating {}", entry.name);
        let repo = git2::Repository::open(&target)
            .with_context(|| format!("{} exists but is not a repository", target.display()))?;
        let mut remote = repo
            .find_remote("origin")
            .context("checkout has no origin remote")?;
        remote
            .fetch(
                &[] as &[&str],
                Some(&mut fetch_options(token)),
                None,
            )
            .context("fetch failed")?;
        return Ok(());
    }

    info!("cloning {}", entry.name);
    git2::build::RepoBuilder::new()
        .fetch_options(fetch_options(token))
        .clone(&entry.url, &target)
        .map(|_| ())
        .map_err(|err| anyhow!("clone failed: {err}"))
}

fn fetch_options(token: Option<&str>) -> git2::FetchOptions<'static> {
    let mut callbacks = git2::RemoteCallbacks::new();
    if let Some(token) = token {
        let token = token.to_string();
        callbacks.credentials(move |_url, _username, _allowed| {
            git2::Cred::userpass_plaintext("git", &token)
        });
    }
    let mut options = git2::FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}
