//! Core data types for codesim
//!
//! This module defines the shared types used across the detection pipeline:
//! the supported-language enum, the comparison tunables, run options, and the
//! typed error taxonomy for configuration and acquisition failures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Source language of a project.
///
/// Projects are only ever compared with other projects of the same language;
/// the scheduler partitions its input on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Java,
    Python,
}

impl Language {
    /// All supported languages, in detection priority order.
    pub const ALL: [Language; 2] = [Language::Java, Language::Python];

    /// File extension (without dot) counted by the language detector.
    pub fn extension(self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "py",
        }
    }

    /// File names with the right extension that are still not source files
    /// worth parsing (build descriptors, package markers).
    pub fn ignored_file_names(self) -> &'static [&'static str] {
        match self {
            Language::Java => &["module-info.java", "package-info.java"],
            Language::Python => &["__init__.py"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::Java => "Java",
            Language::Python => "Python",
        }
    }

    /// Whether function signatures carry declared types (as opposed to
    /// arity-only comparison for dynamically-typed sources).
    pub fn is_statically_typed(self) -> bool {
        matches!(self, Language::Java)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Heatmap colouring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Continuous gradient from green through yellow to red.
    #[default]
    Gradient,
    /// Three fixed bands: green up to 70, yellow up to 85, red above.
    ThreeBand,
}

/// Tunables consumed by the comparators.
///
/// Packaged as a value and passed into the scheduler so tests can supply
/// bespoke thresholds and translation tables; comparators never read ambient
/// state.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Skip descent into collections of very different sizes and into bodies
    /// of dissimilar signatures, trading recall for speed.
    pub fast_scan: bool,

    /// Fast-scan cutoff for collection size imbalance. A pair of collections
    /// with lengths `m`, `n` is skipped when `1 - sqrt(|m-n|/(m+n))` falls
    /// below this value.
    pub skip_list_threshold: f64,

    /// Minimum interface score (return type + parameters) a function pair
    /// must reach under fast scan before its bodies are compared.
    pub method_interface_threshold: u32,

    /// Re-run the statement-block histogram walk with the sides swapped and
    /// average both directions. Off by default: the single left-biased walk
    /// is the reference behaviour.
    pub symmetric_blocks: bool,

    /// Fallback mapping between "morally equivalent" syntax-tree node kinds,
    /// granting half credit when one side chose a different but equivalent
    /// construct (a `while` loop against a `for` loop, say).
    pub node_translations: HashMap<String, String>,

    /// Canonical family for each primitive or common collection type name.
    pub type_normalisation: HashMap<String, String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            fast_scan: false,
            skip_list_threshold: 0.5,
            method_interface_threshold: 80,
            symmetric_blocks: false,
            node_translations: default_node_translations(),
            type_normalisation: default_type_normalisation(),
        }
    }
}

/// Default node-kind fallbacks, expressed in the vocabulary of the
/// tree-sitter grammars in use.
pub fn default_node_translations() -> HashMap<String, String> {
    [
        // Loops are interchangeable in both grammars.
        ("while_statement", "for_statement"),
        // A switch arm is morally an if branch (Java).
        ("switch_expression", "if_statement"),
        ("switch_block_statement_group", "if_statement"),
        // Awaiting is still calling (Python).
        ("await", "call"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Default primitive/collection canonicalisation table.
pub fn default_type_normalisation() -> HashMap<String, String> {
    [
        ("short", "Double"),
        ("Short", "Double"),
        ("int", "Double"),
        ("Integer", "Double"),
        ("long", "Double"),
        ("Long", "Double"),
        ("float", "Double"),
        ("Float", "Double"),
        ("boolean", "Boolean"),
        ("char", "String"),
        ("Character", "String"),
        ("ArrayList", "List"),
        ("LinkedList", "List"),
        ("HashSet", "Set"),
        ("TreeSet", "Set"),
        ("HashMap", "Map"),
        ("TreeMap", "Map"),
        ("FloatProperty", "DoubleProperty"),
        ("IntegerProperty", "DoubleProperty"),
        ("LongProperty", "DoubleProperty"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Remote acquisition settings resolved from CLI flags and the env file.
#[derive(Debug, Clone, Default)]
pub struct RemoteConfig {
    /// GitLab personal access token.
    pub token: Option<String>,
    /// Root group whose subgroups hold the submission repositories.
    pub group_id: Option<String>,
    /// Case-insensitive filter applied to remote project names.
    pub project_name_regex: Option<String>,
}

/// Everything a single detection run needs to know.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the submission projects (one subdirectory each).
    pub projects_dir: PathBuf,
    /// Directory holding template projects; templates are compared against
    /// submissions but never against each other.
    pub templates_dir: PathBuf,
    /// Output spreadsheet path.
    pub output: PathBuf,
    /// `KEY=VALUE` file supplying remote credentials not given as flags.
    pub env_file: Option<PathBuf>,
    /// Catalogue file of `url [name]` lines for submissions.
    pub projects_file: Option<PathBuf>,
    /// Catalogue file of `url [name]` lines for templates.
    pub templates_file: Option<PathBuf>,
    /// Skip all remote fetching.
    pub offline: bool,
    /// Fetch sources and exit without comparing.
    pub clone_only: bool,
    /// Worker count for the comparison pool.
    pub workers: usize,
    /// Include the weight column in detail sheets.
    pub include_weight: bool,
    /// Heatmap colouring mode.
    pub color_mode: ColorMode,
    pub remote: RemoteConfig,
    pub compare: CompareConfig,
}

impl RunConfig {
    /// Default output filename carrying the run timestamp.
    pub fn default_output_name(now: chrono::DateTime<chrono::Local>) -> String {
        format!("similarity-check-{}.xlsx", now.format("%Y-%m-%d_%H-%M"))
    }
}

/// One line of a run summary: the root result of a single pair, exported as
/// JSONL next to the spreadsheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSummary {
    pub first: String,
    pub second: String,
    pub language: Language,
    pub probability: u32,
    pub weight: u32,
}

/// Configuration errors abort the run before any worker starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("path does not exist: {0}")]
    MissingPath(PathBuf),

    #[error("remote credentials are incomplete: token and group id are both required")]
    MissingCredentials,

    #[error("invalid project name filter: {0}")]
    BadRegex(#[from] regex::Error),

    #[error("could not read {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
