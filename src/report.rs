//! Similarity report tree
//!
//! A `Report` is the result of comparing two entities. Reports are combined
//! with a weighted-average merge as the comparison descends through projects,
//! files, classes and functions, so the root probability of a pair is a
//! weight-balanced mean of every structural decision made below it.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Kind of entity a report side refers to.
///
/// The variant list is closed: every structural element that participates in
/// comparison is one of these, and the scheduler and renderer match on it at
/// a single point each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Project,
    File,
    Class,
    Function,
    Parameter,
    Variable,
    Type,
    Modifier,
    Block,
    /// Sentinel for "no counterpart was found on this side".
    NotFound,
}

impl EntityKind {
    /// Entities worth emitting as a row in a detail sheet.
    ///
    /// Leaf kinds (modifiers, types, parameters, blocks) contribute to
    /// scores but would clutter the output tree, so they stay invisible.
    pub fn is_visualisable(self) -> bool {
        matches!(
            self,
            EntityKind::Project | EntityKind::File | EntityKind::Class | EntityKind::Function
        )
    }

    /// Display label used in detail sheets.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Project => "Project",
            EntityKind::File => "File",
            EntityKind::Class => "Class",
            EntityKind::Function => "Function",
            EntityKind::Parameter => "Parameter",
            EntityKind::Variable => "Variable",
            EntityKind::Type => "Type",
            EntityKind::Modifier => "Modifier",
            EntityKind::Block => "Block",
            EntityKind::NotFound => "Not found",
        }
    }
}

/// Lightweight reference to a compared entity: its kind and display name.
///
/// Reports outlive the comparison that produced them (they are handed to the
/// rendering adapter), so they carry owned names instead of borrowing from
/// the entity arenas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// The sentinel used for unmatched elements.
    pub fn not_found() -> Self {
        Self {
            kind: EntityKind::NotFound,
            name: "NOT FOUND".to_string(),
        }
    }

    pub fn is_visualisable(&self) -> bool {
        self.kind.is_visualisable()
    }
}

/// A node of the similarity-result tree.
///
/// `probability` is a match score in `0..=100`; `weight` is an integer proxy
/// for how much evidence backs that score. A report with weight 0 carries no
/// information and acts as the identity of [`Report::combine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub probability: u32,
    pub weight: u32,
    pub first: EntityRef,
    pub second: EntityRef,
    pub children: Vec<Report>,
}

impl Report {
    pub fn new(probability: u32, weight: u32, first: EntityRef, second: EntityRef) -> Self {
        Self {
            probability,
            weight,
            first,
            second,
            children: Vec::new(),
        }
    }

    /// Weightless identity report for a pair. Combining anything into it
    /// leaves the other side's score untouched.
    pub fn identity(first: EntityRef, second: EntityRef) -> Self {
        Self::new(0, 0, first, second)
    }

    /// The fixed penalty contributed by an unmatched element: probability 0
    /// at the weight of a single ordinary sub-decision.
    pub fn penalty(first: EntityRef, second: EntityRef) -> Self {
        Self::new(0, 10, first, second)
    }

    /// Total order on reports: primary key probability, tiebreak weight.
    pub fn cmp_score(&self, other: &Report) -> Ordering {
        self.probability
            .cmp(&other.probability)
            .then(self.weight.cmp(&other.weight))
    }

    /// Weighted merge of two reports.
    ///
    /// The resulting probability is the weight-balanced integer mean of the
    /// two sides (a zero denominator is replaced by 1, so identities merge
    /// cleanly), the weight is the sum, and `first`/`second` are inherited
    /// from `self`.
    ///
    /// Children policy: when the two reports describe the same structural
    /// level of the same pair (matching kinds on either side), their child
    /// lists are concatenated; otherwise `other` itself becomes a child, but
    /// only when one of its ends is visualisable.
    pub fn combine(self, other: Report) -> Report {
        let divisor = (self.weight + other.weight).max(1);
        let probability =
            (self.probability * self.weight + other.probability * other.weight) / divisor;
        let mut report = Report {
            probability,
            weight: self.weight + other.weight,
            first: self.first,
            second: self.second,
            children: self.children,
        };
        if report.first.kind == other.first.kind || report.second.kind == other.second.kind {
            report.children.extend(other.children);
        } else if other.first.is_visualisable() || other.second.is_visualisable() {
            report.children.push(other);
        }
        report
    }
}
