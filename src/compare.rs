//! Hierarchical entity comparators
//!
//! One `Comparator` spans a single pair of projects and walks both entity
//! trees in lockstep: files align with files, classes with classes, down to
//! statement-block histograms. Collection levels descend through
//! [`compare_collections`]; every level folds its sub-decisions into the
//! parent report with the weighted merge, so the root probability reflects
//! the whole structure.

use crate::matching::compare_collections;
use crate::model::{
    BlockId, ClassId, FileId, FunctionId, Modifier, Parameter, Project, Signature, TypeRef,
    Variable,
};
use crate::report::{EntityKind, EntityRef, Report};
use crate::types::CompareConfig;
use std::collections::BTreeMap;

/// Similarity of two non-negative counts as a percentage.
///
/// Equal counts score 100, disjoint magnitudes approach 0; `(0, 0)` is a
/// perfect match. Truncation follows float-to-int conversion.
pub fn number_score(first: u32, second: u32) -> u32 {
    if first == 0 && second == 0 {
        return 100;
    }
    let diff = first.abs_diff(second) as f64;
    let total = (first + second) as f64;
    (100.0 - 100.0 * (diff / total)) as u32
}

/// Pairwise comparison of two projects of the same language.
pub struct Comparator<'a> {
    left: &'a Project,
    right: &'a Project,
    config: &'a CompareConfig,
}

impl<'a> Comparator<'a> {
    pub fn new(left: &'a Project, right: &'a Project, config: &'a CompareConfig) -> Self {
        Self {
            left,
            right,
            config,
        }
    }

    /// Compare the two projects. Returns `None` when their languages
    /// differ; the scheduler relies on this short-circuit.
    pub fn compare_projects(&self) -> Option<Report> {
        if self.left.language != self.right.language {
            return None;
        }
        Some(compare_collections(
            EntityRef::new(EntityKind::Project, &self.left.name),
            EntityRef::new(EntityKind::Project, &self.right.name),
            &self.left.file_ids(),
            &self.right.file_ids(),
            self.config,
            |&id| self.file_ref(self.left, id),
            |&id| self.file_ref(self.right, id),
            |&l, &r| self.compare_files(l, r),
        ))
    }

    /// Files align their classes, and — for dynamically-typed sources —
    /// their top-level functions and statements as well. The extra
    /// collections are empty for statically-typed sources and vanish.
    pub fn compare_files(&self, l: FileId, r: FileId) -> Report {
        let lf = self.left.file(l);
        let rf = self.right.file(r);
        let first = self.file_ref(self.left, l);
        let second = self.file_ref(self.right, r);

        let report = compare_collections(
            first.clone(),
            second.clone(),
            &lf.classes,
            &rf.classes,
            self.config,
            |&id| self.class_ref(self.left, id),
            |&id| self.class_ref(self.right, id),
            |&a, &b| self.compare_classes(a, b),
        );
        let report = report.combine(compare_collections(
            first.clone(),
            second.clone(),
            &lf.functions,
            &rf.functions,
            self.config,
            |&id| self.function_ref(self.left, id),
            |&id| self.function_ref(self.right, id),
            |&a, &b| self.compare_functions(a, b),
        ));
        report.combine(compare_collections(
            first,
            second,
            &lf.top_blocks,
            &rf.top_blocks,
            self.config,
            |&id| self.block_ref(self.left, id),
            |&id| self.block_ref(self.right, id),
            |&a, &b| self.compare_blocks(a, b),
        ))
    }

    /// Classes align their fields, then their methods.
    pub fn compare_classes(&self, l: ClassId, r: ClassId) -> Report {
        let lc = self.left.class(l);
        let rc = self.right.class(r);
        let first = self.class_ref(self.left, l);
        let second = self.class_ref(self.right, r);

        let report = compare_collections(
            first.clone(),
            second.clone(),
            &lc.fields,
            &rc.fields,
            self.config,
            |v| EntityRef::new(EntityKind::Variable, &v.name),
            |v| EntityRef::new(EntityKind::Variable, &v.name),
            |a, b| self.compare_variables(a, b),
        );
        report.combine(compare_collections(
            first,
            second,
            &lc.methods,
            &rc.methods,
            self.config,
            |&id| self.function_ref(self.left, id),
            |&id| self.function_ref(self.right, id),
            |&a, &b| self.compare_functions(a, b),
        ))
    }

    /// Functions compare their interfaces first; bodies are only walked
    /// when fast scan is off or the interface looks promising.
    pub fn compare_functions(&self, l: FunctionId, r: FunctionId) -> Report {
        let lf = self.left.function(l);
        let rf = self.right.function(r);
        let first = self.function_ref(self.left, l);
        let second = self.function_ref(self.right, r);

        let mut report = Report::identity(first.clone(), second.clone());
        match (&lf.signature, &rf.signature) {
            (
                Signature::Typed {
                    return_type: l_ret,
                    parameters: l_params,
                    ..
                },
                Signature::Typed {
                    return_type: r_ret,
                    parameters: r_params,
                    ..
                },
            ) => {
                report = report.combine(self.compare_types(l_ret, r_ret));
                report = report.combine(compare_collections(
                    first.clone(),
                    second.clone(),
                    l_params,
                    r_params,
                    self.config,
                    |p| EntityRef::new(EntityKind::Parameter, &p.name),
                    |p| EntityRef::new(EntityKind::Parameter, &p.name),
                    |a, b| self.compare_parameters(a, b),
                ));
            }
            (
                Signature::Dynamic {
                    args: l_args,
                    positional_only: l_pos,
                    keyword_only: l_kw,
                    has_vararg: l_va,
                    has_kwarg: l_kwa,
                },
                Signature::Dynamic {
                    args: r_args,
                    positional_only: r_pos,
                    keyword_only: r_kw,
                    has_vararg: r_va,
                    has_kwarg: r_kwa,
                },
            ) => {
                let flag = |a: bool, b: bool| if a == b { 100 } else { 0 };
                for probability in [
                    flag(*l_va, *r_va),
                    flag(*l_kwa, *r_kwa),
                    number_score(*l_args, *r_args),
                    number_score(*l_pos, *r_pos),
                    number_score(*l_kw, *r_kw),
                ] {
                    report = report.combine(Report::new(
                        probability,
                        5,
                        first.clone(),
                        second.clone(),
                    ));
                }
            }
            // Signature styles never mix within one language.
            _ => return Report::new(0, 10, first, second),
        }

        if !self.config.fast_scan || report.probability > self.config.method_interface_threshold {
            report = report.combine(compare_collections(
                first,
                second,
                &lf.all_blocks,
                &rf.all_blocks,
                self.config,
                |&id| self.block_ref(self.left, id),
                |&id| self.block_ref(self.right, id),
                |&a, &b| self.compare_blocks(a, b),
            ));
        }
        report
    }

    /// Variables align modifiers and then their types.
    pub fn compare_variables(&self, l: &Variable, r: &Variable) -> Report {
        let first = EntityRef::new(EntityKind::Variable, &l.name);
        let second = EntityRef::new(EntityKind::Variable, &r.name);
        let report = compare_collections(
            first,
            second,
            &l.modifiers,
            &r.modifiers,
            self.config,
            |m| EntityRef::new(EntityKind::Modifier, &m.0),
            |m| EntityRef::new(EntityKind::Modifier, &m.0),
            |a, b| self.compare_modifiers(a, b),
        );
        report.combine(self.compare_types(&l.ty, &r.ty))
    }

    /// Parameters compare by type alone.
    pub fn compare_parameters(&self, l: &Parameter, r: &Parameter) -> Report {
        let first = EntityRef::new(EntityKind::Parameter, &l.name);
        let second = EntityRef::new(EntityKind::Parameter, &r.name);
        Report::identity(first, second).combine(self.compare_types(&l.ty, &r.ty))
    }

    pub fn compare_modifiers(&self, l: &Modifier, r: &Modifier) -> Report {
        let probability = if l.0 == r.0 { 100 } else { 0 };
        Report::new(
            probability,
            10,
            EntityRef::new(EntityKind::Modifier, &l.0),
            EntityRef::new(EntityKind::Modifier, &r.0),
        )
    }

    /// Type compatibility.
    ///
    /// Empty-vs-empty is a neutral match (void against void). A
    /// user-defined type never matches an external one. External types
    /// match on exact name, on one side's canonical family equalling the
    /// other's raw name, or — weakest — on a shared canonical family.
    /// User-defined types on both sides descend into their constituent
    /// primitive shapes.
    pub fn compare_types(&self, l: &TypeRef, r: &TypeRef) -> Report {
        let first = EntityRef::new(EntityKind::Type, &l.name);
        let second = EntityRef::new(EntityKind::Type, &r.name);
        if l.name.is_empty() && r.name.is_empty() {
            return Report::new(100, 1, first, second);
        }
        if l.user_defined != r.user_defined {
            return Report::new(0, 10, first, second);
        }
        if !l.user_defined {
            if l.name == r.name {
                return Report::new(100, 10, first, second);
            }
            let l_to_r = l.compatible_format.as_deref() == Some(&r.name) && !r.name.is_empty();
            let r_to_l = r.compatible_format.as_deref() == Some(&l.name) && !l.name.is_empty();
            if l_to_r || r_to_l {
                return Report::new(75, 10, first, second);
            }
            if l.compatible_format.is_some() && l.compatible_format == r.compatible_format {
                return Report::new(50, 10, first, second);
            }
            return Report::new(0, 10, first, second);
        }
        compare_collections(
            first,
            second,
            self.left.type_constituents(l),
            self.right.type_constituents(r),
            self.config,
            |t| EntityRef::new(EntityKind::Type, &t.name),
            |t| EntityRef::new(EntityKind::Type, &t.name),
            |a, b| self.compare_types(a, b),
        )
    }

    /// Statement blocks compare their node-kind histograms. The walk is
    /// left-biased; the `symmetric_blocks` setting folds in the reverse
    /// walk as well.
    pub fn compare_blocks(&self, l: BlockId, r: BlockId) -> Report {
        let lb = self.left.block(l);
        let rb = self.right.block(r);
        let first = self.block_ref(self.left, l);
        let second = self.block_ref(self.right, r);

        let report =
            self.histogram_walk(&lb.histogram, &rb.histogram, first.clone(), second.clone());
        if self.config.symmetric_blocks {
            report.combine(self.histogram_walk(&rb.histogram, &lb.histogram, first, second))
        } else {
            report
        }
    }

    /// Walk the `own` histogram against `other`. A kind present on both
    /// sides scores on occurrence counts; a kind missing on the other side
    /// may still earn half credit through the node-translation table.
    fn histogram_walk(
        &self,
        own: &BTreeMap<String, u32>,
        other: &BTreeMap<String, u32>,
        first: EntityRef,
        second: EntityRef,
    ) -> Report {
        let mut report = Report::identity(first.clone(), second.clone());
        for (kind, &own_count) in own {
            let other_count = other.get(kind).copied().unwrap_or(0);
            if other_count > 0 {
                report = report.combine(Report::new(
                    number_score(own_count, other_count),
                    10,
                    first.clone(),
                    second.clone(),
                ));
            } else if let Some(fallback) = self.config.node_translations.get(kind) {
                let fallback_count = other.get(fallback).copied().unwrap_or(0);
                if fallback_count > 0 {
                    report = report.combine(Report::new(
                        number_score(own_count, fallback_count) / 2,
                        10,
                        first.clone(),
                        second.clone(),
                    ));
                }
            } else {
                report = report.combine(Report::penalty(first.clone(), second.clone()));
            }
        }
        report
    }

    fn file_ref(&self, project: &Project, id: FileId) -> EntityRef {
        EntityRef::new(EntityKind::File, &project.file(id).name)
    }

    fn class_ref(&self, project: &Project, id: ClassId) -> EntityRef {
        EntityRef::new(EntityKind::Class, &project.class(id).name)
    }

    fn function_ref(&self, project: &Project, id: FunctionId) -> EntityRef {
        EntityRef::new(EntityKind::Function, &project.function(id).name)
    }

    fn block_ref(&self, project: &Project, id: BlockId) -> EntityRef {
        EntityRef::new(EntityKind::Block, &project.block(id).name)
    }
}
