use std::collections::BTreeMap;

use crate::{IndexSpace, SectionKind, Span};

/// Replace `range` (absolute offsets into the original buffer) with `replacement`. An empty
/// range is an insertion.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PlanOp {
    /// Position of the owning section in the module's section list.
    pub section: usize,
    pub range: Span,
    pub replacement: Vec<u8>,
}

/// Rewrite the index operand at `site` from `old` to `new`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Renumber {
    pub section: usize,
    pub space: IndexSpace,
    pub site: Span,
    pub old: u32,
    pub new: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct SectionEdit {
    pub count_delta: i64,
    pub dropped: bool,
    /// Re-emit the section header and count even without splices.
    pub rewrite: bool,
}

/// A section absent from the input. `body` excludes the count.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NewSection {
    pub kind: SectionKind,
    pub count: Option<u32>,
    pub body: Vec<u8>,
}

/// Everything the re-encoder needs to turn the original bytes into the edited module.
///
/// `ops` and `renumbering` are each sorted by offset and may not overlap one another.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct EditPlan {
    pub ops: Vec<PlanOp>,
    pub renumbering: Vec<Renumber>,
    pub sections: BTreeMap<usize, SectionEdit>,
    pub new_sections: Vec<NewSection>,
}

impl EditPlan {
    pub fn new() -> Self {
        Default::default()
    }

    /// A plan that changes nothing but forces every section to be re-emitted.
    pub fn rewrite_all(section_count: usize) -> Self {
        let mut plan = Self::new();
        for idx in 0..section_count {
            plan.section_mut(idx).rewrite = true;
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
            && self.renumbering.is_empty()
            && self.new_sections.is_empty()
            && self
                .sections
                .values()
                .all(|xs| *xs == SectionEdit::default())
    }

    pub fn section_mut(&mut self, section: usize) -> &mut SectionEdit {
        self.sections.entry(section).or_default()
    }

    pub fn section(&self, section: usize) -> Option<&SectionEdit> {
        self.sections.get(&section)
    }

    pub fn touches(&self, section: usize) -> bool {
        self.sections
            .get(&section)
            .is_some_and(|xs| *xs != SectionEdit::default())
            || self.ops.iter().any(|xs| xs.section == section)
            || self.renumbering.iter().any(|xs| xs.section == section)
    }

    /// Net change in byte length of the spliced bodies, before headers are recomputed.
    pub fn splice_delta(&self) -> i64 {
        let ops: i64 = self
            .ops
            .iter()
            .map(|xs| xs.replacement.len() as i64 - xs.range.len as i64)
            .sum();
        let added: i64 = self
            .new_sections
            .iter()
            .map(|xs| xs.body.len() as i64)
            .sum();
        ops + added
    }
}
