use std::collections::BTreeMap;

use spliceasm_nodes::{
    EditPlan, NewSection, PlanOp, Renumber, SectionKind, SectionMeta, Span, PREAMBLE_LEN,
};

use crate::{
    encoder::{leb_len_u32, write_section, write_u32_padded, MAX_U32_WIDTH},
    EncodeError, PlanViolation,
};

/// One change inside a section body, in original-buffer coordinates.
#[derive(Debug, Clone, Copy)]
enum Splice<'p> {
    Replace(&'p PlanOp),
    Renumber(&'p Renumber),
}

impl Splice<'_> {
    fn range(&self) -> Span {
        match self {
            Splice::Replace(op) => op.range,
            Splice::Renumber(renumber) => renumber.site,
        }
    }

    fn section(&self) -> usize {
        match self {
            Splice::Replace(op) => op.section,
            Splice::Renumber(renumber) => renumber.section,
        }
    }
}

fn check_metadata(original: &[u8], sections: &[SectionMeta]) -> Result<(), PlanViolation> {
    if original.len() < PREAMBLE_LEN {
        return Err(PlanViolation::MetadataMismatch);
    }
    let mut at = PREAMBLE_LEN;
    for meta in sections {
        let body_ok = meta.span.contains(&meta.body) && meta.body.end() == meta.span.end();
        let count_ok = meta.count.map_or(true, |count| {
            count.span.start == meta.body.start && meta.body.contains(&count.span)
        });
        if meta.span.start != at || !body_ok || !count_ok {
            return Err(PlanViolation::MetadataMismatch);
        }
        at = meta.span.end();
    }
    if at != original.len() {
        return Err(PlanViolation::MetadataMismatch);
    }
    Ok(())
}

fn check_sorted<'p>(
    splices: impl Iterator<Item = Splice<'p>>,
    sections: &[SectionMeta],
) -> Result<(), PlanViolation> {
    let mut last = None;
    for splice in splices {
        let section = splice.section();
        let range = splice.range();
        let meta = sections
            .get(section)
            .ok_or(PlanViolation::UnknownSection(section))?;
        if !meta.entries().contains(&range) {
            return Err(PlanViolation::OutOfBounds {
                section,
                start: range.start,
                end: range.end(),
            });
        }
        if last.is_some_and(|start| range.start < start) {
            return Err(PlanViolation::Unsorted {
                section,
                at: range.start,
            });
        }
        last = Some(range.start);
    }
    Ok(())
}

/// Checks that `plan` can be applied to the module described by `sections`, which must be the
/// metadata decoded from `original`.
pub fn validate_plan(
    original: &[u8],
    sections: &[SectionMeta],
    plan: &EditPlan,
) -> Result<(), PlanViolation> {
    check_metadata(original, sections)?;
    check_sorted(plan.ops.iter().map(Splice::Replace), sections)?;
    check_sorted(plan.renumbering.iter().map(Splice::Renumber), sections)?;

    for renumber in &plan.renumbering {
        let width = renumber.site.len;
        if width > MAX_U32_WIDTH || leb_len_u32(renumber.new) > width {
            return Err(PlanViolation::IndexWidth {
                value: renumber.new,
                width,
                at: renumber.site.start,
            });
        }
    }

    for (section, splices) in splices_by_section(plan) {
        let mut end = 0;
        for splice in splices {
            let range = splice.range();
            if range.start < end {
                return Err(PlanViolation::Overlap {
                    section,
                    at: range.start,
                });
            }
            end = range.end();
        }
    }

    for (&section, edit) in &plan.sections {
        let meta = sections
            .get(section)
            .ok_or(PlanViolation::UnknownSection(section))?;
        if edit.dropped {
            let edited = plan.ops.iter().any(|xs| xs.section == section)
                || plan.renumbering.iter().any(|xs| xs.section == section)
                || edit.count_delta != 0;
            if edited {
                return Err(PlanViolation::DroppedSectionEdited(section));
            }
            continue;
        }

        match meta.count {
            Some(count) => {
                let count = i64::from(count.value) + edit.count_delta;
                if count < 0 || count > i64::from(u32::MAX) {
                    return Err(PlanViolation::BadCount { section, count });
                }
            }
            None if edit.count_delta != 0 => {
                return Err(PlanViolation::BadCount {
                    section,
                    count: edit.count_delta,
                })
            }
            None => {}
        }
    }

    Ok(())
}

/// Merges ops and renumberings per section, ordered by position. Zero-length inserts sort ahead
/// of anything starting at the same byte.
fn splices_by_section(plan: &EditPlan) -> BTreeMap<usize, Vec<Splice<'_>>> {
    let mut by_section: BTreeMap<usize, Vec<Splice<'_>>> = BTreeMap::new();
    let all = plan
        .ops
        .iter()
        .map(Splice::Replace)
        .chain(plan.renumbering.iter().map(Splice::Renumber));
    for splice in all {
        by_section.entry(splice.section()).or_default().push(splice);
    }
    for splices in by_section.values_mut() {
        splices.sort_by_key(|xs| {
            let range = xs.range();
            (range.start, range.end())
        });
    }
    by_section
}

fn emit_new_section(out: &mut Vec<u8>, section: &NewSection) {
    log::debug!("emitting new {} section", section.kind);
    write_section(out, section.kind, section.count, &section.body);
}

/// Applies `plan` to `original`, producing the edited module.
///
/// Sections the plan does not touch are copied byte for byte. Touched sections are rebuilt with
/// a minimal length and count, their bodies spliced and their renumbered operands rewritten at
/// the width they originally had.
pub fn reencode(
    original: &[u8],
    sections: &[SectionMeta],
    plan: &EditPlan,
) -> Result<Vec<u8>, EncodeError> {
    validate_plan(original, sections, plan)?;

    let mut by_section = splices_by_section(plan);
    let mut pending: Vec<&NewSection> = plan.new_sections.iter().collect();
    pending.sort_by_key(|xs| xs.kind.order());
    let mut pending = pending.into_iter().peekable();

    let mut out = Vec::with_capacity(original.len());
    out.extend_from_slice(&original[..PREAMBLE_LEN]);

    for (idx, meta) in sections.iter().enumerate() {
        if meta.kind != SectionKind::Custom {
            while let Some(section) = pending.next_if(|xs| xs.kind.order() < meta.kind.order()) {
                emit_new_section(&mut out, section);
            }
        }

        let edit = plan.section(idx).copied().unwrap_or_default();
        if edit.dropped {
            log::debug!("dropping {} section at {}", meta.kind, meta.span.start);
            continue;
        }

        if !plan.touches(idx) {
            out.extend_from_slice(&original[meta.span.range()]);
            continue;
        }

        let entries = meta.entries();
        let mut body = Vec::with_capacity(entries.len);
        let mut cursor = entries.start;
        for splice in by_section.remove(&idx).unwrap_or_default() {
            let range = splice.range();
            body.extend_from_slice(&original[cursor..range.start]);
            match splice {
                Splice::Replace(op) => body.extend_from_slice(&op.replacement),
                Splice::Renumber(renumber) => {
                    if !write_u32_padded(&mut body, renumber.new, range.len) {
                        return Err(PlanViolation::IndexWidth {
                            value: renumber.new,
                            width: range.len,
                            at: range.start,
                        }
                        .into());
                    }
                }
            }
            cursor = range.end();
        }
        body.extend_from_slice(&original[cursor..entries.end()]);

        // Counts were range-checked by `validate_plan`.
        let count = meta
            .count
            .map(|count| (i64::from(count.value) + edit.count_delta) as u32);
        let before = out.len();
        write_section(&mut out, meta.kind, count, &body);
        log::debug!(
            "rewrote {} section at {}: {} -> {} bytes",
            meta.kind,
            meta.span.start,
            meta.span.len,
            out.len() - before
        );
    }

    for section in pending {
        emit_new_section(&mut out, section);
    }

    Ok(out)
}
