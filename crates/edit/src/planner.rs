use std::collections::{BTreeMap, BTreeSet};

use spliceasm_codec::encoder::{
    encode_code_entry, encode_export, encode_func_entry, encode_name, Encode,
};
use spliceasm_nodes::{
    EditPlan, IndexSpace, Module, NewSection, NodePath, PlanOp, Renumber, SectionKind, Span,
};

use crate::{
    renumber::IndexMaps,
    rules::NewEntry,
    visit::{FieldEdit, Staged},
    EditError,
};

/// Entries bound for one section, already encoded.
#[derive(Debug, Default)]
struct Appended {
    count: u32,
    body: Vec<u8>,
}

/// Turns the edits staged by a traversal into a plan over the original bytes.
pub(crate) fn plan(module: &Module, staged: Staged) -> Result<EditPlan, EditError> {
    let Staged {
        mut removed,
        fields,
        inserts,
    } = staged;

    pair_code_entries(module, &mut removed);

    let maps = IndexMaps::from_removed(module, &removed);
    if let Some(space) = maps.spaces().next() {
        if let Some(section) = module.opaque_sections().first() {
            return Err(EditError::OpaqueReferences {
                space,
                section: *section,
            });
        }
    }

    let mut plan = EditPlan::new();
    remove_nodes(module, &removed, &mut plan);
    rename_fields(module, &removed, fields, &mut plan);
    renumber_refs(module, &removed, &maps, &mut plan)?;
    insert_entries(module, &maps, inserts, &mut plan)?;

    plan.ops.sort_by_key(|xs| (xs.range.start, xs.range.end()));
    plan.renumbering.sort_by_key(|xs| xs.site.start);

    for op in &plan.ops {
        log::debug!(
            "section {}: replace {}..{} with {} bytes",
            op.section,
            op.range.start,
            op.range.end(),
            op.replacement.len()
        );
    }

    let funcs_moved = plan
        .renumbering
        .iter()
        .any(|xs| xs.space == IndexSpace::Func)
        || maps.removed_count(IndexSpace::Func) > 0;
    if funcs_moved && module.names().is_some_and(|xs| !xs.functions.is_empty()) {
        log::warn!("function indices changed; the name section is left as-is and is now stale");
    }

    Ok(plan)
}

/// A function section entry and its code entry are one function: removing either removes both.
fn pair_code_entries(module: &Module, removed: &mut BTreeSet<NodePath>) {
    let (Some((funcs, _)), Some((code, _))) = (
        module.section(SectionKind::Function),
        module.section(SectionKind::Code),
    ) else {
        return;
    };

    let paired: Vec<_> = removed
        .iter()
        .filter(|xs| xs.section == funcs)
        .map(|xs| NodePath::new(code, xs.entry))
        .collect();
    removed.extend(paired);
}

fn node_span(module: &Module, path: &NodePath) -> Option<Span> {
    module.sections().get(path.section)?.entry_span(path.entry)
}

fn remove_nodes(module: &Module, removed: &BTreeSet<NodePath>, plan: &mut EditPlan) {
    for path in removed {
        let Some(section) = module.sections().get(path.section) else {
            continue;
        };
        if section.kind() == SectionKind::Start {
            plan.section_mut(path.section).dropped = true;
            continue;
        }
        let Some(range) = section.entry_span(path.entry) else {
            continue;
        };
        plan.ops.push(PlanOp {
            section: path.section,
            range,
            replacement: Vec::new(),
        });
        plan.section_mut(path.section).count_delta -= 1;
    }
}

fn rename_fields(
    module: &Module,
    removed: &BTreeSet<NodePath>,
    fields: BTreeMap<Span, FieldEdit>,
    plan: &mut EditPlan,
) {
    let removed_spans: Vec<_> = removed
        .iter()
        .filter_map(|path| node_span(module, path))
        .collect();

    for (range, field) in fields {
        if removed_spans.iter().any(|xs| xs.contains(&range)) {
            continue;
        }
        let mut replacement = Vec::with_capacity(field.value.len() + 1);
        encode_name(&mut replacement, &field.value);
        plan.ops.push(PlanOp {
            section: field.section,
            range,
            replacement,
        });
    }
}

fn renumber_refs(
    module: &Module,
    removed: &BTreeSet<NodePath>,
    maps: &IndexMaps,
    plan: &mut EditPlan,
) -> Result<(), EditError> {
    let mut dangling = Vec::new();
    module.for_each_ref(|path, index| {
        if removed.contains(&path) {
            return;
        }
        let dangles = EditError::DanglingReference {
            space: index.space,
            index: index.value,
            at: index.span.start,
        };
        match maps.map(index.space, index.value) {
            None => dangling.push(dangles),
            // An implicit operand has no bytes to rewrite.
            Some(new) if new != index.value && index.is_implicit() => dangling.push(dangles),
            Some(new) if new != index.value => plan.renumbering.push(Renumber {
                section: path.section,
                space: index.space,
                site: index.span,
                old: index.value,
                new,
            }),
            Some(_) => {}
        }
    });

    for err in dangling.iter().skip(1) {
        log::debug!("also dangling: {err}");
    }
    match dangling.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn insert_entries(
    module: &Module,
    maps: &IndexMaps,
    inserts: Vec<NewEntry>,
    plan: &mut EditPlan,
) -> Result<(), EditError> {
    if inserts.is_empty() {
        return Ok(());
    }

    let added = |space: IndexSpace| {
        inserts
            .iter()
            .filter(|xs| {
                matches!(
                    (xs, space),
                    (NewEntry::Type(_), IndexSpace::Type) | (NewEntry::Func { .. }, IndexSpace::Func)
                )
            })
            .count() as u32
    };
    let new_len =
        |space: IndexSpace| module.space_len(space) - maps.removed_count(space) + added(space);

    let mut appended: BTreeMap<SectionKind, Appended> = BTreeMap::new();
    for entry in &inserts {
        match entry {
            NewEntry::Type(ty) => append(&mut appended, SectionKind::Type, |out| ty.encode(out)),
            NewEntry::Func {
                type_idx,
                locals,
                body,
            } => {
                let type_idx = map_inserted(maps, IndexSpace::Type, type_idx.0, new_len, module)?;
                append(&mut appended, SectionKind::Function, |out| {
                    encode_func_entry(out, type_idx)
                });
                append(&mut appended, SectionKind::Code, |out| {
                    encode_code_entry(out, locals, body)
                });
            }
            NewEntry::Export { name, desc } => {
                let index = map_inserted(maps, desc.space(), desc.index(), new_len, module)?;
                let desc = desc.with_index(index);
                append(&mut appended, SectionKind::Export, |out| {
                    encode_export(out, name, &desc)
                });
            }
        }
    }

    for (kind, Appended { count, body }) in appended {
        match module.section(kind) {
            Some((section, contents)) => {
                plan.ops.push(PlanOp {
                    section,
                    range: Span::empty(contents.meta.entries().end()),
                    replacement: body,
                });
                plan.section_mut(section).count_delta += i64::from(count);
            }
            None => plan.new_sections.push(NewSection {
                kind,
                count: Some(count),
                body,
            }),
        }
    }
    Ok(())
}

fn append(
    appended: &mut BTreeMap<SectionKind, Appended>,
    kind: SectionKind,
    encode: impl FnOnce(&mut Vec<u8>),
) {
    let target = appended.entry(kind).or_default();
    target.count += 1;
    encode(&mut target.body);
}

/// Maps an index written by the caller into post-edit numbering and checks that it lands on an
/// entity that exists after the edit.
fn map_inserted(
    maps: &IndexMaps,
    space: IndexSpace,
    old: u32,
    new_len: impl Fn(IndexSpace) -> u32,
    module: &Module,
) -> Result<u32, EditError> {
    maps.map(space, old)
        .filter(|new| *new < new_len(space))
        .ok_or(EditError::DanglingReference {
            space,
            index: old,
            at: module.byte_len(),
        })
}
