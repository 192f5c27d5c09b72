use std::fmt::{Display, Formatter};

use clap::ValueEnum;

use spliceasm_edit::{NewEntry, Rules};
use spliceasm_nodes::{ExportDesc, FuncIdx, FuncType, Module, TypeIdx};

const ONE_CHAR_NAMES: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// The edits a bundler makes to the modules it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Transform {
    /// Append an empty `__webpack_init__` function, its type and an export for it
    AddFunc,
    /// Drop the start section
    RemoveStartFunc,
    /// Append `!!` to every export name
    AddAssignExports,
    /// Rename exports to single characters
    OneCharExports,
    /// Remove every export
    RemoveExports,
    /// Append `!!` to every import field name
    RenameImports,
}

impl Transform {
    pub const ALL: [Transform; 6] = [
        Transform::AddFunc,
        Transform::RemoveStartFunc,
        Transform::AddAssignExports,
        Transform::OneCharExports,
        Transform::RemoveExports,
        Transform::RenameImports,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Transform::AddFunc => "add-func",
            Transform::RemoveStartFunc => "remove-start-func",
            Transform::AddAssignExports => "add-assign-exports",
            Transform::OneCharExports => "one-char-exports",
            Transform::RemoveExports => "remove-exports",
            Transform::RenameImports => "rename-imports",
        }
    }

    pub fn rules(self, module: &Module) -> Rules<'static> {
        match self {
            Transform::AddFunc => {
                let type_idx = TypeIdx(module.next_type_index());
                let func_idx = FuncIdx(module.next_func_index());
                Rules::new()
                    .insert(NewEntry::Type(FuncType::new(vec![], vec![])))
                    .insert(NewEntry::Func {
                        type_idx,
                        locals: vec![],
                        body: vec![0x0b],
                    })
                    .insert(NewEntry::Export {
                        name: "__webpack_init__".to_string(),
                        desc: ExportDesc::Func(func_idx),
                    })
            }
            Transform::RemoveStartFunc => Rules::new().on_start(|visit| visit.remove()),
            Transform::AddAssignExports => Rules::new().on_export(|visit| {
                let name = format!("{}!!", visit.name());
                visit.set_name(name);
            }),
            Transform::OneCharExports => {
                let mut next = 0;
                Rules::new().on_export(move |visit| {
                    let ch = ONE_CHAR_NAMES[next % ONE_CHAR_NAMES.len()] as char;
                    next += 1;
                    visit.set_name(ch.to_string());
                })
            }
            Transform::RemoveExports => Rules::new().on_export(|visit| visit.remove()),
            Transform::RenameImports => Rules::new().on_import(|visit| {
                let field = format!("{}!!", visit.field());
                visit.set_field(field);
            }),
        }
    }
}

impl Display for Transform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
