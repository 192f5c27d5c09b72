use std::collections::BTreeMap;

use spliceasm_nodes::{IndexSpace, Module, NodePath, SectionContent};

/// Old-to-new index translation for one index space.
///
/// Removing entries only ever shifts later indices down, so the table is just the sorted list of
/// removed indices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct IndexMap {
    removed: Vec<u32>,
}

impl IndexMap {
    fn remove(&mut self, index: u32) {
        if let Err(at) = self.removed.binary_search(&index) {
            self.removed.insert(at, index);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }

    pub(crate) fn removed_count(&self) -> u32 {
        self.removed.len() as u32
    }

    /// The new index for `old`, or `None` if `old` itself was removed.
    pub(crate) fn map(&self, old: u32) -> Option<u32> {
        match self.removed.binary_search(&old) {
            Ok(_) => None,
            Err(below) => Some(old - below as u32),
        }
    }
}

/// One table per index space, built from the set of removed nodes.
#[derive(Debug, Default, Clone)]
pub(crate) struct IndexMaps(BTreeMap<IndexSpace, IndexMap>);

impl IndexMaps {
    pub(crate) fn from_removed<'a>(
        module: &Module,
        removed: impl IntoIterator<Item = &'a NodePath>,
    ) -> Self {
        let mut maps = Self::default();
        let imported_funcs = module.imported_count(IndexSpace::Func);
        for path in removed {
            let Some(section) = module.sections().get(path.section) else {
                continue;
            };
            let entry = path.entry as u32;
            let (space, index) = match &section.content {
                SectionContent::Type(_) => (IndexSpace::Type, entry),
                SectionContent::Import(xs) => {
                    let Some((import, index)) =
                        xs.get(path.entry).zip(module.import_index(path.entry))
                    else {
                        continue;
                    };
                    (import.desc.space(), index)
                }
                SectionContent::Function(_) => (IndexSpace::Func, imported_funcs + entry),
                SectionContent::Table(_) => (
                    IndexSpace::Table,
                    module.imported_count(IndexSpace::Table) + entry,
                ),
                SectionContent::Memory(_) => (
                    IndexSpace::Memory,
                    module.imported_count(IndexSpace::Memory) + entry,
                ),
                SectionContent::Global(_) => (
                    IndexSpace::Global,
                    module.imported_count(IndexSpace::Global) + entry,
                ),
                _ => continue,
            };
            maps.0.entry(space).or_default().remove(index);
        }
        maps
    }

    pub(crate) fn get(&self, space: IndexSpace) -> Option<&IndexMap> {
        self.0.get(&space).filter(|xs| !xs.is_empty())
    }

    /// Spaces that lost at least one entry.
    pub(crate) fn spaces(&self) -> impl Iterator<Item = IndexSpace> + '_ {
        self.0
            .iter()
            .filter(|(_, map)| !map.is_empty())
            .map(|(space, _)| *space)
    }

    pub(crate) fn map(&self, space: IndexSpace, old: u32) -> Option<u32> {
        match self.get(space) {
            Some(map) => map.map(old),
            None => Some(old),
        }
    }

    pub(crate) fn removed_count(&self, space: IndexSpace) -> u32 {
        self.get(space).map_or(0, IndexMap::removed_count)
    }
}
