//! The import graph between loaded files.
//!
//! Edges are written as grammar names in the source (`import X;`,
//! `tokenVocab = X;`). A name maps to the loaded file whose header declares
//! grammar `X`, falling back to a file whose stem is `X`. Cycles are legal;
//! every walk here keeps a visited set.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::config::ImportPrecedence;
use crate::base::FileId;
use crate::hir::{GrammarImport, ImportKind, Visibility};

/// One file of an import closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureMember {
    pub file: FileId,
    pub visibility: Visibility,
    /// Import distance from the root (direct imports are 1)
    pub depth: u32,
}

/// An import of the root file that leads back to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCycle {
    /// The root's import statement that starts the cycle
    pub import: GrammarImport,
    /// Files along the cycle, starting and ending at the root
    pub path: Vec<FileId>,
}

/// The files reachable from one file, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportClosure {
    pub members: Vec<ClosureMember>,
    pub cycles: Vec<ImportCycle>,
}

impl ImportClosure {
    pub fn files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.members.iter().map(|m| m.file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileNode {
    stem: Option<SmolStr>,
    grammar: Option<SmolStr>,
    imports: Vec<GrammarImport>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    precedence: ImportPrecedence,
    files: FxHashMap<FileId, FileNode>,
    by_grammar: FxHashMap<SmolStr, Vec<FileId>>,
    by_stem: FxHashMap<SmolStr, Vec<FileId>>,
    closures: FxHashMap<FileId, Arc<ImportClosure>>,
}

impl ImportGraph {
    pub fn new(precedence: ImportPrecedence) -> Self {
        Self {
            precedence,
            ..Self::default()
        }
    }

    /// Record a file's name and imports. Returns `true` if the graph changed,
    /// in which case every cached closure is dropped.
    pub fn set_file(
        &mut self,
        file: FileId,
        stem: Option<SmolStr>,
        grammar: Option<SmolStr>,
        imports: Vec<GrammarImport>,
    ) -> bool {
        let node = FileNode {
            stem,
            grammar,
            imports,
        };
        if self.files.get(&file) == Some(&node) {
            return false;
        }
        self.files.insert(file, node);
        self.invalidate();
        true
    }

    pub fn remove_file(&mut self, file: FileId) -> bool {
        if self.files.remove(&file).is_none() {
            return false;
        }
        self.invalidate();
        true
    }

    pub fn contains(&self, file: FileId) -> bool {
        self.files.contains_key(&file)
    }

    fn invalidate(&mut self) {
        self.closures.clear();
        self.by_grammar.clear();
        self.by_stem.clear();
        for (&id, node) in &self.files {
            if let Some(grammar) = &node.grammar {
                self.by_grammar.entry(grammar.clone()).or_default().push(id);
            }
            if let Some(stem) = &node.stem {
                self.by_stem.entry(stem.clone()).or_default().push(id);
            }
        }
        for ids in self.by_grammar.values_mut().chain(self.by_stem.values_mut()) {
            ids.sort();
        }
    }

    /// The file an import name refers to.
    pub fn resolve_name(&self, name: &str) -> Option<FileId> {
        self.by_grammar
            .get(name)
            .or_else(|| self.by_stem.get(name))
            .and_then(|ids| ids.first().copied())
    }

    /// Human-readable name of a file: its grammar name, else its stem.
    pub fn display_name(&self, file: FileId) -> SmolStr {
        self.files
            .get(&file)
            .and_then(|node| node.grammar.clone().or_else(|| node.stem.clone()))
            .unwrap_or_else(|| SmolStr::new("?"))
    }

    /// Resolved outgoing edges of `file`, in declaration order.
    fn edges(&self, file: FileId) -> Vec<(&GrammarImport, FileId)> {
        self.files
            .get(&file)
            .map(|node| {
                node.imports
                    .iter()
                    .filter_map(|import| self.resolve_name(&import.name).map(|target| (import, target)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The import closure of `file`, computed breadth-first and cached until
    /// the graph changes.
    pub fn closure(&mut self, file: FileId) -> Arc<ImportClosure> {
        if let Some(closure) = self.closures.get(&file) {
            return closure.clone();
        }
        let closure = Arc::new(ImportClosure {
            members: self.walk(file),
            cycles: self.cycles(file),
        });
        self.closures.insert(file, closure.clone());
        closure
    }

    fn walk(&self, root: FileId) -> Vec<ClosureMember> {
        let mut visited = FxHashSet::default();
        visited.insert(root);
        let mut members = Vec::new();
        let mut frontier = vec![(root, Visibility::All)];
        let mut depth = 0;

        while !frontier.is_empty() {
            depth += 1;
            let mut level = Vec::new();
            for &(from, visibility) in &frontier {
                for (import, target) in self.edges(from) {
                    let visibility = match (visibility, import.kind) {
                        (Visibility::All, ImportKind::Delegate) => Visibility::All,
                        _ => Visibility::TokensOnly,
                    };
                    level.push((target, visibility));
                }
            }
            if self.precedence == ImportPrecedence::LastImportWins {
                level.reverse();
            }

            let mut next = Vec::new();
            for (target, visibility) in level {
                if visited.insert(target) {
                    members.push(ClosureMember {
                        file: target,
                        visibility,
                        depth,
                    });
                    next.push((target, visibility));
                }
            }
            frontier = next;
        }
        members
    }

    fn cycles(&self, root: FileId) -> Vec<ImportCycle> {
        let mut cycles = Vec::new();
        for (import, target) in self.edges(root) {
            if let Some(mut path) = self.path_between(target, root) {
                path.insert(0, root);
                cycles.push(ImportCycle {
                    import: import.clone(),
                    path,
                });
            }
        }
        cycles
    }

    /// Shortest import path from `from` to `to`, both included.
    fn path_between(&self, from: FileId, to: FileId) -> Option<Vec<FileId>> {
        if from == to {
            return Some(vec![to]);
        }
        let mut parent: FxHashMap<FileId, FileId> = FxHashMap::default();
        let mut queue = VecDeque::from([from]);
        let mut visited = FxHashSet::from_iter([from]);
        while let Some(current) = queue.pop_front() {
            for (_, next) in self.edges(current) {
                if !visited.insert(next) {
                    continue;
                }
                parent.insert(next, current);
                if next == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(&prev) = parent.get(&cursor) {
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Every file that transitively imports one of `changed`.
    pub fn dependents(&self, changed: &FxHashSet<FileId>) -> FxHashSet<FileId> {
        let mut reverse: FxHashMap<FileId, Vec<FileId>> = FxHashMap::default();
        for &file in self.files.keys() {
            for (_, target) in self.edges(file) {
                reverse.entry(target).or_default().push(file);
            }
        }

        let mut found = FxHashSet::default();
        let mut queue: VecDeque<FileId> = changed.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            for &importer in reverse.get(&current).into_iter().flatten() {
                if found.insert(importer) {
                    queue.push_back(importer);
                }
            }
        }
        found
    }
}
