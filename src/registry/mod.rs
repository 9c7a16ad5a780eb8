//! Grammar registry: the process-wide store of loaded grammar files.
//!
//! The registry owns every loaded file's latest [`SourceFile`] snapshot and
//! decides when files are recomputed:
//!
//! - `load` parses immediately.
//! - `edit` only records the new text; the recompute runs once the debounce
//!   deadline has passed and the driver calls `flush_due`.
//! - After any commit, every file whose import closure contains a file whose
//!   exported names changed is re-resolved without being reparsed.
//!
//! Queries never take the registry's state lock. They work on an
//! `Arc<Snapshot>` that is swapped in one step at the end of each commit.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = GrammarRegistry::new();
//! registry.load("/g/Expr.g4", text);
//! registry.edit("/g/Expr.g4", new_text, Instant::now());
//! // later, driven by next_deadline():
//! registry.flush_due(Instant::now());
//! let analysis = registry.analysis();
//! ```

mod config;
mod edit_state;
mod graph;
mod snapshot;

pub use config::{ImportPrecedence, RegistryConfig};
pub use edit_state::{EditPhase, EditState, RecomputeTicket};
pub use graph::{ClosureMember, ImportClosure, ImportCycle, ImportGraph};
pub use snapshot::{Snapshot, SourceFile};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::base::{FileId, FileSet, Span, TextRange};
use crate::hir::{Diagnostic, DiagnosticKind, ImportedTable, Symbol, SymbolKind};
use crate::ide::Analysis;
use snapshot::ResolveContext;

/// Work counters, for tests and status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Reparses whose result was committed
    pub recomputes: u64,
    /// Resolutions of a file caused by a change in its import closure
    pub re_resolutions: u64,
    /// Recomputes whose result was thrown away because they were superseded
    pub discarded: u64,
    pub loaded_files: usize,
}

/// What one flush did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub recomputed: Vec<PathBuf>,
    pub re_resolved: Vec<PathBuf>,
    pub discarded: usize,
}

struct RecomputeJob {
    id: FileId,
    path: Arc<Path>,
    version: u64,
    ticket: RecomputeTicket,
}

struct RecomputeResult {
    id: FileId,
    generation: u64,
    file: Option<SourceFile>,
}

/// Recomputes started by [`GrammarRegistry::begin_flush`], not yet run.
pub struct FlushBatch {
    jobs: Vec<RecomputeJob>,
    parallel: bool,
}

impl FlushBatch {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Parse, extract and check every file of the batch. Runs without any
    /// registry lock held, so edits may supersede jobs meanwhile.
    pub fn compute(self) -> ComputedBatch {
        let results = if self.parallel {
            self.jobs.into_par_iter().map(run_job).collect()
        } else {
            self.jobs.into_iter().map(run_job).collect()
        };
        ComputedBatch { results }
    }
}

/// Results of [`FlushBatch::compute`], ready for [`GrammarRegistry::commit`].
pub struct ComputedBatch {
    results: Vec<RecomputeResult>,
}

fn run_job(job: RecomputeJob) -> RecomputeResult {
    let file = SourceFile::analyze(
        job.id,
        job.path,
        job.ticket.text,
        job.version,
        Some(&job.ticket.cancel),
    );
    RecomputeResult {
        id: job.id,
        generation: job.ticket.generation,
        file,
    }
}

struct RegistryState {
    file_set: FileSet,
    /// Mirror of the committed snapshot that commits build on
    working: Snapshot,
    edits: FxHashMap<FileId, EditState>,
    versions: FxHashMap<FileId, u64>,
    graph: ImportGraph,
    changed: FxHashSet<FileId>,
    stats: RegistryStats,
}

impl RegistryState {
    fn next_version(&mut self, id: FileId) -> u64 {
        let version = self.versions.entry(id).or_insert(0);
        *version += 1;
        *version
    }
}

/// Owns all grammar files and their analysis results.
pub struct GrammarRegistry {
    config: RegistryConfig,
    state: Mutex<RegistryState>,
    committed: RwLock<Arc<Snapshot>>,
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let state = RegistryState {
            file_set: FileSet::new(),
            working: Snapshot::default(),
            edits: FxHashMap::default(),
            versions: FxHashMap::default(),
            graph: ImportGraph::new(config.import_precedence),
            changed: FxHashSet::default(),
            stats: RegistryStats::default(),
        };
        Self {
            config,
            state: Mutex::new(state),
            committed: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Load (or reload) a file and analyze it right away.
    ///
    /// Any pending or in-flight edit of the same file is dropped.
    pub fn load(&self, path: impl AsRef<Path>, text: impl Into<Arc<str>>) -> FileId {
        let path: Arc<Path> = Arc::from(path.as_ref());
        let mut state = self.state.lock();
        let id = state.file_set.intern(&path);
        if let Some(edit) = state.edits.get_mut(&id) {
            edit.reset();
        }
        let version = state.next_version(id);
        debug!(path = %path.display(), version, "load");

        let mut report = FlushReport::default();
        if let Some(file) = SourceFile::analyze(id, path, text.into(), version, None) {
            state.stats.recomputes += 1;
            self.commit_files(&mut state, vec![file], &mut report);
        }
        id
    }

    /// Record an edit; the file is recomputed once `now + debounce` has passed.
    ///
    /// A newer edit replaces the pending text and resets the deadline. If the
    /// file is being recomputed, that recompute is cancelled and its result
    /// will be discarded.
    pub fn edit(&self, path: impl AsRef<Path>, text: impl Into<Arc<str>>, now: Instant) {
        let path = path.as_ref();
        let deadline = now + self.config.debounce;
        let mut state = self.state.lock();
        let id = state.file_set.intern(path);
        let superseded = state.edits.entry(id).or_default().edit(text.into(), deadline);
        if superseded {
            warn!(path = %path.display(), "edit superseded an in-flight recompute");
        }
        debug!(path = %path.display(), "edit pending");
    }

    /// Evict a file. Files importing it stay loaded and are re-resolved.
    ///
    /// Returns `false` if the file was not loaded.
    pub fn close(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let mut state = self.state.lock();
        let Some(id) = state.file_set.file_id(path) else {
            return false;
        };
        // The entry stays so its generation keeps increasing across a close.
        if let Some(edit) = state.edits.get_mut(&id) {
            edit.reset();
        }
        if state.working.file(id).is_none() {
            return false;
        }
        debug!(path = %path.display(), "close");

        let closed = FxHashSet::from_iter([id]);
        let mut dependents = state.graph.dependents(&closed);
        dependents.remove(&id);
        state.graph.remove_file(id);
        state.working.remove(id);
        state.changed.insert(id);

        let mut report = FlushReport::default();
        self.resolve_files(&mut state, dependents, &FxHashSet::default(), &mut report);
        true
    }

    // ========================================================================
    // FLUSHING
    // ========================================================================

    /// The earliest pending deadline, if any edit is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        let state = self.state.lock();
        state.edits.values().filter_map(EditState::deadline).min()
    }

    /// Recompute every file whose debounce deadline is at or before `now`.
    pub fn flush_due(&self, now: Instant) -> FlushReport {
        let batch = self.begin_flush(Some(now));
        if batch.is_empty() {
            return FlushReport::default();
        }
        self.commit(batch.compute())
    }

    /// Recompute every file with a pending edit, ignoring deadlines.
    pub fn flush_all(&self) -> FlushReport {
        let batch = self.begin_flush(None);
        if batch.is_empty() {
            return FlushReport::default();
        }
        self.commit(batch.compute())
    }

    /// Start recomputes for pending edits due at `now` (all of them for
    /// `None`). The returned batch must be computed and committed.
    pub fn begin_flush(&self, now: Option<Instant>) -> FlushBatch {
        let mut state = self.state.lock();
        let RegistryState {
            file_set,
            edits,
            versions,
            ..
        } = &mut *state;

        let mut jobs = Vec::new();
        for (&id, edit) in edits.iter_mut() {
            let due = match now {
                Some(now) => edit.is_due(now),
                None => edit.deadline().is_some(),
            };
            if !due {
                continue;
            }
            let (Some(ticket), Some(path)) = (edit.begin(), file_set.path(id)) else {
                continue;
            };
            let version = versions.entry(id).or_insert(0);
            *version += 1;
            jobs.push(RecomputeJob {
                id,
                path: path.clone(),
                version: *version,
                ticket,
            });
        }
        jobs.sort_by_key(|job| job.id);
        debug!(jobs = jobs.len(), "flush started");
        FlushBatch {
            jobs,
            parallel: self.config.parallel,
        }
    }

    /// Commit computed results. Results superseded by a later edit, or for
    /// files closed meanwhile, are discarded.
    pub fn commit(&self, computed: ComputedBatch) -> FlushReport {
        let mut state = self.state.lock();
        let mut report = FlushReport::default();
        let mut accepted = Vec::new();

        for result in computed.results {
            let live = state
                .edits
                .get_mut(&result.id)
                .is_some_and(|edit| edit.complete(result.generation));
            match result.file {
                Some(file) if live => accepted.push(file),
                _ => {
                    warn!(file = result.id.index(), "discarded superseded recompute");
                    state.stats.discarded += 1;
                    report.discarded += 1;
                }
            }
        }

        state.stats.recomputes += accepted.len() as u64;
        if !accepted.is_empty() {
            self.commit_files(&mut state, accepted, &mut report);
        }
        report
    }

    /// Install freshly parsed files, then resolve them and every file whose
    /// closure saw a change in exported names.
    fn commit_files(&self, state: &mut RegistryState, files: Vec<SourceFile>, report: &mut FlushReport) {
        let reparsed: FxHashSet<FileId> = files.iter().map(SourceFile::id).collect();
        let mut exports_changed = FxHashSet::default();
        for file in &files {
            let changed = state.working.file(file.id()).is_none_or(|previous| {
                !previous.table().same_exports(file.table())
                    || previous.table().imports != file.table().imports
            });
            if changed {
                exports_changed.insert(file.id());
            }
        }

        // Importers under the old graph lose or change what they see; importers
        // under the new graph may gain it.
        let mut to_resolve = state.graph.dependents(&exports_changed);
        for file in files {
            state.graph.set_file(
                file.id(),
                file.stem().map(SmolStr::new),
                file.table().grammar_name().cloned(),
                file.table().imports.clone(),
            );
            report.recomputed.push(file.path().to_path_buf());
            state.working.insert(Arc::new(file));
        }
        to_resolve.extend(state.graph.dependents(&exports_changed));
        to_resolve.extend(reparsed.iter().copied());

        self.resolve_files(state, to_resolve, &reparsed, report);
    }

    /// Resolve `ids` against the working snapshot and publish it.
    fn resolve_files(
        &self,
        state: &mut RegistryState,
        ids: FxHashSet<FileId>,
        reparsed: &FxHashSet<FileId>,
        report: &mut FlushReport,
    ) {
        let mut ids: Vec<FileId> = ids
            .into_iter()
            .filter(|id| state.working.file(*id).is_some())
            .collect();
        ids.sort();

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(file) = state.working.file(id).cloned() {
                let ctx = self.resolve_context(&mut state.graph, &state.working, &file);
                jobs.push((file, ctx));
            }
        }

        let resolved: Vec<SourceFile> = if self.config.parallel {
            jobs.into_par_iter().map(|(file, ctx)| file.resolve(ctx)).collect()
        } else {
            jobs.into_iter().map(|(file, ctx)| file.resolve(ctx)).collect()
        };

        let before = self.committed.read().clone();
        for file in resolved {
            let id = file.id();
            let diagnostics_changed = before
                .file(id)
                .is_none_or(|old| old.diagnostics() != file.diagnostics());
            if diagnostics_changed {
                state.changed.insert(id);
            }
            if !reparsed.contains(&id) {
                state.stats.re_resolutions += 1;
                report.re_resolved.push(file.path().to_path_buf());
            }
            state.working.insert(Arc::new(file));
        }

        state.stats.loaded_files = state.working.len();
        *self.committed.write() = Arc::new(state.working.clone());
        debug!(
            recomputed = report.recomputed.len(),
            re_resolved = report.re_resolved.len(),
            "committed snapshot"
        );
    }

    fn resolve_context(&self, graph: &mut ImportGraph, working: &Snapshot, file: &SourceFile) -> ResolveContext {
        let closure = graph.closure(file.id());
        let tables = closure
            .members
            .iter()
            .filter_map(|member| {
                working.file(member.file).map(|imported| ImportedTable {
                    file: member.file,
                    table: imported.table().clone(),
                    visibility: member.visibility,
                    depth: member.depth,
                })
            })
            .collect();

        let mut grammars = FxHashMap::default();
        for import in &file.table().imports {
            if let Some(target) = graph.resolve_name(&import.name)
                && let Some(imported) = working.file(target)
            {
                grammars.insert(import.name.clone(), grammar_symbol(imported));
            }
        }

        let cycle_diagnostics = closure
            .cycles
            .iter()
            .map(|cycle| {
                let names: Vec<SmolStr> = cycle.path.iter().map(|&f| graph.display_name(f)).collect();
                Diagnostic::new(
                    DiagnosticKind::CyclicImport,
                    file.id(),
                    cycle.import.range,
                    cycle.import.span,
                    format!("import cycle: {}", names.join(" -> ")),
                )
            })
            .collect();

        ResolveContext {
            closure,
            tables,
            grammars,
            cycle_diagnostics,
            report_unresolved_imports: self.config.report_unresolved_imports,
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// A consistent read-only view for queries. Cheap: clones one `Arc`.
    pub fn analysis(&self) -> Analysis {
        Analysis::new(self.snapshot())
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.committed.read().clone()
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<Arc<SourceFile>> {
        self.snapshot().file_by_path(path.as_ref()).cloned()
    }

    pub fn file_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.snapshot().file_id(path.as_ref())
    }

    pub fn is_loaded(&self, path: impl AsRef<Path>) -> bool {
        self.file_id(path).is_some()
    }

    /// Current diagnostics of a file; empty if it is not loaded.
    pub fn diagnostics(&self, path: impl AsRef<Path>) -> Vec<Diagnostic> {
        self.file(path)
            .map(|file| file.diagnostics().to_vec())
            .unwrap_or_default()
    }

    /// Paths whose diagnostics changed since the last call, sorted.
    pub fn take_changed(&self) -> Vec<PathBuf> {
        let mut state = self.state.lock();
        let changed = std::mem::take(&mut state.changed);
        let mut paths: Vec<PathBuf> = changed
            .into_iter()
            .filter_map(|id| state.file_set.path_buf(id))
            .collect();
        paths.sort();
        paths
    }

    /// Edit-state phase of a file, `None` if the path was never seen.
    pub fn edit_phase(&self, path: impl AsRef<Path>) -> Option<EditPhase> {
        let state = self.state.lock();
        let id = state.file_set.file_id(path.as_ref())?;
        Some(state.edits.get(&id).map_or(EditPhase::Idle, EditState::phase))
    }

    pub fn stats(&self) -> RegistryStats {
        self.state.lock().stats
    }
}

/// The symbol a `Grammar` reference to `file` binds to. Files without a
/// header are named by their stem.
fn grammar_symbol(file: &SourceFile) -> Symbol {
    file.symbols()
        .iter()
        .find(|s| s.kind == SymbolKind::Grammar)
        .cloned()
        .unwrap_or_else(|| Symbol {
            name: SmolStr::new(file.stem().unwrap_or_default()),
            kind: SymbolKind::Grammar,
            file: file.id(),
            range: TextRange::default(),
            span: Span::default(),
            decl_range: TextRange::default(),
            is_fragment: false,
            mode: None,
            literal: None,
            detail: None,
            doc: None,
        })
}
