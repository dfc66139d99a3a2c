//! Analysis units and their lifecycle
//!
//! One unit exists per workspace folder (rooted at a detected main file) and
//! one per loose file opened outside any workspace. Each unit owns the
//! published grammar-table snapshot for its compilation root; editors querying
//! an include file are re-resolved to the workspace unit whose file table
//! contains it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::RwLock;

use crate::grammar::records::ErrorRecord;
use crate::grammar::table::normalize_path;
use crate::grammar::GrammarTable;

/// Main-file candidates for a workspace folder, tried in order.
const MAIN_FILE_EXTENSIONS: [&str; 3] = [".pwn", ".p", ".inc"];

/// One compilation root and its published symbol model.
///
/// The table is replaced wholesale by each analysis pass through a single
/// atomic swap; readers keep whichever snapshot they loaded.
pub struct AnalysisUnit {
    root: PathBuf,
    main_file: Option<String>,
    is_workspace: bool,
    table: ArcSwap<GrammarTable>,
    errors: ArcSwap<Vec<ErrorRecord>>,
    pub(crate) in_progress: AtomicBool,
}

impl AnalysisUnit {
    fn new(root: PathBuf, is_workspace: bool, main_file: Option<String>) -> Self {
        Self {
            root,
            main_file,
            is_workspace,
            table: ArcSwap::from_pointee(GrammarTable::new()),
            errors: ArcSwap::from_pointee(Vec::new()),
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_workspace(&self) -> bool {
        self.is_workspace
    }

    pub fn main_file(&self) -> Option<&str> {
        self.main_file.as_deref()
    }

    /// The path handed to the analyzer: the workspace main file, or the
    /// loose file itself. `None` for a workspace with no detectable main.
    pub fn main_path(&self) -> Option<PathBuf> {
        if self.is_workspace {
            self.main_file.as_ref().map(|main| self.root.join(main))
        } else {
            Some(self.root.clone())
        }
    }

    /// The current published table snapshot.
    pub fn snapshot(&self) -> Arc<GrammarTable> {
        self.table.load_full()
    }

    pub fn publish(&self, table: GrammarTable, errors: Vec<ErrorRecord>) {
        self.table.store(Arc::new(table));
        self.errors.store(Arc::new(errors));
    }

    /// Error records from the most recent analysis pass.
    pub fn last_errors(&self) -> Arc<Vec<ErrorRecord>> {
        self.errors.load_full()
    }
}

/// Registry of analysis units, keyed by compilation root.
#[derive(Default)]
pub struct AnalysisManager {
    units: RwLock<HashMap<PathBuf, Arc<AnalysisUnit>>>,
    workspaces: RwLock<Vec<PathBuf>>,
}

impl AnalysisManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register workspace folders, creating one unit per folder with an
    /// auto-detected main file.
    pub async fn add_workspace_folders(&self, folders: Vec<PathBuf>) -> Vec<Arc<AnalysisUnit>> {
        let mut created = Vec::with_capacity(folders.len());
        let mut units = self.units.write().await;
        let mut workspaces = self.workspaces.write().await;

        for folder in folders {
            let folder = normalize_path(&folder);
            let main_file = detect_main_file(&folder);
            let unit = Arc::new(AnalysisUnit::new(folder.clone(), true, main_file));
            units.insert(folder.clone(), Arc::clone(&unit));
            if !workspaces.contains(&folder) {
                workspaces.push(folder);
            }
            created.push(unit);
        }

        created
    }

    pub async fn remove_workspace_folders(&self, folders: Vec<PathBuf>) {
        let mut units = self.units.write().await;
        let mut workspaces = self.workspaces.write().await;

        for folder in folders {
            let folder = normalize_path(&folder);
            units.remove(&folder);
            workspaces.retain(|w| w != &folder);
        }
    }

    /// The unit responsible for `path`, creating a loose-file unit when no
    /// workspace claims it and `auto_create` is set.
    pub async fn unit_for(&self, path: &Path, auto_create: bool) -> Option<Arc<AnalysisUnit>> {
        let key = self.resolve_key(path).await;

        {
            let units = self.units.read().await;
            if let Some(unit) = units.get(&key) {
                return Some(Arc::clone(unit));
            }
        }

        if !auto_create {
            return None;
        }

        let unit = Arc::new(AnalysisUnit::new(key.clone(), false, None));
        self.units.write().await.insert(key, Arc::clone(&unit));
        Some(unit)
    }

    /// Drop the loose-file unit for `path`, if any. Workspace units persist
    /// until their folder is removed.
    pub async fn remove_loose_unit(&self, path: &Path) {
        let key = self.resolve_key(path).await;
        let mut units = self.units.write().await;
        if units.get(&key).is_some_and(|u| !u.is_workspace) {
            units.remove(&key);
        }
    }

    pub async fn all_units(&self) -> Vec<Arc<AnalysisUnit>> {
        self.units.read().await.values().cloned().collect()
    }

    /// Map a document path to its compilation root: the workspace folder when
    /// the path is the workspace's main file or appears in a workspace
    /// table's file list, otherwise the path itself.
    async fn resolve_key(&self, path: &Path) -> PathBuf {
        let path = normalize_path(path);
        let units = self.units.read().await;
        let workspaces = self.workspaces.read().await;

        for workspace in workspaces.iter() {
            let Some(unit) = units.get(workspace) else { continue };

            if path == *workspace {
                return workspace.clone();
            }
            if path.parent() == Some(workspace.as_path())
                && path.file_name().and_then(|n| n.to_str()) == unit.main_file()
            {
                return workspace.clone();
            }
        }

        for workspace in workspaces.iter() {
            let Some(unit) = units.get(workspace) else { continue };
            let table = unit.snapshot();
            if table.files().iter().any(|f| f.path == path) {
                return workspace.clone();
            }
        }

        path
    }
}

/// Look for `<folder-name>` or `main` with a known Pawn extension directly in
/// the folder; the first existing candidate wins.
fn detect_main_file(folder: &Path) -> Option<String> {
    let folder_name = folder.file_name().and_then(|n| n.to_str());
    let candidates = folder_name.into_iter().chain(std::iter::once("main"));

    for name in candidates {
        for ext in MAIN_FILE_EXTENSIONS {
            let candidate = format!("{name}{ext}");
            if folder.join(&candidate).is_file() {
                return Some(candidate);
            }
        }
    }

    None
}
