//! Revision Store - Append-Only History with Compare-and-Swap
//!
//! A commit names the revision it expects to be latest. If another commit
//! got there first the caller receives `StaleRevision` and must re-diff
//! against the new latest revision. Nothing is ever merged or overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use uuid::Uuid;

use crate::compiler::Revision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRevision {
    pub project_id: ProjectId,
    pub committed_at: DateTime<Utc>,
    pub revision: Revision,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stale revision: expected latest {expected:?}, found {actual:?}")]
    StaleRevision {
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("revision {revision_id} must directly follow {expected:?}")]
    NonMonotonic {
        expected: Option<u64>,
        revision_id: u64,
    },

    #[error("revision {revision_id} not found for project {project}")]
    NotFound { project: ProjectId, revision_id: u64 },

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait RevisionStore: Send + Sync {
    fn latest(&self, project: ProjectId) -> Result<Option<Arc<StoredRevision>>, StoreError>;

    fn get(&self, project: ProjectId, revision_id: u64) -> Result<Arc<StoredRevision>, StoreError>;

    /// Revision ids for `project`, oldest first.
    fn history(&self, project: ProjectId) -> Result<Vec<u64>, StoreError>;

    /// Append `revision` if and only if the latest committed revision is
    /// `expected` (`None` for a project with no history).
    fn commit(
        &self,
        project: ProjectId,
        expected: Option<u64>,
        revision: Revision,
    ) -> Result<Arc<StoredRevision>, StoreError>;
}

fn check_sequence(expected: Option<u64>, actual: Option<u64>, revision_id: u64) -> Result<(), StoreError> {
    if actual != expected {
        return Err(StoreError::StaleRevision { expected, actual });
    }
    match expected {
        Some(prev) if revision_id != prev + 1 => Err(StoreError::NonMonotonic { expected, revision_id }),
        _ => Ok(()),
    }
}

#[derive(Default)]
pub struct InMemoryRevisionStore {
    projects: RwLock<HashMap<ProjectId, Vec<Arc<StoredRevision>>>>,
}

impl InMemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RevisionStore for InMemoryRevisionStore {
    fn latest(&self, project: ProjectId) -> Result<Option<Arc<StoredRevision>>, StoreError> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(projects.get(&project).and_then(|h| h.last().cloned()))
    }

    fn get(&self, project: ProjectId, revision_id: u64) -> Result<Arc<StoredRevision>, StoreError> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        projects
            .get(&project)
            .and_then(|h| h.iter().find(|r| r.revision.revision_id == revision_id).cloned())
            .ok_or(StoreError::NotFound { project, revision_id })
    }

    fn history(&self, project: ProjectId) -> Result<Vec<u64>, StoreError> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(projects
            .get(&project)
            .map(|h| h.iter().map(|r| r.revision.revision_id).collect())
            .unwrap_or_default())
    }

    fn commit(
        &self,
        project: ProjectId,
        expected: Option<u64>,
        revision: Revision,
    ) -> Result<Arc<StoredRevision>, StoreError> {
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        let history = projects.entry(project).or_default();
        let actual = history.last().map(|r| r.revision.revision_id);
        check_sequence(expected, actual, revision.revision_id)?;

        let stored = Arc::new(StoredRevision { project_id: project, committed_at: Utc::now(), revision });
        history.push(Arc::clone(&stored));
        tracing::debug!(%project, revision_id = stored.revision.revision_id, "committed revision");
        Ok(stored)
    }
}

/// Marks a project as claimed by its first commit. Holds that commit's revision.
const GENESIS: &str = ".genesis";

/// One JSON file per revision: `<root>/<project>/<revisionId>.json`.
///
/// Files are published with a hard link from a private temp file, so a
/// revision file either does not exist or is complete, and two writers
/// racing for the same revision id cannot both succeed.
pub struct FileRevisionStore {
    root: PathBuf,
}

impl FileRevisionStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project: ProjectId) -> PathBuf {
        self.root.join(project.to_string())
    }

    fn revision_path(&self, project: ProjectId, revision_id: u64) -> PathBuf {
        self.project_dir(project).join(format!("{:020}.json", revision_id))
    }

    /// First commits race on the genesis marker rather than on a revision
    /// file, since their revision ids may differ. A marker left without its
    /// revision file is published here by whoever finds it.
    fn claim_project(&self, project: ProjectId, tmp: &Path) -> Result<(), StoreError> {
        let genesis = self.project_dir(project).join(GENESIS);
        match fs::hard_link(tmp, &genesis) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let winner = self.read(&genesis)?.revision.revision_id;
                if let Err(e) = fs::hard_link(&genesis, self.revision_path(project, winner)) {
                    if e.kind() != ErrorKind::AlreadyExists {
                        return Err(e.into());
                    }
                }
                tracing::warn!(%project, revision_id = winner, "lost first-commit race");
                Err(StoreError::StaleRevision { expected: None, actual: Some(winner) })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self, path: &Path) -> Result<Arc<StoredRevision>, StoreError> {
        let file = fs::File::open(path)?;
        Ok(Arc::new(serde_json::from_reader(BufReader::new(file))?))
    }
}

impl RevisionStore for FileRevisionStore {
    fn latest(&self, project: ProjectId) -> Result<Option<Arc<StoredRevision>>, StoreError> {
        match self.history(project)?.last() {
            Some(&revision_id) => self.get(project, revision_id).map(Some),
            None => Ok(None),
        }
    }

    fn get(&self, project: ProjectId, revision_id: u64) -> Result<Arc<StoredRevision>, StoreError> {
        let path = self.revision_path(project, revision_id);
        match self.read(&path) {
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound { project, revision_id })
            }
            other => other,
        }
    }

    fn history(&self, project: ProjectId) -> Result<Vec<u64>, StoreError> {
        let dir = self.project_dir(project);
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut ids: Vec<u64> = vec![];
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse().ok()) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn commit(
        &self,
        project: ProjectId,
        expected: Option<u64>,
        revision: Revision,
    ) -> Result<Arc<StoredRevision>, StoreError> {
        let actual = self.history(project)?.last().copied();
        check_sequence(expected, actual, revision.revision_id)?;

        let dir = self.project_dir(project);
        fs::create_dir_all(&dir)?;
        let revision_id = revision.revision_id;
        let stored = StoredRevision { project_id: project, committed_at: Utc::now(), revision };

        let tmp = dir.join(format!(".{}.{}.tmp", revision_id, Uuid::new_v4()));
        {
            let mut writer = BufWriter::new(fs::File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &stored)?;
            std::io::Write::flush(&mut writer)?;
        }

        let claimed = match expected {
            None => self.claim_project(project, &tmp),
            Some(_) => Ok(()),
        };
        let published = claimed.map(|()| fs::hard_link(&tmp, self.revision_path(project, revision_id)));
        let _ = fs::remove_file(&tmp);
        match published? {
            Ok(()) => {
                tracing::debug!(%project, revision_id, dir = %dir.display(), "committed revision");
                Ok(Arc::new(stored))
            }
            // A racing loser already published our claimed first revision.
            Err(e) if e.kind() == ErrorKind::AlreadyExists && expected.is_none() => Ok(Arc::new(stored)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!(%project, revision_id, "lost commit race");
                Err(StoreError::StaleRevision { expected, actual: Some(revision_id) })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_site;
    use crate::model::{Page, SiteSpec, TemplateSlug};
    use crate::render::{fixtures, RenderRegistry};
    use crate::templates::LayoutTokens;
    use std::sync::Barrier;
    use std::thread;

    fn revision(revision_id: u64) -> Revision {
        let spec = SiteSpec {
            template_slug: TemplateSlug::Startup,
            brand: fixtures::brand(),
            pages: vec![Page { slug: "home".to_string(), title: "Home".to_string(), sections: vec![] }],
            entry_page: "home".to_string(),
            revision_id,
        };
        compile_site(&RenderRegistry::builtin(), &spec, LayoutTokens::default()).unwrap()
    }

    fn exercise(store: &dyn RevisionStore) {
        let project = ProjectId::new();
        assert!(store.latest(project).unwrap().is_none());

        store.commit(project, None, revision(1)).unwrap();
        store.commit(project, Some(1), revision(2)).unwrap();

        let err = store.commit(project, Some(1), revision(2)).unwrap_err();
        assert!(matches!(err, StoreError::StaleRevision { expected: Some(1), actual: Some(2) }));

        let err = store.commit(project, Some(2), revision(7)).unwrap_err();
        assert!(matches!(err, StoreError::NonMonotonic { revision_id: 7, .. }));

        assert_eq!(store.history(project).unwrap(), vec![1, 2]);
        assert_eq!(store.latest(project).unwrap().unwrap().revision.revision_id, 2);
        assert_eq!(store.get(project, 1).unwrap().revision, revision(1));
        assert!(matches!(store.get(project, 9), Err(StoreError::NotFound { revision_id: 9, .. })));
    }

    #[test]
    fn in_memory_store_enforces_cas() {
        exercise(&InMemoryRevisionStore::new());
    }

    #[test]
    fn file_store_enforces_cas() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRevisionStore::open(dir.path()).unwrap();
        exercise(&store);
    }

    #[test]
    fn racing_first_commits_have_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRevisionStore::open(dir.path()).unwrap();
        let (low, high) = (revision(1), revision(5));

        for _ in 0..25 {
            let project = ProjectId::new();
            let barrier = Barrier::new(2);
            let results: Vec<_> = thread::scope(|scope| {
                let handles: Vec<_> = [&low, &high]
                    .into_iter()
                    .map(|rev| {
                        let (store, barrier) = (&store, &barrier);
                        scope.spawn(move || {
                            barrier.wait();
                            store.commit(project, None, rev.clone())
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            let winners = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(winners, 1);
            assert!(results
                .iter()
                .any(|r| matches!(r, Err(StoreError::StaleRevision { expected: None, .. }))));
            assert_eq!(store.history(project).unwrap().len(), 1);
        }
    }

    #[test]
    fn orphaned_first_revision_is_published_by_next_writer() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRevisionStore::open(dir.path()).unwrap();
        let project = ProjectId::new();

        let orphan = StoredRevision { project_id: project, committed_at: Utc::now(), revision: revision(3) };
        fs::create_dir_all(store.project_dir(project)).unwrap();
        fs::write(store.project_dir(project).join(GENESIS), serde_json::to_vec(&orphan).unwrap()).unwrap();
        assert!(store.history(project).unwrap().is_empty());

        let err = store.commit(project, None, revision(1)).unwrap_err();
        assert!(matches!(err, StoreError::StaleRevision { expected: None, actual: Some(3) }));
        assert_eq!(store.history(project).unwrap(), vec![3]);
        store.commit(project, Some(3), revision(4)).unwrap();
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectId::new();
        FileRevisionStore::open(dir.path()).unwrap().commit(project, None, revision(1)).unwrap();

        let reopened = FileRevisionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.history(project).unwrap(), vec![1]);
        let err = reopened.commit(project, None, revision(1)).unwrap_err();
        assert!(matches!(err, StoreError::StaleRevision { expected: None, actual: Some(1) }));
    }
}
