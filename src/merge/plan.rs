//! Pure merge planning.
//!
//! [`compute_plan`] is a function of two path → digest maps and the preserve
//! matcher; it never touches the filesystem. Paths are `/`-separated and
//! relative to the episode root on the incoming side and to the install
//! directory on the local side.

use crate::pattern::PreserveMatcher;
use crate::utils::fs::FileDigest;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Relative path → content digest.
pub type Inventory = BTreeMap<String, FileDigest>;

/// What the merge does with one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    /// Absent locally; copy it in.
    Create,
    /// Present with different bytes; replace it.
    Overwrite,
    /// Present with identical bytes; nothing to do.
    Unchanged,
    /// Matches a preserve pattern and exists locally; never touched.
    SkipPreserved,
    /// Present locally, absent from the archive; remove it.
    DeleteMissing,
}

impl Decision {
    /// Whether applying this decision changes the installation.
    pub const fn mutates(self) -> bool {
        matches!(self, Self::Create | Self::Overwrite | Self::DeleteMissing)
    }
}

/// Decision for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// Path inside the install directory the decision applies to
    pub path: String,
    /// Path inside the episode root to copy from, for create and overwrite
    pub source: Option<String>,
    pub decision: Decision,
}

/// Every per-file decision for one run, sorted by path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergePlan {
    pub files: Vec<PlannedFile>,
    /// No install directory existed
    pub fresh_install: bool,
}

impl MergePlan {
    /// Entries that change the installation, in apply order.
    ///
    /// Deletions come first. Once they have run and pruned their empty
    /// parents, a path that turns from a directory into a file (or back) is
    /// free for the create that replaces it.
    pub fn operations(&self) -> impl Iterator<Item = &PlannedFile> {
        let deletes = self.files.iter().filter(|f| f.decision == Decision::DeleteMissing);
        let writes = self
            .files
            .iter()
            .filter(|f| matches!(f.decision, Decision::Create | Decision::Overwrite));
        deletes.chain(writes)
    }

    /// Install-relative paths the backup must capture.
    pub fn touched_paths(&self) -> Vec<String> {
        self.operations().map(|f| f.path.clone()).collect()
    }

    pub fn count(&self, decision: Decision) -> usize {
        self.files.iter().filter(|f| f.decision == decision).count()
    }

    /// Whether applying the plan would change nothing.
    pub fn is_noop(&self) -> bool {
        self.operations().next().is_none()
    }
}

/// Computes the merge plan.
///
/// `local` is `None` for a fresh install, in which case every incoming path is
/// created and nothing is deleted. A path matching a preserve pattern is never
/// overwritten or deleted: it is skipped when it exists locally and created
/// when it does not. With a case-insensitive matcher, local and incoming paths
/// are paired by their case-folded form and the local spelling is kept.
pub fn compute_plan(
    incoming: &Inventory,
    local: Option<&Inventory>,
    matcher: &PreserveMatcher,
) -> MergePlan {
    let case = matcher.case_sensitivity();
    let Some(local) = local else {
        let files = incoming
            .keys()
            .map(|path| PlannedFile {
                path: path.clone(),
                source: Some(path.clone()),
                decision: Decision::Create,
            })
            .collect();
        return MergePlan {
            files,
            fresh_install: true,
        };
    };

    let mut local_by_key: HashMap<String, (&String, &FileDigest)> =
        local.iter().map(|(path, digest)| (case.fold(path), (path, digest))).collect();

    let mut files = Vec::with_capacity(incoming.len() + local.len());
    for (path, digest) in incoming {
        let planned = match local_by_key.remove(&case.fold(path)) {
            None => PlannedFile {
                path: path.clone(),
                source: Some(path.clone()),
                decision: Decision::Create,
            },
            Some((local_path, local_digest)) => {
                let decision = if matcher.matches(local_path) || matcher.matches(path) {
                    Decision::SkipPreserved
                } else if local_digest == digest {
                    Decision::Unchanged
                } else {
                    Decision::Overwrite
                };
                PlannedFile {
                    path: local_path.clone(),
                    source: (decision == Decision::Overwrite).then(|| path.clone()),
                    decision,
                }
            }
        };
        files.push(planned);
    }

    for (local_path, _) in local_by_key.into_values() {
        let decision = if matcher.matches(local_path) {
            Decision::SkipPreserved
        } else {
            Decision::DeleteMissing
        };
        files.push(PlannedFile {
            path: local_path.clone(),
            source: None,
            decision,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    MergePlan {
        files,
        fresh_install: false,
    }
}
