use crate::core::duplicate::DuplicateGroup;
use crate::core::image::ImageRef;
use crate::core::selection::Selection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// No image is marked for deletion. Informational; callers should treat
    /// it as a no-op rather than a failure.
    #[error("no images are marked for deletion")]
    EmptyPlan,
}

/// File-deletion capability injected into plan execution, so the planner has
/// no direct file-system coupling and can run against a fake.
pub trait FileDeleter: Send + Sync {
    fn delete(&self, path: &Path) -> io::Result<()>;
}

/// Ordered, write-once deletion request built from finalized selections.
///
/// Snapshots every group so the audit text is reproducible from the plan
/// alone, before anything destructive happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionPlan {
    created_at: DateTime<Utc>,
    entries: Vec<ImageRef>,
    groups: Vec<PlanGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PlanGroup {
    index: usize,
    members: Vec<PlanMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PlanMember {
    path: String,
    delete: bool,
}

impl DeletionPlan {
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Images marked for deletion, in group order then member order.
    pub fn entries(&self) -> &[ImageRef] {
        &self.entries
    }

    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    /// Plain-text audit record: every group with a keep/delete marker per
    /// member, plus a trailing summary of the paths to delete.
    pub fn audit_text(&self) -> String {
        let mut text = String::from("Duplicate groups:\n");

        for group in &self.groups {
            let _ = writeln!(text, "\nGroup {}:", group.index + 1);
            for member in &group.members {
                let marker = if member.delete { "[delete]" } else { "[keep]  " };
                let _ = writeln!(text, "  {} {}", marker, member.path);
            }
        }

        let _ = writeln!(
            text,
            "\nFiles marked for deletion ({}):",
            self.entries.len()
        );
        for image in &self.entries {
            let _ = writeln!(text, "  {}", image.path().display());
        }

        text
    }

    /// Write the audit record and return the artifact path.
    pub fn write_audit(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::write(path, self.audit_text())?;
        Ok(path.to_path_buf())
    }
}

/// Per-entry result of one plan execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionStatus {
    Deleted,
    /// Already absent; not an error.
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub path: PathBuf,
    pub status: DeletionStatus,
}

/// Write-once summary of one plan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionReport {
    outcomes: Vec<DeletionOutcome>,
}

impl DeletionReport {
    pub fn outcomes(&self) -> &[DeletionOutcome] {
        &self.outcomes
    }

    pub fn deleted_count(&self) -> usize {
        self.count(|status| matches!(status, DeletionStatus::Deleted))
    }

    pub fn not_found_count(&self) -> usize {
        self.count(|status| matches!(status, DeletionStatus::NotFound))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|status| matches!(status, DeletionStatus::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&DeletionStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }
}

pub struct DeletionPlanner;

impl DeletionPlanner {
    /// Collect every keep=false member across the given groups into one
    /// ordered plan. Groups without a matching selection are treated as
    /// fully kept.
    pub fn build(
        groups: &[DuplicateGroup],
        selections: &[Selection],
    ) -> Result<DeletionPlan, PlanError> {
        let by_group: HashMap<usize, &Selection> = selections
            .iter()
            .map(|selection| (selection.group_index(), selection))
            .collect();

        let mut entries = Vec::new();
        let mut plan_groups = Vec::new();

        for group in groups {
            let selection = by_group.get(&group.index());
            let mut members = Vec::with_capacity(group.len());

            for image in group.members() {
                let delete = selection
                    .and_then(|s| s.is_kept(image))
                    .map(|kept| !kept)
                    .unwrap_or(false);

                if delete {
                    entries.push(image.clone());
                }
                members.push(PlanMember {
                    path: image.path().display().to_string(),
                    delete,
                });
            }

            plan_groups.push(PlanGroup {
                index: group.index(),
                members,
            });
        }

        if entries.is_empty() {
            return Err(PlanError::EmptyPlan);
        }

        Ok(DeletionPlan {
            created_at: Utc::now(),
            entries,
            groups: plan_groups,
        })
    }

    /// Attempt every entry via the injected deleter. Individual failures are
    /// recorded and never abort the run; duplicate cleanup is not
    /// all-or-nothing.
    pub fn execute(plan: &DeletionPlan, deleter: &dyn FileDeleter) -> DeletionReport {
        let mut outcomes = Vec::with_capacity(plan.entries.len());

        for image in &plan.entries {
            let status = match deleter.delete(image.path()) {
                Ok(()) => DeletionStatus::Deleted,
                Err(error) if error.kind() == io::ErrorKind::NotFound => DeletionStatus::NotFound,
                Err(error) => {
                    log::warn!("failed to delete {}: {}", image.path().display(), error);
                    DeletionStatus::Failed(error.to_string())
                }
            };

            outcomes.push(DeletionOutcome {
                path: image.path().to_path_buf(),
                status,
            });
        }

        let report = DeletionReport { outcomes };
        log::info!(
            "deletion plan executed: {} deleted, {} missing, {} failed",
            report.deleted_count(),
            report.not_found_count(),
            report.failed_count()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::selection::LargestNewest;
    use std::sync::Mutex;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn image(name: &str, size_bytes: u64) -> ImageRef {
        ImageRef::with_metadata(name, size_bytes, SystemTime::UNIX_EPOCH)
    }

    fn group_with_selection(
        index: usize,
        names: &[&str],
    ) -> (DuplicateGroup, Selection) {
        let members: Vec<ImageRef> = names
            .iter()
            .enumerate()
            // Descending sizes, so keep_best retains the first member.
            .map(|(i, name)| image(name, 1000 - i as u64))
            .collect();
        let group = DuplicateGroup::new(index, members);
        let selection = Selection::keep_best(&group, &LargestNewest);
        (group, selection)
    }

    /// Fake deleter that records call order and fails on request.
    struct FakeDeleter {
        calls: Mutex<Vec<PathBuf>>,
        fail_on: Option<PathBuf>,
        missing: Option<PathBuf>,
    }

    impl FakeDeleter {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: None,
                missing: None,
            }
        }
    }

    impl FileDeleter for FakeDeleter {
        fn delete(&self, path: &Path) -> io::Result<()> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            if self.fail_on.as_deref() == Some(path) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "file is in use",
                ));
            }
            if self.missing.as_deref() == Some(path) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
            }
            Ok(())
        }
    }

    #[test]
    fn build_with_nothing_to_delete_reports_empty_plan() {
        let (group, _) = group_with_selection(0, &["a.jpg", "b.jpg"]);
        let selection = Selection::select_all(&group);

        let result = DeletionPlanner::build(&[group], &[selection]);
        assert_eq!(result.unwrap_err(), PlanError::EmptyPlan);
    }

    #[test]
    fn build_collects_one_entry_per_discarded_member() {
        let (group, selection) = group_with_selection(0, &["keep.jpg", "drop.jpg"]);

        let plan = DeletionPlanner::build(&[group], &[selection]).unwrap();
        assert_eq!(plan.total_count(), 1);
        assert_eq!(plan.entries()[0].path(), Path::new("drop.jpg"));
    }

    #[test]
    fn build_preserves_group_then_member_order() {
        let (g0, s0) = group_with_selection(0, &["a.jpg", "b.jpg", "c.jpg"]);
        let (g1, s1) = group_with_selection(1, &["d.jpg", "e.jpg"]);

        let plan = DeletionPlanner::build(&[g0, g1], &[s1, s0]).unwrap();
        let paths: Vec<&Path> = plan.entries().iter().map(|e| e.path()).collect();
        assert_eq!(
            paths,
            vec![Path::new("b.jpg"), Path::new("c.jpg"), Path::new("e.jpg")]
        );
    }

    #[test]
    fn groups_without_a_selection_are_fully_kept() {
        let (g0, s0) = group_with_selection(0, &["a.jpg", "b.jpg"]);
        let (g1, _) = group_with_selection(1, &["c.jpg", "d.jpg"]);

        let plan = DeletionPlanner::build(&[g0, g1], &[s0]).unwrap();
        assert_eq!(plan.total_count(), 1);
    }

    #[test]
    fn audit_text_lists_groups_markers_and_summary() {
        let (group, selection) = group_with_selection(0, &["keep.jpg", "drop.jpg"]);
        let plan = DeletionPlanner::build(&[group], &[selection]).unwrap();

        let text = plan.audit_text();
        assert!(text.contains("Group 1:"));
        assert!(text.contains("  [keep]   keep.jpg"));
        assert!(text.contains("  [delete] drop.jpg"));
        assert!(text.contains("Files marked for deletion (1):"));
        assert!(text.contains("  drop.jpg"));
    }

    #[test]
    fn written_audit_matches_the_in_memory_text() {
        let (group, selection) = group_with_selection(0, &["keep.jpg", "drop.jpg"]);
        let plan = DeletionPlanner::build(&[group], &[selection]).unwrap();

        let temp_dir = TempDir::new().unwrap();
        let audit_path = temp_dir.path().join("duplicates.txt");
        let written = plan.write_audit(&audit_path).unwrap();

        assert_eq!(written, audit_path);
        assert_eq!(std::fs::read_to_string(&audit_path).unwrap(), plan.audit_text());
    }

    #[test]
    fn execute_continues_past_individual_failures() {
        let (group, selection) =
            group_with_selection(0, &["keep.jpg", "one.jpg", "two.jpg", "three.jpg"]);
        let plan = DeletionPlanner::build(&[group], &[selection]).unwrap();

        let mut deleter = FakeDeleter::new();
        deleter.fail_on = Some(PathBuf::from("two.jpg"));

        let report = DeletionPlanner::execute(&plan, &deleter);
        assert_eq!(report.deleted_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.not_found_count(), 0);

        // The entry ordered after the failing one was still attempted.
        let calls = deleter.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                PathBuf::from("one.jpg"),
                PathBuf::from("two.jpg"),
                PathBuf::from("three.jpg")
            ]
        );
    }

    #[test]
    fn already_missing_files_are_not_errors() {
        let (group, selection) = group_with_selection(0, &["keep.jpg", "gone.jpg"]);
        let plan = DeletionPlanner::build(&[group], &[selection]).unwrap();

        let mut deleter = FakeDeleter::new();
        deleter.missing = Some(PathBuf::from("gone.jpg"));

        let report = DeletionPlanner::execute(&plan, &deleter);
        assert_eq!(report.not_found_count(), 1);
        assert_eq!(report.deleted_count(), 0);
        assert_eq!(report.failed_count(), 0);
    }

    #[test]
    fn report_round_trips_through_json() {
        let (group, selection) = group_with_selection(0, &["keep.jpg", "drop.jpg"]);
        let plan = DeletionPlanner::build(&[group], &[selection]).unwrap();
        let report = DeletionPlanner::execute(&plan, &FakeDeleter::new());

        let json = serde_json::to_string(&report).unwrap();
        let back: DeletionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
