use crate::core::duplicate::DuplicateGroup;
use crate::core::image::ImageRef;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("group {group_index} must retain at least one image")]
    InvariantViolation { group_index: usize },

    #[error("image {id} is not a member of group {group_index}")]
    UnknownImage { id: String, group_index: usize },
}

/// Ranking strategy for picking the keeper of a duplicate group.
///
/// `Ordering::Greater` means `a` is preferred over `b`. Ties fall back to
/// group member order.
pub trait KeepPolicy {
    fn compare(&self, a: &ImageRef, b: &ImageRef) -> Ordering;
}

/// Default policy: largest file wins, newer modification time breaks ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestNewest;

impl KeepPolicy for LargestNewest {
    fn compare(&self, a: &ImageRef, b: &ImageRef) -> Ordering {
        a.size_bytes()
            .cmp(&b.size_bytes())
            .then_with(|| a.modified().cmp(&b.modified()))
    }
}

/// Keep/discard flags for the members of one duplicate group.
///
/// Every mutation keeps the invariant that at least one member stays marked
/// keep=true; a toggle that would break it is rejected and leaves the
/// selection untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    group_index: usize,
    entries: Vec<SelectionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SelectionEntry {
    image: ImageRef,
    keep: bool,
}

impl Selection {
    /// Mark every member of the group as kept.
    pub fn select_all(group: &DuplicateGroup) -> Self {
        Self {
            group_index: group.index(),
            entries: group
                .members()
                .iter()
                .map(|image| SelectionEntry {
                    image: image.clone(),
                    keep: true,
                })
                .collect(),
        }
    }

    /// Keep exactly the member the policy ranks highest; discard the rest.
    pub fn keep_best(group: &DuplicateGroup, policy: &dyn KeepPolicy) -> Self {
        let mut best = 0;
        for (index, candidate) in group.members().iter().enumerate().skip(1) {
            if policy.compare(candidate, &group.members()[best]) == Ordering::Greater {
                best = index;
            }
        }

        Self {
            group_index: group.index(),
            entries: group
                .members()
                .iter()
                .enumerate()
                .map(|(index, image)| SelectionEntry {
                    image: image.clone(),
                    keep: index == best,
                })
                .collect(),
        }
    }

    /// Set one member's keep flag, enforcing the at-least-one-keeper
    /// invariant. On failure the selection is unchanged.
    pub fn toggle(&mut self, image: &ImageRef, keep: bool) -> Result<(), SelectionError> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.image.id() == image.id())
            .ok_or_else(|| SelectionError::UnknownImage {
                id: image.id().to_string(),
                group_index: self.group_index,
            })?;

        let keepers_after =
            self.keep_count() - usize::from(self.entries[position].keep) + usize::from(keep);
        if keepers_after == 0 {
            return Err(SelectionError::InvariantViolation {
                group_index: self.group_index,
            });
        }

        self.entries[position].keep = keep;
        Ok(())
    }

    pub fn group_index(&self) -> usize {
        self.group_index
    }

    /// Keep flag for a member, or `None` if the image is not in the group.
    pub fn is_kept(&self, image: &ImageRef) -> Option<bool> {
        self.entries
            .iter()
            .find(|entry| entry.image.id() == image.id())
            .map(|entry| entry.keep)
    }

    pub fn keep_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.keep).count()
    }

    pub fn keepers(&self) -> impl Iterator<Item = &ImageRef> {
        self.entries
            .iter()
            .filter(|entry| entry.keep)
            .map(|entry| &entry.image)
    }

    /// Members flagged for deletion, in group member order.
    pub fn marked_for_deletion(&self) -> impl Iterator<Item = &ImageRef> {
        self.entries
            .iter()
            .filter(|entry| !entry.keep)
            .map(|entry| &entry.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn image(name: &str, size_bytes: u64, modified_offset_secs: u64) -> ImageRef {
        ImageRef::with_metadata(
            name,
            size_bytes,
            SystemTime::UNIX_EPOCH + Duration::from_secs(modified_offset_secs),
        )
    }

    fn group(members: Vec<ImageRef>) -> DuplicateGroup {
        DuplicateGroup::new(0, members)
    }

    #[test]
    fn select_all_keeps_every_member() {
        let g = group(vec![image("a.jpg", 100, 0), image("b.jpg", 200, 0)]);
        let selection = Selection::select_all(&g);

        assert_eq!(selection.keep_count(), 2);
        assert_eq!(selection.marked_for_deletion().count(), 0);
    }

    #[test]
    fn keep_best_prefers_the_larger_file() {
        let small = image("small.jpg", 50 * 1024, 10);
        let large = image("large.jpg", 100 * 1024, 0);
        let g = group(vec![small.clone(), large.clone()]);

        let selection = Selection::keep_best(&g, &LargestNewest);
        assert_eq!(selection.is_kept(&large), Some(true));
        assert_eq!(selection.is_kept(&small), Some(false));
        assert_eq!(selection.keep_count(), 1);
    }

    #[test]
    fn keep_best_breaks_size_ties_by_newer_mtime() {
        let older = image("older.jpg", 1024, 100);
        let newer = image("newer.jpg", 1024, 200);
        let g = group(vec![older.clone(), newer.clone()]);

        let selection = Selection::keep_best(&g, &LargestNewest);
        assert_eq!(selection.is_kept(&newer), Some(true));
        assert_eq!(selection.is_kept(&older), Some(false));
    }

    #[test]
    fn keep_best_full_tie_falls_back_to_member_order() {
        let first = image("first.jpg", 1024, 0);
        let second = image("second.jpg", 1024, 0);
        let g = group(vec![first.clone(), second.clone()]);

        let selection = Selection::keep_best(&g, &LargestNewest);
        assert_eq!(selection.is_kept(&first), Some(true));
    }

    #[test]
    fn toggle_rejects_removing_the_last_keeper() {
        let a = image("a.jpg", 100, 0);
        let b = image("b.jpg", 200, 0);
        let g = group(vec![a.clone(), b.clone()]);

        let mut selection = Selection::keep_best(&g, &LargestNewest);
        let before = selection.clone();

        let result = selection.toggle(&b, false);
        assert_eq!(
            result,
            Err(SelectionError::InvariantViolation { group_index: 0 })
        );
        assert_eq!(selection, before);
    }

    #[test]
    fn toggle_allows_swapping_the_keeper_in_two_steps() {
        let a = image("a.jpg", 100, 0);
        let b = image("b.jpg", 200, 0);
        let g = group(vec![a.clone(), b.clone()]);

        let mut selection = Selection::keep_best(&g, &LargestNewest);
        assert_eq!(selection.is_kept(&b), Some(true));

        selection.toggle(&a, true).unwrap();
        selection.toggle(&b, false).unwrap();
        assert_eq!(selection.is_kept(&a), Some(true));
        assert_eq!(selection.is_kept(&b), Some(false));
    }

    #[test]
    fn toggle_unknown_image_fails_without_changing_state() {
        let a = image("a.jpg", 100, 0);
        let b = image("b.jpg", 200, 0);
        let stranger = image("stranger.jpg", 300, 0);
        let g = group(vec![a, b]);

        let mut selection = Selection::select_all(&g);
        let before = selection.clone();

        let result = selection.toggle(&stranger, false);
        assert!(matches!(result, Err(SelectionError::UnknownImage { .. })));
        assert_eq!(selection, before);
    }

    #[test]
    fn redundant_toggle_is_a_no_op() {
        let a = image("a.jpg", 100, 0);
        let b = image("b.jpg", 200, 0);
        let g = group(vec![a.clone(), b]);

        let mut selection = Selection::select_all(&g);
        selection.toggle(&a, true).unwrap();
        assert_eq!(selection.keep_count(), 2);
    }

    #[test]
    fn policies_are_pluggable() {
        struct ShortestPath;
        impl KeepPolicy for ShortestPath {
            fn compare(&self, a: &ImageRef, b: &ImageRef) -> Ordering {
                // Shorter path preferred.
                b.path()
                    .as_os_str()
                    .len()
                    .cmp(&a.path().as_os_str().len())
            }
        }

        let long = image("a/very/deep/copy.jpg", 999, 0);
        let short = image("a.jpg", 1, 0);
        let g = group(vec![long.clone(), short.clone()]);

        let selection = Selection::keep_best(&g, &ShortestPath);
        assert_eq!(selection.is_kept(&short), Some(true));
        assert_eq!(selection.is_kept(&long), Some(false));
    }
}
