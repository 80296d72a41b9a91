//! Team membership reconciliation.
//!
//! Membership lists are unordered collections of opaque identifiers (user
//! emails, team UUIDs). Reconciling a remembered list against a desired list
//! yields the identifiers to add and to remove; comparison is by value, never
//! by position, and duplicates inside a list carry no meaning.

use std::collections::HashSet;
use std::hash::Hash;

/// The additions and removals that turn one membership list into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDelta<T> {
    /// Present in the desired list but not the current one.
    pub added: Vec<T>,
    /// Present in the current list but not the desired one.
    pub removed: Vec<T>,
}

impl<T> MembershipDelta<T> {
    /// Whether applying the delta would change nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// The additions, or `None` when there are none.
    ///
    /// The Management API reads an absent list as "no change".
    pub fn added_or_none(&self) -> Option<Vec<T>>
    where
        T: Clone,
    {
        (!self.added.is_empty()).then(|| self.added.clone())
    }

    /// The removals, or `None` when there are none.
    pub fn removed_or_none(&self) -> Option<Vec<T>>
    where
        T: Clone,
    {
        (!self.removed.is_empty()).then(|| self.removed.clone())
    }
}

/// Elements of `left` not present in `right`, in `left` order, deduplicated.
pub fn difference<T>(left: &[T], right: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let exclude: HashSet<&T> = right.iter().collect();
    let mut seen: HashSet<&T> = HashSet::new();
    left.iter()
        .filter(|item| !exclude.contains(item) && seen.insert(*item))
        .cloned()
        .collect()
}

/// Compute `added = desired − current` and `removed = current − desired`.
pub fn diff<T>(current: &[T], desired: &[T]) -> MembershipDelta<T>
where
    T: Eq + Hash + Clone,
{
    MembershipDelta {
        added: difference(desired, current),
        removed: difference(current, desired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn same_members<T: Eq + Hash>(a: &[T], b: &[T]) -> bool {
        a.iter().collect::<HashSet<_>>() == b.iter().collect::<HashSet<_>>()
    }

    fn s(items: &[&str]) -> Vec<String> {
        items.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_diff_basic() {
        let current = s(&["a@x.io", "b@x.io", "c@x.io"]);
        let desired = s(&["c@x.io", "d@x.io", "a@x.io"]);

        let delta = diff(&current, &desired);
        assert_eq!(delta.added, s(&["d@x.io"]));
        assert_eq!(delta.removed, s(&["b@x.io"]));
        assert!(!delta.is_empty());
    }

    #[test]
    fn test_diff_ignores_order() {
        let delta = diff(&s(&["a", "b", "c"]), &s(&["c", "b", "a"]));
        assert!(delta.is_empty());
        assert_eq!(delta.added_or_none(), None);
        assert_eq!(delta.removed_or_none(), None);
    }

    #[test]
    fn test_diff_from_and_to_empty() {
        let delta = diff(&[], &s(&["a", "b"]));
        assert_eq!(delta.added_or_none(), Some(s(&["a", "b"])));
        assert_eq!(delta.removed_or_none(), None);

        let delta = diff(&s(&["a", "b"]), &[]);
        assert_eq!(delta.added_or_none(), None);
        assert_eq!(delta.removed_or_none(), Some(s(&["a", "b"])));
    }

    #[test]
    fn test_diff_deduplicates() {
        let delta = diff(&s(&["a", "a"]), &s(&["b", "b", "a"]));
        assert_eq!(delta.added, s(&["b"]));
        assert!(delta.removed.is_empty());
    }

    /// Every list of length <= 3 over a four-letter alphabet.
    fn all_lists() -> Vec<Vec<String>> {
        let alphabet = ["a", "b", "c", "d"];
        let mut lists = vec![Vec::new()];
        for len in 1..=3u32 {
            for n in 0..alphabet.len().pow(len) {
                let mut n = n;
                let mut list = Vec::new();
                for _ in 0..len {
                    list.push(alphabet[n % alphabet.len()].to_string());
                    n /= alphabet.len();
                }
                lists.push(list);
            }
        }
        lists
    }

    #[test]
    fn test_diff_properties_exhaustive() {
        let lists = all_lists();
        for current in &lists {
            for desired in &lists {
                let delta = diff(current, desired);

                let added: HashSet<_> = delta.added.iter().collect();
                let removed: HashSet<_> = delta.removed.iter().collect();
                assert!(
                    added.is_disjoint(&removed),
                    "added and removed overlap for {:?} -> {:?}",
                    current,
                    desired
                );

                let mut applied: HashSet<&String> = current.iter().collect();
                applied.extend(delta.added.iter());
                for r in &delta.removed {
                    applied.remove(r);
                }
                let want: HashSet<&String> = desired.iter().collect();
                assert_eq!(applied, want, "{:?} -> {:?}", current, desired);

                assert_eq!(delta.is_empty(), same_members(current, desired));
            }
        }
    }
}
