extern crate alloc;

use alloc::boxed::Box;
use core::{borrow::Borrow, fmt, iter::FusedIterator, marker::PhantomPinned, ptr::NonNull};

use cordyceps::Linked;

use crate::{AvlTree, Iter, Links, TreeNode};

/// An ordered set based on an [AVL tree] augmented with subtree sizes.
///
/// Besides the usual ordered-set operations, the set answers rank and interval counting queries in
/// _O(log(n))_ time. Keys can only be added; clearing the set is the only way to remove them.
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlSet<K: Ord + fmt::Debug> {
    tree: AvlTree<SetNode<K>>,
}

struct SetNode<K> {
    links: Links<SetNode<K>>,
    key: K,
    _unpin: PhantomPinned,
}

impl<K> SetNode<K> {
    fn new(key: K) -> Box<SetNode<K>> {
        Box::new(SetNode {
            links: Links::new(),
            key,
            _unpin: PhantomPinned,
        })
    }
}

unsafe impl<K> Linked<Links<SetNode<K>>> for SetNode<K> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<SetNode<K>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord + fmt::Debug> TreeNode<Links<SetNode<K>>> for SetNode<K> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

impl<K: Ord + fmt::Debug> AvlSet<K> {
    /// Creates a new, empty `AvlSet`.
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::new(),
        }
    }

    /// Returns `true` if the set contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the set.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the underlying tree.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Adds a key to the set.
    ///
    /// Returns `false` and leaves the set unchanged if the key was already present.
    pub fn insert(&mut self, key: K) -> bool {
        self.tree.insert(SetNode::new(key)).is_none()
    }

    /// Returns `true` if the set contains `key`.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the element equal to `key`, if any.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|node| &node.get_ref().key)
    }

    /// Returns the minimum element of the set.
    #[inline]
    pub fn first(&self) -> Option<&K> {
        self.tree.first().map(|node| &node.get_ref().key)
    }

    /// Returns the maximum element of the set.
    #[inline]
    pub fn last(&self) -> Option<&K> {
        self.tree.last().map(|node| &node.get_ref().key)
    }

    /// Returns the least element strictly greater than `key`.
    pub fn successor<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.tree.cursor_upper_bound(key);

        if cursor.get().is_some_and(|node| {
            let found: &Q = node.key.borrow();
            found == key
        }) {
            cursor.move_next();
        }

        cursor.get().map(|node| &node.key)
    }

    /// Returns the greatest element strictly less than `key`.
    pub fn predecessor<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.tree.cursor_lower_bound(key);

        if cursor.get().is_some_and(|node| {
            let found: &Q = node.key.borrow();
            found == key
        }) {
            cursor.move_prev();
        }

        cursor.get().map(|node| &node.key)
    }

    /// Returns `key` if present, otherwise the least element greater than `key`.
    ///
    /// See [`AvlTree::upper_bound`].
    #[inline]
    pub fn upper_bound<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.upper_bound(key).map(|node| &node.get_ref().key)
    }

    /// Returns `key` if present, otherwise the greatest element less than `key`.
    ///
    /// See [`AvlTree::lower_bound`].
    #[inline]
    pub fn lower_bound<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.lower_bound(key).map(|node| &node.get_ref().key)
    }

    /// Returns the number of elements less than or equal to `key`.
    #[inline]
    pub fn rank<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.rank(key)
    }

    /// Returns the element at zero-based position `index` in sorted order.
    #[inline]
    pub fn get_by_rank(&self, index: usize) -> Option<&K> {
        self.tree.get_by_rank(index).map(|node| &node.get_ref().key)
    }

    /// Returns the number of elements in the closed interval `[low, high]`, or 0 if `low > high`.
    #[inline]
    pub fn range_count<Q>(&self, low: &Q, high: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.range_count(low, high)
    }

    /// Counts the elements in `[low, high]` by walking them. Agrees with
    /// [`range_count`](Self::range_count).
    #[inline]
    pub fn range_count_by_walk<Q>(&self, low: &Q, high: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.range_count_by_walk(low, high)
    }

    /// Returns an iterator over the elements of the set, in ascending order.
    pub fn iter(&self) -> SetIter<'_, K> {
        SetIter {
            inner: self.tree.iter(),
        }
    }

    /// Clears the set, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }
}

impl<K: Ord + fmt::Debug + fmt::Display> AvlSet<K> {
    /// Writes the shape of the underlying tree as a Graphviz digraph.
    ///
    /// See [`AvlTree::dotgraph`].
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, w: W) -> fmt::Result {
        self.tree.dotgraph(name, w)
    }
}

/// An iterator over the elements of an [`AvlSet`].
pub struct SetIter<'a, K: Ord + fmt::Debug> {
    inner: Iter<'a, SetNode<K>>,
}

impl<'a, K: Ord + fmt::Debug> Iterator for SetIter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| &node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord + fmt::Debug> DoubleEndedIterator for SetIter<'_, K> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|node| &node.key)
    }
}

impl<K: Ord + fmt::Debug> ExactSizeIterator for SetIter<'_, K> {}

impl<K: Ord + fmt::Debug> FusedIterator for SetIter<'_, K> {}

impl<K: Ord + fmt::Debug> Clone for SetIter<'_, K> {
    fn clone(&self) -> Self {
        SetIter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K: Ord + fmt::Debug> IntoIterator for &'a AvlSet<K> {
    type Item = &'a K;
    type IntoIter = SetIter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Ord + fmt::Debug> Default for AvlSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug + Clone> Clone for AvlSet<K> {
    /// Builds a new set by re-inserting every key. The shape of the copy may differ from the
    /// source; its contents do not.
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl<K: Ord + fmt::Debug> PartialEq for AvlSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Ord + fmt::Debug> Eq for AvlSet<K> {}

impl<K: Ord + fmt::Debug> fmt::Debug for AvlSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Ord + fmt::Debug> Extend<K> for AvlSet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord + fmt::Debug> FromIterator<K> for AvlSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = AvlSet::new();
        set.extend(iter);
        set
    }
}

impl<K: Ord + fmt::Debug, const N: usize> From<[K; N]> for AvlSet<K> {
    fn from(keys: [K; N]) -> Self {
        keys.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::mem;

    use super::AvlSet;

    // Keys 0..100, except 50.
    fn sparse_set() -> AvlSet<i32> {
        (0..100).filter(|&key| key != 50).collect()
    }

    #[test]
    fn search() {
        let set = sparse_set();

        assert_eq!(set.len(), 99);
        assert_eq!(set.get(&100), None);
        assert_eq!(set.get(&99), Some(&99));
        assert!(!set.contains(&50));
        set.assert_invariants();
    }

    #[test]
    fn special_nodes() {
        let set = sparse_set();

        assert_eq!(set.first(), Some(&0));
        assert_eq!(set.last(), Some(&99));
        assert_eq!(set.successor(&43), Some(&44));
        assert_eq!(set.predecessor(&43), Some(&42));
        assert_eq!(set.successor(&49), Some(&51));
        assert_eq!(set.predecessor(&51), Some(&49));
        assert_eq!(set.successor(&99), None);
        assert_eq!(set.predecessor(&0), None);
    }

    #[test]
    fn bounds() {
        let set = sparse_set();

        assert_eq!(set.lower_bound(&101), Some(&99));
        assert_eq!(set.upper_bound(&101), None);

        assert_eq!(set.upper_bound(&-1), Some(&0));
        assert_eq!(set.lower_bound(&-1), None);

        assert_eq!(set.upper_bound(&50), Some(&51));
        assert_eq!(set.lower_bound(&50), Some(&49));

        assert_eq!(set.upper_bound(&43), Some(&43));
        assert_eq!(set.lower_bound(&43), Some(&43));
    }

    #[test]
    fn range_queries() {
        let set = sparse_set();

        for (low, high, expected) in [(0, 99, 99), (-1, 100, 99), (-1, 10, 11), (89, 100, 11)] {
            assert_eq!(set.range_count(&low, &high), expected, "[{low}, {high}]");
            assert_eq!(set.range_count_by_walk(&low, &high), expected, "[{low}, {high}]");
        }

        assert_eq!(set.range_count(&50, &50), 0);
        assert_eq!(set.range_count(&49, &51), 2);
        assert_eq!(set.range_count(&100, &200), 0);
        assert_eq!(set.range_count(&-10, &-1), 0);
        assert_eq!(set.range_count(&10, &5), 0);
        assert_eq!(set.range_count_by_walk(&10, &5), 0);
    }

    #[test]
    fn rank_and_select() {
        let set = sparse_set();

        assert_eq!(set.rank(&-1), 0);
        assert_eq!(set.rank(&0), 1);
        assert_eq!(set.rank(&49), 50);
        assert_eq!(set.rank(&50), 50);
        assert_eq!(set.rank(&51), 51);
        assert_eq!(set.rank(&1000), 99);

        assert_eq!(set.get_by_rank(0), Some(&0));
        assert_eq!(set.get_by_rank(49), Some(&49));
        assert_eq!(set.get_by_rank(50), Some(&51));
        assert_eq!(set.get_by_rank(98), Some(&99));
        assert_eq!(set.get_by_rank(99), None);
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut set = sparse_set();

        assert!(!set.insert(43));
        assert_eq!(set.len(), 99);
        assert!(set.insert(50));
        assert!(!set.insert(50));
        assert_eq!(set.len(), 100);
        set.assert_invariants();
    }

    #[test]
    fn iteration_both_ways() {
        let set = AvlSet::from([5, 3, 9, 1, 7]);

        assert_eq!(set.iter().copied().collect::<Vec<_>>(), [1, 3, 5, 7, 9]);
        assert_eq!(set.iter().rev().copied().collect::<Vec<_>>(), [9, 7, 5, 3, 1]);
        assert_eq!(set.iter().len(), 5);

        let mut iter = set.iter();
        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next_back(), Some(&9));
        let restarted = iter.clone();
        assert_eq!(iter.copied().collect::<Vec<_>>(), [3, 5, 7]);
        assert_eq!(restarted.copied().collect::<Vec<_>>(), [3, 5, 7]);
    }

    #[test]
    fn exhausted_iter_stays_exhausted() {
        fn assert_fused<I: core::iter::FusedIterator>(_: &I) {}

        let set = AvlSet::from([2, 1]);
        let mut iter = set.iter();
        assert_fused(&iter);

        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next_back(), Some(&2));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn copies_compare_equal() {
        let mut set = sparse_set();
        let copy = set.clone();
        let mut other = AvlSet::new();
        other.extend(13..34);

        assert_eq!(set, copy);
        assert_ne!(set, AvlSet::new());
        assert_ne!(set, other);
        copy.assert_invariants();

        let moved = mem::take(&mut set);
        assert!(set.is_empty());
        assert_eq!(moved, copy);

        drop(moved);
        assert_eq!(copy.len(), 99);
        assert_eq!(copy.range_count(&0, &99), 99);
    }

    #[test]
    fn clear_empties_the_set() {
        let mut set = sparse_set();
        set.clear();

        assert!(set.is_empty());
        assert_eq!(set.height(), 0);
        assert_eq!(set.first(), None);
        assert_eq!(set.range_count(&0, &99), 0);

        set.insert(1);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), [1]);
        set.assert_invariants();
    }

    #[test]
    fn debug_lists_keys() {
        let set = AvlSet::from([2, 1, 3]);
        assert_eq!(std::format!("{set:?}"), "{1, 2, 3}");
    }
}
