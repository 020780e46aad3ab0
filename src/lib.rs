//! An intrusive AVL tree augmented with subtree sizes.
//!
//! Every node tracks its height, which keeps the tree balanced, and the number of nodes in its
//! subtree, which turns "how many keys are at most `k`" into a single root-to-leaf descent. Interval
//! counting queries are answered from two such descents in _O(log(n))_ time, without visiting the
//! keys inside the interval.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)` and its subtree size `s(x)`.
// - A missing node has `h = 0` and `s = 0`.
// - The balance factor of `x` is `h(left(x)) - h(right(x))`.
//
// The invariants of the tree are:
// 1. Every key in the left subtree of `x` is less than `key(x)`, every key in the right subtree is
//    greater.
// 2. Every node has a balance factor in `-1..=1`.
// 3. `h(x) = 1 + max(h(left(x)), h(right(x)))` and `s(x) = 1 + s(left(x)) + s(right(x))`.
// 4. The parent link of every non-root node points at the node holding it as a child. The root has
//    no parent.
//
// Corollary: a tree of height `h` holds at least `F(h + 2) - 1` nodes, where `F` is the Fibonacci
// sequence, so `h < 1.4405 * log2(n + 2)`.

use core::{
    borrow::Borrow, cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not,
    pin::Pin, ptr::NonNull,
};

use cordyceps::Linked;

mod cursor;
#[cfg(feature = "alloc")]
mod debug;
mod entry;
mod iter;
#[cfg(feature = "alloc")]
mod set;

#[cfg(feature = "std")]
pub mod command;
#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use cursor::Cursor;
pub use entry::{Entry, OccupiedEntry, VacantEntry};
pub use iter::Iter;
#[cfg(feature = "alloc")]
pub use set::{AvlSet, SetIter};

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree whose nodes also record the size of their subtree.
///
/// The tree never allocates. Items are linked in by [`insert`](AvlTree::insert), which takes
/// ownership of the item's handle, and are only released by [`clear`](AvlTree::clear) or when the
/// tree is dropped. There is no single-item removal.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    height: u8,
    size: usize,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree. An empty tree has height 0, a single element height 1.
    pub fn height(&self) -> usize {
        unsafe { self.height_of(self.root) as usize }
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let (height, size) = match self.root {
            Some(root) => unsafe {
                assert!(
                    self.links(root).parent().is_none(),
                    "root parent pointer must not be set"
                );
                self.assert_invariants_at(root)
            },
            None => (0, 0),
        };

        assert_eq!(size, self.len, "root subtree size disagrees with tree length");

        // A tree of height `h` holds at least `min_size(h)` nodes.
        let (mut min_size, mut prev_min_size) = (0usize, 0usize);
        for h in 0..height {
            let next = if h == 0 {
                1
            } else {
                1 + min_size + prev_min_size
            };
            (prev_min_size, min_size) = (min_size, next);
        }
        assert!(
            size >= min_size,
            "height {height} is too large for {size} elements"
        );

        // The local ordering checks above only compare parents and children.
        let mut prev: Option<&T::Key> = None;
        for node in self.iter() {
            if let Some(prev) = prev {
                assert!(prev < node.key(), "keys out of order: {prev:?} before {:?}", node.key());
            }
            prev = Some(node.key());
        }
    }

    // Checks the invariants of the subtree rooted at `node`, returning its height and size.
    unsafe fn assert_invariants_at(&self, node: NonNull<T>) -> (u8, usize) {
        unsafe {
            let links = self.links(node);
            let key = node.as_ref().key();

            let mut heights = [0u8; 2];
            let mut sizes = [0usize; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = links.child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = self
                        .links(child)
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent);

                    let expected = match dir {
                        Dir::Left => Ordering::Less,
                        Dir::Right => Ordering::Greater,
                    };
                    let child_key = child.as_ref().key();
                    assert_eq!(
                        child_key.cmp(key),
                        expected,
                        "{child_key:?} is on the wrong side of {key:?}"
                    );

                    let (height, size) = self.assert_invariants_at(child);
                    heights[dir as usize] = height;
                    sizes[dir as usize] = size;
                }
            }

            let [left_height, right_height] = heights;
            assert!(
                left_height.abs_diff(right_height) <= 1,
                "{key:?} is unbalanced: left height {left_height}, right height {right_height}"
            );

            let height = 1 + left_height.max(right_height);
            let size = 1 + sizes[0] + sizes[1];
            assert_eq!(links.height(), height, "stale height at {key:?}");
            assert_eq!(links.size(), size, "stale size at {key:?}");

            (height, size)
        }
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns `true` if the tree contains a node corresponding to `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = self.links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = self.links(cur).right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        let first = self.first_raw()?;
        unsafe { Some(Pin::new_unchecked(first.as_ref())) }
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        let last = self.last_raw()?;
        unsafe { Some(Pin::new_unchecked(last.as_ref())) }
    }

    fn first_raw(&self) -> Link<T> {
        self.root.map(|root| unsafe { self.min_in_subtree(root) })
    }

    fn last_raw(&self) -> Link<T> {
        self.root.map(|root| unsafe { self.max_in_subtree(root) })
    }

    /// Returns an iterator over the elements of the tree, in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Returns a cursor pointing at the minimum element, or at the "ghost" non-element if the tree
    /// is empty.
    pub fn cursor_first(&self) -> Cursor<'_, T> {
        Cursor::new(self, self.first_raw())
    }

    /// Returns a cursor pointing at the maximum element, or at the "ghost" non-element if the tree
    /// is empty.
    pub fn cursor_last(&self) -> Cursor<'_, T> {
        Cursor::new(self, self.last_raw())
    }

    /// Returns a cursor pointing at the element corresponding to `key`.
    ///
    /// If no such element exists, the cursor points at the "ghost" non-element.
    pub fn cursor_at<Q>(&self, key: &Q) -> Cursor<'_, T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, self.get_raw(key))
    }

    /// Returns a cursor pointing at the element returned by [`upper_bound`](Self::upper_bound).
    pub fn cursor_upper_bound<Q>(&self, key: &Q) -> Cursor<'_, T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, self.upper_bound_raw(key))
    }

    /// Returns a cursor pointing at the element returned by [`lower_bound`](Self::lower_bound).
    pub fn cursor_lower_bound<Q>(&self, key: &Q) -> Cursor<'_, T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, self.lower_bound_raw(key))
    }

    /// Returns the element corresponding to `key` if there is one, and otherwise the element
    /// with the least key greater than `key`.
    ///
    /// This is the left fence of the closed interval starting at `key`. Returns `None` if every
    /// key in the tree is less than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.upper_bound_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns the element corresponding to `key` if there is one, and otherwise the element
    /// with the greatest key less than `key`.
    ///
    /// This is the right fence of the closed interval ending at `key`. Returns `None` if every key
    /// in the tree is greater than `key`.
    pub fn lower_bound<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.lower_bound_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    fn upper_bound_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut fence = None;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => {
                        fence = Some(cur);
                        opt_cur = self.links(cur).left();
                    }
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = self.links(cur).right(),
                }
            }
        }

        fence
    }

    fn lower_bound_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut fence = None;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = self.links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => {
                        fence = Some(cur);
                        opt_cur = self.links(cur).right();
                    }
                }
            }
        }

        fence
    }

    /// Returns the number of elements whose key is less than or equal to `key`.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn rank<Q>(&self, key: &Q) -> usize
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut rank = 0;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                let links = self.links(cur);

                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = links.left(),
                    Ordering::Equal | Ordering::Greater => {
                        // `cur` and its whole left subtree are at most `key`.
                        rank += 1 + self.size_of(links.left());
                        opt_cur = links.right();
                    }
                }
            }
        }

        rank
    }

    /// Returns the element at zero-based position `index` in key order.
    ///
    /// Returns `None` if `index` is out of bounds. This operation completes in _O(log(n))_ time.
    pub fn get_by_rank(&self, mut index: usize) -> Option<Pin<&T>> {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                let links = self.links(cur);
                let left_size = self.size_of(links.left());

                match index.cmp(&left_size) {
                    Ordering::Less => opt_cur = links.left(),
                    Ordering::Equal => return Some(Pin::new_unchecked(cur.as_ref())),
                    Ordering::Greater => {
                        index -= left_size + 1;
                        opt_cur = links.right();
                    }
                }
            }
        }

        None
    }

    // Returns the fences of the closed interval `[low, high]`, or `None` if no key falls inside it.
    fn fences<Q>(&self, low: &Q, high: &Q) -> Option<(NonNull<T>, NonNull<T>)>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if low > high {
            return None;
        }

        let left = self.upper_bound_raw(low)?;
        let right = self.lower_bound_raw(high)?;

        // Both fences exist but sit on either side of a gap, e.g. `[5, 6]` in `{4, 7}`.
        if unsafe { left.as_ref().key() > right.as_ref().key() } {
            return None;
        }

        Some((left, right))
    }

    /// Returns the number of elements whose key lies in the closed interval `[low, high]`.
    ///
    /// Returns 0 if `low > high`. This operation completes in _O(log(n))_ time regardless of the
    /// number of elements counted.
    pub fn range_count<Q>(&self, low: &Q, high: &Q) -> usize
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some((left, right)) = self.fences(low, high) else {
            return 0;
        };

        unsafe {
            let left_key: &Q = left.as_ref().key().borrow();
            let right_key: &Q = right.as_ref().key().borrow();

            1 + self.rank(right_key) - self.rank(left_key)
        }
    }

    /// Counts the elements whose key lies in the closed interval `[low, high]` by stepping through
    /// them one at a time.
    ///
    /// Agrees with [`range_count`](Self::range_count), but completes in _O(log(n) + k)_ time, where
    /// `k` is the result.
    pub fn range_count_by_walk<Q>(&self, low: &Q, high: &Q) -> usize
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some((left, right)) = self.fences(low, high) else {
            return 0;
        };

        let mut count = 1;
        let mut cur = left;

        while !core::ptr::addr_eq(cur.as_ptr(), right.as_ptr()) {
            cur = unsafe { self.successor_raw(cur) }.expect("walked past the right fence");
            count += 1;
        }

        count
    }

    /// Returns the entry corresponding to `key`.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn entry<'key, Q>(&mut self, key: &'key Q) -> Entry<'_, 'key, T, Q>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return unsafe { Entry::vacant_root(self, key) };
        };

        // Descend the tree, looking for `key` or the empty slot where it belongs.
        loop {
            let dir = match key.cmp(unsafe { cur.as_ref().key().borrow() }) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return unsafe { Entry::occupied(self, cur) },
                Ordering::Greater => Dir::Right,
            };

            match unsafe { self.links(cur).child(dir) } {
                Some(child) => cur = child,
                None => return unsafe { Entry::vacant_child(self, key, cur, dir) },
            }
        }
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already contains an item with the same key, the tree is left unchanged and
    /// `item` is handed back. This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);
        let key = unsafe { ptr.as_ref().key() };

        match self.entry(key) {
            Entry::Occupied(_) => Some(unsafe { T::from_ptr(ptr) }),
            Entry::Vacant(vacant) => {
                unsafe { vacant.insert_ptr(ptr) };
                None
            }
        }
    }

    // Links `node` into an empty tree.
    pub(crate) unsafe fn insert_as_root(&mut self, node: NonNull<T>) {
        debug_assert!(self.root.is_none());

        unsafe { self.links_mut(node).init(None) };

        self.root = Some(node);
        self.len += 1;
    }

    // Links `node` into the empty `dir` slot of `parent`, then rebalances every ancestor.
    pub(crate) unsafe fn insert_as_child(&mut self, parent: NonNull<T>, dir: Dir, node: NonNull<T>) {
        unsafe {
            debug_assert!(self.links(parent).child(dir).is_none());

            self.links_mut(node).init(Some(parent));
            self.links_mut(parent).set_child(dir, Some(node));

            self.rebalance_from(parent);
        }

        self.len += 1;
    }

    // Walks from `node` up to the root, restoring the aggregates and the balance of each node.
    //
    // Every ancestor of an inserted node gains one element, so the walk never stops early.
    unsafe fn rebalance_from(&mut self, node: NonNull<T>) {
        let mut opt_cur = Some(node);

        while let Some(cur) = opt_cur {
            unsafe {
                let subtree = self.balance(cur);
                opt_cur = self.links(subtree).parent();
            }
        }
    }

    // Restores the AVL invariant at `node`, whose children are already balanced.
    //
    // Returns the root of the rebalanced subtree, which is already linked in `node`'s former place.
    unsafe fn balance(&mut self, node: NonNull<T>) -> NonNull<T> {
        unsafe {
            self.update(node);

            let factor = self.balance_factor(node);

            if factor > 1 {
                let left = self.links(node).left().expect("left-heavy node has a left child");

                if self.balance_factor(left) < 0 {
                    self.rotate_left(left);
                }

                self.rotate_right(node)
            } else if factor < -1 {
                let right = self
                    .links(node)
                    .right()
                    .expect("right-heavy node has a right child");

                if self.balance_factor(right) > 0 {
                    self.rotate_right(right);
                }

                self.rotate_left(node)
            } else {
                node
            }
        }
    }

    #[inline]
    unsafe fn rotate_left(&mut self, node: NonNull<T>) -> NonNull<T> {
        unsafe { self.rotate(node, Dir::Left) }
    }

    #[inline]
    unsafe fn rotate_right(&mut self, node: NonNull<T>) -> NonNull<T> {
        unsafe { self.rotate(node, Dir::Right) }
    }

    // Performs a rotation moving `node` down in direction `dir` and its `!dir` child (the pivot)
    // up into its place. Returns the pivot.
    //
    // The aggregates of `node` and the pivot are recomputed; those of their ancestors are not.
    unsafe fn rotate(&mut self, node: NonNull<T>, dir: Dir) -> NonNull<T> {
        unsafe {
            let pivot = self
                .links(node)
                .child(!dir)
                .expect("rotation requires a child to pivot on");

            log::trace!(
                "rotating {:?} {dir:?}, pivot {:?}",
                node.as_ref().key(),
                pivot.as_ref().key()
            );

            // `across` goes from the `dir` child of `pivot` to the `!dir` child of `node`.
            let across = self.links(pivot).child(dir);
            self.links_mut(node).set_child(!dir, across);
            self.maybe_set_parent(across, Some(node));

            // `node` becomes the `dir` child of `pivot`.
            self.links_mut(pivot).set_child(dir, Some(node));
            let parent = self.links_mut(node).set_parent(Some(pivot));
            self.links_mut(pivot).set_parent(parent);
            self.replace_child_or_set_root(parent, node, Some(pivot));

            // `node` is now below `pivot`, so it has to be updated first.
            self.update(node);
            self.update(pivot);

            pivot
        }
    }

    // Navigation =============================================================

    // Returns the minimum node in the subtree.
    #[inline]
    unsafe fn min_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        let mut cur = root;

        while let Some(left) = unsafe { self.links(cur).left() } {
            cur = left;
        }

        cur
    }

    // Returns the maximum node in the subtree.
    #[inline]
    unsafe fn max_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        let mut cur = root;

        while let Some(right) = unsafe { self.links(cur).right() } {
            cur = right;
        }

        cur
    }

    pub(crate) unsafe fn successor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe {
            if let Some(right) = self.links(node).right() {
                return Some(self.min_in_subtree(right));
            }

            // Ascend until arriving at a node from its left side.
            let mut cur = node;
            while let Some(parent) = self.links(cur).parent() {
                match self.which_child(parent, cur) {
                    Dir::Left => return Some(parent),
                    Dir::Right => cur = parent,
                }
            }

            None
        }
    }

    pub(crate) unsafe fn predecessor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe {
            if let Some(left) = self.links(node).left() {
                return Some(self.max_in_subtree(left));
            }

            // Ascend until arriving at a node from its right side.
            let mut cur = node;
            while let Some(parent) = self.links(cur).parent() {
                match self.which_child(parent, cur) {
                    Dir::Right => return Some(parent),
                    Dir::Left => cur = parent,
                }
            }

            None
        }
    }

    /// Clears the tree, dropping all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node. It has no left child.
                let cur = self.min_in_subtree(cur);
                let parent = self.links(cur).parent();
                let right = self.links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                self.links_mut(cur).unlink();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Support methods ========================================================

    #[inline]
    unsafe fn links<'a>(&self, node: NonNull<T>) -> &'a Links<T> {
        unsafe { T::links(node).as_ref() }
    }

    #[inline]
    unsafe fn links_mut<'a>(&mut self, node: NonNull<T>) -> &'a mut Links<T> {
        unsafe { T::links(node).as_mut() }
    }

    /// Returns the height of the pointed-to node.
    #[inline]
    unsafe fn height_of(&self, node: Link<T>) -> u8 {
        node.map(|n| unsafe { self.links(n).height() }).unwrap_or(0)
    }

    /// Returns the subtree size of the pointed-to node.
    #[inline]
    unsafe fn size_of(&self, node: Link<T>) -> usize {
        node.map(|n| unsafe { self.links(n).size() }).unwrap_or(0)
    }

    #[inline]
    unsafe fn balance_factor(&self, node: NonNull<T>) -> i16 {
        unsafe {
            let links = self.links(node);
            i16::from(self.height_of(links.left())) - i16::from(self.height_of(links.right()))
        }
    }

    // Recomputes the height and size of `node` from those of its children.
    #[inline]
    unsafe fn update(&mut self, node: NonNull<T>) {
        unsafe {
            let links = self.links(node);
            let (left, right) = (links.left(), links.right());

            let height = 1 + self.height_of(left).max(self.height_of(right));
            let size = 1 + self.size_of(left) + self.size_of(right);

            self.links_mut(node).set_aggregates(height, size);
        }
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { self.links_mut(node).set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    #[inline]
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Option<NonNull<T>>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert!(
                new_child.is_none() || self.links(parent).child(!dir) != new_child,
                "`new_child` must not be a child of `parent`"
            );

            self.links_mut(parent).set_child(dir, new_child);
        }
    }

    #[inline]
    unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        unsafe {
            if self.links(parent).left() == Some(child) {
                Dir::Left
            } else {
                debug_assert_eq!(
                    self.links(parent).right(),
                    Some(child),
                    "`child` must be a child of `parent`"
                );
                Dir::Right
            }
        }
    }
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> fmt::Debug for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|node| node.key()))
            .finish()
    }
}

impl<'tree, T> IntoIterator for &'tree AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 0,
                size: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    /// Returns `true` if the node is linked into a tree.
    pub fn is_linked(&self) -> bool {
        self.size() != 0
    }

    #[inline]
    fn height(&self) -> u8 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    fn size(&self) -> usize {
        unsafe { (*self.inner.get()).size }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_aggregates(&mut self, height: u8, size: usize) {
        let inner = self.inner.get_mut();
        inner.height = height;
        inner.size = size;
    }

    // Prepares the links of a node about to become a leaf below `parent`.
    fn init(&mut self, parent: Link<T>) {
        let inner = self.inner.get_mut();
        inner.parent = parent;
        inner.children = [None; 2];
        inner.height = 1;
        inner.size = 1;
    }

    fn unlink(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.height = 0;
        inner.size = 0;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("height", &self.height())
            .field("size", &self.size())
            .finish()
    }
}
