use core::{borrow::Borrow, marker::PhantomData, pin::Pin, ptr::NonNull};

use crate::{AvlTree, Dir, Links, TreeNode};

/// A view into a single entry in an [`AvlTree`], which may be either vacant or occupied.
pub enum Entry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    Vacant(VacantEntry<'tree, 'key, T, Q>),
    Occupied(OccupiedEntry<'tree, T>),
}

impl<'tree, 'key, T, Q> Entry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    pub(crate) unsafe fn vacant_root(tree: &'tree mut AvlTree<T>, key: &'key Q) -> Self {
        Entry::Vacant(VacantEntry {
            tree,
            key,
            insert_as: InsertAs::Root,
        })
    }

    pub(crate) unsafe fn vacant_child(
        tree: &'tree mut AvlTree<T>,
        key: &'key Q,
        parent: NonNull<T>,
        dir: Dir,
    ) -> Self {
        Entry::Vacant(VacantEntry {
            tree,
            key,
            insert_as: InsertAs::Child { parent, dir },
        })
    }

    pub(crate) unsafe fn occupied(_tree: &'tree mut AvlTree<T>, node: NonNull<T>) -> Self {
        Entry::Occupied(OccupiedEntry {
            node,
            phantom: PhantomData,
        })
    }

    /// Returns `true` if no item in the tree corresponds to the entry's key.
    pub fn is_vacant(&self) -> bool {
        matches!(self, Entry::Vacant(_))
    }
}

pub(crate) enum InsertAs<T: ?Sized> {
    Root,
    Child { parent: NonNull<T>, dir: Dir },
}

pub struct VacantEntry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    pub(crate) tree: &'tree mut AvlTree<T>,
    pub(crate) key: &'key Q,
    pub(crate) insert_as: InsertAs<T>,
}

impl<'tree, 'key, T, Q> VacantEntry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    /// Returns the key that was used to look up this entry.
    pub fn key(&self) -> &'key Q {
        self.key
    }

    /// Inserts `item` at the key associated with this entry, rebalancing the tree.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the key returned by `item.key()` is equal to the key used to
    /// retrieve this entry.
    pub unsafe fn insert(self, item: T::Handle) -> Pin<&'tree mut T> {
        unsafe { self.insert_ptr(T::into_ptr(item)) }
    }

    pub(crate) unsafe fn insert_ptr(self, mut ptr: NonNull<T>) -> Pin<&'tree mut T> {
        unsafe {
            debug_assert!(
                {
                    let key: &Q = ptr.as_ref().key().borrow();
                    key == self.key
                },
                "item key does not match entry key"
            );

            match self.insert_as {
                InsertAs::Root => self.tree.insert_as_root(ptr),
                InsertAs::Child { parent, dir } => self.tree.insert_as_child(parent, dir, ptr),
            }

            Pin::new_unchecked(ptr.as_mut())
        }
    }
}

/// An entry whose key is already present in the tree.
///
/// The tree is insert-only, so an occupied entry can only be inspected.
pub struct OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) node: NonNull<T>,
    phantom: PhantomData<&'tree mut AvlTree<T>>,
}

impl<'tree, T> OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a reference to the item in the entry.
    pub fn get(&self) -> Pin<&T> {
        unsafe { Pin::new_unchecked(self.node.as_ref()) }
    }

    /// Converts the entry into a reference to its item that lives as long as the tree borrow.
    pub fn into_ref(self) -> Pin<&'tree T> {
        // SAFETY: the tree is mutably borrowed for `'tree`, so no other access can unlink the node.
        unsafe { Pin::new_unchecked(self.node.as_ref()) }
    }
}
