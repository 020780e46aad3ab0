extern crate std;

use std::{ops::Range, prelude::v1::*};

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

fn insert_find_all(keys: &[i32]) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }
}

fn tree_of(keys: impl IntoIterator<Item = i32>) -> AvlTree<TestNode> {
    let mut tree = AvlTree::new();

    for key in keys {
        tree.insert(TestNode::new(key));
    }

    tree.assert_invariants();
    tree
}

fn root_key(tree: &AvlTree<TestNode>) -> Option<i32> {
    tree.root.map(|root| unsafe { root.as_ref().key })
}

fn key_of(node: Option<Pin<&TestNode>>) -> Option<i32> {
    node.map(|node| node.key)
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn four_elems_find() {
    insert_find_all(&[0, 1, 2, 3]);
    insert_find_all(&[0, 1, 3, 2]);
    insert_find_all(&[0, 2, 1, 3]);
    insert_find_all(&[0, 2, 3, 1]);
    insert_find_all(&[0, 3, 1, 2]);
    insert_find_all(&[0, 3, 2, 1]);

    insert_find_all(&[1, 0, 2, 3]);
    insert_find_all(&[1, 0, 3, 2]);
    insert_find_all(&[1, 2, 0, 3]);
    insert_find_all(&[1, 2, 3, 0]);
    insert_find_all(&[1, 3, 0, 2]);
    insert_find_all(&[1, 3, 2, 0]);

    insert_find_all(&[2, 0, 1, 3]);
    insert_find_all(&[2, 0, 3, 1]);
    insert_find_all(&[2, 1, 0, 3]);
    insert_find_all(&[2, 1, 3, 0]);
    insert_find_all(&[2, 3, 0, 1]);
    insert_find_all(&[2, 3, 1, 0]);

    insert_find_all(&[3, 0, 1, 2]);
    insert_find_all(&[3, 0, 2, 1]);
    insert_find_all(&[3, 1, 0, 2]);
    insert_find_all(&[3, 1, 2, 0]);
    insert_find_all(&[3, 2, 0, 1]);
    insert_find_all(&[3, 2, 1, 0]);
}

#[test]
fn single_rotations() {
    // Right-right: left rotation at the root.
    let tree = tree_of([1, 2, 3]);
    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(tree.height(), 2);

    // Left-left: right rotation at the root.
    let tree = tree_of([3, 2, 1]);
    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(tree.height(), 2);
}

#[test]
fn double_rotations() {
    // Left-right.
    let tree = tree_of([3, 1, 2]);
    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(tree.height(), 2);

    // Right-left.
    let tree = tree_of([1, 3, 2]);
    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(tree.height(), 2);
}

#[test]
fn rotation_below_the_root() {
    // 4 and 5 unbalance 3, which sits below the root 2.
    let tree = tree_of([2, 1, 3, 4, 5]);
    assert_eq!(root_key(&tree), Some(2));

    let right = unsafe { tree.links(tree.root.unwrap()).right().unwrap() };
    assert_eq!(unsafe { right.as_ref().key }, 4);
    assert_eq!(tree.height(), 3);
}

#[test]
fn sequential_inserts_stay_balanced() {
    let n = 1 << 12;
    let tree = tree_of(0..n);

    assert_eq!(tree.len(), n as usize);
    // 2^12 nodes need height 13, and sequential inserts never exceed the minimum.
    assert!(tree.height() <= 13, "height {}", tree.height());
    assert!(tree.iter().map(|node| node.key).eq(0..n));
}

#[test]
fn duplicate_insert_hands_item_back() {
    let mut tree = tree_of([5, 3, 8]);

    let rejected = tree.insert(TestNode::new(3)).expect("duplicate accepted");
    assert_eq!(rejected.key, 3);
    assert!(!rejected.links.is_linked());
    assert_eq!(tree.len(), 3);
    tree.assert_invariants();

    assert!(tree.insert(TestNode::new(4)).is_none());
    assert_eq!(tree.len(), 4);
}

#[test]
fn entry_api() {
    let mut tree = tree_of([10, 20]);

    match tree.entry(&10) {
        Entry::Occupied(occupied) => assert_eq!(occupied.get().key, 10),
        Entry::Vacant(_) => panic!("10 should be occupied"),
    }

    match tree.entry(&15) {
        Entry::Occupied(_) => panic!("15 should be vacant"),
        Entry::Vacant(vacant) => {
            assert_eq!(vacant.key(), &15);
            let node = unsafe { vacant.insert(TestNode::new(15)) };
            assert_eq!(node.key, 15);
        }
    }

    assert!(!tree.entry(&15).is_vacant());
    assert_eq!(tree.len(), 3);
    tree.assert_invariants();

    let mut empty: AvlTree<TestNode> = AvlTree::new();
    assert!(empty.entry(&1).is_vacant());
}

// Keys 0..100, except 50.
fn sparse_tree() -> AvlTree<TestNode> {
    tree_of((0..100).filter(|&key| key != 50))
}

#[test]
fn sparse_search() {
    let tree = sparse_tree();

    assert_eq!(tree.len(), 99);
    assert!(tree.get(&100).is_none());
    assert_eq!(key_of(tree.get(&99)), Some(99));
}

#[test]
fn sparse_navigation() {
    let tree = sparse_tree();

    assert_eq!(key_of(tree.first()), Some(0));
    assert_eq!(key_of(tree.last()), Some(99));

    let mut cursor = tree.cursor_at(&43);
    assert_eq!(cursor.peek_next().map(|n| n.key), Some(44));
    assert_eq!(cursor.peek_prev().map(|n| n.key), Some(42));

    cursor.move_next();
    cursor.move_prev();
    assert_eq!(cursor.get().map(|n| n.key), Some(43));

    // Successor of the maximum and predecessor of the minimum are the ghost.
    let mut last = tree.cursor_last();
    last.move_next();
    assert!(last.get().is_none());

    let mut first = tree.cursor_first();
    first.move_prev();
    assert!(first.get().is_none());

    // The ghost links the last element back to the first.
    first.move_prev();
    assert_eq!(first.get().map(|n| n.key), Some(99));
}

#[test]
fn sparse_bounds() {
    let tree = sparse_tree();

    assert_eq!(key_of(tree.lower_bound(&101)), Some(99));
    assert!(tree.upper_bound(&101).is_none());

    assert_eq!(key_of(tree.upper_bound(&-1)), Some(0));
    assert!(tree.lower_bound(&-1).is_none());

    assert_eq!(key_of(tree.upper_bound(&50)), Some(51));
    assert_eq!(key_of(tree.lower_bound(&50)), Some(49));
}

#[test]
fn sparse_range_queries() {
    let tree = sparse_tree();

    assert_eq!(tree.range_count(&0, &99), 99);
    assert_eq!(tree.range_count(&-1, &100), 99);
    assert_eq!(tree.range_count(&-1, &10), 11);
    assert_eq!(tree.range_count(&89, &100), 11);

    assert_eq!(tree.range_count(&50, &50), 0);
    assert_eq!(tree.range_count(&7, &7), 1);
    assert_eq!(tree.range_count(&60, &40), 0);
}

#[test]
fn range_count_agrees_with_walk() {
    let tree = tree_of((0..200).map(|key| key * 3));

    for low in -5..605 {
        for high in [low - 1, low, low + 1, low + 7, low + 100, 700] {
            assert_eq!(
                tree.range_count(&low, &high),
                tree.range_count_by_walk(&low, &high),
                "[{low}, {high}]"
            );
        }
    }
}

#[test]
fn walk_stops_at_the_right_fence() {
    let tree = tree_of([4, 7, 9, 12]);

    assert_eq!(tree.range_count_by_walk(&7, &7), 1);
    assert_eq!(tree.range_count_by_walk(&5, &8), 1);
    assert_eq!(tree.range_count_by_walk(&8, &8), 0);
    assert_eq!(tree.range_count_by_walk(&4, &12), 4);
    assert_eq!(tree.range_count_by_walk(&0, &100), 4);
    assert_eq!(tree.range_count_by_walk(&12, &4), 0);
}

#[test]
fn empty_tree_queries() {
    let tree: AvlTree<TestNode> = AvlTree::new();

    assert!(tree.is_empty());
    assert_eq!(tree.height(), 0);
    assert!(tree.first().is_none());
    assert!(tree.last().is_none());
    assert!(tree.upper_bound(&0).is_none());
    assert!(tree.lower_bound(&0).is_none());
    assert_eq!(tree.rank(&0), 0);
    assert!(tree.get_by_rank(0).is_none());
    assert_eq!(tree.range_count(&i32::MIN, &i32::MAX), 0);
    assert!(tree.iter().next().is_none());
    assert!(tree.cursor_first().get().is_none());
}

#[test]
fn rank_and_select_are_inverse() {
    let tree = tree_of([40, 10, 30, 20, 50]);

    for (index, node) in tree.iter().enumerate() {
        assert_eq!(tree.rank(&node.key), index + 1);
        assert_eq!(key_of(tree.get_by_rank(index)), Some(node.key));
    }

    assert_eq!(tree.rank(&25), 2);
    assert!(tree.get_by_rank(5).is_none());
}

#[test]
fn iter_is_double_ended() {
    let tree = tree_of([4, 2, 6, 1, 3, 5, 7]);

    let forward: Vec<i32> = tree.iter().map(|n| n.key).collect();
    let backward: Vec<i32> = tree.iter().rev().map(|n| n.key).collect();
    assert_eq!(forward, [1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(backward, [7, 6, 5, 4, 3, 2, 1]);

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 7);
    assert_eq!(iter.next().map(|n| n.key), Some(1));
    assert_eq!(iter.next_back().map(|n| n.key), Some(7));
    assert_eq!(iter.len(), 5);

    // Both ends meet in the middle without yielding anything twice.
    let rest: Vec<i32> = iter.by_ref().map(|n| n.key).collect();
    assert_eq!(rest, [2, 3, 4, 5, 6]);
    assert!(iter.next().is_none());
    assert!(iter.next_back().is_none());
}

#[test]
fn clear_releases_everything() {
    let mut tree = sparse_tree();
    tree.clear();

    assert!(tree.is_empty());
    tree.assert_invariants();

    tree.insert(TestNode::new(1));
    tree.insert(TestNode::new(2));
    assert_eq!(tree.len(), 2);
    tree.assert_invariants();
}

#[test]
fn debug_lists_keys() {
    let tree = tree_of([3, 1, 2]);
    assert_eq!(format!("{tree:?}"), "{1, 2, 3}");
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        values in proptest::collection::vec(-500i32..500, 0..200),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(values, ops);
    }

    #[test]
    fn range_count_matches_filter(
        keys in proptest::collection::vec(-100i32..100, 0..100),
        low in -120i32..120,
        high in -120i32..120,
    ) {
        let tree = tree_of(keys.iter().copied());
        let expected = tree.iter().filter(|n| low <= n.key && n.key <= high).count();

        prop_assert_eq!(tree.range_count(&low, &high), expected);
    }
}
