extern crate std;

use std::{boxed::Box, collections::BTreeSet, ptr::NonNull, vec::Vec};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{AvlTree, Links, TreeNode};

#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: i32,
}

impl TestNode {
    pub fn new(key: i32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = i32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(i32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in -1000i32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Get(ItemValue),
    First,
    Last,
    UpperBound(ItemValue),
    LowerBound(ItemValue),
    Rank(ItemValue),
    GetByRank(usize),
    RangeCount(ItemValue, ItemValue),
}

impl Op {
    fn finalize(self, sorted: &[i32]) -> FinalOp {
        // Indices pick existing keys, and their neighbors, so lookups hit as often as they miss.
        fn get_value(v: &[i32], i: ItemValue) -> i32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as i32
                    } else {
                        let key = v[idx % v.len()];
                        match idx % 3 {
                            0 => key,
                            1 => key.saturating_sub(1),
                            _ => key.saturating_add(1),
                        }
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(sorted, item)),
            Op::Get(item) => FinalOp::Get(get_value(sorted, item)),
            Op::First => FinalOp::First,
            Op::Last => FinalOp::Last,
            Op::UpperBound(item) => FinalOp::UpperBound(get_value(sorted, item)),
            Op::LowerBound(item) => FinalOp::LowerBound(get_value(sorted, item)),
            Op::Rank(item) => FinalOp::Rank(get_value(sorted, item)),
            Op::GetByRank(index) => FinalOp::GetByRank(index % (sorted.len() + 1)),
            Op::RangeCount(low, high) => {
                FinalOp::RangeCount(get_value(sorted, low), get_value(sorted, high))
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(i32),
    Get(i32),
    First,
    Last,
    UpperBound(i32),
    LowerBound(i32),
    Rank(i32),
    GetByRank(usize),
    RangeCount(i32, i32),
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        4 => value_strategy().prop_map(Op::Insert),
        1 => value_strategy().prop_map(Op::Get),
        1 => Just(Op::First),
        1 => Just(Op::Last),
        1 => value_strategy().prop_map(Op::UpperBound),
        1 => value_strategy().prop_map(Op::LowerBound),
        1 => value_strategy().prop_map(Op::Rank),
        1 => (0usize..1000).prop_map(Op::GetByRank),
        2 => (value_strategy(), value_strategy()).prop_map(|(low, high)| Op::RangeCount(low, high)),
    ]
}

pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut sorted_values = Vec::with_capacity(ops.len());
    let mut btree = BTreeSet::new();
    let mut avl: AvlTree<TestNode> = AvlTree::new();

    fn insert_sorted(v: &mut Vec<i32>, value: i32) {
        if let Err(idx) = v.binary_search(&value) {
            v.insert(idx, value);
        }
    }

    #[inline]
    #[allow(clippy::boxed_local)]
    fn node_key(node: Box<TestNode>) -> i32 {
        node.key
    }

    #[inline]
    fn ref_key(node: &TestNode) -> &i32 {
        &node.key
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted_values);

        match final_op {
            FinalOp::Insert(value) => {
                insert_sorted(&mut sorted_values, value);

                let from_btree = if btree.insert(value) {
                    None
                } else {
                    Some(value)
                };
                let from_avl = avl.insert(TestNode::new(value)).map(node_key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Get(value) => {
                let from_btree = btree.get(&value);
                let from_avl = avl.get(&value).map(|n| ref_key(n.get_ref()));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first();
                let from_avl = avl.first().map(|n| ref_key(n.get_ref()));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last();
                let from_avl = avl.last().map(|n| ref_key(n.get_ref()));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::UpperBound(value) => {
                let from_btree = btree.range(value..).next();
                let from_avl = avl.upper_bound(&value).map(|n| ref_key(n.get_ref()));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::LowerBound(value) => {
                let from_btree = btree.range(..=value).next_back();
                let from_avl = avl.lower_bound(&value).map(|n| ref_key(n.get_ref()));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Rank(value) => {
                let from_btree = btree.range(..=value).count();
                let from_avl = avl.rank(&value);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::GetByRank(index) => {
                let from_btree = btree.iter().nth(index);
                let from_avl = avl.get_by_rank(index).map(|n| ref_key(n.get_ref()));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::RangeCount(low, high) => {
                let from_btree = if low <= high {
                    btree.range(low..=high).count()
                } else {
                    0
                };
                let from_avl = avl.range_count(&low, &high);
                let by_walk = avl.range_count_by_walk(&low, &high);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(from_avl, by_walk, "FinalOp #{op_id}: {final_op:?}");
            }
        }

        avl.assert_invariants();
        assert_eq!(btree.len(), avl.len());
        assert!(btree.iter().eq(avl.iter().map(ref_key)));
        assert!(btree.iter().rev().eq(avl.iter().rev().map(ref_key)));
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum CursorOp {
    // Get is not an operation as it's executed on every loop iteration to check equivalence.
    MovePrev,
    MoveNext,
    PeekNext,
    PeekPrev,
    Seek(usize),
}

pub fn cursor_op_strategy() -> impl Strategy<Value = CursorOp> {
    proptest::prop_oneof![
        Just(CursorOp::MovePrev),
        Just(CursorOp::MoveNext),
        Just(CursorOp::PeekNext),
        Just(CursorOp::PeekPrev),
        (0usize..200).prop_map(CursorOp::Seek),
    ]
}

#[derive(Clone, Debug)]
pub struct CursorEquivalenceInput {
    pub values: Vec<i32>,
    pub ops: Vec<CursorOp>,
}

impl<'a> arbitrary::Arbitrary<'a> for CursorEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn value(u: &mut arbitrary::Unstructured<'_>) -> i32 {
            i32::arbitrary(u).unwrap_or(0)
        }

        fn op(u: &mut arbitrary::Unstructured<'_>) -> CursorOp {
            CursorOp::arbitrary(u).unwrap_or(CursorOp::MoveNext)
        }

        let num_values = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let values = core::iter::repeat_with(|| value(u))
            .take(num_values.into())
            .collect();

        let ops = core::iter::repeat_with(|| op(u))
            .take(num_ops.into())
            .collect();

        Ok(CursorEquivalenceInput { values, ops })
    }
}

pub fn run_cursor_equivalence(values: Vec<i32>, ops: Vec<CursorOp>) {
    let mut avl: AvlTree<TestNode> = AvlTree::new();

    // Insert in the given order so the tree shape depends on it, then compare against the sorted,
    // deduplicated values.
    for &val in &values {
        avl.insert(TestNode::new(val));
    }
    avl.assert_invariants();

    let mut vec = values;
    vec.sort_unstable();
    vec.dedup();

    fn vec_curs_prev(v: &[i32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_sub(1),
            None => v.len().checked_sub(1),
        }
    }

    fn vec_curs_next(v: &[i32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_add(1).filter(|&i| i < v.len()),
            None => (!v.is_empty()).then_some(0),
        }
    }

    let mut vec_curs = vec_curs_next(&vec, None);
    let mut avl_curs = avl.cursor_first();

    // Check that the initial states are equivalent.
    {
        let v = vec_curs.map(|i| &vec[i]);
        let w = avl_curs.get().map(TestNode::key);

        assert_eq!(v, w);
    }

    for op in ops {
        match op {
            CursorOp::MoveNext => {
                vec_curs = vec_curs_next(&vec, vec_curs);
                avl_curs.move_next();
            }

            CursorOp::MovePrev => {
                vec_curs = vec_curs_prev(&vec, vec_curs);
                avl_curs.move_prev();
            }

            CursorOp::PeekNext => {
                let v = vec_curs_next(&vec, vec_curs).map(|i| &vec[i]);
                let w = avl_curs.peek_next().map(TestNode::key);

                assert_eq!(v, w);
            }

            CursorOp::PeekPrev => {
                let v = vec_curs_prev(&vec, vec_curs).map(|i| &vec[i]);
                let w = avl_curs.peek_prev().map(TestNode::key);

                assert_eq!(v, w);
            }

            CursorOp::Seek(idx) => {
                // Seek to an existing key when the index is in range, otherwise to a missing one.
                let key = vec.get(idx).copied().unwrap_or(i32::MIN);
                vec_curs = vec.binary_search(&key).ok();
                avl_curs = avl.cursor_at(&key);
            }
        }

        let v = vec_curs.map(|i| &vec[i]);
        let w = avl_curs.get().map(TestNode::key);

        assert_eq!(v, w);

        // Stepping forward then back returns to the same element.
        if let Some(cur) = avl_curs.get() {
            let mut probe = avl_curs.clone();
            probe.move_next();
            probe.move_prev();
            assert_eq!(probe.get().map(TestNode::key), Some(&cur.key));
        }
    }
}
