extern crate alloc;

use alloc::{collections::VecDeque, string::String};
use core::{fmt, ptr::NonNull};

use crate::{AvlTree, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>>,
    T::Key: fmt::Display,
{
    /// Writes the shape of the tree to `w` as a Graphviz digraph.
    ///
    /// Each node is labelled with its key, height and subtree size. Nodes of equal depth share a
    /// rank, and missing children are drawn as points so left and right stay distinguishable.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T: TreeNode<Links<T>>> {
            Node(NonNull<T>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut edges = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            // Every item in the queue belongs to the same depth.
            let remaining = queue.len();
            let mut has_nodes = false;

            write!(w, "{{rank=same; ")?;

            for _ in 0..remaining {
                let Some(item) = queue.pop_front() else {
                    break;
                };

                let node = match item {
                    Item::Node(node) => node,
                    Item::Missing(id) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                };

                has_nodes = true;

                let key = unsafe { node.as_ref().key() };
                let links = unsafe { self.links(node) };
                write!(
                    w,
                    "\"graph{name}-{key}\" [label=\"{key} (h={}, n={})\"]; ",
                    links.height(),
                    links.size()
                )?;

                for child in [links.left(), links.right()] {
                    match child {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref().key() };

                            queue.push_back(Item::Node(child));
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";"
                            )?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;

            // Below the deepest nodes there are only missing children left.
            if !has_nodes {
                break;
            }
        }

        w.write_str(&edges)?;

        w.write_str(" }\n}")
    }
}
