/// Lazy, restartable traversals over a subtree of a [`Tree`].
///
/// Every traversal is scoped to the subtree rooted at the node it was
/// started from; it never walks out into that node's siblings or ancestors.
/// The iterators yield [`NodeId`]s rather than references, so callers can
/// collect a traversal and then mutate the nodes it visited.
///
/// Two flavours are offered:
///
/// - double-ended iterators ([`PreOrder`], [`PostOrder`], [`Leaves`],
///   [`Siblings`]) for `for` loops and adapters such as `.rev()`;
/// - single-step cursors (`next_pre_order`, `prev_leaf`, ...) that move from
///   any node inside a subtree without keeping iterator state around.
use super::tree::{NodeId, Tree};

impl<T> Tree<T> {
    // ── Cursors ─────────────────────────────────────────────────────

    /// Follow `first_child` links down to the deepest first descendant.
    fn leftmost_descendant(&self, mut id: NodeId) -> NodeId {
        while let Some(child) = self[id].first_child() {
            id = child;
        }
        id
    }

    /// Follow `last_child` links down to the deepest last descendant.
    fn rightmost_descendant(&self, mut id: NodeId) -> NodeId {
        while let Some(child) = self[id].last_child() {
            id = child;
        }
        id
    }

    /// Node visited after `id` in a pre-order walk of `scope`.
    pub fn next_pre_order(&self, scope: NodeId, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        if let Some(child) = node.first_child() {
            return Some(child);
        }
        let mut current = id;
        loop {
            if current == scope {
                return None;
            }
            let node = self.get(current)?;
            if let Some(sibling) = node.next_sibling() {
                return Some(sibling);
            }
            current = node.parent()?;
        }
    }

    /// Node visited before `id` in a pre-order walk of `scope`.
    pub fn prev_pre_order(&self, scope: NodeId, id: NodeId) -> Option<NodeId> {
        if id == scope {
            return None;
        }
        let node = self.get(id)?;
        match node.previous_sibling() {
            Some(sibling) => Some(self.rightmost_descendant(sibling)),
            None => node.parent(),
        }
    }

    /// Node visited after `id` in a post-order walk of `scope`.
    pub fn next_post_order(&self, scope: NodeId, id: NodeId) -> Option<NodeId> {
        if id == scope {
            return None;
        }
        let node = self.get(id)?;
        match node.next_sibling() {
            Some(sibling) => Some(self.leftmost_descendant(sibling)),
            None => node.parent(),
        }
    }

    /// Node visited before `id` in a post-order walk of `scope`.
    pub fn prev_post_order(&self, scope: NodeId, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        if let Some(child) = node.last_child() {
            return Some(child);
        }
        let mut current = id;
        loop {
            if current == scope {
                return None;
            }
            let node = self.get(current)?;
            if let Some(sibling) = node.previous_sibling() {
                return Some(sibling);
            }
            current = node.parent()?;
        }
    }

    /// Next childless node after `id` within `scope`.
    pub fn next_leaf(&self, scope: NodeId, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_post_order(scope, id)?;
        while self[current].has_children() {
            current = self.next_post_order(scope, current)?;
        }
        Some(current)
    }

    /// Previous childless node before `id` within `scope`.
    pub fn prev_leaf(&self, scope: NodeId, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_post_order(scope, id)?;
        while self[current].has_children() {
            current = self.prev_post_order(scope, current)?;
        }
        Some(current)
    }

    // ── Iterators ───────────────────────────────────────────────────

    /// Parent before children, children in sibling order.
    pub fn pre_order(&self, scope: NodeId) -> PreOrder<'_, T> {
        let live = self.contains(scope);
        PreOrder(Walk {
            tree: self,
            scope,
            front: live.then_some(scope),
            back: live.then(|| self.rightmost_descendant(scope)),
        })
    }

    /// Children before parent; the scope node comes last.
    pub fn post_order(&self, scope: NodeId) -> PostOrder<'_, T> {
        let live = self.contains(scope);
        PostOrder(Walk {
            tree: self,
            scope,
            front: live.then(|| self.leftmost_descendant(scope)),
            back: live.then_some(scope),
        })
    }

    /// Childless nodes of the subtree, left to right.
    ///
    /// A childless scope yields itself.
    pub fn leaves(&self, scope: NodeId) -> Leaves<'_, T> {
        let live = self.contains(scope);
        Leaves(Walk {
            tree: self,
            scope,
            front: live.then(|| self.leftmost_descendant(scope)),
            back: live.then(|| self.rightmost_descendant(scope)),
        })
    }

    /// Direct children of `parent`, in order.
    pub fn siblings(&self, parent: NodeId) -> Siblings<'_, T> {
        let node = self.get(parent);
        Siblings {
            tree: self,
            front: node.and_then(|n| n.first_child()),
            back: node.and_then(|n| n.last_child()),
        }
    }
}

/// Shared front/back bookkeeping for the double-ended walks.
///
/// `front` and `back` both point at the next node to yield from their end;
/// once they meet the walk is exhausted from both sides.
#[derive(Clone)]
struct Walk<'a, T> {
    tree: &'a Tree<T>,
    scope: NodeId,
    front: Option<NodeId>,
    back: Option<NodeId>,
}

impl<T> Walk<'_, T> {
    fn step_front(
        &mut self,
        advance: impl Fn(&Tree<T>, NodeId, NodeId) -> Option<NodeId>,
    ) -> Option<NodeId> {
        let current = self.front?;
        if Some(current) == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = advance(self.tree, self.scope, current);
        }
        Some(current)
    }

    fn step_back(
        &mut self,
        retreat: impl Fn(&Tree<T>, NodeId, NodeId) -> Option<NodeId>,
    ) -> Option<NodeId> {
        let current = self.back?;
        if Some(current) == self.front {
            self.front = None;
            self.back = None;
        } else {
            self.back = retreat(self.tree, self.scope, current);
        }
        Some(current)
    }
}

#[derive(Clone)]
pub struct PreOrder<'a, T>(Walk<'a, T>);

impl<T> Iterator for PreOrder<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.0.step_front(Tree::next_pre_order)
    }
}

impl<T> DoubleEndedIterator for PreOrder<'_, T> {
    fn next_back(&mut self) -> Option<NodeId> {
        self.0.step_back(Tree::prev_pre_order)
    }
}

#[derive(Clone)]
pub struct PostOrder<'a, T>(Walk<'a, T>);

impl<T> Iterator for PostOrder<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.0.step_front(Tree::next_post_order)
    }
}

impl<T> DoubleEndedIterator for PostOrder<'_, T> {
    fn next_back(&mut self) -> Option<NodeId> {
        self.0.step_back(Tree::prev_post_order)
    }
}

#[derive(Clone)]
pub struct Leaves<'a, T>(Walk<'a, T>);

impl<T> Iterator for Leaves<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.0.step_front(Tree::next_leaf)
    }
}

impl<T> DoubleEndedIterator for Leaves<'_, T> {
    fn next_back(&mut self) -> Option<NodeId> {
        self.0.step_back(Tree::prev_leaf)
    }
}

#[derive(Clone)]
pub struct Siblings<'a, T> {
    tree: &'a Tree<T>,
    front: Option<NodeId>,
    back: Option<NodeId>,
}

impl<T> Iterator for Siblings<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.front?;
        if Some(current) == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = self.tree.get(current).and_then(|n| n.next_sibling());
        }
        Some(current)
    }
}

impl<T> DoubleEndedIterator for Siblings<'_, T> {
    fn next_back(&mut self) -> Option<NodeId> {
        let current = self.back?;
        if Some(current) == self.front {
            self.front = None;
            self.back = None;
        } else {
            self.back = self.tree.get(current).and_then(|n| n.previous_sibling());
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// R{A{A1,A2},B,C}
    fn sample() -> (Tree<&'static str>, NodeId) {
        let mut tree = Tree::new("R");
        let root = tree.root();
        let a = tree.append_child(root, "A");
        tree.append_child(a, "A1");
        tree.append_child(a, "A2");
        tree.append_child(root, "B");
        tree.append_child(root, "C");
        (tree, a)
    }

    fn names<I: Iterator<Item = NodeId>>(tree: &Tree<&'static str>, ids: I) -> Vec<&'static str> {
        ids.map(|id| *tree[id].data()).collect()
    }

    #[test]
    fn pre_order_visits_parent_first() {
        let (tree, _) = sample();
        let root = tree.root();
        assert_eq!(names(&tree, tree.pre_order(root)), ["R", "A", "A1", "A2", "B", "C"]);
        assert_eq!(
            names(&tree, tree.pre_order(root).rev()),
            ["C", "B", "A2", "A1", "A", "R"]
        );
    }

    #[test]
    fn post_order_visits_children_first() {
        let (tree, _) = sample();
        let root = tree.root();
        assert_eq!(names(&tree, tree.post_order(root)), ["A1", "A2", "A", "B", "C", "R"]);
        assert_eq!(
            names(&tree, tree.post_order(root).rev()),
            ["R", "C", "B", "A", "A2", "A1"]
        );
    }

    #[test]
    fn leaves_follow_post_order() {
        let (tree, _) = sample();
        let root = tree.root();
        assert_eq!(names(&tree, tree.leaves(root)), ["A1", "A2", "B", "C"]);
        assert_eq!(names(&tree, tree.leaves(root).rev()), ["C", "B", "A2", "A1"]);
    }

    #[test]
    fn traversals_stay_inside_their_subtree() {
        let (tree, a) = sample();
        assert_eq!(names(&tree, tree.pre_order(a)), ["A", "A1", "A2"]);
        assert_eq!(names(&tree, tree.post_order(a)), ["A1", "A2", "A"]);
        assert_eq!(names(&tree, tree.leaves(a)), ["A1", "A2"]);
        assert_eq!(names(&tree, tree.siblings(a)), ["A1", "A2"]);
    }

    #[test]
    fn childless_scope_is_its_own_leaf() {
        let tree = Tree::new("only");
        let root = tree.root();
        assert_eq!(names(&tree, tree.leaves(root)), ["only"]);
        assert_eq!(names(&tree, tree.pre_order(root)), ["only"]);
        assert_eq!(names(&tree, tree.post_order(root).rev()), ["only"]);
        assert_eq!(tree.siblings(root).count(), 0);
    }

    #[test]
    fn mixed_front_and_back_meet_in_the_middle() {
        let (tree, _) = sample();
        let root = tree.root();
        let mut walk = tree.pre_order(root);
        let mut seen = Vec::new();
        while let Some(front) = walk.next() {
            seen.push(*tree[front].data());
            if let Some(back) = walk.next_back() {
                seen.push(*tree[back].data());
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, ["A", "A1", "A2", "B", "C", "R"]);
    }

    #[test]
    fn cursors_step_both_ways() {
        let (tree, a) = sample();
        let root = tree.root();
        let a1 = tree[a].first_child().unwrap();
        let a2 = tree[a].last_child().unwrap();
        let b = tree[a].next_sibling().unwrap();

        assert_eq!(tree.next_pre_order(root, a2), Some(b));
        assert_eq!(tree.prev_pre_order(root, b), Some(a2));
        assert_eq!(tree.next_post_order(root, a2), Some(a));
        assert_eq!(tree.prev_post_order(root, a), Some(a2));
        assert_eq!(tree.next_leaf(root, a2), Some(b));
        assert_eq!(tree.prev_leaf(root, b), Some(a2));
        assert_eq!(tree.prev_leaf(root, a1), None);
        assert_eq!(tree.prev_pre_order(root, root), None);
    }

    #[test]
    fn iterators_restart_from_scratch() {
        let (tree, _) = sample();
        let root = tree.root();
        let walk = tree.pre_order(root);
        assert_eq!(walk.clone().count(), 6);
        assert_eq!(walk.count(), 6);
    }
}
