/// Generic arena-backed N-ary tree.
///
/// Every node lives in a single `Vec` of slots owned by the [`Tree`].
/// Relationships between nodes use [`NodeId`] handles rather than pointers:
/// a parent link is just an index, so it can never keep a node alive or form
/// an ownership cycle. Children form a doubly-linked sibling list, which makes
/// first/last child and next/previous sibling O(1) views over the ordered
/// child sequence.
///
/// Removed nodes free their slot for reuse. Each slot carries a generation
/// counter that is bumped on release, so a stale `NodeId` is rejected instead
/// of silently aliasing whatever node took its place.
use std::cmp::Ordering;
use std::ops::{Deref, DerefMut, Index, IndexMut};

/// Lightweight, generation-checked handle to a node in a [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[inline]
    fn new(index: usize, generation: u32) -> Self {
        debug_assert!(index <= u32::MAX as usize, "NodeId overflow");
        Self {
            index: index as u32,
            generation,
        }
    }

    /// Slot index inside the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// A node: the caller's payload plus its structural links.
///
/// Dereferences to the payload, so `tree[id].size` reads through to `T`.
#[derive(Debug, Clone)]
pub struct Node<T> {
    data: T,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    previous_sibling: Option<NodeId>,
    child_count: usize,
}

impl<T> Node<T> {
    fn new(data: T, parent: Option<NodeId>) -> Self {
        Self {
            data,
            parent,
            first_child: None,
            last_child: None,
            next_sibling: None,
            previous_sibling: None,
            child_count: 0,
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    /// Non-owning handle to the parent. `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    pub fn previous_sibling(&self) -> Option<NodeId> {
        self.previous_sibling
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.child_count
    }

    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

impl<T> Deref for Node<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for Node<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// An N-ary tree with exactly one root.
#[derive(Debug, Clone)]
pub struct Tree<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    root: NodeId,
    len: usize,
}

impl<T> Tree<T> {
    /// Create a tree containing only a root node.
    pub fn new(root_data: T) -> Self {
        Self::with_capacity(1, root_data)
    }

    /// Create a tree with pre-allocated room for `capacity` nodes.
    pub fn with_capacity(capacity: usize, root_data: T) -> Self {
        let mut slots = Vec::with_capacity(capacity.max(1));
        slots.push(Slot {
            generation: 0,
            node: Some(Node::new(root_data, None)),
        });
        Self {
            slots,
            free: Vec::new(),
            root: NodeId::new(0, 0),
            len: 1,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes in the whole tree.
    #[inline]
    pub fn size(&self) -> usize {
        self.len
    }

    /// `true` if `id` refers to a live node of this tree.
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    #[inline]
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Allocate a detached node, reusing a released slot when one is free.
    fn allocate(&mut self, data: T, parent: Option<NodeId>) -> NodeId {
        self.len += 1;
        let node = Node::new(data, parent);
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId::new(self.slots.len() - 1, 0)
            }
        }
    }

    /// Append a new node as the last child of `parent`.
    ///
    /// Panics if `parent` is not a live node.
    pub fn append_child(&mut self, parent: NodeId, data: T) -> NodeId {
        assert!(self.contains(parent), "append_child on stale {parent:?}");
        let child = self.allocate(data, Some(parent));
        self.link_last(parent, child);
        child
    }

    /// Insert a new node as the first child of `parent`.
    ///
    /// Panics if `parent` is not a live node.
    pub fn prepend_child(&mut self, parent: NodeId, data: T) -> NodeId {
        assert!(self.contains(parent), "prepend_child on stale {parent:?}");
        let child = self.allocate(data, Some(parent));

        let old_first = self[parent].first_child;
        self[child].next_sibling = old_first;
        match old_first {
            Some(first) => self[first].previous_sibling = Some(child),
            None => self[parent].last_child = Some(child),
        }
        let parent_node = &mut self[parent];
        parent_node.first_child = Some(child);
        parent_node.child_count += 1;
        child
    }

    fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let old_last = self[parent].last_child;
        {
            let node = &mut self[child];
            node.parent = Some(parent);
            node.previous_sibling = old_last;
            node.next_sibling = None;
        }
        match old_last {
            Some(last) => self[last].next_sibling = Some(child),
            None => self[parent].first_child = Some(child),
        }
        let parent_node = &mut self[parent];
        parent_node.last_child = Some(child);
        parent_node.child_count += 1;
    }

    /// Unlink `id` from its parent's child sequence, stitching its siblings
    /// back together. The node and its subtree stay allocated.
    fn unlink(&mut self, id: NodeId) {
        let (parent, previous, next) = {
            let node = &self[id];
            (node.parent, node.previous_sibling, node.next_sibling)
        };

        match previous {
            Some(previous) => self[previous].next_sibling = next,
            None => {
                if let Some(parent) = parent {
                    self[parent].first_child = next;
                }
            }
        }
        match next {
            Some(next) => self[next].previous_sibling = previous,
            None => {
                if let Some(parent) = parent {
                    self[parent].last_child = previous;
                }
            }
        }
        if let Some(parent) = parent {
            self[parent].child_count -= 1;
        }

        let node = &mut self[id];
        node.parent = None;
        node.previous_sibling = None;
        node.next_sibling = None;
    }

    /// Remove `id` and its entire subtree from the tree.
    ///
    /// Returns the number of nodes released. The root cannot be removed, and
    /// stale handles are ignored; both return `0`.
    pub fn remove_node(&mut self, id: NodeId) -> usize {
        if self.is_root(id) || !self.contains(id) {
            return 0;
        }

        let doomed: Vec<NodeId> = self.post_order(id).collect();
        self.unlink(id);

        for node_id in &doomed {
            let slot = &mut self.slots[node_id.index()];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node_id.index());
        }
        self.len -= doomed.len();
        doomed.len()
    }

    /// Re-parent `id` (with its subtree) as the last child of `new_parent`.
    ///
    /// Refuses to move the root or to move a node underneath itself.
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId) -> bool {
        if self.is_root(id) || !self.contains(id) || !self.contains(new_parent) {
            return false;
        }
        if new_parent == id || self.ancestors(new_parent).any(|a| a == id) {
            return false;
        }
        self.unlink(id);
        self.link_last(new_parent, id);
        true
    }

    /// Distance from `id` to the root (root = 0).
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Number of nodes in the subtree rooted at `id`, including `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.pre_order(id).count()
    }

    /// Parent chain of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, T> {
        Ancestors {
            tree: self,
            current: self.get(id).and_then(|n| n.parent),
        }
    }

    /// Deepest node that is an ancestor-or-self of both `a` and `b`.
    pub fn lowest_common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        let mut a = a;
        let mut b = b;
        let mut depth_a = self.depth(a);
        let mut depth_b = self.depth(b);
        while depth_a > depth_b {
            a = self[a].parent?;
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = self[b].parent?;
            depth_b -= 1;
        }
        while a != b {
            a = self[a].parent?;
            b = self[b].parent?;
        }
        Some(a)
    }

    /// Stable re-ordering of the direct children of `parent`.
    pub fn sort_children_by<F>(&mut self, parent: NodeId, mut compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if !self.contains(parent) {
            return;
        }
        let mut children: Vec<NodeId> = self.siblings(parent).collect();
        if children.len() < 2 {
            return;
        }
        children.sort_by(|a, b| compare(&self[*a].data, &self[*b].data));

        for (position, &child) in children.iter().enumerate() {
            let node = &mut self[child];
            node.previous_sibling = position.checked_sub(1).map(|p| children[p]);
            node.next_sibling = children.get(position + 1).copied();
        }
        let parent_node = &mut self[parent];
        parent_node.first_child = children.first().copied();
        parent_node.last_child = children.last().copied();
    }
}

impl<T> Index<NodeId> for Tree<T> {
    type Output = Node<T>;

    fn index(&self, id: NodeId) -> &Node<T> {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale or foreign {id:?}"),
        }
    }
}

impl<T> IndexMut<NodeId> for Tree<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale or foreign {id:?}"),
        }
    }
}

/// Iterator over the parent chain of a node.
pub struct Ancestors<'a, T> {
    tree: &'a Tree<T>,
    current: Option<NodeId>,
}

impl<T> Iterator for Ancestors<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.tree.get(id).and_then(|n| n.parent);
        Some(id)
    }
}
