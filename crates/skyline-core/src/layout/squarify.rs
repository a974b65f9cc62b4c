/// Squarified row layout (Bruls, Huizing & van Wijk) over block footprints.
///
/// Children of a node are placed on the node's roof. The free part of the
/// roof is always a rectangle running from the parent's `next_row_origin` to
/// its far corner; each closed row is a strip laid across the shorter edge of
/// that rectangle, after which `next_row_origin` moves past the strip.
use crate::model::{Block, FileTree, NodeId, Point3};
use tracing::trace;

/// A child waiting to be placed.
#[derive(Debug, Clone, Copy)]
struct RowItem {
    node: NodeId,
    size: u64,
}

/// Assign blocks to the direct children of `parent` from its current block.
///
/// Grandchildren are not touched; callers walk the tree top-down.
///
/// Every row is sized against the free rectangle that is actually left and
/// the bytes still unplaced, so the last row closes exactly on the parent's
/// far corner instead of drifting by accumulated rounding.
pub(crate) fn layout_children(tree: &mut FileTree, parent: NodeId) {
    let children: Vec<NodeId> = tree.siblings(parent).collect();
    if children.is_empty() {
        return;
    }

    tree[parent].block.reset_layout_state();
    let parent_block = tree[parent].block;
    let child_origin = parent_block.next_child_origin();

    let total_size: u64 = children.iter().map(|&c| tree[c].file.size).sum();
    if total_size == 0 || parent_block.width <= 0.0 || parent_block.depth <= 0.0 {
        for child in children {
            tree[child].block = Block::empty_at(child_origin);
        }
        return;
    }

    let mut items: Vec<RowItem> = Vec::with_capacity(children.len());
    for &child in &children {
        let size = tree[child].file.size;
        if size == 0 {
            tree[child].block = Block::empty_at(child_origin);
        } else {
            items.push(RowItem { node: child, size });
        }
    }
    // Stable: equal sizes keep their tree order.
    items.sort_by(|a, b| b.size.cmp(&a.size));

    let (far_x, far_z) = parent_block.far_corner();
    let mut remaining_size = total_size;
    let mut start = 0;
    while start < items.len() {
        let row_origin = tree[parent].block.next_row_origin();
        let remaining_width = far_x - row_origin.x;
        let remaining_depth = row_origin.z - far_z;
        let short_edge = remaining_width.min(remaining_depth);

        if short_edge <= 0.0 {
            trace!("no floor left under {parent:?}; {} children collapse", items.len() - start);
            for item in &items[start..] {
                tree[item.node].block = Block::empty_at(child_origin);
            }
            break;
        }

        // Floor area per byte still to be placed.
        let scale = remaining_width * remaining_depth / remaining_size as f64;

        let mut end = start + 1;
        let mut row_size = items[start].size;
        let mut worst = worst_aspect_ratio(&items[start..end], row_size, scale, short_edge);
        while end < items.len() {
            let candidate_size = row_size + items[end].size;
            let candidate =
                worst_aspect_ratio(&items[start..=end], candidate_size, scale, short_edge);
            if candidate > worst {
                break;
            }
            worst = candidate;
            row_size = candidate_size;
            end += 1;
        }

        let spans_depth = remaining_width >= remaining_depth;
        let closes = end == items.len();
        let strip = Strip {
            origin: row_origin,
            short_edge,
            long_edge: if spans_depth { remaining_width } else { remaining_depth },
            spans_depth,
            height: parent_block.height,
        };
        let mut advanced = strip.place(tree, &items[start..end], row_size, remaining_size);
        if closes {
            if spans_depth {
                advanced.x = far_x;
            } else {
                advanced.z = far_z;
            }
        }

        let block = &mut tree[parent].block;
        block.add_coverage(row_size as f64 / total_size as f64);
        block.set_next_row_origin(advanced);

        remaining_size -= row_size;
        start = end;
    }
}

/// One closed row: a strip across the short edge of the free rectangle.
struct Strip {
    origin: Point3,
    short_edge: f64,
    /// Extent of the free rectangle across the strip.
    long_edge: f64,
    /// `true` when the strip runs along z (the free rectangle is wider than
    /// it is deep), `false` when it runs along x.
    spans_depth: bool,
    height: f64,
}

impl Strip {
    /// Give every row member its slice of the strip. Returns the origin of
    /// the free rectangle left behind.
    ///
    /// Slice boundaries come from cumulative byte counts, and the last member
    /// ends exactly on the strip's far end.
    fn place(
        &self,
        tree: &mut FileTree,
        row: &[RowItem],
        row_size: u64,
        remaining_size: u64,
    ) -> Point3 {
        let thickness = if row_size == remaining_size {
            self.long_edge
        } else {
            self.long_edge * (row_size as f64 / remaining_size as f64)
        };

        let mut placed: u64 = 0;
        let mut offset = 0.0;
        for (i, item) in row.iter().enumerate() {
            placed += item.size;
            let next = if i + 1 == row.len() {
                self.short_edge
            } else {
                self.short_edge * (placed as f64 / row_size as f64)
            };
            let length = next - offset;
            tree[item.node].block = if self.spans_depth {
                Block::new(
                    Point3::new(self.origin.x, self.origin.y, self.origin.z - offset),
                    thickness,
                    self.height,
                    length,
                )
            } else {
                Block::new(
                    Point3::new(self.origin.x + offset, self.origin.y, self.origin.z),
                    length,
                    self.height,
                    thickness,
                )
            };
            offset = next;
        }

        if self.spans_depth {
            self.origin + Point3::new(thickness, 0.0, 0.0)
        } else {
            self.origin + Point3::new(0.0, 0.0, -thickness)
        }
    }
}

/// Worst aspect ratio of a row laid across an edge of length `side`, with
/// each byte covering `scale` units of floor.
///
/// `row` is sorted largest first. Every member shares the strip thickness
/// `area / side`; a member's extent along the strip is its area over that
/// thickness.
fn worst_aspect_ratio(row: &[RowItem], row_size: u64, scale: f64, side: f64) -> f64 {
    let (Some(largest), Some(smallest)) = (row.first(), row.last()) else {
        return f64::MAX;
    };
    let sum = row_size as f64 * scale;
    if sum <= 0.0 || side <= 0.0 {
        return f64::MAX;
    }
    let side_sq = side * side;
    let sum_sq = sum * sum;
    let tall = (side_sq * largest.size as f64 * scale) / sum_sq;
    let wide = sum_sq / (side_sq * smallest.size as f64 * scale);
    tall.max(wide)
}
