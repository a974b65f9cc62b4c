/// Triangle geometry for blocks, ready for GPU upload.
///
/// Each block becomes five faces (front, right, back, left, top) of two
/// triangles each. The bottom is never visible because every block sits on
/// its parent or on the ground, so it is not emitted.
use crate::model::{Block, FileTree};
use bytemuck::{Pod, Zeroable};

pub const VERTICES_PER_BLOCK: usize = 30;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BlockVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

const FRONT: [f32; 3] = [0.0, 0.0, 1.0];
const RIGHT: [f32; 3] = [1.0, 0.0, 0.0];
const BACK: [f32; 3] = [0.0, 0.0, -1.0];
const LEFT: [f32; 3] = [-1.0, 0.0, 0.0];
const TOP: [f32; 3] = [0.0, 1.0, 0.0];

impl Block {
    /// The 30 vertices of this block, counter-clockwise seen from outside.
    pub fn vertices(&self) -> [BlockVertex; VERTICES_PER_BLOCK] {
        let x0 = self.origin.x as f32;
        let x1 = (self.origin.x + self.width) as f32;
        let y0 = self.origin.y as f32;
        let y1 = (self.origin.y + self.height) as f32;
        let z0 = self.origin.z as f32;
        let z1 = (self.origin.z - self.depth) as f32;

        let faces: [([[f32; 3]; 4], [f32; 3]); 5] = [
            ([[x0, y0, z0], [x1, y0, z0], [x1, y1, z0], [x0, y1, z0]], FRONT),
            ([[x1, y0, z0], [x1, y0, z1], [x1, y1, z1], [x1, y1, z0]], RIGHT),
            ([[x1, y0, z1], [x0, y0, z1], [x0, y1, z1], [x1, y1, z1]], BACK),
            ([[x0, y0, z1], [x0, y0, z0], [x0, y1, z0], [x0, y1, z1]], LEFT),
            ([[x0, y1, z0], [x1, y1, z0], [x1, y1, z1], [x0, y1, z1]], TOP),
        ];

        let mut vertices = [BlockVertex::default(); VERTICES_PER_BLOCK];
        for (face, (corners, normal)) in faces.iter().enumerate() {
            // Quad a-b-c-d as triangles a-b-c and c-d-a.
            for (slot, corner) in [0, 1, 2, 2, 3, 0].into_iter().enumerate() {
                vertices[face * 6 + slot] = BlockVertex {
                    position: corners[corner],
                    normal: *normal,
                };
            }
        }
        vertices
    }
}

/// Vertices for every block with volume, in pre-order.
///
/// Records each node's offset (in vertices) into `buffer_offset`; nodes
/// without volume get `None`.
pub fn build_vertex_buffer(tree: &mut FileTree) -> Vec<BlockVertex> {
    let order: Vec<_> = tree.pre_order(tree.root()).collect();
    let mut buffer = Vec::with_capacity(order.len() * VERTICES_PER_BLOCK);

    for id in order {
        let node = &mut tree[id];
        if node.block.has_volume() {
            node.buffer_offset = u32::try_from(buffer.len()).ok();
            buffer.extend_from_slice(&node.block.vertices());
        } else {
            node.buffer_offset = None;
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileKind, FileRecord, Point3, VizBlock};

    #[test]
    fn block_has_thirty_vertices_and_no_bottom() {
        let block = Block::new(Point3::new(1.0, 0.0, 0.0), 2.0, 3.0, 4.0);
        let vertices = block.vertices();
        assert_eq!(vertices.len(), 30);
        assert!(vertices.iter().all(|v| v.normal != [0.0, -1.0, 0.0]));

        for v in &vertices[24..30] {
            assert_eq!(v.normal, TOP);
            assert_eq!(v.position[1], 3.0);
        }
        for v in &vertices[0..6] {
            assert_eq!(v.normal, FRONT);
            assert_eq!(v.position[2], 0.0);
        }
        for v in &vertices[12..18] {
            assert_eq!(v.normal, BACK);
            assert_eq!(v.position[2], -4.0);
        }
    }

    #[test]
    fn vertex_is_plain_old_data() {
        let vertices = Block::new(Point3::ORIGIN, 1.0, 1.0, 1.0).vertices();
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 30 * 24);
    }

    #[test]
    fn buffer_skips_flat_blocks_and_records_offsets() {
        let mut tree = FileTree::with_root_name("root");
        let root = tree.root();
        let flat = tree.append_child(
            root,
            VizBlock::new(FileRecord::from_file_name("empty", 0, FileKind::Regular)),
        );
        let solid = tree.append_child(
            root,
            VizBlock::new(FileRecord::from_file_name("full", 1, FileKind::Regular)),
        );
        tree[root].block = Block::new(Point3::ORIGIN, 10.0, 1.0, 10.0);
        tree[solid].block = Block::new(Point3::new(0.0, 1.0, 0.0), 10.0, 1.0, 10.0);
        tree[flat].buffer_offset = Some(999);

        let buffer = build_vertex_buffer(&mut tree);
        assert_eq!(buffer.len(), 60);
        assert_eq!(tree[root].buffer_offset, Some(0));
        assert_eq!(tree[flat].buffer_offset, None);
        assert_eq!(tree[solid].buffer_offset, Some(30));
    }
}
