//! Sparse voxel octree and the positional address decoder.
//!
//! The world is a cube of side `2^L` lattice units. Each tree level consumes
//! one bit of every coordinate, most significant first, and the three bits
//! are packed as `z y x` into the octant code of the child to visit.

use octrace_math::IVec3;
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::error::{KernelError, Result};

/// Material id stored in a leaf. Zero is empty space.
pub type MaterialId = u32;

/// Material id of empty space.
pub const EMPTY: MaterialId = 0;

/// Largest supported bit length per axis.
pub const MAX_BIT_LENGTH: u32 = 31;

/// An octree node: a leaf carrying a material, or exactly eight children.
///
/// Serialized as nested JSON arrays: an integer is a leaf, an 8-element
/// array is an internal node. Children are indexed by octant code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NodeSource", into = "NodeSource")]
pub enum OctreeNode {
    /// Uniform region of a single material.
    Leaf(MaterialId),
    /// Subdivided region; index with [`octant_index`].
    Internal(Box<[OctreeNode; 8]>),
}

/// Untyped nested form of a node, as it appears in scene documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSource {
    /// Leaf material id.
    Leaf(MaterialId),
    /// Child list; must hold exactly eight entries.
    Internal(Vec<NodeSource>),
}

impl TryFrom<NodeSource> for OctreeNode {
    type Error = KernelError;

    fn try_from(source: NodeSource) -> Result<Self> {
        match source {
            NodeSource::Leaf(material) => Ok(OctreeNode::Leaf(material)),
            NodeSource::Internal(children) => {
                let count = children.len();
                let nodes = children
                    .into_iter()
                    .map(OctreeNode::try_from)
                    .collect::<Result<Vec<_>>>()?;
                let nodes: [OctreeNode; 8] = nodes.try_into().map_err(|_| {
                    KernelError::Structural(format!(
                        "internal node has {count} children, expected 8"
                    ))
                })?;
                Ok(OctreeNode::Internal(Box::new(nodes)))
            }
        }
    }
}

impl From<OctreeNode> for NodeSource {
    fn from(node: OctreeNode) -> Self {
        match node {
            OctreeNode::Leaf(material) => NodeSource::Leaf(material),
            OctreeNode::Internal(children) => {
                let children: [OctreeNode; 8] = *children;
                NodeSource::Internal(children.into_iter().map(NodeSource::from).collect())
            }
        }
    }
}

impl OctreeNode {
    /// Create a leaf node.
    pub fn leaf(material: MaterialId) -> Self {
        OctreeNode::Leaf(material)
    }

    /// Create an internal node from its eight children.
    pub fn internal(children: [OctreeNode; 8]) -> Self {
        OctreeNode::Internal(Box::new(children))
    }

    /// Internal node whose children are leaves with the given materials.
    pub fn from_leaves(materials: [MaterialId; 8]) -> Self {
        OctreeNode::internal(materials.map(OctreeNode::Leaf))
    }

    /// True for a leaf of empty space.
    pub fn is_empty(&self) -> bool {
        matches!(self, OctreeNode::Leaf(EMPTY))
    }

    /// Depth of the deepest leaf below this node (0 for a leaf).
    pub fn depth(&self) -> u32 {
        match self {
            OctreeNode::Leaf(_) => 0,
            OctreeNode::Internal(children) => {
                1 + children.iter().map(OctreeNode::depth).max().unwrap_or(0)
            }
        }
    }

    fn accumulate(&self, depth: u32, stats: &mut OctreeStats) {
        stats.nodes += 1;
        stats.max_depth = stats.max_depth.max(depth);
        match self {
            OctreeNode::Leaf(material) => {
                stats.leaves += 1;
                if *material != EMPTY {
                    stats.occupied_leaves += 1;
                }
            }
            OctreeNode::Internal(children) => {
                for child in children.iter() {
                    child.accumulate(depth + 1, stats);
                }
            }
        }
    }
}

/// Node counts for an octree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    /// Total nodes, internal and leaf.
    pub nodes: usize,
    /// Leaf nodes.
    pub leaves: usize,
    /// Leaves with a non-empty material.
    pub occupied_leaves: usize,
    /// Depth of the deepest leaf.
    pub max_depth: u32,
}

/// Result of decoding a lattice position down to its leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descent {
    /// Material of the leaf reached.
    pub material: MaterialId,
    /// Depth at which descent stopped (0 = root).
    pub depth: u32,
    /// Exact bounds of the leaf.
    pub aabb: Aabb,
}

/// Octant code at `depth` for `position` in an `L = bit_length` world.
///
/// Bit `depth` (MSB first) of each coordinate, packed as `z y x`.
///
/// # Panics
///
/// Panics if `depth >= bit_length`.
#[inline]
pub fn octant_index(position: &IVec3, bit_length: u32, depth: u32) -> u8 {
    assert!(depth < bit_length, "depth {depth} beyond L = {bit_length}");
    let shift = bit_length - 1 - depth;
    let x = (position.x >> shift) & 1;
    let y = (position.y >> shift) & 1;
    let z = (position.z >> shift) & 1;
    ((z << 2) | (y << 1) | x) as u8
}

/// The full chain of `bit_length` octant codes addressing `position`.
pub fn octant_path(position: &IVec3, bit_length: u32) -> impl Iterator<Item = u8> + '_ {
    (0..bit_length).map(move |depth| octant_index(position, bit_length, depth))
}

/// Rebuild a lattice position from its octant chain.
pub fn position_from_path<I>(path: I, bit_length: u32) -> IVec3
where
    I: IntoIterator<Item = u8>,
{
    let mut p = IVec3::zeros();
    for (depth, octant) in path.into_iter().enumerate().take(bit_length as usize) {
        let shift = bit_length - 1 - depth as u32;
        p.x |= ((octant & 1) as i64) << shift;
        p.y |= (((octant >> 1) & 1) as i64) << shift;
        p.z |= (((octant >> 2) & 1) as i64) << shift;
    }
    p
}

/// A validated octree over a `2^L` world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Octree {
    root: OctreeNode,
    bit_length: u32,
}

impl Octree {
    /// Wrap `root` for a world of bit length `bit_length`.
    ///
    /// Fails if the bit length is out of range or any leaf sits deeper
    /// than `bit_length`.
    pub fn new(root: OctreeNode, bit_length: u32) -> Result<Self> {
        if bit_length == 0 || bit_length > MAX_BIT_LENGTH {
            return Err(KernelError::Structural(format!(
                "bit length {bit_length} outside 1..={MAX_BIT_LENGTH}"
            )));
        }
        let depth = root.depth();
        if depth > bit_length {
            return Err(KernelError::Structural(format!(
                "tree depth {depth} exceeds bit length {bit_length}"
            )));
        }
        Ok(Self { root, bit_length })
    }

    /// A world containing a single material everywhere.
    pub fn uniform(material: MaterialId, bit_length: u32) -> Result<Self> {
        Self::new(OctreeNode::Leaf(material), bit_length)
    }

    /// Parse the nested-array form, e.g. `[0,0,0,0,0,0,0,1]`.
    pub fn from_json(json: &str, bit_length: u32) -> Result<Self> {
        let source: NodeSource = serde_json::from_str(json)?;
        Self::new(OctreeNode::try_from(source)?, bit_length)
    }

    /// Serialize the tree to its nested-array form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.root)?)
    }

    /// Root node.
    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    /// Bits per axis (`L`).
    pub fn bit_length(&self) -> u32 {
        self.bit_length
    }

    /// Side length of the world (`2^L`).
    pub fn world_size(&self) -> i64 {
        1i64 << self.bit_length
    }

    /// Bounds of the whole world.
    pub fn world(&self) -> Aabb {
        Aabb::world(self.bit_length)
    }

    /// Decode `position` to the leaf containing it.
    ///
    /// # Panics
    ///
    /// Panics if `position` lies outside [`Octree::world`].
    pub fn descend(&self, position: &IVec3) -> Descent {
        assert!(
            self.world().contains(position),
            "descend from {position:?} outside the world"
        );

        let mut node = &self.root;
        let mut aabb = self.world();
        let mut depth = 0;
        loop {
            match node {
                OctreeNode::Leaf(material) => {
                    return Descent {
                        material: *material,
                        depth,
                        aabb,
                    };
                }
                OctreeNode::Internal(children) => {
                    let octant = octant_index(position, self.bit_length, depth);
                    aabb = aabb.child(octant);
                    node = &children[octant as usize];
                    depth += 1;
                }
            }
        }
    }

    /// Set the cell of side `2^(L - depth)` containing `position` to `material`.
    ///
    /// Leaves on the way down are split into eight copies of themselves.
    pub fn set_cell(&mut self, position: &IVec3, depth: u32, material: MaterialId) -> Result<()> {
        if depth > self.bit_length {
            return Err(KernelError::Structural(format!(
                "cell depth {depth} exceeds bit length {}",
                self.bit_length
            )));
        }
        if !self.world().contains(position) {
            return Err(KernelError::Structural(format!(
                "cell position {:?} outside the world",
                position.as_slice()
            )));
        }

        let mut node = &mut self.root;
        for level in 0..depth {
            if let OctreeNode::Leaf(existing) = *node {
                *node = OctreeNode::internal([(); 8].map(|_| OctreeNode::Leaf(existing)));
            }
            let octant = octant_index(position, self.bit_length, level) as usize;
            node = match node {
                OctreeNode::Internal(children) => &mut children[octant],
                OctreeNode::Leaf(_) => unreachable!("leaf was split above"),
            };
        }
        *node = OctreeNode::Leaf(material);
        Ok(())
    }

    /// Count nodes and leaves.
    pub fn stats(&self) -> OctreeStats {
        let mut stats = OctreeStats::default();
        self.root.accumulate(0, &mut stats);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner_tree() -> Octree {
        Octree::from_json("[0,0,0,0,0,0,0,1]", 2).unwrap()
    }

    #[test]
    fn test_octant_index_order() {
        // z bit is most significant, x bit least.
        assert_eq!(octant_index(&IVec3::new(2, 0, 0), 2, 0), 0b001);
        assert_eq!(octant_index(&IVec3::new(0, 2, 0), 2, 0), 0b010);
        assert_eq!(octant_index(&IVec3::new(0, 0, 2), 2, 0), 0b100);
        assert_eq!(octant_index(&IVec3::new(3, 3, 3), 2, 1), 0b111);
        assert_eq!(octant_index(&IVec3::new(2, 2, 2), 2, 1), 0b000);
    }

    #[test]
    #[should_panic(expected = "beyond L")]
    fn test_octant_index_past_last_level_panics() {
        octant_index(&IVec3::new(3, 3, 3), 2, 2);
    }

    #[test]
    #[should_panic(expected = "outside the world")]
    fn test_descend_outside_world_panics() {
        corner_tree().descend(&IVec3::new(4, 0, 0));
    }

    #[test]
    fn test_descend_corner_leaf() {
        let tree = corner_tree();
        for x in 2..4 {
            for y in 2..4 {
                for z in 2..4 {
                    let p = IVec3::new(x, y, z);
                    let d = tree.descend(&p);
                    assert_eq!(d.material, 1);
                    assert_eq!(d.depth, 1);
                    assert!(d.aabb.contains(&p));
                    assert_eq!(d.aabb, Aabb::cube(IVec3::new(2, 2, 2), 2));
                }
            }
        }
    }

    #[test]
    fn test_descend_empty_octant() {
        let tree = corner_tree();
        let d = tree.descend(&IVec3::new(3, 3, 0));
        assert_eq!(d.material, EMPTY);
        assert_eq!(d.aabb, Aabb::cube(IVec3::new(2, 2, 0), 2));
    }

    #[test]
    fn test_descend_uniform_root() {
        let tree = Octree::uniform(5, 10).unwrap();
        let d = tree.descend(&IVec3::new(700, 3, 1023));
        assert_eq!(d.material, 5);
        assert_eq!(d.depth, 0);
        assert_eq!(d.aabb, Aabb::world(10));
    }

    #[test]
    fn test_descend_full_depth() {
        let mut tree = Octree::uniform(EMPTY, 10).unwrap();
        let voxel = IVec3::new(513, 200, 7);
        tree.set_cell(&voxel, 10, 3).unwrap();
        let d = tree.descend(&voxel);
        assert_eq!(d.material, 3);
        assert_eq!(d.depth, 10);
        assert_eq!(d.aabb, Aabb::cube(voxel, 1));
        let sibling = tree.descend(&IVec3::new(512, 200, 7));
        assert_eq!(sibling.material, EMPTY);
        assert_eq!(sibling.depth, 10);
        assert_eq!(sibling.aabb, Aabb::cube(IVec3::new(512, 200, 7), 1));
        let far = tree.descend(&IVec3::new(0, 0, 0));
        assert_eq!(far.depth, 1);
        assert_eq!(far.aabb, Aabb::cube(IVec3::zeros(), 512));
    }

    #[test]
    fn test_path_roundtrip() {
        let bit_length = 10;
        for p in [
            IVec3::new(0, 0, 0),
            IVec3::new(1023, 1023, 1023),
            IVec3::new(200, 300, 0),
            IVec3::new(513, 17, 768),
        ] {
            let path: Vec<u8> = octant_path(&p, bit_length).collect();
            assert_eq!(path.len(), 10);
            assert_eq!(position_from_path(path, bit_length), p);
        }
    }

    #[test]
    fn test_wrong_child_count_rejected() {
        let err = Octree::from_json("[0,0,0,1]", 2).unwrap_err();
        assert!(matches!(err, KernelError::Structural(_)), "{err}");
    }

    #[test]
    fn test_depth_beyond_bit_length_rejected() {
        let json = "[0,0,0,0,0,0,0,[0,0,0,0,0,0,0,[1,1,1,1,1,1,1,1]]]";
        let err = Octree::from_json(json, 2).unwrap_err();
        assert!(matches!(err, KernelError::Structural(_)));
        assert!(Octree::from_json(json, 3).is_ok());
    }

    #[test]
    fn test_bit_length_range() {
        assert!(Octree::uniform(0, 0).is_err());
        assert!(Octree::uniform(0, MAX_BIT_LENGTH + 1).is_err());
        assert!(Octree::uniform(0, MAX_BIT_LENGTH).is_ok());
    }

    #[test]
    fn test_json_roundtrip_preserves_shape() {
        let json = "[0,0,0,0,[0,0,0,0,3,2,4,1],2,3,1]";
        let tree = Octree::from_json(json, 10).unwrap();
        assert_eq!(tree.to_json().unwrap(), json);
    }

    #[test]
    fn test_stats() {
        let tree = Octree::from_json("[0,0,0,0,[0,0,0,0,3,2,4,1],2,3,1]", 10).unwrap();
        let stats = tree.stats();
        assert_eq!(stats.nodes, 17);
        assert_eq!(stats.leaves, 15);
        assert_eq!(stats.occupied_leaves, 7);
        assert_eq!(stats.max_depth, 2);
    }

    #[test]
    fn test_set_cell_splits_leaf() {
        let mut tree = Octree::uniform(2, 2).unwrap();
        tree.set_cell(&IVec3::new(0, 0, 0), 1, EMPTY).unwrap();
        assert_eq!(
            tree.root(),
            &OctreeNode::from_leaves([0, 2, 2, 2, 2, 2, 2, 2])
        );
        assert!(tree.set_cell(&IVec3::new(4, 0, 0), 1, 1).is_err());
        assert!(tree.set_cell(&IVec3::new(0, 0, 0), 3, 1).is_err());
    }
}
