//! Flat word image of an octree, as loaded into the tracer's node ROM.
//!
//! Word 0 is the root. A word with [`LEAF_FLAG`] set is a leaf carrying the
//! material id in its low 31 bits; any other word is the index of the
//! node's first child, and the eight children follow it in octant order.
//! Nodes are laid out breadth-first.

use std::collections::{HashSet, VecDeque};
use std::fmt::Write as _;

use octrace_math::IVec3;

use crate::aabb::Aabb;
use crate::error::{KernelError, Result};
use crate::octree::{octant_index, Descent, MaterialId, Octree, OctreeNode};

/// Bit marking a leaf word.
pub const LEAF_FLAG: u32 = 0x8000_0000;

/// Largest material id a leaf word can hold.
pub const MAX_PACKED_MATERIAL: MaterialId = !LEAF_FLAG;

/// Decoded view of one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedWord {
    /// Leaf with a material.
    Leaf(MaterialId),
    /// Internal node whose children start at this index.
    Children(usize),
}

impl PackedWord {
    /// Decode a raw word.
    pub fn decode(word: u32) -> Self {
        if word & LEAF_FLAG != 0 {
            PackedWord::Leaf(word & !LEAF_FLAG)
        } else {
            PackedWord::Children(word as usize)
        }
    }
}

/// An octree flattened to 32-bit words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedOctree {
    words: Vec<u32>,
    bit_length: u32,
}

impl PackedOctree {
    /// Flatten `octree` breadth-first.
    pub fn from_octree(octree: &Octree) -> Result<Self> {
        let mut words = vec![0u32];
        let mut queue = VecDeque::from([(octree.root(), 0usize)]);

        while let Some((node, slot)) = queue.pop_front() {
            match node {
                OctreeNode::Leaf(material) => {
                    if *material > MAX_PACKED_MATERIAL {
                        return Err(KernelError::PackedImage {
                            index: slot,
                            reason: format!("material {material} does not fit in 31 bits"),
                        });
                    }
                    words[slot] = LEAF_FLAG | material;
                }
                OctreeNode::Internal(children) => {
                    let first = words.len();
                    words[slot] = u32::try_from(first).map_err(|_| KernelError::PackedImage {
                        index: slot,
                        reason: "image exceeds 32-bit addressing".into(),
                    })?;
                    words.resize(first + 8, 0);
                    queue.extend(children.iter().enumerate().map(|(i, c)| (c, first + i)));
                }
            }
        }

        log::debug!("packed octree into {} words", words.len());
        Ok(Self {
            words,
            bit_length: octree.bit_length(),
        })
    }

    /// Wrap raw words, checking that they decode to a valid tree.
    pub fn from_words(words: Vec<u32>, bit_length: u32) -> Result<Self> {
        let packed = Self { words, bit_length };
        packed.to_octree()?;
        Ok(packed)
    }

    /// Raw words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Bits per axis (`L`).
    pub fn bit_length(&self) -> u32 {
        self.bit_length
    }

    fn word(&self, index: usize) -> Result<PackedWord> {
        self.words
            .get(index)
            .copied()
            .map(PackedWord::decode)
            .ok_or_else(|| KernelError::PackedImage {
                index,
                reason: format!("index past end of {}-word image", self.words.len()),
            })
    }

    /// Children of the node at `index` must lie after it and inside the image.
    fn children_of(&self, index: usize, first: usize) -> Result<usize> {
        if first <= index {
            return Err(KernelError::PackedImage {
                index,
                reason: format!("child index {first} does not point forward"),
            });
        }
        if first + 8 > self.words.len() {
            return Err(KernelError::PackedImage {
                index,
                reason: format!(
                    "children {first}..{} run past end of {}-word image",
                    first + 8,
                    self.words.len()
                ),
            });
        }
        Ok(first)
    }

    /// Walk the image breadth-first and check that it is a strict tree.
    ///
    /// Each child block must be in range, lie after its parent and sit no
    /// deeper than `L`. No word may belong to two blocks.
    fn check_structure(&self) -> Result<()> {
        let mut owned = HashSet::new();
        let mut queue = VecDeque::from([(0usize, 0u32)]);
        while let Some((index, depth)) = queue.pop_front() {
            let PackedWord::Children(first) = self.word(index)? else {
                continue;
            };
            if depth >= self.bit_length {
                return Err(KernelError::PackedImage {
                    index,
                    reason: format!("internal node below depth {}", self.bit_length),
                });
            }
            let first = self.children_of(index, first)?;
            for child in first..first + 8 {
                if !owned.insert(child) {
                    return Err(KernelError::PackedImage {
                        index,
                        reason: format!(
                            "child block {first} overlaps word {child}, already owned by another node"
                        ),
                    });
                }
            }
            queue.extend((first..first + 8).map(|child| (child, depth + 1)));
        }
        Ok(())
    }

    /// Rebuild the node tree.
    pub fn to_octree(&self) -> Result<Octree> {
        self.check_structure()?;
        let root = self.decode_node(0, 0)?;
        Octree::new(root, self.bit_length)
    }

    fn decode_node(&self, index: usize, depth: u32) -> Result<OctreeNode> {
        match self.word(index)? {
            PackedWord::Leaf(material) => Ok(OctreeNode::Leaf(material)),
            PackedWord::Children(first) => {
                if depth >= self.bit_length {
                    return Err(KernelError::PackedImage {
                        index,
                        reason: format!("internal node below depth {}", self.bit_length),
                    });
                }
                let first = self.children_of(index, first)?;
                let mut children = Vec::with_capacity(8);
                for i in 0..8 {
                    children.push(self.decode_node(first + i, depth + 1)?);
                }
                let children: [OctreeNode; 8] = children.try_into().map_err(|_| {
                    KernelError::PackedImage {
                        index,
                        reason: "expected 8 children".into(),
                    }
                })?;
                Ok(OctreeNode::internal(children))
            }
        }
    }

    /// Decode `position` to its leaf by walking the words directly.
    pub fn descend(&self, position: &IVec3) -> Result<Descent> {
        let mut aabb = Aabb::world(self.bit_length);
        let mut index = 0;
        let mut depth = 0;
        loop {
            match self.word(index)? {
                PackedWord::Leaf(material) => {
                    return Ok(Descent {
                        material,
                        depth,
                        aabb,
                    });
                }
                PackedWord::Children(first) => {
                    if depth >= self.bit_length {
                        return Err(KernelError::PackedImage {
                            index,
                            reason: format!("internal node below depth {}", self.bit_length),
                        });
                    }
                    let first = self.children_of(index, first)?;
                    let octant = octant_index(position, self.bit_length, depth);
                    aabb = aabb.child(octant);
                    index = first + octant as usize;
                    depth += 1;
                }
            }
        }
    }

    /// One lowercase 8-digit hex word per line.
    pub fn to_mem(&self) -> String {
        let mut out = String::with_capacity(self.words.len() * 9);
        for word in &self.words {
            let _ = writeln!(out, "{word:08x}");
        }
        out
    }

    /// Parse a `.mem` listing.
    ///
    /// Blank lines and `//` comments are skipped; words may carry a Verilog
    /// `32'h` prefix and `_` separators.
    pub fn from_mem(text: &str, bit_length: u32) -> Result<Self> {
        let mut words = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.split("//").next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let digits = line
                .strip_prefix("32'h")
                .or_else(|| line.strip_prefix("32'H"))
                .unwrap_or(line)
                .replace('_', "");
            let word = u32::from_str_radix(&digits, 16).map_err(|e| KernelError::PackedImage {
                index: words.len(),
                reason: format!("line {}: '{line}': {e}", line_no + 1),
            })?;
            words.push(word);
        }
        if words.is_empty() {
            return Err(KernelError::PackedImage {
                index: 0,
                reason: "image is empty".into(),
            });
        }
        Self::from_words(words, bit_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octree::EMPTY;

    fn shaded_tree() -> Octree {
        Octree::from_json("[0,0,0,0,0,2,3,1]", 10).unwrap()
    }

    #[test]
    fn test_single_level_layout() {
        let packed = PackedOctree::from_octree(&shaded_tree()).unwrap();
        assert_eq!(
            packed.words(),
            &[
                1,
                0x8000_0000,
                0x8000_0000,
                0x8000_0000,
                0x8000_0000,
                0x8000_0000,
                0x8000_0002,
                0x8000_0003,
                0x8000_0001,
            ]
        );
    }

    #[test]
    fn test_breadth_first_order() {
        let tree = Octree::from_json("[[1,0,0,0,0,0,0,0],0,0,[0,0,0,0,0,0,0,2],0,0,0,0]", 3)
            .unwrap();
        let packed = PackedOctree::from_octree(&tree).unwrap();
        let words = packed.words();
        assert_eq!(words.len(), 25);
        assert_eq!(words[0], 1);
        // Both internal children of the root point past the root's block.
        assert_eq!(words[1], 9);
        assert_eq!(words[4], 17);
        assert_eq!(words[9], LEAF_FLAG | 1);
        assert_eq!(words[24], LEAF_FLAG | 2);
    }

    #[test]
    fn test_uniform_tree_is_one_word() {
        let packed = PackedOctree::from_octree(&Octree::uniform(4, 5).unwrap()).unwrap();
        assert_eq!(packed.words(), &[LEAF_FLAG | 4]);
    }

    #[test]
    fn test_to_octree_roundtrip() {
        let tree = Octree::from_json("[0,0,0,0,[0,0,0,0,3,2,4,1],2,3,1]", 10).unwrap();
        let packed = PackedOctree::from_octree(&tree).unwrap();
        assert_eq!(packed.to_octree().unwrap(), tree);
    }

    #[test]
    fn test_descend_matches_tree() {
        let mut tree = Octree::from_json("[0,0,0,0,[0,0,0,0,3,2,4,1],2,3,1]", 10).unwrap();
        tree.set_cell(&IVec3::new(100, 900, 40), 10, 5).unwrap();
        let packed = PackedOctree::from_octree(&tree).unwrap();
        for p in [
            IVec3::new(0, 0, 0),
            IVec3::new(100, 900, 40),
            IVec3::new(101, 900, 40),
            IVec3::new(700, 100, 600),
            IVec3::new(300, 200, 900),
            IVec3::new(1023, 1023, 1023),
        ] {
            assert_eq!(packed.descend(&p).unwrap(), tree.descend(&p), "at {p:?}");
        }
    }

    #[test]
    fn test_mem_roundtrip() {
        let packed = PackedOctree::from_octree(&shaded_tree()).unwrap();
        let mem = packed.to_mem();
        assert!(mem.starts_with("00000001\n80000000\n"));
        assert_eq!(mem.lines().count(), 9);
        assert_eq!(PackedOctree::from_mem(&mem, 10).unwrap(), packed);
    }

    #[test]
    fn test_from_mem_accepts_verilog_literals() {
        let text = "// root\n32'h0000_0001\n\n80000000\n80000000\n80000000\n\
                    80000000\n80000000\n80000002\n80000003\n32'h80000001 // corner\n";
        let packed = PackedOctree::from_mem(text, 10).unwrap();
        assert_eq!(packed.to_octree().unwrap(), shaded_tree());
    }

    #[test]
    fn test_from_mem_rejects_garbage() {
        let err = PackedOctree::from_mem("00000001\nzzzz\n", 10).unwrap_err();
        assert!(matches!(err, KernelError::PackedImage { index: 1, .. }), "{err}");
        assert!(PackedOctree::from_mem("", 10).is_err());
    }

    #[test]
    fn test_truncated_image_rejected() {
        let err = PackedOctree::from_words(vec![1, LEAF_FLAG, LEAF_FLAG], 10).unwrap_err();
        assert!(matches!(err, KernelError::PackedImage { index: 0, .. }));
    }

    #[test]
    fn test_backward_pointer_rejected() {
        let mut words = vec![1];
        words.extend([LEAF_FLAG; 8]);
        words[3] = 0;
        assert!(PackedOctree::from_words(words, 10).is_err());
    }

    #[test]
    fn test_shared_child_block_rejected() {
        // Every root child points at the same block of eight leaves.
        let mut words = vec![1];
        words.extend([9; 8]);
        words.extend([LEAF_FLAG | 1; 8]);
        let err = PackedOctree::from_words(words, 10).unwrap_err();
        match err {
            KernelError::PackedImage { index, reason } => {
                assert_eq!(index, 2);
                assert!(reason.contains("already owned"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overlapping_child_blocks_rejected() {
        // Two siblings whose blocks overlap without starting at the same word.
        let mut words = vec![1, 9, 10];
        words.extend([LEAF_FLAG; 6]);
        words.extend([LEAF_FLAG | 1; 9]);
        let err = PackedOctree::from_words(words, 10).unwrap_err();
        assert!(
            matches!(&err, KernelError::PackedImage { index: 2, reason } if reason.contains("word 10")),
            "{err}"
        );
    }

    #[test]
    fn test_depth_beyond_bit_length_rejected() {
        let mut words = vec![1, 9];
        words.extend([LEAF_FLAG | EMPTY; 6]);
        words.push(LEAF_FLAG | 1);
        words.extend([LEAF_FLAG | 2; 8]);
        assert!(PackedOctree::from_words(words.clone(), 2).is_ok());
        assert!(PackedOctree::from_words(words, 1).is_err());
    }

    #[test]
    fn test_wide_material_rejected() {
        let tree = Octree::uniform(LEAF_FLAG, 2).unwrap();
        assert!(PackedOctree::from_octree(&tree).is_err());
    }
}
