use alloc::vec;
use alloc::vec::Vec;

use crate::{OpenFile, SectorId};

/// Tracks which blocks of the device are in use.
pub trait BlockAllocator {
    /// Number of blocks still free
    fn free_count(&self) -> usize;
    /// Takes a free block and marks it used; `None` when none are left.
    fn find_and_set(&mut self) -> Option<SectorId>;
    /// Returns a used block.
    fn clear(&mut self, sector: SectorId);
    fn test(&self, sector: SectorId) -> bool;
}

/// Bit group scanned at once
type Group = u64;
const GROUP_BITS: usize = Group::BITS as usize;

/// Free map of the volume, one bit per block; persisted as an ordinary
/// file whose header lives at [`FREE_MAP_SECTOR`](crate::FREE_MAP_SECTOR).
#[derive(Debug, Clone)]
pub struct Bitmap {
    groups: Vec<Group>,
    /// Number of blocks the map describes
    bits: usize,
}

impl Bitmap {
    /// A map of `bits` free blocks. Bits past `bits` in the last group are
    /// set so they are never handed out.
    pub fn new(bits: usize) -> Self {
        let mut groups = vec![0; bits.div_ceil(GROUP_BITS)];
        let tail = bits % GROUP_BITS;
        if tail != 0 {
            if let Some(last) = groups.last_mut() {
                *last = Group::MAX << tail;
            }
        }

        Self { groups, bits }
    }

    /// Size of the persisted map for `bits` blocks
    #[inline]
    pub fn byte_len(bits: usize) -> usize {
        bits.div_ceil(GROUP_BITS) * size_of::<Group>()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bits
    }

    /// Marks a specific block used, e.g. a well-known sector when formatting.
    pub fn mark(&mut self, sector: SectorId) {
        let (group_index, ingroup_index) = self.locate(sector);
        self.groups[group_index] |= 1 << ingroup_index;
    }

    pub fn fetch_from(&mut self, file: &OpenFile) {
        let mut raw = vec![0; self.groups.len() * size_of::<Group>()];
        file.read_at(0, &mut raw);
        for (group, bytes) in self
            .groups
            .iter_mut()
            .zip(raw.chunks_exact(size_of::<Group>()))
        {
            let mut word = [0; size_of::<Group>()];
            word.copy_from_slice(bytes);
            *group = Group::from_le_bytes(word);
        }
    }

    pub fn write_back(&self, file: &OpenFile) {
        let raw: Vec<u8> = self
            .groups
            .iter()
            .flat_map(|group| group.to_le_bytes())
            .collect();
        file.write_at(0, &raw);
    }

    /// Linear map from block ID to (group index, bit in group)
    #[inline]
    fn locate(&self, sector: SectorId) -> (usize, usize) {
        let index = sector.index();
        assert!(index < self.bits, "block {sector} is outside the free map");
        (index / GROUP_BITS, index % GROUP_BITS)
    }
}

impl BlockAllocator for Bitmap {
    fn free_count(&self) -> usize {
        self.groups
            .iter()
            .map(|group| group.count_zeros() as usize)
            .sum()
    }

    fn find_and_set(&mut self) -> Option<SectorId> {
        // the first group still holding a 0 bit
        let (group_index, ingroup_index) = self
            .groups
            .iter()
            .enumerate()
            .find_map(|(group_index, &bits)| {
                (bits != Group::MAX).then_some((group_index, bits.trailing_ones() as usize))
            })?;

        self.groups[group_index] |= 1 << ingroup_index;
        Some(SectorId::new((group_index * GROUP_BITS + ingroup_index) as u32))
    }

    fn clear(&mut self, sector: SectorId) {
        let (group_index, ingroup_index) = self.locate(sector);

        // the block must have been handed out
        assert_ne!(
            self.groups[group_index] & (1 << ingroup_index),
            0,
            "consistency violation: block {sector} is not in use"
        );

        self.groups[group_index] &= !(1 << ingroup_index);
    }

    fn test(&self, sector: SectorId) -> bool {
        let (group_index, ingroup_index) = self.locate(sector);
        self.groups[group_index] & (1 << ingroup_index) != 0
    }
}
