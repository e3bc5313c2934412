//! Sector addressing

use alloc::sync::Arc;

use binrw::binrw;
use block_dev::BlockDevice;
use derive_more::{Display, From, Into};

use crate::{BLOCK_SIZE, DataBlock};

/// Index of a block on the device. Every header and table is reached
/// through one of these, never through an in-memory reference.
#[binrw]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[repr(transparent)]
pub struct SectorId(u32);

impl SectorId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub fn read(block_device: &Arc<dyn BlockDevice>, id: SectorId) -> DataBlock {
    let mut block = [0; BLOCK_SIZE];
    block_device.read_block(id.index(), &mut block);
    block
}

#[inline]
pub fn write(block_device: &Arc<dyn BlockDevice>, id: SectorId, block: &DataBlock) {
    block_device.write_block(id.index(), block);
}

#[inline]
pub fn zeroize(block_device: &Arc<dyn BlockDevice>, id: SectorId) {
    write(block_device, id, &[0; BLOCK_SIZE]);
}
