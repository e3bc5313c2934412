#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sector_fs::{BLOCK_SIZE, Bitmap, BlockAllocator, BlockDevice, SectorId};

/// Block device backed by memory
#[derive(Debug)]
pub struct RamDisk(Mutex<Vec<[u8; BLOCK_SIZE]>>);

impl RamDisk {
    pub fn new(blocks: usize) -> Arc<dyn BlockDevice> {
        Arc::new(Self(Mutex::new(vec![[0; BLOCK_SIZE]; blocks])))
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self.0.lock().unwrap()[block_id]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        self.0.lock().unwrap()[block_id].copy_from_slice(buf);
    }
}

/// A device and a free map covering it, with the first `reserved` blocks
/// already in use.
pub fn volume(blocks: usize, reserved: u32) -> (Arc<dyn BlockDevice>, Bitmap) {
    let mut free_map = Bitmap::new(blocks);
    for id in 0..reserved {
        free_map.mark(SectorId::new(id));
    }
    (RamDisk::new(blocks), free_map)
}

/// Takes a block from `free_map` for a header.
pub fn header_sector(free_map: &mut Bitmap) -> SectorId {
    free_map.find_and_set().expect("volume has a free block")
}
