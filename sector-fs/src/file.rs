//! Byte-range access to a file through its extent header.

use alloc::sync::Arc;

use block_dev::BlockDevice;

use crate::{BLOCK_SIZE, ExtentTree, SectorId, sector};

/// A file opened by the sector of its extent header.
///
/// Files never grow: reads and writes are clipped to the length fixed when
/// the file was allocated.
pub struct OpenFile {
    header_sector: SectorId,
    header: ExtentTree,
    block_device: Arc<dyn BlockDevice>,
}

impl OpenFile {
    pub fn open(header_sector: SectorId, block_device: &Arc<dyn BlockDevice>) -> Self {
        Self {
            header_sector,
            header: ExtentTree::fetch_from(header_sector, block_device),
            block_device: block_device.clone(),
        }
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.header.length()
    }

    #[inline]
    pub fn header(&self) -> &ExtentTree {
        &self.header
    }

    #[inline]
    pub fn header_sector(&self) -> SectorId {
        self.header_sector
    }

    /// Reads from byte `offset` into `buf`, returning the bytes read.
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> usize {
        let mut start = offset;
        let end = (start + buf.len()).min(self.length());
        if start >= end {
            return 0;
        }

        let mut read_size = 0;
        loop {
            // end of the current block, in file bytes
            let current_block_end = (start / BLOCK_SIZE + 1) * BLOCK_SIZE;
            let current_block_end = current_block_end.min(end);
            let block_read_size = current_block_end - start;

            let Some(block) = self.header.translate(start, &self.block_device) else {
                break;
            };
            let data = sector::read(&self.block_device, block);
            let src = &data[start % BLOCK_SIZE..start % BLOCK_SIZE + block_read_size];
            buf[read_size..read_size + block_read_size].copy_from_slice(src);

            read_size += block_read_size;
            if current_block_end == end {
                break;
            }
            start = current_block_end;
        }

        read_size
    }

    /// Writes `buf` at byte `offset`, returning the bytes written.
    pub fn write_at(&self, offset: usize, buf: &[u8]) -> usize {
        let mut start = offset;
        let end = (start + buf.len()).min(self.length());
        if start >= end {
            return 0;
        }

        let mut written_size = 0;
        loop {
            let current_block_end = (start / BLOCK_SIZE + 1) * BLOCK_SIZE;
            let current_block_end = current_block_end.min(end);
            let block_write_size = current_block_end - start;

            let Some(block) = self.header.translate(start, &self.block_device) else {
                break;
            };
            let mut data = sector::read(&self.block_device, block);
            data[start % BLOCK_SIZE..start % BLOCK_SIZE + block_write_size]
                .copy_from_slice(&buf[written_size..written_size + block_write_size]);
            sector::write(&self.block_device, block, &data);

            written_size += block_write_size;
            if current_block_end == end {
                break;
            }
            start = current_block_end;
        }

        written_size
    }
}
