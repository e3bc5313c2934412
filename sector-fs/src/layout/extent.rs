//! Extent header: a file's length plus the tree of blocks holding its data.
//!
//! - level 0: `pointers` address data blocks directly
//! - level 1: `pointers` address level-0 headers
//! - level n: `pointers` address level n-1 headers
//!
//! The tree is uniform: every header has at most [`MAX_POINTERS`] children,
//! so a level-n header addresses `BLOCK_SIZE * MAX_POINTERS^(n+1)` bytes.
//!
//! ## Offset translation
//!
//! - offset divided by the **stride** of a level (bytes behind one pointer)
//!   selects the pointer
//! - offset modulo the stride is the offset inside that child

use alloc::sync::Arc;
use core::fmt;

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};
use block_dev::BlockDevice;

use crate::{BLOCK_SIZE, BlockAllocator, FsError, MAX_LEVEL, Result, SectorId, sector};

/// Bytes taken by `logical_bytes`, `block_count` and `level`
const FIXED_FIELDS: usize = 3 * size_of::<u32>();
/// Pointers that fit in a header next to its fixed fields
pub const MAX_POINTERS: usize = (BLOCK_SIZE - FIXED_FIELDS) / size_of::<u32>();

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtentTree {
    /// File length in bytes
    logical_bytes: u32,
    /// Pointers in use
    block_count: u32,
    level: u32,
    pointers: [SectorId; MAX_POINTERS],
}

impl ExtentTree {
    pub fn new(level: u32) -> Self {
        assert!(level <= MAX_LEVEL, "extent tree level {level} is too deep");
        Self {
            logical_bytes: 0,
            block_count: 0,
            level,
            pointers: [SectorId::default(); MAX_POINTERS],
        }
    }

    /// Loads the header at `sector`.
    ///
    /// # Panics
    ///
    /// A level above [`MAX_LEVEL`] or more than [`MAX_POINTERS`] pointers
    /// means the volume is corrupt.
    pub fn fetch_from(sector: SectorId, block_device: &Arc<dyn BlockDevice>) -> Self {
        let block = sector::read(block_device, sector);
        let header =
            Self::read(&mut Cursor::new(&block[..])).expect("extent header fills one block");
        assert!(
            header.level <= MAX_LEVEL && header.block_count() <= MAX_POINTERS,
            "consistency violation: extent header at {sector} has level {} and {} pointers",
            header.level,
            header.block_count
        );
        header
    }

    pub fn write_back(&self, sector: SectorId, block_device: &Arc<dyn BlockDevice>) {
        let mut block = [0; BLOCK_SIZE];
        self.write(&mut Cursor::new(&mut block[..]))
            .expect("extent header fills one block");
        sector::write(block_device, sector, &block);
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.logical_bytes as usize
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count as usize
    }

    /// Pointers in use
    #[inline]
    pub fn pointers(&self) -> &[SectorId] {
        &self.pointers[..self.block_count()]
    }

    /// Bytes addressed by one pointer of a level-`level` header
    #[inline]
    pub const fn stride(level: u32) -> usize {
        BLOCK_SIZE * MAX_POINTERS.pow(level)
    }

    /// Bytes addressed by a whole level-`level` header
    #[inline]
    pub const fn capacity(level: u32) -> usize {
        Self::stride(level) * MAX_POINTERS
    }

    /// Shallowest level able to hold `size` bytes
    pub fn level_for(size: usize) -> Option<u32> {
        (0..=MAX_LEVEL).find(|&level| size <= Self::capacity(level))
    }

    /// Blocks a level-`level` tree of `size` bytes takes, child headers
    /// included; the header itself is not counted.
    pub fn required_blocks(level: u32, size: usize) -> usize {
        let stride = Self::stride(level);
        let pointers = size.div_ceil(stride);
        if level == 0 {
            return pointers;
        }

        let full = size / stride;
        let rest = size % stride;
        let mut total = pointers + full * Self::required_blocks(level - 1, stride);
        if rest > 0 {
            total += Self::required_blocks(level - 1, rest);
        }
        total
    }

    /// Takes blocks for a file of `size` bytes from `allocator`.
    ///
    /// Every child of a higher-level header is filled to its full capacity
    /// except the last one, which gets the remainder, so child headers
    /// record only their share in `logical_bytes` rather than a full
    /// capacity. Either the whole tree is allocated or no block is left
    /// taken.
    pub fn allocate(
        &mut self,
        allocator: &mut dyn BlockAllocator,
        size: usize,
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<()> {
        if size > Self::capacity(self.level) {
            return Err(FsError::FileTooLarge);
        }
        let required = Self::required_blocks(self.level, size);
        if allocator.free_count() < required {
            log::debug!(
                "allocate: {size} bytes at level {} need {required} blocks, {} free",
                self.level,
                allocator.free_count()
            );
            return Err(FsError::OutOfSpace);
        }

        let stride = Self::stride(self.level);
        self.logical_bytes = size as u32;
        self.block_count = 0;

        for index in 0..size.div_ceil(stride) {
            let Some(block) = allocator.find_and_set() else {
                self.deallocate(allocator, block_device);
                return Err(FsError::OutOfSpace);
            };

            if self.level > 0 {
                let mut child = Self::new(self.level - 1);
                let share = (size - index * stride).min(stride);
                if let Err(err) = child.allocate(allocator, share, block_device) {
                    allocator.clear(block);
                    self.deallocate(allocator, block_device);
                    return Err(err);
                }
                child.write_back(block, block_device);
            }

            self.pointers[index] = block;
            self.block_count += 1;
        }

        Ok(())
    }

    /// Returns every block of the tree to `allocator` and zeroes it.
    ///
    /// # Panics
    ///
    /// A block that the allocator does not consider used means the volume
    /// is corrupt.
    pub fn deallocate(
        &mut self,
        allocator: &mut dyn BlockAllocator,
        block_device: &Arc<dyn BlockDevice>,
    ) {
        for &block in self.pointers() {
            assert!(
                allocator.test(block),
                "consistency violation: block {block} of a level {} header is not in use",
                self.level
            );

            if self.level > 0 {
                Self::fetch_from(block, block_device).deallocate(allocator, block_device);
            }

            sector::zeroize(block_device, block);
            allocator.clear(block);
        }

        self.block_count = 0;
        self.logical_bytes = 0;
    }

    /// Block holding the byte at `offset`; `None` past the last pointer.
    pub fn translate(&self, offset: usize, block_device: &Arc<dyn BlockDevice>) -> Option<SectorId> {
        let stride = Self::stride(self.level);
        let &block = self.pointers().get(offset / stride)?;

        if self.level == 0 {
            Some(block)
        } else {
            Self::fetch_from(block, block_device).translate(offset % stride, block_device)
        }
    }

    /// Dumps the tree and the file contents, for debugging.
    pub fn render(&self, block_device: &Arc<dyn BlockDevice>, out: &mut dyn fmt::Write) -> fmt::Result {
        if self.level > 0 {
            writeln!(
                out,
                "Level {} header. File size: {}. Children: {}",
                self.level,
                self.logical_bytes,
                self.block_count
            )?;
            for &block in self.pointers() {
                Self::fetch_from(block, block_device).render(block_device, out)?;
            }
            return Ok(());
        }

        writeln!(
            out,
            "FileHeader contents. File size: {}. File blocks:",
            self.logical_bytes
        )?;
        for block in self.pointers() {
            write!(out, "{block} ")?;
        }
        writeln!(out, "\nFile contents:")?;

        let mut remaining = self.length();
        for &block in self.pointers() {
            let data = sector::read(block_device, block);
            for &byte in &data[..remaining.min(BLOCK_SIZE)] {
                if byte.is_ascii_graphic() || byte == b' ' {
                    write!(out, "{}", byte as char)?;
                } else {
                    write!(out, "\\{byte:x}")?;
                }
            }
            remaining = remaining.saturating_sub(BLOCK_SIZE);
            writeln!(out)?;
        }

        Ok(())
    }
}
