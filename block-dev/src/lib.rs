//! # Block device interface
//!
//! A block device stores data in fixed-size blocks (disks, disk images,
//! RAM disks). [`BlockDevice`] abstracts reading and writing such a device;
//! a type implementing it is a **block device driver**.
//!
//! Every transfer is a whole block. Drivers report I/O failures by
//! panicking, so callers never observe a partially written block.

#![no_std]

use core::any::Any;
use core::fmt::Debug;

/// Block device driver.
pub trait BlockDevice: Send + Sync + Any + Debug {
    fn read_block(&self, block_id: usize, buf: &mut [u8]);
    fn write_block(&self, block_id: usize, buf: &[u8]);
}
