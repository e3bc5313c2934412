//! # On-disk data structures
//!
//! Disk layout:
//! free map header | root directory header | headers, tables and data
//!
//! Every record is little-endian with no padding between fields.

mod bitmap;
pub use bitmap::{Bitmap, BlockAllocator};

mod extent;
pub use extent::{ExtentTree, MAX_POINTERS};

/// Directory entries are also stored on disk, inside directory files
mod dir_entry;
pub use dir_entry::DirEntry;
