//! # sector-fs
//!
//! Metadata layer of a small teaching file system. Names map to sectors
//! through flat, fixed-capacity directory tables; a file's data is reached
//! through a tree of extent headers, one header per sector.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

// File system facade: format/open a volume, create/remove/list by path
mod fs;

// Directory tables and path walking
mod directory;

// Byte-range handle over an extent tree
mod file;

// On-disk records: directory entries, extent headers, free map
mod layout;

// Path splitting and validation
mod path;

// Sector addressing on the block device
mod sector;

mod error;

pub use self::{
    directory::{DirectoryFile, DirectoryTable},
    error::{FsError, Result},
    file::OpenFile,
    fs::FileSystem,
    layout::{BlockAllocator, Bitmap, DirEntry, ExtentTree, MAX_POINTERS},
    sector::SectorId,
};

pub use block_dev::BlockDevice;

pub const BLOCK_SIZE: usize = 512;

/// Longest name of a single path component, in bytes
pub const NAME_MAX_LEN: usize = 25;
/// Most components a path may have
pub const MAX_DEPTH: usize = 8;
/// Entries in every directory table
pub const NUM_DIR_ENTRIES: usize = 64;
/// Bytes occupied by one directory table on disk
pub const DIRECTORY_FILE_SIZE: usize = NUM_DIR_ENTRIES * DirEntry::SIZE;
/// Deepest extent tree; capacity of the next level would overflow `u32`
pub const MAX_LEVEL: u32 = 2;

/// Header of the free map file
pub const FREE_MAP_SECTOR: SectorId = SectorId::new(0);
/// Header of the root directory file
pub const DIRECTORY_SECTOR: SectorId = SectorId::new(1);

type DataBlock = [u8; BLOCK_SIZE];
