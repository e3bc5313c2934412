//! # Directory tables
//!
//! A directory is an ordinary file holding a fixed number of
//! [`DirEntry`] records. The table never grows: once every slot is in use
//! no more names can be added.
//!
//! There is no in-memory tree. A nested path is resolved by loading the
//! table of each intermediate directory from the sector its parent entry
//! points at, one fresh table per component.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use core::fmt;
use core::ops::Deref;

use block_dev::BlockDevice;

use crate::path::{self, flat_name};
use crate::{
    BlockAllocator, DIRECTORY_FILE_SIZE, DirEntry, ExtentTree, FsError, NUM_DIR_ENTRIES, OpenFile,
    Result, SectorId,
};

#[derive(Debug, Clone)]
pub struct DirectoryTable {
    entries: Box<[DirEntry]>,
}

impl DirectoryTable {
    /// An empty table of `capacity` free slots
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![DirEntry::default(); capacity].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn fetch_from(&mut self, file: &OpenFile) {
        let mut raw = vec![0; self.capacity() * DirEntry::SIZE];
        file.read_at(0, &mut raw);
        for (entry, record) in self.entries.iter_mut().zip(raw.chunks_exact(DirEntry::SIZE)) {
            *entry = DirEntry::decode(record);
        }
    }

    pub fn write_back(&self, file: &OpenFile) {
        let mut raw = vec![0; self.capacity() * DirEntry::SIZE];
        for (entry, record) in self.entries.iter().zip(raw.chunks_exact_mut(DirEntry::SIZE)) {
            entry.encode(record);
        }
        file.write_at(0, &raw);
    }

    /// Slot holding `name`, a single path component
    pub fn find_index(&self, name: &str) -> Option<usize> {
        let name = flat_name(name);
        self.entries
            .iter()
            .position(|entry| entry.is_in_use() && entry.name() == name)
    }

    /// Header sector of `name`, a single path component
    pub fn find(&self, name: &str) -> Option<SectorId> {
        self.find_index(name)
            .map(|index| self.entries[index].location())
    }

    /// Binds the file whose header is at `sector` to `path`.
    ///
    /// Every directory on the way must already exist. The directory that
    /// receives the entry is written back to disk; when that is `self`,
    /// persisting it is up to the caller.
    pub fn add(
        &mut self,
        path: &str,
        sector: SectorId,
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<()> {
        self.walk_mut(path, block_device, |table, name| {
            table.insert(name, sector, true)
        })
    }

    /// Creates an empty directory with its header at `sector` and binds it
    /// to `path`. The table's blocks come from `allocator`.
    pub fn add_directory(
        &mut self,
        path: &str,
        sector: SectorId,
        allocator: &mut dyn BlockAllocator,
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<()> {
        self.walk_mut(path, block_device, |table, name| {
            table.insert_directory(name, sector, allocator, block_device)
        })
    }

    /// Frees the slot of `name`. The file's blocks are not reclaimed.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let index = self.find_index(name).ok_or(FsError::NameNotFound)?;
        self.entries[index].release();
        Ok(())
    }

    /// Removes the entry at the end of `path`, walking to its parent first.
    pub fn remove_path(&mut self, path: &str, block_device: &Arc<dyn BlockDevice>) -> Result<()> {
        self.walk_mut(path, block_device, |table, name| table.remove(name))
    }

    /// Entries in use, this level only
    pub fn list(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|entry| entry.is_in_use())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list().next().is_none()
    }

    /// Writes this table and every directory below it, indented by `depth`.
    pub fn recursive_list(
        &self,
        depth: usize,
        block_device: &Arc<dyn BlockDevice>,
        out: &mut dyn fmt::Write,
    ) -> fmt::Result {
        for (number, entry) in self.list().enumerate() {
            for _ in 0..depth {
                out.write_str("        ")?;
            }
            let kind = if entry.is_file() { 'F' } else { 'D' };
            writeln!(out, "[{number}] {} {kind}", entry.name())?;

            if entry.is_dir() {
                DirectoryFile::open(entry.location(), block_device)
                    .recursive_list(depth + 1, block_device, out)?;
            }
        }

        Ok(())
    }

    /// Entry at the end of `path`.
    pub fn lookup(&self, path: &str, block_device: &Arc<dyn BlockDevice>) -> Result<DirEntry> {
        let components = path::split(path)?;
        let (name, parents) = components.split_last().ok_or(FsError::InvalidPath)?;
        let found = match self.descend(parents, block_device)? {
            None => self.find_index(name).map(|index| self.entries[index].clone()),
            Some(parent) => parent
                .find_index(name)
                .map(|index| parent.entries[index].clone()),
        };
        found.ok_or(FsError::NameNotFound)
    }

    /// Dumps every entry with its header and contents, for debugging.
    pub fn render(&self, block_device: &Arc<dyn BlockDevice>, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "Directory contents:")?;
        for entry in self.list() {
            writeln!(out, "Name: {}, Sector: {}", entry.name(), entry.location())?;
            ExtentTree::fetch_from(entry.location(), block_device).render(block_device, out)?;
        }
        writeln!(out)
    }
}

impl DirectoryTable {
    /// Runs `f` on the table that holds the last component of `path`.
    ///
    /// A table loaded on the way is written back only if `f` succeeds on
    /// it; tables passed through are dropped untouched.
    fn walk_mut<V>(
        &mut self,
        path: &str,
        block_device: &Arc<dyn BlockDevice>,
        f: impl FnOnce(&mut DirectoryTable, &str) -> Result<V>,
    ) -> Result<V> {
        let components = path::split(path)?;
        let (name, parents) = components.split_last().ok_or(FsError::InvalidPath)?;

        match self.descend(parents, block_device)? {
            None => f(self, name),
            Some(mut parent) => parent.modify(|table| f(table, name)),
        }
    }

    /// Loads the table of the directory named by `parents`, starting here.
    /// `None` when `parents` is empty and the directory is `self`.
    fn descend(
        &self,
        parents: &[&str],
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<Option<DirectoryFile>> {
        let Some((first, rest)) = parents.split_first() else {
            return Ok(None);
        };

        let mut current = DirectoryFile::open(self.find_directory(first)?, block_device);
        for name in rest {
            let sector = current.find_directory(name)?;
            log::trace!("descend: {name} -> sector {sector}");
            current = DirectoryFile::open(sector, block_device);
        }

        Ok(Some(current))
    }

    fn find_directory(&self, name: &str) -> Result<SectorId> {
        self.find_index(name)
            .map(|index| &self.entries[index])
            .filter(|entry| entry.is_dir())
            .map(DirEntry::location)
            .ok_or(FsError::ParentPathMissing)
    }

    /// Slot a new `name` would take. Duplicates are reported before a full
    /// table.
    fn vacant_slot(&self, name: &str) -> Result<usize> {
        if self.find_index(name).is_some() {
            return Err(FsError::DuplicateName);
        }
        self.entries
            .iter()
            .position(|entry| !entry.is_in_use())
            .ok_or(FsError::DirectoryFull)
    }

    fn insert(&mut self, name: &str, sector: SectorId, is_file: bool) -> Result<()> {
        let slot = self.vacant_slot(name)?;
        self.entries[slot] = DirEntry::new(name, sector, is_file);
        Ok(())
    }

    fn insert_directory(
        &mut self,
        name: &str,
        sector: SectorId,
        allocator: &mut dyn BlockAllocator,
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<()> {
        let slot = self.vacant_slot(name)?;

        let mut header = ExtentTree::new(0);
        header.allocate(allocator, DIRECTORY_FILE_SIZE, block_device)?;
        header.write_back(sector, block_device);
        let file = OpenFile::open(sector, block_device);
        DirectoryTable::new(NUM_DIR_ENTRIES).write_back(&file);

        self.entries[slot] = DirEntry::new(name, sector, false);
        Ok(())
    }
}

/// A directory table loaded from disk, written back when dropped if it was
/// modified.
pub struct DirectoryFile {
    table: DirectoryTable,
    file: OpenFile,
    modified: bool,
}

impl DirectoryFile {
    /// Loads the directory whose header is at `sector`.
    pub fn open(sector: SectorId, block_device: &Arc<dyn BlockDevice>) -> Self {
        let file = OpenFile::open(sector, block_device);
        let mut table = DirectoryTable::new(NUM_DIR_ENTRIES);
        table.fetch_from(&file);

        Self {
            table,
            file,
            modified: false,
        }
    }

    /// Runs `f` on the table; a success marks the table for write-back.
    pub fn modify<V>(&mut self, f: impl FnOnce(&mut DirectoryTable) -> Result<V>) -> Result<V> {
        let result = f(&mut self.table);
        if result.is_ok() {
            self.modified = true;
        }
        result
    }

    /// Runs `f`, an operation on `path`, on the table. Only a success on an
    /// entry of this directory marks it for write-back; deeper tables are
    /// written back by the walk.
    pub fn modify_at<V>(
        &mut self,
        path: &str,
        f: impl FnOnce(&mut DirectoryTable) -> Result<V>,
    ) -> Result<V> {
        let result = f(&mut self.table);
        if result.is_ok() && path::split(path).is_ok_and(|components| components.len() == 1) {
            self.modified = true;
        }
        result
    }

    #[inline]
    pub fn sector(&self) -> SectorId {
        self.file.header_sector()
    }

    pub fn sync(&mut self) {
        if self.modified {
            self.modified = false;
            self.table.write_back(&self.file);
        }
    }
}

impl Deref for DirectoryFile {
    type Target = DirectoryTable;

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

impl Drop for DirectoryFile {
    fn drop(&mut self) {
        self.sync();
    }
}
