//! # Volume manager
//!
//! Lays out a volume on a block device and performs path-level operations
//! on it, keeping the free map on disk in step with every change.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::{
    Bitmap, BlockAllocator, DIRECTORY_FILE_SIZE, DIRECTORY_SECTOR, DirEntry, DirectoryFile,
    DirectoryTable, ExtentTree, FREE_MAP_SECTOR, FsError, NUM_DIR_ENTRIES, OpenFile, Result,
    SectorId, path, sector,
};

#[derive(Debug)]
pub struct FileSystem {
    block_device: Arc<dyn BlockDevice>,
    free_map: Bitmap,
}

impl FileSystem {
    /// Formats `total_blocks` blocks of `block_device` as an empty volume.
    pub fn format(
        block_device: Arc<dyn BlockDevice>,
        total_blocks: usize,
    ) -> Result<Arc<Mutex<Self>>> {
        if total_blocks <= DIRECTORY_SECTOR.index() {
            return Err(FsError::OutOfSpace);
        }

        for id in 0..total_blocks {
            sector::zeroize(&block_device, SectorId::new(id as u32));
        }

        let mut free_map = Bitmap::new(total_blocks);
        free_map.mark(FREE_MAP_SECTOR);
        free_map.mark(DIRECTORY_SECTOR);

        let mut map_header = ExtentTree::new(0);
        map_header.allocate(&mut free_map, Bitmap::byte_len(total_blocks), &block_device)?;
        let mut dir_header = ExtentTree::new(0);
        dir_header.allocate(&mut free_map, DIRECTORY_FILE_SIZE, &block_device)?;

        map_header.write_back(FREE_MAP_SECTOR, &block_device);
        dir_header.write_back(DIRECTORY_SECTOR, &block_device);

        let root = OpenFile::open(DIRECTORY_SECTOR, &block_device);
        DirectoryTable::new(NUM_DIR_ENTRIES).write_back(&root);

        let fs = Self {
            block_device,
            free_map,
        };
        fs.sync_free_map();
        log::debug!(
            "format: {total_blocks} blocks, {} free",
            fs.free_map.free_count()
        );

        Ok(Arc::new(Mutex::new(fs)))
    }

    /// Opens a volume formatted earlier.
    pub fn open(block_device: Arc<dyn BlockDevice>) -> Arc<Mutex<Self>> {
        let map_file = OpenFile::open(FREE_MAP_SECTOR, &block_device);
        let mut free_map = Bitmap::new(map_file.length() * 8);
        free_map.fetch_from(&map_file);

        Arc::new(Mutex::new(Self {
            block_device,
            free_map,
        }))
    }

    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.free_map.free_count()
    }

    #[inline]
    pub fn block_device(&self) -> &Arc<dyn BlockDevice> {
        &self.block_device
    }

    /// Creates a file of `size` bytes at `path`. Its data blocks are zeroed.
    pub fn create(&mut self, path: &str, size: usize) -> Result<()> {
        let level = ExtentTree::level_for(size).ok_or(FsError::FileTooLarge)?;
        let block_device = self.block_device.clone();
        let mut root = self.root();

        let header_sector = self.free_map.find_and_set().ok_or(FsError::OutOfSpace)?;
        let mut header = ExtentTree::new(level);
        if let Err(err) = header.allocate(&mut self.free_map, size, &block_device) {
            self.free_map.clear(header_sector);
            return Err(err);
        }
        header.write_back(header_sector, &block_device);

        if let Err(err) =
            root.modify_at(path, |table| table.add(path, header_sector, &block_device))
        {
            log::warn!("create {path:?}: {err}, releasing its blocks");
            header.deallocate(&mut self.free_map, &block_device);
            sector::zeroize(&block_device, header_sector);
            self.free_map.clear(header_sector);
            return Err(err);
        }

        self.sync_free_map();
        log::debug!("create {path:?}: {size} bytes, level {level}, header at {header_sector}");
        Ok(())
    }

    /// Creates an empty directory at `path`.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let block_device = self.block_device.clone();
        let mut root = self.root();

        let header_sector = self.free_map.find_and_set().ok_or(FsError::OutOfSpace)?;
        let free_map = &mut self.free_map;
        if let Err(err) = root.modify_at(path, |table| {
            table.add_directory(path, header_sector, free_map, &block_device)
        }) {
            self.free_map.clear(header_sector);
            return Err(err);
        }

        self.sync_free_map();
        log::debug!("mkdir {path:?}: header at {header_sector}");
        Ok(())
    }

    /// Opens the file at `path`.
    pub fn open_file(&self, path: &str) -> Result<OpenFile> {
        let entry = self.root().lookup(path, &self.block_device)?;
        if entry.is_dir() {
            return Err(FsError::IsADirectory);
        }
        Ok(OpenFile::open(entry.location(), &self.block_device))
    }

    /// Removes the file or directory at `path` and frees its blocks.
    /// A directory that still has entries is removed only if `recursive`.
    pub fn remove(&mut self, path: &str, recursive: bool) -> Result<()> {
        let block_device = self.block_device.clone();
        let mut root = self.root();
        let entry = root.lookup(path, &block_device)?;

        if entry.is_dir() {
            let directory = DirectoryFile::open(entry.location(), &block_device);
            if !recursive && !directory.is_empty() {
                return Err(FsError::DirectoryNotEmpty);
            }
            let children: Vec<DirEntry> = directory.list().cloned().collect();
            drop(directory);
            for child in &children {
                self.release(child);
            }
        }

        root.modify_at(path, |table| table.remove_path(path, &block_device))?;
        self.release_file(entry.location());
        self.sync_free_map();
        log::debug!("remove {path:?}");
        Ok(())
    }

    /// Entries of the directory at `path`
    pub fn list(&self, path: &str) -> Result<Vec<DirEntry>> {
        let directory = self.directory(path)?;
        Ok(directory.list().cloned().collect())
    }

    /// Tree below the directory at `path`, one entry per line
    pub fn recursive_list(&self, path: &str) -> Result<String> {
        let directory = self.directory(path)?;
        let mut out = String::new();
        directory
            .recursive_list(0, &self.block_device, &mut out)
            .expect("formatting into a String cannot fail");
        Ok(out)
    }

    /// Header and contents of the file at `path`, or of every entry of the
    /// directory at `path`
    pub fn dump(&self, path: &str) -> Result<String> {
        let mut out = String::new();
        let written = match self.directory(path) {
            Ok(directory) => directory.render(&self.block_device, &mut out),
            Err(FsError::NotADirectory) => {
                self.open_file(path)?
                    .header()
                    .render(&self.block_device, &mut out)
            }
            Err(err) => return Err(err),
        };
        written.expect("formatting into a String cannot fail");
        Ok(out)
    }
}

impl FileSystem {
    #[inline]
    fn root(&self) -> DirectoryFile {
        DirectoryFile::open(DIRECTORY_SECTOR, &self.block_device)
    }

    fn directory(&self, path: &str) -> Result<DirectoryFile> {
        if path::split(path)?.is_empty() {
            return Ok(self.root());
        }
        let entry = self.root().lookup(path, &self.block_device)?;
        if entry.is_file() {
            return Err(FsError::NotADirectory);
        }
        Ok(DirectoryFile::open(entry.location(), &self.block_device))
    }

    /// Frees `entry` and, for a directory, everything below it.
    fn release(&mut self, entry: &DirEntry) {
        if entry.is_dir() {
            let children: Vec<DirEntry> = DirectoryFile::open(entry.location(), &self.block_device)
                .list()
                .cloned()
                .collect();
            for child in &children {
                self.release(child);
            }
        }
        self.release_file(entry.location());
    }

    fn release_file(&mut self, header_sector: SectorId) {
        let mut header = ExtentTree::fetch_from(header_sector, &self.block_device);
        header.deallocate(&mut self.free_map, &self.block_device);
        sector::zeroize(&self.block_device, header_sector);
        self.free_map.clear(header_sector);
    }

    fn sync_free_map(&self) {
        let map_file = OpenFile::open(FREE_MAP_SECTOR, &self.block_device);
        self.free_map.write_back(&map_file);
    }
}
