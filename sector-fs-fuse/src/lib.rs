
use std::fs::File;
use std::io;
use std::io::{Read, Write};
use std::io::{Seek, SeekFrom};
use std::sync::Mutex;

use block_dev::BlockDevice;
use sector_fs::{BLOCK_SIZE, FileSystem, FsError, OpenFile};

/// A disk image on the host, used as a block device
#[derive(Debug)]
pub struct BlockFile(pub Mutex<File>);

impl BlockFile {
    pub fn new(fd: File) -> Self {
        Self(Mutex::new(fd))
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        file.read_exact(buf).expect("not a complete block!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        file.write_all(buf).expect("not a complete block!");
    }
}

/// Reports a file system error through `io::Error`
pub fn io_error(err: FsError) -> io::Error {
    io::Error::other(err.to_string())
}

/// Stores `data` as a new file at `path`.
pub fn put(fs: &mut FileSystem, path: &str, data: &[u8]) -> io::Result<()> {
    fs.create(path, data.len()).map_err(io_error)?;
    let file = fs.open_file(path).map_err(io_error)?;
    write_all(&file, data)
}

/// Whole contents of the file at `path`
pub fn cat(fs: &FileSystem, path: &str) -> io::Result<Vec<u8>> {
    let file = fs.open_file(path).map_err(io_error)?;
    let mut data = vec![0; file.length()];
    let read = file.read_at(0, &mut data);
    data.truncate(read);
    Ok(data)
}

/// Writes all of `data` from the start of `file`, which never grows.
pub fn write_all(file: &OpenFile, data: &[u8]) -> io::Result<()> {
    let written = file.write_at(0, data);
    if written != data.len() {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("wrote {written} of {} bytes", data.len()),
        ));
    }
    Ok(())
}
