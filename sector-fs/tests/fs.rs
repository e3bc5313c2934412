mod common;

use sector_fs::{BLOCK_SIZE, ExtentTree, FileSystem, FsError};

use common::RamDisk;

const BLOCKS: usize = 4096;

#[test]
fn format_then_reopen() {
    let dev = RamDisk::new(BLOCKS);
    let free = {
        let fs = FileSystem::format(dev.clone(), BLOCKS).unwrap();
        let mut fs = fs.lock();
        fs.mkdir("/sub").unwrap();
        fs.create("/sub/file.txt", 3 * BLOCK_SIZE).unwrap();
        fs.free_blocks()
    };

    let fs = FileSystem::open(dev);
    let fs = fs.lock();
    assert_eq!(free, fs.free_blocks());
    let names: Vec<_> = fs
        .list("/sub")
        .unwrap()
        .iter()
        .map(|entry| entry.name().to_owned())
        .collect();
    assert_eq!(vec!["file.txt"], names);
    assert_eq!(3 * BLOCK_SIZE, fs.open_file("/sub/file.txt").unwrap().length());
}

#[test]
fn file_contents_round_trip() {
    let fs = FileSystem::format(RamDisk::new(BLOCKS), BLOCKS).unwrap();
    let mut fs = fs.lock();
    let size = 3 * BLOCK_SIZE + 100;
    fs.create("/data.bin", size).unwrap();

    let file = fs.open_file("/data.bin").unwrap();
    let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    assert_eq!(size, file.write_at(0, &payload));

    let mut back = vec![0; size];
    assert_eq!(size, file.read_at(0, &mut back));
    assert_eq!(payload, back);

    // clipped to the file length, never grown
    let mut tail = [0; 64];
    assert_eq!(20, file.read_at(size - 20, &mut tail));
    assert_eq!(0, file.write_at(size, b"more"));

    // unaligned access across a block boundary
    let mut window = [0; 10];
    assert_eq!(10, file.read_at(BLOCK_SIZE - 5, &mut window));
    assert_eq!(payload[BLOCK_SIZE - 5..BLOCK_SIZE + 5], window);
}

#[test]
fn large_files_use_a_deeper_tree() {
    let fs = FileSystem::format(RamDisk::new(BLOCKS), BLOCKS).unwrap();
    let mut fs = fs.lock();
    let size = ExtentTree::capacity(0) + 2 * BLOCK_SIZE;
    fs.create("/big", size).unwrap();

    let file = fs.open_file("/big").unwrap();
    assert_eq!(1, file.header().level());

    let marker = b"end of file";
    assert_eq!(marker.len(), file.write_at(size - marker.len(), marker));
    let mut back = [0; 11];
    file.read_at(size - marker.len(), &mut back);
    assert_eq!(marker, &back);
}

#[test]
fn remove_returns_every_block() {
    let fs = FileSystem::format(RamDisk::new(BLOCKS), BLOCKS).unwrap();
    let mut fs = fs.lock();
    let free = fs.free_blocks();

    fs.create("/small", 10).unwrap();
    fs.create("/big", ExtentTree::capacity(0) * 2).unwrap();
    fs.remove("/small", false).unwrap();
    fs.remove("/big", false).unwrap();

    assert_eq!(free, fs.free_blocks());
    assert_eq!(Err(FsError::NameNotFound), fs.remove("/big", false));
    assert!(fs.list("/").unwrap().is_empty());
}

#[test]
fn directories_need_recursive_removal_when_not_empty() {
    let fs = FileSystem::format(RamDisk::new(BLOCKS), BLOCKS).unwrap();
    let mut fs = fs.lock();
    let free = fs.free_blocks();

    fs.mkdir("/a").unwrap();
    fs.mkdir("/a/b").unwrap();
    fs.create("/a/b/c.txt", 700).unwrap();
    fs.create("/a/d.txt", 1).unwrap();

    assert_eq!(Err(FsError::DirectoryNotEmpty), fs.remove("/a", false));
    fs.remove("/a", true).unwrap();

    assert_eq!(free, fs.free_blocks());
    assert_eq!(Err(FsError::NameNotFound), fs.list("/a").map(|_| ()));
}

#[test]
fn failed_create_releases_its_blocks() {
    let fs = FileSystem::format(RamDisk::new(BLOCKS), BLOCKS).unwrap();
    let mut fs = fs.lock();
    fs.create("/taken", 100).unwrap();
    let free = fs.free_blocks();

    assert_eq!(Err(FsError::DuplicateName), fs.create("/taken", 5000));
    assert_eq!(Err(FsError::ParentPathMissing), fs.create("/no/such", 5000));
    assert_eq!(Err(FsError::ParentPathMissing), fs.mkdir("/no/such"));
    assert_eq!(free, fs.free_blocks());

    assert_eq!(
        Err(FsError::FileTooLarge),
        fs.create("/huge", ExtentTree::capacity(sector_fs::MAX_LEVEL) + 1)
    );
    assert_eq!(Err(FsError::OutOfSpace), fs.create("/full", BLOCKS * BLOCK_SIZE));
    assert_eq!(free, fs.free_blocks());
}

#[test]
fn listing_and_type_checks() {
    let fs = FileSystem::format(RamDisk::new(BLOCKS), BLOCKS).unwrap();
    let mut fs = fs.lock();
    fs.mkdir("/docs").unwrap();
    fs.create("/docs/readme", 5).unwrap();
    fs.create("/notes", 5).unwrap();

    assert_eq!(
        "[0] docs D\n        [0] readme F\n[1] notes F\n",
        fs.recursive_list("/").unwrap()
    );
    assert_eq!("[0] readme F\n", fs.recursive_list("/docs").unwrap());

    assert_eq!(Err(FsError::NotADirectory), fs.list("/notes").map(|_| ()));
    assert_eq!(Err(FsError::IsADirectory), fs.open_file("/docs").map(|_| ()));

    let dump = fs.dump("/docs/readme").unwrap();
    assert!(dump.contains("File size: 5."));
    let dump = fs.dump("/").unwrap();
    assert!(dump.contains("Name: docs"));
    assert!(dump.contains("Name: notes"));
}

#[test]
fn root_fills_up() {
    let fs = FileSystem::format(RamDisk::new(BLOCKS), BLOCKS).unwrap();
    let mut fs = fs.lock();
    for i in 0..sector_fs::NUM_DIR_ENTRIES {
        fs.create(&format!("/f{i}"), 0).unwrap();
    }
    let free = fs.free_blocks();

    assert_eq!(Err(FsError::DirectoryFull), fs.create("/overflow", 0));
    assert_eq!(Err(FsError::DirectoryFull), fs.mkdir("/overflow"));
    assert_eq!(free, fs.free_blocks());
}
