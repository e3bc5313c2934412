mod cli;

use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Command};
use sector_fs::{BLOCK_SIZE, BlockDevice, FileSystem};
use sector_fs_fuse::{BlockFile, cat, io_error, put};

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Format { blocks } => format(&cli.image, blocks),
        command => run(&cli.image, command),
    }
}

fn format(image: &Path, blocks: usize) -> io::Result<()> {
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(image)?;
    fd.set_len((blocks * BLOCK_SIZE) as u64)?;

    let block_file: Arc<dyn BlockDevice> = Arc::new(BlockFile::new(fd));
    let fs = FileSystem::format(block_file, blocks).map_err(io_error)?;
    println!(
        "image={image:?} blocks={blocks} free={}",
        fs.lock().free_blocks()
    );
    Ok(())
}

fn run(image: &Path, command: Command) -> io::Result<()> {
    let fd = OpenOptions::new().read(true).write(true).open(image)?;
    let block_file: Arc<dyn BlockDevice> = Arc::new(BlockFile::new(fd));
    let fs = FileSystem::open(block_file);
    let mut fs = fs.lock();

    match command {
        Command::Format { .. } => {}
        Command::Mkdir { path } => fs.mkdir(&path).map_err(io_error)?,
        Command::Put { source, path } => {
            let data = fs::read(&source)?;
            log::info!("put {source:?} -> {path:?}, {} bytes", data.len());
            put(&mut fs, &path, &data)?;
        }
        Command::Cat { path } => io::stdout().write_all(&cat(&fs, &path)?)?,
        Command::Ls { path, recursive } => {
            if recursive {
                print!("{}", fs.recursive_list(&path).map_err(io_error)?);
            } else {
                for (number, entry) in fs.list(&path).map_err(io_error)?.iter().enumerate() {
                    let kind = if entry.is_file() { 'F' } else { 'D' };
                    println!("[{number}] {} {kind}", entry.name());
                }
            }
        }
        Command::Rm { path, recursive } => fs.remove(&path, recursive).map_err(io_error)?,
        Command::Dump { path } => print!("{}", fs.dump(&path).map_err(io_error)?),
    }

    Ok(())
}
