use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Build and inspect sector-fs disk images")]
pub struct Cli {
    /// Disk image holding the volume
    #[arg(long, short, default_value = "fs.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty volume, replacing the image
    Format {
        /// Size of the volume in blocks
        #[arg(long, short, default_value_t = 4096)]
        blocks: usize,
    },

    /// Create an empty directory
    Mkdir { path: String },

    /// Copy a host file into the volume
    Put { source: PathBuf, path: String },

    /// Print a file
    Cat { path: String },

    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,

        /// Descend into subdirectories
        #[arg(long, short)]
        recursive: bool,
    },

    /// Remove a file or directory
    Rm {
        path: String,

        /// Remove directories and their contents
        #[arg(long, short)]
        recursive: bool,
    },

    /// Print headers and raw contents
    Dump {
        #[arg(default_value = "/")]
        path: String,
    },
}
