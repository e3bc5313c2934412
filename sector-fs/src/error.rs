use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[display(fmt = "no such file or directory")]
    NameNotFound,
    #[display(fmt = "name already exists in directory")]
    DuplicateName,
    #[display(fmt = "directory has no free entry")]
    DirectoryFull,
    /// An intermediate path component is missing or is not a directory.
    #[display(fmt = "parent directory does not exist")]
    ParentPathMissing,
    #[display(fmt = "not enough free blocks")]
    OutOfSpace,
    #[display(fmt = "size exceeds the capacity of the extent tree")]
    FileTooLarge,
    #[display(fmt = "malformed path")]
    InvalidPath,
    #[display(fmt = "path component too long")]
    NameTooLong,
    #[display(fmt = "path too deep")]
    PathTooDeep,
    #[display(fmt = "not a directory")]
    NotADirectory,
    #[display(fmt = "is a directory")]
    IsADirectory,
    #[display(fmt = "directory not empty")]
    DirectoryNotEmpty,
}

pub type Result<T> = core::result::Result<T, FsError>;
