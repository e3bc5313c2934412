use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};

use crate::{NAME_MAX_LEN, SectorId};

/// One binding of a directory table
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirEntry {
    #[br(map = |raw: u8| raw != 0)]
    #[bw(map = |flag: &bool| u8::from(*flag))]
    in_use: bool,
    #[br(map = |raw: u8| raw != 0)]
    #[bw(map = |flag: &bool| u8::from(*flag))]
    is_file: bool,
    /// Sector of the entry's extent header
    location: SectorId,
    // the last byte is reserved for \0
    name: [u8; NAME_MAX_LEN + 1],
}

impl DirEntry {
    /// An entry always occupies 32 bytes
    pub const SIZE: usize = 2 + 4 + NAME_MAX_LEN + 1;

    /// `name` must already be validated to fit [`NAME_MAX_LEN`].
    pub fn new(name: &str, location: SectorId, is_file: bool) -> Self {
        let bytes = name.as_bytes();
        debug_assert!(bytes.len() <= NAME_MAX_LEN);
        let mut raw = [0; NAME_MAX_LEN + 1];
        raw[..bytes.len()].copy_from_slice(bytes);

        Self {
            in_use: true,
            is_file,
            location,
            name: raw,
        }
    }

    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(NAME_MAX_LEN);
        core::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }

    #[inline]
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.is_file
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        !self.is_file
    }

    #[inline]
    pub fn location(&self) -> SectorId {
        self.location
    }

    /// Frees the slot; the rest of the record is left as tombstone data.
    #[inline]
    pub fn release(&mut self) {
        self.in_use = false;
    }

    pub fn decode(raw: &[u8]) -> Self {
        Self::read(&mut Cursor::new(raw)).expect("directory entry record is 32 bytes")
    }

    pub fn encode(&self, raw: &mut [u8]) {
        self.write(&mut Cursor::new(raw))
            .expect("directory entry record is 32 bytes");
    }
}
