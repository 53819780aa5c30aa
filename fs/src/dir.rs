// Copyright 2025 The flatdisk Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::borrow::Cow;

use flatdisk_ds::DataStorage;
use zerocopy::{little_endian::U32, FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::{FsError, Image, Result, DIR_ENTRIES, DIR_ENTRY_SIZE, DIR_OFFSET, NAME_LEN};

/// One directory slot, exactly as stored on disk.
///
/// A slot counts as free when the name is empty **or** the first block is
/// 0; clearing a slot zeroes all 256 bytes so both markers hold.
#[repr(C)]
#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DirEntry {
    /// Zero-terminated, zero-padded byte string. Empty marks the slot free.
    pub name: [u8; NAME_LEN],
    /// First data block of the chain; 0 marks the slot free.
    pub first_block: U32,
    /// Size in bytes.
    pub size: U32,
}

impl DirEntry {
    pub fn new(name: &[u8], first_block: u32, size: u32) -> Self {
        Self {
            name: encode_name(name),
            first_block: U32::new(first_block),
            size: U32::new(size),
        }
    }

    /// Name bytes up to the zero terminator.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&byte| byte == 0).unwrap_or(NAME_LEN);
        &self.name[..end]
    }

    pub fn display_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    pub fn is_free(&self) -> bool {
        self.name[0] == 0 || self.first_block.get() == 0
    }

    /// A leading `.` keeps the entry out of listings; lookups by the dotted
    /// name still reach it.
    pub fn is_hidden(&self) -> bool {
        self.name[0] == b'.'
    }
}

/// Truncate to at most 247 name bytes and zero-pad the rest of the field.
/// Comparisons over the field stay well-defined only while the padding is
/// all zero.
pub fn encode_name(name: &[u8]) -> [u8; NAME_LEN] {
    let mut field = [0; NAME_LEN];
    let len = name.len().min(NAME_LEN - 1);
    field[..len].copy_from_slice(&name[..len]);
    field
}

fn entry_offset(slot: usize) -> u64 {
    DIR_OFFSET + (slot * DIR_ENTRY_SIZE) as u64
}

impl<DS: DataStorage> Image<DS> {
    pub fn read_entry(&self, slot: usize) -> Result<DirEntry> {
        let mut entry = DirEntry::new_zeroed();
        self.storage.read(entry_offset(slot), entry.as_mut_bytes())?;
        Ok(entry)
    }

    pub fn write_entry(&self, slot: usize, entry: &DirEntry) -> Result<()> {
        self.storage.write(entry_offset(slot), entry.as_bytes())
    }

    pub fn clear_entry(&self, slot: usize) -> Result<()> {
        self.write_entry(slot, &DirEntry::new_zeroed())
    }

    pub(crate) fn write_name(&self, slot: usize, name: &[u8; NAME_LEN]) -> Result<()> {
        self.storage.write(entry_offset(slot), name)
    }

    pub(crate) fn write_first_block(&self, slot: usize, block: u32) -> Result<()> {
        self.storage
            .write(entry_offset(slot) + NAME_LEN as u64, U32::new(block).as_bytes())
    }

    /// Linear scan for an exact name match; the first match wins.
    pub fn find_by_name(&self, name: &str) -> Result<(usize, DirEntry)> {
        self.lookup(name.as_bytes())?
            .ok_or_else(|| FsError::NotFound(name.into()).into())
    }

    pub(crate) fn lookup(&self, name: &[u8]) -> Result<Option<(usize, DirEntry)>> {
        for slot in 0..DIR_ENTRIES {
            let entry = self.read_entry(slot)?;
            if entry.name_bytes() == name {
                return Ok(Some((slot, entry)));
            }
        }
        Ok(None)
    }

    /// A slot counts as free when its first-block field is 0.
    pub fn find_free_slot(&self) -> Result<usize> {
        for slot in 0..DIR_ENTRIES {
            if self.read_entry(slot)?.first_block.get() == 0 {
                return Ok(slot);
            }
        }
        Err(FsError::DirectoryFull.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_truncates_and_pads() {
        let field = encode_name(&[b'a'; 300]);
        assert!(field[..NAME_LEN - 1].iter().all(|&byte| byte == b'a'));
        assert_eq!(field[NAME_LEN - 1], 0);

        let short = encode_name(b"notes.txt");
        assert_eq!(&short[..9], b"notes.txt");
        assert!(short[9..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn free_markers() {
        assert!(DirEntry::new_zeroed().is_free());
        assert!(DirEntry::new(b"x", 0, 0).is_free());
        assert!(DirEntry::new(b"", 3, 0).is_free());
        assert!(!DirEntry::new(b"x", 3, 0).is_free());
    }

    #[test]
    fn hidden_prefix() {
        assert!(DirEntry::new(b".secret", 1, 1).is_hidden());
        assert!(!DirEntry::new(b"secret", 1, 1).is_hidden());
    }

    #[test]
    fn name_bytes_stop_at_terminator() {
        let entry = DirEntry::new(b"report", 1, 10);
        assert_eq!(entry.name_bytes(), b"report");
    }

    #[test]
    fn on_disk_layout() {
        assert_eq!(size_of::<DirEntry>(), DIR_ENTRY_SIZE);
        let entry = DirEntry::new(b"a", 7, 9);
        let bytes = entry.as_bytes();
        assert_eq!(&bytes[248..252], 7u32.to_le_bytes().as_slice());
        assert_eq!(&bytes[252..256], 9u32.to_le_bytes().as_slice());
    }
}
