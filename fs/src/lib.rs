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

//! A flat FAT-style file system inside a single disk-image file.
//!
//! The image is three fixed regions back to back: a 4096-entry allocation
//! table, a 128-slot directory, and 4096 data blocks of 512 bytes. Block 0
//! is reserved and never allocated. All 32-bit fields are little-endian.

use flatdisk_ds::DataStorage;
use log::error;

pub use flatdisk_err::{Error, FsError, Result};

pub use crate::{
    dir::{encode_name, DirEntry},
    fat::{ChainWalk, Fat},
};

pub mod dir;
pub mod fat;

mod defrag;
mod dump;
mod ops;

pub const BLOCK_SIZE: usize = 512;
pub const BLOCK_COUNT: usize = 4096;
pub const DIR_ENTRIES: usize = 128;
pub const DIR_ENTRY_SIZE: usize = 256;
pub const NAME_LEN: usize = 248;

pub const FAT_OFFSET: u64 = 0;
pub const FAT_SIZE: usize = BLOCK_COUNT * size_of::<u32>();
pub const DIR_OFFSET: u64 = FAT_SIZE as u64;
pub const DIR_SIZE: usize = DIR_ENTRIES * DIR_ENTRY_SIZE;
pub const DATA_OFFSET: u64 = DIR_OFFSET + DIR_SIZE as u64;
pub const DATA_SIZE: usize = BLOCK_COUNT * BLOCK_SIZE;
pub const IMAGE_SIZE: usize = FAT_SIZE + DIR_SIZE + DATA_SIZE;

/// Table value marking the last block of a chain. Entry 0 always holds it.
pub const CHAIN_END: u32 = 0xFFFF_FFFF;
/// Table value of an unallocated block.
pub const FREE: u32 = 0;

/// A disk image over some [`DataStorage`]. Every operation opens with the
/// state on storage and leaves its result there; the only state held here
/// is the storage handle itself.
pub struct Image<DS: DataStorage> {
    pub(crate) storage: DS,
}

impl<DS: DataStorage> Image<DS> {
    pub fn new(storage: DS) -> Self {
        Self { storage }
    }

    /// Read from the start of a data block. `buffer` may be shorter than a
    /// block to fetch a prefix; it must not be longer.
    pub fn read_block(&self, index: u32, buffer: &mut [u8]) -> Result<()> {
        debug_assert!(buffer.len() <= BLOCK_SIZE);
        self.storage.read(block_offset(index)?, buffer)
    }

    pub fn write_block(&self, index: u32, buffer: &[u8]) -> Result<()> {
        debug_assert!(buffer.len() <= BLOCK_SIZE);
        self.storage.write(block_offset(index)?, buffer)
    }
}

fn block_offset(index: u32) -> Result<u64> {
    if index as usize >= BLOCK_COUNT {
        error!("Block index ({index}) shall be within [0, {BLOCK_COUNT})");
        return Err(FsError::InvalidBlockIndex(index).into());
    }
    Ok(DATA_OFFSET + u64::from(index) * BLOCK_SIZE as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_adjacent() {
        assert_eq!(DIR_OFFSET, 16384);
        assert_eq!(DATA_OFFSET, 49152);
        assert_eq!(IMAGE_SIZE, 2146304);
    }

    #[test]
    fn block_offsets() {
        assert_eq!(block_offset(0).unwrap(), DATA_OFFSET);
        assert_eq!(block_offset(1).unwrap(), DATA_OFFSET + 512);
        assert!(matches!(
            block_offset(BLOCK_COUNT as u32),
            Err(Error::Fs(FsError::InvalidBlockIndex(_)))
        ));
    }
}
