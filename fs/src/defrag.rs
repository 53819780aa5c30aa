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

use flatdisk_ds::DataStorage;
use log::debug;

use crate::{fat::Fat, FsError, Image, Result, BLOCK_COUNT, BLOCK_SIZE, CHAIN_END, DIR_ENTRIES};

struct Captured {
    slot: usize,
    data: Vec<u8>,
}

impl<DS: DataStorage> Image<DS> {
    /// Rebuild the allocation table and data region so every live file
    /// occupies a contiguous ascending run, packed in directory-slot order
    /// from block 1, with all unused blocks freed and zero-scrubbed.
    ///
    /// Every payload is read fully into memory before the first write: new
    /// runs may overlap source blocks of files captured later, and the
    /// on-disk bytes stop being trustworthy the moment rewriting begins.
    /// Interrupting the pass leaves the image indeterminate.
    pub fn defragment(&self) -> Result<()> {
        let fat = Fat::load(&self.storage)?;

        let mut captured = Vec::new();
        for slot in 0..DIR_ENTRIES {
            let entry = self.read_entry(slot)?;
            if entry.name[0] == 0 {
                continue;
            }
            let size = entry.size.get() as usize;
            let blocks = size.div_ceil(BLOCK_SIZE);
            let chain: Vec<u32> = fat
                .walk(entry.first_block.get())
                .take(blocks)
                .collect::<Result<_>>()?;
            if chain.len() < blocks {
                return Err(FsError::CorruptChain(entry.first_block.get()).into());
            }
            let mut data = vec![0; blocks * BLOCK_SIZE];
            for (index, &block) in chain.iter().enumerate() {
                self.read_block(block, &mut data[index * BLOCK_SIZE..][..BLOCK_SIZE])?;
            }
            data[size..].fill(0);
            captured.push(Captured { slot, data });
        }

        let mut fat = Fat::formatted();
        let mut next_free: u32 = 1;
        for file in &captured {
            let blocks = (file.data.len() / BLOCK_SIZE) as u32;
            for index in 0..blocks {
                let block = next_free + index;
                self.write_block(block, &file.data[index as usize * BLOCK_SIZE..][..BLOCK_SIZE])?;
                fat.set(block, if index + 1 == blocks { CHAIN_END } else { block + 1 });
            }
            self.write_first_block(file.slot, next_free)?;
            next_free += blocks;
        }
        fat.store(&self.storage)?;

        let zeroes = [0; BLOCK_SIZE];
        for block in next_free..BLOCK_COUNT as u32 {
            self.write_block(block, &zeroes)?;
        }

        debug!("{} files repacked into blocks [1, {next_free})", captured.len());
        Ok(())
    }
}
