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
use log::error;
use zerocopy::{little_endian::U32, IntoBytes};

use crate::{FsError, Result, BLOCK_COUNT, CHAIN_END, FAT_OFFSET, FREE};

/// The in-memory allocation table. Mutations stay in memory until
/// [`Fat::store`] writes the whole table back in one contiguous write; no
/// partial update ever reaches storage.
#[derive(Clone)]
pub struct Fat {
    entries: [U32; BLOCK_COUNT],
}

impl Fat {
    /// Fresh table: entry 0 reserved, every other block free.
    pub fn formatted() -> Self {
        let mut entries = [U32::new(FREE); BLOCK_COUNT];
        entries[0] = U32::new(CHAIN_END);
        Self { entries }
    }

    pub fn load<DS: DataStorage>(storage: &DS) -> Result<Self> {
        let mut fat = Self {
            entries: [U32::new(0); BLOCK_COUNT],
        };
        storage.read(FAT_OFFSET, fat.entries.as_mut_bytes())?;
        Ok(fat)
    }

    pub fn store<DS: DataStorage>(&self, storage: &DS) -> Result<()> {
        storage.write(FAT_OFFSET, self.entries.as_bytes())
    }

    pub fn get(&self, index: u32) -> u32 {
        self.entries[index as usize].get()
    }

    pub fn set(&mut self, index: u32, value: u32) {
        self.entries[index as usize] = U32::new(value);
    }

    pub fn entries(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|entry| entry.get())
    }

    /// Iterate the chain starting at `start`, yielding every block index up
    /// to and including the terminal block.
    pub fn walk(&self, start: u32) -> ChainWalk<'_> {
        ChainWalk {
            fat: self,
            next: Some(start),
            steps: 0,
        }
    }

    /// First-fit allocation of `count` blocks, ascending from block 1,
    /// linked into a chain ending in [`CHAIN_END`]. The scan completes
    /// before any entry is touched, so exhaustion mutates nothing.
    pub fn allocate(&mut self, count: usize) -> Result<Vec<u32>> {
        let chain: Vec<u32> = (1..BLOCK_COUNT as u32)
            .filter(|&index| self.get(index) == FREE)
            .take(count)
            .collect();
        if chain.len() < count {
            error!("{count} blocks requested, {} free", chain.len());
            return Err(FsError::OutOfSpace.into());
        }
        for pair in chain.windows(2) {
            self.set(pair[0], pair[1]);
        }
        if let Some(&last) = chain.last() {
            self.set(last, CHAIN_END);
        }
        Ok(chain)
    }

    /// Release the chain starting at `start`, the terminal block included.
    /// The chain is walked in full first; a corrupt chain fails before any
    /// entry is cleared.
    pub fn free(&mut self, start: u32) -> Result<()> {
        let chain = self.walk(start).collect::<Result<Vec<u32>>>()?;
        for block in chain {
            self.set(block, FREE);
        }
        Ok(())
    }
}

/// Lazy chain iterator. A successor of 0 or past the table, or more than
/// [`BLOCK_COUNT`] steps (a cycle), surfaces as [`FsError::CorruptChain`]
/// naming the offending index.
pub struct ChainWalk<'fat> {
    fat: &'fat Fat,
    next: Option<u32>,
    steps: usize,
}

impl Iterator for ChainWalk<'_> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if current == 0 || current as usize >= BLOCK_COUNT {
            error!("Chain runs into invalid block {current}");
            return Some(Err(FsError::CorruptChain(current).into()));
        }
        if self.steps >= BLOCK_COUNT {
            error!("Chain exceeds {BLOCK_COUNT} blocks, assuming a cycle");
            return Some(Err(FsError::CorruptChain(current).into()));
        }
        self.steps += 1;
        match self.fat.get(current) {
            CHAIN_END => {}
            successor => self.next = Some(successor),
        }
        Some(Ok(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn formatted_reserves_entry_zero() {
        let fat = Fat::formatted();
        assert_eq!(fat.get(0), CHAIN_END);
        assert!((1..BLOCK_COUNT as u32).all(|index| fat.get(index) == FREE));
    }

    #[test]
    fn allocate_links_ascending_chain() {
        let mut fat = Fat::formatted();
        let chain = fat.allocate(3).unwrap();
        assert_eq!(chain, vec![1, 2, 3]);
        assert_eq!(fat.get(1), 2);
        assert_eq!(fat.get(2), 3);
        assert_eq!(fat.get(3), CHAIN_END);
    }

    #[test]
    fn allocate_skips_taken_blocks() {
        let mut fat = Fat::formatted();
        fat.set(1, CHAIN_END);
        fat.set(3, CHAIN_END);
        assert_eq!(fat.allocate(2).unwrap(), vec![2, 4]);
    }

    #[test]
    fn exhaustion_leaves_table_untouched() {
        let mut fat = Fat::formatted();
        for index in 1..BLOCK_COUNT as u32 {
            fat.set(index, CHAIN_END);
        }
        fat.set(7, FREE);
        assert!(matches!(
            fat.allocate(2),
            Err(Error::Fs(FsError::OutOfSpace))
        ));
        assert_eq!(fat.get(7), FREE);
    }

    #[test]
    fn walk_visits_terminal() {
        let mut fat = Fat::formatted();
        fat.set(5, 9);
        fat.set(9, CHAIN_END);
        let blocks: Vec<u32> = fat.walk(5).collect::<Result<_>>().unwrap();
        assert_eq!(blocks, vec![5, 9]);
    }

    #[test]
    fn walk_rejects_free_successor() {
        let mut fat = Fat::formatted();
        fat.set(5, 6);
        let walked: Result<Vec<u32>> = fat.walk(5).collect();
        assert!(matches!(walked, Err(Error::Fs(FsError::CorruptChain(_)))));
    }

    #[test]
    fn walk_rejects_out_of_range_successor() {
        let mut fat = Fat::formatted();
        fat.set(5, BLOCK_COUNT as u32);
        let walked: Result<Vec<u32>> = fat.walk(5).collect();
        assert!(matches!(walked, Err(Error::Fs(FsError::CorruptChain(_)))));
    }

    #[test]
    fn walk_cycle_guard_trips() {
        let mut fat = Fat::formatted();
        fat.set(1, 2);
        fat.set(2, 1);
        let walked: Result<Vec<u32>> = fat.walk(1).collect();
        assert!(matches!(walked, Err(Error::Fs(FsError::CorruptChain(_)))));
    }

    #[test]
    fn free_reclaims_terminal_block() {
        let mut fat = Fat::formatted();
        let chain = fat.allocate(4).unwrap();
        fat.free(chain[0]).unwrap();
        for block in chain {
            assert_eq!(fat.get(block), FREE);
        }
    }

    #[test]
    fn free_leaves_corrupt_chain_untouched() {
        let mut fat = Fat::formatted();
        fat.set(1, 9999);
        assert!(fat.free(1).is_err());
        assert_eq!(fat.get(1), 9999);
    }

    #[test]
    fn freed_blocks_are_reallocated_first_fit() {
        let mut fat = Fat::formatted();
        let first = fat.allocate(2).unwrap();
        fat.allocate(2).unwrap();
        fat.free(first[0]).unwrap();
        assert_eq!(fat.allocate(3).unwrap(), vec![1, 2, 5]);
    }
}
