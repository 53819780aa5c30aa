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

use crate::{
    dir::{encode_name, DirEntry},
    fat::Fat,
    FsError, Image, Result, BLOCK_SIZE, DIR_ENTRIES, DIR_OFFSET, DIR_SIZE, NAME_LEN,
};

impl<DS: DataStorage> Image<DS> {
    /// Reset the allocation table and every directory slot. Data blocks
    /// keep whatever bytes they hold.
    pub fn format(&self) -> Result<()> {
        Fat::formatted().store(&self.storage)?;
        self.storage.write(DIR_OFFSET, &vec![0; DIR_SIZE])
    }

    /// Store `data` in the image under `name` (silently truncated to the
    /// name-field limit). Space is claimed and the table persisted before
    /// the first data block is written; there is no rollback past that
    /// point.
    pub fn import(&self, name: &str, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(FsError::EmptyFile(name.into()).into());
        }
        let blocks = data.len().div_ceil(BLOCK_SIZE);
        let mut fat = Fat::load(&self.storage)?;
        let chain = fat.allocate(blocks)?;
        fat.store(&self.storage)?;

        let mut buffer = [0; BLOCK_SIZE];
        for (index, &block) in chain.iter().enumerate() {
            let chunk = &data[index * BLOCK_SIZE..data.len().min((index + 1) * BLOCK_SIZE)];
            buffer[..chunk.len()].copy_from_slice(chunk);
            buffer[chunk.len()..].fill(0);
            self.write_block(block, &buffer)?;
        }

        let slot = self.find_free_slot()?;
        self.write_entry(slot, &DirEntry::new(name.as_bytes(), chain[0], data.len() as u32))
    }

    /// Read a stored file back out, following its chain to the terminal.
    pub fn export(&self, name: &str) -> Result<Vec<u8>> {
        let (_, entry) = self.find_by_name(name)?;
        if entry.first_block.get() == 0 {
            return Err(FsError::NotFound(name.into()).into());
        }
        let fat = Fat::load(&self.storage)?;
        let size = entry.size.get() as usize;
        let mut data = Vec::with_capacity(size);
        let mut buffer = [0; BLOCK_SIZE];
        for block in fat.walk(entry.first_block.get()) {
            let wanted = (size - data.len()).min(BLOCK_SIZE);
            self.read_block(block?, &mut buffer[..wanted])?;
            data.extend_from_slice(&buffer[..wanted]);
        }
        Ok(data)
    }

    /// The freed table is persisted before the slot is cleared, so an
    /// interruption leaves an orphaned chain rather than a dangling entry.
    pub fn delete(&self, name: &str) -> Result<()> {
        let (slot, entry) = self.find_by_name(name)?;
        let mut fat = Fat::load(&self.storage)?;
        fat.free(entry.first_block.get())?;
        fat.store(&self.storage)?;
        self.clear_entry(slot)
    }

    /// Copy `name` to `<name>_copy` (the base truncated so the suffix
    /// fits). Source blocks are traversed through a snapshot of the table
    /// taken before allocation: the new chain's entries overlap the working
    /// table and must not steer the source walk.
    pub fn duplicate(&self, name: &str) -> Result<String> {
        let (_, entry) = self.find_by_name(name)?;
        let new_name = copy_name(name.as_bytes());
        if self.lookup(&new_name)?.is_some() {
            return Err(
                FsError::NameCollision(String::from_utf8_lossy(&new_name).into_owned()).into(),
            );
        }

        let size = entry.size.get();
        let blocks = (size as usize).div_ceil(BLOCK_SIZE);
        let mut fat = Fat::load(&self.storage)?;
        let snapshot = fat.clone();
        let chain = fat.allocate(blocks)?;
        fat.store(&self.storage)?;

        let mut buffer = [0; BLOCK_SIZE];
        for (source, &target) in snapshot.walk(entry.first_block.get()).take(blocks).zip(&chain) {
            self.read_block(source?, &mut buffer)?;
            self.write_block(target, &buffer)?;
        }

        let slot = self.find_free_slot()?;
        let first = chain.first().copied().unwrap_or(0);
        self.write_entry(slot, &DirEntry::new(&new_name, first, size))?;
        Ok(String::from_utf8_lossy(&new_name).into_owned())
    }

    /// The collision scan covers every slot, the source's own included, so
    /// renaming a file to its current name fails too.
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        if self.lookup(new.as_bytes())?.is_some() {
            return Err(FsError::NameCollision(new.into()).into());
        }
        let (slot, _) = self.find_by_name(old)?;
        self.write_name(slot, &encode_name(new.as_bytes()))
    }

    pub fn hide(&self, name: &str) -> Result<()> {
        let (slot, _) = self.find_by_name(name)?;
        let mut hidden = Vec::with_capacity(name.len() + 1);
        hidden.push(b'.');
        hidden.extend_from_slice(name.as_bytes());
        self.write_name(slot, &encode_name(&hidden))
    }

    pub fn unhide(&self, name: &str) -> Result<()> {
        for slot in 0..DIR_ENTRIES {
            let entry = self.read_entry(slot)?;
            if entry.is_hidden() && &entry.name_bytes()[1..] == name.as_bytes() {
                return self.write_name(slot, &encode_name(name.as_bytes()));
            }
        }
        Err(FsError::NotFound(name.into()).into())
    }

    /// Exact-name membership test; hidden entries match literally.
    pub fn search(&self, name: &str) -> Result<bool> {
        for slot in 0..DIR_ENTRIES {
            let entry = self.read_entry(slot)?;
            if entry.name[0] != 0 && entry.name_bytes() == name.as_bytes() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Visible entries (non-empty name, not hidden) in slot order.
    pub fn list(&self) -> Result<Vec<(String, u32)>> {
        let mut files = Vec::new();
        for slot in 0..DIR_ENTRIES {
            let entry = self.read_entry(slot)?;
            if entry.name[0] == 0 || entry.is_hidden() {
                continue;
            }
            files.push((entry.display_name().into_owned(), entry.size.get()));
        }
        Ok(files)
    }

    /// Visible entries ordered ascending by size.
    pub fn sorted_by_size(&self) -> Result<Vec<(String, u32)>> {
        let mut files = self.list()?;
        files.sort_unstable_by_key(|&(_, size)| size);
        Ok(files)
    }
}

fn copy_name(source: &[u8]) -> Vec<u8> {
    const SUFFIX: &[u8] = b"_copy";
    let base = source.len().min(NAME_LEN - 1 - SUFFIX.len());
    let mut name = Vec::with_capacity(base + SUFFIX.len());
    name.extend_from_slice(&source[..base]);
    name.extend_from_slice(SUFFIX);
    name
}
