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

use std::fmt::Write;

use flatdisk_ds::DataStorage;

use crate::{fat::Fat, Image, Result, DIR_ENTRIES};

impl<DS: DataStorage> Image<DS> {
    /// One line per slot: `NNN name firstBlock fileSize`, with `NULL`
    /// standing in for an empty name field.
    pub fn dump_directory(&self) -> Result<String> {
        let mut report = String::new();
        for slot in 0..DIR_ENTRIES {
            let entry = self.read_entry(slot)?;
            let name = if entry.name[0] == 0 {
                "NULL".into()
            } else {
                entry.display_name()
            };
            let _ = writeln!(
                report,
                "{slot:03} {name} {} {}",
                entry.first_block.get(),
                entry.size.get()
            );
        }
        Ok(report)
    }

    /// All 4096 table entries as `IIII\tHHHHHHHH`, four per tab-separated
    /// row.
    pub fn dump_fat(&self) -> Result<String> {
        let fat = Fat::load(&self.storage)?;
        let mut report = String::new();
        for (index, value) in fat.entries().enumerate() {
            let _ = write!(report, "{index:04}\t{value:08X}");
            report.push(if (index + 1) % 4 == 0 { '\n' } else { '\t' });
        }
        Ok(report)
    }
}
