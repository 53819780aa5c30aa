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

use std::{env, fs, path::Path, process::ExitCode};

use flatdisk_ds_std::FileStorage;
use flatdisk_err::{Error, Result};
use flatdisk_fs::{Image, BLOCK_SIZE};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        let program = args.first().map(String::as_str).unwrap_or("flatdisk");
        eprintln!("Usage: {program} <disk> <command> [args]");
        return ExitCode::FAILURE;
    }
    match run(&args[1], &args[2], &args[3..]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(image_path: &str, command: &str, args: &[String]) -> Result<()> {
    let image = Image::new(FileStorage::open(Path::new(image_path))?);

    match (command, args) {
        ("-format", []) => {
            image.format()?;
            println!("Disk image \"{image_path}\" formatted successfully.");
        }
        ("-write", [source, name]) => {
            let data = fs::read(source)?;
            image.import(name, &data)?;
            println!(
                "Copied '{source}' -> '{name}' (size: {} bytes, {} blocks)",
                data.len(),
                data.len().div_ceil(BLOCK_SIZE)
            );
        }
        ("-read", [name, target]) => {
            let data = image.export(name)?;
            fs::write(target, &data)?;
            println!("Read '{name}' ({} bytes) -> '{target}'", data.len());
        }
        ("-delete", [name]) => {
            image.delete(name)?;
            println!("Deleted file '{name}' successfully.");
        }
        ("-list", []) => {
            for (name, size) in image.list()? {
                println!("{name}\t{size} bytes");
            }
        }
        ("-sorta", []) => {
            for (name, size) in image.sorted_by_size()? {
                println!("{name}\t{size} bytes");
            }
        }
        ("-rename", [old, new]) => {
            image.rename(old, new)?;
            println!("Renamed '{old}' -> '{new}'");
        }
        ("-duplicate", [name]) => {
            let copy = image.duplicate(name)?;
            let (_, entry) = image.find_by_name(&copy)?;
            println!("Duplicated '{name}' -> '{copy}' ({} bytes)", entry.size.get());
        }
        ("-search", [name]) => {
            println!("{}", if image.search(name)? { "YES" } else { "NO" });
        }
        ("-hide", [name]) => {
            image.hide(name)?;
            println!("Hidden '{name}'");
        }
        ("-unhide", [name]) => {
            image.unhide(name)?;
            println!("Unhidden '{name}'");
        }
        ("-printfilelist", []) => {
            fs::write("filelist.txt", image.dump_directory()?)?;
            println!("File list written to filelist.txt");
        }
        ("-printfat", []) => {
            fs::write("fat.txt", image.dump_fat()?)?;
            println!("FAT written to fat.txt");
        }
        ("-defragment", []) => {
            image.defragment()?;
            println!("Disk defragmented successfully.");
        }
        _ => return Err(Error::MalformedCommand),
    }
    Ok(())
}
