//! Extract command implementation.

use super::tree::default_name;
use super::unsupported;
use crate::utils::{
    CliResult, GlobalOptions, create_progress_bar, decode_files, load_file, safe_join,
};
use arcpeek_archive::zip::CentralDirectoryEntry;
use arcpeek_archive::{ArchiveFormat, ZipArchive, gzip};
use filetime::FileTime;
use std::fs;
use std::path::Path;

pub fn cmd_extract(
    archive: &Path,
    output: &Path,
    files: &[String],
    verbose: bool,
    progress: bool,
    options: &GlobalOptions,
) -> CliResult {
    let data = load_file(archive)?;
    let format = ArchiveFormat::from_magic(&data);

    println!("Extracting {} to {}", archive.display(), output.display());

    let should_extract = |name: &str| -> bool {
        files.is_empty()
            || files.iter().any(|f| {
                let f = f.trim_end_matches('/');
                name == f || name.starts_with(&format!("{}/", f))
            })
    };

    match format {
        ArchiveFormat::Zip => {
            let tree = ZipArchive::open_with_options(&data, options.decode_options())?.into_tree();

            // Explicit directory entries exist even when empty
            for entry in tree.archive().entries().iter().filter(|e| e.is_dir()) {
                let name = entry.name.trim_end_matches('/');
                if !should_extract(name) {
                    continue;
                }
                if let Some(dir_path) = safe_join(output, name) {
                    fs::create_dir_all(&dir_path)?;
                    if verbose {
                        println!("  Created: {}", entry.name);
                    }
                }
            }

            let selected: Vec<_> = tree
                .file_nodes()
                .into_iter()
                .filter(|file| should_extract(file.path()))
                .collect();
            let pb = create_progress_bar(selected.len() as u64, progress);
            pb.set_message("files");

            let mut failures = 0usize;
            for (file, result) in decode_files(&tree, selected, options.jobs, &pb)? {
                let contents = match result {
                    Ok(contents) => contents,
                    Err(e) => {
                        pb.suspend(|| println!("  FAILED: {} - {}", file.path(), e));
                        failures += 1;
                        continue;
                    }
                };
                let Some(file_path) = safe_join(output, file.path()) else {
                    log::warn!("skipping {}: no usable path components", file.path());
                    continue;
                };
                if let Some(parent) = file_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&file_path, contents)?;
                if let Some(entry) = tree.entry(file) {
                    restore_metadata(&file_path, entry)?;
                }
                if verbose {
                    pb.suspend(|| {
                        println!("  Extracted: {} ({} bytes)", file.path(), contents.len())
                    });
                }
            }
            pb.finish_with_message("Done");

            if failures > 0 {
                return Err(format!("{} entries could not be extracted", failures).into());
            }
        }
        ArchiveFormat::Gzip => {
            let pb = create_progress_bar(1, progress);
            pb.set_message("Decompressing");

            let file = gzip::decompress_with_options(&data, options.decode_options())?;
            let out_name = file
                .header
                .filename
                .clone()
                .unwrap_or_else(|| default_name(archive));

            if should_extract(&out_name) {
                let Some(out_path) = safe_join(output, &out_name) else {
                    return Err(format!("unusable output name: {:?}", out_name).into());
                };
                fs::create_dir_all(output)?;
                fs::write(&out_path, &file.data)?;
                if let Some(mtime) = file.header.modified() {
                    filetime::set_file_mtime(&out_path, FileTime::from_unix_time(mtime.into(), 0))?;
                }
                if verbose {
                    pb.suspend(|| {
                        println!("  Extracted: {} ({} bytes)", out_name, file.data.len())
                    });
                }
            } else if verbose {
                pb.suspend(|| println!("  Skipped: {} (filtered)", out_name));
            }
            pb.inc(1);
            pb.finish_with_message("Done");
        }
        ArchiveFormat::Unknown => return unsupported(format),
    }

    Ok(())
}

/// Apply the entry's modification time and, for Unix-made entries, its
/// permission bits.
fn restore_metadata(path: &Path, entry: &CentralDirectoryEntry) -> CliResult {
    if let Some(secs) = entry.modified().to_unix_timestamp() {
        filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0))?;
    }

    #[cfg(unix)]
    if let Some(mode) = entry.unix_mode().filter(|mode| mode & 0o777 != 0) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))?;
    }

    Ok(())
}
