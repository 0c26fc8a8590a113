//! Cat command implementation.

use super::unsupported;
use crate::utils::{CliResult, GlobalOptions, load_file};
use arcpeek_archive::{ArchiveFormat, ZipArchive, gzip};
use std::io::Write;
use std::path::Path;

pub fn cmd_cat(archive: &Path, entry: Option<&str>, options: &GlobalOptions) -> CliResult {
    let data = load_file(archive)?;
    let format = ArchiveFormat::from_magic(&data);
    let decode_options = options.decode_options();

    let mut stdout = std::io::stdout().lock();
    match format {
        ArchiveFormat::Zip => {
            let Some(path) = entry else {
                return Err("an entry path is required for ZIP archives".into());
            };
            let tree = ZipArchive::open_with_options(&data, decode_options)?.into_tree();
            stdout.write_all(tree.read(path)?)?;
        }
        ArchiveFormat::Gzip => {
            if entry.is_some() {
                log::warn!("GZIP files hold a single stream; ignoring the entry path");
            }
            let file = gzip::decompress_with_options(&data, decode_options)?;
            stdout.write_all(&file.data)?;
        }
        ArchiveFormat::Unknown => return unsupported(format),
    }
    stdout.flush()?;

    Ok(())
}
