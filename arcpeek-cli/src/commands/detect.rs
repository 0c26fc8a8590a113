//! Detect command implementation.

use crate::utils::{CliResult, load_file};
use arcpeek_archive::ArchiveFormat;
use std::path::Path;

pub fn cmd_detect(file: &Path) -> CliResult {
    let data = load_file(file)?;
    let format = ArchiveFormat::from_magic(&data);

    println!("File: {}", file.display());
    println!("Format: {}", format);
    if format != ArchiveFormat::Unknown {
        println!("Extension: .{}", format.extension());
    }
    println!("MIME type: {}", format.mime_type());
    println!("Magic bytes: {:02X?}", &data[..data.len().min(16)]);

    match format {
        ArchiveFormat::Zip => println!("Type: Archive (multiple files)"),
        ArchiveFormat::Gzip => println!("Type: Compression (single file)"),
        ArchiveFormat::Unknown => {}
    }

    Ok(())
}
