//! List command implementation.

use super::unsupported;
use crate::utils::{CliResult, GlobalOptions, load_file, savings};
use arcpeek_archive::zip::{CentralDirectoryEntry, ZipArchive};
use arcpeek_archive::{ArchiveFormat, gzip};
use serde::Serialize;
use std::path::Path;

/// JSON serializable entry data for archive listings.
#[derive(Debug, Serialize)]
struct EntryJson {
    name: String,
    size: u64,
    compressed_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    ratio: Option<f64>,
    method: String,
    crc: u32,
    modified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtime: Option<i64>,
    host: String,
    flags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extra_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    is_dir: bool,
}

impl EntryJson {
    fn from_entry(entry: &CentralDirectoryEntry) -> Self {
        let modified = entry.modified();
        Self {
            name: entry.name.clone(),
            size: entry.uncompressed_size,
            compressed_size: entry.compressed_size,
            ratio: savings(entry.uncompressed_size, entry.compressed_size),
            method: entry.method.to_string(),
            crc: entry.crc32,
            modified: modified.to_string(),
            mtime: modified.to_unix_timestamp(),
            host: entry.host_system().name().to_string(),
            flags: entry.flags.describe(),
            extra_fields: extra_field_ids(entry),
            comment: entry_comment(entry),
            is_dir: entry.is_dir(),
        }
    }
}

/// Header ids of the entry's extra field blocks, as `0x` hex.
fn extra_field_ids(entry: &CentralDirectoryEntry) -> Vec<String> {
    entry
        .extra_fields()
        .map(|(id, _)| format!("{:#06x}", id))
        .collect()
}

fn entry_comment(entry: &CentralDirectoryEntry) -> Option<String> {
    (!entry.comment.is_empty()).then(|| entry.comment_text())
}

/// JSON output for archive listing.
#[derive(Debug, Serialize)]
struct ArchiveListJson {
    archive: String,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<EntryJson>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

pub fn cmd_list(archive: &Path, verbose: bool, json: bool, options: &GlobalOptions) -> CliResult {
    let data = load_file(archive)?;
    let format = ArchiveFormat::from_magic(&data);

    if json {
        return cmd_list_json(archive, format, &data, options);
    }

    println!("Archive: {} ({})", archive.display(), format);
    println!();

    match format {
        ArchiveFormat::Zip => {
            let zip = ZipArchive::open_with_options(&data, options.decode_options())?;
            print_entries(zip.entries(), verbose);
        }
        ArchiveFormat::Gzip => {
            let file = gzip::decompress_with_options(&data, options.decode_options())?;
            let name = file.header.filename.as_deref().unwrap_or("<unnamed>");
            if verbose {
                println!("{:>10} {:>10} {:>6}  Name", "Size", "Compressed", "Ratio");
                println!("{}", "-".repeat(40));
                let ratio = savings(file.data.len() as u64, data.len() as u64)
                    .map(|r| format!("{:.1}%", r))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>10} {:>10} {:>6}  {}",
                    file.data.len(),
                    data.len(),
                    ratio,
                    name
                );
            } else {
                println!("{}", name);
            }
        }
        ArchiveFormat::Unknown => return unsupported(format),
    }

    Ok(())
}

fn cmd_list_json(
    archive: &Path,
    format: ArchiveFormat,
    data: &[u8],
    options: &GlobalOptions,
) -> CliResult {
    let mut output = ArchiveListJson {
        archive: archive.display().to_string(),
        format: format.to_string(),
        comment: None,
        entries: None,
        metadata: None,
    };

    match format {
        ArchiveFormat::Zip => {
            let zip = ZipArchive::open_with_options(data, options.decode_options())?;
            let eocd = zip.eocd();
            if !eocd.comment.is_empty() {
                output.comment = Some(eocd.comment_text());
            }
            output.entries = Some(zip.entries().iter().map(EntryJson::from_entry).collect());
            output.metadata = Some(serde_json::json!({
                "total_entries": eocd.total_entries,
                "central_directory_offset": eocd.central_directory_offset,
                "central_directory_size": eocd.central_directory_size,
                "zip64": eocd.zip64,
            }));
        }
        ArchiveFormat::Gzip => {
            let file = gzip::decompress_with_options(data, options.decode_options())?;
            let header = &file.header;
            output.comment = header.comment.clone();
            output.metadata = Some(serde_json::json!({
                "filename": header.filename,
                "size": file.data.len(),
                "compressed_size": data.len(),
                "method": header.method_name(),
                "mtime": header.modified(),
                "os": header.os.name(),
                "compression_level": header.compression_level().to_string(),
                "members": file.members,
            }));
        }
        ArchiveFormat::Unknown => return unsupported(format),
    }

    let json_output = serde_json::to_string_pretty(&output)?;
    println!("{}", json_output);
    Ok(())
}

/// Print entries in a formatted table.
fn print_entries(entries: &[CentralDirectoryEntry], verbose: bool) {
    if !verbose {
        for entry in entries {
            println!("{}", entry.name);
        }
        return;
    }

    println!(
        "{:>10} {:>10} {:>6} {:>10} {:>8}  {:19}  Name",
        "Size", "Compressed", "Ratio", "Method", "CRC-32", "Modified",
    );
    println!("{}", "-".repeat(80));

    let mut total_size = 0u64;
    let mut total_compressed = 0u64;

    for entry in entries {
        let ratio = savings(entry.uncompressed_size, entry.compressed_size)
            .map(|r| format!("{:.1}%", r))
            .unwrap_or_else(|| "-".to_string());
        let type_prefix = if entry.is_dir() {
            "d "
        } else if entry.flags.is_encrypted() {
            "* "
        } else {
            "  "
        };

        println!(
            "{:>10} {:>10} {:>6} {:>10} {:08x}  {}  {}{}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio,
            entry.method.to_string(),
            entry.crc32,
            entry.modified(),
            type_prefix,
            entry.name
        );

        let extra_ids = extra_field_ids(entry);
        if !extra_ids.is_empty() {
            println!("{:73}extra: {}", "", extra_ids.join(" "));
        }
        if let Some(comment) = entry_comment(entry) {
            println!("{:73}comment: {}", "", comment);
        }

        total_size += entry.uncompressed_size;
        total_compressed += entry.compressed_size;
    }

    println!("{}", "-".repeat(80));
    println!(
        "{:>10} {:>10} {:>5.1}%  {} entries",
        total_size,
        total_compressed,
        savings(total_size, total_compressed).unwrap_or(0.0),
        entries.len()
    );
}
