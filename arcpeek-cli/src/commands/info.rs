//! Info command implementation.

use super::unsupported;
use crate::utils::{CliResult, GlobalOptions, format_size, load_file, savings};
use arcpeek_archive::ArchiveFormat;
use arcpeek_archive::gzip::{self, GzipHeader, flags};
use arcpeek_archive::zip::ZipArchive;
use std::path::Path;

pub fn cmd_info(archive: &Path, options: &GlobalOptions) -> CliResult {
    let data = load_file(archive)?;
    let format = ArchiveFormat::from_magic(&data);

    println!("Archive Information");
    println!("===================");
    println!("File: {}", archive.display());
    println!("Format: {}", format);
    println!("Size: {} ({} bytes)", format_size(data.len() as u64), data.len());
    println!("MIME type: {}", format.mime_type());

    match format {
        ArchiveFormat::Zip => {
            let zip = ZipArchive::open_with_options(&data, options.decode_options())?;
            let eocd = zip.eocd();
            let entries = zip.entries();

            println!();
            println!("End of Central Directory:");
            println!("  Offset: {}", eocd.offset);
            println!("  Zip64: {}", if eocd.zip64 { "yes" } else { "no" });
            println!(
                "  Disk: {} (central directory on {})",
                eocd.disk_number, eocd.central_directory_disk
            );
            println!(
                "  Central directory: {} bytes at offset {}",
                eocd.central_directory_size, eocd.central_directory_offset
            );
            println!("  Recorded entries: {}", eocd.total_entries);
            if !eocd.comment.is_empty() {
                println!("  Comment: {}", eocd.comment_text());
            }

            let total_size: u64 = entries.iter().map(|e| e.uncompressed_size).sum();
            let total_compressed: u64 = entries.iter().map(|e| e.compressed_size).sum();
            let directories = entries.iter().filter(|e| e.is_dir()).count();
            let encrypted = entries.iter().filter(|e| e.flags.is_encrypted()).count();

            println!();
            println!("Contents:");
            println!("  Files: {}", entries.len() - directories);
            println!("  Directories: {}", directories);
            if encrypted > 0 {
                println!("  Encrypted: {}", encrypted);
            }
            println!("  Total size: {} bytes", total_size);
            println!("  Compressed size: {} bytes", total_compressed);
            if let Some(ratio) = savings(total_size, total_compressed) {
                println!("  Compression ratio: {:.1}%", ratio);
            }
        }
        ArchiveFormat::Gzip => {
            let file = gzip::decompress_with_options(&data, options.decode_options())?;
            print_gzip_header(&file.header);

            println!();
            println!("Contents:");
            println!("  Members: {}", file.members);
            println!("  Uncompressed size: {} bytes", file.data.len());
            if let Some(ratio) = savings(file.data.len() as u64, data.len() as u64) {
                println!("  Compression ratio: {:.1}%", ratio);
            }
        }
        ArchiveFormat::Unknown => return unsupported(format),
    }

    Ok(())
}

fn print_gzip_header(header: &GzipHeader) {
    println!();
    println!("GZIP Header:");
    println!("  Method: {}", header.method_name());
    println!("  Flags: {}", describe_flags(header.flags));
    match header.modified() {
        Some(mtime) => println!("  Modification time: {} (Unix timestamp)", mtime),
        None => println!("  Modification time: not recorded"),
    }
    println!("  Compression level: {}", header.compression_level());
    println!("  Operating system: {}", header.os);
    if let Some(name) = &header.filename {
        println!("  Original filename: {}", name);
    }
    if let Some(comment) = &header.comment {
        println!("  Comment: {}", comment);
    }
    if let Some(extra) = &header.extra {
        println!("  Extra field: {} bytes", extra.len());
    }
    if let Some(crc) = header.header_crc {
        println!("  Header CRC-16: {:04x}", crc);
    }
}

fn describe_flags(bits: u8) -> String {
    let names: Vec<&str> = [
        (flags::FTEXT, "FTEXT"),
        (flags::FHCRC, "FHCRC"),
        (flags::FEXTRA, "FEXTRA"),
        (flags::FNAME, "FNAME"),
        (flags::FCOMMENT, "FCOMMENT"),
    ]
    .into_iter()
    .filter(|(bit, _)| bits & bit != 0)
    .map(|(_, name)| name)
    .collect();

    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_flags() {
        assert_eq!(describe_flags(0), "none");
        assert_eq!(describe_flags(flags::FNAME | flags::FTEXT), "FTEXT, FNAME");
    }
}
