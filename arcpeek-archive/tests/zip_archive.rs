use arcpeek_archive::zip::{ArchiveTree, CompressionMethod, ZipArchive, read_zip};
use arcpeek_archive::{ArchiveFormat, TreeNode};
use arcpeek_core::{Crc32, DecodeOptions, ErrorKind};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

/// Minimal ZIP writer for building test archives.
struct ZipBuilder {
    data: Vec<u8>,
    central: Vec<u8>,
    central_offsets: Vec<usize>,
    count: u16,
}

impl ZipBuilder {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            central: Vec::new(),
            central_offsets: Vec::new(),
            count: 0,
        }
    }

    fn stored(&mut self, name: &str, content: &[u8]) -> &mut Self {
        self.add(name, 0, content, content.to_vec())
    }

    fn deflated(&mut self, name: &str, content: &[u8]) -> &mut Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        let compressed = encoder.finish().unwrap();
        self.add(name, 8, content, compressed)
    }

    fn add(&mut self, name: &str, method: u16, content: &[u8], payload: Vec<u8>) -> &mut Self {
        let offset = self.data.len() as u32;
        let mut fields = Vec::new();
        fields.extend_from_slice(&0x0800u16.to_le_bytes());
        fields.extend_from_slice(&method.to_le_bytes());
        fields.extend_from_slice(&0x6000u16.to_le_bytes());
        fields.extend_from_slice(&0x5221u16.to_le_bytes());
        fields.extend_from_slice(&Crc32::compute(content).to_le_bytes());
        fields.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        fields.extend_from_slice(&(content.len() as u32).to_le_bytes());
        fields.extend_from_slice(&(name.len() as u16).to_le_bytes());
        fields.extend_from_slice(&0u16.to_le_bytes());

        self.data.extend_from_slice(b"PK\x03\x04");
        self.data.extend_from_slice(&20u16.to_le_bytes());
        self.data.extend_from_slice(&fields);
        self.data.extend_from_slice(name.as_bytes());
        self.data.extend_from_slice(&payload);

        self.central_offsets.push(self.central.len());
        self.central.extend_from_slice(b"PK\x01\x02");
        self.central.extend_from_slice(&0x031Eu16.to_le_bytes());
        self.central.extend_from_slice(&20u16.to_le_bytes());
        self.central.extend_from_slice(&fields);
        self.central.extend_from_slice(&0u16.to_le_bytes()); // comment
        self.central.extend_from_slice(&0u16.to_le_bytes()); // disk
        self.central.extend_from_slice(&0u16.to_le_bytes()); // internal
        self.central.extend_from_slice(&(0o100644u32 << 16).to_le_bytes());
        self.central.extend_from_slice(&offset.to_le_bytes());
        self.central.extend_from_slice(name.as_bytes());
        self.count += 1;
        self
    }

    /// Archive bytes and the absolute offset of each central record.
    fn finish(&self) -> (Vec<u8>, Vec<usize>) {
        let mut out = self.data.clone();
        let cd_offset = out.len();
        out.extend_from_slice(&self.central);
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&(self.central.len() as u32).to_le_bytes());
        out.extend_from_slice(&(cd_offset as u32).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());

        let offsets = self
            .central_offsets
            .iter()
            .map(|offset| cd_offset + offset)
            .collect();
        (out, offsets)
    }
}

fn hello_archive() -> (Vec<u8>, Vec<usize>) {
    ZipBuilder::new()
        .stored("a.txt", b"hi")
        .deflated("dir/b.txt", "hello world".repeat(10).as_bytes())
        .finish()
}

#[test]
fn test_two_entry_archive() {
    let (data, _) = hello_archive();
    assert_eq!(ArchiveFormat::from_magic(&data), ArchiveFormat::Zip);

    let tree = read_zip(&data).unwrap();
    let root = tree.root().as_directory().unwrap();
    assert_eq!(root.children().len(), 2);

    let files: Vec<_> = root.children().iter().filter(|c| c.is_file()).collect();
    let dirs: Vec<_> = root.children().iter().filter(|c| !c.is_file()).collect();
    assert_eq!(files.len(), 1);
    assert_eq!(dirs.len(), 1);
    assert_eq!(files[0].name(), "a.txt");
    assert_eq!(dirs[0].name(), "dir");
    assert_eq!(dirs[0].as_directory().unwrap().children().len(), 1);

    assert_eq!(tree.read("a.txt").unwrap(), b"hi");
    assert_eq!(
        tree.read("dir/b.txt").unwrap(),
        "hello world".repeat(10).as_bytes()
    );
}

#[test]
fn test_entry_metadata() {
    let (data, _) = hello_archive();
    let archive = ZipArchive::open(&data).unwrap();

    let b = archive.entry_by_name("dir/b.txt").unwrap();
    assert_eq!(b.method, CompressionMethod::Deflated);
    assert_eq!(b.uncompressed_size, 110);
    assert!(b.compressed_size < 110);
    assert!(b.flags.is_utf8());
    assert_eq!(b.host_system().name(), "UNIX");
    assert_eq!(b.modified().to_string(), "2021-01-01 12:00:00");
    assert_eq!(b.unix_mode(), Some(0o100644));
    assert_eq!(archive.eocd().total_entries, 2);
}

#[test]
fn test_altered_central_crc_is_header_mismatch() {
    let (mut data, offsets) = hello_archive();
    data[offsets[1] + 16] ^= 0xFF;

    let tree = read_zip(&data).unwrap();
    let err = tree.read("dir/b.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HeaderMismatch);
    assert!(err.to_string().contains("crc32"));

    // The other entry is unaffected
    assert_eq!(tree.read("a.txt").unwrap(), b"hi");
}

#[test]
fn test_altered_compressed_size_is_header_mismatch() {
    let (mut data, offsets) = hello_archive();
    data[offsets[0] + 20] = 3;

    let archive = ZipArchive::open(&data).unwrap();
    let err = archive.decode_by_name("a.txt").unwrap_err();
    assert!(err.to_string().contains("compressed size"));
    assert_eq!(err.kind(), ErrorKind::HeaderMismatch);
}

#[test]
fn test_truncated_archive() {
    let (data, _) = hello_archive();

    // Cutting the end of central directory leaves no ZIP at all
    let err = ZipArchive::open(&data[..data.len() - 10]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAZipFile);

    // A central directory offset past the end of what is left
    let mut cut = data.clone();
    let eocd_at = cut.len() - 22;
    let past_end = (cut.len() as u32 + 100).to_le_bytes();
    cut[eocd_at + 16..eocd_at + 20].copy_from_slice(&past_end);
    let err = ZipArchive::open(&cut).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEndOfStream);
}

#[test]
fn test_truncated_deflate_payload() {
    let content = "some text that compresses ".repeat(40);
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(content.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    // Record only half of the payload in both headers
    let half = compressed[..compressed.len() / 2].to_vec();
    let (data, _) = ZipBuilder::new()
        .add("t.txt", 8, content.as_bytes(), half)
        .finish();

    let archive = ZipArchive::open(&data).unwrap();
    let err = archive.decode_by_name("t.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEndOfStream);
}

#[test]
fn test_lenient_skips_crc() {
    let (mut data, _) = ZipBuilder::new().stored("a.txt", b"hi").finish();
    // Payload follows the 30-byte header and 5-byte name
    data[35] = b'H';

    let tree = read_zip(&data).unwrap();
    assert_eq!(tree.read("a.txt").unwrap_err().kind(), ErrorKind::CrcMismatch);

    let archive = ZipArchive::open_with_options(&data, DecodeOptions::LENIENT).unwrap();
    let tree = ArchiveTree::new(archive);
    assert_eq!(tree.read("a.txt").unwrap(), b"Hi");
}

#[test]
fn test_nested_archive_detected() {
    let (inner, _) = ZipBuilder::new().stored("deep.txt", b"deep").finish();
    let (outer, _) = ZipBuilder::new().stored("inner.zip", &inner).finish();

    let tree = read_zip(&outer).unwrap();
    let bytes = tree.read("inner.zip").unwrap();
    assert_eq!(ArchiveFormat::from_magic(bytes), ArchiveFormat::Zip);

    let nested = read_zip(bytes).unwrap();
    assert_eq!(nested.read("deep.txt").unwrap(), b"deep");
}

#[test]
fn test_listing_json() {
    let (data, _) = hello_archive();
    let tree = read_zip(&data).unwrap();
    let json = serde_json::to_value(tree.listing()).unwrap();

    assert_eq!(json["isFile"], false);
    assert_eq!(json["children"][0]["name"], "a.txt");
    assert_eq!(json["children"][0]["isFile"], true);
    assert!(json["children"][0].get("children").is_none());
    assert_eq!(json["children"][1]["children"][0]["path"], "dir/b.txt");
}

#[test]
fn test_many_entries() {
    let mut builder = ZipBuilder::new();
    let contents: Vec<String> = (0..50)
        .map(|i| format!("entry {} ", i).repeat(i + 1))
        .collect();
    for (i, content) in contents.iter().enumerate() {
        let name = format!("d{}/f{}.txt", i % 5, i);
        if i % 2 == 0 {
            builder.deflated(&name, content.as_bytes());
        } else {
            builder.stored(&name, content.as_bytes());
        }
    }
    let (data, _) = builder.finish();

    let tree = read_zip(&data).unwrap();
    assert_eq!(tree.files().len(), 50);
    for (i, content) in contents.iter().enumerate() {
        let path = format!("d{}/f{}.txt", i % 5, i);
        assert_eq!(tree.read(&path).unwrap(), content.as_bytes());
    }
    assert_eq!(tree.cache_usage().0, 50);

    let results = tree.archive().decode_all();
    assert!(results.iter().all(|r| r.is_ok()));
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_decode_matches_serial() {
    let mut builder = ZipBuilder::new();
    for i in 0..20 {
        builder.deflated(&format!("f{}.txt", i), format!("{} ", i).repeat(300).as_bytes());
    }
    let (data, _) = builder.finish();

    let tree = read_zip(&data).unwrap();
    let serial: Vec<_> = tree
        .archive()
        .decode_all()
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    let parallel: Vec<_> = tree
        .archive()
        .decode_all_parallel()
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(serial, parallel);

    let read = tree.read_all_parallel();
    assert_eq!(read.len(), 20);
    assert!(read.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(tree.cache_usage().0, 20);
}

#[test]
fn test_tree_node_kinds() {
    let (data, _) = hello_archive();
    let tree = read_zip(&data).unwrap();
    assert!(matches!(tree.get("dir"), Some(TreeNode::Directory(_))));
    assert!(matches!(tree.get("dir/b.txt"), Some(TreeNode::File(_))));
}
