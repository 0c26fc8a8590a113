//! Utility functions for the CLI.

use arcpeek_archive::zip::{ArchiveTree, FileNode};
use arcpeek_core::{DecodeOptions, Result as DecodeResult, StoredLengthPolicy};
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

/// Boxed error returned by every command.
pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalOptions {
    /// Ignore stored block NLEN.
    pub lenient: bool,
    /// Skip CRC and trailer checks.
    pub no_verify: bool,
    /// Largest decoded size of one entry or GZIP file.
    pub max_size: Option<usize>,
    /// Worker threads for `test` and `extract`; `None` decodes serially.
    pub jobs: Option<usize>,
}

impl GlobalOptions {
    /// Decoder configuration for these flags.
    pub fn decode_options(&self) -> DecodeOptions {
        let stored_length = if self.lenient {
            StoredLengthPolicy::Lenient
        } else {
            StoredLengthPolicy::Strict
        };
        DecodeOptions::new()
            .stored_length(stored_length)
            .verify_checksums(!self.no_verify)
            .max_output_size(self.max_size)
    }
}

/// The bytes of an input file, memory-mapped when possible.
pub enum LoadedFile {
    /// Memory-mapped contents.
    Mapped(Mmap),
    /// Contents read into memory (empty files cannot be mapped).
    Read(Vec<u8>),
}

impl Deref for LoadedFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Read(data) => data.as_slice(),
        }
    }
}

/// Load a whole file for parsing.
pub fn load_file(path: &Path) -> CliResult<LoadedFile> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(LoadedFile::Read(Vec::new()));
    }

    // SAFETY: the mapping is read-only and lives only as long as this
    // process inspects the file.
    match unsafe { Mmap::map(&file) } {
        Ok(mmap) => {
            log::debug!("mapped {} ({} bytes)", path.display(), mmap.len());
            Ok(LoadedFile::Mapped(mmap))
        }
        Err(err) => {
            log::debug!("cannot map {}: {}, reading instead", path.display(), err);
            Ok(LoadedFile::Read(std::fs::read(path)?))
        }
    }
}

/// Create a progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}

/// Decode the given files of a tree, on a thread pool when `jobs` is set.
///
/// Results come back in the order of `files`.
pub fn decode_files<'t>(
    tree: &'t ArchiveTree<'_>,
    files: Vec<&'t FileNode>,
    jobs: Option<usize>,
    pb: &ProgressBar,
) -> CliResult<Vec<(&'t FileNode, DecodeResult<&'t [u8]>)>> {
    let decode = |file: &'t FileNode| {
        pb.set_message(file.path().to_string());
        let result = tree.read_node(file);
        pb.inc(1);
        (file, result)
    };

    match jobs {
        None => Ok(files.into_iter().map(decode).collect()),
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?;
            log::debug!("decoding on {} threads", pool.current_num_threads());
            Ok(pool.install(|| files.into_par_iter().map(decode).collect()))
        }
    }
}

/// Join an archive path onto `base`, dropping components that would escape
/// it (`..`, roots, drive prefixes).
pub fn safe_join(base: &Path, entry: &str) -> Option<PathBuf> {
    let mut out = base.to_path_buf();
    let mut pushed = false;
    for component in Path::new(entry).components() {
        if let Component::Normal(part) = component {
            out.push(part);
            pushed = true;
        }
    }
    pushed.then_some(out)
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Compression savings as a percentage, if the size is known.
pub fn savings(size: u64, compressed: u64) -> Option<f64> {
    (size > 0).then(|| (1.0 - compressed as f64 / size as f64) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_join() {
        let base = Path::new("out");
        assert_eq!(safe_join(base, "a/b.txt"), Some(PathBuf::from("out/a/b.txt")));
        assert_eq!(safe_join(base, "../../etc/passwd"), Some(PathBuf::from("out/etc/passwd")));
        assert_eq!(safe_join(base, "/abs/x"), Some(PathBuf::from("out/abs/x")));
        assert_eq!(safe_join(base, ".."), None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(12), "12 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_decode_options() {
        let options = GlobalOptions {
            lenient: true,
            no_verify: true,
            max_size: Some(10),
            jobs: None,
        }
        .decode_options();
        assert_eq!(options.stored_length, StoredLengthPolicy::Lenient);
        assert!(!options.verify_checksums);
        assert_eq!(options.max_output_size, Some(10));

        assert_eq!(GlobalOptions::default().decode_options(), DecodeOptions::STRICT);
    }

    #[test]
    fn test_savings() {
        assert_eq!(savings(0, 0), None);
        assert_eq!(savings(100, 25), Some(75.0));
    }
}
