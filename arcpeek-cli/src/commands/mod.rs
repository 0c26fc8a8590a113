//! Command implementations for the arcpeek CLI.

pub mod cat;
pub mod detect;
pub mod extract;
pub mod info;
pub mod list;
pub mod tree;

pub use cat::cmd_cat;
pub use detect::cmd_detect;
pub use extract::cmd_extract;
pub use info::cmd_info;
pub use list::cmd_list;
pub use test::cmd_test;
pub use tree::cmd_tree;

use crate::utils::CliResult;
use arcpeek_archive::ArchiveFormat;

/// Error for inputs that are neither ZIP nor GZIP.
fn unsupported(format: ArchiveFormat) -> CliResult {
    Err(format!("unsupported format: {}", format).into())
}
