//! Tree command implementation.

use super::unsupported;
use crate::utils::{CliResult, GlobalOptions, load_file};
use arcpeek_archive::zip::{ArchiveTree, TreeListing, TreeNode, ZipArchive};
use arcpeek_archive::{ArchiveFormat, gzip};
use std::path::Path;

pub fn cmd_tree(archive: &Path, json: bool, options: &GlobalOptions) -> CliResult {
    let data = load_file(archive)?;
    let format = ArchiveFormat::from_magic(&data);

    match format {
        ArchiveFormat::Zip => {
            let zip = ZipArchive::open_with_options(&data, options.decode_options())?;
            let tree = ArchiveTree::new(zip);
            if json {
                println!("{}", serde_json::to_string_pretty(&tree.listing())?);
            } else {
                println!("{}", archive.display());
                if let Some(root) = tree.root().as_directory() {
                    print_children(root.children(), "");
                }
            }
        }
        ArchiveFormat::Gzip => {
            // A GZIP file is a tree with one leaf
            let header = gzip::read_header(&data)?;
            let name = header.filename.unwrap_or_else(|| default_name(archive));
            if json {
                let listing = TreeListing {
                    name: String::new(),
                    path: String::new(),
                    is_file: false,
                    children: Some(vec![TreeListing {
                        name: name.clone(),
                        path: name,
                        is_file: true,
                        children: None,
                    }]),
                };
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                println!("{}", archive.display());
                println!("└── {}", name);
            }
        }
        ArchiveFormat::Unknown => return unsupported(format),
    }

    Ok(())
}

fn print_children(children: &[TreeNode], prefix: &str) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };

        match child {
            TreeNode::Directory(dir) => {
                println!("{}{}{}/", prefix, branch, dir.name());
                print_children(dir.children(), &format!("{}{}", prefix, indent));
            }
            TreeNode::File(file) => println!("{}{}{}", prefix, branch, file.name()),
        }
    }
}

/// Output name for a GZIP file without FNAME: the input name minus `.gz`.
pub fn default_name(archive: &Path) -> String {
    archive
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}
