//! Fuzz target for flat normalization.
//!
//! Each input line becomes a loose file under the dataset root. Whatever the
//! names, normalization must return a verdict and, on failure, leave the tree
//! as it was.

#![no_main]

use std::path::Path;

use classfold::normalize::FlatNormalizer;
use classfold::{MemoryTree, ValidationConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut tree = MemoryTree::new();
    tree.add_dir("ds");
    for line in text.lines().take(64) {
        if line.is_empty() || line.contains('/') || line.trim_matches('.').is_empty() {
            continue;
        }
        tree.add_file(Path::new("ds").join(line), Vec::new());
    }

    let before = tree.files();
    let config = ValidationConfig::new(2, 2).unwrap();
    if FlatNormalizer::new(&config)
        .normalize(&mut tree, Path::new("ds"))
        .is_err()
    {
        assert_eq!(tree.files(), before);
    }
});
