//! Filename pattern matching for dataset samples.
//!
//! Two shapes are recognized on the filename stem (extension stripped):
//!
//! - **class-qualified**: `<CLASS><SEP><INDEX>`, e.g. `CAT_0012` or `B 07`.
//!   The class token is 1-6 uppercase letters or digits, the separator is any
//!   run of spaces, hyphens and underscores, and the index has 2-4 digits.
//! - **bare**: `<INDEX>` only, 2-4 digits.
//!
//! Everything else is unrecognized.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::VALID_IMAGE_EXTENSIONS;

static CLASS_QUALIFIED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<class>[A-Z0-9]{1,6})[\s\-_]+(?P<index>[0-9]{2,4})$").unwrap()
});

static BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?P<index>[0-9]{2,4})$").unwrap());

/// Human-readable description of the class-qualified shape.
pub const CLASS_QUALIFIED_FORMAT: &str = "<CLASS><SEP><INDEX>, e.g. A_01 or CAT 0042";

/// Human-readable description of both accepted shapes.
pub const ANY_FORMAT: &str = "<CLASS><SEP><INDEX> or <INDEX> with 2-4 digits";

/// A sample index as written in the filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleIndex {
    /// Digits exactly as they appear, leading zeros kept.
    pub digits: String,
    /// Numeric value of the digits.
    pub value: u64,
}

impl SampleIndex {
    fn from_digits(digits: &str) -> Option<Self> {
        let value = digits.parse::<u64>().ok()?;
        Some(Self {
            digits: digits.to_string(),
            value,
        })
    }
}

/// Shape of a filename stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilenameKind {
    /// Stem carries both the class id and the index.
    ClassQualified { class_id: String, index: SampleIndex },
    /// Stem is the index alone.
    Bare { index: SampleIndex },
    /// Stem matches neither shape.
    Unrecognized,
}

impl FilenameKind {
    /// The parsed index, if the stem had one.
    pub fn index(&self) -> Option<&SampleIndex> {
        match self {
            FilenameKind::ClassQualified { index, .. } | FilenameKind::Bare { index } => {
                Some(index)
            }
            FilenameKind::Unrecognized => None,
        }
    }

    /// The embedded class id, for class-qualified stems.
    pub fn class_id(&self) -> Option<&str> {
        match self {
            FilenameKind::ClassQualified { class_id, .. } => Some(class_id),
            _ => None,
        }
    }
}

/// Classify a filename stem.
pub fn classify_stem(stem: &str) -> FilenameKind {
    if let Some(caps) = CLASS_QUALIFIED.captures(stem) {
        if let Some(index) = SampleIndex::from_digits(&caps["index"]) {
            return FilenameKind::ClassQualified {
                class_id: caps["class"].to_string(),
                index,
            };
        }
    }
    if let Some(caps) = BARE.captures(stem) {
        if let Some(index) = SampleIndex::from_digits(&caps["index"]) {
            return FilenameKind::Bare { index };
        }
    }
    FilenameKind::Unrecognized
}

/// Split a file name into stem and extension (extension keeps its dot).
///
/// Leading dots belong to the stem, so `.hidden` has no extension.
pub fn split_file_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if !name[..pos].chars().all(|c| c == '.') => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Whether the file name ends with an accepted image extension.
pub fn is_valid_image(name: &str) -> bool {
    let (_, ext) = split_file_name(name);
    VALID_IMAGE_EXTENSIONS.contains(&ext)
}

/// One candidate file, parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name as found in the archive.
    pub file_name: String,
    /// Name without the extension.
    pub stem: String,
    /// Extension including the dot, or empty.
    pub extension: String,
    /// Parsed shape of the stem.
    pub kind: FilenameKind,
}

impl FileEntry {
    /// Parse a file name.
    pub fn parse(file_name: &str) -> Self {
        let (stem, extension) = split_file_name(file_name);
        Self {
            file_name: file_name.to_string(),
            stem: stem.to_string(),
            extension: extension.to_string(),
            kind: classify_stem(stem),
        }
    }

    /// Whether the extension is an accepted image extension.
    pub fn has_valid_extension(&self) -> bool {
        VALID_IMAGE_EXTENSIONS.contains(&self.extension.as_str())
    }

    /// The stem read as a plain integer, as used inside structured class folders.
    pub fn plain_index(&self) -> Option<u64> {
        self.stem.parse::<u64>().ok()
    }

    /// `<index><ext>`, the name this file takes in the canonical layout.
    pub fn canonical_name(&self) -> Option<String> {
        self.kind
            .index()
            .map(|index| format!("{}{}", index.digits, self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualified(class_id: &str, digits: &str) -> FilenameKind {
        FilenameKind::ClassQualified {
            class_id: class_id.to_string(),
            index: SampleIndex {
                digits: digits.to_string(),
                value: digits.parse().unwrap(),
            },
        }
    }

    #[test]
    fn test_class_qualified_separators() {
        assert_eq!(classify_stem("A_01"), qualified("A", "01"));
        assert_eq!(classify_stem("CAT 0042"), qualified("CAT", "0042"));
        assert_eq!(classify_stem("B-001"), qualified("B", "001"));
        assert_eq!(classify_stem("X1 _- 99"), qualified("X1", "99"));
    }

    #[test]
    fn test_bare_index() {
        match classify_stem("007") {
            FilenameKind::Bare { index } => {
                assert_eq!(index.digits, "007");
                assert_eq!(index.value, 7);
            }
            other => panic!("expected bare, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized() {
        for stem in ["1", "12345", "cat_01", "ABCDEFG_01", "A01", "A_1", "", "A_01x"] {
            assert_eq!(classify_stem(stem), FilenameKind::Unrecognized, "{stem}");
        }
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(split_file_name("A_01.png"), ("A_01", ".png"));
        assert_eq!(split_file_name("a.b.jpeg"), ("a.b", ".jpeg"));
        assert_eq!(split_file_name("README"), ("README", ""));
        assert_eq!(split_file_name(".DS_Store"), (".DS_Store", ""));
    }

    #[test]
    fn test_valid_image_is_case_sensitive() {
        assert!(is_valid_image("1.png"));
        assert!(is_valid_image("1.jpeg"));
        assert!(!is_valid_image("1.PNG"));
        assert!(!is_valid_image("1.txt"));
        assert!(!is_valid_image("png"));
    }

    #[test]
    fn test_file_entry_canonical_name() {
        let entry = FileEntry::parse("B_001.png");
        assert_eq!(entry.kind.class_id(), Some("B"));
        assert_eq!(entry.canonical_name().as_deref(), Some("001.png"));
        assert!(entry.has_valid_extension());

        let plain = FileEntry::parse("3.gif");
        assert_eq!(plain.plain_index(), Some(3));
        assert_eq!(plain.kind, FilenameKind::Unrecognized);
        assert_eq!(plain.canonical_name(), None);
    }
}
