//! Fuzz target for filename classification.
//!
//! Checks that parsing never panics and that a recognized index always
//! yields a canonical name.

#![no_main]

use classfold::pattern::FileEntry;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let name = String::from_utf8_lossy(data);
    let entry = FileEntry::parse(&name);

    let _ = entry.has_valid_extension();
    let _ = entry.plain_index();
    if entry.kind.index().is_some() {
        assert!(entry.canonical_name().is_some());
    }
});
