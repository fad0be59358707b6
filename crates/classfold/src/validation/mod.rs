//! Read-only validators for class folders and structured datasets.

mod class_folder;
mod structured;

pub use class_folder::ClassFolderValidator;
pub use structured::StructuredValidator;
