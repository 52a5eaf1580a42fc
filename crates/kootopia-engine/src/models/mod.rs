pub mod source_file;

pub use source_file::{DEFAULT_EXTENSION, FileKind, SourceFile, UNTITLED, rules_file_for_extension};
