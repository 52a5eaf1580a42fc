/*!
 * # Remote Compilation
 *
 * Source is compiled by a desktop build server reached over TCP. The
 * editor never compiles locally.
 *
 * - **`protocol`**: sentinel framing, the [`Transport`] seam and the TCP
 *   implementation
 * - **`diagnostics`**: error-line extraction from raw compiler output
 * - **`coordinator`**: runs exchanges on a worker thread and folds their
 *   results back into an edit session
 */

use crate::models::SourceFile;

pub mod coordinator;
pub mod diagnostics;
pub mod protocol;

pub use coordinator::{CompileCoordinator, CompileState, CompileUpdate, Ticket};
pub use diagnostics::{DiagnosticSet, error_lines, map_diagnostics};
pub use protocol::{
    END_OF_CODE, END_OF_FILENAME, END_OF_RESULT, Exchange, MAX_RESPONSE_BYTES, ResponseLimits,
    TcpTransport, Transport, TransportError, TransportSettings,
};

/// Extensions the build server knows how to compile or run
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".kt", ".java", ".py"];

pub fn is_supported(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension)
}

/// One compilation job as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub file_name: String,
    pub source_code: String,
}

impl CompileRequest {
    /// A request with `file_name` sent exactly as given
    pub fn new(file_name: impl Into<String>, source_code: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            source_code: source_code.into(),
        }
    }

    /// A request named by [`SourceFile::compile_file_name`], which owns the
    /// `untitled<ext>` placeholder rule.
    pub fn for_file(file: &SourceFile, source_code: impl Into<String>) -> Self {
        Self::new(file.compile_file_name(), source_code)
    }
}

/// Everything the server printed before `END_OF_RESULT`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileResponse {
    pub raw_output: String,
}

/// Reasons a compile is refused before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileRefused {
    #[error("Unsupported file type: {extension}")]
    UnsupportedFileType { extension: String },
}
