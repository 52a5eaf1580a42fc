pub mod compile;
pub mod editing;
pub mod io;
pub mod models;
pub mod syntax;
pub mod workspace;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use compile::{
    CompileCoordinator, CompileRefused, CompileRequest, CompileResponse, CompileState,
    CompileUpdate, DiagnosticSet, TcpTransport, Ticket, Transport, TransportError,
    TransportSettings, map_diagnostics,
};
pub use editing::{AnnotatedLine, AnnotatedText, Cmd, Debouncer, Document, EditSession};
pub use io::{FileStore, Persistence, StoreError};
pub use models::{FileKind, SourceFile};
pub use syntax::{StyledSpan, TokenKind, TokenRules, highlight_syntax};
pub use workspace::{EditorWorkspace, WorkspaceSettings};
