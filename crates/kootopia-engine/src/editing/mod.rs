/*!
 * # Editing Core Module
 *
 * The document state engine behind the editor screen.
 *
 * ## Architecture Overview
 *
 * ### 1. Immutable Documents
 * - A [`Document`] is a value: text in an **`xi_rope::Rope`** plus a selection
 * - Every edit yields a new `Document`; nothing is modified in place
 * - Snapshots share rope structure, so history entries are cheap to keep
 *
 * ### 2. Debounced Commits
 * - Keystrokes replace the live document immediately (`EditSession::edit`)
 * - Undo boundaries are created only on **commit**, driven by a [`Debouncer`]
 *   quiet period or forced after programmatic replacements
 * - One burst of typing becomes one undo step
 *
 * ### 3. Commands for Computed Edits
 * - Find/replace compile to a single rope **Delta** via [`Cmd`]
 * - `ReplaceAll` is one delta, hence one atomic edit and one undo step
 *
 * ### 4. Annotations
 * - Compiler diagnostics land as a set of flagged lines on the session
 * - [`AnnotatedText`] is the render-ready view handed to the UI
 *
 * ## Module Structure
 *
 * - **`document`**: `Document` value type and text statistics
 * - **`commands`**: `Cmd` enum and delta compilation
 * - **`history`**: undo/redo stacks
 * - **`session`**: `EditSession`, the editor state façade
 * - **`debounce`**: cancellable quiet-period timer
 * - **`annotated`**: line-level highlight view
 */

pub mod annotated;
pub mod commands;
pub mod debounce;
pub mod document;
pub mod history;
pub mod session;

pub use annotated::{AnnotatedLine, AnnotatedText};
pub use commands::Cmd;
pub use debounce::{DEFAULT_QUIET_PERIOD, Debouncer};
pub use document::Document;
pub use history::HistoryStore;
pub use session::EditSession;
