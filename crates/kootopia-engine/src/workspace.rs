use std::ops::Range;
use std::time::{Duration, Instant};

use crate::compile::{
    CompileCoordinator, CompileRefused, CompileState, CompileUpdate, Ticket, Transport,
};
use crate::editing::{DEFAULT_QUIET_PERIOD, Debouncer, EditSession};
use crate::io::{Persistence, StoreError, validate_name};
use crate::models::{DEFAULT_EXTENSION, FileKind, SourceFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    /// Persist after each quiet period. Commits happen either way.
    pub autosave: bool,
    pub quiet_period: Duration,
    pub default_extension: String,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            autosave: true,
            quiet_period: DEFAULT_QUIET_PERIOD,
            default_extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// The source file set aside while a config file is being edited
#[derive(Debug, Clone)]
struct StashedSource {
    file: SourceFile,
    text: String,
}

/// Everything the editor screen drives: the open file, its edit session,
/// storage, the commit timer and the compiler.
///
/// Single-threaded by contract. Time is passed in explicitly so the owning
/// loop decides when the debouncer is polled.
pub struct EditorWorkspace<P: Persistence, T: Transport> {
    store: P,
    compiler: CompileCoordinator<T>,
    session: EditSession,
    file: SourceFile,
    debouncer: Debouncer,
    autosave: bool,
    stashed_source: Option<StashedSource>,
}

impl<P: Persistence, T: Transport> EditorWorkspace<P, T> {
    /// Start with an empty untitled buffer.
    pub fn new(store: P, transport: T, settings: WorkspaceSettings) -> Self {
        Self {
            store,
            compiler: CompileCoordinator::new(transport),
            session: EditSession::default(),
            file: SourceFile::untitled(&settings.default_extension),
            debouncer: Debouncer::new(settings.quiet_period),
            autosave: settings.autosave,
            stashed_source: None,
        }
    }

    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn compiler(&self) -> &CompileCoordinator<T> {
        &self.compiler
    }

    pub fn autosave(&self) -> bool {
        self.autosave
    }

    pub fn set_autosave(&mut self, enabled: bool) {
        self.autosave = enabled;
    }

    /// When the owning loop should next call [`tick`](Self::tick)
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.session.has_unsaved_changes()
    }

    /// A keystroke-level change from the text field.
    pub fn on_edit(&mut self, text: &str, selection: Range<usize>, now: Instant) {
        self.session.edit(text, selection);
        self.debouncer.schedule(now);
    }

    pub fn set_selection(&mut self, selection: Range<usize>) {
        self.session.set_selection(selection);
    }

    /// Find and replace in the live text. Returns whether anything matched.
    pub fn replace(&mut self, find: &str, replacement: &str, all: bool, now: Instant) -> bool {
        let applied = if all {
            self.session.replace_all(find, replacement)
        } else {
            self.session.replace(find, replacement)
        };
        if applied {
            self.debouncer.schedule(now);
        }
        applied
    }

    pub fn undo(&mut self, now: Instant) -> bool {
        let undone = self.session.undo();
        if undone {
            self.debouncer.schedule(now);
        }
        undone
    }

    pub fn redo(&mut self, now: Instant) -> bool {
        let redone = self.session.redo();
        if redone {
            self.debouncer.schedule(now);
        }
        redone
    }

    /// Poll the commit timer. When the quiet period has elapsed the pending
    /// burst is committed and, with auto-save on, written out.
    ///
    /// Returns whether the timer fired.
    pub fn tick(&mut self, now: Instant) -> Result<bool, StoreError> {
        if !self.debouncer.fire_if_due(now) {
            return Ok(false);
        }
        self.session.commit();
        if self.autosave {
            self.persist()?;
        }
        Ok(true)
    }

    /// Write the live text under the current name. Untitled buffers have
    /// nowhere to go and are skipped; returns whether anything was written.
    pub fn save(&mut self) -> Result<bool, StoreError> {
        self.debouncer.cancel();
        self.persist()
    }

    fn persist(&mut self) -> Result<bool, StoreError> {
        if self.file.is_untitled() {
            log::debug!("not saving untitled buffer");
            return Ok(false);
        }
        self.store
            .save(self.file.kind(), self.file.name(), &self.session.current().text())?;
        self.session.force_commit();
        self.session.mark_saved();
        Ok(true)
    }

    /// Save the live text under a new name and continue editing it there.
    /// The old file is left in place.
    pub fn rename(&mut self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        self.store
            .save(self.file.kind(), name, &self.session.current().text())?;
        log::info!("renamed {} to {name}", self.file.name());
        self.file.rename(name);
        self.debouncer.cancel();
        self.session.force_commit();
        self.session.mark_saved();
        Ok(())
    }

    /// Create an empty named source file and switch to it. An existing file
    /// of that name is not overwritten until the buffer is saved.
    pub fn new_file(&mut self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        if !self.store.list(FileKind::Source)?.iter().any(|n| n == name) {
            self.store.save(FileKind::Source, name, "")?;
        }
        let file = SourceFile::named(name, self.file.extension());
        self.switch_to(file, "");
        Ok(())
    }

    pub fn new_untitled(&mut self) {
        let file = SourceFile::untitled(self.file.extension());
        self.switch_to(file, "");
    }

    /// Load a source file into a fresh session. History does not carry over.
    pub fn open(&mut self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let text = self.store.load(FileKind::Source, name)?;
        let file = SourceFile::named(name, self.file.extension());
        self.switch_to(file, &text);
        Ok(())
    }

    /// Switch language. Named files are renamed to match the extension.
    pub fn change_extension(&mut self, extension: &str) {
        self.file.change_extension(extension);
        log::debug!("extension is now {}", self.file.extension());
    }

    /// Edit a tokenizer config. The source being edited is kept in memory
    /// until [`switch_to_source`](Self::switch_to_source).
    pub fn open_config(&mut self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let text = self.store.load(FileKind::Config, name)?;
        self.stash_source();
        self.switch_to(SourceFile::config(name), &text);
        Ok(())
    }

    /// Start a new, not yet saved, config file from `template`.
    pub fn create_config(&mut self, name: &str, template: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        self.stash_source();
        self.switch_to(SourceFile::config(name), template);
        Ok(())
    }

    /// Save the config being edited and return to the stashed source.
    /// Returns `false` when not in config mode.
    pub fn switch_to_source(&mut self) -> Result<bool, StoreError> {
        if !self.file.is_config() {
            return Ok(false);
        }
        self.save()?;

        let stashed = self.stashed_source.take().unwrap_or_else(|| StashedSource {
            file: SourceFile::untitled(DEFAULT_EXTENSION),
            text: String::new(),
        });
        self.switch_to(stashed.file, &stashed.text);
        Ok(true)
    }

    fn stash_source(&mut self) {
        if self.file.is_config() {
            return;
        }
        self.stashed_source = Some(StashedSource {
            file: self.file.clone(),
            text: self.session.current().text(),
        });
    }

    fn switch_to(&mut self, file: SourceFile, text: &str) {
        self.debouncer.cancel();
        self.session.reset(text);
        log::info!("editing {:?} file {}", file.kind(), file.name());
        self.file = file;
    }

    /// The app is going to the background: save named files.
    pub fn on_pause(&mut self) -> Result<(), StoreError> {
        if !self.file.is_untitled() {
            self.session.commit();
            self.save()?;
        }
        Ok(())
    }

    pub fn can_compile(&self) -> bool {
        CompileCoordinator::<T>::can_compile(&self.file)
    }

    /// Send the live text to the build server.
    pub fn compile(&mut self) -> Result<Ticket, CompileRefused> {
        self.compiler.start(&self.file, &self.session)
    }

    pub fn compile_state(&self) -> CompileState {
        self.compiler.state()
    }

    /// Text for the compile output pane
    pub fn compile_status(&self) -> &str {
        self.compiler.status()
    }

    pub fn pump_compile(&mut self) -> Vec<CompileUpdate> {
        self.compiler.pump(&mut self.session)
    }

    pub fn wait_compile(&mut self, timeout: Duration) -> Vec<CompileUpdate> {
        self.compiler.wait(&mut self.session, timeout)
    }
}
