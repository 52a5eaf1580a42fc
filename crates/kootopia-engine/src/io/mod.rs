use crate::compile::{END_OF_CODE, END_OF_FILENAME, END_OF_RESULT};
use crate::models::FileKind;
use relative_path::RelativePath;
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory of the files root holding tokenizer configs
pub const CONFIGS_DIR: &str = "configs";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),
    #[error("Invalid files directory: {0}")]
    InvalidRoot(String),
}

/// Text storage keyed by file kind and plain file name.
///
/// Loading a file that does not exist yields empty text, matching how the
/// editor treats a name it has never saved.
pub trait Persistence {
    fn save(&self, kind: FileKind, name: &str, text: &str) -> Result<(), StoreError>;
    fn load(&self, kind: FileKind, name: &str) -> Result<String, StoreError>;
    /// File names of the given kind, sorted
    fn list(&self, kind: FileKind) -> Result<Vec<String>, StoreError>;
    /// Returns whether a file was removed
    fn delete(&self, kind: FileKind, name: &str) -> Result<bool, StoreError>;
}

/// Files on disk: sources directly under `root`, configs under
/// `root/configs`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store, creating the root and configs directories if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(StoreError::InvalidRoot(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        fs::create_dir_all(root.join(CONFIGS_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, kind: FileKind) -> PathBuf {
        match kind {
            FileKind::Source => self.root.clone(),
            FileKind::Config => self.root.join(CONFIGS_DIR),
        }
    }

    /// Absolute path a file of `kind` named `name` is stored at
    pub fn path_of(&self, kind: FileKind, name: &str) -> Result<PathBuf, StoreError> {
        let relative = validate_name(name)?;
        Ok(relative.to_path(self.dir(kind)))
    }
}

impl Persistence for FileStore {
    fn save(&self, kind: FileKind, name: &str, text: &str) -> Result<(), StoreError> {
        let relative = validate_name(name)?;
        write_file(relative, &self.dir(kind), text)?;
        log::info!("saved {kind:?} file {name}");
        Ok(())
    }

    fn load(&self, kind: FileKind, name: &str) -> Result<String, StoreError> {
        let relative = validate_name(name)?;
        read_file(relative, &self.dir(kind))
    }

    fn list(&self, kind: FileKind) -> Result<Vec<String>, StoreError> {
        let dir = self.dir(kind);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, kind: FileKind, name: &str) -> Result<bool, StoreError> {
        let path = self.path_of(kind, name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("deleted {kind:?} file {name}");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// A plain file name: no separators, no parent references, no control
/// characters, and never one of the wire sentinels. File names travel as a
/// single line of the compile request.
pub fn validate_name(name: &str) -> Result<&RelativePath, StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control)
        || [END_OF_FILENAME, END_OF_CODE, END_OF_RESULT].contains(&name);
    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(RelativePath::new(name))
}

/// Read a file's text, or empty text when it does not exist
fn read_file(relative_path: &RelativePath, dir: &Path) -> Result<String, StoreError> {
    let absolute_path = relative_path.to_path(dir);
    if !absolute_path.exists() {
        log::debug!("{} does not exist, loading empty text", absolute_path.display());
        return Ok(String::new());
    }
    Ok(fs::read_to_string(&absolute_path)?)
}

fn write_file(relative_path: &RelativePath, dir: &Path, content: &str) -> Result<(), StoreError> {
    let absolute_path = relative_path.to_path(dir);

    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent)?;
    }

    Ok(fs::write(&absolute_path, content)?)
}
