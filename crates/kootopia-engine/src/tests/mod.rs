use crate::compile::{Transport, TransportError};
use crate::io::{Persistence, StoreError};
use crate::models::FileKind;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temporary files directory for testing
pub fn create_test_files_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a test file with content
pub fn create_test_file(files_dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = files_dir.path().join(filename);
    fs::write(&file_path, content).unwrap();
    file_path
}

/// In-memory store that also counts writes
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RefCell<BTreeMap<(FileKind, String), String>>,
    saves: Cell<usize>,
}

impl MemoryStore {
    pub fn with_file(self, kind: FileKind, name: &str, text: &str) -> Self {
        self.files
            .borrow_mut()
            .insert((kind, name.to_string()), text.to_string());
        self
    }

    pub fn get(&self, kind: FileKind, name: &str) -> Option<String> {
        self.files.borrow().get(&(kind, name.to_string())).cloned()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl Persistence for MemoryStore {
    fn save(&self, kind: FileKind, name: &str, text: &str) -> Result<(), StoreError> {
        self.saves.set(self.saves.get() + 1);
        self.files
            .borrow_mut()
            .insert((kind, name.to_string()), text.to_string());
        Ok(())
    }

    fn load(&self, kind: FileKind, name: &str) -> Result<String, StoreError> {
        Ok(self.get(kind, name).unwrap_or_default())
    }

    fn list(&self, kind: FileKind) -> Result<Vec<String>, StoreError> {
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect())
    }

    fn delete(&self, kind: FileKind, name: &str) -> Result<bool, StoreError> {
        Ok(self
            .files
            .borrow_mut()
            .remove(&(kind, name.to_string()))
            .is_some())
    }
}

/// Replies with a canned server response and records what was sent.
/// Without a reply every connection is refused.
pub struct ScriptedTransport {
    reply: Option<String>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedTransport {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            sent: Arc::default(),
        }
    }

    pub fn offline() -> Self {
        Self {
            reply: None,
            sent: Arc::default(),
        }
    }

    /// Bytes written by every connection so far
    pub fn sent(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.sent)
    }
}

pub struct ScriptedStream {
    reply: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reply.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    type Stream = ScriptedStream;

    fn connect(&self) -> Result<ScriptedStream, TransportError> {
        let Some(reply) = &self.reply else {
            return Err(TransportError::Connect {
                address: "localhost:8080".to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "Connection refused"),
            });
        };
        Ok(ScriptedStream {
            reply: Cursor::new(reply.clone().into_bytes()),
            sent: Arc::clone(&self.sent),
        })
    }
}
