use std::path::Path;

/// Placeholder name for a buffer that has never been saved
pub const UNTITLED: &str = "Untitled";

/// Extension assumed until a file says otherwise
pub const DEFAULT_EXTENSION: &str = ".kt";

/// Where a file lives in storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileKind {
    /// Source code in the files directory
    Source,
    /// Tokenizer rules in the `configs/` subdirectory
    Config,
}

/// Identity of the file being edited: logical name, current extension and
/// kind.
///
/// The extension is tracked separately from the name because an untitled
/// buffer still has a language (it compiles as `untitled.kt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    extension: String,
    kind: FileKind,
}

impl SourceFile {
    pub fn untitled(extension: &str) -> Self {
        Self {
            name: UNTITLED.to_string(),
            extension: normalize_extension(extension),
            kind: FileKind::Source,
        }
    }

    /// A named source file. Its extension is taken from the name when it has
    /// one, otherwise `fallback_extension` is kept.
    pub fn named(name: &str, fallback_extension: &str) -> Self {
        let extension =
            extension_of(name).unwrap_or_else(|| normalize_extension(fallback_extension));
        Self {
            name: name.to_string(),
            extension,
            kind: FileKind::Source,
        }
    }

    /// A tokenizer configuration file
    pub fn config(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extension: extension_of(name).unwrap_or_default(),
            kind: FileKind::Config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extension with its leading dot, e.g. `.py`
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn is_untitled(&self) -> bool {
        self.name.is_empty() || self.name == UNTITLED
    }

    pub fn is_config(&self) -> bool {
        self.kind == FileKind::Config
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
        if let Some(extension) = extension_of(name) {
            self.extension = extension;
        }
    }

    /// Switch language. A named file is renamed to match; an untitled one
    /// keeps its placeholder name.
    pub fn change_extension(&mut self, extension: &str) {
        self.extension = normalize_extension(extension);
        if !self.is_untitled() {
            self.name = format!("{}{}", stem_of(&self.name), self.extension);
        }
    }

    /// File name sent to the build server: `untitled<ext>` for placeholder
    /// names, otherwise the base name with the current extension.
    pub fn compile_file_name(&self) -> String {
        if self.is_untitled() {
            format!("untitled{}", self.extension)
        } else {
            format!("{}{}", stem_of(&self.name), self.extension)
        }
    }

    /// Tokenizer rules file for this file's language
    pub fn rules_file(&self) -> &'static str {
        rules_file_for_extension(&self.extension)
    }
}

/// Tokenizer rules file for an extension; unknown languages get no highlighting.
pub fn rules_file_for_extension(extension: &str) -> &'static str {
    match extension {
        ".kt" => "kotlin.json",
        ".java" => "java.json",
        ".py" => "python.json",
        _ => "fallback.json",
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

fn stem_of(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

fn normalize_extension(extension: &str) -> String {
    if extension.is_empty() || extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}
