use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// Which mods to load on top of the base content, in load order.
#[derive(Debug, Clone, Default)]
pub struct ContentRequest {
    pub enabled_mods: Vec<String>,
}

impl ContentRequest {
    /// Parses a comma separated mod list; blank entries are skipped.
    pub fn from_mod_list(raw: &str) -> Self {
        Self {
            enabled_mods: raw
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContentDiscoveryError {
    #[error("enabled mod id cannot be empty")]
    EmptyEnabledMod,
    #[error("duplicate enabled mod id in request: {mod_id}")]
    DuplicateEnabledMod { mod_id: String },
    #[error("enabled mod does not exist on disk: {mod_id} at {expected_dir}")]
    EnabledModMissing {
        mod_id: String,
        expected_dir: PathBuf,
    },
    #[error("base content directory does not exist: {path}")]
    BaseContentMissing { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefInMod,
    UnknownReference,
    UnknownAction,
    ArgumentCount,
    InvalidArgument,
    VariableNotAllowed,
    UnknownEvent,
    DuplicateEvent,
    UnknownState,
    DuplicateState,
    InvalidControlFlow,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub mod_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (mod={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (mod={}, file={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

/// Problems that dropped part of a script without failing the whole load.
#[derive(Debug, Clone, Default)]
pub struct ContentDiagnostics {
    entries: Vec<ContentCompileError>,
}

impl ContentDiagnostics {
    pub(crate) fn push(&mut self, diagnostic: ContentCompileError) {
        warn!(
            code = ?diagnostic.code,
            mod_id = %diagnostic.mod_id,
            file = %diagnostic.file_path.display(),
            line = diagnostic.location.map(|loc| loc.line),
            message = %diagnostic.message,
            "content_diagnostic"
        );
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[ContentCompileError] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_code(&self, code: ContentErrorCode) -> bool {
        self.entries.iter().any(|entry| entry.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_list_skips_blank_entries() {
        let request = ContentRequest::from_mod_list(" moda, ,modb ,");
        assert_eq!(request.enabled_mods, vec!["moda", "modb"]);
    }

    #[test]
    fn display_includes_location_when_known() {
        let error = ContentCompileError {
            code: ContentErrorCode::UnknownAction,
            message: "unknown action 'fly'".to_string(),
            mod_id: "base".to_string(),
            file_path: PathBuf::from("mobs.xml"),
            location: Some(SourceLocation { line: 4, column: 9 }),
        };
        let rendered = error.to_string();
        assert!(rendered.starts_with("UnknownAction: unknown action 'fly'"));
        assert!(rendered.contains("line=4, column=9"));
    }
}
