//! Per-version artifacts.
//!
//! A proxy publishes three files for every resolved module version: the
//! JSON metadata (`.info`), the manifest (`.mod`) and the source archive
//! (`.zip`).

use std::path::PathBuf;

use super::Module;

/// The three file kinds a proxy serves per version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Info,
    Mod,
    Zip,
}

impl ArtifactKind {
    /// File name suffix, dot included.
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Info => ".info",
            ArtifactKind::Mod => ".mod",
            ArtifactKind::Zip => ".zip",
        }
    }

    /// Bare kind name for messages.
    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::Info => "info",
            ArtifactKind::Mod => "mod",
            ArtifactKind::Zip => "zip",
        }
    }
}

/// One downloadable file of a resolved module.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub module: Module,
    pub kind: ArtifactKind,
    /// `ESCAPED_VERSION` plus the kind suffix.
    pub file_name: String,
    /// Store-relative location: `ESCAPED_PATH/FILE_NAME`.
    pub file_path: PathBuf,
    /// Proxy-relative location: `ESCAPED_PATH/@v/FILE_NAME`.
    pub proxy_path: String,
}

impl Artifact {
    /// Build the artifact of `kind` for a resolved module.
    ///
    /// # Panics
    ///
    /// Panics when the module has no version. Resolving a version first is
    /// the caller's job; reaching this with an unresolved module is a bug.
    pub fn new(module: Module, kind: ArtifactKind) -> Self {
        assert!(
            !module.is_unresolved(),
            "cannot build an artifact for {} without a version",
            module.path
        );

        let escaped_path = module.escaped_path();
        let file_name = format!("{}{}", module.escaped_version(), kind.suffix());
        let file_path = PathBuf::from(&escaped_path).join(&file_name);
        let proxy_path = format!("{escaped_path}/@v/{file_name}");

        Self {
            module,
            kind,
            file_name,
            file_path,
            proxy_path,
        }
    }
}

impl Module {
    /// The `.info` artifact of this module.
    pub fn info_file(&self) -> Artifact {
        Artifact::new(self.clone(), ArtifactKind::Info)
    }

    /// The `.mod` artifact of this module.
    pub fn mod_file(&self) -> Artifact {
        Artifact::new(self.clone(), ArtifactKind::Mod)
    }

    /// The `.zip` artifact of this module.
    pub fn zip_file(&self) -> Artifact {
        Artifact::new(self.clone(), ArtifactKind::Zip)
    }
}
