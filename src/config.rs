use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostics::Warning;
use crate::error::{DaocError, Result};

pub const CONFIG_FILE_NAME: &str = "daoc.toml";
pub const DEFAULT_MAX_CONVERTER_HOPS: usize = 2;

/// Compiler settings for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Upper bound on the number of converters chained between two types.
    pub max_converter_hops: usize,
    /// Verify queries against an in-memory reference database.
    pub verify_queries: bool,
    /// Narrow pojo queries to the columns the pojo actually reads.
    pub rewrite_unused_columns: bool,
    /// Public warning keys to drop, e.g. `DAOC_CURSOR_MISMATCH`.
    pub suppressed_warnings: Vec<String>,
    pub environment: Environment,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_converter_hops: DEFAULT_MAX_CONVERTER_HOPS,
            verify_queries: true,
            rewrite_unused_columns: true,
            suppressed_warnings: Vec::new(),
            environment: Environment::default(),
        }
    }
}

impl CompilerConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        let config: CompilerConfig = toml::from_str(content).map_err(|source| DaocError::Toml {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DaocError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Resolves the configuration for a declarations file.
    ///
    /// Lookup order: the explicit path, `daoc.toml` next to the input, the
    /// user config directory, then built-in defaults.
    pub fn discover(explicit: Option<&Path>, input: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let sibling = input
            .parent()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|p| p.is_file());
        if let Some(path) = sibling {
            tracing::debug!(path = %path.display(), "using sibling config");
            return Self::load(&path);
        }
        if let Some(path) = Self::user_config_path().filter(|p| p.is_file()) {
            tracing::debug!(path = %path.display(), "using user config");
            return Self::load(&path);
        }
        Ok(Self::default())
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("daoc").join("config.toml"))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DaocError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.max_converter_hops == 0 {
            return Err(DaocError::Config(
                "max_converter_hops must be at least 1".to_string(),
            ));
        }
        self.suppressed()?;
        Ok(())
    }

    /// Parses `suppressed_warnings` into warning kinds.
    pub fn suppressed(&self) -> Result<Vec<Warning>> {
        self.suppressed_warnings
            .iter()
            .map(|key| key.parse::<Warning>().map_err(DaocError::Config))
            .collect()
    }
}

/// Optional runtime libraries a generated DAO may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Library {
    Lifecycle,
    Paging,
    Rx2,
    Rx3,
    Guava,
    Coroutines,
}

impl Library {
    pub const ALL: [Library; 6] = [
        Library::Lifecycle,
        Library::Paging,
        Library::Rx2,
        Library::Rx3,
        Library::Guava,
        Library::Coroutines,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Library::Lifecycle => "lifecycle",
            Library::Paging => "paging",
            Library::Rx2 => "rx2",
            Library::Rx3 => "rx3",
            Library::Guava => "guava",
            Library::Coroutines => "coroutines",
        }
    }
}

/// Companion runtime artifacts that carry the glue for a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Artifact {
    #[serde(rename = "daoc-coroutines")]
    Coroutines,
    #[serde(rename = "daoc-guava")]
    Guava,
    #[serde(rename = "daoc-rxjava2")]
    RxJava2,
    #[serde(rename = "daoc-rxjava3")]
    RxJava3,
}

impl Artifact {
    pub const ALL: [Artifact; 4] = [
        Artifact::Coroutines,
        Artifact::Guava,
        Artifact::RxJava2,
        Artifact::RxJava3,
    ];
}

/// What the generated code can link against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub libraries: BTreeSet<Library>,
    pub artifacts: BTreeSet<Artifact>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            libraries: Library::ALL.into_iter().collect(),
            artifacts: Artifact::ALL.into_iter().collect(),
        }
    }
}

impl Environment {
    /// No optional library or artifact available.
    pub fn bare() -> Self {
        Self {
            libraries: BTreeSet::new(),
            artifacts: BTreeSet::new(),
        }
    }

    pub fn has_library(&self, library: Library) -> bool {
        self.libraries.contains(&library)
    }

    pub fn has_artifact(&self, artifact: Artifact) -> bool {
        self.artifacts.contains(&artifact)
    }

    pub fn without_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.remove(&artifact);
        self
    }

    pub fn without_library(mut self, library: Library) -> Self {
        self.libraries.remove(&library);
        self
    }
}
