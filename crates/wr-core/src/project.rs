//! Project detection and starter configuration templates.
//!
//! `watchrun init` inspects the current directory for well-known manifest
//! files and writes a `watchrun.yaml` tuned for the detected toolchain.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::CONFIG_FILE_NAME;
use crate::error::ConfigError;

/// Toolchain detected from manifest files in a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectKind {
    /// `go.mod`
    Go,
    /// `Cargo.toml`
    Rust,
    /// `pyproject.toml`, `setup.py`, `requirements.txt`, `Pipfile` or `poetry.lock`
    Python,
    /// `package.json` together with `tsconfig.json`
    TypeScript,
    /// `package.json`
    Node,
    /// Nothing recognised.
    Unknown,
}

const PYTHON_MARKERS: &[&str] = &[
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
    "Pipfile",
    "poetry.lock",
];

impl ProjectKind {
    /// Detects the project kind of `dir`.
    ///
    /// Markers are checked in a fixed order (Go, Rust, Python, TypeScript,
    /// Node), so a directory with both `go.mod` and `Cargo.toml` is Go.
    #[must_use]
    pub fn detect(dir: &Utf8Path) -> Self {
        let has = |name: &str| dir.join(name).exists();

        if has("go.mod") {
            Self::Go
        } else if has("Cargo.toml") {
            Self::Rust
        } else if PYTHON_MARKERS.iter().any(|m| has(m)) {
            Self::Python
        } else if has("package.json") {
            if has("tsconfig.json") {
                Self::TypeScript
            } else {
                Self::Node
            }
        } else {
            Self::Unknown
        }
    }

    /// Returns a human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Go => "Go",
            Self::Rust => "Rust",
            Self::Python => "Python",
            Self::TypeScript => "TypeScript",
            Self::Node => "Node.js",
            Self::Unknown => "Unknown",
        }
    }

    /// Returns the starter configuration for this kind.
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::Go => GO_TEMPLATE,
            Self::Rust => RUST_TEMPLATE,
            Self::Python => PYTHON_TEMPLATE,
            Self::TypeScript | Self::Node => NODE_TEMPLATE,
            Self::Unknown => DEFAULT_TEMPLATE,
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detects the project kind of `dir` and writes the matching template to
/// `dir/watchrun.yaml`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPath`] if the file already exists, or
/// [`ConfigError::Io`] if it cannot be written.
pub fn write_template(dir: &Utf8Path) -> Result<(ProjectKind, Utf8PathBuf), ConfigError> {
    let kind = ProjectKind::detect(dir);
    let path = dir.join(CONFIG_FILE_NAME);

    if path.exists() {
        return Err(ConfigError::InvalidPath {
            path,
            reason: "config file already exists".to_owned(),
        });
    }

    std::fs::write(&path, kind.template())?;
    tracing::debug!(path = %path, kind = %kind, "Wrote configuration template");
    Ok((kind, path))
}

/// Writes an example ignore file to `path`.
///
/// On Windows the file also lists Office lock files, shortcuts and system
/// folders.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be written.
pub fn write_example_ignore(path: &Utf8Path) -> Result<(), ConfigError> {
    let mut contents = EXAMPLE_IGNORE.to_owned();
    if cfg!(windows) {
        contents.push_str(WINDOWS_IGNORE);
    }
    std::fs::write(path, contents)?;
    Ok(())
}

const GO_TEMPLATE: &str = r#"# watchrun configuration for a Go project
watch:
  - path: "./"
    recursive: true
    ignore:
      - "**/vendor/**"
      - "**/*.exe"
      - "**/bin/**"
      - ".git/**"

on_change:
  commands:
    - cmd: ["go", "fmt", "./..."]
      timeout: "30s"
    - cmd: ["go", "test", "-v", "./..."]
      timeout: "120s"
    - cmd: ["go", "build", "./..."]
      timeout: "90s"

debounce: "500ms"
max_concurrency: 1
"#;

const PYTHON_TEMPLATE: &str = r#"# watchrun configuration for a Python project
watch:
  - path: "./"
    recursive: true
    ignore:
      - "**/__pycache__/**"
      - "**/venv/**"
      - "**/env/**"
      - "**/.pytest_cache/**"
      - ".git/**"

on_change:
  commands:
    - cmd: ["python", "-m", "pytest", "-v"]
      timeout: "120s"

debounce: "500ms"
max_concurrency: 1
"#;

const RUST_TEMPLATE: &str = r#"# watchrun configuration for a Rust project
watch:
  - path: "./src"
    recursive: true
  - path: "Cargo.toml"

ignore:
  - "**/target/**"
  - ".git/**"

on_change:
  commands:
    - cmd: ["cargo", "check"]
      timeout: "60s"
    - cmd: ["cargo", "test"]
      timeout: "180s"
    - cmd: ["cargo", "build"]
      timeout: "120s"

debounce: "750ms"
max_concurrency: 1
"#;

const NODE_TEMPLATE: &str = r#"# watchrun configuration for a Node.js/TypeScript project
watch:
  - path: "./src"
    recursive: true

ignore:
  - "**/node_modules/**"
  - "**/dist/**"
  - "**/build/**"
  - ".git/**"

on_change:
  commands:
    - cmd: ["npm", "run", "lint"]
      timeout: "60s"
    - cmd: ["npm", "test"]
      timeout: "120s"
    - cmd: ["npm", "run", "build"]
      timeout: "180s"

debounce: "500ms"
max_concurrency: 1
"#;

const DEFAULT_TEMPLATE: &str = r#"# watchrun configuration
watch:
  - path: "./"
    recursive: true
    ignore:
      - "vendor/**"
      - ".git/**"
      - "**/*.tmp"

on_change:
  commands:
    - cmd: ["echo", "File changed: {path}"]

debounce: "250ms"
max_concurrency: 2
"#;

const EXAMPLE_IGNORE: &str = "# watchrun ignore file
# One pattern per line, gitignore style

# Dependencies
vendor/
node_modules/

# Version control
.git/
.svn/

# Temp files
*.tmp
*.log
*.swp
*~

# Build outputs
*.exe
*.dll
*.so
*.dylib
dist/
build/

# IDE
.idea/
.vscode/
*.iml

# OS
.DS_Store
Thumbs.db
Desktop.ini
";

const WINDOWS_IGNORE: &str = "
# Windows
~$*
*.lnk
$RECYCLE.BIN/
System Volume Information/
";
