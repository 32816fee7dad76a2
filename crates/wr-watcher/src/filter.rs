//! Ignore rules for watch events.
//!
//! Events are filtered before they reach the debouncer, and the same rules
//! prune directories while walking a recursive root. A path is ignored when
//! any of the following holds:
//!
//! 1. Its file name starts with a dot (`.git`, `.env`, `.main.rs.swp`)
//! 2. It matches a platform transient-file pattern (Windows only: Office lock
//!    files and shortcuts), or lies inside a recycle bin or system volume
//!    folder
//! 3. It matches an ignore pattern of the watch root that contains it, or a
//!    global pattern
//!
//! Patterns are matched against the path relative to its watch root using
//! gitignore glob semantics. Two loose rules apply on top:
//!
//! - `prefix/**/suffix`: the relative path starts with `prefix` and ends with
//!   or contains `suffix` (either side may be empty)
//! - `dir/`: the relative path is `dir` or lies beneath it
//!
//! # Examples
//!
//! ```
//! use camino::Utf8Path;
//! use wr_core::WatchRoot;
//! use wr_watcher::{FileFilter, IgnoreRules, Platform};
//!
//! let root = WatchRoot::new("/project").recursive().with_ignore(["*.tmp", "vendor/**"]);
//! let rules = IgnoreRules::new(&[root], &[], Platform::Unix);
//!
//! assert!(rules.should_ignore(Utf8Path::new("/project/cache.tmp")));
//! assert!(rules.should_ignore(Utf8Path::new("/project/vendor/lib/a.go")));
//! assert!(rules.should_ignore(Utf8Path::new("/project/.git")));
//! assert!(rules.should_process(Utf8Path::new("/project/src/main.go")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use smallvec::SmallVec;
use wr_core::{WatchRoot, IGNORE_FILE_NAME};

use crate::error::WatchError;

/// A filter for determining which paths to process.
///
/// Implementations are consulted for every classified notification and for
/// every entry while walking a recursive root. Paths for which
/// [`should_process`] returns `false` are dropped, and directories are pruned
/// together with their subtree.
///
/// # Thread Safety
///
/// Filters must be [`Send`] and [`Sync`] because they are shared between the
/// watch loop and directory walks. They must also be `'static` to be moved
/// into the spawned task.
///
/// [`should_process`]: FileFilter::should_process
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if events for `path` should be processed.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all paths.
///
/// # Examples
///
/// ```
/// use wr_watcher::{FileFilter, AcceptAllFilter};
/// use camino::Utf8Path;
///
/// let filter = AcceptAllFilter;
/// assert!(filter.should_process(Utf8Path::new(".hidden")));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Which transient-file patterns apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// No extra patterns.
    #[default]
    Unix,
    /// Office lock files (`~$*`), shortcuts (`*.lnk`), recycle bin and
    /// system volume folders.
    Windows,
}

impl Platform {
    /// Returns the platform this binary was built for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    fn is_transient(self, name: &str) -> bool {
        match self {
            Self::Unix => false,
            Self::Windows => name.starts_with("~$") || name.ends_with(".lnk"),
        }
    }

    /// Returns `true` if any component of `path` is a system folder.
    fn in_system_folder(self, path: &Utf8Path) -> bool {
        match self {
            Self::Unix => false,
            Self::Windows => path.iter().any(|component| {
                matches!(
                    component,
                    "$RECYCLE.BIN" | "$Recycle.Bin" | "System Volume Information"
                )
            }),
        }
    }
}

/// A `**` or trailing-slash pattern, matched textually.
#[derive(Debug, Clone)]
enum LoosePattern {
    DoubleStar { prefix: String, suffix: String },
    Directory(String),
}

impl LoosePattern {
    fn parse(pattern: &str) -> SmallVec<[Self; 2]> {
        let mut out = SmallVec::new();

        let parts: SmallVec<[&str; 3]> = pattern.split("**").collect();
        if let [prefix, suffix] = parts.as_slice() {
            out.push(Self::DoubleStar {
                prefix: prefix.trim_end_matches('/').to_owned(),
                suffix: suffix.trim_start_matches('/').to_owned(),
            });
        }

        if let Some(dir) = pattern.strip_suffix('/') {
            out.push(Self::Directory(dir.to_owned()));
        }

        out
    }

    fn matches(&self, rel: &str) -> bool {
        match self {
            Self::DoubleStar { prefix, suffix } => {
                (prefix.is_empty() || rel.starts_with(prefix.as_str()))
                    && (suffix.is_empty() || rel.contains(suffix.as_str()))
            }
            Self::Directory(dir) => {
                rel == dir
                    || rel
                        .strip_prefix(dir.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// Compiled patterns from one source.
#[derive(Debug, Clone)]
struct PatternSet {
    globs: Gitignore,
    loose: Vec<LoosePattern>,
}

impl PatternSet {
    fn build(base: &Utf8Path, patterns: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(base);
        let mut loose = Vec::new();

        for raw in patterns {
            let pattern = raw.trim().replace('\\', "/");
            if pattern.is_empty() {
                continue;
            }
            if let Err(error) = builder.add_line(None, &pattern) {
                tracing::warn!(pattern = %pattern, error = %error, "Skipping invalid ignore pattern");
            }
            loose.extend(LoosePattern::parse(&pattern));
        }

        let globs = builder.build().unwrap_or_else(|error| {
            tracing::warn!(base = %base, error = %error, "Failed to compile ignore patterns");
            Gitignore::empty()
        });

        Self { globs, loose }
    }

    fn matches(&self, rel: &Utf8Path, is_dir: bool) -> bool {
        if self.globs.matched(rel.as_std_path(), is_dir).is_ignore() {
            return true;
        }
        let rel = rel.as_str();
        self.loose.iter().any(|p| p.matches(rel))
    }

    fn is_empty(&self) -> bool {
        self.globs.is_empty() && self.loose.is_empty()
    }
}

#[derive(Debug, Clone)]
struct RootRules {
    root: Utf8PathBuf,
    patterns: PatternSet,
}

/// The ignore rules of every watch root plus the global patterns.
///
/// Built once at startup; [`should_ignore`](Self::should_ignore) is a pure
/// predicate.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    roots: Vec<RootRules>,
    global: PatternSet,
    platform: Platform,
}

impl IgnoreRules {
    /// Compiles the patterns of `roots` and the `global` patterns.
    ///
    /// Invalid globs are logged and skipped; their loose `**` and trailing
    /// slash rules still apply.
    #[must_use]
    pub fn new(roots: &[WatchRoot], global: &[String], platform: Platform) -> Self {
        let roots = roots
            .iter()
            .map(|r| RootRules {
                root: r.path.clone(),
                patterns: PatternSet::build(&r.path, &r.ignore),
            })
            .collect();

        Self {
            roots,
            global: PatternSet::build(Utf8Path::new(""), global),
            platform,
        }
    }

    /// Like [`new`](Self::new), but first adds the patterns from each root's
    /// `.watchrunignore` file, and uses the transient-file patterns of the
    /// current platform.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Io`] if an existing ignore file cannot be read.
    pub fn load(roots: &[WatchRoot], global: &[String]) -> Result<Self, WatchError> {
        let mut roots = roots.to_vec();
        for root in &mut roots {
            let file = root.path.join(IGNORE_FILE_NAME);
            if file.is_file() {
                let patterns = read_ignore_file(&file)?;
                tracing::debug!(file = %file, count = patterns.len(), "Loaded ignore file");
                root.ignore.extend(patterns);
            }
        }
        Ok(Self::new(&roots, global, Platform::current()))
    }

    /// Returns `true` if events for `path` should be dropped.
    #[must_use]
    pub fn should_ignore(&self, path: &Utf8Path) -> bool {
        if let Some(name) = path.file_name() {
            if name.starts_with('.') && name != "." && name != ".." {
                return true;
            }
            if self.platform.is_transient(name) {
                return true;
            }
        }

        let normalized = normalize(path);
        if self.platform.in_system_folder(&normalized) {
            return true;
        }
        let is_dir = path.is_dir();

        let mut contained = false;
        for rules in &self.roots {
            let Ok(rel) = normalized.strip_prefix(&rules.root) else {
                continue;
            };
            contained = true;
            if rel.as_str().is_empty() {
                continue;
            }
            if rules.patterns.matches(rel, is_dir) || self.global.matches(rel, is_dir) {
                return true;
            }
        }

        if contained {
            return false;
        }

        // Outside every root: match the path as given.
        self.global.matches(&normalized, is_dir)
            || self
                .roots
                .iter()
                .any(|r| !r.patterns.is_empty() && r.patterns.matches(&normalized, is_dir))
    }
}

impl FileFilter for IgnoreRules {
    #[inline]
    fn should_process(&self, path: &Utf8Path) -> bool {
        !self.should_ignore(path)
    }
}

fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    if path.as_str().contains('\\') {
        Utf8PathBuf::from(path.as_str().replace('\\', "/"))
    } else {
        path.to_path_buf()
    }
}

/// Reads an ignore file: one pattern per line, `#` comments and blank lines
/// skipped.
fn read_ignore_file(path: &Utf8Path) -> Result<Vec<String>, WatchError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}
