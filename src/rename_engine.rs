use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, Context};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::identifier::{IdentifierExtractor, DEFAULT_SUFFIXES};
use crate::metadata::{HttpResolver, MetadataResolver, ResolveError, DEFAULT_METADATA_URL, DEFAULT_TIMEOUT};
use crate::naming::{synthesize, TargetLocation};

#[derive(Debug, Clone)]
pub struct RenameConfig {
    pub directory: PathBuf,
    pub organize_into_series: bool,
    pub recognized_suffixes: Vec<String>,
    pub metadata_url: String,
    pub timeout: Duration,
    pub dry_run: bool,
}

/// A file discovered under the root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub dir: PathBuf,
    pub file_name: String,
    pub path: PathBuf,
    pub is_file: bool,
}

impl FileCandidate {
    /// Extension including the leading dot, empty when there is none. Taken
    /// from the raw path so non-UTF-8 bytes survive.
    pub fn extension(&self) -> OsString {
        let mut extension = OsString::new();
        if let Some(ext) = self.path.extension() {
            extension.push(".");
            extension.push(ext);
        }
        extension
    }
}

#[derive(Debug, Error)]
#[error("Cannot read directory tree under {root:?}: {source}")]
pub struct TraversalError {
    pub root: PathBuf,
    #[source]
    pub source: walkdir::Error,
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Target {0:?} already exists")]
    AlreadyExists(PathBuf),

    #[error("Source {0:?} not found")]
    SourceNotFound(PathBuf),

    #[error("No permission to move {0:?}")]
    NoPermission(PathBuf),

    #[error("Could not create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not move {from:?} to {to:?}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PruneError {
    #[error("Could not list directory {path:?}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not remove directory {path:?}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Rename(#[from] RenameError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyConverted,
    NotRegularFile,
}

#[derive(Debug)]
pub enum ConversionOutcome {
    Converted {
        destination: PathBuf,
        removed_dir: Option<PathBuf>,
    },
    Skipped(SkipReason),
    Failed(ConversionError),
}

/// Per-file results of one conversion run.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub outcomes: Vec<(PathBuf, ConversionOutcome)>,
}

impl ConversionReport {
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ConversionOutcome::Converted { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ConversionOutcome::Skipped(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ConversionOutcome::Failed(_)))
            .count()
    }

    fn record(&mut self, path: PathBuf, outcome: ConversionOutcome) {
        self.outcomes.push((path, outcome));
    }
}

/// Lists every non-directory entry below `root`, depth first.
///
/// The whole tree is read before returning so later renames cannot disturb
/// the walk.
pub fn enumerate(root: &Path) -> Result<Vec<FileCandidate>, TraversalError> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| TraversalError {
            root: root.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path().to_path_buf();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        candidates.push(FileCandidate {
            dir,
            file_name: entry.file_name().to_string_lossy().to_string(),
            is_file: entry.file_type().is_file(),
            path,
        });
    }

    debug!("Found {} file(s) under {:?}", candidates.len(), root);

    Ok(candidates)
}

/// Moves `from` to `to`, creating missing parent directories. Never
/// overwrites an existing file.
pub fn rename_file(from: &Path, to: &Path) -> Result<(), RenameError> {
    if to.symlink_metadata().is_ok() {
        return Err(RenameError::AlreadyExists(to.to_path_buf()));
    }

    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_private_dir_all(parent).map_err(|source| RenameError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::rename(from, to).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => RenameError::SourceNotFound(from.to_path_buf()),
        io::ErrorKind::PermissionDenied => RenameError::NoPermission(from.to_path_buf()),
        _ => RenameError::Io {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        },
    })
}

#[cfg(unix)]
fn create_private_dir_all(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir_all(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Removes `dir` if it has no entries left. Returns whether it was removed.
pub fn prune_if_empty(dir: &Path) -> Result<bool, PruneError> {
    let mut entries = fs::read_dir(dir).map_err(|source| PruneError::List {
        path: dir.to_path_buf(),
        source,
    })?;

    if entries.next().is_some() {
        return Ok(false);
    }

    fs::remove_dir(dir).map_err(|source| PruneError::Remove {
        path: dir.to_path_buf(),
        source,
    })?;

    Ok(true)
}

#[derive(Debug)]
pub struct RenameEngine<R = HttpResolver> {
    config: RenameConfig,
    extractor: IdentifierExtractor,
    resolver: R,
}

impl RenameEngine<HttpResolver> {
    pub fn new(config: RenameConfig) -> Result<Self> {
        let resolver = HttpResolver::new(&config.metadata_url, config.timeout)
            .context("Failed to build metadata client")?;
        Self::with_resolver(config, resolver)
    }
}

impl<R: MetadataResolver> RenameEngine<R> {
    pub fn with_resolver(config: RenameConfig, resolver: R) -> Result<Self> {
        let extractor = IdentifierExtractor::new(&config.recognized_suffixes)?;

        Ok(Self {
            config,
            extractor,
            resolver,
        })
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Converts every file under the configured directory.
    ///
    /// Only a failure to walk the tree aborts the run; per-file problems are
    /// logged and recorded in the report.
    pub fn convert(&self) -> Result<ConversionReport, TraversalError> {
        let candidates = enumerate(&self.config.directory)?;
        let mut report = ConversionReport::default();

        for candidate in candidates {
            let outcome = self.convert_file(&candidate);
            report.record(candidate.path, outcome);
        }

        info!(
            "Converted {} file(s), skipped {}, failed {}",
            report.success_count(),
            report.skipped_count(),
            report.failed_count()
        );

        Ok(report)
    }

    pub fn convert_file(&self, candidate: &FileCandidate) -> ConversionOutcome {
        if !candidate.is_file {
            debug!("Not a regular file: {:?}", candidate.path);
            return ConversionOutcome::Skipped(SkipReason::NotRegularFile);
        }

        let Some(pid) = self.extractor.extract(&candidate.file_name) else {
            info!("File already converted: {:?}", candidate.path);
            return ConversionOutcome::Skipped(SkipReason::AlreadyConverted);
        };

        let metadata = match self.resolver.resolve(&pid) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping \"{}\": {}", candidate.file_name, e);
                return ConversionOutcome::Failed(e.into());
            }
        };

        let target = synthesize(
            &metadata,
            candidate.extension(),
            self.config.organize_into_series,
        );
        let destination = self.destination(candidate, &target);

        if destination == candidate.path {
            info!("File already has its converted name: {:?}", candidate.path);
            return ConversionOutcome::Skipped(SkipReason::AlreadyConverted);
        }

        if self.config.dry_run {
            info!("Would convert \"{}\" to {:?}", candidate.file_name, destination);
            return ConversionOutcome::Converted {
                destination,
                removed_dir: None,
            };
        }

        info!(
            "Converting \"{}\" to \"{}\"",
            candidate.file_name,
            target.file_name.to_string_lossy()
        );

        if let Err(e) = rename_file(&candidate.path, &destination) {
            error!("Failed to convert \"{}\": {}", candidate.file_name, e);
            return ConversionOutcome::Failed(e.into());
        }

        let removed_dir = self.cleanup_source_dir(candidate, &destination);

        ConversionOutcome::Converted {
            destination,
            removed_dir,
        }
    }

    /// Organized output goes next to the file's own directory, never above
    /// the root.
    fn base_directory<'a>(&self, candidate: &'a FileCandidate) -> &'a Path {
        if !self.config.organize_into_series || candidate.dir == self.config.directory {
            return &candidate.dir;
        }

        candidate.dir.parent().unwrap_or(&candidate.dir)
    }

    fn destination(&self, candidate: &FileCandidate, target: &TargetLocation) -> PathBuf {
        self.base_directory(candidate).join(target.relative_path())
    }

    fn cleanup_source_dir(&self, candidate: &FileCandidate, destination: &Path) -> Option<PathBuf> {
        if destination.parent() == Some(candidate.dir.as_path()) {
            return None;
        }

        match prune_if_empty(&candidate.dir) {
            Ok(true) => {
                info!("Removing directory {:?}", candidate.dir);
                Some(candidate.dir.clone())
            }
            Ok(false) => None,
            Err(e) => {
                warn!("Converted \"{}\" but {}", candidate.file_name, e);
                None
            }
        }
    }
}

pub struct ConfigBuilder {
    directory: Option<PathBuf>,
    organize_into_series: bool,
    recognized_suffixes: Vec<String>,
    metadata_url: String,
    timeout: Duration,
    dry_run: bool,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            directory: None,
            organize_into_series: false,
            recognized_suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            dry_run: false,
        }
    }

    pub fn directory<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.directory = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn organize_into_series(mut self, organize: bool) -> Self {
        self.organize_into_series = organize;
        self
    }

    pub fn suffixes(mut self, suffixes: Vec<String>) -> Self {
        if !suffixes.is_empty() {
            self.recognized_suffixes = suffixes;
        }
        self
    }

    pub fn metadata_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.metadata_url = url;
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn build(self) -> Result<RenameConfig> {
        let directory = self.directory
            .ok_or_else(|| anyhow::anyhow!("Directory is required"))?;

        if let Some(bad) = self
            .recognized_suffixes
            .iter()
            .find(|s| s.is_empty() || !s.chars().all(|c| c.is_alphanumeric() || c == '_'))
        {
            return Err(anyhow::anyhow!("Invalid suffix keyword: {:?}", bad));
        }

        if self.timeout.is_zero() {
            return Err(anyhow::anyhow!("Timeout must be greater than zero"));
        }

        Ok(RenameConfig {
            directory,
            organize_into_series: self.organize_into_series,
            recognized_suffixes: self.recognized_suffixes,
            metadata_url: self.metadata_url,
            timeout: self.timeout,
            dry_run: self.dry_run,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .directory("/test/path")
            .organize_into_series(true)
            .build()
            .unwrap();

        assert_eq!(config.directory, PathBuf::from("/test/path"));
        assert!(config.organize_into_series);
        assert_eq!(config.recognized_suffixes, DEFAULT_SUFFIXES);
        assert_eq!(config.metadata_url, DEFAULT_METADATA_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder_requires_directory() {
        assert!(ConfigBuilder::new().build().is_err());
    }

    #[test]
    fn test_config_builder_rejects_bad_suffix() {
        let result = ConfigBuilder::new()
            .directory("/test/path")
            .suffixes(vec!["orig.inal".to_string()])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_candidate_extension() {
        let candidate = FileCandidate {
            dir: PathBuf::from("/media"),
            file_name: "abc123 original.mp4".to_string(),
            path: PathBuf::from("/media/abc123 original.mp4"),
            is_file: true,
        };
        assert_eq!(candidate.extension(), ".mp4");

        let bare = FileCandidate {
            file_name: "README".to_string(),
            path: PathBuf::from("/media/README"),
            ..candidate
        };
        assert_eq!(bare.extension(), "");
    }

    #[test]
    fn test_enumerate_skips_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("a/b/one original.mp4"), b"").unwrap();
        fs::write(tmp.path().join("two.txt"), b"").unwrap();

        let candidates = enumerate(tmp.path()).unwrap();
        let names: Vec<_> = candidates.iter().map(|c| c.file_name.as_str()).collect();

        assert_eq!(names, vec!["one original.mp4", "two.txt"]);
        assert_eq!(candidates[0].dir, tmp.path().join("a/b"));
        assert!(candidates.iter().all(|c| c.is_file));
    }

    #[test]
    fn test_enumerate_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(enumerate(&tmp.path().join("missing")).is_err());
    }

    #[test]
    fn test_rename_file_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("in.mp4");
        let to = tmp.path().join("Show/Series 1/out.mp4");
        fs::write(&from, b"data").unwrap();

        rename_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"data");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(tmp.path().join("Show")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_rename_file_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("in.mp4");
        let to = tmp.path().join("out.mp4");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        let err = rename_file(&from, &to).unwrap_err();

        assert!(matches!(err, RenameError::AlreadyExists(_)));
        assert_eq!(fs::read(&from).unwrap(), b"new");
        assert_eq!(fs::read(&to).unwrap(), b"old");
    }

    #[test]
    fn test_rename_file_missing_source() {
        let tmp = TempDir::new().unwrap();
        let err = rename_file(&tmp.path().join("gone.mp4"), &tmp.path().join("out.mp4")).unwrap_err();
        assert!(matches!(err, RenameError::SourceNotFound(_)));
    }

    #[test]
    fn test_prune_if_empty() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty");
        let full = tmp.path().join("full");
        fs::create_dir(&empty).unwrap();
        fs::create_dir(&full).unwrap();
        fs::write(full.join("keep.txt"), b"").unwrap();

        assert!(prune_if_empty(&empty).unwrap());
        assert!(!empty.exists());

        assert!(!prune_if_empty(&full).unwrap());
        assert!(full.join("keep.txt").exists());

        assert!(matches!(prune_if_empty(&empty), Err(PruneError::List { .. })));
    }
}
