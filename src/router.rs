//! File routing: validated moves of finished artifacts into
//! caller-chosen directories, plus listing and age-based cleanup of a
//! managed output directory.
//!
//! A request that fails validation performs no filesystem mutation.
//! Writes go through a temporary file in the destination directory
//! followed by a rename, so a crash mid-copy never leaves a half-written
//! destination file. The only durable state is the files themselves;
//! there is no index to keep consistent.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use chrono::Local;
use fs2::available_space;
use glob::Pattern;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ToolError;

/// A validated request to relocate one file. Built per call; never
/// partially applied.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// File to relocate.
    pub source: PathBuf,
    /// Directory to place it in.
    pub dest_dir: PathBuf,
    /// Final name; source's base name when omitted.
    pub filename: Option<String>,
    /// Replace an existing destination file.
    pub overwrite: bool,
    /// Create the destination directory (and parents) when missing.
    pub create_dirs: bool,
    /// Remove the source after a successful write (default is copy).
    pub move_source: bool,
}

impl RouteRequest {
    pub fn new(source: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        RouteRequest {
            source: source.into(),
            dest_dir: dest_dir.into(),
            filename: None,
            overwrite: false,
            create_dirs: false,
            move_source: false,
        }
    }
}

/// Outcome of a successful `route` call.
#[derive(Debug)]
pub struct RouteResult {
    pub destination: PathBuf,
    pub bytes_moved: u64,
    pub overwrote: bool,
    pub warnings: Vec<String>,
}

/// Report from `validate_directory`.
#[derive(Debug)]
pub struct DirectoryValidation {
    pub path: PathBuf,
    pub exists: bool,
    pub writable: bool,
    pub free_space_bytes: u64,
    /// Whether this call created the directory.
    pub created: bool,
    pub warnings: Vec<String>,
}

/// One entry from `list_files`.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// Ordering key for `list_files`. Ascending in all cases: lexical for
/// names, oldest-first for modification time, smallest-first for size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Modified,
    Size,
}

impl std::str::FromStr for SortKey {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortKey::Name),
            "modified" => Ok(SortKey::Modified),
            "size" => Ok(SortKey::Size),
            other => Err(ToolError::invalid(format!(
                "unknown sort key '{other}' (expected name, modified, or size)"
            ))),
        }
    }
}

/// Relative directories scaffolded by [`StructureLayout::ByType`].
const BY_TYPE_DIRS: &[&str] = &[
    "images/png",
    "images/jpg",
    "images/gif",
    "sprites/aseprite",
    "sprites/sheets",
    "animations",
    "exports/final",
    "exports/drafts",
    "projects/active",
    "projects/archive",
];

/// Relative directories scaffolded by [`StructureLayout::ByProject`].
const BY_PROJECT_DIRS: &[&str] = &[
    "current_projects",
    "completed_projects",
    "templates",
    "resources/sprites",
    "resources/backgrounds",
    "exports/final",
    "exports/previews",
];

/// Directory tree shape for `create_structure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureLayout {
    /// Grouped by artifact kind (images, sprites, exports, projects).
    ByType,
    /// Grouped under the current year/month, plus archive and templates.
    ByDate,
    /// Grouped by project lifecycle (current, completed, resources).
    ByProject,
}

impl StructureLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureLayout::ByType => "by_type",
            StructureLayout::ByDate => "by_date",
            StructureLayout::ByProject => "by_project",
        }
    }

    /// Relative directories this layout scaffolds.
    fn directories(self) -> Vec<PathBuf> {
        match self {
            StructureLayout::ByType => BY_TYPE_DIRS.iter().map(PathBuf::from).collect(),
            StructureLayout::ByProject => BY_PROJECT_DIRS.iter().map(PathBuf::from).collect(),
            StructureLayout::ByDate => {
                let year_month = Local::now().format("%Y/%m").to_string();
                let mut dirs: Vec<PathBuf> = ["exports", "projects", "drafts"]
                    .iter()
                    .map(|leaf| Path::new(&year_month).join(leaf))
                    .collect();
                dirs.push(PathBuf::from("archive"));
                dirs.push(PathBuf::from("templates"));
                dirs
            }
        }
    }
}

impl std::str::FromStr for StructureLayout {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by_type" => Ok(StructureLayout::ByType),
            "by_date" => Ok(StructureLayout::ByDate),
            "by_project" => Ok(StructureLayout::ByProject),
            other => Err(ToolError::invalid(format!(
                "unknown structure type '{other}' (expected by_type, by_date, or by_project)"
            ))),
        }
    }
}

/// Report from `create_structure`.
#[derive(Debug)]
pub struct StructureReport {
    pub base: PathBuf,
    pub layout: StructureLayout,
    /// Scaffolded directories, relative to `base`, sorted.
    pub created: Vec<PathBuf>,
}

/// Filters for `cleanup`.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Glob pattern applied to file names.
    pub pattern: String,
    /// Only files whose last modification is older than this many days.
    pub max_age_days: u64,
    /// Report without deleting.
    pub dry_run: bool,
}

/// Immutable report produced by `cleanup`. Dry-run and real runs share
/// the same scan; only the act step differs.
#[derive(Debug)]
pub struct CleanupReport {
    /// Files matching the pattern and age filters.
    pub candidates: Vec<PathBuf>,
    /// Files actually removed (always empty in dry-run).
    pub deleted: usize,
    /// Files that matched but could not be removed, with reasons.
    pub skipped: Vec<(PathBuf, String)>,
    pub bytes_reclaimed: u64,
    pub dry_run: bool,
    /// Set when the scan stopped early on a cancellation request.
    pub cancelled: bool,
}

impl CleanupReport {
    pub fn matched(&self) -> usize {
        self.candidates.len()
    }
}

/// Routes files under an optional allow-list of destination roots.
#[derive(Debug, Clone)]
pub struct FileRouter {
    allowed_roots: Vec<PathBuf>,
    min_free_space: u64,
}

impl FileRouter {
    pub fn new(allowed_roots: Vec<PathBuf>, min_free_space_mb: u64) -> Self {
        // Roots are normalized once so later prefix checks never depend
        // on separator style or `..` segments.
        let allowed_roots = allowed_roots
            .into_iter()
            .map(|r| normalize_path(&r))
            .collect();
        FileRouter { allowed_roots, min_free_space: min_free_space_mb * 1024 * 1024 }
    }

    pub fn from_config(config: &Config) -> Self {
        FileRouter::new(config.allowed_roots.clone(), config.min_free_space_mb)
    }

    /// Normalize a caller-supplied destination directory and enforce the
    /// allow-list. This is the single path-normalization point; nothing
    /// below it branches on separators or relative segments.
    pub fn resolve_destination(&self, dir: &Path) -> Result<PathBuf, ToolError> {
        let normalized = normalize_path(dir);
        if self.allowed_roots.is_empty() {
            return Ok(normalized);
        }
        if self.allowed_roots.iter().any(|root| normalized.starts_with(root)) {
            Ok(normalized)
        } else {
            Err(ToolError::PermissionDenied {
                path: normalized,
                reason: "destination is outside the configured allowed roots".into(),
            })
        }
    }

    /// Relocate `req.source` into `req.dest_dir`.
    ///
    /// Validation happens up front; the destination is only touched once
    /// every check has passed, and the final content switch is a rename.
    pub fn route(&self, req: &RouteRequest) -> Result<RouteResult, ToolError> {
        let mut warnings = Vec::new();

        let source = &req.source;
        if !source.exists() {
            return Err(ToolError::SourceNotFound(source.clone()));
        }
        if !source.is_file() {
            return Err(ToolError::invalid(format!(
                "source is not a regular file: {}",
                source.display()
            )));
        }

        let dest_dir = self.resolve_destination(&req.dest_dir)?;
        if !dest_dir.exists() {
            if !req.create_dirs {
                return Err(ToolError::invalid(format!(
                    "destination directory does not exist: {} (pass create_dirs=true)",
                    dest_dir.display()
                )));
            }
            fs::create_dir_all(&dest_dir).map_err(|e| permission_or_io(&dest_dir, e))?;
            debug!(dir = %dest_dir.display(), "created destination directory");
        } else if !dest_dir.is_dir() {
            return Err(ToolError::invalid(format!(
                "destination exists but is not a directory: {}",
                dest_dir.display()
            )));
        }

        let filename = match &req.filename {
            Some(name) => sanitize_filename(name)?,
            None => source
                .file_name()
                .ok_or_else(|| ToolError::invalid("source path has no file name"))?
                .to_string_lossy()
                .into_owned(),
        };
        let dest_file = dest_dir.join(&filename);

        let pre_existing = dest_file.exists();
        if pre_existing && !req.overwrite {
            return Err(ToolError::PathConflict(dest_file));
        }

        if req.move_source {
            // A plain rename is atomic within a volume; fall back to
            // copy-then-delete when the volume boundary gets in the way.
            match fs::rename(source, &dest_file) {
                Ok(()) => {}
                Err(_) => {
                    self.copy_atomic(source, &dest_dir, &dest_file)?;
                    fs::remove_file(source)?;
                    warnings.push(
                        "cross-device move: copied to destination, then removed source".into(),
                    );
                }
            }
        } else {
            self.copy_atomic(source, &dest_dir, &dest_file)?;
        }

        let bytes_moved = fs::metadata(&dest_file)?.len();
        info!(
            source = %source.display(),
            destination = %dest_file.display(),
            bytes = bytes_moved,
            "file routed"
        );

        Ok(RouteResult {
            destination: dest_file,
            bytes_moved,
            overwrote: pre_existing,
            warnings,
        })
    }

    /// Copy `source` into `dest_dir` under a temporary name, then rename
    /// over `dest_file`. An interrupted copy leaves only the temp file,
    /// which tempfile removes on drop.
    fn copy_atomic(&self, source: &Path, dest_dir: &Path, dest_file: &Path) -> Result<(), ToolError> {
        let tmp = tempfile::Builder::new()
            .prefix(".route-")
            .tempfile_in(dest_dir)
            .map_err(|e| permission_or_io(dest_dir, e))?;

        let mut reader = fs::File::open(source)?;
        let mut writer = tmp.as_file();
        std::io::copy(&mut reader, &mut writer)?;
        writer.sync_all()?;

        // Carry the source's permission bits across.
        let perms = fs::metadata(source)?.permissions();
        fs::set_permissions(tmp.path(), perms)?;

        tmp.persist(dest_file).map_err(|e| ToolError::Io(e.error))?;
        Ok(())
    }

    /// Check a directory for routing use: existence (optionally creating
    /// it), a real write probe, and free space. Creating an
    /// already-existing directory is not an error.
    pub fn validate_directory(
        &self,
        path: &Path,
        create_if_missing: bool,
    ) -> Result<DirectoryValidation, ToolError> {
        let path = self.resolve_destination(path)?;
        let mut warnings = Vec::new();
        let mut created = false;

        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(&path).map_err(|e| permission_or_io(&path, e))?;
                created = true;
            } else {
                return Ok(DirectoryValidation {
                    path,
                    exists: false,
                    writable: false,
                    free_space_bytes: 0,
                    created: false,
                    warnings: vec!["directory does not exist".into()],
                });
            }
        } else if !path.is_dir() {
            return Err(ToolError::invalid(format!(
                "path exists but is not a directory: {}",
                path.display()
            )));
        }

        // Probe with a real write: permission bits can be misleading
        // across filesystems, an actual create-and-delete is not.
        let writable = match tempfile::Builder::new().prefix(".probe-").tempfile_in(&path) {
            Ok(_probe) => true,
            Err(e) => {
                warnings.push(format!("write probe failed: {e}"));
                false
            }
        };

        let free_space_bytes = available_space(&path).unwrap_or_else(|e| {
            warnings.push(format!("could not determine free space: {e}"));
            0
        });
        if free_space_bytes > 0 && free_space_bytes < self.min_free_space {
            warnings.push(format!(
                "low disk space: {} bytes available, {} required",
                free_space_bytes, self.min_free_space
            ));
        }

        Ok(DirectoryValidation { path, exists: true, writable, free_space_bytes, created, warnings })
    }

    /// List files in `dir` whose names match `pattern`, sorted ascending
    /// by `sort`. Directories and unreadable entries are skipped.
    pub fn list_files(
        &self,
        dir: &Path,
        pattern: &str,
        sort: SortKey,
    ) -> Result<Vec<FileEntry>, ToolError> {
        let dir = self.resolve_destination(dir)?;
        let mut entries: Vec<FileEntry> = scan_dir(&dir, pattern)?.collect();

        match sort {
            SortKey::Name => entries.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::Modified => entries.sort_by_key(|e| e.modified),
            SortKey::Size => entries.sort_by_key(|e| e.size),
        }
        Ok(entries)
    }

    /// Scaffold an organized directory tree under `base` for routing
    /// into. Directories that already exist are kept as-is, so the call
    /// is idempotent.
    pub fn create_structure(
        &self,
        base: &Path,
        layout: StructureLayout,
    ) -> Result<StructureReport, ToolError> {
        let base = self.resolve_destination(base)?;
        if base.exists() && !base.is_dir() {
            return Err(ToolError::invalid(format!(
                "base path exists but is not a directory: {}",
                base.display()
            )));
        }
        fs::create_dir_all(&base).map_err(|e| permission_or_io(&base, e))?;

        let mut created = layout.directories();
        created.sort();
        for dir in &created {
            let full = base.join(dir);
            fs::create_dir_all(&full).map_err(|e| permission_or_io(&full, e))?;
        }

        info!(
            base = %base.display(),
            layout = layout.as_str(),
            dirs = created.len(),
            "directory structure scaffolded"
        );
        Ok(StructureReport { base, layout, created })
    }

    /// Scan `dir` for files matching the cleanup filters and, unless
    /// `dry_run` is set, delete them. Deletion is best-effort per file:
    /// one locked or vanished file is recorded and the rest proceed.
    /// `cancel` is checked between entries, never mid-syscall.
    pub fn cleanup(
        &self,
        dir: &Path,
        opts: &CleanupOptions,
        cancel: &AtomicBool,
    ) -> Result<CleanupReport, ToolError> {
        let dir = self.resolve_destination(dir)?;
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(opts.max_age_days * 24 * 60 * 60))
            .ok_or_else(|| ToolError::invalid("max_age_days out of range"))?;

        // Scan step: shared verbatim by dry-run and real runs.
        let mut candidates = Vec::new();
        let mut cancelled = false;
        for entry in scan_dir(&dir, &opts.pattern)? {
            if cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            if entry.modified < cutoff {
                candidates.push(entry);
            }
        }

        // Act step.
        let mut deleted = 0usize;
        let mut skipped = Vec::new();
        let mut bytes_reclaimed = 0u64;
        if !opts.dry_run {
            for entry in &candidates {
                if cancel.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
                match fs::remove_file(&entry.path) {
                    Ok(()) => {
                        deleted += 1;
                        bytes_reclaimed += entry.size;
                    }
                    Err(e) => {
                        warn!(file = %entry.path.display(), error = %e, "cleanup skip");
                        skipped.push((entry.path.clone(), e.to_string()));
                    }
                }
            }
        }

        info!(
            dir = %dir.display(),
            matched = candidates.len(),
            deleted,
            dry_run = opts.dry_run,
            "cleanup finished"
        );

        Ok(CleanupReport {
            candidates: candidates.into_iter().map(|e| e.path).collect(),
            deleted,
            skipped,
            bytes_reclaimed,
            dry_run: opts.dry_run,
            cancelled,
        })
    }
}

/// Lazy scan of one directory level, yielding entries whose file names
/// match `pattern`. Calling it again restarts the scan.
fn scan_dir(
    dir: &Path,
    pattern: &str,
) -> Result<impl Iterator<Item = FileEntry>, ToolError> {
    let matcher = Pattern::new(pattern)
        .map_err(|e| ToolError::invalid(format!("bad glob pattern '{pattern}': {e}")))?;
    let read_dir = fs::read_dir(dir).map_err(|e| permission_or_io(dir, e))?;

    Ok(read_dir.filter_map(move |entry| {
        let entry = entry.ok()?;
        let meta = entry.metadata().ok()?;
        if !meta.is_file() {
            return None;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !matcher.matches(&name) {
            return None;
        }
        Some(FileEntry {
            name,
            path: entry.path(),
            size: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        })
    }))
}

/// Lexically normalize a path: make it absolute against the current
/// directory and fold `.`/`..` segments. `..` at the root stays at the
/// root, so a normalized path can never escape upward past it.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")).join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Validate a caller-supplied file name: it must be a bare name with no
/// directory components, so it cannot place the file outside the
/// destination directory.
pub fn sanitize_filename(name: &str) -> Result<String, ToolError> {
    if name.is_empty() {
        return Err(ToolError::invalid("filename cannot be empty"));
    }
    let path = Path::new(name);
    let is_bare = path.components().count() == 1
        && matches!(path.components().next(), Some(Component::Normal(_)));
    if !is_bare || name == ".." {
        return Err(ToolError::invalid(format!(
            "filename must not contain path separators or '..': {name}"
        )));
    }
    Ok(name.to_string())
}

fn permission_or_io(path: &Path, e: std::io::Error) -> ToolError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        ToolError::PermissionDenied { path: path.to_path_buf(), reason: e.to_string() }
    } else {
        ToolError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_dot_and_dotdot() {
        assert_eq!(normalize_path(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize_path(Path::new("/a/../../..")), PathBuf::from("/"));
    }

    #[test]
    fn normalize_makes_relative_paths_absolute() {
        assert!(normalize_path(Path::new("relative/dir")).is_absolute());
    }

    #[test]
    fn sanitize_accepts_plain_names() {
        assert_eq!(sanitize_filename("out.png").unwrap(), "out.png");
        assert_eq!(sanitize_filename("a b.gif").unwrap(), "a b.gif");
    }

    #[test]
    fn sanitize_rejects_traversal() {
        assert!(sanitize_filename("../out.png").is_err());
        assert!(sanitize_filename("a/b.png").is_err());
        assert!(sanitize_filename("/etc/passwd").is_err());
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("").is_err());
    }

    #[test]
    fn allow_list_blocks_outside_roots() {
        let router = FileRouter::new(vec![PathBuf::from("/srv/exports")], 0);
        assert!(router.resolve_destination(Path::new("/srv/exports/pngs")).is_ok());
        let err = router.resolve_destination(Path::new("/srv/exports/../secrets")).unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
        assert!(router.resolve_destination(Path::new("/home/user")).is_err());
    }

    #[test]
    fn empty_allow_list_accepts_any_destination() {
        let router = FileRouter::new(vec![], 0);
        assert!(router.resolve_destination(Path::new("/anywhere/at/all")).is_ok());
    }

    #[test]
    fn structure_layout_parses_known_names() {
        assert_eq!("by_type".parse::<StructureLayout>().unwrap(), StructureLayout::ByType);
        assert_eq!("by_date".parse::<StructureLayout>().unwrap(), StructureLayout::ByDate);
        assert_eq!("by_project".parse::<StructureLayout>().unwrap(), StructureLayout::ByProject);
        assert!("by_color".parse::<StructureLayout>().is_err());
    }

    #[test]
    fn by_date_layout_nests_under_year_and_month() {
        let dirs = StructureLayout::ByDate.directories();
        assert_eq!(dirs.len(), 5);
        // Three date-scoped directories plus archive and templates.
        let dated = dirs.iter().filter(|d| d.components().count() == 3).count();
        assert_eq!(dated, 3);
        assert!(dirs.contains(&PathBuf::from("archive")));
        assert!(dirs.contains(&PathBuf::from("templates")));
    }

    #[test]
    fn sort_key_parses_known_names() {
        assert_eq!("name".parse::<SortKey>().unwrap(), SortKey::Name);
        assert_eq!("modified".parse::<SortKey>().unwrap(), SortKey::Modified);
        assert_eq!("size".parse::<SortKey>().unwrap(), SortKey::Size);
        assert!("oldest".parse::<SortKey>().is_err());
    }
}
