//! Package assembly: source tree → inner archive → encrypted blob →
//! Detection.xml → outer `.intunewin` container

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use intunewin_core::{PackOptions, SourceEntry};
use tracing::{debug, info};

use crate::archive::{build_inner_archive, build_outer_archive};
use crate::detection::{render_detection_xml, ENCRYPTED_FILE_NAME};
use crate::error::{PackError, PackResult, Stage};
use crate::walk::{app_name_for, walk_source_dir};

/// Extension of the written container
pub const PACKAGE_EXTENSION: &str = "intunewin";

/// Number of pipeline steps reported through [`ProgressFn`]
pub const TOTAL_STEPS: u64 = 4;

/// Progress callback: `(step, total_steps, message)`.
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;

/// Build a complete `.intunewin` container in memory.
///
/// `setup_file` is recorded in Detection.xml as given; `app_name` becomes both
/// the inner archive's top-level folder and the `Name` element.
pub fn assemble_package(
    source_tree: &[SourceEntry],
    setup_file: &str,
    app_name: &str,
) -> PackResult<Vec<u8>> {
    assemble(source_tree, setup_file, app_name, &StepLog::default())
}

#[derive(Default)]
struct StepLog<'a> {
    quiet: bool,
    progress: Option<&'a ProgressFn>,
}

impl StepLog<'_> {
    fn step(&self, n: u64, msg: &str) {
        if self.quiet {
            debug!(step = n, total = TOTAL_STEPS, "{msg}");
        } else {
            info!(step = n, total = TOTAL_STEPS, "{msg}");
        }
        if let Some(cb) = self.progress {
            cb(n, TOTAL_STEPS, msg);
        }
    }
}

fn assemble(
    source_tree: &[SourceEntry],
    setup_file: &str,
    app_name: &str,
    log: &StepLog<'_>,
) -> PackResult<Vec<u8>> {
    log.step(1, "creating inner archive");
    let inner = build_inner_archive(source_tree, app_name)?;
    debug!(entries = source_tree.len(), bytes = inner.len(), "inner archive built");

    log.step(2, "encrypting content");
    let (result, blob) = intunewin_crypto::encrypt(&inner)?;
    drop(inner);
    debug!(bytes = blob.len(), "content encrypted");

    log.step(3, "generating Detection.xml");
    let detection = render_detection_xml(app_name, setup_file, ENCRYPTED_FILE_NAME, &result)?;

    log.step(4, "creating .intunewin container");
    let package = build_outer_archive(&detection, &blob)?;
    debug!(bytes = package.len(), "container built");
    Ok(package)
}

// ── Packager ─────────────────────────────────────────────────────────────────

/// Packages one source folder into `<output_dir>/<app_name>.intunewin`.
pub struct Packager {
    opts: PackOptions,
}

impl Packager {
    pub fn new(opts: PackOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PackOptions {
        &self.opts
    }

    /// Check that the source folder exists and contains the setup file.
    ///
    /// Returns the canonical source folder, so `.` still yields a real
    /// application name.
    pub fn validate(&self) -> PackResult<PathBuf> {
        let source = &self.opts.source_dir;
        if !source.is_dir() {
            return Err(PackError::InvalidInput(format!(
                "source folder does not exist or is not a directory: {}",
                source.display()
            )));
        }
        if self.opts.setup_file.trim().is_empty() {
            return Err(PackError::InvalidInput("setup file is required".into()));
        }

        let setup = Path::new(&self.opts.setup_file);
        if setup
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(PackError::InvalidInput(format!(
                "setup file must be a relative path inside the source folder: {}",
                self.opts.setup_file
            )));
        }

        let source = fs::canonicalize(source).map_err(PackError::io(Stage::Validation, source))?;
        let setup_path = source.join(setup);
        if !setup_path.is_file() {
            return Err(PackError::InvalidInput(format!(
                "setup file not found: {}",
                setup_path.display()
            )));
        }
        // a symlink on the way may still lead outside
        let resolved =
            fs::canonicalize(&setup_path).map_err(PackError::io(Stage::Validation, &setup_path))?;
        if !resolved.starts_with(&source) {
            return Err(PackError::InvalidInput(format!(
                "setup file resolves outside the source folder: {}",
                resolved.display()
            )));
        }
        Ok(source)
    }

    /// Where the container for `source` is written.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        self.opts
            .output_dir
            .join(format!("{}.{PACKAGE_EXTENSION}", app_name_for(source)))
    }

    /// Validate, walk, assemble and write the container. Returns its path.
    pub fn create_package(&self) -> PackResult<PathBuf> {
        self.run(None)
    }

    /// Like [`create_package`](Self::create_package), reporting each step to
    /// `progress` unless the options ask for quiet output.
    pub fn create_package_with_progress(&self, progress: &ProgressFn) -> PackResult<PathBuf> {
        self.run(Some(progress))
    }

    fn run(&self, progress: Option<&ProgressFn>) -> PackResult<PathBuf> {
        let source = self.validate()?;
        let app_name = app_name_for(&source);
        let output = self.output_path(&source);
        info!(
            source = %source.display(),
            setup = %self.opts.setup_file,
            output = %output.display(),
            "packaging"
        );

        let entries = walk_source_dir(&source)?;
        let log = StepLog {
            quiet: self.opts.quiet,
            progress: if self.opts.quiet { None } else { progress },
        };
        let package = assemble(&entries, &self.opts.setup_file, &app_name, &log)?;

        write_atomic(&output, &package)?;
        info!(path = %output.display(), bytes = package.len(), "package written");
        Ok(output)
    }
}

/// Package `opts.source_dir` with a fresh [`Packager`].
pub fn create_package(opts: &PackOptions) -> PackResult<PathBuf> {
    Packager::new(opts.clone()).create_package()
}

/// Write to a uniquely named temp file beside `path`, then rename over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> PackResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(PackError::io(Stage::Writing, parent))?;

    // removed on drop if anything below fails
    let mut tmp = tempfile::Builder::new()
        .prefix(".intunewin-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(PackError::io(Stage::Writing, parent))?;
    tmp.write_all(data)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(PackError::io(Stage::Writing, tmp.path()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(PackError::io(Stage::Writing, tmp.path()))?;
    }

    tmp.persist(path)
        .map_err(|e| PackError::io(Stage::Writing, path)(e.error))?;
    Ok(())
}
