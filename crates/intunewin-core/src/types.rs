use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// Content of one entry in a source tree handed to the packager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryContent {
    /// Directory entry, archived as `<name>/` with no data
    Directory,
    /// File on disk, opened only when the archive is written
    File(PathBuf),
    /// File content already held in memory
    Inline(Vec<u8>),
}

/// One entry of the application folder being packaged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path relative to the source root, host separators allowed
    pub relative_path: PathBuf,
    pub content: EntryContent,
}

impl SourceEntry {
    pub fn directory(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: EntryContent::Directory,
        }
    }

    pub fn file(relative_path: impl Into<PathBuf>, disk_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: EntryContent::File(disk_path.into()),
        }
    }

    pub fn inline(relative_path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: EntryContent::Inline(data.into()),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.content, EntryContent::Directory)
    }

    /// Path to report when reading this entry fails.
    pub fn source_path(&self) -> &Path {
        match &self.content {
            EntryContent::File(path) => path,
            _ => &self.relative_path,
        }
    }

    /// Open the entry's content. Directories read as empty.
    pub fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        match &self.content {
            EntryContent::Directory => Ok(Box::new(io::empty())),
            EntryContent::File(path) => Ok(Box::new(std::fs::File::open(path)?)),
            EntryContent::Inline(data) => Ok(Box::new(data.as_slice())),
        }
    }

    /// Relative path with `/` as the only separator.
    ///
    /// `.` components are dropped; the result never starts or ends with `/`.
    pub fn relative_name(&self) -> String {
        self.relative_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Everything one packaging run needs.
///
/// `source_dir`'s base name becomes the application name and the inner
/// archive's top-level folder.
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Folder containing the application files
    pub source_dir: PathBuf,
    /// Setup executable, relative to `source_dir`
    pub setup_file: String,
    /// Directory the `.intunewin` file is written to
    pub output_dir: PathBuf,
    /// Suppress progress output
    pub quiet: bool,
}
