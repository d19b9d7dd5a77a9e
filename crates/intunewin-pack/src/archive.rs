//! ZIP archives: the inner archive of the application folder and the outer
//! `.intunewin` container
//!
//! Outer container layout:
//! ```text
//! IntuneWinPackage/
//! ├── Contents/
//! │   └── IntunePackage.intunewin   (MAC || IV || ciphertext of the inner archive)
//! └── Metadata/
//!     └── Detection.xml
//! ```
//!
//! Entries carry the ZIP epoch timestamp, so identical input yields
//! identical archives.

use std::io::{self, Cursor, Read, Seek};

use intunewin_core::SourceEntry;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{PackError, PackResult, Stage};

/// Top-level folder of the outer container
pub const PACKAGE_ROOT: &str = "IntuneWinPackage";

pub const DETECTION_XML_PATH: &str = "IntuneWinPackage/Metadata/Detection.xml";

pub const ENCRYPTED_CONTENT_PATH: &str = "IntuneWinPackage/Contents/IntunePackage.intunewin";

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
}

fn directory_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755)
}

/// Archive name of `entry` under the `app_name/` folder; directories end in `/`.
pub fn archive_entry_name(app_name: &str, entry: &SourceEntry) -> String {
    let mut name = format!("{app_name}/{}", entry.relative_name());
    if entry.is_dir() && !name.ends_with('/') {
        name.push('/');
    }
    name
}

/// Zip every entry of the source tree under a single `app_name/` folder.
///
/// File content is streamed from each entry; the first read failure aborts
/// the whole archive.
pub fn build_inner_archive(entries: &[SourceEntry], app_name: &str) -> PackResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for entry in entries {
        let name = archive_entry_name(app_name, entry);

        if entry.is_dir() {
            zip.add_directory(name, directory_options())
                .map_err(PackError::archive(Stage::Archiving))?;
            continue;
        }

        zip.start_file(name, entry_options())
            .map_err(PackError::archive(Stage::Archiving))?;
        let mut reader = entry
            .open()
            .map_err(PackError::io(Stage::Archiving, entry.source_path()))?;
        io::copy(&mut reader, &mut zip)
            .map_err(PackError::io(Stage::Archiving, entry.source_path()))?;
    }

    let cursor = zip
        .finish()
        .map_err(PackError::archive(Stage::Archiving))?;
    Ok(cursor.into_inner())
}

/// Build the outer container: Detection.xml first, then the encrypted blob.
pub fn build_outer_archive(detection_xml: &[u8], encrypted_content: &[u8]) -> PackResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (path, content) in [
        (DETECTION_XML_PATH, detection_xml),
        (ENCRYPTED_CONTENT_PATH, encrypted_content),
    ] {
        zip.start_file(path, entry_options())
            .map_err(PackError::archive(Stage::FinalAssembly))?;
        io::Write::write_all(&mut zip, content)
            .map_err(PackError::io(Stage::FinalAssembly, path))?;
    }

    let cursor = zip
        .finish()
        .map_err(PackError::archive(Stage::FinalAssembly))?;
    Ok(cursor.into_inner())
}

/// Names of all entries in a ZIP archive, in archive order.
pub fn list_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> PackResult<Vec<String>> {
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive
            .by_index_raw(i)
            .map_err(PackError::archive(Stage::Inspection))?;
        names.push(file.name().to_string());
    }
    Ok(names)
}

/// Read one entry of a ZIP archive fully into memory.
///
/// A missing entry is `InvalidInput`; a damaged one is an archive error.
pub fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> PackResult<Vec<u8>> {
    let mut file = archive.by_name(name).map_err(|e| match e {
        ZipError::FileNotFound => {
            PackError::InvalidInput(format!("not an .intunewin container: missing {name}"))
        }
        other => PackError::archive(Stage::Inspection)(other),
    })?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(PackError::io(Stage::Inspection, name))?;
    Ok(data)
}
