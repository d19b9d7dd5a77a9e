//! Read-only view of an existing container. Nothing is decrypted or verified.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::archive::{list_entries, read_entry, DETECTION_XML_PATH, ENCRYPTED_CONTENT_PATH};
use crate::detection::ApplicationInfo;
use crate::error::{PackError, PackResult, Stage};

/// The entries every container holds, in the order they are written
pub const EXPECTED_ENTRIES: [&str; 2] = [DETECTION_XML_PATH, ENCRYPTED_CONTENT_PATH];

#[derive(Debug, Clone)]
pub struct PackageSummary {
    /// Entry names in archive order
    pub entries: Vec<String>,
    pub detection: ApplicationInfo,
    /// Size of the `MAC || IV || ciphertext` blob
    pub encrypted_size: u64,
}

impl PackageSummary {
    /// Entries other than Detection.xml and the encrypted content.
    pub fn unexpected_entries(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(String::as_str)
            .filter(|name| !EXPECTED_ENTRIES.contains(name))
            .collect()
    }

    /// Exactly the two fixed entries, Detection.xml first.
    pub fn is_standard_layout(&self) -> bool {
        self.entries.iter().map(String::as_str).eq(EXPECTED_ENTRIES)
    }
}

pub fn inspect_package(path: &Path) -> PackResult<PackageSummary> {
    let file = File::open(path).map_err(PackError::io(Stage::Inspection, path))?;
    inspect_reader(BufReader::new(file))
}

/// Fails if either fixed entry is missing or damaged; extra entries are
/// reported through [`PackageSummary::unexpected_entries`].
pub fn inspect_reader<R: Read + Seek>(reader: R) -> PackResult<PackageSummary> {
    let mut archive = ZipArchive::new(reader).map_err(PackError::archive(Stage::Inspection))?;

    let entries = list_entries(&mut archive)?;
    let detection = ApplicationInfo::from_xml(&read_entry(&mut archive, DETECTION_XML_PATH)?)?;

    let index = archive.index_for_name(ENCRYPTED_CONTENT_PATH).ok_or_else(|| {
        PackError::InvalidInput(format!(
            "not an .intunewin container: missing {ENCRYPTED_CONTENT_PATH}"
        ))
    })?;
    let encrypted_size = archive
        .by_index_raw(index)
        .map_err(PackError::archive(Stage::Inspection))?
        .size();

    Ok(PackageSummary {
        entries,
        detection,
        encrypted_size,
    })
}
