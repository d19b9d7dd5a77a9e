//! intunewin-pack: builds `.intunewin` containers
//!
//! Pipeline:
//! 1. [`walk_source_dir`] lists the application folder
//! 2. [`archive::build_inner_archive`] zips it under `<app_name>/`
//! 3. [`intunewin_crypto::encrypt`] produces `MAC || IV || ciphertext`
//! 4. [`detection::render_detection_xml`] describes the keys and digest
//! 5. [`archive::build_outer_archive`] wraps both in `IntuneWinPackage/`
//!
//! [`Packager`] runs the whole pipeline and writes the result to disk;
//! [`assemble_package`] does the in-memory part only.

pub mod archive;
pub mod assembler;
pub mod detection;
pub mod error;
pub mod inspect;
pub mod walk;

pub use assembler::{assemble_package, create_package, Packager, ProgressFn};
pub use detection::{render_detection_xml, ApplicationInfo, EncryptionInfo};
pub use error::{PackError, PackResult, Stage};
pub use inspect::{inspect_package, PackageSummary};
pub use walk::{app_name_for, walk_source_dir};
