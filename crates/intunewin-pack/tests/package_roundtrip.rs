//! End-to-end packaging tests.
//!
//! Packages a real folder, then opens the container the way the consuming
//! platform does: read Detection.xml, check the MAC, decrypt, unzip.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use intunewin_core::{PackOptions, SourceEntry};
use intunewin_pack::archive::{DETECTION_XML_PATH, ENCRYPTED_CONTENT_PATH};
use intunewin_pack::{
    assemble_package, create_package, ApplicationInfo, PackError, Packager, Stage,
};

struct Opened {
    outer_entries: Vec<String>,
    info: ApplicationInfo,
    inner_zip: Vec<u8>,
}

fn decode(field: &str) -> Vec<u8> {
    STANDARD.decode(field).expect("valid base64")
}

/// Verify and decrypt a container, returning its parts.
fn open_package(bytes: &[u8]) -> Opened {
    let mut outer = zip::ZipArchive::new(Cursor::new(bytes)).expect("outer zip");
    let outer_entries = (0..outer.len())
        .map(|i| outer.by_index(i).unwrap().name().to_string())
        .collect();

    let mut xml = Vec::new();
    outer
        .by_name(DETECTION_XML_PATH)
        .unwrap()
        .read_to_end(&mut xml)
        .unwrap();
    let info = ApplicationInfo::from_xml(&xml).unwrap();

    let mut blob = Vec::new();
    outer
        .by_name(ENCRYPTED_CONTENT_PATH)
        .unwrap()
        .read_to_end(&mut blob)
        .unwrap();

    let enc = &info.encryption_info;
    let key = decode(&enc.encryption_key);
    let mac_key = decode(&enc.mac_key);
    let iv = decode(&enc.initialization_vector);
    let mac = decode(&enc.mac);
    assert_eq!(key.len(), 32);
    assert_eq!(mac_key.len(), 32);
    assert_eq!(iv.len(), 16);

    assert_eq!(&blob[..32], mac.as_slice(), "blob starts with the MAC");
    assert_eq!(&blob[32..48], iv.as_slice(), "IV follows the MAC");

    let mut verifier = <Hmac<Sha256> as Mac>::new_from_slice(&mac_key).unwrap();
    verifier.update(&blob[32..]);
    verifier.verify_slice(&mac).expect("MAC covers IV || ciphertext");

    let inner_zip = cbc::Decryptor::<Aes256>::new_from_slices(&key, &iv)
        .unwrap()
        .decrypt_padded_vec_mut::<Pkcs7>(&blob[48..])
        .expect("valid padding");

    assert_eq!(decode(&enc.file_digest), Sha256::digest(&inner_zip).to_vec());
    assert_eq!(info.unencrypted_content_size, inner_zip.len() as i64);

    Opened {
        outer_entries,
        info,
        inner_zip,
    }
}

fn inner_entries(inner_zip: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(inner_zip)).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

fn inner_file(inner_zip: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(inner_zip)).unwrap();
    let mut data = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut data).unwrap();
    data
}

fn make_source(root: &Path) -> std::path::PathBuf {
    let src = root.join("testapp");
    fs::create_dir_all(src.join("data")).unwrap();
    fs::write(src.join("install.exe"), b"fake exe content").unwrap();
    fs::write(src.join("data").join("config.txt"), b"config data").unwrap();
    src
}

#[test]
fn package_folder_roundtrip() {
    let tmp = tempfile::TempDir::new().unwrap();
    let src = make_source(tmp.path());
    let out = tmp.path().join("output");

    let path = create_package(&PackOptions {
        source_dir: src,
        setup_file: "install.exe".into(),
        output_dir: out.clone(),
        quiet: true,
    })
    .unwrap();
    assert_eq!(path, out.join("testapp.intunewin"));

    let opened = open_package(&fs::read(&path).unwrap());
    assert_eq!(
        opened.outer_entries,
        vec![DETECTION_XML_PATH, ENCRYPTED_CONTENT_PATH]
    );
    assert_eq!(opened.info.name, "testapp");
    assert_eq!(opened.info.setup_file, "install.exe");
    assert_eq!(opened.info.file_name, "IntunePackage.intunewin");

    assert_eq!(
        inner_entries(&opened.inner_zip),
        vec!["testapp/data/", "testapp/data/config.txt", "testapp/install.exe"]
    );
    assert_eq!(
        inner_file(&opened.inner_zip, "testapp/install.exe"),
        b"fake exe content"
    );
    assert_eq!(
        inner_file(&opened.inner_zip, "testapp/data/config.txt"),
        b"config data"
    );

    let leftovers: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("testapp.intunewin")]);
}

#[test]
fn each_package_gets_fresh_keys() {
    let tree = vec![SourceEntry::inline("setup.exe", b"MZ".to_vec())];
    let a = open_package(&assemble_package(&tree, "setup.exe", "App").unwrap());
    let b = open_package(&assemble_package(&tree, "setup.exe", "App").unwrap());

    let (ka, kb) = (&a.info.encryption_info, &b.info.encryption_info);
    assert_ne!(ka.encryption_key, kb.encryption_key);
    assert_ne!(ka.mac_key, kb.mac_key);
    assert_ne!(ka.initialization_vector, kb.initialization_vector);
    assert_ne!(ka.encryption_key, ka.mac_key);
    // same plaintext archive, same digest
    assert_eq!(ka.file_digest, kb.file_digest);
    assert_eq!(a.inner_zip, b.inner_zip);
}

#[test]
fn in_memory_tree_roundtrip() {
    let tree = vec![
        SourceEntry::directory("bin"),
        SourceEntry::inline("bin/tool.dll", vec![0xAB; 10_000]),
        SourceEntry::inline("setup.cmd", b"@echo off".to_vec()),
    ];
    let package = assemble_package(&tree, "setup.cmd", "Tools & <Utils>").unwrap();

    let opened = open_package(&package);
    assert_eq!(opened.info.name, "Tools & <Utils>");
    assert_eq!(
        inner_entries(&opened.inner_zip),
        vec![
            "Tools & <Utils>/bin/",
            "Tools & <Utils>/bin/tool.dll",
            "Tools & <Utils>/setup.cmd",
        ]
    );
    assert_eq!(
        inner_file(&opened.inner_zip, "Tools & <Utils>/bin/tool.dll"),
        vec![0xAB; 10_000]
    );
}

#[test]
fn unreadable_entry_fails_in_archiving_stage() {
    let tmp = tempfile::TempDir::new().unwrap();
    let tree = vec![SourceEntry::file("gone.exe", tmp.path().join("gone.exe"))];

    let err = assemble_package(&tree, "gone.exe", "App").unwrap_err();
    assert_eq!(err.stage(), Stage::Archiving);
    assert!(matches!(err, PackError::Io { .. }));
}

#[test]
fn missing_setup_file_writes_nothing() {
    let tmp = tempfile::TempDir::new().unwrap();
    let src = make_source(tmp.path());
    let out = tmp.path().join("output");

    let err = Packager::new(PackOptions {
        source_dir: src,
        setup_file: "setup.msi".into(),
        output_dir: out.clone(),
        quiet: true,
    })
    .create_package()
    .unwrap_err();

    assert!(matches!(err, PackError::InvalidInput(_)));
    assert!(!out.exists());
}

#[test]
fn inspect_reads_written_package() {
    let tmp = tempfile::TempDir::new().unwrap();
    let src = make_source(tmp.path());

    let path = create_package(&PackOptions {
        source_dir: src,
        setup_file: "install.exe".into(),
        output_dir: tmp.path().to_path_buf(),
        quiet: true,
    })
    .unwrap();

    let summary = intunewin_pack::inspect_package(&path).unwrap();
    assert_eq!(summary.detection.name, "testapp");
    assert!(summary.is_standard_layout());
    assert!(summary.encrypted_size > 48);
}
