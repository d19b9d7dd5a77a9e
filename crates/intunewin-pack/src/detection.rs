//! Detection.xml: the metadata document shipped next to the encrypted content
//!
//! ```text
//! ApplicationInfo @xmlns:xsi @xmlns:xsd @ToolVersion
//! ├── Name
//! ├── UnencryptedContentSize
//! ├── FileName
//! ├── SetupFile
//! └── EncryptionInfo
//!     ├── EncryptionKey          (base64)
//!     ├── MacKey                 (base64)
//!     ├── InitializationVector   (base64)
//!     ├── Mac                    (base64)
//!     ├── ProfileIdentifier
//!     ├── FileDigest             (base64)
//!     └── FileDigestAlgorithm
//! ```
//!
//! Element names, attribute names and nesting are what Intune reads;
//! indentation is not significant.

use intunewin_crypto::{EncodedEncryptionInfo, EncryptionResult};
use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};

/// Version of the Microsoft Win32 Content Prep Tool this output mimics
pub const TOOL_VERSION: &str = "1.8.4.0";

pub const PROFILE_IDENTIFIER: &str = "ProfileVersion1";

pub const FILE_DIGEST_ALGORITHM: &str = "SHA256";

/// Name of the encrypted inner package inside `IntuneWinPackage/Contents/`
pub const ENCRYPTED_FILE_NAME: &str = "IntunePackage.intunewin";

pub const XMLNS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const XMLNS_XSD: &str = "http://www.w3.org/2001/XMLSchema";

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Root element of Detection.xml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "ApplicationInfo", rename_all = "PascalCase")]
pub struct ApplicationInfo {
    #[serde(rename = "@xmlns:xsi", default)]
    pub xmlns_xsi: String,
    #[serde(rename = "@xmlns:xsd", default)]
    pub xmlns_xsd: String,
    #[serde(rename = "@ToolVersion")]
    pub tool_version: String,
    pub name: String,
    pub unencrypted_content_size: i64,
    pub file_name: String,
    pub setup_file: String,
    pub encryption_info: EncryptionInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionInfo {
    pub encryption_key: String,
    pub mac_key: String,
    pub initialization_vector: String,
    pub mac: String,
    pub profile_identifier: String,
    pub file_digest: String,
    pub file_digest_algorithm: String,
}

impl ApplicationInfo {
    pub fn new(
        app_name: &str,
        setup_file: &str,
        encrypted_file_name: &str,
        crypto: &EncodedEncryptionInfo,
    ) -> Self {
        Self {
            xmlns_xsi: XMLNS_XSI.to_string(),
            xmlns_xsd: XMLNS_XSD.to_string(),
            tool_version: TOOL_VERSION.to_string(),
            name: app_name.to_string(),
            unencrypted_content_size: crypto.unencrypted_size,
            file_name: encrypted_file_name.to_string(),
            setup_file: setup_file.to_string(),
            encryption_info: EncryptionInfo {
                encryption_key: crypto.encryption_key.clone(),
                mac_key: crypto.mac_key.clone(),
                initialization_vector: crypto.iv.clone(),
                mac: crypto.mac.clone(),
                profile_identifier: PROFILE_IDENTIFIER.to_string(),
                file_digest: crypto.file_digest.clone(),
                file_digest_algorithm: FILE_DIGEST_ALGORITHM.to_string(),
            },
        }
    }

    /// Serialize with the XML declaration as the first line.
    pub fn to_xml(&self) -> PackResult<Vec<u8>> {
        let mut body = String::new();
        let mut ser = quick_xml::se::Serializer::new(&mut body);
        ser.indent(' ', 2);
        self.serialize(ser)
            .map_err(|e| PackError::Serialization(e.to_string()))?;

        let mut doc = String::with_capacity(XML_DECLARATION.len() + body.len());
        doc.push_str(XML_DECLARATION);
        doc.push_str(&body);
        Ok(doc.into_bytes())
    }

    pub fn from_xml(data: &[u8]) -> PackResult<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|e| PackError::Serialization(format!("Detection.xml is not UTF-8: {e}")))?;
        quick_xml::de::from_str(text)
            .map_err(|e| PackError::Serialization(format!("parsing Detection.xml: {e}")))
    }
}

/// Render Detection.xml for one encrypted package.
pub fn render_detection_xml(
    app_name: &str,
    setup_file: &str,
    encrypted_file_name: &str,
    result: &EncryptionResult,
) -> PackResult<Vec<u8>> {
    ApplicationInfo::new(app_name, setup_file, encrypted_file_name, &result.to_base64()).to_xml()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(unencrypted_size: i64) -> EncryptionResult {
        EncryptionResult {
            encryption_key: [1u8; 32],
            mac_key: [2u8; 32],
            iv: [3u8; 16],
            mac: [4u8; 32],
            file_digest: [5u8; 32],
            unencrypted_size,
            ciphertext: Vec::new(),
        }
    }

    fn render(app: &str, setup: &str, size: i64) -> String {
        let xml = render_detection_xml(app, setup, ENCRYPTED_FILE_NAME, &sample_result(size)).unwrap();
        String::from_utf8(xml).unwrap()
    }

    #[test]
    fn test_document_starts_with_declaration() {
        let xml = render("TestApp", "install.exe", 1234567);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }

    #[test]
    fn test_document_declares_both_namespaces() {
        let xml = render("TestApp", "install.exe", 1234567);
        assert!(xml.contains(r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#));
        assert!(xml.contains(r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema""#));
        assert!(xml.contains(r#"ToolVersion="1.8.4.0""#));
    }

    #[test]
    fn test_document_parses_back() {
        let xml = render("TestApp", "install.exe", 1234567);
        let info = ApplicationInfo::from_xml(xml.as_bytes()).unwrap();

        assert_eq!(info.name, "TestApp");
        assert_eq!(info.setup_file, "install.exe");
        assert_eq!(info.unencrypted_content_size, 1234567);
        assert_eq!(info.file_name, ENCRYPTED_FILE_NAME);
        assert_eq!(info.tool_version, TOOL_VERSION);

        let enc = &info.encryption_info;
        assert_eq!(enc.encryption_key, "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=");
        assert_eq!(enc.mac_key, "AgICAgICAgICAgICAgICAgICAgICAgICAgICAgICAgI=");
        assert_eq!(enc.initialization_vector, "AwMDAwMDAwMDAwMDAwMDAw==");
        assert_eq!(enc.mac, "BAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQ=");
        assert_eq!(enc.file_digest, "BQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQUFBQU=");
        assert_eq!(enc.profile_identifier, PROFILE_IDENTIFIER);
        assert_eq!(enc.file_digest_algorithm, "SHA256");
    }

    #[test]
    fn test_element_nesting() {
        let xml = render("TestApp", "install.exe", 10);

        let root = xml.find("<ApplicationInfo").unwrap();
        let name = xml.find("<Name>TestApp</Name>").unwrap();
        let enc_open = xml.find("<EncryptionInfo>").unwrap();
        let key = xml.find("<EncryptionKey>").unwrap();
        let algo = xml.find("<FileDigestAlgorithm>SHA256</FileDigestAlgorithm>").unwrap();
        let enc_close = xml.find("</EncryptionInfo>").unwrap();
        let root_close = xml.find("</ApplicationInfo>").unwrap();

        assert!(root < name && name < enc_open);
        assert!(enc_open < key && key < algo && algo < enc_close);
        assert!(enc_close < root_close);
        assert!(xml.contains("<UnencryptedContentSize>10</UnencryptedContentSize>"));
        assert!(xml.contains("<FileName>IntunePackage.intunewin</FileName>"));
        assert!(xml.contains("<SetupFile>install.exe</SetupFile>"));
        assert!(xml.contains("<ProfileIdentifier>ProfileVersion1</ProfileIdentifier>"));
    }

    #[test]
    fn test_markup_in_names_is_escaped() {
        let xml = render("Tools & <Utils>", "setup \"x\".exe", 1);
        assert!(!xml.contains("<Utils>"));

        let info = ApplicationInfo::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(info.name, "Tools & <Utils>");
        assert_eq!(info.setup_file, "setup \"x\".exe");
    }

    #[test]
    fn test_from_xml_rejects_garbage() {
        assert!(ApplicationInfo::from_xml(b"not xml at all").is_err());
        assert!(ApplicationInfo::from_xml(&[0xff, 0xfe, 0x00]).is_err());
    }
}
