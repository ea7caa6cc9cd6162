//! TLS client certificate loading.
//!
//! Certificates are PEM bundles holding one or more certificates (leaf first)
//! and an unencrypted private key. A bundle can come from a file, from inline
//! base64, or from a store directory searched by thumbprint.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Identity;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::error::ConfigurationError;
use super::options::{CertificateSource, ClientOptions};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const ENCRYPTED_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// One `-----BEGIN <label>-----` ... `-----END <label>-----` block.
#[derive(Debug, Clone)]
struct PemBlock {
    label: String,
    text: String,
    der: Vec<u8>,
    encrypted: bool,
}

impl PemBlock {
    fn is_certificate(&self) -> bool {
        self.label == CERTIFICATE_LABEL
    }

    fn is_private_key(&self) -> bool {
        self.label.ends_with("PRIVATE KEY")
    }
}

/// Loads the client identity selected by `options.client_certificate_source`.
///
/// Returns `Ok(None)` when no client certificate is configured.
///
/// # Errors
///
/// Returns [`ConfigurationError`] when required fields are missing or the
/// certificate cannot be read, decoded, found, or turned into an identity.
#[instrument(level = "debug", skip_all, fields(source = options.client_certificate_source.as_str()))]
pub(crate) fn load_identity(
    options: &ClientOptions,
    store: Option<&Path>,
) -> Result<Option<Identity>, ConfigurationError> {
    let source = options.client_certificate_source;
    let bundle = match source {
        CertificateSource::None => return Ok(None),
        CertificateSource::File => {
            let path = options
                .certificate_file_path
                .as_deref()
                .filter(|path| !path.as_os_str().is_empty())
                .ok_or(ConfigurationError::MissingCertificateField {
                    source_kind: source.as_str(),
                    field: "certificateFilePath",
                })?;
            let bytes = fs::read(path).map_err(|e| ConfigurationError::CertificateFile {
                path: path.to_path_buf(),
                source: e,
            })?;
            bundle_text(bytes)?
        }
        CertificateSource::Base64 => {
            let encoded: String = options
                .certificate_base64
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if encoded.is_empty() {
                return Err(ConfigurationError::MissingCertificateField {
                    source_kind: source.as_str(),
                    field: "certificateBase64",
                });
            }
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| ConfigurationError::InvalidBase64 { source: e })?;
            bundle_text(bytes)?
        }
        CertificateSource::Store => {
            if options.certificate_thumbprint.trim().is_empty() {
                return Err(ConfigurationError::MissingCertificateField {
                    source_kind: source.as_str(),
                    field: "certificateThumbprint",
                });
            }
            let store = store.ok_or(ConfigurationError::CertificateStoreUnavailable)?;
            find_by_thumbprint(store, &options.certificate_thumbprint)?
        }
    };

    identity_from_bundle(
        &bundle,
        options.load_entire_chain,
        !options.certificate_key_phrase.is_empty(),
    )
    .map(Some)
}

fn bundle_text(bytes: Vec<u8>) -> Result<String, ConfigurationError> {
    String::from_utf8(bytes).map_err(|_| ConfigurationError::InvalidCertificate {
        reason: "certificate bundle is not PEM text".to_string(),
    })
}

/// Builds an identity from a PEM bundle.
///
/// With `load_entire_chain` unset only the leaf (first) certificate is presented.
fn identity_from_bundle(
    bundle: &str,
    load_entire_chain: bool,
    has_key_phrase: bool,
) -> Result<Identity, ConfigurationError> {
    let blocks = parse_pem(bundle)?;

    if blocks.iter().any(|block| block.encrypted) {
        return Err(ConfigurationError::EncryptedPrivateKey);
    }

    let key = blocks
        .iter()
        .find(|block| block.is_private_key())
        .ok_or_else(|| ConfigurationError::InvalidCertificate {
            reason: "bundle contains no private key".to_string(),
        })?;
    let mut certificates = blocks.iter().filter(|block| block.is_certificate());
    let leaf = certificates
        .next()
        .ok_or_else(|| ConfigurationError::InvalidCertificate {
            reason: "bundle contains no certificate".to_string(),
        })?;

    if has_key_phrase {
        debug!("private key is not encrypted; key phrase ignored");
    }

    let mut pem = String::with_capacity(bundle.len());
    pem.push_str(&leaf.text);
    let mut chain_len = 1;
    if load_entire_chain {
        for certificate in certificates {
            pem.push_str(&certificate.text);
            chain_len += 1;
        }
    }
    pem.push_str(&key.text);
    debug!(chain_len, "loaded client certificate");

    Identity::from_pem(pem.as_bytes()).map_err(|e| ConfigurationError::InvalidCertificate {
        reason: e.to_string(),
    })
}

/// Splits PEM text into blocks, decoding each body.
fn parse_pem(text: &str) -> Result<Vec<PemBlock>, ConfigurationError> {
    let mut blocks = Vec::new();
    let mut lines = text.lines().map(str::trim);

    while let Some(line) = lines.next() {
        let Some(label) = line
            .strip_prefix("-----BEGIN ")
            .and_then(|rest| rest.strip_suffix("-----"))
        else {
            continue;
        };
        let end = format!("-----END {label}-----");
        let mut body = String::new();
        let mut has_headers = false;
        let mut closed = false;

        for line in lines.by_ref() {
            if line == end {
                closed = true;
                break;
            }
            // Legacy encrypted keys carry `Proc-Type: 4,ENCRYPTED` style headers.
            if line.contains(':') {
                has_headers = true;
                continue;
            }
            body.push_str(line);
        }

        if !closed {
            return Err(ConfigurationError::InvalidCertificate {
                reason: format!("unterminated PEM block {label}"),
            });
        }

        let der = STANDARD
            .decode(&body)
            .map_err(|e| ConfigurationError::InvalidCertificate {
                reason: format!("PEM block {label} is not valid base64: {e}"),
            })?;
        let encrypted = label == ENCRYPTED_KEY_LABEL
            || (label.ends_with("PRIVATE KEY") && has_headers);

        blocks.push(PemBlock {
            text: format!("-----BEGIN {label}-----\n{}\n{end}\n", wrap_base64(&body)),
            label: label.to_string(),
            der,
            encrypted,
        });
    }

    if blocks.is_empty() {
        return Err(ConfigurationError::InvalidCertificate {
            reason: "no PEM blocks found".to_string(),
        });
    }
    Ok(blocks)
}

fn wrap_base64(body: &str) -> String {
    body.as_bytes()
        .chunks(64)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Searches `store` for a bundle whose leaf certificate matches `thumbprint`.
fn find_by_thumbprint(store: &Path, thumbprint: &str) -> Result<String, ConfigurationError> {
    let wanted = normalize_thumbprint(thumbprint)?;

    let entries = fs::read_dir(store).map_err(|e| ConfigurationError::CertificateStore {
        path: store.to_path_buf(),
        source: e,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    for path in paths {
        let Ok(text) = fs::read_to_string(&path) else {
            debug!(path = %path.display(), "skipping unreadable store entry");
            continue;
        };
        let Ok(blocks) = parse_pem(&text) else {
            debug!(path = %path.display(), "skipping non-PEM store entry");
            continue;
        };
        let Some(leaf) = blocks.iter().find(|block| block.is_certificate()) else {
            continue;
        };
        if thumbprint_of(&leaf.der, wanted.len()) == wanted {
            debug!(path = %path.display(), "certificate found by thumbprint");
            return Ok(text);
        }
    }

    Err(ConfigurationError::ThumbprintNotFound {
        thumbprint: wanted,
        store: store.to_path_buf(),
    })
}

/// Lowercase hex without separators; SHA-1 (40 digits) or SHA-256 (64 digits).
fn normalize_thumbprint(thumbprint: &str) -> Result<String, ConfigurationError> {
    let normalized: String = thumbprint
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let valid_len = matches!(normalized.len(), 40 | 64);
    if !valid_len || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigurationError::InvalidCertificate {
            reason: "thumbprint must be 40 (SHA-1) or 64 (SHA-256) hex digits".to_string(),
        });
    }
    Ok(normalized)
}

fn thumbprint_of(der: &[u8], hex_len: usize) -> String {
    let digest: Vec<u8> = if hex_len == 40 {
        Sha1::digest(der).to_vec()
    } else {
        Sha256::digest(der).to_vec()
    };
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
