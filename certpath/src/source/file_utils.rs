//! Utility functions for populating trust stores and issuer sources from the file system

use alloc::sync::Arc;
use alloc::vec::Vec;
use std::ffi::OsStr;
use std::path::Path;

use log::{error, info};
use walkdir::WalkDir;

use crate::util::error::*;
use crate::util::pdv_utilities::valid_at_time;
use crate::{CertificateList, ParsedCertificate};

/// `get_file_as_byte_vec_pem` reads the named file, decoding PEM if the contents begin with a dash
/// and returning the contents as-is otherwise.
pub fn get_file_as_byte_vec_pem(filename: &Path) -> Result<Vec<u8>> {
    let b = std::fs::read(filename)?;
    if b.first() == Some(&0x2D) {
        return match pem_rfc7468::decode_vec(b.as_slice()) {
            Ok(b) => Ok(b.1),
            Err(e) => {
                error!("Failed to parse certificate from {:?}: {:?}", filename, e);
                Err(Error::Unrecognized)
            }
        };
    }
    Ok(b)
}

/// `cert_folder_to_vec` is used to help process a folder containing certificate files for use as a
/// trust store or issuer source.
///
/// `cert_folder_to_vec` takes a string containing the full path of a folder containing DER or PEM
/// encoded certificate files, a mutable list of certificates and a time of interest, expressed as
/// seconds since Unix epoch. It recursively traverses the directory appending each certificate that
/// parses and is valid at the time of interest, skipping certificates already present in the list,
/// and returns the number of items added. Pass 0 for `time_of_interest` to skip the validity check.
///
/// Only files with .der, .cer, .crt or .pem extensions are processed.
pub fn cert_folder_to_vec(
    certs_dir: &str,
    certs: &mut CertificateList,
    time_of_interest: u64,
) -> Result<usize> {
    if !Path::is_dir(Path::new(certs_dir)) {
        error!("{} does not exist or is not a directory", certs_dir);
        return Err(Error::NotFound);
    }

    let file_exts = ["der", "crt", "cer", "pem"];
    let initial_count = certs.len();
    for entry in WalkDir::new(certs_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                error!("Failed to read entry in {}: {}", certs_dir, e);
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) if file_exts.contains(&ext) => {}
            _ => continue,
        }

        let buffer = match get_file_as_byte_vec_pem(path) {
            Ok(buffer) => buffer,
            Err(_e) => continue,
        };
        let cert = match ParsedCertificate::from_der(&buffer) {
            Ok(cert) => cert,
            Err(e) => {
                info!("Ignored {} as it could not be parsed: {}", path.display(), e);
                continue;
            }
        };
        if valid_at_time(&cert, time_of_interest, true).is_err() {
            error!(
                "Ignored {} as not valid at indicated time of interest",
                path.to_str().unwrap_or("")
            );
            continue;
        }
        if certs.iter().any(|c| c.der_cert() == cert.der_cert()) {
            continue;
        }
        certs.push(Arc::new(cert));
    }
    Ok(certs.len() - initial_count)
}

#[test]
fn non_existent_dir() {
    let mut certs = CertificateList::new();
    assert_eq!(
        Err(Error::NotFound),
        cert_folder_to_vec("tests/does_not_exist", &mut certs, 0)
    );
    assert!(certs.is_empty());
}

#[test]
fn unparseable_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("garbage.der"), [0x30, 0x03, 0x02, 0x01, 0x01]).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a certificate").unwrap();
    std::fs::write(
        dir.path().join("bad.pem"),
        "-----BEGIN CERTIFICATE-----\nnot base64\n",
    )
    .unwrap();

    let mut certs = CertificateList::new();
    let added = cert_folder_to_vec(dir.path().to_str().unwrap(), &mut certs, 0);
    assert_eq!(Ok(0), added);
    assert!(certs.is_empty());

    assert_eq!(
        Err(Error::Unrecognized),
        get_file_as_byte_vec_pem(&dir.path().join("bad.pem"))
    );
    assert_eq!(
        vec![0x30, 0x03, 0x02, 0x01, 0x01],
        get_file_as_byte_vec_pem(&dir.path().join("garbage.der")).unwrap()
    );
}
