//! Utility functions that support certification path building and verification

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use log::error;

use const_oid::db::rfc5912::{ID_AD_CA_ISSUERS, ID_PE_AUTHORITY_INFO_ACCESS};
use der::asn1::{Any, Ia5StringRef, PrintableStringRef, SetOfVec, Utf8StringRef};
use der::{Decode, Encode, Tag, Tagged};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::{name::GeneralName, AuthorityInfoAccessSyntax};
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::Certificate;

use crate::{Error, ParsedCertificate, PathValidationStatus, Result};

/// `get_string_value_from_atav` returns the string form of an attribute value that uses one of the
/// directory string types commonly found in certificate names. Other value types yield None.
pub fn get_string_value_from_atav(atav: &AttributeTypeAndValue) -> Option<String> {
    match atav.value.tag() {
        Tag::PrintableString => atav
            .value
            .decode_as()
            .ok()
            .map(|s: PrintableStringRef<'_>| s.to_string()),
        Tag::Utf8String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Utf8StringRef<'_>| s.to_string()),
        Tag::Ia5String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Ia5StringRef<'_>| s.to_string()),
        _ => None,
    }
}

/// `normalize_string_value` trims the given value, collapses runs of whitespace into a single space
/// and converts the result to lowercase.
pub fn normalize_string_value(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// `normalize_name` returns the DER encoding of a copy of `name` in which every string-typed
/// attribute value has been normalized via [`normalize_string_value`] and re-encoded as a
/// UTF8String. Names that differ only in case, surrounding or repeated whitespace, or string type
/// produce identical output.
pub fn normalize_name(name: &Name) -> Result<Vec<u8>> {
    let mut rdns = Vec::with_capacity(name.0.len());
    for rdn in name.0.iter() {
        let mut atavs = Vec::with_capacity(rdn.0.len());
        for atav in rdn.0.iter() {
            match get_string_value_from_atav(atav) {
                Some(value) => {
                    let normalized = normalize_string_value(&value);
                    atavs.push(AttributeTypeAndValue {
                        oid: atav.oid,
                        value: Any::new(Tag::Utf8String, normalized.into_bytes())?,
                    });
                }
                None => atavs.push(atav.clone()),
            }
        }
        rdns.push(RelativeDistinguishedName(SetOfVec::try_from(atavs)?));
    }
    Ok(RdnSequence(rdns).to_der()?)
}

/// `name_to_string` returns an RFC 4514 string representation of the given name.
pub fn name_to_string(name: &Name) -> String {
    name.to_string()
}

/// `collect_ca_issuers_uris` collects unique HTTP URIs from the caIssuers access descriptions of the
/// authority information access extension of the presented certificate and returns them via the
/// `uris` parameter.
pub fn collect_ca_issuers_uris(cert: &Certificate, uris: &mut Vec<String>) {
    let exts = match &cert.tbs_certificate.extensions {
        Some(exts) => exts,
        None => return,
    };
    for ext in exts {
        if ext.extn_id != ID_PE_AUTHORITY_INFO_ACCESS {
            continue;
        }
        if let Ok(aia) = AuthorityInfoAccessSyntax::from_der(ext.extn_value.as_bytes()) {
            for ad in &aia.0 {
                if ID_AD_CA_ISSUERS == ad.access_method {
                    if let GeneralName::UniformResourceIdentifier(uri) = &ad.access_location {
                        let s = uri.to_string();
                        if !uris.contains(&s) && s.starts_with("http") {
                            uris.push(s);
                        }
                    }
                }
            }
        }
    }
}

/// `valid_at_time` evaluates the validity window of the given certificate and provides an
/// indication of validity relative to presented time of interest.
///
/// It returns the number of seconds left to live if the certificate is valid at the given time or
/// an error indicating which field failed if the certificate is not valid. The not_before field is
/// evaluated first. A time of interest of zero disables the check, as does a certificate that carries
/// no validity window.
///
/// To stifle logging output upon error, pass true for the stifle_log parameter.
pub fn valid_at_time(cert: &ParsedCertificate, toi: u64, stifle_log: bool) -> Result<u64> {
    if 0 == toi {
        return Ok(0);
    }

    if let Some(nb) = cert.not_before() {
        if nb > toi {
            if !stifle_log {
                error!(
                    "Certificate {} is not yet valid at the configured time of interest",
                    cert.debug_string()
                );
            }
            return Err(Error::PathValidation(
                PathValidationStatus::InvalidNotBeforeDate,
            ));
        }
    }

    match cert.not_after() {
        Some(na) if na < toi => {
            if !stifle_log {
                error!(
                    "Certificate {} is expired relative to the configured time of interest",
                    cert.debug_string()
                );
            }
            Err(Error::PathValidation(
                PathValidationStatus::InvalidNotAfterDate,
            ))
        }
        Some(na) => Ok(na - toi),
        None => Ok(u64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn normalize_string_value_test() {
        assert_eq!("example ca", normalize_string_value("  Example \t  CA "));
        assert_eq!("", normalize_string_value("   "));
    }

    #[test]
    fn normalize_name_test() {
        let left = Name::from_str("CN=Example  CA,O=Org").unwrap();
        let right = Name::from_str("CN=example ca,O=ORG").unwrap();
        let other = Name::from_str("CN=Other CA,O=Org").unwrap();

        let l = normalize_name(&left).unwrap();
        let r = normalize_name(&right).unwrap();
        let o = normalize_name(&other).unwrap();
        assert_eq!(l, r);
        assert_ne!(l, o);

        // output is a valid DER encoded name
        let decoded = Name::from_der(&l).unwrap();
        assert_eq!(2, decoded.0.len());
        assert_eq!("CN=example ca,O=org", name_to_string(&decoded));
    }

    #[test]
    fn valid_at_time_test() {
        let cert = ParsedCertificate::new(
            b"der".to_vec(),
            b"subject".to_vec(),
            b"issuer".to_vec(),
            Vec::new(),
            b"spki".to_vec(),
        )
        .with_validity(100, 200);

        assert_eq!(Ok(0), valid_at_time(&cert, 0, true));
        assert_eq!(Ok(50), valid_at_time(&cert, 150, true));
        assert_eq!(
            Err(Error::PathValidation(
                PathValidationStatus::InvalidNotBeforeDate
            )),
            valid_at_time(&cert, 99, true)
        );
        assert_eq!(
            Err(Error::PathValidation(
                PathValidationStatus::InvalidNotAfterDate
            )),
            valid_at_time(&cert, 201, true)
        );

        let no_validity = ParsedCertificate::new(
            b"der".to_vec(),
            b"subject".to_vec(),
            b"issuer".to_vec(),
            Vec::new(),
            b"spki".to_vec(),
        );
        assert!(valid_at_time(&no_validity, 150, true).is_ok());
    }
}
