//! Error types

use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Outcome of verifying one candidate certification path
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum PathValidationStatus {
    /// NameChainingFailure occurs when a path features certificates for which the subject
    /// name of a superior certificate does not match the issuer name of the immediately subordinate certificate.
    NameChainingFailure,
    /// SignatureVerificationFailure occurs when a path features certificates for which the subject
    /// public key of a superior certificate does not verify the signature of the immediately subordinate certificate.
    SignatureVerificationFailure,
    /// InvalidNotBeforeDate occurs when a path features a certificate that contains a notBefore
    /// date that is after the time of interest.
    InvalidNotBeforeDate,
    /// InvalidNotAfterDate occurs when a path features a certificate that contains a notAfter
    /// date that is before the time of interest.
    InvalidNotAfterDate,
    /// InvalidPathLength occurs when a path has more intermediate certificates than allowed by the
    /// initial path length configuration or by a pathLenConstraint asserted within the path.
    InvalidPathLength,
    /// MissingBasicConstraints occurs when a path features an intermediate CA certificate that
    /// lacks a basicConstraints extension.
    MissingBasicConstraints,
    /// InvalidBasicConstraints occurs when a path features an intermediate CA certificate with a
    /// basicConstraints extension that does not assert cA.
    InvalidBasicConstraints,
    /// InvalidKeyUsage occurs when an intermediate CA certificate has a keyUsage extension that
    /// lacks keyCertSign.
    InvalidKeyUsage,
    /// UnprocessedCriticalExtension occurs when a certificate features a critical extension that is
    /// not processed by the verifier.
    UnprocessedCriticalExtension,
    /// MissingTrustAnchor occurs when a path does not terminate in a trust anchor.
    MissingTrustAnchor,
    /// NoPathsFound occurs when path building produced no candidate paths at all.
    NoPathsFound,
    /// Misconfiguration occurs when a verifier is asked to process an empty or otherwise unusable path.
    Misconfiguration,
}

/// Error type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Failure of a candidate path to verify
    PathValidation(PathValidationStatus),
    /// Item not found
    NotFound,
    /// Unrecognized item
    Unrecognized,
    /// An artifact could not be parsed
    ParseError,
    /// A networking issue occurred.
    NetworkError,
    /// Asn1Error is used to propagate error information from the x509 crate.
    Asn1Error(der::Error),
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    #[cfg(feature = "std")]
    StdIoError(std::io::ErrorKind),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl From<PathValidationStatus> for Error {
    fn from(status: PathValidationStatus) -> Error {
        Error::PathValidation(status)
    }
}

impl fmt::Display for PathValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathValidationStatus::NameChainingFailure => write!(f, "Name chaining failure"),
            PathValidationStatus::SignatureVerificationFailure => {
                write!(f, "Signature verification failure")
            }
            PathValidationStatus::InvalidNotBeforeDate => write!(f, "InvalidNotBeforeDate"),
            PathValidationStatus::InvalidNotAfterDate => write!(f, "InvalidNotAfterDate"),
            PathValidationStatus::InvalidPathLength => write!(f, "InvalidPathLength"),
            PathValidationStatus::MissingBasicConstraints => write!(f, "MissingBasicConstraints"),
            PathValidationStatus::InvalidBasicConstraints => write!(f, "InvalidBasicConstraints"),
            PathValidationStatus::InvalidKeyUsage => write!(f, "InvalidKeyUsage"),
            PathValidationStatus::UnprocessedCriticalExtension => {
                write!(f, "UnprocessedCriticalExtension")
            }
            PathValidationStatus::MissingTrustAnchor => write!(f, "MissingTrustAnchor"),
            PathValidationStatus::NoPathsFound => write!(f, "NoPathsFound"),
            PathValidationStatus::Misconfiguration => write!(f, "Misconfiguration"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PathValidation(err) => write!(f, "PathValidationError: {}", err),
            Error::NotFound => write!(f, "NotFound"),
            Error::Unrecognized => write!(f, "Unrecognized"),
            Error::ParseError => write!(f, "ParseError"),
            Error::NetworkError => write!(f, "NetworkError"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            #[cfg(feature = "std")]
            Error::StdIoError(err) => write!(f, "StdError: {:?}", err),
        }
    }
}

#[test]
fn error_test() {
    use alloc::format;

    assert_eq!(
        "Name chaining failure",
        format!("{}", PathValidationStatus::NameChainingFailure)
    );
    let _s = format!("{}", PathValidationStatus::SignatureVerificationFailure);
    let _s = format!("{}", PathValidationStatus::InvalidNotBeforeDate);
    let _s = format!("{}", PathValidationStatus::InvalidNotAfterDate);
    let _s = format!("{}", PathValidationStatus::InvalidPathLength);
    let _s = format!("{}", PathValidationStatus::MissingBasicConstraints);
    let _s = format!("{}", PathValidationStatus::InvalidBasicConstraints);
    assert_eq!(
        "InvalidKeyUsage",
        format!("{}", PathValidationStatus::InvalidKeyUsage)
    );
    let _s = format!("{}", PathValidationStatus::UnprocessedCriticalExtension);
    let _s = format!("{}", PathValidationStatus::MissingTrustAnchor);
    let _s = format!("{}", PathValidationStatus::NoPathsFound);
    let _s = format!("{}", PathValidationStatus::Misconfiguration);

    assert_eq!(
        "PathValidationError: NoPathsFound",
        format!("{}", Error::PathValidation(PathValidationStatus::NoPathsFound))
    );
    let _s = format!("{}", Error::NotFound);
    let _s = format!("{}", Error::Unrecognized);
    let _s = format!("{}", Error::ParseError);
    let _s = format!("{}", Error::NetworkError);
    let _s = format!(
        "{}",
        Error::Asn1Error(der::Error::from(der::ErrorKind::Failed))
    );
    #[cfg(feature = "std")]
    {
        let e: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(Error::StdIoError(std::io::ErrorKind::NotFound), e);
    }
    let e: Error = PathValidationStatus::InvalidPathLength.into();
    assert_eq!(
        Error::PathValidation(PathValidationStatus::InvalidPathLength),
        e
    );
}
