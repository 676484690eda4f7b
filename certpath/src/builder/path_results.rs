//! Structures that report the outcome of a path building operation

use alloc::vec::Vec;

use crate::util::error::*;
use crate::CertificateList;

/// `CertPathBuilderResultPath` pairs a candidate path with the outcome of verifying it.
#[derive(Clone, Debug)]
#[readonly::make]
pub struct CertPathBuilderResultPath {
    /// Candidate path ordered from the target certificate to a trust anchor
    pub path: CertificateList,
    /// Outcome returned by the verifier for `path`
    pub outcome: Result<()>,
}

impl CertPathBuilderResultPath {
    /// Returns true if the path verified successfully
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// `CertPathBuilderResult` lists every candidate path that was verified, in the order the paths were
/// found, along with the index of the first one that verified, if any.
///
/// Paths are only ever appended and `best_result_index`, once set, is not changed.
#[derive(Clone, Debug, Default)]
#[readonly::make]
pub struct CertPathBuilderResult {
    /// Every attempted path in the order attempted
    pub paths: Vec<CertPathBuilderResultPath>,
    /// Index into `paths` of the first path that verified successfully
    pub best_result_index: Option<usize>,
}

impl CertPathBuilderResult {
    /// Returns true if a path verified successfully
    pub fn is_success(&self) -> bool {
        self.best_result_index.is_some()
    }

    /// Returns the first path that verified successfully, if any
    pub fn best_path(&self) -> Option<&CertPathBuilderResultPath> {
        self.best_result_index.and_then(|i| self.paths.get(i))
    }

    /// `status` summarizes the result. It returns Ok when a path verified,
    /// `PathValidation(NoPathsFound)` when no candidate path was found at all, and otherwise the
    /// outcome of the first path that was attempted. Failed paths are not ranked.
    pub fn status(&self) -> Result<()> {
        if let Some(best) = self.best_path() {
            return best.outcome;
        }
        match self.paths.first() {
            Some(first) => first.outcome,
            None => Err(Error::PathValidation(PathValidationStatus::NoPathsFound)),
        }
    }

    /// Records the outcome of verifying `path`. The first successful path becomes the best result.
    pub(crate) fn add_result_path(&mut self, path: CertificateList, outcome: Result<()>) {
        let is_success = outcome.is_ok();
        self.paths.push(CertPathBuilderResultPath { path, outcome });
        if is_success && self.best_result_index.is_none() {
            self.best_result_index = Some(self.paths.len() - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParsedCertificate;
    use alloc::sync::Arc;
    use alloc::vec;

    fn path(der: &[u8]) -> CertificateList {
        vec![Arc::new(ParsedCertificate::new(
            der.to_vec(),
            der.to_vec(),
            der.to_vec(),
            vec![],
            der.to_vec(),
        ))]
    }

    #[test]
    fn empty_result() {
        let result = CertPathBuilderResult::default();
        assert!(!result.is_success());
        assert!(result.best_path().is_none());
        assert_eq!(
            Err(Error::PathValidation(PathValidationStatus::NoPathsFound)),
            result.status()
        );
    }

    #[test]
    fn first_failure_reported_without_success() {
        let mut result = CertPathBuilderResult::default();
        result.add_result_path(
            path(b"a"),
            Err(Error::PathValidation(PathValidationStatus::InvalidNotAfterDate)),
        );
        result.add_result_path(
            path(b"b"),
            Err(Error::PathValidation(
                PathValidationStatus::SignatureVerificationFailure,
            )),
        );
        assert!(!result.is_success());
        assert_eq!(2, result.paths.len());
        assert!(!result.paths[1].is_success());
        assert_eq!(
            Err(Error::PathValidation(PathValidationStatus::InvalidNotAfterDate)),
            result.status()
        );
    }

    #[test]
    fn first_success_is_best() {
        let mut result = CertPathBuilderResult::default();
        result.add_result_path(
            path(b"a"),
            Err(Error::PathValidation(PathValidationStatus::InvalidNotAfterDate)),
        );
        result.add_result_path(path(b"b"), Ok(()));
        result.add_result_path(path(b"c"), Ok(()));
        assert!(result.is_success());
        assert_eq!(Some(1), result.best_result_index);
        assert_eq!(b"b", result.best_path().unwrap().path[0].der_cert());
        assert_eq!(Ok(()), result.status());
    }
}
