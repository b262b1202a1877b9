use crate::models::Fingerprint;

/// Decides whether a captured template matches an enrolled one.
pub trait FingerprintMatcher: Send + Sync + 'static {
    fn verify(&self, enrolled: &str, candidate: &str) -> bool;

    /// True when `verify` is plain string equality, so lookups can go
    /// through the template index instead of scanning every enrollment.
    fn is_exact(&self) -> bool {
        false
    }

    /// First enrolled record accepted by `verify`.
    fn identify<'a>(&self, enrolled: &'a [Fingerprint], candidate: &str) -> Option<&'a Fingerprint> {
        enrolled
            .iter()
            .find(|fingerprint| self.verify(&fingerprint.template, candidate))
    }
}

/// Byte-for-byte comparison of template strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl FingerprintMatcher for ExactMatcher {
    fn verify(&self, enrolled: &str, candidate: &str) -> bool {
        enrolled.as_bytes() == candidate.as_bytes()
    }

    fn is_exact(&self) -> bool {
        true
    }
}
