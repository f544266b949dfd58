//! Password policy filters
//!
//! Every filter is a pure predicate on a password (and its entropy). Enabled
//! filters are combined with a logical AND, so application order does not
//! change the result.

use crate::analyzer::shannon_entropy;
use crate::error::{RefineryError, Result};
use regex::Regex;

/// WPA2-PSK passphrase length bounds, in characters
pub const WPA2_MIN_LEN: usize = 8;
pub const WPA2_MAX_LEN: usize = 63;

/// URL, domain and leak-source markers that show up in scraped lists
const NOISE_PATTERN: &str =
    r"(?i)(?:http://|https://|www\.|\.com\b|\.net\b|\.org\b|rockyou|friendster|layout)";

/// WPA2-PSK check: 8..=63 characters, all printable US-ASCII (0x20-0x7E)
#[inline]
pub fn is_wpa2_compliant(password: &str) -> bool {
    // Non-ASCII fails the charset test anyway, so byte length equals char count here
    (WPA2_MIN_LEN..=WPA2_MAX_LEN).contains(&password.len())
        && password.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Inclusive minimum-entropy check
#[inline]
pub fn meets_min_entropy(entropy: f64, threshold: f64) -> bool {
    entropy >= threshold
}

/// Rejects strings that are clearly not passwords: anything containing
/// whitespace, URLs, domains or leak-site names.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    markers: Regex,
}

impl NoiseFilter {
    pub fn new() -> Result<Self> {
        let markers = Regex::new(NOISE_PATTERN)?;
        Ok(Self { markers })
    }

    /// True if the string looks like noise and should be dropped
    #[inline]
    pub fn is_noise(&self, password: &str) -> bool {
        password.chars().any(char::is_whitespace) || self.markers.is_match(password)
    }
}

/// The set of enabled record filters for a run
#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    wpa2: bool,
    min_entropy: Option<f64>,
    noise: Option<NoiseFilter>,
}

impl PolicyFilter {
    /// Build a filter set, validating the entropy threshold
    pub fn new(wpa2: bool, min_entropy: Option<f64>, reject_noise: bool) -> Result<Self> {
        if let Some(threshold) = min_entropy {
            validate_threshold(threshold)?;
        }

        let noise = if reject_noise {
            Some(NoiseFilter::new()?)
        } else {
            None
        };

        Ok(Self {
            wpa2,
            min_entropy,
            noise,
        })
    }

    /// Check a password against all enabled filters
    ///
    /// `entropy` is used when already known; otherwise it is computed only
    /// if the min-entropy filter is enabled.
    pub fn accepts(&self, password: &str, entropy: Option<f64>) -> bool {
        if self.wpa2 && !is_wpa2_compliant(password) {
            return false;
        }

        if let Some(threshold) = self.min_entropy {
            let entropy = entropy.unwrap_or_else(|| shannon_entropy(password));
            if !meets_min_entropy(entropy, threshold) {
                return false;
            }
        }

        if let Some(ref noise) = self.noise {
            if noise.is_noise(password) {
                return false;
            }
        }

        true
    }
}

/// A threshold must be a finite, non-negative number of bits
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(())
    } else {
        Err(RefineryError::InvalidThreshold(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wpa2_boundaries() {
        assert!(!is_wpa2_compliant(&"a".repeat(7)));
        assert!(is_wpa2_compliant(&"a".repeat(8)));
        assert!(is_wpa2_compliant(&"a".repeat(63)));
        assert!(!is_wpa2_compliant(&"a".repeat(64)));
    }

    #[test]
    fn test_wpa2_charset() {
        assert!(is_wpa2_compliant("Tr0ub4dor&3"));
        assert!(is_wpa2_compliant("with space"));
        assert!(is_wpa2_compliant("~!@#$%^&*()"));
        assert!(!is_wpa2_compliant("cafébabe"));
        assert!(!is_wpa2_compliant(&format!("{}é", "a".repeat(20))));
        assert!(!is_wpa2_compliant("tab\there1"));
        assert!(!is_wpa2_compliant("del\x7fchar1"));
    }

    #[test]
    fn test_min_entropy_inclusive() {
        let entropy = shannon_entropy("abcd");
        assert!(meets_min_entropy(entropy, 2.0));
        assert!(!meets_min_entropy(entropy, 2.0001));

        let policy = PolicyFilter::new(false, Some(2.0), false).unwrap();
        assert!(policy.accepts("abcd", None));
        assert!(!policy.accepts("aaab", None));
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(matches!(
            PolicyFilter::new(false, Some(-1.0), false),
            Err(RefineryError::InvalidThreshold(_))
        ));
        assert!(PolicyFilter::new(false, Some(f64::NAN), false).is_err());
        assert!(PolicyFilter::new(false, Some(f64::INFINITY), false).is_err());
        assert!(PolicyFilter::new(false, Some(0.0), false).is_ok());
    }

    #[test]
    fn test_noise_filter() {
        let noise = NoiseFilter::new().unwrap();

        assert!(noise.is_noise("http://example"));
        assert!(noise.is_noise("WWW.foo"));
        assert!(noise.is_noise("mysite.com"));
        assert!(noise.is_noise("rockyou123"));
        assert!(noise.is_noise("two words"));
        assert!(!noise.is_noise("Tr0ub4dor&3"));
        assert!(!noise.is_noise("company"));
    }

    #[test]
    fn test_filters_combine_as_and() {
        let policy = PolicyFilter::new(true, Some(3.0), true).unwrap();

        assert!(policy.accepts("Tr0ub4dor&3", None));
        // passes entropy, fails length
        assert!(!policy.accepts(&"abcdefghijklmnopqrstuvwxyz".repeat(3), None));
        // passes WPA2, fails entropy
        assert!(!policy.accepts("password", None));
        // passes both, fails noise
        assert!(!policy.accepts("Xq9rockyou!", None));
    }

    #[test]
    fn test_inactive_policy_accepts_everything() {
        let policy = PolicyFilter::default();
        assert!(policy.accepts("x", None));
        assert!(policy.accepts("cafébabe", None));
    }
}
