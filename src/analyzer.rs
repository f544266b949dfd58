//! Per-record password analysis
//!
//! Shannon entropy, strength classification and character-class flags, plus
//! the [`Analyzer`] that turns a loaded [`Batch`] into an [`AnalyzedBatch`].

use crate::filter::PolicyFilter;
use crate::loader::{Batch, PasswordCandidate};
use std::fmt;

/// Lower entropy bound (bits) of the `Weak` bucket
pub const WEAK_CUTOFF: f64 = 2.5;
/// Lower entropy bound (bits) of the `Moderate` bucket
pub const MODERATE_CUTOFF: f64 = 3.5;
/// Lower entropy bound (bits) of the `Strong` bucket
pub const STRONG_CUTOFF: f64 = 4.5;

/// Shannon entropy of the character distribution, in bits
///
/// `H = -Σ p(c)·log2 p(c)` over the distinct characters of `word`. Only the
/// character counts matter, so any permutation of a string has the same
/// entropy. The empty string has entropy 0.
pub fn shannon_entropy(word: &str) -> f64 {
    if word.is_empty() {
        return 0.0;
    }

    if word.is_ascii() {
        let mut counts = [0u32; 128];
        for b in word.bytes() {
            counts[b as usize] += 1;
        }
        return entropy_from_counts(counts.iter().copied(), word.len());
    }

    // Sorting gives a deterministic summation order for the same multiset
    let mut chars: Vec<char> = word.chars().collect();
    chars.sort_unstable();

    let total = chars.len();
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=total {
        if i == total || chars[i] != chars[start] {
            runs.push((i - start) as u32);
            start = i;
        }
    }

    entropy_from_counts(runs.into_iter(), total)
}

fn entropy_from_counts(counts: impl Iterator<Item = u32>, total: usize) -> f64 {
    let total = total as f64;
    counts
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>()
        // p = 1 yields -0.0
        .abs()
}

/// Entropy-based strength label, ordered weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strength {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
}

impl Strength {
    /// Classify an entropy value
    ///
    /// | entropy (bits)  | label     |
    /// |-----------------|-----------|
    /// | `< 2.5`         | Very Weak |
    /// | `2.5 ..< 3.5`   | Weak      |
    /// | `3.5 ..< 4.5`   | Moderate  |
    /// | `>= 4.5`        | Strong    |
    pub fn from_entropy(entropy: f64) -> Self {
        if entropy < WEAK_CUTOFF {
            Self::VeryWeak
        } else if entropy < MODERATE_CUTOFF {
            Self::Weak
        } else if entropy < STRONG_CUTOFF {
            Self::Moderate
        } else {
            Self::Strong
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryWeak => "Very Weak",
            Self::Weak => "Weak",
            Self::Moderate => "Moderate",
            Self::Strong => "Strong",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Character classes present in a password
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComplexityFlags {
    pub has_upper: bool,
    pub has_lower: bool,
    pub has_digit: bool,
    /// Any character outside ASCII `[A-Za-z0-9]`
    pub has_special: bool,
}

impl ComplexityFlags {
    pub fn of(password: &str) -> Self {
        let mut flags = Self::default();
        for c in password.chars() {
            match c {
                'A'..='Z' => flags.has_upper = true,
                'a'..='z' => flags.has_lower = true,
                '0'..='9' => flags.has_digit = true,
                _ => flags.has_special = true,
            }
        }
        flags
    }
}

/// A scored password
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedRecord {
    pub password: String,
    pub entropy: f64,
    pub strength: Strength,
    pub flags: ComplexityFlags,
}

impl AnalyzedRecord {
    pub fn new(password: String) -> Self {
        let entropy = shannon_entropy(&password);
        Self::with_entropy(password, entropy)
    }

    fn with_entropy(password: String, entropy: f64) -> Self {
        let flags = ComplexityFlags::of(&password);
        Self {
            password,
            entropy,
            strength: Strength::from_entropy(entropy),
            flags,
        }
    }
}

/// Surviving records of one batch, in input order
#[derive(Debug, Clone)]
pub enum AnalyzedRecords {
    /// Metadata mode off: passwords only
    Raw(Vec<PasswordCandidate>),
    /// Metadata mode on
    Scored(Vec<AnalyzedRecord>),
}

/// Result of analyzing one [`Batch`]
#[derive(Debug, Clone)]
pub struct AnalyzedBatch {
    pub records: AnalyzedRecords,
    /// Records removed by policy filters
    pub filtered: u64,
}

impl AnalyzedBatch {
    pub fn len(&self) -> usize {
        match &self.records {
            AnalyzedRecords::Raw(r) => r.len(),
            AnalyzedRecords::Scored(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Passwords in output order, regardless of mode
    pub fn passwords(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match &self.records {
            AnalyzedRecords::Raw(r) => Box::new(r.iter().map(PasswordCandidate::as_str)),
            AnalyzedRecords::Scored(r) => Box::new(r.iter().map(|rec| rec.password.as_str())),
        }
    }

    /// Scored records, if metadata mode produced them
    pub fn scored(&self) -> Option<&[AnalyzedRecord]> {
        match &self.records {
            AnalyzedRecords::Scored(r) => Some(r),
            AnalyzedRecords::Raw(_) => None,
        }
    }
}

/// Stateless batch analyzer
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    metadata: bool,
    policy: PolicyFilter,
}

impl Analyzer {
    pub fn new(metadata: bool, policy: PolicyFilter) -> Self {
        Self { metadata, policy }
    }

    /// Score (in metadata mode) and filter a batch, preserving order
    pub fn analyze(&self, batch: Batch) -> AnalyzedBatch {
        let total = batch.len();

        let records = if self.metadata {
            AnalyzedRecords::Scored(
                batch
                    .candidates
                    .into_iter()
                    .filter_map(|candidate| {
                        let entropy = shannon_entropy(candidate.as_str());
                        self.policy
                            .accepts(candidate.as_str(), Some(entropy))
                            .then(|| AnalyzedRecord::with_entropy(candidate.into_string(), entropy))
                    })
                    .collect(),
            )
        } else {
            AnalyzedRecords::Raw(
                batch
                    .candidates
                    .into_iter()
                    .filter(|candidate| self.policy.accepts(candidate.as_str(), None))
                    .collect(),
            )
        };

        let mut analyzed = AnalyzedBatch {
            records,
            filtered: 0,
        };
        analyzed.filtered = (total - analyzed.len()) as u64;
        analyzed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(words: &[&str]) -> Batch {
        Batch {
            candidates: words.iter().filter_map(|w| PasswordCandidate::new(*w)).collect(),
            skipped: 0,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_shannon_entropy_basic() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaaa"), 0.0);
        assert_eq!(shannon_entropy("ééé"), 0.0);
        assert!(close(shannon_entropy("ab"), 1.0));
        assert!(close(shannon_entropy("abcd"), 2.0));
        assert!(close(shannon_entropy("aaaabbbb"), 1.0));
        assert!(close(shannon_entropy("123456"), 6f64.log2()));
    }

    #[test]
    fn test_entropy_permutation_invariant() {
        let a = shannon_entropy("Tr0ub4dor&3");
        let b = shannon_entropy("3rod&4bu0rT");
        assert_eq!(a, b);
        assert_eq!(shannon_entropy("çaça"), shannon_entropy("aaçç"));
    }

    #[test]
    fn test_entropy_grows_with_diversity() {
        let e1 = shannon_entropy("aaaa");
        let e2 = shannon_entropy("aaab");
        let e3 = shannon_entropy("aabc");
        let e4 = shannon_entropy("abcd");
        assert!(e1 < e2 && e2 < e3 && e3 < e4);
    }

    #[test]
    fn test_entropy_counts_characters_not_bytes() {
        assert!(close(shannon_entropy("éa"), 1.0));
    }

    #[test]
    fn test_strength_thresholds() {
        assert_eq!(Strength::from_entropy(0.0), Strength::VeryWeak);
        assert_eq!(Strength::from_entropy(2.49), Strength::VeryWeak);
        assert_eq!(Strength::from_entropy(2.5), Strength::Weak);
        assert_eq!(Strength::from_entropy(3.49), Strength::Weak);
        assert_eq!(Strength::from_entropy(3.5), Strength::Moderate);
        assert_eq!(Strength::from_entropy(4.49), Strength::Moderate);
        assert_eq!(Strength::from_entropy(4.5), Strength::Strong);
        assert_eq!(Strength::from_entropy(10.0), Strength::Strong);

        assert!(Strength::VeryWeak < Strength::Weak);
        assert!(Strength::Moderate < Strength::Strong);
        assert_eq!(Strength::VeryWeak.to_string(), "Very Weak");
    }

    #[test]
    fn test_complexity_flags() {
        let cases = [
            ("ABC", (true, false, false, false)),
            ("abc", (false, true, false, false)),
            ("123456", (false, false, true, false)),
            ("!!!", (false, false, false, true)),
            ("Aa1!", (true, true, true, true)),
            ("café", (false, true, false, true)),
        ];

        for (password, (upper, lower, digit, special)) in cases {
            let flags = ComplexityFlags::of(password);
            assert_eq!(flags.has_upper, upper, "{}", password);
            assert_eq!(flags.has_lower, lower, "{}", password);
            assert_eq!(flags.has_digit, digit, "{}", password);
            assert_eq!(flags.has_special, special, "{}", password);
        }
    }

    #[test]
    fn test_raw_mode_passes_text_through() {
        let analyzer = Analyzer::new(false, PolicyFilter::default());
        let analyzed = analyzer.analyze(batch(&["b", "a", "c"]));

        assert!(analyzed.scored().is_none());
        assert_eq!(analyzed.passwords().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(analyzed.filtered, 0);
    }

    #[test]
    fn test_min_entropy_in_raw_mode() {
        let policy = PolicyFilter::new(false, Some(3.0), false).unwrap();
        let analyzer = Analyzer::new(false, policy);
        let analyzed = analyzer.analyze(batch(&["123456", "Tr0ub4dor&3", "password"]));

        assert_eq!(analyzed.passwords().collect::<Vec<_>>(), vec!["Tr0ub4dor&3"]);
        assert_eq!(analyzed.filtered, 2);
    }

    #[test]
    fn test_metadata_mode_scores_records() {
        let policy = PolicyFilter::new(true, None, false).unwrap();
        let analyzer = Analyzer::new(true, policy);
        let analyzed = analyzer.analyze(batch(&["password", "short", "Tr0ub4dor&3", "cafébabe"]));

        let records = analyzed.scored().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].password, "password");
        assert!(close(records[0].entropy, 2.75));
        assert_eq!(records[0].strength, Strength::Weak);
        assert_eq!(records[1].password, "Tr0ub4dor&3");
        assert!(records[1].flags.has_special);
        assert_eq!(analyzed.filtered, 2);
    }

    #[test]
    fn test_filter_order_independent() {
        let words = ["aaaaaaaa", "Tr0ub4dor&3", "abc", "x1y2z3w4v5", "naïveté123"];
        let both = Analyzer::new(false, PolicyFilter::new(true, Some(3.0), false).unwrap())
            .analyze(batch(&words));

        let wpa2_first = Analyzer::new(false, PolicyFilter::new(false, Some(3.0), false).unwrap())
            .analyze(batch(
                &Analyzer::new(false, PolicyFilter::new(true, None, false).unwrap())
                    .analyze(batch(&words))
                    .passwords()
                    .collect::<Vec<_>>(),
            ));

        assert_eq!(
            both.passwords().collect::<Vec<_>>(),
            wpa2_first.passwords().collect::<Vec<_>>()
        );
    }
}
