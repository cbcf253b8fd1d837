//! Pairwise text agreement between two extractor outputs.
//!
//! Two strategies exist and their scores are not comparable with each other:
//!
//! - [`SimilarityStrategy::TokenJaccard`]: intersection-over-union of the word-token
//!   sets of both texts. Order-insensitive and cheap.
//! - [`SimilarityStrategy::EditRatio`]: Ratcliff/Obershelp matching-block ratio over
//!   characters (`2 * matches / (len_a + len_b)`). Sensitive to ordering; quadratic in
//!   the worst case, so inputs are truncated to `max_chars`.
//!
//! A deployment picks one strategy through [`Similarity`] and every score in a report
//! is produced by that same value.

// Scores are ratios of counts
#![allow(clippy::cast_precision_loss)]

use crate::normalize::normalize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Default prefix (in characters) considered by either strategy.
pub const DEFAULT_MAX_CHARS: usize = 50_000;

/// Default number of tokens considered by [`SimilarityStrategy::TokenJaccard`].
pub const DEFAULT_MAX_TOKENS: usize = 5_000;

/// Sequences at least this long get the "popular element" heuristic in edit-ratio mode.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Word characters in any script (`\w` is Unicode-aware in `regex`).
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+").expect("token pattern is a valid regex"));

/// Which agreement measure to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityStrategy {
    /// Token-set Jaccard index.
    #[default]
    TokenJaccard,
    /// Ratcliff/Obershelp matching-block ratio.
    EditRatio,
}

impl SimilarityStrategy {
    /// All strategies, for help output.
    pub const ALL: [Self; 2] = [Self::TokenJaccard, Self::EditRatio];

    /// Stable name used in config files, manifests and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TokenJaccard => "token-jaccard",
            Self::EditRatio => "edit-ratio",
        }
    }
}

impl fmt::Display for SimilarityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimilarityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "token-jaccard" | "jaccard" => Ok(Self::TokenJaccard),
            "edit-ratio" | "ratio" | "sequence" => Ok(Self::EditRatio),
            other => Err(format!(
                "unknown similarity strategy '{other}' (expected one of: token-jaccard, edit-ratio)"
            )),
        }
    }
}

/// A configured similarity scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Similarity {
    strategy: SimilarityStrategy,
    max_chars: usize,
    max_tokens: usize,
}

impl Default for Similarity {
    fn default() -> Self {
        Self::new(SimilarityStrategy::default())
    }
}

impl Similarity {
    /// Scorer with the default truncation limits.
    #[must_use]
    pub const fn new(strategy: SimilarityStrategy) -> Self {
        Self {
            strategy,
            max_chars: DEFAULT_MAX_CHARS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Override the truncation limits. Zero means "no limit".
    #[must_use]
    pub const fn with_limits(mut self, max_chars: usize, max_tokens: usize) -> Self {
        self.max_chars = max_chars;
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub const fn strategy(&self) -> SimilarityStrategy {
        self.strategy
    }

    #[must_use]
    pub const fn max_chars(&self) -> usize {
        self.max_chars
    }

    #[must_use]
    pub const fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Similarity of two raw texts in `[0, 1]`.
    ///
    /// Both sides are normalized first. Two empty texts agree fully (1.0); exactly one
    /// empty text scores 0.0. The result is commutative for every input pair.
    #[must_use]
    pub fn score(&self, a: &str, b: &str) -> f64 {
        let (norm_a, norm_b) = (normalize(a), normalize(b));
        let na = truncate_chars(&norm_a, self.max_chars);
        let nb = truncate_chars(&norm_b, self.max_chars);

        match (na.is_empty(), nb.is_empty()) {
            (true, true) => return 1.0,
            (true, false) | (false, true) => return 0.0,
            (false, false) => {}
        }

        match self.strategy {
            SimilarityStrategy::TokenJaccard => token_jaccard(na, nb, self.max_tokens),
            SimilarityStrategy::EditRatio => {
                // Matching-block search breaks ties by position, so fix the argument
                // order to keep the score commutative.
                let (first, second) = if na <= nb { (na, nb) } else { (nb, na) };
                edit_ratio(first, second)
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn token_set(text: &str, max_tokens: usize) -> HashSet<&str> {
    let limit = if max_tokens == 0 { usize::MAX } else { max_tokens };
    TOKEN_RE
        .find_iter(text)
        .take(limit)
        .map(|m| m.as_str())
        .collect()
}

fn token_jaccard(a: &str, b: &str, max_tokens: usize) -> f64 {
    let set_a = token_set(a, max_tokens);
    let set_b = token_set(b, max_tokens);

    match (set_a.is_empty(), set_b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn edit_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = BlockMatcher::new(&a, &b).matching_chars();
    2.0 * matches as f64 / total as f64
}

/// Ratcliff/Obershelp block matcher over `char` slices.
///
/// Mirrors the classic "longest common block, then recurse on both sides" algorithm.
/// For long `b` sequences, characters occurring in more than 1% of positions are left
/// out of the index ("popular" elements); matches still extend across them.
struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let popular_threshold = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= popular_threshold);
        }

        Self { a, b, b2j }
    }

    /// Total length of all matching blocks.
    fn matching_chars(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, size) = self.longest_match(alo, ahi, blo, bhi);
            if size == 0 {
                continue;
            }
            total += size;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + size < ahi && j + size < bhi {
                queue.push((i + size, ahi, j + size, bhi));
            }
        }

        total
    }

    /// Longest matching block in `a[alo..ahi]` x `b[blo..bhi]` as `(i, j, size)`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (a, b) = (self.a, self.b);
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(ch) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = if j > 0 {
                        j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                    } else {
                        1
                    };
                    next.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next;
        }

        // Extend across elements that were dropped from the index.
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && a[best_i + best_size] == b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }
}
