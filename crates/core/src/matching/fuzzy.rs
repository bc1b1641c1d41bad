/// Minimum `ratio` for two items to be merged into one catalog entry.
pub const STRICT_THRESHOLD: u8 = 85;

/// Minimum `partial_ratio` for another source's search hit to be probed
/// during link resolution.
pub const LOOSE_THRESHOLD: u8 = 65;

/// Levenshtein edit distance over chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    distance_chars(&a_chars, &b_chars)
}

fn distance_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 0;
    }
    let same = max_len - distance_chars(a, b);
    ((same * 100 + max_len / 2) / max_len) as u8
}

/// Similarity in `0..=100`: `100 * (max_len - distance) / max_len`, rounded.
///
/// Two empty strings score 0 so that titles with no usable characters never
/// merge with anything.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    ratio_chars(&a_chars, &b_chars)
}

/// Best `ratio` of the shorter string against every equal-length window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if short.is_empty() {
        return 0;
    }
    if short.len() == long.len() {
        return ratio_chars(&short, &long);
    }

    let mut best = 0;
    for window in long.windows(short.len()) {
        best = best.max(ratio_chars(&short, window));
        if best == 100 {
            break;
        }
    }
    best
}

/// Threshold decisions over normalized titles.
///
/// `is_same_title` decides catalog merges and must keep false merges rare;
/// `is_probable_match` decides whether another source's search hit is worth
/// probing for links, where a false positive only costs one extra request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatcher {
    strict: u8,
    loose: u8,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            strict: STRICT_THRESHOLD,
            loose: LOOSE_THRESHOLD,
        }
    }
}

impl FuzzyMatcher {
    pub fn new(strict: u8, loose: u8) -> Self {
        Self { strict, loose }
    }

    pub fn strict_threshold(&self) -> u8 {
        self.strict
    }

    pub fn loose_threshold(&self) -> u8 {
        self.loose
    }

    /// `ratio(a, b) >= threshold`.
    pub fn similar(a: &str, b: &str, threshold: u8) -> bool {
        ratio(a, b) >= threshold
    }

    /// Strict merge decision between two normalized titles.
    pub fn is_same_title(&self, a: &str, b: &str) -> bool {
        Self::similar(a, b, self.strict)
    }

    /// Loose cross-source lookup decision between two normalized titles.
    pub fn is_probable_match(&self, a: &str, b: &str) -> bool {
        partial_ratio(a, b) >= self.loose
    }
}
