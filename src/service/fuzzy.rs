use super::normalizer::{digit_groups, normalize};
use indexmap::IndexSet;

const WORD_OVERLAP_WEIGHT: f64 = 0.95;
const SUBSTRING_FLOOR: f64 = 0.88;
const TOKEN_SIMILARITY_MIN: f64 = 0.8;
const TOKEN_SIMILARITY_WEIGHT: f64 = 0.85;
const TOKEN_MIN_LEN: usize = 4;
const DIGIT_BONUS: f64 = 0.10;

/// Longest common block of `a[a_lo..a_hi]` and `b[b_lo..b_hi]` as (i, j, len).
/// Ties resolve to the earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    (a_lo, a_hi): (usize, usize),
    (b_lo, b_hi): (usize, usize),
) -> (usize, usize, usize) {
    let mut best = (a_lo, b_lo, 0);
    let width = b_hi - b_lo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in a_lo..a_hi {
        for j in b_lo..b_hi {
            let k = j - b_lo + 1;
            curr[k] = if a[i] == b[j] { prev[k - 1] + 1 } else { 0 };
            let len = curr[k];
            if len > best.2 {
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
        curr.iter_mut().for_each(|c| *c = 0);
    }

    best
}

/// Ratcliff/Obershelp similarity: `2 * matched / (len(a) + len(b))`
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut matched = 0usize;
    let mut stack = vec![((0, a.len()), (0, b.len()))];
    while let Some((ra, rb)) = stack.pop() {
        let (i, j, len) = longest_match(&a, &b, ra, rb);
        if len == 0 {
            continue;
        }
        matched += len;
        if ra.0 < i && rb.0 < j {
            stack.push(((ra.0, i), (rb.0, j)));
        }
        if i + len < ra.1 && j + len < rb.1 {
            stack.push(((i + len, ra.1), (j + len, rb.1)));
        }
    }

    2.0 * matched as f64 / total as f64
}

/// Jaccard vs overlap-relative-to-larger-set, whichever is higher, damped.
/// `None` when the names share no token.
fn word_overlap(words1: &IndexSet<&str>, words2: &IndexSet<&str>) -> Option<f64> {
    let shared = words1.intersection(words2).count();
    if shared == 0 {
        return None;
    }
    let union = words1.union(words2).count();
    let jaccard = shared as f64 / union as f64;
    let overlap = shared as f64 / words1.len().max(words2.len()) as f64;
    Some(jaccard.max(overlap) * WORD_OVERLAP_WEIGHT)
}

fn best_token_similarity(words1: &IndexSet<&str>, words2: &IndexSet<&str>) -> f64 {
    let mut best = 0.0f64;
    for w1 in words1.iter().filter(|w| w.chars().count() >= TOKEN_MIN_LEN) {
        for w2 in words2.iter().filter(|w| w.chars().count() >= TOKEN_MIN_LEN) {
            best = best.max(sequence_ratio(w1, w2));
        }
    }
    best
}

/// Similarity of two free-text item names in [0, 1].
///
/// An empty operand scores 0.0. Both names are then normalized; equal
/// normalized forms score 1.0, even when both strip down to nothing, and a
/// side that normalizes to nothing scores 0.0 against anything else. Otherwise the best of the character ratio and
/// word overlap is taken, then floored by substring/token evidence and
/// boosted when both carry the same numbers.
pub fn score(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let s1 = normalize(a);
    let s2 = normalize(b);
    if s1 == s2 {
        return 1.0;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }

    let mut best = sequence_ratio(&s1, &s2);

    let words1: IndexSet<&str> = s1.split_whitespace().collect();
    let words2: IndexSet<&str> = s2.split_whitespace().collect();
    if let Some(word_score) = word_overlap(&words1, &words2) {
        best = best.max(word_score);
    }

    if s1.contains(s2.as_str()) || s2.contains(s1.as_str()) {
        best = best.max(SUBSTRING_FLOOR);
    }

    let token_similarity = best_token_similarity(&words1, &words2);
    if token_similarity > TOKEN_SIMILARITY_MIN {
        best = best.max(TOKEN_SIMILARITY_WEIGHT * token_similarity);
    }

    let digits1: IndexSet<&str> = digit_groups(&s1).into_iter().collect();
    let digits2: IndexSet<&str> = digit_groups(&s2).into_iter().collect();
    if !digits1.is_empty() && digits1 == digits2 {
        best += DIGIT_BONUS;
    }

    best.clamp(0.0, 1.0)
}

/// Winner of a single greedy scan over a candidate pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    /// Position in the scanned pool
    pub position: usize,
    pub score: f64,
}

/// Highest-scoring candidate at or above `threshold`; ties keep the earliest.
///
/// Greedy and order-dependent: the caller removes the winner from the pool
/// before the next search so one candidate never serves two names.
pub fn best_match<T>(
    name: &str,
    pool: &[T],
    candidate_name: impl Fn(&T) -> &str,
    threshold: f64,
) -> Option<BestMatch> {
    let mut best: Option<BestMatch> = None;
    for (position, candidate) in pool.iter().enumerate() {
        let s = score(name, candidate_name(candidate));
        if s < threshold {
            continue;
        }
        let is_better = match &best {
            None => true,
            Some(current) => s > current.score,
        };
        if is_better {
            best = Some(BestMatch { position, score: s });
        }
    }
    best
}
