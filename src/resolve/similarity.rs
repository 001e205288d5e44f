//! Ratcliff/Obershelp string similarity.

/// Returns the similarity of `a` and `b` in `0.0..=1.0`: twice the number
/// of matching characters divided by the total number of characters.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = 2.0 * matching(&a, &b) as f64 / total as f64;
    ratio
}

/// Characters matched by recursively anchoring on the longest common
/// substring and matching what lies on each side of it.
fn matching(a: &[char], b: &[char]) -> usize {
    let (i, j, len) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }
    len + matching(&a[..i], &b[..j]) + matching(&a[i + len..], &b[j + len..])
}

/// `(start in a, start in b, length)` of the leftmost longest common substring.
fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            if row[j + 1] > best.2 {
                best = (i + 1 - row[j + 1], j + 1 - row[j + 1], row[j + 1]);
            }
        }
        std::mem::swap(&mut prev, &mut row);
    }
    best
}
