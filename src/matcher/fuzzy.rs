//! Token-sort similarity on a 0..=100 scale.
//!
//! Both strings are lowercased, non-alphanumerics become spaces, tokens are
//! sorted and re-joined; the score is the indel ratio `2 * LCS / (len_a + len_b)`.

/// Lowercase, replace non-alphanumeric chars with spaces, trim.
pub fn process(s: &str) -> String {
    let mapped: String = s
        .chars()
        .flat_map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![' ']
            }
        })
        .collect();
    mapped.trim().to_string()
}

/// Processed string with its tokens in sorted order.
pub fn sorted_tokens(s: &str) -> String {
    let processed = process(s);
    let mut tokens: Vec<&str> = processed.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Indel similarity of two already-processed strings, rounded to 0..=100.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0;
    }
    let lcs = lcs_len(&a, &b);
    ((200.0 * lcs as f64) / total as f64).round() as u8
}

/// Order-insensitive similarity. A string that processes to nothing scores 0.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let sa = sorted_tokens(a);
    let sb = sorted_tokens(b);
    if sa.is_empty() || sb.is_empty() {
        return 0;
    }
    ratio(&sa, &sb)
}
