//! Glob-style member filtering for set scans
//!
//! Supported syntax, matched byte-wise:
//!
//! | Pattern | Matches |
//! |---------|---------|
//! | `*` | any sequence, including empty |
//! | `?` | exactly one byte |
//! | `[abc]`, `[a-z]` | one byte from the class |
//! | `[^abc]` | one byte not in the class |
//! | `\x` | the literal byte `x` |
//!
//! An unterminated `[` is matched literally.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glob {
    pattern: Vec<u8>,
}

impl Glob {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into().into_bytes(),
        }
    }

    /// Pattern matching every member
    pub fn any() -> Self {
        Self::new("*")
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if self.pattern == b"*" {
            return true;
        }
        glob_match(&self.pattern, candidate.as_bytes())
    }
}

impl Default for Glob {
    fn default() -> Self {
        Self::any()
    }
}

fn glob_match(p: &[u8], s: &[u8]) -> bool {
    let (mut pi, mut si) = (0, 0);
    // Backtrack point: (pattern index after the last `*`, input index it absorbed up to)
    let mut star: Option<(usize, usize)> = None;

    while si < s.len() {
        if pi < p.len() {
            match p[pi] {
                b'*' => {
                    star = Some((pi + 1, si));
                    pi += 1;
                    continue;
                }
                b'?' => {
                    pi += 1;
                    si += 1;
                    continue;
                }
                b'[' => match match_class(p, pi, s[si]) {
                    Some((true, next)) => {
                        pi = next;
                        si += 1;
                        continue;
                    }
                    Some((false, _)) => {}
                    None if s[si] == b'[' => {
                        pi += 1;
                        si += 1;
                        continue;
                    }
                    None => {}
                },
                b'\\' if pi + 1 < p.len() => {
                    if p[pi + 1] == s[si] {
                        pi += 2;
                        si += 1;
                        continue;
                    }
                }
                c => {
                    if c == s[si] {
                        pi += 1;
                        si += 1;
                        continue;
                    }
                }
            }
        }

        match star {
            Some((star_pi, star_si)) => {
                pi = star_pi;
                si = star_si + 1;
                star = Some((star_pi, star_si + 1));
            }
            None => return false,
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}

/// Match one byte against the class opening at `p[start]`.
/// Returns whether it matched and the index past the closing `]`,
/// or `None` when the class is unterminated.
fn match_class(p: &[u8], start: usize, c: u8) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = p.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < p.len() {
        match p[i] {
            b']' => return Some((matched != negate, i + 1)),
            b'\\' if i + 1 < p.len() => {
                matched |= p[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < p.len() && p[i + 1] == b'-' && p[i + 2] != b']' => {
                let hi = p[i + 2];
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                matched |= (lo..=hi).contains(&c);
                i += 3;
            }
            other => {
                matched |= other == c;
                i += 1;
            }
        }
    }
    None
}
