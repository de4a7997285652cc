//! Strip naming-convention prefixes from release tags
//!
//! Projects tag releases as `v1.2`, `release-1.2`, `Foo_1.2`, `RELEASE-v1.2`
//! and so on. A candidate prefix is a base token, written in one of a few
//! cases, followed by a joiner. Candidates ending in a separator are tried
//! before bare tokens, so `release-` wins over `r`.

/// Base tokens, in the order they are tried. The repository name comes last.
const BASE_TOKENS: &[&str] = &["v", "r", "version", "release", "stable"];

/// Separators that may follow a base token. The empty joiner is last.
const JOINERS: &[&str] = &["-", "_", ".", "/", ""];

#[derive(Debug, Clone, Copy)]
enum CaseTransform {
    Lower,
    Upper,
    Title,
    Identity,
}

const CASE_TRANSFORMS: &[CaseTransform] = &[
    CaseTransform::Lower,
    CaseTransform::Upper,
    CaseTransform::Title,
    CaseTransform::Identity,
];

impl CaseTransform {
    fn apply(self, token: &str) -> String {
        match self {
            CaseTransform::Lower => token.to_lowercase(),
            CaseTransform::Upper => token.to_uppercase(),
            CaseTransform::Title => title_case(token),
            CaseTransform::Identity => token.to_string(),
        }
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest
fn title_case(token: &str) -> String {
    let mut result = String::with_capacity(token.len());
    let mut at_word_start = true;
    for c in token.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            result.push(c);
            at_word_start = true;
        }
    }
    result
}

struct Prefix {
    text: String,
    /// No separator follows the token
    bare: bool,
}

impl Prefix {
    fn strip<'a>(&self, tag: &'a str) -> Option<&'a str> {
        let rest = tag.strip_prefix(self.text.as_str())?;
        if rest.is_empty() {
            return None;
        }
        // `r` must not eat the start of `rc1` or `release1`
        if self.bare && !rest.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        Some(rest)
    }
}

fn prefixes(repo: &str) -> Vec<Prefix> {
    let tokens = BASE_TOKENS.iter().copied().chain(std::iter::once(repo));

    let mut prefixes = Vec::new();
    for joiner in JOINERS {
        for token in tokens.clone() {
            for transform in CASE_TRANSFORMS {
                let text = format!("{}{}", transform.apply(token), joiner);
                if text.is_empty() {
                    continue;
                }
                prefixes.push(Prefix {
                    text,
                    bare: joiner.is_empty(),
                });
            }
        }
    }
    prefixes
}

/// Strip conventional prefixes from `tag`, using the repository name as one
/// of the base tokens.
///
/// Each pass strips every matching candidate at most once, in order. Passes
/// repeat until nothing changes, so normalizing twice is the same as once.
/// A strip that would leave nothing is skipped.
pub fn normalize_tag(repo: &str, tag: &str) -> String {
    let prefixes = prefixes(repo);
    let mut current = tag;

    loop {
        let before = current.len();
        for prefix in &prefixes {
            if let Some(rest) = prefix.strip(current) {
                current = rest;
            }
        }
        if current.len() == before {
            return current.to_string();
        }
    }
}
