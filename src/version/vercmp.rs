//! Loose version ordering for upstream tags
//!
//! Upstream projects rarely follow semver, so versions are compared
//! component-wise instead of parsed. A version is split on any non-alphanumeric
//! separator and on digit/letter boundaries. Each component gets a rank:
//!
//! ```text
//! pre-release word  <  zero / padding  <  post-release word  <  letter suffix  <  non-zero number
//! ("alpha", "rc")      ("0", missing)     ("patch", "post")     ("1.0a")
//! ```
//!
//! Components of equal rank compare by value: numbers numerically, words by
//! their first letter regardless of case.

use std::cmp::Ordering;

/// Words that mark a release made after the version they follow
const POST_RELEASE_KEYWORDS: &[&str] = &["patch", "post", "pl", "errata"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    PreRelease,
    Zero,
    PostRelease,
    LetterSuffix,
    NonZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Component<'a> {
    rank: Rank,
    value: &'a str,
}

const PADDING: Component<'static> = Component {
    rank: Rank::Zero,
    value: "0",
};

impl Component<'_> {
    fn cmp_value(&self, other: &Self) -> Ordering {
        match self.rank {
            Rank::Zero => Ordering::Equal,
            // leading zeros are already trimmed, so length decides first
            Rank::NonZero => self
                .value
                .len()
                .cmp(&other.value.len())
                .then_with(|| self.value.cmp(other.value)),
            Rank::PreRelease | Rank::PostRelease | Rank::LetterSuffix => {
                first_letter(self.value).cmp(&first_letter(other.value))
            }
        }
    }
}

fn first_letter(word: &str) -> Option<char> {
    word.chars().next().map(|c| c.to_ascii_lowercase())
}

fn components(version: &str) -> Vec<Component<'_>> {
    let bytes = version.as_bytes();
    let mut result = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        if bytes[i].is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let digits = version[start..i].trim_start_matches('0');
            result.push(if digits.is_empty() {
                PADDING
            } else {
                Component {
                    rank: Rank::NonZero,
                    value: digits,
                }
            });
        } else if bytes[i].is_ascii_alphabetic() {
            while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
            let word = &version[start..i];
            let after_number = start > 0 && bytes[start - 1].is_ascii_digit();
            let before_number = i < bytes.len() && bytes[i].is_ascii_digit();

            let rank = if word.len() == 1 && after_number && !before_number {
                Rank::LetterSuffix
            } else if POST_RELEASE_KEYWORDS
                .iter()
                .any(|keyword| word.eq_ignore_ascii_case(keyword))
            {
                Rank::PostRelease
            } else {
                Rank::PreRelease
            };
            result.push(Component { rank, value: word });
        } else {
            i += 1;
        }
    }

    result
}

/// Compare two version strings.
///
/// Never fails: any string is a version, possibly one with no components,
/// which equals `"0"`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = components(a);
    let right = components(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).unwrap_or(&PADDING);
        let r = right.get(i).unwrap_or(&PADDING);
        let ordering = l.rank.cmp(&r.rank).then_with(|| l.cmp_value(r));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Whether `current` is at least as new as `candidate`
pub fn is_newer_or_equal(current: &str, candidate: &str) -> bool {
    compare_versions(current, candidate) != Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0", "1.1", Ordering::Less)]
    #[case("1.10", "1.9", Ordering::Greater)]
    #[case("1.0", "1.0.0", Ordering::Equal)]
    #[case("1.01", "1.1", Ordering::Equal)]
    #[case("2", "10", Ordering::Less)]
    #[case("1.0alpha1", "1.0", Ordering::Less)]
    #[case("1.0rc2", "1.0rc10", Ordering::Less)]
    #[case("1.0beta", "1.0alpha", Ordering::Greater)]
    #[case("1.0alpha1", "1.0a1", Ordering::Equal)]
    #[case("1.0ALPHA", "1.0alpha", Ordering::Equal)]
    #[case("1.0", "1.0a", Ordering::Less)]
    #[case("1.0a", "1.0b", Ordering::Less)]
    #[case("1.0a", "1.0.1", Ordering::Less)]
    #[case("1.0", "1.0patch1", Ordering::Less)]
    #[case("1.0patch1", "1.0.1", Ordering::Less)]
    #[case("1.0-1", "1.0_1", Ordering::Equal)]
    #[case("2022.01.05", "2021.12.31", Ordering::Greater)]
    #[case("123456789012345678901234567890", "123456789012345678901234567891", Ordering::Less)]
    #[case("", "0", Ordering::Equal)]
    #[case("unstable-2022-01-01", "0.1", Ordering::Less)]
    fn compare_versions_orders_loosely(
        #[case] a: &str,
        #[case] b: &str,
        #[case] expected: Ordering,
    ) {
        assert_eq!(compare_versions(a, b), expected);
        assert_eq!(compare_versions(b, a), expected.reverse());
    }

    #[rstest]
    #[case("1.1", "1.0", true)]
    #[case("1.0", "1.0.0", true)]
    #[case("1.0", "1.1", false)]
    fn is_newer_or_equal_compares_current_against_candidate(
        #[case] current: &str,
        #[case] candidate: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(is_newer_or_equal(current, candidate), expected);
    }
}
