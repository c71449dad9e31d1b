//! core::naming
//!
//! Branch-name derivation for new commit nodes.
//!
//! A node's id doubles as its branch name, so the derivation has to produce
//! something `git branch` will accept: lowercase, underscored, short, and
//! pure ASCII.

use rand::Rng;

const MAX_LEN: usize = 20;
const SUFFIX_LEN: usize = 5;
const HEX_ALPHABET: &[u8] = b"0123456789abcdef";

/// Derive a branch name from a commit message.
///
/// Takes the first line, lowercases it, replaces spaces with `_`, strips
/// `.`, `:`, and `-`, truncates to 20 characters, and transliterates to
/// ASCII. When `randomize` is set, a `_` followed by five random lowercase
/// hex characters (drawn from the OS's cryptographically strong source) is
/// appended, to disambiguate concurrent branches derived from the same
/// first line.
///
/// # Example
///
/// ```
/// use gitgud::core::naming::derive_branch_name;
///
/// assert_eq!(derive_branch_name("My first commit", false), "my_first_commit");
/// assert_eq!(derive_branch_name("fix: a really long commit subject line", false), "fix_a_really_long_co");
/// ```
pub fn derive_branch_name(message: &str, randomize: bool) -> String {
    let first_line = message.lines().next().unwrap_or("");

    let lowered = first_line.to_lowercase();
    let underscored = lowered.replace(' ', "_");
    let stripped: String = underscored
        .chars()
        .filter(|c| !matches!(c, '.' | ':' | '-'))
        .collect();
    let truncated: String = stripped.chars().take(MAX_LEN).collect();
    let mut name = transliterate(&truncated);

    if randomize {
        name.push('_');
        name.push_str(&random_hex_suffix());
    }

    name
}

/// Best-effort ASCII transliteration: fold common Latin accents to their
/// plain equivalent, drop anything else that isn't already ASCII.
fn transliterate(s: &str) -> String {
    s.chars()
        .filter_map(|c| {
            if c.is_ascii() {
                return Some(c);
            }
            fold_accent(c)
        })
        .collect()
}

fn fold_accent(c: char) -> Option<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(folded)
}

fn random_hex_suffix() -> String {
    // `rand::rng()` draws from the OS entropy source and reseeds a CSPRNG
    // (ChaCha) per thread, satisfying the "cryptographically-strong" requirement
    // without pulling in a separate CSPRNG dependency.
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| HEX_ALPHABET[rng.random_range(0..HEX_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_lowercase_and_underscore() {
        assert_eq!(derive_branch_name("My First Commit", false), "my_first_commit");
    }

    #[test]
    fn strips_dots_colons_dashes() {
        assert_eq!(derive_branch_name("fix: bug-123.", false), "fix_bug123");
    }

    #[test]
    fn truncates_to_twenty_chars() {
        let name = derive_branch_name("this is a very long commit subject that keeps going", false);
        assert_eq!(name.chars().count(), MAX_LEN);
    }

    #[test]
    fn uses_first_line_only() {
        assert_eq!(derive_branch_name("first\nsecond", false), "first");
    }

    #[test]
    fn transliterates_accents() {
        assert_eq!(derive_branch_name("café", false), "cafe");
    }

    #[test]
    fn randomize_appends_suffix() {
        let name = derive_branch_name("hello", true);
        assert!(name.starts_with("hello_"));
        let suffix = name.strip_prefix("hello_").unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn randomize_suffixes_differ() {
        let a = derive_branch_name("hello", true);
        let b = derive_branch_name("hello", true);
        // Extremely unlikely to collide; guards against a constant "random" source.
        assert_ne!(a, b);
    }

    #[test]
    fn empty_message_yields_empty_name() {
        assert_eq!(derive_branch_name("", false), "");
    }
}
