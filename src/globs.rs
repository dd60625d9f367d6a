//! BSD-style glob expansion of positional CLI arguments (§4.5).
//!
//! Adapted from this codebase's existing glob-expansion conventions
//! (`glob::glob_with` with case-sensitive, non-literal-separator
//! `MatchOptions`), simplified: chainlint doesn't need to resolve paths
//! relative to a shell `cwd` the way the original shell-builtin does,
//! since it only ever expands within the process's actual working
//! directory.

use crate::error::ChainlintError;
use glob::{glob_with, MatchOptions};

fn has_glob_metachar(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

/// Expand one positional argument. A pattern with no glob metacharacter is
/// passed through unchanged (even if the path doesn't exist — that
/// surfaces later as a per-file `?!ERR?!` read error, not a glob
/// failure). A pattern that does contain a metacharacter but matches
/// nothing expands to zero paths (dropped silently, not an error, per
/// §4.5/§6). A malformed glob pattern is reported to the caller.
pub fn expand_one(pattern: &str) -> Result<Vec<String>, ChainlintError> {
    if !has_glob_metachar(pattern) {
        return Ok(vec![pattern.to_string()]);
    }

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: !pattern.starts_with('.'),
    };

    let mut matches: Vec<String> = glob_with(pattern, options)
        .map_err(|source| ChainlintError::Glob {
            pattern: pattern.to_string(),
            source,
        })?
        .filter_map(Result::ok)
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    matches.sort();
    Ok(matches)
}

/// Expand every positional argument, concatenating results in argument
/// order. A malformed pattern logs to stderr and is skipped rather than
/// aborting the whole expansion (§4.5).
pub fn expand_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for arg in args {
        match expand_one(arg.as_ref()) {
            Ok(mut paths) => out.append(&mut paths),
            Err(e) => eprintln!("chainlint: {}", e),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn non_glob_argument_passes_through_even_if_missing() {
        assert_eq!(
            expand_one("does/not/exist.sh").unwrap(),
            vec!["does/not/exist.sh".to_string()]
        );
    }

    #[test]
    fn glob_pattern_expands_sorted_matches() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.sh"), "").unwrap();
        fs::write(dir.path().join("a.sh"), "").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();
        let pattern = dir.path().join("*.sh").to_string_lossy().into_owned();
        let matches = expand_one(&pattern).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches[0].ends_with("a.sh"));
        assert!(matches[1].ends_with("b.sh"));
    }

    #[test]
    fn glob_pattern_with_no_matches_expands_empty() {
        let dir = tempdir().unwrap();
        let pattern = dir.path().join("*.nomatch").to_string_lossy().into_owned();
        assert_eq!(expand_one(&pattern).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn dotfiles_require_explicit_leading_dot() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hidden.sh"), "").unwrap();
        let star_pattern = dir.path().join("*.sh").to_string_lossy().into_owned();
        assert!(expand_one(&star_pattern).unwrap().is_empty());
        let dot_pattern = dir.path().join(".*.sh").to_string_lossy().into_owned();
        assert_eq!(expand_one(&dot_pattern).unwrap().len(), 1);
    }
}
