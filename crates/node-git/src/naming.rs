//! Branch name sanitising and validation

use crate::{Error, Result};

/// Replace characters git refuses in branch names with dashes.
///
/// Alphanumerics, `-`, `_` and single `.` are kept; runs of anything else
/// collapse to one dash. Leading and trailing separators are dropped.
/// `Sop/studio.tools::my node` -> `Sop-studio.tools-my-node`
pub fn sanitize_branch_name(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut last_was_separator = true;

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            result.push(c);
            last_was_separator = false;
        } else if c == '.' && !last_was_separator {
            result.push(c);
            last_was_separator = true;
        } else if !last_was_separator {
            result.push('-');
            last_was_separator = true;
        }
    }

    while result.ends_with(['-', '.']) {
        result.pop();
    }

    result
}

/// Reject names git would refuse before touching the repository.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() || !git2::Branch::name_is_valid(name)? {
        return Err(Error::InvalidBranchName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("release_Sop-studio.tools-box-1.0", "release_Sop-studio.tools-box-1.0")]
    #[case("Sop/studio::my node", "Sop-studio-my-node")]
    #[case("--leading", "leading")]
    #[case("trailing..", "trailing")]
    #[case("a..b", "a.b")]
    #[case("a  b", "a-b")]
    fn test_sanitize_branch_name(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize_branch_name(raw), expected);
    }

    #[test]
    fn test_sanitized_names_are_valid() {
        let name = sanitize_branch_name("release Sop::studio.tools::box::1.0 ~^:");
        assert!(validate_branch_name(&name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("has space")]
    #[case("double..dot")]
    #[case("ends.lock")]
    fn test_invalid_branch_names(#[case] name: &str) {
        assert!(matches!(
            validate_branch_name(name),
            Err(Error::InvalidBranchName { .. })
        ));
    }
}
