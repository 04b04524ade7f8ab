use std::env;
use std::str::FromStr;

use crate::tutorial::UnknownLabel;

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Returns the value of the named environment variable, treating a blank
/// value as absent.
pub fn get_optional_variable(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Which persistence backend the server runs against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Backend {
    Postgres,
    Memory,
}

impl FromStr for Backend {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Backend::Postgres),
            "memory" => Ok(Backend::Memory),
            _ => Err(UnknownLabel(s.to_owned())),
        }
    }
}

/// A page size that is not a positive integer.
#[derive(Debug, thiserror::Error)]
#[error("invalid page size {0:?}")]
pub struct InvalidPageSize(pub String);

/// Parses a page size, which must be at least 1.
pub fn parse_page_size(value: &str) -> Result<usize, InvalidPageSize> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| InvalidPageSize(value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_parse_case_insensitively() {
        assert_eq!("Postgres".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!(" memory".parse::<Backend>().unwrap(), Backend::Memory);
        assert!("mongo".parse::<Backend>().is_err());
    }

    #[test]
    fn page_sizes_must_be_positive() {
        assert_eq!(parse_page_size("6").unwrap(), 6);
        assert_eq!(parse_page_size(" 12 ").unwrap(), 12);
        assert!(parse_page_size("0").is_err());
        assert!(parse_page_size("-1").is_err());
        assert!(parse_page_size("six").is_err());
    }

    #[test]
    fn blank_variables_are_absent() {
        env::set_var("CODECLIPS_TEST_BLANK_VARIABLE", "  ");

        assert_eq!(get_optional_variable("CODECLIPS_TEST_BLANK_VARIABLE"), None);
        assert_eq!(get_optional_variable("CODECLIPS_TEST_UNSET_VARIABLE"), None);
    }
}
