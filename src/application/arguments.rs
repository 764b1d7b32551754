//! Parsed process arguments.
//!
//! Options follow `--name=value` or `--name`; everything else is a
//! non-option argument. Options may repeat.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

/// Error type for argument parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    /// An option with no name, such as `--` or `--=x`.
    #[error("Invalid argument syntax: {0}")]
    InvalidSyntax(String),
}

/// Structured view over the raw arguments of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplicationArguments {
    source: Vec<String>,
    option_names: Vec<String>,
    options: HashMap<String, Vec<String>>,
    non_option: Vec<String>,
}

impl ApplicationArguments {
    /// Parse raw arguments.
    pub fn parse<I, S>(args: I) -> Result<Self, ArgumentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = Self::default();
        for arg in args {
            let arg = arg.into();
            if let Some(option) = arg.strip_prefix("--") {
                let (name, value) = match option.split_once('=') {
                    Some((name, value)) => (name, Some(value)),
                    None => (option, None),
                };
                if name.is_empty() {
                    return Err(ArgumentError::InvalidSyntax(arg));
                }
                if !parsed.options.contains_key(name) {
                    parsed.option_names.push(name.to_string());
                }
                let values = parsed.options.entry(name.to_string()).or_default();
                if let Some(value) = value {
                    values.push(value.to_string());
                }
            } else {
                parsed.non_option.push(arg.clone());
            }
            parsed.source.push(arg);
        }
        Ok(parsed)
    }

    /// The raw arguments, unchanged.
    pub fn source_args(&self) -> &[String] {
        &self.source
    }

    /// Option names in first-seen order.
    pub fn option_names(&self) -> &[String] {
        &self.option_names
    }

    /// Whether `--name` appeared at all.
    pub fn contains_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Values of an option; empty for a bare `--name`, `None` when absent.
    pub fn option_values(&self, name: &str) -> Option<&[String]> {
        self.options.get(name).map(Vec::as_slice)
    }

    /// Arguments that are not options.
    pub fn non_option_args(&self) -> &[String] {
        &self.non_option
    }

    /// Whether no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_and_non_options() {
        let args =
            ApplicationArguments::parse(["--port=8080", "input.txt", "--debug", "--tag=a", "--tag=b"])
                .unwrap();

        assert_eq!(args.option_names(), ["port", "debug", "tag"]);
        assert_eq!(args.option_values("port").unwrap(), ["8080"]);
        assert!(args.option_values("debug").unwrap().is_empty());
        assert_eq!(args.option_values("tag").unwrap(), ["a", "b"]);
        assert!(args.option_values("missing").is_none());
        assert_eq!(args.non_option_args(), ["input.txt"]);
        assert_eq!(args.source_args().len(), 5);
    }

    #[test]
    fn test_value_may_contain_equals() {
        let args = ApplicationArguments::parse(["--filter=a=b"]).unwrap();
        assert_eq!(args.option_values("filter").unwrap(), ["a=b"]);
    }

    #[test]
    fn test_invalid_syntax() {
        assert_eq!(
            ApplicationArguments::parse(["--"]).unwrap_err(),
            ArgumentError::InvalidSyntax("--".into())
        );
        assert!(ApplicationArguments::parse(["--=x"]).is_err());
    }

    #[test]
    fn test_single_dash_is_non_option() {
        let args = ApplicationArguments::parse(["-v"]).unwrap();
        assert!(args.option_names().is_empty());
        assert_eq!(args.non_option_args(), ["-v"]);
    }
}
