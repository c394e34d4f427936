//! Utility module for command line interfaces

use std::{error::Error, fmt, fmt::Display};

/// An error struct to wrap simple static error messages
#[derive(Debug)]
pub struct CliErr(pub &'static str);

impl Display for CliErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Error for CliErr {}

/// Parse an optional positional argument, falling back to a default when it is missing.
pub fn parse_arg_or<T: std::str::FromStr>(arg: Option<String>, default: T, err: &'static str) -> Result<T, CliErr> {
    match arg {
        Some(arg) => arg.parse().map_err(|_| CliErr(err)),
        None => Ok(default),
    }
}
