//! Authorization token acquisition.
//!
//! Reads the token from a file when a path is given, otherwise prompts
//! interactively without echoing the token.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::domain::{AppError, Result};

/// Loads the API token from `path`, or prompts interactively if absent.
///
/// The token is trimmed of surrounding whitespace either way.
///
/// # Errors
/// Returns error if the file cannot be read or the resulting token is empty.
pub fn load_token(path: Option<&Path>) -> Result<String> {
    let token = match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read token file: {}", path.display()), e))?
            .trim()
            .to_string(),
        None => prompt_token()?,
    };

    if token.is_empty() {
        return Err(AppError::Config {
            message: "Authorization token is empty".into(),
        });
    }

    Ok(token)
}

fn prompt_token() -> Result<String> {
    let mut stderr = io::stderr();
    write!(
        stderr,
        "Authorization token (see README.md for how to find this): "
    )
    .map_err(|e| AppError::io("Failed to write prompt", e))?;
    stderr
        .flush()
        .map_err(|e| AppError::io("Failed to flush prompt", e))?;

    // The token is a credential; read it without echoing to the terminal.
    let token = rpassword::read_password()
        .map_err(|e| AppError::io("Failed to read token from stdin", e))?;

    Ok(token.trim().to_string())
}
