//! API token loading.
//!
//! The token is read from the environment variable named by
//! `account.token_env`; when that is unset it is read from the dotenv-style
//! `account.token_file` (`QUALTRICS_APITOKEN=...`).

use qs_domain::config::AccountConfig;
use qs_domain::error::{Error, Result};

/// Resolve the token from the process environment or the token file.
pub fn load_token(account: &AccountConfig) -> Result<String> {
    resolve_token(account, |key| std::env::var(key).ok())
}

/// Same as [`load_token`] with an injectable environment lookup.
pub fn resolve_token(
    account: &AccountConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    if let Some(token) = lookup(&account.token_env) {
        let token = token.trim();
        if !token.is_empty() {
            return Ok(token.to_owned());
        }
    }

    let path = &account.token_file;
    let entries = dotenvy::from_path_iter(path).map_err(|e| {
        Error::Auth(format!(
            "{} is not set and {} could not be read: {e}",
            account.token_env,
            path.display()
        ))
    })?;
    for entry in entries {
        let (key, value) = entry
            .map_err(|e| Error::Auth(format!("parsing {}: {e}", path.display())))?;
        let value = value.trim();
        if key == account.token_env && !value.is_empty() {
            return Ok(value.to_owned());
        }
    }
    Err(Error::Auth(format!(
        "{} not found in {}",
        account.token_env,
        path.display()
    )))
}
