//! Admin password hashing.

use std::io::BufRead;

use dmarketplace_api::services::auth::hash_password;

use super::CliError;

/// Read one line from stdin and print its Argon2id hash.
///
/// # Errors
///
/// Returns an error for an empty or short password.
pub fn hash_from_stdin() -> Result<(), CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);

    if password.is_empty() {
        return Err(CliError::InvalidInput("no password on stdin".to_string()));
    }

    let hash = hash_password(password).map_err(|_| {
        CliError::InvalidInput("password must be at least 12 characters".to_string())
    })?;

    #[allow(clippy::print_stdout)]
    {
        println!("{hash}");
    }
    Ok(())
}
