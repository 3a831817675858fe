//! Error types for guildhall-core
//!
//! Expected refusals (missing permission, insufficient funds, frozen bank)
//! are not errors: services report them as `Ok(None)` / `Ok(false)`.
//! The variants here cover storage failures and invariant violations.

use thiserror::Error;
use uuid::Uuid;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Guild does not exist
    #[error("guild not found: {0}")]
    GuildNotFound(Uuid),

    /// Rank does not exist
    #[error("rank not found: {0}")]
    RankNotFound(Uuid),

    /// War does not exist
    #[error("war not found: {0}")]
    WarNotFound(Uuid),

    /// Escrow hold does not exist
    #[error("escrow hold not found: {0}")]
    EscrowNotFound(Uuid),

    /// Ledger amounts must be strictly positive
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// A domain invariant was broken by the caller or by stored data
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Persistence backend failure
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
///
/// Provides human-readable error messages and suggestions for the CLI.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::GuildNotFound(id) => format!("🏰 Guild {} does not exist.", id),
            Error::RankNotFound(id) => format!("🎖️ Rank {} does not exist.", id),
            Error::WarNotFound(id) => format!("⚔️ War {} does not exist.", id),
            Error::EscrowNotFound(id) => format!("🔒 Escrow hold {} does not exist.", id),
            Error::InvalidAmount(amount) => {
                format!("💰 Amount {} is not valid; amounts must be positive.", amount)
            }
            Error::Invariant(msg) => format!("❌ Data integrity problem: {}", msg),
            Error::Configuration(msg) => format!("⚙️ Configuration error: {}", msg),
            Error::Storage(msg) => format!("💾 Storage error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::GuildNotFound(_) => {
                Some("Run 'guildhall stats <name>' with an existing guild name.".to_string())
            }
            Error::Invariant(_) => Some(
                "Run 'guildhall verify' and inspect the ledger before resuming writes.".to_string(),
            ),
            Error::Configuration(_) => {
                Some("Check config/local.toml and GUILDHALL_* environment variables.".to_string())
            }
            Error::Storage(_) => Some("Check that the data directory is writable.".to_string()),
            _ => None,
        }
    }
}

/// Format an error for CLI output
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    if let Some(suggestion) = error.suggestion() {
        output.push_str("\n💡 ");
        output.push_str(&suggestion);
    }
    output
}

#[cfg(test)]
mod tests;
