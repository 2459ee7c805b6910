//! Subcommand implementations.

pub mod admin;
pub mod migrate;

/// Primary database URL variable, shared with the server.
pub const DATABASE_URL_VAR: &str = "ADMIN_DATABASE_URL";

/// Database URL from `ADMIN_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// Loads `.env` first.
pub fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.is_empty())
}
