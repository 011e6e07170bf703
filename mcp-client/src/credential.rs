//! GitHub credential resolution: `GITHUB_TOKEN` → `GH_TOKEN` → `gh auth
//! token`, with shape validation on whatever we find. Grounded on the
//! original implementation's centralized credential provider — same
//! priority chain, same validation rule, same "never expose the value"
//! status introspection.

use std::process::Command;

use qe_core::{QeError, Result};

const VALID_PREFIXES: &[&str] = &["ghp_", "gho_", "github_pat_", "ghs_"];
const MIN_CLASSIC_TOKEN_LEN: usize = 40;

/// Validate a token's shape: either a known prefix, or a 40+ character
/// alphanumeric classic token. Does not contact GitHub — this is a local,
/// offline sanity check only.
pub fn is_valid_token_shape(token: &str) -> bool {
    if token.len() < 20 {
        return false;
    }
    if VALID_PREFIXES.iter().any(|p| token.starts_with(p)) {
        return true;
    }
    token.len() >= MIN_CLASSIC_TOKEN_LEN && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Resolve a GitHub token using the priority chain: `GITHUB_TOKEN` env var,
/// then `GH_TOKEN` env var, then `gh auth token` via the `gh` CLI. Returns
/// `QeError::Credential` if none yields a validly-shaped token.
pub fn resolve_github_token() -> Result<String> {
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        if is_valid_token_shape(&token) {
            return Ok(token);
        }
    }
    if let Ok(token) = std::env::var("GH_TOKEN") {
        if is_valid_token_shape(&token) {
            return Ok(token);
        }
    }
    if let Some(token) = token_from_gh_cli() {
        if is_valid_token_shape(&token) {
            return Ok(token);
        }
    }

    Err(QeError::Credential(
        "no GitHub token found: set GITHUB_TOKEN or GH_TOKEN, or run 'gh auth login'".into(),
    ))
}

fn token_from_gh_cli() -> Option<String> {
    let output = Command::new("gh").args(["auth", "token"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8(output.stdout).ok()?;
    let token = token.trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Which priority-chain entry supplied the active token, without exposing
/// the token value itself.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum TokenSource {
    GithubTokenEnv,
    GhTokenEnv,
    GhCli,
    None,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenInfo {
    pub has_github_token_env: bool,
    pub has_gh_token_env: bool,
    pub token_available: bool,
    pub token_source: TokenSource,
}

/// Report which credential source is in effect, never returning the token
/// value itself — used for diagnostics and `--self-check`-style output.
pub fn token_info() -> TokenInfo {
    let has_github_token_env = std::env::var("GITHUB_TOKEN").map(|t| is_valid_token_shape(&t)).unwrap_or(false);
    let has_gh_token_env = std::env::var("GH_TOKEN").map(|t| is_valid_token_shape(&t)).unwrap_or(false);

    let token_source = if has_github_token_env {
        TokenSource::GithubTokenEnv
    } else if has_gh_token_env {
        TokenSource::GhTokenEnv
    } else if token_from_gh_cli().map(|t| is_valid_token_shape(&t)).unwrap_or(false) {
        TokenSource::GhCli
    } else {
        TokenSource::None
    };

    TokenInfo {
        has_github_token_env,
        has_gh_token_env,
        token_available: token_source != TokenSource::None,
        token_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_token_shape_accepts_forty_char_alphanumeric() {
        let token = "a".repeat(40);
        assert!(is_valid_token_shape(&token));
    }

    #[test]
    fn rejects_short_tokens() {
        assert!(!is_valid_token_shape("ghp_short"));
    }

    #[test]
    fn accepts_known_prefixes_even_if_shorter_than_forty() {
        let token = format!("ghp_{}", "x".repeat(20));
        assert!(is_valid_token_shape(&token));
    }

    #[test]
    fn rejects_non_alphanumeric_classic_tokens() {
        let token = format!("{}-{}", "a".repeat(20), "b".repeat(20));
        assert!(!is_valid_token_shape(&token));
    }
}
