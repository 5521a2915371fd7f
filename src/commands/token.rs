//! # Token Command Implementation
//!
//! `pkgmgr token` resolves an API token for a forge host through the
//! credential chain and reports where it came from. With `--show` the
//! token itself is printed to stdout so it can be captured by scripts.

use anyhow::{Context, Result};
use clap::Args;

use pkgmgr::credentials::{ProviderKind, TokenResolver, TokenResult};
use pkgmgr::output::OutputConfig;

/// Resolve an API token for a forge host
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Forge host name.
    #[arg(long, value_name = "HOST", default_value = "github.com")]
    pub host: String,

    /// Provider API flavour (github, gitea). Guessed from the host when
    /// omitted.
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<ProviderKind>,

    /// Print the token on stdout.
    #[arg(long)]
    pub show: bool,
}

/// Execute the `token` command.
pub fn execute(args: TokenArgs, color: &str) -> Result<()> {
    let output = OutputConfig::from_env_and_flag(color, false);
    let provider = args
        .provider
        .unwrap_or_else(|| ProviderKind::for_host(&args.host));

    let result = TokenResolver::system()
        .get_token(provider, &args.host)
        .with_context(|| format!("Failed to resolve a {} token for {}", provider, args.host))?;

    if args.show {
        println!("{}", result.token);
    } else {
        eprintln!("{}", output.success(&summary(&args.host, &result)));
    }
    Ok(())
}

fn summary(host: &str, result: &TokenResult) -> String {
    format!("token for {} from {} ({})", host, result.source, mask(&result.token))
}

/// First and last few characters, enough to tell tokens apart.
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
