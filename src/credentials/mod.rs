//! # Credential Resolution
//!
//! [`TokenResolver::get_token`] finds an API token for a forge host by
//! trying, in order:
//!
//! 1. the provider's environment variable (`GITHUB_TOKEN`, `GITEA_TOKEN`),
//!    used verbatim and never validated;
//! 2. the provider's CLI helper (`gh auth token`, GitHub only), validated;
//! 3. the OS keyring (service `pkgmgr`, account = host), validated;
//! 4. an interactive prompt, only when stdin is a terminal.
//!
//! A prompted token is written back to the keyring when it differs from
//! what is stored there. Nothing else is ever written: tokens from the
//! environment or the CLI helper stay where they came from.
//!
//! Every source sits behind a trait in [`providers`] or [`validate`], so the
//! chain can be tested without a keyring, a network, or a terminal.

pub mod providers;
pub mod validate;

pub use providers::{
    CredentialHelper, EnvReader, GhCli, KeyringStore, ProcessEnv, Prompter, SecretStore,
    TerminalPrompter,
};
pub use validate::{HttpValidator, TokenValidator};

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Forge flavours with a token API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    GitHub,
    Gitea,
}

impl ProviderKind {
    /// Environment variable holding a token for this provider.
    pub fn env_var(self) -> &'static str {
        match self {
            ProviderKind::GitHub => "GITHUB_TOKEN",
            ProviderKind::Gitea => "GITEA_TOKEN",
        }
    }

    /// Best guess from a host name: `github.com` and `github.*` hosts are
    /// GitHub, everything else is treated as Gitea.
    pub fn for_host(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        if host == "github.com" || host.starts_with("github.") {
            ProviderKind::GitHub
        } else {
            ProviderKind::Gitea
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::GitHub => "github",
            ProviderKind::Gitea => "gitea",
        })
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(ProviderKind::GitHub),
            "gitea" => Ok(ProviderKind::Gitea),
            other => Err(format!(
                "unknown provider '{}' (expected github or gitea)",
                other
            )),
        }
    }
}

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Env,
    GhCli,
    Keyring,
    Prompt,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenSource::Env => "environment",
            TokenSource::GhCli => "gh cli",
            TokenSource::Keyring => "keyring",
            TokenSource::Prompt => "prompt",
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TokenResult {
    pub token: String,
    pub source: TokenSource,
}

// Keep tokens out of debug logs.
impl fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResult")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

pub struct TokenResolver {
    env: Box<dyn EnvReader>,
    helper: Box<dyn CredentialHelper>,
    store: Box<dyn SecretStore>,
    prompter: Box<dyn Prompter>,
    validator: Box<dyn TokenValidator>,
}

impl Default for TokenResolver {
    fn default() -> Self {
        Self::system()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TokenResolver {
    pub fn new(
        env: Box<dyn EnvReader>,
        helper: Box<dyn CredentialHelper>,
        store: Box<dyn SecretStore>,
        prompter: Box<dyn Prompter>,
        validator: Box<dyn TokenValidator>,
    ) -> Self {
        Self {
            env,
            helper,
            store,
            prompter,
            validator,
        }
    }

    /// Resolver wired to the process environment, `gh`, the OS keyring,
    /// the terminal and the forge API.
    pub fn system() -> Self {
        Self::new(
            Box::new(ProcessEnv),
            Box::new(GhCli),
            Box::new(KeyringStore::default()),
            Box::new(TerminalPrompter),
            Box::new(HttpValidator::default()),
        )
    }

    pub fn get_token(&self, provider: ProviderKind, host: &str) -> Result<TokenResult> {
        // Taken verbatim: only an unset or empty variable counts as absent.
        if let Some(token) = self.env.var(provider.env_var()).filter(|v| !v.is_empty()) {
            log::debug!("using {} from the environment", provider.env_var());
            return Ok(TokenResult {
                token,
                source: TokenSource::Env,
            });
        }

        if provider == ProviderKind::GitHub {
            if let Some(token) = non_empty(self.helper.token(host)) {
                if self.validator.validate(provider, host, &token) {
                    return Ok(TokenResult {
                        token,
                        source: TokenSource::GhCli,
                    });
                }
                log::warn!("token from gh for {} was rejected by the API", host);
            }
        }

        let stored = match self.store.get(host) {
            Ok(stored) => non_empty(stored),
            Err(e) => {
                log::warn!("could not read keyring entry for {}: {}", host, e);
                None
            }
        };
        if let Some(token) = &stored {
            if self.validator.validate(provider, host, token) {
                return Ok(TokenResult {
                    token: token.clone(),
                    source: TokenSource::Keyring,
                });
            }
            log::warn!("keyring token for {} was rejected by the API", host);
        }

        if let Some(token) = non_empty(self.prompter.prompt(provider, host)?) {
            if stored.as_deref() != Some(token.as_str()) {
                if let Err(e) = self.store.set(host, &token) {
                    log::warn!("could not save token for {} to the keyring: {}", host, e);
                }
            }
            return Ok(TokenResult {
                token,
                source: TokenSource::Prompt,
            });
        }

        Err(Error::CredentialsExhausted {
            provider: provider.to_string(),
            host: host.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Calls(Arc<Mutex<Vec<String>>>);

    impl Calls {
        fn record(&self, call: impl Into<String>) {
            self.0.lock().unwrap().push(call.into());
        }

        fn all(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.all().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    struct MockEnv(HashMap<&'static str, &'static str>);

    impl EnvReader for MockEnv {
        fn var(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|v| v.to_string())
        }
    }

    struct MockHelper {
        token: Option<&'static str>,
        calls: Calls,
    }

    impl CredentialHelper for MockHelper {
        fn token(&self, host: &str) -> Option<String> {
            self.calls.record(format!("helper {}", host));
            self.token.map(str::to_string)
        }
    }

    struct MockStore {
        stored: Mutex<Option<String>>,
        fail_reads: bool,
        calls: Calls,
    }

    impl SecretStore for MockStore {
        fn get(&self, host: &str) -> Result<Option<String>> {
            self.calls.record(format!("keyring get {}", host));
            if self.fail_reads {
                return Err(Error::Keyring(keyring::Error::NoStorageAccess(
                    "locked".into(),
                )));
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        fn set(&self, host: &str, token: &str) -> Result<()> {
            self.calls.record(format!("keyring set {} {}", host, token));
            *self.stored.lock().unwrap() = Some(token.to_string());
            Ok(())
        }
    }

    struct MockPrompter {
        answer: Option<&'static str>,
        calls: Calls,
    }

    impl Prompter for MockPrompter {
        fn prompt(&self, provider: ProviderKind, host: &str) -> Result<Option<String>> {
            self.calls.record(format!("prompt {} {}", provider, host));
            Ok(self.answer.map(str::to_string))
        }
    }

    /// Accepts exactly the listed tokens.
    struct MockValidator {
        valid: Vec<&'static str>,
        calls: Calls,
    }

    impl TokenValidator for MockValidator {
        fn validate(&self, _provider: ProviderKind, _host: &str, token: &str) -> bool {
            self.calls.record(format!("validate {}", token));
            self.valid.contains(&token)
        }
    }

    #[derive(Default)]
    struct Setup {
        env: Vec<(&'static str, &'static str)>,
        helper: Option<&'static str>,
        stored: Option<&'static str>,
        fail_reads: bool,
        prompt: Option<&'static str>,
        valid: Vec<&'static str>,
    }

    impl Setup {
        fn build(self) -> (TokenResolver, Calls) {
            let calls = Calls::default();
            let resolver = TokenResolver::new(
                Box::new(MockEnv(self.env.into_iter().collect())),
                Box::new(MockHelper {
                    token: self.helper,
                    calls: calls.clone(),
                }),
                Box::new(MockStore {
                    stored: Mutex::new(self.stored.map(str::to_string)),
                    fail_reads: self.fail_reads,
                    calls: calls.clone(),
                }),
                Box::new(MockPrompter {
                    answer: self.prompt,
                    calls: calls.clone(),
                }),
                Box::new(MockValidator {
                    valid: self.valid,
                    calls: calls.clone(),
                }),
            );
            (resolver, calls)
        }
    }

    #[test]
    fn test_env_short_circuits_everything() {
        let (resolver, calls) = Setup {
            env: vec![("GITHUB_TOKEN", "env-token")],
            helper: Some("gh-token"),
            stored: Some("stored"),
            prompt: Some("typed"),
            ..Default::default()
        }
        .build();

        let result = resolver.get_token(ProviderKind::GitHub, "github.com").unwrap();

        assert_eq!(result.token, "env-token");
        assert_eq!(result.source, TokenSource::Env);
        assert!(calls.all().is_empty());
    }

    #[test]
    fn test_whitespace_env_is_used_verbatim() {
        let (resolver, calls) = Setup {
            env: vec![("GITHUB_TOKEN", "  ")],
            helper: Some("gh-token"),
            valid: vec!["gh-token"],
            ..Default::default()
        }
        .build();

        let result = resolver.get_token(ProviderKind::GitHub, "github.com").unwrap();

        assert_eq!(result.token, "  ");
        assert_eq!(result.source, TokenSource::Env);
        assert!(calls.all().is_empty());
    }

    #[test]
    fn test_empty_env_is_absent() {
        let (resolver, _) = Setup {
            env: vec![("GITHUB_TOKEN", "")],
            helper: Some("gh-token"),
            valid: vec!["gh-token"],
            ..Default::default()
        }
        .build();

        let result = resolver.get_token(ProviderKind::GitHub, "github.com").unwrap();
        assert_eq!(result.source, TokenSource::GhCli);
    }

    #[test]
    fn test_valid_helper_token_is_not_persisted() {
        let (resolver, calls) = Setup {
            helper: Some("gh-token"),
            valid: vec!["gh-token"],
            ..Default::default()
        }
        .build();

        let result = resolver.get_token(ProviderKind::GitHub, "github.com").unwrap();

        assert_eq!(result.source, TokenSource::GhCli);
        assert_eq!(calls.count("keyring"), 0);
        assert_eq!(calls.count("prompt"), 0);
    }

    #[test]
    fn test_valid_keyring_token() {
        let (resolver, calls) = Setup {
            stored: Some("stored"),
            valid: vec!["stored"],
            ..Default::default()
        }
        .build();

        let result = resolver.get_token(ProviderKind::Gitea, "git.example.org").unwrap();

        assert_eq!(result.token, "stored");
        assert_eq!(result.source, TokenSource::Keyring);
        assert_eq!(calls.count("keyring set"), 0);
    }

    #[test]
    fn test_gitea_skips_gh_helper() {
        let (resolver, calls) = Setup {
            helper: Some("gh-token"),
            valid: vec!["gh-token"],
            prompt: Some("typed"),
            ..Default::default()
        }
        .build();

        let result = resolver.get_token(ProviderKind::Gitea, "git.example.org").unwrap();

        assert_eq!(result.source, TokenSource::Prompt);
        assert_eq!(calls.count("helper"), 0);
    }

    #[test]
    fn test_invalid_sources_fall_through_to_prompt_and_persist_once() {
        let (resolver, calls) = Setup {
            helper: Some("stale-gh"),
            stored: Some("stale-stored"),
            prompt: Some("fresh"),
            ..Default::default()
        }
        .build();

        let result = resolver.get_token(ProviderKind::GitHub, "github.com").unwrap();

        assert_eq!(result.token, "fresh");
        assert_eq!(result.source, TokenSource::Prompt);
        assert_eq!(
            calls.all(),
            vec![
                "helper github.com",
                "validate stale-gh",
                "keyring get github.com",
                "validate stale-stored",
                "prompt github github.com",
                "keyring set github.com fresh",
            ]
        );
    }

    #[test]
    fn test_prompt_matching_stored_token_is_not_rewritten() {
        let (resolver, calls) = Setup {
            stored: Some("same"),
            prompt: Some("same"),
            ..Default::default()
        }
        .build();

        let result = resolver.get_token(ProviderKind::GitHub, "github.com").unwrap();

        assert_eq!(result.source, TokenSource::Prompt);
        assert_eq!(calls.count("keyring set"), 0);
    }

    #[test]
    fn test_keyring_read_failure_is_treated_as_absent() {
        let (resolver, calls) = Setup {
            fail_reads: true,
            prompt: Some("typed"),
            ..Default::default()
        }
        .build();

        let result = resolver.get_token(ProviderKind::GitHub, "github.com").unwrap();

        assert_eq!(result.source, TokenSource::Prompt);
        assert_eq!(calls.count("keyring set"), 1);
    }

    #[test]
    fn test_exhausted() {
        let (resolver, _) = Setup::default().build();

        let err = resolver
            .get_token(ProviderKind::GitHub, "github.com")
            .unwrap_err();
        match err {
            Error::CredentialsExhausted { provider, host } => {
                assert_eq!(provider, "github");
                assert_eq!(host, "github.com");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_provider_kind() {
        assert_eq!(ProviderKind::for_host("github.com"), ProviderKind::GitHub);
        assert_eq!(ProviderKind::for_host("GitHub.example.com"), ProviderKind::GitHub);
        assert_eq!(ProviderKind::for_host("git.example.org"), ProviderKind::Gitea);
        assert_eq!("Gitea".parse::<ProviderKind>(), Ok(ProviderKind::Gitea));
        assert!("gitlab".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let result = TokenResult {
            token: "secret".to_string(),
            source: TokenSource::Env,
        };
        assert!(!format!("{:?}", result).contains("secret"));
    }
}
