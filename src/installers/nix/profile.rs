//! Reading `nix profile list --json`.
//!
//! Nix has shipped two shapes of this output. Older releases emit
//! `elements` as a list addressed by index; newer ones emit a map keyed by
//! entry name. Both are folded into [`ProfileEntry`] values whose `name`
//! is what `nix profile upgrade` / `remove` accept.

use crate::context::RepoContext;
use crate::error::{Error, Result};
use serde_json::Value;

pub const LIST_CONTEXT: &str = "nix profile list --json";

/// One installed element of the user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileEntry {
    /// Map key, or the list index rendered as a string.
    pub name: String,
    pub original_url: Option<String>,
    pub attr_path: Option<String>,
    pub store_paths: Vec<String>,
}

impl ProfileEntry {
    /// True when this entry was installed from `ctx`'s repository, either
    /// from its checkout or from its forge URL.
    pub fn matches(&self, ctx: &RepoContext) -> bool {
        if self.name == ctx.repo.repository {
            return true;
        }
        let Some(url) = self.original_url.as_deref() else {
            return false;
        };
        let url = url.to_lowercase();
        let checkout = ctx.repo_dir.to_string_lossy().to_lowercase();
        let remote = format!("{}/{}", ctx.repo.account, ctx.repo.repository).to_lowercase();
        let flake_shorthand = format!(
            "{}:{}",
            ctx.repo.provider.split('.').next().unwrap_or_default(),
            remote
        )
        .to_lowercase();

        url_without_fragment(&url).trim_start_matches("path:") == checkout
            || url.contains(&format!("{}/{}", ctx.repo.provider.to_lowercase(), remote))
            || url.starts_with(&flake_shorthand)
    }
}

fn url_without_fragment(url: &str) -> &str {
    url.split(['#', '?']).next().unwrap_or(url)
}

/// Parse the JSON printed by `nix profile list --json`.
///
/// Empty output (an empty profile, or preview mode) yields no entries.
/// Anything else that is not one of the known shapes is an
/// [`Error::Parse`] carrying the raw payload.
pub fn parse_profile(payload: &str) -> Result<Vec<ProfileEntry>> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }

    let parse_error = |message: String| Error::Parse {
        context: LIST_CONTEXT.to_string(),
        message,
        payload: payload.to_string(),
    };

    let root: Value = serde_json::from_str(payload).map_err(|e| parse_error(e.to_string()))?;
    let elements = root
        .get("elements")
        .ok_or_else(|| parse_error("missing 'elements'".to_string()))?;

    match elements {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| entry(index.to_string(), item).map_err(parse_error))
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(name, item)| entry(name.clone(), item).map_err(parse_error))
            .collect(),
        other => Err(parse_error(format!(
            "'elements' is neither a list nor a map: {}",
            other
        ))),
    }
}

fn entry(name: String, item: &Value) -> std::result::Result<ProfileEntry, String> {
    if !item.is_object() {
        return Err(format!("element '{}' is not an object", name));
    }
    let text = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
    let store_paths = item
        .get("storePaths")
        .and_then(Value::as_array)
        .map(|paths| {
            paths
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(ProfileEntry {
        original_url: text("originalUrl").or_else(|| text("url")),
        attr_path: text("attrPath"),
        store_paths,
        name,
    })
}
