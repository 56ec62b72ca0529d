//! Webhook field extraction
//!
//! Pulls the deployment coordinates out of an inbound push notification:
//! `repo`, `tag` and an optional `folder` from the target's query string,
//! `git_url` and `ref` from the JSON payload. The payload is parsed
//! structurally first; a substring scan remains as a fallback for senders
//! that put JSON-shaped text on the wire without it being valid JSON.

use slipway_core::domain::job::BuildRequest;
use slipway_core::dto::webhook::WebhookPayload;
use std::collections::HashMap;
use thiserror::Error;

/// Body returned with every 400 on the webhook path. Names each required
/// field so the caller can fix the delivery without reading server logs.
pub const USAGE: &str = "Usage: POST /git?repo={repo}&tag={tag}[&folder={folder}] \
with a payload carrying \"git_url\" and \"ref\" (refs/heads/{branch})";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("missing query parameter `{0}`")]
    MissingParam(&'static str),
    #[error("missing payload field `{0}`")]
    MissingField(&'static str),
    #[error("ref `{0}` has no branch segment")]
    BadRef(String),
}

/// Splits a request target into its path and query parameters.
/// `"/git?repo=bot&tag=demo"` becomes `("/git", {repo: bot, tag: demo})`.
pub fn parse_target(target: &str) -> (&str, HashMap<String, String>) {
    match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target, HashMap::new()),
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Assembles a [`BuildRequest`] from the query parameters and payload of a
/// webhook delivery. All four required fields must be present; the branch
/// is the third `/`-separated segment of the ref (`refs/heads/main` ->
/// `main`). A branch name that itself contains `/` is truncated to its
/// first segment.
pub fn extract(
    params: &HashMap<String, String>,
    payload: &str,
) -> Result<BuildRequest, ExtractError> {
    let repo = required_param(params, "repo")?;
    let tag = required_param(params, "tag")?;
    let folder = params.get("folder").filter(|f| !f.is_empty()).cloned();

    let git_url = payload_field(payload, "git_url")?;
    let git_ref = payload_field(payload, "ref")?;
    let branch = git_ref
        .split('/')
        .nth(2)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| ExtractError::BadRef(git_ref.clone()))?
        .to_string();

    Ok(BuildRequest {
        repo,
        tag,
        git_url,
        branch,
        folder,
    })
}

fn required_param(
    params: &HashMap<String, String>,
    name: &'static str,
) -> Result<String, ExtractError> {
    params
        .get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or(ExtractError::MissingParam(name))
}

/// Reads one field out of the payload, structured parse first, raw scan
/// second.
fn payload_field(payload: &str, key: &'static str) -> Result<String, ExtractError> {
    if let Ok(parsed) = serde_json::from_str::<WebhookPayload>(payload) {
        let value = match key {
            "git_url" => parsed.git_url,
            _ => parsed.git_ref,
        };
        if let Some(value) = value {
            return Ok(value);
        }
    }
    scan_field(payload, key).ok_or(ExtractError::MissingField(key))
}

/// Best-effort substring scan for `"key": value` in JSON-shaped text that
/// failed structural parsing.
///
/// The scan window runs from the quote before the key to the next comma
/// (or end of text); the value is whatever follows the first colon in the
/// window, with braces and quotes stripped. Heuristic by construction: a
/// quoted key occurring inside another string value matches first, escaped
/// quotes are not honored, and values containing commas are truncated.
fn scan_field(text: &str, key: &str) -> Option<String> {
    let marker = format!("\"{key}\"");
    let at = text.find(&marker)?;
    let window = &text[at..];
    let window = match window.find(',') {
        Some(end) => &window[..end],
        None => window,
    };
    let (_, value) = window.split_once(':')?;
    let value = value
        .trim()
        .trim_end_matches('}')
        .trim_end()
        .trim_matches('"');
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
