//! Webhook delivery payload

use serde::{Deserialize, Serialize};

/// The declared shape of a webhook delivery body.
///
/// Forges attach many more fields; only these two matter here. Both are
/// optional at the type level so that a structurally valid payload with a
/// field missing can still be reported precisely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Clone URL of the repository to build from.
    #[serde(default)]
    pub git_url: Option<String>,
    /// Pushed ref, expected as `refs/heads/{branch}`.
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
}
