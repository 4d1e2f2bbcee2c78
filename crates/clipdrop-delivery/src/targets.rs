//! Reading the persisted webhook list.
//!
//! The settings collaborator stores webhooks as a JSON object keyed by
//! display name:
//!
//! ```json
//! {
//!   "My server": { "url": "https://discord.com/api/webhooks/...", "checked": true },
//!   "Old server": { "url": "https://discord.com/api/webhooks/...", "checked": false }
//! }
//! ```
//!
//! This module only reads that file; editing it belongs to the settings
//! collaborator.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use clipdrop_models::WebhookTarget;

use crate::error::DeliveryResult;

#[derive(Debug, Deserialize)]
struct StoredTarget {
    url: String,
    #[serde(default)]
    checked: bool,
}

/// Load all stored webhook targets, enabled and disabled alike.
///
/// Entries come back sorted by name so delivery reports are stable.
pub async fn load_targets(path: impl AsRef<Path>) -> DeliveryResult<Vec<WebhookTarget>> {
    let raw = tokio::fs::read_to_string(path.as_ref()).await?;
    let entries: BTreeMap<String, StoredTarget> = serde_json::from_str(&raw)?;

    Ok(entries
        .into_iter()
        .map(|(name, stored)| WebhookTarget {
            name,
            url: stored.url,
            enabled: stored.checked,
        })
        .collect())
}
