//! Persisted override payload: startup load and commit through a gateway

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::overrides::LayoutPayload;
use crate::store::OverrideStore;

/// Durable storage for committed layouts.
///
/// Implementations only transport the payload; reconciling the store after a
/// successful push is done by [`commit_layout`].
#[allow(async_fn_in_trait)]
pub trait PersistenceGateway {
    async fn push(&self, payload: &LayoutPayload) -> Result<()>;
}

/// Writes the payload as tab-indented JSON to a file
#[derive(Debug, Clone)]
pub struct FileGateway {
    path: PathBuf,
}

impl FileGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceGateway for FileGateway {
    async fn push(&self, payload: &LayoutPayload) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create layout directory: {}", parent.display()))?;
        }

        let contents = to_tab_json(payload)?;
        // Write next to the target and rename so readers never see a partial file
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, contents)
            .await
            .context(format!("Failed to write layout to {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .context(format!("Failed to move layout into place at {}", self.path.display()))?;

        info!(path = %self.path.display(), cards = payload.overrides.len(), "Wrote layout config");
        Ok(())
    }
}

/// Pretty JSON with tab indentation and a trailing newline
pub fn to_tab_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .context("Failed to serialize layout payload")?;
    let mut contents = String::from_utf8(buffer).context("Serialized layout was not UTF-8")?;
    contents.push('\n');
    Ok(contents)
}

/// Read the persisted payload. A missing file means "no overrides".
pub fn load_payload(path: &Path) -> Result<LayoutPayload> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No layout config found, using defaults");
            return Ok(LayoutPayload::default());
        }
        Err(e) => {
            return Err(e).context(format!("Failed to read layout config from {}", path.display()));
        }
    };

    let payload: LayoutPayload = serde_json::from_str(&contents)
        .context(format!("Failed to parse layout config {}", path.display()))?;
    info!(path = %path.display(), cards = payload.overrides.len(), "Loaded layout config");
    Ok(payload)
}

/// Push the store's current payload; on success adopt it as the saved baseline.
/// On failure the store is left untouched so the edits can be retried.
pub async fn commit_layout<G: PersistenceGateway>(store: &mut OverrideStore, gateway: &G) -> Result<LayoutPayload> {
    let payload = store.get_payload();
    match gateway.push(&payload).await {
        Ok(()) => {
            store.set_saved_overrides(&payload.overrides);
            info!(cards = payload.overrides.len(), "Layout committed");
            Ok(payload)
        }
        Err(e) => {
            error!(error = ?e, "Failed to commit layout, keeping pending edits");
            Err(e.context("Layout commit failed"))
        }
    }
}
