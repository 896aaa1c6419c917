use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

use lumo_core::constants::{DEFAULT_PRESET_URL, PERSIST_DEBOUNCE_MS, STORAGE_KEY};
use lumo_core::persist::Snapshot;

fn local_storage() -> Option<web::Storage> {
    web::window().and_then(|w| w.local_storage().ok()).flatten()
}

/// Read the saved snapshot; any storage or parse failure falls through to
/// `None` so the caller can fetch the default preset instead.
pub fn load_snapshot() -> Option<Snapshot> {
    let raw = local_storage()?.get_item(STORAGE_KEY).ok()??;
    match Snapshot::from_json(&raw) {
        Ok(snap) => Some(snap),
        Err(e) => {
            log::warn!("[storage] discarding unreadable snapshot: {e:#}");
            None
        }
    }
}

pub fn store_snapshot(snap: &Snapshot) {
    let Some(storage) = local_storage() else {
        return;
    };
    match snap.to_json() {
        Ok(json) => {
            if storage.set_item(STORAGE_KEY, &json).is_err() {
                log::warn!("[storage] save failed (quota or private mode)");
            }
        }
        Err(e) => log::warn!("[storage] serialize failed: {e:#}"),
    }
}

/// Coalesces rapid param edits into one storage write.
pub struct DebouncedSaver {
    pending: Rc<Cell<Option<i32>>>,
}

impl DebouncedSaver {
    pub fn new() -> Self {
        Self {
            pending: Rc::new(Cell::new(None)),
        }
    }

    pub fn save(&self, snap: Snapshot) {
        let Some(window) = web::window() else {
            return;
        };
        if let Some(handle) = self.pending.take() {
            window.clear_timeout_with_handle(handle);
        }
        let pending = self.pending.clone();
        let closure = Closure::once(move || {
            pending.set(None);
            store_snapshot(&snap);
        });
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            PERSIST_DEBOUNCE_MS,
        ) {
            Ok(handle) => {
                self.pending.set(Some(handle));
                closure.forget();
            }
            Err(e) => log::warn!("[storage] setTimeout failed: {e:?}"),
        }
    }
}

impl Default for DebouncedSaver {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch the bundled default preset, used when no local snapshot exists.
pub async fn fetch_default_preset() -> anyhow::Result<Snapshot> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let resp_value = JsFuture::from(window.fetch_with_str(DEFAULT_PRESET_URL))
        .await
        .map_err(|e| anyhow::anyhow!(format!("preset fetch failed: {e:?}")))?;
    let resp: web::Response = resp_value
        .dyn_into()
        .map_err(|e| anyhow::anyhow!(format!("{e:?}")))?;
    if !resp.ok() {
        anyhow::bail!("preset fetch: {} {}", resp.status(), resp.status_text());
    }
    let text = JsFuture::from(
        resp.text()
            .map_err(|e| anyhow::anyhow!(format!("{e:?}")))?,
    )
    .await
    .map_err(|e| anyhow::anyhow!(format!("{e:?}")))?;
    let text = text.as_string().unwrap_or_default();
    Snapshot::from_json(&text)
}

/// Fetch an arbitrary text resource, e.g. the playlist tree manifest.
pub async fn fetch_text(url: &str) -> anyhow::Result<String> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let resp_value = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| anyhow::anyhow!(format!("fetch {url} failed: {e:?}")))?;
    let resp: web::Response = resp_value
        .dyn_into()
        .map_err(|e| anyhow::anyhow!(format!("{e:?}")))?;
    if !resp.ok() {
        anyhow::bail!("fetch {url}: {} {}", resp.status(), resp.status_text());
    }
    let text = JsFuture::from(
        resp.text()
            .map_err(|e| anyhow::anyhow!(format!("{e:?}")))?,
    )
    .await
    .map_err(|e| anyhow::anyhow!(format!("{e:?}")))?;
    Ok(text.as_string().unwrap_or_default())
}
