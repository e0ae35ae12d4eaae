//! Native bridge for the theme's JavaScript shim.
//!
//! The page owns `localStorage`. The shim opens one session per page load with
//! the rendered markup, the current location and the raw storage items; the
//! session runs initialization once and then stays alive for every event on
//! that page. Each response carries the storage items to write back, so a
//! completed toggle is never lost.

use std::collections::HashMap;
use std::rc::Rc;

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::Serialize;

use crate::config::ThemeConfig;
use crate::error::Result;
use crate::interaction::{dispatch, initial_patches, EventOutcome, NodePatch, UiEvent};
#[cfg(feature = "napi")]
use crate::path::CanonicalPath;
use crate::state::{NavigationSnapshot, NavigationState};
use crate::storage::MemoryStorage;
#[cfg(feature = "napi")]
use crate::store::parse_persisted;

/// Raw storage items as handed over by the page. Non-string values are ignored.
pub fn storage_from_json(items: &serde_json::Value) -> MemoryStorage {
    let storage = MemoryStorage::new();
    if let Some(map) = items.as_object() {
        for (key, value) in map {
            if let Some(value) = value.as_str() {
                storage.seed(key, value);
            }
        }
    }
    storage
}

pub fn config_from_json(config: Option<&serde_json::Value>) -> Result<ThemeConfig> {
    match config {
        Some(value) if !value.is_null() => Ok(serde_json::from_value(value.clone())?),
        _ => Ok(ThemeConfig::default()),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub snapshot: NavigationSnapshot,
    pub patches: Vec<NodePatch>,
    pub storage: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub outcome: EventOutcome,
    pub storage: HashMap<String, String>,
}

/// One page's reconciled navigation, kept between events.
pub struct PageSession {
    storage: Rc<MemoryStorage>,
    state: NavigationState,
}

impl PageSession {
    pub fn open(
        html: &str,
        active_path: Option<&str>,
        storage_items: &serde_json::Value,
        config: ThemeConfig,
    ) -> Self {
        let storage = Rc::new(storage_from_json(storage_items));
        let state = NavigationState::from_html(config, storage.clone(), html, active_path);
        Self { storage, state }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// First paint: the snapshot plus a patch for every expandable entry.
    pub fn reconcile(&self) -> ReconcileResponse {
        ReconcileResponse {
            snapshot: self.state.snapshot(),
            patches: initial_patches(&self.state),
            storage: self.storage.items(),
        }
    }

    pub fn dispatch(&mut self, event: &UiEvent) -> DispatchResponse {
        let outcome = dispatch(&mut self.state, event);
        DispatchResponse {
            outcome,
            storage: self.storage.items(),
        }
    }
}

/// Reconcile a page without keeping it around.
pub fn reconcile_page(
    html: &str,
    active_path: Option<&str>,
    storage_items: &serde_json::Value,
    config: ThemeConfig,
) -> ReconcileResponse {
    PageSession::open(html, active_path, storage_items, config).reconcile()
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
fn to_napi_err(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[cfg(feature = "napi")]
#[napi]
pub fn reconcile_navigation_native(
    html: String,
    active_path: Option<String>,
    storage: serde_json::Value,
    config: Option<serde_json::Value>,
) -> napi::Result<serde_json::Value> {
    let config = config_from_json(config.as_ref()).map_err(to_napi_err)?;
    let response = reconcile_page(&html, active_path.as_deref(), &storage, config);
    serde_json::to_value(response).map_err(to_napi_err)
}

/// A page's navigation state, created once per page load by the shim.
#[cfg(feature = "napi")]
#[napi]
pub struct NavigationSession {
    session: PageSession,
}

#[cfg(feature = "napi")]
#[napi]
impl NavigationSession {
    #[napi(constructor)]
    pub fn new(
        html: String,
        active_path: Option<String>,
        storage: serde_json::Value,
        config: Option<serde_json::Value>,
    ) -> napi::Result<Self> {
        let config = config_from_json(config.as_ref()).map_err(to_napi_err)?;
        Ok(Self {
            session: PageSession::open(&html, active_path.as_deref(), &storage, config),
        })
    }

    #[napi]
    pub fn reconcile(&self) -> napi::Result<serde_json::Value> {
        serde_json::to_value(self.session.reconcile()).map_err(to_napi_err)
    }

    #[napi]
    pub fn dispatch(&mut self, event: serde_json::Value) -> napi::Result<serde_json::Value> {
        let event: UiEvent = serde_json::from_value(event)
            .map_err(|e| napi::Error::from_reason(format!("Invalid event: {}", e)))?;
        serde_json::to_value(self.session.dispatch(&event)).map_err(to_napi_err)
    }
}

#[cfg(feature = "napi")]
#[napi]
pub fn normalize_path_native(raw: String) -> String {
    CanonicalPath::new(&raw).into_string()
}

#[cfg(feature = "napi")]
#[napi]
pub fn load_expansion_set_native(raw: Option<String>) -> Vec<String> {
    parse_persisted(raw.as_deref())
        .into_iter()
        .map(CanonicalPath::into_string)
        .collect()
}
