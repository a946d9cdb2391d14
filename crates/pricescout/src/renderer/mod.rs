//! Browser abstraction.
//!
//! Defines the `Launcher`, `Renderer` and `RenderContext` traits that abstract
//! over the browser engine (currently Chromium via chromiumoxide). Pipeline
//! stages only ever talk to a `RenderContext`.

pub mod chromium;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::ElementQuery;
use crate::state::StorageState;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Page load milestones a stage can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    DomContentLoaded,
    /// No new network activity for a short quiet window.
    NetworkIdle,
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomContentLoaded => write!(f, "domcontentloaded"),
            Self::NetworkIdle => write!(f, "networkidle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Options for launching the browser process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub args: Vec<String>,
    /// Explicit browser binary; discovered when `None`.
    pub executable: Option<PathBuf>,
}

/// Options for one navigation context.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub viewport: Viewport,
    pub locale: String,
    pub geolocation: GeoPoint,
    pub user_agent: String,
    /// Saved cookies/storage to seed the context with.
    pub storage_state: Option<StorageState>,
}

/// Starts browser processes.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Renderer>>;
}

/// A running browser that can create navigation contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self, options: &ContextOptions) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser process.
    async fn shutdown(self: Box<Self>) -> Result<()>;
}

/// A single browser context (tab) for driving pages.
///
/// Element operations address elements through an [`ElementQuery`]; a query
/// that matches nothing yields `Ok(false)`, `Ok(0)` or `Ok(None)` for reads
/// and an error for actions.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Go back one history entry.
    async fn go_back(&mut self, timeout_ms: u64) -> Result<()>;
    /// Wait until the page reaches `state`, or fail after `timeout_ms`.
    async fn wait_for_load(&self, state: LoadState, timeout_ms: u64) -> Result<()>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;

    /// Number of elements matched by the last step of `query`.
    async fn count(&self, query: &ElementQuery) -> Result<usize>;
    /// Whether the selected element exists and is rendered visibly right now.
    async fn is_visible(&self, query: &ElementQuery) -> Result<bool>;
    async fn click(&mut self, query: &ElementQuery) -> Result<()>;
    /// Replace the value of an input and fire input/change events.
    async fn fill(&mut self, query: &ElementQuery, text: &str) -> Result<()>;
    /// Press Enter in the selected element, submitting its form.
    async fn press_enter(&mut self, query: &ElementQuery) -> Result<()>;
    async fn attribute(&self, query: &ElementQuery, name: &str) -> Result<Option<String>>;
    async fn text_content(&self, query: &ElementQuery) -> Result<Option<String>>;
    async fn inner_html(&self, query: &ElementQuery) -> Result<Option<String>>;

    /// Snapshot cookies and local storage.
    async fn storage_state(&self) -> Result<StorageState>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}
