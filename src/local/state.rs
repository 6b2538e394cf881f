//! Shared state for the local development engine.
//!
//! Provides thread-safe access to the asset cache and connected reload
//! clients using parking_lot RwLock.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Event pushed to connected reload clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReloadEvent {
    /// A watched file changed; clients should reload
    Reload {
        /// Path of the changed file, relative to the watch root
        path: String,
    },
    /// A client connected to the event stream
    ClientConnected {
        /// Client ID assigned by the engine
        id: usize,
    },
}

/// In-memory asset cache for serving without disk I/O.
///
/// Maps URL paths to their content and MIME type. Cleared on every reload
/// event so clients always observe the latest build output.
#[derive(Debug, Clone, Default)]
pub struct AssetCache {
    files: HashMap<String, (Vec<u8>, String)>,
}

impl AssetCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    /// Insert a file into the cache.
    ///
    /// # Arguments
    ///
    /// * `path` - URL path (e.g., "/index.js")
    /// * `content` - File content as bytes
    /// * `content_type` - MIME type (e.g., "application/javascript")
    pub fn insert(&mut self, path: String, content: Vec<u8>, content_type: String) {
        self.files.insert(path, (content, content_type));
    }

    /// Get a file from the cache.
    pub fn get(&self, path: &str) -> Option<&(Vec<u8>, String)> {
        self.files.get(path)
    }

    /// Clear all cached files.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Get number of cached files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Client connection tracker for Server-Sent Events.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, tokio::sync::mpsc::Sender<String>>>>;

/// Shared local engine state.
///
/// Multiple readers can access simultaneously, writers get exclusive access.
pub struct EngineState {
    /// In-memory asset cache
    pub cache: RwLock<AssetCache>,

    /// Connected SSE clients
    pub clients: ClientRegistry,

    /// Next client ID
    next_client_id: RwLock<usize>,

    /// Root directory for serving files from disk
    pub root: PathBuf,
}

impl EngineState {
    /// Create new engine state.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory containing built client assets
    pub fn new(root: PathBuf) -> Self {
        Self {
            cache: RwLock::new(AssetCache::new()),
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: RwLock::new(0),
            root,
        }
    }

    /// Get a file from the cache.
    pub fn get_cached_file(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.cache.read().get(path).cloned()
    }

    /// Clear the cache.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Register a new SSE client.
    ///
    /// # Returns
    ///
    /// Client ID and receiver for events
    pub fn register_client(&self) -> (usize, tokio::sync::mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = tokio::sync::mpsc::channel(100);
        self.clients.write().insert(id, tx);

        (id, rx)
    }

    /// Unregister an SSE client.
    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Broadcast an event to all connected clients.
    ///
    /// Disconnected clients are dropped from the registry as a side effect.
    pub async fn broadcast(&self, event: &ReloadEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());

        let clients = self.clients.read().clone();

        let mut failed_ids = Vec::new();
        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                failed_ids.push(id);
            }
        }

        for id in failed_ids {
            self.unregister_client(id);
        }
    }

    /// Drop every connected client, closing their event streams.
    pub fn clear_clients(&self) {
        self.clients.write().clear();
    }

    /// Get number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

/// Shared state handle for passing around the engine.
pub type SharedState = Arc<EngineState>;
