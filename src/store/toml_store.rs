//! TOML state file store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use serde::{Deserialize, Serialize};

use crate::config::schema::{ServerConfig, UpstreamConfig};
use crate::registry::peer::PeerParams;
use crate::store::{DurableStore, StoreError};

#[derive(Debug, Default, Deserialize)]
struct StateFile {
    #[serde(default)]
    upstreams: Vec<UpstreamConfig>,
}

#[derive(Serialize)]
struct StateFileRef<'a> {
    upstreams: &'a [UpstreamConfig],
}

/// Keeps every upstream's server list and rewrites the state file on
/// each change (write to a temporary file, then rename over the target).
#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    state: Mutex<Vec<UpstreamConfig>>,
}

impl TomlStore {
    /// Load the state file at `path`, or start from `seed` if it does not exist.
    pub fn open(path: impl AsRef<Path>, seed: &[UpstreamConfig]) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let upstreams = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let state: StateFile = toml::from_str(&content)?;
            tracing::info!(
                path = %path.display(),
                upstreams = state.upstreams.len(),
                "Loaded upstream state file"
            );
            state.upstreams
        } else {
            tracing::info!(path = %path.display(), "No upstream state file, seeding from configuration");
            seed.to_vec()
        };

        Ok(Self {
            path,
            state: Mutex::new(upstreams),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current recorded upstreams.
    pub fn upstreams(&self) -> Vec<UpstreamConfig> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<UpstreamConfig>) -> Result<(), StoreError>,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state)?;
        self.flush(&state)
    }

    fn flush(&self, upstreams: &[UpstreamConfig]) -> Result<(), StoreError> {
        let content = toml::to_string_pretty(&StateFileRef { upstreams })?;
        let tmp = self.path.with_extension("tmp");
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), "Upstream state written");
        Ok(())
    }
}

fn find_server<'a>(
    upstreams: &'a mut [UpstreamConfig],
    upstream: &str,
    server: &str,
) -> Result<&'a mut ServerConfig, StoreError> {
    upstreams
        .iter_mut()
        .find(|u| u.name == upstream)
        .and_then(|u| u.servers.iter_mut().find(|s| s.address == server))
        .ok_or_else(|| StoreError::UnknownServer {
            upstream: upstream.to_string(),
            server: server.to_string(),
        })
}

impl DurableStore for TomlStore {
    fn record_add(&self, upstream: &str, server: &str, params: &PeerParams) -> Result<(), StoreError> {
        self.update(|upstreams| {
            let index = match upstreams.iter().position(|u| u.name == upstream) {
                Some(index) => index,
                None => {
                    upstreams.push(UpstreamConfig {
                        name: upstream.to_string(),
                        servers: Vec::new(),
                    });
                    upstreams.len() - 1
                }
            };
            let servers = &mut upstreams[index].servers;
            servers.retain(|s| s.address != server);
            servers.push(ServerConfig::new(server, params));
            Ok(())
        })
    }

    fn record_remove(&self, upstream: &str, server: &str) -> Result<(), StoreError> {
        self.update(|upstreams| {
            find_server(upstreams, upstream, server)?;
            for entry in upstreams.iter_mut().filter(|u| u.name == upstream) {
                entry.servers.retain(|s| s.address != server);
            }
            Ok(())
        })
    }

    fn record_update(&self, upstream: &str, server: &str, params: &PeerParams) -> Result<(), StoreError> {
        self.update(|upstreams| {
            *find_server(upstreams, upstream, server)? = ServerConfig::new(server, params);
            Ok(())
        })
    }
}
