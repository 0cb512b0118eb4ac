//! Application context wiring.
//!
//! One `SemantixRuntime` per page context replaces the original's
//! module-level singletons: it owns the host task, one storage facade,
//! one folders manager per section, and one of each entity manager.
//! Consumers receive handles from here instead of reaching for globals.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::bridge::{channel, BridgeClient, FileBackend, MemoryBackend, StorageBackend, StorageHost};
use crate::config::CoreConfig;
use crate::folders::SectionFoldersManager;
use crate::managers::{FavoritesManager, ProjectsManager};
use crate::models::Section;
use crate::store::SemantixStorage;

const STORE_FILE: &str = "store.json";

pub struct SemantixRuntime {
    storage: SemantixStorage,
    folders: HashMap<Section, Arc<SectionFoldersManager>>,
    favorites: Arc<FavoritesManager>,
    projects: Arc<ProjectsManager>,
    host_handle: Option<JoinHandle<()>>,
}

impl SemantixRuntime {
    /// Open a file-backed runtime under `config.data_dir`.
    pub fn open(config: &CoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let backend = FileBackend::open(config.data_dir.join(STORE_FILE))?;
        Ok(Self::with_backend(config, Box::new(backend)))
    }

    /// Throwaway in-memory runtime (tests, dry runs).
    pub fn in_memory(config: &CoreConfig) -> Self {
        Self::with_backend(config, Box::new(MemoryBackend::new()))
    }

    /// Wire a runtime over an arbitrary backend. Must be called within a
    /// tokio runtime; the host task is spawned immediately.
    pub fn with_backend(config: &CoreConfig, backend: Box<dyn StorageBackend>) -> Self {
        let (client_end, host_end) = channel();
        let host_handle = StorageHost::spawn(backend, host_end.requests, host_end.responses);
        let client = Arc::new(BridgeClient::new(
            client_end.outbound,
            client_end.inbound,
            config.request_timeout,
        ));
        let storage = SemantixStorage::new(client);

        let folders: HashMap<Section, Arc<SectionFoldersManager>> = Section::ALL
            .into_iter()
            .map(|section| {
                (
                    section,
                    Arc::new(SectionFoldersManager::new(storage.clone(), section)),
                )
            })
            .collect();

        let favorites = Arc::new(FavoritesManager::new(
            storage.clone(),
            folders[&Section::Favorites].clone(),
        ));
        let projects = Arc::new(ProjectsManager::new(
            storage.clone(),
            folders[&Section::Projects].clone(),
        ));

        Self {
            storage,
            folders,
            favorites,
            projects,
            host_handle: Some(host_handle),
        }
    }

    pub fn storage(&self) -> &SemantixStorage {
        &self.storage
    }

    pub fn favorites(&self) -> &Arc<FavoritesManager> {
        &self.favorites
    }

    pub fn projects(&self) -> &Arc<ProjectsManager> {
        &self.projects
    }

    pub fn folders(&self, section: Section) -> &Arc<SectionFoldersManager> {
        &self.folders[&section]
    }

    /// Delete a folder subtree, dropping the section's items folder by
    /// folder before each record goes away.
    pub async fn delete_folder_cascade(&self, section: Section, folder_id: &str) -> usize {
        let folders = self.folders(section).clone();
        match section {
            Section::Favorites => {
                let favorites = self.favorites.clone();
                folders
                    .delete(folder_id, move |fid| {
                        let favorites = favorites.clone();
                        async move {
                            favorites.delete_in_folder(&fid).await;
                        }
                    })
                    .await
            }
            Section::Projects => {
                let projects = self.projects.clone();
                folders
                    .delete(folder_id, move |fid| {
                        let projects = projects.clone();
                        async move {
                            projects.delete_in_folder(&fid).await;
                        }
                    })
                    .await
            }
            // Sections without an entity manager have nothing to evacuate
            Section::Memories | Section::Prompts => {
                folders.delete(folder_id, |_| async {}).await
            }
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.host_handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SemantixRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
