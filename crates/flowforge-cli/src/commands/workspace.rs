//! Workspace operations: `init`, `add`, `remove`, `list` — thin wrappers
//! over [`HistoryStore`]'s registered-workspaces list, plus `init`'s
//! one-time home-directory bootstrap.

use flowforge_core::error::Result;
use flowforge_core::{EngineConfig, HistoryStore};
use std::path::PathBuf;

pub async fn init(config: EngineConfig) -> Result<()> {
    tokio::fs::create_dir_all(config.runs_dir()).await?;
    if tokio::fs::metadata(config.history_index_path()).await.is_err() {
        tokio::fs::write(config.history_index_path(), b"{}").await?;
    }
    if tokio::fs::metadata(config.workspaces_path()).await.is_err() {
        tokio::fs::write(config.workspaces_path(), b"[]").await?;
    }
    println!("initialized {}", config.home.display());
    Ok(())
}

pub async fn add(config: EngineConfig, path: PathBuf) -> Result<()> {
    let canonical = tokio::fs::canonicalize(&path).await.unwrap_or(path);
    let history = HistoryStore::new(&config);
    history.register_workspace(&canonical.to_string_lossy()).await?;
    println!("registered {}", canonical.display());
    Ok(())
}

pub async fn remove(config: EngineConfig, path: PathBuf) -> Result<()> {
    let canonical = tokio::fs::canonicalize(&path).await.unwrap_or(path);
    let history = HistoryStore::new(&config);
    history.remove_workspace(&canonical.to_string_lossy()).await?;
    println!("removed {}", canonical.display());
    Ok(())
}

pub async fn list(config: EngineConfig) -> Result<()> {
    let history = HistoryStore::new(&config);
    for workspace in history.registered_workspaces().await? {
        println!("{workspace}");
    }
    Ok(())
}
