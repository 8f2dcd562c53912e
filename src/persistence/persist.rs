use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use log::{info, warn};
use once_cell::sync::OnceCell;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use super::settings::AppSettings;
use super::xml_codec::{self, EXPORT_FILE_NAME, EXPORT_MIME};
use crate::graph_utils::cell::Cell;
use crate::graph_utils::graph::GraphStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct AppStateFile {
    pub cells: Vec<Cell>,
}

impl AppStateFile {
    pub fn from_runtime(store: &GraphStore) -> Self {
        Self { cells: store.cells() }
    }

    /// Consumes the snapshot to rebuild a live store.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_runtime(self) -> GraphStore {
        GraphStore::from_cells(self.cells)
    }
}

static SETTINGS_OVERRIDE: OnceCell<AppSettings> = OnceCell::new();

pub fn set_settings_override(settings: AppSettings) {
    let _ = SETTINGS_OVERRIDE.set(settings);
}

fn current_settings() -> AppSettings {
    if let Some(settings) = SETTINGS_OVERRIDE.get() {
        return settings.clone();
    }
    AppSettings::load().unwrap_or_default()
}

pub fn active_state_path() -> PathBuf {
    current_settings().autosave_dir().join("state.ron")
}

fn timestamp_now() -> String {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    now.format(fmt).unwrap_or_else(|_| "unknown".to_string())
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

pub fn save_state_to(path: &Path, state: &AppStateFile) -> anyhow::Result<()> {
    let pretty = PrettyConfig::new()
        .separate_tuple_members(true)
        .enumerate_arrays(true);
    let s = ron::ser::to_string_pretty(state, pretty)?;
    atomic_write(path, s.as_bytes())?;
    Ok(())
}

pub fn save_active(state: &AppStateFile) -> anyhow::Result<PathBuf> {
    let path = active_state_path();
    save_state_to(&path, state)?;
    Ok(path)
}

pub fn load_active() -> anyhow::Result<Option<AppStateFile>> {
    let path = active_state_path();
    if !path.exists() {
        return Ok(None);
    }
    load_from_path(&path).map(Some)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppStateFile> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let state: AppStateFile = ron::from_str(&buf)?;
    Ok(state)
}

// Export: diagram.xml in the chosen directory
pub fn export_diagram(store: &GraphStore, dir: &Path) -> anyhow::Result<PathBuf> {
    let bytes = xml_codec::encode_store(store)?;
    let path = dir.join(EXPORT_FILE_NAME);
    atomic_write(&path, &bytes)?;
    info!("exported {} cell(s) as {} to {}", store.cell_count(), EXPORT_MIME, path.display());
    Ok(path)
}

pub fn export_diagram_versioned(store: &GraphStore, dir: &Path) -> anyhow::Result<PathBuf> {
    let bytes = xml_codec::encode_store(store)?;
    let path = dir.join(format!("diagram_{}.xml", timestamp_now()));
    atomic_write(&path, &bytes)?;
    info!("exported {} cell(s) as {} to {}", store.cell_count(), EXPORT_MIME, path.display());
    Ok(path)
}

/// Read an import source fully as text. An absent file is not an error.
pub fn read_import_source(path: &Path) -> anyhow::Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[derive(Debug)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub text: Option<String>,
}

// Reads on a worker thread; the UI polls the receiver each frame
pub fn spawn_import_read(path: PathBuf) -> Receiver<LoadedSource> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let text = match read_import_source(&path) {
            Ok(t) => t,
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                None
            }
        };
        let _ = tx.send(LoadedSource { path, text });
    });
    rx
}

#[derive(Debug)]
pub enum ImportPoll {
    Pending,
    Ready(LoadedSource),
    // The reader hung up without sending anything
    Lost,
}

pub fn poll_import_read(rx: &Receiver<LoadedSource>) -> ImportPoll {
    match rx.try_recv() {
        Ok(loaded) => ImportPoll::Ready(loaded),
        Err(TryRecvError::Empty) => ImportPoll::Pending,
        Err(TryRecvError::Disconnected) => ImportPoll::Lost,
    }
}
