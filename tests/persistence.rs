use std::path::PathBuf;
use std::time::Duration;

use diagram_loom::graph_utils::cell::LinkType;
use diagram_loom::graph_utils::graph::GraphStore;
use diagram_loom::persistence::persist::{self, AppStateFile, ImportPoll, LoadedSource};
use diagram_loom::persistence::settings::AppSettings;
use diagram_loom::persistence::table_export;
use diagram_loom::persistence::xml_codec::{self, ImportMode, EXPORT_FILE_NAME};
use diagram_loom::tables::{EdgeTable, Locale, VertexTable};
use uuid::Uuid;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("diagram-loom-{}-{}", tag, Uuid::now_v7()));
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

fn sample_store() -> GraphStore {
    let mut store = GraphStore::new();
    store.seed_example();
    let mut edge = store.edges()[0].clone();
    edge.link_type = Some(LinkType::Attribute);
    store.apply_edge_change(&edge);
    store
}

#[test]
fn export_writes_diagram_xml_that_imports_back() {
    let dir = scratch_dir("export");
    let store = sample_store();
    let path = persist::export_diagram(&store, &dir).expect("export");
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(EXPORT_FILE_NAME));

    let text = persist::read_import_source(&path).expect("read").expect("present");
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    let mut restored = GraphStore::new();
    xml_codec::import_document(&mut restored, &text, ImportMode::Merge).expect("import");
    assert_eq!(restored.vertices().len(), 2);
    assert_eq!(restored.edges()[0].link_type, Some(LinkType::Attribute));

    let versioned = persist::export_diagram_versioned(&store, &dir).expect("versioned");
    let name = versioned.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
    assert!(name.starts_with("diagram_") && name.ends_with(".xml"));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn absent_import_source_reads_as_none() {
    let dir = scratch_dir("absent");
    let missing = dir.join("nope.xml");
    assert!(persist::read_import_source(&missing).expect("no error").is_none());

    let rx = persist::spawn_import_read(missing.clone());
    let loaded = rx.recv_timeout(Duration::from_secs(5)).expect("worker replies");
    assert_eq!(loaded.path, missing);
    assert!(loaded.text.is_none());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn background_read_delivers_file_text() {
    let dir = scratch_dir("bg");
    let store = sample_store();
    let path = persist::export_diagram(&store, &dir).expect("export");
    let rx = persist::spawn_import_read(path);
    let loaded = rx.recv_timeout(Duration::from_secs(5)).expect("worker replies");
    let mut target = GraphStore::new();
    let added = xml_codec::import_or_ignore(&mut target, loaded.text.as_deref(), ImportMode::Merge);
    assert_eq!(added, 3);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn import_poll_reports_pending_ready_and_lost_reader() {
    let (tx, rx) = std::sync::mpsc::channel::<LoadedSource>();
    assert!(matches!(persist::poll_import_read(&rx), ImportPoll::Pending));
    tx.send(LoadedSource { path: PathBuf::from("a.xml"), text: Some("<x/>".into()) }).expect("send");
    assert!(matches!(persist::poll_import_read(&rx), ImportPoll::Ready(l) if l.text.as_deref() == Some("<x/>")));
    drop(tx);
    assert!(matches!(persist::poll_import_read(&rx), ImportPoll::Lost));
}

#[test]
fn autosave_state_round_trips_through_ron() {
    let dir = scratch_dir("state");
    let store = sample_store();
    let path = dir.join("state.ron");
    persist::save_state_to(&path, &AppStateFile::from_runtime(&store)).expect("save");
    let restored = persist::load_from_path(&path).expect("load").to_runtime();
    assert_eq!(restored.vertices(), store.vertices());
    assert_eq!(restored.edges(), store.edges());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn settings_override_redirects_active_autosave() {
    let dir = scratch_dir("override");
    let settings = AppSettings { autosave_override: Some(dir.clone()), ..AppSettings::default() };
    persist::set_settings_override(settings);
    assert_eq!(persist::active_state_path(), dir.join("state.ron"));

    let store = sample_store();
    let path = persist::save_active(&AppStateFile::from_runtime(&store)).expect("save active");
    assert_eq!(path, dir.join("state.ron"));
    let restored = persist::load_active().expect("load").expect("present").to_runtime();
    assert_eq!(restored.vertices(), store.vertices());
    assert_eq!(restored.edges(), store.edges());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn settings_save_load_and_legacy_migration() {
    let dir = scratch_dir("settings");
    assert_eq!(AppSettings::load_from(&dir).expect("defaults"), AppSettings::default());

    let legacy = AppSettings { locale: Locale::Russian, import_mode: ImportMode::Replace, ..AppSettings::default() };
    let ron_text = ron::to_string(&legacy).expect("ron");
    std::fs::write(dir.join("settings.ron"), ron_text).expect("write legacy");
    let migrated = AppSettings::load_from(&dir).expect("migrate");
    assert_eq!(migrated, legacy);
    assert!(dir.join("settings.json").exists());

    let mut edited = migrated.clone();
    edited.autosave_on_exit = false;
    edited.save_to(&dir).expect("save");
    assert_eq!(AppSettings::load_from(&dir).expect("reload"), edited);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn settings_tolerate_missing_fields() {
    let dir = scratch_dir("sparse");
    std::fs::write(dir.join("settings.json"), r#"{"autosave_override": null}"#).expect("write");
    let s = AppSettings::load_from(&dir).expect("load");
    assert_eq!(s.locale, Locale::English);
    assert_eq!(s.import_mode, ImportMode::Merge);
    assert!(s.autosave_on_exit);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn tables_export_as_csv() {
    let dir = scratch_dir("csv");
    let store = sample_store();
    let vertices = VertexTable::from_store(&store);
    let edges = EdgeTable::from_store(&store);
    let (vp, ep) = table_export::export_tables_csv(&vertices, &edges, &dir.join("diagram")).expect("csv");

    let vtext = std::fs::read_to_string(vp).expect("vertices csv");
    assert!(vtext.starts_with("id,label,description"));
    assert!(vtext.contains("\"Hello,\""));
    let etext = std::fs::read_to_string(ep).expect("edges csv");
    assert!(etext.starts_with("id,source,relationship,target"));
    assert!(etext.contains("Has attribute"));
    let _ = std::fs::remove_dir_all(dir);
}
