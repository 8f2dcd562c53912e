use diagram_loom::graph_utils::graph::GraphStore;
use diagram_loom::gui::frontend::DiagramApp;
use diagram_loom::persistence::persist;
use diagram_loom::persistence::settings::AppSettings;

use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();
    // Autosave location can be pinned per launch, e.g. for portable installs
    if let Some(dir) = std::env::var_os("DIAGRAM_LOOM_AUTOSAVE_DIR") {
        let mut settings = AppSettings::load().unwrap_or_default();
        settings.autosave_override = Some(dir.into());
        persist::set_settings_override(settings);
    }
    let loaded_state = match persist::load_active() {
        Ok(state) => state,
        Err(e) => {
            log::warn!("ignoring unreadable autosave: {}", e);
            None
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 710.0])
            // Keep the tables usable on small screens
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Diagram-Loom",
        options,
        Box::new(move |_cc| {
            if let Some(state) = loaded_state {
                Ok(Box::new(DiagramApp::from_state(state)) as Box<dyn eframe::App>)
            } else {
                // First run: start from the sample diagram
                let mut store = GraphStore::new();
                store.seed_example();
                Ok(Box::new(DiagramApp::new(store)) as Box<dyn eframe::App>)
            }
        }),
    )
}
