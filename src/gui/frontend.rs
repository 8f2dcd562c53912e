#![allow(clippy::collapsible_if)]
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Vec2};
use log::{debug, warn};

use crate::graph_utils::cell::{CellId, Geometry, LinkType, Vertex, VertexShape, DEFAULT_VERTEX_LABEL};
use crate::graph_utils::graph::GraphStore;
use crate::persistence::persist::{self, AppStateFile, ImportPoll, LoadedSource};
use crate::persistence::settings::AppSettings;
use crate::persistence::table_export;
use crate::persistence::xml_codec::{self, ImportMode};
use crate::session::{EditSession, SessionEvent};
use crate::tables::{EdgeTable, Locale, VertexTable};

const INFO_TTL: Duration = Duration::from_secs(4);
const VERTEX_FILL: Color32 = Color32::from_rgb(218, 232, 252);
const VERTEX_STROKE: Color32 = Color32::from_rgb(108, 142, 191);
const SELECTED_STROKE: Color32 = Color32::from_rgb(0, 168, 0);
const EDGE_COLOR: Color32 = Color32::from_gray(120);
const SELF_LOOP_RADIUS: f32 = 10.0;

// Deferred canvas/table interactions, applied once the store is no longer borrowed
enum UiAction {
    SelectVertex(CellId),
    EditVertex(CellId),
    EditEdge(CellId),
    Move(CellId, Pos2),
    Connect(CellId, CellId),
    Drop(VertexShape, Pos2),
    Dismiss,
    Apply(SessionEvent),
}

pub struct DiagramApp {
    store: GraphStore,
    session: EditSession,
    settings: AppSettings,
    pan: Vec2,
    // Shape armed from the toolbar; next canvas click drops it
    armed_shape: Option<VertexShape>,
    connecting_from: Option<CellId>,
    // Set by the store listener whenever the model moved under the session
    model_changed: Rc<std::cell::Cell<bool>>,
    label_edit: String,
    // Import pathway
    import_path: String,
    import_rx: Option<Receiver<LoadedSource>>,
    import_source: Option<String>,
    // Status line
    last_info: Option<String>,
    last_info_time: Option<Instant>,
    last_error: Option<String>,
    show_prefs_window: bool,
}

impl DiagramApp {
    pub fn new(store: GraphStore) -> Self {
        let settings = AppSettings::load().unwrap_or_default();
        Self::with_settings(store, settings)
    }

    pub fn with_settings(mut store: GraphStore, settings: AppSettings) -> Self {
        let model_changed = Rc::new(std::cell::Cell::new(false));
        let flag = model_changed.clone();
        store.subscribe(move |_| flag.set(true));
        store.on_structural_change(|change| {
            debug!("canvas added {} / removed {} cell(s)", change.added.len(), change.removed.len());
        });
        let mut session = EditSession::new();
        session.on_dismiss(|d| debug!("dismissed {:?} state", d.reason));
        Self {
            store,
            session,
            settings,
            pan: Vec2::ZERO,
            armed_shape: None,
            connecting_from: None,
            model_changed,
            label_edit: String::new(),
            import_path: String::new(),
            import_rx: None,
            import_source: None,
            last_info: None,
            last_info_time: None,
            last_error: None,
            show_prefs_window: false,
        }
    }

    pub fn from_state(state: AppStateFile) -> Self {
        Self::new(state.to_runtime())
    }

    fn info(&mut self, msg: impl Into<String>) {
        self.last_info = Some(msg.into());
        self.last_info_time = Some(Instant::now());
        self.last_error = None;
    }

    fn locale(&self) -> Locale { self.settings.locale }

    // Menu handlers
    pub fn menu_add_vertex(&mut self) {
        let id = self.store.insert_vertex(DEFAULT_VERTEX_LABEL, (100.0, 100.0), (80.0, 30.0));
        self.store.select(vec![id]);
        if let Some(v) = self.store.vertex(id).cloned() {
            self.label_edit = v.label.clone();
            self.session.select_vertex(&v, self.store.edges());
        }
    }

    pub fn menu_delete_selected(&mut self) {
        let removed = self.store.remove_selected();
        if !removed.is_empty() {
            self.info(format!("Deleted {} cell(s)", removed.len()));
        }
    }

    pub fn menu_delete_all(&mut self) {
        self.store.clear_all();
        self.session.dismiss();
        self.info("Cleared diagram");
    }

    pub fn menu_export(&mut self, versioned: bool) {
        let dir = self.settings.export_dir();
        let res = if versioned {
            persist::export_diagram_versioned(&self.store, &dir)
        } else {
            persist::export_diagram(&self.store, &dir)
        };
        match res {
            Ok(path) => self.info(format!("Exported to {}", path.display())),
            Err(e) => self.last_error = Some(format!("Export failed: {}", e)),
        }
    }

    pub fn menu_export_tables(&mut self) {
        let base = self.settings.export_dir().join("diagram");
        let vertices = VertexTable::from_store(&self.store);
        let edges = EdgeTable::from_store(&self.store).with_locale(self.settings.locale);
        match table_export::export_tables_csv(&vertices, &edges, &base) {
            Ok((v, e)) => self.info(format!("Tables written to {} and {}", v.display(), e.display())),
            Err(e) => self.last_error = Some(format!("Table export failed: {}", e)),
        }
    }

    // Kick off the background read; the source is picked up in poll_import
    pub fn menu_load_import_file(&mut self) {
        let path = PathBuf::from(self.import_path.trim());
        self.import_source = None;
        self.import_rx = Some(persist::spawn_import_read(path));
    }

    pub fn menu_import(&mut self) {
        let added = xml_codec::import_or_ignore(&mut self.store, self.import_source.as_deref(), self.settings.import_mode);
        if added > 0 {
            self.info(format!("Imported {} cell(s)", added));
        }
    }

    fn poll_import(&mut self) {
        let Some(rx) = &self.import_rx else { return };
        match persist::poll_import_read(rx) {
            ImportPoll::Ready(loaded) => {
                if loaded.text.is_some() {
                    self.info(format!("Loaded {}", loaded.path.display()));
                } else {
                    warn!("no import source at {}", loaded.path.display());
                }
                self.import_source = loaded.text;
                self.import_rx = None;
            }
            ImportPoll::Pending => {}
            ImportPoll::Lost => {
                warn!("import read ended without a result");
                self.last_error = Some("Import read failed".to_string());
                self.import_rx = None;
            }
        }
    }

    fn apply_actions(&mut self, actions: Vec<UiAction>) {
        for action in actions {
            match action {
                UiAction::SelectVertex(id) => {
                    if let Some(v) = self.store.vertex(id).cloned() {
                        self.store.select(vec![id]);
                        self.label_edit = v.label.clone();
                        self.session.select_vertex(&v, self.store.edges());
                    }
                }
                UiAction::EditVertex(id) => {
                    if let Some(v) = self.store.vertex(id).cloned() {
                        self.session.edit_vertex(&v);
                    }
                }
                UiAction::EditEdge(id) => {
                    if let Some(e) = self.store.edge(id).cloned() {
                        self.session.edit_edge(&e);
                    }
                }
                UiAction::Move(id, pos) => {
                    self.store.move_vertex(id, (pos.x, pos.y));
                }
                UiAction::Connect(source, target) => {
                    let created = self.store.update_surface(|surface| surface.connect(source, target));
                    if created.is_none() {
                        debug!("connect refused {} -> {}", source, target);
                    }
                }
                UiAction::Drop(shape, pos) => {
                    let vertex = Vertex::new(DEFAULT_VERTEX_LABEL, Geometry::at((pos.x, pos.y), shape.default_size()))
                        .with_shape(shape);
                    self.store.update_surface(|surface| surface.drop_vertex(vertex));
                    self.armed_shape = None;
                }
                UiAction::Dismiss => {
                    self.session.dismiss();
                    self.store.select_none();
                    self.connecting_from = None;
                }
                UiAction::Apply(event) => {
                    self.store.apply(event);
                }
            }
        }
        if self.model_changed.replace(false) {
            self.session.reconcile(self.store.vertices(), self.store.edges());
        }
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) -> Vec<UiAction> {
        let mut actions = Vec::new();
        let available = ui.available_rect_before_wrap();
        let bg_resp = ui.allocate_rect(available, Sense::click_and_drag());
        let origin = available.min.to_vec2() + self.pan;
        let to_screen = move |x: f32, y: f32| Pos2::new(x, y) + origin;
        let from_screen = move |p: Pos2| p - origin;

        if bg_resp.dragged() && self.connecting_from.is_none() {
            self.pan += bg_resp.drag_delta();
        }
        if bg_resp.clicked() {
            match (self.armed_shape, bg_resp.interact_pointer_pos()) {
                (Some(shape), Some(pos)) => actions.push(UiAction::Drop(shape, from_screen(pos))),
                _ => actions.push(UiAction::Dismiss),
            }
        }
        if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.armed_shape = None;
            actions.push(UiAction::Dismiss);
        }
        if ui.input(|i| i.key_pressed(egui::Key::Delete)) && !ui.ctx().wants_keyboard_input() {
            self.menu_delete_selected();
        }

        let painter = ui.painter_at(available);
        painter.rect_filled(available, 0.0, Color32::from_gray(250));
        let selection = self.store.selection().to_vec();
        let highlighted: Vec<CellId> = self.session.selected_edges().iter().map(|e| e.id).collect();

        for edge in self.store.edges() {
            let (Some(src), Some(dst)) = (self.store.vertex(edge.source), self.store.vertex(edge.target)) else {
                continue;
            };
            let color = if selection.contains(&edge.id) || highlighted.contains(&edge.id) { SELECTED_STROKE } else { EDGE_COLOR };
            let stroke = Stroke::new(1.5, color);
            match edge_path(edge.source == edge.target, &src.geometry, &dst.geometry) {
                Some(EdgePath::Arrow { from, tip }) => {
                    let a = to_screen(from.x, from.y);
                    painter.arrow(a, to_screen(tip.x, tip.y) - a, stroke);
                }
                Some(EdgePath::Loop { center }) => {
                    let c = to_screen(center.x, center.y);
                    painter.circle_stroke(c, SELF_LOOP_RADIUS, stroke);
                    painter.arrow(c + Vec2::new(-SELF_LOOP_RADIUS, 0.0), Vec2::new(0.0, 6.0), stroke);
                }
                None => {}
            }
        }

        for v in self.store.vertices() {
            let rect = Rect::from_min_size(
                to_screen(v.geometry.x, v.geometry.y),
                Vec2::new(v.geometry.width, v.geometry.height),
            );
            let selected = selection.contains(&v.id) || self.session.selected_vertex().map(|s| s.id) == Some(v.id);
            let stroke = Stroke::new(if selected { 2.5 } else { 1.0 }, if selected { SELECTED_STROKE } else { VERTEX_STROKE });
            paint_shape(&painter, v.shape, rect, stroke);
            painter.text(rect.center(), egui::Align2::CENTER_CENTER, &v.label, egui::FontId::proportional(13.0), Color32::BLACK);

            let resp = ui.interact(rect, egui::Id::new(("vertex", v.id)), Sense::click_and_drag());
            if resp.clicked() {
                actions.push(UiAction::SelectVertex(v.id));
            }
            if resp.double_clicked() {
                actions.push(UiAction::EditVertex(v.id));
            }
            if resp.drag_started() && ui.input(|i| i.modifiers.shift) {
                self.connecting_from = Some(v.id);
            }
            if resp.dragged() {
                match self.connecting_from {
                    Some(from) if from == v.id => {
                        if let Some(p) = ui.input(|i| i.pointer.latest_pos()) {
                            painter.line_segment([rect.center(), p], Stroke::new(1.5, SELECTED_STROKE));
                        }
                    }
                    _ => {
                        let p = Pos2::new(v.geometry.x, v.geometry.y) + resp.drag_delta();
                        actions.push(UiAction::Move(v.id, p));
                    }
                }
            }
            if resp.drag_stopped() {
                if let Some(from) = self.connecting_from.take() {
                    let target = ui
                        .input(|i| i.pointer.latest_pos())
                        .map(from_screen)
                        .and_then(|p| self.store.surface().vertex_at(p.x, p.y));
                    if let Some(to) = target {
                        actions.push(UiAction::Connect(from, to));
                    }
                }
            }
        }

        if let Some(shape) = self.armed_shape {
            painter.text(
                available.left_top() + Vec2::new(8.0, 8.0),
                egui::Align2::LEFT_TOP,
                format!("Click to place: {}", shape.style_name()),
                egui::FontId::proportional(12.0),
                Color32::DARK_GRAY,
            );
        }
        actions
    }

    fn tables_ui(&mut self, ui: &mut egui::Ui) -> Vec<UiAction> {
        let mut actions = Vec::new();
        let locale = self.locale();

        ui.heading("Vertices");
        egui::ScrollArea::vertical().id_salt("vertex_table_scroll").max_height(260.0).show(ui, |ui| {
            egui::Grid::new("vertex_table").striped(true).num_columns(4).show(ui, |ui| {
                for col in VertexTable::COLUMNS {
                    ui.strong(col);
                }
                ui.label("");
                ui.end_row();
                for row in VertexTable::from_store(&self.store).rows() {
                    ui.monospace(short_id(row.id));
                    if ui.link(row.label.as_str()).clicked() {
                        actions.push(UiAction::SelectVertex(row.id));
                    }
                    ui.label(row.description.as_str());
                    if ui.small_button("✏").on_hover_text("Edit description").clicked() {
                        actions.push(UiAction::EditVertex(row.id));
                    }
                    ui.end_row();
                }
            });
        });

        ui.separator();
        ui.heading("Edges");
        let edge_table = EdgeTable::from_store(&self.store).with_locale(locale);
        egui::ScrollArea::vertical().id_salt("edge_table_scroll").show(ui, |ui| {
            edge_grid(ui, "edge_table", &edge_table, &mut actions);
        });
        actions
    }

    fn session_windows(&mut self, ctx: &egui::Context) -> Vec<UiAction> {
        let mut actions = Vec::new();
        let locale = self.locale();

        if let Some(vertex) = self.session.selected_vertex().cloned() {
            let mut open = true;
            egui::Window::new(format!("Vertex: {}", vertex.label))
                .id(egui::Id::new("selected_vertex_window"))
                .open(&mut open)
                .resizable(true)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Label");
                        ui.text_edit_singleline(&mut self.label_edit);
                        if ui.button("Rename").clicked() && self.label_edit.trim() != vertex.label {
                            let mut renamed = vertex.clone();
                            renamed.label = self.label_edit.clone();
                            actions.push(UiAction::Apply(SessionEvent::VertexChanged(renamed)));
                        }
                    });
                    ui.label(if vertex.description.is_empty() { "(no description)" } else { vertex.description.as_str() });
                    ui.separator();
                    let edges = self.session.selected_edges();
                    let table = EdgeTable::new(edges, self.store.vertices())
                        .with_frame(Some(&vertex))
                        .with_locale(locale);
                    edge_grid(ui, "selected_vertex_edges", &table, &mut actions);
                });
            if !open {
                actions.push(UiAction::Dismiss);
            }
        }

        if let Some((vertex, draft)) = self.session.editing_vertex() {
            let title = format!("Description: {}", vertex.label);
            let mut draft = draft.to_string();
            let mut open = true;
            let mut commit = false;
            egui::Window::new(title)
                .id(egui::Id::new("description_window"))
                .open(&mut open)
                .collapsible(false)
                .show(ctx, |ui| {
                    ui.add(egui::TextEdit::multiline(&mut draft).desired_rows(4));
                    commit = ui.button("Save").clicked();
                });
            self.session.set_draft(draft);
            if commit {
                if let Some(event) = self.session.commit() {
                    actions.push(UiAction::Apply(event));
                }
            } else if !open {
                actions.push(UiAction::Dismiss);
            }
        }

        if let Some(edge) = self.session.editing_edge().cloned() {
            let mut open = true;
            let mut choice = edge.link_type;
            let frame = self.session.frame_of_reference().and_then(|id| self.store.vertex(id));
            let table = EdgeTable::new(self.store.edges(), self.store.vertices())
                .with_frame(frame)
                .with_locale(locale);
            let row = table.row(&edge);
            egui::Window::new("Relationship type")
                .id(egui::Id::new("edge_window"))
                .open(&mut open)
                .collapsible(false)
                .show(ctx, |ui| {
                    ui.label(format!("{} → {}", row.source_label, row.target_label));
                    let current = choice.map(|t| locale.neutral(t)).unwrap_or(locale.no_type());
                    egui::ComboBox::from_id_salt("link_type_selector")
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut choice, None, locale.no_type());
                            for t in LinkType::ALL {
                                ui.selectable_value(&mut choice, Some(t), locale.neutral(t));
                            }
                        });
                    ui.small(row.relationship_label.as_str());
                });
            if choice != edge.link_type {
                if let Some(event) = self.session.choose_link_type(choice) {
                    actions.push(UiAction::Apply(event));
                }
            }
            if !open {
                actions.push(UiAction::Dismiss);
            }
        }
        actions
    }

    fn prefs_window(&mut self, ctx: &egui::Context) {
        if !self.show_prefs_window {
            return;
        }
        let mut open = true;
        let mut changed = false;
        egui::Window::new("Preferences").open(&mut open).show(ctx, |ui| {
            egui::ComboBox::from_label("Label language")
                .selected_text(self.settings.locale.display_name())
                .show_ui(ui, |ui| {
                    for l in Locale::ALL {
                        changed |= ui.selectable_value(&mut self.settings.locale, l, l.display_name()).changed();
                    }
                });
            ui.horizontal(|ui| {
                ui.label("Import");
                changed |= ui.radio_value(&mut self.settings.import_mode, ImportMode::Merge, "Merge").changed();
                changed |= ui.radio_value(&mut self.settings.import_mode, ImportMode::Replace, "Replace").changed();
            });
            changed |= ui.checkbox(&mut self.settings.autosave_on_exit, "Autosave on exit").changed();
            ui.small(format!("Exports go to {}", self.settings.export_dir().display()));
            ui.small(format!("Preferences are kept in {}", AppSettings::settings_dir().display()));
        });
        if changed {
            if let Err(e) = self.settings.save() {
                self.last_error = Some(format!("Saving preferences failed: {}", e));
            }
        }
        self.show_prefs_window = open;
    }
}

fn edge_grid(ui: &mut egui::Ui, id: &str, table: &EdgeTable<'_>, actions: &mut Vec<UiAction>) {
    egui::Grid::new(id).striped(true).num_columns(4).show(ui, |ui| {
        for col in EdgeTable::COLUMNS {
            ui.strong(col);
        }
        ui.end_row();
        for row in table.rows() {
            ui.monospace(short_id(row.id));
            ui.label(row.source_label.as_str());
            if ui.link(row.relationship_label.as_str()).on_hover_text("Change relationship type").clicked() {
                actions.push(UiAction::EditEdge(row.id));
            }
            ui.label(row.target_label.as_str());
            ui.end_row();
        }
    });
}

#[derive(Debug, PartialEq)]
enum EdgePath {
    Arrow { from: Pos2, tip: Pos2 },
    Loop { center: Pos2 },
}

// Edge outline in diagram coordinates; arrows stop at the target's border
fn edge_path(self_loop: bool, src: &Geometry, dst: &Geometry) -> Option<EdgePath> {
    if self_loop {
        let center = Pos2::new(src.x + src.width - 4.0, src.y - 4.0);
        return Some(EdgePath::Loop { center });
    }
    let (sx, sy) = src.center();
    let (tx, ty) = dst.center();
    let (a, b) = (Pos2::new(sx, sy), Pos2::new(tx, ty));
    let dir = b - a;
    let len = dir.length();
    if len <= 1.0 {
        return None;
    }
    let inset = 0.5 * dst.width.min(dst.height);
    Some(EdgePath::Arrow { from: a, tip: b - dir / len * inset })
}

fn paint_shape(painter: &egui::Painter, shape: VertexShape, rect: Rect, stroke: Stroke) {
    let c = rect.center();
    let (w, h) = (rect.width(), rect.height());
    match shape {
        VertexShape::Rectangle | VertexShape::Swimlane => {
            painter.rect_filled(rect, 0.0, VERTEX_FILL);
            painter.rect_stroke(rect, 0.0, stroke, egui::StrokeKind::Inside);
            if shape == VertexShape::Swimlane {
                let y = rect.top() + 20.0_f32.min(h);
                painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
            }
        }
        VertexShape::Rounded | VertexShape::Cylinder => {
            let r = if shape == VertexShape::Rounded { 8.0 } else { (w.min(h) * 0.3).min(12.0) };
            painter.rect_filled(rect, r, VERTEX_FILL);
            painter.rect_stroke(rect, r, stroke, egui::StrokeKind::Inside);
        }
        VertexShape::Ellipse => {
            let points = (0..32)
                .map(|i| {
                    let t = i as f32 / 32.0 * std::f32::consts::TAU;
                    Pos2::new(c.x + 0.5 * w * t.cos(), c.y + 0.5 * h * t.sin())
                })
                .collect();
            painter.add(egui::Shape::convex_polygon(points, VERTEX_FILL, stroke));
        }
        VertexShape::Rhombus => {
            let points = vec![
                Pos2::new(c.x, rect.top()),
                Pos2::new(rect.right(), c.y),
                Pos2::new(c.x, rect.bottom()),
                Pos2::new(rect.left(), c.y),
            ];
            painter.add(egui::Shape::convex_polygon(points, VERTEX_FILL, stroke));
        }
        VertexShape::Triangle => {
            let points = vec![rect.left_top(), Pos2::new(rect.right(), c.y), rect.left_bottom()];
            painter.add(egui::Shape::convex_polygon(points, VERTEX_FILL, stroke));
        }
        VertexShape::Actor => {
            let head = w.min(h) * 0.2;
            let neck = rect.top() + head * 2.0;
            painter.circle_stroke(Pos2::new(c.x, rect.top() + head), head, stroke);
            painter.line_segment([Pos2::new(c.x, neck), Pos2::new(c.x, c.y + h * 0.15)], stroke);
            painter.line_segment([Pos2::new(rect.left(), neck + 4.0), Pos2::new(rect.right(), neck + 4.0)], stroke);
            painter.line_segment([Pos2::new(c.x, c.y + h * 0.15), rect.left_bottom()], stroke);
            painter.line_segment([Pos2::new(c.x, c.y + h * 0.15), rect.right_bottom()], stroke);
        }
    }
}

fn short_id(id: CellId) -> String {
    let s = id.simple().to_string();
    s[s.len() - 6..].to_string()
}

impl eframe::App for DiagramApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_import();
        if self.import_rx.is_some() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Diagram-Loom");
                ui.menu_button("File", |ui| {
                    if ui.button("Export diagram.xml").clicked() {
                        self.menu_export(false);
                        ui.close();
                    }
                    if ui.button("Export Timestamped Copy").clicked() {
                        self.menu_export(true);
                        ui.close();
                    }
                    if ui.button("Export Tables (CSV)").clicked() {
                        self.menu_export_tables();
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Preferences…").clicked() {
                        self.show_prefs_window = true;
                        ui.close();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    if ui.button("Add Vertex").clicked() {
                        self.menu_add_vertex();
                        ui.close();
                    }
                    if ui.button("Select All").clicked() {
                        self.store.select_all();
                        ui.close();
                    }
                    if ui.button("Clear Selection").clicked() {
                        self.store.select_none();
                        ui.close();
                    }
                    if ui.button("Delete Selected").clicked() {
                        self.menu_delete_selected();
                        ui.close();
                    }
                    if ui.button("Delete All").clicked() {
                        self.menu_delete_all();
                        ui.close();
                    }
                });
                ui.separator();
                ui.label("Import");
                ui.add(egui::TextEdit::singleline(&mut self.import_path).hint_text("path/to/diagram.xml").desired_width(200.0));
                if ui.button("Load").clicked() {
                    self.menu_load_import_file();
                }
                let ready = self.import_source.is_some();
                if ui.add_enabled(ready, egui::Button::new("Import")).clicked() {
                    self.menu_import();
                }
                ui.separator();
                ui.small(format!("V:{} E:{}", self.store.vertices().len(), self.store.edges().len()));
            });
            ui.horizontal(|ui| {
                for shape in VertexShape::ALL {
                    let armed = self.armed_shape == Some(shape);
                    if ui.selectable_label(armed, shape.style_name()).clicked() {
                        self.armed_shape = if armed { None } else { Some(shape) };
                    }
                }
                ui.separator();
                ui.small("Shift-drag between vertices to connect");
            });
            if let Some(err) = &self.last_error {
                ui.colored_label(Color32::RED, err);
            } else if let (Some(msg), Some(t)) = (&self.last_info, self.last_info_time) {
                if t.elapsed() < INFO_TTL {
                    ui.small(msg);
                }
            }
        });

        let table_actions = egui::SidePanel::right("tables_panel")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| self.tables_ui(ui))
            .inner;
        let window_actions = self.session_windows(ctx);
        self.prefs_window(ctx);
        let canvas_actions = egui::CentralPanel::default().show(ctx, |ui| self.canvas_ui(ui)).inner;

        self.apply_actions(table_actions);
        self.apply_actions(window_actions);
        self.apply_actions(canvas_actions);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if !self.settings.autosave_on_exit {
            return;
        }
        let state = AppStateFile::from_runtime(&self.store);
        if let Err(e) = persist::save_active(&state) {
            warn!("autosave failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_loop_is_drawn_as_a_ring() {
        let g = Geometry::new(20.0, 20.0, 80.0, 30.0);
        assert_eq!(edge_path(true, &g, &g), Some(EdgePath::Loop { center: Pos2::new(96.0, 16.0) }));
    }

    #[test]
    fn arrow_stops_at_target_border() {
        let src = Geometry::new(0.0, 0.0, 20.0, 20.0);
        let dst = Geometry::new(100.0, 0.0, 20.0, 20.0);
        let Some(EdgePath::Arrow { from, tip }) = edge_path(false, &src, &dst) else {
            panic!("expected an arrow");
        };
        assert_eq!(from, Pos2::new(10.0, 10.0));
        assert_eq!(tip, Pos2::new(100.0, 10.0));
        // Distinct vertices stacked on each other have no visible edge
        assert_eq!(edge_path(false, &src, &src), None);
    }
}
