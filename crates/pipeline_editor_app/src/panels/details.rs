// SPDX-License-Identifier: MIT OR Apache-2.0
//! Details panel: configuration form for one node.

use pipeline_editor_graph::catalog::CatalogProvider;
use pipeline_editor_graph::{
    ConfigError, ConfigurationDraft, Graph, GraphError, HyperparameterValue, Node, NodeId,
};
use thiserror::Error;

/// Why a draft could not be saved
#[derive(Debug, Error)]
pub enum SaveError {
    /// No node is open in the panel
    #[error("No node is open")]
    NoNode,

    /// Draft does not resolve against the catalog
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Graph refused the configuration
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Form state for the node being configured
#[derive(Debug, Default)]
pub struct DetailsPanel {
    node: Option<NodeId>,
    draft: Option<ConfigurationDraft>,
    message: Option<String>,
    prompt: bool,
}

impl DetailsPanel {
    /// Create an empty panel
    pub fn new() -> Self {
        Self::default()
    }

    /// Node currently open
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Open a node, discarding any unsaved edits
    pub fn open(&mut self, node: &Node) {
        self.node = Some(node.id);
        self.draft = Some(ConfigurationDraft::from_node(node));
        self.message = None;
        self.prompt = false;
    }

    /// Open a node unless the current draft has unsaved edits
    pub fn preview(&mut self, node: &Node, graph: &Graph) {
        if !self.is_dirty(graph) {
            self.open(node);
        }
    }

    /// Whether the draft differs from the open node's committed configuration
    pub fn is_dirty(&self, graph: &Graph) -> bool {
        match (self.node.and_then(|id| graph.node(id)), &self.draft) {
            (Some(node), Some(draft)) => *draft != ConfigurationDraft::from_node(node),
            _ => false,
        }
    }

    /// Close the panel
    pub fn close(&mut self) {
        *self = Self::default();
    }

    /// Commit the draft to the graph
    pub fn save(
        &mut self,
        graph: &mut Graph,
        catalog: &dyn CatalogProvider,
    ) -> Result<(), SaveError> {
        let (Some(node), Some(draft)) = (self.node, &self.draft) else {
            return Err(SaveError::NoNode);
        };
        let (configuration, title) = draft.commit(catalog)?;
        graph.set_node_configuration(node, configuration, title.as_str())?;
        tracing::info!(%node, %title, "configuration saved");
        Ok(())
    }

    /// Render the panel
    pub fn ui(&mut self, ui: &mut egui::Ui, graph: &mut Graph, catalog: &dyn CatalogProvider) {
        if self.node.is_some_and(|id| graph.node(id).is_none()) {
            self.close();
        }

        let Some(node) = self.node.and_then(|id| graph.node(id)) else {
            ui.centered_and_justified(|ui| {
                ui.label("Double-click a node on the canvas to configure it");
            });
            return;
        };
        let title = node.title.clone();
        let kind = node.kind;

        ui.heading(title);
        if self.is_dirty(graph) {
            ui.label(format!("{} stage (modified)", kind.name()));
        } else {
            ui.label(format!("{} stage", kind.name()));
        }
        ui.separator();

        if let Some(draft) = &mut self.draft {
            egui::ScrollArea::vertical().show(ui, |ui| {
                if let Err(e) = draft_form(ui, draft, catalog) {
                    self.message = Some(e.to_string());
                    self.prompt = false;
                }
            });
        }

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Save").clicked() {
                match self.save(graph, catalog) {
                    Ok(()) => {
                        self.message = None;
                        self.prompt = false;
                    }
                    Err(e) => {
                        self.prompt = matches!(
                            e,
                            SaveError::Config(ConfigError::MissingSelection { .. })
                        );
                        if !self.prompt {
                            tracing::warn!("Save failed: {e}");
                        }
                        self.message = Some(e.to_string());
                    }
                }
            }
            if ui.button("Revert").clicked() {
                if let Some(node) = self.node.and_then(|id| graph.node(id)) {
                    self.open(node);
                }
            }
        });

        if let Some(message) = &self.message {
            let color = if self.prompt {
                egui::Color32::from_rgb(230, 190, 90)
            } else {
                egui::Color32::from_rgb(255, 110, 110)
            };
            ui.colored_label(color, message);
        }
    }
}

fn draft_form(
    ui: &mut egui::Ui,
    draft: &mut ConfigurationDraft,
    catalog: &dyn CatalogProvider,
) -> Result<(), ConfigError> {
    let records = catalog.records(draft.kind);

    let mut chosen_record = draft.record_id.clone();
    let record_label = chosen_record
        .as_deref()
        .and_then(|id| records.iter().find(|r| r.id == id))
        .map_or("Select...", |r| r.name.as_str());
    egui::ComboBox::from_label(draft.kind.name())
        .selected_text(record_label)
        .show_ui(ui, |ui| {
            for record in records {
                ui.selectable_value(
                    &mut chosen_record,
                    Some(record.id.clone()),
                    record.name.as_str(),
                );
            }
        });
    if chosen_record != draft.record_id {
        if let Some(id) = chosen_record {
            draft.select_record(id);
        }
    }

    let Some(record) = draft
        .record_id
        .as_deref()
        .and_then(|id| catalog.record(draft.kind, id))
    else {
        return Ok(());
    };

    let mut chosen_version = draft.version.clone();
    egui::ComboBox::from_label("Version")
        .selected_text(chosen_version.as_deref().unwrap_or("Select..."))
        .show_ui(ui, |ui| {
            for version in &record.versions {
                ui.selectable_value(
                    &mut chosen_version,
                    Some(version.version.clone()),
                    version.version.as_str(),
                );
            }
        });
    if chosen_version != draft.version {
        if let Some(version) = chosen_version {
            draft.select_version(version, catalog)?;
        }
    }

    let Some(version) = draft.version.as_deref().and_then(|v| record.version(v)) else {
        return Ok(());
    };

    if !version.tasks.is_empty() {
        egui::ComboBox::from_label("Task")
            .selected_text(draft.task.as_deref().unwrap_or("Select..."))
            .show_ui(ui, |ui| {
                for task in &version.tasks {
                    ui.selectable_value(&mut draft.task, Some(task.clone()), task.as_str());
                }
            });
    }

    if !draft.hyperparameters.is_empty() {
        ui.add_space(6.0);
        ui.label("Hyperparameters");
        egui::Grid::new("hyperparameters").num_columns(2).show(ui, |ui| {
            for (name, value) in &mut draft.hyperparameters {
                let help = version
                    .hyperparameters
                    .iter()
                    .find(|spec| &spec.name == name)
                    .map(|spec| spec.description.as_str())
                    .filter(|d| !d.is_empty());
                let label = ui.label(name.as_str());
                if let Some(help) = help {
                    label.on_hover_text(help);
                }
                hyperparameter_editor(ui, value);
                ui.end_row();
            }
        });
    }

    if !draft.file_mappings.is_empty() {
        ui.add_space(6.0);
        ui.label("Files");
        egui::Grid::new("file_mappings").num_columns(2).show(ui, |ui| {
            for (slot, path) in &mut draft.file_mappings {
                ui.label(slot.as_str());
                ui.text_edit_singleline(path);
                ui.end_row();
            }
        });
    }

    Ok(())
}

fn hyperparameter_editor(ui: &mut egui::Ui, value: &mut HyperparameterValue) {
    match value {
        HyperparameterValue::Bool(v) => {
            ui.checkbox(v, "");
        }
        HyperparameterValue::Int(v) => {
            ui.add(egui::DragValue::new(v));
        }
        HyperparameterValue::Float(v) => {
            ui.add(egui::DragValue::new(v).speed(0.0001).max_decimals(6));
        }
        HyperparameterValue::Text(v) => {
            ui.text_edit_singleline(v);
        }
    }
}
