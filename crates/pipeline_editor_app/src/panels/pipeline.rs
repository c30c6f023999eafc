// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pipeline panel: JSON preview of the graph and export to disk.

use crate::app::Result;
use pipeline_editor_graph::Graph;
use std::path::{Path, PathBuf};

/// Export preview state
#[derive(Debug)]
pub struct PipelinePanel {
    export_path: PathBuf,
    status: Option<std::result::Result<PathBuf, String>>,
}

impl PipelinePanel {
    /// Create a panel exporting to `export_path`
    pub fn new(export_path: impl Into<PathBuf>) -> Self {
        Self {
            export_path: export_path.into(),
            status: None,
        }
    }

    /// Export destination
    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    /// Pretty JSON of the graph's snapshot
    pub fn render_json(graph: &Graph) -> Result<String> {
        Ok(serde_json::to_string_pretty(&graph.snapshot())?)
    }

    /// Write the snapshot JSON to the export path
    pub fn save(&mut self, graph: &Graph) -> Result<PathBuf> {
        let json = Self::render_json(graph)?;
        std::fs::write(&self.export_path, json)?;
        tracing::info!("Pipeline exported to {}", self.export_path.display());
        Ok(self.export_path.clone())
    }

    /// Save and remember the outcome for display
    pub fn save_and_report(&mut self, graph: &Graph) {
        self.status = Some(self.save(graph).map_err(|e| {
            tracing::error!("Export failed: {e}");
            e.to_string()
        }));
    }

    /// Render the panel
    pub fn ui(&mut self, ui: &mut egui::Ui, graph: &Graph) {
        let snapshot = graph.snapshot();
        let unconfigured = snapshot.unconfigured().count();

        ui.horizontal(|ui| {
            ui.label(format!(
                "{} nodes, {} edges",
                snapshot.nodes.len(),
                snapshot.edges.len()
            ));
            if unconfigured > 0 {
                ui.colored_label(
                    egui::Color32::from_rgb(230, 190, 90),
                    format!("{unconfigured} not configured"),
                );
            }
            ui.separator();
            if ui.button("Save").clicked() {
                self.save_and_report(graph);
            }
            match &self.status {
                Some(Ok(path)) => {
                    ui.label(format!("Saved to {}", path.display()));
                }
                Some(Err(message)) => {
                    ui.colored_label(egui::Color32::from_rgb(255, 110, 110), message);
                }
                None => {}
            }
        });
        ui.separator();

        let json = match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => json,
            Err(e) => format!("// {e}"),
        };
        egui::ScrollArea::both().show(ui, |ui| {
            ui.add(
                egui::TextEdit::multiline(&mut json.as_str())
                    .code_editor()
                    .desired_width(f32::INFINITY),
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_editor_graph::edge::Endpoint;
    use pipeline_editor_graph::{NodeKind, PortId};

    #[test]
    fn test_json_lists_nodes_and_edges() {
        let mut graph = Graph::new();
        let dataset = graph.create_node(NodeKind::Dataset, egui::Pos2::ZERO);
        let model = graph.create_node(NodeKind::Model, egui::Pos2::new(300.0, 0.0));
        graph
            .create_edge(Endpoint::new(dataset, PortId(0)), Endpoint::new(model, PortId(0)))
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&PipelinePanel::render_json(&graph).unwrap()).unwrap();

        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        let edge = &json["edges"][0];
        assert_eq!(edge["source_port"], "data");
        assert_eq!(edge["target_port"], "data");
    }

    #[test]
    fn test_save_writes_file() {
        let path =
            std::env::temp_dir().join(format!("pipeline_export_{}.json", std::process::id()));
        let mut graph = Graph::new();
        graph.create_node(NodeKind::Metric, egui::Pos2::ZERO);
        let mut panel = PipelinePanel::new(&path);

        let written = panel.save(&graph).unwrap();
        let text = std::fs::read_to_string(&written).unwrap();
        let _ = std::fs::remove_file(&written);

        let snapshot: pipeline_editor_graph::PipelineSnapshot =
            serde_json::from_str(&text).unwrap();
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.nodes[0].kind, NodeKind::Metric);
    }
}
