// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canvas widget: turns egui input into [`CanvasEvent`]s and paints the graph.
//!
//! All positions handed to the [`InteractionController`] are relative to the
//! top-left corner of the widget rect.

use crate::graph::Graph;
use crate::interaction::{
    self, CanvasEvent, EditorKey, Feedback, InteractionController, InteractionSettings,
    InteractionState, Modifiers, PointerButton,
};
use crate::node::{Node, NodeId, NodeKind, NODE_HEADER_HEIGHT};
use crate::port::Port;
use crate::routing::DEFAULT_SEGMENTS;
use crate::viewport::{ViewportTransform, ZoomDirection};
use egui::{Color32, Pos2, Rect, Stroke, Vec2};

const PORT_RADIUS: f32 = 6.0;
const NODE_ROUNDING: f32 = 6.0;
const NODE_SHADOW_OFFSET: f32 = 3.0;
const EDGE_THICKNESS: f32 = 2.5;
const GRID_SPACING: f32 = 20.0;
/// Seconds a rejection message stays in the status bar
const STATUS_DURATION: f64 = 3.0;

/// Interactive pipeline canvas
#[derive(Debug, Clone)]
pub struct PipelineCanvas {
    controller: InteractionController,
    view: ViewportTransform,
    /// Draw the background grid
    pub show_grid: bool,
    status: Option<(String, f64)>,
    last_rect: Rect,
}

impl PipelineCanvas {
    /// Create a canvas with the given interaction settings
    pub fn new(settings: InteractionSettings) -> Self {
        Self {
            controller: InteractionController::new(settings),
            view: ViewportTransform::new(),
            show_grid: true,
            status: None,
            last_rect: Rect::NOTHING,
        }
    }

    /// Interaction controller
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Mutable interaction controller
    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    /// Current viewport
    pub fn view(&self) -> &ViewportTransform {
        &self.view
    }

    /// Reset pan and zoom
    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    /// Forget selections and gestures that refer to the previous graph
    pub fn clear_interaction(&mut self) {
        self.controller.reset();
        self.status = None;
    }

    /// Rect the canvas occupied last frame
    pub fn last_rect(&self) -> Rect {
        self.last_rect
    }

    /// Handle input and paint, filling the remaining space of `ui`
    pub fn show(&mut self, ui: &mut egui::Ui, graph: &mut Graph) -> Vec<Feedback> {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        self.last_rect = rect;

        let mut feedback = self.handle_input(ui, &response, rect, graph);
        let time = ui.input(|i| i.time);

        for item in &feedback {
            if let Feedback::ConnectionRejected(err) = item {
                self.status = Some((err.to_string(), time + STATUS_DURATION));
            }
        }
        if self.status.as_ref().is_some_and(|(_, until)| time > *until) {
            self.status = None;
        }

        painter.rect_filled(rect, 0.0, Color32::from_rgb(30, 30, 32));
        if self.show_grid {
            self.draw_grid(&painter, rect);
        }
        self.draw_edges(&painter, rect, graph);
        self.draw_preview(&painter, rect);
        self.draw_nodes(&painter, rect, graph);
        self.draw_status_bar(&painter, rect, graph);

        if let Some(id) = self.context_menu(ui.ctx(), rect, graph) {
            feedback.push(Feedback::NodeCreated(id));
        }

        if !self.controller.is_idle() || self.controller.click_pending() || self.status.is_some() {
            ui.ctx().request_repaint();
        }

        feedback
    }

    fn handle_input(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        rect: Rect,
        graph: &mut Graph,
    ) -> Vec<Feedback> {
        let origin = rect.min.to_vec2();
        let keyboard_taken = ui.ctx().wants_keyboard_input();
        let menu_open = matches!(
            self.controller.state(),
            InteractionState::ContextMenuOpen { .. }
        );
        let (events, time) = ui.input(|i| (i.events.clone(), i.time));

        let mut translated = Vec::new();
        for event in events {
            match event {
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    modifiers,
                } => {
                    let Some(button) = map_button(button) else {
                        continue;
                    };
                    let pos = pos - origin;
                    if pressed {
                        // Presses elsewhere in the window only matter to an open menu
                        if !rect.contains(pos + origin) && !menu_open {
                            continue;
                        }
                        translated.push(CanvasEvent::PointerDown {
                            pos,
                            button,
                            modifiers: Modifiers {
                                alt: modifiers.alt,
                                ctrl: modifiers.command,
                                shift: modifiers.shift,
                            },
                            time,
                        });
                    } else {
                        translated.push(CanvasEvent::PointerUp { pos, button, time });
                    }
                }
                egui::Event::PointerMoved(pos) => {
                    translated.push(CanvasEvent::PointerMove {
                        pos: pos - origin,
                        time,
                    });
                }
                egui::Event::Key {
                    key, pressed: true, ..
                } if !keyboard_taken && response.hovered() => {
                    let key = match key {
                        egui::Key::Delete | egui::Key::Backspace => EditorKey::Delete,
                        egui::Key::Escape => EditorKey::Escape,
                        _ => continue,
                    };
                    translated.push(CanvasEvent::Key(key));
                }
                egui::Event::MouseWheel { delta, .. } if response.hovered() && delta.y != 0.0 => {
                    let direction = if delta.y > 0.0 {
                        ZoomDirection::In
                    } else {
                        ZoomDirection::Out
                    };
                    translated.push(CanvasEvent::Wheel { direction });
                }
                _ => {}
            }
        }

        translated.push(CanvasEvent::Tick { time });

        translated
            .into_iter()
            .flat_map(|event| self.controller.handle(event, graph, &mut self.view))
            .collect()
    }

    fn context_menu(
        &mut self,
        ctx: &egui::Context,
        rect: Rect,
        graph: &mut Graph,
    ) -> Option<NodeId> {
        let InteractionState::ContextMenuOpen { anchor, .. } = *self.controller.state() else {
            return None;
        };

        let mut chosen = None;
        let area = egui::Area::new(egui::Id::new("pipeline_canvas_menu"))
            .fixed_pos(anchor + rect.min.to_vec2())
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label("Add node");
                    ui.separator();
                    for kind in NodeKind::ALL {
                        if ui.button(kind.name()).clicked() {
                            chosen = Some(kind);
                        }
                    }
                });
            });

        self.controller
            .set_menu_region(Some(area.response.rect.translate(-rect.min.to_vec2())));

        let kind = chosen?;
        let id = self.controller.spawn_from_menu(kind, graph)?;
        tracing::info!(%id, kind = kind.name(), "node added");
        Some(id)
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect) {
        let spacing = self.view.scale_length(GRID_SPACING);
        let major_spacing = spacing * 5.0;
        if spacing < 4.0 {
            return;
        }

        let minor = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 60, 60, 100));
        let major = Stroke::new(1.0, Color32::from_rgba_unmultiplied(80, 80, 80, 150));
        let offset = self.view.offset();

        for (step, stroke) in [(spacing, minor), (major_spacing, major)] {
            let mut x = rect.left() + offset.x.rem_euclid(step);
            while x < rect.right() {
                painter.line_segment(
                    [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                    stroke,
                );
                x += step;
            }

            let mut y = rect.top() + offset.y.rem_euclid(step);
            while y < rect.bottom() {
                painter.line_segment(
                    [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                    stroke,
                );
                y += step;
            }
        }
    }

    fn draw_edges(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        let origin = rect.min.to_vec2();
        let selected = self.controller.selected_edge();

        for edge in graph.edges() {
            let Some(path) = interaction::route_edge(graph, &self.view, edge) else {
                continue;
            };
            let color = if selected == Some(edge.id) {
                Color32::from_rgb(255, 200, 80)
            } else {
                graph
                    .node(edge.source.node)
                    .map_or(Color32::GRAY, |n| kind_color(n.kind))
            };
            let points = path.flatten(DEFAULT_SEGMENTS).into_iter().map(|p| p + origin).collect();
            painter.add(egui::Shape::line(points, Stroke::new(EDGE_THICKNESS, color)));
        }
    }

    fn draw_preview(&self, painter: &egui::Painter, rect: Rect) {
        let Some(path) = self.controller.preview_path(&self.view) else {
            return;
        };
        let origin = rect.min.to_vec2();
        let points = path.flatten(DEFAULT_SEGMENTS).into_iter().map(|p| p + origin).collect();
        painter.add(egui::Shape::line(
            points,
            Stroke::new(EDGE_THICKNESS, Color32::from_rgba_unmultiplied(200, 200, 200, 160)),
        ));
    }

    fn draw_nodes(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        let origin = rect.min.to_vec2();
        let scale = self.view.scale();

        for node in graph.nodes() {
            let screen_rect = Rect::from_min_size(
                self.view.canvas_to_screen(node.position) + origin,
                node.size * scale,
            );
            if !screen_rect.intersects(rect) {
                continue;
            }

            painter.rect_filled(
                screen_rect.translate(Vec2::splat(NODE_SHADOW_OFFSET)),
                NODE_ROUNDING * scale,
                Color32::from_rgba_unmultiplied(0, 0, 0, 60),
            );

            let background = if node.selected {
                Color32::from_rgb(60, 70, 90)
            } else {
                Color32::from_rgb(45, 45, 48)
            };
            painter.rect_filled(screen_rect, NODE_ROUNDING * scale, background);

            let header_rect = Rect::from_min_size(
                screen_rect.min,
                Vec2::new(screen_rect.width(), NODE_HEADER_HEIGHT * scale),
            );
            painter.rect_filled(
                header_rect,
                egui::Rounding {
                    nw: NODE_ROUNDING * scale,
                    ne: NODE_ROUNDING * scale,
                    sw: 0.0,
                    se: 0.0,
                },
                kind_color(node.kind),
            );
            painter.text(
                header_rect.center(),
                egui::Align2::CENTER_CENTER,
                &node.title,
                egui::FontId::proportional(12.0 * scale),
                Color32::WHITE,
            );

            if !node.is_configured() {
                painter.circle_filled(
                    header_rect.right_center() - Vec2::new(10.0 * scale, 0.0),
                    3.0 * scale,
                    Color32::from_rgb(255, 170, 60),
                );
            }

            if node.selected {
                painter.rect_stroke(
                    screen_rect,
                    NODE_ROUNDING * scale,
                    Stroke::new(2.0, Color32::from_rgb(100, 150, 255)),
                );
            }

            self.draw_ports(painter, origin, node);
        }
    }

    fn draw_ports(&self, painter: &egui::Painter, origin: Vec2, node: &Node) {
        let scale = self.view.scale();
        let highlighted = self
            .controller
            .pending_connection()
            .map(|pending| pending.origin);

        for port in node.ports() {
            let pos = self.view.canvas_to_screen(port.position) + origin;
            let active = highlighted.is_some_and(|e| e.node == node.id && e.port == port.id);
            let radius = PORT_RADIUS * scale * if active { 1.3 } else { 1.0 };

            painter.circle_filled(pos, radius, port_color(port, active));
            painter.circle_stroke(pos, radius, Stroke::new(1.0, Color32::from_gray(30)));

            let (anchor, label_pos) = if port.is_input() {
                (egui::Align2::LEFT_CENTER, pos + Vec2::new(12.0 * scale, 0.0))
            } else {
                (egui::Align2::RIGHT_CENTER, pos - Vec2::new(12.0 * scale, 0.0))
            };
            painter.text(
                label_pos,
                anchor,
                &port.name,
                egui::FontId::proportional(10.0 * scale),
                Color32::from_gray(200),
            );
        }
    }

    fn draw_status_bar(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        let left = Pos2::new(rect.left() + 5.0, rect.bottom() - 11.0);
        painter.text(
            left,
            egui::Align2::LEFT_CENTER,
            format!(
                "Nodes: {} | Edges: {} | Zoom: {:.0}% | {}",
                graph.node_count(),
                graph.edge_count(),
                self.view.scale() * 100.0,
                mode_label(self.controller.state()),
            ),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );

        if let Some((message, _)) = &self.status {
            painter.text(
                Pos2::new(rect.right() - 5.0, rect.bottom() - 11.0),
                egui::Align2::RIGHT_CENTER,
                message,
                egui::FontId::proportional(11.0),
                Color32::from_rgb(255, 110, 110),
            );
        }
    }
}

impl Default for PipelineCanvas {
    fn default() -> Self {
        Self::new(InteractionSettings::default())
    }
}

fn map_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        egui::PointerButton::Middle => Some(PointerButton::Middle),
        egui::PointerButton::Extra1 | egui::PointerButton::Extra2 => None,
    }
}

/// Header color of a node kind
pub fn kind_color(kind: NodeKind) -> Color32 {
    let [r, g, b] = kind.color();
    Color32::from_rgb(r, g, b)
}

fn port_color(port: &Port, active: bool) -> Color32 {
    match (active, port.is_input()) {
        (true, _) => Color32::from_rgb(255, 220, 100),
        (false, true) => Color32::from_rgb(120, 180, 255),
        (false, false) => Color32::from_rgb(140, 220, 140),
    }
}

fn mode_label(state: &InteractionState) -> &'static str {
    match state {
        InteractionState::Idle => "Idle",
        InteractionState::Panning { .. } => "Panning",
        InteractionState::DraggingNode { .. } => "Moving node",
        InteractionState::ConnectingEdge(_) => "Connecting: click a compatible port",
        InteractionState::ContextMenuOpen { .. } => "Add node",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(
        ctx: &egui::Context,
        canvas: &mut PipelineCanvas,
        graph: &mut Graph,
        time: f64,
        events: Vec<egui::Event>,
    ) -> Vec<Feedback> {
        let input = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(1024.0, 768.0))),
            time: Some(time),
            events,
            ..Default::default()
        };
        let mut feedback = Vec::new();
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                feedback = canvas.show(ui, graph);
            });
        });
        feedback
    }

    fn click(pos: Pos2) -> Vec<egui::Event> {
        let press = |pressed| egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        };
        vec![egui::Event::PointerMoved(pos), press(true), press(false)]
    }

    #[test]
    fn test_empty_canvas_renders() {
        let ctx = egui::Context::default();
        let mut canvas = PipelineCanvas::default();
        let mut graph = Graph::new();

        let feedback = frame(&ctx, &mut canvas, &mut graph, 0.0, Vec::new());
        assert!(feedback.is_empty());
        assert!(canvas.last_rect().width() > 0.0);
    }

    #[test]
    fn test_clicks_connect_ports() {
        let ctx = egui::Context::default();
        let mut canvas = PipelineCanvas::default();
        let mut graph = Graph::new();
        let dataset = graph.create_node(NodeKind::Dataset, Pos2::new(20.0, 20.0));
        let model = graph.create_node(NodeKind::Model, Pos2::new(320.0, 20.0));

        frame(&ctx, &mut canvas, &mut graph, 0.0, Vec::new());
        let origin = canvas.last_rect().min.to_vec2();
        let output = graph.node(dataset).unwrap().outputs[0].position + origin;
        let input = graph.node(model).unwrap().inputs[0].position + origin;

        frame(&ctx, &mut canvas, &mut graph, 0.1, click(output));
        assert!(canvas.controller().pending_connection().is_some());

        let feedback = frame(&ctx, &mut canvas, &mut graph, 0.2, click(input));
        assert!(matches!(feedback.as_slice(), [Feedback::EdgeCreated(_)]));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_rejection_shows_in_status() {
        let ctx = egui::Context::default();
        let mut canvas = PipelineCanvas::default();
        let mut graph = Graph::new();
        let metric = graph.create_node(NodeKind::Metric, Pos2::new(20.0, 20.0));
        let dataset = graph.create_node(NodeKind::Dataset, Pos2::new(320.0, 20.0));

        frame(&ctx, &mut canvas, &mut graph, 0.0, Vec::new());
        let origin = canvas.last_rect().min.to_vec2();
        let input = graph.node(metric).unwrap().inputs[0].position + origin;
        let output = graph.node(dataset).unwrap().outputs[0].position + origin;

        frame(&ctx, &mut canvas, &mut graph, 0.1, click(input));
        let feedback = frame(&ctx, &mut canvas, &mut graph, 0.2, click(output));
        assert!(matches!(feedback.as_slice(), [Feedback::ConnectionRejected(_)]));
        assert!(canvas.status.is_some());
        assert_eq!(graph.edge_count(), 0);

        frame(&ctx, &mut canvas, &mut graph, 10.0, Vec::new());
        assert!(canvas.status.is_none());
    }

    #[test]
    fn test_each_wheel_notch_zooms_once() {
        let ctx = egui::Context::default();
        let mut canvas = PipelineCanvas::default();
        let mut graph = Graph::new();
        frame(&ctx, &mut canvas, &mut graph, 0.0, Vec::new());

        let notch = egui::Event::MouseWheel {
            unit: egui::MouseWheelUnit::Line,
            delta: Vec2::new(0.0, 1.0),
            modifiers: egui::Modifiers::NONE,
        };
        let center = canvas.last_rect().center();
        frame(
            &ctx,
            &mut canvas,
            &mut graph,
            0.1,
            vec![egui::Event::PointerMoved(center), notch.clone(), notch],
        );

        assert!((canvas.view().scale() - 1.21).abs() < 1e-4);
    }

    #[test]
    fn test_press_in_other_panel_closes_menu() {
        let ctx = egui::Context::default();
        let mut canvas = PipelineCanvas::default();
        let mut graph = Graph::new();

        let mut run = |canvas: &mut PipelineCanvas, time: f64, events: Vec<egui::Event>| {
            let input = egui::RawInput {
                screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(1024.0, 768.0))),
                time: Some(time),
                events,
                ..Default::default()
            };
            let _ = ctx.run(input, |ctx| {
                egui::SidePanel::right("details")
                    .exact_width(240.0)
                    .resizable(false)
                    .show(ctx, |ui| ui.label("details"));
                egui::CentralPanel::default().show(ctx, |ui| {
                    canvas.show(ui, &mut graph);
                });
            });
        };

        run(&mut canvas, 0.0, Vec::new());
        let spot = canvas.last_rect().left_top() + Vec2::new(100.0, 100.0);
        let secondary = |pressed| egui::Event::PointerButton {
            pos: spot,
            button: egui::PointerButton::Secondary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        };
        run(
            &mut canvas,
            0.1,
            vec![egui::Event::PointerMoved(spot), secondary(true), secondary(false)],
        );
        assert!(matches!(
            canvas.controller().state(),
            InteractionState::ContextMenuOpen { .. }
        ));

        let elsewhere = Pos2::new(1000.0, 700.0);
        assert!(!canvas.last_rect().contains(elsewhere));
        run(&mut canvas, 0.2, click(elsewhere));
        assert!(canvas.controller().is_idle());
    }
}
