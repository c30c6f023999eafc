// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer/keyboard interaction state machine for the pipeline canvas.
//!
//! All transient editor state lives in one [`InteractionState`] value, so
//! panning, dragging, connecting and the context menu are mutually exclusive
//! by construction. [`InteractionController::handle`] is the single dispatch
//! point: each event is applied to completion before the next one arrives.

use crate::edge::{Edge, EdgeId, Endpoint};
use crate::graph::Graph;
use crate::node::{NodeId, NodeKind};
use crate::port::PortDirection;
use crate::routing::EdgePath;
use crate::validation::{self, ConnectionError};
use crate::viewport::{ViewportTransform, ZoomDirection};
use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Modifier key that turns a primary-button press into a pan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanModifier {
    /// Alt / Option
    #[default]
    Alt,
    /// Shift
    Shift,
    /// Ctrl / Cmd
    Ctrl,
}

/// Tunables for hit-testing and click disambiguation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    /// Seconds within which a second press on the same node configures it
    pub double_click_window: f64,
    /// Screen pixels a press may travel before it counts as a drag
    pub drag_threshold: f32,
    /// Screen-space radius around a port that counts as hitting it
    pub port_hit_radius: f32,
    /// Screen-space distance from an edge curve that counts as hitting it
    pub edge_hit_tolerance: f32,
    /// Modifier that makes the primary button pan
    pub pan_modifier: PanModifier,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            double_click_window: 0.3,
            drag_threshold: 4.0,
            port_hit_radius: 9.0,
            edge_hit_tolerance: 6.0,
            pan_modifier: PanModifier::Alt,
        }
    }
}

/// Held modifier keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Alt / Option
    pub alt: bool,
    /// Ctrl / Cmd
    pub ctrl: bool,
    /// Shift
    pub shift: bool,
}

impl Modifiers {
    /// No modifiers held
    pub const NONE: Self = Self {
        alt: false,
        ctrl: false,
        shift: false,
    };

    /// Whether the given pan modifier is held
    pub fn holds(&self, modifier: PanModifier) -> bool {
        match modifier {
            PanModifier::Alt => self.alt,
            PanModifier::Shift => self.shift,
            PanModifier::Ctrl => self.ctrl,
        }
    }
}

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left button
    Primary,
    /// Right button (context menu)
    Secondary,
    /// Middle button (pan)
    Middle,
}

/// Keys the canvas reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    /// Delete or Backspace
    Delete,
    /// Escape
    Escape,
}

/// Input event in canvas-widget screen coordinates.
///
/// `time` is in seconds on any monotonic clock shared by all events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEvent {
    /// Button pressed
    PointerDown {
        /// Screen position
        pos: Pos2,
        /// Button
        button: PointerButton,
        /// Held modifiers
        modifiers: Modifiers,
        /// Event time
        time: f64,
    },
    /// Pointer moved
    PointerMove {
        /// Screen position
        pos: Pos2,
        /// Event time
        time: f64,
    },
    /// Button released
    PointerUp {
        /// Screen position
        pos: Pos2,
        /// Button
        button: PointerButton,
        /// Event time
        time: f64,
    },
    /// One discrete wheel step
    Wheel {
        /// Zoom direction
        direction: ZoomDirection,
    },
    /// Key pressed
    Key(EditorKey),
    /// Clock advanced without input
    Tick {
        /// Current time
        time: f64,
    },
}

impl CanvasEvent {
    fn time(&self) -> Option<f64> {
        match *self {
            Self::PointerDown { time, .. }
            | Self::PointerMove { time, .. }
            | Self::PointerUp { time, .. }
            | Self::Tick { time } => Some(time),
            Self::Wheel { .. } | Self::Key(_) => None,
        }
    }
}

/// First half of a two-click connection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingConnection {
    /// Port the connection started from
    pub origin: Endpoint,
    /// Direction of that port
    pub direction: PortDirection,
    /// Canvas position of the origin port
    pub anchor: Pos2,
    /// Canvas position the preview currently ends at
    pub cursor: Pos2,
}

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    /// Waiting for input
    #[default]
    Idle,
    /// Dragging the view
    Panning {
        /// Last pointer position (screen)
        last: Pos2,
    },
    /// Dragging a node
    DraggingNode {
        /// Node being dragged
        node: NodeId,
        /// Pointer minus node position at press time (canvas)
        grab_offset: Vec2,
        /// Press position (screen)
        press: Pos2,
    },
    /// Choosing the second port of a new edge
    ConnectingEdge(PendingConnection),
    /// Node palette shown
    ContextMenuOpen {
        /// Where the menu is drawn (screen)
        anchor: Pos2,
        /// Where a chosen node will be created (canvas)
        spawn_at: Pos2,
    },
}

/// What lies under a screen point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// A port
    Port(Endpoint),
    /// A node body
    Node(NodeId),
    /// An edge curve
    Edge(EdgeId),
    /// Nothing
    Canvas,
}

/// Outcome the host should react to
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    /// A node was created from the context menu
    NodeCreated(NodeId),
    /// An edge was committed (or already existed)
    EdgeCreated(EdgeId),
    /// A connection attempt was refused
    ConnectionRejected(ConnectionError),
    /// The node was double-clicked and should open its detail view
    ConfigureRequested(NodeId),
    /// A single click on the node settled without a second click
    NodeClicked(NodeId),
    /// Selected elements were deleted
    Deleted {
        /// Nodes removed
        nodes: usize,
        /// Edges removed, including cascaded ones
        edges: usize,
    },
}

/// Single-click action waiting for its double-click window to close
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScheduledClick {
    node: NodeId,
    deadline: f64,
}

/// Drives the canvas state machine and mutates the graph in response
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    settings: InteractionSettings,
    state: InteractionState,
    scheduled_click: Option<ScheduledClick>,
    selected_edge: Option<EdgeId>,
    menu_region: Option<Rect>,
}

impl InteractionController {
    /// Create a controller in the `Idle` state
    pub fn new(settings: InteractionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Current state
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Whether no interaction is in progress
    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    /// Active settings
    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    /// Replace the settings
    pub fn set_settings(&mut self, settings: InteractionSettings) {
        self.settings = settings;
    }

    /// Drop every transient interaction, keeping the settings.
    ///
    /// Call this when the graph is replaced so no state refers to old ids.
    pub fn reset(&mut self) {
        *self = Self::new(self.settings.clone());
    }

    /// Whether a single click is waiting for its double-click window to close
    pub fn click_pending(&self) -> bool {
        self.scheduled_click.is_some()
    }

    /// Currently selected edge
    pub fn selected_edge(&self) -> Option<EdgeId> {
        self.selected_edge
    }

    /// In-progress connection, if any
    pub fn pending_connection(&self) -> Option<&PendingConnection> {
        match &self.state {
            InteractionState::ConnectingEdge(pending) => Some(pending),
            _ => None,
        }
    }

    /// Screen rectangle occupied by the open context menu
    pub fn set_menu_region(&mut self, region: Option<Rect>) {
        self.menu_region = region;
    }

    /// Apply one event
    pub fn handle(
        &mut self,
        event: CanvasEvent,
        graph: &mut Graph,
        view: &mut ViewportTransform,
    ) -> Vec<Feedback> {
        let mut feedback = Vec::new();

        if let Some(time) = event.time() {
            self.expire_click(time, &mut feedback);
        }

        match event {
            CanvasEvent::PointerDown {
                pos,
                button,
                modifiers,
                time,
            } => self.pointer_down(pos, button, modifiers, time, graph, view, &mut feedback),
            CanvasEvent::PointerMove { pos, .. } => self.pointer_move(pos, graph, view),
            CanvasEvent::PointerUp { .. } => self.pointer_up(),
            CanvasEvent::Wheel { direction } => view.zoom(direction),
            CanvasEvent::Key(key) => self.key(key, graph, &mut feedback),
            CanvasEvent::Tick { .. } => {}
        }

        feedback
    }

    /// Create a node of `kind` where the context menu was opened
    pub fn spawn_from_menu(&mut self, kind: NodeKind, graph: &mut Graph) -> Option<NodeId> {
        let InteractionState::ContextMenuOpen { spawn_at, .. } = self.state else {
            return None;
        };
        self.close_menu();
        let id = graph.create_node(kind, spawn_at);
        graph.select_only(id);
        Some(id)
    }

    /// Close the context menu without creating anything
    pub fn close_menu(&mut self) {
        if matches!(self.state, InteractionState::ContextMenuOpen { .. }) {
            self.state = InteractionState::Idle;
        }
        self.menu_region = None;
    }

    /// Find what lies under a screen point.
    ///
    /// Ports win over node bodies, bodies over edges; among nodes the most
    /// recently created one is on top.
    pub fn hit_test(&self, screen: Pos2, graph: &Graph, view: &ViewportTransform) -> Hit {
        let canvas = view.screen_to_canvas(screen);
        let port_radius = self.settings.port_hit_radius / view.scale();

        for node in graph.nodes().rev() {
            if let Some(port) = node.ports().find(|p| p.position.distance(canvas) <= port_radius) {
                return Hit::Port(Endpoint::new(node.id, port.id));
            }
        }

        if let Some(node) = graph.nodes().rev().find(|n| n.rect().contains(canvas)) {
            return Hit::Node(node.id);
        }

        let tolerance = self.settings.edge_hit_tolerance;
        graph
            .edges()
            .find(|edge| {
                route_edge(graph, view, edge)
                    .is_some_and(|path| path.distance_to(screen) <= tolerance)
            })
            .map_or(Hit::Canvas, |edge| Hit::Edge(edge.id))
    }

    /// Screen path of the live preview edge, if connecting
    pub fn preview_path(&self, view: &ViewportTransform) -> Option<EdgePath> {
        let pending = self.pending_connection()?;
        let anchor = view.canvas_to_screen(pending.anchor);
        let cursor = view.canvas_to_screen(pending.cursor);
        Some(match pending.direction {
            PortDirection::Output => EdgePath::between(anchor, cursor),
            PortDirection::Input => EdgePath::between(cursor, anchor),
        })
    }

    fn expire_click(&mut self, now: f64, feedback: &mut Vec<Feedback>) {
        if let Some(click) = self.scheduled_click {
            if now > click.deadline {
                self.scheduled_click = None;
                feedback.push(Feedback::NodeClicked(click.node));
            }
        }
    }

    fn pointer_down(
        &mut self,
        pos: Pos2,
        button: PointerButton,
        modifiers: Modifiers,
        time: f64,
        graph: &mut Graph,
        view: &ViewportTransform,
        feedback: &mut Vec<Feedback>,
    ) {
        let hit = self.hit_test(pos, graph, view);

        // A double-click needs two consecutive presses on the same node body
        let reaches_node = self.is_idle()
            && button == PointerButton::Primary
            && matches!(hit, Hit::Node(_));
        if !reaches_node {
            if let Some(click) = self.scheduled_click.take() {
                feedback.push(Feedback::NodeClicked(click.node));
            }
        }

        match self.state {
            InteractionState::Idle => {
                self.press_idle(pos, hit, button, modifiers, time, graph, view, feedback);
            }
            InteractionState::ContextMenuOpen { .. } => {
                let inside = self.menu_region.is_some_and(|r| r.contains(pos));
                if !inside {
                    self.close_menu();
                }
            }
            InteractionState::ConnectingEdge(pending) => {
                match (button, hit) {
                    (PointerButton::Primary, Hit::Port(endpoint)) => {
                        self.state = InteractionState::Idle;
                        if endpoint != pending.origin {
                            self.finish_connection(pending, endpoint, graph, feedback);
                        }
                    }
                    _ => {
                        tracing::debug!("connection aborted");
                        self.state = InteractionState::Idle;
                    }
                }
            }
            InteractionState::Panning { .. } | InteractionState::DraggingNode { .. } => {}
        }
    }

    fn press_idle(
        &mut self,
        pos: Pos2,
        hit: Hit,
        button: PointerButton,
        modifiers: Modifiers,
        time: f64,
        graph: &mut Graph,
        view: &ViewportTransform,
        feedback: &mut Vec<Feedback>,
    ) {
        let pan_trigger = button == PointerButton::Middle
            || (button == PointerButton::Primary && modifiers.holds(self.settings.pan_modifier));

        match (button, hit) {
            (_, Hit::Canvas) if pan_trigger => {
                self.state = InteractionState::Panning { last: pos };
            }
            (PointerButton::Primary, Hit::Port(origin)) => {
                let (Ok(port), Some(anchor)) = (graph.port_ref(origin), graph.port_position(origin))
                else {
                    return;
                };
                self.selected_edge = None;
                self.state = InteractionState::ConnectingEdge(PendingConnection {
                    origin,
                    direction: port.direction,
                    anchor,
                    cursor: anchor,
                });
            }
            (PointerButton::Primary, Hit::Node(node)) => {
                self.press_node(node, pos, time, graph, view, feedback);
            }
            (PointerButton::Primary, Hit::Edge(edge)) => {
                graph.clear_selection();
                self.selected_edge = Some(edge);
            }
            (PointerButton::Primary, Hit::Canvas) => {
                graph.clear_selection();
                self.selected_edge = None;
            }
            (PointerButton::Secondary, Hit::Canvas) => {
                self.menu_region = None;
                self.state = InteractionState::ContextMenuOpen {
                    anchor: pos,
                    spawn_at: view.screen_to_canvas(pos),
                };
            }
            _ => {}
        }
    }

    fn press_node(
        &mut self,
        node: NodeId,
        pos: Pos2,
        time: f64,
        graph: &mut Graph,
        view: &ViewportTransform,
        feedback: &mut Vec<Feedback>,
    ) {
        graph.select_only(node);
        self.selected_edge = None;

        if let Some(click) = self.scheduled_click.take() {
            if click.node == node {
                tracing::debug!(%node, "configure requested");
                feedback.push(Feedback::ConfigureRequested(node));
                return;
            }
            feedback.push(Feedback::NodeClicked(click.node));
        }

        let Some(position) = graph.node(node).map(|n| n.position) else {
            return;
        };
        self.state = InteractionState::DraggingNode {
            node,
            grab_offset: view.screen_to_canvas(pos) - position,
            press: pos,
        };
        self.scheduled_click = Some(ScheduledClick {
            node,
            deadline: time + self.settings.double_click_window,
        });
    }

    fn pointer_move(&mut self, pos: Pos2, graph: &mut Graph, view: &mut ViewportTransform) {
        match &mut self.state {
            InteractionState::Panning { last } => {
                view.pan(pos - *last);
                *last = pos;
            }
            InteractionState::DraggingNode {
                node,
                grab_offset,
                press,
            } => {
                if pos.distance(*press) > self.settings.drag_threshold {
                    self.scheduled_click = None;
                }
                let target = view.screen_to_canvas(pos) - *grab_offset;
                if graph.move_node(*node, target).is_err() {
                    self.state = InteractionState::Idle;
                }
            }
            InteractionState::ConnectingEdge(pending) => {
                pending.cursor = view.screen_to_canvas(pos);
            }
            InteractionState::Idle | InteractionState::ContextMenuOpen { .. } => {}
        }
    }

    fn pointer_up(&mut self) {
        if matches!(
            self.state,
            InteractionState::Panning { .. } | InteractionState::DraggingNode { .. }
        ) {
            self.state = InteractionState::Idle;
        }
    }

    fn key(&mut self, key: EditorKey, graph: &mut Graph, feedback: &mut Vec<Feedback>) {
        match key {
            EditorKey::Escape => match self.state {
                InteractionState::ConnectingEdge(_) => self.state = InteractionState::Idle,
                InteractionState::ContextMenuOpen { .. } => self.close_menu(),
                _ => {}
            },
            EditorKey::Delete => {
                if !self.is_idle() {
                    return;
                }
                let edges_before = graph.edge_count();
                if let Some(edge) = self.selected_edge.take() {
                    graph.delete_edge(edge);
                }
                let nodes = graph.delete_selected().len();
                let edges = edges_before - graph.edge_count();
                if nodes > 0 || edges > 0 {
                    tracing::debug!(nodes, edges, "selection deleted");
                    feedback.push(Feedback::Deleted { nodes, edges });
                }
            }
        }
    }

    fn finish_connection(
        &mut self,
        pending: PendingConnection,
        endpoint: Endpoint,
        graph: &mut Graph,
        feedback: &mut Vec<Feedback>,
    ) {
        let (Ok(first), Ok(second)) = (graph.port_ref(pending.origin), graph.port_ref(endpoint))
        else {
            return;
        };

        match validation::validate(first, second) {
            Ok(valid) => {
                let source = Endpoint::new(valid.source.node, valid.source.port);
                let target = Endpoint::new(valid.target.node, valid.target.port);
                if graph.find_edge(source, target).is_some() {
                    tracing::debug!("edge already present");
                    return;
                }
                match graph.create_edge(source, target) {
                    Ok(id) => feedback.push(Feedback::EdgeCreated(id)),
                    Err(err) => tracing::warn!(%err, "edge not created"),
                }
            }
            Err(err) => {
                tracing::warn!(%err, "connection rejected");
                feedback.push(Feedback::ConnectionRejected(err));
            }
        }
    }
}

/// Screen path of a committed edge
pub fn route_edge(graph: &Graph, view: &ViewportTransform, edge: &Edge) -> Option<EdgePath> {
    let from = graph.port_position(edge.source)?;
    let to = graph.port_position(edge.target)?;
    Some(EdgePath::between(
        view.canvas_to_screen(from),
        view.canvas_to_screen(to),
    ))
}
