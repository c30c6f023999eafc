// SPDX-License-Identifier: MIT OR Apache-2.0
//! Main editor application setup and event loop.
//!
//! Frames are drawn on demand: a redraw happens when winit delivers input or
//! when egui asks for one, so an idle editor does not spin the GPU.

use crate::catalog::load_catalog;
use crate::panel_types::PanelType;
use crate::panels::{DetailsPanel, PipelinePanel};
use crate::settings::{EditorSettings, SettingsError};
use egui_dock::{DockArea, DockState, NodeIndex, Style, TabViewer};
use egui_wgpu::wgpu;
use pipeline_editor_graph::{Feedback, Graph, PipelineCanvas, StaticCatalog};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Editor application errors
#[derive(Debug, Error)]
pub enum EditorError {
    /// Window creation failed
    #[error("Failed to create window: {0}")]
    WindowCreation(#[from] winit::error::OsError),

    /// The window has no drawable surface
    #[error("Failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    /// No adapter can present to the window surface
    #[error("No GPU adapter can draw to the editor window")]
    NoAdapter,

    /// Adapter refused to open a device
    #[error("Failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// Surface offers no format egui can render to
    #[error("Unsupported surface: {0}")]
    SurfaceFormat(#[from] egui_wgpu::WgpuError),

    /// Event loop error
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// File could not be written
    #[error("Could not write file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be read or written
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Pipeline could not be serialized
    #[error("Export failed: {0}")]
    Export(#[from] serde_json::Error),
}

/// Result type for editor operations
pub type Result<T> = std::result::Result<T, EditorError>;

/// Tab viewer implementation for `egui_dock`
pub struct EditorTabViewer<'a> {
    graph: &'a mut Graph,
    canvas: &'a mut PipelineCanvas,
    details: &'a mut DetailsPanel,
    pipeline: &'a mut PipelinePanel,
    catalog: &'a StaticCatalog,
    feedback: &'a mut Vec<Feedback>,
}

impl<'a> TabViewer for EditorTabViewer<'a> {
    type Tab = PanelType;

    fn title(&mut self, tab: &mut Self::Tab) -> egui::WidgetText {
        format!("{} {}", tab.icon(), tab.name()).into()
    }

    fn ui(&mut self, ui: &mut egui::Ui, tab: &mut Self::Tab) {
        match tab {
            PanelType::Canvas => {
                let feedback = self.canvas.show(ui, self.graph);
                self.feedback.extend(feedback);
            }
            PanelType::Details => self.details.ui(ui, self.graph, self.catalog),
            PanelType::Pipeline => self.pipeline.ui(ui, self.graph),
        }
    }

    fn closeable(&mut self, tab: &mut Self::Tab) -> bool {
        *tab != PanelType::Canvas
    }
}

/// Window surface and the egui renderer that draws into it
struct Renderer {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    egui: egui_wgpu::Renderer,
}

impl Renderer {
    fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            compatible_surface: Some(&surface),
            ..Default::default()
        }))
        .ok_or(EditorError::NoAdapter)?;
        let info = adapter.get_info();
        tracing::info!(adapter = %info.name, backend = ?info.backend, "GPU selected");

        // A 2D editor fits in downlevel limits; only the texture size follows the adapter
        let limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits());
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("pipeline_editor"),
                required_limits: limits,
                ..Default::default()
            },
            None,
        ))?;

        let format = egui_wgpu::preferred_framebuffer_format(
            &surface.get_capabilities(&adapter).formats,
        )?;
        let mut surface_config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or(EditorError::NoAdapter)?;
        surface_config.format = format;
        surface.configure(&device, &surface_config);

        let egui = egui_wgpu::Renderer::new(&device, format, None, 1, false);

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            egui,
        })
    }

    fn max_texture_side(&self) -> usize {
        self.device.limits().max_texture_dimension_2d as usize
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        // Minimized windows report a zero size
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn paint(
        &mut self,
        ctx: &egui::Context,
        output: egui::FullOutput,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let target = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.surface_config.width, self.surface_config.height],
            pixels_per_point: output.pixels_per_point,
        };

        let primitives = ctx.tessellate(output.shapes, output.pixels_per_point);
        for (id, delta) in &output.textures_delta.set {
            self.egui.update_texture(&self.device, &self.queue, *id, delta);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let mut commands = self.egui.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &primitives,
            &screen,
        );

        let [r, g, b, a] = ctx.style().visuals.panel_fill.to_normalized_gamma_f32();
        let clear = wgpu::Color {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: f64::from(a),
        };
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(clear),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    ..Default::default()
                })
                .forget_lifetime();
            self.egui.render(&mut pass, &primitives, &screen);
        }

        commands.push(encoder.finish());
        self.queue.submit(commands);
        frame.present();

        for id in &output.textures_delta.free {
            self.egui.free_texture(id);
        }
        Ok(())
    }
}

/// Window, renderer and editor state once the event loop has resumed
struct EditorRunning {
    window: Arc<Window>,
    renderer: Renderer,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    editor: EditorInner,
    /// When egui wants its next frame; `None` while idle
    repaint_at: Option<Instant>,
}

impl EditorRunning {
    /// Run one egui pass and present it
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let input = self.egui_state.take_egui_input(&self.window);
        let mut output = self.egui_ctx.run(input, |ctx| self.editor.update(ctx));

        if self.editor.request_exit {
            event_loop.exit();
            return;
        }

        self.repaint_at = output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .and_then(|viewport| Instant::now().checked_add(viewport.repaint_delay));
        let platform_output = std::mem::take(&mut output.platform_output);
        self.egui_state.handle_platform_output(&self.window, platform_output);

        match self.renderer.paint(&self.egui_ctx, output) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.renderer.resize(self.window.inner_size());
                self.window.request_redraw();
            }
            Err(wgpu::SurfaceError::Timeout) => tracing::warn!("surface timed out, frame skipped"),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("GPU out of memory");
                event_loop.exit();
            }
        }
    }
}

/// Editor document and panels
struct EditorInner {
    settings: EditorSettings,
    catalog: StaticCatalog,
    graph: Graph,
    canvas: PipelineCanvas,
    details: DetailsPanel,
    pipeline: PipelinePanel,
    dock_state: DockState<PanelType>,
    feedback: Vec<Feedback>,
    request_exit: bool,
}

impl EditorInner {
    fn new(settings: &EditorSettings) -> Self {
        let catalog = load_catalog(settings.catalog_path.as_deref());
        tracing::info!("Catalog has {} records", catalog.len());

        Self {
            settings: settings.clone(),
            catalog,
            graph: Graph::new(),
            canvas: PipelineCanvas::new(settings.interaction.clone()),
            details: DetailsPanel::new(),
            pipeline: PipelinePanel::new(settings.export_path.clone()),
            dock_state: Self::create_default_layout(),
            feedback: Vec::new(),
            request_exit: false,
        }
    }

    fn create_default_layout() -> DockState<PanelType> {
        let mut dock_state = DockState::new(vec![PanelType::Canvas]);
        let surface = dock_state.main_surface_mut();

        let [canvas, _details] =
            surface.split_right(NodeIndex::root(), 0.72, vec![PanelType::Details]);
        let [_canvas, _pipeline] = surface.split_below(canvas, 0.7, vec![PanelType::Pipeline]);

        dock_state
    }

    fn update(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                self.file_menu(ui);
                self.view_menu(ui);
            });
        });

        let mut tab_viewer = EditorTabViewer {
            graph: &mut self.graph,
            canvas: &mut self.canvas,
            details: &mut self.details,
            pipeline: &mut self.pipeline,
            catalog: &self.catalog,
            feedback: &mut self.feedback,
        };

        DockArea::new(&mut self.dock_state)
            .style(Style::from_egui(ctx.style().as_ref()))
            .show(ctx, &mut tab_viewer);

        let feedback = std::mem::take(&mut self.feedback);
        for item in feedback {
            self.apply_feedback(item);
        }

        self.handle_shortcuts(ctx);
    }

    fn apply_feedback(&mut self, feedback: Feedback) {
        match feedback {
            Feedback::ConfigureRequested(id) => {
                if let Some(node) = self.graph.node(id) {
                    self.details.open(node);
                    self.open_panel(PanelType::Details);
                }
            }
            Feedback::NodeClicked(id) | Feedback::NodeCreated(id) => {
                if let Some(node) = self.graph.node(id) {
                    self.details.preview(node, &self.graph);
                }
            }
            Feedback::EdgeCreated(_)
            | Feedback::ConnectionRejected(_)
            | Feedback::Deleted { .. } => {}
        }
    }

    fn file_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("File", |ui| {
            let save_label = format!(
                "Save Pipeline to {} (Ctrl+S)",
                self.pipeline.export_path().display()
            );
            if ui.button(save_label).clicked() {
                self.pipeline.save_and_report(&self.graph);
                ui.close_menu();
            }
            if ui.button("Save Settings").clicked() {
                if let Err(e) = self.save_settings() {
                    tracing::error!("{e}");
                }
                ui.close_menu();
            }
            if ui.button("New Pipeline").clicked() {
                self.new_pipeline();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Quit").clicked() {
                self.request_exit = true;
                ui.close_menu();
            }
        });
    }

    fn view_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("View", |ui| {
            ui.menu_button("Panels", |ui| {
                for panel in PanelType::ALL {
                    if ui.button(panel.name()).clicked() {
                        self.open_panel(panel);
                        ui.close_menu();
                    }
                }
            });
            ui.checkbox(&mut self.canvas.show_grid, "Show Grid");
            if ui.button("Reset View").clicked() {
                self.canvas.reset_view();
                ui.close_menu();
            }

            ui.separator();
            if ui.button("Reset Layout").clicked() {
                self.dock_state = Self::create_default_layout();
                ui.close_menu();
            }
        });
    }

    fn new_pipeline(&mut self) {
        self.graph = Graph::new();
        self.canvas.clear_interaction();
        self.details.close();
        tracing::info!("Started a new pipeline");
    }

    fn save_settings(&mut self) -> Result<()> {
        self.settings.interaction = self.canvas.controller().settings().clone();
        let path = EditorSettings::path();
        self.settings.save(&path)?;
        tracing::info!("Settings saved to {}", path.display());
        Ok(())
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let save = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S);
        if ctx.input_mut(|i| i.consume_shortcut(&save)) {
            self.pipeline.save_and_report(&self.graph);
        }
    }

    fn open_panel(&mut self, panel: PanelType) {
        if let Some((surface, node, tab)) = self.dock_state.find_tab(&panel) {
            self.dock_state.set_active_tab((surface, node, tab));
            self.dock_state.set_focused_node_and_surface((surface, node));
        } else {
            self.dock_state.push_to_focused_leaf(panel);
        }
    }
}

/// Main editor application
pub struct EditorApp {
    settings: EditorSettings,
    running: Option<EditorRunning>,
}

impl EditorApp {
    /// Create a new editor application
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            settings,
            running: None,
        }
    }

    /// Run the editor until the window closes
    pub fn run(settings: EditorSettings) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop.run_app(&mut EditorApp::new(settings))?;
        Ok(())
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<EditorRunning> {
        let [width, height] = self.settings.window_size;
        let attributes = Window::default_attributes()
            .with_title("ML Pipeline Editor")
            .with_inner_size(LogicalSize::new(width, height))
            .with_min_inner_size(LogicalSize::new(640, 480));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let renderer = Renderer::new(Arc::clone(&window))?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            window.theme(),
            Some(renderer.max_texture_side()),
        );

        Ok(EditorRunning {
            window,
            renderer,
            egui_ctx,
            egui_state,
            editor: EditorInner::new(&self.settings),
            repaint_at: None,
        })
    }
}

impl ApplicationHandler for EditorApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(running) => {
                tracing::info!(size = ?running.window.inner_size(), "Editor window open");
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(e) => {
                tracing::error!("Editor failed to start: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(running) = &mut self.running else {
            return;
        };

        if running.egui_state.on_window_event(&running.window, &event).repaint {
            running.window.request_redraw();
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => running.renderer.resize(size),
            WindowEvent::RedrawRequested => running.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = &mut self.running else {
            return;
        };

        match running.repaint_at {
            Some(at) if at <= Instant::now() => {
                running.repaint_at = None;
                running.window.request_redraw();
                event_loop.set_control_flow(ControlFlow::Wait);
            }
            Some(at) => event_loop.set_control_flow(ControlFlow::WaitUntil(at)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_editor_graph::interaction::{Modifiers, PointerButton};
    use pipeline_editor_graph::{CanvasEvent, NodeKind, ViewportTransform};

    fn editor() -> EditorInner {
        EditorInner::new(&EditorSettings::default())
    }

    #[test]
    fn test_default_layout_has_every_panel() {
        let dock_state = EditorInner::create_default_layout();
        for panel in PanelType::ALL {
            assert!(dock_state.find_tab(&panel).is_some(), "{panel:?} missing");
        }
    }

    #[test]
    fn test_configure_request_opens_details() {
        let mut editor = editor();
        let id = editor.graph.create_node(NodeKind::Processor, egui::Pos2::ZERO);

        editor.apply_feedback(Feedback::ConfigureRequested(id));

        assert_eq!(editor.details.node(), Some(id));
        assert!(!editor.details.is_dirty(&editor.graph));
    }

    #[test]
    fn test_feedback_for_deleted_node_is_ignored() {
        let mut editor = editor();
        let id = editor.graph.create_node(NodeKind::Metric, egui::Pos2::ZERO);
        editor.graph.delete_node(id);

        editor.apply_feedback(Feedback::ConfigureRequested(id));
        editor.apply_feedback(Feedback::NodeClicked(id));

        assert!(editor.details.node().is_none());
    }

    #[test]
    fn test_new_pipeline_resets_canvas_gestures() {
        let mut editor = editor();
        let id = editor.graph.create_node(NodeKind::Processor, egui::Pos2::ZERO);
        let mut view = ViewportTransform::new();

        editor.canvas.controller_mut().handle(
            CanvasEvent::PointerDown {
                pos: egui::Pos2::new(90.0, 10.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
                time: 1.0,
            },
            &mut editor.graph,
            &mut view,
        );
        assert!(editor.canvas.controller().click_pending());
        editor.details.open(editor.graph.node(id).unwrap());

        editor.new_pipeline();

        assert_eq!(editor.graph.node_count(), 0);
        assert!(editor.canvas.controller().is_idle());
        assert!(!editor.canvas.controller().click_pending());
        assert!(editor.details.node().is_none());
        let feedback = editor.canvas.controller_mut().handle(
            CanvasEvent::Tick { time: 5.0 },
            &mut editor.graph,
            &mut view,
        );
        assert!(feedback.is_empty());
    }

    #[test]
    fn test_frame_renders_headless() {
        let mut editor = editor();
        editor.graph.create_node(NodeKind::Dataset, egui::Pos2::new(40.0, 40.0));

        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| editor.update(ctx));

        assert!(!editor.request_exit);
        assert_eq!(editor.graph.node_count(), 1);
    }
}
