// SPDX-License-Identifier: MIT OR Apache-2.0
//! ML Pipeline Editor
//!
//! Compose machine-learning pipelines visually:
//! - Dataset, processor, model and metric stages on a pannable canvas
//! - Click-to-connect edges with kind validation
//! - Catalog-backed configuration form per stage
//! - JSON export of the finished pipeline
//!
//! ## Architecture
//!
//! The graph model and canvas live in `pipeline_editor_graph`; this binary
//! hosts them in a winit/wgpu window with `egui_dock` panels.

mod app;
mod catalog;
mod panel_types;
mod panels;
mod settings;

use app::EditorApp;
use settings::EditorSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "pipeline_editor_app=debug,pipeline_editor_graph=debug,wgpu=warn,naga=warn";

fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ML Pipeline Editor v{}", env!("CARGO_PKG_VERSION"));

    let settings = EditorSettings::load_or_default();

    if let Err(e) = EditorApp::run(settings) {
        tracing::error!("Editor crashed: {e}");
        std::process::exit(1);
    }
}
