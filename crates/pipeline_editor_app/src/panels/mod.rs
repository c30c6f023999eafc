// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor panel implementations.

mod details;
mod pipeline;

pub use details::DetailsPanel;
pub use pipeline::PipelinePanel;
