// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared panel type definitions.

/// Panel types that can be docked in the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelType {
    /// Pipeline graph canvas
    Canvas,
    /// Configuration form for the open node
    Details,
    /// Export preview of the whole pipeline
    Pipeline,
}

impl PanelType {
    /// All panel types, in default layout order
    pub const ALL: [PanelType; 3] = [Self::Canvas, Self::Details, Self::Pipeline];

    /// Get the display name for this panel type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Canvas => "Canvas",
            Self::Details => "Details",
            Self::Pipeline => "Pipeline",
        }
    }

    /// Get the icon for this panel type
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Canvas => "\u{1f500}",   // branch
            Self::Details => "\u{2699}",   // cog
            Self::Pipeline => "\u{1f4c4}", // page
        }
    }
}
