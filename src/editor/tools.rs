use super::layer::FilterKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Crop,
    Resize,
    Rotate,
    Flip,
    Brightness,
    Contrast,
    Saturate,
    Grayscale,
    Sepia,
    Invert,
    Blur,
    Tint,
    Pixelate,
    Vignette,
    AddText,
    AddShape,
    Sharpen,
    GradientMap,
    Curves,
    Noise,
}

/// Property group a tool edits on the primary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPanel {
    Transform,
    Crop,
    Flip,
    Filter(FilterKind),
    Tint,
    Pixelate,
    Vignette,
    Text,
    Shape,
    GradientMap,
    Curves,
}

impl ToolKind {
    pub const ALL: [ToolKind; 21] = [
        ToolKind::Select,
        ToolKind::Crop,
        ToolKind::Resize,
        ToolKind::Rotate,
        ToolKind::Flip,
        ToolKind::Brightness,
        ToolKind::Contrast,
        ToolKind::Saturate,
        ToolKind::Grayscale,
        ToolKind::Sepia,
        ToolKind::Invert,
        ToolKind::Blur,
        ToolKind::Tint,
        ToolKind::Pixelate,
        ToolKind::Vignette,
        ToolKind::AddText,
        ToolKind::AddShape,
        ToolKind::Sharpen,
        ToolKind::GradientMap,
        ToolKind::Curves,
        ToolKind::Noise,
    ];

    pub const fn panel(self) -> ToolPanel {
        match self {
            Self::Select | Self::Resize | Self::Rotate => ToolPanel::Transform,
            Self::Crop => ToolPanel::Crop,
            Self::Flip => ToolPanel::Flip,
            Self::Brightness => ToolPanel::Filter(FilterKind::Brightness),
            Self::Contrast => ToolPanel::Filter(FilterKind::Contrast),
            Self::Saturate => ToolPanel::Filter(FilterKind::Saturate),
            Self::Grayscale => ToolPanel::Filter(FilterKind::Grayscale),
            Self::Sepia => ToolPanel::Filter(FilterKind::Sepia),
            Self::Invert => ToolPanel::Filter(FilterKind::Invert),
            Self::Blur => ToolPanel::Filter(FilterKind::Blur),
            Self::Sharpen => ToolPanel::Filter(FilterKind::Sharpen),
            Self::Noise => ToolPanel::Filter(FilterKind::Noise),
            Self::Tint => ToolPanel::Tint,
            Self::Pixelate => ToolPanel::Pixelate,
            Self::Vignette => ToolPanel::Vignette,
            Self::AddText => ToolPanel::Text,
            Self::AddShape => ToolPanel::Shape,
            Self::GradientMap => ToolPanel::GradientMap,
            Self::Curves => ToolPanel::Curves,
        }
    }

    pub const fn filter_kind(self) -> Option<FilterKind> {
        match self.panel() {
            ToolPanel::Filter(kind) => Some(kind),
            _ => None,
        }
    }

    /// Resize and rotate handles are only interactive under the select tool.
    pub const fn shows_handles(self) -> bool {
        matches!(self, Self::Select)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Select => "Select/Move",
            Self::Crop => "Crop",
            Self::Resize => "Resize",
            Self::Rotate => "Rotate",
            Self::Flip => "Flip",
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Saturate => "Saturation",
            Self::Grayscale => "Grayscale",
            Self::Sepia => "Sepia",
            Self::Invert => "Invert",
            Self::Blur => "Blur",
            Self::Tint => "Color Tint",
            Self::Pixelate => "Pixelate",
            Self::Vignette => "Vignette",
            Self::AddText => "Add/Edit Text",
            Self::AddShape => "Add Shape",
            Self::Sharpen => "Sharpen",
            Self::GradientMap => "Gradient Map",
            Self::Curves => "Curves",
            Self::Noise => "Add Noise",
        }
    }

    pub fn from_shortcut(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'v' => Some(Self::Select),
            'c' => Some(Self::Crop),
            'r' => Some(Self::Rotate),
            't' => Some(Self::AddText),
            's' => Some(Self::AddShape),
            _ => None,
        }
    }
}
