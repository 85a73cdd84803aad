//! Default box sizes

use crate::kind::NodeKind;
use crate::node::ViewMode;

/// Label given to folders created without one
pub const DEFAULT_FOLDER_LABEL: &str = "Folder";

/// Width and height of a box, in canvas units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSize {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoxSize {
    /// Create a size
    #[inline]
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Default size for a freshly created node of `kind`
    #[must_use]
    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Generator => Self::new(320.0, 400.0),
            NodeKind::Content => Self::new(280.0, 200.0),
            NodeKind::Component | NodeKind::Iframe => Self::for_view_mode(ViewMode::Mobile),
            NodeKind::Data2Ui => Self::new(340.0, 220.0),
            NodeKind::Folder => Self::new(320.0, 240.0),
        }
    }

    /// Frame size of a component or iframe box in the given view mode
    #[inline]
    #[must_use]
    pub fn for_view_mode(mode: ViewMode) -> Self {
        match mode {
            ViewMode::Mobile => Self::new(390.0, 844.0),
            ViewMode::Laptop => Self::new(1280.0, 720.0),
        }
    }
}
