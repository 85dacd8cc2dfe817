//! The host element the widget draws into.

/// Padding around the drawable area, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Padding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Padding {
    pub fn uniform(px: u32) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }
}

/// Size of the host element. The canvas fills its content box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Container {
    pub client_width: u32,
    pub client_height: u32,
    pub padding: Padding,
}

impl Container {
    pub fn new(client_width: u32, client_height: u32) -> Self {
        Self {
            client_width,
            client_height,
            padding: Padding::default(),
        }
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Client size minus padding.
    pub fn inner_dimensions(&self) -> (u32, u32) {
        let width = self
            .client_width
            .saturating_sub(self.padding.left + self.padding.right);
        let height = self
            .client_height
            .saturating_sub(self.padding.top + self.padding.bottom);
        (width, height)
    }
}
