/// Position and size of the opener's window, in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub screen_left: i32,
    pub screen_top: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(screen_left: i32, screen_top: i32, width: u32, height: u32) -> Self {
        Self {
            screen_left,
            screen_top,
            width,
            height,
        }
    }
}

/// Where the popup is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl PopupGeometry {
    /// Center a `width` x `height` popup over the viewport
    ///
    /// A popup larger than the viewport is pinned to the viewport's top-left
    /// corner instead of going off-screen.
    #[must_use]
    pub fn centered(viewport: Viewport, width: u32, height: u32) -> Self {
        let spare_x = i64::from(viewport.width.saturating_sub(width) / 2);
        let spare_y = i64::from(viewport.height.saturating_sub(height) / 2);
        Self {
            left: clamp_i32(i64::from(viewport.screen_left) + spare_x),
            top: clamp_i32(i64::from(viewport.screen_top) + spare_y),
            width,
            height,
        }
    }

    /// Window-features string understood by `window.open`-style hosts
    #[must_use]
    pub fn features(&self) -> String {
        format!(
            "width={},height={},left={},top={},scrollbars=yes,resizable=yes",
            self.width, self.height, self.left, self.top
        )
    }
}

fn clamp_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}
