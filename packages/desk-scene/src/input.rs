use serde::Serialize;

/// Pointer and UI state shared between event callbacks and the render tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InteractionState {
    pub hovered: bool,
    /// Normalized to [-1, 1]. Recorded on every move but not consumed by the camera.
    pub pointer_x: f32,
    pub pointer_y: f32,
    pub debug_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Enter,
    Leave,
    Move { client_x: f32, client_y: f32 },
    DoubleClick,
}

/// Container bounds in client pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ContainerRect {
    pub fn sized(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width / self.height
        }
    }
}

/// Client coordinates to normalized device coordinates, y up.
pub fn normalize_pointer(rect: &ContainerRect, client_x: f32, client_y: f32) -> Option<(f32, f32)> {
    if rect.is_empty() {
        return None;
    }
    let x = (client_x - rect.left) / rect.width * 2.0 - 1.0;
    let y = -((client_y - rect.top) / rect.height) * 2.0 + 1.0;
    Some((x, y))
}

impl InteractionState {
    /// Apply a pointer event. Returns true if the hover flag changed.
    pub fn apply(&mut self, event: PointerEvent, rect: Option<&ContainerRect>) -> bool {
        match event {
            PointerEvent::Enter => {
                let changed = !self.hovered;
                self.hovered = true;
                changed
            }
            PointerEvent::Leave => {
                let changed = self.hovered;
                self.hovered = false;
                changed
            }
            PointerEvent::Move { client_x, client_y } => {
                if let Some((x, y)) = rect.and_then(|r| normalize_pointer(r, client_x, client_y)) {
                    self.pointer_x = x;
                    self.pointer_y = y;
                }
                false
            }
            PointerEvent::DoubleClick => {
                self.debug_visible = !self.debug_visible;
                false
            }
        }
    }
}

/// New output parameters after a container resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeOutcome {
    pub width: u32,
    pub height: u32,
    pub aspect: f32,
    pub pixel_ratio: f32,
}

/// Fit the output to a container. Zero-sized containers are ignored.
pub fn resize(width: f32, height: f32, device_pixel_ratio: f32, ceiling: f32) -> Option<ResizeOutcome> {
    if !(width >= 1.0 && height >= 1.0) {
        return None;
    }
    Some(ResizeOutcome {
        width: width.round() as u32,
        height: height.round() as u32,
        aspect: width / height,
        pixel_ratio: device_pixel_ratio.min(ceiling),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hover_toggles() {
        let mut state = InteractionState::default();
        assert!(state.apply(PointerEvent::Enter, None));
        assert!(state.hovered);
        assert!(!state.apply(PointerEvent::Enter, None));
        assert!(state.apply(PointerEvent::Leave, None));
        assert!(!state.hovered);
    }

    #[test]
    fn test_pointer_normalization() {
        let rect = ContainerRect {
            left: 100.0,
            top: 50.0,
            width: 800.0,
            height: 600.0,
        };
        assert_eq!(normalize_pointer(&rect, 100.0, 50.0), Some((-1.0, 1.0)));
        assert_eq!(normalize_pointer(&rect, 900.0, 650.0), Some((1.0, -1.0)));
        assert_eq!(normalize_pointer(&rect, 500.0, 350.0), Some((0.0, 0.0)));
    }

    #[test]
    fn test_pointer_move_does_not_touch_hover() {
        let mut state = InteractionState::default();
        let rect = ContainerRect::sized(200.0, 100.0);
        state.apply(PointerEvent::Move { client_x: 150.0, client_y: 25.0 }, Some(&rect));
        assert_eq!((state.pointer_x, state.pointer_y), (0.5, 0.5));
        assert!(!state.hovered);
    }

    #[test]
    fn test_double_click_toggles_debug() {
        let mut state = InteractionState::default();
        state.apply(PointerEvent::DoubleClick, None);
        assert!(state.debug_visible);
        state.apply(PointerEvent::DoubleClick, None);
        assert!(!state.debug_visible);
    }

    #[test]
    fn test_resize_clamps_pixel_ratio() {
        let out = resize(800.0, 600.0, 3.0, 2.0).unwrap();
        assert_eq!((out.width, out.height), (800, 600));
        assert_eq!(out.pixel_ratio, 2.0);
        assert!((out.aspect - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_resize_ignores_zero_size() {
        assert!(resize(0.0, 600.0, 1.0, 2.0).is_none());
        assert!(resize(800.0, 0.0, 1.0, 2.0).is_none());
        assert!(resize(f32::NAN, 10.0, 1.0, 2.0).is_none());
    }
}
