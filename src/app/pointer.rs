use glam::Vec2;

/// Press-to-release travel, in logical pixels, below which a release counts
/// as a click.
pub(super) const CLICK_THRESHOLD_PX: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum PointerRelease {
    Click(Vec2),
    Drag,
    /// The press started over a UI panel, or there was no press.
    Ignored,
}

/// Splits left-button gestures into orbit drags and selection clicks.
/// Positions are physical pixels; `scale_factor` converts the threshold.
#[derive(Debug, Default)]
pub(super) struct PointerTracker {
    cursor: Vec2,
    pressed_at: Option<Vec2>,
}

impl PointerTracker {
    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    pub fn press(&mut self) {
        self.pressed_at = Some(self.cursor);
    }

    /// Records the new cursor position. Returns the movement since the last
    /// call while the button is held.
    pub fn moved(&mut self, position: Vec2) -> Option<Vec2> {
        let delta = position - self.cursor;
        self.cursor = position;
        self.pressed_at.map(|_| delta)
    }

    pub fn release(&mut self, scale_factor: f32) -> PointerRelease {
        let Some(start) = self.pressed_at.take() else {
            return PointerRelease::Ignored;
        };
        if start.distance(self.cursor) < CLICK_THRESHOLD_PX * scale_factor.max(f32::EPSILON) {
            PointerRelease::Click(self.cursor)
        } else {
            PointerRelease::Drag
        }
    }

    pub fn cancel(&mut self) {
        self.pressed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_travel_is_a_click() {
        let mut pointer = PointerTracker::default();
        pointer.moved(Vec2::new(100.0, 100.0));
        pointer.press();
        pointer.moved(Vec2::new(103.0, 102.0));
        assert_eq!(pointer.release(1.0), PointerRelease::Click(Vec2::new(103.0, 102.0)));
    }

    #[test]
    fn long_travel_is_a_drag() {
        let mut pointer = PointerTracker::default();
        pointer.press();
        assert_eq!(pointer.moved(Vec2::new(4.0, 4.0)), Some(Vec2::new(4.0, 4.0)));
        assert_eq!(pointer.release(1.0), PointerRelease::Drag);
    }

    #[test]
    fn threshold_scales_with_dpi() {
        let mut pointer = PointerTracker::default();
        pointer.press();
        pointer.moved(Vec2::new(8.0, 0.0));
        assert_eq!(pointer.release(2.0), PointerRelease::Click(Vec2::new(8.0, 0.0)));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut pointer = PointerTracker::default();
        assert_eq!(pointer.moved(Vec2::ONE), None);
        assert_eq!(pointer.release(1.0), PointerRelease::Ignored);
        pointer.press();
        pointer.cancel();
        assert!(!pointer.is_pressed());
    }
}
