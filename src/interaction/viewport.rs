use super::events::ScreenPoint;
use crate::config::EditorConfig;
use crate::layout::{Point, Rect};

/// Maps the canvas onto the host element: a view box in canvas units shown
/// in a client area measured in device pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    view_box: Rect,
    client_width: f32,
    client_height: f32,
    min_width: f32,
    max_width: f32,
}

impl Viewport {
    pub fn new(view_box: Rect, client_width: f32, client_height: f32, config: &EditorConfig) -> Self {
        Self {
            view_box,
            client_width,
            client_height,
            min_width: config.min_view_width,
            max_width: config.max_view_width,
        }
    }

    pub fn view_box(&self) -> Rect {
        self.view_box
    }

    pub fn client_size(&self) -> (f32, f32) {
        (self.client_width, self.client_height)
    }

    pub fn set_client_size(&mut self, width: f32, height: f32) {
        self.client_width = width;
        self.client_height = height;
    }

    /// Canvas units per device pixel on each axis.
    pub fn scale(&self) -> (f32, f32) {
        let sx = if self.client_width > 0.0 {
            self.view_box.width / self.client_width
        } else {
            1.0
        };
        let sy = if self.client_height > 0.0 {
            self.view_box.height / self.client_height
        } else {
            1.0
        };
        (sx, sy)
    }

    pub fn screen_to_canvas(&self, point: ScreenPoint) -> Point {
        let (sx, sy) = self.scale();
        Point::new(
            self.view_box.x + point.x * sx,
            self.view_box.y + point.y * sy,
        )
    }

    pub fn canvas_to_screen(&self, point: Point) -> ScreenPoint {
        let (sx, sy) = self.scale();
        ScreenPoint::new(
            (point.x - self.view_box.x) / sx,
            (point.y - self.view_box.y) / sy,
        )
    }

    /// Moves the view by a pointer delta in device pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let (sx, sy) = self.scale();
        self.view_box.x -= dx * sx;
        self.view_box.y -= dy * sy;
    }

    /// Zooms about the view center.
    pub fn zoom(&mut self, factor: f32) -> bool {
        let center = ScreenPoint::new(self.client_width / 2.0, self.client_height / 2.0);
        self.zoom_at(factor, center)
    }

    /// Zooms keeping the canvas point under `anchor` fixed. A factor above 1
    /// zooms in. The view is left unchanged when the resulting width would
    /// leave the allowed range.
    pub fn zoom_at(&mut self, factor: f32, anchor: ScreenPoint) -> bool {
        if factor <= 0.0 || !factor.is_finite() {
            return false;
        }
        let width = self.view_box.width / factor;
        let height = self.view_box.height / factor;
        if width < self.min_width || width > self.max_width {
            return false;
        }
        let fixed = self.screen_to_canvas(anchor);
        let (fx, fy) = if self.client_width > 0.0 && self.client_height > 0.0 {
            (anchor.x / self.client_width, anchor.y / self.client_height)
        } else {
            (0.5, 0.5)
        };
        self.view_box = Rect {
            x: fixed.x - fx * width,
            y: fixed.y - fy * height,
            width,
            height,
        };
        true
    }

    /// Frames `bounds` with `padding` canvas units on every side.
    pub fn fit_to(&mut self, bounds: Rect, padding: f32) {
        self.view_box = Rect {
            x: bounds.x - padding,
            y: bounds.y - padding,
            width: bounds.width + padding * 2.0,
            height: bounds.height + padding * 2.0,
        };
    }

    /// Value for an SVG `viewBox` attribute.
    pub fn view_box_attr(&self) -> String {
        format!(
            "{} {} {} {}",
            self.view_box.x, self.view_box.y, self.view_box.width, self.view_box.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(
            Rect {
                x: 0.0,
                y: 0.0,
                width: 1440.0,
                height: 800.0,
            },
            720.0,
            400.0,
            &EditorConfig::default(),
        )
    }

    #[test]
    fn screen_maps_through_scale() {
        let view = viewport();
        assert_eq!(
            view.screen_to_canvas(ScreenPoint::new(100.0, 50.0)),
            Point::new(200.0, 100.0)
        );
        assert_eq!(
            view.canvas_to_screen(Point::new(200.0, 100.0)),
            ScreenPoint::new(100.0, 50.0)
        );
    }

    #[test]
    fn pan_moves_opposite_to_drag() {
        let mut view = viewport();
        view.pan(10.0, -5.0);
        assert_eq!(view.view_box().x, -20.0);
        assert_eq!(view.view_box().y, 10.0);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut view = viewport();
        let anchor = ScreenPoint::new(180.0, 100.0);
        let before = view.screen_to_canvas(anchor);
        assert!(view.zoom_at(2.0, anchor));
        assert_eq!(view.view_box().width, 720.0);
        let after = view.screen_to_canvas(anchor);
        assert!(before.distance(after) < 1e-3);
    }

    #[test]
    fn zoom_outside_range_is_rejected() {
        let mut view = viewport();
        assert!(!view.zoom_at(10.0, ScreenPoint::new(0.0, 0.0)));
        assert!(!view.zoom_at(0.1, ScreenPoint::new(0.0, 0.0)));
        assert_eq!(view.view_box().width, 1440.0);
    }

    #[test]
    fn fit_adds_padding() {
        let mut view = viewport();
        view.fit_to(
            Rect {
                x: 20.0,
                y: 50.0,
                width: 1400.0,
                height: 290.0,
            },
            20.0,
        );
        assert_eq!(view.view_box_attr(), "0 30 1440 330");
    }
}
