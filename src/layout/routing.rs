use crate::config::LayoutConfig;

use super::Point;

/// Geometry of a connection between two node centers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionPath {
    /// Endpoints on (nearly) the same row.
    Straight { start: Point, end: Point },
    /// Anchors would cross: out, across at `turn_x`, and back in.
    Detour { start: Point, end: Point, turn_x: f32 },
    /// Long horizontal gap: cubic Bézier with horizontal tangents.
    Cubic {
        start: Point,
        control1: Point,
        control2: Point,
        end: Point,
    },
    /// Short gap: quadratic into the midpoint, smooth continuation out.
    Smooth { start: Point, mid: Point, end: Point },
}

impl ConnectionPath {
    pub fn start(&self) -> Point {
        match self {
            Self::Straight { start, .. }
            | Self::Detour { start, .. }
            | Self::Cubic { start, .. }
            | Self::Smooth { start, .. } => *start,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Self::Straight { end, .. }
            | Self::Detour { end, .. }
            | Self::Cubic { end, .. }
            | Self::Smooth { end, .. } => *end,
        }
    }

    /// SVG path data.
    pub fn to_svg_d(&self) -> String {
        match self {
            Self::Straight { start, end } => format!(
                "M {} {} L {} {}",
                fmt_num(start.x),
                fmt_num(start.y),
                fmt_num(end.x),
                fmt_num(end.y)
            ),
            Self::Detour { start, end, turn_x } => format!(
                "M {} {} L {} {} L {} {} L {} {}",
                fmt_num(start.x),
                fmt_num(start.y),
                fmt_num(*turn_x),
                fmt_num(start.y),
                fmt_num(*turn_x),
                fmt_num(end.y),
                fmt_num(end.x),
                fmt_num(end.y)
            ),
            Self::Cubic {
                start,
                control1,
                control2,
                end,
            } => format!(
                "M {} {} C {} {}, {} {}, {} {}",
                fmt_num(start.x),
                fmt_num(start.y),
                fmt_num(control1.x),
                fmt_num(control1.y),
                fmt_num(control2.x),
                fmt_num(control2.y),
                fmt_num(end.x),
                fmt_num(end.y)
            ),
            Self::Smooth { start, mid, end } => format!(
                "M {} {} Q {} {}, {} {} T {} {}",
                fmt_num(start.x),
                fmt_num(start.y),
                fmt_num(mid.x),
                fmt_num(start.y),
                fmt_num(mid.x),
                fmt_num(mid.y),
                fmt_num(end.x),
                fmt_num(end.y)
            ),
        }
    }

    /// Polyline approximation, used for hit testing. Curves are sampled
    /// `steps` times per piece.
    pub fn flatten(&self, steps: usize) -> Vec<Point> {
        let steps = steps.max(1);
        match self {
            Self::Straight { start, end } => vec![*start, *end],
            Self::Detour { start, end, turn_x } => vec![
                *start,
                Point::new(*turn_x, start.y),
                Point::new(*turn_x, end.y),
                *end,
            ],
            Self::Cubic {
                start,
                control1,
                control2,
                end,
            } => (0..=steps)
                .map(|i| cubic_at(*start, *control1, *control2, *end, i as f32 / steps as f32))
                .collect(),
            Self::Smooth { start, mid, end } => {
                let first = Point::new(mid.x, start.y);
                let reflected = Point::new(2.0 * mid.x - first.x, 2.0 * mid.y - first.y);
                let mut points: Vec<Point> = (0..=steps)
                    .map(|i| quad_at(*start, first, *mid, i as f32 / steps as f32))
                    .collect();
                points.extend(
                    (1..=steps).map(|i| quad_at(*mid, reflected, *end, i as f32 / steps as f32)),
                );
                points
            }
        }
    }

    /// Number of straight or curved pieces the path is drawn with.
    pub fn segment_count(&self) -> usize {
        match self {
            Self::Straight { .. } | Self::Cubic { .. } => 1,
            Self::Smooth { .. } => 2,
            Self::Detour { .. } => 3,
        }
    }
}

/// Routes a connection between two node centers.
///
/// The source leaves from its right anchor when the target lies to the
/// right, otherwise from its left anchor; the target mirrors that choice.
pub fn compute_connection_path(from: Point, to: Point, config: &LayoutConfig) -> ConnectionPath {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let anchor = config.anchor_offset;

    let (start, end) = if dx > 0.0 {
        (
            Point::new(from.x + anchor, from.y),
            Point::new(to.x - anchor, to.y),
        )
    } else {
        (
            Point::new(from.x - anchor, from.y),
            Point::new(to.x + anchor, to.y),
        )
    };

    if dy.abs() < config.straight_threshold {
        return ConnectionPath::Straight { start, end };
    }

    let crossing = (dx > 0.0 && end.x < start.x) || (dx < 0.0 && end.x > start.x);
    if crossing {
        let offset = config.detour_min.max(dx.abs() * config.detour_ratio);
        let turn_x = if dx > 0.0 {
            start.x + offset
        } else {
            start.x - offset
        };
        return ConnectionPath::Detour { start, end, turn_x };
    }

    let gap = (end.x - start.x).abs();
    if gap > config.curve_gap_threshold {
        let control = (gap * 0.5).min(config.max_control_offset);
        let (out, back) = if dx > 0.0 {
            (control, -control)
        } else {
            (-control, control)
        };
        ConnectionPath::Cubic {
            start,
            control1: Point::new(start.x + out, start.y),
            control2: Point::new(end.x + back, end.y),
            end,
        }
    } else {
        ConnectionPath::Smooth {
            start,
            mid: start.midpoint(end),
            end,
        }
    }
}

/// Anchor point for a connection's label and badges.
pub fn connection_midpoint(from: Point, to: Point) -> Point {
    from.midpoint(to)
}

fn quad_at(p0: Point, p1: Point, p2: Point, t: f32) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * p0.x + 2.0 * u * t * p1.x + t * t * p2.x,
        u * u * p0.y + 2.0 * u * t * p1.y + t * t * p2.y,
    )
}

fn cubic_at(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let u = 1.0 - t;
    let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

/// Formats a coordinate without trailing zeros ("135", "52.5").
pub(crate) fn fmt_num(value: f32) -> String {
    if value.fract() == 0.0 && value.abs() < 1e9 {
        return format!("{}", value as i64);
    }
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(from: (f32, f32), to: (f32, f32)) -> ConnectionPath {
        compute_connection_path(
            Point::new(from.0, from.1),
            Point::new(to.0, to.1),
            &LayoutConfig::default(),
        )
    }

    #[test]
    fn aligned_nodes_get_a_straight_line() {
        let path = route((100.0, 120.0), (500.0, 124.0));
        assert_eq!(path.to_svg_d(), "M 135 120 L 465 124");
        assert_eq!(path.segment_count(), 1);
    }

    #[test]
    fn leftward_connection_uses_left_anchor() {
        let path = route((500.0, 120.0), (100.0, 120.0));
        assert_eq!(path.start(), Point::new(465.0, 120.0));
        assert_eq!(path.end(), Point::new(135.0, 120.0));
    }

    #[test]
    fn crossing_anchors_detour() {
        let path = route((100.0, 120.0), (50.0, 270.0));
        let ConnectionPath::Detour { start, end, turn_x } = path else {
            panic!("expected detour, got {path:?}");
        };
        assert_eq!(start, Point::new(65.0, 120.0));
        assert_eq!(end, Point::new(85.0, 270.0));
        assert_eq!(turn_x, 15.0);
    }

    #[test]
    fn detour_offset_has_a_floor() {
        let path = route((100.0, 120.0), (160.0, 270.0));
        let ConnectionPath::Detour { turn_x, .. } = path else {
            panic!("expected detour, got {path:?}");
        };
        assert_eq!(turn_x, 185.0);
    }

    #[test]
    fn long_gap_is_cubic_with_capped_control() {
        let path = route((100.0, 120.0), (800.0, 270.0));
        let ConnectionPath::Cubic {
            control1, control2, ..
        } = path
        else {
            panic!("expected cubic, got {path:?}");
        };
        assert_eq!(control1, Point::new(285.0, 120.0));
        assert_eq!(control2, Point::new(615.0, 270.0));
    }

    #[test]
    fn short_gap_is_smooth() {
        let path = route((100.0, 120.0), (240.0, 270.0));
        assert!(matches!(path, ConnectionPath::Smooth { .. }));
        assert_eq!(path.to_svg_d(), "M 135 120 Q 170 120, 170 195 T 205 270");
    }

    #[test]
    fn routing_is_deterministic() {
        assert_eq!(route((10.0, 0.0), (700.0, 90.0)), route((10.0, 0.0), (700.0, 90.0)));
    }

    #[test]
    fn flattened_curves_keep_their_endpoints() {
        for path in [
            route((100.0, 120.0), (800.0, 270.0)),
            route((100.0, 120.0), (240.0, 270.0)),
            route((100.0, 120.0), (50.0, 270.0)),
        ] {
            let points = path.flatten(8);
            assert_eq!(points.first().copied(), Some(path.start()));
            let last = points.last().copied().unwrap();
            assert!(last.distance(path.end()) < 1e-3);
        }
    }

    #[test]
    fn formats_fractions() {
        assert_eq!(fmt_num(52.5), "52.5");
        assert_eq!(fmt_num(-3.0), "-3");
        assert_eq!(fmt_num(1.256), "1.26");
    }
}
