use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rect {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }
}

/// Vertical band occupied by one lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneBand {
    pub lane_id: String,
    pub index: usize,
    pub top: f32,
    pub height: f32,
}

impl LaneBand {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Inclusive at both edges.
    pub fn contains_y(&self, y: f32) -> bool {
        y >= self.top && y <= self.bottom()
    }
}

/// Horizontal extent of one phase, left edge to its boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSpan {
    pub phase_id: String,
    pub name: String,
    pub start: f32,
    pub end: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub lanes: Vec<LaneBand>,
    pub phases: Vec<PhaseSpan>,
    pub nodes: BTreeMap<String, Point>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    /// First lane whose band contains `y`. Gutters belong to no lane.
    pub fn lane_at(&self, y: f32) -> Option<&LaneBand> {
        self.lanes.iter().find(|band| band.contains_y(y))
    }

    pub fn node_center(&self, node_id: &str) -> Option<Point> {
        self.nodes.get(node_id).copied()
    }
}
