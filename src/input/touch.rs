//! Registry of user-placed touch anchors

/// A point driving a transient waveform, normalized with origin bottom-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchAnchor {
    pub x: f32,
    pub y: f32,
    pub pressure: i32,
}

impl TouchAnchor {
    fn distance_sq(&self, x: f32, y: f32) -> f32 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// Active touch anchors, most recent last
#[derive(Debug, Default, Clone)]
pub struct TouchAnchors {
    anchors: Vec<TouchAnchor>,
}

impl TouchAnchors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a pixel position to normalized coordinates with y flipped up
    pub fn normalize(x: i32, y: i32, width: i32, height: i32) -> (f32, f32) {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        (x as f32 / width, (height - y as f32) / height)
    }

    pub fn touch(&mut self, x: f32, y: f32, pressure: i32) {
        self.anchors.push(TouchAnchor { x, y, pressure });
    }

    /// Move the most recent anchor; returns false when there is none
    pub fn drag(&mut self, x: f32, y: f32, pressure: i32) -> bool {
        match self.anchors.last_mut() {
            Some(anchor) => {
                *anchor = TouchAnchor { x, y, pressure };
                true
            }
            None => false,
        }
    }

    /// Remove the anchor nearest to (x, y)
    pub fn destroy_nearest(&mut self, x: f32, y: f32) -> Option<TouchAnchor> {
        let index = self
            .anchors
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance_sq(x, y).total_cmp(&b.distance_sq(x, y)))
            .map(|(index, _)| index)?;
        Some(self.anchors.remove(index))
    }

    pub fn destroy_all(&mut self) {
        self.anchors.clear();
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TouchAnchor> {
        self.anchors.iter()
    }
}
