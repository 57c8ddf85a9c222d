// THEORY:
// The `detect` module is the perception layer of the engine. It takes one
// grayscale frame and answers a single question: which QR codes are visible,
// and where? Everything downstream (overlay drawing, announcement audio) is
// driven purely by the `Detection` values produced here.
//
// Key architectural principles:
// 1.  **Pure Transformation**: `scan_frame` is a frame-in, detections-out
//     function with no retained state. Each frame is scanned from scratch, so
//     a code that stays in view keeps announcing on every frame it appears in.
// 2.  **Tolerant Decoding**: a grid that is located but cannot be decoded (a
//     damaged or partially occluded code) is simply skipped. Shoppers wave
//     crumpled receipts at the counter camera all day; that must never take
//     the scanner down.
// 3.  **Geometry Lives With The Data**: `Detection` knows how to describe its
//     own overlay (`outline`, `label_anchor`), keeping the rendering side a
//     dumb mapping from geometry to draw calls.

use image::GrayImage;
use rqrr::PreparedImage;
use tracing::debug;

/// How far above the polygon's first vertex the label is anchored, in pixels.
const LABEL_RAISE_PX: i32 = 10;

/// A point in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A single decoded QR code found in a frame.
#[derive(Debug, Clone)]
pub struct Detection {
    /// The decoded text payload.
    pub text: String,
    /// Bounding polygon vertices in frame coordinates, in decoder order.
    pub polygon: Vec<Point>,
}

impl Detection {
    /// The closed outline of the bounding polygon: each vertex joined to the
    /// next, and the last joined back to the first. A polygon with fewer than
    /// two vertices has no outline.
    pub fn outline(&self) -> Vec<(Point, Point)> {
        let n = self.polygon.len();
        if n < 2 {
            return Vec::new();
        }
        (0..n)
            .map(|i| (self.polygon[i], self.polygon[(i + 1) % n]))
            .collect()
    }

    /// Where the on-frame label sits: the first polygon vertex, raised by
    /// `LABEL_RAISE_PX`. `None` if the polygon is empty.
    pub fn label_anchor(&self) -> Option<Point> {
        self.polygon
            .first()
            .map(|p| Point::new(p.x, p.y - LABEL_RAISE_PX))
    }
}

/// Decodes every QR code visible in a grayscale frame.
///
/// Grids that fail to decode are dropped; they never produce a detection and
/// never fail the scan.
pub fn scan_frame(frame: GrayImage) -> Vec<Detection> {
    let mut prepared = PreparedImage::prepare(frame);
    let grids = prepared.detect_grids();

    let mut detections = Vec::with_capacity(grids.len());
    for grid in grids {
        match grid.decode() {
            Ok((_, text)) => {
                let polygon = grid.bounds.iter().map(|p| Point::new(p.x, p.y)).collect();
                detections.push(Detection { text, polygon });
            }
            Err(e) => {
                debug!("skipping undecodable QR grid: {e}");
            }
        }
    }
    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Detection {
        Detection {
            text: "A1".into(),
            polygon: vec![
                Point::new(100, 200),
                Point::new(180, 200),
                Point::new(180, 280),
                Point::new(100, 280),
            ],
        }
    }

    #[test]
    fn outline_closes_the_polygon() {
        let d = square();
        let outline = d.outline();
        assert_eq!(outline.len(), 4);
        assert_eq!(outline[0], (Point::new(100, 200), Point::new(180, 200)));
        assert_eq!(outline[3], (Point::new(100, 280), Point::new(100, 200)));
    }

    #[test]
    fn outline_of_a_triangle_has_three_segments() {
        let d = Detection {
            text: "t".into(),
            polygon: vec![Point::new(0, 0), Point::new(4, 0), Point::new(2, 3)],
        };
        let outline = d.outline();
        assert_eq!(outline.len(), 3);
        assert_eq!(outline[2], (Point::new(2, 3), Point::new(0, 0)));
    }

    #[test]
    fn degenerate_polygons_have_no_outline() {
        let d = Detection {
            text: "x".into(),
            polygon: vec![Point::new(5, 5)],
        };
        assert!(d.outline().is_empty());
    }

    #[test]
    fn label_sits_above_the_first_vertex() {
        let d = square();
        assert_eq!(d.label_anchor(), Some(Point::new(100, 190)));
    }

    #[test]
    fn empty_polygon_has_no_label_anchor() {
        let d = Detection {
            text: "x".into(),
            polygon: Vec::new(),
        };
        assert_eq!(d.label_anchor(), None);
    }

    #[test]
    fn blank_frame_yields_no_detections() {
        let frame = GrayImage::new(640, 480);
        assert!(scan_frame(frame).is_empty());
    }
}
