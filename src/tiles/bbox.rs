//! Tile/bbox math (spec.md §4.3 steps 3 and 6).
//!
//! Grounded on `examples/original_source/tiles/tile.go::tileToBBox` for the
//! core Web Mercator -> EPSG:4326 conversion.

use std::f64::consts::PI;

/// An EPSG:4326 bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn contains(&self, other: &BBox) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }
}

/// Converts a Web Mercator tile `(z, x, y)` to its EPSG:4326 bounding box.
pub fn tile_to_bbox(z: u8, x: u32, y: u32) -> BBox {
    let n = 2f64.powi(z as i32);
    let min_x = x as f64 / n * 360.0 - 180.0;
    let max_x = (x as f64 + 1.0) / n * 360.0 - 180.0;
    let max_y = lat_from_mercator_row(y as f64, n);
    let min_y = lat_from_mercator_row(y as f64 + 1.0, n);
    BBox { min_x, min_y, max_x, max_y }
}

fn lat_from_mercator_row(row: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * row / n)).sinh().atan() * 180.0 / PI
}

/// Expands a bbox's spans by `buffer / extent` on each side, for row
/// selection without affecting MVT clip geometry (spec.md §4.3 step 3).
pub fn buffered_bbox(bbox: &BBox, buffer: f64, extent: f64) -> BBox {
    let fraction = buffer / extent;
    let span_x = bbox.max_x - bbox.min_x;
    let span_y = bbox.max_y - bbox.min_y;
    BBox {
        min_x: bbox.min_x - fraction * span_x,
        min_y: bbox.min_y - fraction * span_y,
        max_x: bbox.max_x + fraction * span_x,
        max_y: bbox.max_y + fraction * span_y,
    }
}

/// `ST_ClusterDBSCAN` `eps` radius in degrees for a target 50px pixel
/// radius at the tile's center latitude (spec.md §4.3 step 6).
pub fn cluster_radius_degrees(z: u8, center_lat_deg: f64) -> f64 {
    const TARGET_PIXEL_RADIUS: f64 = 50.0;
    const EARTH_CIRCUMFERENCE_AT_EQUATOR_PER_PIXEL_Z0: f64 = 156_543.03;
    const METERS_PER_DEGREE: f64 = 111_320.0;

    let lat_rad = center_lat_deg.to_radians();
    TARGET_PIXEL_RADIUS * EARTH_CIRCUMFERENCE_AT_EQUATOR_PER_PIXEL_Z0 * lat_rad.cos()
        / 2f64.powi(z as i32)
        / METERS_PER_DEGREE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_to_bbox_matches_known_values() {
        let bbox = tile_to_bbox(0, 0, 0);
        assert!((bbox.min_x - (-180.0)).abs() < 1e-9);
        assert!((bbox.max_x - 180.0).abs() < 1e-9);
        assert!(bbox.min_y < -85.0);
        assert!(bbox.max_y > 85.0);
    }

    #[test]
    fn round_trip_bbox_contains_original() {
        // Property 8: tileToBBox(tileFromBBox(b, z)) contains b for b within one tile.
        let z = 10;
        let x = 603;
        let y = 367;
        let bbox = tile_to_bbox(z, x, y);

        let mid_x = (bbox.min_x + bbox.max_x) / 2.0;
        let mid_y = (bbox.min_y + bbox.max_y) / 2.0;
        let inner = BBox {
            min_x: mid_x - 0.001,
            min_y: mid_y - 0.001,
            max_x: mid_x + 0.001,
            max_y: mid_y + 0.001,
        };
        assert!(bbox.contains(&inner));
    }

    #[test]
    fn buffered_bbox_expands_without_changing_center() {
        let bbox = tile_to_bbox(10, 603, 367);
        let buffered = buffered_bbox(&bbox, 256.0, 4096.0);

        assert!(buffered.min_x < bbox.min_x);
        assert!(buffered.max_x > bbox.max_x);
        assert!(buffered.min_y < bbox.min_y);
        assert!(buffered.max_y > bbox.max_y);

        let orig_center = (bbox.min_x + bbox.max_x) / 2.0;
        let buf_center = (buffered.min_x + buffered.max_x) / 2.0;
        assert!((orig_center - buf_center).abs() < 1e-9);
    }

    #[test]
    fn cluster_radius_shrinks_with_zoom() {
        let r6 = cluster_radius_degrees(6, 0.0);
        let r10 = cluster_radius_degrees(10, 0.0);
        assert!(r10 < r6);
        assert!(r6 > 0.0);
    }

    #[test]
    fn cluster_radius_shrinks_towards_poles() {
        let r_equator = cluster_radius_degrees(6, 0.0);
        let r_high_lat = cluster_radius_degrees(6, 60.0);
        assert!(r_high_lat < r_equator);
    }
}
