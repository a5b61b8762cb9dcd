//! Map provider: a Web Mercator view that projects `(lon, lat)` into dot
//! space, fits itself to a set of points, and counts its moves so overlays
//! know when to re-project.

use log::debug;

use crate::config::MapConfig;
use crate::types::Point;

const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    /// `(lon, lat)`
    center: (f64, f64),
    zoom: f64,
    tile_size: f64,
    width: f64,
    height: f64,
    /// Top-left of the map area in dot space.
    origin: Point,
    generation: u64,
}

impl MapView {
    pub fn new(config: &MapConfig, origin: Point, width: f64, height: f64) -> Self {
        MapView {
            center: (config.center[0], config.center[1]),
            zoom: config.zoom,
            tile_size: config.tile_size.max(1.0),
            width,
            height,
            origin,
            generation: 0,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Incremented on every move or zoom.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn world_size(&self) -> f64 {
        self.tile_size * 2f64.powf(self.zoom)
    }

    pub fn project(&self, lon: f64, lat: f64) -> Point {
        let world = self.world_size();
        let (x, y) = mercator(lon, lat);
        let (cx, cy) = mercator(self.center.0, self.center.1);
        Point::new(
            self.origin.x + self.width / 2.0 + (x - cx) * world,
            self.origin.y + self.height / 2.0 + (y - cy) * world,
        )
    }

    pub fn unproject(&self, point: Point) -> (f64, f64) {
        let world = self.world_size();
        let (cx, cy) = mercator(self.center.0, self.center.1);
        let x = cx + (point.x - self.origin.x - self.width / 2.0) / world;
        let y = cy + (point.y - self.origin.y - self.height / 2.0) / world;
        inverse_mercator(x, y)
    }

    pub fn jump_to(&mut self, center: (f64, f64), zoom: f64) {
        self.center = center;
        self.zoom = zoom;
        self.generation += 1;
    }

    pub fn resize(&mut self, origin: Point, width: f64, height: f64) {
        self.origin = origin;
        self.width = width;
        self.height = height;
        self.generation += 1;
    }

    /// Center on the bounds of `points` and pick the largest zoom at which
    /// they fit inside the view less `padding` on every side.
    pub fn fit_bounds(&mut self, points: &[(f64, f64)], padding: f64) {
        let Some(first) = points.first() else {
            return;
        };
        let (mut x0, mut y0) = mercator(first.0, first.1);
        let (mut x1, mut y1) = (x0, y0);
        for &(lon, lat) in &points[1..] {
            let (x, y) = mercator(lon, lat);
            x0 = x0.min(x);
            x1 = x1.max(x);
            y0 = y0.min(y);
            y1 = y1.max(y);
        }
        let avail_w = (self.width - 2.0 * padding).max(1.0);
        let avail_h = (self.height - 2.0 * padding).max(1.0);
        let span_w = (x1 - x0).max(1e-12);
        let span_h = (y1 - y0).max(1e-12);
        let scale = (avail_w / span_w).min(avail_h / span_h);
        let zoom = (scale / self.tile_size).log2().clamp(0.0, 22.0);
        let center = inverse_mercator((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        debug!("map fit to {} points: center {center:?}, zoom {zoom:.2}", points.len());
        self.jump_to(center, zoom);
    }

    /// Meridians and parallels every `step` degrees over the visible area,
    /// as polylines in dot space.
    pub fn graticule(&self, step: f64) -> Vec<Vec<Point>> {
        if step <= 0.0 {
            return Vec::new();
        }
        let (west, north) = self.unproject(self.origin);
        let (east, south) = self.unproject(Point::new(self.origin.x + self.width, self.origin.y + self.height));
        let mut lines = Vec::new();
        let mut lon = (west / step).floor() * step;
        while lon <= east {
            lines.push(vec![self.project(lon, north), self.project(lon, south)]);
            lon += step;
        }
        let mut lat = (south / step).floor() * step;
        while lat <= north {
            lines.push(vec![self.project(west, lat), self.project(east, lat)]);
            lat += step;
        }
        lines
    }
}

/// Normalised Mercator coordinates in `[0, 1]`.
fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0;
    let y = 0.5 - (lat.tan() + 1.0 / lat.cos()).ln() / (2.0 * std::f64::consts::PI);
    (x, y)
}

fn inverse_mercator(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y);
    let lat = n.sinh().atan().to_degrees();
    (lon, lat)
}
