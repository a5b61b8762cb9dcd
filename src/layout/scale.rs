//! Scales map data values to dot-space coordinates.

/// A continuous linear mapping from `domain` to `range`. Either interval may
/// be reversed (screen y grows downward, values grow upward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        LinearScale { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn set_range(&mut self, range: (f64, f64)) {
        self.range = range;
    }

    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, position: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return (d0 + d1) / 2.0;
        }
        d0 + (position - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Length of one domain unit in range units, always positive.
    pub fn unit(&self) -> f64 {
        (self.apply(self.domain.0 + 1.0) - self.apply(self.domain.0)).abs()
    }
}

/// Evenly spaced bands for discrete keys, with inner and outer padding
/// expressed as a fraction of the step.
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale<K> {
    keys: Vec<K>,
    range: (f64, f64),
    padding: f64,
}

impl<K: PartialEq> BandScale<K> {
    pub fn new(keys: Vec<K>, range: (f64, f64), padding: f64) -> Self {
        BandScale {
            keys,
            range,
            padding: padding.clamp(0.0, 1.0),
        }
    }

    fn step(&self) -> f64 {
        let n = self.keys.len() as f64;
        if n == 0.0 {
            return 0.0;
        }
        (self.range.1 - self.range.0) / (n - self.padding + 2.0 * self.padding)
    }

    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding)
    }

    /// Start of the band for `key`, or `None` for an unknown key.
    pub fn position(&self, key: &K) -> Option<f64> {
        let index = self.keys.iter().position(|k| k == key)?;
        let step = self.step();
        Some(self.range.0 + step * self.padding + step * index as f64)
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_scale_handles_reversed_range() {
        let y = LinearScale::new((0.0, 100.0), (480.0, 50.0));
        assert_eq!(y.apply(0.0), 480.0);
        assert_eq!(y.apply(100.0), 50.0);
        assert!((y.invert(y.apply(37.0)) - 37.0).abs() < 1e-9);
        assert!((y.unit() - 4.3).abs() < 1e-9);
    }

    #[test]
    fn degenerate_domain_maps_to_middle() {
        let s = LinearScale::new((5.0, 5.0), (0.0, 10.0));
        assert_eq!(s.apply(5.0), 5.0);
    }

    #[test]
    fn band_scale_matches_padded_layout() {
        let x = BandScale::new(vec![2011, 2012, 2013, 2014], (0.0, 420.0), 0.2);
        // step = 420 / (4 - 0.2 + 0.4) = 100
        assert!((x.bandwidth() - 80.0).abs() < 1e-9);
        assert_eq!(x.position(&2011), Some(20.0));
        assert_eq!(x.position(&2014), Some(320.0));
        assert_eq!(x.position(&1999), None);
    }

    #[test]
    fn empty_band_scale_has_no_width() {
        let x: BandScale<i32> = BandScale::new(Vec::new(), (0.0, 100.0), 0.2);
        assert_eq!(x.bandwidth(), 0.0);
    }
}
