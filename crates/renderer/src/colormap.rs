//! Built-in 256-entry RGB palettes.

/// A fixed 256-entry RGB lookup table. Index 0 maps to the minimum of a
/// scaled range, index 255 to the maximum.
#[derive(Debug, Clone)]
pub struct Colormap {
    name: &'static str,
    lut: [[u8; 3]; 256],
}

impl Colormap {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up the color for a value already normalized to `[0, 1]`. Out of
    /// range inputs clamp to the nearest end of the table.
    pub fn lookup(&self, t: f64) -> [u8; 3] {
        let t = t.clamp(0.0, 1.0);
        let idx = (t * 255.0).floor() as usize;
        self.lut[idx.min(255)]
    }

    fn from_stops(name: &'static str, stops: &[(f32, [u8; 3])]) -> Self {
        let mut lut = [[0u8; 3]; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let t = i as f32 / 255.0;
            *slot = interpolate_stops(stops, t);
        }
        Colormap { name, lut }
    }

    pub fn viridis() -> Self {
        Self::from_stops(
            "viridis",
            &[
                (0.0, [68, 1, 84]),
                (0.25, [59, 82, 139]),
                (0.5, [33, 145, 140]),
                (0.75, [94, 201, 98]),
                (1.0, [253, 231, 37]),
            ],
        )
    }

    pub fn hot() -> Self {
        Self::from_stops(
            "hot",
            &[
                (0.0, [0, 0, 0]),
                (0.4, [230, 0, 0]),
                (0.75, [255, 210, 0]),
                (1.0, [255, 255, 255]),
            ],
        )
    }

    pub fn grayscale() -> Self {
        Self::from_stops("grayscale", &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])])
    }
}

fn interpolate_stops(stops: &[(f32, [u8; 3])], t: f32) -> [u8; 3] {
    if stops.is_empty() {
        return [0, 0, 0];
    }
    if t <= stops[0].0 {
        return stops[0].1;
    }
    let last = stops.len() - 1;
    if t >= stops[last].0 {
        return stops[last].1;
    }
    for w in stops.windows(2) {
        let (t0, c0) = w[0];
        let (t1, c1) = w[1];
        if t >= t0 && t <= t1 {
            let span = (t1 - t0).max(f32::EPSILON);
            let f = (t - t0) / span;
            let mut out = [0u8; 3];
            for k in 0..3 {
                let a = c0[k] as f32;
                let b = c1[k] as f32;
                out[k] = (a + (b - a) * f).round() as u8;
            }
            return out;
        }
    }
    stops[last].1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_first_and_last_stop() {
        let cm = Colormap::hot();
        assert_eq!(cm.lookup(0.0), [0, 0, 0]);
        assert_eq!(cm.lookup(1.0), [255, 255, 255]);
    }

    #[test]
    fn grayscale_is_monotonic() {
        let cm = Colormap::grayscale();
        let a = cm.lookup(0.25);
        let b = cm.lookup(0.75);
        assert!(b[0] > a[0]);
    }

    #[test]
    fn out_of_range_clamps() {
        let cm = Colormap::viridis();
        assert_eq!(cm.lookup(-1.0), cm.lookup(0.0));
        assert_eq!(cm.lookup(2.0), cm.lookup(1.0));
    }
}
