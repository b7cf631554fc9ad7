//! Maps a raster of raw field values onto RGB pixels through a colormap.

use crate::colormap::Colormap;

/// Background color for a cell classified as missing in raster mode.
pub const MISSING_COLOR: [u8; 3] = [30, 30, 30];

/// Magnitude above which a raw value is considered missing, independent of
/// `fill_value`. Distinct from [`sphere_core::is_missing`]'s threshold —
/// this classification is specific to colorization, not storage reads.
const MAGNITUDE_MISSING_THRESHOLD: f64 = 1.0e10;

fn is_render_missing(v: f64, fill_value: f64) -> bool {
    v.abs() > MAGNITUDE_MISSING_THRESHOLD
        || v != v
        || (v - fill_value).abs() < 1.0e-6 * fill_value.abs()
}

/// Colorize a `(nx, ny)` raster into `width = nx`, `height = ny` RGB pixels,
/// flipping rows so source row 0 (south) lands at the output's last row.
pub fn apply_colormap(
    source: &[f64],
    nx: usize,
    ny: usize,
    min: f64,
    max: f64,
    fill_value: f64,
    colormap: &Colormap,
    out: &mut [u8],
) {
    debug_assert_eq!(source.len(), nx * ny);
    debug_assert_eq!(out.len(), nx * ny * 3);
    let span = (max - min).max(f64::EPSILON);
    for y in 0..ny {
        let src_row = y;
        let dst_row = ny - 1 - y;
        for x in 0..nx {
            let v = source[src_row * nx + x];
            let color = if is_render_missing(v, fill_value) {
                MISSING_COLOR
            } else {
                let t = ((v - min) / span).clamp(0.0, 1.0);
                colormap.lookup(t)
            };
            let px = (dst_row * nx + x) * 3;
            out[px] = color[0];
            out[px + 1] = color[1];
            out[px + 2] = color[2];
        }
    }
}

/// Like [`apply_colormap`] but replicates each source cell into a
/// `scale x scale` pixel block, still flipping about the y-axis.
pub fn apply_colormap_scaled(
    source: &[f64],
    nx: usize,
    ny: usize,
    min: f64,
    max: f64,
    fill_value: f64,
    colormap: &Colormap,
    scale: usize,
    out: &mut [u8],
) {
    debug_assert_eq!(source.len(), nx * ny);
    let width = nx * scale;
    let height = ny * scale;
    debug_assert_eq!(out.len(), width * height * 3);
    let span = (max - min).max(f64::EPSILON);
    for y in 0..ny {
        let src_row = y;
        let dst_row_base = (ny - 1 - y) * scale;
        for x in 0..nx {
            let v = source[src_row * nx + x];
            let color = if is_render_missing(v, fill_value) {
                MISSING_COLOR
            } else {
                let t = ((v - min) / span).clamp(0.0, 1.0);
                colormap.lookup(t)
            };
            for dy in 0..scale {
                let dst_row = dst_row_base + dy;
                for dx in 0..scale {
                    let dst_col = x * scale + dx;
                    let px = (dst_row * width + dst_col) * 3;
                    out[px] = color[0];
                    out[px + 1] = color[1];
                    out[px + 2] = color[2];
                }
            }
        }
    }
}

/// Color a single time-series point: the colormap's own fill color when the
/// value is missing, otherwise the palette lookup.
pub fn colorize_point(v: f64, min: f64, max: f64, fill_value: f64, colormap: &Colormap) -> [u8; 3] {
    if is_render_missing(v, fill_value) {
        colormap.lookup(0.0)
    } else {
        let span = (max - min).max(f64::EPSILON);
        colormap.lookup(((v - min) / span).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_zero_lands_at_last_output_row() {
        let nx = 2;
        let ny = 2;
        let source = vec![0.0, 0.0, 1.0, 1.0];
        let cm = Colormap::grayscale();
        let mut out = vec![0u8; nx * ny * 3];
        apply_colormap(&source, nx, ny, 0.0, 1.0, 1.0e20, &cm, &mut out);
        let last_row_px = (ny - 1) * nx * 3;
        assert_eq!(&out[last_row_px..last_row_px + 3], &[0, 0, 0]);
    }

    #[test]
    fn magnitude_above_threshold_is_missing() {
        let cm = Colormap::viridis();
        let mut out = vec![0u8; 3];
        apply_colormap(&[1.0e11], 1, 1, 0.0, 1.0, 1.0e20, &cm, &mut out);
        assert_eq!(&out[..], &MISSING_COLOR);
    }

    #[test]
    fn nan_is_missing() {
        let cm = Colormap::viridis();
        let mut out = vec![0u8; 3];
        apply_colormap(&[f64::NAN], 1, 1, 0.0, 1.0, 1.0e20, &cm, &mut out);
        assert_eq!(&out[..], &MISSING_COLOR);
    }

    #[test]
    fn scaled_apply_replicates_block() {
        let cm = Colormap::grayscale();
        let mut out = vec![0u8; 2 * 2 * 3];
        apply_colormap_scaled(&[1.0], 1, 1, 0.0, 1.0, 1.0e20, &cm, 2, &mut out);
        for px in out.chunks(3) {
            assert_eq!(px, &[255, 255, 255]);
        }
    }
}
