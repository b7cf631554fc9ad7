//! Per-element rasterization of a mesh's triangles and quads onto an
//! equirectangular raster.

use mesh::{Element, Mesh};

use crate::colormap::Colormap;

const MAGNITUDE_MISSING_THRESHOLD: f64 = 1.0e10;

fn is_missing(v: f64, fill_value: f64) -> bool {
    v.abs() > MAGNITUDE_MISSING_THRESHOLD
        || v != v
        || (v - fill_value).abs() < 1.0e-6 * fill_value.abs()
}

fn project(lon: f64, lat: f64, width: usize, height: usize) -> (f64, f64) {
    let px = (lon + 180.0) / 360.0 * width as f64;
    let py = (90.0 - lat) / 180.0 * height as f64;
    (px, py)
}

fn max_pairwise_lon_spread(lons: &[f64]) -> f64 {
    let mut max = 0.0f64;
    for i in 0..lons.len() {
        for j in (i + 1)..lons.len() {
            let d = (lons[i] - lons[j]).abs();
            if d > max {
                max = d;
            }
        }
    }
    max
}

/// Rasterize every mesh element into `width x height` RGB `pixels`,
/// background black. `values` holds one scalar per mesh node.
pub fn rasterize_polygons(
    mesh: &Mesh,
    values: &[f64],
    min: f64,
    max: f64,
    fill_value: f64,
    colormap: &Colormap,
    width: usize,
    height: usize,
    pixels: &mut [u8],
) {
    debug_assert_eq!(pixels.len(), width * height * 3);
    pixels.fill(0);

    let span = (max - min).max(f64::EPSILON);

    for element in &mesh.elements {
        let node_indices: Vec<usize> = match element {
            Element::Triangle(idx) => idx.to_vec(),
            Element::Quad(idx) => idx.to_vec(),
        };
        if node_indices.iter().any(|&i| i >= mesh.n || i >= values.len()) {
            continue;
        }

        let vertex_values: Vec<f64> = node_indices.iter().map(|&i| values[i]).collect();
        if vertex_values.iter().all(|&v| is_missing(v, fill_value)) {
            continue;
        }

        let lons: Vec<f64> = node_indices.iter().map(|&i| mesh.lon[i]).collect();
        if max_pairwise_lon_spread(&lons) > 180.0 {
            continue;
        }

        let non_missing: Vec<f64> = vertex_values
            .iter()
            .copied()
            .filter(|&v| !is_missing(v, fill_value))
            .collect();
        let aggregate = non_missing.iter().sum::<f64>() / non_missing.len() as f64;
        let t = ((aggregate - min) / span).clamp(0.0, 1.0);
        let color = colormap.lookup(t);

        let projected: Vec<(f64, f64)> = node_indices
            .iter()
            .map(|&i| project(mesh.lon[i], mesh.lat[i], width, height))
            .collect();

        match element {
            Element::Triangle(_) => {
                fill_triangle(&projected, color, width, height, pixels);
            }
            Element::Quad(_) => {
                fill_triangle(&[projected[0], projected[1], projected[2]], color, width, height, pixels);
                fill_triangle(&[projected[0], projected[2], projected[3]], color, width, height, pixels);
            }
        }
    }
}

/// Scanline-fill one triangle by sorting its vertices on y and
/// interpolating x across the long edge and the two short edges.
fn fill_triangle(verts: &[(f64, f64)], color: [u8; 3], width: usize, height: usize, pixels: &mut [u8]) {
    let mut v = [verts[0], verts[1], verts[2]];
    v.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
    let (x0, y0) = v[0];
    let (x1, y1) = v[1];
    let (x2, y2) = v[2];

    let y_top = y0.floor().max(0.0) as isize;
    let y_bottom = y2.ceil().min(height as f64) as isize;

    let edge_x = |ya: f64, xa: f64, yb: f64, xb: f64, y: f64| -> f64 {
        if (yb - ya).abs() < f64::EPSILON {
            xa
        } else {
            xa + (xb - xa) * (y - ya) / (yb - ya)
        }
    };

    for y in y_top..y_bottom {
        if y < 0 || y as usize >= height {
            continue;
        }
        let yf = y as f64 + 0.5;
        let x_long = edge_x(y0, x0, y2, x2, yf);
        let x_short = if yf < y1 {
            if (y1 - y0).abs() < f64::EPSILON {
                x1
            } else {
                edge_x(y0, x0, y1, x1, yf)
            }
        } else if (y2 - y1).abs() < f64::EPSILON {
            x1
        } else {
            edge_x(y1, x1, y2, x2, yf)
        };

        let (x_left, x_right) = if x_long <= x_short { (x_long, x_short) } else { (x_short, x_long) };
        let x_start = x_left.floor().max(0.0) as usize;
        let x_end = (x_right.ceil() as isize).clamp(0, width as isize) as usize;
        for x in x_start..x_end.min(width) {
            let px = (y as usize * width + x) * 3;
            pixels[px] = color[0];
            pixels[px + 1] = color[1];
            pixels[px + 2] = color[2];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::{mesh_create, CoordType};

    fn square_mesh() -> Mesh {
        let lon = vec![-10.0, 10.0, 10.0, -10.0];
        let lat = vec![-10.0, -10.0, 10.0, 10.0];
        let mut mesh = mesh_create(lon, lat, CoordType::Unstructured1D, 4, 1).unwrap();
        mesh.elements = vec![Element::Quad([0, 1, 2, 3])];
        mesh
    }

    #[test]
    fn quad_fills_its_interior() {
        let mesh = square_mesh();
        let values = vec![1.0, 1.0, 1.0, 1.0];
        let cm = Colormap::grayscale();
        let (w, h) = (360, 180);
        let mut pixels = vec![0u8; w * h * 3];
        rasterize_polygons(&mesh, &values, 0.0, 1.0, 1.0e20, &cm, w, h, &mut pixels);
        let center_px = (90 * w + 180) * 3;
        assert_eq!(&pixels[center_px..center_px + 3], &[255, 255, 255]);
    }

    #[test]
    fn antimeridian_wrap_is_skipped() {
        let lon = vec![170.0, -170.0, -170.0, 170.0];
        let lat = vec![-10.0, -10.0, 10.0, 10.0];
        let mut mesh = mesh_create(lon, lat, CoordType::Unstructured1D, 4, 1).unwrap();
        mesh.elements = vec![Element::Quad([0, 1, 2, 3])];
        let values = vec![1.0; 4];
        let cm = Colormap::grayscale();
        let (w, h) = (360, 180);
        let mut pixels = vec![0u8; w * h * 3];
        rasterize_polygons(&mesh, &values, 0.0, 1.0, 1.0e20, &cm, w, h, &mut pixels);
        assert!(pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn all_missing_vertices_leaves_background() {
        let mesh = square_mesh();
        let fill = 1.0e20;
        let values = vec![fill, fill, fill, fill];
        let cm = Colormap::grayscale();
        let (w, h) = (360, 180);
        let mut pixels = vec![0u8; w * h * 3];
        rasterize_polygons(&mesh, &values, 0.0, 1.0, fill, &cm, w, h, &mut pixels);
        assert!(pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn out_of_range_node_index_is_skipped() {
        let mesh = square_mesh();
        let values = vec![1.0, 1.0, 1.0, 1.0];
        let mut mesh = mesh;
        mesh.elements.push(Element::Triangle([0, 1, 99]));
        let cm = Colormap::grayscale();
        let (w, h) = (360, 180);
        let mut pixels = vec![0u8; w * h * 3];
        rasterize_polygons(&mesh, &values, 0.0, 1.0, 1.0e20, &cm, w, h, &mut pixels);
    }
}
