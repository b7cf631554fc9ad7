//! Turns scalar field data into pixels: a colormap registry, raster
//! colorization, polygon rasterization, and PPM output.

pub mod apply;
pub mod colormap;
pub mod polygon;
pub mod ppm;
pub mod registry;

pub use apply::{apply_colormap, apply_colormap_scaled, colorize_point, MISSING_COLOR};
pub use colormap::Colormap;
pub use polygon::rasterize_polygons;
pub use registry::ColormapRegistry;
