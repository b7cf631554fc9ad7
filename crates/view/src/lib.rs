//! The stateful conductor: owns a mesh, a storage adapter, an optional
//! regridder, and a colormap registry, and turns "which variable, which
//! time, which render mode" into pixels.

mod config;

pub use config::ViewerConfig;

use mesh::Mesh;
use regrid::Regridder;
use renderer::{apply_colormap, apply_colormap_scaled, rasterize_polygons, ColormapRegistry};
use sphere_core::{ViewerError, ViewerResult, DEFAULT_FILL_VALUE};
use storage::StorageAdapter;
use tracing::debug;

/// How the current variable's slice is turned into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Regrid onto an equirectangular raster, then colormap-apply.
    Interpolate,
    /// Rasterize mesh elements directly.
    Polygon,
}

/// Outcome of [`View::step_time`]: whether the step landed inside the
/// range or got clamped at a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Index(usize),
    Boundary(usize),
}

impl StepOutcome {
    pub fn index(self) -> usize {
        match self {
            StepOutcome::Index(i) | StepOutcome::Boundary(i) => i,
        }
    }
}

/// Ties a storage adapter (a single store or a [`fileset::Fileset`], both of
/// which implement [`StorageAdapter`]), a mesh, an optional regridder, and a
/// colormap registry into one interactive session.
pub struct View {
    store: Box<dyn StorageAdapter>,
    mesh: Mesh,
    config: ViewerConfig,
    regridder: Option<Regridder>,
    registry: ColormapRegistry,
    render_mode: RenderMode,

    variable: String,
    fill_value: f64,
    time_index: usize,
    depth_index: usize,
    n_times: usize,
    n_depths: usize,
    target_width: usize,
    target_height: usize,

    user_min: Option<f64>,
    user_max: Option<f64>,
    data_valid: bool,

    slice_buf: Vec<f64>,
    regrid_buf: Vec<f64>,
    pixels: Vec<u8>,
}

impl View {
    pub fn new(store: Box<dyn StorageAdapter>, config: ViewerConfig) -> ViewerResult<Self> {
        let mesh = store.create_mesh()?;
        Ok(View {
            store,
            mesh,
            config,
            regridder: None,
            registry: ColormapRegistry::builtin(),
            render_mode: RenderMode::Interpolate,
            variable: String::new(),
            fill_value: DEFAULT_FILL_VALUE,
            time_index: 0,
            depth_index: 0,
            n_times: 1,
            n_depths: 1,
            target_width: 0,
            target_height: 0,
            user_min: None,
            user_max: None,
            data_valid: false,
            slice_buf: Vec::new(),
            regrid_buf: Vec::new(),
            pixels: Vec::new(),
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn time_index(&self) -> usize {
        self.time_index
    }

    pub fn depth_index(&self) -> usize {
        self.depth_index
    }

    pub fn n_times(&self) -> usize {
        self.n_times
    }

    pub fn n_depths(&self) -> usize {
        self.n_depths
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn target_dims(&self) -> (usize, usize) {
        (self.target_width, self.target_height)
    }

    pub fn user_range(&self) -> Option<(f64, f64)> {
        match (self.user_min, self.user_max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    pub fn set_user_range(&mut self, min: f64, max: f64) {
        self.user_min = Some(min);
        self.user_max = Some(max);
        self.data_valid = false;
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Switch render mode. Fails unless the mesh carries element
    /// connectivity when switching to [`RenderMode::Polygon`].
    pub fn set_render_mode(&mut self, mode: RenderMode) -> ViewerResult<()> {
        if mode == RenderMode::Polygon && !self.mesh.polygon_available() {
            return Err(ViewerError::PolygonUnavailable);
        }
        self.render_mode = mode;
        self.data_valid = false;
        Ok(())
    }

    pub fn next_colormap(&mut self) {
        self.registry.next();
        self.data_valid = false;
    }

    pub fn prev_colormap(&mut self) {
        self.registry.prev();
        self.data_valid = false;
    }

    /// Select a new variable, reset indices, recompute target dimensions,
    /// and reallocate buffers. Seeds the user range from `estimate_range`
    /// when no range is already set.
    pub fn set_variable(&mut self, var: &str, regrid: bool) -> ViewerResult<()> {
        let descriptors = self.store.scan_variables(&self.mesh)?;
        let descriptor = descriptors
            .iter()
            .find(|d| d.name == var)
            .cloned()
            .ok_or_else(|| ViewerError::StorageDecode(format!("unknown variable '{var}'")))?;

        let dim_info = self.store.dim_info(var)?;
        self.n_times = dim_info.time_size();
        self.n_depths = dim_info.depth_size();
        self.variable = var.to_string();
        self.fill_value = descriptor.fill_value;

        self.regridder = if regrid {
            Some(Regridder::build(&self.mesh, self.config.resolution_deg, self.config.influence_radius_meters))
        } else {
            None
        };

        let (width, height) = match &self.regridder {
            Some(r) => (r.nx() * self.config.scale_factor, r.ny() * self.config.scale_factor),
            None => (self.config.polygon_raster_width, self.config.polygon_raster_height),
        };
        self.target_width = width;
        self.target_height = height;

        self.slice_buf = vec![0.0; self.mesh.n];
        self.regrid_buf = match &self.regridder {
            Some(r) => vec![0.0; r.len()],
            None => Vec::new(),
        };
        self.pixels = vec![0u8; width * height * 3];

        if self.user_min.is_none() || self.user_max.is_none() {
            let (min, max) = self.store.estimate_range(var)?;
            self.user_min = Some(min);
            self.user_max = Some(max);
        }

        self.time_index = 0;
        self.depth_index = 0;
        self.data_valid = false;

        debug!(var, width, height, n_times = self.n_times, n_depths = self.n_depths, "set_variable");
        Ok(())
    }

    pub fn set_time(&mut self, i: usize) {
        self.time_index = i.min(self.n_times.saturating_sub(1));
        self.data_valid = false;
    }

    pub fn set_depth(&mut self, i: usize) {
        self.depth_index = i.min(self.n_depths.saturating_sub(1));
        self.data_valid = false;
    }

    pub fn step_time(&mut self, delta: isize) -> StepOutcome {
        let max = self.n_times.saturating_sub(1) as isize;
        let raw = self.time_index as isize + delta;
        let clamped = raw.clamp(0, max) as usize;
        self.time_index = clamped;
        self.data_valid = false;
        if raw < 0 || raw > max {
            StepOutcome::Boundary(clamped)
        } else {
            StepOutcome::Index(clamped)
        }
    }

    /// Recompute `pixels` if the current state hasn't been rendered yet.
    pub fn update(&mut self) -> ViewerResult<()> {
        if self.data_valid {
            return Ok(());
        }

        self.store.read_slice(&self.variable, self.time_index, self.depth_index, &mut self.slice_buf)?;

        let (min, max) = (
            self.user_min.unwrap_or(0.0),
            self.user_max.unwrap_or(1.0),
        );
        let colormap = self.registry.current();

        let rendered_as_polygon = if self.render_mode == RenderMode::Polygon && self.mesh.polygon_available() {
            rasterize_polygons(
                &self.mesh,
                &self.slice_buf,
                min,
                max,
                self.fill_value,
                colormap,
                self.target_width,
                self.target_height,
                &mut self.pixels,
            );
            true
        } else {
            false
        };

        if !rendered_as_polygon {
            match &self.regridder {
                Some(regridder) => {
                    regridder.apply(&self.slice_buf, self.fill_value, &mut self.regrid_buf);
                    if self.config.scale_factor > 1 {
                        apply_colormap_scaled(
                            &self.regrid_buf,
                            regridder.nx(),
                            regridder.ny(),
                            min,
                            max,
                            self.fill_value,
                            colormap,
                            self.config.scale_factor,
                            &mut self.pixels,
                        );
                    } else {
                        apply_colormap(
                            &self.regrid_buf,
                            regridder.nx(),
                            regridder.ny(),
                            min,
                            max,
                            self.fill_value,
                            colormap,
                            &mut self.pixels,
                        );
                    }
                }
                None => return Err(ViewerError::PolygonUnavailable),
            }
        }

        self.data_valid = true;
        Ok(())
    }

    pub fn save_ppm(&self, path: &std::path::Path) -> ViewerResult<()> {
        renderer::ppm::write_ppm(path, self.target_width, self.target_height, &self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::{mesh_create, CoordType, Mesh as MeshType};
    use std::cell::RefCell;
    use storage::{AxisInfo, DimInfo, VariableDescriptor};

    struct FakeStore {
        mesh: MeshType,
        values: RefCell<Vec<f64>>,
    }

    impl StorageAdapter for FakeStore {
        fn create_mesh(&self) -> ViewerResult<MeshType> {
            Ok(self.mesh.clone())
        }

        fn scan_variables(&self, _mesh: &MeshType) -> ViewerResult<Vec<VariableDescriptor>> {
            Ok(vec![VariableDescriptor {
                name: "temp".to_string(),
                long_name: None,
                units: None,
                fill_value: 1.0e20,
                scale_factor: 1.0,
                add_offset: 0.0,
            }])
        }

        fn read_slice(&self, _var: &str, _t: usize, _d: usize, out: &mut [f64]) -> ViewerResult<()> {
            out.copy_from_slice(&self.values.borrow());
            Ok(())
        }

        fn estimate_range(&self, _var: &str) -> ViewerResult<(f64, f64)> {
            Ok((0.0, 10.0))
        }

        fn dim_info(&self, _var: &str) -> ViewerResult<DimInfo> {
            Ok(DimInfo {
                time: Some(AxisInfo { size: 3, coord_values: vec![0.0, 1.0, 2.0], units: None }),
                depth: None,
            })
        }

        fn read_timeseries(&self, _var: &str, _node: usize, _d: usize) -> ViewerResult<(Vec<f64>, Vec<f64>, Vec<bool>)> {
            Ok((vec![], vec![], vec![]))
        }

        fn close(&mut self) -> ViewerResult<()> {
            Ok(())
        }
    }

    fn fake_mesh() -> MeshType {
        let lon = vec![-10.0, 10.0, 10.0, -10.0];
        let lat = vec![-10.0, -10.0, 10.0, 10.0];
        mesh_create(lon, lat, CoordType::Unstructured1D, 4, 1).unwrap()
    }

    fn fake_view() -> View {
        let store = FakeStore { mesh: fake_mesh(), values: RefCell::new(vec![1.0, 2.0, 3.0, 4.0]) };
        View::new(Box::new(store), ViewerConfig::default()).unwrap()
    }

    #[test]
    fn set_variable_seeds_range_and_resets_indices() {
        let mut view = fake_view();
        view.set_time(2);
        view.set_variable("temp", true).unwrap();
        assert_eq!(view.time_index(), 0);
        assert_eq!(view.user_range(), Some((0.0, 10.0)));
        assert_eq!(view.n_times(), 3);
    }

    #[test]
    fn step_time_reports_boundary() {
        let mut view = fake_view();
        view.set_variable("temp", true).unwrap();
        assert_eq!(view.step_time(-5), StepOutcome::Boundary(0));
        assert_eq!(view.step_time(1), StepOutcome::Index(1));
        assert_eq!(view.step_time(5), StepOutcome::Boundary(2));
    }

    #[test]
    fn update_regrids_and_marks_valid() {
        let mut view = fake_view();
        view.set_variable("temp", true).unwrap();
        view.update().unwrap();
        assert!(!view.pixels().is_empty());
        view.update().unwrap();
    }

    #[test]
    fn polygon_mode_requires_element_connectivity() {
        let mut view = fake_view();
        view.set_variable("temp", false).unwrap();
        let err = view.set_render_mode(RenderMode::Polygon).unwrap_err();
        assert!(matches!(err, ViewerError::PolygonUnavailable));
    }

    #[test]
    fn polygon_mode_renders_once_mesh_has_elements() {
        let mut view = fake_view();
        view.mesh.elements = vec![mesh::Element::Quad([0, 1, 2, 3])];
        view.set_variable("temp", false).unwrap();
        view.set_render_mode(RenderMode::Polygon).unwrap();
        view.update().unwrap();
        assert!(view.pixels().iter().any(|&b| b != 0));
    }

    #[test]
    fn no_regridder_and_no_polygon_mode_errors_on_update() {
        let mut view = fake_view();
        view.set_variable("temp", false).unwrap();
        let err = view.update().unwrap_err();
        assert!(matches!(err, ViewerError::PolygonUnavailable));
    }

    #[test]
    fn save_ppm_writes_a_readable_file() {
        let mut view = fake_view();
        view.set_variable("temp", true).unwrap();
        view.update().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.ppm");
        view.save_ppm(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"P6\n"));
    }
}
