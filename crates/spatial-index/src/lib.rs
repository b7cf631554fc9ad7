//! Median-split k-d tree over 3D points, built once and queried many times
//! against mesh node coordinates.
//!
//! The build repeatedly sorts index slices by the axis cycling with tree
//! depth, which is Θ(n log² n) rather than the Θ(n log n) achievable with a
//! selection algorithm. That trade-off is acceptable here: the tree is built
//! once per mesh and then queried for every output pixel.

/// Sentinel index returned by [`KdTree::nearest`] when the tree is empty.
pub const EMPTY_TREE_INDEX: usize = 0;

struct Node {
    point_index: usize,
    axis: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// A 3D k-d tree over a fixed set of points, indexed by their position in
/// the input slice passed to [`KdTree::build`].
pub struct KdTree {
    points: Vec<[f64; 3]>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl KdTree {
    /// Build a tree over `points`. `points` is consumed; node 0 of the
    /// resulting tree corresponds to `points[0]` and so on.
    pub fn build(points: Vec<[f64; 3]>) -> Self {
        let mut tree = KdTree {
            points,
            nodes: Vec::new(),
            root: None,
        };
        if tree.points.is_empty() {
            return tree;
        }
        let indices: Vec<usize> = (0..tree.points.len()).collect();
        tree.root = Some(tree.build_subtree(indices, 0));
        tree
    }

    fn build_subtree(&mut self, mut indices: Vec<usize>, depth: usize) -> usize {
        let axis = (depth % 3) as u8;
        indices.sort_by(|&a, &b| {
            self.points[a][axis as usize]
                .partial_cmp(&self.points[b][axis as usize])
                .unwrap()
        });
        let mid = indices.len() / 2;
        let point_index = indices[mid];
        let left_indices = indices[..mid].to_vec();
        let right_indices = indices[mid + 1..].to_vec();

        let left = if left_indices.is_empty() {
            None
        } else {
            Some(self.build_subtree(left_indices, depth + 1))
        };
        let right = if right_indices.is_empty() {
            None
        } else {
            Some(self.build_subtree(right_indices, depth + 1))
        };

        self.nodes.push(Node {
            point_index,
            axis,
            left,
            right,
        });
        self.nodes.len() - 1
    }

    /// Find the nearest point to `query`. Returns `(point_index,
    /// euclidean_distance)`. An empty tree returns `(EMPTY_TREE_INDEX,
    /// f64::MAX)`.
    pub fn nearest(&self, query: [f64; 3]) -> (usize, f64) {
        let Some(root) = self.root else {
            return (EMPTY_TREE_INDEX, f64::MAX);
        };
        let mut best_index = self.nodes[root].point_index;
        let mut best_dist2 = squared_distance(&self.points[best_index], &query);
        self.search(root, &query, &mut best_index, &mut best_dist2);
        (best_index, best_dist2.sqrt())
    }

    fn search(&self, node_idx: usize, query: &[f64; 3], best_index: &mut usize, best_dist2: &mut f64) {
        let node = &self.nodes[node_idx];
        let candidate = &self.points[node.point_index];
        let d2 = squared_distance(candidate, query);
        if d2 < *best_dist2 {
            *best_dist2 = d2;
            *best_index = node.point_index;
        }

        let axis = node.axis as usize;
        let diff = query[axis] - candidate[axis];
        let (near, far) = if diff <= 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search(near, query, best_index, best_dist2);
        }
        if let Some(far) = far {
            if diff * diff < *best_dist2 {
                self.search(far, query, best_index, best_dist2);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_nearest(points: &[[f64; 3]], query: [f64; 3]) -> (usize, f64) {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, squared_distance(p, &query).sqrt()))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap()
    }

    #[test]
    fn empty_tree_returns_sentinel() {
        let tree = KdTree::build(Vec::new());
        let (idx, dist) = tree.nearest([0.0, 0.0, 0.0]);
        assert_eq!(idx, EMPTY_TREE_INDEX);
        assert_eq!(dist, f64::MAX);
    }

    #[test]
    fn single_point_matches_itself() {
        let tree = KdTree::build(vec![[1.0, 2.0, 3.0]]);
        let (idx, dist) = tree.nearest([1.0, 2.0, 3.0]);
        assert_eq!(idx, 0);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn matches_brute_force_on_grid() {
        let mut points = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                points.push([i as f64, j as f64, (i * j) as f64 % 7.0]);
            }
        }
        let tree = KdTree::build(points.clone());
        let queries = [
            [5.3, 7.1, 2.0],
            [-10.0, 30.0, 100.0],
            [19.0, 19.0, 0.0],
            [0.0, 0.0, 0.0],
        ];
        for q in queries {
            let (expect_idx, expect_dist) = brute_force_nearest(&points, q);
            let (got_idx, got_dist) = tree.nearest(q);
            assert_eq!(got_idx, expect_idx, "query={q:?}");
            assert!((got_dist - expect_dist).abs() < 1e-9);
        }
    }

    #[test]
    fn on_unit_sphere_points() {
        let mut points = Vec::new();
        for lat_step in 0..18 {
            let lat = (lat_step as f64 - 9.0) * 10.0 * std::f64::consts::PI / 180.0;
            for lon_step in 0..36 {
                let lon = lon_step as f64 * 10.0 * std::f64::consts::PI / 180.0;
                let cos_lat = lat.cos();
                points.push([cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin()]);
            }
        }
        let tree = KdTree::build(points.clone());
        let query = [1.0, 0.0, 0.0];
        let (idx, dist) = tree.nearest(query);
        let (expect_idx, expect_dist) = brute_force_nearest(&points, query);
        assert_eq!(idx, expect_idx);
        assert!((dist - expect_dist).abs() < 1e-9);
    }
}
