//! Two-phase ray queries
//!
//! # Broad phase
//!
//! Each candidate's ray is brought into model space with the inverse world
//! matrix and tested against the model-space bounding sphere. Survivors get
//! a lower bound on their hit distance (zero when the ray starts inside the
//! bounds) and are sorted by it, nearest first.
//!
//! # Narrow phase
//!
//! Survivors are tested in that order against their exact geometry:
//! triangles for meshes, analytic shapes for colliders. In
//! [`RaycastMode::Nearest`] the walk stops as soon as the next candidate's
//! lower bound is farther than the best hit found so far, since nothing
//! behind that bound can win.
//!
//! Hit points are mapped back to world space and their distances measured
//! from the world-space ray origin, so non-uniform scale does not distort
//! the ordering.

use crate::components::Collider;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::physics::collision::{BoundingSphere, Ray};
use crate::render::{Mesh, PrimitiveTopology};
use crate::scene::component::ComponentId;
use crate::scene::scene_graph::NodeId;

/// How many hits a query keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RaycastMode {
    /// Only the closest hit; enables branch-and-bound pruning
    #[default]
    Nearest,
    /// Every hit, nearest first
    All,
}

/// One intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Component that was struck
    pub component: ComponentId,
    /// Node owning the component
    pub node: NodeId,
    /// World-space hit point
    pub point: Vec3,
    /// World-space distance from the ray origin
    pub distance: f32,
}

/// Work counters for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RaycastStats {
    /// Bounding-sphere tests
    pub broad_phase_tests: usize,
    /// Candidates that reached exact geometry tests
    pub narrow_phase_candidates: usize,
    /// Triangle or shape tests
    pub primitive_tests: usize,
}

/// Hits sorted by distance plus the work it took to find them
#[derive(Debug, Clone, Default)]
pub struct RaycastResult {
    /// Hits, nearest first
    pub hits: Vec<RaycastHit>,
    /// Counters
    pub stats: RaycastStats,
}

impl RaycastResult {
    /// Closest hit
    pub fn nearest(&self) -> Option<&RaycastHit> {
        self.hits.first()
    }

    /// Whether nothing was hit
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Geometry a ray can be tested against in model space
pub trait RaycastTarget {
    /// Model-space bounds; `None` excludes the target from queries
    fn local_bounds(&self) -> Option<BoundingSphere>;

    /// Push the model-space distances of every intersection with `ray`
    fn intersect_local(&self, ray: &Ray, stats: &mut RaycastStats, hits: &mut Vec<f32>);
}

impl RaycastTarget for Mesh {
    /// Only triangle meshes take part; point and line meshes have no surface
    fn local_bounds(&self) -> Option<BoundingSphere> {
        if self.topology() != PrimitiveTopology::Triangles {
            log::warn!(
                "Skipping raycast against '{}': {:?} topology is not supported",
                self.name(),
                self.topology()
            );
            return None;
        }
        self.bounds().map(|bounds| bounds.sphere())
    }

    fn intersect_local(&self, ray: &Ray, stats: &mut RaycastStats, hits: &mut Vec<f32>) {
        for triangle in self.triangles() {
            stats.primitive_tests += 1;
            if let Some(t) = triangle.intersect_ray(ray) {
                hits.push(t);
            }
        }
    }
}

impl RaycastTarget for Collider {
    fn local_bounds(&self) -> Option<BoundingSphere> {
        Some(Collider::local_bounds(self))
    }

    fn intersect_local(&self, ray: &Ray, stats: &mut RaycastStats, hits: &mut Vec<f32>) {
        stats.primitive_tests += 1;
        hits.extend(Collider::intersect_local(self, ray));
    }
}

/// Something a query may hit, with its placement in the world
pub struct RaycastCandidate<'a> {
    /// Component the geometry belongs to
    pub component: ComponentId,
    /// Owning node
    pub node: NodeId,
    /// Model-to-world matrix
    pub model: Mat4,
    /// World-to-model matrix
    pub inverse: Mat4,
    /// Model-space geometry
    pub target: &'a dyn RaycastTarget,
}

struct Survivor<'a> {
    candidate: RaycastCandidate<'a>,
    local_ray: Ray,
    lower_bound: f32,
}

/// Stateless ray query engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Raycaster;

impl Raycaster {
    /// Cast a world-space ray against `candidates`
    pub fn cast<'a>(
        ray: &Ray,
        candidates: impl IntoIterator<Item = RaycastCandidate<'a>>,
        mode: RaycastMode,
    ) -> RaycastResult {
        let mut stats = RaycastStats::default();
        let mut survivors = Self::broad_phase(ray, candidates, &mut stats);
        survivors.sort_by(|a, b| a.lower_bound.total_cmp(&b.lower_bound));

        let mut hits = Vec::new();
        let mut best = f32::INFINITY;
        let mut local_hits = Vec::new();
        for survivor in survivors {
            if mode == RaycastMode::Nearest && survivor.lower_bound > best {
                break;
            }
            stats.narrow_phase_candidates += 1;

            local_hits.clear();
            survivor
                .candidate
                .target
                .intersect_local(&survivor.local_ray, &mut stats, &mut local_hits);
            for &t in &local_hits {
                let point = to_world(&survivor.candidate.model, survivor.local_ray.point_at(t));
                let distance = (point - ray.origin).norm();
                best = best.min(distance);
                hits.push(RaycastHit {
                    component: survivor.candidate.component,
                    node: survivor.candidate.node,
                    point,
                    distance,
                });
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        if mode == RaycastMode::Nearest {
            hits.truncate(1);
        }
        log::trace!(
            "Raycast: {} broad, {} narrow, {} primitive tests, {} hits",
            stats.broad_phase_tests,
            stats.narrow_phase_candidates,
            stats.primitive_tests,
            hits.len()
        );
        RaycastResult { hits, stats }
    }

    fn broad_phase<'a>(
        ray: &Ray,
        candidates: impl IntoIterator<Item = RaycastCandidate<'a>>,
        stats: &mut RaycastStats,
    ) -> Vec<Survivor<'a>> {
        candidates
            .into_iter()
            .filter_map(|candidate| {
                let bounds = candidate.target.local_bounds()?;
                let local_ray = ray.transformed(&candidate.inverse)?;
                stats.broad_phase_tests += 1;
                let local_bound = bounds.distance_to_bounds(&local_ray)?;
                let lower_bound =
                    (to_world(&candidate.model, local_ray.point_at(local_bound)) - ray.origin).norm();
                Some(Survivor {
                    candidate,
                    local_ray,
                    lower_bound,
                })
            })
            .collect()
    }
}

fn to_world(model: &Mat4, local: Vec3) -> Vec3 {
    model.transform_point(&Point3::from(local)).coords
}
