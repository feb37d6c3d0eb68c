use std::cell::{Cell, RefCell};
use std::f32::consts::{PI, TAU};
use std::rc::Rc;
use std::sync::Arc;

use crate::config::SceneConfig;
use crate::foundation::math::Vec3;
use crate::foundation::time::ManualClock;
use crate::components::Renderer;
use crate::physics::collision::BoundingSphere;
use crate::render::{
    DrawCall, HeadlessBackend, Mesh, MeshHandle, PrimitiveTopology, RenderContext, RenderError,
};
use crate::scene::{Behaviour, ComponentContext, Scene, SceneError};

pub(super) fn scene() -> (Scene, ManualClock) {
    scene_with(SceneConfig::default())
}

pub(super) fn scene_with(config: SceneConfig) -> (Scene, ManualClock) {
    crate::foundation::logging::init_for_tests();
    let clock = ManualClock::new();
    let scene = Scene::new(config, Box::new(HeadlessBackend::new()))
        .with_time_source(Box::new(clock.clone()));
    (scene, clock)
}

pub(super) fn headless(scene: &Scene) -> &HeadlessBackend {
    scene
        .backend()
        .as_any()
        .downcast_ref::<HeadlessBackend>()
        .expect("headless backend")
}

/// Cube spanning -1..1 on every axis, wound counter-clockwise seen from outside
pub(super) fn cube(name: &str) -> Arc<Mesh> {
    let (x, y, z) = (Vec3::x(), Vec3::y(), Vec3::z());
    // (normal, u, v) with u × v == normal
    let faces = [(x, y, z), (-x, z, y), (y, z, x), (-y, x, z), (z, x, y), (-z, y, x)];
    let positions: Vec<Vec3> = faces
        .iter()
        .flat_map(|&(normal, u, v)| {
            let corner = |su: f32, sv: f32| normal + u * su + v * sv;
            [
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            ]
        })
        .collect();
    Arc::new(
        Mesh::new(name, positions, PrimitiveTopology::Triangles)
            .with_calculated_bounds()
            .expect("bounds"),
    )
}

/// Unit UV sphere with poles on Y, triangles wound to face outward.
///
/// Longitudes are shifted a quarter step and the ring count should be odd,
/// so a ray along Z through the origin strikes the middle of a facet.
#[allow(clippy::cast_precision_loss)]
pub(super) fn uv_sphere(name: &str, segments: usize, rings: usize) -> Arc<Mesh> {
    let point = |ring: usize, segment: usize| {
        let polar = PI * ring as f32 / rings as f32;
        let azimuth = TAU * (segment as f32 + 0.25) / segments as f32;
        Vec3::new(polar.sin() * azimuth.cos(), polar.cos(), polar.sin() * azimuth.sin())
    };
    let mut positions = Vec::with_capacity(rings * segments * 6);
    for ring in 0..rings {
        for segment in 0..segments {
            let quad = [
                point(ring, segment),
                point(ring + 1, segment),
                point(ring + 1, segment + 1),
                point(ring, segment + 1),
            ];
            for [a, b, c] in [[quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]]] {
                let outward = (b - a).cross(&(c - a)).dot(&(a + b + c)) >= 0.0;
                positions.extend(if outward { [a, b, c] } else { [a, c, b] });
            }
        }
    }
    Arc::new(
        Mesh::new(name, positions, PrimitiveTopology::Triangles)
            .with_calculated_bounds()
            .expect("bounds"),
    )
}

pub(super) type EventLog = Rc<RefCell<Vec<String>>>;

/// Behaviour that records its hooks
pub(super) struct Recorder {
    pub name: &'static str,
    pub log: EventLog,
    pub fail_update: bool,
    pub spawn_on_start: Option<&'static str>,
    pub dispose_self_on_update: bool,
}

impl Recorder {
    pub fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            fail_update: false,
            spawn_on_start: None,
            dispose_self_on_update: false,
        }
    }

    fn record(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{}.{hook}", self.name));
    }
}

impl Behaviour for Recorder {
    fn start(&mut self, ctx: &mut ComponentContext<'_>) -> Result<(), SceneError> {
        self.record("start");
        if let Some(name) = self.spawn_on_start {
            let node = ctx.node();
            ctx.scene_mut().add_behaviour(node, Self::new(name, &self.log))?;
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>) -> Result<(), SceneError> {
        self.record("update");
        if self.dispose_self_on_update {
            let component = ctx.component();
            ctx.scene_mut().dispose_component(component)?;
        }
        if self.fail_update {
            return Err(SceneError::Behaviour(format!("{} failed", self.name)));
        }
        Ok(())
    }

    fn on_dispose(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("dispose");
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

pub(super) fn events(log: &EventLog) -> Vec<String> {
    log.borrow_mut().drain(..).collect()
}

/// How often each [`Renderer`] hook ran
#[derive(Debug, Default)]
pub(super) struct RendererCalls {
    bind: Cell<usize>,
    prerender: Cell<usize>,
    unbind: Cell<usize>,
}

impl RendererCalls {
    /// `(bind, prerender, unbind)`
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.bind.get(), self.prerender.get(), self.unbind.get())
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// Draws four points around its node; has no surface to raycast
#[derive(Debug)]
pub(super) struct PointCloudRenderer {
    points: Arc<Mesh>,
    handle: Option<MeshHandle>,
    calls: Rc<RendererCalls>,
}

impl PointCloudRenderer {
    pub fn new(calls: &Rc<RendererCalls>) -> Self {
        let positions = vec![
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::new(0.0, -0.5, 0.0),
        ];
        let points = Mesh::new("sparks", positions, PrimitiveTopology::Points)
            .with_calculated_bounds()
            .expect("points have bounds");
        Self {
            points: Arc::new(points),
            handle: None,
            calls: Rc::clone(calls),
        }
    }
}

impl Renderer for PointCloudRenderer {
    fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.points.bounds().map(|bounds| bounds.sphere())
    }

    fn bind(&mut self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        bump(&self.calls.bind);
        self.handle = Some(ctx.acquire_mesh(&self.points)?);
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        bump(&self.calls.unbind);
        if self.handle.take().is_some() {
            ctx.release_mesh(&self.points)?;
        }
        Ok(())
    }

    fn prerender(&mut self, _ctx: &mut RenderContext) -> Result<Option<DrawCall>, RenderError> {
        bump(&self.calls.prerender);
        Ok(self.handle.map(|mesh| DrawCall {
            mesh,
            topology: PrimitiveTopology::Points,
            count: 4,
        }))
    }
}
