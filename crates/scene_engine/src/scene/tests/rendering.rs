use std::rc::Rc;
use std::sync::Arc;

use super::support::{cube, headless, scene, scene_with, PointCloudRenderer, RendererCalls};
use crate::components::{Camera, LightSource, Renderable};
use crate::config::SceneConfig;
use crate::foundation::math::{Vec3, Vec4};
use crate::physics::Ray;
use crate::render::{
    BackendCommand, Material, PrimitiveTopology, RenderBucket, RenderQueue, ShaderId,
};
use crate::scene::{Layer, NodeId, Scene};

/// `(shader, x, z)` of every model matrix set, tagged with the bound shader
fn drawn(scene: &Scene) -> Vec<(u32, f32, f32)> {
    let mut shader = None;
    let mut drawn = Vec::new();
    for command in headless(scene).commands() {
        match command {
            BackendCommand::BindMaterial { shader: bound, .. } => shader = Some(bound.0),
            BackendCommand::SetModelMatrix(model) => {
                let shader = shader.expect("material bound before drawing");
                drawn.push((shader, model[(0, 3)], model[(2, 3)]));
            }
            _ => {}
        }
    }
    drawn
}

fn cube_at(scene: &mut Scene, name: &str, position: Vec3, material: Option<&Arc<Material>>) -> NodeId {
    let node = scene.create_node(name);
    scene.graph_mut().set_local_position(node, position).unwrap();
    let mut renderable = Renderable::new(cube(name)).unwrap();
    if let Some(material) = material {
        renderable = renderable.with_material(Arc::clone(material));
    }
    scene.add_component(node, renderable).unwrap();
    node
}

#[test]
fn test_frame_without_camera_clears_to_background() {
    let (mut scene, _clock) = scene();
    let node = scene.create_node("mesh");
    scene
        .add_component(node, Renderable::new(cube("cube")).unwrap())
        .unwrap();

    scene.frame().unwrap();

    let backend = headless(&scene);
    assert!(backend.commands().contains(&BackendCommand::Clear {
        color: Some(Vec4::new(0.8, 0.1, 0.8, 1.0)),
        depth: true,
    }));
    assert_eq!(backend.commands().last(), Some(&BackendCommand::Present));
    assert!(backend.draws().is_empty());
    assert_eq!(scene.stats().draw_calls, 0);
}

#[test]
fn test_zero_sized_screen_skips_rendering() {
    let (mut scene, _clock) = scene();
    let camera = scene.create_node("camera");
    scene.add_component(camera, Camera::new()).unwrap();
    scene.set_screen_size(0, 720);

    scene.frame().unwrap();

    assert!(headless(&scene).commands().is_empty());
    assert_eq!(scene.stats().frame, 1);
}

#[test]
fn test_visible_renderable_is_drawn_with_default_material() {
    let (mut scene, _clock) = scene();
    let camera = scene.create_node("camera");
    scene
        .graph_mut()
        .set_local_position(camera, Vec3::new(0.0, 0.0, 5.0))
        .unwrap();
    scene.add_component(camera, Camera::new()).unwrap();
    let sun = scene.create_node("sun");
    scene.add_component(sun, LightSource::directional()).unwrap();
    let target = scene.create_node("target");
    scene
        .add_component(target, Renderable::new(cube("cube")).unwrap())
        .unwrap();

    scene.frame().unwrap();

    let backend = headless(&scene);
    assert_eq!(backend.draws().len(), 1);
    assert!(backend.commands().contains(&BackendCommand::SetLights(1)));
    assert!(backend.commands().contains(&BackendCommand::BindMaterial {
        name: "default".into(),
        shader: ShaderId(0),
    }));
    assert_eq!(scene.stats().draw_calls, 1);
}

#[test]
fn test_cameras_render_by_order_with_stable_ties() {
    let (mut scene, _clock) = scene();
    for (name, order, x) in [("late", 1, 0.0), ("first", 0, 1.0), ("second", 0, 2.0)] {
        let node = scene.create_node(name);
        scene
            .graph_mut()
            .set_local_position(node, Vec3::new(x, 0.0, 5.0))
            .unwrap();
        scene.add_component(node, Camera::new().with_order(order)).unwrap();
    }

    scene.frame().unwrap();

    let cameras: Vec<(i32, f32)> = headless(&scene)
        .commands()
        .iter()
        .filter_map(|command| match command {
            BackendCommand::SetCamera { order, position } => Some((*order, position.x)),
            _ => None,
        })
        .collect();
    assert_eq!(cameras, [(0, 1.0), (0, 2.0), (1, 0.0)]);
}

#[test]
fn test_shared_mesh_uploads_once_and_releases_with_last_user() {
    let (mut scene, _clock) = scene();
    let mesh = cube("shared");
    let a = scene.create_node("a");
    let b = scene.create_node("b");
    scene
        .add_component(a, Renderable::new(Arc::clone(&mesh)).unwrap())
        .unwrap();
    scene
        .add_component(b, Renderable::new(Arc::clone(&mesh)).unwrap())
        .unwrap();

    assert_eq!(headless(&scene).upload_count(), 1);
    assert_eq!(scene.render_context().geometry().ref_count(&mesh), 2);

    scene.dispose_node(a).unwrap();
    assert_eq!(scene.render_context().geometry().ref_count(&mesh), 1);
    assert_eq!(headless(&scene).release_count(), 0);

    scene.dispose_node(b).unwrap();
    assert_eq!(headless(&scene).release_count(), 1);
    assert_eq!(headless(&scene).live_mesh_count(), 0);
}

#[test]
fn test_set_mesh_releases_old_geometry_before_binding_new() {
    let (mut scene, _clock) = scene();
    let old = cube("old");
    let new = cube("new");
    let node = scene.create_node("swapper");
    let keeper = scene.create_node("keeper");
    let renderable = scene
        .add_component(node, Renderable::new(Arc::clone(&old)).unwrap())
        .unwrap();
    scene
        .add_component(keeper, Renderable::new(Arc::clone(&old)).unwrap())
        .unwrap();

    scene.set_mesh(renderable, Arc::clone(&new)).unwrap();

    let geometry = scene.render_context().geometry();
    assert_eq!(geometry.ref_count(&old), 1);
    assert_eq!(geometry.ref_count(&new), 1);
    assert_eq!(headless(&scene).upload_count(), 2);
    assert_eq!(headless(&scene).release_count(), 0);
    assert!(Arc::ptr_eq(scene.renderable(renderable).unwrap().mesh().unwrap(), &new));
}

#[test]
fn test_material_change_moves_renderable_between_buckets() {
    let (mut scene, _clock) = scene();
    let node = scene.create_node("pane");
    let id = scene
        .add_component(node, Renderable::new(cube("pane")).unwrap())
        .unwrap();
    assert_eq!(scene.renderables().bucket_of(id.key), Some(RenderBucket::Opaque));

    let glass = Arc::new(Material::new("glass", ShaderId(2)).with_queue(RenderQueue::Transparent));
    scene.set_material(id, Some(glass)).unwrap();
    assert_eq!(scene.renderables().bucket_of(id.key), Some(RenderBucket::Transparent));
    assert_eq!(scene.renderables().len(), 1);

    scene.set_material(id, None).unwrap();
    assert_eq!(scene.renderables().bucket_of(id.key), Some(RenderBucket::Opaque));
}

#[test]
fn test_clear_releases_all_geometry() {
    let (mut scene, _clock) = scene();
    for name in ["a", "b", "c"] {
        let node = scene.create_node(name);
        scene
            .add_component(node, Renderable::new(cube(name)).unwrap())
            .unwrap();
    }
    assert_eq!(headless(&scene).live_mesh_count(), 3);

    scene.clear();

    assert_eq!(headless(&scene).live_mesh_count(), 0);
    assert!(scene.graph().is_empty());
    assert!(scene.renderables().is_empty());
}

#[test]
fn test_frame_draws_opaque_by_shader_then_transparent_back_to_front() {
    let (mut scene, _clock) = scene();
    let camera = scene.create_node("camera");
    scene.add_component(camera, Camera::new()).unwrap();

    let stone = Arc::new(Material::new("stone", ShaderId(2)));
    let moss = Arc::new(Material::new("moss", ShaderId(1)));
    let glass = Arc::new(Material::new("glass", ShaderId(7)).with_queue(RenderQueue::Transparent));
    cube_at(&mut scene, "left", Vec3::new(-1.0, 0.0, -20.0), Some(&stone));
    cube_at(&mut scene, "middle", Vec3::new(0.0, 0.0, -20.0), Some(&moss));
    cube_at(&mut scene, "right", Vec3::new(1.0, 0.0, -20.0), Some(&stone));
    for (name, distance) in [("near", 3.0), ("far", 7.0), ("mid", 5.0)] {
        cube_at(&mut scene, name, Vec3::new(0.0, 0.0, -distance), Some(&glass));
    }

    scene.frame().unwrap();
    let first = drawn(&scene);
    assert_eq!(
        first,
        [
            (1, 0.0, -20.0),
            (2, -1.0, -20.0),
            (2, 1.0, -20.0),
            (7, 0.0, -7.0),
            (7, 0.0, -5.0),
            (7, 0.0, -3.0),
        ]
    );
    assert_eq!(headless(&scene).draws().len(), 6);

    scene.frame().unwrap();
    let both = drawn(&scene);
    assert_eq!(both[first.len()..], first[..]);
}

#[test]
fn test_renderable_behind_camera_is_culled() {
    let (mut scene, _clock) = scene();
    let camera = scene.create_node("camera");
    scene.add_component(camera, Camera::new()).unwrap();
    cube_at(&mut scene, "ahead", Vec3::new(0.0, 0.0, -10.0), None);
    cube_at(&mut scene, "behind", Vec3::new(0.0, 0.0, 10.0), None);

    scene.frame().unwrap();

    assert_eq!(drawn(&scene), [(0, 0.0, -10.0)]);
    assert_eq!(scene.stats().culled, 1);
    assert_eq!(scene.stats().draw_calls, 1);
}

#[test]
fn test_culling_can_be_switched_off() {
    let config = SceneConfig {
        frustum_culling: false,
        ..SceneConfig::default()
    };
    let (mut scene, _clock) = scene_with(config);
    let camera = scene.create_node("camera");
    scene.add_component(camera, Camera::new()).unwrap();
    cube_at(&mut scene, "ahead", Vec3::new(0.0, 0.0, -10.0), None);
    cube_at(&mut scene, "behind", Vec3::new(0.0, 0.0, 10.0), None);

    scene.frame().unwrap();

    assert_eq!(headless(&scene).draws().len(), 2);
    assert_eq!(scene.stats().culled, 0);
}

#[test]
fn test_camera_layer_mask_skips_other_layers() {
    let (mut scene, _clock) = scene();
    let camera = scene.create_node("camera");
    scene
        .add_component(camera, Camera::new().with_layer(Layer::DEFAULT))
        .unwrap();
    cube_at(&mut scene, "world", Vec3::new(0.0, 0.0, -10.0), None);
    let overlay = cube_at(&mut scene, "overlay", Vec3::new(2.0, 0.0, -10.0), None);
    scene.graph_mut().set_layer(overlay, Layer::UI).unwrap();

    scene.frame().unwrap();

    assert_eq!(drawn(&scene), [(0, 0.0, -10.0)]);
    assert_eq!(scene.stats().culled, 0);
}

#[test]
fn test_default_material_shader_groups_materialless_renderables() {
    let (scene, _clock) = scene();
    let shared = Arc::new(Material::new("lit", ShaderId(3)));
    let mut scene = scene.with_default_material(Arc::clone(&shared));
    let camera = scene.create_node("camera");
    scene.add_component(camera, Camera::new()).unwrap();

    let other = Arc::new(Material::new("other", ShaderId(5)));
    cube_at(&mut scene, "a", Vec3::new(-2.0, 0.0, -10.0), Some(&shared));
    cube_at(&mut scene, "b", Vec3::new(0.0, 0.0, -10.0), Some(&other));
    cube_at(&mut scene, "c", Vec3::new(2.0, 0.0, -10.0), None);

    scene.frame().unwrap();

    assert_eq!(
        drawn(&scene),
        [(3, -2.0, -10.0), (3, 2.0, -10.0), (5, 0.0, -10.0)]
    );
    let binds = headless(&scene)
        .commands()
        .iter()
        .filter(|command| matches!(command, BackendCommand::BindMaterial { .. }))
        .count();
    assert_eq!(binds, 2);
}

#[test]
fn test_custom_renderer_follows_component_lifecycle() {
    let (mut scene, _clock) = scene();
    let camera = scene.create_node("camera");
    scene
        .graph_mut()
        .set_local_position(camera, Vec3::new(0.0, 0.0, 5.0))
        .unwrap();
    scene.add_component(camera, Camera::new()).unwrap();
    let calls = Rc::new(RendererCalls::default());
    let node = scene.create_node("sparks");

    let id = scene
        .add_component(node, Renderable::from_renderer(PointCloudRenderer::new(&calls)))
        .unwrap();
    assert_eq!(calls.counts(), (1, 0, 0));
    assert_eq!(headless(&scene).upload_count(), 1);

    scene.frame().unwrap();
    scene.frame().unwrap();
    assert_eq!(calls.counts(), (1, 2, 0));
    let draws = headless(&scene).draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].topology, PrimitiveTopology::Points);
    assert_eq!(draws[0].count, 4);

    // Nothing to hit, nothing to swap
    let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::z()).unwrap();
    assert!(scene.raycast(&ray).is_empty());
    assert!(scene.renderable(id).unwrap().mesh().is_none());
    assert!(scene.set_mesh(id, cube("cube")).is_err());

    assert!(scene.dispose_component(id).unwrap());
    assert_eq!(calls.counts(), (1, 2, 1));
    assert_eq!(headless(&scene).live_mesh_count(), 0);
}
