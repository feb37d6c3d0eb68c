//! Pluggable render techniques
//!
//! A technique turns the per-frame camera list, light list and renderable
//! partitions into backend calls. [`ForwardTechnique`] is the single-pass
//! implementation: every camera draws the opaque bucket in shader order and
//! then the transparent bucket back to front.

use std::sync::Arc;

use crate::components::{CameraView, LightView};
use crate::render::{Frustum, GpuBackend, Material, RenderError};
use crate::scene::render_queue::{RenderItem, RenderableCollection};

/// Strategy that renders one frame
pub trait RenderTechnique {
    /// Technique name for logs
    fn name(&self) -> &str;

    /// Render every camera. `cameras` is already sorted by order.
    /// Returns the number of draw calls issued.
    fn render_all(
        &mut self,
        cameras: &[CameraView],
        lights: &[LightView],
        renderables: &mut RenderableCollection,
        backend: &mut dyn GpuBackend,
    ) -> Result<usize, RenderError>;

    /// Renderables skipped by visibility culling during the last frame
    fn culled_last_frame(&self) -> usize {
        0
    }
}

/// Single-pass forward renderer
#[derive(Debug, Clone)]
pub struct ForwardTechnique {
    frustum_culling: bool,
    culled_last_frame: usize,
}

impl Default for ForwardTechnique {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ForwardTechnique {
    /// Create the technique
    pub fn new(frustum_culling: bool) -> Self {
        Self {
            frustum_culling,
            culled_last_frame: 0,
        }
    }

    fn draw_bucket<'a>(
        &mut self,
        items: impl Iterator<Item = &'a RenderItem>,
        camera: &CameraView,
        frustum: Option<&Frustum>,
        backend: &mut dyn GpuBackend,
    ) -> Result<usize, RenderError> {
        let mut draws = 0;
        let mut bound: Option<&Arc<Material>> = None;
        for item in items {
            if !camera.layer.intersects(item.layer) {
                continue;
            }
            let Some(call) = item.draw else {
                continue;
            };
            if let (Some(frustum), Some(bounds)) = (frustum, item.bounds.as_ref()) {
                if !frustum.intersects_sphere(bounds) {
                    self.culled_last_frame += 1;
                    continue;
                }
            }

            if !bound.is_some_and(|material| Arc::ptr_eq(material, &item.material)) {
                backend.bind_material(&item.material)?;
                bound = Some(&item.material);
            }
            backend.set_model_matrix(&item.model);
            backend.draw(&call)?;
            draws += 1;
        }
        Ok(draws)
    }

}

impl RenderTechnique for ForwardTechnique {
    fn name(&self) -> &str {
        "forward"
    }

    fn render_all(
        &mut self,
        cameras: &[CameraView],
        lights: &[LightView],
        renderables: &mut RenderableCollection,
        backend: &mut dyn GpuBackend,
    ) -> Result<usize, RenderError> {
        self.culled_last_frame = 0;
        let mut draws = 0;

        for (index, camera) in cameras.iter().enumerate() {
            // Only the first camera clears colour; later ones overlay
            let color = (index == 0).then_some(camera.clear_color);
            backend.clear(color, true)?;
            backend.set_camera(camera);
            backend.set_lights(lights);

            renderables.sort_for_camera(camera.position);
            let frustum = self
                .frustum_culling
                .then(|| Frustum::from_matrix(&camera.view_projection));

            draws += self.draw_bucket(renderables.opaque_items(), camera, frustum.as_ref(), backend)?;
            draws += self.draw_bucket(
                renderables.transparent_items(),
                camera,
                frustum.as_ref(),
                backend,
            )?;
        }

        backend.present()?;
        log::trace!(
            "Forward pass: {} cameras, {} draws, {} culled",
            cameras.len(),
            draws,
            self.culled_last_frame
        );
        Ok(draws)
    }

    fn culled_last_frame(&self) -> usize {
        self.culled_last_frame
    }
}
