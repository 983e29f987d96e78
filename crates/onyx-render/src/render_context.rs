//! The immediate-mode drawing API.
//!
//! A [`RenderContext`] holds a stack of [`RenderState`]s and turns every draw call into one
//! or two instance records (see [`resolve_passes`]) appended to per-pass renderers. Nothing
//! reaches the GPU until the [`Renderer`](crate::Renderer) runs the frame protocol.
//!
//! A context is not internally synchronized: draw from one thread at a time, or use one
//! context per thread.
//!
//! # Example
//!
//! ```
//! # use std::sync::Arc;
//! use onyx_render::{BatchTable, Color, D2, MeshLayout, RenderContext, RendererConfig};
//! use onyx_test_utils::MockGpuDevice;
//!
//! let mut table = BatchTable::builder();
//! let square = table.add_static_mesh(MeshLayout { first_index: 0, index_count: 6, vertex_offset: 0 });
//! let registry = Arc::new(table.build());
//!
//! let mut context =
//!     RenderContext::<D2>::new(Arc::new(MockGpuDevice::new()), registry, &RendererConfig::default())
//!         .unwrap();
//! context.push();
//! context.fill(Color::ORANGE);
//! context.translate_x(3.0);
//! context.static_mesh(square);
//! context.pop();
//! context.flush();
//! ```

use std::sync::Arc;

use glam::{EulerRot, Quat, Vec2, Vec3};
use onyx_core::math::AffineTransform;
use onyx_core::profiling::profile_function;
use onyx_test_utils::{CommandRecorder, GpuDevice};

use crate::assets::{AssetRegistry, GeometryKind, Mesh, Primitive};
use crate::batched::{CircleRenderer, MeshRenderer, PolygonRenderer};
use crate::camera::CameraInfo;
use crate::color::Color;
use crate::config::RendererConfig;
use crate::copy::CopyInfo;
use crate::dimension::{D2, D3, Dimension, DimensionKind, axis_color};
use crate::error::Result;
use crate::frame::{FrameStats, PassInfo};
use crate::group::{PassRenderer, RenderGroup};
use crate::instance::CircleInstanceData;
use crate::light::{
    DirectionalLight, DirectionalLightHandle, LightSystem, PointLight, PointLightHandle,
    SceneLighting,
};
use crate::options::{AxesOptions, CircleOptions};
use crate::pipeline::UnlitPushConstants;
use crate::state::{MaterialData, RenderState, RenderStateFlags};
use crate::stencil::{StencilPass, resolve_passes};
use crate::target::{Target, ViewMask};
use crate::task::UploadJob;

pub type MeshGroup<D> = RenderGroup<
    MeshRenderer<<D as Dimension>::FillInstance>,
    MeshRenderer<<D as Dimension>::StencilInstance>,
>;

pub type CircleGroup<D> = RenderGroup<
    CircleRenderer<<D as Dimension>::FillInstance>,
    CircleRenderer<<D as Dimension>::StencilInstance>,
>;

pub type PolygonGroup<D> = RenderGroup<
    PolygonRenderer<<D as Dimension>::Vertex, <D as Dimension>::FillInstance>,
    PolygonRenderer<<D as Dimension>::Vertex, <D as Dimension>::StencilInstance>,
>;

pub struct RenderContext<D: Dimension> {
    registry: Arc<dyn AssetRegistry>,
    states: Vec<RenderState<D>>,
    generation: u64,
    view_mask: ViewMask,
    meshes: MeshGroup<D>,
    primitives: MeshGroup<D>,
    circles: CircleGroup<D>,
    polygons: PolygonGroup<D>,
    lighting: D::Lighting,
}

impl<D: Dimension> RenderContext<D> {
    pub fn new(
        device: Arc<dyn GpuDevice>,
        registry: Arc<dyn AssetRegistry>,
        config: &RendererConfig,
    ) -> Result<Self> {
        config.validate();
        let dimension = match D::KIND {
            DimensionKind::Two => "2d",
            DimensionKind::Three => "3d",
        };
        let label = |family: &str, pass: StencilPass| {
            config.label(&format!("{dimension}::{family}::{}", pass.name()))
        };
        let mesh = |kind: GeometryKind, family: &'static str| {
            let device = &device;
            let registry = &registry;
            let label = &label;
            RenderGroup::try_new(
                move |pass| {
                    MeshRenderer::new(device.clone(), registry.clone(), kind, label(family, pass), config)
                },
                move |pass| {
                    MeshRenderer::new(device.clone(), registry.clone(), kind, label(family, pass), config)
                },
            )
        };

        let meshes = mesh(GeometryKind::StaticMesh, "mesh")?;
        let primitives = mesh(GeometryKind::Primitive, "primitive")?;
        let circles = RenderGroup::try_new(
            |pass| CircleRenderer::new(device.clone(), label("circle", pass), config),
            |pass| CircleRenderer::new(device.clone(), label("circle", pass), config),
        )?;
        let polygons = RenderGroup::try_new(
            |pass| PolygonRenderer::new(device.clone(), label("polygon", pass), config),
            |pass| PolygonRenderer::new(device.clone(), label("polygon", pass), config),
        )?;
        let lighting = D::Lighting::new(device.clone(), config)?;

        tracing::debug!("Created {} render context", dimension);

        Ok(Self {
            registry,
            states: vec![RenderState::default()],
            generation: 0,
            view_mask: ViewMask::NONE,
            meshes,
            primitives,
            circles,
            polygons,
            lighting,
        })
    }

    // --- State stack -----------------------------------------------------------------------

    /// Duplicate the current state.
    pub fn push(&mut self) {
        let state = *self.state();
        self.states.push(state);
    }

    /// Push an explicit state.
    pub fn push_state(&mut self, state: RenderState<D>) {
        self.states.push(state);
    }

    /// Restore the state active before the matching `push`.
    ///
    /// # Panics
    ///
    /// Panics when there is no matching `push`.
    pub fn pop(&mut self) {
        assert!(
            self.states.len() > 1,
            "For every push(), there must be a pop()"
        );
        self.states.pop();
    }

    pub fn depth(&self) -> usize {
        self.states.len()
    }

    /// Start a new frame: reset the state, drop every instance and light.
    ///
    /// Device capacity is kept.
    ///
    /// # Panics
    ///
    /// Panics if a `push` is still unmatched.
    pub fn flush(&mut self) {
        assert!(
            self.states.len() == 1,
            "Mismatched push() call found. For every push(), there must be a pop()"
        );
        self.states[0] = RenderState::default();
        self.meshes.flush();
        self.primitives.flush();
        self.circles.flush();
        self.polygons.flush();
        self.lighting.flush();
        self.generation += 1;
    }

    /// Number of `flush` calls so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the context was flushed since `generation` was observed.
    pub fn is_dirty(&self, generation: u64) -> bool {
        generation != self.generation
    }

    pub fn state(&self) -> &RenderState<D> {
        &self.states[self.states.len() - 1]
    }

    pub fn state_mut(&mut self) -> &mut RenderState<D> {
        let top = self.states.len() - 1;
        &mut self.states[top]
    }

    pub fn set_state(&mut self, state: RenderState<D>) {
        *self.state_mut() = state;
    }

    // --- Render state ----------------------------------------------------------------------

    /// Enable filling with `color`.
    pub fn fill(&mut self, color: Color) {
        let state = self.state_mut();
        state.fill_color = color;
        state.flags |= RenderStateFlags::FILL;
    }

    pub fn set_fill(&mut self, enabled: bool) {
        self.state_mut().flags.set(RenderStateFlags::FILL, enabled);
    }

    /// Enable outlining with `color`.
    pub fn outline(&mut self, color: Color) {
        let state = self.state_mut();
        state.outline_color = color;
        state.flags |= RenderStateFlags::OUTLINE;
    }

    pub fn set_outline(&mut self, enabled: bool) {
        self.state_mut().flags.set(RenderStateFlags::OUTLINE, enabled);
    }

    /// Enable outlining with the given width.
    pub fn outline_width(&mut self, width: f32) {
        debug_assert!(width >= 0.0, "Outline width must not be negative, got {width}");
        if width < 0.0 {
            tracing::warn!("Negative outline width {}", width);
        }
        let state = self.state_mut();
        state.outline_width = width;
        state.flags |= RenderStateFlags::OUTLINE;
    }

    pub fn alpha(&mut self, alpha: f32) {
        self.state_mut().fill_color.a = alpha;
    }

    pub fn alpha_u8(&mut self, alpha: u8) {
        self.alpha(alpha as f32 / 255.0);
    }

    pub fn add_flags(&mut self, flags: RenderStateFlags) {
        self.state_mut().flags |= flags;
    }

    pub fn remove_flags(&mut self, flags: RenderStateFlags) {
        self.state_mut().flags &= !flags;
    }

    // --- Transform -------------------------------------------------------------------------

    /// Apply `transform` on top of the current one, in world space.
    pub fn transform(&mut self, transform: D::Matrix) {
        let state = self.state_mut();
        state.transform = transform * state.transform;
    }

    pub fn transform_trs(&mut self, translation: D::Vector, scale: D::Vector, rotation: D::Rotation) {
        self.transform(D::Matrix::from_trs(translation, scale, rotation));
    }

    pub fn transform_uniform(&mut self, translation: D::Vector, scale: f32, rotation: D::Rotation) {
        self.transform_trs(translation, D::Matrix::splat_vector(scale), rotation);
    }

    pub fn translate(&mut self, translation: D::Vector) {
        self.state_mut().transform.translate_extrinsic(translation);
    }

    pub fn translate_x(&mut self, x: f32) {
        self.state_mut().transform.translate_axis_extrinsic(0, x);
    }

    pub fn translate_y(&mut self, y: f32) {
        self.state_mut().transform.translate_axis_extrinsic(1, y);
    }

    pub fn set_translation(&mut self, translation: D::Vector) {
        self.state_mut().transform.set_translation(translation);
    }

    pub fn set_translation_x(&mut self, x: f32) {
        self.state_mut().transform.set_translation_axis(0, x);
    }

    pub fn set_translation_y(&mut self, y: f32) {
        self.state_mut().transform.set_translation_axis(1, y);
    }

    pub fn scale(&mut self, scale: D::Vector) {
        self.state_mut().transform.scale_extrinsic(scale);
    }

    pub fn scale_uniform(&mut self, scale: f32) {
        self.scale(D::Matrix::splat_vector(scale));
    }

    pub fn scale_x(&mut self, x: f32) {
        self.state_mut().transform.scale_axis_extrinsic(0, x);
    }

    pub fn scale_y(&mut self, y: f32) {
        self.state_mut().transform.scale_axis_extrinsic(1, y);
    }

    // --- Draws -----------------------------------------------------------------------------

    fn submit_mesh(
        group: &mut MeshGroup<D>,
        state: &RenderState<D>,
        batch: u32,
        transform: &D::Matrix,
    ) {
        for &pass in resolve_passes(state.flags) {
            match group.renderer_mut(pass) {
                PassRenderer::Fill(renderer) => renderer.draw(batch, D::fill_instance(transform, state)),
                PassRenderer::Stencil(renderer) => {
                    renderer.draw(batch, D::stencil_instance(transform, state))
                }
            }
        }
    }

    /// Draw a registered static mesh with the current transform.
    pub fn static_mesh(&mut self, mesh: Mesh) {
        let transform = self.state().transform;
        self.static_mesh_transformed(mesh, &transform);
    }

    /// Draw a static mesh with `transform` applied on top of the current transform.
    pub fn static_mesh_with(&mut self, mesh: Mesh, transform: D::Matrix) {
        let transform = transform * self.state().transform;
        self.static_mesh_transformed(mesh, &transform);
    }

    fn static_mesh_transformed(&mut self, mesh: Mesh, transform: &D::Matrix) {
        let batch = self.registry.static_mesh_batch_index(mesh);
        let state = *self.state();
        Self::submit_mesh(&mut self.meshes, &state, batch, transform);
    }

    pub fn primitive(&mut self, primitive: Primitive) {
        let transform = self.state().transform;
        self.primitive_transformed(primitive, &transform);
    }

    pub fn primitive_with(&mut self, primitive: Primitive, transform: D::Matrix) {
        let transform = transform * self.state().transform;
        self.primitive_transformed(primitive, &transform);
    }

    fn primitive_transformed(&mut self, primitive: Primitive, transform: &D::Matrix) {
        let batch = self.registry.primitive_batch_index(primitive);
        let state = *self.state();
        Self::submit_mesh(&mut self.primitives, &state, batch, transform);
    }

    pub fn circle(&mut self, options: &CircleOptions) {
        let transform = self.state().transform;
        self.circle_transformed(&transform, options);
    }

    pub fn circle_with(&mut self, transform: D::Matrix, options: &CircleOptions) {
        let transform = transform * self.state().transform;
        self.circle_transformed(&transform, options);
    }

    fn circle_transformed(&mut self, transform: &D::Matrix, options: &CircleOptions) {
        let state = *self.state();
        for &pass in resolve_passes(state.flags) {
            match self.circles.renderer_mut(pass) {
                PassRenderer::Fill(renderer) => renderer.draw(CircleInstanceData::new(
                    D::fill_instance(transform, &state),
                    options,
                )),
                PassRenderer::Stencil(renderer) => renderer.draw(CircleInstanceData::new(
                    D::stencil_instance(transform, &state),
                    options,
                )),
            }
        }
    }

    /// Draw a convex polygon given in local 2D coordinates.
    ///
    /// # Panics
    ///
    /// Panics if fewer than 3 vertices are given.
    pub fn polygon(&mut self, vertices: &[Vec2]) {
        let transform = self.state().transform;
        self.polygon_transformed(&transform, vertices);
    }

    pub fn polygon_with(&mut self, transform: D::Matrix, vertices: &[Vec2]) {
        let transform = transform * self.state().transform;
        self.polygon_transformed(&transform, vertices);
    }

    fn polygon_transformed(&mut self, transform: &D::Matrix, vertices: &[Vec2]) {
        assert!(vertices.len() >= 3, "A polygon must have at least 3 vertices");
        let state = *self.state();
        let vertices: Vec<D::Vertex> = vertices.iter().copied().map(D::polygon_vertex).collect();
        for &pass in resolve_passes(state.flags) {
            match self.polygons.renderer_mut(pass) {
                PassRenderer::Fill(renderer) => {
                    renderer.draw(D::fill_instance(transform, &state), &vertices)
                }
                PassRenderer::Stencil(renderer) => {
                    renderer.draw(D::stencil_instance(transform, &state), &vertices)
                }
            }
        }
    }

    /// Draw `mesh` stretched from `start` to `end`.
    ///
    /// The mesh is expected to span `[-0.5, 0.5]` along its local X axis.
    pub fn line(&mut self, mesh: Mesh, start: D::Vector, end: D::Vector, thickness: f32) {
        let transform = D::line_transform(&self.state().transform, start, end, thickness);
        self.static_mesh_transformed(mesh, &transform);
    }

    /// Draw one colored line per axis, from `-size` to `size`.
    pub fn axes(&mut self, mesh: Mesh, options: &AxesOptions) {
        let fill_color = self.state().fill_color;
        for axis in 0..D::Matrix::AXES {
            self.state_mut().fill_color = axis_color::<D>(axis);
            let end = D::unit_axis(axis) * options.size;
            self.line(mesh, end * -1.0, end, options.thickness);
        }
        self.state_mut().fill_color = fill_color;
    }

    // --- Targets ---------------------------------------------------------------------------

    pub fn add_target(&mut self, target: &impl Target) {
        self.view_mask |= target.view_bit();
    }

    pub fn remove_target(&mut self, target: &impl Target) {
        self.view_mask.remove(target.view_bit());
    }

    pub fn view_mask(&self) -> ViewMask {
        self.view_mask
    }

    pub fn renders_to(&self, target: ViewMask) -> bool {
        self.view_mask.intersects(target)
    }

    // --- Inspection ------------------------------------------------------------------------

    pub fn meshes(&self) -> &MeshGroup<D> {
        &self.meshes
    }

    pub fn primitives(&self) -> &MeshGroup<D> {
        &self.primitives
    }

    pub fn circles(&self) -> &CircleGroup<D> {
        &self.circles
    }

    pub fn polygons(&self) -> &PolygonGroup<D> {
        &self.polygons
    }

    /// Instances recorded for `pass` across every geometry family.
    pub fn instance_count(&self, pass: StencilPass) -> usize {
        self.meshes.instance_count(pass)
            + self.primitives.instance_count(pass)
            + self.circles.instance_count(pass)
            + self.polygons.instance_count(pass)
    }

    pub fn has_instances(&self) -> bool {
        self.meshes.has_instances()
            || self.primitives.has_instances()
            || self.circles.has_instances()
            || self.polygons.has_instances()
    }

    // --- Frame protocol --------------------------------------------------------------------

    pub fn grow_to_fit(&mut self, frame: usize) -> Result<()> {
        profile_function!();
        self.meshes.grow_to_fit(frame)?;
        self.primitives.grow_to_fit(frame)?;
        self.circles.grow_to_fit(frame)?;
        self.polygons.grow_to_fit(frame)?;
        self.lighting.grow_to_fit(frame)
    }

    pub fn upload_jobs(&mut self, frame: usize, jobs: &mut Vec<UploadJob>) -> Result<()> {
        self.meshes.upload_jobs(frame, jobs)?;
        self.primitives.upload_jobs(frame, jobs)?;
        self.circles.upload_jobs(frame, jobs)?;
        self.polygons.upload_jobs(frame, jobs)?;
        self.lighting.upload_jobs(frame, jobs)
    }

    pub fn record_copy_commands(&self, frame: usize, info: &mut CopyInfo<'_>) -> Result<()> {
        self.meshes.record_copy_commands(frame, info)?;
        self.primitives.record_copy_commands(frame, info)?;
        self.circles.record_copy_commands(frame, info)?;
        self.polygons.record_copy_commands(frame, info)?;
        self.lighting.record_copy_commands(frame, info)
    }

    /// Record one stencil pass of every geometry family for `camera`.
    pub fn render_pass(
        &self,
        frame: usize,
        pass: StencilPass,
        camera: &CameraInfo,
        recorder: &mut dyn CommandRecorder,
        stats: &mut FrameStats,
    ) -> Result<()> {
        if !self.has_instances() {
            return Ok(());
        }
        let mut info = PassInfo {
            frame,
            dimension: D::KIND,
            pass,
            recorder,
            unlit: UnlitPushConstants::new(&camera.projection_view),
            lighting: self.lighting.lit_binding(frame, camera)?,
            stats,
        };
        self.meshes.render(&mut info)?;
        self.primitives.render(&mut info)?;
        self.circles.render(&mut info)?;
        self.polygons.render(&mut info)
    }
}

impl RenderContext<D2> {
    pub fn rotate(&mut self, angle: f32) {
        self.state_mut().transform.rotate_extrinsic(angle);
    }
}

impl RenderContext<D3> {
    pub fn translate_z(&mut self, z: f32) {
        self.state_mut().transform.translate_axis_extrinsic(2, z);
    }

    pub fn set_translation_z(&mut self, z: f32) {
        self.state_mut().transform.set_translation_axis(2, z);
    }

    pub fn scale_z(&mut self, z: f32) {
        self.state_mut().transform.scale_axis_extrinsic(2, z);
    }

    pub fn rotate(&mut self, rotation: Quat) {
        self.state_mut().transform.rotate_extrinsic(rotation);
    }

    /// Rotate by Euler angles in radians, applied X first, then Y, then Z.
    pub fn rotate_euler(&mut self, angles: Vec3) {
        self.rotate(euler(angles));
    }

    pub fn rotate_axis(&mut self, angle: f32, axis: Vec3) {
        self.rotate(Quat::from_axis_angle(axis.normalize(), angle));
    }

    pub fn rotate_x(&mut self, angle: f32) {
        self.rotate(Quat::from_rotation_x(angle));
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.rotate(Quat::from_rotation_y(angle));
    }

    pub fn rotate_z(&mut self, angle: f32) {
        self.rotate(Quat::from_rotation_z(angle));
    }

    pub fn transform_euler(&mut self, translation: Vec3, scale: Vec3, angles: Vec3) {
        self.transform_trs(translation, scale, euler(angles));
    }

    // --- Material --------------------------------------------------------------------------

    /// Color of lights added from now on.
    pub fn light_color(&mut self, color: Color) {
        self.state_mut().surface.light_color = color;
    }

    pub fn material(&mut self, material: MaterialData) {
        self.state_mut().surface.material = material;
    }

    pub fn diffuse_contribution(&mut self, contribution: f32) {
        self.state_mut().surface.material.diffuse_contribution = contribution;
    }

    pub fn specular_contribution(&mut self, contribution: f32) {
        self.state_mut().surface.material.specular_contribution = contribution;
    }

    pub fn specular_sharpness(&mut self, sharpness: f32) {
        self.state_mut().surface.material.specular_sharpness = sharpness;
    }

    // --- Lights ----------------------------------------------------------------------------

    /// Add a point light at `position`, transformed by the current transform.
    pub fn add_point_light(&mut self, position: Vec3, radius: f32, intensity: f32) -> PointLightHandle {
        let state = self.state();
        let light = PointLight::new(
            state.transform.transform_point3(position),
            radius,
            intensity,
            state.surface.light_color,
            self.view_mask,
        );
        self.lighting.add_point_light(light)
    }

    /// Add a directional light along `direction`, rotated by the current transform.
    pub fn add_directional_light(&mut self, direction: Vec3, intensity: f32) -> DirectionalLightHandle {
        let state = self.state();
        let light = DirectionalLight::new(
            state.transform.transform_vector3(direction),
            intensity,
            state.surface.light_color,
            self.view_mask,
        );
        self.lighting.add_directional_light(light)
    }

    pub fn remove_point_light(&mut self, handle: PointLightHandle) -> Option<PointLight> {
        self.lighting.remove_point_light(handle)
    }

    pub fn remove_directional_light(&mut self, handle: DirectionalLightHandle) -> Option<DirectionalLight> {
        self.lighting.remove_directional_light(handle)
    }

    pub fn point_light_mut(&mut self, handle: PointLightHandle) -> Option<&mut PointLight> {
        self.lighting.point_light_mut(handle)
    }

    pub fn directional_light_mut(&mut self, handle: DirectionalLightHandle) -> Option<&mut DirectionalLight> {
        self.lighting.directional_light_mut(handle)
    }

    pub fn ambient_color(&mut self, color: Color) {
        self.lighting.set_ambient_color(color);
    }

    pub fn ambient_intensity(&mut self, intensity: f32) {
        self.lighting.set_ambient_intensity(intensity);
    }

    pub fn lighting(&self) -> &SceneLighting {
        &self.lighting
    }
}

fn euler(angles: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZYX, angles.z, angles.y, angles.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{BatchTable, MeshLayout};
    use glam::Mat3;
    use onyx_test_utils::MockGpuDevice;
    use std::f32::consts::FRAC_PI_2;

    fn context<D: Dimension>() -> (RenderContext<D>, Mesh) {
        let mut table = BatchTable::builder();
        let mesh = table.add_static_mesh(MeshLayout {
            first_index: 0,
            index_count: 6,
            vertex_offset: 0,
        });
        table.add_primitive(MeshLayout {
            first_index: 6,
            index_count: 36,
            vertex_offset: 4,
        });
        let context = RenderContext::new(
            Arc::new(MockGpuDevice::new()),
            Arc::new(table.build()),
            &RendererConfig::default(),
        )
        .unwrap();
        (context, mesh)
    }

    #[test]
    fn test_push_pop_restores_state() {
        let (mut ctx, _) = context::<D2>();
        ctx.fill(Color::RED);
        ctx.push();
        ctx.fill(Color::BLUE);
        ctx.translate_x(4.0);
        assert_eq!(ctx.depth(), 2);
        ctx.pop();

        assert_eq!(ctx.state().fill_color, Color::RED);
        assert_eq!(ctx.state().transform, Mat3::IDENTITY);
    }

    #[test]
    #[should_panic(expected = "For every push(), there must be a pop()")]
    fn test_pop_at_base_panics() {
        let (mut ctx, _) = context::<D2>();
        ctx.pop();
    }

    #[test]
    fn test_flush_resets_state_and_bumps_generation() {
        let (mut ctx, mesh) = context::<D2>();
        ctx.fill(Color::GREEN);
        ctx.static_mesh(mesh);
        let generation = ctx.generation();

        ctx.flush();

        assert!(ctx.is_dirty(generation));
        assert!(!ctx.is_dirty(ctx.generation()));
        assert_eq!(*ctx.state(), RenderState::default());
        assert!(!ctx.has_instances());
    }

    #[test]
    fn test_transform_composes_in_world_space() {
        let (mut ctx, _) = context::<D2>();
        ctx.translate_x(1.0);
        ctx.rotate(FRAC_PI_2);

        let point = ctx.state().transform.transform_point2(Vec2::ZERO);
        assert!(point.abs_diff_eq(Vec2::new(0.0, 1.0), 1e-6));
    }

    #[test]
    fn test_static_mesh_with_applies_local_transform_first() {
        let (mut ctx, mesh) = context::<D2>();
        ctx.scale_uniform(2.0);
        ctx.static_mesh_with(mesh, Mat3::from_translation(Vec2::new(1.0, 0.0)));

        let instance = ctx.meshes().no_stencil_write_do_fill.instances(0)[0];
        let expected = Mat3::from_translation(Vec2::new(1.0, 0.0)) * Mat3::from_scale(Vec2::splat(2.0));
        assert!(instance.transform().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_primitives_use_their_own_group() {
        let (mut ctx, _) = context::<D3>();
        ctx.primitive(Primitive(0));
        assert_eq!(ctx.primitives().instance_count(StencilPass::NoStencilWriteDoFill), 1);
        assert_eq!(ctx.meshes().total_instances(), 0);
        assert_eq!(ctx.primitives().no_stencil_write_do_fill.instances(1).len(), 1);
    }

    #[test]
    fn test_axes_restores_fill_color() {
        let (mut ctx, mesh) = context::<D3>();
        ctx.fill(Color::PINK);
        ctx.axes(mesh, &AxesOptions::default());

        assert_eq!(ctx.state().fill_color, Color::PINK);
        let colors: Vec<_> = ctx
            .meshes()
            .no_stencil_write_do_fill
            .iter()
            .map(|instance| instance.base_color)
            .collect();
        assert_eq!(
            colors,
            (0..3).map(|axis| axis_color::<D3>(axis).pack()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_no_flags_draw_nothing() {
        let (mut ctx, mesh) = context::<D2>();
        ctx.set_fill(false);
        ctx.static_mesh(mesh);
        ctx.circle(&CircleOptions::default());
        assert!(!ctx.has_instances());
    }

    #[test]
    fn test_outline_width_enables_outline() {
        let (mut ctx, _) = context::<D2>();
        ctx.outline_width(0.25);
        assert!(ctx.state().outlines());
        assert!(ctx.state().fills());
    }

    #[test]
    fn test_targets() {
        let (mut ctx, _) = context::<D2>();
        ctx.add_target(&ViewMask::bit(0));
        ctx.add_target(&ViewMask::bit(3));
        ctx.remove_target(&ViewMask::bit(0));

        assert_eq!(ctx.view_mask(), ViewMask::bit(3));
        assert!(ctx.renders_to(ViewMask::bit(3)));
        assert!(!ctx.renders_to(ViewMask::bit(0)));
    }

    #[test]
    fn test_lights_follow_transform_and_mask() {
        let (mut ctx, _) = context::<D3>();
        ctx.add_target(&ViewMask::bit(1));
        ctx.light_color(Color::YELLOW);
        ctx.translate(Vec3::new(0.0, 5.0, 0.0));
        let point = ctx.add_point_light(Vec3::new(1.0, 0.0, 0.0), 2.0, 1.0);
        let directional = ctx.add_directional_light(Vec3::NEG_Y, 0.5);

        let light = *ctx.point_light_mut(point).unwrap();
        assert!(light.position().abs_diff_eq(Vec3::new(1.0, 5.0, 0.0), 1e-6));
        assert_eq!(light.color(), Color::YELLOW);
        assert_eq!(light.view_mask(), ViewMask::bit(1));
        // Translation does not affect directions.
        assert_eq!(ctx.directional_light_mut(directional).unwrap().direction(), Vec3::NEG_Y);

        assert!(ctx.remove_point_light(point).is_some());
        assert!(ctx.point_light_mut(point).is_none());
    }

    #[test]
    fn test_rotate_euler_applies_x_first() {
        let (mut ctx, _) = context::<D3>();
        ctx.rotate_euler(Vec3::new(FRAC_PI_2, 0.0, FRAC_PI_2));
        let y = ctx.state().transform.transform_vector3(Vec3::Y);
        // X turns +Y into +Z, Z leaves +Z alone.
        assert!(y.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn test_material_reaches_fill_instances() {
        let (mut ctx, mesh) = context::<D3>();
        ctx.diffuse_contribution(0.5);
        ctx.specular_sharpness(8.0);
        ctx.static_mesh(mesh);

        let instance = ctx.meshes().no_stencil_write_do_fill.instances(0)[0];
        assert_eq!(instance.diffuse_contribution, 0.5);
        assert_eq!(instance.specular_contribution, 0.2);
        assert_eq!(instance.specular_sharpness, 8.0);
    }
}
