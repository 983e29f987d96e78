//! Scene lights of 3D contexts and their per-frame device storage.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use onyx_test_utils::{BufferKind, GpuBindGroup, GpuDevice, StorageDescriptorDesc};

use crate::camera::CameraInfo;
use crate::color::Color;
use crate::config::RendererConfig;
use crate::copy::CopyInfo;
use crate::device_data::DeviceData;
use crate::error::{RenderError, Result};
use crate::pipeline::LitPushConstants;
use crate::target::ViewMask;
use crate::task::UploadJob;

/// Ambient light of a fresh context: white at 40% intensity.
pub const DEFAULT_AMBIENT: Color = Color::rgba(1.0, 1.0, 1.0, 0.4);

fn split_mask(mask: ViewMask) -> [u32; 2] {
    let bits = mask.bits();
    [bits as u32, (bits >> 32) as u32]
}

/// Device record of a [`DirectionalLight`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightData {
    pub direction_intensity: [f32; 4],
    pub color: u32,
    pub _padding: u32,
    /// View mask split into low and high words.
    pub view_mask: [u32; 2],
}

/// Device record of a [`PointLight`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightData {
    pub position_intensity: [f32; 4],
    pub radius: f32,
    pub color: u32,
    pub view_mask: [u32; 2],
}

static_assertions::assert_eq_size!(DirectionalLightData, [u8; 32]);
static_assertions::assert_eq_size!(PointLightData, [u8; 32]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    position: Vec3,
    radius: f32,
    intensity: f32,
    color: Color,
    view_mask: ViewMask,
    dirty: bool,
}

impl PointLight {
    pub fn new(position: Vec3, radius: f32, intensity: f32, color: Color, view_mask: ViewMask) -> Self {
        Self {
            position,
            radius,
            intensity,
            color,
            view_mask,
            dirty: true,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn view_mask(&self) -> ViewMask {
        self.view_mask
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty = true;
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        self.dirty = true;
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
        self.dirty = true;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.dirty = true;
    }

    pub fn set_view_mask(&mut self, view_mask: ViewMask) {
        self.view_mask = view_mask;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_non_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn to_device(&self) -> PointLightData {
        PointLightData {
            position_intensity: self.position.extend(self.intensity).to_array(),
            radius: self.radius,
            color: self.color.pack(),
            view_mask: split_mask(self.view_mask),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    direction: Vec3,
    intensity: f32,
    color: Color,
    view_mask: ViewMask,
    dirty: bool,
}

impl DirectionalLight {
    /// `direction` is normalized; a zero vector is kept as is.
    pub fn new(direction: Vec3, intensity: f32, color: Color, view_mask: ViewMask) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            intensity,
            color,
            view_mask,
            dirty: true,
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn view_mask(&self) -> ViewMask {
        self.view_mask
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.normalize_or_zero();
        self.dirty = true;
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
        self.dirty = true;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.dirty = true;
    }

    pub fn set_view_mask(&mut self, view_mask: ViewMask) {
        self.view_mask = view_mask;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_non_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn to_device(&self) -> DirectionalLightData {
        DirectionalLightData {
            direction_intensity: self.direction.extend(self.intensity).to_array(),
            color: self.color.pack(),
            _padding: 0,
            view_mask: split_mask(self.view_mask),
        }
    }
}

/// Handle of a light owned by a [`LightPool`].
///
/// Handles die with the pool's epoch: after a clear every older handle resolves to nothing,
/// even if its slot was reused.
pub struct LightHandle<T> {
    index: u32,
    epoch: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for LightHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LightHandle<T> {}

impl<T> PartialEq for LightHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.epoch == other.epoch
    }
}

impl<T> Eq for LightHandle<T> {}

impl<T> fmt::Debug for LightHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightHandle")
            .field("index", &self.index)
            .field("epoch", &self.epoch)
            .finish()
    }
}

pub type PointLightHandle = LightHandle<PointLight>;
pub type DirectionalLightHandle = LightHandle<DirectionalLight>;

/// Slot arena of lights with free-list reuse.
#[derive(Debug)]
pub struct LightPool<T> {
    slots: Vec<Option<T>>,
    free: Vec<u32>,
    epoch: u32,
    live: usize,
}

impl<T> Default for LightPool<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            epoch: 0,
            live: 0,
        }
    }
}

impl<T> LightPool<T> {
    pub fn insert(&mut self, light: T) -> LightHandle<T> {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(light);
                index
            }
            None => {
                self.slots.push(Some(light));
                self.slots.len() as u32 - 1
            }
        };
        self.live += 1;
        LightHandle {
            index,
            epoch: self.epoch,
            _marker: PhantomData,
        }
    }

    /// Remove the light behind `handle`, returning it if it was still alive.
    pub fn remove(&mut self, handle: LightHandle<T>) -> Option<T> {
        if handle.epoch != self.epoch {
            return None;
        }
        let light = self.slots.get_mut(handle.index as usize)?.take()?;
        self.free.push(handle.index);
        self.live -= 1;
        Some(light)
    }

    pub fn get(&self, handle: LightHandle<T>) -> Option<&T> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.slots.get(handle.index as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: LightHandle<T>) -> Option<&mut T> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.slots.get_mut(handle.index as usize)?.as_mut()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().flatten()
    }

    /// Drop every light and invalidate all outstanding handles.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

/// Light buffers of every frame slot plus the descriptor binding both of them.
pub struct LightDeviceData {
    device: Arc<dyn GpuDevice>,
    label: String,
    directional: DeviceData<DirectionalLightData>,
    point: DeviceData<PointLightData>,
    descriptors: Vec<GpuBindGroup>,
}

impl LightDeviceData {
    pub fn new(device: Arc<dyn GpuDevice>, config: &RendererConfig) -> Result<Self> {
        let label = config.label("lights");
        let frames = config.frames_in_flight;
        let directional = DeviceData::unbound(
            device.clone(),
            format!("{label}::directional"),
            BufferKind::Storage,
            frames,
            config.initial_capacity,
        )?;
        let point = DeviceData::unbound(
            device.clone(),
            format!("{label}::point"),
            BufferKind::Storage,
            frames,
            config.initial_capacity,
        )?;

        let mut data = Self {
            device,
            label,
            directional,
            point,
            descriptors: Vec::with_capacity(frames),
        };
        for frame in 0..frames {
            let descriptor = data.write_descriptor(frame, None)?;
            data.descriptors.push(descriptor);
        }
        Ok(data)
    }

    fn write_descriptor(&self, frame: usize, previous: Option<&GpuBindGroup>) -> Result<GpuBindGroup> {
        let label = format!("{}::descriptor[{}]", self.label, frame);
        let descriptor = self.device.write_storage_descriptor(
            &StorageDescriptorDesc {
                label: &label,
                buffers: &[self.directional.buffer(frame)?, self.point.buffer(frame)?],
            },
            previous,
        )?;
        Ok(descriptor)
    }

    /// Grow both buffers of `frame` and rebind the descriptor if either moved.
    pub fn ensure_capacity(&mut self, frame: usize, directional: usize, point: usize) -> Result<bool> {
        let directional_grew = self.directional.ensure_capacity(frame, directional)?;
        let point_grew = self.point.ensure_capacity(frame, point)?;
        if !(directional_grew || point_grew) {
            return Ok(false);
        }

        let previous = self.descriptor(frame)?;
        let descriptor = self.write_descriptor(frame, Some(previous))?;
        self.descriptors[frame] = descriptor;
        tracing::debug!("Rebound light descriptor of frame {}", frame);
        Ok(true)
    }

    pub fn descriptor(&self, frame: usize) -> Result<&GpuBindGroup> {
        self.descriptors.get(frame).ok_or(RenderError::FrameIndexOutOfRange {
            index: frame,
            frames: self.descriptors.len(),
        })
    }

    pub fn directional(&self) -> &DeviceData<DirectionalLightData> {
        &self.directional
    }

    pub fn point(&self) -> &DeviceData<PointLightData> {
        &self.point
    }
}

/// Descriptor and push constants of lit passes.
#[derive(Debug, Clone, Copy)]
pub struct LitBinding<'a> {
    pub descriptor: &'a GpuBindGroup,
    pub push_constants: LitPushConstants,
}

/// Per-dimension light handling driven by the renderer.
pub trait LightSystem: Sized + Send + Sync + 'static {
    fn new(device: Arc<dyn GpuDevice>, config: &RendererConfig) -> Result<Self>;

    fn flush(&mut self);

    fn grow_to_fit(&mut self, frame: usize) -> Result<()>;

    /// Append this frame's light uploads to `jobs`.
    fn upload_jobs(&mut self, frame: usize, jobs: &mut Vec<UploadJob>) -> Result<()>;

    fn record_copy_commands(&self, frame: usize, info: &mut CopyInfo<'_>) -> Result<()>;

    /// Inputs of lit passes, or `None` when everything is drawn unlit.
    fn lit_binding(&self, frame: usize, camera: &CameraInfo) -> Result<Option<LitBinding<'_>>>;
}

/// Lighting of 2D contexts: there is none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLighting;

impl LightSystem for NoLighting {
    fn new(_device: Arc<dyn GpuDevice>, _config: &RendererConfig) -> Result<Self> {
        Ok(NoLighting)
    }

    fn flush(&mut self) {}

    fn grow_to_fit(&mut self, _frame: usize) -> Result<()> {
        Ok(())
    }

    fn upload_jobs(&mut self, _frame: usize, _jobs: &mut Vec<UploadJob>) -> Result<()> {
        Ok(())
    }

    fn record_copy_commands(&self, _frame: usize, _info: &mut CopyInfo<'_>) -> Result<()> {
        Ok(())
    }

    fn lit_binding(&self, _frame: usize, _camera: &CameraInfo) -> Result<Option<LitBinding<'_>>> {
        Ok(None)
    }
}

/// Point and directional lights of a 3D context.
pub struct SceneLighting {
    points: LightPool<PointLight>,
    directionals: LightPool<DirectionalLight>,
    ambient: Color,
    device: LightDeviceData,
}

impl SceneLighting {
    pub fn add_point_light(&mut self, light: PointLight) -> PointLightHandle {
        self.points.insert(light)
    }

    pub fn add_directional_light(&mut self, light: DirectionalLight) -> DirectionalLightHandle {
        self.directionals.insert(light)
    }

    pub fn remove_point_light(&mut self, handle: PointLightHandle) -> Option<PointLight> {
        self.points.remove(handle)
    }

    pub fn remove_directional_light(&mut self, handle: DirectionalLightHandle) -> Option<DirectionalLight> {
        self.directionals.remove(handle)
    }

    pub fn point_light(&self, handle: PointLightHandle) -> Option<&PointLight> {
        self.points.get(handle)
    }

    pub fn point_light_mut(&mut self, handle: PointLightHandle) -> Option<&mut PointLight> {
        self.points.get_mut(handle)
    }

    pub fn directional_light(&self, handle: DirectionalLightHandle) -> Option<&DirectionalLight> {
        self.directionals.get(handle)
    }

    pub fn directional_light_mut(&mut self, handle: DirectionalLightHandle) -> Option<&mut DirectionalLight> {
        self.directionals.get_mut(handle)
    }

    pub fn point_lights(&self) -> &LightPool<PointLight> {
        &self.points
    }

    pub fn directional_lights(&self) -> &LightPool<DirectionalLight> {
        &self.directionals
    }

    /// RGB ambient color with the intensity in alpha.
    pub fn ambient(&self) -> Color {
        self.ambient
    }

    /// Set the ambient color, keeping its intensity.
    pub fn set_ambient_color(&mut self, color: Color) {
        self.ambient = color.with_alpha(self.ambient.a);
    }

    pub fn set_ambient_intensity(&mut self, intensity: f32) {
        self.ambient.a = intensity;
    }

    pub fn device_data(&self) -> &LightDeviceData {
        &self.device
    }
}

impl LightSystem for SceneLighting {
    fn new(device: Arc<dyn GpuDevice>, config: &RendererConfig) -> Result<Self> {
        Ok(Self {
            points: LightPool::default(),
            directionals: LightPool::default(),
            ambient: DEFAULT_AMBIENT,
            device: LightDeviceData::new(device, config)?,
        })
    }

    fn flush(&mut self) {
        self.points.clear();
        self.directionals.clear();
    }

    fn grow_to_fit(&mut self, frame: usize) -> Result<()> {
        self.device
            .ensure_capacity(frame, self.directionals.len(), self.points.len())?;
        Ok(())
    }

    fn upload_jobs(&mut self, frame: usize, jobs: &mut Vec<UploadJob>) -> Result<()> {
        if !self.directionals.is_empty() {
            let records: Vec<_> = self.directionals.iter().map(DirectionalLight::to_device).collect();
            jobs.push(self.device.directional.upload_job(frame, vec![Arc::new(records)])?);
            self.directionals.iter_mut().for_each(DirectionalLight::mark_non_dirty);
        }
        if !self.points.is_empty() {
            let records: Vec<_> = self.points.iter().map(PointLight::to_device).collect();
            jobs.push(self.device.point.upload_job(frame, vec![Arc::new(records)])?);
            self.points.iter_mut().for_each(PointLight::mark_non_dirty);
        }
        tracing::trace!(
            "Uploading {} directional and {} point lights for frame {}",
            self.directionals.len(),
            self.points.len(),
            frame
        );
        Ok(())
    }

    fn record_copy_commands(&self, frame: usize, info: &mut CopyInfo<'_>) -> Result<()> {
        self.device
            .directional
            .record_copy(frame, self.directionals.len(), info)?;
        self.device.point.record_copy(frame, self.points.len(), info)?;
        Ok(())
    }

    fn lit_binding(&self, frame: usize, camera: &CameraInfo) -> Result<Option<LitBinding<'_>>> {
        Ok(Some(LitBinding {
            descriptor: self.device.descriptor(frame)?,
            push_constants: LitPushConstants::new(
                &camera.projection_view,
                camera.view_position,
                self.ambient,
                self.directionals.len() as u32,
                self.points.len() as u32,
            ),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onyx_test_utils::{DeviceCall, MockCommandRecorder, MockGpuDevice};

    fn lighting() -> (Arc<MockGpuDevice>, SceneLighting) {
        let device = Arc::new(MockGpuDevice::new());
        let lighting = SceneLighting::new(device.clone(), &RendererConfig::default()).unwrap();
        (device, lighting)
    }

    fn point(x: f32) -> PointLight {
        PointLight::new(Vec3::new(x, 0.0, 0.0), 1.0, 1.0, Color::WHITE, ViewMask::ALL)
    }

    #[test]
    fn test_setters_mark_dirty() {
        let mut light = point(0.0);
        assert!(light.is_dirty());
        light.mark_non_dirty();
        assert!(!light.is_dirty());
        light.set_radius(4.0);
        assert!(light.is_dirty());
        assert_eq!(light.radius(), 4.0);
    }

    #[test]
    fn test_device_records() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0), 5.0, 0.5, Color::RED, ViewMask::bit(33));
        let data = light.to_device();
        assert_eq!(data.position_intensity, [1.0, 2.0, 3.0, 0.5]);
        assert_eq!(data.radius, 5.0);
        assert_eq!(data.color, Color::RED.pack());
        assert_eq!(data.view_mask, [0, 2]);

        let light = DirectionalLight::new(Vec3::new(0.0, -2.0, 0.0), 1.0, Color::WHITE, ViewMask::bit(0));
        assert_eq!(light.to_device().direction_intensity, [0.0, -1.0, 0.0, 1.0]);
        assert_eq!(light.to_device().view_mask, [1, 0]);
    }

    #[test]
    fn test_pool_reuses_slots() {
        let mut pool = LightPool::default();
        let a = pool.insert(point(1.0));
        let b = pool.insert(point(2.0));
        assert_eq!(pool.remove(a).unwrap().position().x, 1.0);
        assert!(pool.remove(a).is_none());

        let c = pool.insert(point(3.0));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(c).unwrap().position().x, 3.0);
        assert_eq!(pool.get(b).unwrap().position().x, 2.0);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut pool = LightPool::default();
        let old = pool.insert(point(1.0));
        pool.clear();
        let new = pool.insert(point(2.0));

        assert!(pool.get(old).is_none());
        assert_ne!(old, new);
        assert_eq!(pool.get(new).unwrap().position().x, 2.0);
    }

    #[test]
    fn test_growth_rebinds_descriptor() {
        let (device, mut lighting) = lighting();
        let descriptor = lighting.device_data().descriptor(0).unwrap().mock_id();
        for i in 0..5 {
            lighting.add_point_light(point(i as f32));
        }
        device.clear_calls();
        lighting.grow_to_fit(0).unwrap();

        assert_eq!(lighting.device_data().point().capacity(0).unwrap(), 8);
        assert_eq!(lighting.device_data().directional().capacity(0).unwrap(), 4);
        assert_eq!(lighting.device_data().descriptor(0).unwrap().mock_id(), descriptor);
        assert_eq!(device.count_descriptor_writes(), 1);
        assert!(device.calls().iter().any(|call| matches!(
            call,
            DeviceCall::WriteDescriptor { buffer_ids, recycled: true, .. } if buffer_ids.len() == 2
        )));
    }

    #[test]
    fn test_upload_and_copy() {
        let (device, mut lighting) = lighting();
        let handle = lighting.add_point_light(point(1.0));
        lighting.grow_to_fit(0).unwrap();

        let mut jobs = Vec::new();
        lighting.upload_jobs(0, &mut jobs).unwrap();
        assert_eq!(jobs.len(), 1);
        for job in jobs {
            job().unwrap();
        }
        assert_eq!(device.count_flushes(), 1);
        assert!(!lighting.point_light(handle).unwrap().is_dirty());

        let mut recorder = MockCommandRecorder::new();
        let mut info = CopyInfo::new(0, &mut recorder, None);
        lighting.record_copy_commands(0, &mut info).unwrap();
        assert_eq!(info.copied_bytes(), 32);
        drop(info);
        assert_eq!(recorder.count_copies(), 1);
    }

    #[test]
    fn test_flush_clears_lights() {
        let (_, mut lighting) = lighting();
        let handle = lighting.add_directional_light(DirectionalLight::new(
            Vec3::NEG_Y,
            1.0,
            Color::WHITE,
            ViewMask::ALL,
        ));
        lighting.flush();
        assert!(lighting.directional_light(handle).is_none());
        assert!(lighting.directional_lights().is_empty());
    }

    #[test]
    fn test_ambient() {
        let (_, mut lighting) = lighting();
        assert_eq!(lighting.ambient(), DEFAULT_AMBIENT);
        lighting.set_ambient_color(Color::RED);
        assert_eq!(lighting.ambient(), Color::rgba(1.0, 0.0, 0.0, 0.4));
        lighting.set_ambient_intensity(0.9);
        assert_eq!(lighting.ambient().a, 0.9);
    }
}
