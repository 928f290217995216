//! Immediate and buffered drawing

use super::Device;
use crate::render::api::{GpuBufferId, GraphicsContext};
use crate::render::primitives::{Color, PrimitiveType, VertexAttribute, VertexFormat, VertexLayout};
use crate::render::resources::{BufferHandle, BufferInfo};
use crate::render::{DeviceError, DeviceResult};

impl<C: GraphicsContext> Device<C> {
    /// Stream `vertices` through the scratch buffer of their layout and draw
    ///
    /// `color` replaces the per-vertex color for layouts that do not carry one.
    pub fn draw_primitive<V: VertexFormat>(
        &mut self,
        primitive: PrimitiveType,
        vertices: &[V],
        color: Color,
    ) -> DeviceResult<()> {
        self.ensure_in_scene("draw_primitive")?;
        if vertices.is_empty() {
            log::trace!("Skipping empty {:?} draw", V::LAYOUT);
            return Ok(());
        }

        self.flush();
        let uploaded = match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.scratch.upload(&mut self.context, vertices),
            None => Err(DeviceError::Initialization("device has no program".to_string())),
        };
        let buffer = self.track(uploaded)?;

        self.submit(buffer, V::LAYOUT, primitive, vertices.len(), color)
    }

    /// Upload a static vertex buffer
    pub fn create_buffer<V: VertexFormat>(&mut self, primitive: PrimitiveType, vertices: &[V]) -> DeviceResult<BufferHandle> {
        self.ensure_ready("create_buffer")?;
        let created = self.buffers.create(&mut self.context, primitive, vertices);
        self.track(created)
    }

    /// Replace the contents of a static buffer
    ///
    /// Layout and vertex count must match creation.
    pub fn update_buffer<V: VertexFormat>(
        &mut self,
        handle: BufferHandle,
        primitive: PrimitiveType,
        vertices: &[V],
    ) -> DeviceResult<()> {
        self.ensure_ready("update_buffer")?;
        let updated = self.buffers.update(&mut self.context, handle, primitive, vertices);
        self.track(updated)
    }

    /// Draw a static buffer with its stored topology and count
    pub fn draw_buffer(&mut self, handle: BufferHandle) -> DeviceResult<()> {
        self.ensure_in_scene("draw_buffer")?;
        let info = *self.buffers.get(handle)?;

        self.flush();
        self.submit(info.gpu_buffer, info.layout, info.primitive, info.vertex_count, Color::WHITE)
    }

    /// Release a static buffer
    pub fn destroy_buffer(&mut self, handle: BufferHandle) -> DeviceResult<()> {
        self.ensure_ready("destroy_buffer")?;
        self.buffers.destroy(&mut self.context, handle)
    }

    /// Release every static buffer
    pub fn destroy_all_buffers(&mut self) -> DeviceResult<()> {
        self.ensure_ready("destroy_all_buffers")?;
        self.buffers.destroy_all(&mut self.context);
        Ok(())
    }

    /// Registry entry of a live buffer
    pub fn buffer(&self, handle: BufferHandle) -> DeviceResult<&BufferInfo> {
        self.buffers.get(handle)
    }

    /// Current scratch capacity in vertices for a layout
    pub fn scratch_capacity(&self, layout: VertexLayout) -> usize {
        self.pipeline.as_ref().map_or(0, |pipeline| pipeline.scratch.capacity(layout))
    }

    fn submit(
        &mut self,
        buffer: GpuBufferId,
        layout: VertexLayout,
        primitive: PrimitiveType,
        count: usize,
        color: Color,
    ) -> DeviceResult<()> {
        if !layout.has_vertex_color() {
            self.context.set_constant_attribute(VertexAttribute::Color, color.to_array());
        }

        let drawn = self.context.draw_arrays(buffer, primitive, 0, count).map_err(DeviceError::from);
        self.track(drawn)?;
        self.draw_calls += 1;
        self.check_errors()
    }
}
