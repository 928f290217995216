//! Static vertex buffer registry
//!
//! Maps opaque [`BufferHandle`]s to uploaded vertex buffers. Handles are
//! generational keys, so a destroyed handle never aliases a later one.

use slotmap::{new_key_type, SlotMap};

use crate::render::api::{GpuBufferId, GraphicsContext};
use crate::render::primitives::{PrimitiveType, VertexFormat, VertexLayout};
use crate::render::{DeviceError, DeviceResult};

new_key_type! {
    /// Handle to a static vertex buffer
    pub struct BufferHandle;
}

/// What the registry knows about one buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    /// Topology used by `draw_buffer`
    pub primitive: PrimitiveType,
    /// Vertex layout fixed at creation
    pub layout: VertexLayout,
    /// Vertex count fixed at creation
    pub vertex_count: usize,
    /// Size of the uploaded data in bytes
    pub size: usize,
    /// Context buffer object
    pub gpu_buffer: GpuBufferId,
}

/// Registry of static vertex buffers
#[derive(Debug, Default)]
pub struct BufferRegistry {
    buffers: SlotMap<BufferHandle, BufferInfo>,
}

impl BufferRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload `vertices` into a new buffer
    ///
    /// On allocation failure the registry is left unchanged.
    pub fn create<V: VertexFormat, C: GraphicsContext>(
        &mut self,
        context: &mut C,
        primitive: PrimitiveType,
        vertices: &[V],
    ) -> DeviceResult<BufferHandle> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let gpu_buffer = context.create_vertex_buffer(V::LAYOUT, bytes)?;

        let handle = self.buffers.insert(BufferInfo {
            primitive,
            layout: V::LAYOUT,
            vertex_count: vertices.len(),
            size: bytes.len(),
            gpu_buffer,
        });

        log::debug!(
            "Created {:?} buffer {:?}: {} vertices, {} bytes",
            V::LAYOUT,
            handle,
            vertices.len(),
            bytes.len()
        );
        Ok(handle)
    }

    /// Replace the contents of an existing buffer in place
    ///
    /// The layout and vertex count must match creation; the primitive type may
    /// change. A rejected update leaves the buffer untouched.
    pub fn update<V: VertexFormat, C: GraphicsContext>(
        &mut self,
        context: &mut C,
        handle: BufferHandle,
        primitive: PrimitiveType,
        vertices: &[V],
    ) -> DeviceResult<()> {
        let info = self.buffers.get_mut(handle).ok_or(DeviceError::UnknownBuffer(handle))?;

        if info.layout != V::LAYOUT {
            return Err(DeviceError::BufferLayoutMismatch { expected: info.layout, found: V::LAYOUT });
        }
        if info.vertex_count != vertices.len() {
            return Err(DeviceError::BufferCountMismatch {
                expected: info.vertex_count,
                found: vertices.len(),
            });
        }

        context.update_vertex_buffer(info.gpu_buffer, 0, bytemuck::cast_slice(vertices))?;
        info.primitive = primitive;

        log::trace!("Updated buffer {:?}", handle);
        Ok(())
    }

    /// Look up a live buffer
    pub fn get(&self, handle: BufferHandle) -> DeviceResult<&BufferInfo> {
        self.buffers.get(handle).ok_or(DeviceError::UnknownBuffer(handle))
    }

    /// Whether `handle` refers to a live buffer
    pub fn contains(&self, handle: BufferHandle) -> bool {
        self.buffers.contains_key(handle)
    }

    /// Release one buffer
    pub fn destroy<C: GraphicsContext>(&mut self, context: &mut C, handle: BufferHandle) -> DeviceResult<()> {
        let info = self.buffers.remove(handle).ok_or(DeviceError::UnknownBuffer(handle))?;
        context.delete_vertex_buffer(info.gpu_buffer);
        log::debug!("Destroyed buffer {:?}", handle);
        Ok(())
    }

    /// Release every buffer
    pub fn destroy_all<C: GraphicsContext>(&mut self, context: &mut C) {
        let count = self.buffers.len();
        for (_, info) in self.buffers.drain() {
            context.delete_vertex_buffer(info.gpu_buffer);
        }
        if count > 0 {
            log::debug!("Destroyed {} buffers", count);
        }
    }

    /// Number of live buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether no buffer is live
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessContext;
    use crate::render::primitives::{Color, Vertex, VertexCol};

    fn triangle() -> Vec<Vertex> {
        vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ]
    }

    #[test]
    fn test_create_records_layout_and_count() {
        let mut context = HeadlessContext::new();
        let mut registry = BufferRegistry::new();

        let handle = registry.create(&mut context, PrimitiveType::Triangles, &triangle()).unwrap();
        let info = registry.get(handle).unwrap();
        assert_eq!(info.layout, VertexLayout::Plain);
        assert_eq!(info.vertex_count, 3);
        assert_eq!(info.size, 3 * VertexLayout::Plain.stride());
        assert_eq!(context.buffer_data(info.gpu_buffer).unwrap(), bytemuck::cast_slice::<Vertex, u8>(&triangle()));
    }

    #[test]
    fn test_update_rejects_count_mismatch_and_keeps_contents() {
        let mut context = HeadlessContext::new();
        let mut registry = BufferRegistry::new();
        let original = triangle();
        let handle = registry.create(&mut context, PrimitiveType::Triangles, &original).unwrap();

        let result = registry.update(&mut context, handle, PrimitiveType::Triangles, &original[..2]);
        assert_eq!(result, Err(DeviceError::BufferCountMismatch { expected: 3, found: 2 }));

        let gpu = registry.get(handle).unwrap().gpu_buffer;
        assert_eq!(context.buffer_data(gpu).unwrap(), bytemuck::cast_slice::<Vertex, u8>(&original));
    }

    #[test]
    fn test_update_rejects_layout_mismatch() {
        let mut context = HeadlessContext::new();
        let mut registry = BufferRegistry::new();
        let handle = registry.create(&mut context, PrimitiveType::Triangles, &triangle()).unwrap();

        let colored = vec![VertexCol::new([0.0; 3], Color::WHITE); 3];
        let result = registry.update(&mut context, handle, PrimitiveType::Triangles, &colored);
        assert!(matches!(result, Err(DeviceError::BufferLayoutMismatch { .. })));
    }

    #[test]
    fn test_update_may_change_primitive() {
        let mut context = HeadlessContext::new();
        let mut registry = BufferRegistry::new();
        let handle = registry.create(&mut context, PrimitiveType::Triangles, &triangle()).unwrap();

        registry.update(&mut context, handle, PrimitiveType::LineLoop, &triangle()).unwrap();
        assert_eq!(registry.get(handle).unwrap().primitive, PrimitiveType::LineLoop);
    }

    #[test]
    fn test_destroyed_handle_is_unknown() {
        let mut context = HeadlessContext::new();
        let mut registry = BufferRegistry::new();
        let first = registry.create(&mut context, PrimitiveType::Triangles, &triangle()).unwrap();
        registry.destroy(&mut context, first).unwrap();

        let second = registry.create(&mut context, PrimitiveType::Triangles, &triangle()).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.get(first), Err(DeviceError::UnknownBuffer(first)));
        assert_eq!(registry.destroy(&mut context, first), Err(DeviceError::UnknownBuffer(first)));
    }

    #[test]
    fn test_failed_allocation_leaves_registry_unchanged() {
        let mut context = HeadlessContext::new().with_memory_limit(16);
        let mut registry = BufferRegistry::new();

        let result = registry.create(&mut context, PrimitiveType::Triangles, &triangle());
        assert!(matches!(result, Err(DeviceError::ResourceCreation(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_destroy_all_releases_gpu_buffers() {
        let mut context = HeadlessContext::new();
        let mut registry = BufferRegistry::new();
        registry.create(&mut context, PrimitiveType::Triangles, &triangle()).unwrap();
        registry.create(&mut context, PrimitiveType::Points, &triangle()).unwrap();

        registry.destroy_all(&mut context);
        assert!(registry.is_empty());
        assert_eq!(context.live_buffer_count(), 0);
    }
}
