//! Streaming buffers for immediate draws
//!
//! One reusable buffer per vertex layout. A draw that fits is written with a
//! sub-update; a larger draw reallocates and the buffer keeps the new size.

use crate::render::api::{GpuBufferId, GraphicsContext};
use crate::render::primitives::{VertexFormat, VertexLayout};
use crate::render::DeviceResult;

/// Vertex capacity of a freshly allocated scratch buffer
pub const INITIAL_SCRATCH_VERTICES: usize = 64;

#[derive(Debug, Clone, Copy)]
struct ScratchBuffer {
    gpu_buffer: GpuBufferId,
    capacity: usize,
}

/// Scratch buffers for the three vertex layouts
#[derive(Debug)]
pub struct ScratchBuffers {
    buffers: [ScratchBuffer; 3],
}

impl ScratchBuffers {
    /// Allocate one buffer per layout
    pub fn new<C: GraphicsContext>(context: &mut C) -> DeviceResult<Self> {
        let mut allocated: Vec<ScratchBuffer> = Vec::with_capacity(VertexLayout::ALL.len());
        for layout in VertexLayout::ALL {
            let zeroed = vec![0u8; INITIAL_SCRATCH_VERTICES * layout.stride()];
            match context.create_vertex_buffer(layout, &zeroed) {
                Ok(gpu_buffer) => allocated.push(ScratchBuffer { gpu_buffer, capacity: INITIAL_SCRATCH_VERTICES }),
                Err(err) => {
                    for buffer in &allocated {
                        context.delete_vertex_buffer(buffer.gpu_buffer);
                    }
                    return Err(err.into());
                }
            }
        }

        Ok(Self { buffers: [allocated[0], allocated[1], allocated[2]] })
    }

    /// Write `vertices` into the buffer of their layout and return it
    pub fn upload<V: VertexFormat, C: GraphicsContext>(
        &mut self,
        context: &mut C,
        vertices: &[V],
    ) -> DeviceResult<GpuBufferId> {
        let buffer = &mut self.buffers[V::LAYOUT.index()];
        let bytes: &[u8] = bytemuck::cast_slice(vertices);

        if vertices.len() > buffer.capacity {
            context.reallocate_vertex_buffer(buffer.gpu_buffer, bytes)?;
            log::debug!(
                "Grew {:?} scratch buffer from {} to {} vertices",
                V::LAYOUT,
                buffer.capacity,
                vertices.len()
            );
            buffer.capacity = vertices.len();
        } else {
            context.update_vertex_buffer(buffer.gpu_buffer, 0, bytes)?;
        }

        Ok(buffer.gpu_buffer)
    }

    /// Current vertex capacity for a layout
    pub fn capacity(&self, layout: VertexLayout) -> usize {
        self.buffers[layout.index()].capacity
    }

    /// Release all scratch buffers
    pub fn release<C: GraphicsContext>(&self, context: &mut C) {
        for buffer in &self.buffers {
            context.delete_vertex_buffer(buffer.gpu_buffer);
        }
    }
}
