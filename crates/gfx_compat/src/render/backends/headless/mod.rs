//! Headless rendering context
//!
//! A complete in-memory [`GraphicsContext`]. It keeps buffer bytes, texture
//! pixels, uniform values and raster state, records every draw with a
//! snapshot of the program inputs, and owns a bottom-up RGBA8 primary
//! surface. Nothing is rasterized: clears, copies and read-back operate on
//! the stored pixels.
//!
//! Builder methods shape the reported capabilities and allow failure
//! injection (allocation budget, compile errors, context loss) for tests.

mod objects;

pub use objects::{
    DrawCall, HeadlessBuffer, HeadlessFramebuffer, HeadlessProgram, HeadlessTexture,
    RasterSnapshot,
};

use std::collections::{HashMap, VecDeque};

use crate::core::ShaderConfig;
use crate::render::api::{
    Capability, ClearFlags, ContextCapabilities, ContextError, ContextResult, FramebufferId,
    GpuBufferId, GpuTextureId, GraphicsContext, ProgramId, TextureUpload, UniformLocation,
    UniformValue,
};
use crate::render::primitives::{Color, PrimitiveType, VertexAttribute, VertexLayout};
use crate::render::resources::{RenderTarget, TexWrapMode};
use crate::render::state::{BlendFunc, ColorMask, CompFunc, CullMode, FillMode, Viewport};
use crate::render::sync::all_uniform_names;

const DEFAULT_SURFACE_SIZE: (u32, u32) = (640, 480);
const RGBA: usize = 4;
const CONSTANT_ATTRIBUTE_COUNT: usize = 5;

/// A recorded clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearRecord {
    /// Buffers cleared
    pub flags: ClearFlags,
    /// Depth write mask in effect during the clear
    pub depth_mask: bool,
    /// Framebuffer cleared, `None` for the primary surface
    pub framebuffer: Option<FramebufferId>,
}

/// In-memory graphics context
#[derive(Debug)]
pub struct HeadlessContext {
    capabilities: ContextCapabilities,
    declared_uniforms: Option<Vec<String>>,
    compile_error: Option<String>,
    memory_limit: Option<usize>,
    memory_used: usize,
    next_id: u32,
    lost: bool,
    errors: VecDeque<ContextError>,

    programs: HashMap<ProgramId, HeadlessProgram>,
    bound_program: Option<ProgramId>,
    uniform_writes: u64,

    buffers: HashMap<GpuBufferId, HeadlessBuffer>,
    constant_attributes: [[f32; 4]; CONSTANT_ATTRIBUTE_COUNT],

    textures: HashMap<GpuTextureId, HeadlessTexture>,
    texture_units: Vec<Option<GpuTextureId>>,

    raster: RasterSnapshot,
    surface: Vec<u8>,
    framebuffers: HashMap<FramebufferId, HeadlessFramebuffer>,
    bound_framebuffer: Option<FramebufferId>,

    draw_calls: Vec<DrawCall>,
    clears: Vec<ClearRecord>,
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessContext {
    /// A 3.3 context with anisotropy, a 640x480 surface and no memory budget
    pub fn new() -> Self {
        let capabilities = ContextCapabilities {
            version: (3, 3),
            anisotropy_available: true,
            max_anisotropy: 16,
            max_renderbuffer_size: 4096,
            max_texture_size: 4096,
            max_texture_units: 16,
            surface_size: DEFAULT_SURFACE_SIZE,
        };

        Self {
            capabilities,
            declared_uniforms: None,
            compile_error: None,
            memory_limit: None,
            memory_used: 0,
            next_id: 1,
            lost: false,
            errors: VecDeque::new(),
            programs: HashMap::new(),
            bound_program: None,
            uniform_writes: 0,
            buffers: HashMap::new(),
            constant_attributes: [[1.0; 4]; CONSTANT_ATTRIBUTE_COUNT],
            textures: HashMap::new(),
            texture_units: vec![None; capabilities.max_texture_units as usize],
            raster: RasterSnapshot::default(),
            surface: vec![0; surface_bytes(DEFAULT_SURFACE_SIZE)],
            framebuffers: HashMap::new(),
            bound_framebuffer: None,
            draw_calls: Vec::new(),
            clears: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Builders
    // ---------------------------------------------------------------------

    /// Replace the reported capabilities
    pub fn with_capabilities(mut self, capabilities: ContextCapabilities) -> Self {
        self.texture_units = vec![None; capabilities.max_texture_units as usize];
        self.surface = vec![0; surface_bytes(capabilities.surface_size)];
        self.capabilities = capabilities;
        self
    }

    /// Report a different API version
    pub fn with_version(mut self, major: u32, minor: u32) -> Self {
        self.capabilities.version = (major, minor);
        self
    }

    /// Resize the primary surface
    pub fn with_surface_size(mut self, width: u32, height: u32) -> Self {
        self.capabilities.surface_size = (width, height);
        self.surface = vec![0; surface_bytes((width, height))];
        self
    }

    /// Report no anisotropic filtering support
    pub fn without_anisotropy(mut self) -> Self {
        self.capabilities.anisotropy_available = false;
        self.capabilities.max_anisotropy = 1;
        self
    }

    /// Limit the bytes of buffer and texture storage
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Limit texture edge length
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.capabilities.max_texture_size = size;
        self
    }

    /// Limit renderbuffer edge length
    pub fn with_max_renderbuffer_size(mut self, size: u32) -> Self {
        self.capabilities.max_renderbuffer_size = size;
        self
    }

    /// Report a different number of texture units
    pub fn with_texture_units(mut self, units: u32) -> Self {
        self.capabilities.max_texture_units = units;
        self.texture_units = vec![None; units as usize];
        self
    }

    /// Programs declare only these uniforms instead of the full interface
    pub fn with_declared_uniforms(mut self, names: &[&str]) -> Self {
        self.declared_uniforms = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    /// Program compilation fails with this log
    pub fn with_compile_error(mut self, log: impl Into<String>) -> Self {
        self.compile_error = Some(log.into());
        self
    }

    // ---------------------------------------------------------------------
    // Failure injection
    // ---------------------------------------------------------------------

    /// Lose the context; every fallible call fails from now on
    pub fn lose_context(&mut self) {
        log::warn!("Headless context lost");
        self.lost = true;
        self.errors.push_back(ContextError::ContextLost);
    }

    /// Whether the context has been lost
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Queue an error for the next `poll_error`
    pub fn inject_error(&mut self, error: ContextError) {
        self.errors.push_back(error);
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    /// Every draw issued so far
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    /// Most recent draw
    pub fn last_draw(&self) -> Option<&DrawCall> {
        self.draw_calls.last()
    }

    /// Every clear issued so far
    pub fn clears(&self) -> &[ClearRecord] {
        &self.clears
    }

    /// Current raster state
    pub fn raster(&self) -> &RasterSnapshot {
        &self.raster
    }

    /// Current value of a uniform of `program`
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.programs.get(&program).and_then(|p| p.value(name))
    }

    /// Number of uniform writes received
    pub fn uniform_writes(&self) -> u64 {
        self.uniform_writes
    }

    /// Currently bound program
    pub fn bound_program(&self) -> Option<ProgramId> {
        self.bound_program
    }

    /// Number of live programs
    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    /// Bytes of a vertex buffer
    pub fn buffer_data(&self, buffer: GpuBufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    /// How often a vertex buffer was reallocated
    pub fn buffer_reallocations(&self, buffer: GpuBufferId) -> u32 {
        self.buffers.get(&buffer).map_or(0, |b| b.reallocations)
    }

    /// Number of live vertex buffers
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// A stored texture
    pub fn texture(&self, texture: GpuTextureId) -> Option<&HeadlessTexture> {
        self.textures.get(&texture)
    }

    /// Number of live textures
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Texture bound to a unit
    pub fn bound_texture(&self, unit: usize) -> Option<GpuTextureId> {
        self.texture_units.get(unit).copied().flatten()
    }

    /// A stored framebuffer
    pub fn framebuffer(&self, framebuffer: FramebufferId) -> Option<&HeadlessFramebuffer> {
        self.framebuffers.get(&framebuffer)
    }

    /// Number of live framebuffers
    pub fn live_framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Currently bound framebuffer
    pub fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.bound_framebuffer
    }

    /// Primary surface pixels, RGBA8, bottom row first
    pub fn surface(&self) -> &[u8] {
        &self.surface
    }

    /// Mutable primary surface pixels, RGBA8, bottom row first
    pub fn surface_mut(&mut self) -> &mut [u8] {
        &mut self.surface
    }

    /// Bytes of buffer and texture storage in use
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn ensure_alive(&self) -> ContextResult<()> {
        if self.lost {
            Err(ContextError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn reserve(&mut self, bytes: usize, what: &str) -> ContextResult<()> {
        if let Some(limit) = self.memory_limit {
            if self.memory_used + bytes > limit {
                return Err(ContextError::OutOfMemory(format!(
                    "{} needs {} bytes, {} of {} in use",
                    what, bytes, self.memory_used, limit
                )));
            }
        }
        self.memory_used += bytes;
        Ok(())
    }

    fn release(&mut self, bytes: usize) {
        self.memory_used = self.memory_used.saturating_sub(bytes);
    }

    fn color_target(&self) -> (&[u8], u32, u32) {
        if let Some(framebuffer) = self.bound_framebuffer.and_then(|id| self.framebuffers.get(&id)) {
            if let Some(texture) = framebuffer.color_texture.and_then(|id| self.textures.get(&id)) {
                return (texture.data.as_slice(), texture.width, texture.height);
            }
            return (framebuffer.color.as_slice(), framebuffer.width, framebuffer.height);
        }
        let (width, height) = self.capabilities.surface_size;
        (self.surface.as_slice(), width, height)
    }

    fn color_target_mut(&mut self) -> (&mut [u8], u32, u32) {
        if let Some(framebuffer) = self.bound_framebuffer.and_then(|id| self.framebuffers.get_mut(&id)) {
            if let Some(texture) = framebuffer.color_texture.and_then(|id| self.textures.get_mut(&id)) {
                return (texture.data.as_mut_slice(), texture.width, texture.height);
            }
            return (framebuffer.color.as_mut_slice(), framebuffer.width, framebuffer.height);
        }
        let (width, height) = self.capabilities.surface_size;
        (self.surface.as_mut_slice(), width, height)
    }

    fn read_region(&self, x: u32, y: u32, width: u32, height: u32) -> ContextResult<Vec<u8>> {
        let (data, target_width, target_height) = self.color_target();
        if !fits(x, width, target_width) || !fits(y, height, target_height) {
            return Err(ContextError::InvalidOperation(format!(
                "region {}x{} at ({}, {}) outside {}x{} target",
                width, height, x, y, target_width, target_height
            )));
        }

        let row_bytes = width as usize * RGBA;
        let mut out = Vec::with_capacity(row_bytes * height as usize);
        for row in y..y + height {
            let start = (row as usize * target_width as usize + x as usize) * RGBA;
            out.extend_from_slice(&data[start..start + row_bytes]);
        }
        Ok(out)
    }
}

/// Whether `start..start + extent` lies within `0..limit`
fn fits(start: u32, extent: u32, limit: u32) -> bool {
    start.checked_add(extent).is_some_and(|end| end <= limit)
}

fn surface_bytes((width, height): (u32, u32)) -> usize {
    width as usize * height as usize * RGBA
}

impl GraphicsContext for HeadlessContext {
    fn capabilities(&self) -> ContextCapabilities {
        self.capabilities
    }

    fn compile_program(&mut self, shaders: &ShaderConfig) -> ContextResult<ProgramId> {
        self.ensure_alive()?;
        if let Some(log) = &self.compile_error {
            return Err(ContextError::CompileFailed(log.clone()));
        }

        let program = match &self.declared_uniforms {
            Some(names) => HeadlessProgram::declaring(names.iter().cloned()),
            None => HeadlessProgram::declaring(all_uniform_names()),
        };
        let id = ProgramId(self.next_id());
        self.programs.insert(id, program);

        log::debug!(
            "Linked headless program {:?} from '{}' and '{}'",
            id,
            shaders.vertex_shader_path,
            shaders.fragment_shader_path
        );
        Ok(id)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program).and_then(|p| p.locations.get(name)).copied()
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.bound_program = program;
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if self.lost {
            return;
        }
        let Some(program) = self.bound_program.and_then(|id| self.programs.get_mut(&id)) else {
            self.errors.push_back(ContextError::InvalidOperation("uniform write without a bound program".into()));
            return;
        };
        if program.names.contains_key(&location) {
            program.values.insert(location, value);
            self.uniform_writes += 1;
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }

    fn create_vertex_buffer(&mut self, layout: VertexLayout, data: &[u8]) -> ContextResult<GpuBufferId> {
        self.ensure_alive()?;
        self.reserve(data.len(), "vertex buffer")?;
        let id = GpuBufferId(self.next_id());
        self.buffers.insert(id, HeadlessBuffer { layout, data: data.to_vec(), reallocations: 0 });
        Ok(id)
    }

    fn reallocate_vertex_buffer(&mut self, buffer: GpuBufferId, data: &[u8]) -> ContextResult<()> {
        self.ensure_alive()?;
        let old_len = self
            .buffers
            .get(&buffer)
            .map(|b| b.data.len())
            .ok_or_else(|| ContextError::InvalidOperation(format!("unknown buffer {:?}", buffer)))?;

        self.release(old_len);
        if let Err(err) = self.reserve(data.len(), "vertex buffer") {
            self.memory_used += old_len;
            return Err(err);
        }

        if let Some(stored) = self.buffers.get_mut(&buffer) {
            stored.data = data.to_vec();
            stored.reallocations += 1;
        }
        Ok(())
    }

    fn update_vertex_buffer(&mut self, buffer: GpuBufferId, offset: usize, data: &[u8]) -> ContextResult<()> {
        self.ensure_alive()?;
        let stored = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| ContextError::InvalidOperation(format!("unknown buffer {:?}", buffer)))?;

        let end = offset + data.len();
        if end > stored.data.len() {
            return Err(ContextError::InvalidOperation(format!(
                "update of {} bytes at {} overflows {} byte buffer",
                data.len(),
                offset,
                stored.data.len()
            )));
        }
        stored.data[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn delete_vertex_buffer(&mut self, buffer: GpuBufferId) {
        if let Some(stored) = self.buffers.remove(&buffer) {
            self.release(stored.data.len());
        }
    }

    fn set_constant_attribute(&mut self, attribute: VertexAttribute, value: [f32; 4]) {
        self.constant_attributes[attribute as usize] = value;
    }

    fn draw_arrays(&mut self, buffer: GpuBufferId, primitive: PrimitiveType, first: usize, count: usize) -> ContextResult<()> {
        self.ensure_alive()?;
        let stored = self
            .buffers
            .get(&buffer)
            .ok_or_else(|| ContextError::InvalidOperation(format!("draw from unknown buffer {:?}", buffer)))?;

        let stride = stored.layout.stride();
        let (start, end) = (first * stride, (first + count) * stride);
        if end > stored.data.len() {
            return Err(ContextError::InvalidOperation(format!(
                "draw of {} vertices from {} exceeds buffer of {} vertices",
                count,
                first,
                stored.data.len() / stride
            )));
        }

        let uniforms = self
            .bound_program
            .and_then(|id| self.programs.get(&id))
            .map(HeadlessProgram::snapshot)
            .unwrap_or_default();

        let call = DrawCall {
            program: self.bound_program,
            primitive,
            first,
            count,
            layout: stored.layout,
            vertex_data: stored.data[start..end].to_vec(),
            constant_color: self.constant_attributes[VertexAttribute::Color as usize],
            uniforms,
            textures: self.texture_units.clone(),
            framebuffer: self.bound_framebuffer,
            raster: self.raster,
        };
        self.draw_calls.push(call);
        Ok(())
    }

    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> ContextResult<GpuTextureId> {
        self.ensure_alive()?;
        let max = self.capabilities.max_texture_size;
        if upload.width > max || upload.height > max {
            return Err(ContextError::Unsupported(format!(
                "texture {}x{} exceeds {}",
                upload.width, upload.height, max
            )));
        }
        let expected = upload.width as usize * upload.height as usize * upload.format.channels();
        if upload.data.len() != expected {
            return Err(ContextError::InvalidOperation(format!(
                "texture upload needs {} bytes, got {}",
                expected,
                upload.data.len()
            )));
        }

        self.reserve(expected, "texture")?;
        let id = GpuTextureId(self.next_id());
        self.textures.insert(
            id,
            HeadlessTexture {
                width: upload.width,
                height: upload.height,
                format: Some(upload.format),
                depth_bits: None,
                data: upload.data.to_vec(),
                filter: upload.filter,
                mipmap: upload.mipmap,
                anisotropy: upload.anisotropy,
                wrap_s: TexWrapMode::Repeat,
                wrap_t: TexWrapMode::Repeat,
            },
        );
        Ok(id)
    }

    fn create_depth_texture(&mut self, width: u32, height: u32, depth_bits: u8) -> ContextResult<GpuTextureId> {
        self.ensure_alive()?;
        let bytes = width as usize * height as usize * usize::from(depth_bits).div_ceil(8);
        self.reserve(bytes, "depth texture")?;

        let id = GpuTextureId(self.next_id());
        self.textures.insert(
            id,
            HeadlessTexture {
                width,
                height,
                format: None,
                depth_bits: Some(depth_bits),
                data: vec![0; bytes],
                filter: Default::default(),
                mipmap: false,
                anisotropy: 1,
                wrap_s: TexWrapMode::Clamp,
                wrap_t: TexWrapMode::Clamp,
            },
        );
        Ok(id)
    }

    fn delete_texture(&mut self, texture: GpuTextureId) {
        let Some(stored) = self.textures.remove(&texture) else {
            return;
        };
        self.release(stored.data.len());

        for unit in self.texture_units.iter_mut().filter(|unit| **unit == Some(texture)) {
            *unit = None;
        }
        for framebuffer in self.framebuffers.values_mut() {
            if framebuffer.color_texture == Some(texture) {
                framebuffer.color_texture = None;
            }
            if framebuffer.depth_texture == Some(texture) {
                framebuffer.depth_texture = None;
            }
        }
    }

    fn bind_texture(&mut self, unit: usize, texture: Option<GpuTextureId>) {
        match self.texture_units.get_mut(unit) {
            Some(slot) => *slot = texture,
            None => self
                .errors
                .push_back(ContextError::InvalidOperation(format!("texture unit {} out of range", unit))),
        }
    }

    fn set_texture_wrap(&mut self, unit: usize, wrap_s: TexWrapMode, wrap_t: TexWrapMode) {
        let bound = self.bound_texture(unit);
        if let Some(texture) = bound.and_then(|id| self.textures.get_mut(&id)) {
            texture.wrap_s = wrap_s;
            texture.wrap_t = wrap_t;
        }
    }

    fn set_texture_anisotropy(&mut self, texture: GpuTextureId, level: u32) {
        if let Some(stored) = self.textures.get_mut(&texture) {
            stored.anisotropy = level;
        }
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        match capability {
            Capability::DepthTest => self.raster.depth_test = enabled,
            Capability::Blend => self.raster.blend = enabled,
            Capability::CullFace => self.raster.cull_face = enabled,
            Capability::PolygonOffsetFill => self.raster.polygon_offset_fill = enabled,
        }
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.raster.depth_mask = enabled;
    }

    fn set_depth_func(&mut self, func: CompFunc) {
        self.raster.depth_func = func;
    }

    fn set_blend_func(&mut self, src: BlendFunc, dst: BlendFunc) {
        self.raster.blend_src = src;
        self.raster.blend_dst = dst;
    }

    fn set_front_face(&mut self, mode: CullMode) {
        self.raster.front_face = mode;
    }

    fn set_polygon_mode(&mut self, mode: FillMode) {
        self.raster.polygon_mode = mode;
    }

    fn set_polygon_offset(&mut self, factor: f32, units: f32) {
        self.raster.polygon_offset = (factor, units);
    }

    fn set_color_mask(&mut self, mask: ColorMask) {
        self.raster.color_mask = mask;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.raster.viewport = viewport;
    }

    fn set_clear_color(&mut self, color: Color) {
        self.raster.clear_color = color;
    }

    fn clear(&mut self, flags: ClearFlags) {
        if self.lost {
            return;
        }
        self.clears.push(ClearRecord {
            flags,
            depth_mask: self.raster.depth_mask,
            framebuffer: self.bound_framebuffer,
        });

        if flags.contains(ClearFlags::COLOR) {
            let color = self.raster.clear_color.to_rgba8();
            let mask = self.raster.color_mask.to_array();
            let (data, _, _) = self.color_target_mut();
            for pixel in data.chunks_exact_mut(RGBA) {
                for channel in 0..RGBA {
                    if mask[channel] {
                        pixel[channel] = color[channel];
                    }
                }
            }
        }
    }

    fn create_framebuffer(&mut self, width: u32, height: u32) -> ContextResult<FramebufferId> {
        self.ensure_alive()?;
        let max = self.capabilities.max_renderbuffer_size;
        if width > max || height > max {
            return Err(ContextError::Unsupported(format!(
                "renderbuffer {}x{} exceeds {}",
                width, height, max
            )));
        }

        self.reserve(surface_bytes((width, height)), "framebuffer")?;
        let id = FramebufferId(self.next_id());
        self.framebuffers.insert(
            id,
            HeadlessFramebuffer {
                width,
                height,
                color: vec![0; surface_bytes((width, height))],
                color_texture: None,
                depth_texture: None,
            },
        );
        Ok(id)
    }

    fn attach_texture(&mut self, framebuffer: FramebufferId, target: RenderTarget, texture: Option<GpuTextureId>) -> ContextResult<()> {
        self.ensure_alive()?;
        if let Some(id) = texture {
            let stored = self
                .textures
                .get(&id)
                .ok_or_else(|| ContextError::InvalidOperation(format!("unknown texture {:?}", id)))?;
            let compatible = match target {
                RenderTarget::Color => stored.channels() == RGBA,
                RenderTarget::Depth => stored.depth_bits.is_some(),
            };
            if !compatible {
                return Err(ContextError::InvalidOperation(format!(
                    "texture {:?} cannot be a {:?} attachment",
                    id, target
                )));
            }
        }

        let stored = self
            .framebuffers
            .get_mut(&framebuffer)
            .ok_or_else(|| ContextError::InvalidOperation(format!("unknown framebuffer {:?}", framebuffer)))?;
        match target {
            RenderTarget::Color => stored.color_texture = texture,
            RenderTarget::Depth => stored.depth_texture = texture,
        }
        Ok(())
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.bound_framebuffer = framebuffer.filter(|id| self.framebuffers.contains_key(id));
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if let Some(removed) = self.framebuffers.remove(&framebuffer) {
            self.release(removed.color.len());
        }
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
    }

    fn copy_framebuffer_to_texture(
        &mut self,
        texture: GpuTextureId,
        x_offset: u32,
        y_offset: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> ContextResult<()> {
        self.ensure_alive()?;
        let region = self.read_region(x, y, width, height)?;

        let stored = self
            .textures
            .get_mut(&texture)
            .ok_or_else(|| ContextError::InvalidOperation(format!("unknown texture {:?}", texture)))?;
        let channels = stored.channels();
        if channels == 0 {
            return Err(ContextError::InvalidOperation("copy into a depth texture".into()));
        }
        if !fits(x_offset, width, stored.width) || !fits(y_offset, height, stored.height) {
            return Err(ContextError::InvalidOperation(format!(
                "copy of {}x{} at ({}, {}) outside {}x{} texture",
                width, height, x_offset, y_offset, stored.width, stored.height
            )));
        }

        let texture_width = stored.width as usize;
        for row in 0..height as usize {
            for column in 0..width as usize {
                let src = (row * width as usize + column) * RGBA;
                let dst = ((y_offset as usize + row) * texture_width + x_offset as usize + column) * channels;
                stored.data[dst..dst + channels].copy_from_slice(&region[src..src + channels]);
            }
        }
        Ok(())
    }

    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> ContextResult<Vec<u8>> {
        self.ensure_alive()?;
        self.read_region(x, y, width, height)
    }

    fn poll_error(&mut self) -> Option<ContextError> {
        self.errors
            .pop_front()
            .or_else(|| self.lost.then_some(ContextError::ContextLost))
    }
}
