//! Headless scene demo
//!
//! Drives a fixed-function device through a few frames on the in-memory
//! context: a lit cube from a static buffer, a ring of spheres culled against
//! the frustum, a colored overlay drawn immediately and a shadow-map style
//! offscreen pass. The final frame is written to `scene_demo.png`.
//!
//! Usage: `scene_demo [config.toml|config.ron]`

use gfx_compat::foundation::logging;
use gfx_compat::prelude::*;
use gfx_compat::render::FramePixels;

const FRAME_COUNT: usize = 8;
const SURFACE_SIZE: (u32, u32) = (320, 240);
const SHADOW_MAP_SIZE: u32 = 256;
const OUTPUT_PATH: &str = "scene_demo.png";

fn cube_vertices() -> Vec<Vertex> {
    // (normal, four corners) per face
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0], [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]]),
        ([0.0, 0.0, -1.0], [[1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0]]),
        ([1.0, 0.0, 0.0], [[1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0]]),
        ([-1.0, 0.0, 0.0], [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]]),
        ([0.0, 1.0, 0.0], [[-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0]]),
        ([0.0, -1.0, 0.0], [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]]),
    ];
    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    let mut vertices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        for index in [0, 1, 2, 0, 2, 3] {
            vertices.push(Vertex::new(corners[index], normal, uvs[index]));
        }
    }
    vertices
}

fn overlay_vertices(time: f32) -> [VertexCol; 4] {
    let pulse = 0.5 + 0.5 * time.sin();
    [
        VertexCol::new([-1.0, -1.0, 0.0], Color::new(pulse, 0.0, 0.0, 0.5)),
        VertexCol::new([-0.6, -1.0, 0.0], Color::new(0.0, pulse, 0.0, 0.5)),
        VertexCol::new([-1.0, -0.6, 0.0], Color::new(0.0, 0.0, pulse, 0.5)),
        VertexCol::new([-0.6, -0.6, 0.0], Color::new(pulse, pulse, pulse, 0.5)),
    ]
}

fn load_config() -> Result<DeviceConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading device configuration from {}", path);
            Ok(DeviceConfig::load_from_file(&path)?)
        }
        None => Ok(DeviceConfig::default().with_anisotropy(4)),
    }
}

fn setup_lights(device: &mut Device<HeadlessContext>) -> DeviceResult<()> {
    device.set_global_ambient(Color::new(0.1, 0.1, 0.15, 1.0))?;
    device.set_light(0, Light::directional(Vec3::new(-0.5, -1.0, -0.3), Color::new(0.9, 0.85, 0.8, 1.0)))?;
    device.set_light_enabled(0, true)?;
    device.set_light(1, Light::point(Vec3::new(0.0, 3.0, 0.0), Color::new(0.2, 0.4, 1.0, 1.0), [1.0, 0.09, 0.032]))?;
    device.set_light_enabled(1, true)?;
    device.set_render_state(RenderState::Lighting, true)?;
    device.debug_lights();
    Ok(())
}

fn shadow_pass(device: &mut Device<HeadlessContext>, cube: BufferHandle, shadow_map: TextureHandle) -> DeviceResult<()> {
    device.init_offscreen_buffer(SHADOW_MAP_SIZE, SHADOW_MAP_SIZE)?;
    device.set_render_texture(RenderTarget::Depth, Some(shadow_map))?;
    device.set_color_mask(ColorMask { red: false, green: false, blue: false, alpha: false })?;
    device.set_depth_bias(2.0, 4.0)?;
    device.set_render_state(RenderState::DepthBias, true)?;

    let light_view = Mat4::look_at(Vec3::new(5.0, 10.0, 3.0), Vec3::zeros(), Vec3::y());
    let light_projection = Mat4::orthographic_gl(-4.0, 4.0, -4.0, 4.0, 1.0, 30.0);
    device.set_transform(TransformType::View, light_view)?;
    device.set_transform(TransformType::Projection, light_projection)?;
    device.clear()?;
    device.draw_buffer(cube)?;

    device.set_render_state(RenderState::DepthBias, false)?;
    device.set_color_mask(ColorMask::ALL)?;
    device.set_render_texture(RenderTarget::Depth, None)?;
    device.restore_primary_target()?;
    device.set_transform(TransformType::Shadow, light_projection * light_view)?;
    Ok(())
}

fn render_frame(
    device: &mut Device<HeadlessContext>,
    cube: BufferHandle,
    shadow_map: TextureHandle,
    frame: usize,
) -> DeviceResult<usize> {
    let time = frame as f32 * 0.25;
    device.begin_scene()?;

    shadow_pass(device, cube, shadow_map)?;

    let (width, height) = SURFACE_SIZE;
    let aspect = width as f32 / height as f32;
    let eye = Vec3::new(6.0 * time.cos(), 3.0, 6.0 * time.sin());
    device.set_transform(TransformType::Projection, Mat4::perspective_gl(std::f32::consts::FRAC_PI_3, aspect, 0.5, 50.0))?;
    device.set_transform(TransformType::View, Mat4::look_at(eye, Vec3::zeros(), Vec3::y()))?;

    device.set_texture(2, Some(shadow_map))?;
    device.set_render_state(RenderState::ShadowMapping, true)?;
    device.set_material(Material::with_diffuse(Color::new(0.8, 0.3, 0.2, 1.0)).with_specular(Color::WHITE, 32.0))?;
    device.set_transform(TransformType::World, Mat4::rotation_y(time))?;
    device.draw_buffer(cube)?;
    device.set_render_state(RenderState::ShadowMapping, false)?;

    // ring of small cubes, skipped when outside the frustum
    let mut culled = 0;
    for index in 0..12 {
        let angle = index as f32 / 12.0 * std::f32::consts::TAU;
        let world = Mat4::new_translation(&Vec3::new(10.0 * angle.cos(), 0.0, 10.0 * angle.sin())) * Mat4::new_scaling(0.3);
        device.set_transform(TransformType::World, world)?;
        if device.compute_sphere_visibility(&Vec3::zeros(), 1.8)? == SphereVisibility::Outside {
            culled += 1;
            continue;
        }
        device.draw_buffer(cube)?;
    }

    // screen-space overlay
    device.set_render_state(RenderState::Lighting, false)?;
    device.set_render_state(RenderState::DepthTest, false)?;
    device.set_render_state(RenderState::Blending, true)?;
    device.set_blend_func(BlendFunc::SrcAlpha, BlendFunc::InvSrcAlpha)?;
    device.set_transform(TransformType::Projection, Mat4::identity())?;
    device.set_transform(TransformType::View, Mat4::identity())?;
    device.set_transform(TransformType::World, Mat4::identity())?;
    device.draw_primitive(PrimitiveType::TriangleStrip, &overlay_vertices(time), Color::WHITE)?;
    device.set_render_state(RenderState::Blending, false)?;
    device.set_render_state(RenderState::DepthTest, true)?;
    device.set_render_state(RenderState::Lighting, true)?;

    device.end_scene()?;
    Ok(culled)
}

fn save_frame(pixels: &FramePixels) -> Result<(), Box<dyn std::error::Error>> {
    image::save_buffer(OUTPUT_PATH, &pixels.data, pixels.width, pixels.height, image::ColorType::Rgba8)?;
    log::info!("Wrote {}x{} frame to {}", pixels.width, pixels.height, OUTPUT_PATH);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");

    log::info!("Starting headless scene demo");

    let config = load_config()?;
    let context = HeadlessContext::new().with_surface_size(SURFACE_SIZE.0, SURFACE_SIZE.1);
    let mut device = Device::new(context, config);
    device.create()?;

    setup_lights(&mut device)?;
    device.set_clear_color(Color::new(0.05, 0.05, 0.1, 1.0))?;

    let cube = device.create_buffer(PrimitiveType::Triangles, &cube_vertices())?;
    let shadow_map = device.create_depth_texture(SHADOW_MAP_SIZE, SHADOW_MAP_SIZE, 24)?;
    let checker = ImageData::solid_color(64, 64, [200, 200, 200, 255]);
    let diffuse = device.create_texture(&checker, TextureCreateParams { mipmap: true, ..Default::default() })?;
    device.set_texture(0, Some(diffuse))?;
    device.set_texture_stage_params(0, TextureStageParams { color_operation: TexMixOperation::Modulate, ..Default::default() })?;

    for frame in 0..FRAME_COUNT {
        let culled = render_frame(&mut device, cube, shadow_map, frame)?;
        log::info!("Frame {}: {} of 12 ring cubes culled", frame, culled);
    }

    let pixels = device.get_frame_buffer_pixels()?;
    save_frame(&pixels)?;

    let stats = device.stats();
    log::info!(
        "{} draws, {} flushes, {} uniform uploads, {} model-view recomputes",
        stats.draw_calls,
        stats.flushes,
        stats.uniform_uploads,
        stats.model_view_recomputes
    );

    device.destroy()?;
    log::info!("Scene demo completed successfully");
    Ok(())
}
