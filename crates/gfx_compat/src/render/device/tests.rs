use approx::assert_relative_eq;

use super::*;
use crate::assets::ImageData;
use crate::foundation::math::Mat4Ext;
use crate::render::api::UniformValue;
use crate::render::backends::headless::{DrawCall, HeadlessContext};
use crate::render::primitives::{PrimitiveType, Vertex, VertexCol, VertexLayout};
use crate::render::resources::{
    RenderTarget, TexGenMode, TexMixOperation, TexWrapMode, TextureCreateParams,
    TextureGenerationParams, TextureStageParams, INITIAL_SCRATCH_VERTICES,
};
use crate::render::sync::{light_uniform_name, names, stage_uniform_name};

fn created(context: HeadlessContext) -> Device<HeadlessContext> {
    let mut device = Device::new(context, DeviceConfig::default());
    device.create().unwrap();
    device
}

fn in_scene() -> Device<HeadlessContext> {
    let mut device = created(HeadlessContext::new());
    device.begin_scene().unwrap();
    device
}

fn triangle() -> [Vertex; 3] {
    [
        Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
        Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
    ]
}

fn last_draw(device: &Device<HeadlessContext>) -> &DrawCall {
    device.context().last_draw().unwrap()
}

fn matrix_uniform(draw: &DrawCall, name: &str) -> Mat4 {
    match draw.uniform(name) {
        Some(UniformValue::Mat4(matrix)) => matrix,
        other => panic!("{} is not a matrix: {:?}", name, other),
    }
}

fn checker() -> ImageData {
    ImageData::solid_color(4, 4, [255, 0, 0, 255])
}

// ---------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------

#[test]
fn test_create_pushes_default_state() {
    let device = created(HeadlessContext::new());
    assert_eq!(device.lifecycle(), DeviceLifecycle::Created);
    assert_eq!(device.context().live_program_count(), 1);
    assert!(device.context().bound_program().is_some());
    assert!(!device.state().is_dirty());
    assert_eq!(device.state().viewport(), Viewport::new(0, 0, 640, 480));
    assert!(device.context().raster().depth_test);
}

#[test]
fn test_operations_before_create_are_rejected() {
    let mut device = Device::new(HeadlessContext::new(), DeviceConfig::default());
    let err = device.set_transform(TransformType::World, Mat4::identity()).unwrap_err();
    assert_eq!(
        err,
        DeviceError::InvalidLifecycle { operation: "set_transform", state: DeviceLifecycle::Uninitialized }
    );
    assert!(err.is_contract_violation());
    assert!(device.begin_scene().is_err());
}

#[test]
fn test_create_rejects_old_context() {
    let mut device = Device::new(HeadlessContext::new().with_version(3, 2), DeviceConfig::default());
    assert!(matches!(device.create(), Err(DeviceError::Initialization(_))));
    assert_eq!(device.lifecycle(), DeviceLifecycle::Uninitialized);
}

#[test]
fn test_create_rejects_too_few_texture_units() {
    let mut device = Device::new(HeadlessContext::new().with_texture_units(2), DeviceConfig::default());
    assert!(matches!(device.create(), Err(DeviceError::Initialization(_))));
}

#[test]
fn test_create_reports_compile_failure() {
    let mut device = Device::new(HeadlessContext::new().with_compile_error("syntax error"), DeviceConfig::default());
    let err = device.create().unwrap_err();
    assert!(matches!(err, DeviceError::Initialization(ref log) if log.contains("syntax error")));
    assert_eq!(device.lifecycle(), DeviceLifecycle::Uninitialized);
}

#[test]
fn test_create_failure_releases_program() {
    let mut device = Device::new(HeadlessContext::new().with_memory_limit(100), DeviceConfig::default());
    assert!(matches!(device.create(), Err(DeviceError::ResourceCreation(_))));
    assert_eq!(device.context().live_program_count(), 0);
    assert_eq!(device.context().live_buffer_count(), 0);
}

#[test]
fn test_scene_pairing() {
    let mut device = created(HeadlessContext::new());
    assert_eq!(device.end_scene(), Err(DeviceError::UnmatchedScene("end_scene without begin_scene")));

    device.begin_scene().unwrap();
    assert_eq!(device.lifecycle(), DeviceLifecycle::InScene);
    assert!(matches!(device.begin_scene(), Err(DeviceError::UnmatchedScene(_))));

    device.end_scene().unwrap();
    assert_eq!(device.lifecycle(), DeviceLifecycle::Created);
}

#[test]
fn test_draw_outside_scene_is_rejected() {
    let mut device = created(HeadlessContext::new());
    let err = device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap_err();
    assert!(matches!(err, DeviceError::InvalidLifecycle { operation: "draw_primitive", .. }));
    assert!(device.context().draw_calls().is_empty());
}

#[test]
fn test_destroy_releases_everything() {
    let mut device = in_scene();
    device.create_buffer(PrimitiveType::Triangles, &triangle()).unwrap();
    device.create_texture(&checker(), TextureCreateParams::default()).unwrap();
    device.init_offscreen_buffer(32, 32).unwrap();

    device.destroy().unwrap();
    assert_eq!(device.lifecycle(), DeviceLifecycle::Destroyed);

    let context = device.context();
    assert_eq!(context.live_program_count(), 0);
    assert_eq!(context.live_buffer_count(), 0);
    assert_eq!(context.live_texture_count(), 0);
    assert_eq!(context.live_framebuffer_count(), 0);
    assert_eq!(context.memory_used(), 0);
}

#[test]
fn test_destroyed_device_stays_destroyed() {
    let mut device = created(HeadlessContext::new());
    device.destroy().unwrap();

    assert!(matches!(device.destroy(), Err(DeviceError::InvalidLifecycle { .. })));
    assert!(matches!(device.create(), Err(DeviceError::InvalidLifecycle { .. })));
    assert!(matches!(device.set_clear_color(Color::BLACK), Err(DeviceError::InvalidLifecycle { .. })));
}

#[test]
fn test_begin_scene_clears_with_depth_writes() {
    let mut device = created(HeadlessContext::new());
    device.set_render_state(RenderState::DepthWrite, false).unwrap();
    device.begin_scene().unwrap();

    let clear = device.context().clears().last().copied().unwrap();
    assert!(clear.flags.contains(ClearFlags::COLOR | ClearFlags::DEPTH));
    assert!(clear.depth_mask);
    assert!(!device.context().raster().depth_mask);
}

// ---------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------

#[test]
fn test_model_view_is_view_times_world_in_any_order() {
    let world = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0)) * Mat4::new_rotation(Vec3::new(0.0, 0.5, 0.0));
    let view = Mat4::new_translation(&Vec3::new(0.0, 0.0, -10.0)) * Mat4::new_rotation(Vec3::new(0.3, 0.0, 0.0));
    let expected = view * world;

    let mut first = in_scene();
    first.set_transform(TransformType::World, world).unwrap();
    first.set_material(Material::with_diffuse(Color::BLACK)).unwrap();
    first.set_transform(TransformType::View, view).unwrap();
    first.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    let mut second = in_scene();
    second.set_transform(TransformType::View, view).unwrap();
    second.set_render_state(RenderState::Fog, true).unwrap();
    second.set_transform(TransformType::World, Mat4::identity() * 7.0).unwrap();
    second.set_global_ambient(Color::WHITE).unwrap();
    second.set_transform(TransformType::World, world).unwrap();
    second.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    assert_relative_eq!(matrix_uniform(last_draw(&first), names::MODEL_VIEW_MATRIX), expected, epsilon = 1e-5);
    assert_relative_eq!(matrix_uniform(last_draw(&second), names::MODEL_VIEW_MATRIX), expected, epsilon = 1e-5);
}

#[test]
fn test_model_view_recomputed_only_after_transform_change() {
    let mut device = in_scene();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    let recomputes = device.stats().model_view_recomputes;

    device.set_material(Material::with_diffuse(Color::BLACK)).unwrap();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    assert_eq!(device.stats().model_view_recomputes, recomputes);

    device.set_transform(TransformType::World, Mat4::new_scaling(2.0)).unwrap();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    assert_eq!(device.stats().model_view_recomputes, recomputes + 1);
}

#[test]
fn test_render_state_set_twice_matches_once() {
    let mut once = in_scene();
    once.set_render_state(RenderState::Blending, true).unwrap();
    once.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    let mut twice = in_scene();
    twice.set_render_state(RenderState::Blending, true).unwrap();
    twice.set_render_state(RenderState::Blending, true).unwrap();
    twice.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    assert_eq!(last_draw(&once).raster, last_draw(&twice).raster);
    assert_eq!(once.stats(), twice.stats());

    // setting the current value again leaves nothing to flush
    let flushes = twice.stats().flushes;
    twice.set_render_state(RenderState::Blending, true).unwrap();
    assert!(!twice.state().is_dirty());
    twice.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    assert_eq!(twice.stats().flushes, flushes);
    assert!(last_draw(&twice).raster.blend);
}

// ---------------------------------------------------------------------
// Buffers
// ---------------------------------------------------------------------

#[test]
fn test_buffer_draw_uses_uploaded_vertices() {
    let mut device = in_scene();
    let vertices = triangle();
    let handle = device.create_buffer(PrimitiveType::Triangles, &vertices).unwrap();
    device.draw_buffer(handle).unwrap();

    let draw = last_draw(&device);
    assert_eq!(draw.primitive, PrimitiveType::Triangles);
    assert_eq!(draw.count, 3);
    assert_eq!(draw.layout, VertexLayout::Plain);
    assert_eq!(draw.vertex_data, bytemuck::cast_slice::<Vertex, u8>(&vertices));
}

#[test]
fn test_update_with_different_count_keeps_contents() {
    let mut device = in_scene();
    let vertices = triangle();
    let handle = device.create_buffer(PrimitiveType::Triangles, &vertices).unwrap();

    let longer = [vertices[0]; 4];
    let err = device.update_buffer(handle, PrimitiveType::Triangles, &longer).unwrap_err();
    assert_eq!(err, DeviceError::BufferCountMismatch { expected: 3, found: 4 });
    assert!(err.is_contract_violation());

    let colored = [VertexCol::new([0.0; 3], Color::WHITE); 3];
    assert!(matches!(
        device.update_buffer(handle, PrimitiveType::Triangles, &colored),
        Err(DeviceError::BufferLayoutMismatch { .. })
    ));

    device.draw_buffer(handle).unwrap();
    assert_eq!(last_draw(&device).vertex_data, bytemuck::cast_slice::<Vertex, u8>(&vertices));
}

#[test]
fn test_update_in_place_changes_primitive() {
    let mut device = in_scene();
    let handle = device.create_buffer(PrimitiveType::Triangles, &triangle()).unwrap();
    let gpu_buffer = device.buffer(handle).unwrap().gpu_buffer;

    let mut moved = triangle();
    moved[0].coord = [5.0, 5.0, 5.0];
    device.update_buffer(handle, PrimitiveType::LineStrip, &moved).unwrap();
    device.draw_buffer(handle).unwrap();

    assert_eq!(device.context().buffer_reallocations(gpu_buffer), 0);
    assert_eq!(last_draw(&device).primitive, PrimitiveType::LineStrip);
    assert_eq!(last_draw(&device).vertex_data, bytemuck::cast_slice::<Vertex, u8>(&moved));
}

#[test]
fn test_destroyed_buffer_is_unknown() {
    let mut device = in_scene();
    let handle = device.create_buffer(PrimitiveType::Triangles, &triangle()).unwrap();
    device.destroy_buffer(handle).unwrap();

    assert_eq!(device.draw_buffer(handle), Err(DeviceError::UnknownBuffer(handle)));
    assert_eq!(device.destroy_buffer(handle), Err(DeviceError::UnknownBuffer(handle)));

    // a new buffer never reuses the stale handle
    let fresh = device.create_buffer(PrimitiveType::Triangles, &triangle()).unwrap();
    assert_ne!(fresh, handle);
}

#[test]
fn test_flat_color_only_for_uncolored_layouts() {
    let mut device = in_scene();
    let red = Color::new(1.0, 0.0, 0.0, 1.0);
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), red).unwrap();
    assert_eq!(last_draw(&device).constant_color, red.to_array());

    let colored = [VertexCol::new([0.0; 3], Color::WHITE); 3];
    device.draw_primitive(PrimitiveType::Triangles, &colored, Color::BLACK).unwrap();
    assert_eq!(last_draw(&device).layout, VertexLayout::Colored);
    assert_eq!(last_draw(&device).constant_color, red.to_array());
}

#[test]
fn test_scratch_buffer_grows_on_demand() {
    let mut device = in_scene();
    let many = vec![Vertex::default(); INITIAL_SCRATCH_VERTICES + 1];
    device.draw_primitive(PrimitiveType::Points, &many, Color::WHITE).unwrap();
    assert_eq!(device.scratch_capacity(VertexLayout::Plain), INITIAL_SCRATCH_VERTICES + 1);
    assert_eq!(last_draw(&device).count, INITIAL_SCRATCH_VERTICES + 1);

    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    assert_eq!(device.scratch_capacity(VertexLayout::Plain), INITIAL_SCRATCH_VERTICES + 1);
    assert_eq!(device.scratch_capacity(VertexLayout::Colored), INITIAL_SCRATCH_VERTICES);
    assert_eq!(device.stats().draw_calls, 2);
}

#[test]
fn test_empty_draw_is_skipped() {
    let mut device = in_scene();
    let none: [Vertex; 0] = [];
    device.draw_primitive(PrimitiveType::Triangles, &none, Color::WHITE).unwrap();
    assert!(device.context().draw_calls().is_empty());
}

// ---------------------------------------------------------------------
// Lights
// ---------------------------------------------------------------------

#[test]
fn test_light_survives_disable_enable() {
    let mut device = in_scene();
    let light = Light::point(Vec3::new(1.0, 2.0, 3.0), Color::new(0.5, 0.5, 0.5, 1.0), [1.0, 0.1, 0.01]);
    device.set_light(0, light).unwrap();
    device.set_light_enabled(0, true).unwrap();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    device.set_light_enabled(0, false).unwrap();
    device.set_light_enabled(0, false).unwrap();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    assert_eq!(last_draw(&device).uniform(&light_uniform_name(0, "enabled")), Some(UniformValue::Bool(false)));

    device.set_light_enabled(0, true).unwrap();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    let draw = last_draw(&device);
    assert_eq!(draw.uniform(&light_uniform_name(0, "enabled")), Some(UniformValue::Bool(true)));
    assert_eq!(draw.uniform(&light_uniform_name(0, "position")), Some(UniformValue::Vec4([1.0, 2.0, 3.0, 1.0])));
    assert_eq!(draw.uniform(&light_uniform_name(0, "attenuation")), Some(UniformValue::Vec3([1.0, 0.1, 0.01])));
    assert_eq!(*device.state().light(0).unwrap(), light);
}

#[test]
fn test_max_counts_bound_indices() {
    let mut device = created(HeadlessContext::new());
    let lights = device.get_max_light_count();
    let stages = device.get_max_texture_stage_count();

    assert!(device.set_light(lights - 1, Light::default()).is_ok());
    assert_eq!(
        device.set_light(lights, Light::default()),
        Err(DeviceError::LightIndexOutOfRange { index: lights, max: lights })
    );
    assert!(device.set_light_enabled(lights, true).is_err());

    assert!(device.set_texture_enabled(stages - 1, true).is_ok());
    assert_eq!(
        device.set_texture_enabled(stages, true),
        Err(DeviceError::TextureStageOutOfRange { index: stages, max: stages })
    );
    assert!(device.set_texture(stages, None).is_err());
    assert!(device.set_texture_stage_params(stages, TextureStageParams::default()).is_err());
    assert!(device.set_texture_stage_wrap(stages, TexWrapMode::Clamp, TexWrapMode::Clamp).is_err());
}

// ---------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------

#[test]
fn test_texture_params_independent_of_bind_order() {
    let params = TextureStageParams {
        color_operation: TexMixOperation::Add,
        wrap_s: TexWrapMode::Clamp,
        wrap_t: TexWrapMode::ClampToBorder,
        ..TextureStageParams::default()
    };

    let mut bind_first = in_scene();
    let texture = bind_first.create_texture(&checker(), TextureCreateParams::default()).unwrap();
    bind_first.set_texture(0, Some(texture)).unwrap();
    bind_first.set_texture_stage_params(0, params).unwrap();
    bind_first.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    let mut params_first = in_scene();
    let other = params_first.create_texture(&checker(), TextureCreateParams::default()).unwrap();
    params_first.set_texture_stage_params(0, params).unwrap();
    params_first.set_texture(0, Some(other)).unwrap();
    params_first.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    for device in [&bind_first, &params_first] {
        let draw = last_draw(device);
        assert_eq!(draw.uniform(&stage_uniform_name(0, "enabled")), Some(UniformValue::Bool(true)));
        assert_eq!(draw.uniform(&stage_uniform_name(0, "color_operation")), Some(UniformValue::Int(3)));

        let gpu = draw.textures[0].unwrap();
        let stored = device.context().texture(gpu).unwrap();
        assert_eq!((stored.wrap_s, stored.wrap_t), (TexWrapMode::Clamp, TexWrapMode::ClampToBorder));
    }
}

#[test]
fn test_coord_generation_reaches_program() {
    let mut device = in_scene();
    let texture = device.create_texture(&checker(), TextureCreateParams::default()).unwrap();
    device.set_texture(0, Some(texture)).unwrap();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    let before = last_draw(&device).uniforms.clone();
    assert_eq!(before.get(&stage_uniform_name(0, "texgen_enabled")), Some(&UniformValue::Bool(false)));

    let mut generation = TextureGenerationParams::default();
    generation.coords[0].mode = TexGenMode::Sphere;
    generation.coords[1].mode = TexGenMode::EyeLinear;
    generation.coords[1].plane = [0.0, 1.0, 0.0, 0.5];
    device.set_texture_coord_generation(0, generation).unwrap();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    let draw = last_draw(&device);
    assert_ne!(before, draw.uniforms);
    assert_eq!(draw.uniform(&stage_uniform_name(0, "texgen_enabled")), Some(UniformValue::Bool(true)));
    assert_eq!(draw.uniform(&stage_uniform_name(0, "texgen_mode[0]")), Some(UniformValue::Int(3)));
    assert_eq!(draw.uniform(&stage_uniform_name(0, "texgen_mode[1]")), Some(UniformValue::Int(2)));
    assert_eq!(draw.uniform(&stage_uniform_name(0, "texgen_mode[2]")), Some(UniformValue::Int(0)));
    assert_eq!(
        draw.uniform(&stage_uniform_name(0, "texgen_plane[1]")),
        Some(UniformValue::Vec4([0.0, 1.0, 0.0, 0.5]))
    );
}

#[test]
fn test_destroyed_texture_is_a_contract_violation() {
    let mut device = in_scene();
    let texture = device.create_texture(&checker(), TextureCreateParams::default()).unwrap();
    device.set_texture(0, Some(texture)).unwrap();
    device.destroy_texture(texture).unwrap();

    assert_eq!(device.state().stage(0).unwrap().texture, None);
    for err in [
        device.set_texture(0, Some(texture)).unwrap_err(),
        device.destroy_texture(texture).unwrap_err(),
        device.copy_framebuffer_to_texture(texture, 0, 0, 0, 0, 1, 1).unwrap_err(),
        device.texture(texture).unwrap_err(),
    ] {
        assert_eq!(err, DeviceError::UnknownTexture(texture));
        assert!(err.is_contract_violation());
    }

    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    assert_eq!(last_draw(&device).textures[0], None);
    assert_eq!(last_draw(&device).uniform(&stage_uniform_name(0, "enabled")), Some(UniformValue::Bool(false)));
}

#[test]
fn test_texture_creation_failure_leaves_device_usable() {
    let mut device = Device::new(HeadlessContext::new().with_memory_limit(64 * 1024), DeviceConfig::default());
    device.create().unwrap();
    device.begin_scene().unwrap();

    let large = ImageData::solid_color(256, 256, [0, 0, 0, 255]);
    assert!(matches!(
        device.create_texture(&large, TextureCreateParams::default()),
        Err(DeviceError::ResourceCreation(_))
    ));
    assert_eq!(device.textures().count(), 0);
    assert_eq!(device.lifecycle(), DeviceLifecycle::InScene);

    let small = device.create_texture(&checker(), TextureCreateParams::default()).unwrap();
    device.set_texture(0, Some(small)).unwrap();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    assert!(last_draw(&device).textures[0].is_some());
}

#[test]
fn test_invalid_texture_data_rejected() {
    let mut device = created(HeadlessContext::new());
    let mut image = checker();
    image.data.truncate(10);
    assert!(matches!(
        device.create_texture(&image, TextureCreateParams::default()),
        Err(DeviceError::InvalidTextureData(_))
    ));
    assert!(matches!(device.create_depth_texture(0, 16, 24), Err(DeviceError::InvalidDimensions { .. })));
}

#[test]
fn test_texture_from_dynamic_image() {
    let mut device = created(HeadlessContext::new());
    let image = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(3, 5, image::Rgba([1, 2, 3, 4])));
    let handle = device.create_texture_from_image(&image, TextureCreateParams::default()).unwrap();

    let texture = device.texture(handle).unwrap();
    assert_eq!(texture.size, (3, 5));
    assert!(texture.alpha);
}

#[test]
fn test_anisotropy_degrades_without_support() {
    let config = DeviceConfig::default().with_anisotropy(8);
    let mut device = Device::new(HeadlessContext::new().without_anisotropy(), config);
    device.create().unwrap();
    assert_eq!(device.anisotropy_level(), 1);

    let handle = device.create_texture(&checker(), TextureCreateParams::default()).unwrap();
    let gpu = device.textures.gpu_texture(handle).unwrap();
    assert_eq!(device.context().texture(gpu).unwrap().anisotropy, 1);
}

#[test]
fn test_config_changed_reapplies_anisotropy_and_lighting_branch() {
    let mut device = in_scene();
    let handle = device.create_texture(&checker(), TextureCreateParams::default()).unwrap();
    let gpu = device.textures.gpu_texture(handle).unwrap();

    let config = DeviceConfig::default().with_anisotropy(32).with_per_pixel_lighting(false);
    device.config_changed(config).unwrap();
    assert_eq!(device.anisotropy_level(), 16);
    assert_eq!(device.context().texture(gpu).unwrap().anisotropy, 16);

    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    assert_eq!(last_draw(&device).uniform(names::PER_PIXEL_LIGHTING), Some(UniformValue::Bool(false)));

    assert!(matches!(
        device.config_changed(DeviceConfig::default().with_anisotropy(0)),
        Err(DeviceError::Initialization(_))
    ));
    assert_eq!(device.config().anisotropy_level, 32);
}

// ---------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------

#[test]
fn test_sphere_visibility_follows_current_transforms() {
    let mut device = created(HeadlessContext::new());
    let projection = Mat4::perspective_gl(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);
    device.set_transform(TransformType::Projection, projection).unwrap();

    let inside = device.compute_sphere_visibility(&Vec3::new(0.0, 0.0, -50.0), 1.0).unwrap();
    let outside = device.compute_sphere_visibility(&Vec3::new(0.0, 0.0, 10.0), 1.0).unwrap();
    let straddling = device.compute_sphere_visibility(&Vec3::new(0.0, 0.0, -100.0), 2.0).unwrap();
    assert_eq!(inside, SphereVisibility::Inside);
    assert_eq!(outside, SphereVisibility::Outside);
    assert_eq!(straddling, SphereVisibility::Intersecting);

    // the same sphere in object space moves with the world transform
    device.set_transform(TransformType::World, Mat4::new_translation(&Vec3::new(0.0, 0.0, -50.0))).unwrap();
    assert_eq!(device.compute_sphere_visibility(&Vec3::zeros(), 1.0).unwrap(), SphereVisibility::Inside);
    assert_eq!(device.frustum_plane_mask(&Vec3::zeros(), 1.0).unwrap(), FrustumPlanes::all());

    device.set_transform(TransformType::View, Mat4::new_translation(&Vec3::new(0.0, 0.0, 60.0))).unwrap();
    assert_eq!(device.compute_sphere_visibility(&Vec3::zeros(), 1.0).unwrap(), SphereVisibility::Outside);
    assert!(!device.frustum_plane_mask(&Vec3::zeros(), 1.0).unwrap().contains(FrustumPlanes::NEAR));
}

// ---------------------------------------------------------------------
// Offscreen and read-back
// ---------------------------------------------------------------------

#[test]
fn test_read_back_rows_are_top_down() {
    let mut device = created(HeadlessContext::new().with_surface_size(2, 2));
    {
        // bottom row red, top row blue
        let surface = device.context_mut().surface_mut();
        surface[..8].copy_from_slice(&[255, 0, 0, 255, 255, 0, 0, 255]);
        surface[8..].copy_from_slice(&[0, 0, 255, 255, 0, 0, 255, 255]);
    }

    let pixels = device.get_frame_buffer_pixels().unwrap();
    assert_eq!((pixels.width, pixels.height), (2, 2));
    assert_eq!(pixels.stride(), 8);
    assert_eq!(pixels.pixel(0, 0), Some([0, 0, 255, 255]));
    assert_eq!(pixels.pixel(1, 1), Some([255, 0, 0, 255]));
    assert_eq!(pixels.pixel(2, 0), None);
    assert_eq!(pixels.row(2), None);
}

#[test]
fn test_read_back_clips_negative_origin() {
    let mut device = created(HeadlessContext::new().with_surface_size(2, 2));
    {
        // bottom-right pixel green
        let surface = device.context_mut().surface_mut();
        surface[4..8].copy_from_slice(&[0, 255, 0, 255]);
    }
    device.set_viewport(Viewport::new(-1, 0, 3, 1)).unwrap();

    let pixels = device.get_frame_buffer_pixels().unwrap();
    assert_eq!((pixels.width, pixels.height), (2, 1));
    assert_eq!(pixels.pixel(1, 0), Some([0, 255, 0, 255]));

    device.set_viewport(Viewport::new(0, -5, 2, 2)).unwrap();
    let pixels = device.get_frame_buffer_pixels().unwrap();
    assert_eq!((pixels.width, pixels.height), (2, 0));
    assert!(pixels.data.is_empty());
}

#[test]
fn test_oversized_read_back_is_rejected() {
    let mut device = created(HeadlessContext::new().with_surface_size(4, 4));
    device.set_viewport(Viewport::new(1, 0, u32::MAX, 1)).unwrap();
    assert!(matches!(device.get_frame_buffer_pixels(), Err(DeviceError::Backend(_))));
    assert_eq!(device.lifecycle(), DeviceLifecycle::Created);

    let texture = device.create_texture(&checker(), TextureCreateParams::default()).unwrap();
    assert!(device.copy_framebuffer_to_texture(texture, 1, 0, 0, 0, u32::MAX, 1).is_err());

    device.set_viewport(Viewport::new(0, 0, 4, 4)).unwrap();
    assert_eq!(device.get_frame_buffer_pixels().unwrap().data.len(), 64);
}

#[test]
fn test_offscreen_target_receives_draws() {
    let mut device = in_scene();
    device.init_offscreen_buffer(128, 64).unwrap();
    assert_eq!(device.offscreen_size(), Some((128, 64)));
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();

    let draw = last_draw(&device);
    assert!(draw.framebuffer.is_some());
    assert_eq!(draw.raster.viewport, Viewport::new(0, 0, 128, 64));

    device.restore_primary_target().unwrap();
    device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap();
    assert_eq!(last_draw(&device).framebuffer, None);
    assert_eq!(last_draw(&device).raster.viewport, Viewport::new(0, 0, 640, 480));
    assert_eq!(device.context().live_framebuffer_count(), 0);
}

#[test]
fn test_offscreen_limits() {
    let mut device = created(HeadlessContext::new().with_max_renderbuffer_size(128));
    assert_eq!(
        device.init_offscreen_buffer(256, 16),
        Err(DeviceError::OffscreenTooLarge { width: 256, height: 16, max: 128 })
    );
    assert!(matches!(device.init_offscreen_buffer(0, 16), Err(DeviceError::InvalidDimensions { .. })));
    assert_eq!(device.set_render_texture(RenderTarget::Color, None), Err(DeviceError::OffscreenNotInitialized));
    assert_eq!(device.restore_primary_target(), Err(DeviceError::OffscreenNotInitialized));

    // a second init replaces the first target
    device.init_offscreen_buffer(64, 64).unwrap();
    device.init_offscreen_buffer(32, 32).unwrap();
    assert_eq!(device.context().live_framebuffer_count(), 1);
}

#[test]
fn test_failed_offscreen_replacement_keeps_previous_target() {
    // scratch buffers plus one 32x32 target fit, a 64x64 target does not
    let scratch: usize = [VertexLayout::Plain, VertexLayout::Tex2, VertexLayout::Colored]
        .iter()
        .map(|layout| INITIAL_SCRATCH_VERTICES * layout.stride())
        .sum();
    let limit = scratch + 2 * 32 * 32 * 4;
    let mut device = Device::new(HeadlessContext::new().with_memory_limit(limit), DeviceConfig::default());
    device.create().unwrap();

    device.init_offscreen_buffer(32, 32).unwrap();
    let first = device.context().bound_framebuffer();

    assert!(matches!(device.init_offscreen_buffer(64, 64), Err(DeviceError::ResourceCreation(_))));
    assert_eq!(device.offscreen_size(), Some((32, 32)));
    assert_eq!(device.state().viewport(), Viewport::new(0, 0, 32, 32));
    assert_eq!(device.context().bound_framebuffer(), first);
    assert_eq!(device.context().live_framebuffer_count(), 1);

    device.restore_primary_target().unwrap();
    assert_eq!(device.context().live_framebuffer_count(), 0);
}

#[test]
fn test_render_to_texture_and_read_back() {
    let mut device = created(HeadlessContext::new());
    let target = device.create_texture(&ImageData::solid_color(4, 4, [0, 0, 0, 0]), TextureCreateParams::default()).unwrap();
    let depth = device.create_depth_texture(4, 4, 24).unwrap();

    device.init_offscreen_buffer(4, 4).unwrap();
    assert!(matches!(
        device.set_render_texture(RenderTarget::Color, Some(depth)),
        Err(DeviceError::InvalidTextureData(_))
    ));
    device.set_render_texture(RenderTarget::Color, Some(target)).unwrap();
    device.set_render_texture(RenderTarget::Depth, Some(depth)).unwrap();

    device.set_clear_color(Color::new(0.0, 1.0, 0.0, 1.0)).unwrap();
    device.clear().unwrap();

    let gpu = device.textures.gpu_texture(target).unwrap();
    assert!(device.context().texture(gpu).unwrap().data.chunks_exact(4).all(|p| p == [0, 255, 0, 255]));

    let pixels = device.get_frame_buffer_pixels().unwrap();
    assert_eq!(pixels.data.len(), 4 * 4 * 4);
    assert_eq!(pixels.pixel(3, 3), Some([0, 255, 0, 255]));

    // destroying an attached texture detaches it
    device.destroy_texture(target).unwrap();
    let framebuffer = device.offscreen.unwrap().framebuffer;
    assert_eq!(device.context().framebuffer(framebuffer).unwrap().color_texture, None);
}

#[test]
fn test_copy_framebuffer_to_texture() {
    let mut device = created(HeadlessContext::new().with_surface_size(4, 4));
    device.set_clear_color(Color::new(1.0, 0.0, 0.0, 1.0)).unwrap();
    device.clear().unwrap();

    let texture = device.create_texture(&ImageData::solid_color(8, 8, [0, 0, 0, 255]), TextureCreateParams::default()).unwrap();
    device.copy_framebuffer_to_texture(texture, 2, 2, 0, 0, 4, 4).unwrap();

    let gpu = device.textures.gpu_texture(texture).unwrap();
    let stored = device.context().texture(gpu).unwrap();
    let at = |x: usize, y: usize| &stored.data[(y * 8 + x) * 4..(y * 8 + x) * 4 + 4];
    assert_eq!(at(2, 2), [255, 0, 0, 255]);
    assert_eq!(at(5, 5), [255, 0, 0, 255]);
    assert_eq!(at(0, 0), [0, 0, 0, 255]);

    assert!(device.copy_framebuffer_to_texture(texture, 6, 6, 0, 0, 4, 4).is_err());
}

// ---------------------------------------------------------------------
// Context loss
// ---------------------------------------------------------------------

#[test]
fn test_context_loss_is_fatal_and_sticky() {
    let mut device = in_scene();
    device.context_mut().lose_context();

    let err = device.draw_primitive(PrimitiveType::Triangles, &triangle(), Color::WHITE).unwrap_err();
    assert_eq!(err, DeviceError::ContextLost);
    assert!(err.is_fatal());
    assert_eq!(device.lifecycle(), DeviceLifecycle::Lost);

    assert_eq!(device.set_transform(TransformType::World, Mat4::identity()), Err(DeviceError::ContextLost));
    assert_eq!(device.end_scene(), Err(DeviceError::ContextLost));
    assert_eq!(device.create_texture(&checker(), TextureCreateParams::default()), Err(DeviceError::ContextLost));

    device.destroy().unwrap();
    assert_eq!(device.lifecycle(), DeviceLifecycle::Destroyed);
}

#[test]
fn test_debug_mode_detects_loss_at_end_scene() {
    let config = DeviceConfig::default().with_debug(true);
    let mut device = Device::new(HeadlessContext::new(), config);
    device.create().unwrap();
    device.begin_scene().unwrap();

    device.context_mut().lose_context();
    assert_eq!(device.end_scene(), Err(DeviceError::ContextLost));
    assert_eq!(device.lifecycle(), DeviceLifecycle::Lost);
}

#[test]
fn test_debug_mode_logs_non_fatal_errors() {
    let config = DeviceConfig::default().with_debug(true);
    let mut device = Device::new(HeadlessContext::new(), config);
    device.create().unwrap();
    device.begin_scene().unwrap();

    device.context_mut().inject_error(crate::render::api::ContextError::InvalidOperation("bad enum".into()));
    device.end_scene().unwrap();
    assert_eq!(device.lifecycle(), DeviceLifecycle::Created);
}
