//! Non-uniform scene: a sphere squashed by a pulsing XY scale next to a
//! slowly turning cube, under one warm point light. The opaque subtree
//! hangs below a shader-binding node, so every mesh draws with the
//! contextual G-buffer program.

use glam::{Mat4, Vec3};
use phaos::scene::{RotationAnimation, XYScaleAnimation, debug_overlay};
use phaos::*;
use std::cell::RefCell;
use std::rc::Rc;

struct NonUniformScene {
    root: Option<Box<dyn SceneNode>>,
    pulse: Option<XYScaleAnimation>,
    spin: Option<RotationAnimation>,
}

impl Scene for NonUniformScene {
    fn initialize(&mut self, gpu: &GpuContext, renderer: &Renderer) -> Result<(), RenderError> {
        let shaders = renderer.shaders();

        let pulse_transform = shared_mat4(Mat4::IDENTITY);
        self.pulse = Some(XYScaleAnimation::new(
            Rc::clone(&pulse_transform),
            0.6,
            1.4,
            1.5,
        ));

        let sphere = TransformNode::new(
            shared_mat4(Mat4::from_translation(Vec3::new(-1.5, 0.0, -8.0))),
            vec![Box::new(TransformNode::new(
                pulse_transform,
                vec![Box::new(MeshNode::new(
                    Renderable::new(
                        geometry::sphere_mesh(gpu, 24, 24),
                        shared_mat4(Mat4::from_scale(Vec3::splat(0.8))),
                        MaterialBuilder::new()
                            .with_diffuse_color(Vec3::new(0.8, 0.8, 1.0))
                            .with_specular_intensity(0.6)
                            .with_specular_power(12.0)
                            .build_shared(),
                        vec![],
                        shaders.geometry.clone(),
                        RenderQueue::Opaque,
                    ),
                    vec![],
                ))],
            ))],
        );

        let spin_transform = shared_mat4(Mat4::from_translation(Vec3::new(1.5, 0.0, -8.0)));
        self.spin = Some(RotationAnimation::new(Rc::clone(&spin_transform), 0.6));

        let cube = TransformNode::new(
            spin_transform,
            vec![Box::new(MeshNode::new(
                Renderable::new(
                    geometry::cube_mesh(gpu, 0.6),
                    shared_mat4(Mat4::IDENTITY),
                    MaterialBuilder::new()
                        .with_diffuse_color(Vec3::new(1.0, 0.85, 0.6))
                        .build_shared(),
                    vec![],
                    shaders.geometry.clone(),
                    RenderQueue::Opaque,
                ),
                vec![],
            ))],
        );

        // Every opaque mesh under this node draws with the contextual
        // G-buffer program, whatever its renderable declares.
        let opaque = ShaderBindingNode::new(
            shaders.geometry.clone(),
            vec![Box::new(sphere), Box::new(cube)],
        );

        let lamp = TransformNode::new(
            shared_mat4(Mat4::from_translation(Vec3::new(0.0, 1.5, -6.5))),
            vec![Box::new(LightNode::new(
                Rc::new(RefCell::new(LightVolume::point(
                    gpu,
                    shaders,
                    Vec3::new(1.0, 0.85, 0.5),
                    1.0,
                    5.0,
                ))),
                vec![],
            ))],
        );

        let world = CameraNode::new(
            Rc::new(RefCell::new(Camera::new())),
            vec![Box::new(opaque), Box::new(lamp)],
        );

        // A literal device texture in the corner, next to the symbolic
        // G-buffer panels: the renderer resolves both kinds of slot.
        let badge = MeshNode::new(
            Renderable::new(
                geometry::quad_mesh(gpu, 0.7, 0.95, 0.7, 0.95),
                shared_mat4(Mat4::IDENTITY),
                Material::default_ref(),
                vec![TextureRef::Device(checker_texture(gpu))],
                renderer.shaders().overlay.clone(),
                RenderQueue::Overlay,
            ),
            vec![],
        );
        let mut badge_camera = Camera::new();
        badge_camera.set_projection_orthographic(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        let badge = CameraNode::new(
            Rc::new(RefCell::new(badge_camera)),
            vec![Box::new(badge)],
        );

        self.root = Some(Box::new(GroupNode::new(vec![
            Box::new(PassBoundaryNode::geometry(vec![Box::new(
                PassBoundaryNode::light(vec![Box::new(world)]),
            )])),
            Box::new(PassBoundaryNode::overlay(vec![
                debug_overlay(gpu, renderer),
                Box::new(badge),
            ])),
        ])));
        Ok(())
    }

    fn graph_root(&self) -> &dyn SceneNode {
        self.root.as_deref().expect("scene not initialized")
    }

    fn update(&mut self, elapsed_ms: f32) {
        if let Some(pulse) = &mut self.pulse {
            pulse.update(elapsed_ms);
        }
        if let Some(spin) = &mut self.spin {
            spin.update(elapsed_ms);
        }
    }
}

fn checker_texture(gpu: &GpuContext) -> Rc<Texture> {
    const SIZE: u32 = 8;
    let mut pixels = Vec::with_capacity((SIZE * SIZE * 4) as usize);
    for y in 0..SIZE {
        for x in 0..SIZE {
            let value = if (x + y) % 2 == 0 { 230 } else { 40 };
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    Texture::from_rgba(gpu, &pixels, SIZE, SIZE, "Checker")
}

fn main() {
    env_logger::init();
    run_with_config(
        AppConfig::new().title("phaos — non-uniform scene"),
        Box::new(NonUniformScene {
            root: None,
            pulse: None,
            spin: None,
        }),
    );
}
