//! Basic deferred scene: a spinning cube and a specular sphere lit by one
//! directional light and two point lights, with the G-buffer debug overlay.

use glam::{Mat4, Quat, Vec3};
use phaos::scene::debug_overlay;
use phaos::*;
use std::cell::RefCell;
use std::f32::consts::PI;
use std::rc::Rc;

struct BasicScene {
    root: Option<Box<dyn SceneNode>>,
    cube_transform: SharedMat4,
    light2_transform: SharedMat4,
}

impl BasicScene {
    fn new() -> Self {
        Self {
            root: None,
            cube_transform: shared_mat4(Mat4::from_translation(Vec3::new(-0.5, 0.0, -10.0))),
            light2_transform: shared_mat4(Mat4::from_scale_rotation_translation(
                Vec3::new(1.0, 3.0, 2.0),
                Quat::IDENTITY,
                Vec3::new(1.5, 0.0, -9.0),
            )),
        }
    }
}

impl Scene for BasicScene {
    fn initialize(&mut self, gpu: &GpuContext, renderer: &Renderer) -> Result<(), RenderError> {
        let shaders = renderer.shaders();

        let cube = MeshNode::new(
            Renderable::new(
                geometry::cube_mesh(gpu, 0.5),
                Rc::clone(&self.cube_transform),
                Material::default_ref(),
                vec![],
                shaders.geometry.clone(),
                RenderQueue::Opaque,
            ),
            vec![],
        );

        let sphere = MeshNode::new(
            Renderable::new(
                geometry::sphere_mesh(gpu, 20, 20),
                shared_mat4(
                    Mat4::from_translation(Vec3::new(1.75, 0.0, -10.5))
                        * Mat4::from_scale(Vec3::splat(0.5)),
                ),
                MaterialBuilder::new()
                    .with_specular_intensity(0.8)
                    .with_specular_power(16.0)
                    .build_shared(),
                vec![],
                shaders.geometry.clone(),
                RenderQueue::Opaque,
            ),
            vec![],
        );

        let sun = LightNode::new(
            Rc::new(RefCell::new(LightVolume::directional(
                gpu,
                shaders,
                Vec3::ONE,
                Vec3::new(1.0, 0.0, -1.0),
                0.2,
                0.0,
            ))),
            vec![],
        );

        let red_light = TransformNode::new(
            shared_mat4(Mat4::from_translation(Vec3::new(0.0, 0.0, -9.0))),
            vec![Box::new(LightNode::new(
                Rc::new(RefCell::new(LightVolume::point(
                    gpu,
                    shaders,
                    Vec3::new(1.0, 0.0, 0.0),
                    1.0,
                    3.0,
                ))),
                vec![],
            ))],
        );

        let magenta_light = TransformNode::new(
            Rc::clone(&self.light2_transform),
            vec![Box::new(LightNode::new(
                Rc::new(RefCell::new(LightVolume::point(
                    gpu,
                    shaders,
                    Vec3::new(1.0, 0.0, 1.0),
                    1.0,
                    2.0,
                ))),
                vec![],
            ))],
        );

        let world = CameraNode::new(
            Rc::new(RefCell::new(Camera::new())),
            vec![
                Box::new(sphere),
                Box::new(cube),
                Box::new(sun),
                Box::new(red_light),
                Box::new(magenta_light),
            ],
        );

        self.root = Some(Box::new(GroupNode::new(vec![
            Box::new(PassBoundaryNode::geometry(vec![Box::new(
                PassBoundaryNode::light(vec![Box::new(world)]),
            )])),
            Box::new(PassBoundaryNode::overlay(vec![debug_overlay(
                gpu, renderer,
            )])),
        ])));
        Ok(())
    }

    fn graph_root(&self) -> &dyn SceneNode {
        self.root.as_deref().expect("scene not initialized")
    }

    fn update(&mut self, elapsed_ms: f32) {
        {
            let mut cube = self.cube_transform.borrow_mut();
            *cube = *cube
                * Mat4::from_rotation_x((PI / 7000.0) * elapsed_ms)
                * Mat4::from_rotation_y((PI / 3000.0) * elapsed_ms)
                * Mat4::from_rotation_z((PI / 13000.0) * elapsed_ms);
        }

        let rotation = Mat4::from_rotation_z((PI / 7000.0) * elapsed_ms);
        let mut light = self.light2_transform.borrow_mut();
        *light = rotation * *light;
    }
}

fn main() {
    env_logger::init();
    run_with_config(
        AppConfig::new().title("phaos — basic scene"),
        Box::new(BasicScene::new()),
    );
}
