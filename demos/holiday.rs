//! Holiday scene: pyramid trees on a snowy ground under dim moonlight,
//! with colored point lights drifting between the trees and flickering
//! like fairy lights.

use glam::{Mat4, Vec3};
use phaos::scene::{
    BoundedTranslationAnimation, LightIntensityAnimation, debug_overlay,
};
use phaos::*;
use std::cell::RefCell;
use std::rc::Rc;

const TREE_POSITIONS: [[f32; 3]; 5] = [
    [-4.0, 0.0, -2.0],
    [-1.5, 0.0, -4.0],
    [1.0, 0.0, -1.0],
    [3.5, 0.0, -3.5],
    [5.0, 0.0, 0.5],
];

const FAIRY_LIGHTS: [([f32; 3], [f32; 3], f32); 4] = [
    ([1.0, 0.1, 0.1], [-3.0, 1.5, -2.0], 0.0),
    ([0.1, 1.0, 0.1], [0.0, 2.5, -3.0], 0.25),
    ([0.2, 0.4, 1.0], [2.0, 1.0, -1.5], 0.5),
    ([1.0, 0.9, 0.2], [4.0, 2.0, -2.5], 0.75),
];

struct HolidayScene {
    root: Option<Box<dyn SceneNode>>,
    drifts: Vec<BoundedTranslationAnimation>,
    flickers: Vec<LightIntensityAnimation>,
}

impl HolidayScene {
    fn new() -> Self {
        Self {
            root: None,
            drifts: Vec::new(),
            flickers: Vec::new(),
        }
    }
}

impl Scene for HolidayScene {
    fn initialize(&mut self, gpu: &GpuContext, renderer: &Renderer) -> Result<(), RenderError> {
        let shaders = renderer.shaders();

        let snow = MaterialBuilder::new()
            .with_diffuse_color(Vec3::new(0.9, 0.9, 0.95))
            .with_specular_intensity(0.3)
            .with_specular_power(4.0)
            .build_shared();
        let fir = MaterialBuilder::new()
            .with_diffuse_color(Vec3::new(0.05, 0.35, 0.1))
            .build_shared();

        let ground = MeshNode::new(
            Renderable::new(
                geometry::cube_mesh(gpu, 0.5),
                shared_mat4(
                    Mat4::from_translation(Vec3::new(0.0, -0.25, -1.5))
                        * Mat4::from_scale(Vec3::new(24.0, 0.5, 16.0)),
                ),
                snow,
                vec![],
                shaders.geometry.clone(),
                RenderQueue::Opaque,
            ),
            vec![],
        );

        let tree_mesh = geometry::pyramid_mesh(gpu, 0.8, 2.2);
        let mut world_children: Vec<Box<dyn SceneNode>> = vec![Box::new(ground)];
        for position in TREE_POSITIONS {
            world_children.push(Box::new(MeshNode::new(
                Renderable::new(
                    Rc::clone(&tree_mesh),
                    shared_mat4(Mat4::from_translation(Vec3::from(position))),
                    Rc::clone(&fir),
                    vec![],
                    shaders.geometry.clone(),
                    RenderQueue::Opaque,
                ),
                vec![],
            )));
        }

        // Dim, slightly blue moonlight with a whisper of ambient so the
        // unlit side of the trees stays readable.
        world_children.push(Box::new(LightNode::new(
            Rc::new(RefCell::new(LightVolume::directional(
                gpu,
                shaders,
                Vec3::new(0.6, 0.7, 1.0),
                Vec3::new(-0.3, -1.0, -0.4),
                0.15,
                0.03,
            ))),
            vec![],
        )));

        for (color, position, phase) in FAIRY_LIGHTS {
            let transform = shared_mat4(Mat4::from_translation(Vec3::from(position)));
            let volume = Rc::new(RefCell::new(LightVolume::point(
                gpu,
                shaders,
                Vec3::from(color),
                1.2,
                4.0,
            )));

            self.drifts.push(BoundedTranslationAnimation::new(
                Rc::clone(&transform),
                -6.0,
                6.0,
                3.5,
                0.5,
                Vec3::from(position),
                Vec3::new(1.1 - phase, 0.4 + phase, 0.0),
            ));
            self.flickers
                .push(LightIntensityAnimation::new(Rc::clone(&volume), 0.5, phase));

            world_children.push(Box::new(TransformNode::new(
                transform,
                vec![Box::new(LightNode::new(volume, vec![]))],
            )));
        }

        let mut camera = Camera::new();
        camera.set_look_at(Vec3::new(0.0, 3.0, 9.0), Vec3::new(0.0, 0.5, -2.0), Vec3::Y);
        let world = CameraNode::new(Rc::new(RefCell::new(camera)), world_children);

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
        for drift in &mut self.drifts {
            drift.update(elapsed_ms);
        }
        for flicker in &mut self.flickers {
            flicker.update(elapsed_ms);
        }
    }
}

fn main() {
    env_logger::init();
    run_with_config(
        AppConfig::new().title("phaos — holiday scene"),
        Box::new(HolidayScene::new()),
    );
}
