//! Frame pipeline scenarios against the recording device

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::RendererConfig;
    use crate::foundation::collections::{MaterialId, NodeId};
    use crate::foundation::logging;
    use crate::foundation::math::{Quat, Transform, Vec3};
    use crate::scene::{Node, NodeKind, RenderObject, SceneError, SceneGraph};

    struct Fixture {
        renderer: FrameRenderer<RecordingDevice>,
        graph: SceneGraph,
        root: NodeId,
        resources: ResourceRegistry,
        camera: Camera,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with(RecordingDevice::new(), RendererConfig::default())
        }

        fn with(device: RecordingDevice, config: RendererConfig) -> Self {
            logging::init_for_tests();
            let mut graph = SceneGraph::new();
            let root = graph.add_node(Node::group("root"));
            Self {
                renderer: FrameRenderer::new(device, config).unwrap(),
                graph,
                root,
                resources: ResourceRegistry::new(),
                camera: Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0),
            }
        }

        fn mesh(&mut self, material: MaterialId, position: Vec3) -> NodeId {
            let geometry = self.resources.add_geometry(Geometry::plane(1.0, 1.0));
            self.mesh_with(RenderObject::new(geometry, material), position)
        }

        fn mesh_with(&mut self, object: RenderObject, position: Vec3) -> NodeId {
            self.graph
                .add_node_under(self.root, Node::mesh("mesh", object).with_position(position))
                .unwrap()
        }

        fn render(&mut self) -> FrameStats {
            self.renderer
                .render_frame(&mut self.graph, self.root, &self.resources, &self.camera)
                .unwrap()
        }

        fn device(&mut self) -> &mut RecordingDevice {
            self.renderer.device_mut()
        }

        fn count(&self, pred: impl Fn(&DeviceCommand) -> bool) -> usize {
            self.renderer.device().count(pred)
        }
    }

    fn is_compile(c: &DeviceCommand) -> bool {
        matches!(c, DeviceCommand::CompileProgram { .. })
    }

    fn is_upload(block: UniformBlock) -> impl Fn(&DeviceCommand) -> bool {
        move |c| matches!(c, DeviceCommand::UploadUniforms { block: b, .. } if *b == block)
    }

    #[test]
    fn test_shared_material_yields_one_program_used_three_times() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 0.0, 0.0)));
        let nodes: Vec<NodeId> = (0..3)
            .map(|i| f.mesh(material, Vec3::new(i as f32 - 1.0, 0.0, 0.0)))
            .collect();

        let stats = f.render();

        assert_eq!(stats.draws, 3);
        assert_eq!(f.renderer.programs().len(), 1);
        let program = f.renderer.binder().program_for(nodes[0], material).unwrap();
        assert_eq!(f.renderer.programs().usage(program), 3);
        assert_eq!(f.count(is_compile), 1);
    }

    #[test]
    fn test_feature_identical_materials_share_a_program() {
        let mut f = Fixture::new();
        let red = f.resources.add_material(Material::basic(Vec3::new(1.0, 0.0, 0.0)));
        let blue = f.resources.add_material(Material::basic(Vec3::new(0.0, 0.0, 1.0)).with_opacity(0.9));
        let a = f.mesh(red, Vec3::new(-1.0, 0.0, 0.0));
        let b = f.mesh(blue, Vec3::new(1.0, 0.0, 0.0));

        f.render();

        assert_eq!(f.renderer.programs().len(), 1);
        assert_eq!(
            f.renderer.binder().program_for(a, red),
            f.renderer.binder().program_for(b, blue)
        );
    }

    #[test]
    fn test_texture_toggle_releases_old_program_once() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let a = f.mesh(material, Vec3::new(-1.0, 0.0, 0.0));
        f.mesh(material, Vec3::new(1.0, 0.0, 0.0));
        f.render();
        let old = f.renderer.binder().program_for(a, material).unwrap();

        f.resources
            .material_mut(material)
            .unwrap()
            .set_map(MapSlot::Map, Some(TextureId(5)));
        f.device().clear_commands();
        let stats = f.render();

        assert_eq!(stats.draws, 2);
        assert_eq!(f.count(is_compile), 1);
        assert_eq!(f.count(|c| matches!(c, DeviceCommand::DeleteProgram(_))), 1);
        assert_eq!(f.renderer.programs().len(), 1);
        assert!(f.renderer.programs().get(old).is_none());

        let new = f.renderer.binder().program_for(a, material).unwrap();
        assert_eq!(f.renderer.programs().usage(new), 2);
    }

    #[test]
    fn test_texture_toggle_reuses_matching_program() {
        let mut f = Fixture::new();
        let textured = f
            .resources
            .add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)).with_map(MapSlot::Map, TextureId(1)));
        let plain = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let a = f.mesh(textured, Vec3::new(-1.0, 0.0, 0.0));
        let b = f.mesh(plain, Vec3::new(1.0, 0.0, 0.0));
        f.render();
        assert_eq!(f.renderer.programs().len(), 2);

        f.resources
            .material_mut(plain)
            .unwrap()
            .set_map(MapSlot::Map, Some(TextureId(2)));
        f.device().clear_commands();
        f.render();

        assert_eq!(f.count(is_compile), 0);
        assert_eq!(f.renderer.programs().len(), 1);
        assert_eq!(
            f.renderer.binder().program_for(a, textured),
            f.renderer.binder().program_for(b, plain)
        );
    }

    #[test]
    fn test_parameter_change_does_not_recompile() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        f.mesh(material, Vec3::zeros());
        f.render();

        f.resources.material_mut(material).unwrap().params_mut().color = Vec3::new(0.0, 1.0, 0.0);
        f.device().clear_commands();
        f.render();

        assert_eq!(f.count(is_compile), 0);
        assert_eq!(f.count(is_upload(UniformBlock::Material)), 1);
    }

    fn bound_key(f: &Fixture, node: NodeId, material: MaterialId) -> String {
        let program = f.renderer.binder().program_for(node, material).unwrap();
        f.renderer.programs().get(program).unwrap().key().as_str().to_string()
    }

    fn render_object_mut(f: &mut Fixture, node: NodeId) -> &mut RenderObject {
        match &mut f.graph.node_mut(node).unwrap().kind {
            NodeKind::Mesh(object) => object,
            _ => panic!("not a mesh node"),
        }
    }

    #[test]
    fn test_enabling_instancing_reselects_the_program() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let node = f.mesh(material, Vec3::zeros());
        f.render();
        assert!(!bound_key(&f, node, material).contains("USE_INSTANCING"));

        render_object_mut(&mut f, node).instance_count = 4;
        let stats = f.render();

        assert!(bound_key(&f, node, material).contains("USE_INSTANCING"));
        // The plane has no per-instance matrix attribute
        assert_eq!(stats.skipped_missing_attribute, 1);
        assert_eq!(stats.draws, 0);
        assert_eq!(f.renderer.programs().len(), 1);
    }

    #[test]
    fn test_swapping_geometry_with_equal_version_reselects_the_program() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));

        let mut still = Geometry::plane(1.0, 1.0);
        still.set_attribute(attributes::COLOR, VertexAttribute::new([1.0; 12].to_vec(), 3));
        let mut morphing = Geometry::plane(1.0, 1.0);
        morphing.add_morph_target(VertexAttribute::new([0.0; 12].to_vec(), 3));
        assert_eq!(still.version(), morphing.version());

        let still = f.resources.add_geometry(still);
        let morphing = f.resources.add_geometry(morphing);
        let node = f.mesh_with(RenderObject::new(still, material), Vec3::zeros());
        f.render();
        assert!(!bound_key(&f, node, material).contains("USE_MORPHTARGETS"));

        render_object_mut(&mut f, node).geometry = morphing;
        let stats = f.render();

        assert_eq!(stats.draws, 1);
        assert!(bound_key(&f, node, material).contains("USE_MORPHTARGETS"));
        assert_eq!(f.renderer.programs().len(), 1);
    }

    #[test]
    fn test_reassigned_material_releases_the_old_program() {
        let mut f = Fixture::new();
        let basic = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let normal = f.resources.add_material(Material::new(ShadingModel::Normal));
        let node = f.mesh(basic, Vec3::zeros());
        f.render();
        let old = f.renderer.binder().program_for(node, basic).unwrap();

        render_object_mut(&mut f, node).materials = vec![normal];
        for _ in 0..3 {
            f.render();
        }

        assert!(f.renderer.binder().program_for(node, basic).is_none());
        assert!(f.renderer.programs().get(old).is_none());
        assert_eq!(f.renderer.programs().len(), 1);
        assert_eq!(f.renderer.binder().binding_count(), 1);
        assert_eq!(f.renderer.device().live_program_count(), 1);
        assert_eq!(f.renderer.programs().usage(f.renderer.binder().program_for(node, normal).unwrap()), 1);
    }

    #[test]
    fn test_dispose_and_removal_release_programs() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let a = f.mesh(material, Vec3::new(-1.0, 0.0, 0.0));
        let b = f.mesh(material, Vec3::new(1.0, 0.0, 0.0));
        f.render();
        let program = f.renderer.binder().program_for(a, material).unwrap();

        f.graph.remove(a, false).unwrap();
        f.renderer.dispose_object(a);
        assert_eq!(f.renderer.programs().usage(program), 1);

        f.graph.remove(b, false).unwrap();
        f.render();
        assert!(f.renderer.programs().is_empty());
        assert_eq!(f.renderer.device().live_program_count(), 0);
    }

    #[test]
    fn test_dispose_material_releases_every_binding() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        f.mesh(material, Vec3::new(-1.0, 0.0, 0.0));
        f.mesh(material, Vec3::new(1.0, 0.0, 0.0));
        f.render();

        assert!(f.renderer.dispose_material(&mut f.resources, material).is_some());
        assert!(f.renderer.programs().is_empty());
        assert_eq!(f.renderer.binder().binding_count(), 0);

        let stats = f.render();
        assert_eq!(stats.draws, 0);
    }

    #[test]
    fn test_compile_failure_skips_object_and_is_not_retried() {
        let mut f = Fixture::with(RecordingDevice::new().with_failing_define("USE_MAP"), RendererConfig::default());
        let broken = f
            .resources
            .add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)).with_map(MapSlot::Map, TextureId(1)));
        let plain = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        f.mesh(broken, Vec3::new(-1.0, 0.0, 0.0));
        f.mesh(plain, Vec3::new(1.0, 0.0, 0.0));

        let first = f.render();
        assert_eq!(first.draws, 1);
        assert_eq!(first.skipped_compile, 1);
        assert_eq!(f.renderer.device().compile_count(), 2);

        let second = f.render();
        assert_eq!(second.draws, 1);
        assert_eq!(second.skipped_compile, 1);
        assert_eq!(f.renderer.device().compile_count(), 2);
    }

    #[test]
    fn test_missing_attribute_skips_only_that_draw() {
        let mut f = Fixture::new();
        let colored = f
            .resources
            .add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)).with_vertex_colors(true));
        let plain = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        f.mesh(colored, Vec3::new(-1.0, 0.0, 0.0));
        f.mesh(plain, Vec3::new(1.0, 0.0, 0.0));

        let stats = f.render();

        assert_eq!(stats.skipped_missing_attribute, 1);
        assert_eq!(stats.draws, 1);
    }

    #[test]
    fn test_pending_programs_are_deferred_to_a_later_frame() {
        let mut f = Fixture::with(RecordingDevice::new().with_deferred_compilation(), RendererConfig::default());
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        f.mesh(material, Vec3::zeros());

        let first = f.render();
        assert_eq!(first.draws, 0);
        assert_eq!(first.skipped_not_ready, 1);

        f.device().mark_all_ready();
        let second = f.render();
        assert_eq!(second.draws, 1);
        assert_eq!(f.renderer.device().compile_count(), 1);
    }

    #[test]
    fn test_cancelled_frame_stops_between_buckets() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        f.mesh(material, Vec3::zeros());

        let cancel = f.renderer.cancel_handle();
        cancel.cancel();
        let stats = f.render();

        assert!(stats.cancelled);
        assert_eq!(stats.draws, 0);
        assert!(!cancel.is_cancelled());
        assert_eq!(f.renderer.phase(), FramePhase::Idle);
        assert!(f.renderer.gpu_state().issued() > 0);

        let next = f.render();
        assert!(!next.cancelled);
        assert_eq!(next.draws, 1);
    }

    #[test]
    fn test_transmission_prepass_excludes_transmissive_objects() {
        let mut f = Fixture::new();
        let opaque = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let glass = f.resources.add_material(Material::physical(Vec3::new(1.0, 1.0, 1.0), 0.8));
        f.mesh(opaque, Vec3::new(0.0, 0.0, -2.0));
        f.mesh(glass, Vec3::zeros());
        f.mesh(glass, Vec3::new(1.0, 0.0, 1.0));

        let stats = f.render();
        assert!(stats.transmission_pass);
        assert_eq!(stats.transmissive, 2);
        // opaque, opaque again in the pre-pass, two glass
        assert_eq!(stats.draws, 4);

        let commands = f.renderer.device().commands().to_vec();
        let target = commands
            .iter()
            .find_map(|c| match c {
                DeviceCommand::CreateRenderTarget { target, .. } => Some(*target),
                _ => None,
            })
            .unwrap();
        let enter = commands
            .iter()
            .position(|c| *c == DeviceCommand::SetRenderTarget(Some(target)))
            .unwrap();
        let leave = enter
            + commands[enter..]
                .iter()
                .position(|c| *c == DeviceCommand::SetRenderTarget(None))
                .unwrap();

        let draws_in_prepass = commands[enter..leave]
            .iter()
            .filter(|c| matches!(c, DeviceCommand::Draw(_)))
            .count();
        assert_eq!(draws_in_prepass, 1);

        let texture = f.renderer.device().render_target_texture(target);
        let bound = commands[leave..]
            .iter()
            .position(|c| matches!(c, DeviceCommand::BindTexture { texture: t, .. } if *t == texture))
            .unwrap();
        let next_draw = commands[leave..]
            .iter()
            .position(|c| matches!(c, DeviceCommand::Draw(_)))
            .unwrap();
        assert!(bound < next_draw);
    }

    #[test]
    fn test_transmission_target_is_created_once() {
        let mut f = Fixture::new();
        let glass = f.resources.add_material(Material::physical(Vec3::new(1.0, 1.0, 1.0), 0.5));
        f.mesh(glass, Vec3::zeros());

        f.render();
        f.render();

        assert_eq!(f.count(|c| matches!(c, DeviceCommand::CreateRenderTarget { .. })), 1);
    }

    #[test]
    fn test_redundant_state_is_elided_across_draws() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let geometry = f.resources.add_geometry(Geometry::plane(1.0, 1.0));
        f.mesh_with(RenderObject::new(geometry, material), Vec3::new(-1.0, 0.0, 0.0));
        f.mesh_with(RenderObject::new(geometry, material), Vec3::new(1.0, 0.0, 0.0));

        let stats = f.render();

        assert_eq!(stats.draws, 2);
        assert_eq!(stats.program_switches, 1);
        assert_eq!(f.count(|c| matches!(c, DeviceCommand::UseProgram(_))), 1);
        assert_eq!(f.count(|c| matches!(c, DeviceCommand::SetBlending(_))), 1);
        assert_eq!(f.count(|c| matches!(c, DeviceCommand::BindVertexBuffer { .. })), 1);
        assert_eq!(f.count(|c| matches!(c, DeviceCommand::BindIndexBuffer(_))), 1);
        assert!(stats.state_changes_elided > 0);

        f.device().clear_commands();
        let steady = f.render();
        assert_eq!(steady.program_switches, 0);
        assert_eq!(f.count(|c| matches!(c, DeviceCommand::SetDepthTest(_))), 0);
        assert_eq!(f.count(|c| matches!(c, DeviceCommand::CreateBuffer { .. })), 0);
    }

    #[test]
    fn test_object_uniforms_follow_each_draw() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let a = f.mesh(material, Vec3::new(-1.0, 0.0, 0.0));
        let b = f.mesh(material, Vec3::new(1.0, 0.0, 0.0));

        f.render();

        let objects: Vec<Vec<u8>> = f
            .renderer
            .device()
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::UploadUniforms { block: UniformBlock::Object, data } => Some(data.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(objects.len(), 2);
        assert_ne!(objects[0], objects[1]);

        let view = f.camera.view_matrix();
        let expected: Vec<Vec<u8>> = [a, b]
            .iter()
            .map(|id| {
                let world = f.graph.world_matrix(*id).unwrap();
                bytemuck::bytes_of(&ObjectUniforms::new(world, &view)).to_vec()
            })
            .collect();
        assert!(expected.contains(&objects[0]));
        assert!(expected.contains(&objects[1]));

        assert_eq!(f.count(is_upload(UniformBlock::Material)), 1);
        assert_eq!(f.count(is_upload(UniformBlock::Camera)), 1);
    }

    #[test]
    fn test_light_data_change_uploads_without_recompiling() {
        let mut f = Fixture::new();
        let material = f
            .resources
            .add_material(Material::standard(Vec3::new(1.0, 1.0, 1.0), 0.5, 0.0));
        f.mesh(material, Vec3::zeros());
        let sun = f
            .graph
            .add_node_under(f.root, Node::light("sun", Light::directional(Vec3::new(1.0, 1.0, 1.0), 1.0)))
            .unwrap();

        f.render();
        assert_eq!(f.count(is_compile), 1);
        assert_eq!(f.count(is_upload(UniformBlock::Lights)), 1);

        f.graph.node_mut(sun).unwrap().kind = NodeKind::Light(Light::directional(Vec3::new(1.0, 0.5, 0.5), 2.0));
        f.device().clear_commands();
        let stats = f.render();
        assert_eq!(f.count(is_compile), 0);
        assert_eq!(stats.uploads.lights, 1);

        f.device().clear_commands();
        let steady = f.render();
        assert_eq!(steady.uploads.lights, 0);

        f.graph
            .add_node_under(f.root, Node::light("lamp", Light::point(Vec3::new(1.0, 1.0, 1.0), 1.0, 10.0)))
            .unwrap();
        f.device().clear_commands();
        f.render();
        assert_eq!(f.count(is_compile), 1);
    }

    #[test]
    fn test_unlit_materials_ignore_light_changes() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        f.mesh(material, Vec3::zeros());
        f.render();

        f.graph
            .add_node_under(f.root, Node::light("lamp", Light::point(Vec3::new(1.0, 1.0, 1.0), 1.0, 10.0)))
            .unwrap();
        f.device().clear_commands();
        let stats = f.render();

        assert_eq!(f.count(is_compile), 0);
        assert_eq!(stats.uploads.lights, 0);
    }

    #[test]
    fn test_mirrored_objects_flip_front_face() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let geometry = f.resources.add_geometry(Geometry::plane(1.0, 1.0));
        let mirrored = Transform::new(Vec3::zeros(), Quat::identity(), Vec3::new(-1.0, 1.0, 1.0));
        f.graph
            .add_node_under(
                f.root,
                Node::mesh("mirror", RenderObject::new(geometry, material)).with_transform(mirrored),
            )
            .unwrap();

        f.render();

        assert_eq!(f.count(|c| *c == DeviceCommand::SetFrontFace(FrontFace::Clockwise)), 1);
    }

    #[test]
    fn test_program_budget_skips_new_programs() {
        let mut f = Fixture::with(RecordingDevice::new(), RendererConfig::new().with_max_programs(1));
        let plain = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let textured = f
            .resources
            .add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)).with_map(MapSlot::Map, TextureId(1)));
        f.mesh(plain, Vec3::new(-1.0, 0.0, 0.0));
        f.mesh(textured, Vec3::new(1.0, 0.0, 0.0));

        let stats = f.render();

        assert_eq!(stats.draws, 1);
        assert_eq!(stats.skipped_resource, 1);
        assert_eq!(f.renderer.programs().len(), 1);
    }

    #[test]
    fn test_texture_unit_budget_skips_draw() {
        let mut f = Fixture::with(RecordingDevice::new().with_max_texture_units(1), RendererConfig::default());
        let material = f.resources.add_material(
            Material::standard(Vec3::new(1.0, 1.0, 1.0), 0.5, 0.0)
                .with_map(MapSlot::Map, TextureId(1))
                .with_map(MapSlot::RoughnessMap, TextureId(2)),
        );
        f.mesh(material, Vec3::zeros());

        let stats = f.render();

        assert_eq!(stats.skipped_resource, 1);
        assert_eq!(stats.draws, 0);
    }

    #[test]
    fn test_objects_behind_camera_are_culled() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        f.mesh(material, Vec3::zeros());
        f.mesh(material, Vec3::new(0.0, 0.0, 20.0));

        let stats = f.render();

        assert_eq!(stats.culled, 1);
        assert_eq!(stats.draws, 1);
    }

    #[test]
    fn test_geometry_edit_reuploads_buffers() {
        let mut f = Fixture::new();
        let material = f.resources.add_material(Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let geometry = f.resources.add_geometry(Geometry::plane(1.0, 1.0));
        f.mesh_with(RenderObject::new(geometry, material), Vec3::zeros());
        f.render();

        f.resources
            .geometry_mut(geometry)
            .unwrap()
            .set_attribute("position", VertexAttribute::from_vec3(&[
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ]));
        f.device().clear_commands();
        let stats = f.render();

        assert!(stats.buffer_uploads > 0);
        assert!(f.count(|c| matches!(c, DeviceCommand::DeleteBuffer(_))) > 0);
        assert_eq!(stats.draws, 1);
    }

    #[test]
    fn test_stale_root_is_reported() {
        let mut f = Fixture::new();
        let stale = f.graph.add_node(Node::group("gone"));
        f.graph.remove(stale, false).unwrap();

        let err = f
            .renderer
            .render_frame(&mut f.graph, stale, &f.resources, &f.camera)
            .unwrap_err();

        assert_eq!(err, RenderError::Scene(SceneError::NodeNotFound(stale)));
        assert_eq!(f.renderer.phase(), FramePhase::Idle);
    }
}
