mod common;

use common::FbxBuilder;
use fbxdemo::animation::Animation;
use fbxdemo::fbx::{AttributeKind, FbxTime, SkeletonKind};
use fbxdemo::model::dump::node_tree_json;
use fbxdemo::model::{ImportArgs, MAX_BONES, MAX_INFLUENCES, Scene, SceneMesh, UNASSIGNED_BONE};
use std::path::{Path, PathBuf};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn no_conversion() -> ImportArgs {
    ImportArgs {
        flip_uvs: false,
        invert_z_scale: false,
        invert_winding_order: false,
    }
}

fn triangle(b: &mut FbxBuilder) -> i64 {
    let model = b.model("Tri", "Mesh", 0, [0.0; 3]);
    b.geometry(
        model,
        &[[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]],
        &[0, 1, !2],
        Some(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
    );
    model
}

fn import(b: &FbxBuilder, args: &ImportArgs) -> Scene {
    Scene::from_document(&b.document(), "test", Path::new("assets"), args)
}

fn static_mesh(scene: &Scene, index: usize) -> &fbxdemo::model::MeshData {
    match &scene.meshes[index] {
        SceneMesh::Static(m) => m,
        SceneMesh::Skinned(m) => panic!("'{}' imported as skinned", m.name),
    }
}

#[test]
fn default_args_flip_uvs_and_mirror_z() {
    let mut b = FbxBuilder::new();
    triangle(&mut b);
    let scene = import(&b, &ImportArgs::default());

    assert_eq!(scene.meshes.len(), 1);
    let mesh = static_mesh(&scene, 0);
    assert_eq!(mesh.name, "Tri");
    assert_eq!(mesh.indices, vec![0, 1, 2]);
    assert_eq!(mesh.vertices[1].position, [1.0, 0.0, -1.0]);
    assert_eq!(mesh.vertices[0].uv, [0.0, 1.0]);
    assert_eq!(mesh.vertices[2].uv, [0.0, 0.0]);
}

#[test]
fn winding_can_be_inverted() {
    let mut b = FbxBuilder::new();
    triangle(&mut b);
    let args = ImportArgs {
        invert_winding_order: true,
        ..no_conversion()
    };
    let scene = import(&b, &args);
    let mesh = static_mesh(&scene, 0);
    assert_eq!(mesh.indices, vec![0, 2, 1]);
    assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 1.0]);
}

#[test]
fn quads_are_fan_triangulated() {
    let mut b = FbxBuilder::new();
    let model = b.model("Quad", "Mesh", 0, [0.0; 3]);
    b.geometry(
        model,
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        &[0, 1, 2, !3],
        None,
    );
    let scene = import(&b, &no_conversion());
    let mesh = static_mesh(&scene, 0);
    assert_eq!(mesh.vertices.len(), 4);
    assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
}

#[test]
fn missing_normals_and_tangents_are_generated() {
    let mut b = FbxBuilder::new();
    triangle(&mut b);
    let scene = import(&b, &no_conversion());
    let mesh = static_mesh(&scene, 0);
    for v in &mesh.vertices {
        assert!(approx(v.normal[2], 1.0), "{:?}", v.normal);
        let dot: f32 = v.normal.iter().zip(&v.tangent).map(|(a, b)| a * b).sum();
        assert!(dot.abs() < EPSILON);
        assert!(approx(v.tangent[0], 1.0), "{:?}", v.tangent);
    }
}

#[test]
fn generated_normals_follow_z_mirror() {
    let mut b = FbxBuilder::new();
    triangle(&mut b);
    let scene = import(&b, &ImportArgs::default());
    let mesh = static_mesh(&scene, 0);
    assert!(approx(mesh.vertices[0].normal[2], -1.0));
}

#[test]
fn unmaterialed_mesh_gets_default_material() {
    let mut b = FbxBuilder::new();
    triangle(&mut b);
    let scene = import(&b, &no_conversion());
    let material = scene.meshes[0].material();
    assert_eq!(material.colour, [1.0; 3]);
    assert_eq!(material.specular_colour, [4.0; 3]);
    assert!(scene.texture_paths().is_empty());
}

#[test]
fn joints_take_their_global_bind_position() {
    let mut b = FbxBuilder::new();
    let hips = b.joint("Hips", 0, [0.0, 1.0, 0.0]);
    let spine = b.joint("Spine", hips, [0.0, 2.0, 0.0]);
    b.joint("Head", spine, [0.5, 1.0, 0.0]);
    let scene = import(&b, &no_conversion());

    let skeleton = scene.skeleton.as_ref().expect("skeleton");
    assert_eq!(skeleton.count(), 3);
    let head = skeleton.find("Head").expect("head joint");
    let joint = skeleton.joint(head);
    assert!(approx(joint.position.x, 0.5));
    assert!(approx(joint.position.y, 4.0));
    assert_eq!(joint.parent, skeleton.find("Spine"));
    assert!(!scene.is_animated());
}

#[test]
fn root_skeleton_nodes_are_skipped() {
    let mut b = FbxBuilder::new();
    let reference = b.model("Reference", "Root", 0, [0.0, 0.0, 3.0]);
    b.joint("Hips", reference, [0.0, 1.0, 0.0]);

    let doc = b.document();
    let reference = doc.object(reference).expect("reference");
    assert_eq!(doc.attribute(reference), AttributeKind::Skeleton(SkeletonKind::Root));

    let scene = import(&b, &no_conversion());
    let skeleton = scene.skeleton.as_ref().expect("skeleton");
    assert_eq!(skeleton.count(), 1);
    let hips = skeleton.joint(skeleton.roots()[0]);
    assert_eq!(hips.name, "Hips");
    assert_eq!(hips.parent, None);
    assert!(approx(hips.position.z, 3.0));
}

#[test]
fn clusters_bind_by_link_or_by_name() {
    let mut b = FbxBuilder::new();
    let hips = b.joint("Hips", 0, [0.0; 3]);
    let spine = b.joint("Spine", hips, [0.0, 1.0, 0.0]);
    let model = b.model("Body", "Mesh", 0, [0.0; 3]);
    let geometry = b.geometry(
        model,
        &[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        &[0, 1, !2],
        None,
    );
    let skin = b.skin(geometry, "Linear");
    b.cluster(skin, "hips", None, &[0, 1], &[1.0, 0.25]);
    b.cluster(skin, "Cluster 2", Some(spine), &[1, 2], &[0.75, 1.0]);

    let scene = import(&b, &no_conversion());
    let SceneMesh::Skinned(mesh) = &scene.meshes[0] else {
        panic!("mesh was not skinned");
    };
    let skeleton = scene.skeleton.as_ref().expect("skeleton");
    assert_eq!(
        mesh.cluster_joints,
        vec![skeleton.find("Hips"), skeleton.find("Spine")]
    );
    assert_eq!(skeleton.joint(skeleton.find("Spine").unwrap()).cluster_index, Some(1));
    assert!(!mesh.mirror_z);

    assert_eq!(mesh.vertices[0].bone_ids, [0, UNASSIGNED_BONE, UNASSIGNED_BONE, UNASSIGNED_BONE]);
    assert_eq!(mesh.vertices[1].bone_ids[..2], [0, 1]);
    assert_eq!(mesh.vertices[1].bone_weights[..2], [0.25, 0.75]);
    assert_eq!(mesh.vertices[2].bone_ids[0], 1);
    assert_eq!(mesh.bone_palette(skeleton).len(), 2);
}

#[test]
fn influences_are_capped_per_control_point() {
    let mut b = FbxBuilder::new();
    let joints: Vec<i64> = (0..MAX_INFLUENCES + 1)
        .map(|i| b.joint(&format!("Bone{i}"), 0, [i as f64, 0.0, 0.0]))
        .collect();
    let model = b.model("Body", "Mesh", 0, [0.0; 3]);
    let geometry = b.geometry(
        model,
        &[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        &[0, 1, !2],
        None,
    );
    let skin = b.skin(geometry, "Linear");
    for (i, &joint) in joints.iter().enumerate() {
        b.cluster(skin, &format!("Cluster{i}"), Some(joint), &[0], &[0.1]);
    }

    let scene = import(&b, &no_conversion());
    let SceneMesh::Skinned(mesh) = &scene.meshes[0] else {
        panic!("mesh was not skinned");
    };
    assert_eq!(mesh.cluster_joints.len(), MAX_INFLUENCES + 1);
    let v = &mesh.vertices[0];
    assert_eq!(v.bone_ids, [0, 1, 2, 3]);
    assert_eq!(v.bone_ids2, [4, 5, 6, 7]);
    assert!(v.bone_weights2.iter().all(|&w| approx(w, 0.1)));
}

#[test]
fn mesh_without_skeleton_stays_static_despite_skin() {
    let mut b = FbxBuilder::new();
    let model = b.model("Body", "Mesh", 0, [0.0; 3]);
    let geometry = b.geometry(model, &[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], &[0, 1, !2], None);
    let skin = b.skin(geometry, "Linear");
    b.cluster(skin, "Hips", None, &[0], &[1.0]);

    let scene = import(&b, &no_conversion());
    assert!(matches!(scene.meshes[0], SceneMesh::Static(_)));
}

#[test]
fn non_linear_skins_import_as_static() {
    for skinning_type in ["DualQuaternion", "Rigid", "Blend"] {
        let mut b = FbxBuilder::new();
        let hips = b.joint("Hips", 0, [0.0; 3]);
        let model = b.model("Body", "Mesh", 0, [0.0; 3]);
        let geometry = b.geometry(model, &[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], &[0, 1, !2], None);
        let skin = b.skin(geometry, skinning_type);
        b.cluster(skin, "Hips", Some(hips), &[0, 1, 2], &[1.0, 1.0, 1.0]);

        let scene = import(&b, &no_conversion());
        assert!(
            matches!(scene.meshes[0], SceneMesh::Static(_)),
            "{skinning_type} skin was imported as skinned"
        );
        assert_eq!(static_mesh(&scene, 0).vertices.len(), 3);
    }
}

#[test]
fn clusters_past_the_bone_palette_are_ignored() {
    let mut b = FbxBuilder::new();
    let joints: Vec<i64> = (0..=MAX_BONES)
        .map(|i| b.joint(&format!("Bone{i}"), 0, [i as f64, 0.0, 0.0]))
        .collect();
    let model = b.model("Body", "Mesh", 0, [0.0; 3]);
    let geometry = b.geometry(
        model,
        &[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        &[0, 1, !2],
        None,
    );
    let skin = b.skin(geometry, "Linear");
    for (i, &joint) in joints.iter().enumerate() {
        let (indexes, weights) = match i {
            0 => (vec![0, 1], vec![1.0, 1.0]),
            i if i == MAX_BONES => (vec![2], vec![1.0]),
            _ => (vec![], vec![]),
        };
        b.cluster(skin, &format!("Cluster{i}"), Some(joint), &indexes, &weights);
    }

    let scene = import(&b, &no_conversion());
    let SceneMesh::Skinned(mesh) = &scene.meshes[0] else {
        panic!("mesh was not skinned");
    };
    let skeleton = scene.skeleton.as_ref().expect("skeleton");
    assert_eq!(mesh.cluster_joints.len(), MAX_BONES);
    assert_eq!(mesh.cluster_joints[MAX_BONES - 1], skeleton.find(&format!("Bone{}", MAX_BONES - 1)));
    assert_eq!(mesh.bone_palette(skeleton).len(), MAX_BONES);

    let last = skeleton.find(&format!("Bone{MAX_BONES}")).expect("last joint");
    assert_eq!(skeleton.joint(last).cluster_index, None);

    assert_eq!(mesh.vertices[0].bone_ids[0], 0);
    let orphan = &mesh.vertices[2];
    assert_eq!(orphan.bone_ids, [UNASSIGNED_BONE; 4]);
    assert!(orphan.bone_weights.iter().chain(&orphan.bone_weights2).all(|&w| w == 0.0));
}

fn walking_hips(span: Option<(FbxTime, FbxTime)>) -> FbxBuilder {
    let mut b = FbxBuilder::new();
    let hips = b.joint("Hips", 0, [0.0, 1.0, 0.0]);
    let layer = b.animation("Take 001", span);
    b.curve(
        layer,
        hips,
        "Lcl Translation",
        "d|X",
        &[(FbxTime::from_seconds(0.0), 0.0), (FbxTime::from_seconds(1.0), 10.0)],
    );
    b
}

#[test]
fn animation_poses_the_skeleton() {
    let span = (FbxTime::ZERO, FbxTime::from_seconds(1.0));
    let mut scene = import(&walking_hips(Some(span)), &no_conversion());
    assert!(scene.is_animated());
    assert_eq!(scene.frame_rate, 30.0);
    assert_eq!(scene.animator.as_ref().map(|a| a.take_span()), Some(span));

    scene.update(0.5);
    let skeleton = scene.skeleton.as_ref().expect("skeleton");
    let hips = skeleton.joint(0);
    assert!(approx(hips.posed_position.x, 5.0), "{:?}", hips.posed_position);
    assert!(approx(hips.posed_position.y, 1.0));
    assert!(approx(skeleton.world_bone_transforms()[0][(0, 3)], 5.0));
}

#[test]
fn crossfade_blends_position_and_turns_the_short_way() {
    let secs = FbxTime::from_seconds;
    let mut b = FbxBuilder::new();
    let hips = b.joint("Hips", 0, [0.0, 1.0, 0.0]);
    let layer = b.animation("Take 001", Some((FbxTime::ZERO, secs(1.0))));
    b.curve(layer, hips, "Lcl Translation", "d|X", &[(secs(0.0), 0.0), (secs(1.0), 10.0)]);
    // 170 degrees over the first quarter second, -170 over the last
    b.curve(
        layer,
        hips,
        "Lcl Rotation",
        "d|Z",
        &[(secs(0.0), 170.0), (secs(0.25), 170.0), (secs(0.75), -170.0), (secs(1.0), -170.0)],
    );
    let mut scene = import(&b, &no_conversion());

    scene.transition_to(Animation::new(0.0, 0.25), 0.0);
    scene.transition_to(Animation::new(0.75, 1.0), 0.4);
    scene.update(0.2);

    let animator = scene.animator.as_ref().expect("animator");
    assert!(animator.is_transitioning());
    assert!(approx(animator.weight0(), 0.5));

    // slot 0 samples x = 2 at 0.2 s, slot 1 samples x = 9.5 at 0.95 s
    let skeleton = scene.skeleton.as_ref().expect("skeleton");
    let joint = skeleton.joint(0);
    assert!(approx(joint.posed_position.x, 0.5 * 2.0 + 0.5 * 9.5), "{:?}", joint.posed_position);
    assert!(approx(joint.posed_position.y, 1.0));

    // halfway between 170 and -170 the short way is 180, not 0
    let world = skeleton.world_bone_transforms()[0];
    assert!(approx(world[(0, 0)], -1.0), "{world:?}");
    assert!(approx(world[(1, 1)], -1.0), "{world:?}");
}

#[test]
fn empty_stack_span_falls_back_to_key_range() {
    let scene = import(&walking_hips(None), &no_conversion());
    let (start, stop) = scene.animator.as_ref().expect("animator").take_span();
    assert_eq!(start, FbxTime::ZERO);
    assert_eq!(stop, FbxTime::from_seconds(1.0));
}

#[test]
fn phong_material_reads_textures_and_scales_specular() {
    let mut b = FbxBuilder::new();
    let model = triangle(&mut b);
    let material = b.material(model, "Wall", "Phong", [0.5, 0.25, 1.0], [0.5, 0.5, 0.5]);
    b.texture(material, "DiffuseColor", "C:\\art\\wall.png");
    b.texture(material, "Bump", "/home/art/wall-bump.png");

    let scene = import(&b, &no_conversion());
    let m = scene.meshes[0].material();
    assert_eq!(m.name, "Wall");
    assert_eq!(m.colour, [0.5, 0.25, 1.0]);
    assert_eq!(m.specular_colour, [2.5; 3]);
    assert_eq!(m.diffuse_texture, Some(PathBuf::from("assets/wall.png")));
    assert_eq!(m.normal_map, Some(PathBuf::from("assets/wall-bump-normal.png")));
    assert_eq!(
        scene.texture_paths(),
        vec![
            PathBuf::from("assets/wall.png"),
            PathBuf::from("assets/wall-bump-normal.png")
        ]
    );
}

#[test]
fn lambert_material_has_no_specular() {
    let mut b = FbxBuilder::new();
    let model = triangle(&mut b);
    b.material(model, "Floor", "lambert", [0.2, 0.2, 0.2], [1.0, 1.0, 1.0]);
    let scene = import(&b, &no_conversion());
    assert_eq!(scene.meshes[0].material().specular_colour, [0.0; 3]);
}

#[test]
fn missing_file_reports_read_error() {
    let err = Scene::load(Path::new("no/such/scene.fbx"), &ImportArgs::default()).unwrap_err();
    assert_eq!(err.key, "scene-read");
    assert_eq!(err.args.get("path").map(String::as_str), Some("no/such/scene.fbx"));
}

#[test]
fn garbage_file_reports_parse_error() {
    let path = std::env::temp_dir().join(format!("fbxdemo-garbage-{}.fbx", std::process::id()));
    std::fs::write(&path, [0u8; 64]).unwrap();
    let err = Scene::load(&path, &ImportArgs::default()).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert_eq!(err.key, "scene-parse");
}

#[test]
fn loads_scene_from_disk() {
    let mut b = FbxBuilder::new();
    triangle(&mut b);
    let path = std::env::temp_dir().join(format!("fbxdemo-tri-{}.fbx", std::process::id()));
    std::fs::write(&path, b.bytes()).unwrap();
    let scene = Scene::load(&path, &ImportArgs::default());
    std::fs::remove_file(&path).ok();

    let scene = scene.unwrap();
    assert_eq!(scene.name, format!("fbxdemo-tri-{}", std::process::id()));
    assert_eq!(scene.folder_path, std::env::temp_dir());
    assert_eq!(scene.meshes.len(), 1);
}

#[test]
fn node_tree_dump_lists_hierarchy() {
    let mut b = FbxBuilder::new();
    let hips = b.joint("Hips", 0, [0.0, 1.0, 0.0]);
    b.joint("Spine", hips, [0.0, 2.0, 0.0]);
    triangle(&mut b);

    let json = node_tree_json(&b.document()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let roots = value.as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["name"], "Hips");
    assert_eq!(roots[0]["attribute"], "eSkeleton");
    assert_eq!(roots[0]["children"][0]["name"], "Spine");
    assert_eq!(roots[1]["attribute"], "eMesh");
    assert!(roots[1].get("children").is_none());
}
