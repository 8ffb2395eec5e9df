use glam::Vec3;
use ktdance::host::{FixedFrame, Host};
use serde_json::json;
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut camera: Option<PathBuf> = None;
    let mut dump_mesh = false;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--camera" => {
                camera = args.get(i + 1).map(PathBuf::from);
                i += 2;
            }
            "--mesh" => {
                dump_mesh = true;
                i += 1;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let Some(model_path) = positional.first().map(PathBuf::from) else {
        eprintln!("usage: pose_dump <model|arc> [motion] [frame] [--camera <file>] [--mesh]");
        std::process::exit(2);
    };
    let motion_path = positional.get(1).map(PathBuf::from);
    let frame: i32 = positional
        .get(2)
        .and_then(|f| f.parse().ok())
        .unwrap_or(0);

    let host = Host::new(FixedFrame(frame));
    let model = host.read_model(&model_path).expect("read model");
    let sample = match &motion_path {
        Some(path) => host.read_animation(path, None).expect("read motion"),
        None => model.skeleton.rest_sample(),
    };
    let (mesh, posed) = host.evaluate(&model.mesh, &model.skeleton, &sample);

    let bones: Vec<_> = model
        .skeleton
        .bones()
        .iter()
        .enumerate()
        .map(|(i, bone)| {
            let local = sample.bones.get(i);
            json!({
                "i": i,
                "name": bone.name.as_deref().unwrap_or("<unnamed>"),
                "parent": bone.parent,
                "bind": bone.bind_position,
                "posed": posed.positions[i],
                "local": local.map(|b| json!({
                    "translation": b.translation,
                    "rotation": b.rotation,
                    "translationFrames": b.translation_frames,
                    "trackType": b.meta.kind,
                })),
            })
        })
        .collect();

    let camera = camera.map(|path| {
        let shot = host.read_camera(&path, None).expect("read camera");
        json!({
            "translation": shot.translation,
            "rotation": shot.rotation,
            "forward": host.rotate_vector(Vec3::NEG_Z, shot.rotation),
        })
    });

    let vertices = dump_mesh.then(|| {
        mesh.vertices
            .iter()
            .map(|v| json!({"position": v.position, "normal": v.normal, "uv": v.uv}))
            .collect::<Vec<_>>()
    });

    let out = json!({
        "model": model_path.display().to_string(),
        "motion": motion_path.as_ref().map(|p| p.display().to_string()),
        "frame": frame,
        "maxFrame": sample.max_frame,
        "bones": bones,
        "edges": model.skeleton.edges(),
        "triangles": mesh.triangles.len(),
        "camera": camera,
        "vertices": vertices,
    });

    println!("{}", serde_json::to_string(&out).expect("json"));
}
