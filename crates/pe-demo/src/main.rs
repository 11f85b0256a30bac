//! Plate editor headless session
//!
//! Builds a small plate, cuts a hole with a subtract node and drives the
//! viewport interaction with scripted pointer and key events.
//!
//! Usage: `pe-demo [config.ron]`

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use pe_core::primitive::{generate_box_mesh, generate_cylinder_mesh};
use pe_core::{ConfigError, EditorConfig, Scene, SceneObject};
use pe_csg::{SubtractOperation, TaskScheduler, default_kernel};
use pe_interact::{
    InteractionController, Key, KeyEvent, Modifiers, MouseButton, PointerEvent, Viewport,
    WorldView,
};

fn main() -> Result<(), ConfigError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pe_demo=debug,pe_csg=debug,pe_interact=debug,pe_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading config from {}", path);
            EditorConfig::load(path)?
        }
        None => EditorConfig::default(),
    };

    tracing::info!("Starting plate editor session");

    let scene = Scene::new();
    let scheduler = Arc::new(TaskScheduler::from_config(&config.rebuild));

    // A plate with a hole through it
    let plate = SceneObject::builder("plate")
        .mesh(Arc::new(generate_box_mesh([40.0, 30.0, 6.0])))
        .color([0.2, 0.5, 0.8, 1.0])
        .build();
    let hole = SceneObject::builder("hole")
        .mesh(Arc::new(generate_cylinder_mesh(5.0, 12.0)))
        .build();
    let subtract = SubtractOperation::create_node(
        "plate with hole",
        vec![plate, hole.clone()],
        ["hole".to_string()],
        default_kernel(),
        scheduler.clone(),
    );
    scene.add(subtract.clone());

    if let Some(op) = SubtractOperation::of(&subtract) {
        op.request_rebuild(&subtract);
    }
    scheduler.wait_idle();
    log_results(&subtract);

    // Moving an operand rebuilds the node on its own
    hole.set_matrix(Mat4::from_translation(Vec3::new(8.0, 0.0, 0.0)));
    scheduler.wait_idle();
    log_results(&subtract);

    let mut controller = InteractionController::new(&config);
    let mut view = Viewport::from_config(&config.camera, Vec2::new(1280.0, 720.0));
    view.camera.set_top_view();
    view.camera.fit_all(Vec3::ZERO, 60.0);

    let peg = SceneObject::with_mesh("peg", Arc::new(generate_box_mesh([10.0, 10.0, 10.0])));
    controller.insert(&scene, peg.clone());
    tracing::info!("Peg placed at {:?}", peg.world_bounds().center());

    // Drag the peg 80 pixels to the right
    let top = peg.world_bounds().center() + Vec3::new(0.0, 0.0, 5.0);
    if let Some(start) = view.world_to_screen(top) {
        let end = start + Vec2::new(80.0, 0.0);
        controller.handle(&scene, &view, PointerEvent::Down {
            position: start,
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        });
        controller.handle(&scene, &view, PointerEvent::Move {
            position: end,
            modifiers: Modifiers::shift(),
        });
        controller.handle(&scene, &view, PointerEvent::Up {
            position: end,
            button: MouseButton::Left,
        });
        tracing::info!("Peg dragged to {:?}", peg.world_bounds().center());

        controller.key_down(&scene, KeyEvent::new(Key::Z, Modifiers::ctrl()));
        tracing::info!("After undo the peg is at {:?}", peg.world_bounds().center());
    }

    // Marquee over the whole viewport
    let corner = view.size() - Vec2::ONE;
    controller.handle(&scene, &view, PointerEvent::Down {
        position: Vec2::ONE,
        button: MouseButton::Left,
        modifiers: Modifiers::NONE,
    });
    controller.handle(&scene, &view, PointerEvent::Move {
        position: corner,
        modifiers: Modifiers::NONE,
    });
    controller.handle(&scene, &view, PointerEvent::Up {
        position: corner,
        button: MouseButton::Left,
    });
    tracing::info!("Marquee selected {} objects", controller.selection().len());

    let requests = controller.draw_requests(&scene);
    tracing::info!("{} draw requests", requests.len());

    for notice in scheduler.take_notices() {
        tracing::warn!("{}: {}", notice.title, notice.message);
    }
    tracing::info!("Session finished at scene revision {}", scene.revision());
    Ok(())
}

fn log_results(node: &pe_core::SceneNode) {
    for result in SubtractOperation::result_children(node) {
        let triangles = result.mesh().map_or(0, |m| m.triangle_count());
        tracing::info!("{}: {} triangles", result.name(), triangles);
    }
}
