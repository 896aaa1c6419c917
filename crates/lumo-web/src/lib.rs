#![cfg(target_arch = "wasm32")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec3;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

use lumo_core::session::Session;

mod audio;
mod camera;
mod dom;
mod events;
mod frame;
mod input;
mod media;
mod overlay;
mod render;
mod storage;

const CANVAS_ID: &str = "lumo-canvas";
const PLAYLIST_URL: &str = "/static/playlist.txt";
const MEDIA_BASE: &str = "/static/media";

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("lumo-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

async fn init() -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow::anyhow!("no document"))?;
    let canvas = dom::canvas_by_id(&document, CANVAS_ID)?;

    dom::sync_canvas_backing_size(&canvas);
    {
        let canvas_resize = canvas.clone();
        let resize_closure = Closure::wrap(Box::new(move || {
            dom::sync_canvas_backing_size(&canvas_resize);
        }) as Box<dyn FnMut()>);
        window
            .add_event_listener_with_callback("resize", resize_closure.as_ref().unchecked_ref())
            .ok();
        resize_closure.forget();
    }

    // Saved state wins, then the server preset, then built-in defaults
    let snapshot = match storage::load_snapshot() {
        Some(s) => Some(s),
        None => match storage::fetch_default_preset().await {
            Ok(s) => Some(s),
            Err(e) => {
                log::info!("[persist] no preset available: {}", e);
                None
            }
        },
    };
    let params = snapshot
        .as_ref()
        .map(|s| s.params.clone())
        .unwrap_or_default();

    let mut session = Session::new(params, None);
    let mut camera = camera::OrbitCamera::new();
    if let Some(snap) = &snapshot {
        camera.set_pose(
            Vec3::from_array(snap.camera.position),
            Vec3::from_array(snap.camera.target),
        );
    }

    match storage::fetch_text(PLAYLIST_URL).await {
        Ok(text) => {
            session.playlist = lumo_core::playlist::Playlist::from_tree(&text, MEDIA_BASE);
        }
        Err(e) => log::warn!("[playlist] fetch failed: {}", e),
    }
    if let Some(snap) = &snapshot {
        session.playlist.select(snap.media.index);
        session.playlist.loop_current = snap.loop_current;
    }
    let session = Rc::new(RefCell::new(session));
    let camera = Rc::new(RefCell::new(camera));
    let pointer = Rc::new(RefCell::new(input::PointerState::default()));

    overlay::set_status(&document, "click to start");
    overlay::show(&document);

    // Audio and WebGPU only come up inside a user gesture
    static STARTED: AtomicBool = AtomicBool::new(false);
    let canvas_for_click = canvas.clone();
    let document_for_click = document.clone();
    dom::add_click_listener(&document, "start-overlay", move || {
        if STARTED.swap(true, Ordering::SeqCst) {
            return;
        }
        let canvas = canvas_for_click.clone();
        let document = document_for_click.clone();
        let session = session.clone();
        let camera = camera.clone();
        let pointer = pointer.clone();
        spawn_local(async move {
            if let Err(e) = start_systems(canvas, document, session, camera, pointer).await {
                log::error!("startup error: {:?}", e);
            }
        });
    });

    Ok(())
}

async fn start_systems(
    canvas: web::HtmlCanvasElement,
    document: web::Document,
    session: Rc<RefCell<Session>>,
    camera: Rc<RefCell<camera::OrbitCamera>>,
    pointer: Rc<RefCell<input::PointerState>>,
) -> anyhow::Result<()> {
    log::info!("[gesture] starting systems after click");

    let graph = audio::AudioGraph::new()
        .map_err(|_| anyhow::anyhow!("audio graph init failed"))?;
    graph.resume();
    let audio = Rc::new(RefCell::new(graph));

    let rig = media::MediaRig::new(&document)
        .map_err(|_| anyhow::anyhow!("media rig init failed"))?;
    let rig = Rc::new(RefCell::new(rig));

    // The surface must outlive the frame loop
    let canvas_ref: &'static web::HtmlCanvasElement = Box::leak(Box::new(canvas.clone()));
    let gpu = render::GpuState::new(canvas_ref).await?;

    overlay::hide(&document);
    overlay::set_status(&document, "");

    let auto_advance = Rc::new(Cell::new(true));
    let wiring = events::InputWiring {
        canvas: canvas.clone(),
        session: session.clone(),
        camera: camera.clone(),
        pointer: pointer.clone(),
        rig: rig.clone(),
        audio: audio.clone(),
        auto_advance: auto_advance.clone(),
    };
    events::wire_global_keydown(wiring.clone());
    events::wire_input_handlers(wiring);

    let has_playlist = !session.borrow().playlist.is_empty();
    if has_playlist {
        events::load_current(&session, &rig, &audio);
    }

    frame::start_loop(frame::FrameContext::new(
        canvas,
        session,
        gpu,
        audio,
        rig,
        camera,
        pointer,
        auto_advance,
    ));
    Ok(())
}
