use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

use lumo_core::session::Session;

use crate::audio::AudioGraph;
use crate::camera::OrbitCamera;
use crate::dom;
use crate::input::{self, PointerState};
use crate::media::{self, MediaRig};

/// Everything the event closures share; cloned handle-by-handle into each one.
#[derive(Clone)]
pub struct InputWiring {
    pub canvas: web::HtmlCanvasElement,
    pub session: Rc<RefCell<Session>>,
    pub camera: Rc<RefCell<OrbitCamera>>,
    pub pointer: Rc<RefCell<PointerState>>,
    pub rig: Rc<RefCell<MediaRig>>,
    pub audio: Rc<RefCell<AudioGraph>>,
    /// Cleared by a manual playlist step so 'ended' stops chaining tracks.
    pub auto_advance: Rc<Cell<bool>>,
}

/// Kick off loading whatever the playlist currently points at.
pub fn load_current(
    session: &Rc<RefCell<Session>>,
    rig: &Rc<RefCell<MediaRig>>,
    audio: &Rc<RefCell<AudioGraph>>,
) {
    let entry = {
        let s = session.borrow();
        s.playlist.current().cloned().map(|e| (e, s.playlist.index()))
    };
    let Some((entry, index)) = entry else {
        return;
    };
    let session = session.clone();
    let rig = rig.clone();
    let audio = audio.clone();
    spawn_local(async move {
        if let Err(e) = media::load_entry(session, rig, audio, entry, index).await {
            log::warn!("[media] load failed: {}", e);
        }
    });
}

fn step_playlist(w_session: &Rc<RefCell<Session>>, forward: bool) {
    let mut s = w_session.borrow_mut();
    if forward {
        s.playlist.next();
    } else {
        s.playlist.prev();
    }
}

fn typing_context(document: &web::Document) -> bool {
    let Some(el) = document.active_element() else {
        return false;
    };
    if matches!(el.tag_name().as_str(), "INPUT" | "TEXTAREA" | "SELECT") {
        return true;
    }
    el.dyn_ref::<web::HtmlElement>()
        .map(|h| h.is_content_editable())
        .unwrap_or(false)
}

pub fn handle_global_keydown(ev: &web::KeyboardEvent, w: &InputWiring) {
    let Some(document) = crate::dom::window_document() else {
        return;
    };
    // keys typed into the search box are not shortcuts
    if typing_context(&document) {
        return;
    }
    let key = ev.key();
    if let Ok(d) = key.parse::<u32>() {
        if key.len() == 1 {
            let cam = w.camera.borrow();
            let (eye, target) = (cam.eye(), cam.target);
            drop(cam);
            w.session.borrow_mut().fly_digit(d, eye, target);
            return;
        }
    }
    match key.as_str() {
        "Escape" => {
            dom::toggle_chrome(&document);
        }
        "f" | "F" => {
            // remember the search panel so fullscreen can restore it
            let search_was_open = dom::search_panel_open(&document);
            if document.fullscreen_element().is_some() {
                let _ = document.exit_fullscreen();
            } else {
                let _ = w.canvas.request_fullscreen();
            }
            dom::set_search_panel_open(&document, search_was_open);
            ev.prevent_default();
        }
        "/" | "?" => {
            dom::set_search_panel_open(&document, true);
            ev.prevent_default();
        }
        "ArrowRight" => {
            w.auto_advance.set(false);
            step_playlist(&w.session, true);
            load_current(&w.session, &w.rig, &w.audio);
            ev.prevent_default();
        }
        "ArrowLeft" => {
            w.auto_advance.set(false);
            step_playlist(&w.session, false);
            load_current(&w.session, &w.rig, &w.audio);
            ev.prevent_default();
        }
        "l" | "L" => {
            let looping = {
                let mut s = w.session.borrow_mut();
                s.playlist.loop_current = !s.playlist.loop_current;
                s.playlist.loop_current
            };
            w.rig.borrow().set_loop(looping);
            log::info!("[playlist] loop_current = {}", looping);
        }
        "w" | "W" => {
            let session = w.session.clone();
            let rig = w.rig.clone();
            let audio = w.audio.clone();
            spawn_local(async move {
                if let Err(e) = media::start_webcam(session, rig, audio).await {
                    log::warn!("[media] webcam failed: {}", e);
                }
            });
        }
        _ => {}
    }
}

pub fn wire_global_keydown(w: InputWiring) {
    if let Some(window) = web::window() {
        let closure =
            wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::KeyboardEvent| {
                handle_global_keydown(&ev, &w);
            }) as Box<dyn FnMut(_)>);
        let _ =
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

pub fn wire_input_handlers(w: InputWiring) {
    // pointermove
    {
        let pointer_m = w.pointer.clone();
        let camera_m = w.camera.clone();
        let canvas_m = w.canvas.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
            let pos = input::pointer_canvas_px(ev.client_x() as f32, ev.client_y() as f32, &canvas_m);
            let mut ps = pointer_m.borrow_mut();
            let dx = ev.movement_x() as f32;
            let dy = ev.movement_y() as f32;
            ps.pos = pos;
            ps.over_canvas = pos.x >= 0.0
                && pos.y >= 0.0
                && pos.x < canvas_m.width() as f32
                && pos.y < canvas_m.height() as f32;
            if ps.dragging {
                camera_m.borrow_mut().rotate(dx, dy);
            }
        }) as Box<dyn FnMut(_)>);
        if let Some(wnd) = web::window() {
            let _ = wnd
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
        }
        closure.forget();
    }

    // pointerdown
    {
        let pointer_m = w.pointer.clone();
        let session_m = w.session.clone();
        let canvas_target = w.canvas.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
            {
                let mut s = session_m.borrow_mut();
                s.fly.stop();
                if s.pick.pointer_down() {
                    log::info!("[pick] locked particle {:?}", s.pick.locked());
                }
            }
            let mut ps = pointer_m.borrow_mut();
            ps.down = true;
            ps.dragging = true;
            let _ = canvas_target.set_pointer_capture(ev.pointer_id());
            ev.prevent_default();
        }) as Box<dyn FnMut(_)>);
        let _ = w
            .canvas
            .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // pointerup
    {
        let pointer_m = w.pointer.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |_ev: web::PointerEvent| {
            let mut ps = pointer_m.borrow_mut();
            ps.down = false;
            ps.dragging = false;
        }) as Box<dyn FnMut(_)>);
        if let Some(wnd) = web::window() {
            let _ =
                wnd.add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref());
        }
        closure.forget();
    }

    // pointerleave clears hover so a stale lock target can't linger offscreen
    {
        let pointer_m = w.pointer.clone();
        let session_m = w.session.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |_ev: web::PointerEvent| {
            pointer_m.borrow_mut().over_canvas = false;
            session_m.borrow_mut().pick.set_hovered(None);
        }) as Box<dyn FnMut(_)>);
        let _ = w
            .canvas
            .add_event_listener_with_callback("pointerleave", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // dblclick releases a lock
    {
        let session_m = w.session.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |_ev: web::MouseEvent| {
            if session_m.borrow_mut().pick.double_click() {
                log::info!("[pick] lock released");
            }
        }) as Box<dyn FnMut(_)>);
        let _ = w
            .canvas
            .add_event_listener_with_callback("dblclick", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // wheel zoom
    {
        let session_m = w.session.clone();
        let camera_m = w.camera.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::WheelEvent| {
            session_m.borrow_mut().fly.stop();
            camera_m.borrow_mut().zoom(ev.delta_y() as f32);
            ev.prevent_default();
        }) as Box<dyn FnMut(_)>);
        let _ = w
            .canvas
            .add_event_listener_with_callback("wheel", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}
