use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;
use instant::Instant;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use lumo_core::constants::{BAR_TEX_SIZE, PROBE_SIZE};
use lumo_core::persist::{CameraPose, MediaSlot, Snapshot};
use lumo_core::session::{FrameInput, Session};
use lumo_core::spectrum;

use crate::audio::AudioGraph;
use crate::camera::{self, OrbitCamera};
use crate::events;
use crate::input::PointerState;
use crate::media::MediaRig;
use crate::render::{BlobTexture, GpuState};
use crate::storage::DebouncedSaver;

const PERSIST_INTERVAL_SECS: f32 = 2.0;

pub struct FrameContext<'a> {
    pub canvas: web::HtmlCanvasElement,
    pub session: Rc<RefCell<Session>>,
    pub gpu: GpuState<'a>,
    pub audio: Rc<RefCell<AudioGraph>>,
    pub rig: Rc<RefCell<MediaRig>>,
    pub camera: Rc<RefCell<OrbitCamera>>,
    pub pointer: Rc<RefCell<PointerState>>,
    pub auto_advance: Rc<Cell<bool>>,
    pub saver: DebouncedSaver,

    pub last_instant: Instant,
    persist_accum: f32,
    last_snapshot_json: Option<String>,
    bins_scratch: Vec<u8>,
    bar_scratch: Vec<u8>,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        canvas: web::HtmlCanvasElement,
        session: Rc<RefCell<Session>>,
        gpu: GpuState<'a>,
        audio: Rc<RefCell<AudioGraph>>,
        rig: Rc<RefCell<MediaRig>>,
        camera: Rc<RefCell<OrbitCamera>>,
        pointer: Rc<RefCell<PointerState>>,
        auto_advance: Rc<Cell<bool>>,
    ) -> Self {
        Self {
            canvas,
            session,
            gpu,
            audio,
            rig,
            camera,
            pointer,
            auto_advance,
            saver: DebouncedSaver::new(),
            last_instant: Instant::now(),
            persist_accum: 0.0,
            last_snapshot_json: None,
            bins_scratch: Vec::new(),
            bar_scratch: Vec::new(),
        }
    }

    fn advance_if_ended(&self) {
        if !self.auto_advance.get() {
            return;
        }
        let ended = self
            .rig
            .borrow()
            .media_element()
            .map(|el| el.ended())
            .unwrap_or(false);
        if !ended {
            return;
        }
        let looping = self.session.borrow().playlist.loop_current;
        if looping {
            if let Some(el) = self.rig.borrow().media_element() {
                el.set_current_time(0.0);
                let _ = el.play();
            }
            return;
        }
        self.session.borrow_mut().playlist.next();
        events::load_current(&self.session, &self.rig, &self.audio);
    }

    /// Pull the current video or image frame onto the GPU and refresh the
    /// luminance probe from it.
    fn sample_media(&mut self) {
        let mut rig = self.rig.borrow_mut();
        if let Some(v) = rig.video_el.clone() {
            if let Some((tex, probe)) = rig.sampler.sample_video(&v) {
                self.gpu.upload_media_texture(&tex);
                self.session.borrow_mut().probe.set_pixels(probe);
                rig.texture_dirty = false;
            }
        } else if let Some(img) = rig.image_el.clone() {
            // static image, one upload is enough
            if rig.texture_dirty {
                if let Some((tex, probe)) = rig.sampler.sample_image(&img) {
                    self.gpu.upload_media_texture(&tex);
                    self.session.borrow_mut().probe.set_pixels(probe);
                    rig.texture_dirty = false;
                }
            }
        }
    }

    fn maybe_persist(&mut self, dt: f32) {
        self.persist_accum += dt;
        if self.persist_accum < PERSIST_INTERVAL_SECS {
            return;
        }
        self.persist_accum = 0.0;
        let snap = {
            let s = self.session.borrow();
            let cam = self.camera.borrow();
            Snapshot {
                ts: js_sys::Date::now(),
                params: s.params.clone(),
                camera: CameraPose {
                    position: cam.eye().to_array(),
                    target: cam.target.to_array(),
                },
                media: MediaSlot {
                    index: s.playlist.index(),
                    url: s.media.source().url().map(str::to_owned),
                },
                loop_current: s.playlist.loop_current,
            }
        };
        match snap.to_json() {
            Ok(json) => {
                if self.last_snapshot_json.as_deref() != Some(json.as_str()) {
                    self.last_snapshot_json = Some(json);
                    self.saver.save(snap);
                }
            }
            Err(e) => log::warn!("[persist] snapshot serialize failed: {}", e),
        }
    }

    pub fn frame(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_instant).as_secs_f32();
        self.last_instant = now;

        let width = self.canvas.width();
        let height = self.canvas.height();
        self.gpu.resize_if_needed(width, height);

        self.advance_if_ended();
        self.sample_media();

        // Analyser bins copied out so the session borrow doesn't overlap
        self.bins_scratch.clear();
        if let Some(bins) = self.audio.borrow_mut().frequency_bins() {
            self.bins_scratch.extend_from_slice(bins);
        }

        let (eye, target) = {
            let cam = self.camera.borrow();
            (cam.eye(), cam.target)
        };
        let view_proj = camera::view_proj(eye, target, width, height);

        let pointer = {
            let ps = self.pointer.borrow();
            if ps.over_canvas {
                Some(ps.pos)
            } else {
                None
            }
        };

        let outputs = {
            let mut s = self.session.borrow_mut();
            s.advance(FrameInput {
                dt,
                pointer,
                view_proj,
                viewport: Vec2::new(width as f32, height as f32),
                camera_pos: eye,
                camera_target: target,
                freq_bins: if self.bins_scratch.is_empty() {
                    None
                } else {
                    Some(&self.bins_scratch)
                },
            })
        };

        // A fly path owns the camera while it runs and hands the pose back
        if let Some((fly_eye, fly_target)) = outputs.camera {
            self.camera.borrow_mut().set_pose(fly_eye, fly_target);
        }

        if outputs.draw_bar_texture {
            spectrum::bar_texture(&self.bins_scratch, &mut self.bar_scratch);
            self.gpu.upload_bar_texture(&self.bar_scratch);
            let probe =
                lumo_core::probe::downsample_rgba(&self.bar_scratch, BAR_TEX_SIZE, PROBE_SIZE);
            let mut s = self.session.borrow_mut();
            s.probe.set_pixels(probe);
            s.surface.use_texture = true;
            self.gpu.blob_texture = BlobTexture::Bars;
        } else {
            self.gpu.blob_texture = BlobTexture::Media;
        }

        // GPU picking under the pointer; the readback result is read next frame
        if let Some(pos) = pointer {
            self.gpu.pick_at(pos.x, pos.y);
            let hovered = self.gpu.take_pick();
            self.session.borrow_mut().pick.set_hovered(hovered);
        } else {
            self.gpu.clear_pick();
            self.session.borrow_mut().pick.set_hovered(None);
        }

        {
            let (fly_eye, fly_target) = {
                let cam = self.camera.borrow();
                (cam.eye(), cam.target)
            };
            let vp = camera::view_proj(fly_eye, fly_target, width, height);
            let s = self.session.borrow();
            if let Err(e) = self.gpu.render(
                &s,
                vp,
                fly_eye,
                outputs.idle_rainbow,
                outputs.ring_visible,
            ) {
                log::error!("render error: {:?}", e);
            }
        }

        self.maybe_persist(dt);
    }
}

/// Drive `frame` from requestAnimationFrame until the page goes away.
pub fn start_loop(mut ctx: FrameContext<'static>) {
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        ctx.frame();
        if let Some(w) = web::window() {
            if let Some(cb) = tick_clone.borrow().as_ref() {
                let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
            }
        }
    }) as Box<dyn FnMut()>));
    if let Some(w) = web::window() {
        if let Some(cb) = tick.borrow().as_ref() {
            let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }
}
