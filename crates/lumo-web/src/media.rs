use std::cell::RefCell;
use std::rc::Rc;

use instant::Instant;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

use lumo_core::constants::{MEDIA_READY_TIMEOUT_MS, PROBE_SIZE};
use lumo_core::media::{ActiveSource, LoadToken, MediaError, MediaKind};
use lumo_core::playlist::PlaylistEntry;
use lumo_core::session::Session;

use crate::audio::AudioGraph;

/// Resolution of the CPU canvas the blob texture is sampled from.
pub const MEDIA_TEX_SIZE: u32 = 512;

// Adaptive-streaming libraries loaded from <script> tags. Their absence is
// detected at runtime, never assumed.
#[wasm_bindgen]
extern "C" {
    pub type Hls;

    #[wasm_bindgen(constructor, js_class = "Hls")]
    fn new() -> Hls;
    #[wasm_bindgen(static_method_of = Hls, js_name = isSupported)]
    fn is_supported() -> bool;
    #[wasm_bindgen(method, js_name = loadSource)]
    fn load_source(this: &Hls, url: &str);
    #[wasm_bindgen(method, js_name = attachMedia)]
    fn attach_media(this: &Hls, el: &web::HtmlVideoElement);
    #[wasm_bindgen(method)]
    fn destroy(this: &Hls);

    pub type DashFactory;
    pub type DashMediaPlayer;

    #[wasm_bindgen(js_namespace = dashjs, js_name = MediaPlayer)]
    fn dash_media_player() -> DashFactory;
    #[wasm_bindgen(method)]
    fn create(this: &DashFactory) -> DashMediaPlayer;
    #[wasm_bindgen(method)]
    fn initialize(this: &DashMediaPlayer, view: &web::HtmlVideoElement, source: &str, auto_play: bool);
    #[wasm_bindgen(method)]
    fn reset(this: &DashMediaPlayer);
}

fn global_has(name: &str) -> bool {
    js_sys::Reflect::has(&js_sys::global(), &JsValue::from_str(name)).unwrap_or(false)
}

enum AbrHandle {
    Hls(Hls),
    Dash(DashMediaPlayer),
}

/// CPU canvases the active visual frame is drawn into each tick: a texture
///-sized one for the blob and a small one for the luminance probe.
pub struct FrameSampler {
    tex_canvas: web::HtmlCanvasElement,
    tex_ctx: web::CanvasRenderingContext2d,
    probe_canvas: web::HtmlCanvasElement,
    probe_ctx: web::CanvasRenderingContext2d,
}

fn make_canvas_2d(
    document: &web::Document,
    size: u32,
) -> Result<(web::HtmlCanvasElement, web::CanvasRenderingContext2d), ()> {
    let canvas: web::HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(|e| log::error!("create canvas: {:?}", e))?
        .dyn_into()
        .map_err(|e| log::error!("canvas cast: {:?}", e))?;
    canvas.set_width(size);
    canvas.set_height(size);
    let ctx = canvas
        .get_context("2d")
        .map_err(|e| log::error!("2d context: {:?}", e))?
        .ok_or_else(|| log::error!("2d context unavailable"))?
        .dyn_into::<web::CanvasRenderingContext2d>()
        .map_err(|e| log::error!("2d cast: {:?}", e))?;
    Ok((canvas, ctx))
}

impl FrameSampler {
    pub fn new(document: &web::Document) -> Result<Self, ()> {
        let (tex_canvas, tex_ctx) = make_canvas_2d(document, MEDIA_TEX_SIZE)?;
        let (probe_canvas, probe_ctx) = make_canvas_2d(document, PROBE_SIZE as u32)?;
        Ok(Self {
            tex_canvas,
            tex_ctx,
            probe_canvas,
            probe_ctx,
        })
    }

    fn read_rgba(
        ctx: &web::CanvasRenderingContext2d,
        size: u32,
    ) -> Option<Vec<u8>> {
        match ctx.get_image_data(0.0, 0.0, size as f64, size as f64) {
            Ok(data) => Some(data.data().0),
            Err(e) => {
                log::warn!("[probe] getImageData failed: {:?}", e);
                None
            }
        }
    }

    /// Draw the current video frame; returns (texture RGBA, probe RGBA).
    pub fn sample_video(&self, v: &web::HtmlVideoElement) -> Option<(Vec<u8>, Vec<u8>)> {
        if v.ready_state() < 2 {
            return None;
        }
        let s = MEDIA_TEX_SIZE as f64;
        if self
            .tex_ctx
            .draw_image_with_html_video_element_and_dw_and_dh(v, 0.0, 0.0, s, s)
            .is_err()
        {
            return None;
        }
        let p = PROBE_SIZE as f64;
        let _ = self
            .probe_ctx
            .draw_image_with_html_canvas_element_and_dw_and_dh(&self.tex_canvas, 0.0, 0.0, p, p);
        let tex = Self::read_rgba(&self.tex_ctx, MEDIA_TEX_SIZE)?;
        let probe = Self::read_rgba(&self.probe_ctx, PROBE_SIZE as u32)?;
        Some((tex, probe))
    }

    pub fn sample_image(&self, img: &web::HtmlImageElement) -> Option<(Vec<u8>, Vec<u8>)> {
        if !img.complete() {
            return None;
        }
        let s = MEDIA_TEX_SIZE as f64;
        if self
            .tex_ctx
            .draw_image_with_html_image_element_and_dw_and_dh(img, 0.0, 0.0, s, s)
            .is_err()
        {
            return None;
        }
        let p = PROBE_SIZE as f64;
        let _ = self
            .probe_ctx
            .draw_image_with_html_canvas_element_and_dw_and_dh(&self.tex_canvas, 0.0, 0.0, p, p);
        let tex = Self::read_rgba(&self.tex_ctx, MEDIA_TEX_SIZE)?;
        let probe = Self::read_rgba(&self.probe_ctx, PROBE_SIZE as u32)?;
        Some((tex, probe))
    }
}

/// DOM-side holdings of the active source. Paired with the pure
/// [`lumo_core::media::MediaSession`] bookkeeping in `Session`.
pub struct MediaRig {
    pub audio_el: Option<web::HtmlAudioElement>,
    pub video_el: Option<web::HtmlVideoElement>,
    pub image_el: Option<web::HtmlImageElement>,
    pub webcam: Option<web::MediaStream>,
    abr: Option<AbrHandle>,
    pub sampler: FrameSampler,
    /// Set when the blob texture must be re-uploaded this frame
    pub texture_dirty: bool,
}

impl MediaRig {
    pub fn new(document: &web::Document) -> Result<Self, ()> {
        Ok(Self {
            audio_el: None,
            video_el: None,
            image_el: None,
            webcam: None,
            abr: None,
            sampler: FrameSampler::new(document)?,
            texture_dirty: false,
        })
    }

    /// The media element currently feeding the analyser, if any.
    pub fn media_element(&self) -> Option<web::HtmlMediaElement> {
        if let Some(a) = &self.audio_el {
            return Some(a.clone().into());
        }
        self.video_el.clone().map(Into::into)
    }

    /// Release everything the previous source held. Runs to completion
    /// before a new source acquires anything.
    pub fn teardown(&mut self, audio: &mut AudioGraph) {
        if let Some(abr) = self.abr.take() {
            match abr {
                AbrHandle::Hls(h) => h.destroy(),
                AbrHandle::Dash(d) => d.reset(),
            }
        }
        if let Some(stream) = self.webcam.take() {
            for track in stream.get_tracks().iter() {
                if let Ok(track) = track.dyn_into::<web::MediaStreamTrack>() {
                    track.stop();
                }
            }
        }
        if let Some(v) = self.video_el.take() {
            let _ = v.pause();
            v.set_src("");
        }
        if let Some(a) = self.audio_el.take() {
            let _ = a.pause();
            a.set_src("");
        }
        self.image_el = None;
        audio.disconnect_source();
        self.texture_dirty = true;
    }

    pub fn set_loop(&self, looping: bool) {
        if let Some(v) = &self.video_el {
            v.set_loop(looping);
        }
        if let Some(a) = &self.audio_el {
            a.set_loop(looping);
        }
    }
}

async fn sleep_ms(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        if let Some(w) = web::window() {
            let _ = w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
        }
    });
    let _ = JsFuture::from(promise).await;
}

/// Wait until the element can play, bounded by the readiness timeout and
/// cancelled early when a newer load supersedes this one.
async fn await_ready(
    el: &web::HtmlMediaElement,
    session: &Rc<RefCell<Session>>,
    token: LoadToken,
) -> Result<(), MediaError> {
    let started = Instant::now();
    loop {
        // superseded loads bail out quietly; the caller re-checks staleness
        if session.borrow().media.is_stale(token) {
            return Ok(());
        }
        if el.error().is_some() {
            return Err(MediaError::Decode {
                url: el.current_src(),
            });
        }
        if el.ready_state() >= 2 {
            return Ok(());
        }
        if started.elapsed().as_millis() as i32 > MEDIA_READY_TIMEOUT_MS {
            return Err(MediaError::Network {
                url: el.current_src(),
                detail: "readiness timeout".into(),
            });
        }
        sleep_ms(50).await;
    }
}

fn make_video(document: &web::Document) -> Result<web::HtmlVideoElement, MediaError> {
    document
        .create_element("video")
        .ok()
        .and_then(|e| e.dyn_into::<web::HtmlVideoElement>().ok())
        .map(|v| {
            v.set_cross_origin(Some("anonymous"));
            v.set_muted(false);
            let _ = v.set_attribute("playsinline", "");
            v
        })
        .ok_or_else(|| MediaError::Unsupported("video element".into()))
}

async fn play_element(el: &web::HtmlMediaElement) -> Result<(), MediaError> {
    let promise = el.play().map_err(|e| MediaError::AutoplayBlocked(format!("{e:?}")))?;
    JsFuture::from(promise)
        .await
        .map_err(|e| MediaError::AutoplayBlocked(format!("{e:?}")))?;
    Ok(())
}

/// Load one playlist entry, replacing whatever was active. Teardown of the
/// previous source completes before the new one acquires handles; a stale
/// token (superseded by a newer call) abandons the load without publishing.
pub async fn load_entry(
    session: Rc<RefCell<Session>>,
    rig: Rc<RefCell<MediaRig>>,
    audio: Rc<RefCell<AudioGraph>>,
    entry: PlaylistEntry,
    index: usize,
) -> Result<(), MediaError> {
    let token = session.borrow_mut().media.begin_load();
    rig.borrow_mut().teardown(&mut audio.borrow_mut());
    session.borrow_mut().surface.use_texture = false;

    let document = crate::dom::window_document()
        .ok_or_else(|| MediaError::Unsupported("no document".into()))?;

    match entry.kind {
        MediaKind::Audio => {
            let el = web::HtmlAudioElement::new()
                .map_err(|_| MediaError::Unsupported("audio element".into()))?;
            el.set_cross_origin(Some("anonymous"));
            el.set_src(&entry.url);
            let media_el: web::HtmlMediaElement = el.clone().into();
            await_ready(&media_el, &session, token).await?;
            if session.borrow().media.is_stale(token) {
                let _ = el.pause();
                return Ok(());
            }
            audio
                .borrow_mut()
                .connect_element(&media_el)
                .map_err(|e| MediaError::Unsupported(format!("{e:?}")))?;
            play_element(&media_el).await?;
            // a newer load may have won while play() was pending
            if session.borrow().media.is_stale(token) {
                let _ = el.pause();
                return Ok(());
            }
            rig.borrow_mut().audio_el = Some(el);
        }
        MediaKind::Video => {
            let v = make_video(&document)?;
            v.set_src(&entry.url);
            let media_el: web::HtmlMediaElement = v.clone().into();
            await_ready(&media_el, &session, token).await?;
            if session.borrow().media.is_stale(token) {
                let _ = v.pause();
                return Ok(());
            }
            audio
                .borrow_mut()
                .connect_element(&media_el)
                .map_err(|e| MediaError::Unsupported(format!("{e:?}")))?;
            play_element(&media_el).await?;
            if session.borrow().media.is_stale(token) {
                let _ = v.pause();
                return Ok(());
            }
            rig.borrow_mut().video_el = Some(v);
            session.borrow_mut().surface.use_texture = true;
        }
        MediaKind::Hls => {
            let v = make_video(&document)?;
            let media_el: web::HtmlMediaElement = v.clone().into();
            if global_has("Hls") && Hls::is_supported() {
                let hls = Hls::new();
                hls.load_source(&entry.url);
                hls.attach_media(&v);
                rig.borrow_mut().abr = Some(AbrHandle::Hls(hls));
            } else if media_el
                .can_play_type("application/vnd.apple.mpegurl")
                .as_str()
                != ""
            {
                v.set_src(&entry.url);
            } else {
                return Err(MediaError::Unsupported("HLS without hls.js".into()));
            }
            await_ready(&media_el, &session, token).await?;
            if session.borrow().media.is_stale(token) {
                let _ = v.pause();
                return Ok(());
            }
            audio
                .borrow_mut()
                .connect_element(&media_el)
                .map_err(|e| MediaError::Unsupported(format!("{e:?}")))?;
            play_element(&media_el).await?;
            if session.borrow().media.is_stale(token) {
                let _ = v.pause();
                return Ok(());
            }
            rig.borrow_mut().video_el = Some(v);
            session.borrow_mut().surface.use_texture = true;
        }
        MediaKind::Dash => {
            if !global_has("dashjs") {
                return Err(MediaError::Unsupported("DASH without dash.js".into()));
            }
            let v = make_video(&document)?;
            let media_el: web::HtmlMediaElement = v.clone().into();
            let player = dash_media_player().create();
            player.initialize(&v, &entry.url, true);
            rig.borrow_mut().abr = Some(AbrHandle::Dash(player));
            await_ready(&media_el, &session, token).await?;
            if session.borrow().media.is_stale(token) {
                let _ = v.pause();
                return Ok(());
            }
            audio
                .borrow_mut()
                .connect_element(&media_el)
                .map_err(|e| MediaError::Unsupported(format!("{e:?}")))?;
            rig.borrow_mut().video_el = Some(v);
            session.borrow_mut().surface.use_texture = true;
        }
        MediaKind::Image => {
            let img = web::HtmlImageElement::new()
                .map_err(|_| MediaError::Unsupported("image element".into()))?;
            img.set_cross_origin(Some("anonymous"));
            img.set_src(&entry.url);
            JsFuture::from(img.decode())
                .await
                .map_err(|_| MediaError::Decode {
                    url: entry.url.clone(),
                })?;
            if session.borrow().media.is_stale(token) {
                return Ok(());
            }
            rig.borrow_mut().image_el = Some(img);
            session.borrow_mut().surface.use_texture = true;
        }
        MediaKind::Webcam => {
            return Err(MediaError::Unsupported("webcam is started directly".into()));
        }
    }

    let committed = session.borrow_mut().media.commit(
        token,
        ActiveSource::Loaded {
            kind: entry.kind,
            url: entry.url.clone(),
            index,
        },
    );
    if committed {
        rig.borrow_mut().texture_dirty = true;
        log::info!("[media] loaded {:?} {}", entry.kind, entry.label);
    }
    Ok(())
}

/// Start the webcam as the active source. Permission denial leaves the
/// previous state cleared to "none" rather than crashing.
pub async fn start_webcam(
    session: Rc<RefCell<Session>>,
    rig: Rc<RefCell<MediaRig>>,
    audio: Rc<RefCell<AudioGraph>>,
) -> Result<(), MediaError> {
    let token = session.borrow_mut().media.begin_load();
    rig.borrow_mut().teardown(&mut audio.borrow_mut());

    let document = crate::dom::window_document()
        .ok_or_else(|| MediaError::Unsupported("no document".into()))?;
    let navigator = web::window()
        .map(|w| w.navigator())
        .ok_or_else(|| MediaError::Unsupported("no navigator".into()))?;
    let devices = navigator
        .media_devices()
        .map_err(|e| MediaError::Unsupported(format!("{e:?}")))?;

    let constraints = web::MediaStreamConstraints::new();
    constraints.set_video(&JsValue::TRUE);
    constraints.set_audio(&JsValue::TRUE);
    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|e| MediaError::PermissionDenied(format!("{e:?}")))?;
    let stream: web::MediaStream = JsFuture::from(promise)
        .await
        .map_err(|e| MediaError::PermissionDenied(format!("{e:?}")))?
        .dyn_into()
        .map_err(|e| MediaError::Unsupported(format!("{e:?}")))?;

    if session.borrow().media.is_stale(token) {
        for track in stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<web::MediaStreamTrack>() {
                track.stop();
            }
        }
        return Ok(());
    }

    let v = make_video(&document)?;
    v.set_muted(true);
    v.set_src_object(Some(&stream));
    let media_el: web::HtmlMediaElement = v.clone().into();
    play_element(&media_el).await?;

    if session.borrow().media.is_stale(token) {
        for track in stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<web::MediaStreamTrack>() {
                track.stop();
            }
        }
        return Ok(());
    }

    // mic feeds the analyser only; the video element stays muted
    if let Err(e) = audio.borrow_mut().connect_stream(&stream) {
        log::warn!("[media] webcam audio: {:?}", e);
    }

    {
        let mut r = rig.borrow_mut();
        r.video_el = Some(v);
        r.webcam = Some(stream);
        r.texture_dirty = true;
    }
    let mut s = session.borrow_mut();
    s.surface.use_texture = true;
    s.media.commit(token, ActiveSource::Webcam);
    Ok(())
}
