use wasm_bindgen::JsValue;
use web_sys as web;

use lumo_core::constants::{ANALYSER_BIN_COUNT, ANALYSER_FFT_SIZE, ANALYSER_SMOOTHING};

fn create_gain(audio_ctx: &web::AudioContext, value: f32, label: &str) -> Result<web::GainNode, ()> {
    match web::GainNode::new(audio_ctx) {
        Ok(g) => {
            g.gain().set_value(value);
            Ok(g)
        }
        Err(e) => {
            log::error!("{} GainNode error: {:?}", label, e);
            Err(())
        }
    }
}

enum SourceNode {
    Element(web::MediaElementAudioSourceNode),
    Stream(web::MediaStreamAudioSourceNode),
}

/// Singleton analysis graph, built lazily on the first user gesture and
/// shared by every subsequent source. source -> analyser -> master -> out.
pub struct AudioGraph {
    pub ctx: web::AudioContext,
    pub analyser: web::AnalyserNode,
    pub master: web::GainNode,
    source: Option<SourceNode>,
    bins: Vec<u8>,
}

impl AudioGraph {
    pub fn new() -> Result<Self, ()> {
        let ctx = match web::AudioContext::new() {
            Ok(c) => c,
            Err(e) => {
                log::error!("AudioContext error: {:?}", e);
                return Err(());
            }
        };
        let analyser = match web::AnalyserNode::new(&ctx) {
            Ok(a) => a,
            Err(e) => {
                log::error!("AnalyserNode error: {:?}", e);
                return Err(());
            }
        };
        analyser.set_fft_size(ANALYSER_FFT_SIZE);
        analyser.set_smoothing_time_constant(ANALYSER_SMOOTHING);
        let master = create_gain(&ctx, 1.0, "master")?;
        if analyser.connect_with_audio_node(&master).is_err()
            || master.connect_with_audio_node(&ctx.destination()).is_err()
        {
            log::error!("audio graph connect error");
            return Err(());
        }
        log::info!("[audio] graph ready, fft={}", ANALYSER_FFT_SIZE);
        Ok(Self {
            ctx,
            analyser,
            master,
            source: None,
            bins: vec![0; ANALYSER_BIN_COUNT],
        })
    }

    /// Resume a context suspended by autoplay policy. Fire-and-forget.
    pub fn resume(&self) {
        if self.ctx.state() == web::AudioContextState::Suspended {
            let _ = self.ctx.resume();
        }
    }

    /// Detach the previous source from the analyser. Must complete before a
    /// new source is wired in.
    pub fn disconnect_source(&mut self) {
        if let Some(src) = self.source.take() {
            let res = match &src {
                SourceNode::Element(n) => n.disconnect(),
                SourceNode::Stream(n) => n.disconnect(),
            };
            if let Err(e) = res {
                log::debug!("[audio] disconnect: {:?}", e);
            }
        }
    }

    // The rig creates a fresh element per load, so one source node per
    // element is always legal here.
    pub fn connect_element(&mut self, el: &web::HtmlMediaElement) -> Result<(), JsValue> {
        self.disconnect_source();
        let node = self.ctx.create_media_element_source(el)?;
        node.connect_with_audio_node(&self.analyser)?;
        self.source = Some(SourceNode::Element(node));
        Ok(())
    }

    pub fn connect_stream(&mut self, stream: &web::MediaStream) -> Result<(), JsValue> {
        self.disconnect_source();
        let node = self.ctx.create_media_stream_source(stream)?;
        node.connect_with_audio_node(&self.analyser)?;
        self.source = Some(SourceNode::Stream(node));
        Ok(())
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Pull this frame's frequency bytes. Returns `None` with no source.
    pub fn frequency_bins(&mut self) -> Option<&[u8]> {
        if self.source.is_none() {
            return None;
        }
        self.analyser.get_byte_frequency_data(&mut self.bins);
        Some(&self.bins)
    }
}
