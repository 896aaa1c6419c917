use thiserror::Error;

/// What kind of source an entry resolves to, by extension or capture device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
    Image,
    Hls,
    Dash,
    Webcam,
}

impl MediaKind {
    /// Whether the source produces frames for the blob texture.
    pub fn is_visual(self) -> bool {
        !matches!(self, MediaKind::Audio)
    }

    /// Whether the source feeds the analyser.
    pub fn has_audio(self) -> bool {
        matches!(
            self,
            MediaKind::Audio | MediaKind::Video | MediaKind::Hls | MediaKind::Dash
        )
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("playback blocked until a user gesture: {0}")]
    AutoplayBlocked(String),
    #[error("capture permission denied: {0}")]
    PermissionDenied(String),
    #[error("decode failed for {url}")]
    Decode { url: String },
    #[error("unsupported format: {0}")]
    Unsupported(String),
    #[error("network error fetching {url}: {detail}")]
    Network { url: String, detail: String },
}

/// The published source of truth the frame loop reads. Loads mutate it only
/// through a committed [`LoadToken`].
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ActiveSource {
    #[default]
    None,
    Loaded {
        kind: MediaKind,
        url: String,
        index: usize,
    },
    Webcam,
}

impl ActiveSource {
    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            ActiveSource::None => None,
            ActiveSource::Loaded { kind, .. } => Some(*kind),
            ActiveSource::Webcam => Some(MediaKind::Webcam),
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            ActiveSource::Loaded { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ActiveSource::Loaded { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// Ticket for one in-flight load. A newer `begin_load` silently invalidates
/// every earlier ticket, so overlapping loads resolve last-writer-wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadToken {
    generation: u64,
}

/// Generation-counted load arbitration. Pure bookkeeping: the frontend does
/// the actual element/stream work between `begin_load` and `commit`.
#[derive(Debug, Default)]
pub struct MediaSession {
    generation: u64,
    source: ActiveSource,
}

impl MediaSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> &ActiveSource {
        &self.source
    }

    /// Start a load; any previously issued token becomes stale.
    pub fn begin_load(&mut self) -> LoadToken {
        self.generation += 1;
        LoadToken {
            generation: self.generation,
        }
    }

    /// True if a later `begin_load` has superseded this token. Stale loads
    /// must stop acquiring resources and tear down whatever they hold.
    pub fn is_stale(&self, token: LoadToken) -> bool {
        token.generation != self.generation
    }

    /// Publish the loaded source. Returns false (and changes nothing) when
    /// the token is stale.
    pub fn commit(&mut self, token: LoadToken, source: ActiveSource) -> bool {
        if self.is_stale(token) {
            log::debug!(
                "[media] dropped stale commit gen={} current={}",
                token.generation,
                self.generation
            );
            return false;
        }
        self.source = source;
        true
    }

    /// Clear to the no-source idle state, invalidating in-flight loads.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.source = ActiveSource::None;
    }
}
