use std::cmp::Ordering;

use crate::media::MediaKind;

/// One playable entry. `label` keeps the folder context for display, `url`
/// is the fully encoded fetchable path.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaylistEntry {
    pub kind: MediaKind,
    pub label: String,
    pub url: String,
}

/// Classify a path by extension. `None` means not playable.
pub fn kind_from_ext(path: &str) -> Option<MediaKind> {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "mp3" | "wav" | "ogg" | "m4a" | "flac" | "aac" => Some(MediaKind::Audio),
        "mp4" | "webm" | "ogv" | "mov" | "m4v" => Some(MediaKind::Video),
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" => Some(MediaKind::Image),
        "m3u8" => Some(MediaKind::Hls),
        "mpd" => Some(MediaKind::Dash),
        _ => None,
    }
}

/// Parse a unix `tree`-style listing into relative file paths. Directory
/// lines have no dot in the name; file lines end in an extension. Depth is
/// the number of `│` rail characters in the branch prefix.
pub fn parse_tree(text: &str) -> Vec<String> {
    let mut files = Vec::new();
    let mut stack: Vec<Option<String>> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim_end_matches('\r').trim_end();
        if line.is_empty() {
            continue;
        }
        let Some((prefix, name)) = split_branch(line) else {
            continue;
        };
        let depth = prefix.chars().filter(|&c| c == '│').count();
        let name = name.trim();

        if is_file_name(name) {
            let mut parts: Vec<&str> = stack
                .iter()
                .take(depth + 1)
                .filter_map(|d| d.as_deref())
                .collect();
            parts.push(name);
            files.push(parts.join("/"));
        } else if !name.contains('.') {
            if stack.len() <= depth {
                stack.resize(depth + 1, None);
            }
            stack[depth] = Some(name.to_string());
            stack.truncate(depth + 1);
        }
    }
    files
}

fn split_branch(line: &str) -> Option<(&str, &str)> {
    for marker in ["├── ", "└── "] {
        if let Some(pos) = line.find(marker) {
            let prefix = &line[..pos];
            if prefix.chars().all(|c| c.is_whitespace() || c == '│') {
                return Some((prefix, &line[pos + marker.len()..]));
            }
        }
    }
    None
}

fn is_file_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Percent-encode one path segment the way `encodeURIComponent` does, so
/// spaces and non-ASCII names survive both `fetch` and media element URLs.
fn encode_segment(seg: &str) -> String {
    let mut out = String::with_capacity(seg.len());
    for b in seg.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => out.push(b as char),
            b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')' => out.push(b as char),
            _ => {
                out.push('%');
                out.push_str(&format!("{b:02X}"));
            }
        }
    }
    out
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn kind_rank(kind: MediaKind) -> u8 {
    match kind {
        MediaKind::Hls => 0,
        MediaKind::Dash => 1,
        MediaKind::Video => 2,
        MediaKind::Image => 3,
        MediaKind::Audio => 4,
        MediaKind::Webcam => 5,
    }
}

/// Case-insensitive compare that orders digit runs numerically, so
/// `track2` sorts before `track10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ca = a.chars().peekable();
    let mut cb = b.chars().peekable();
    loop {
        match (ca.peek().copied(), cb.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let na = take_number(&mut ca);
                    let nb = take_number(&mut cb);
                    match na.cmp(&nb) {
                        Ordering::Equal => {}
                        ord => return ord,
                    }
                } else {
                    let (lx, ly) = (
                        x.to_lowercase().next().unwrap_or(x),
                        y.to_lowercase().next().unwrap_or(y),
                    );
                    match lx.cmp(&ly) {
                        Ordering::Equal => {
                            ca.next();
                            cb.next();
                        }
                        ord => return ord,
                    }
                }
            }
        }
    }
}

fn take_number(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u64 {
    let mut n: u64 = 0;
    while let Some(c) = it.peek().copied() {
        if let Some(d) = c.to_digit(10) {
            n = n.saturating_mul(10).saturating_add(d as u64);
            it.next();
        } else {
            break;
        }
    }
    n
}

/// Build the playable list: classify, encode, then order streaming formats
/// first, media kinds after, natural-alphabetical within each kind.
pub fn build_playlist(files: &[String], base_path: &str) -> Vec<PlaylistEntry> {
    let base = if base_path == "." {
        String::new()
    } else {
        format!("{}/", base_path.trim_end_matches('/'))
    };
    let mut entries: Vec<PlaylistEntry> = files
        .iter()
        .filter_map(|rel| {
            let kind = kind_from_ext(rel)?;
            Some(PlaylistEntry {
                kind,
                label: rel.clone(),
                url: format!("{base}{}", encode_path(rel)),
            })
        })
        .collect();
    entries.sort_by(|a, b| {
        kind_rank(a.kind)
            .cmp(&kind_rank(b.kind))
            .then_with(|| natural_cmp(&a.label, &b.label))
    });
    entries
}

/// Current entries plus the cursor, with wrap-around stepping.
#[derive(Debug, Default)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
    index: usize,
    /// Loop the current entry instead of auto-advancing at track end.
    pub loop_current: bool,
}

impl Playlist {
    pub fn from_tree(text: &str, base_path: &str) -> Self {
        let files = parse_tree(text);
        let entries = build_playlist(&files, base_path);
        if entries.is_empty() {
            log::warn!("[playlist] tree parsed but no playable media found");
        } else {
            log::info!("[playlist] {} entries", entries.len());
        }
        Self {
            entries,
            index: 0,
            loop_current: false,
        }
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&PlaylistEntry> {
        self.entries.get(self.index)
    }

    /// Jump to an absolute index, clamped into range. Returns the entry.
    pub fn select(&mut self, index: usize) -> Option<&PlaylistEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.index = index.min(self.entries.len() - 1);
        self.current()
    }

    pub fn next(&mut self) -> Option<&PlaylistEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.entries.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<&PlaylistEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.index = (self.index + self.entries.len() - 1) % self.entries.len();
        self.current()
    }
}
