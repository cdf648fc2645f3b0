use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use std::fmt;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Identity of a media node inside a backend document.
///
/// Backends must hand out a new id whenever they recreate a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Video,
    Audio,
}

/// Returned when a backend refuses to start playback (autoplay policy and the like)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("playback request rejected: {0}")]
pub struct PlayRejected(pub String);

/// An audio/video node rendered by a backend.
///
/// Handles are owned by the backend; controllers only keep weak references.
pub trait MediaElement: Send + Sync {
    fn id(&self) -> ElementId;
    fn kind(&self) -> ElementKind;

    /// MIME types of the declared `<source>` children, in document order
    fn source_types(&self) -> Vec<String>;

    /// Disable autoplay and looping and stretch the node over its frame
    fn prepare(&self);

    fn play(&self) -> Result<(), PlayRejected>;
    fn pause(&self);
    fn set_muted(&self, muted: bool);
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64);

    /// Raw duration as the node reports it (may be NaN or infinite)
    fn duration(&self) -> f64;
    fn is_ended(&self) -> bool;
    fn is_paused(&self) -> bool;

    /// Rendered client size in CSS pixels
    fn rendered_size(&self) -> (i32, i32);

    /// Draw the current frame into an RGBA8 raster of the given size
    fn capture_frame(&self, width: u32, height: u32) -> Option<Vec<u8>>;
}

pub type ElementRef = Arc<dyn MediaElement>;

/// Processing-graph node exposing an element's audio output
pub trait AudioTap: Send {
    fn disconnect(&mut self);
}

/// Shared audio graph owned by the manager
pub trait AudioContext: Send + Sync {
    fn create_media_source(&self, element: &ElementRef) -> Box<dyn AudioTap>;
}

/// Non-owning, identity-tracked reference to a backend media node
#[derive(Clone)]
pub struct BoundElement {
    id: ElementId,
    handle: Weak<dyn MediaElement>,
}

impl BoundElement {
    pub fn new(element: &ElementRef) -> Self {
        Self {
            id: element.id(),
            handle: Arc::downgrade(element),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The node, unless the backend has dropped it
    pub fn get(&self) -> Option<ElementRef> {
        self.handle.upgrade()
    }
}

impl fmt::Debug for BoundElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundElement")
            .field("id", &self.id)
            .field("alive", &(self.handle.strong_count() > 0))
            .finish()
    }
}

struct TapBinding {
    element: ElementId,
    tap: Box<dyn AudioTap>,
}

/// The element a controller is hooked to, plus the audio tap built for it.
///
/// The tap follows element identity: it is rebuilt only when a different
/// node is bound, and the old one is disconnected first.
#[derive(Default)]
pub(crate) struct ElementBinding {
    element: Option<BoundElement>,
    tap: Option<TapBinding>,
}

impl ElementBinding {
    /// Bind `element`. Returns true if a new audio tap was created.
    pub(crate) fn bind(&mut self, element: &ElementRef, audio: &dyn AudioContext) -> bool {
        let id = element.id();
        self.element = Some(BoundElement::new(element));

        if self.tap.as_ref().is_some_and(|binding| binding.element == id) {
            trace!(element = %id, "element unchanged, keeping audio tap");
            return false;
        }

        if let Some(mut old) = self.tap.take() {
            debug!(old = %old.element, new = %id, "disconnecting stale audio tap");
            old.tap.disconnect();
        }

        self.tap = Some(TapBinding {
            element: id,
            tap: audio.create_media_source(element),
        });
        true
    }

    /// Whether `element` would need a new tap
    pub(crate) fn is_new(&self, element: &ElementRef) -> bool {
        self.tap
            .as_ref()
            .map_or(true, |binding| binding.element != element.id())
    }

    /// Drop the element reference. The tap stays attached to its node.
    pub(crate) fn release(&mut self) {
        self.element = None;
    }

    pub(crate) fn bound(&self) -> Option<&BoundElement> {
        self.element.as_ref()
    }

    pub(crate) fn element(&self) -> Option<ElementRef> {
        self.element.as_ref().and_then(BoundElement::get)
    }

    pub(crate) fn is_bound_to(&self, id: ElementId) -> bool {
        self.element.as_ref().is_some_and(|bound| bound.id() == id)
    }
}

impl Drop for ElementBinding {
    fn drop(&mut self) {
        if let Some(mut binding) = self.tap.take() {
            binding.tap.disconnect();
        }
    }
}

/// Content length: seconds, or unbounded for live content
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaDuration {
    Finite(f64),
    Live,
}

impl MediaDuration {
    pub fn seconds(self) -> Option<f64> {
        match self {
            MediaDuration::Finite(seconds) => Some(seconds),
            MediaDuration::Live => None,
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, MediaDuration::Live)
    }

    /// Numeric form used by the manager: live content is -1
    pub fn as_f64(self) -> f64 {
        self.seconds().unwrap_or(-1.0)
    }
}

/// A captured video frame, PNG encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub png: Bytes,
}

impl Screenshot {
    /// Encode an RGBA8 raster
    pub fn encode(width: u32, height: u32, rgba: &[u8]) -> Result<Self, png::EncodingError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(rgba)?;
            writer.finish()?;
        }

        Ok(Self {
            width,
            height,
            png: Bytes::from(out),
        })
    }

    /// Grab the element's current frame at its rendered size
    pub fn capture(element: &ElementRef) -> Option<Self> {
        let (width, height) = element.rendered_size();
        if width <= 0 || height <= 0 {
            return None;
        }

        let (width, height) = (width as u32, height as u32);
        let rgba = element.capture_frame(width, height)?;

        match Self::encode(width, height, &rgba) {
            Ok(shot) => Some(shot),
            Err(e) => {
                warn!(element = %element.id(), "failed to encode screenshot: {}", e);
                None
            }
        }
    }

    pub fn data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&self.png)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_numeric_form() {
        assert_eq!(MediaDuration::Finite(12.5).as_f64(), 12.5);
        assert_eq!(MediaDuration::Live.as_f64(), -1.0);
        assert!(MediaDuration::Live.is_live());
        assert_eq!(MediaDuration::Live.seconds(), None);
    }

    #[test]
    fn test_screenshot_encoding() {
        let rgba = vec![0u8; 4 * 3 * 2];
        let shot = Screenshot::encode(3, 2, &rgba).unwrap();
        assert_eq!((shot.width, shot.height), (3, 2));
        assert_eq!(&shot.png[1..4], b"PNG");
        assert!(shot.data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_screenshot_rejects_short_raster() {
        assert!(Screenshot::encode(4, 4, &[0u8; 8]).is_err());
    }
}
