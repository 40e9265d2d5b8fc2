//! Boundary to the embedded vector map.
//!
//! The controller never touches the asset directly. It only needs to know
//! when the asset is ready, enumerate its selectable shapes, read and write
//! each shape's style and tooltip, and attach or detach pointer handlers.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Errors raised by a [`MapDocument`].
#[derive(Debug, thiserror::Error)]
pub enum MapDocumentError {
    /// The document has not been parsed yet.
    #[error("Map document is not ready")]
    NotReady,

    /// No selectable shape has this id.
    #[error("Unknown shape: {id}")]
    UnknownShape {
        /// The requested id.
        id: String,
    },

    /// The asset has no `<svg>` root element.
    #[error("Map asset has no <svg> root element")]
    MissingRoot,

    /// The shape selector could not be parsed.
    #[error("Invalid shape selector '{selector}': {message}")]
    InvalidSelector {
        /// The selector as built from the configured class.
        selector: String,
        /// Parser message.
        message: String,
    },

    /// Reading the asset from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Visual style of one shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    pub fill: String,
    pub filter: Option<String>,
    pub transform: Option<String>,
    pub z_index: Option<i32>,
    pub cursor: Option<String>,
    pub transition: Option<String>,
}

impl ShapeStyle {
    /// CSS declarations for this style, without braces.
    #[must_use]
    pub fn to_css(&self) -> String {
        let mut css = format!("fill: {};", self.fill);
        let mut push = |name: &str, value: &str| {
            let _ = write!(css, " {name}: {value};");
        };
        push("filter", self.filter.as_deref().unwrap_or("none"));
        if let Some(transform) = &self.transform {
            push("transform", transform);
            push("transform-box", "fill-box");
            push("transform-origin", "center");
        }
        if let Some(z_index) = self.z_index {
            push("z-index", &z_index.to_string());
        }
        if let Some(cursor) = &self.cursor {
            push("cursor", cursor);
        }
        if let Some(transition) = &self.transition {
            push("transition", transition);
        }
        css
    }
}

/// Pointer interaction kinds the controller reacts to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PointerEventKind {
    Enter,
    Leave,
    Click,
}

/// A pointer event on one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub shape_id: String,
}

impl PointerEvent {
    #[must_use]
    pub fn new(kind: PointerEventKind, shape_id: &str) -> Self {
        Self {
            kind,
            shape_id: shape_id.to_owned(),
        }
    }
}

/// A parsed vector map with selectable shapes.
pub trait MapDocument: Send {
    /// Returns `true` once the internal structure is parsed.
    fn is_ready(&self) -> bool;

    /// Ids of every selectable shape, in document order. Empty until ready.
    fn shape_ids(&self) -> Vec<String>;

    fn style(&self, id: &str) -> Option<&ShapeStyle>;

    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if the shape does not exist.
    fn set_style(&mut self, id: &str, style: ShapeStyle) -> Result<(), MapDocumentError>;

    fn tooltip(&self, id: &str) -> Option<&str>;

    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if the shape does not exist.
    fn set_tooltip(&mut self, id: &str, html: Option<String>) -> Result<(), MapDocumentError>;

    /// Starts routing pointer events for `id` to the controller.
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if the shape does not exist or the
    /// document is not ready.
    fn attach_handlers(&mut self, id: &str) -> Result<(), MapDocumentError>;

    /// Stops routing pointer events for `id`. Unknown ids are ignored.
    fn detach_handlers(&mut self, id: &str);

    fn has_handlers(&self, id: &str) -> bool;
}

/// The set of shapes with attached handlers.
///
/// Created by [`HandlerRegistration::register`] and released with
/// [`HandlerRegistration::release`]; the owner must release it before
/// registering again or dropping the document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct HandlerRegistration {
    shape_ids: Vec<String>,
}

impl HandlerRegistration {
    /// Attaches handlers to every shape in `doc`.
    ///
    /// On failure, handlers attached so far are detached again.
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if any shape cannot be bound.
    pub fn register<D: MapDocument + ?Sized>(doc: &mut D) -> Result<Self, MapDocumentError> {
        if !doc.is_ready() {
            return Err(MapDocumentError::NotReady);
        }
        let mut registration = Self::default();
        for id in doc.shape_ids() {
            if let Err(e) = doc.attach_handlers(&id) {
                registration.release(doc);
                return Err(e);
            }
            registration.shape_ids.push(id);
        }
        log::debug!("Attached handlers to {} shapes", registration.len());
        Ok(registration)
    }

    /// Detaches every handler this registration attached.
    pub fn release<D: MapDocument + ?Sized>(self, doc: &mut D) {
        for id in &self.shape_ids {
            doc.detach_handlers(id);
        }
        log::debug!("Detached handlers from {} shapes", self.shape_ids.len());
    }

    #[must_use]
    pub fn covers(&self, id: &str) -> bool {
        self.shape_ids.iter().any(|s| s == id)
    }

    #[must_use]
    pub fn shape_ids(&self) -> &[String] {
        &self.shape_ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shape_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape_ids.is_empty()
    }
}
