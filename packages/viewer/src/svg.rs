//! [`MapDocument`] over an SVG asset.
//!
//! Shapes are found with `scraper` by class (default `state`) and keyed by
//! their `id` attribute. Styles are kept beside the source and emitted as an
//! injected `<style>` element by [`SvgMapDocument::render`], so the asset
//! itself is never rewritten.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use scraper::{Html, Selector};

use crate::document::{MapDocument, MapDocumentError, ShapeStyle};

/// Class marking selectable shapes in the map asset.
pub const DEFAULT_SHAPE_CLASS: &str = "state";

#[derive(Debug, Clone, Default)]
struct Shape {
    style: Option<ShapeStyle>,
    tooltip: Option<String>,
    handlers: bool,
}

/// An SVG map, possibly not loaded yet.
#[derive(Debug, Clone)]
pub struct SvgMapDocument {
    shape_class: String,
    source: Option<String>,
    order: Vec<String>,
    shapes: BTreeMap<String, Shape>,
}

impl SvgMapDocument {
    /// Creates an empty document that becomes ready on [`Self::load`].
    #[must_use]
    pub fn new(shape_class: &str) -> Self {
        Self {
            shape_class: shape_class.to_owned(),
            source: None,
            order: Vec::new(),
            shapes: BTreeMap::new(),
        }
    }

    /// Parses `svg` into a ready document.
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if the asset has no `<svg>` root or the
    /// class does not form a valid selector.
    pub fn parse(svg: &str, shape_class: &str) -> Result<Self, MapDocumentError> {
        let mut doc = Self::new(shape_class);
        doc.load(svg)?;
        Ok(doc)
    }

    /// Reads and parses an asset from disk.
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path, shape_class: &str) -> Result<Self, MapDocumentError> {
        let svg = std::fs::read_to_string(path)?;
        log::info!("Loaded map asset from {}", path.display());
        Self::parse(&svg, shape_class)
    }

    /// Replaces the asset. Styles, tooltips, and handlers are dropped, so
    /// any registration must be released first.
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if the asset cannot be parsed; the
    /// document is left unchanged.
    pub fn load(&mut self, svg: &str) -> Result<(), MapDocumentError> {
        let order = scan_shape_ids(svg, &self.shape_class)?;
        log::debug!("Map asset has {} selectable shapes", order.len());
        self.shapes = order
            .iter()
            .map(|id| (id.clone(), Shape::default()))
            .collect();
        self.order = order;
        self.source = Some(svg.to_owned());
        Ok(())
    }

    /// Per-shape CSS for every styled shape.
    #[must_use]
    pub fn stylesheet(&self) -> String {
        let mut css = String::new();
        for id in &self.order {
            if let Some(style) = self.shapes.get(id).and_then(|s| s.style.as_ref()) {
                let _ = writeln!(css, "[id=\"{}\"] {{ {} }}", escape_css_string(id), style.to_css());
            }
        }
        css
    }

    /// The asset with the current stylesheet injected after the root tag.
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError::NotReady`] before [`Self::load`].
    pub fn render(&self) -> Result<String, MapDocumentError> {
        let source = self.source.as_deref().ok_or(MapDocumentError::NotReady)?;
        let insert_at = root_tag_end(source).ok_or(MapDocumentError::MissingRoot)?;

        let mut out = String::with_capacity(source.len() + 256);
        out.push_str(&source[..insert_at]);
        out.push_str("<style>\n");
        out.push_str(&self.stylesheet());
        out.push_str("</style>");
        out.push_str(&source[insert_at..]);
        Ok(out)
    }

    /// Tooltips of every shape that has one, in document order.
    #[must_use]
    pub fn tooltips(&self) -> Vec<(&str, &str)> {
        self.order
            .iter()
            .filter_map(|id| {
                self.shapes
                    .get(id)
                    .and_then(|s| s.tooltip.as_deref())
                    .map(|t| (id.as_str(), t))
            })
            .collect()
    }

    fn shape_mut(&mut self, id: &str) -> Result<&mut Shape, MapDocumentError> {
        self.shapes
            .get_mut(id)
            .ok_or_else(|| MapDocumentError::UnknownShape { id: id.to_owned() })
    }
}

impl MapDocument for SvgMapDocument {
    fn is_ready(&self) -> bool {
        self.source.is_some()
    }

    fn shape_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    fn style(&self, id: &str) -> Option<&ShapeStyle> {
        self.shapes.get(id).and_then(|s| s.style.as_ref())
    }

    fn set_style(&mut self, id: &str, style: ShapeStyle) -> Result<(), MapDocumentError> {
        self.shape_mut(id)?.style = Some(style);
        Ok(())
    }

    fn tooltip(&self, id: &str) -> Option<&str> {
        self.shapes.get(id).and_then(|s| s.tooltip.as_deref())
    }

    fn set_tooltip(&mut self, id: &str, html: Option<String>) -> Result<(), MapDocumentError> {
        self.shape_mut(id)?.tooltip = html;
        Ok(())
    }

    fn attach_handlers(&mut self, id: &str) -> Result<(), MapDocumentError> {
        if !self.is_ready() {
            return Err(MapDocumentError::NotReady);
        }
        self.shape_mut(id)?.handlers = true;
        Ok(())
    }

    fn detach_handlers(&mut self, id: &str) {
        if let Some(shape) = self.shapes.get_mut(id) {
            shape.handlers = false;
        }
    }

    fn has_handlers(&self, id: &str) -> bool {
        self.shapes.get(id).is_some_and(|s| s.handlers)
    }
}

/// Byte offset just past the `>` of the root `<svg ...>` start tag.
///
/// The XML declaration, processing instructions, comments, and doctype are
/// skipped, and a `>` inside a quoted attribute value does not close the tag.
fn root_tag_end(source: &str) -> Option<usize> {
    let mut pos = 0;
    while let Some(offset) = source[pos..].find('<') {
        let start = pos + offset;
        let rest = &source[start..];

        let skip_to = |terminator: &str| rest.find(terminator).map(|end| start + end + terminator.len());
        if rest.starts_with("<!--") {
            pos = skip_to("-->")?;
        } else if rest.starts_with("<?") {
            pos = skip_to("?>")?;
        } else if rest.starts_with("<!") {
            pos = skip_to(">")?;
        } else if rest.starts_with("<svg")
            && rest[4..]
                .chars()
                .next()
                .is_some_and(|c| c == '>' || c == '/' || c.is_ascii_whitespace())
        {
            let mut quote = None;
            for (i, c) in rest.char_indices().skip(4) {
                match (quote, c) {
                    (None, '"' | '\'') => quote = Some(c),
                    (Some(q), c) if c == q => quote = None,
                    (None, '>') => return Some(start + i + 1),
                    _ => {}
                }
            }
            return None;
        } else {
            pos = start + 1;
        }
    }
    None
}

/// Ids of the shapes carrying `class`, first occurrence wins.
fn scan_shape_ids(svg: &str, class: &str) -> Result<Vec<String>, MapDocumentError> {
    let document = Html::parse_fragment(svg);

    let root = Selector::parse("svg").unwrap_or_else(|_| unreachable!());
    if document.select(&root).next().is_none() {
        return Err(MapDocumentError::MissingRoot);
    }

    let selector_str = format!(".{class}");
    let selector = Selector::parse(&selector_str).map_err(|e| MapDocumentError::InvalidSelector {
        selector: selector_str.clone(),
        message: e.to_string(),
    })?;

    let mut seen = BTreeSet::new();
    let mut ids = Vec::new();
    for element in document.select(&selector) {
        match element.value().id() {
            Some(id) if !id.is_empty() => {
                if seen.insert(id.to_owned()) {
                    ids.push(id.to_owned());
                } else {
                    log::warn!("Duplicate shape id '{id}' in map asset, keeping the first");
                }
            }
            _ => log::debug!("Skipping selectable shape without an id"),
        }
    }
    Ok(ids)
}

fn escape_css_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
