//! Typed helpers for layout elements.
//!
//! Pages, regions, lines, words and glyphs are plain tree nodes; these
//! helpers add the id conventions and the `Coords`/`Baseline`/`TextEquiv`
//! children layout tools expect.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::error::{LayoutError, Result};
use crate::geometry::baseline::synthesize_stripe;
use crate::geometry::points::{ParseMode, format_points, parse_points};
use crate::utils::Point;

use super::custom::CustomAttr;
use super::tree::{ElementKind, InsertMode, LayoutDocument, NodeId};

/// Upper bound on the counter tried when synthesizing an element id.
const MAX_ID_ATTEMPTS: usize = 100_000;

static LEADING_NON_ALPHA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^a-zA-Z]*").expect("valid regex"));
static INVALID_ID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("valid regex"));

/// Reading direction of text in a region or line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadingDirection {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl ReadingDirection {
    /// Value of the `readingDirection` attribute.
    pub fn attr_value(self) -> &'static str {
        match self {
            ReadingDirection::LeftToRight => "left-to-right",
            ReadingDirection::RightToLeft => "right-to-left",
            ReadingDirection::TopToBottom => "top-to-bottom",
            ReadingDirection::BottomToTop => "bottom-to-top",
        }
    }

    /// Short code used inside the `custom` attribute.
    pub fn code(self) -> &'static str {
        match self {
            ReadingDirection::LeftToRight => "ltr",
            ReadingDirection::RightToLeft => "rtl",
            ReadingDirection::TopToBottom => "ttb",
            ReadingDirection::BottomToTop => "btt",
        }
    }

    pub fn from_attr_value(value: &str) -> Option<Self> {
        match value {
            "left-to-right" => Some(ReadingDirection::LeftToRight),
            "right-to-left" => Some(ReadingDirection::RightToLeft),
            "top-to-bottom" => Some(ReadingDirection::TopToBottom),
            "bottom-to-top" => Some(ReadingDirection::BottomToTop),
            _ => None,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ltr" => Some(ReadingDirection::LeftToRight),
            "rtl" => Some(ReadingDirection::RightToLeft),
            "ttb" => Some(ReadingDirection::TopToBottom),
            "btt" => Some(ReadingDirection::BottomToTop),
            _ => None,
        }
    }
}

fn expect_kind(doc: &LayoutDocument, node: NodeId, kind: ElementKind, op: &str) -> Result<()> {
    doc.check_alive(node)?;
    if doc.kind(node) != kind {
        return Err(LayoutError::validation(format!(
            "{op}: expected a {} element, got {}",
            kind.name(),
            doc.kind(node).name()
        )));
    }
    Ok(())
}

fn parse_number(value: &str, what: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| LayoutError::validation(format!("invalid {what}: {value:?}")))
}

impl LayoutDocument {
    // ==================== Pages ====================

    /// Appends a page referencing an image of the given size.
    pub fn add_page(&mut self, image: &str, width: u32, height: u32) -> Result<NodeId> {
        if width == 0 || height == 0 {
            return Err(LayoutError::validation(format!(
                "page size must be positive, got {width}x{height}"
            )));
        }
        let root = self.root();
        let page = self.create_node(ElementKind::Page, None, root, InsertMode::Child)?;
        self.set_attr(page, "imageFilename", image)?;
        self.set_attr(page, "imageWidth", &width.to_string())?;
        self.set_attr(page, "imageHeight", &height.to_string())?;
        Ok(page)
    }

    /// Pages in document order.
    pub fn pages(&self) -> Vec<NodeId> {
        self.children_of_kind(self.root(), ElementKind::Page)
    }

    /// Zero based number of the page containing `node`.
    pub fn page_number(&self, node: NodeId) -> Option<usize> {
        let page = self.closest(ElementKind::Page, node)?;
        self.pages().iter().position(|&p| p == page)
    }

    /// Declared `(width, height)` of a page.
    pub fn page_size(&self, page: NodeId) -> Result<(u32, u32)> {
        expect_kind(self, page, ElementKind::Page, "page_size")?;
        let dim = |name: &str| -> Result<u32> {
            let raw = self.attr(page, name).ok_or_else(|| {
                LayoutError::validation(format!("page is missing the {name} attribute"))
            })?;
            raw.trim()
                .parse::<u32>()
                .map_err(|_| LayoutError::validation(format!("invalid {name}: {raw:?}")))
        };
        Ok((dim("imageWidth")?, dim("imageHeight")?))
    }

    pub fn image_filename(&self, page: NodeId) -> Result<&str> {
        expect_kind(self, page, ElementKind::Page, "image_filename")?;
        self.attr(page, "imageFilename")
            .ok_or_else(|| LayoutError::validation("page is missing the imageFilename attribute"))
    }

    /// Image file name without directory and extension, spaces replaced by
    /// underscores. Used as the prefix of crop names.
    pub fn image_base(&self, page: NodeId) -> Result<String> {
        let filename = self.image_filename(page)?;
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        Ok(stem.replace(' ', "_"))
    }

    /// Page orientation angle in degrees (0 when unset).
    pub fn page_orientation(&self, page: NodeId) -> Result<f64> {
        expect_kind(self, page, ElementKind::Page, "page_orientation")?;
        self.attr(page, "orientation")
            .map_or(Ok(0.0), |v| parse_number(v, "page orientation"))
    }

    // ==================== Text elements ====================

    fn synthesize_id(&self, parent: NodeId, kind: ElementKind, prefix: &str) -> Result<String> {
        let mut n = self.children_of_kind(parent, kind).len();
        loop {
            n += 1;
            let candidate = format!("{prefix}{n}");
            if self.find_by_id(&candidate).is_none() {
                return Ok(candidate);
            }
            if n > MAX_ID_ATTEMPTS {
                return Err(LayoutError::validation(format!(
                    "unable to find a free {} id with prefix {prefix:?}",
                    kind.name()
                )));
            }
        }
    }

    fn add_text_element(
        &mut self,
        parent: NodeId,
        parent_kind: ElementKind,
        kind: ElementKind,
        suffix: &str,
        id: Option<&str>,
        before_id: Option<&str>,
    ) -> Result<NodeId> {
        expect_kind(self, parent, parent_kind, kind.name())?;

        let id = match id {
            Some(id) => id.to_string(),
            None => {
                let prefix = if parent_kind == ElementKind::Page {
                    suffix.to_string()
                } else {
                    let pid = self.id(parent).ok_or_else(|| {
                        LayoutError::validation(format!(
                            "expected the {} to have an id attribute",
                            parent_kind.name()
                        ))
                    })?;
                    format!("{pid}{suffix}")
                };
                self.synthesize_id(parent, kind, &prefix)?
            }
        };

        let node = match before_id {
            Some(before) => {
                let sibling = self
                    .children(parent)
                    .iter()
                    .copied()
                    .find(|&c| self.id(c) == Some(before))
                    .ok_or_else(|| {
                        LayoutError::validation(format!("unable to find id={before}"))
                    })?;
                self.create_node(kind, Some(&id), sibling, InsertMode::PrevSibling)?
            }
            None => self.create_node(kind, Some(&id), parent, InsertMode::Child)?,
        };
        debug!(id = %id, kind = kind.name(), "added element");
        Ok(node)
    }

    /// Adds a TextRegion to a page. Without an id one of the form `t{n}` is
    /// chosen.
    pub fn add_text_region(
        &mut self,
        page: NodeId,
        id: Option<&str>,
        before_id: Option<&str>,
    ) -> Result<NodeId> {
        self.add_text_element(
            page,
            ElementKind::Page,
            ElementKind::TextRegion,
            "t",
            id,
            before_id,
        )
    }

    /// Adds a TextLine to a region, with a default id `{region}_l{n}`.
    pub fn add_text_line(
        &mut self,
        region: NodeId,
        id: Option<&str>,
        before_id: Option<&str>,
    ) -> Result<NodeId> {
        self.add_text_element(
            region,
            ElementKind::TextRegion,
            ElementKind::TextLine,
            "_l",
            id,
            before_id,
        )
    }

    /// Adds a Word to a line, with a default id `{line}_w{n}`.
    pub fn add_word(
        &mut self,
        line: NodeId,
        id: Option<&str>,
        before_id: Option<&str>,
    ) -> Result<NodeId> {
        self.add_text_element(
            line,
            ElementKind::TextLine,
            ElementKind::Word,
            "_w",
            id,
            before_id,
        )
    }

    /// Adds a Glyph to a word, with a default id `{word}_g{n}`.
    pub fn add_glyph(
        &mut self,
        word: NodeId,
        id: Option<&str>,
        before_id: Option<&str>,
    ) -> Result<NodeId> {
        self.add_text_element(
            word,
            ElementKind::Word,
            ElementKind::Glyph,
            "_g",
            id,
            before_id,
        )
    }

    // ==================== Geometry ====================

    fn geometry_child(&self, node: NodeId, kind: ElementKind) -> Option<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|&c| self.kind(c) == kind)
    }

    /// Replaces the geometry child of `node`. The new points are checked and
    /// formatted before the old child is removed.
    fn replace_geometry(
        &mut self,
        node: NodeId,
        kind: ElementKind,
        points: &[Point],
        min_points: usize,
    ) -> Result<NodeId> {
        self.check_alive(node)?;
        if !self.kind(node).is_text_element() && self.kind(node) != ElementKind::Page {
            return Err(LayoutError::validation(format!(
                "{} elements cannot hold {}",
                self.kind(node).name(),
                kind.name()
            )));
        }
        if points.len() < min_points {
            return Err(LayoutError::validation(format!(
                "{} needs at least {min_points} points, got {}",
                kind.name(),
                points.len()
            )));
        }
        if points.iter().any(|p| !p.0.is_finite() || !p.1.is_finite()) {
            return Err(LayoutError::validation(format!(
                "{} points must be finite",
                kind.name()
            )));
        }
        let formatted = format_points(points, false);

        if let Some(old) = self.geometry_child(node, kind) {
            self.remove_node(old)?;
        }

        // Coords goes first, Baseline right after it
        let anchor = self
            .children(node)
            .iter()
            .copied()
            .find(|&c| kind == ElementKind::Coords || self.kind(c) != ElementKind::Coords);
        let child = match anchor {
            Some(a) => self.create_node(kind, None, a, InsertMode::PrevSibling)?,
            None => self.create_node(kind, None, node, InsertMode::Child)?,
        };
        self.set_attr(child, "points", &formatted)?;
        Ok(child)
    }

    /// Sets the boundary polygon of an element.
    pub fn set_coords(&mut self, node: NodeId, points: &[Point]) -> Result<NodeId> {
        self.replace_geometry(node, ElementKind::Coords, points, 3)
    }

    /// Sets the baseline of a TextLine.
    pub fn set_baseline(&mut self, line: NodeId, points: &[Point]) -> Result<NodeId> {
        expect_kind(self, line, ElementKind::TextLine, "set_baseline")?;
        self.replace_geometry(line, ElementKind::Baseline, points, 2)
    }

    /// Replaces the Coords of a TextLine with the polystripe of its baseline.
    pub fn set_polystripe(&mut self, line: NodeId, height: f64, offset: f64) -> Result<NodeId> {
        let baseline = self.baseline(line)?.ok_or_else(|| {
            LayoutError::validation("set_polystripe: line has no Baseline")
        })?;
        let coords = synthesize_stripe(&baseline, height, offset)?;
        self.set_coords(line, &coords)
    }

    /// Points of a `Coords` or `Baseline` element, or of the `Coords` child
    /// of any other element.
    pub fn points(&self, node: NodeId) -> Result<Vec<Point>> {
        self.check_alive(node)?;
        let holder = match self.kind(node) {
            ElementKind::Coords | ElementKind::Baseline => node,
            _ => self.geometry_child(node, ElementKind::Coords).ok_or_else(|| {
                LayoutError::validation(format!(
                    "{} element has no Coords",
                    self.kind(node).name()
                ))
            })?,
        };
        let raw = self.attr(holder, "points").ok_or_else(|| {
            LayoutError::validation(format!(
                "{} element is missing the points attribute",
                self.kind(holder).name()
            ))
        })?;
        parse_points(raw, ParseMode::Strict)
    }

    /// Coords points of an element, None if it has no Coords child.
    pub fn coords(&self, node: NodeId) -> Result<Option<Vec<Point>>> {
        self.check_alive(node)?;
        self.geometry_child(node, ElementKind::Coords)
            .map(|c| self.points(c))
            .transpose()
    }

    /// Baseline points of a TextLine, None if it has no Baseline.
    pub fn baseline(&self, line: NodeId) -> Result<Option<Vec<Point>>> {
        expect_kind(self, line, ElementKind::TextLine, "baseline")?;
        self.geometry_child(line, ElementKind::Baseline)
            .map(|b| self.points(b))
            .transpose()
    }

    // ==================== Text ====================

    /// Sets (replacing any existing) the recognized text of an element.
    pub fn set_text_equiv(&mut self, node: NodeId, text: &str, conf: Option<f64>) -> Result<NodeId> {
        self.check_alive(node)?;
        let old = self.children_of_kind(node, ElementKind::TextEquiv);
        self.remove_nodes(&old)?;

        let equiv = self.create_node(ElementKind::TextEquiv, None, node, InsertMode::Child)?;
        if let Some(conf) = conf {
            self.set_attr(equiv, "conf", &conf.to_string())?;
        }
        let unicode = self.create_node(ElementKind::Unicode, None, equiv, InsertMode::Child)?;
        self.set_text(unicode, text)?;
        Ok(equiv)
    }

    /// Recognized text of an element.
    pub fn text_equiv(&self, node: NodeId) -> Option<&str> {
        let equiv = self.geometry_child(node, ElementKind::TextEquiv)?;
        let unicode = self.geometry_child(equiv, ElementKind::Unicode)?;
        self.text(unicode)
    }

    // ==================== Orientation ====================

    /// Parsed `custom` attribute of an element.
    pub fn custom(&self, node: NodeId) -> Result<Option<CustomAttr>> {
        self.check_alive(node)?;
        self.attr(node, "custom").map(CustomAttr::parse).transpose()
    }

    pub fn set_custom(&mut self, node: NodeId, custom: &CustomAttr) -> Result<()> {
        if custom.is_empty() {
            self.remove_attr(node, "custom");
            Ok(())
        } else {
            self.set_attr(node, "custom", &custom.to_string())
        }
    }

    /// Sets the rotation angle in degrees. Regions store it in the
    /// `readingOrientation` attribute and lines in their `custom` attribute.
    /// An angle of 0 clears it.
    pub fn set_rotation(&mut self, node: NodeId, degrees: f64) -> Result<()> {
        self.check_alive(node)?;
        match self.kind(node) {
            ElementKind::TextRegion => {
                if degrees == 0.0 {
                    self.remove_attr(node, "readingOrientation");
                    Ok(())
                } else {
                    self.set_attr(node, "readingOrientation", &degrees.to_string())
                }
            }
            ElementKind::TextLine => {
                let mut custom = self.custom(node)?.unwrap_or_default();
                if degrees == 0.0 {
                    custom.remove("readingOrientation");
                } else {
                    custom.set("readingOrientation", &degrees.to_string());
                }
                self.set_custom(node, &custom)
            }
            other => Err(LayoutError::validation(format!(
                "set_rotation: not possible for {} elements",
                other.name()
            ))),
        }
    }

    /// Rotation angle in degrees of a TextLine or TextRegion, 0 if unset.
    ///
    /// A line without its own rotation inherits the one of its region.
    pub fn rotation(&self, node: NodeId) -> Result<f64> {
        self.check_alive(node)?;
        let mut target = node;
        if self.kind(node) == ElementKind::TextLine {
            if let Some(r) = self
                .custom(node)?
                .map(|c| c.reading_orientation())
                .transpose()?
                .flatten()
            {
                return Ok(r);
            }
            match self.parent(node) {
                Some(p) => target = p,
                None => return Ok(0.0),
            }
        }
        self.attr(target, "readingOrientation")
            .map_or(Ok(0.0), |v| parse_number(v, "readingOrientation"))
    }

    /// Sets the reading direction of a TextRegion (attribute) or TextLine
    /// (`custom`). Left-to-right is the default and clears the value.
    pub fn set_reading_direction(&mut self, node: NodeId, dir: ReadingDirection) -> Result<()> {
        self.check_alive(node)?;
        match self.kind(node) {
            ElementKind::TextRegion => {
                if dir == ReadingDirection::LeftToRight {
                    self.remove_attr(node, "readingDirection");
                    Ok(())
                } else {
                    self.set_attr(node, "readingDirection", dir.attr_value())
                }
            }
            ElementKind::TextLine => {
                let mut custom = self.custom(node)?.unwrap_or_default();
                if dir == ReadingDirection::LeftToRight {
                    custom.remove("readingDirection");
                } else {
                    custom.set("readingDirection", dir.code());
                }
                self.set_custom(node, &custom)
            }
            other => Err(LayoutError::validation(format!(
                "set_reading_direction: not possible for {} elements",
                other.name()
            ))),
        }
    }

    /// Reading direction of a TextLine or TextRegion, left-to-right if unset.
    pub fn reading_direction(&self, node: NodeId) -> Result<ReadingDirection> {
        self.check_alive(node)?;
        let mut target = node;
        if self.kind(node) == ElementKind::TextLine {
            if let Some(d) = self
                .custom(node)?
                .map(|c| c.reading_direction())
                .transpose()?
                .flatten()
            {
                return Ok(d);
            }
            match self.parent(node) {
                Some(p) => target = p,
                None => return Ok(ReadingDirection::default()),
            }
        }
        match self.attr(target, "readingDirection") {
            None => Ok(ReadingDirection::default()),
            Some(v) => ReadingDirection::from_attr_value(v).ok_or_else(|| {
                LayoutError::validation(format!("invalid readingDirection: {v:?}"))
            }),
        }
    }

    /// x-height in pixels from the `custom` attribute.
    pub fn x_height(&self, node: NodeId) -> Result<Option<f64>> {
        Ok(self
            .custom(node)?
            .map(|c| c.x_height())
            .transpose()?
            .flatten())
    }

    /// Fitted parallelogram stored in the `fpgram` attribute of the Coords
    /// child, None if there is no Coords or it carries no parallelogram.
    pub fn fpgram(&self, node: NodeId) -> Result<Option<Vec<Point>>> {
        self.check_alive(node)?;
        self.geometry_child(node, ElementKind::Coords)
            .and_then(|c| self.attr(c, "fpgram"))
            .map(|raw| parse_points(raw, ParseMode::Strict))
            .transpose()
    }

    // ==================== Ids ====================

    /// Checks that no id is used twice, logging every duplicate.
    pub fn unique_ids(&self) -> bool {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut unique = true;
        for n in self.descendants(self.root()) {
            if let Some(id) = self.id(n) {
                if !seen.insert(id) {
                    warn!(id, "duplicate id");
                    unique = false;
                }
            }
        }
        unique
    }

    /// Strips the image base name prefix from region and line ids of a page
    /// and replaces characters outside `[a-zA-Z0-9_-]` with `_`. The previous
    /// id is kept in `orig-id`. Returns the number of ids changed.
    pub fn simplify_ids(&mut self, page: NodeId) -> Result<usize> {
        let base = self.image_base(page)?;
        let targets: Vec<NodeId> = self
            .descendants(page)
            .into_iter()
            .filter(|&n| {
                matches!(
                    self.kind(n),
                    ElementKind::TextRegion | ElementKind::TextLine
                )
            })
            .collect();

        let mut simplified = 0;
        for node in targets {
            let Some(id) = self.id(node).map(str::to_string) else {
                continue;
            };
            let Some(stripped) = id.strip_prefix(base.as_str()) else {
                continue;
            };
            let trimmed = LEADING_NON_ALPHA.replace(stripped, "");
            if trimmed.is_empty() {
                continue;
            }
            let new_id = INVALID_ID_CHARS.replace_all(&trimmed, "_").into_owned();
            if self.find_by_id(&new_id).is_some() {
                warn!(id = %id, new_id = %new_id, "simplified id already in use, keeping original");
                continue;
            }
            self.set_attr(node, "orig-id", &id)?;
            self.set_attr(node, "id", &new_id)?;
            simplified += 1;
        }
        Ok(simplified)
    }
}
