//! PPTX package reader producing positioned shape trees.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use timeline_core::{
    BBox, Deck, Error, Paragraph, Result, Shape, ShapeType, Slide, TextFrame, TextRun,
};
use zip::result::ZipError;
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Slide size used when `presentation.xml` declares none (10in x 7.5in).
const DEFAULT_SLIDE_SIZE: (f64, f64) = (9_144_000.0, 6_858_000.0);

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Open and parse a PPTX file; the path becomes the deck's source.
    pub fn open(&self, path: &Path) -> Result<Deck> {
        let file = File::open(path)?;
        self.parse(BufReader::new(file), &path.display().to_string())
    }

    /// Parse a PPTX file from a reader.
    pub fn parse<R: Read + Seek>(&self, reader: R, source: &str) -> Result<Deck> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let presentation_xml = self.read_file_from_archive(&mut archive, PRESENTATION_PART)?;
        let info = parse_presentation_xml(&presentation_xml)?;
        let (width, height) = info.slide_size.unwrap_or(DEFAULT_SLIDE_SIZE);

        let mut deck = Deck::new(source, width, height);

        let slide_order = self.get_slide_order(&mut archive, &info.slide_rids)?;
        log::debug!("{}: {} slides, {}x{}", source, slide_order.len(), width, height);

        let mut layouts: HashMap<String, PlaceholderPositions> = HashMap::new();
        for slide_path in &slide_order {
            let content = self.read_file_from_archive(&mut archive, slide_path)?;
            let inherited = self.layout_placeholders(&mut archive, slide_path, &mut layouts)?;
            deck.add_slide(parse_slide_xml(&content, &inherited));
        }

        Ok(deck)
    }

    /// Get the ordered list of slide paths.
    ///
    /// Uses the `sldIdLst` order from `presentation.xml`, resolved through the
    /// presentation relationships. Without a list, slide relationships are
    /// ordered by the number in their id or target.
    fn get_slide_order<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_rids: &[String],
    ) -> Result<Vec<String>> {
        let rels_path = "ppt/_rels/presentation.xml.rels";
        let rels_content = self.read_file_from_archive(archive, rels_path)?;
        let relationships = parse_relationships(&rels_content)?;

        let slide_targets: HashMap<&str, &str> = relationships
            .iter()
            .filter(|r| is_slide_relationship(&r.rel_type))
            .map(|r| (r.id.as_str(), r.target.as_str()))
            .collect();

        if !slide_rids.is_empty() {
            let mut paths = Vec::with_capacity(slide_rids.len());
            for rid in slide_rids {
                match slide_targets.get(rid.as_str()) {
                    Some(target) => paths.push(resolve_part_target(PRESENTATION_PART, target)),
                    None => log::warn!("slide relationship {} not found, skipping", rid),
                }
            }
            return Ok(paths);
        }

        let mut slides: Vec<(String, Option<usize>)> = relationships
            .iter()
            .filter(|r| is_slide_relationship(&r.rel_type))
            .map(|r| {
                let order_num = extract_slide_number(&r.id).or_else(|| extract_slide_number(&r.target));
                (resolve_part_target(PRESENTATION_PART, &r.target), order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::MissingPart(format!("'{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }

    /// Read a part that a package may leave out.
    fn read_optional_part<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<Option<String>> {
        match archive.by_name(path) {
            Ok(mut file) => {
                let mut content = String::new();
                file.read_to_string(&mut content)
                    .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;
                Ok(Some(content))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(Error::ZipError(format!("Failed to open '{}': {}", path, e))),
        }
    }

    /// Target of the first relationship of `part` whose type ends with `rel_suffix`.
    fn related_part<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        part: &str,
        rel_suffix: &str,
    ) -> Result<Option<String>> {
        let Some(rels) = self.read_optional_part(archive, &rels_path(part))? else {
            return Ok(None);
        };
        let target = parse_relationships(&rels)?
            .into_iter()
            .find(|r| r.rel_type.ends_with(rel_suffix))
            .map(|r| resolve_part_target(part, &r.target));
        Ok(target)
    }

    /// Placeholder positions a slide inherits through its layout (and the
    /// layout's master). Layouts are parsed once per deck.
    fn layout_placeholders<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        cache: &mut HashMap<String, PlaceholderPositions>,
    ) -> Result<PlaceholderPositions> {
        let Some(layout_path) = self.related_part(archive, slide_path, "/slideLayout")? else {
            return Ok(PlaceholderPositions::default());
        };
        if let Some(positions) = cache.get(&layout_path) {
            return Ok(positions.clone());
        }

        let master = match self.related_part(archive, &layout_path, "/slideMaster")? {
            Some(master_path) => self.part_placeholders(
                archive,
                &master_path,
                &PlaceholderPositions::default(),
                PlaceholderMatch::Kind,
            )?,
            None => PlaceholderPositions::default(),
        };
        let positions =
            self.part_placeholders(archive, &layout_path, &master, PlaceholderMatch::Index)?;

        cache.insert(layout_path, positions.clone());
        Ok(positions)
    }

    /// Placeholders declared by a layout or master part.
    fn part_placeholders<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
        inherited: &PlaceholderPositions,
        match_by: PlaceholderMatch,
    ) -> Result<PlaceholderPositions> {
        match self.read_optional_part(archive, path)? {
            Some(xml) => {
                let mut positions = parse_shape_tree(&xml, inherited).placeholders;
                positions.match_by = match_by;
                Ok(positions)
            }
            None => {
                log::debug!("{} is missing, no inherited placeholders", path);
                Ok(PlaceholderPositions::default())
            }
        }
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// What the reader needs from `presentation.xml`.
#[derive(Debug, Default, PartialEq)]
struct PresentationInfo {
    slide_size: Option<(f64, f64)>,
    slide_rids: Vec<String>,
}

fn parse_presentation_xml(xml: &str) -> Result<PresentationInfo> {
    let mut info = PresentationInfo::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sldSz" => {
                    let cx = attr_f64(e, b"cx");
                    let cy = attr_f64(e, b"cy");
                    if let (Some(cx), Some(cy)) = (cx, cy) {
                        info.slide_size = Some((cx, cy));
                    }
                }
                b"sldId" => {
                    // the relationship id is the namespaced "r:id", not the numeric "id"
                    let rid = e.attributes().flatten().find_map(|attr| {
                        let key = attr.key.as_ref();
                        (key != b"id" && local_name(key) == b"id")
                            .then(|| String::from_utf8_lossy(&attr.value).to_string())
                    });
                    if let Some(rid) = rid {
                        info.slide_rids.push(rid);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(info)
}

/// One entry of a `.rels` part.
#[derive(Debug, Default)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut relationships = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let mut rel = Relationship::default();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"Id" => rel.id = value,
                        _ => {}
                    }
                }
                relationships.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

fn is_slide_relationship(rel_type: &str) -> bool {
    rel_type.ends_with("/slide")
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`.
fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, name)) => format!("{}/_rels/{}.rels", dir, name),
        None => format!("_rels/{}.rels", part),
    }
}

/// Package path of a relationship target, relative to the folder of `source_part`.
fn resolve_part_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

/// Identity of a `p:ph` element.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    /// `type` attribute, `obj` when absent.
    kind: String,
    /// `idx` attribute, 0 when absent.
    idx: u32,
}

impl Placeholder {
    fn from_element(e: &BytesStart) -> Self {
        Self {
            kind: attr_str(e, b"type").unwrap_or_else(|| "obj".to_string()),
            idx: attr_str(e, b"idx")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        }
    }

    /// Kind of the master placeholder this one takes its position from.
    fn base_kind(&self) -> &str {
        match self.kind.as_str() {
            "title" | "ctrTitle" => "title",
            "dt" | "ftr" | "sldNum" | "hdr" => self.kind.as_str(),
            _ => "body",
        }
    }
}

/// How a part's placeholders are matched by the parts inheriting from it:
/// slides match layout placeholders by index, layouts match master
/// placeholders by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum PlaceholderMatch {
    #[default]
    Index,
    Kind,
}

/// Slide-space boxes of the placeholders one part declares.
#[derive(Debug, Clone, Default)]
struct PlaceholderPositions {
    by_idx: HashMap<u32, BBox>,
    by_kind: HashMap<String, BBox>,
    match_by: PlaceholderMatch,
}

impl PlaceholderPositions {
    fn insert(&mut self, placeholder: &Placeholder, bbox: BBox) {
        self.by_idx.entry(placeholder.idx).or_insert(bbox);
        self.by_kind
            .entry(placeholder.base_kind().to_string())
            .or_insert(bbox);
    }

    fn lookup(&self, placeholder: &Placeholder) -> Option<BBox> {
        match self.match_by {
            PlaceholderMatch::Index => self.by_idx.get(&placeholder.idx).copied(),
            PlaceholderMatch::Kind => self.by_kind.get(placeholder.base_kind()).copied(),
        }
    }
}

/// Axis-aligned scale then offset.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Transform {
    sx: f64,
    sy: f64,
    tx: f64,
    ty: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            sx: 1.0,
            sy: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }
}

impl Transform {
    fn apply(&self, b: BBox) -> BBox {
        BBox::new(
            b.x * self.sx + self.tx,
            b.y * self.sy + self.ty,
            b.w * self.sx,
            b.h * self.sy,
        )
    }

    /// `inner` first, then `self`.
    fn after(&self, inner: Transform) -> Transform {
        Transform {
            sx: self.sx * inner.sx,
            sy: self.sy * inner.sy,
            tx: self.sx * inner.tx + self.tx,
            ty: self.sy * inner.ty + self.ty,
        }
    }
}

/// A shape whose end tag has not been reached yet.
#[derive(Debug)]
struct ShapeBuilder {
    element: ShapeElement,
    off: Option<(f64, f64)>,
    ext: Option<(f64, f64)>,
    child_off: Option<(f64, f64)>,
    child_ext: Option<(f64, f64)>,
    /// Maps this shape's own coordinates (its parent's child space) to slide space.
    to_slide: Transform,
    placeholder: Option<Placeholder>,
    is_text_box: bool,
    custom_geometry: bool,
    preset: Option<String>,
    in_text_body: bool,
    paragraphs: Option<Vec<Paragraph>>,
    children: Vec<Shape>,
}

/// Slide-tree elements that open a new shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeElement {
    Sp,
    CxnSp,
    Pic,
    GraphicFrame,
    GrpSp,
}

impl ShapeElement {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"sp" => Some(Self::Sp),
            b"cxnSp" => Some(Self::CxnSp),
            b"pic" => Some(Self::Pic),
            b"graphicFrame" => Some(Self::GraphicFrame),
            b"grpSp" => Some(Self::GrpSp),
            _ => None,
        }
    }
}

impl ShapeBuilder {
    fn new(element: ShapeElement, to_slide: Transform) -> Self {
        Self {
            element,
            off: None,
            ext: None,
            child_off: None,
            child_ext: None,
            to_slide,
            placeholder: None,
            is_text_box: false,
            custom_geometry: false,
            preset: None,
            in_text_body: false,
            paragraphs: None,
            children: Vec::new(),
        }
    }

    fn shape_type(&self) -> ShapeType {
        match self.element {
            ShapeElement::CxnSp => ShapeType::Line,
            ShapeElement::Pic => ShapeType::Picture,
            ShapeElement::GraphicFrame => ShapeType::GraphicFrame,
            ShapeElement::GrpSp => ShapeType::Group,
            ShapeElement::Sp if self.placeholder.is_some() => ShapeType::Placeholder,
            ShapeElement::Sp if self.custom_geometry => ShapeType::Freeform,
            ShapeElement::Sp if self.is_text_box => ShapeType::TextBox,
            ShapeElement::Sp => match self.preset.as_deref() {
                Some("line") | Some("straightConnector1") => ShapeType::Line,
                Some(_) => ShapeType::AutoShape,
                None => ShapeType::Other,
            },
        }
    }

    fn current_run(&mut self) -> Option<&mut TextRun> {
        self.paragraphs.as_mut()?.last_mut()?.runs.last_mut()
    }

    /// Maps coordinates inside this group to slide space.
    fn child_transform(&self) -> Transform {
        let (x, y) = self.off.unwrap_or((0.0, 0.0));
        let (w, h) = self.ext.unwrap_or((0.0, 0.0));
        let (cx, cy) = self.child_off.unwrap_or((x, y));
        let (cw, ch) = self.child_ext.unwrap_or((w, h));
        let sx = if cw > 0.0 { w / cw } else { 1.0 };
        let sy = if ch > 0.0 { h / ch } else { 1.0 };
        self.to_slide.after(Transform {
            sx,
            sy,
            tx: x - cx * sx,
            ty: y - cy * sy,
        })
    }

    /// Close the shape. A placeholder without its own xfrm takes the
    /// inherited position; placeholders with a known box are recorded.
    fn finish(self, inherited: &PlaceholderPositions, placeholders: &mut PlaceholderPositions) -> Shape {
        let shape_type = self.shape_type();

        let inherited_box = match (&self.placeholder, self.off, self.ext) {
            (Some(placeholder), None, None) => inherited.lookup(placeholder),
            _ => None,
        };
        let bbox = match inherited_box {
            Some(bbox) => bbox,
            None => {
                let (x, y) = self.off.unwrap_or((0.0, 0.0));
                let (w, h) = self.ext.unwrap_or((0.0, 0.0));
                self.to_slide.apply(BBox::new(x, y, w, h))
            }
        };
        if let Some(placeholder) = &self.placeholder {
            if self.off.is_some() || inherited_box.is_some() {
                placeholders.insert(placeholder, bbox);
            }
        }

        let mut shape = Shape::new(shape_type, bbox);
        if let Some(paragraphs) = self.paragraphs {
            shape = shape.with_text(TextFrame { paragraphs });
        }
        shape.children = self.children;
        shape
    }
}

/// Shapes of one part plus the placeholders it declares.
#[derive(Debug, Default)]
struct ShapeTree {
    shapes: Vec<Shape>,
    placeholders: PlaceholderPositions,
}

/// Build a slide from its XML; placeholders without a position take the
/// one `inherited` from the slide's layout.
fn parse_slide_xml(xml_content: &str, inherited: &PlaceholderPositions) -> Slide {
    Slide {
        shapes: parse_shape_tree(xml_content, inherited).shapes,
    }
}

/// Read the shape tree of a slide, layout or master part.
///
/// An XML error is logged and ends the part; shapes read so far are kept.
fn parse_shape_tree(xml_content: &str, inherited: &PlaceholderPositions) -> ShapeTree {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(false);

    let mut roots: Vec<Shape> = Vec::new();
    let mut placeholders = PlaceholderPositions::default();
    let mut stack: Vec<ShapeBuilder> = Vec::new();
    let mut in_run = false;
    let mut in_t = false;
    // depth inside mc:Fallback, whose shapes duplicate mc:Choice
    let mut fallback_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"Fallback" {
                    fallback_depth += 1;
                    continue;
                }
                if fallback_depth > 0 {
                    continue;
                }

                if let Some(element) = ShapeElement::from_local_name(local) {
                    let to_slide = stack
                        .last()
                        .map(ShapeBuilder::child_transform)
                        .unwrap_or_default();
                    stack.push(ShapeBuilder::new(element, to_slide));
                    continue;
                }
                let Some(builder) = stack.last_mut() else {
                    continue;
                };
                match local {
                    b"txBody" if builder.element == ShapeElement::Sp => {
                        builder.in_text_body = true;
                        if builder.paragraphs.is_none() {
                            builder.paragraphs = Some(Vec::new());
                        }
                    }
                    b"p" if builder.in_text_body => {
                        if let Some(paragraphs) = builder.paragraphs.as_mut() {
                            paragraphs.push(Paragraph::default());
                        }
                    }
                    b"r" | b"fld" if builder.in_text_body => {
                        if let Some(paragraph) = builder.paragraphs.as_mut().and_then(|p| p.last_mut()) {
                            paragraph.runs.push(TextRun::default());
                            in_run = true;
                        }
                    }
                    b"t" if in_run => in_t = true,
                    b"br" if builder.in_text_body => push_line_break(builder),
                    _ => apply_attributes(builder, local, e, in_run),
                }
            }
            Ok(Event::Empty(ref e)) => {
                if fallback_depth > 0 {
                    continue;
                }
                let name = e.name();
                let local = local_name(name.as_ref());
                let Some(builder) = stack.last_mut() else {
                    continue;
                };
                match local {
                    b"p" if builder.in_text_body => {
                        if let Some(paragraphs) = builder.paragraphs.as_mut() {
                            paragraphs.push(Paragraph::default());
                        }
                    }
                    b"br" if builder.in_text_body => push_line_break(builder),
                    _ => apply_attributes(builder, local, e, in_run),
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_t && fallback_depth == 0 {
                    let text = e.unescape().unwrap_or_default();
                    if let Some(run) = stack.last_mut().and_then(|b| b.current_run()) {
                        run.text.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"Fallback" {
                    fallback_depth = fallback_depth.saturating_sub(1);
                    continue;
                }
                if fallback_depth > 0 {
                    continue;
                }

                if ShapeElement::from_local_name(local).is_some() {
                    if let Some(builder) = stack.pop() {
                        let shape = builder.finish(inherited, &mut placeholders);
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(shape),
                            None => roots.push(shape),
                        }
                    }
                    in_run = false;
                    in_t = false;
                    continue;
                }
                match local {
                    b"txBody" => {
                        if let Some(builder) = stack.last_mut() {
                            builder.in_text_body = false;
                        }
                    }
                    b"r" | b"fld" => in_run = false,
                    b"t" => in_t = false,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error, keeping shapes read so far: {}", e);
                break;
            }
            _ => {}
        }
    }

    // unterminated shapes from a truncated part still count
    while let Some(builder) = stack.pop() {
        let shape = builder.finish(inherited, &mut placeholders);
        match stack.last_mut() {
            Some(parent) => parent.children.push(shape),
            None => roots.push(shape),
        }
    }

    ShapeTree {
        shapes: roots,
        placeholders,
    }
}

/// Record geometry, type hints and run formatting carried in attributes.
fn apply_attributes(builder: &mut ShapeBuilder, local: &[u8], e: &BytesStart, in_run: bool) {
    match local {
        b"off" if builder.off.is_none() => {
            if let (Some(x), Some(y)) = (attr_f64(e, b"x"), attr_f64(e, b"y")) {
                builder.off = Some((x, y));
            }
        }
        b"ext" if builder.ext.is_none() => {
            if let (Some(cx), Some(cy)) = (attr_f64(e, b"cx"), attr_f64(e, b"cy")) {
                builder.ext = Some((cx, cy));
            }
        }
        b"chOff" if builder.child_off.is_none() => {
            if let (Some(x), Some(y)) = (attr_f64(e, b"x"), attr_f64(e, b"y")) {
                builder.child_off = Some((x, y));
            }
        }
        b"chExt" if builder.child_ext.is_none() => {
            if let (Some(cx), Some(cy)) = (attr_f64(e, b"cx"), attr_f64(e, b"cy")) {
                builder.child_ext = Some((cx, cy));
            }
        }
        b"ph" => builder.placeholder = Some(Placeholder::from_element(e)),
        b"cNvSpPr" => {
            if matches!(attr_str(e, b"txBox").as_deref(), Some("1") | Some("true")) {
                builder.is_text_box = true;
            }
        }
        b"custGeom" => builder.custom_geometry = true,
        b"prstGeom" => builder.preset = attr_str(e, b"prst"),
        b"rPr" if in_run => {
            let font_size = attr_f64(e, b"sz").map(|sz| sz / 100.0);
            let bold = attr_str(e, b"b").map(|b| b == "1" || b == "true");
            if let Some(run) = builder.current_run() {
                run.font_size = font_size;
                run.bold = bold;
            }
        }
        _ => {}
    }
}

/// `a:br` inside a paragraph: a line break in the current run.
fn push_line_break(builder: &mut ShapeBuilder) {
    let Some(paragraph) = builder.paragraphs.as_mut().and_then(|p| p.last_mut()) else {
        return;
    };
    match paragraph.runs.last_mut() {
        Some(run) => run.text.push('\n'),
        None => paragraph.runs.push(TextRun {
            text: "\n".to_string(),
            ..Default::default()
        }),
    }
}

fn attr_str(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_str(e, key).and_then(|v| v.trim().parse::<f64>().ok())
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use timeline_core::TimelineExtractor;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

    fn slide_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{body}</p:spTree></p:cSld></p:sld>"#
        )
    }

    fn text_shape(x: u64, y: u64, cx: u64, cy: u64, text: &str, sz: u32) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="TextBox"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US" sz="{sz}" b="1" dirty="0"/><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#
        )
    }

    fn line_shape(x: u64, y: u64, cx: u64) -> String {
        format!(
            r#"<p:cxnSp><p:nvCxnSpPr><p:cNvPr id="3" name="Line"/><p:cNvCxnSpPr/><p:nvPr/></p:nvCxnSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="0"/></a:xfrm><a:prstGeom prst="line"><a:avLst/></a:prstGeom></p:spPr></p:cxnSp>"#
        )
    }

    /// Build a .pptx in memory; slides are listed in `sldIdLst` in reverse
    /// file order to check that the list, not the file name, decides order.
    fn build_pptx(slides: &[String]) -> Vec<u8> {
        build_pptx_with_parts(slides, &[])
    }

    /// Like [`build_pptx`], with additional parts written verbatim.
    fn build_pptx_with_parts(slides: &[String], parts: &[(&str, String)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        let ids: String = (1..=slides.len())
            .rev()
            .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
            .collect();
        let presentation = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation {NS}><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="1000" cy="750"/></p:presentation>"#
        );
        let rels: String = (1..=slides.len())
            .map(|n| {
                format!(
                    r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                    n + 1,
                    n
                )
            })
            .collect();
        let rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>{rels}</Relationships>"#
        );

        zip.start_file("ppt/presentation.xml", options).unwrap();
        zip.write_all(presentation.as_bytes()).unwrap();
        zip.start_file("ppt/_rels/presentation.xml.rels", options).unwrap();
        zip.write_all(rels.as_bytes()).unwrap();
        for (idx, body) in slides.iter().enumerate() {
            zip.start_file(format!("ppt/slides/slide{}.xml", idx + 1), options)
                .unwrap();
            zip.write_all(slide_xml(body).as_bytes()).unwrap();
        }
        for (path, content) in parts {
            zip.start_file(*path, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_resolve_part_target() {
        assert_eq!(
            resolve_part_target(PRESENTATION_PART, "slides/slide1.xml"),
            "ppt/slides/slide1.xml"
        );
        assert_eq!(
            resolve_part_target(PRESENTATION_PART, "/ppt/slides/slide2.xml"),
            "ppt/slides/slide2.xml"
        );
        assert_eq!(
            resolve_part_target("ppt/slides/slide1.xml", "../slideLayouts/slideLayout2.xml"),
            "ppt/slideLayouts/slideLayout2.xml"
        );
        assert_eq!(rels_path("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
    }

    #[test]
    fn test_presentation_info() {
        let xml = format!(
            r#"<p:presentation {NS}><p:sldIdLst><p:sldId id="256" r:id="rId7"/><p:sldId id="257" r:id="rId3"/></p:sldIdLst><p:sldSz cx="12192000" cy="6858000" type="custom"/></p:presentation>"#
        );
        let info = parse_presentation_xml(&xml).unwrap();
        assert_eq!(info.slide_size, Some((12_192_000.0, 6_858_000.0)));
        assert_eq!(info.slide_rids, vec!["rId7", "rId3"]);
    }

    #[test]
    fn test_slide_shapes_and_runs() {
        let body = format!(
            "{}{}",
            line_shape(0, 500, 1000),
            text_shape(100, 495, 60, 10, "Jan&#160;15", 1800)
        );
        let slide = parse_slide_xml(&slide_xml(&body), &PlaceholderPositions::default());
        assert_eq!(slide.shapes.len(), 2);

        let line = &slide.shapes[0];
        assert_eq!(line.shape_type, ShapeType::Line);
        assert_eq!(line.bbox, BBox::new(0.0, 500.0, 1000.0, 0.0));

        let label = &slide.shapes[1];
        assert_eq!(label.shape_type, ShapeType::TextBox);
        let frame = label.text_frame.as_ref().unwrap();
        let run = &frame.paragraphs[0].runs[0];
        assert_eq!(run.text, "Jan\u{a0}15");
        assert_eq!(run.font_size, Some(18.0));
        assert_eq!(run.bold, Some(true));
    }

    #[test]
    fn test_shape_types() {
        let body = r#"<p:sp><p:nvSpPr><p:cNvPr id="4" name="Dot"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="1" y="2"/><a:ext cx="10" cy="10"/></a:xfrm><a:prstGeom prst="ellipse"><a:avLst/></a:prstGeom></p:spPr></p:sp><p:sp><p:nvSpPr><p:cNvPr id="5" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp><p:sp><p:nvSpPr><p:cNvPr id="6" name="Free"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:custGeom/></p:spPr></p:sp><p:pic><p:nvPicPr><p:cNvPr id="7" name="Pic"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:spPr/></p:pic>"#;
        let slide = parse_slide_xml(&slide_xml(body), &PlaceholderPositions::default());
        let types: Vec<ShapeType> = slide.shapes.iter().map(|s| s.shape_type).collect();
        assert_eq!(
            types,
            vec![
                ShapeType::AutoShape,
                ShapeType::Placeholder,
                ShapeType::Freeform,
                ShapeType::Picture
            ]
        );
        assert_eq!(slide.shapes[0].bbox, BBox::new(1.0, 2.0, 10.0, 10.0));
        assert!(slide.shapes[1].text_frame.is_none());
    }

    #[test]
    fn test_group_children_mapped_to_slide_space() {
        let body = format!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="10" name="Group"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="100" y="200"/><a:ext cx="200" cy="100"/><a:chOff x="0" y="0"/><a:chExt cx="100" cy="50"/></a:xfrm></p:grpSpPr>{}</p:grpSp>"#,
            text_shape(10, 10, 20, 10, "Kickoff", 1400)
        );
        let slide = parse_slide_xml(&slide_xml(&body), &PlaceholderPositions::default());
        assert_eq!(slide.shapes.len(), 1);
        let group = &slide.shapes[0];
        assert_eq!(group.shape_type, ShapeType::Group);
        assert_eq!(group.bbox, BBox::new(100.0, 200.0, 200.0, 100.0));
        assert_eq!(group.children[0].bbox, BBox::new(120.0, 220.0, 40.0, 20.0));
    }

    #[test]
    fn test_nested_group_transforms_compose() {
        let inner = format!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="11" name="Inner"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="10" y="10"/><a:ext cx="20" cy="20"/><a:chOff x="0" y="0"/><a:chExt cx="10" cy="10"/></a:xfrm></p:grpSpPr>{}</p:grpSp>"#,
            text_shape(1, 1, 2, 2, "Kickoff", 1400)
        );
        let body = format!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="10" name="Outer"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="100" y="200"/><a:ext cx="200" cy="100"/><a:chOff x="0" y="0"/><a:chExt cx="100" cy="50"/></a:xfrm></p:grpSpPr>{}</p:grpSp>"#,
            inner
        );
        let slide = parse_slide_xml(&slide_xml(&body), &PlaceholderPositions::default());
        let outer = &slide.shapes[0];
        let inner = &outer.children[0];
        assert_eq!(outer.bbox, BBox::new(100.0, 200.0, 200.0, 100.0));
        // inner group: (10, 10, 20, 20) in the outer child space, scaled by 2
        assert_eq!(inner.bbox, BBox::new(120.0, 220.0, 40.0, 40.0));
        // text: (1, 1, 2, 2) -> (12, 12, 4, 4) in outer child space -> slide space
        assert_eq!(inner.children[0].bbox, BBox::new(124.0, 224.0, 8.0, 8.0));
    }

    #[test]
    fn test_deeply_nested_groups() {
        let depth = 20_000;
        let open = r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="9" name="G"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="1" y="0"/><a:ext cx="10" cy="10"/><a:chOff x="0" y="0"/><a:chExt cx="10" cy="10"/></a:xfrm></p:grpSpPr>"#;
        let mut body = open.repeat(depth);
        body.push_str(&text_shape(5, 5, 1, 1, "deep", 1200));
        body.push_str(&"</p:grpSp>".repeat(depth));

        let slide = parse_slide_xml(&slide_xml(&body), &PlaceholderPositions::default());

        // every level shifts its children by one unit
        let mut shape = &slide.shapes[0];
        while let Some(child) = shape.children.first() {
            shape = child;
        }
        assert_eq!(shape.bbox, BBox::new(5.0 + depth as f64, 5.0, 1.0, 1.0));

        let timeline = TimelineExtractor::new().extract_slide(1, &slide, 100_000.0, 750.0, "deep.pptx");
        assert_eq!(timeline.caption, "Slide 1: deep");
        drop(slide);
    }

    #[test]
    fn test_placeholders_inherit_layout_and_master_positions() {
        let title = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:rPr sz="3200"/><a:t>Product Roadmap</a:t></a:r></a:p></p:txBody></p:sp>"#;
        let notes = r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Body 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>Notes</a:t></a:r></a:p></p:txBody></p:sp>"#;
        let slide = format!(
            "{}{}{}{}",
            title,
            notes,
            line_shape(0, 200, 1000),
            text_shape(100, 200, 60, 10, "Jan 15", 1200)
        );

        // the layout positions the title itself and leaves the body to the master
        let layout = slide_xml(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="50" y="20"/><a:ext cx="900" cy="60"/></a:xfrm></p:spPr></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Content"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
        );
        let master = slide_xml(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="10" cy="10"/></a:xfrm></p:spPr></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Text"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="50" y="600"/><a:ext cx="900" cy="100"/></a:xfrm></p:spPr></p:sp>"#,
        );
        let rels = |kind: &str, target: &str| {
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/{kind}" Target="{target}"/></Relationships>"#
            )
        };

        let bytes = build_pptx_with_parts(
            &[slide],
            &[
                (
                    "ppt/slides/_rels/slide1.xml.rels",
                    rels("slideLayout", "../slideLayouts/slideLayout1.xml"),
                ),
                ("ppt/slideLayouts/slideLayout1.xml", layout),
                (
                    "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
                    rels("slideMaster", "../slideMasters/slideMaster1.xml"),
                ),
                ("ppt/slideMasters/slideMaster1.xml", master),
            ],
        );
        let deck = PptxParser::new()
            .parse(Cursor::new(bytes), "roadmap.pptx")
            .unwrap();

        let shapes = &deck.slides[0].shapes;
        assert_eq!(shapes[0].shape_type, ShapeType::Placeholder);
        assert_eq!(shapes[0].bbox, BBox::new(50.0, 20.0, 900.0, 60.0));
        assert_eq!(shapes[1].bbox, BBox::new(50.0, 600.0, 900.0, 100.0));

        // the slide title sits far from the date, so it is not taken as its label
        let facts = TimelineExtractor::new().extract_deck(&deck).facts();
        assert!(facts.milestones.is_empty());
    }

    #[test]
    fn test_placeholder_without_layout_keeps_empty_box() {
        let body = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#;
        let slide = parse_slide_xml(&slide_xml(body), &PlaceholderPositions::default());
        assert_eq!(slide.shapes[0].bbox, BBox::default());
    }

    #[test]
    fn test_paragraphs_breaks_and_fields() {
        let body = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="T"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>Beta </a:t></a:r><a:r><a:rPr sz="2000"/><a:t>Phase</a:t></a:r><a:br/><a:r><a:t>Jul 24</a:t></a:r></a:p><a:p/><a:p><a:fld id="{1}" type="datetime"><a:t>Aug 18</a:t></a:fld></a:p></p:txBody></p:sp>"#;
        let slide = parse_slide_xml(&slide_xml(body), &PlaceholderPositions::default());
        let frame = slide.shapes[0].text_frame.as_ref().unwrap();
        assert_eq!(frame.paragraphs.len(), 3);
        assert_eq!(frame.text(), "Beta Phase\nJul 24\n\nAug 18");
        assert_eq!(frame.paragraphs[0].runs[0].font_size, None);
        assert_eq!(frame.paragraphs[0].runs[1].font_size, Some(20.0));
    }

    #[test]
    fn test_alternate_content_fallback_is_skipped() {
        let body = format!(
            r#"<mc:AlternateContent xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"><mc:Choice Requires="p14">{}</mc:Choice><mc:Fallback>{}</mc:Fallback></mc:AlternateContent>"#,
            text_shape(0, 0, 10, 10, "Choice", 1200),
            text_shape(0, 0, 10, 10, "Fallback", 1200)
        );
        let slide = parse_slide_xml(&slide_xml(&body), &PlaceholderPositions::default());
        assert_eq!(slide.shapes.len(), 1);
        assert_eq!(slide.shapes[0].text_frame.as_ref().unwrap().text(), "Choice");
    }

    #[test]
    fn test_parse_archive_end_to_end() {
        let first = format!(
            "{}{}{}",
            line_shape(0, 500, 1000),
            text_shape(100, 495, 60, 10, "Jan 15", 1200),
            text_shape(100, 460, 60, 10, "Kickoff", 1800)
        );
        let second = text_shape(10, 10, 60, 10, "Random notes", 1200);
        // sldIdLst lists slide2 before slide1
        let bytes = build_pptx(&[first, second]);

        let deck = PptxParser::new()
            .parse(Cursor::new(bytes), "roadmap.pptx")
            .unwrap();
        assert_eq!(deck.source, "roadmap.pptx");
        assert_eq!((deck.slide_width, deck.slide_height), (1000.0, 750.0));
        assert_eq!(deck.slides.len(), 2);

        let facts = TimelineExtractor::new().extract_deck(&deck).facts();
        assert_eq!(facts.captions[0], "Slide 1: Random notes");
        assert_eq!(facts.captions[1], "Slide 2: Kickoff (Jan 15)");
        assert_eq!(facts.milestones.len(), 1);
        assert_eq!(facts.milestones[0].slide, 2);
        assert_eq!(facts.milestones[0].title, "Kickoff");
    }

    #[test]
    fn test_missing_parts_are_errors() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("ppt/other.xml", FileOptions::default()).unwrap();
        zip.write_all(b"<x/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = PptxParser::new().parse(Cursor::new(bytes), "broken.pptx");
        assert!(matches!(err, Err(Error::MissingPart(_))));
    }

    #[test]
    fn test_not_a_zip() {
        let err = PptxParser::new().parse(Cursor::new(b"plain text".to_vec()), "x.pptx");
        assert!(matches!(err, Err(Error::ZipError(_))));
    }
}
