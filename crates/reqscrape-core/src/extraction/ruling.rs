use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::ScrapeError;
use crate::extraction::{Edge, EdgeSource, PdfPage};

/// US Letter, used when no MediaBox can be found anywhere in the page tree.
const FALLBACK_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Segments within this many points of axis-aligned count as rulings.
const AXIS_TOLERANCE: f64 = 0.5;

/// Guards against cyclic `/Parent` chains.
const MAX_PARENT_DEPTH: usize = 32;

/// Form XObjects nested deeper than this are not walked.
const MAX_FORM_DEPTH: usize = 8;

/// Load page sizes and ruling edges for every page of `pdf`.
pub fn load_pages(pdf: &Path) -> Result<Vec<PdfPage>, ScrapeError> {
    let doc = Document::load(pdf)?;
    let pages = document_pages(&doc, pdf);
    log::debug!("{}: loaded {} page(s)", pdf.display(), pages.len());
    Ok(pages)
}

/// Page geometry as displayed, and the ruling edges in that frame.
fn document_pages(doc: &Document, pdf: &Path) -> Vec<PdfPage> {
    let mut pages = Vec::new();

    for (number, page_id) in doc.get_pages() {
        let frame = page_frame(doc, page_id);
        let resources = inherited(doc, page_id, b"Resources").and_then(|o| as_dict(doc, o));

        let edges = match page_operations(doc, page_id) {
            Ok(ops) => {
                let mut walker = RulingWalker::new(Some(doc));
                walker.walk(&ops, frame.display_matrix(), resources, 0);
                walker.edges
            }
            Err(e) => {
                log::warn!(
                    "{}: page {}: could not decode content stream ({}); no tables will be found",
                    pdf.display(),
                    number,
                    e
                );
                Vec::new()
            }
        };

        pages.push(PdfPage {
            number,
            width: frame.width(),
            height: frame.height(),
            edges,
        });
    }

    pages
}

fn page_operations(doc: &Document, page_id: ObjectId) -> Result<Vec<Operation>, lopdf::Error> {
    let data = doc.get_page_content(page_id)?;
    Ok(Content::decode(&data)?.operations)
}

fn stream_operations(stream: &Stream) -> Result<Vec<Operation>, lopdf::Error> {
    let data = match stream.dict.get(b"Filter") {
        Ok(_) => stream.decompressed_content()?,
        Err(_) => stream.content.clone(),
    };
    Ok(Content::decode(&data)?.operations)
}

/// Visible area of a page and the rotation it is displayed with.
///
/// poppler crops and renders in this frame, so page sizes and edges are
/// reported in it too: origin at the top-left of the displayed page, y down.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageFrame {
    /// `[x0, y0, x1, y1]` in default user space, normalized.
    rect: [f64; 4],
    /// Clockwise: 0, 90, 180 or 270.
    rotation: i64,
}

impl PageFrame {
    fn new(rect: [f64; 4], rotation: i64) -> Self {
        let rotation = match rotation.rem_euclid(360) {
            r @ (90 | 180 | 270) => r,
            _ => 0,
        };
        PageFrame {
            rect: normalized(rect),
            rotation,
        }
    }

    fn is_sideways(&self) -> bool {
        matches!(self.rotation, 90 | 270)
    }

    fn width(&self) -> f64 {
        let [x0, y0, x1, y1] = self.rect;
        if self.is_sideways() {
            y1 - y0
        } else {
            x1 - x0
        }
    }

    fn height(&self) -> f64 {
        let [x0, y0, x1, y1] = self.rect;
        if self.is_sideways() {
            x1 - x0
        } else {
            y1 - y0
        }
    }

    /// Maps default user space to the displayed, top-left frame.
    fn display_matrix(&self) -> Matrix {
        let [x0, y0, x1, y1] = self.rect;
        match self.rotation {
            90 => Matrix([0.0, 1.0, 1.0, 0.0, -y0, -x0]),
            180 => Matrix([-1.0, 0.0, 0.0, 1.0, x1, -y0]),
            270 => Matrix([0.0, -1.0, -1.0, 0.0, y1, x1]),
            _ => Matrix([1.0, 0.0, 0.0, -1.0, -x0, y1]),
        }
    }
}

/// CropBox clipped to the MediaBox, falling back to the MediaBox, plus
/// `/Rotate`. All three may be inherited from the page tree.
fn page_frame(doc: &Document, page_id: ObjectId) -> PageFrame {
    let media = inherited(doc, page_id, b"MediaBox")
        .and_then(|o| numbers::<4>(doc, o))
        .map(normalized)
        .unwrap_or(FALLBACK_MEDIA_BOX);

    let rect = match inherited(doc, page_id, b"CropBox").and_then(|o| numbers::<4>(doc, o)) {
        Some(crop) => {
            let [c0, d0, c1, d1] = normalized(crop);
            let clipped = [
                c0.max(media[0]),
                d0.max(media[1]),
                c1.min(media[2]),
                d1.min(media[3]),
            ];
            if clipped[0] < clipped[2] && clipped[1] < clipped[3] {
                clipped
            } else {
                media
            }
        }
        None => media,
    };

    let rotation = inherited(doc, page_id, b"Rotate")
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_i64().ok())
        .unwrap_or(0);

    PageFrame::new(rect, rotation)
}

fn normalized([x0, y0, x1, y1]: [f64; 4]) -> [f64; 4] {
    [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]
}

/// A page attribute, following `/Parent` for inherited values.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok();
    for _ in 0..MAX_PARENT_DEPTH {
        let dict = current?;
        if let Ok(obj) = dict.get(key) {
            return Some(obj);
        }
        current = parent(doc, dict);
    }
    None
}

fn parent<'a>(doc: &'a Document, dict: &Dictionary) -> Option<&'a Dictionary> {
    let id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    doc.get_dictionary(id).ok()
}

fn as_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    let (_, obj) = doc.dereference(obj).ok()?;
    obj.as_dict().ok()
}

/// A numeric array of exactly `N` entries, such as a rectangle or matrix.
fn numbers<const N: usize>(doc: &Document, obj: &Object) -> Option<[f64; N]> {
    let (_, obj) = doc.dereference(obj).ok()?;
    let values = obj.as_array().ok()?;
    if values.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, v) in out.iter_mut().zip(values) {
        let (_, v) = doc.dereference(v).ok()?;
        *slot = number(v)?;
    }
    Some(out)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

/// The Form XObject named `name` in `resources`.
fn form_xobject<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    name: &[u8],
) -> Option<&'a Stream> {
    let xobjects = as_dict(doc, resources.get(b"XObject").ok()?)?;
    let (_, obj) = doc.dereference(xobjects.get(name).ok()?).ok()?;
    let stream = obj.as_stream().ok()?;
    match stream.dict.get(b"Subtype") {
        Ok(Object::Name(subtype)) if subtype.as_slice() == b"Form".as_slice() => Some(stream),
        _ => None,
    }
}

/// Affine matrix `[a b c d e f]` as used by `cm`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// `self` applied first, then `outer`.
    fn then(&self, outer: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = outer.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }
}

/// A straight segment in the displayed page frame.
#[derive(Debug, Clone, Copy)]
struct Segment {
    from: (f64, f64),
    to: (f64, f64),
    source: EdgeSource,
}

/// Collects axis-aligned ruling edges from content operations.
///
/// Tracks `q`/`Q`/`cm` for the transformation matrix and builds paths from
/// `m`, `l`, `h` and `re`. Curves only move the current point. Paths become
/// edges when stroked or filled; `n` discards them. `Do` descends into Form
/// XObjects, applying their `/Matrix`, when a document is available.
struct RulingWalker<'a> {
    doc: Option<&'a Document>,
    edges: Vec<Edge>,
}

impl<'a> RulingWalker<'a> {
    fn new(doc: Option<&'a Document>) -> Self {
        RulingWalker {
            doc,
            edges: Vec::new(),
        }
    }

    fn walk(
        &mut self,
        ops: &[Operation],
        base: Matrix,
        resources: Option<&'a Dictionary>,
        depth: usize,
    ) {
        let mut ctm = base;
        let mut stack: Vec<Matrix> = Vec::new();
        let mut path: Vec<Segment> = Vec::new();
        let mut current: Option<(f64, f64)> = None;
        let mut subpath_start: Option<(f64, f64)> = None;

        for op in ops {
            let args: Vec<f64> = op.operands.iter().filter_map(number).collect();
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => ctm = stack.pop().unwrap_or(base),
                "cm" if args.len() == 6 => {
                    let m = Matrix([args[0], args[1], args[2], args[3], args[4], args[5]]);
                    ctm = m.then(&ctm);
                }
                "m" if args.len() == 2 => {
                    let p = ctm.apply(args[0], args[1]);
                    current = Some(p);
                    subpath_start = Some(p);
                }
                "l" if args.len() == 2 => {
                    let p = ctm.apply(args[0], args[1]);
                    if let Some(from) = current {
                        path.push(Segment {
                            from,
                            to: p,
                            source: EdgeSource::Line,
                        });
                    }
                    current = Some(p);
                }
                "c" if args.len() == 6 => current = Some(ctm.apply(args[4], args[5])),
                "v" | "y" if args.len() == 4 => current = Some(ctm.apply(args[2], args[3])),
                "h" => {
                    if let (Some(from), Some(to)) = (current, subpath_start) {
                        path.push(Segment {
                            from,
                            to,
                            source: EdgeSource::Line,
                        });
                        current = Some(to);
                    }
                }
                "re" if args.len() == 4 => {
                    let (x, y, w, h) = (args[0], args[1], args[2], args[3]);
                    let corners = [
                        ctm.apply(x, y),
                        ctm.apply(x + w, y),
                        ctm.apply(x + w, y + h),
                        ctm.apply(x, y + h),
                    ];
                    for i in 0..4 {
                        path.push(Segment {
                            from: corners[i],
                            to: corners[(i + 1) % 4],
                            source: EdgeSource::RectSide,
                        });
                    }
                    current = Some(corners[0]);
                    subpath_start = Some(corners[0]);
                }
                "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                    self.edges.extend(path.drain(..).filter_map(|s| to_edge(&s)));
                    current = None;
                    subpath_start = None;
                }
                "n" => {
                    path.clear();
                    current = None;
                    subpath_start = None;
                }
                "Do" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        self.walk_form(name, ctm, resources, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn walk_form(
        &mut self,
        name: &[u8],
        ctm: Matrix,
        resources: Option<&'a Dictionary>,
        depth: usize,
    ) {
        let (Some(doc), Some(resources)) = (self.doc, resources) else {
            return;
        };
        if depth >= MAX_FORM_DEPTH {
            log::debug!(
                "form XObject /{} nested too deep; skipped",
                String::from_utf8_lossy(name)
            );
            return;
        }
        let Some(form) = form_xobject(doc, resources, name) else {
            return;
        };

        let ops = match stream_operations(form) {
            Ok(ops) => ops,
            Err(e) => {
                log::warn!(
                    "could not decode form XObject /{} ({}); its rulings are skipped",
                    String::from_utf8_lossy(name),
                    e
                );
                return;
            }
        };
        let matrix = form
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|o| numbers::<6>(doc, o))
            .map(Matrix)
            .unwrap_or(Matrix::IDENTITY);
        let form_resources = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|o| as_dict(doc, o))
            .or(Some(resources));

        self.walk(&ops, matrix.then(&ctm), form_resources, depth + 1);
    }
}

fn to_edge(segment: &Segment) -> Option<Edge> {
    let (x0, y0) = segment.from;
    let (x1, y1) = segment.to;
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();

    if dy <= AXIS_TOLERANCE && dx > AXIS_TOLERANCE {
        Some(Edge::horizontal(x0, x1, (y0 + y1) / 2.0, segment.source))
    } else if dx <= AXIS_TOLERANCE && dy > AXIS_TOLERANCE {
        Some(Edge::vertical((x0 + x1) / 2.0, y0, y1, segment.source))
    } else {
        None
    }
}
