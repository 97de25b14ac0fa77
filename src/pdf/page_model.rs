//! Per-page bounding box and content access on top of lopdf
//!
//! Pages are addressed 1-based, the way PDF viewers number them.

use std::path::{Path, PathBuf};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};
use crate::error::{Error, Result};

/// Signature every PDF file starts with
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Ancestor levels searched for an inherited MediaBox
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Parser settings, passed explicitly into every load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Reject files that do not start with `%PDF`
    pub require_signature: bool,
    /// Decompress all streams right after loading
    pub decompress: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            require_signature: true,
            decompress: false,
        }
    }
}

/// Page rectangle in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Grow the upper-right corner by `2 * margin` on both axes
    pub fn grown(&self, margin: f64) -> Self {
        Self {
            x0: self.x0,
            y0: self.y0,
            x1: self.x1 + 2.0 * margin,
            y1: self.y1 + 2.0 * margin,
        }
    }

    fn to_object(self) -> Object {
        Object::Array(
            [self.x0, self.y0, self.x1, self.y1]
                .iter()
                .map(|v| Object::Real(*v as f32))
                .collect(),
        )
    }
}

/// Box entries may be written as integers or reals
#[derive(Debug, Clone, Copy)]
enum PdfNumber {
    Integer(i64),
    Real(f32),
}

impl PdfNumber {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::Integer(i) => Some(PdfNumber::Integer(*i)),
            Object::Real(r) => Some(PdfNumber::Real(*r)),
            _ => None,
        }
    }

    fn value(self) -> f64 {
        match self {
            PdfNumber::Integer(i) => i as f64,
            PdfNumber::Real(r) => f64::from(r),
        }
    }
}

/// Result of reading a page's content stream
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    /// Decoded drawing operators
    Decoded(Vec<u8>),
    /// Content exists but could not be decoded
    Lost { reason: String },
}

impl PageContent {
    /// The drawing operators, empty when they were lost
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            PageContent::Decoded(bytes) => bytes,
            PageContent::Lost { .. } => Vec::new(),
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, PageContent::Lost { .. })
    }
}

/// A loaded document with 1-based page access
pub struct PageModel {
    doc: Document,
    page_ids: Vec<ObjectId>,
}

impl PageModel {
    /// Load and parse a PDF file
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| Error::document(path, e))?;
        Self::parse(&bytes, path.to_path_buf(), options)
    }

    /// Parse a PDF held in memory
    pub fn load_mem(bytes: &[u8], options: &LoadOptions) -> Result<Self> {
        Self::parse(bytes, PathBuf::from("<memory>"), options)
    }

    fn parse(bytes: &[u8], source: PathBuf, options: &LoadOptions) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::document(source, "file is empty"));
        }
        if options.require_signature && !bytes.starts_with(PDF_SIGNATURE) {
            return Err(Error::document(source, "missing %PDF signature"));
        }

        let mut doc = Document::load_mem(bytes).map_err(|e| Error::document(&source, e))?;
        if options.decompress {
            doc.decompress();
        }

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!(source = %source.display(), pages = page_ids.len(), "Loaded PDF document");

        Ok(Self { doc, page_ids })
    }

    /// Wrap an already parsed document
    pub fn from_document(doc: Document) -> Self {
        let page_ids = doc.get_pages().into_values().collect();
        Self { doc, page_ids }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        if page == 0 || page > self.page_ids.len() {
            return Err(Error::page(
                page,
                format!("page out of range, document has {} pages", self.page_ids.len()),
            ));
        }
        Ok(self.page_ids[page - 1])
    }

    fn page_dict(&self, page: usize) -> Result<&Dictionary> {
        let id = self.page_id(page)?;
        self.doc
            .get_dictionary(id)
            .map_err(|e| Error::page(page, format!("page object unreadable: {}", e)))
    }

    fn page_dict_mut(&mut self, page: usize) -> Result<&mut Dictionary> {
        let id = self.page_id(page)?;
        self.doc
            .get_dictionary_mut(id)
            .map_err(|e| Error::page(page, format!("page object unreadable: {}", e)))
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    /// Find `key` on the page or the nearest ancestor that has it
    fn find_inherited(&self, page: usize, key: &[u8]) -> Result<Option<&Object>> {
        let mut dict = self.page_dict(page)?;
        let name = String::from_utf8_lossy(key);

        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(found) = dict.get(key) {
                return self
                    .resolve(found)
                    .map(Some)
                    .ok_or_else(|| Error::page(page, format!("{} reference is dangling", name)));
            }
            let parent = match dict.get(b"Parent").ok().and_then(|p| self.resolve(p)) {
                Some(Object::Dictionary(parent)) => parent,
                _ => break,
            };
            dict = parent;
        }

        Ok(None)
    }

    /// Read a rectangle attribute, normalized so that x0 < x1 and y0 < y1
    fn read_box(&self, page: usize, key: &[u8]) -> Result<Option<BoundingBox>> {
        let name = String::from_utf8_lossy(key);
        let array = match self.find_inherited(page, key)? {
            None => return Ok(None),
            Some(Object::Array(array)) => array,
            Some(_) => return Err(Error::page(page, format!("{} is not an array", name))),
        };
        if array.len() < 4 {
            return Err(Error::page(page, format!("{} has {} entries", name, array.len())));
        }

        let mut values = [0.0f64; 4];
        for (slot, entry) in values.iter_mut().zip(array.iter()) {
            let number = self
                .resolve(entry)
                .and_then(PdfNumber::from_object)
                .ok_or_else(|| Error::page(page, format!("{} entry is not a number", name)))?;
            *slot = number.value();
        }

        let [ax, ay, bx, by] = values;
        let bbox = BoundingBox::new(ax.min(bx), ay.min(by), ax.max(bx), ay.max(by));
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return Err(Error::page(page, format!("{} has zero area", name)));
        }

        Ok(Some(bbox))
    }

    /// Read the page's MediaBox, normalized so that x0 < x1 and y0 < y1
    pub fn page_box(&self, page: usize) -> Result<BoundingBox> {
        self.read_box(page, b"MediaBox")?
            .ok_or_else(|| Error::page(page, "no MediaBox found"))
    }

    /// The area viewers and renderers show: the CropBox clipped to the MediaBox
    ///
    /// A CropBox that is malformed or does not overlap the MediaBox is ignored.
    pub fn visible_box(&self, page: usize) -> Result<BoundingBox> {
        let media = self.page_box(page)?;
        let crop = match self.read_box(page, b"CropBox") {
            Ok(Some(crop)) => crop,
            _ => return Ok(media),
        };

        let clipped = BoundingBox::new(
            crop.x0.max(media.x0),
            crop.y0.max(media.y0),
            crop.x1.min(media.x1),
            crop.y1.min(media.y1),
        );
        if clipped.width() <= 0.0 || clipped.height() <= 0.0 {
            warn!(page, "CropBox lies outside the MediaBox, ignoring it");
            return Ok(media);
        }
        Ok(clipped)
    }

    /// Clockwise page rotation in degrees: 0, 90, 180 or 270
    pub fn rotation(&self, page: usize) -> Result<u16> {
        let degrees = match self.find_inherited(page, b"Rotate")? {
            None => 0,
            Some(object) => PdfNumber::from_object(object)
                .map(|n| n.value().round() as i64)
                .ok_or_else(|| Error::page(page, "Rotate is not a number"))?,
        };
        if degrees % 90 != 0 {
            return Err(Error::page(page, format!("Rotate {} is not a multiple of 90", degrees)));
        }
        Ok(degrees.rem_euclid(360) as u16)
    }

    /// Width and height of the page as displayed, in points
    ///
    /// This is the visible box with width and height swapped for quarter turns.
    pub fn display_size(&self, page: usize) -> Result<(f64, f64)> {
        let visible = self.visible_box(page)?;
        match self.rotation(page)? {
            90 | 270 => Ok((visible.height(), visible.width())),
            _ => Ok((visible.width(), visible.height())),
        }
    }

    /// Write a MediaBox directly on the page
    ///
    /// A CropBox would hide the area the new box adds, so it is removed.
    pub fn set_page_box(&mut self, page: usize, bbox: BoundingBox) -> Result<()> {
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return Err(Error::page(page, "refusing to write a MediaBox with zero area"));
        }

        let dict = self.page_dict_mut(page)?;
        dict.set("MediaBox", bbox.to_object());
        dict.remove(b"CropBox");

        // An ancestor's CropBox would still clip the grown page
        if self.find_inherited(page, b"CropBox")?.is_some() {
            self.page_dict_mut(page)?.set("CropBox", bbox.to_object());
        }
        Ok(())
    }

    fn content_ids(&self, page: usize) -> Result<Option<Vec<ObjectId>>> {
        let dict = self.page_dict(page)?;
        let ids = match dict.get(b"Contents") {
            Err(_) => return Ok(Some(Vec::new())),
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                // Some writers put the array behind a reference
                Ok(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
                _ => vec![*id],
            },
            Ok(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
            Ok(_) => return Ok(None),
        };
        Ok(Some(ids))
    }

    /// Read the page's drawing operators, decompressed
    ///
    /// Never fails on bad content: the page comes back as [`PageContent::Lost`] and a
    /// warning is logged.
    pub fn page_content(&self, page: usize) -> Result<PageContent> {
        let ids = match self.content_ids(page)? {
            Some(ids) => ids,
            None => return Ok(self.lost(page, "Contents is neither a stream nor an array")),
        };

        let mut content = Vec::new();
        for id in ids {
            let stream = match self.doc.get_object(id) {
                Ok(Object::Stream(stream)) => stream,
                _ => return Ok(self.lost(page, format!("content object {} {} is not a stream", id.0, id.1))),
            };

            if stream.dict.has(b"Filter") {
                match stream.decompressed_content() {
                    Ok(data) => content.extend_from_slice(&data),
                    Err(e) => return Ok(self.lost(page, format!("cannot decode content stream: {}", e))),
                }
            } else {
                content.extend_from_slice(&stream.content);
            }
            content.push(b'\n');
        }

        Ok(PageContent::Decoded(content))
    }

    fn lost(&self, page: usize, reason: impl Into<String>) -> PageContent {
        let reason = reason.into();
        warn!(page, reason = %reason, "Page content could not be decoded");
        PageContent::Lost { reason }
    }

    /// Replace the page's content with a single new stream
    pub fn set_page_content(&mut self, page: usize, content: Vec<u8>) -> Result<()> {
        let page_id = self.page_id(page)?;
        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let dict = self
            .doc
            .get_dictionary_mut(page_id)
            .map_err(|e| Error::page(page, format!("page object unreadable: {}", e)))?;
        dict.set("Contents", Object::Reference(stream_id));
        Ok(())
    }

    /// Compress and write the document
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.doc.compress();
        self.doc.save(path)?;
        debug!(path = %path.display(), "Saved PDF document");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One page per entry; each page's MediaBox is written with integers
    pub(crate) fn sample_document(boxes: &[(i64, i64)], content: &[u8]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for &(w, h) in boxes {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set(
                "MediaBox",
                Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(w), Object::Integer(h)]),
            );
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        doc
    }

    /// Point a page's Contents at an object that is not a stream
    pub(crate) fn break_contents(doc: &mut Document, page: u32) {
        let page_id = doc.get_pages()[&page];
        let bogus = doc.add_object(Object::Integer(7));
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Contents", Object::Reference(bogus));
    }

    fn to_bytes(mut doc: Document) -> Vec<u8> {
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_reads_integer_and_real_boxes() {
        let mut doc = sample_document(&[(612, 792), (595, 842)], b"0 0 m 10 10 l S");
        let second = doc.get_pages()[&2];
        doc.get_dictionary_mut(second).unwrap().set(
            "MediaBox",
            Object::Array(vec![Object::Real(0.0), Object::Integer(0), Object::Real(595.5), Object::Integer(842)]),
        );

        let model = PageModel::from_document(doc);
        assert_eq!(model.page_count(), 2);
        assert_eq!(model.page_box(1).unwrap(), BoundingBox::new(0.0, 0.0, 612.0, 792.0));
        assert_eq!(model.page_box(2).unwrap(), BoundingBox::new(0.0, 0.0, 595.5, 842.0));
    }

    #[test]
    fn test_inherited_media_box() {
        let mut doc = sample_document(&[(100, 100)], b"");
        let page_id = doc.get_pages()[&1];
        doc.get_dictionary_mut(page_id).unwrap().remove(b"MediaBox");

        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        doc.get_dictionary_mut(pages_id).unwrap().set(
            "MediaBox",
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(300), Object::Integer(400)]),
        );

        let model = PageModel::from_document(doc);
        assert_eq!(model.page_box(1).unwrap(), BoundingBox::new(0.0, 0.0, 300.0, 400.0));
    }

    #[test]
    fn test_missing_box_names_the_page() {
        let mut doc = sample_document(&[(100, 100), (100, 100)], b"");
        let page_id = doc.get_pages()[&2];
        doc.get_dictionary_mut(page_id).unwrap().remove(b"MediaBox");

        let model = PageModel::from_document(doc);
        match model.page_box(2) {
            Err(Error::Page { page, reason }) => {
                assert_eq!(page, 2);
                assert!(reason.contains("MediaBox"));
            }
            other => panic!("expected page error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_box_entry() {
        let mut doc = sample_document(&[(100, 100)], b"");
        let page_id = doc.get_pages()[&1];
        doc.get_dictionary_mut(page_id).unwrap().set(
            "MediaBox",
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Name(b"Wide".to_vec()), Object::Integer(10)]),
        );

        let model = PageModel::from_document(doc);
        assert!(matches!(model.page_box(1), Err(Error::Page { page: 1, .. })));
    }

    #[test]
    fn test_page_index_is_one_based() {
        let model = PageModel::from_document(sample_document(&[(100, 100)], b""));
        assert!(matches!(model.page_box(0), Err(Error::Page { page: 0, .. })));
        assert!(matches!(model.page_box(2), Err(Error::Page { page: 2, .. })));
        assert!(model.page_box(1).is_ok());
    }

    #[test]
    fn test_display_size_follows_crop_box_and_rotation() {
        let mut doc = sample_document(&[(600, 800)], b"");
        let page_id = doc.get_pages()[&1];
        doc.get_dictionary_mut(page_id).unwrap().set(
            "CropBox",
            Object::Array(vec![Object::Integer(50), Object::Integer(0), Object::Integer(650), Object::Integer(400)]),
        );

        let model = PageModel::from_document(doc.clone());
        assert_eq!(model.visible_box(1).unwrap(), BoundingBox::new(50.0, 0.0, 600.0, 400.0));
        assert_eq!(model.rotation(1).unwrap(), 0);
        assert_eq!(model.display_size(1).unwrap(), (550.0, 400.0));

        // Rotation inherited from the page tree root
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        doc.get_dictionary_mut(pages_id).unwrap().set("Rotate", Object::Integer(-90));
        let model = PageModel::from_document(doc);
        assert_eq!(model.rotation(1).unwrap(), 270);
        assert_eq!(model.display_size(1).unwrap(), (400.0, 550.0));
    }

    #[test]
    fn test_bad_rotation_is_a_page_error() {
        let mut doc = sample_document(&[(100, 100)], b"");
        let page_id = doc.get_pages()[&1];
        doc.get_dictionary_mut(page_id).unwrap().set("Rotate", Object::Integer(45));

        let model = PageModel::from_document(doc);
        assert!(matches!(model.rotation(1), Err(Error::Page { page: 1, .. })));
        assert_eq!(model.page_box(1).unwrap(), BoundingBox::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_set_box_drops_crop_box() {
        let mut doc = sample_document(&[(100, 100)], b"");
        let page_id = doc.get_pages()[&1];
        doc.get_dictionary_mut(page_id).unwrap().set(
            "CropBox",
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(100), Object::Integer(100)]),
        );

        let mut model = PageModel::from_document(doc);
        model.set_page_box(1, BoundingBox::new(0.0, 0.0, 150.0, 160.0)).unwrap();

        assert_eq!(model.page_box(1).unwrap(), BoundingBox::new(0.0, 0.0, 150.0, 160.0));
        assert_eq!(model.visible_box(1).unwrap(), BoundingBox::new(0.0, 0.0, 150.0, 160.0));
    }

    #[test]
    fn test_set_box_overrides_inherited_crop_box() {
        let mut doc = sample_document(&[(100, 100)], b"");
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        doc.get_dictionary_mut(pages_id).unwrap().set(
            "CropBox",
            Object::Array(vec![Object::Integer(10), Object::Integer(10), Object::Integer(90), Object::Integer(90)]),
        );

        let mut model = PageModel::from_document(doc);
        assert_eq!(model.visible_box(1).unwrap(), BoundingBox::new(10.0, 10.0, 90.0, 90.0));
        model.set_page_box(1, BoundingBox::new(0.0, 0.0, 150.0, 160.0)).unwrap();
        assert_eq!(model.visible_box(1).unwrap(), BoundingBox::new(0.0, 0.0, 150.0, 160.0));
    }

    #[test]
    fn test_content_round_trip() {
        let mut model = PageModel::from_document(sample_document(&[(100, 100)], b"0 0 m 5 5 l S"));
        let before = model.page_content(1).unwrap();
        assert_eq!(before, PageContent::Decoded(b"0 0 m 5 5 l S\n".to_vec()));

        model.set_page_content(1, b"q Q".to_vec()).unwrap();
        assert_eq!(model.page_content(1).unwrap().into_bytes(), b"q Q\n".to_vec());
    }

    #[test]
    fn test_undecodable_content_is_lost_not_fatal() {
        let mut doc = sample_document(&[(100, 100)], b"0 0 m");
        break_contents(&mut doc, 1);

        let model = PageModel::from_document(doc);
        let content = model.page_content(1).unwrap();
        assert!(content.is_lost());
        assert!(content.into_bytes().is_empty());
    }

    #[test]
    fn test_page_without_contents_is_empty() {
        let mut doc = sample_document(&[(100, 100)], b"");
        let page_id = doc.get_pages()[&1];
        doc.get_dictionary_mut(page_id).unwrap().remove(b"Contents");

        let model = PageModel::from_document(doc);
        assert_eq!(model.page_content(1).unwrap(), PageContent::Decoded(Vec::new()));
    }

    #[test]
    fn test_load_mem_rejects_empty_and_unsigned_input() {
        let options = LoadOptions::default();
        assert!(matches!(PageModel::load_mem(b"", &options), Err(Error::Document { .. })));
        assert!(matches!(
            PageModel::load_mem(b"GIF89a not a pdf", &options),
            Err(Error::Document { .. })
        ));
        assert!(matches!(
            PageModel::load_mem(b"%PDF-1.4\ngarbage", &options),
            Err(Error::Document { .. })
        ));
    }

    #[test]
    fn test_load_mem_round_trip() {
        let bytes = to_bytes(sample_document(&[(612, 792)], b"BT ET"));
        let model = PageModel::load_mem(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(model.page_count(), 1);
        assert_eq!(model.page_box(1).unwrap().width(), 612.0);
    }
}
