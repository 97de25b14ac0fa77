//! Join single-page documents into one document, in order

use std::collections::BTreeMap;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::{Error, Result};

/// Combine documents into one, keeping every page in the given order
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
pub fn assemble_documents(documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        return Err(Error::InvalidInput("No pages to assemble".to_string()));
    }

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());

        // The old catalog and page tree roots are replaced below
        let catalog_id = doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(Error::Pdf)?;
        let pages_id = doc
            .get_dictionary(catalog_id)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .ok();
        for id in std::iter::once(catalog_id).chain(pages_id) {
            doc.objects.remove(&id);
        }

        objects.extend(doc.objects);
    }

    let mut assembled = Document::with_version("1.5");
    assembled.objects.extend(objects);

    // new_object_id() must hand out ids above everything just added
    assembled.max_id = max_id - 1;

    let pages_id = assembled.new_object_id();

    let kids: Vec<Object> = page_ids
        .iter()
        .map(|&id| Object::Reference(id))
        .collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = assembled.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    assembled.objects.insert(catalog_id, Object::Dictionary(catalog));
    assembled.objects.insert(pages_id, Object::Dictionary(pages_object));
    assembled.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = assembled.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::page_model::tests::sample_document;
    use crate::pdf::page_model::PageModel;

    #[test]
    fn test_assemble_keeps_page_order() {
        let docs = vec![
            sample_document(&[(100, 100)], b"% first"),
            sample_document(&[(200, 200), (300, 300)], b"% second"),
        ];

        let model = PageModel::from_document(assemble_documents(docs).unwrap());

        assert_eq!(model.page_count(), 3);
        let widths: Vec<f64> = (1..=3).map(|p| model.page_box(p).unwrap().width()).collect();
        assert_eq!(widths, vec![100.0, 200.0, 300.0]);

        let first = model.page_content(1).unwrap().into_bytes();
        assert!(String::from_utf8_lossy(&first).contains("% first"));
    }

    #[test]
    fn test_assemble_points_pages_at_new_tree() {
        let doc = assemble_documents(vec![sample_document(&[(100, 100)], b"")]).unwrap();
        let pages_id = doc
            .catalog()
            .unwrap()
            .get(b"Pages")
            .unwrap()
            .as_reference()
            .unwrap();

        for page_id in doc.get_pages().into_values() {
            let parent = doc.get_dictionary(page_id).unwrap().get(b"Parent").unwrap();
            assert_eq!(parent.as_reference().unwrap(), pages_id);
        }
    }

    #[test]
    fn test_assemble_rejects_document_without_catalog() {
        let mut orphan = sample_document(&[(100, 100)], b"");
        orphan.trailer.remove(b"Root");

        let result = assemble_documents(vec![sample_document(&[(100, 100)], b""), orphan]);
        assert!(matches!(result, Err(Error::Pdf(_))));
    }

    #[test]
    fn test_assemble_nothing_is_an_error() {
        assert!(assemble_documents(Vec::new()).is_err());
    }
}
