//! PDF manipulation module

pub mod page_model;
pub mod rewrite;
pub mod assemble;

// Re-export commonly used items
pub use page_model::{BoundingBox, LoadOptions, PageContent, PageModel, PDF_SIGNATURE};
pub use rewrite::{inset_document, inset_envelope, inset_page, InsetReport};
pub use assemble::assemble_documents;
