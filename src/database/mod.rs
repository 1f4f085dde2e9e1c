// Document store abstraction and the in-process implementation
pub mod document_store;
pub mod memory;

pub use document_store::{
    BatchWrite, CollectionPath, Document, DocumentPath, DocumentStore, Filter, WriteBatch, WriteFields,
};
pub use memory::InMemoryDocumentStore;

/// Top-level collection every studio lives under.
pub const STUDIOS: &str = "Studios";

/// `Studios/{studio_id}`
pub fn studio_doc(studio_id: &str) -> DocumentPath {
    CollectionPath::root(STUDIOS).doc(studio_id)
}
