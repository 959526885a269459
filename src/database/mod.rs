pub mod error;
pub mod store;
pub mod memory;
pub mod postgres;
pub mod ids;
pub mod query_translator;
pub mod repository;
pub mod models;

pub use error::DatabaseError;
pub use store::{DocumentStore, FindQuery};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use ids::IdGenerator;
pub use query_translator::QueryTranslator;
pub use repository::{parse_identifier, Repository};
