pub mod db;
pub mod email;
pub mod memory;

pub use db::PgDocumentStore;
pub use email::{LogNotifier, SmtpNotifier};
pub use memory::InMemoryDocumentStore;
