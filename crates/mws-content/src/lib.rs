pub mod records;
pub mod store;
pub mod xml;

pub use records::*;
pub use store::ContentStore;
