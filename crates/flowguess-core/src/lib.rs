pub mod catalog;
mod flow;
pub mod naming;
mod validation;

pub use catalog::{ActionDescriptor, Catalog, Integration, StaticCatalog};
pub use flow::*;
pub use validation::*;
