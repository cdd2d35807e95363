pub mod completion;
pub mod risk;
pub mod schema;
