//! CLI command implementations

pub mod fields;
pub mod make;

pub use fields::FieldsCommand;
pub use make::MakeCommand;
