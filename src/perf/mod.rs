pub mod builder;
pub mod display;
pub mod model;
pub mod names;
pub mod nom;
pub mod reader;
pub mod types;
pub mod values;
