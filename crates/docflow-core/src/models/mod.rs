pub mod catalog;
pub mod document;
pub mod entity;
pub mod history;
pub mod training;

pub use catalog::*;
pub use document::*;
pub use entity::*;
pub use history::*;
pub use training::*;
