pub mod language;
pub mod preprocess;
