pub mod defs;

pub use defs::{DifficultyLevel, FetchPapers, PaperRecord, PaperSource, Persist, Summarize};
