pub mod arxiv;
pub mod huggingface;

pub use arxiv::ArxivSource;
pub use huggingface::TrendingSource;
