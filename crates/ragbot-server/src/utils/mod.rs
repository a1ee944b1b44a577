pub mod error;
pub mod similarity;
pub mod text;

pub use similarity::cosine_similarity;
