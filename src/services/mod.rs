pub mod artifact;
pub mod embedders;
pub mod indexing;
pub mod normalizer;
pub mod recommendations;
pub mod supplementary;

pub use embedders::Embedder;
pub use indexing::{IndexOptions, IndexReport, IndexStage, Indexer};
pub use recommendations::Recommender;
