pub mod pipeline;

pub use pipeline::{SegmenterConfig, Utterance, UtteranceSegmenter};
