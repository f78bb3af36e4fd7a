pub mod match_engine;

pub use match_engine::PairMatcher;
