pub mod fields;
pub mod manager;
pub mod normalize;
pub mod policy;
pub mod ranker;
pub mod scorer;
pub mod similarity;

pub use manager::MatchingEngine;
pub use similarity::Algorithm;
