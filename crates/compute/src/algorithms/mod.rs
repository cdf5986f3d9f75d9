pub mod dbscan;
pub mod normalize;
pub mod spot;
pub mod stats;
