// Per-frame building blocks, lowest level first.
pub mod pixel;
pub mod frame;
pub mod mask;
pub mod thresholder;
pub mod background_model;
pub mod sector_grid;
pub mod shot;
pub mod color;
pub mod shot_searcher;
