// Candidate scoring engine.
// Text normalization, competency extraction, level mapping, similarity,
// adherence, fit prediction and score composition, orchestrated by the
// ranking pipeline. Pure and synchronous; callers own concurrency.

pub mod adherence;
pub mod classifier;
pub mod composer;
pub mod export;
pub mod levels;
pub mod models;
pub mod pipeline;
pub mod similarity;
pub mod text;
