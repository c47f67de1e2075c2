pub mod classification;
pub mod engine;
pub mod high_scores;
pub mod note;
pub mod note_score;
pub mod replay;
pub mod scoring_profile;
pub mod session;
pub mod system;
pub mod timing_windows;
