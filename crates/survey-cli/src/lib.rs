//! Library side of the `hbp-survey` command: logging setup and the run pipeline.

pub mod logging;
pub mod pipeline;
