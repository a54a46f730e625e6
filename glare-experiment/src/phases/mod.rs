//! The four experiment segments, run in order by the orchestrator.

pub mod afterimage;
pub mod brightness;
pub mod main_task;
pub mod positioning;
