//! HTTP API handlers for genstudio-web
//!
//! Quick features answer inline; long-running ones return 202 with a job id.

pub mod downloads;
pub mod forms;
pub mod health;
pub mod images;
pub mod jobs;
pub mod media;
pub mod spreadsheet;
pub mod sse;
pub mod story;
pub mod text;
pub mod ui;

pub use downloads::download_routes;
pub use health::health_routes;
pub use images::image_routes;
pub use jobs::{job_routes, JobAccepted};
pub use media::media_routes;
pub use spreadsheet::spreadsheet_routes;
pub use sse::{event_stream, job_event_stream};
pub use story::story_routes;
pub use text::text_routes;
pub use ui::ui_routes;
