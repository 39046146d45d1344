//! Data models for genstudio-web

pub mod job;
pub mod remote_asset;
pub mod work;

pub use job::{JobOutput, JobProgress, JobRecord, JobState};
pub use remote_asset::{AssetHandle, AssetRef, AssetStatus, RemoteAsset};
pub use work::{
    FailureReason, OutcomeCounts, SkipReason, WorkItem, WorkOutcome, WorkResult,
};
