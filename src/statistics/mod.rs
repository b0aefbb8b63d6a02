//! Read-side aggregation over the job tree.
//!
//! - `job`: per-job brief info and derived status
//! - `sharding`: per-item sharding status and assignment
//! - `server`: per-server counts and listings
//!
//! Every query is scoped by an optional tenant and reads the registry
//! directly; nothing is cached between calls.

pub mod job;
pub mod sharding;
pub mod server;

pub use job::{JobBriefInfo, JobStatisticsApi, JobStatus, JobStatusFacts};
pub use server::{ServerBriefInfo, ServerStatisticsApi};
pub use sharding::{ShardingInfo, ShardingStatisticsApi, ShardingStatus};
