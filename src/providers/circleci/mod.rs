mod client;
mod job_details;
mod provider;
mod slugs;
mod types;

pub use client::{
    CircleCiClient, ClientOptions, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use job_details::{resolve, resolve_job, JobDetail};
pub use provider::CircleCiProvider;
pub use slugs::{candidate_slugs, dedup_slugs};
pub use types::ApiWorkflow;
