mod core;
mod legacy;
mod logs;
mod pipelines;

pub use self::core::{
    CircleCiClient, ClientOptions, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
