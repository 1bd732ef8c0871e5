//! Pure transforms over a snapshot's logs.

mod deploy_url;
mod lines;

pub use deploy_url::{extract_deployment_url, extract_deployment_urls, DeploymentUrls};
pub use lines::project_log_lines;
