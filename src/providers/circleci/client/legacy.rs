use super::core::CircleCiClient;
use crate::error::Result;
use crate::providers::circleci::types::LegacyJobDetail;

impl CircleCiClient {
    /// v1.1 job detail, addressed by project slug and job number.
    ///
    /// `slug` is a VCS-prefixed project path such as `gh/org/repo`.
    pub async fn fetch_job_detail(&self, slug: &str, job_number: u64) -> Result<LegacyJobDetail> {
        let job_number = job_number.to_string();
        let url = self.endpoint(
            ["v1.1", "project"]
                .into_iter()
                .chain(slug.trim_matches('/').split('/'))
                .chain([job_number.as_str()]),
        )?;
        self.get_json(url).await
    }
}
