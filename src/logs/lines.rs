use crate::snapshot::Job;

/// Flattens every job's aggregated log into display lines.
///
/// Job order is kept, then line order within each job. Blank lines are
/// dropped. The result is rebuilt from scratch for every snapshot.
pub fn project_log_lines(jobs: &[Job]) -> Vec<String> {
    jobs.iter()
        .flat_map(|job| job.full_log.lines())
        .filter(|line| !line.trim().is_empty())
        .map(ToString::to_string)
        .collect()
}
