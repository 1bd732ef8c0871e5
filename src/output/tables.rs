use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::snapshot::{FetchStatus, Job};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn color_coded_status_cell(status: &str) -> Cell {
    match status {
        "running" => Cell::new(status).fg(TableColor::Yellow),
        "success" => Cell::new(status).fg(TableColor::Green),
        "failed" | "error" | "failing" | "infrastructure_fail" | "timedout" => {
            Cell::new(status).fg(TableColor::Red)
        }
        _ => Cell::new(status).fg(TableColor::DarkGrey),
    }
}

pub fn fetch_status_cell(job: &Job) -> Cell {
    match job.fetch_status {
        FetchStatus::Success => Cell::new("logs ✓").fg(TableColor::Green),
        FetchStatus::Failed => match &job.fetch_error {
            Some(error) => Cell::new(format!("logs unavailable: {error}")).fg(TableColor::Red),
            None => Cell::new("logs unavailable").fg(TableColor::Red),
        },
        FetchStatus::NotStarted => Cell::new("not started").fg(TableColor::DarkGrey),
        FetchStatus::Pending => Cell::new("pending").fg(TableColor::Yellow),
    }
}

/// One row per job, in workflow order.
pub fn jobs_table(jobs: &[Job]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["#", "Job", "Status", "Steps", "Logs"]);

    for job in jobs {
        table.add_row(vec![
            Cell::new(
                job.job_number
                    .map_or_else(|| "-".to_string(), |n| n.to_string()),
            ),
            Cell::new(&job.name),
            color_coded_status_cell(job.status.as_str()),
            Cell::new(job.steps.len()),
            fetch_status_cell(job),
        ]);
    }

    table
}
