use console::{style, StyledObject};

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Colors a CircleCI status string: running is yellow, success green,
/// failures red, anything else dim.
pub fn status(text: &str) -> StyledObject<String> {
    match text {
        "running" => bright_yellow(text),
        "success" => bright_green(text),
        "failed" | "error" | "failing" | "infrastructure_fail" | "timedout" => bright_red(text),
        _ => dim(text),
    }
}
