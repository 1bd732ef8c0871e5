/// VCS prefixes the v1.1 API accepts, as (short, long) spellings.
const VCS_ALIASES: [(&str, &str); 2] = [("gh", "github"), ("bb", "bitbucket")];

/// Builds the ordered list of project slugs to try against the v1.1 API.
///
/// A bare `owner/repo` expands to the short then the long GitHub spelling.
/// An already-prefixed slug is tried as given, then under its alternate prefix.
///
/// # Examples
///
/// `org/site` → `["gh/org/site", "github/org/site"]`
/// `github/org/site` → `["github/org/site", "gh/org/site"]`
pub fn candidate_slugs(project: &str) -> Vec<String> {
    let project = project.trim().trim_matches('/');
    if project.is_empty() {
        return Vec::new();
    }

    let (prefix, path) = match project.split_once('/') {
        Some((prefix, path)) if alternate_prefix(prefix).is_some() => (Some(prefix), path),
        _ => (None, project),
    };

    match prefix {
        Some(prefix) => {
            let mut slugs = vec![format!("{prefix}/{path}")];
            if let Some(alternate) = alternate_prefix(prefix) {
                slugs.push(format!("{alternate}/{path}"));
            }
            slugs
        }
        None => vec![format!("gh/{path}"), format!("github/{path}")],
    }
}

/// Deduplicates an explicit slug list, keeping the first occurrence of each.
pub fn dedup_slugs(slugs: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for slug in slugs {
        let slug = slug.trim().trim_matches('/').to_string();
        if !slug.is_empty() && !unique.contains(&slug) {
            unique.push(slug);
        }
    }
    unique
}

fn alternate_prefix(prefix: &str) -> Option<&'static str> {
    VCS_ALIASES.iter().find_map(|(short, long)| {
        if prefix == *short {
            Some(*long)
        } else if prefix == *long {
            Some(*short)
        } else {
            None
        }
    })
}
