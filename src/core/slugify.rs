use std::path::Path;

/// Session slug for a project root path.
///
/// Slugifies the final path component and appends a short hash of the full
/// path so distinct projects with the same directory name get distinct
/// session files.
pub(crate) fn session_slug(root: &Path) -> String {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut slug = slugify(&name);
    if slug.is_empty() {
        slug = "project".to_string();
    }

    format!("{}-{:08x}", slug, fnv1a(root.to_string_lossy().as_bytes()))
}

fn slugify(value: &str) -> String {
    let mut out = String::new();
    let mut prev_was_dash = false;

    for ch in value.trim().chars() {
        let normalized = match ch {
            'a'..='z' | '0'..='9' => Some(ch),
            'A'..='Z' => Some(ch.to_ascii_lowercase()),
            _ if ch.is_whitespace() || ch == '_' || ch == '-' || ch == '.' => Some('-'),
            _ => None,
        };

        if let Some(c) = normalized {
            if c == '-' {
                if out.is_empty() || prev_was_dash {
                    continue;
                }
                out.push('-');
                prev_was_dash = true;
            } else {
                out.push(c);
                prev_was_dash = false;
            }
        }
    }

    while out.ends_with('-') {
        out.pop();
    }

    out
}

// FNV-1a, 32-bit. Stable across builds, unlike the std hasher.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for b in bytes {
        hash ^= u32::from(*b);
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn slug_uses_directory_name() {
        let slug = session_slug(&PathBuf::from("/home/dev/My Game"));
        assert!(slug.starts_with("my-game-"));
    }

    #[test]
    fn slug_is_stable() {
        let a = session_slug(&PathBuf::from("/srv/proj"));
        let b = session_slug(&PathBuf::from("/srv/proj"));
        assert_eq!(a, b);
    }

    #[test]
    fn same_name_different_parent_differs() {
        let a = session_slug(&PathBuf::from("/alpha/Game"));
        let b = session_slug(&PathBuf::from("/beta/Game"));
        assert_ne!(a, b);
    }

    #[test]
    fn unusable_name_falls_back() {
        let slug = session_slug(&PathBuf::from("/"));
        assert!(slug.starts_with("project-"));
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("My  Cool__Game"), "my-cool-game");
    }
}
