//! Lexical path normalization for source paths given on the command line.
//!
//! Relative results always start with `./` or `../`. A segment of `n` dots
//! (`n >= 2`) climbs `n - 1` directories, so `...` goes one level further
//! up than `..`. Nothing is resolved against the file system.

/// Normalize `path` without touching the disk.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    let mut ups = 0usize;
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            dots if dots.len() >= 2 && dots.chars().all(|c| c == '.') => {
                for _ in 1..dots.len() {
                    if parts.pop().is_none() && !absolute {
                        ups += 1;
                    }
                }
            }
            name => parts.push(name),
        }
    }
    let tail = parts.join("/");
    if absolute {
        return format!("/{tail}");
    }
    let mut out = if ups == 0 {
        "./".to_string()
    } else {
        "../".repeat(ups)
    };
    out.push_str(&tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_directory_gets_a_slash() {
        assert_eq!(normalize("."), "./");
    }

    #[test]
    fn parent_segments_cancel_names() {
        assert_eq!(normalize("foo/../bar.ql"), "./bar.ql");
        assert_eq!(normalize("/foo/../bar.ql"), "/bar.ql");
        assert_eq!(normalize("a/./b//c.ql"), "./a/b/c.ql");
    }

    #[test]
    fn triple_dot_climbs_one_more_level() {
        assert_eq!(normalize("foo/.../bar.ql"), "../bar.ql");
        assert_eq!(normalize("../x.ql"), "../x.ql");
    }

    #[test]
    fn root_cannot_be_escaped() {
        assert_eq!(normalize("/../x.ql"), "/x.ql");
    }
}
