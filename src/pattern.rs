//! Ant-style artifact patterns.
//!
//! - `?` matches exactly one character within a path segment
//! - `*` matches zero or more characters within a path segment
//! - `**` matches zero or more whole segments
//!
//! A pattern ending in `/` is treated as if followed by `**`.

/// A comma-separated list of patterns.
#[derive(Debug, Clone)]
pub struct ArtifactPattern {
    patterns: Vec<Vec<String>>,
}

impl ArtifactPattern {
    pub fn new(list: &str) -> Self {
        let patterns = list
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                let mut p = p.replace('\\', "/");
                if p.ends_with('/') {
                    p.push_str("**");
                }
                p.split('/')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .collect();

        Self { patterns }
    }

    /// Whether a `/`-separated relative path matches any of the patterns.
    pub fn matches(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        self.patterns.iter().any(|pattern| {
            let pattern: Vec<&str> = pattern.iter().map(String::as_str).collect();
            match_segments(&pattern, &segments)
        })
    }
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.first() {
        None => path.is_empty(),
        Some(&"**") => {
            // Zero segments, or swallow one and stay on `**`
            match_segments(&pattern[1..], path)
                || (!path.is_empty() && match_segments(pattern, &path[1..]))
        }
        Some(p) => {
            !path.is_empty() && glob_match(p, path[0]) && match_segments(&pattern[1..], &path[1..])
        }
    }
}

/// Glob matching of a single segment supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}
