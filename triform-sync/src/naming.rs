//! Folder and file names derived from component names.

use std::collections::HashSet;
use std::path::Path;

use triform_core::types::UNNAMED;
use triform_detector::read_sidecar;

/// Directory-safe version of a display name.
///
/// Keeps alphanumerics, `-`, `_` and spaces; anything else becomes `_`.
/// Runs of spaces collapse to one and the result is trimmed.
pub fn sanitize_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let collapsed = collapse(&mapped, ' ');
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        UNNAMED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// File-safe, lower-cased version of a display name (no spaces).
pub fn sanitize_filename(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let collapsed = collapse(&mapped, '_');
    let trimmed = collapsed.trim_matches('_').to_lowercase();
    if trimmed.is_empty() {
        UNNAMED.to_string()
    } else {
        trimmed
    }
}

fn collapse(s: &str, sep: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_sep = false;
    for c in s.chars() {
        if c == sep {
            if !prev_sep {
                out.push(c);
            }
            prev_sep = true;
        } else {
            out.push(c);
            prev_sep = false;
        }
    }
    out
}

/// Pick a free folder name for `raw_name` inside `parent`.
///
/// A name is taken when it is already in `reserved` (siblings placed during
/// this walk) or when a folder of that name exists on disk, unless that
/// folder's identity sidecar names `owner`. Collisions get `" 2"`, `" 3"`, …
/// appended. The chosen name is added to `reserved`.
pub fn unique_dir_name(
    parent: &Path,
    raw_name: &str,
    reserved: &mut HashSet<String>,
    owner: Option<&str>,
) -> String {
    let base = sanitize_name(raw_name);
    let mut candidate = base.clone();
    let mut counter = 2u32;
    while !is_free(parent, &candidate, reserved, owner) {
        candidate = format!("{base} {counter}");
        counter += 1;
    }
    reserved.insert(candidate.clone());
    candidate
}

fn is_free(parent: &Path, name: &str, reserved: &HashSet<String>, owner: Option<&str>) -> bool {
    if reserved.contains(name) {
        return false;
    }
    let dir = parent.join(name);
    if !dir.exists() {
        return true;
    }
    match (owner, read_sidecar(&dir)) {
        (Some(owner), Ok(Some(sidecar))) => dir.is_dir() && sidecar.id == owner,
        _ => false,
    }
}
