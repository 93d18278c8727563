//! Deterministic window names: `chore-<id>-<phase>[-<slug>]`.
//!
//! The id and phase are recovered by parsing the name back, so a window can
//! be found from its chore id without a side index. Windows named by older
//! builds (`chore-<id>-<slug>`, no phase) still parse, with no phase.

use chores_core::{ChoreId, Phase};
use serde::Serialize;

pub const WINDOW_PREFIX: &str = "chore-";

/// Maximum slug length in characters.
pub const SLUG_MAX_CHARS: usize = 30;

/// Lower-case, keep word characters, spaces and hyphens, collapse
/// space/hyphen runs into one hyphen, trim hyphens, truncate.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            pending_sep = true;
        } else if c.is_alphanumeric() || c == '_' {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c);
        }
    }

    let truncated: String = out.chars().take(SLUG_MAX_CHARS).collect();
    truncated.trim_end_matches('-').to_string()
}

#[must_use]
pub fn window_name(id: ChoreId, phase: Phase, name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        format!("{WINDOW_PREFIX}{id}-{phase}")
    } else {
        format!("{WINDOW_PREFIX}{id}-{phase}-{slug}")
    }
}

/// Parts recovered from a window name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowLabel {
    pub chore_id: ChoreId,
    pub phase: Option<Phase>,
    pub slug: String,
}

/// Split a window name back into id, phase and slug.
///
/// Returns `None` for windows that are not chore windows.
#[must_use]
pub fn parse_window_name(name: &str) -> Option<WindowLabel> {
    let rest = name.strip_prefix(WINDOW_PREFIX)?;
    let (id_part, tail) = rest.split_once('-').unwrap_or((rest, ""));
    if id_part.is_empty() || !id_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let chore_id = id_part.parse::<u64>().ok().map(ChoreId::new)?;

    let phase = Phase::ALL
        .into_iter()
        .filter(|p| {
            let tag = p.as_str();
            tail == tag
                || tail
                    .strip_prefix(tag)
                    .is_some_and(|after| after.starts_with('-'))
        })
        .max_by_key(|p| p.as_str().len());

    let slug = match phase {
        Some(p) => tail[p.as_str().len()..].trim_start_matches('-').to_string(),
        None => tail.to_string(),
    };

    Some(WindowLabel {
        chore_id,
        phase,
        slug,
    })
}
