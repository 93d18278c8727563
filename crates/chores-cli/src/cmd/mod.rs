pub mod advance;
pub mod attach;
pub mod config;
pub mod create;
pub mod delete;
pub mod init;
pub mod list;
pub mod next;
pub mod reject;
pub mod repair;
pub mod show;
pub mod status;
pub mod successor;
pub mod update;
pub mod validate;
pub mod windows;

use std::io::{self, Write};

use chores_core::id::created_at;
use chores_core::{Chore, ChoreId, Phase};
use serde::Serialize;

use crate::output::{pretty_kv, pretty_rule};

/// A chore as shown by every command that prints one.
#[derive(Debug, Clone, Serialize)]
pub struct ChoreView {
    pub id: ChoreId,
    pub name: String,
    pub description: String,
    pub phase: Phase,
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ChoreId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successor_id: Option<ChoreId>,
    pub children: Vec<ChoreId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub archived: bool,
}

impl ChoreView {
    pub fn new(chore: &Chore, archived: bool) -> Self {
        Self {
            id: chore.id(),
            name: chore.name.clone(),
            description: chore.description.clone(),
            phase: chore.phase(),
            role: chore.phase().role().as_str(),
            progress_info: chore.progress_info.clone(),
            review_info: chore.review_info.clone(),
            parent_id: chore.parent_id(),
            successor_id: chore.successor_id(),
            children: chore.children().to_vec(),
            created_at: created_at(chore.id()).map(|ts| ts.to_rfc3339()),
            archived,
        }
    }

    /// `id<TAB>phase<TAB>name`
    pub fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}\t{}", self.id, self.phase, self.name)
    }

    pub fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}", self.name)?;
        pretty_rule(w)?;
        pretty_kv(w, "ID", self.id.to_string())?;
        let phase = if self.archived {
            format!("{} (archived)", self.phase)
        } else {
            format!("{} [{}]", self.phase, self.role)
        };
        pretty_kv(w, "Phase", phase)?;
        if let Some(created) = &self.created_at {
            pretty_kv(w, "Created", created)?;
        }
        if let Some(parent) = self.parent_id {
            pretty_kv(w, "Parent", parent.to_string())?;
        }
        if !self.children.is_empty() {
            let children: Vec<String> = self.children.iter().map(ToString::to_string).collect();
            pretty_kv(w, "Children", children.join(", "))?;
        }
        if let Some(successor) = self.successor_id {
            pretty_kv(w, "Successor", successor.to_string())?;
        }
        if let Some(progress) = &self.progress_info {
            pretty_kv(w, "Progress", progress)?;
        }
        if let Some(review) = &self.review_info {
            pretty_kv(w, "Review", review)?;
        }
        if !self.description.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", self.description)?;
        }
        Ok(())
    }
}

/// Parse a chore id argument for clap.
pub fn parse_id(raw: &str) -> Result<ChoreId, String> {
    raw.trim()
        .parse::<ChoreId>()
        .map_err(|_| format!("invalid chore id {raw:?}: expected an unsigned integer"))
}

/// Parse a phase argument for clap.
pub fn parse_phase(raw: &str) -> Result<Phase, String> {
    raw.parse::<Phase>().map_err(|e| e.to_string())
}
