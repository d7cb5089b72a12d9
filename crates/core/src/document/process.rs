//! Process metadata and change timestamps.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{LayoutError, Result};

use super::tree::{ElementKind, InsertMode, LayoutDocument, NodeId};

pub(crate) fn timestamp() -> String {
    format_timestamp(Utc::now())
}

fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A running process, returned by [`LayoutDocument::process_start`].
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    tool: String,
    started: DateTime<Utc>,
}

impl ProcessHandle {
    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }
}

impl LayoutDocument {
    /// Starts timing a processing step done by `tool`.
    pub fn process_start(&self, tool: &str) -> ProcessHandle {
        ProcessHandle {
            tool: tool.to_string(),
            started: Utc::now(),
        }
    }

    /// Records a finished processing step as a `Process` metadata element
    /// with its start time and duration, and updates `LastChange`.
    pub fn process_end(&mut self, handle: ProcessHandle) -> Result<NodeId> {
        let metadata = self
            .metadata()
            .ok_or_else(|| LayoutError::validation("document has no Metadata element"))?;
        let elapsed = (Utc::now() - handle.started).num_milliseconds() as f64 / 1000.0;

        let process = self.create_node(ElementKind::Process, None, metadata, InsertMode::Child)?;
        self.set_attr(process, "started", &format_timestamp(handle.started))?;
        self.set_attr(process, "time", &format!("{elapsed:.3}"))?;
        self.set_attr(process, "tool", &handle.tool)?;
        self.set_last_change()?;
        Ok(process)
    }

    /// Sets `LastChange` to the current time.
    pub fn set_last_change(&mut self) -> Result<()> {
        let node = self.last_change_node()?;
        self.set_text(node, &timestamp())
    }

    pub fn last_change(&self) -> Option<&str> {
        self.last_change_node().ok().and_then(|n| self.text(n))
    }

    fn last_change_node(&self) -> Result<NodeId> {
        let metadata = self
            .metadata()
            .ok_or_else(|| LayoutError::validation("document has no Metadata element"))?;
        self.children(metadata)
            .iter()
            .copied()
            .find(|&c| self.kind(c) == ElementKind::LastChange)
            .ok_or_else(|| LayoutError::validation("unable to find the LastChange element"))
    }
}
