/*!
 * Source Cache
 * File text for SOURCE listings, loaded once and shared by all threads
 */

use crate::core::types::Location;
use ahash::RandomState;
use dashmap::DashMap;
use std::fmt::Write;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SourceCache {
    files: Arc<DashMap<Arc<str>, Arc<Vec<String>>, RandomState>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self {
            files: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Register in-memory text for `file`, replacing any cached copy
    pub fn insert(&self, file: impl Into<Arc<str>>, text: &str) {
        let lines = text.lines().map(str::to_string).collect();
        self.files.insert(file.into(), Arc::new(lines));
    }

    /// Lines of `file`, reading it from disk on first use
    pub fn lines(&self, file: &Arc<str>) -> Result<Arc<Vec<String>>, String> {
        if let Some(lines) = self.files.get(file) {
            return Ok(Arc::clone(lines.value()));
        }
        let text = std::fs::read_to_string(&**file)
            .map_err(|e| format!("Cannot open source {}: {}", file, e))?;
        let lines: Arc<Vec<String>> = Arc::new(text.lines().map(str::to_string).collect());
        self.files.insert(Arc::clone(file), Arc::clone(&lines));
        Ok(lines)
    }

    /// `context` lines either side of `at`, the current one marked `>>`
    pub fn listing(&self, at: &Location, context: usize) -> Result<String, String> {
        let lines = self.lines(&at.file)?;
        let line = at.line as usize;
        if line == 0 || line > lines.len() {
            return Err(format!("{} has no line {}", at.file, at.line));
        }

        let first = line.saturating_sub(context).max(1);
        let last = line.saturating_add(context).min(lines.len());
        let width = last.to_string().len();
        let mut out = String::new();
        for n in first..=last {
            let marker = if n == line { ">>" } else { "  " };
            let _ = writeln!(out, "{:>width$}: {} {}", n, marker, lines[n - 1], width = width);
        }
        Ok(out.trim_end().to_string())
    }
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new()
    }
}
