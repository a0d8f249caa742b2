// src/discovery/runlog.rs
use chrono::{SecondsFormat, Utc};
use std::sync::Mutex;
use tracing::info;

/// Append-only, timestamped narration buffer. One global instance per run
/// plus one scoped instance per processed link; lines are mirrored to the
/// server log.
pub struct RunLog {
    scope: Option<String>,
    lines: Mutex<Vec<String>>,
}

impl RunLog {
    pub fn global() -> Self {
        Self {
            scope: None,
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn scoped(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, message: impl AsRef<str>) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = match &self.scope {
            Some(scope) => format!("[{timestamp}] [{scope}] {}", message.as_ref()),
            None => format!("[{timestamp}] {}", message.as_ref()),
        };
        info!("{line}");
        self.lines.lock().unwrap().push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_keep_insertion_order_and_scope_prefix() {
        let log = RunLog::scoped("https://a.ru/");
        log.push("first");
        log.push("second");
        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[https://a.ru/] first"));
        assert!(lines[1].ends_with("second"));
    }
}
