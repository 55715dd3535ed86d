//! Report envelope shared by every tool.

use serde::Serialize;

/// Whether any recoverable structural problem was noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Degraded,
}

/// A tool result with its diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct Report<T> {
    pub status: Status,
    pub notes: Vec<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Report<T> {
    /// Wrap `data`; any note makes the report degraded.
    pub fn new(data: T, mut notes: Vec<String>) -> Self {
        notes.dedup();
        let status = if notes.is_empty() {
            Status::Ok
        } else {
            Status::Degraded
        };
        Self {
            status,
            notes,
            data,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Report<U> {
        Report {
            status: self.status,
            notes: self.notes,
            data: f(self.data),
        }
    }

    pub const fn is_degraded(&self) -> bool {
        matches!(self.status, Status::Degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Count {
        count: usize,
    }

    #[test]
    fn test_notes_degrade() {
        assert_eq!(Report::new(Count { count: 1 }, vec![]).status, Status::Ok);
        let report = Report::new(Count { count: 1 }, vec!["x".into(), "x".into()]);
        assert!(report.is_degraded());
        assert_eq!(report.notes.len(), 1);
    }

    #[test]
    fn test_data_is_flattened() {
        let json = serde_json::to_value(Report::new(Count { count: 3 }, vec![])).unwrap();
        assert_eq!(json["count"], 3);
        assert_eq!(json["status"], "ok");
    }
}
