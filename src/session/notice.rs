//! Short-lived, dismissible error notices

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    RefillFailed,
    SubmissionFailed,
    VideoPreparationFailed,
    StatusFailed,
    CurveFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: Uuid,
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Notice {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Notices currently shown to the learner
#[derive(Debug)]
pub struct NoticeBoard {
    ttl: Duration,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(4)),
            notices: Vec::new(),
        }
    }

    pub fn raise(
        &mut self,
        kind: NoticeKind,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Notice {
        let notice = Notice {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            raised_at: now,
            expires_at: now + self.ttl,
        };
        log::warn!("Notice ({:?}): {}", notice.kind, notice.message);
        self.notices.push(notice.clone());
        notice
    }

    /// Drop expired notices and return the rest, oldest first
    pub fn active(&mut self, now: DateTime<Utc>) -> &[Notice] {
        self.notices.retain(|n| !n.is_expired(now));
        &self.notices
    }

    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_notices_expire() {
        let mut board = NoticeBoard::new(std::time::Duration::from_secs(4));
        board.raise(NoticeKind::RefillFailed, "offline", now());
        board.raise(NoticeKind::SubmissionFailed, "timeout", now() + Duration::seconds(2));

        assert_eq!(board.active(now() + Duration::seconds(3)).len(), 2);
        let remaining = board.active(now() + Duration::seconds(4));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, NoticeKind::SubmissionFailed);
        assert!(board.active(now() + Duration::seconds(10)).is_empty());
    }

    #[test]
    fn test_dismiss() {
        let mut board = NoticeBoard::new(std::time::Duration::from_secs(60));
        let notice = board.raise(NoticeKind::StatusFailed, "500", now());

        assert!(board.dismiss(notice.id));
        assert!(!board.dismiss(notice.id));
        assert!(board.active(now()).is_empty());
    }
}
