//! Declarative notification queue
//!
//! Components push outcomes here instead of rendering them directly; a view
//! (or the CLI) reads the queue and decides how to show it.

use chrono::{DateTime, Duration, Local};
use std::collections::VecDeque;
use uuid::Uuid;

/// Types of notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Local>,
}

pub struct NotificationQueue {
    items: VecDeque<Notification>,
    max_items: usize,
    ttl: Option<Duration>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
            max_items: 5,
            ttl: None,
        }
    }
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.max(1);
        self
    }

    /// Notifications older than `ttl` are dropped by [`expire`](Self::expire)
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            created_at: Local::now(),
        };
        let id = notification.id;

        self.items.push_back(notification);
        while self.items.len() > self.max_items {
            self.items.pop_front();
        }
        id
    }

    pub fn info(&mut self, message: impl Into<String>) -> Uuid {
        self.push(NotificationKind::Info, message)
    }

    pub fn success(&mut self, message: impl Into<String>) -> Uuid {
        self.push(NotificationKind::Success, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> Uuid {
        self.push(NotificationKind::Warning, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> Uuid {
        self.push(NotificationKind::Error, message)
    }

    /// Remove one notification. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn expire(&mut self, now: DateTime<Local>) {
        if let Some(ttl) = self.ttl {
            self.items.retain(|n| now - n.created_at < ttl);
        }
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|n| n.kind == NotificationKind::Error)
    }
}
