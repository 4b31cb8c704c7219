//! Transient user notifications ("toasts")

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub title: String,
    pub description: Option<String>,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.level {
            Level::Success => "✔",
            Level::Error => "✖",
        };
        write!(f, "{} {}", mark, self.title)?;
        if let Some(description) = &self.description {
            write!(f, ": {}", description)?;
        }
        Ok(())
    }
}

/// Pending notifications, oldest first
#[derive(Debug, Default)]
pub struct Notifications {
    next_id: u64,
    items: Vec<Notification>,
}

impl Notifications {
    pub fn success(&mut self, title: impl Into<String>) -> u64 {
        self.push(Level::Success, title.into(), None)
    }

    pub fn error(&mut self, title: impl Into<String>, description: Option<String>) -> u64 {
        self.push(Level::Error, title.into(), description)
    }

    fn push(&mut self, level: Level, title: String, description: Option<String>) -> u64 {
        self.next_id += 1;
        tracing::debug!(?level, %title, "notification");
        self.items.push(Notification {
            id: self.next_id,
            level,
            title,
            description,
        });
        self.next_id
    }

    /// Removes a notification, returning whether it was still pending
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter().filter(|n| n.level == Level::Error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.items)
    }
}
