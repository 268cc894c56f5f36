//! Fire-and-forget toast queue read by the notification presenter.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    next_id: u64,
    last_stamp_ms: Option<u64>,
    ttl_ms: u64,
    max_visible: usize,
}

impl ToastQueue {
    pub fn new(ttl_ms: u64, max_visible: usize) -> Self {
        Self {
            toasts: VecDeque::new(),
            next_id: 1,
            last_stamp_ms: None,
            ttl_ms,
            max_visible: max_visible.max(1),
        }
    }

    /// Queues a toast, evicting the oldest when the queue is full.
    ///
    /// Creation stamps strictly increase even when `now_ms` stalls or steps back, so toasts raised
    /// by one action (an unlock and a failed save) keep their order and expire one after another.
    pub fn push(&mut self, title: impl Into<String>, body: impl Into<String>, now_ms: u64) -> Toast {
        let now_ms = match self.last_stamp_ms {
            Some(last) => now_ms.max(last.saturating_add(1)),
            None => now_ms,
        };
        self.last_stamp_ms = Some(now_ms);
        let toast = Toast {
            id: self.next_id,
            title: title.into(),
            body: body.into(),
            created_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(self.ttl_ms),
        };
        self.next_id += 1;
        while self.toasts.len() >= self.max_visible {
            self.toasts.pop_front();
        }
        self.toasts.push_back(toast.clone());
        toast
    }

    /// Drops every toast whose lifetime ended at or before `now_ms`. Returns how many went.
    pub fn expire(&mut self, now_ms: u64) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.expires_at_ms > now_ms);
        before - self.toasts.len()
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.id != id);
        before != self.toasts.len()
    }

    /// Visible toasts, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
