use std::{cell::RefCell, rc::Rc};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Short message for the user about how an operation went
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Notice {
        Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Notice {
        Notice {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Where notices end up: a toast, a terminal, a test log
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Sends notices to the `tracing` subscriber
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => tracing::info!("{}", notice.message),
            NoticeKind::Error => tracing::error!("{}", notice.message),
        }
    }
}

/// Keeps every notice; clones share the same log
#[derive(Clone, Debug, Default)]
pub struct NoticeLog(Rc<RefCell<Vec<Notice>>>);

impl NoticeLog {
    pub fn new() -> NoticeLog {
        NoticeLog::default()
    }

    /// Removes and returns all notices received so far
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn errors(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|n| n.kind == NoticeKind::Error)
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        self.0.borrow_mut().push(notice);
    }
}

impl<N: Notifier + ?Sized> Notifier for Rc<N> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice)
    }
}
