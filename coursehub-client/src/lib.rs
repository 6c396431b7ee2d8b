mod backend;
pub use backend::{Backend, ImageUpload};

mod comment;
pub use comment::{CommentNode, Preorder, MAX_LEVEL};

mod error;
pub use error::Error;

mod http;
pub use http::{ClientConfig, HttpBackend};

mod notify;
pub use notify::{Notice, NoticeKind, NoticeLog, Notifier, TracingNotifier};

mod profile;
pub use profile::{ProfileEditor, NO_CREATION_DATE};

mod review;
pub use review::ReviewBoard;

mod session;
pub use session::Session;

mod submit;
pub use submit::{SubmitGuard, Submitting};

mod thread;
pub use thread::CommentThread;

mod tree;
pub use tree::CommentTree;

pub mod api {
    pub use coursehub_api::*;
}

/// Hands the outcome of an operation to the notifier, then returns it
///
/// Errors are shown with the server's message when it sent one, and with
/// `fallback` otherwise.
pub(crate) fn report<T, N: Notifier + ?Sized>(
    notifier: &N,
    res: Result<T, Error>,
    success: &str,
    fallback: &str,
) -> Result<T, Error> {
    match &res {
        Ok(_) => notifier.notify(Notice::success(success)),
        Err(e) => notifier.notify(Notice::error(e.user_message(fallback))),
    }
    res
}
