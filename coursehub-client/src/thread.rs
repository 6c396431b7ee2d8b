use std::cell::{Ref, RefCell};

use crate::{
    api::{self, CommentId, CommentRecord, CommentUpdate, NewComment, PostId},
    report, session, Backend, CommentTree, Error, Notice, Notifier, Session,
    Submitting,
};

/// Discussion below one post, kept in sync with the backend
///
/// The tree only changes once the backend has accepted an operation; a
/// failed call leaves it as it was and emits one error notice.
pub struct CommentThread<B, N> {
    backend: B,
    notifier: N,
    session: Option<Session>,
    post: PostId,
    tree: RefCell<CommentTree>,
    submitting: Submitting,
}

impl<B: Backend, N: Notifier> CommentThread<B, N> {
    pub fn new(backend: B, notifier: N, session: Option<Session>, post: PostId) -> Self {
        CommentThread {
            backend,
            notifier,
            session,
            post,
            tree: RefCell::new(CommentTree::new()),
            submitting: Submitting::default(),
        }
    }

    pub fn post(&self) -> &PostId {
        &self.post
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    pub fn tree(&self) -> Ref<'_, CommentTree> {
        self.tree.borrow()
    }

    /// Whether the logged-in user wrote `comment`, and may thus edit or
    /// delete it
    pub fn is_owner(&self, comment: &CommentRecord) -> bool {
        match (self.session.as_ref().and_then(Session::user_id), &comment.user_id) {
            (Some(me), Some(author)) => me == author,
            _ => false,
        }
    }

    pub async fn load(&self) -> Result<(), Error> {
        if self.post.0.is_blank() {
            self.notifier.notify(Notice::error("No post to load comments for"));
            return Err(api::Error::NotFound(String::from("post")).into());
        }
        let token = self.session.as_ref().map(Session::token);
        match self.backend.list_comments(token, &self.post).await {
            Ok(records) => {
                let tree = CommentTree::build(records);
                tracing::debug!(post = %self.post, comments = tree.len(), "loaded comments");
                *self.tree.borrow_mut() = tree;
                Ok(())
            }
            Err(Error::Api(api::Error::NotAList)) => {
                *self.tree.borrow_mut() = CommentTree::new();
                Ok(())
            }
            Err(e) => {
                tracing::error!(post = %self.post, error = ?e, "failed to load comments");
                let fallback = "Could not load comments, please try again";
                self.notifier.notify(Notice::error(e.user_message(fallback)));
                Err(e)
            }
        }
    }

    pub async fn submit_comment(&self, content: &str) -> Result<CommentId, Error> {
        let res = self.create(content, None).await;
        report(
            &self.notifier,
            res,
            "Comment posted",
            "Something went wrong while posting the comment",
        )
    }

    pub async fn submit_reply(&self, parent: &CommentId, content: &str) -> Result<CommentId, Error> {
        let res = self.create(content, Some(parent)).await;
        report(
            &self.notifier,
            res,
            "Reply posted",
            "Something went wrong while posting the reply",
        )
    }

    pub async fn edit_comment(&self, id: &CommentId, content: &str) -> Result<(), Error> {
        let res = self.edit(id, content).await;
        report(
            &self.notifier,
            res,
            "Comment edited",
            "Something went wrong while editing the comment",
        )
    }

    /// Deletes a comment along with every reply below it
    pub async fn delete_comment(&self, id: &CommentId) -> Result<(), Error> {
        let res = self.delete(id).await;
        report(
            &self.notifier,
            res,
            "Comment and its replies deleted",
            "Something went wrong while deleting the comment",
        )
    }

    async fn create(&self, content: &str, parent: Option<&CommentId>) -> Result<CommentId, Error> {
        let _guard = self.submitting.start()?;
        let comment = NewComment {
            post_id: self.post.clone(),
            content: content.to_string(),
            parent_comment_id: parent.cloned(),
        };
        comment.validate()?;
        let token = session::require(self.session.as_ref())?;

        let mut created = self.backend.create_comment(token, &comment).await?;
        if let Some(parent) = parent {
            // attach where it was asked, whatever the answer says
            created.parent_comment_id = Some(parent.clone());
        }
        let id = created.id.clone();
        if let Some(level) = self.tree.borrow_mut().insert(created) {
            tracing::info!(%id, level, "comment posted");
        }
        Ok(id)
    }

    async fn edit(&self, id: &CommentId, content: &str) -> Result<(), Error> {
        let _guard = self.submitting.start()?;
        let update = CommentUpdate {
            content: content.to_string(),
        };
        update.validate()?;
        let token = session::require(self.session.as_ref())?;

        let mut updated = self.backend.update_comment(token, id, &update).await?;
        updated.id = id.clone();
        if !self.tree.borrow_mut().apply_edit(updated) {
            tracing::warn!(%id, "edited comment is not in this thread");
        }
        tracing::info!(%id, "comment edited");
        Ok(())
    }

    async fn delete(&self, id: &CommentId) -> Result<(), Error> {
        let _guard = self.submitting.start()?;
        let token = session::require(self.session.as_ref())?;

        self.backend.delete_comment(token, id).await?;
        let removed = self.tree.borrow_mut().remove(id);
        match removed {
            Some(node) => tracing::info!(%id, replies = node.total_replies(), "comment deleted"),
            None => tracing::warn!(%id, "deleted comment was not in this thread"),
        }
        Ok(())
    }
}
