use std::cell::{Ref, RefCell};

use crate::{
    api::{self, CourseId, NewReview, Review},
    session, Backend, Error, Notice, Notifier, Session, Submitting,
};

/// Reviews of one course, with the logged-in user's own one singled out
pub struct ReviewBoard<B, N> {
    backend: B,
    notifier: N,
    session: Option<Session>,
    course: CourseId,
    reviews: RefCell<Vec<Review>>,
    existing: RefCell<Option<Review>>,
    submitting: Submitting,
}

impl<B: Backend, N: Notifier> ReviewBoard<B, N> {
    pub fn new(backend: B, notifier: N, session: Option<Session>, course: CourseId) -> Self {
        ReviewBoard {
            backend,
            notifier,
            session,
            course,
            reviews: RefCell::new(Vec::new()),
            existing: RefCell::new(None),
            submitting: Submitting::default(),
        }
    }

    pub fn course(&self) -> &CourseId {
        &self.course
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    pub fn reviews(&self) -> Ref<'_, Vec<Review>> {
        self.reviews.borrow()
    }

    /// The review the logged-in user already wrote, if any
    pub fn existing(&self) -> Option<Review> {
        self.existing.borrow().clone()
    }

    /// Rating and text the review form starts with
    pub fn draft(&self) -> (u8, String) {
        match &*self.existing.borrow() {
            Some(r) => (r.rating, r.comment.clone()),
            None => (0, String::new()),
        }
    }

    pub async fn load(&self) -> Result<(), Error> {
        let token = self.session.as_ref().map(Session::token);
        match self.backend.list_reviews(token, &self.course).await {
            Ok(reviews) => {
                let me = self.session.as_ref().and_then(Session::user_id);
                let mine = me.and_then(|me| {
                    reviews
                        .iter()
                        .find(|r| r.user_id.as_ref() == Some(me))
                        .cloned()
                });
                tracing::debug!(course = %self.course, reviews = reviews.len(), "loaded reviews");
                *self.existing.borrow_mut() = mine;
                *self.reviews.borrow_mut() = reviews;
                Ok(())
            }
            Err(e) => {
                tracing::error!(course = %self.course, error = ?e, "failed to load reviews");
                self.reviews.borrow_mut().clear();
                let msg = match &e {
                    Error::Api(api::Error::NotAList) => String::from("Review data is invalid"),
                    e => e.user_message("Could not load the reviews"),
                };
                self.notifier.notify(Notice::error(msg));
                Err(e)
            }
        }
    }

    /// Sends the user's review, updating theirs if they already wrote one
    pub async fn submit(&self, rating: u8, text: &str) -> Result<Review, Error> {
        match self.try_submit(rating, text).await {
            Ok((review, msg)) => {
                self.notifier.notify(Notice::success(msg));
                Ok(review)
            }
            Err(e) => {
                let fallback = "Something went wrong while sending the review";
                self.notifier.notify(Notice::error(e.user_message(fallback)));
                Err(e)
            }
        }
    }

    async fn try_submit(&self, rating: u8, text: &str) -> Result<(Review, &'static str), Error> {
        let _guard = self.submitting.start()?;
        let review = NewReview {
            course_id: self.course.clone(),
            rating,
            comment: text.to_string(),
        };
        review.validate()?;
        let token = session::require(self.session.as_ref())?;

        let existing = self.existing.borrow().as_ref().map(|r| r.id.clone());
        match existing {
            Some(id) => {
                let updated = self.backend.update_review(token, &id, &review).await?;
                for r in self.reviews.borrow_mut().iter_mut().filter(|r| r.id == id) {
                    *r = updated.clone();
                }
                *self.existing.borrow_mut() = Some(updated.clone());
                tracing::info!(%id, rating, "review updated");
                Ok((updated, "Review updated"))
            }
            None => {
                let created = self.backend.create_review(token, &review).await?;
                self.reviews.borrow_mut().push(created.clone());
                *self.existing.borrow_mut() = Some(created.clone());
                tracing::info!(id = %created.id, rating, "review created");
                Ok((created, "Review sent"))
            }
        }
    }
}
