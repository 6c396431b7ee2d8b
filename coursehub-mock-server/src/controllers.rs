use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use coursehub_client::{
    api::{
        self, CommentId, CommentRecord, CourseId, PostId, ProfileForm, Review, ReviewId,
        Timestamp, UserId,
    },
    CommentThread, Error, ImageUpload, Notice, NoticeLog, ProfileEditor, ReviewBoard, Session,
    NO_CREATION_DATE,
};

use crate::MockServer;

struct Fixture {
    server: MockServer,
    alice: (UserId, String),
    bob: (UserId, String),
}

fn fixture() -> Fixture {
    let server = MockServer::new();
    let alice = server.add_user("Alice Tran", "alice@example.org");
    let bob = server.add_user("Bob Le", "bob@example.org");
    Fixture { server, alice, bob }
}

fn session(token: &str) -> Option<Session> {
    Some(Session::from_raw(token).unwrap())
}

fn ids(it: impl IntoIterator<Item = i64>) -> Vec<CommentId> {
    it.into_iter().map(CommentId::from).collect()
}

fn comment(id: i64, parent: Option<i64>, post: i64, minute: u32, author: &UserId) -> CommentRecord {
    CommentRecord {
        id: CommentId::from(id),
        parent_comment_id: parent.map(CommentId::from),
        post_id: Some(PostId::from(post)),
        content: format!("comment {id}"),
        created_at: Timestamp(format!("2024-05-01T10:{minute:02}:00Z")),
        user_id: Some(author.clone()),
        user_full_name: None,
        user_profile_image: None,
    }
}

mod thread {
    use super::*;

    /// 1(t2) > 2(t1) > 3(t3) > 4(t4), 5 is an orphan, 6 is on another post
    fn seeded() -> Fixture {
        let f = fixture();
        let a = &f.alice.0;
        f.server.seed_comments([
            comment(1, None, 1, 2, a),
            comment(2, Some(1), 1, 1, a),
            comment(3, Some(2), 1, 3, a),
            comment(4, Some(3), 1, 4, a),
            comment(5, Some(99), 1, 5, a),
            comment(6, None, 2, 6, a),
        ]);
        f
    }

    fn open(f: &Fixture, token: Option<&str>) -> (CommentThread<MockServer, NoticeLog>, NoticeLog) {
        let log = NoticeLog::new();
        let thread = CommentThread::new(
            f.server.clone(),
            log.clone(),
            token.and_then(session),
            PostId::from(1),
        );
        (thread, log)
    }

    #[tokio::test]
    async fn load_builds_the_tree() {
        let f = seeded();
        let (t, log) = open(&f, None);
        t.load().await.unwrap();

        let tree = t.tree();
        assert_eq!(
            tree.iter().map(|c| (c.id().clone(), c.level)).collect::<Vec<_>>(),
            vec![
                (CommentId::from(1), 0),
                (CommentId::from(2), 1),
                (CommentId::from(3), 2),
                (CommentId::from(4), 2),
            ]
        );
        let second = &tree.roots()[0].replies[0];
        assert_eq!(
            second.flattened_replies().into_iter().map(|c| c.id().clone()).collect::<Vec<_>>(),
            ids([3, 4])
        );
        assert_eq!(tree.roots()[0].total_replies(), 3);
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn garbage_listing_means_no_comments() {
        let f = seeded();
        let (t, log) = open(&f, None);
        t.load().await.unwrap();
        f.server.answer_lists_with_garbage(true);
        t.load().await.unwrap();
        assert!(t.tree().is_empty());
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn failed_load_keeps_what_was_shown() {
        let f = seeded();
        let (t, log) = open(&f, None);
        t.load().await.unwrap();
        let before = t.tree().clone();

        f.server.fail_next(api::Error::Remote {
            status: 500,
            message: None,
        });
        assert!(t.load().await.is_err());
        assert_eq!(*t.tree(), before);
        assert_eq!(log.errors(), vec!["Could not load comments, please try again"]);
    }

    #[tokio::test]
    async fn blank_post_is_not_loaded() {
        let f = seeded();
        let log = NoticeLog::new();
        let t = CommentThread::new(f.server.clone(), log.clone(), None, PostId::from(" "));
        assert!(t.load().await.is_err());
        assert_eq!(f.server.calls(), 0);
        assert_eq!(log.errors().len(), 1);
    }

    #[tokio::test]
    async fn post_a_root_comment() {
        let f = seeded();
        let (t, log) = open(&f, Some(f.alice.1.as_str()));
        t.load().await.unwrap();

        let id = t.submit_comment("hello everyone").await.unwrap();
        {
            let tree = t.tree();
            let last = tree.roots().last().unwrap();
            assert_eq!(last.id(), &id);
            assert_eq!(last.level, 0);
            assert!(last.replies.is_empty());
            assert_eq!(last.record.author_name(), "Alice Tran");
        }
        assert_eq!(log.take(), vec![Notice::success("Comment posted")]);
        assert!(f.server.comments().iter().any(|c| c.id == id));
    }

    #[tokio::test]
    async fn reply_below_the_deepest_level() {
        let f = seeded();
        let (t, log) = open(&f, Some(f.bob.1.as_str()));
        t.load().await.unwrap();

        let id = t.submit_reply(&CommentId::from(4), "me too").await.unwrap();
        let tree = t.tree();
        assert_eq!(tree.find(&id).unwrap().level, 2);
        let parent = tree.find(&CommentId::from(4)).unwrap();
        assert_eq!(parent.replies.len(), 1);
        assert_eq!(parent.replies[0].id(), &id);
        assert_eq!(tree.roots()[0].replies[0].flattened_replies().len(), 3);
        assert_eq!(log.take(), vec![Notice::success("Reply posted")]);
    }

    #[tokio::test]
    async fn empty_comment_never_leaves() {
        let f = seeded();
        let (t, log) = open(&f, Some(f.alice.1.as_str()));
        t.load().await.unwrap();
        let calls = f.server.calls();

        let res = t.submit_comment("   ").await;
        assert!(matches!(res, Err(Error::Api(api::Error::EmptyContent))));
        assert_eq!(f.server.calls(), calls);
        assert_eq!(log.errors(), vec!["Content must not be empty"]);
    }

    #[tokio::test]
    async fn logged_out_users_cannot_post() {
        let f = seeded();
        let (t, log) = open(&f, None);
        t.load().await.unwrap();
        let calls = f.server.calls();

        let res = t.submit_reply(&CommentId::from(1), "hi").await;
        assert!(matches!(res, Err(Error::Api(api::Error::MissingToken))));
        assert_eq!(f.server.calls(), calls);
        assert_eq!(log.errors(), vec!["Please log in to continue"]);
        assert!(t.tree().find(&CommentId::from(1)).unwrap().replies.len() == 1);
    }

    #[tokio::test]
    async fn remote_failure_changes_nothing() {
        let f = seeded();
        let (t, log) = open(&f, Some(f.alice.1.as_str()));
        t.load().await.unwrap();
        let before = t.tree().clone();

        f.server.fail_next(api::Error::Remote {
            status: 500,
            message: Some(String::from("Database unavailable")),
        });
        assert!(t.submit_comment("hello").await.is_err());
        f.server.fail_next(api::Error::Remote {
            status: 502,
            message: None,
        });
        assert!(t.delete_comment(&CommentId::from(2)).await.is_err());

        assert_eq!(*t.tree(), before);
        assert_eq!(
            log.errors(),
            vec![
                "Database unavailable",
                "Something went wrong while deleting the comment",
            ]
        );
    }

    #[tokio::test]
    async fn edit_keeps_position_and_replies() {
        let f = seeded();
        let (t, log) = open(&f, Some(f.alice.1.as_str()));
        t.load().await.unwrap();

        t.edit_comment(&CommentId::from(3), "better wording")
            .await
            .unwrap();
        let tree = t.tree();
        let edited = tree.find(&CommentId::from(3)).unwrap();
        assert_eq!(edited.record.content, "better wording");
        assert_eq!(edited.level, 2);
        assert_eq!(edited.replies.len(), 1);
        assert_eq!(log.take(), vec![Notice::success("Comment edited")]);
    }

    #[tokio::test]
    async fn only_authors_edit() {
        let f = seeded();
        let (t, log) = open(&f, Some(f.bob.1.as_str()));
        t.load().await.unwrap();

        let res = t.edit_comment(&CommentId::from(3), "hijacked").await;
        assert!(matches!(res, Err(Error::Api(api::Error::PermissionDenied))));
        assert_eq!(t.tree().find(&CommentId::from(3)).unwrap().record.content, "comment 3");
        assert_eq!(
            log.errors(),
            vec!["Something went wrong while editing the comment"]
        );
    }

    #[tokio::test]
    async fn delete_takes_the_replies_along() {
        let f = seeded();
        let (t, log) = open(&f, Some(f.alice.1.as_str()));
        t.load().await.unwrap();

        t.delete_comment(&CommentId::from(2)).await.unwrap();
        assert_eq!(t.tree().iter().map(|c| c.id().clone()).collect::<Vec<_>>(), ids([1]));
        assert_eq!(
            f.server
                .comments()
                .into_iter()
                .map(|c| c.id)
                .collect::<BTreeSet<_>>(),
            ids([1, 5, 6]).into_iter().collect()
        );
        assert_eq!(
            log.take(),
            vec![Notice::success("Comment and its replies deleted")]
        );
    }

    #[tokio::test]
    async fn one_submission_at_a_time() {
        let f = seeded();
        let (t, log) = open(&f, Some(f.alice.1.as_str()));
        t.load().await.unwrap();
        let before = t.tree().len();

        let release = f.server.hold_next();
        let first = t.submit_comment("first");
        let t_ref = &t;
        let second = async move {
            assert!(t_ref.is_submitting());
            let res = t_ref.submit_comment("second").await;
            let _ = release.send(());
            res
        };
        let (first, second) = futures::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::Busy)));
        assert!(!t.is_submitting());
        assert_eq!(t.tree().len(), before + 1);
        assert_eq!(log.errors(), vec!["Another submission is still in progress"]);
    }

    #[tokio::test]
    async fn ownership() {
        let f = seeded();
        let (t, _) = open(&f, Some(f.alice.1.as_str()));
        let (other, _) = open(&f, Some(f.bob.1.as_str()));
        let (anon, _) = open(&f, None);
        let c = comment(1, None, 1, 0, &f.alice.0);
        assert!(t.is_owner(&c));
        assert!(!other.is_owner(&c));
        assert!(!anon.is_owner(&c));
    }

    #[tokio::test]
    async fn very_deep_threads_load_and_reload() {
        let f = fixture();
        let a = f.alice.0.clone();
        f.server.seed_comments(
            std::iter::once(comment(1, None, 1, 0, &a))
                .chain((2..=200_000).map(|i| comment(i, Some(i - 1), 1, 1, &a))),
        );
        let (t, log) = open(&f, None);
        t.load().await.unwrap();
        assert_eq!(t.tree().len(), 200_000);
        let snapshot = t.tree().clone();

        // replacing the tree drops the previous one
        t.load().await.unwrap();
        assert_eq!(*t.tree(), snapshot);
        assert!(log.take().is_empty());
    }
}

mod reviews {
    use super::*;

    fn review(id: i64, course: i64, author: &UserId, rating: u8) -> Review {
        Review {
            id: ReviewId::from(id),
            course_id: Some(CourseId::from(course)),
            user_id: Some(author.clone()),
            user_full_name: None,
            user_profile_image: None,
            rating,
            comment: format!("review {id}"),
            created_at: Timestamp(String::from("2024-05-01T10:00:00Z")),
        }
    }

    fn seeded() -> Fixture {
        let f = fixture();
        f.server.seed_reviews([
            review(10, 7, &f.bob.0, 4),
            review(11, 7, &f.alice.0, 2),
            review(12, 8, &f.alice.0, 5),
        ]);
        f
    }

    fn open(f: &Fixture, token: Option<&str>) -> (ReviewBoard<MockServer, NoticeLog>, NoticeLog) {
        let log = NoticeLog::new();
        let board = ReviewBoard::new(
            f.server.clone(),
            log.clone(),
            token.and_then(session),
            CourseId::from(7),
        );
        (board, log)
    }

    #[tokio::test]
    async fn own_review_fills_the_form() {
        let f = seeded();
        let (b, log) = open(&f, Some(f.alice.1.as_str()));
        b.load().await.unwrap();
        assert_eq!(b.reviews().len(), 2);
        assert_eq!(b.existing().map(|r| r.id), Some(ReviewId::from(11)));
        assert_eq!(b.draft(), (2, String::from("review 11")));

        let (anon, _) = open(&f, None);
        anon.load().await.unwrap();
        assert_eq!(anon.reviews().len(), 2);
        assert_eq!(anon.existing(), None);
        assert_eq!(anon.draft(), (0, String::new()));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn second_submission_updates() {
        let f = seeded();
        let (b, log) = open(&f, Some(f.alice.1.as_str()));
        b.load().await.unwrap();

        let updated = b.submit(5, "changed my mind").await.unwrap();
        assert_eq!(updated.id, ReviewId::from(11));
        assert_eq!(b.reviews().len(), 2);
        let mine = b.reviews().iter().find(|r| r.id == updated.id).cloned().unwrap();
        assert_eq!(mine.rating, 5);
        assert_eq!(mine.comment, "changed my mind");
        assert_eq!(log.take(), vec![Notice::success("Review updated")]);
    }

    #[tokio::test]
    async fn first_submission_creates() {
        let f = seeded();
        let (carol, token) = f.server.add_user("Carol Pham", "carol@example.org");
        let (b, log) = open(&f, Some(token.as_str()));
        b.load().await.unwrap();
        assert_eq!(b.existing(), None);

        let created = b.submit(5, "great course").await.unwrap();
        assert_eq!(created.user_id, Some(carol));
        assert_eq!(b.reviews().len(), 3);
        assert_eq!(b.reviews().last(), Some(&created));
        assert_eq!(b.existing(), Some(created.clone()));

        // now it is an update, not a duplicate
        b.submit(4, "good course").await.unwrap();
        assert_eq!(b.reviews().len(), 3);
        assert_eq!(f.server.reviews().len(), 4);
        assert_eq!(
            log.take(),
            vec![Notice::success("Review sent"), Notice::success("Review updated")]
        );
    }

    #[tokio::test]
    async fn invalid_reviews_are_not_sent() {
        let f = seeded();
        let (b, log) = open(&f, Some(f.bob.1.as_str()));
        b.load().await.unwrap();
        let calls = f.server.calls();

        let res = b.submit(0, "no stars").await;
        assert!(matches!(res, Err(Error::Api(api::Error::InvalidRating(0)))));
        let res = b.submit(3, "").await;
        assert!(matches!(res, Err(Error::Api(api::Error::EmptyContent))));
        assert_eq!(f.server.calls(), calls);
        assert_eq!(log.errors().len(), 2);
        assert_eq!(b.existing().map(|r| r.rating), Some(4));
    }

    #[tokio::test]
    async fn logged_out_users_cannot_review() {
        let f = seeded();
        let (b, log) = open(&f, None);
        let res = b.submit(3, "nice").await;
        assert!(matches!(res, Err(Error::Api(api::Error::MissingToken))));
        assert_eq!(f.server.calls(), 0);
        assert_eq!(log.errors(), vec!["Please log in to continue"]);
    }

    #[tokio::test]
    async fn garbage_listing() {
        let f = seeded();
        let (b, log) = open(&f, Some(f.alice.1.as_str()));
        b.load().await.unwrap();
        f.server.answer_lists_with_garbage(true);
        assert!(b.load().await.is_err());
        assert!(b.reviews().is_empty());
        assert_eq!(log.errors(), vec!["Review data is invalid"]);
    }
}

mod profile {
    use super::*;

    fn open(f: &Fixture, token: Option<&str>) -> (ProfileEditor<MockServer, NoticeLog>, NoticeLog) {
        let log = NoticeLog::new();
        let editor = ProfileEditor::new(f.server.clone(), log.clone(), token.and_then(session));
        (editor, log)
    }

    fn form() -> ProfileForm {
        ProfileForm {
            full_name: String::from("Alice Tran Thi"),
            email: String::from("alice@school.edu"),
            phone: String::from("+84901234567"),
            birth_date: String::from("2000-02-29"),
        }
    }

    #[tokio::test]
    async fn load_own_profile() {
        let f = fixture();
        let (p, log) = open(&f, Some(f.alice.1.as_str()));
        assert_eq!(p.format_created_at(), NO_CREATION_DATE);

        let profile = p.load().await.unwrap();
        assert_eq!(profile.id, f.alice.0);
        assert_eq!(p.form().full_name, "Alice Tran");
        assert_eq!(p.form().phone, "");
        assert_eq!(p.format_created_at(), "15/03/2024");
        assert!(p.has_unsaved_changes(&form()));
        assert!(!p.has_unsaved_changes(&p.form()));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn opaque_token_cannot_name_the_user() {
        let f = fixture();
        let (p, log) = open(&f, Some("header.payload.signature"));
        let res = p.load().await;
        assert!(matches!(res, Err(Error::Api(api::Error::MalformedToken))));
        assert_eq!(f.server.calls(), 0);
        assert_eq!(log.errors().len(), 1);
    }

    #[tokio::test]
    async fn update_info_and_avatar() {
        let f = fixture();
        f.server.set_role(&f.alice.0, "Teacher");
        let (p, log) = open(&f, Some(f.alice.1.as_str()));
        p.load().await.unwrap();

        let avatar = ImageUpload {
            file_name: String::from("me.png"),
            mime: String::from("image/png"),
            bytes: vec![0x89, b'P', b'N', b'G'],
        };
        let updated = p.update_info(&form(), Some(avatar)).await.unwrap();
        assert_eq!(updated.profile_image.as_deref(), Some("/uploads/avatars/1-me.png"));
        assert_eq!(p.profile(), Some(updated));
        assert!(!p.has_unsaved_changes(&form()));

        let stored = f.server.user(&f.alice.0).unwrap();
        assert_eq!(stored.role, "Teacher");
        assert_eq!(stored.phone.as_deref(), Some("+84901234567"));
        assert_eq!(stored.birth_date.as_deref(), Some("2000-02-29T00:00:00.000Z"));
        assert_eq!(log.take(), vec![Notice::success("Profile updated")]);
    }

    #[tokio::test]
    async fn failed_upload_keeps_the_saved_info() {
        let f = fixture();
        let (p, log) = open(&f, Some(f.alice.1.as_str()));
        p.load().await.unwrap();

        let not_an_image = ImageUpload {
            file_name: String::from("notes.txt"),
            mime: String::from("text/plain"),
            bytes: b"hello".to_vec(),
        };
        assert!(p.update_info(&form(), Some(not_an_image)).await.is_err());
        assert_eq!(p.profile().unwrap().full_name, "Alice Tran Thi");
        assert_eq!(p.profile().unwrap().profile_image, None);
        assert_eq!(log.errors(), vec!["Only images are accepted"]);
    }

    #[tokio::test]
    async fn invalid_form_is_not_sent() {
        let f = fixture();
        let (p, log) = open(&f, Some(f.alice.1.as_str()));
        let res = p
            .update_info(
                &ProfileForm {
                    email: String::from("nope"),
                    phone: String::from("12"),
                    ..form()
                },
                None,
            )
            .await;
        match res {
            Err(Error::Api(api::Error::InvalidForm(fields))) => {
                assert_eq!(fields.into_keys().collect::<Vec<_>>(), vec!["email", "phone"]);
            }
            other => panic!("expected a form error, got {other:?}"),
        }
        assert_eq!(f.server.calls(), 0);
        assert_eq!(log.errors().len(), 1);
    }

    #[tokio::test]
    async fn expired_token_is_not_sent() {
        let f = fixture();
        let stale = f
            .server
            .token_for(&f.alice.0, Some(Utc::now() - Duration::hours(1)));
        let (p, log) = open(&f, Some(stale.as_str()));
        let res = p.change_password("secret1", "secret1").await;
        assert!(matches!(res, Err(Error::Api(api::Error::ExpiredToken))));
        assert_eq!(f.server.calls(), 0);
        assert_eq!(log.errors(), vec!["Authentication token has expired"]);
    }

    #[tokio::test]
    async fn change_password() {
        let f = fixture();
        let (p, log) = open(&f, Some(f.alice.1.as_str()));

        let res = p.change_password("secret1", "secret2").await;
        assert!(matches!(res, Err(Error::Api(api::Error::InvalidForm(_)))));
        assert_eq!(f.server.password(&f.alice.0).as_deref(), Some("initial"));

        p.change_password("secret1", "secret1").await.unwrap();
        assert_eq!(f.server.password(&f.alice.0).as_deref(), Some("secret1"));
        assert_eq!(log.take().last(), Some(&Notice::success("Password changed")));
    }
}
