use std::fmt::{self, Write};

use coursehub_client::{api::Review, CommentNode, CommentTree};

const INDENT: &str = "    ";

/// Text view of a thread: replies are nested once, anything deeper is listed
/// flat below its level-1 ancestor
pub fn thread(out: &mut impl Write, tree: &CommentTree) -> fmt::Result {
    if tree.is_empty() {
        out.write_str("No comments yet\n")?;
    }
    for root in tree.roots() {
        comment(out, root, 0)?;
        for reply in &root.replies {
            comment(out, reply, 1)?;
            for deep in reply.flattened_replies() {
                comment(out, deep, 2)?;
            }
        }
    }
    Ok(())
}

fn comment(out: &mut impl Write, c: &CommentNode, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    writeln!(
        out,
        "{pad}#{} {} ({})",
        c.id(),
        c.record.author_name(),
        c.record.created_at.display_or("unknown date")
    )?;
    for line in c.record.content.lines() {
        writeln!(out, "{pad}  {line}")?;
    }
    if depth == 0 && !c.replies.is_empty() {
        writeln!(out, "{pad}  [{} replies]", c.total_replies())?;
    }
    Ok(())
}

pub fn reviews(out: &mut impl Write, reviews: &[Review]) -> fmt::Result {
    if reviews.is_empty() {
        out.write_str("No reviews yet\n")?;
    }
    for r in reviews {
        let stars = (1..=coursehub_client::api::MAX_RATING)
            .map(|s| if s <= r.rating { '*' } else { '.' })
            .collect::<String>();
        writeln!(
            out,
            "[{stars}] {}: {}",
            r.user_full_name.as_deref().unwrap_or("Anonymous"),
            r.comment
        )?;
    }
    Ok(())
}
