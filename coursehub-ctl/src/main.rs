use anyhow::Context;
use coursehub_client::{
    api::{CommentId, CourseId, PostId},
    ClientConfig, CommentThread, HttpBackend, ImageUpload, ProfileEditor, ReviewBoard, Session,
    TracingNotifier,
};

mod render;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, default_value = "http://localhost:8080")]
    host: String,

    /// Path the REST endpoints are mounted under
    #[structopt(long, default_value = "/api")]
    api_prefix: String,

    /// Retries for transient network failures
    #[structopt(long, default_value = "3")]
    max_retries: u32,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Show the discussion below a post
    Comments {
        post: PostId,

        /// Dump the comment tree as JSON instead
        #[structopt(long)]
        json: bool,
    },

    /// Comment on a post
    Comment { post: PostId, content: String },

    /// Answer a comment
    Reply {
        post: PostId,
        parent: CommentId,
        content: String,
    },

    /// Change the text of one of your comments
    Edit {
        post: PostId,
        id: CommentId,
        content: String,
    },

    /// Delete one of your comments, with all the replies below it
    Delete { post: PostId, id: CommentId },

    /// List the reviews of a course
    Reviews { course: CourseId },

    /// Review a course, or update your review of it
    Review {
        course: CourseId,

        /// From 1 to 5
        rating: u8,

        comment: String,
    },

    /// Show your profile
    Profile,

    /// Change your contact info; unset options keep their current value
    UpdateProfile {
        #[structopt(long)]
        full_name: Option<String>,

        #[structopt(long)]
        email: Option<String>,

        /// Empty to remove it
        #[structopt(long)]
        phone: Option<String>,

        /// As YYYY-MM-DD, empty to remove it
        #[structopt(long)]
        birth_date: Option<String>,

        /// Image file to use as profile picture
        #[structopt(long, parse(from_os_str))]
        avatar: Option<std::path::PathBuf>,
    },

    /// Change your password
    Passwd { password: String, confirm: String },
}

fn session() -> anyhow::Result<Option<Session>> {
    let tok = match std::env::var("COURSEHUB_TOKEN") {
        Ok(tok) => tok,
        Err(std::env::VarError::NotPresent) => return Ok(None),
        Err(e) => return Err(e).context("retrieving COURSEHUB_TOKEN environment variable"),
    };
    let session = Session::from_raw(&tok).context("parsing COURSEHUB_TOKEN as an auth token")?;
    Ok(Some(session))
}

async fn read_image(path: &std::path::Path) -> anyhow::Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading image {path:?}"))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let mime = match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("avatar"));
    Ok(ImageUpload {
        file_name,
        mime: mime.to_string(),
        bytes,
    })
}

fn render_thread<B, N>(thread: &CommentThread<B, N>) -> anyhow::Result<String>
where
    B: coursehub_client::Backend,
    N: coursehub_client::Notifier,
{
    let mut out = String::new();
    render::thread(&mut out, &thread.tree()).context("rendering comment thread")?;
    Ok(out)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let backend = HttpBackend::new(&ClientConfig {
        host: opt.host,
        api_prefix: opt.api_prefix,
        max_retries: opt.max_retries,
    });
    let session = session()?;

    match opt.cmd {
        Command::Comments { post, json } => {
            let thread = CommentThread::new(backend, TracingNotifier, session, post);
            thread.load().await?;
            match json {
                true => println!(
                    "{}",
                    serde_json::to_string_pretty(&*thread.tree())
                        .context("serializing comment tree")?
                ),
                false => print!("{}", render_thread(&thread)?),
            }
        }
        Command::Comment { post, content } => {
            let thread = CommentThread::new(backend, TracingNotifier, session, post);
            thread.submit_comment(&content).await?;
        }
        Command::Reply {
            post,
            parent,
            content,
        } => {
            let thread = CommentThread::new(backend, TracingNotifier, session, post);
            thread.load().await?;
            thread.submit_reply(&parent, &content).await?;
            print!("{}", render_thread(&thread)?);
        }
        Command::Edit { post, id, content } => {
            let thread = CommentThread::new(backend, TracingNotifier, session, post);
            thread.load().await?;
            thread.edit_comment(&id, &content).await?;
        }
        Command::Delete { post, id } => {
            let thread = CommentThread::new(backend, TracingNotifier, session, post);
            thread.load().await?;
            thread.delete_comment(&id).await?;
        }
        Command::Reviews { course } => {
            let board = ReviewBoard::new(backend, TracingNotifier, session, course);
            board.load().await?;
            let mut out = String::new();
            render::reviews(&mut out, &board.reviews()).context("rendering reviews")?;
            print!("{out}");
        }
        Command::Review {
            course,
            rating,
            comment,
        } => {
            let board = ReviewBoard::new(backend, TracingNotifier, session, course);
            board.load().await?;
            board.submit(rating, &comment).await?;
        }
        Command::Profile => {
            let editor = ProfileEditor::new(backend, TracingNotifier, session);
            let p = editor.load().await?;
            println!("{} <{}>", p.full_name, p.email);
            println!("role:       {}", p.role);
            println!("phone:      {}", p.phone.as_deref().unwrap_or("-"));
            println!("birth date: {}", editor.form().birth_date);
            println!("member since {}", editor.format_created_at());
        }
        Command::UpdateProfile {
            full_name,
            email,
            phone,
            birth_date,
            avatar,
        } => {
            let editor = ProfileEditor::new(backend, TracingNotifier, session);
            editor.load().await?;
            let current = editor.form();
            let form = coursehub_client::api::ProfileForm {
                full_name: full_name.unwrap_or(current.full_name),
                email: email.unwrap_or(current.email),
                phone: phone.unwrap_or(current.phone),
                birth_date: birth_date.unwrap_or(current.birth_date),
            };
            if !editor.has_unsaved_changes(&form) && avatar.is_none() {
                tracing::info!("nothing to change");
                return Ok(());
            }
            let avatar = match avatar {
                Some(path) => Some(read_image(&path).await?),
                None => None,
            };
            editor.update_info(&form, avatar).await?;
        }
        Command::Passwd { password, confirm } => {
            let editor = ProfileEditor::new(backend, TracingNotifier, session);
            editor.change_password(&password, &confirm).await?;
        }
    }

    Ok(())
}
