use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Subcommand;
use tracing::info;

use agora_api::HttpClient;
use agora_discussion::attachment::validate_attachment;
use agora_discussion::{Discussion, ForumDirectory, ForumListing, NewForum, Notifier, SessionManager};
use agora_session::SessionStore;
use agora_types::api::ForumFilter;
use agora_types::models::{Attachment, Author, ForumId, Message, MessageId, Post};

use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        email: String,
        #[arg(long, env = "AGORA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        name: String,
        email: String,
        #[arg(long, env = "AGORA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    Logout,

    /// Show the signed-in user and what the session file holds
    Whoami,

    /// List forums
    Forums {
        #[arg(long)]
        category: Option<i64>,
        /// Only forums created by this user
        #[arg(long)]
        user: Option<i64>,
        #[arg(long = "tag")]
        tags: Vec<i64>,
        #[arg(long)]
        locked: Option<bool>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    Categories,

    Tags,

    CreateForum {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long = "tag")]
        tags: Vec<i64>,
    },

    DeleteForum {
        forum: ForumId,
    },

    /// Print a forum's messages and replies
    Show {
        forum: ForumId,
    },

    /// Post a message, optionally with attachment metadata
    Post {
        forum: ForumId,
        text: String,
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    Reply {
        forum: ForumId,
        message: i64,
        text: String,
    },

    Edit {
        forum: ForumId,
        message: i64,
        text: String,
    },

    Delete {
        forum: ForumId,
        message: i64,
    },

    /// Toggle a message's pin
    Pin {
        forum: ForumId,
        message: i64,
    },

    /// Toggle the forum lock
    Lock {
        forum: ForumId,
    },

    /// List users mentioned in a message
    Mentions {
        forum: ForumId,
        message: i64,
    },

    Join {
        forum: ForumId,
    },

    Leave {
        forum: ForumId,
    },
}

pub struct App {
    config: Config,
    client: HttpClient,
    store: Arc<SessionStore>,
    notifier: Notifier,
}

impl App {
    pub fn open(config: Config) -> Result<Self> {
        let store = Arc::new(SessionStore::open(&config.session_path)?);
        let client = HttpClient::with_url(config.api_url.clone())?;
        client.set_credentials(store.credentials()?);
        Ok(Self {
            config,
            client,
            store,
            notifier: Notifier::new(),
        })
    }

    fn session(&self) -> SessionManager<HttpClient> {
        SessionManager::new(self.client.clone(), self.store.clone())
    }

    fn directory(&self) -> ForumDirectory<HttpClient> {
        ForumDirectory::new(
            self.client.clone(),
            self.config.discussion.page_size,
            self.notifier.clone(),
        )
    }

    fn viewer(&self) -> Result<Author> {
        Ok(self.session().current_user()?.as_author())
    }

    async fn discussion(
        &self,
        forum: ForumId,
        viewer: Author,
    ) -> Result<Discussion<HttpClient, Arc<SessionStore>>> {
        let mut discussion = Discussion::new(
            self.client.clone(),
            self.store.clone(),
            viewer,
            self.config.discussion.clone(),
        )
        .with_notifier(self.notifier.clone());
        discussion.load(forum).await?;
        Ok(discussion)
    }
}

pub async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let session = app.session();
            session.fetch_csrf().await?;
            let user = session.login(&email, &password).await?;
            println!("Signed in as {} ({})", user.name, user.email);
        }

        Command::Register {
            name,
            email,
            password,
        } => {
            let session = app.session();
            session.fetch_csrf().await?;
            let user = session.register(&name, &email, &password).await?;
            println!("Registered {} ({})", user.name, user.email);
        }

        Command::Logout => {
            app.session().logout().await?;
            println!("Signed out");
        }

        Command::Whoami => {
            match app.session().current_user() {
                Ok(user) => println!("{} <{}> id {} ({})", user.name, user.email, user.id, user.role.as_str()),
                Err(e) => println!("{}", e),
            }
            for entry in app.store.entries()? {
                println!("  {:<14} updated {}", entry.key, entry.updated_at);
            }
        }

        Command::Forums {
            category,
            user,
            tags,
            locked,
            page,
        } => {
            let filter = ForumFilter {
                category_id: category,
                user_id: user,
                tag_ids: tags,
                is_locked: locked,
                page: Some(page),
                page_size: None,
            };
            print_forums(&app.directory().list(filter).await?);
        }

        Command::Categories => {
            for category in app.directory().categories().await? {
                println!("{:>5}  {}", category.id, category.name);
            }
        }

        Command::Tags => {
            for tag in app.directory().tags().await? {
                println!("{:>5}  {}", tag.id, tag.name);
            }
        }

        Command::CreateForum {
            name,
            description,
            category,
            tags,
        } => {
            app.viewer()?;
            let forum = app
                .directory()
                .create(NewForum {
                    name,
                    description,
                    category,
                    tags,
                })
                .await?;
            println!("Created forum {} ({})", forum.id, forum.name);
        }

        Command::DeleteForum { forum } => {
            app.viewer()?;
            app.directory().delete(forum).await?;
            println!("Deleted forum {}", forum);
        }

        Command::Show { forum } => {
            let viewer = app
                .viewer()
                .unwrap_or_else(|_| Author::placeholder(0));
            let discussion = app.discussion(forum, viewer).await?;
            if let Some(forum) = discussion.forum() {
                let lock = if forum.locked { " [locked]" } else { "" };
                println!("# {}{}", forum.name, lock);
                if !forum.description.is_empty() {
                    println!("{}", forum.description);
                }
                println!();
            }
            for message in discussion.messages() {
                print_message(message);
            }
        }

        Command::Post {
            forum,
            text,
            attachments,
        } => {
            let attachments = attachments
                .iter()
                .map(|path| attachment_for(path))
                .collect::<Result<Vec<_>>>()?;
            let mut discussion = app.discussion(forum, app.viewer()?).await?;
            let id = discussion.post_message(&text, attachments).await?;
            println!("Posted message {}", id);
        }

        Command::Reply {
            forum,
            message,
            text,
        } => {
            let mut discussion = app.discussion(forum, app.viewer()?).await?;
            let id = discussion.post_reply(MessageId::Server(message), &text).await?;
            println!("Posted reply {}", id);
        }

        Command::Edit {
            forum,
            message,
            text,
        } => {
            let mut discussion = app.discussion(forum, app.viewer()?).await?;
            discussion.edit_message(MessageId::Server(message), &text).await?;
            println!("Edited message {}", message);
        }

        Command::Delete { forum, message } => {
            let mut discussion = app.discussion(forum, app.viewer()?).await?;
            discussion.delete_message(MessageId::Server(message)).await?;
            println!("Deleted message {}", message);
        }

        Command::Pin { forum, message } => {
            let mut discussion = app.discussion(forum, app.viewer()?).await?;
            let pinned = discussion.toggle_pin(MessageId::Server(message)).await?;
            if !discussion.config().sync_pins {
                info!("AGORA_SYNC_PINS is off, the pin is not saved on the server");
            }
            println!("Message {} {}", message, if pinned { "pinned" } else { "unpinned" });
        }

        Command::Lock { forum } => {
            let mut discussion = app.discussion(forum, app.viewer()?).await?;
            let locked = discussion.toggle_lock().await?;
            println!("Forum {} {}", forum, if locked { "locked" } else { "unlocked" });
        }

        Command::Mentions { forum, message } => {
            let discussion = app.discussion(forum, app.viewer()?).await?;
            for author in discussion.mentions_of(MessageId::Server(message)).await? {
                println!("@{} ({})", author.name, author.id);
            }
        }

        Command::Join { forum } => {
            app.viewer()?;
            let membership = app.directory().join(forum).await?;
            println!("Joined forum {} (membership {})", forum, membership.id);
        }

        Command::Leave { forum } => {
            let viewer = app.viewer()?;
            app.directory().leave(forum, viewer.id).await?;
            println!("Left forum {}", forum);
        }
    }
    Ok(())
}

fn attachment_for(path: &Path) -> Result<Attachment> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?;
    let size = std::fs::metadata(path)
        .with_context(|| format!("cannot read {}", path.display()))?
        .len();
    Ok(validate_attachment(name, size)?)
}

fn print_forums(listing: &ForumListing) {
    for forum in &listing.forums {
        let lock = if forum.locked { " [locked]" } else { "" };
        let category = forum.category.as_ref().map_or("-", |c| c.name.as_str());
        println!("{:>5}  {}{}  ({})", forum.id, forum.name, lock, category);
    }
    println!("page {} of {}", listing.page, listing.total_pages);
}

fn print_message(message: &Message) {
    let pin = if message.pinned { "[pinned] " } else { "" };
    println!("{}{}", pin, header(&message.post));
    print_body(&message.post, "    ");
    for reply in &message.replies {
        println!("    > {}", header(&reply.post));
        print_body(&reply.post, "        ");
    }
    println!();
}

fn header(post: &Post) -> String {
    let edited = if post.edited { " (edited)" } else { "" };
    format!(
        "#{} {} {}{}",
        post.id,
        post.author.name,
        post.created_at.format("%Y-%m-%d %H:%M"),
        edited
    )
}

fn print_body(post: &Post, indent: &str) {
    for line in post.content.lines() {
        println!("{}{}", indent, line);
    }
    for attachment in &post.attachments {
        println!("{}[{} {} bytes]", indent, attachment.name, attachment.size);
    }
}
