mod config;
mod error;
mod filter;
mod guard;
mod listing;
mod logging;
mod meta;
mod page;
mod store;
mod ui;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use config::Config;
use error::AdminError;
use filter::{FilterField, FilterForm, UpdateKind, UrlNavigator};
use guard::{DeleteOutcome, Prompter, UnsavedGuard};
use listing::{format_timestamp, ListQuery, Pagination};
use page::PostPage;
use store::{PostStore, StoreEndpoint};

#[derive(Parser, Debug)]
#[command(name = "whisper-admin")]
struct Cli {
    /// Configuration file (defaults to the per-user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the list view URL for a filter change or a page jump
    Url(UrlArgs),
    /// Show one page of posts for a list view query string
    List(ListArgs),
    /// Create an empty post
    New(SlugArgs),
    /// List files attached to a post
    Files(SlugArgs),
    /// Attach a file to a post
    Upload(UploadArgs),
    /// Delete a file attached to a post
    DeleteFile(DeleteFileArgs),
    /// Delete a post and its attached files
    DeletePost(DeletePostArgs),
    /// Open the post editor
    Edit(SlugArgs),
}

#[derive(Args, Debug)]
struct UrlArgs {
    /// Query string the list view is currently showing
    #[arg(long, default_value = "")]
    from: String,

    /// Change one filter input (FIELD=VALUE); resets pagination
    #[arg(long, value_name = "FIELD=VALUE", conflicts_with = "page")]
    set: Option<String>,

    /// Jump to a page
    #[arg(long)]
    page: Option<String>,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long, default_value = "")]
    query: String,
}

#[derive(Args, Debug)]
struct SlugArgs {
    slug: String,
}

#[derive(Args, Debug)]
struct UploadArgs {
    slug: String,

    #[arg(value_name = "PATH")]
    source: PathBuf,

    /// Name inside the post folder (defaults to the source file name)
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct DeleteFileArgs {
    slug: String,
    name: String,

    /// Do not ask for confirmation
    #[arg(long, short = 'y', default_value_t = false)]
    yes: bool,
}

#[derive(Args, Debug)]
struct DeletePostArgs {
    slug: String,

    /// Do not ask for confirmation
    #[arg(long, short = 'y', default_value_t = false)]
    yes: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    let log_dir = match &config.log_dir {
        Some(dir) => dir.clone(),
        None => config::default_log_dir()?,
    };
    let tui_mode = matches!(cli.command, Command::Edit(_));
    logging::init(&log_dir, tui_mode)?;
    info!(path = %config.config_path.display(), "loaded configuration");
    for key in &config.unknown_keys {
        warn!("unknown configuration key `{}` ignored", key);
    }

    match cli.command {
        Command::Url(args) => handle_url(args, &config),
        Command::List(args) => handle_list(args, &config),
        Command::New(args) => {
            let store = PostStore::open(&config.posts_dir)?;
            let post = store.create(&args.slug)?;
            println!("created post {}", post.slug);
            Ok(())
        }
        Command::Files(args) => {
            let store = PostStore::open(&config.posts_dir)?;
            store.get(&args.slug)?;
            for file in store.files(&args.slug)? {
                println!("{}", file);
            }
            Ok(())
        }
        Command::Upload(args) => handle_upload(args, &config),
        Command::DeleteFile(args) => handle_delete_file(args, &config),
        Command::DeletePost(args) => handle_delete_post(args, &config),
        Command::Edit(args) => {
            let store = PostStore::open(&config.posts_dir)?;
            let mut app = ui::app::App::new(&store, &config, &args.slug)?;
            app.run()
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(FilterField, String)> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| AdminError::MalformedAssignment(raw.to_string()))?;
    Ok((field.parse()?, value.to_string()))
}

fn handle_url(args: UrlArgs, config: &Config) -> Result<()> {
    let mut form = FilterForm::from_query(&args.from);
    let mut navigator = UrlNavigator::new(config.base_url.clone());

    if let Some(assignment) = args.set.as_deref() {
        let (field, value) = parse_assignment(assignment)?;
        form.set_update(field, value, &mut navigator)?;
    } else if let Some(page) = args.page {
        form.page(page, &mut navigator)?;
    } else {
        form.update(UpdateKind::Filter, &mut navigator)?;
    }

    if let Some(target) = navigator.target() {
        println!("{}", target);
    }
    Ok(())
}

/// URL of another page of the current list view.
fn page_url(form: &FilterForm, config: &Config, page: usize) -> Result<String> {
    let mut form = form.clone();
    let mut navigator = UrlNavigator::new(config.base_url.clone());
    form.page(page.to_string(), &mut navigator)?;
    Ok(navigator
        .target()
        .map(|url| url.to_string())
        .unwrap_or_default())
}

fn handle_list(args: ListArgs, config: &Config) -> Result<()> {
    let store = PostStore::open(&config.posts_dir)?;
    let query = ListQuery::parse(&args.query);
    let (posts, max_page) = store.list(&query, config.page_size)?;
    let pagination = Pagination::new(query.page, max_page);

    if posts.is_empty() {
        println!("No posts");
    }
    for post in &posts {
        let mut flags = Vec::new();
        if post.public {
            flags.push("public");
        }
        if post.indexed {
            flags.push("indexed");
        }
        println!(
            "{}\t{}\t{}\t{}\t{}",
            post.slug,
            post.title,
            post.provide,
            flags.join(","),
            format_timestamp(post.creation)
        );
    }

    let providers = store.provider_counts()?;
    if !providers.is_empty() {
        let providers: Vec<String> = providers
            .iter()
            .map(|(name, count)| format!("{} ({})", name, count))
            .collect();
        println!("providers: {}", providers.join(", "));
    }

    let form = FilterForm::from_query(&args.query);
    println!("page {}/{}", pagination.page, pagination.max_page);
    if pagination.prev < pagination.page {
        println!("prev: {}", page_url(&form, config, pagination.prev)?);
    }
    if pagination.next > pagination.page {
        println!("next: {}", page_url(&form, config, pagination.next)?);
    }
    Ok(())
}

fn handle_upload(args: UploadArgs, config: &Config) -> Result<()> {
    let store = PostStore::open(&config.posts_dir)?;
    let name = match args.name {
        Some(name) => name,
        None => args
            .source
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .with_context(|| format!("cannot derive a file name from {}", args.source.display()))?,
    };
    store.upload(&args.slug, &name, &args.source)?;
    println!("uploaded file {}", name);
    Ok(())
}

/// Dialogs on the controlling terminal's standard streams.
struct StdioPrompter {
    assume_yes: bool,
}

impl Prompter for StdioPrompter {
    fn alert(&mut self, message: &str) -> Result<()> {
        eprintln!("warning: {}", message);
        Ok(())
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        eprint!("{} [y/N] ", message);
        io::stderr().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
    }
}

fn handle_delete_file(args: DeleteFileArgs, config: &Config) -> Result<()> {
    let store = PostStore::open(&config.posts_dir)?;
    let post = store.get(&args.slug)?;
    let files = store.files(&args.slug)?;
    let Some(index) = files.iter().position(|file| *file == args.name) else {
        return Err(AdminError::FileNotFound {
            slug: args.slug,
            name: args.name,
        }
        .into());
    };

    let guard = UnsavedGuard::new(
        config.messages.unsaved.clone(),
        config.messages.confirm_delete.clone(),
    );
    let mut page = PostPage::new(post, files, guard);
    let mut prompter = StdioPrompter {
        assume_yes: args.yes,
    };
    let mut endpoint = StoreEndpoint::new(&store, args.slug.as_str());

    match page.delete_file(index, &mut prompter, &mut endpoint)? {
        DeleteOutcome::Submitted => {
            info!(slug = %args.slug, name = %args.name, "file deleted from cli");
            println!("deleted file {}", page.delete_form().name());
        }
        DeleteOutcome::Declined => println!("cancelled"),
        DeleteOutcome::Blocked => println!("blocked by unsaved changes"),
    }
    Ok(())
}

fn handle_delete_post(args: DeletePostArgs, config: &Config) -> Result<()> {
    let store = PostStore::open(&config.posts_dir)?;
    let post = store.get(&args.slug)?;
    let mut prompter = StdioPrompter {
        assume_yes: args.yes,
    };
    if !prompter.confirm(&config.messages.confirm_delete)? {
        println!("cancelled");
        return Ok(());
    }
    store.delete(&post.slug)?;
    println!("deleted post {}", post.slug);
    Ok(())
}
