use anyhow::{bail, Context, Result};
use arrangement_catalog::admin::{
    AdminConsole, AdminGate, SessionUploads, DEFAULT_ACCESS_CODE, SESSION_STORAGE_KEY,
};
use arrangement_catalog::catalog_store::{
    CatalogEntry, CatalogError, CatalogStore, EntryDraft, FileAsset, StorageCatalogStore,
    CATALOG_STORAGE_KEY,
};
use arrangement_catalog::config::{AppConfig, CliConfig, FileConfig, DEFAULT_LOG_LEVEL};
use arrangement_catalog::search::{
    count_by_category, query, CatalogQuery, PriceRange, Selection, SortKey,
};
use arrangement_catalog::storage::{SqliteStorage, Storage, DEFAULT_MAX_PAYLOAD_BYTES};
use arrangement_catalog::suggest::{suggest_from_file, suggest_from_text, Suggestion};
use arrangement_catalog::sync::SyncBridge;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;
use cli_style::{
    get_styles, print_empty_list, print_error, print_key_value, print_section_header,
    print_success, print_warning, TableBuilder,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles(), version, about = "Manage and browse the arrangement catalog")]
struct CliArgs {
    /// Path to the SQLite storage file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Storage key holding the catalog.
    #[clap(long, default_value = CATALOG_STORAGE_KEY)]
    pub catalog_key: String,

    /// Storage key holding the admin session flag.
    #[clap(long, default_value = SESSION_STORAGE_KEY)]
    pub session_key: String,

    /// Poll interval of watched views, in milliseconds.
    #[clap(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Shared admin access code.
    #[clap(long, default_value = DEFAULT_ACCESS_CODE)]
    pub access_code: String,

    /// Default log level, LOG_LEVEL takes precedence.
    #[clap(long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Largest value a single storage key may hold, in bytes.
    #[clap(long, default_value_t = DEFAULT_MAX_PAYLOAD_BYTES)]
    pub max_payload_bytes: usize,

    #[command(subcommand)]
    command: Command,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            catalog_key: self.catalog_key.clone(),
            session_key: self.session_key.clone(),
            poll_interval_ms: self.poll_interval_ms,
            access_code: self.access_code.clone(),
            log_level: self.log_level.clone(),
            max_payload_bytes: self.max_payload_bytes,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shows every entry in storage order.
    List,

    /// Filters and sorts the catalog like the public catalog page.
    Query(QueryArgs),

    /// Creates an entry. Requires an admin session.
    Add(EntryArgs),

    /// Edits an entry; only the given fields change. Requires an admin session.
    Edit {
        id: String,
        #[command(flatten)]
        fields: EntryArgs,
    },

    /// Deletes an entry. Requires an admin session.
    Remove {
        id: String,
        /// Confirms the deletion.
        #[clap(long)]
        yes: bool,
    },

    /// Starts an admin session.
    Login { code: String },

    /// Ends the admin session.
    Logout,

    /// Suggests metadata from a description or a file name.
    Suggest {
        /// Free-text description of the piece.
        #[clap(long, conflicts_with = "file")]
        text: Option<String>,

        /// File name of an upload.
        #[clap(long)]
        file: Option<String>,

        /// MIME type of the upload, guessed from the extension when omitted.
        #[clap(long, requires = "file")]
        mime_type: Option<String>,
    },

    /// Keeps a query open and prints the results whenever the catalog changes.
    Watch(QueryArgs),
}

#[derive(Args, Debug, Clone)]
struct QueryArgs {
    /// Matches title, composer, description or a whole tag.
    #[clap(long, default_value = "")]
    search: String,

    /// A category, or "all".
    #[clap(long, default_value = "all")]
    category: String,

    /// A difficulty, or "all".
    #[clap(long, default_value = "all")]
    difficulty: String,

    /// One of title, composer, difficulty, price, newest.
    #[clap(long, default_value = "title")]
    sort: String,

    /// A band label such as "Under $50", or a "min-max" pair.
    #[clap(long)]
    price_range: Option<PriceRange>,
}

impl QueryArgs {
    fn to_query(&self) -> CatalogQuery {
        let sort = SortKey::parse(&self.sort);
        if sort == SortKey::Unsorted {
            print_warning(&format!("Unknown sort '{}', keeping storage order", self.sort));
        }
        CatalogQuery {
            search_text: self.search.clone(),
            category: Selection::parse(&self.category),
            difficulty: Selection::parse(&self.difficulty),
            sort,
            price_range: self.price_range,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
struct EntryArgs {
    #[clap(long)]
    title: Option<String>,
    #[clap(long)]
    composer: Option<String>,
    #[clap(long)]
    category: Option<String>,
    #[clap(long)]
    subcategory: Option<String>,
    #[clap(long)]
    duration: Option<String>,
    #[clap(long)]
    difficulty: Option<String>,
    #[clap(long)]
    description: Option<String>,
    /// Comma-separated.
    #[clap(long)]
    instrumentation: Option<String>,
    #[clap(long)]
    tempo: Option<String>,
    #[clap(long)]
    key_signature: Option<String>,
    #[clap(long)]
    year_composed: Option<String>,
    /// Comma-separated.
    #[clap(long)]
    tags: Option<String>,
    #[clap(long)]
    price_standard: Option<String>,
    #[clap(long)]
    price_exclusive: Option<String>,
    /// Audio preview to attach.
    #[clap(long, value_parser = parse_path)]
    audio: Option<PathBuf>,
    /// Sheet music to attach.
    #[clap(long, value_parser = parse_path)]
    sheet_music: Option<PathBuf>,
    /// Cover image to attach.
    #[clap(long, value_parser = parse_path)]
    image: Option<PathBuf>,
    /// Pre-fill empty fields from the metadata suggestions for the attachments.
    #[clap(long)]
    suggest: bool,
}

impl EntryArgs {
    fn apply_to(&self, draft: &mut EntryDraft, uploads: &SessionUploads) -> Result<()> {
        let text_fields = [
            (&self.title, &mut draft.title),
            (&self.composer, &mut draft.composer),
            (&self.category, &mut draft.category),
            (&self.subcategory, &mut draft.subcategory),
            (&self.duration, &mut draft.duration),
            (&self.difficulty, &mut draft.difficulty),
            (&self.description, &mut draft.description),
            (&self.instrumentation, &mut draft.instrumentation),
            (&self.tempo, &mut draft.tempo),
            (&self.key_signature, &mut draft.key_signature),
            (&self.year_composed, &mut draft.year_composed),
            (&self.tags, &mut draft.tags),
            (&self.price_standard, &mut draft.price_standard),
            (&self.price_exclusive, &mut draft.price_exclusive),
        ];
        for (value, field) in text_fields {
            if let Some(value) = value {
                *field = value.clone();
            }
        }

        if let Some(path) = &self.audio {
            draft.files.audio = Some(register_upload(uploads, path)?);
        }
        if let Some(path) = &self.sheet_music {
            draft.files.sheet_music = Some(register_upload(uploads, path)?);
        }
        if let Some(path) = &self.image {
            draft.files.image = Some(register_upload(uploads, path)?);
        }
        Ok(())
    }

    /// Suggestions for the attached audio and sheet music, audio first.
    fn suggestions(&self) -> Vec<Suggestion> {
        let mut rng = rand::rng();
        [&self.audio, &self.sheet_music]
            .into_iter()
            .flatten()
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().to_string();
                Some(suggest_from_file(&name, guess_mime_type(&name), &mut rng))
            })
            .collect()
    }
}

fn guess_mime_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn register_upload(uploads: &SessionUploads, path: &Path) -> Result<FileAsset> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("Cannot read upload {:?}", path))?;
    if !metadata.is_file() {
        bail!("Upload {:?} is not a file", path);
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(uploads.register(&name, guess_mime_type(&name), metadata.len()))
}

/// Everything a command needs, opened from the resolved config.
struct Host {
    config: AppConfig,
    storage: Arc<dyn Storage>,
    store: Arc<dyn CatalogStore>,
    gate: AdminGate,
}

impl Host {
    fn open(config: AppConfig) -> Result<Self> {
        info!("Opening catalog storage at {:?}...", config.db_path);
        let storage: Arc<dyn Storage> = Arc::new(
            SqliteStorage::new(&config.db_path)?.with_max_payload_bytes(config.max_payload_bytes),
        );
        let store: Arc<dyn CatalogStore> = Arc::new(StorageCatalogStore::with_key(
            storage.clone(),
            config.catalog_key.clone(),
        ));
        let gate = AdminGate::with_settings(
            storage.clone(),
            config.session_key.clone(),
            config.access_code.clone(),
        );
        Ok(Self {
            config,
            storage,
            store,
            gate,
        })
    }

    fn console(&self) -> Result<AdminConsole> {
        self.gate
            .open_console(self.store.clone())
            .context("Log in first with the `login` command")
    }
}

fn print_entries(entries: &[CatalogEntry]) {
    if entries.is_empty() {
        print_empty_list("No arrangements found");
        return;
    }
    let mut table = TableBuilder::new(&[
        "Id",
        "Title",
        "Composer",
        "Category",
        "Difficulty",
        "Year",
        "Price",
    ]);
    for entry in entries {
        table.add_row(vec![
            entry.id.clone(),
            entry.title.clone(),
            entry.composer.clone(),
            entry.category.to_string(),
            entry.difficulty.to_string(),
            entry.year_composed.to_string(),
            format!("${} / ${}", entry.price.standard, entry.price.exclusive),
        ]);
    }
    table.print();
}

fn print_entry(entry: &CatalogEntry) {
    print_key_value("Id", &entry.id);
    print_key_value("Title", &entry.title);
    print_key_value("Composer", &entry.composer);
    print_key_value("Category", entry.category.label());
    print_key_value("Difficulty", entry.difficulty.label());
    print_key_value("Instrumentation", &entry.instrumentation.join(", "));
    print_key_value("Tags", &entry.tags.join(", "));
    print_key_value(
        "Price",
        &format!("${} / ${} exclusive", entry.price.standard, entry.price.exclusive),
    );
    print_key_value("Uploaded", &entry.upload_date.to_rfc3339());
}

fn print_suggestion(suggestion: &Suggestion) {
    if suggestion.is_empty() {
        print_empty_list("No suggestions for this input");
        return;
    }
    for (field, value) in suggestion.fields() {
        print_key_value(field, &value);
    }
}

fn report_submit_error(err: CatalogError) -> anyhow::Error {
    if let CatalogError::Validation(errors) = &err {
        for error in errors.errors() {
            print_error(&error.to_string());
        }
    }
    anyhow::Error::new(err).context("Entry was not saved")
}

async fn watch(host: &Host, criteria: CatalogQuery) -> Result<()> {
    let bridge = SyncBridge::new(host.store.clone(), host.storage.clone(), host.config.sync_config());
    let view = bridge.mount(criteria)?;
    let mut updates = view.watch();

    print_section_header("Catalog");
    print_entries(&view.results());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let results = updates.borrow_and_update().results.clone();
                print_section_header("Catalog updated");
                print_entries(&results);
            }
        }
    }

    view.unmount().await;
    Ok(())
}

async fn run(host: Host, command: Command) -> Result<()> {
    match command {
        Command::List => {
            let entries = host.store.list()?;
            print_section_header(&format!("Catalog ({})", entries.len()));
            print_entries(&entries);
            for (category, count) in count_by_category(&entries) {
                print_key_value(category.label(), &count.to_string());
            }
        }
        Command::Query(args) => {
            let entries = host.store.list()?;
            let results = query(&entries, &args.to_query());
            print_section_header(&format!("{} of {} arrangements", results.len(), entries.len()));
            print_entries(&results);
        }
        Command::Add(fields) => {
            let mut console = host.console()?;
            let uploads = SessionUploads::new();
            let mut draft = EntryDraft::default();
            if fields.suggest {
                for suggestion in fields.suggestions() {
                    suggestion.fill_blanks(&mut draft);
                }
            }
            fields.apply_to(&mut draft, &uploads)?;
            let stored = console.submit(draft).map_err(report_submit_error)?;
            print_success(&format!("Added '{}'", stored.title));
            print_entry(&stored);
            uploads.revoke_all();
        }
        Command::Edit { id, fields } => {
            let mut console = host.console()?;
            let uploads = SessionUploads::new();
            let mut draft = console.begin_edit(&id)?;
            if fields.suggest {
                for suggestion in fields.suggestions() {
                    suggestion.fill_blanks(&mut draft);
                }
            }
            fields.apply_to(&mut draft, &uploads)?;
            let stored = console.submit(draft).map_err(report_submit_error)?;
            print_success(&format!("Updated '{}'", stored.title));
            print_entry(&stored);
            uploads.revoke_all();
        }
        Command::Remove { id, yes } => {
            let mut console = host.console()?;
            let removed = console.delete(&id, |entry| {
                if !yes {
                    print_warning(&format!(
                        "Not removing '{}' without --yes",
                        entry.title
                    ));
                }
                yes
            })?;
            if removed {
                print_success(&format!("Removed {}", id));
            } else if yes {
                print_warning(&format!("No arrangement with id {}", id));
            }
        }
        Command::Login { code } => {
            host.gate.login(&code)?;
            print_success("Admin session started");
        }
        Command::Logout => {
            host.gate.logout()?;
            print_success("Admin session ended");
        }
        Command::Suggest {
            text,
            file,
            mime_type,
        } => {
            let suggestion = match (text, file) {
                (Some(text), _) => suggest_from_text(&text),
                (None, Some(file)) => {
                    let mime_type = mime_type.unwrap_or_else(|| guess_mime_type(&file).to_string());
                    suggest_from_file(&file, &mime_type, &mut rand::rng())
                }
                (None, None) => bail!("Pass --text or --file"),
            };
            print_section_header("Suggestions");
            print_suggestion(&suggestion);
        }
        Command::Watch(args) => watch(&host, args.to_query()).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(config.log_level).into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    let host = Host::open(config)?;
    if let Err(err) = run(host, cli_args.command).await {
        print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
    Ok(())
}
