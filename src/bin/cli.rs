//! edu-admin CLI
//!
//! Terminal front end for the list views and actions of the admin console.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use edu_admin::{
    error::{AppError, Result},
    forms::{
        AnnouncementForm, CollegeForm, ExamForm, GenerateForm, ImageAttachment, InviteUserForm,
    },
    models::{
        Announcement, AnnouncementField, Caller, CollegeField, CollegeType, Config, ContentBlock,
        Exam, ExamField, ExamKind, ExamLevel, Priority, Record, Role, User, UserField,
    },
    pipeline::{self, ListView, Notification, Selection, actions},
    services::{AnnouncementClient, CollegeClient, ExamClient, IdentityGateway},
    utils,
};
use serde_json::Value;

/// edu-admin - college, exam and account administration
#[derive(Parser, Debug)]
#[command(name = "edu-admin", version, about = "Education platform admin console")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "edu-admin.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Act as this signed-in user id (overrides [session])
    #[arg(long, global = true)]
    as_user: Option<String>,

    /// Role of the acting user (overrides [session])
    #[arg(long, global = true)]
    as_role: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage colleges
    #[command(subcommand)]
    Colleges(CollegeCommand),

    /// Manage entrance exams
    #[command(subcommand)]
    Exams(ExamCommand),

    /// Manage admin accounts
    #[command(subcommand)]
    Users(UserCommand),

    /// Manage announcements on the updates feed
    #[command(subcommand)]
    Announcements(AnnouncementCommand),

    /// Validate the configuration file
    Validate,
}

/// Search, sort and paging options shared by every list.
#[derive(Args, Debug)]
struct ListArgs {
    /// Case-insensitive search term
    #[arg(short, long)]
    search: Option<String>,

    /// Column to sort by
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// 1-based page number
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Rows per page (defaults to [view].page_size)
    #[arg(long)]
    page_size: Option<String>,
}

#[derive(Subcommand, Debug)]
enum CollegeCommand {
    /// List colleges
    List {
        /// IIT, IIIT, NIT, GFTI or all
        #[arg(short = 't', long = "type", default_value = "all")]
        kind: String,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Show the full record of one college
    Show {
        id: String,
        #[arg(short = 't', long = "type")]
        kind: String,
    },

    /// Add a college from a JSON document
    Add {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Replace a college's data from a JSON document
    Update {
        id: String,
        #[arg(short = 't', long = "type")]
        kind: String,
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete a college
    Delete {
        id: String,
        #[arg(short = 't', long = "type")]
        kind: String,
    },

    /// Save a new display order: ids in their new order
    Reorder {
        #[arg(short = 't', long = "type")]
        kind: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ExamCommand {
    /// List exams
    List {
        /// general, college or all
        #[arg(short, long, default_value = "all")]
        kind: String,

        /// national, state, institutional or other
        #[arg(short, long)]
        level: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Delete an exam
    Delete {
        id: String,
        #[arg(short, long)]
        kind: String,
    },

    /// Draft structured exam details from raw text
    Generate {
        #[arg(short, long)]
        name: String,
        /// File holding the raw exam text
        #[arg(long)]
        content_file: PathBuf,
        /// Write the generated JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Save a new exam
    Save {
        /// JSON object with the basic fields (Name, Exam Code, ...)
        #[arg(long)]
        basic_file: PathBuf,
        /// JSON object with the detail sections
        #[arg(long)]
        details_file: Option<PathBuf>,
    },

    /// Replace an exam's data
    Update {
        id: String,
        #[arg(short, long)]
        kind: String,
        #[arg(long)]
        basic_file: PathBuf,
        #[arg(long)]
        details_file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// List admin accounts
    List {
        #[command(flatten)]
        list: ListArgs,
    },

    /// Create an account; the user receives a password setup email
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// admin, moderator or user (defaults to [identity].default_role)
        #[arg(long)]
        role: Option<String>,
    },

    /// Delete an account
    Delete { id: String },

    /// Change an account's role
    SetRole { id: String, role: String },

    /// Resend the password setup email
    Resend { email: String },
}

/// Fields of the announcement editor.
#[derive(Args, Debug)]
struct AnnouncementArgs {
    #[arg(long)]
    title: String,

    /// text, table or bulleted-list
    #[arg(long, default_value = "text")]
    template: String,

    /// Body text; table rows use `|` between cells
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,

    /// Read the body from a file
    #[arg(long)]
    body_file: Option<PathBuf>,

    /// Normal or Urgent
    #[arg(long, default_value = "Normal")]
    priority: String,

    /// Publish time: YYYY-MM-DD or an RFC 3339 timestamp
    #[arg(long)]
    scheduled_at: Option<String>,

    /// PNG, JPEG, GIF or WebP image to attach
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum AnnouncementCommand {
    /// List announcements
    List {
        /// Normal, Urgent or all
        #[arg(short, long, default_value = "all")]
        priority: String,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Print one announcement in full
    Show { id: String },

    /// Publish a new announcement
    Add {
        #[command(flatten)]
        fields: AnnouncementArgs,
    },

    /// Replace an announcement
    Update {
        id: String,
        #[command(flatten)]
        fields: AnnouncementArgs,
    },

    /// Delete an announcement
    Delete { id: String },
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = Config::load(&cli.config)
        .map_or_else(|_| "info".to_string(), |c| c.logging.level);
    init_logging(cli.verbose, &level);

    let config = Config::load_or_default(&cli.config);

    match run(cli, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when an action reported a failure.
async fn run(cli: Cli, mut config: Config) -> Result<bool> {
    if let Some(user_id) = cli.as_user {
        config.session.user_id = Some(user_id);
    }
    if let Some(role) = cli.as_role {
        config.session.role = Some(role.parse()?);
    }

    match cli.command {
        Command::Colleges(command) => colleges(&config, command).await,
        Command::Exams(command) => exams(&config, command).await,
        Command::Users(command) => users(&config, command).await,
        Command::Announcements(command) => announcements(&config, command).await,
        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Backend: {}", config.backend.base_url);
            log::info!(
                "✓ Identity provider: {}",
                utils::get_domain(&config.identity.api_url).unwrap_or_default()
            );
            if config.identity.secret_key.is_none() {
                log::warn!(
                    "identity.secret_key is not set; user commands need {}",
                    edu_admin::models::IDENTITY_SECRET_ENV
                );
            }
            log::info!("All validations passed!");
            Ok(true)
        }
    }
}

// --- Colleges ---

const COLLEGE_COLUMNS: [(&str, CollegeField); 7] = [
    ("Name", CollegeField::Name),
    ("Type", CollegeField::Type),
    ("Tier", CollegeField::Tier),
    ("NIRF", CollegeField::Nirf2024),
    ("Est.", CollegeField::Establishment),
    ("Seats", CollegeField::BtechSeats),
    ("Programmes", CollegeField::BtechProgrammes),
];

async fn colleges(config: &Config, command: CollegeCommand) -> Result<bool> {
    let client = CollegeClient::new(&config.backend)?;
    let mut view = ListView::new(pipeline::college_view(config));

    match command {
        CollegeCommand::List { kind, list } => {
            let selection = parse_selection::<CollegeType>(&kind)?;
            view.select_type(&client, selection).await?;
            apply_list_args(&mut view, &list, |s| s.parse::<CollegeField>())?;
            print_page(&view, &COLLEGE_COLUMNS);
            Ok(true)
        }
        CollegeCommand::Show { id, kind } => {
            let detail = client.get(&id, kind.parse()?).await?;
            println!("{}", serde_json::to_string_pretty(&detail.full_data)?);
            Ok(true)
        }
        CollegeCommand::Add { file } => {
            let form = CollegeForm::from_value(read_json(&file)?)?;
            if let Ok(valid) = form.validate() {
                view.set_selection(Selection::Only(valid.kind));
            }
            let note = actions::add_college(&client, &mut view, &form).await;
            Ok(report(&note))
        }
        CollegeCommand::Update { id, kind, file } => {
            let kind: CollegeType = kind.parse()?;
            let form = CollegeForm::from_value(read_json(&file)?)?;
            view.set_selection(Selection::Only(kind));
            let note = actions::update_college(&client, &mut view, &id, kind, &form).await;
            Ok(report(&note))
        }
        CollegeCommand::Delete { id, kind } => {
            let kind: CollegeType = kind.parse()?;
            view.set_selection(Selection::Only(kind));
            let note = actions::delete_college(&client, &mut view, &id, kind).await;
            Ok(report(&note))
        }
        CollegeCommand::Reorder { kind, ids } => {
            let kind: CollegeType = kind.parse()?;
            view.set_selection(Selection::Only(kind));
            let note = actions::reorder_colleges(&client, &mut view, kind, &ids).await;
            Ok(report(&note))
        }
    }
}

// --- Exams ---

const EXAM_COLUMNS: [(&str, ExamField); 6] = [
    ("Name", ExamField::Name),
    ("Code", ExamField::Code),
    ("Type", ExamField::Type),
    ("Level", ExamField::Level),
    ("Organizing Body", ExamField::OrganizingBody),
    ("Views", ExamField::Views),
];

async fn exams(config: &Config, command: ExamCommand) -> Result<bool> {
    let client = ExamClient::new(&config.backend)?;
    let mut view: ListView<Exam> = ListView::new(pipeline::exam_view(config));

    match command {
        ExamCommand::List { kind, level, list } => {
            let selection = parse_selection::<ExamKind>(&kind)?;
            view.select_type(&client, selection).await?;
            if let Some(level) = level {
                let level: ExamLevel = level.parse()?;
                view.set_facet(Some(level.as_str()));
            }
            apply_list_args(&mut view, &list, |s| s.parse::<ExamField>())?;
            print_page(&view, &EXAM_COLUMNS);
            Ok(true)
        }
        ExamCommand::Delete { id, kind } => {
            let kind: ExamKind = kind.parse()?;
            view.set_selection(Selection::Only(kind));
            let note = actions::delete_exam(&client, &mut view, kind, &id).await;
            Ok(report(&note))
        }
        ExamCommand::Generate {
            name,
            content_file,
            out,
        } => {
            let form = GenerateForm {
                exam_name: name,
                raw_content: fs::read_to_string(&content_file)?,
            };
            let (note, details) = actions::generate_exam_json(&client, &form).await;
            if let Some(details) = details {
                let json = serde_json::to_string_pretty(&details)?;
                match out {
                    Some(path) => {
                        fs::write(&path, json)?;
                        log::info!("Details saved to {}", path.display());
                    }
                    None => println!("{json}"),
                }
            }
            Ok(report(&note))
        }
        ExamCommand::Save {
            basic_file,
            details_file,
        } => {
            let form = exam_form(&basic_file, details_file.as_deref())?;
            view.set_selection(Selection::Only(ExamKind::General));
            let note = actions::save_exam(&client, &mut view, &form).await;
            Ok(report(&note))
        }
        ExamCommand::Update {
            id,
            kind,
            basic_file,
            details_file,
        } => {
            let kind: ExamKind = kind.parse()?;
            let form = exam_form(&basic_file, details_file.as_deref())?;
            view.set_selection(Selection::Only(kind));
            let note = actions::update_exam(&client, &mut view, kind, &id, &form).await;
            Ok(report(&note))
        }
    }
}

fn exam_form(basic_file: &Path, details_file: Option<&Path>) -> Result<ExamForm> {
    let basic_data = match read_json(basic_file)? {
        Value::Object(map) => map,
        _ => return Err(AppError::validation("Basic data must be a JSON object")),
    };
    let full_details = match details_file {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };
    Ok(ExamForm {
        basic_data,
        full_details,
    })
}

// --- Users ---

const USER_HEADERS: [&str; 6] = ["Id", "Name", "Email", "Mobile", "Role", "Created"];

async fn users(config: &Config, command: UserCommand) -> Result<bool> {
    let gateway = IdentityGateway::from_config(config)?;
    let caller: Caller = config.session.clone();
    let mut view = ListView::new(pipeline::user_view(config));
    let directory = gateway.directory(caller.clone());

    match command {
        UserCommand::List { list } => {
            view.select_type(&directory, Selection::All).await?;
            apply_list_args(&mut view, &list, |s| s.parse::<UserField>())?;
            print_users(&view);
            Ok(true)
        }
        UserCommand::Create {
            email,
            first_name,
            last_name,
            role,
        } => {
            let form = InviteUserForm {
                email,
                first_name,
                last_name,
                role: role.unwrap_or_else(|| gateway.default_role().to_string()),
            };
            view.set_selection(Selection::Only(Role::Admin));
            let note = actions::create_user(&gateway, &caller, &mut view, &form).await;
            Ok(report(&note))
        }
        UserCommand::Delete { id } => {
            view.set_selection(Selection::Only(Role::Admin));
            let note = actions::delete_user(&gateway, &caller, &mut view, &id).await;
            Ok(report(&note))
        }
        UserCommand::SetRole { id, role } => {
            let role: Role = role.parse()?;
            view.select_type(&directory, Selection::All).await?;
            let note = actions::update_user_role(&gateway, &caller, &mut view, &id, role).await;
            Ok(report(&note))
        }
        UserCommand::Resend { email } => {
            let note = match gateway.resend_invitation(&caller, &email).await {
                Ok(message) => Notification::success("Password setup").describe(message),
                Err(e) => Notification::failure("Failed to resend password setup email", &e),
            };
            Ok(report(&note))
        }
    }
}

// --- Announcements ---

const ANNOUNCEMENT_HEADERS: [&str; 5] = ["Title", "Priority", "Summary", "Views", "Posted"];

async fn announcements(config: &Config, command: AnnouncementCommand) -> Result<bool> {
    let client = AnnouncementClient::new(&config.backend)?;
    let mut view: ListView<Announcement> = ListView::new(pipeline::announcement_view(config));

    match command {
        AnnouncementCommand::List { priority, list } => {
            let selection = parse_selection::<Priority>(&priority)?;
            view.select_type(&client, selection).await?;
            apply_list_args(&mut view, &list, |s| s.parse::<AnnouncementField>())?;
            print_announcements(&view);
            Ok(true)
        }
        AnnouncementCommand::Show { id } => {
            let found = client.list().await?.into_iter().find(|a| a.id == id);
            match found {
                Some(announcement) => {
                    print_announcement(&announcement);
                    Ok(true)
                }
                None => Err(AppError::validation(format!("No announcement with id '{id}'"))),
            }
        }
        AnnouncementCommand::Add { fields } => {
            let form = announcement_form(fields)?;
            if let Ok(upload) = form.validate() {
                view.set_selection(Selection::Only(upload.priority));
            }
            let note = actions::create_announcement(&client, &mut view, &form).await;
            Ok(report(&note))
        }
        AnnouncementCommand::Update { id, fields } => {
            let form = announcement_form(fields)?;
            if let Ok(upload) = form.validate() {
                view.set_selection(Selection::Only(upload.priority));
            }
            let note = actions::update_announcement(&client, &mut view, &id, &form).await;
            Ok(report(&note))
        }
        AnnouncementCommand::Delete { id } => {
            let note = actions::delete_announcement(&client, &mut view, &id).await;
            Ok(report(&note))
        }
    }
}

fn announcement_form(fields: AnnouncementArgs) -> Result<AnnouncementForm> {
    let body = match (fields.body, fields.body_file) {
        (Some(body), _) => body,
        (None, Some(path)) => fs::read_to_string(path)?,
        (None, None) => String::new(),
    };
    let image = match fields.image {
        Some(path) => Some(ImageAttachment {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            bytes: fs::read(&path)?,
        }),
        None => None,
    };
    Ok(AnnouncementForm {
        title: fields.title,
        template: fields.template.parse()?,
        body,
        priority: fields.priority,
        scheduled_at: fields.scheduled_at.unwrap_or_default(),
        image,
    })
}

fn print_announcements(view: &ListView<Announcement>) {
    let page = view.page();
    if page.is_empty() {
        println!("No announcements found.");
    } else {
        let rows = page
            .rows
            .iter()
            .map(|a| {
                vec![
                    format!("{} ({})", cell(a.title.clone()), a.id),
                    a.priority.to_string(),
                    cell(a.summary().unwrap_or_default().replace('\n', " ")),
                    a.views.to_string(),
                    a.created_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "N/A".to_string()),
                ]
            })
            .collect();
        print_table(&ANNOUNCEMENT_HEADERS, rows);
    }
    print_footer(view);
}

fn print_announcement(announcement: &Announcement) {
    println!("{} [{}]", announcement.title, announcement.priority);
    for block in &announcement.content {
        match block {
            ContentBlock::Text(text) => println!("\n{text}"),
            ContentBlock::Table(rows) => {
                let mut rows = rows.iter().cloned();
                let headers = rows.next().unwrap_or_default();
                let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
                println!();
                print_table(&headers, rows.collect());
            }
            ContentBlock::BulletedList(items) => {
                println!();
                for item in items {
                    println!("  • {item}");
                }
            }
            ContentBlock::Image(url) => println!("\nImage: {url}"),
            ContentBlock::File(url) => println!("\nDocument: {url}"),
        }
    }
    println!();
    if let Some(at) = announcement.scheduled_at {
        println!("Scheduled for: {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(at) = announcement.created_at {
        println!("Posted on: {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    println!(
        "{} views, {} interactions",
        announcement.views, announcement.interactions
    );
}

// --- Rendering ---

fn parse_selection<K>(input: &str) -> Result<Selection<K>>
where
    K: std::str::FromStr<Err = AppError>,
{
    if input.trim().eq_ignore_ascii_case("all") {
        Ok(Selection::All)
    } else {
        Ok(Selection::Only(input.parse()?))
    }
}

fn apply_list_args<R: Record>(
    view: &mut ListView<R>,
    list: &ListArgs,
    parse_field: impl Fn(&str) -> Result<R::Field>,
) -> Result<()> {
    if let Some(term) = &list.search {
        view.set_search(term.as_str());
    }
    if let Some(column) = &list.sort {
        let field = parse_field(column)?;
        if !view.set_sort(field) {
            log::warn!("Column '{column}' is not sortable");
        } else if list.desc {
            view.set_sort(field);
        }
    }
    if let Some(size) = &list.page_size {
        if !view.set_page_size(size) {
            log::warn!("Ignoring page size '{size}'");
        }
    }
    view.set_page_index(list.page);
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn report(note: &Notification) -> bool {
    if note.is_success() {
        println!("✓ {note}");
    } else {
        eprintln!("✗ {note}");
    }
    note.is_success()
}

const MAX_CELL: usize = 40;

fn cell(text: String) -> String {
    if text.chars().count() <= MAX_CELL {
        text
    } else {
        let cut: String = text.chars().take(MAX_CELL - 1).collect();
        format!("{cut}…")
    }
}

fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let line = |values: Vec<String>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{v:<w$}", w = *w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(headers.iter().map(|h| h.to_string()).collect()));
    println!("{}", line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        println!("{}", line(row));
    }
}

fn print_footer<R: Record>(view: &ListView<R>) {
    let page = view.page();
    println!(
        "Showing {}-{} of {} ({}; page {} of {})",
        page.first_row(),
        page.last_row(),
        page.filtered_count,
        view.state().selection,
        page.page_index,
        page.total_pages.max(1)
    );
    if let Some(error) = view.error() {
        eprintln!("✗ {error}");
    }
}

fn print_page<R: Record>(view: &ListView<R>, columns: &[(&str, R::Field)]) {
    let page = view.page();
    if page.is_empty() {
        println!("No records found.");
    } else {
        let headers: Vec<&str> = columns.iter().map(|(h, _)| *h).collect();
        let rows = page
            .rows
            .iter()
            .map(|r| columns.iter().map(|(_, f)| cell(r.value(*f).to_string())).collect())
            .collect();
        print_table(&headers, rows);
    }
    print_footer(view);
}

fn print_users(view: &ListView<User>) {
    let page = view.page();
    if page.is_empty() {
        println!("No users found.");
    } else {
        let rows = page
            .rows
            .iter()
            .map(|u| {
                vec![
                    u.id.clone(),
                    cell(u.full_name.clone()),
                    cell(u.email.clone()),
                    u.phone.clone().unwrap_or_else(|| "N/A".to_string()),
                    u.role.to_string(),
                    u.created_at.format("%Y-%m-%d").to_string(),
                ]
            })
            .collect();
        print_table(&USER_HEADERS, rows);
    }
    print_footer(view);
}
