use api_types::EntryType;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use client::filters::MonthWindow;

#[derive(Debug, Parser)]
#[command(name = "kaizen")]
#[command(about = "Track income and expenses against a Kaizen server")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:8080/api/v1).
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long, global = true)]
    pub timezone: Option<String>,
    /// Credential namespace, for keeping several accounts side by side.
    #[arg(long, global = true)]
    pub profile: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in; the password is read from `KAIZEN_PASSWORD` or stdin.
    Login {
        #[arg(long)]
        email: String,
    },
    /// Create an account and log in.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    Logout {
        /// End every session of the account.
        #[arg(long)]
        all: bool,
    },
    /// Show the logged-in user.
    Whoami,
    /// Change the display name.
    Rename {
        name: String,
    },
    /// Recent entries and all-time totals.
    Dashboard,
    Categories {
        #[arg(long = "type", value_enum)]
        kind: Option<Kind>,
    },
    Journals(JournalsArgs),
    /// Monthly totals with a per-category breakdown.
    Summary {
        /// Month as YYYY-MM; defaults to the current month.
        #[arg(long)]
        month: Option<MonthWindow>,
        #[arg(long = "type", value_enum)]
        kind: Option<Kind>,
    },
    AddJournal(AddJournalArgs),
    EditJournal(EditJournalArgs),
    DeleteJournal {
        id: i64,
    },
    AddCategory(AddCategoryArgs),
    DeleteCategory {
        id: i64,
    },
    ApiKeys(ApiKeys),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    Income,
    Expense,
}

impl From<Kind> for EntryType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Income => EntryType::Income,
            Kind::Expense => EntryType::Expense,
        }
    }
}

#[derive(Debug, Args)]
pub struct JournalsArgs {
    #[arg(long = "type", value_enum)]
    pub kind: Option<Kind>,
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Number of pages to load.
    #[arg(long, default_value_t = 1)]
    pub pages: u32,
    /// Entries per page; defaults to the configured page size.
    #[arg(long)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Args)]
pub struct AddJournalArgs {
    #[arg(long)]
    pub category: i64,
    /// Decimal amount, e.g. 12.50.
    #[arg(long)]
    pub amount: String,
    #[arg(long)]
    pub title: String,
    /// Defaults to the category's type.
    #[arg(long = "type", value_enum)]
    pub kind: Option<Kind>,
    /// Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub payment_method: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
}

#[derive(Debug, Args)]
pub struct EditJournalArgs {
    pub id: i64,
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long)]
    pub amount: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long = "type", value_enum)]
    pub kind: Option<Kind>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Args)]
pub struct AddCategoryArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long = "type", value_enum)]
    pub kind: Kind,
    #[arg(long)]
    pub icon: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Args)]
pub struct ApiKeys {
    #[command(subcommand)]
    pub command: ApiKeyCommand,
}

#[derive(Debug, Subcommand)]
pub enum ApiKeyCommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        /// Expiry timestamp (RFC 3339), passed through to the server.
        #[arg(long)]
        expires_at: Option<String>,
    },
    Revoke {
        id: i64,
    },
}
