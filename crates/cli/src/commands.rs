use std::io::BufRead;

use api_types::{
    Amount, EntryType,
    category::{Category, CategoryCreate, CategoryQuery},
    journal::{Journal, JournalCreate, JournalFilters, JournalUpdate},
    user::{ApiKeyCreate, ProfileUpdate},
};
use client::{
    Kaizen,
    aggregation::CategoryBreakdown,
    filters::{FinanceTab, MonthWindow, TypeFilter},
    view::{DashboardView, FinancePage},
};

use crate::{
    cli::{AddCategoryArgs, AddJournalArgs, ApiKeyCommand, Command, EditJournalArgs, JournalsArgs},
    error::{AppError, Result},
};

const PASSWORD_ENV: &str = "KAIZEN_PASSWORD";

pub async fn run(kaizen: &Kaizen, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => {
            let password = read_password()?;
            let user = kaizen.session().login(&email, &password).await?;
            println!("Logged in as {} <{}>", user.name, user.email);
        }
        Command::Register { name, email } => {
            let password = read_password()?;
            let user = kaizen.session().register(&name, &email, &password).await?;
            println!("Welcome, {}", user.name);
        }
        Command::Logout { all } => {
            let session = kaizen.session();
            let res = if all {
                session.logout_all().await
            } else {
                session.logout().await
            };
            match res {
                Ok(message) => println!("{}", message.message),
                Err(err) => {
                    tracing::warn!("server logout failed: {err}");
                    println!("Local session cleared");
                }
            }
        }
        Command::Whoami => match kaizen.session().check_auth().await? {
            Some(user) => println!("{} <{}> (id {})", user.name, user.email, user.id),
            None => println!("Not logged in"),
        },
        Command::Rename { name } => {
            let user = kaizen.update_profile(&ProfileUpdate { name }).await?;
            println!("Display name is now {}", user.name);
        }
        Command::Dashboard => dashboard(kaizen).await?,
        Command::Categories { kind } => {
            let query = CategoryQuery {
                kind: kind.map(Into::into),
                active: None,
            };
            let categories = kaizen.categories(&query)?.fetch().await?;
            if categories.is_empty() {
                println!("No categories");
            }
            for category in categories.iter() {
                println!(
                    "{:>5}  {} {:<20} {:<8} {}",
                    category.id,
                    icon_or_blank(&category.icon),
                    category.name,
                    category.kind,
                    if category.is_active { "" } else { "(inactive)" }
                );
            }
        }
        Command::Journals(args) => journals(kaizen, args).await?,
        Command::Summary { month, kind } => {
            let month = month.unwrap_or_else(|| MonthWindow::current(kaizen.timezone()));
            let filter = kind.map_or(TypeFilter::All, |kind| TypeFilter::from(EntryType::from(kind)));
            summary(kaizen, month, filter).await?;
        }
        Command::AddJournal(args) => {
            let payload = journal_create(kaizen, args)?;
            let journal = kaizen.create_journal(&payload).await?;
            println!("Added journal {}", journal.id);
        }
        Command::EditJournal(args) => {
            let id = args.id;
            let payload = journal_update(args)?;
            let journal = kaizen.update_journal(id, &payload).await?;
            println!("Updated journal {}", journal.id);
        }
        Command::DeleteJournal { id } => {
            kaizen.delete_journal(id).await?;
            println!("Deleted journal {id}");
        }
        Command::AddCategory(args) => {
            let category = kaizen.create_category(&category_create(args)).await?;
            println!("Added category {} ({})", category.name, category.id);
        }
        Command::DeleteCategory { id } => {
            kaizen.delete_category(id).await?;
            println!("Deleted category {id}; its journals are now uncategorized");
        }
        Command::ApiKeys(keys) => api_keys(kaizen, keys.command).await?,
    }
    Ok(())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AppError::Input("password required".to_string()));
    }
    Ok(password)
}

fn parse_amount(raw: &str) -> Result<Amount> {
    raw.parse::<Amount>()
        .map_err(|err| AppError::Input(format!("amount `{raw}`: {err}")))
}

fn journal_create(kaizen: &Kaizen, args: AddJournalArgs) -> Result<JournalCreate> {
    Ok(JournalCreate {
        category_id: args.category,
        kind: args.kind.map(Into::into),
        amount: parse_amount(&args.amount)?,
        title: args.title,
        description: args.description,
        date: Some(args.date.unwrap_or_else(|| kaizen.today())),
        payment_method: args.payment_method,
        location: args.location,
        is_recurring: None,
        receipt_url: None,
    })
}

fn journal_update(args: EditJournalArgs) -> Result<JournalUpdate> {
    Ok(JournalUpdate {
        category_id: args.category,
        kind: args.kind.map(Into::into),
        amount: args.amount.as_deref().map(parse_amount).transpose()?,
        title: args.title,
        description: args.description,
        date: args.date,
        ..JournalUpdate::default()
    })
}

fn category_create(args: AddCategoryArgs) -> CategoryCreate {
    CategoryCreate {
        name: args.name,
        kind: args.kind.into(),
        description: args.description,
        color: args.color,
        icon: args.icon,
    }
}

async fn journals(kaizen: &Kaizen, args: JournalsArgs) -> Result<()> {
    let filters = JournalFilters {
        kind: args.kind.map(Into::into),
        category_id: args.category,
        start_date: args.from,
        end_date: args.to,
        ..JournalFilters::default()
    };
    let page_size = args.page_size.unwrap_or(kaizen.config().page_size);
    let list = kaizen.infinite_journals_with(&filters, page_size)?;
    let categories = kaizen.categories(&CategoryQuery::default())?;

    let (pages, categories) = tokio::join!(list.fetch(), categories.fetch());
    let mut pages = pages?;
    let categories = categories?;
    for _ in 1..args.pages.max(1) {
        if !pages.has_next_page() {
            break;
        }
        pages = list.fetch_next_page().await?;
    }

    if pages.journals().is_empty() {
        println!("No journals");
        return Ok(());
    }
    for journal in pages.journals() {
        print_journal(journal, &categories);
    }
    println!(
        "{} of {} shown{}",
        pages.journals().len(),
        pages.total_count(),
        if pages.has_next_page() {
            "; use --pages to load more"
        } else {
            ""
        }
    );
    Ok(())
}

async fn summary(kaizen: &Kaizen, month: MonthWindow, filter: TypeFilter) -> Result<()> {
    let mut page = FinancePage::new(kaizen)?;
    page.set_month(month);
    page.ui_mut().set_active_tab(FinanceTab::Summary);
    let snapshot = page.load().await?;
    if let Some(err) = snapshot
        .summary_error
        .clone()
        .or_else(|| snapshot.categories_error.clone())
    {
        return Err(err.into());
    }

    println!("{}", month.label());
    println!("  Income   {:>12}", snapshot.summary.total_income.to_string());
    println!("  Expense  {:>12}", snapshot.summary.total_expense.to_string());
    println!("  Net      {:>12}", snapshot.summary.net_balance.to_string());
    println!();
    print_breakdown(&snapshot.breakdown(filter));
    Ok(())
}

async fn dashboard(kaizen: &Kaizen) -> Result<()> {
    let view = DashboardView::new(kaizen)?;
    let categories = kaizen.categories(&CategoryQuery::default())?;
    let (snapshot, categories) = tokio::join!(view.load(), categories.fetch());
    if let Some(err) = snapshot
        .summary_error
        .clone()
        .or_else(|| snapshot.journals_error.clone())
    {
        return Err(err.into());
    }
    let categories = categories?;

    println!(
        "Balance {}  (income {}, expense {})",
        snapshot.summary.net_balance, snapshot.summary.total_income, snapshot.summary.total_expense
    );
    println!();
    if snapshot.recent.is_empty() {
        println!("No journals yet");
    }
    for journal in &snapshot.recent {
        print_journal(journal, &categories);
    }
    Ok(())
}

async fn api_keys(kaizen: &Kaizen, command: ApiKeyCommand) -> Result<()> {
    match command {
        ApiKeyCommand::List => {
            let keys = kaizen.api_keys().fetch().await?;
            if keys.is_empty() {
                println!("No API keys");
            }
            for key in keys.iter() {
                println!(
                    "{:>5}  {:<20} {}{}",
                    key.id,
                    key.name,
                    key.key,
                    if key.is_active { "" } else { " (revoked)" }
                );
            }
        }
        ApiKeyCommand::Create { name, expires_at } => {
            let created = kaizen
                .create_api_key(&ApiKeyCreate { name, expires_at })
                .await?;
            println!("Created key {} ({})", created.name, created.id);
            println!("{}", created.key);
            println!("Store it now: it will not be shown again.");
        }
        ApiKeyCommand::Revoke { id } => {
            kaizen.revoke_api_key(id).await?;
            println!("Revoked key {id}");
        }
    }
    Ok(())
}

fn print_journal(journal: &Journal, categories: &[Category]) {
    let category = journal
        .category_id
        .and_then(|id| categories.iter().find(|category| category.id == id))
        .map_or("-", |category| category.name.as_str());
    let sign = match journal.kind {
        EntryType::Income => '+',
        EntryType::Expense => '-',
    };
    println!(
        "{:>5}  {}  {sign}{:>11}  {:<16} {}",
        journal.id,
        journal.date,
        journal.amount.to_string(),
        category,
        journal.title
    );
}

fn print_breakdown(breakdown: &CategoryBreakdown) {
    if breakdown.groups.is_empty() {
        println!("No entries this month");
        return;
    }
    for group in &breakdown.groups {
        println!(
            "  {} {:<20} {:>12} {:>6.2}%  ({} entries)",
            icon_or_blank(&group.icon),
            group.label,
            group.total.to_string(),
            group.percentage,
            group.count
        );
    }
    println!("  {:<22} {:>12}", "Total", breakdown.grand_total.to_string());
}

fn icon_or_blank(icon: &str) -> &str {
    if icon.is_empty() { " " } else { icon }
}

#[cfg(test)]
mod tests {
    use client::ClientConfig;

    use super::*;
    use crate::cli::Kind;

    fn offline() -> Kaizen {
        Kaizen::builder()
            .config(ClientConfig {
                base_url: "http://127.0.0.1:9/api/v1".to_string(),
                token_path: None,
                ..ClientConfig::default()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn add_journal_defaults_date_to_today() {
        let kaizen = offline();
        let payload = journal_create(
            &kaizen,
            AddJournalArgs {
                category: 2,
                amount: "12,50".to_string(),
                title: "Lunch".to_string(),
                kind: Some(Kind::Expense),
                date: None,
                description: None,
                payment_method: None,
                location: None,
            },
        )
        .unwrap();
        assert_eq!(payload.amount, Amount::new(1250));
        assert_eq!(payload.kind, Some(EntryType::Expense));
        assert_eq!(payload.date, Some(kaizen.today()));
    }

    #[test]
    fn edit_journal_sends_only_given_fields() {
        let payload = journal_update(EditJournalArgs {
            id: 4,
            category: None,
            amount: Some("3".to_string()),
            title: None,
            kind: None,
            date: None,
            description: None,
        })
        .unwrap();
        assert_eq!(payload.amount, Some(Amount::new(300)));
        assert_eq!(payload.title, None);

        let bad = journal_update(EditJournalArgs {
            id: 4,
            category: None,
            amount: Some("abc".to_string()),
            title: None,
            kind: None,
            date: None,
            description: None,
        });
        assert!(matches!(bad, Err(AppError::Input(_))));
    }
}
