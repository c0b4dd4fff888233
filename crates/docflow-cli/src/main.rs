//! docflow CLI: create offers and drive documents through the
//! Offer → Proforma → Business case → Invoice/Reports/Training pipeline.

use clap::{Parser, Subcommand};
use docflow_cli::commands;
use docflow_core::models::{AddParticipantInput, CertificateUpdate};

#[derive(Parser)]
#[command(name = "docflow", version, about = "docflow: business document lifecycle tracker")]
pub struct Cli {
    /// Path to the SQLite database file (defaults to the configured path, then docflow.db)
    #[arg(long, env = "DOCFLOW_DB_PATH")]
    db: Option<String>,

    /// Path to a YAML config file
    #[arg(long, env = "DOCFLOW_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage legal entities
    Entity {
        #[command(subcommand)]
        action: EntityAction,
    },
    /// Manage clients
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },
    /// Manage client sites
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },
    /// Manage catalog categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage catalog products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Create offers
    Offer {
        #[command(subcommand)]
        action: OfferAction,
    },
    /// Inspect documents and change their status
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },
    /// Invoice payments
    Invoice {
        #[command(subcommand)]
        action: InvoiceAction,
    },
    /// Training sessions and participants
    Training {
        #[command(subcommand)]
        action: TrainingAction,
    },
    /// Training certificates
    Certificate {
        #[command(subcommand)]
        action: CertificateAction,
    },
    /// Document counts across the pipeline
    Summary,
}

#[derive(Subcommand)]
enum EntityAction {
    Create {
        /// Three uppercase letters, e.g. ACM
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
    },
    List,
}

#[derive(Subcommand)]
enum ClientAction {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
enum SiteAction {
    Create {
        #[arg(long)]
        client_id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    List {
        #[arg(long)]
        client_id: i64,
        /// Include inactive sites
        #[arg(long)]
        all: bool,
    },
    /// Deactivate a site so it is no longer offered
    Deactivate {
        #[arg(long)]
        id: i64,
    },
    Activate {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    Create {
        #[arg(long)]
        entity_id: i64,
        /// Three uppercase letters; the configured training code (FOR) marks training
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List {
        #[arg(long)]
        entity_id: i64,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    Create {
        #[arg(long)]
        category_id: i64,
        /// VTE<n> or EC<n>
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value_t = 0)]
        price_cents: i64,
    },
    List {
        #[arg(long)]
        category_id: i64,
    },
    SetPrice {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        price_cents: i64,
    },
}

#[derive(Subcommand)]
enum OfferAction {
    Create {
        #[arg(long)]
        entity_id: i64,
        #[arg(long)]
        client_id: i64,
        /// Comma-separated product ids
        #[arg(long, value_delimiter = ',', required = true)]
        product_ids: Vec<i64>,
        /// Comma-separated site ids
        #[arg(long, value_delimiter = ',')]
        site_ids: Vec<i64>,
        #[arg(long)]
        comments: Option<String>,
        /// Back-date the offer (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        by: Option<String>,
    },
}

#[derive(Subcommand)]
enum DocAction {
    Show {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        reference: Option<String>,
    },
    List {
        /// Type code: OFF, PRO, AFF, FAC, RAP, ATT
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        client_id: Option<i64>,
    },
    /// Documents created from this one
    Children {
        #[arg(long)]
        id: i64,
    },
    Transition {
        #[arg(long)]
        id: i64,
        /// DRAFT, SENT, VALIDATED, REFUSED, IN_PROGRESS, COMPLETED, CANCELLED
        #[arg(long)]
        status: String,
        #[arg(long)]
        by: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    Validate {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        by: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    Complete {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        by: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Create the downstream documents of a validated or completed document
    Cascade {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        by: Option<String>,
    },
    History {
        #[arg(long)]
        id: i64,
    },
    /// Replace the comments of a draft document
    Comment {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        text: Option<String>,
    },
    /// Set the planned end date of a business case
    Plan {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        date: String,
    },
}

#[derive(Subcommand)]
enum InvoiceAction {
    Pay {
        #[arg(long)]
        id: i64,
        /// Payment date (YYYY-MM-DD), today when omitted
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
enum TrainingAction {
    Sessions {
        #[arg(long)]
        business_case_id: i64,
    },
    Participants {
        #[arg(long)]
        session_id: i64,
    },
    AddParticipant {
        #[arg(long)]
        session_id: i64,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        job_title: Option<String>,
    },
    Score {
        #[arg(long)]
        participant_id: i64,
        /// Out of 20
        #[arg(long)]
        score: f64,
        #[arg(long)]
        comment: Option<String>,
    },
    Absent {
        #[arg(long)]
        participant_id: i64,
    },
    Schedule {
        #[arg(long)]
        session_id: i64,
        #[arg(long)]
        trainer: Option<String>,
        /// RFC 3339 timestamp
        #[arg(long)]
        starts_at: String,
        #[arg(long)]
        ends_at: String,
    },
}

#[derive(Subcommand)]
enum CertificateAction {
    Issue {
        #[arg(long)]
        participant_id: i64,
        #[arg(long)]
        details: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Record skills, evaluation and signatures
    Sign {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        skills: Option<String>,
        #[arg(long)]
        evaluation: Option<String>,
        #[arg(long)]
        trainer: bool,
        #[arg(long)]
        participant: bool,
    },
}

async fn run(cli: Cli) -> Result<serde_json::Value, String> {
    let state = commands::init_state(cli.db.as_deref(), cli.config.as_deref())?;

    match cli.command {
        Commands::Entity { action } => match action {
            EntityAction::Create { code, name } => commands::entity::create(&state, &code, &name).await,
            EntityAction::List => commands::entity::list(&state).await,
        },

        Commands::Client { action } => match action {
            ClientAction::Create {
                name,
                email,
                phone,
                address,
            } => commands::client::create(&state, &name, email, phone, address).await,
            ClientAction::List => commands::client::list(&state).await,
        },

        Commands::Site { action } => match action {
            SiteAction::Create {
                client_id,
                name,
                location,
                description,
            } => commands::client::create_site(&state, client_id, &name, location, description).await,
            SiteAction::List { client_id, all } => commands::client::list_sites(&state, client_id, all).await,
            SiteAction::Deactivate { id } => commands::client::set_site_active(&state, id, false).await,
            SiteAction::Activate { id } => commands::client::set_site_active(&state, id, true).await,
        },

        Commands::Category { action } => match action {
            CategoryAction::Create {
                entity_id,
                code,
                name,
                description,
            } => commands::catalog::create_category(&state, entity_id, &code, &name, description).await,
            CategoryAction::List { entity_id } => commands::catalog::list_categories(&state, entity_id).await,
        },

        Commands::Product { action } => match action {
            ProductAction::Create {
                category_id,
                code,
                name,
                description,
                price_cents,
            } => {
                commands::catalog::create_product(&state, category_id, &code, &name, description, price_cents)
                    .await
            }
            ProductAction::List { category_id } => commands::catalog::list_products(&state, category_id).await,
            ProductAction::SetPrice { id, price_cents } => {
                commands::catalog::set_price(&state, id, price_cents).await
            }
        },

        Commands::Offer { action } => match action {
            OfferAction::Create {
                entity_id,
                client_id,
                product_ids,
                site_ids,
                comments,
                date,
                by,
            } => {
                commands::offer::create(
                    &state,
                    entity_id,
                    client_id,
                    product_ids,
                    site_ids,
                    comments,
                    date.as_deref(),
                    by,
                )
                .await
            }
        },

        Commands::Doc { action } => match action {
            DocAction::Show { id, reference } => commands::document::show(&state, id, reference.as_deref()).await,
            DocAction::List { kind, client_id } => {
                commands::document::list(&state, kind.as_deref(), client_id).await
            }
            DocAction::Children { id } => commands::document::children(&state, id).await,
            DocAction::Transition {
                id,
                status,
                by,
                comment,
            } => commands::document::transition(&state, id, &status, by, comment).await,
            DocAction::Validate { id, by, comment } => commands::document::validate(&state, id, by, comment).await,
            DocAction::Complete { id, by, comment } => commands::document::complete(&state, id, by, comment).await,
            DocAction::Cascade { id, by } => commands::document::cascade(&state, id, by).await,
            DocAction::History { id } => commands::document::history(&state, id).await,
            DocAction::Comment { id, text } => commands::document::comment(&state, id, text).await,
            DocAction::Plan { id, date } => commands::document::plan(&state, id, &date).await,
        },

        Commands::Invoice { action } => match action {
            InvoiceAction::Pay { id, date } => commands::invoice::pay(&state, id, date.as_deref()).await,
        },

        Commands::Training { action } => match action {
            TrainingAction::Sessions { business_case_id } => {
                commands::training::sessions(&state, business_case_id).await
            }
            TrainingAction::Participants { session_id } => {
                commands::training::participants(&state, session_id).await
            }
            TrainingAction::AddParticipant {
                session_id,
                last_name,
                first_name,
                email,
                phone,
                job_title,
            } => {
                commands::training::add_participant(
                    &state,
                    session_id,
                    AddParticipantInput {
                        last_name,
                        first_name,
                        email,
                        phone,
                        job_title,
                    },
                )
                .await
            }
            TrainingAction::Score {
                participant_id,
                score,
                comment,
            } => commands::training::score(&state, participant_id, score, comment).await,
            TrainingAction::Absent { participant_id } => {
                commands::training::attendance(&state, participant_id, false).await
            }
            TrainingAction::Schedule {
                session_id,
                trainer,
                starts_at,
                ends_at,
            } => commands::training::schedule(&state, session_id, trainer, &starts_at, &ends_at).await,
        },

        Commands::Certificate { action } => match action {
            CertificateAction::Issue {
                participant_id,
                details,
                by,
            } => commands::certificate::issue(&state, participant_id, &details, by).await,
            CertificateAction::Sign {
                id,
                skills,
                evaluation,
                trainer,
                participant,
            } => {
                let update = CertificateUpdate {
                    skills_acquired: skills,
                    evaluation_result: evaluation,
                    trainer_signed: trainer.then_some(true),
                    participant_signed: participant.then_some(true),
                };
                commands::certificate::update(&state, id, update).await
            }
        },

        Commands::Summary => commands::summary::show(&state).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_core=warn,docflow_cli=info".into()),
        )
        .init();

    match run(cli).await {
        Ok(value) => commands::print_json(&value),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
