use chauffeur_availability::core::catalog;
use chauffeur_availability::utils::error::ErrorSeverity;
use chauffeur_availability::utils::logger::{self, LogFormat};
use chauffeur_availability::{
    AirtableStore, AppConfig, AvailabilityError, AvailabilityStatus, AvailabilityViewModel,
    CliArgs, Command,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, args.verbose);

    tracing::info!("Starting chauffeur-availability");

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };
    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    let store = match AirtableStore::new(&config) {
        Ok(store) => store,
        Err(e) => exit_with(AvailabilityError::InvalidConfiguration {
            field: "store.api_url".to_string(),
            value: config.store.api_url.clone(),
            reason: e.to_string(),
        }),
    };
    let mut view = AvailabilityViewModel::new(store);

    if let Err(e) = run(&mut view, args.command).await {
        exit_with(e);
    }

    Ok(())
}

async fn run(
    view: &mut AvailabilityViewModel<AirtableStore>,
    command: Command,
) -> chauffeur_availability::Result<()> {
    match command {
        Command::Chauffeurs => {
            for chauffeur in view.load_chauffeurs().await? {
                println!("{}\t{}", chauffeur.id, chauffeur.name);
            }
        }
        Command::Events => {
            let events = catalog::fetch_events(view.repository().store()).await?;
            for event in events {
                println!(
                    "{}\t{}\t{} - {}\t{}",
                    event.id,
                    event.name,
                    event.starts_at.format("%Y-%m-%d %H:%M"),
                    event.stops_at.format("%H:%M"),
                    event.city
                );
            }
        }
        Command::Show { chauffeur } => {
            view.load_chauffeurs().await?;
            view.select_chauffeur(&chauffeur).await?;
            print_rows(view);
        }
        Command::Set {
            chauffeur,
            event,
            status,
        } => {
            view.select_chauffeur(&chauffeur).await?;
            let record = view.request_change(&event, status).await?;
            println!("✅ {} -> {} ({})", record.event_id, record.status, record.id);
        }
    }
    Ok(())
}

fn print_rows(view: &AvailabilityViewModel<AirtableStore>) {
    if let Some(chauffeur) = view.selected_chauffeur() {
        println!("Chauffeur: {}", chauffeur.name);
    }
    for row in view.rows() {
        let marker = match row.status {
            AvailabilityStatus::Available => "✅",
            AvailabilityStatus::NotAvailable => "🚫",
            AvailabilityStatus::MaybeAvailable => "💅",
            AvailabilityStatus::Unset => "  ",
        };
        let travel = row
            .event
            .travel_time
            .map(|d| format!("{}h{:02}", d.num_hours(), d.num_minutes() % 60))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} {}\t{}\t{}\t{}\ttravel {}\t{}",
            marker,
            row.event.id,
            row.event.name,
            row.event.starts_at.format("%Y-%m-%d %H:%M"),
            row.event.city,
            travel,
            row.status
        );
    }
}

fn exit_with(e: AvailabilityError) -> ! {
    tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
