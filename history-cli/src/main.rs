use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use history_client::{ClientConfig, HistoryLoader, HttpClient, DEFAULT_TIMEOUT_SECS};
use history_core::{
    build_timeline, filter_timeline, paginate, summarize, Category, HistoryConfig, HistoryState,
    HistorySummary, LoadStatus, TimelineEntry,
};
use history_normalize::normalize_snapshot_str;
use history_report::{build_report, export_report, ReportSubject};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "history",
    about = "Load a patient's medical history and print its timeline, summary or PDF report."
)]
struct Args {
    /// Patient identifier to load from the API.
    #[arg(short, long, env = "HISTORY_PATIENT_ID")]
    patient: Option<String>,

    /// Read a JSON snapshot of the eight categories instead of calling the API.
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(long, env = "HISTORY_API_URL")]
    base_url: Option<String>,

    #[arg(long, env = "HISTORY_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "HISTORY_TENANT_ID")]
    tenant: Option<String>,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Case-insensitive text filter for the timeline.
    #[arg(short, long)]
    query: Option<String>,

    /// Print one page of a category table instead of the timeline.
    #[arg(long, value_parser = parse_category)]
    tab: Option<Category>,

    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long, default_value_t = HistoryConfig::default().page_size)]
    page_size: usize,

    /// Print the summary and filtered timeline as JSON.
    #[arg(long)]
    json: bool,

    /// Write the PDF report into this directory.
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Patient name shown on the report and used in its filename.
    #[arg(long)]
    name: Option<String>,

    /// MRN shown on the report.
    #[arg(long)]
    mrn: Option<String>,
}

fn parse_category(raw: &str) -> Result<Category, String> {
    let raw = raw.trim();
    Category::ALL
        .into_iter()
        .find(|category| {
            category.label().eq_ignore_ascii_case(raw)
                || category.heading().eq_ignore_ascii_case(raw)
                || format!("{}s", category.label()).eq_ignore_ascii_case(raw)
        })
        .ok_or_else(|| {
            let names: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
            format!("unknown category '{raw}', expected one of: {}", names.join(", "))
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("history=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = HistoryConfig {
        page_size: args.page_size,
        ..HistoryConfig::default()
    };

    let state = match &args.input {
        Some(path) => load_snapshot(path)?,
        None => fetch_history(&args).await?,
    };
    match state.status {
        LoadStatus::Failed => {
            for failure in &state.failures {
                eprintln!("{}: {}", failure.category.heading(), failure.message);
            }
            bail!("every history category failed to load");
        }
        LoadStatus::Partial => {
            let failed: Vec<&str> = state.failed_categories().iter().map(|c| c.heading()).collect();
            eprintln!("Warning: could not load {}; shown as empty.", failed.join(", "));
        }
        _ => {}
    }

    let aggregate = &state.aggregate;
    let summary = summarize(aggregate);
    let entries = build_timeline(aggregate, &config);
    let visible = filter_timeline(&entries, args.query.as_deref());

    if args.json {
        let output = serde_json::json!({ "summary": summary, "timeline": visible });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if let Some(category) = args.tab {
        print_tab(&state, category, args.page, &config);
    } else {
        print_summary(&summary);
        print_timeline(&visible);
    }

    if let Some(dir) = &args.export_dir {
        let subject = ReportSubject {
            name: args.name.clone(),
            identifier: args
                .mrn
                .clone()
                .or_else(|| state.patient_id.as_ref().map(|id| id.to_string())),
        };
        let path = export_report(aggregate, &subject, Utc::now().date_naive(), dir)
            .with_context(|| format!("could not export report into {}", dir.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn load_snapshot(path: &Path) -> anyhow::Result<HistoryState> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    let state = snapshot_state(&data)
        .with_context(|| format!("could not normalize {}", path.display()))?;
    info!(
        path = %path.display(),
        failed = state.failures.len(),
        "history snapshot loaded"
    );
    Ok(state)
}

/// Unreadable sections become category failures, as a live load reports them.
fn snapshot_state(data: &str) -> anyhow::Result<HistoryState> {
    let snapshot = normalize_snapshot_str(data)?;
    Ok(HistoryState {
        status: snapshot.status(),
        aggregate: snapshot.aggregate,
        failures: snapshot.failures,
        ..HistoryState::default()
    })
}

async fn fetch_history(args: &Args) -> anyhow::Result<HistoryState> {
    let base_url = args
        .base_url
        .as_deref()
        .context("--base-url (or HISTORY_API_URL) is required unless --input is given")?;
    let patient = args
        .patient
        .as_deref()
        .context("--patient (or HISTORY_PATIENT_ID) is required when loading from the API")?;

    let mut client_config =
        ClientConfig::new(base_url)?.with_timeout(Duration::from_secs(args.timeout_secs));
    if let Some(token) = &args.token {
        client_config = client_config.with_token(token.as_str());
    }
    if let Some(tenant) = &args.tenant {
        client_config = client_config.with_tenant(tenant.as_str());
    }

    let loader = HistoryLoader::new(HttpClient::new(&client_config)?);
    let mut state = HistoryState::default();
    loader
        .refresh(&mut state, patient)
        .await
        .with_context(|| format!("could not load history for patient {patient}"))?;
    Ok(state)
}

fn print_summary(summary: &HistorySummary) {
    println!("History summary");
    for category in Category::ALL {
        println!("  {:<16}{}", category.heading(), summary.count(category));
    }
    println!(
        "  Active admissions: {}, pending labs: {}, abnormal labs: {}",
        summary.active_admissions, summary.pending_labs, summary.abnormal_labs
    );
    for stat in summary.vital_statistics.iter().filter(|stat| stat.samples > 0) {
        let unit = stat.metric.unit().unwrap_or("");
        if let (Some(latest), Some(average)) = (stat.latest, stat.average) {
            println!(
                "  {}: latest {latest:.1}{unit}, mean {average:.1}{unit} over {} readings",
                stat.metric.label(),
                stat.samples
            );
        }
    }
    println!();
}

fn print_timeline(entries: &[&TimelineEntry]) {
    if entries.is_empty() {
        println!("No timeline events.");
        return;
    }
    for entry in entries {
        println!(
            "{}  [{}] {}",
            entry.date.format("%Y-%m-%d %H:%M"),
            entry.category.label(),
            entry.title
        );
        if !entry.description.is_empty() {
            println!("                  {}", entry.description);
        }
    }
}

fn print_tab(state: &HistoryState, category: Category, page: usize, config: &HistoryConfig) {
    let report = build_report(&state.aggregate, &ReportSubject::default(), Utc::now().date_naive());
    let Some(table) = report.table(category) else {
        println!("No {} recorded.", category.heading().to_lowercase());
        return;
    };

    let page = paginate(&table.rows, page, config.page_size, HistoryConfig::default().page_size);
    let titles: Vec<&str> = table.columns.iter().map(|column| column.title).collect();
    println!("{}", table.heading);
    println!("{}", titles.join(" | "));
    for row in page.items {
        println!("{}", row.join(" | "));
    }
    println!(
        "Page {} of {} ({} records)",
        page.number, page.total_pages, page.total_items
    );
}
