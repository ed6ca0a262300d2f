use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_registry::query::ACTIVITY_FLAGS;
use client_registry::{ingest, ClientRecord, ClientSession, RegistryConfig, Schema, Table, UploadReport};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "client-registry")]
#[command(about = "Validate client CSV exports and inspect them as a client registry")]
struct Args {
    /// Schema version (v1, v2, latest) or path to a schema JSON file
    /// (or set CLIENT_REGISTRY_SCHEMA)
    #[arg(short, long, global = true)]
    schema: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a CSV export and report invalid rows and duplicates
    Check { csv: PathBuf },

    /// Write the export with invalid rows removed
    Clean {
        csv: PathBuf,
        #[arg(short, long, default_value = "cleaned_clients.csv")]
        output: PathBuf,
    },

    /// Show the details and notes of one client
    Show { csv: PathBuf, business_name: String },

    /// Search clients by "business name (contact name)"
    Search {
        csv: PathBuf,
        #[arg(default_value = "")]
        term: String,
    },

    /// Edit notes of one client and print them (changes are not saved to disk)
    Notes {
        csv: PathBuf,
        business_name: String,
        /// field=value, repeatable
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },

    /// Aggregate counts and numeric distributions
    Stats { csv: PathBuf },
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected field=value, got '{}'", raw))
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = RegistryConfig::from_env()?;
    if let Some(schema) = args.schema.clone() {
        config.schema = schema;
    }
    info!("Using schema {}", config.schema);

    match &args.command {
        Command::Check { csv } => check(&config, csv, args.json),
        Command::Clean { csv, output } => clean(&config, csv, output),
        Command::Show { csv, business_name } => show(&config, csv, business_name, args.json),
        Command::Search { csv, term } => search(&config, csv, term, args.json),
        Command::Notes { csv, business_name, set } => notes(&config, csv, business_name, set, args.json),
        Command::Stats { csv } => stats(&config, csv, args.json),
    }
}

fn open_session(config: &RegistryConfig, csv: &Path) -> Result<(ClientSession, UploadReport)> {
    let mut session = config.session().context("Failed to load schema")?;
    let file = File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
    let report = session
        .upload_csv(file)
        .with_context(|| format!("Upload of {} rejected", csv.display()))?;
    Ok((session, report))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(table: &Table) {
    println!("{}", table.columns().join(" | "));
    for row in table.rows() {
        println!("{}", row.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" | "));
    }
}

fn check(config: &RegistryConfig, csv: &Path, json: bool) -> Result<()> {
    let (_, report) = open_session(config, csv)?;
    if json {
        return print_json(&report);
    }

    println!("Outcome: {:?} ({} records loaded)", report.outcome, report.records_loaded);
    if !report.invalid_rows.is_empty() {
        println!("\nRows with invalid numeric values:");
        for row in &report.invalid_rows {
            let cells = row
                .numeric_cells
                .iter()
                .map(|(name, raw)| format!("{}='{}'", name, raw))
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "  row {}: {} [{}] status={} products={}",
                row.row + 1,
                row.business_name,
                cells,
                row.status.as_deref().unwrap_or("-"),
                row.products.as_deref().unwrap_or("-")
            );
        }
    }
    if !report.duplicate_names.is_empty() {
        println!("\nDuplicate business names:");
        for name in &report.duplicate_names {
            println!("  {}", name);
        }
    }
    println!("\nPreview:");
    print_table(&report.preview);
    Ok(())
}

fn clean(config: &RegistryConfig, csv: &Path, output: &Path) -> Result<()> {
    let schema: Schema = config.load_schema()?;
    let file = File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
    let raw = Table::from_csv_reader(file)?;
    let result = ingest(&raw, &schema)?;

    match result.cleaned_export()? {
        Some(bytes) => {
            std::fs::write(output, bytes).with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Wrote {} of {} rows to {}",
                result.validated.height(),
                result.input_rows,
                output.display()
            );
        }
        None => println!("No valid rows remain after removing invalid values; nothing written"),
    }
    Ok(())
}

fn money(value: Option<f64>) -> String {
    value.map(|v| format!("${:.2}", v)).unwrap_or_else(|| "Not available".to_string())
}

fn print_record(record: &ClientRecord, note_fields: &[String]) {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let yes_no = |column: &str| if record.flag(column) { "Yes" } else { "No" };

    println!("Details for {}", record.business_name);
    println!("  Contact Name: {}", text(&record.contact_name));
    println!("  Phone Number: {}", text(&record.phone_number));
    println!("  Email Address: {}", text(&record.email_address));
    println!("  Business Address: {}", text(&record.business_address));
    for (label, value) in [("City", &record.city), ("State", &record.state), ("Zip Code", &record.zip_code)] {
        if value.is_some() {
            println!("  {}: {}", label, text(value));
        }
    }
    println!("  Social Media Links: {}", text(&record.social_media_links));
    println!("  Invoiced: {}", money(record.invoiced));
    println!("  Quoted: {}", money(record.quoted));
    println!("  Status: {}", text(&record.status));
    println!("  Products: {}", text(&record.products));
    println!("  Product Line: {}", text(&record.product_line));
    for flag in ACTIVITY_FLAGS {
        if record.value(flag).map(|c| !c.is_null()).unwrap_or(false) {
            println!("  {}: {}", title_case(flag), yes_no(*flag));
        }
    }

    println!("\nNotes");
    for field in note_fields {
        let value = record.note(field).filter(|v| !v.is_empty()).unwrap_or("Not provided");
        println!("  {}: {}", title_case(field), value);
    }
}

fn title_case(field: &str) -> String {
    field
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn show(config: &RegistryConfig, csv: &Path, business_name: &str, json: bool) -> Result<()> {
    let (session, _) = open_session(config, csv)?;
    let registry = session.registry()?;
    let record = registry.find_by_name(business_name)?;
    if json {
        return print_json(record);
    }
    print_record(record, registry.note_fields());
    Ok(())
}

fn search(config: &RegistryConfig, csv: &Path, term: &str, json: bool) -> Result<()> {
    let (session, _) = open_session(config, csv)?;
    let registry = session.registry()?;
    let hits = registry.search_by_display_name(term);

    if json {
        let records: Vec<&ClientRecord> = hits.iter().map(|(_, r)| *r).collect();
        return print_json(&records);
    }

    if hits.is_empty() {
        println!("No clients match '{}'", term);
        let suggestions = session.queries()?.suggest_names(term, 5);
        if !suggestions.is_empty() {
            println!("Did you mean: {}", suggestions.join(", "));
        }
        return Ok(());
    }
    for (position, record) in hits {
        println!("{:>5}  {}", position, record.display_label());
    }
    Ok(())
}

fn notes(
    config: &RegistryConfig,
    csv: &Path,
    business_name: &str,
    set: &[(String, String)],
    json: bool,
) -> Result<()> {
    let (mut session, _) = open_session(config, csv)?;
    let position = session.registry()?.position_of(business_name)?;
    session.save_notes(position, set.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;

    let registry = session.registry()?;
    let record = registry.get(position)?;
    if json {
        return print_json(&record.notes);
    }
    for field in registry.note_fields() {
        println!("{}: {}", title_case(field), record.note(field).unwrap_or(""));
    }
    Ok(())
}

fn stats(config: &RegistryConfig, csv: &Path, json: bool) -> Result<()> {
    let (session, _) = open_session(config, csv)?;
    let queries = session.queries()?;

    let flags: Vec<&str> = ACTIVITY_FLAGS
        .iter()
        .copied()
        .filter(|f| session.schema().column(f).is_some())
        .collect();

    let summary = serde_json::json!({
        "status": queries.categorical_counts("status"),
        "product_line": queries.categorical_counts("product_line"),
        "activity": queries.boolean_flag_counts(flags.as_slice()),
        "invoiced": queries.numeric_summary("invoiced"),
        "quoted": queries.numeric_summary("quoted"),
        "duplicates": queries.duplicate_names(),
    });
    if json {
        return print_json(&summary);
    }

    println!("Status distribution:");
    for c in queries.categorical_counts("status") {
        println!("  {:<20} {}", c.category, c.count);
    }
    println!("Product line distribution:");
    for c in queries.categorical_counts("product_line") {
        println!("  {:<20} {}", c.category, c.count);
    }
    println!("Contact activity:");
    for (flag, count) in queries.boolean_flag_counts(flags.as_slice()) {
        println!("  {:<20} {}", title_case(&flag), count);
    }
    for column in ["invoiced", "quoted"] {
        match queries.numeric_summary(column) {
            Some(s) => println!(
                "{}: n={} min={:.2} max={:.2} mean={:.2}",
                title_case(column),
                s.count,
                s.min,
                s.max,
                s.mean
            ),
            None => println!("{}: no numeric values", title_case(column)),
        }
    }
    Ok(())
}
