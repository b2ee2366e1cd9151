use anyhow::Context;
use clap::Parser;
use funding_treemap::core::prepare::{
    aggregate_by_department, write_grants_csv, write_totals_csv, FundingListingParser,
};
use funding_treemap::core::Storage;
use funding_treemap::utils::logger::{self, LogFormat};
use funding_treemap::LocalStorage;

#[derive(Parser)]
#[command(name = "prepare-funding")]
#[command(about = "Convert a copied funding listing into the per-department funding table")]
struct Args {
    /// Listing text, one grant per line under "Department of ..." headings
    #[arg(short, long, default_value = "funding data.txt")]
    input: String,

    /// Per-department totals (department,funding)
    #[arg(short, long, default_value = "departments_funding.csv")]
    output: String,

    /// Also write every grant line (Name,Funding,Department)
    #[arg(long)]
    grants: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_logger(args.verbose, LogFormat::Compact);

    tracing::info!("📁 Reading listing from: {}", args.input);
    let storage = LocalStorage::new(".");
    let raw = storage
        .read_file(&args.input)
        .await
        .with_context(|| format!("could not read '{}'", args.input))?;
    // 非 UTF-8 位元組直接替換
    let text = String::from_utf8_lossy(&raw);

    let parser = FundingListingParser::new()?;
    let entries = parser.parse_listing(&text);
    let totals = aggregate_by_department(&entries);
    tracing::info!(
        "🔄 Parsed {} grants across {} departments",
        entries.len(),
        totals.len()
    );

    if let Some(grants_path) = &args.grants {
        storage.write_file(grants_path, &write_grants_csv(&entries)?).await?;
        println!("📁 Grants saved to {}", storage.resolve(grants_path));
    }

    storage.write_file(&args.output, &write_totals_csv(&totals)?).await?;
    println!("✅ Processed data saved to {}", storage.resolve(&args.output));
    Ok(())
}
