use citrus_imageset::{cli, config, drive, error, pipeline, relevance, search, sheet};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_logging(&config, cli.verbose)?;

    match cli.command {
        Commands::Run {
            excel,
            sheet,
            mode,
            offset,
            limit,
            skip_pest_upload,
            output,
        } => {
            println!("🍊 citrus-imageset - dataset collection\n");

            let search_client = search::SearchClient::new(&config.proxy_url()?)?;
            let gemini = relevance::GeminiClient::new(config.gemini_api_key()?);
            let store = drive::DriveStore::new(config.drive_token()?);
            let publisher = drive::Publisher::new(store, config.drive_parent_folder_id()?);

            std::fs::create_dir_all(&config.image_dir)?;

            let pipeline = pipeline::Pipeline::new(
                &search_client,
                &gemini,
                &publisher,
                config.image_dir.clone(),
                config.snapshot_path.clone(),
                pipeline::PipelineOptions {
                    mode,
                    upload_pests: !skip_pest_upload,
                },
            );

            let mut reports = Vec::new();
            for sheet_name in sheet.sheet_names() {
                println!("[{sheet_name}] loading rows...");
                let Some(records) = sheet::load_records(&excel, sheet_name)? else {
                    continue;
                };
                let records: Vec<_> = records
                    .into_iter()
                    .skip(offset)
                    .take(limit.unwrap_or(usize::MAX))
                    .collect();
                println!("✔ {} rows to process\n", records.len());

                let bar = ProgressBar::new(records.len() as u64);
                bar.set_style(
                    ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                for record in &records {
                    bar.set_message(record.file_stem().to_string());
                    match pipeline.run_record(record).await {
                        Ok(report) => reports.push(report),
                        Err(e) => tracing::error!("row '{}' failed: {e}", record.file_stem()),
                    }
                    bar.inc(1);
                }
                bar.finish_with_message("done");
            }

            let json = serde_json::to_string_pretty(&reports)?;
            std::fs::write(&output, json)?;
            println!("\n✅ collection finished: {}", output.display());
        }

        Commands::Config { show } => {
            if show {
                print_config(&config);
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)?;
    let log_path = config
        .log_dir
        .join(format!("{}.log", chrono::Local::now().date_naive()));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(level)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .init();

    Ok(())
}

fn print_config(config: &Config) {
    let set_or_not = |value: &Option<String>| if value.is_some() { "set" } else { "not set" };
    println!("Configuration:");
    println!("  proxy host:             {}", set_or_not(&config.proxy_host));
    println!("  proxy port:             {}", set_or_not(&config.proxy_port));
    println!("  proxy username:         {}", set_or_not(&config.proxy_username));
    println!("  proxy password:         {}", set_or_not(&config.proxy_password));
    println!("  Gemini API key:         {}", set_or_not(&config.gemini_api_key));
    println!("  Drive token:            {}", set_or_not(&config.drive_token));
    println!("  Drive parent folder id: {}", set_or_not(&config.drive_parent_folder_id));
    println!("  image dir:              {}", config.image_dir.display());
    println!("  log dir:                {}", config.log_dir.display());
}
