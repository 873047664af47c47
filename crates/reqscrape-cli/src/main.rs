mod commands;
mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "reqscrape",
    version,
    about = "Extract requirement clauses from PDF specifications into a spreadsheet"
)]
struct Cli {
    /// Log per-page and per-table detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Preset selection shared by the extracting commands.
#[derive(Args)]
struct PresetArgs {
    /// Page margin preset
    #[arg(long, value_name = "NAME", default_value = "TfNSW")]
    margins: String,

    /// Table geometry preset
    #[arg(long, value_name = "NAME", default_value = "TfNSW")]
    tables: String,

    /// JSON preset file merged over the built-in presets
    #[arg(long = "presets", value_name = "FILE")]
    presets_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a PDF or a directory of PDFs into an xlsx workbook
    Scrape {
        /// PDF file or directory containing PDF files
        input: PathBuf,

        /// Output workbook (overwritten if it exists)
        #[arg(short, long, value_name = "XLSX")]
        output: PathBuf,

        #[command(flatten)]
        presets: PresetArgs,

        /// Heading pattern preset
        #[arg(long, value_name = "NAME", default_value = "TfNSW")]
        headings: String,

        /// Requirement pattern preset
        #[arg(long, value_name = "NAME", default_value = "TfNSW")]
        requirements: String,

        /// Directory for table snapshots (TABLE n.png)
        #[arg(long = "images-dir", value_name = "DIR")]
        images_dir: Option<PathBuf>,

        /// Embed table snapshots in the workbook instead of [Table n] labels
        #[arg(long)]
        embed_images: bool,

        /// Table snapshot resolution in dpi
        #[arg(long, default_value_t = 100)]
        resolution: u32,

        /// Keep requirements found before the first heading, under this label
        #[arg(long, value_name = "LABEL")]
        preamble: Option<String>,

        /// Also write the extracted rows as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
    },
    /// Print the cleaned body text of a PDF, with table placeholders
    Dump {
        /// Path to PDF file
        pdf: PathBuf,

        #[command(flatten)]
        presets: PresetArgs,

        /// Write the text to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Inspect extraction presets
    Presets {
        /// JSON preset file merged over the built-in presets
        #[arg(long = "presets", value_name = "FILE", global = true)]
        presets_file: Option<PathBuf>,

        #[command(subcommand)]
        action: PresetsAction,
    },
    /// Add a text layer to scanned PDFs with ocrmypdf
    Ocr {
        /// PDF file or directory containing PDF files
        input: PathBuf,

        /// Output directory; copies are written to its OCR_ subdirectory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum PresetsAction {
    /// List preset names of every kind
    List,
    /// Print one preset as JSON
    Show {
        /// margins, tables, headings or requirements
        kind: String,
        /// Preset name (e.g., "TfNSW")
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Scrape {
            input,
            output,
            presets,
            headings,
            requirements,
            images_dir,
            embed_images,
            resolution,
            preamble,
            json,
        } => commands::scrape::run(commands::scrape::ScrapeArgs {
            input,
            output,
            margins: presets.margins,
            tables: presets.tables,
            presets_file: presets.presets_file,
            headings,
            requirements,
            images_dir,
            embed_images,
            resolution,
            preamble,
            json,
        }),
        Commands::Dump {
            pdf,
            presets,
            output,
        } => commands::dump::run(
            &pdf,
            &presets.margins,
            &presets.tables,
            presets.presets_file.as_deref(),
            output,
        ),
        Commands::Presets {
            presets_file,
            action,
        } => match action {
            PresetsAction::List => commands::presets::list(presets_file.as_deref()),
            PresetsAction::Show { kind, name } => {
                commands::presets::show(presets_file.as_deref(), &kind, &name)
            }
        },
        Commands::Ocr { input, output } => commands::ocr::run(&input, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
