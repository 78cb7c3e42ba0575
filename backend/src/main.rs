//! Exambundle CLI - build exam bundles from operator spreadsheets
//!
//! # Main Commands
//!
//! ```bash
//! exambundle serve                     # Start HTTP server (port 3000)
//! exambundle bundle exam.json          # Run the wizard from a manifest
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! exambundle inspect questions.xlsx    # Decode a table to JSON
//! exambundle preview questions.csv --topic Topic --questions Question \
//!     --answer-type Type --group Group --options Options --html review.html
//! exambundle fields drafts.json        # Collect user-input field definitions
//! ```

use clap::{Parser, Subcommand};
use exambundle::api::logs::log_error;
use exambundle::transform::pipeline::fields_from_drafts;
use exambundle::{
    normalize_table, parse_table_file, render_html, run_wizard, validate_role_map, ColumnRoleMap,
    FieldDraft, ValidationIssue, WizardManifest,
};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "exambundle")]
#[command(about = "Build exam bundles from question and login spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a CSV or spreadsheet file and output its rows as JSON
    Inspect {
        /// Input file (.csv, .tsv, .txt, .xlsx, .xls, .ods)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize a question sheet and report every issue
    Preview {
        /// Question sheet
        input: PathBuf,

        /// Column holding the topic/subject
        #[arg(long)]
        topic: String,

        /// Column holding the question text
        #[arg(long)]
        questions: String,

        /// Column holding the answer type
        #[arg(long)]
        answer_type: String,

        /// Column holding the group
        #[arg(long)]
        group: String,

        /// Column holding the newline-separated options
        #[arg(long)]
        options: String,

        /// Write the review table as HTML
        #[arg(long)]
        html: Option<PathBuf>,

        /// Output file for the display rows (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the wizard from a JSON manifest and write the bundle
    Bundle {
        /// Wizard manifest (paths relative to its directory)
        manifest: PathBuf,

        /// Output zip (default: <exam>_exam_details.zip in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Collect user-input field definitions from a JSON array of drafts
    Fields {
        /// Drafts file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect { input, output } => cmd_inspect(&input, output.as_deref()),

        Commands::Preview {
            input,
            topic,
            questions,
            answer_type,
            group,
            options,
            html,
            output,
        } => {
            let roles = ColumnRoleMap::new(topic, questions, answer_type, group, options);
            cmd_preview(&input, &roles, html.as_deref(), output.as_deref())
        }

        Commands::Bundle { manifest, output } => cmd_bundle(&manifest, output.as_deref()),

        Commands::Fields { input, output } => cmd_fields(&input, output.as_deref()),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn print_issues(issues: &[ValidationIssue]) {
    eprintln!("\n⚠️  {} issue(s):", issues.len());
    for issue in issues {
        eprintln!("   - {}", issue);
    }
}

fn cmd_inspect(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Reading: {}", input.display());

    let parsed = parse_table_file(input)?;
    if let Some(ref encoding) = parsed.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(delimiter) = parsed.delimiter {
        eprintln!("   Delimiter: '{}' (auto-detected)", format_delimiter(delimiter));
    }
    eprintln!("   Columns: {}", parsed.table.headers.join(", "));
    eprintln!("✅ Decoded {} rows", parsed.table.len());

    let rows: Vec<Value> = parsed
        .table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = parsed
                .table
                .headers
                .iter()
                .map(|h| {
                    let value = row.get(h).flatten().map(|v| Value::String(v.to_string()));
                    (h.clone(), value.unwrap_or(Value::Null))
                })
                .collect();
            Value::Object(object)
        })
        .collect();

    let json = serde_json::to_string_pretty(&rows)?;
    write_output(&json, output)?;
    Ok(())
}

fn cmd_preview(
    input: &Path,
    roles: &ColumnRoleMap,
    html: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📝 Previewing: {}", input.display());

    let parsed = parse_table_file(input)?;
    if let Err(issues) = validate_role_map(roles, &parsed.table.headers) {
        print_issues(&issues);
        std::process::exit(1);
    }

    let outcome = normalize_table(&parsed.table, roles)?;
    eprintln!("   Display rows: {}", outcome.display.len());
    eprintln!("   Images: {}", outcome.images.len());

    if let Some(html_path) = html {
        fs::write(html_path, render_html(&outcome.display))?;
        eprintln!("   💾 HTML written to: {}", html_path.display());
    }

    let json = serde_json::to_string_pretty(&outcome.display)?;
    write_output(&json, output)?;

    if !outcome.is_valid() {
        print_issues(&outcome.issues);
        std::process::exit(1);
    }

    eprintln!("✅ All questions valid!");
    Ok(())
}

fn cmd_bundle(manifest_path: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📦 Manifest: {}", manifest_path.display());

    let manifest = WizardManifest::from_path(manifest_path)?;
    let report = run_wizard(&manifest)?;

    let Some(bundle) = report.bundle else {
        print_issues(&report.issues);
        eprintln!("\n❌ Bundle not created");
        std::process::exit(1);
    };

    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&bundle.file_name));
    fs::write(&target, &bundle.bytes)?;

    eprintln!("\n📊 Entries:");
    for entry in &bundle.entries {
        eprintln!("   {}", entry);
    }
    eprintln!("💾 Bundle written to: {}", target.display());
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_fields(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🧩 Reading drafts: {}", input.display());

    let content = fs::read_to_string(input)?;
    let drafts: Vec<FieldDraft> = serde_json::from_str(&content)?;

    match fields_from_drafts(&drafts) {
        Ok(fields) => {
            eprintln!("✅ {} field(s)", fields.len());
            let json = serde_json::to_string_pretty(&fields)?;
            write_output(&json, output)?;
            Ok(())
        }
        Err(issues) => {
            print_issues(&issues);
            std::process::exit(1);
        }
    }
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    exambundle::server::start_server(port).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
