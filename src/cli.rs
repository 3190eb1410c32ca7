use std::path::Path;

use bytes::Bytes;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::service::{FileHost, UploadFile};

#[derive(Parser)]
#[command(
    name = "filedrop",
    about = "FileDrop — small file hosting with a sandboxed HTML page viewer",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory for stored files and records
    #[arg(long, global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List hosted files, newest first
    #[command(visible_alias = "ls")]
    List {
        /// Only show HTML pages
        #[arg(long)]
        pages: bool,
    },

    /// Upload a local file
    #[command(visible_alias = "cp")]
    Put {
        /// Local file path to upload
        source: String,
        /// MIME type to record (guessed from the file name when omitted)
        #[arg(short = 't', long = "type")]
        mime_type: Option<String>,
    },

    /// Show one file record and its links
    Info {
        /// File id
        id: String,
    },

    /// Show hosting statistics
    Stats,
}

/// Config from the environment with the global `--data-dir` applied.
pub fn load_config(cli: &Cli) -> Config {
    let mut config = Config::default();
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    config
}

pub fn run_cli(cli: Cli) {
    let config = load_config(&cli);
    let host = match FileHost::new(&config) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error: Failed to open data dir '{}': {}", config.data_dir, e);
            std::process::exit(1);
        }
    };

    let Some(command) = cli.command else {
        unreachable!("Serve is handled in main")
    };

    match command {
        Commands::Serve { .. } => unreachable!("Serve is handled in main"),

        Commands::List { pages } => {
            let files = if pages { host.list_html() } else { host.list() };
            if files.is_empty() {
                println!("No files found. Upload one with: filedrop put <path>");
                return;
            }
            println!("{:<36}  {:<34} {:>10} {:>6}  {}", "ID", "NAME", "SIZE", "DL", "UPLOADED");
            println!("{}", "─".repeat(110));
            for f in &files {
                let name = &f.record.original_name;
                println!(
                    "{:<36}  {:<34} {:>10} {:>6}  {}",
                    f.record.id,
                    if name.chars().count() > 33 {
                        format!("{}…", name.chars().take(32).collect::<String>())
                    } else {
                        name.clone()
                    },
                    f.size_human,
                    f.record.download_count,
                    f.record.upload_date.format("%Y-%m-%d %H:%M")
                );
            }
            println!("{}", "─".repeat(110));
            println!("{} file(s)", files.len());
        }

        Commands::Put { source, mime_type } => {
            let data = match std::fs::read(&source) {
                Ok(d) => d,
                Err(e) => {
                    eprintln!("✗ Cannot read file '{}': {}", source, e);
                    std::process::exit(1);
                }
            };
            let name = Path::new(&source)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload".to_string());
            let mime_type = mime_type.unwrap_or_else(|| {
                mime_guess::from_path(&name)
                    .first()
                    .map(|m| m.to_string())
                    .unwrap_or_default()
            });

            let file = UploadFile {
                name,
                mime_type,
                data: Bytes::from(data),
            };
            match host.upload(file) {
                Ok(record) => {
                    println!("✓ Uploaded '{}' → {}", source, record.storage_path);
                    println!("  Id:   {}", record.id);
                    println!("  Size: {}", crate::classify::format_file_size(record.file_size));
                    if let Ok(url) = host.share_link(&record.id) {
                        println!("  Link: {}", url);
                    }
                    if let Ok(url) = host.viewer_url(&record.id) {
                        println!("  View: {}", url);
                    }
                }
                Err(e) => {
                    eprintln!("✗ {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Info { id } => match host.get(&id) {
            Ok(r) => {
                println!("File: {}", r.original_name);
                println!("{}", "─".repeat(35));
                println!("  Id:        {}", r.id);
                println!("  Type:      {}", if r.file_type.is_empty() { "-" } else { r.file_type.as_str() });
                println!("  Size:      {}", crate::classify::format_file_size(r.file_size));
                println!("  Key:       {}", r.storage_path);
                println!("  Uploaded:  {}", r.upload_date.format("%Y-%m-%d %H:%M:%S"));
                println!("  Downloads: {}", r.download_count);
                if let Ok(url) = host.share_link(&r.id) {
                    println!("  Link:      {}", url);
                }
                if let Ok(url) = host.viewer_url(&r.id) {
                    println!("  View:      {}", url);
                }
            }
            Err(e) => {
                eprintln!("✗ {}", e);
                std::process::exit(1);
            }
        },

        Commands::Stats => {
            let stats = host.get_stats();
            println!("FileDrop Statistics");
            println!("{}", "─".repeat(35));
            println!("  Files:     {}", stats.total_files);
            println!("  Pages:     {}", stats.html_pages);
            println!("  Size:      {}", stats.total_size_human);
            println!("  Downloads: {}", stats.total_downloads);
            println!("  Data dir:  {}", config.data_dir);
        }
    }
}
