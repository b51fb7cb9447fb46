use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use eyre::{Result, WrapErr, bail};
use log::{info, warn};

mod cli;

use cli::{Cli, Command, OutputFormat};
use ytscribe::config::Config;
use ytscribe::youtube::YouTubeClient;

fn setup_logging(to_file: bool) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if to_file {
        let log_dir = log_dir();
        std::fs::create_dir_all(&log_dir)?;
        let log_file = log_dir.join("ytscribe.log");
        let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);
        builder.target(env_logger::Target::Pipe(target));
        builder.init();
        info!("Logging initialized: {}", log_file.display());
    } else {
        builder.init();
    }
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytscribe")
        .join("logs")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(matches!(cli.command, Command::Fetch { .. }))?;

    // Config problems are non-fatal: fall back to defaults
    let mut config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Ignoring unreadable config: {e}");
        Config::default()
    });

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            let addr: SocketAddr = format!("{}:{}", config.host, config.port)
                .parse()
                .wrap_err_with(|| format!("invalid listen address {}:{}", config.host, config.port))?;
            let youtube = YouTubeClient::new(&config)?;
            ytscribe::server::serve(youtube, addr).await
        }
        Command::Fetch {
            url,
            format,
            lang,
            output,
        } => {
            if let Some(lang) = lang {
                config.lang = lang;
            }
            fetch(&config, url, format, output, cli.verbose).await
        }
    }
}

async fn fetch(
    config: &Config,
    url: Option<String>,
    format: OutputFormat,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let youtube = YouTubeClient::new(config)?;

    // Collect URLs: from arg or stdin
    let urls = match url {
        Some(url) if url != "-" => vec![url],
        _ => io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?,
    };

    if urls.iter().all(|u| u.trim().is_empty()) {
        bail!("no URL or video ID provided\n\nUsage: ytscribe fetch <URL>\n       echo <URL> | ytscribe fetch");
    }

    let mut rendered = Vec::new();
    for url_input in urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
        let transcript = youtube
            .transcript_for_url(url_input)
            .await
            .wrap_err_with(|| format!("fetching transcript for {url_input}"))?;

        if verbose {
            eprintln!(
                "Video: {} ({})\nChannel: {}\nLanguage: {}\nSegments: {} ({} skipped)",
                transcript.metadata.title.as_deref().unwrap_or("?"),
                transcript.video_id,
                transcript.metadata.channel_name.as_deref().unwrap_or("?"),
                transcript.language,
                transcript.segments.len(),
                transcript.skipped_segments,
            );
        }

        rendered.push(match format {
            OutputFormat::Text => ytscribe::output::render_text(&transcript),
            OutputFormat::Json => ytscribe::output::render_json(&transcript),
            OutputFormat::Srt => ytscribe::output::render_srt(&transcript),
        });
    }

    let rendered = rendered.join("\n\n");
    if let Some(ref path) = output {
        std::fs::write(path, &rendered)?;
        if verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{rendered}");
    }

    Ok(())
}
