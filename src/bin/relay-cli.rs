use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use reqwest::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, ACCEPT, CONTENT_TYPE,
};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Client for exercising a running SSE relay", long_about = None)]
struct Cli {
    #[arg(short, long, global = true, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// POST a JSON payload and print frames as they arrive
    Send(SendArgs),
    /// Send a CORS preflight and print the answer
    Preflight,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SendArgs {
    /// Inline JSON payload
    #[arg(short, long)]
    data: Option<String>,

    /// Read the JSON payload from a file
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let ok = match cli.command {
        Commands::Send(args) => {
            let body = match args.file {
                Some(path) => std::fs::read_to_string(path)?,
                None => args.data.unwrap_or_default(),
            };
            let res = client
                .post(&cli.url)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "text/event-stream")
                .body(body)
                .send()
                .await?;
            print_stream(res).await?
        }
        Commands::Preflight => {
            let res = client
                .request(reqwest::Method::OPTIONS, &cli.url)
                .send()
                .await?;
            print_preflight(&res);
            res.status().is_success()
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_stream(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
    }

    let mut stdout = std::io::stdout().lock();
    let mut scanner = ErrorEventScanner::default();
    let mut chunks = res.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        scanner.feed(&chunk);
        stdout.write_all(&chunk)?;
        stdout.flush()?;
    }

    if scanner.seen() && status.is_success() {
        eprintln!("Error: stream ended with an error event");
    }
    Ok(status.is_success() && !scanner.seen())
}

/// Watches streamed bytes for an `event: error` line, across chunk borders.
#[derive(Default)]
struct ErrorEventScanner {
    partial: Vec<u8>,
    seen: bool,
}

impl ErrorEventScanner {
    fn feed(&mut self, chunk: &[u8]) {
        self.partial.extend_from_slice(chunk);
        while let Some(end) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=end).collect();
            if line.trim_ascii_end() == b"event: error" {
                self.seen = true;
            }
        }
    }

    fn seen(&self) -> bool {
        self.seen
    }
}

fn print_preflight(res: &reqwest::Response) {
    println!("Status: {}", res.status());
    for name in [
        ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_MAX_AGE,
    ] {
        let value = res
            .headers()
            .get(&name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<missing>");
        println!("{}: {}", name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_error_event_split_across_chunks() {
        let mut scanner = ErrorEventScanner::default();
        scanner.feed(b"data: 1\nevent: er");
        assert!(!scanner.seen());
        scanner.feed(b"ror\ndata: Server error - reset\n\n");
        assert!(scanner.seen());
    }

    #[test]
    fn data_mentioning_error_is_not_an_error_event() {
        let mut scanner = ErrorEventScanner::default();
        scanner.feed(b"data: event: error\nevent: delta\n");
        assert!(!scanner.seen());
    }
}
