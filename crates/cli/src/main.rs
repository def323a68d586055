use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;
use whip::IceCandidate;
use whip::client::Endpoint;
use whip::protocol::fragment;

#[derive(Parser)]
#[command(name = "whip-client", about = "Diagnostics for WHIP/WHEP endpoints")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query the ICE servers an endpoint advertises
    IceServers {
        /// WHIP or WHEP endpoint URL
        url: Url,
    },
    /// Print the trickle ICE fragment that would be sent for a candidate
    Fragment {
        /// File holding the local SDP offer
        #[arg(long)]
        offer: PathBuf,
        /// Candidate attribute, e.g. "candidate:1 1 UDP 2130706431 10.0.0.1 5000 typ host"
        #[arg(long)]
        candidate: String,
        /// Index of the m-line the candidate belongs to
        #[arg(long, default_value_t = 0)]
        mline_index: u16,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::IceServers { url } => ice_servers(url).await,
        Command::Fragment {
            offer,
            candidate,
            mline_index,
        } => print_fragment(&offer, candidate, mline_index),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn ice_servers(url: Url) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let endpoint = Endpoint::new(reqwest::Client::new(), url);
    let servers = endpoint.ice_servers(&cancel).await?;

    if servers.is_empty() {
        println!("no ICE servers advertised by {}", endpoint.url());
    }
    for server in servers {
        match (&server.username, &server.credential) {
            (Some(username), Some(_)) => {
                println!("{} (username {})", server.urls.join(", "), username)
            }
            _ => println!("{}", server.urls.join(", ")),
        }
    }
    Ok(())
}

fn print_fragment(
    offer: &PathBuf,
    candidate: String,
    mline_index: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let offer = std::fs::read_to_string(offer)?;
    let candidate = IceCandidate {
        candidate: candidate
            .strip_prefix("a=")
            .map(str::to_string)
            .unwrap_or(candidate),
        sdp_mid: None,
        sdp_mline_index: Some(mline_index),
        username_fragment: None,
    };

    print!("{}", fragment::marshal(&offer, &[candidate])?);
    Ok(())
}
