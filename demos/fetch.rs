//! Fetches a URL and prints status, headers and body.
//!
//! ```text
//! RUST_LOG=debug cargo run --example fetch -- https://example.com [curl|reqwest] [key=value ...]
//! ```
//! Any `key=value` argument after the driver is sent as a query parameter.
use anyhow::Result;
use gosub_net::{Client, Params, Settings};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "https://example.com".to_string());
    let driver = args.next().unwrap_or_else(|| "curl".to_string());
    let params: Params = args
        .filter_map(|arg| arg.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
        .collect();

    let settings = Settings::builder().driver(driver).build();
    let mut client = Client::new(&url, settings)?;
    log::info!("settings: {}", client.settings());

    let resp = client.get(None, &params)?;

    println!("{} {} ({:.3}s)", resp.code(), resp.url(), resp.query_time().as_secs_f64());
    for (name, value) in resp.headers() {
        println!("{name}: {value}");
    }
    println!();
    println!("{}", resp.body_or("<no body>"));

    Ok(())
}
