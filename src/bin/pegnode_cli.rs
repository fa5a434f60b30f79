// pegnode-cli — lightweight JSON-RPC client for the running daemon, speaking
// raw TCP HTTP/1.1 so it has no dependency beyond what the daemon itself uses.
//
// Usage: pegnode-cli <method> [params...]

use std::env;

use colored::*;

fn print_usage() {
    println!("{}", "pegnode-cli".bright_cyan().bold());
    println!("{}", "Usage: pegnode-cli <method> [params...]".bright_yellow());
    println!();
    println!("{}", "Methods:".bright_white().bold());
    for (name, desc) in [
        ("get_sync_head", "Last committed height"),
        ("get_sync_progress", "Sync head vs. chain tip"),
        ("get_winners_head", "Height of the most recent graded block"),
        ("get_winners <height>", "Winning entry hashes at a height"),
        ("get_rates <height>", "Graded conversion rates at a height"),
        ("get_balances <address>", "Per-asset balances for an address"),
        ("stop", "Stop the daemon"),
    ] {
        println!("  {} {:<28} {}", "-".bright_black(), name.bright_green(), desc.white());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }
    let method = &args[1];

    let params: Vec<serde_json::Value> = args[2..]
        .iter()
        .map(|arg| match arg.parse::<u64>() {
            Ok(n) => serde_json::json!(n),
            Err(_) => serde_json::json!(arg),
        })
        .collect();

    let rpc_port: u16 = std::env::var("PEGNODE_RPC_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(pegnode::config::RPC_PORT_MAINNET);
    let auth_token = std::env::var("PEGNODE_RPC_TOKEN").unwrap_or_default();

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let addr = format!("127.0.0.1:{rpc_port}");
    let mut stream = match TcpStream::connect(&addr).await {
        Ok(s) => s,
        Err(_) => {
            eprintln!("{} cannot connect to pegnoded at {}", "error:".bright_red().bold(), addr);
            eprintln!("Is the daemon running? Start it with: {}", "pegnoded".bright_yellow().bold());
            std::process::exit(2);
        }
    };

    let request_body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });

    let body = serde_json::to_string(&request_body)?;
    let http_request = format!(
        "POST / HTTP/1.1\r\nHost: 127.0.0.1\r\nAuthorization: Bearer {auth_token}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body,
    );

    stream.write_all(http_request.as_bytes()).await?;

    let mut response = String::new();
    stream.read_to_string(&mut response).await?;

    let split = response.splitn(2, "\r\n\r\n").collect::<Vec<_>>();
    let json_body = split.get(1).copied().unwrap_or("");

    match serde_json::from_str::<serde_json::Value>(json_body) {
        Ok(v) => {
            if let Some(err) = v.get("error") {
                eprintln!("{} {}", "error:".bright_red().bold(), err);
                let code = err.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
                std::process::exit(if code == -32000 { 2 } else { 1 });
            }
            println!("{}", serde_json::to_string_pretty(&v["result"])?);
        }
        Err(_) => {
            eprintln!("{} malformed response from daemon", "error:".bright_red().bold());
            std::process::exit(1);
        }
    }

    Ok(())
}
