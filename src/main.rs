use anyhow::Result;
use dotenv::dotenv;
use env_logger::Env;
use sqli_guard_clients::config::SupabaseConfig;
use sqli_guard_clients::setup::{self, Report, INSTRUCTIONS, PROBE_TABLE};
use sqli_guard_clients::supabase::{Clients, PostgrestFactory};
use std::env;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let dotenv_found = dotenv().is_ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let json = env::args().skip(1).any(|arg| arg == "--json");

    let config = SupabaseConfig::from_env();
    let report = Report::new(&config, dotenv_found);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Err(e) = setup::check_config(&config) {
        log::error!("{e}");
        if !json {
            println!("\nPlease update your .env file with actual Supabase credentials");
        }
        return Ok(ExitCode::FAILURE);
    }

    let clients = Clients::init(&config, &PostgrestFactory);
    match setup::probe(&clients.public, PROBE_TABLE).await {
        Ok(rows) => {
            if !json {
                println!("\nSuccessfully connected to Supabase, {rows} rows in {PROBE_TABLE}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log::error!("failed to connect to Supabase: {e}");
            if !json {
                println!("\nSetup instructions:\n{INSTRUCTIONS}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_report(report: &Report) {
    if !report.dotenv_found {
        println!(".env file not found, using process environment only (cp .env.example .env)");
    }
    for var in &report.vars {
        let mark = if var.ready { "ok" } else { "MISSING" };
        println!("{:<28} {:<8} {}", var.var, mark, var.value);
    }
}
