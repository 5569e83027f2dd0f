//! Send an SMS through whichever provider the configuration installs first.
use smsgate::{gateway, telemetry, AppConfig};

use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;
    telemetry::init(&config.logging)?;

    let country_code = arg_or_env("--country-code", "SMS_COUNTRY_CODE");
    let number = arg_or_env("--number", "SMS_NUMBER");
    let text = arg_or_env("--text", "SMS_TEXT");

    let dispatcher = gateway::dispatcher(&config).await;
    match dispatcher
        .send_message(true, &country_code, &number, &text)
        .await?
    {
        Some(res) => println!(
            "Sent via {} with id {}\nRaw: {}",
            res.provider,
            res.id,
            serde_json::to_string_pretty(&res.raw)?
        ),
        None => println!("Sending disabled"),
    }
    Ok(())
}

fn arg_or_env(flag: &str, env_key: &str) -> String {
    let args: Vec<String> = std::env::args().collect();
    if let Some(idx) = args.iter().position(|a| a == flag) {
        if idx + 1 < args.len() {
            return args[idx + 1].clone();
        }
    }
    env::var(env_key)
        .unwrap_or_else(|_| panic!("missing {} (arg {} or env {})", flag, flag, env_key))
}
