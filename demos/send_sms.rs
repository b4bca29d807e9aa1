//! Send an SMS through VoIP.ms.
use sms_core::{SendRequest, SmsClient};
use sms_voipms::VoipMsClient;

use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_username = arg_or_env("--api-username", "VOIPMS_API_USERNAME")?;
    let api_password = arg_or_env("--api-password", "VOIPMS_API_PASSWORD")?;
    let from = arg_or_env("--did", "SMS_FROM")?;
    let to = arg_or_env("--to", "SMS_TO")?;
    let text = arg_or_env("--text", "SMS_TEXT")?;

    let client = VoipMsClient::new(api_username, api_password);
    let res = client
        .send(SendRequest {
            to: &to,
            from: &from,
            text: &text,
        })
        .await?;
    println!(
        "Sent via {} with id {}\nRaw: {}",
        res.provider,
        res.id,
        serde_json::to_string_pretty(&res.raw)?
    );
    Ok(())
}

fn arg_or_env(flag: &str, env_key: &str) -> Result<String, String> {
    let args: Vec<String> = env::args().collect();
    if let Some(idx) = args.iter().position(|a| a == flag) {
        if let Some(value) = args.get(idx + 1) {
            return Ok(value.clone());
        }
    }
    env::var(env_key).map_err(|_| format!("missing {} (arg {} or env {})", flag, flag, env_key))
}
