//! Device-authorization login client.
//!
//! Drives the caller-owned polling loop against a running gatehouse server:
//! request a device/user code pair, print the verification instructions, then
//! poll until approval, denial, or expiry. The wait honors the provider's
//! `interval` and steps it up by five seconds on `slow_down`.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;

use gatehouse::oauth::types::{DeviceAuthorization, Identity};

#[derive(Parser)]
#[command(
    name = "gatehouse-login",
    about = "Sign in to a gatehouse server using the device-authorization flow"
)]
struct Args {
    /// Base URL of the gatehouse server
    #[arg(long, default_value = "http://localhost:8000")]
    server: String,

    /// Identity provider to authenticate with (github or google)
    #[arg(long, default_value = "github")]
    provider: String,
}

/// Poll relay response: either the token payload or a protocol error code
#[derive(Deserialize)]
struct PollResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let client = reqwest::Client::builder()
        .user_agent(format!("gatehouse-login/{}", env!("CARGO_PKG_VERSION")))
        .build()?;

    println!(
        "Initiating device authorization flow with {}...",
        args.provider
    );

    let response = client
        .post(format!("{}/auth/device/initiate", args.server))
        .json(&json!({ "provider": args.provider }))
        .send()
        .await
        .context("device initiation request failed")?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("device initiation returned {status}: {body}");
    }
    let grant: DeviceAuthorization = response
        .json()
        .await
        .context("device initiation response unreadable")?;

    println!("1. Open this URL in your browser:");
    println!("   {}", grant.verification_uri);
    println!("2. Enter the code: {}", grant.user_code);
    println!("3. Authorize the application");
    println!("Waiting for authorization...");

    let deadline = Instant::now() + Duration::from_secs(grant.expires_in);
    let mut interval = grant.interval.max(1);

    let access_token = loop {
        tokio::time::sleep(Duration::from_secs(interval)).await;
        if Instant::now() >= deadline {
            bail!("device authorization expired before approval");
        }

        let response = client
            .post(format!("{}/auth/device/poll", args.server))
            .json(&json!({
                "provider": args.provider,
                "device_code": grant.device_code,
            }))
            .send()
            .await
            .context("device poll request failed")?;
        let payload: PollResponse = response
            .json()
            .await
            .context("device poll response unreadable")?;

        if let Some(token) = payload.access_token {
            break token;
        }

        match payload.error.as_deref() {
            Some("authorization_pending") => continue,
            Some("slow_down") => interval += 5,
            Some(description) => bail!("authorization failed: {description}"),
            None => bail!("device poll response missing both token and error"),
        }
    };

    // Use the token the way any API caller would, proving the bearer path
    let response = client
        .get(format!("{}/api/v1/me", args.server))
        .bearer_auth(&access_token)
        .send()
        .await
        .context("identity request failed")?;
    if !response.status().is_success() {
        bail!("identity request returned {}", response.status());
    }
    let me: Identity = response.json().await.context("identity unreadable")?;

    println!("Signed in as {} ({})", me.display_name, me.id);
    println!("Access token: {access_token}");

    Ok(())
}
