//! Example: Synthesizing speech to a file
//!
//! Reads credentials from the environment (or a `.env` file), synthesizes a
//! phrase and writes the audio stream to disk chunk by chunk.
//!
//! # Setup
//!
//! 1. Set credentials: ```bash export SALUTESPEECH_CLIENT_ID=...
//!    export SALUTESPEECH_CLIENT_SECRET=... ```
//!
//! 2. Run this example: ```bash cargo run -p salutespeech-infra --example
//!    synthesize -- "Привет, мир!" output.wav ```

use anyhow::Context;
use futures::StreamExt;
use salutespeech_domain::{AudioFormat, SynthesizeRequest, Voice};
use salutespeech_infra::SaluteSpeechClient;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let text = args.next().unwrap_or_else(|| "Привет! Это проверка синтеза речи.".to_string());
    let output = args.next().unwrap_or_else(|| "output.wav".to_string());

    let client = SaluteSpeechClient::from_env().context("failed to create client")?;

    let request =
        SynthesizeRequest::new(text).format(AudioFormat::Wav16).voice(Voice::MAY_24000);
    let mut audio = client.text_to_speech().synthesize(&request).await?;

    let mut file = tokio::fs::File::create(&output)
        .await
        .with_context(|| format!("failed to create {output}"))?;
    let mut written = 0usize;
    while let Some(chunk) = audio.next().await {
        let chunk = chunk?;
        written += chunk.len();
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::info!(bytes = written, path = %output, "audio saved");
    Ok(())
}
