//! Counts the tokens of a prompt, then compares with the usage reported by a generation.
use display_error_chain::DisplayErrorChain;
use gemini_tokens::{Gemini, Message};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    match do_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error_chain = DisplayErrorChain::new(e.as_ref());
            tracing::error!(error.debug = ?e, error.chained = %error_chain, "execution failed");
            ExitCode::FAILURE
        }
    }
}

async fn do_main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Gemini::from_env()?;
    let prompt = "The quick brown fox jumps over the lazy dog.";
    let contents = vec![Message::user(prompt).content];

    let count = client.count_tokens(contents.clone()).await?;
    println!("total_tokens: {}", count.total_tokens);

    let response = client
        .generate_content()
        .with_contents(contents)
        .execute()
        .await?;
    println!("{}", serde_json::to_string_pretty(&response.usage_metadata)?);

    Ok(())
}
