//! Caches a transcript, then reads token usage of a generation that uses the cache.
use display_error_chain::DisplayErrorChain;
use gemini_tokens::{Content, Gemini, Message, Model, Role};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};

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

fn media_dir() -> PathBuf {
    std::env::var_os("GEMINI_MEDIA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("media"))
}

async fn do_main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Gemini::from_env()?;

    let file = client
        .upload_file_from_path(media_dir().join("a11.txt"))
        .with_mime_type(mime::TEXT_PLAIN)
        .upload()
        .await?;
    info!(file.name = file.name(), "transcript uploaded");

    let cache = client
        .create_cache()
        .with_model(Model::Gemini15Flash001)
        .with_content(
            Content::text_with_file("Here the Apollo 11 transcript:", &file)?.with_role(Role::User),
        )
        .execute()
        .await?;
    info!(cache.name = cache.name(), "cached content created");

    let prompt = "Please give a short summary of this file.";
    let count = client
        .count_tokens(vec![Message::user(prompt).content])
        .await?;
    println!("{}", count.total_tokens);

    let response = client
        .generate_content()
        .with_model(Model::Gemini15Flash001)
        .with_user_message(prompt)
        .with_cached_content(&cache)
        .execute()
        .await?;
    // The service may leave usage metadata out, in which case this prints `null`.
    println!("{}", serde_json::to_string_pretty(&response.usage_metadata)?);

    match cache.delete().await {
        Ok(_) => info!("cached content deleted"),
        Err((_, e)) => error!(error = %e, "failed to delete cached content"),
    }
    if let Err((_, e)) = file.delete().await {
        error!(error = %e, "failed to delete file");
    }

    Ok(())
}
