//! Uploads test.pdf, then counts the tokens of a prompt that references it.
use display_error_chain::DisplayErrorChain;
use gemini_tokens::{Content, Gemini, Role};
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
        .upload_file_from_path(media_dir().join("test.pdf"))
        .with_mime_type("application/pdf".parse()?)
        .upload()
        .await?;
    info!(file.name = file.name(), file.state = ?file.state(), "file uploaded");

    let contents = vec![
        Content::text_with_file("Give me a summary of this document.", &file)?.with_role(Role::User),
    ];

    let count = client.count_tokens(contents.clone()).await?;
    println!("Multimodal PDF token count: {}", count.total_tokens);

    let response = client
        .generate_content()
        .with_contents(contents)
        .execute()
        .await?;
    println!("{}", serde_json::to_string_pretty(&response.usage_metadata)?);

    if let Err((_, e)) = file.delete().await {
        error!(error = %e, "failed to delete file");
    }

    Ok(())
}
