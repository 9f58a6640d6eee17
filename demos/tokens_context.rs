//! Prints the context window of a model.
use display_error_chain::DisplayErrorChain;
use gemini_tokens::Gemini;
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

    let model_info = client.get_model("gemini-2.0-flash").await?;
    println!("input_token_limit={}", model_info.input_token_limit);
    println!("output_token_limit={}", model_info.output_token_limit);

    Ok(())
}
