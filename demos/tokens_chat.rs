//! Counts the tokens of a chat history before and after a message is exchanged.
use display_error_chain::DisplayErrorChain;
use gemini_tokens::{Gemini, Message};
use std::process::ExitCode;
use tracing::info;

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

    let mut chat = client
        .create_chat()
        .with_history(vec![
            Message::user("Hi my name is Bob").content,
            Message::model("Hi Bob!").content,
        ])
        .build()?;

    let first = client.count_tokens(chat.history(false)).await?;
    println!("{}", first.total_tokens);

    let response = chat
        .send_message("In one sentence, explain how a computer works to a young child.")
        .await?;
    info!(reply = %response.text(), "model replied");
    println!("{:#?}", response.usage_metadata);

    let mut history = chat.history(false);
    history.push(Message::user("Append an extra user message and recount.").content);
    let second = client.count_tokens(history).await?;
    println!("{}", second.total_tokens);

    Ok(())
}
