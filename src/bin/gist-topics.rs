use gist_topics::cli;

#[tokio::main]
async fn main() -> gist_topics::Result<()> {
    cli::main().await
}
