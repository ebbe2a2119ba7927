#[tokio::main]
async fn main() -> anyhow::Result<()> {
    humanize_ai_lib::run().await
}
