#[tokio::main]
async fn main() -> anyhow::Result<()> {
    medcards_backend::run().await
}
