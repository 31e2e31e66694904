#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shelfmark_lib::run().await
}
