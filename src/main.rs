#[tokio::main]
async fn main() -> anyhow::Result<()> {
    media_pipeline_lib::run().await
}
