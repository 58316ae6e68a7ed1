#[tokio::main]
async fn main() -> anyhow::Result<()> {
    unievent_lib::run().await
}
