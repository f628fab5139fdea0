#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chatsql_server::start().await
}
