use clap::Parser;
use todo_file_service::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    todo_file_service::run(ServiceConfig::parse()).await
}
