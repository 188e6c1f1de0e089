use dotenv::dotenv;
use roulette_ev::commands::start;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    start().await
}
