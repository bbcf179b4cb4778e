use clap::Parser;
use team_stats_app::{AppError, Args};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    team_stats_app::serve(args).await
}
