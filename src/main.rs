use lambda_http::Error;

use inventory_api::{config::Config, logging, run_app};

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init_logger();
    let config = Config::from_env()?;
    run_app(config).await?;
    Ok(())
}
