use chrono::Local;

use market_scan::config::PortfolioConfig;
use market_scan::portfolio::{self, telegram, BitvavoClient, TelegramBot};
use market_scan::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PortfolioConfig::from_env()?;
    let client = BitvavoClient::new(&config.bitvavo_api_key, &config.bitvavo_api_secret);
    log::info!("Bitvavo client initialized successfully.");

    match portfolio::snapshot(&client).await {
        Ok(snapshot) => {
            let bot = TelegramBot::new(&config.telegram_bot_token, &config.telegram_chat_id);
            let message = telegram::format_portfolio_message(&snapshot, Local::now());
            match bot.send_message(&message).await {
                Ok(()) => log::info!("Portfolio data sent to Telegram."),
                Err(err) => log::error!("Error sending to Telegram: {}", err),
            }
        }
        Err(err) => log::error!("Failed to retrieve portfolio: {}", err),
    }

    Ok(())
}
