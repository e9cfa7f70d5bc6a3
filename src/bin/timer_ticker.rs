//! Print `tick` until a one-shot timer fires, then `timeout`.
//!
//! Run with: cargo run --bin timer_ticker

use chanselect::demo::{ticker, DemoError, Transcript};
use chanselect::{init_tracing, DemoConfig};

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    init_tracing();
    let config = DemoConfig::from_env()?;
    ticker::run(&config.timer, config.stall(), &Transcript::stdout()).await?;
    Ok(())
}
