//! Selector loop: race a send on an unbuffered channel against reads from a
//! channel preloaded with 1, 2, 3.
//!
//! Run with: cargo run --bin select_loop

use chanselect::demo::{selector, DemoError, Transcript};
use chanselect::{init_tracing, DemoConfig};

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    init_tracing();
    let config = DemoConfig::from_env()?;
    selector::run(&config.selector, config.stall(), &Transcript::stdout()).await?;
    Ok(())
}
