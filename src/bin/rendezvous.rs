//! Blocking rendezvous: send 0..4 over an unbuffered channel.
//!
//! Run with: cargo run --bin rendezvous

use chanselect::demo::{rendezvous, DemoError, Transcript};
use chanselect::{init_tracing, DemoConfig};

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    init_tracing();
    let config = DemoConfig::from_env()?;
    rendezvous::run(config.rendezvous.count, config.stall(), &Transcript::stdout()).await?;
    Ok(())
}
