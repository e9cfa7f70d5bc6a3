//! Fibonacci over a closed channel, consumed until drained.
//!
//! Run with: cargo run --bin fibonacci_range

use chanselect::demo::{fibonacci, DemoError, Transcript};
use chanselect::{init_tracing, DemoConfig};

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    init_tracing();
    let config = DemoConfig::from_env()?;
    fibonacci::with_range(config.fibonacci.count, config.stall(), &Transcript::stdout()).await?;
    Ok(())
}
