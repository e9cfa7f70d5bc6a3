//! Fibonacci generator that stops when the consumer sends on `quit`.
//!
//! Run with: cargo run --bin fibonacci_quit

use chanselect::demo::{fibonacci, DemoError, Transcript};
use chanselect::{init_tracing, DemoConfig};

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    init_tracing();
    let config = DemoConfig::from_env()?;
    let fib = &config.fibonacci;
    fibonacci::with_quit(fib.count, fib.capacity, config.stall(), &Transcript::stdout()).await?;
    Ok(())
}
