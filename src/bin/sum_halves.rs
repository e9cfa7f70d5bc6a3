//! Sum each half of a slice on its own task.
//!
//! Run with: cargo run --bin sum_halves

use chanselect::demo::{tour, DemoError, Transcript};
use chanselect::{init_tracing, DemoConfig};

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    init_tracing();
    let config = DemoConfig::from_env()?;
    tour::sum_halves(&[7, 2, 8, -9, 4, 0], config.stall(), &Transcript::stdout()).await?;
    Ok(())
}
