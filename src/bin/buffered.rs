//! Fill a channel of capacity two and read it back on the same task.
//!
//! Run with: cargo run --bin buffered

use chanselect::demo::{tour, DemoError, Transcript};
use chanselect::init_tracing;

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    init_tracing();
    tour::buffered(&Transcript::stdout()).await?;
    Ok(())
}
