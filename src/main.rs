//! `board` - Terminal issue board.
//!
//! Three-column board over a simulated backend with optimistic moves,
//! a short undo window and background polling.

use issue_board::run;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
