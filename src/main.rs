//! Gohan binary entrypoint kept minimal. The full runtime lives in `app`.

use clap::Parser;

#[tokio::main]
async fn main() {
    let args = gohan::args::Args::parse();
    if let Err(err) = gohan::app::run(args).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
