// src/main.rs

use forrest::{cli, mode, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    let result = run(args).await;
    if let Err(err) = &result {
        eprintln!("forrest error: {err}");
    }
    std::process::exit(mode::exit_code(&result));
}
