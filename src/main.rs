use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Optional `.env` next to the binary's working directory (OBP_MODEL, RUST_LOG, ...).
    dotenvy::dotenv().ok();

    match obesity_predict::app::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
