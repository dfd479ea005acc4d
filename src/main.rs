#[tokio::main]
async fn main() {
    if let Err(err) = codexam_rust::run().await {
        eprintln!("codexam-rust failed to start: {err:?}");
        std::process::exit(1);
    }
}
