//! `fbmend` binary entrypoint.

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = fbmend_cli::run().await;
    std::process::exit(exit_code);
}
