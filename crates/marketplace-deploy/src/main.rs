#[tokio::main]
async fn main() -> std::process::ExitCode {
    marketplace_deploy::start(std::env::args()).await
}
