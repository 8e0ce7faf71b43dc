#[tokio::main]
async fn main() {
    if let Err(e) = movie_ratings::start_server().await {
        tracing::error!("Server failed: {}", e);
        eprintln!("movie_ratings: {e}");
        std::process::exit(1);
    }
}
