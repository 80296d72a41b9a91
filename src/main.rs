use hemmer_provider_singlestore::{init_logging, serve, SingleStoreProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(SingleStoreProvider::new()).await
}
