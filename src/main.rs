#[tokio::main]
async fn main() {
    seating_backend::run().await;
}
