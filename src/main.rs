#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pflegebox_server::run().await
}
