use std::net::SocketAddr;

mod cli;

#[tokio::main]
async fn main() {
    let (config, port) = match cli::run() {
        cli::RunOutcome::Serve { config, port } => (config, port),
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    println!("listening on http://{addr}");

    mvps_portal::serve(addr, config).await;
}
