use rag_demo::probe::{self, ProbeError};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    println!("Checking database connectivity...\n");

    if std::env::var("OPENAI_API_KEY").is_ok() {
        println!("OPENAI_API_KEY is set");
    } else {
        println!("warning: OPENAI_API_KEY is not set (the rag-demo pipeline needs it)");
    }

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => fail(ProbeError::MissingDatabaseUrl),
    };

    match probe::run(&database_url).await {
        Ok(report) => {
            let server = report.server_version.split(',').next().unwrap_or_default();
            println!("connection OK");
            println!("server: {}", server.trim());
            println!("vector extension installed");
            println!("items table columns:");
            for column in &report.columns {
                println!("  - {}: {}", column.name, column.data_type);
            }
            println!("items table holds {} rows", report.row_count);
            println!("\nAll checks passed. Run the pipeline with: cargo run --bin rag-demo");
        }
        Err(err) => fail(err),
    }
}

fn fail(err: ProbeError) -> ! {
    eprintln!("error: {err}");
    eprintln!("hint: {}", err.remediation());
    std::process::exit(1);
}
