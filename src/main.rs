use campus_market::configuration::get_configuration;
use campus_market::create_app;
use campus_market::query::ViewScope;
use campus_market::telemetry::init_tracing;
use std::env;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    init_tracing();
    let configuration = get_configuration().expect("Failed to read configuration");
    let app = create_app(&configuration, ViewScope::Marketplace).expect("Failed to create app");

    let mut args = env::args().skip(1);
    if let Some(term) = args.next() {
        app.queries.set_search_term(&term);
        app.queries.submit_search();
    }
    if let Some(preset) = args.next() {
        app.queries.set_sort(&preset).expect("Failed to parse sort preset");
    }

    app.settled().await;
    match app.orchestrator.categories(true).await {
        Ok(categories) => {
            for category in categories {
                info!(
                    id = %category.id,
                    products = category.product_count.unwrap_or_default(),
                    "category"
                );
            }
        }
        Err(e) => warn!(error = %e, "failed to load categories"),
    }
    print!("{}", app.render_text());
}
