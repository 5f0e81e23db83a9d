use axum::{extract::State, response::Html};
use std::sync::Arc;
use tera::Context;

use crate::state::AppState;

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let mut ctx = Context::new();
    ctx.insert("issuer", &state.config.issuer);
    render_template("index.html", ctx)
}

fn render_template(name: &str, ctx: Context) -> Html<String> {
    let tera = crate::templates::get_tera();
    let rendered = tera.render(name, &ctx).unwrap_or_else(|e| {
        tracing::error!("Template {} failed to render: {}", name, e);
        format!("Template error: {}", name)
    });
    Html(rendered)
}
