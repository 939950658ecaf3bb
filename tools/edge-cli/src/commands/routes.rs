//! List demo routes.

use anyhow::Result;
use stream_demo::pages::{routes, FLIGHT_ROUTE, FLIGHT_STATE_PARAM};

use crate::context::Context;

/// Run the routes command.
pub async fn run(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&routes());
        return Ok(());
    }

    ctx.output.header("Demo routes");
    for route in routes() {
        ctx.output.list_item(route);
    }
    ctx.output.info(&format!(
        "Side channel: {}?{}={{\"pathname\":\"/stream\"}} or `edge render --flight`",
        FLIGHT_ROUTE, FLIGHT_STATE_PARAM
    ));
    Ok(())
}
