use anyhow::Result;
use tracing::info;

use super::{print_json, Ctx};

/// `etr sync --tin T`
pub async fn sync(ctx: &Ctx, tin: &str, dry_run: bool) -> Result<()> {
    info!(tin, dry_run, config_hash = ctx.config_hash().unwrap_or("-"), "sync");
    let engine = ctx.engine(dry_run).await?;
    let summary = engine.reconcile(tin).await?;
    print_json(&summary)
}

/// `etr licence refresh --licence-no L --tin T [--lang xx]`
pub async fn refresh_licence(
    ctx: &Ctx,
    licence_no: &str,
    tin: &str,
    lang: Option<&str>,
) -> Result<()> {
    let engine = ctx.engine(false).await?;
    let summary = engine.update_business_details(licence_no, tin, lang).await?;
    print_json(&summary)
}
