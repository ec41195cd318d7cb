//! Raw registry lookups. Nothing is stored.

use anyhow::Result;
use etr_registry::RegistryClient;

use super::{print_json, Ctx};

pub async fn registration(ctx: &Ctx, tin: &str) -> Result<()> {
    let client = ctx.registry_client()?;
    let info = client.registration_info(tin.trim()).await?;
    print_json(&info)
}

pub async fn detail(ctx: &Ctx, licence_no: &str, tin: &str, lang: Option<&str>) -> Result<()> {
    let client = ctx.registry_client()?;
    let lang = lang.unwrap_or(&ctx.cfg.registry.lang);
    let d = client
        .license_detail(licence_no.trim(), tin.trim(), lang)
        .await?;
    print_json(&d)
}
