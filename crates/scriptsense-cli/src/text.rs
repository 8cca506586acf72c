use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};

use scriptsense_core::api::{SaveEditRequest, SaveFormat, TextArea};
use scriptsense_core::histogram::ConfidenceHistogram;
use scriptsense_core::results::{CommitOutcome, TextPanel};
use scriptsense_export::{default_filename, export_to_file, ExportFormat};

use crate::context::Context;

fn read_text(path: &Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    if text.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(text)
}

pub async fn reprocess(
    ctx: &Context,
    input: &Path,
    lang: &str,
    area: TextArea,
) -> anyhow::Result<()> {
    let text = read_text(input)?;
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;

    let mut panel = TextPanel::new(area, lang, text);
    panel.begin_edit();
    match panel.commit(&api).await {
        CommitOutcome::Reprocessed => ctx.out.success(format!("{area} text reprocessed")),
        CommitOutcome::KeptEdit { reason } => {
            ctx.out.warn(format!("reprocessing failed ({reason}); keeping the edited text"))
        }
    }
    println!("{}", panel.displayed());
    Ok(())
}

pub async fn save_edit(
    ctx: &Context,
    input: &Path,
    lang: &str,
    format: SaveFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let text = read_text(input)?;
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;

    let reply = api
        .save_edited_text(&SaveEditRequest {
            text: &text,
            format,
            lang_code: lang,
        })
        .await?;
    ctx.out.success(&reply.message);

    match output {
        Some(path) => fetch(ctx, &api, &reply.download_url, path).await,
        None => {
            println!("  {}", ctx.out.dim(&reply.download_url));
            Ok(())
        }
    }
}

pub async fn download(ctx: &Context, link: &str, output: &Path) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;
    fetch(ctx, &api, link, output).await
}

async fn fetch(
    ctx: &Context,
    api: &scriptsense_core::ApiClient,
    link: &str,
    output: &Path,
) -> anyhow::Result<()> {
    let bytes = api.download(link).await?;
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("could not write {}", output.display()))?;
    ctx.out
        .success(format!("saved {} ({} bytes)", output.display(), bytes.len()));
    Ok(())
}

pub fn export(
    ctx: &Context,
    input: &Path,
    lang: &str,
    area: TextArea,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
) -> anyhow::Result<()> {
    let text = read_text(input)?;
    let format = format
        .or_else(|| output.as_deref().and_then(ExportFormat::from_path))
        .unwrap_or(ExportFormat::Pdf);
    let path = output.unwrap_or_else(|| PathBuf::from(default_filename(area, lang, format)));

    export_to_file(&path, &text, lang, format, &ctx.fonts())?;
    ctx.out.success(format!("exported {}", path.display()));
    Ok(())
}

pub fn histogram(ctx: &Context, scores: &[f64]) {
    let histogram = ConfidenceHistogram::from_scores(scores);
    ctx.out.histogram(&histogram);
    println!("  {}", ctx.out.dim(format!("{} words", histogram.total())));
}
