use scriptsense_core::ApiError;

use crate::context::Context;
use crate::output::percent;

pub async fn feedback(ctx: &Context, text: &str) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;
    let reply = api.submit_feedback(&session.email, text).await?;
    ctx.out.success(
        reply
            .message
            .unwrap_or_else(|| "thank you for your feedback".to_string()),
    );
    Ok(())
}

pub async fn recent(ctx: &Context) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;
    let docs = api.recent_documents(&session.email).await?;
    if docs.is_empty() {
        println!("{}", ctx.out.dim("no recent documents"));
        return Ok(());
    }
    for doc in docs {
        println!(
            "{:<40} {:<6} {:<10} {}",
            doc.filename,
            doc.file_type.as_deref().unwrap_or("-"),
            doc.language.as_deref().unwrap_or("-"),
            ctx.out.dim(doc.uploaded_at.as_deref().unwrap_or(""))
        );
    }
    Ok(())
}

/// Upload history for the current user, or for `email` when an admin asks.
pub async fn history(ctx: &Context, email: Option<&str>) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    if email.is_some() {
        warn_if_not_admin(ctx, session.is_admin);
    }
    let api = ctx.api(&session)?;
    let records = api
        .history(email.unwrap_or(&session.email))
        .await
        .map_err(forbidden)?;
    if records.is_empty() {
        println!("{}", ctx.out.dim("no uploads yet"));
        return Ok(());
    }
    for r in records {
        println!(
            "{:<40} {:<10} {:>7} {:>6} words {:>3} pages  {}",
            r.filename,
            r.language.as_deref().unwrap_or("-"),
            r.confidence.map(percent).unwrap_or_else(|| "-".to_string()),
            r.word_count.unwrap_or(0),
            r.page_count.unwrap_or(0),
            ctx.out.dim(r.upload_time.as_deref().unwrap_or(""))
        );
    }
    Ok(())
}

pub async fn admin_users(ctx: &Context) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    warn_if_not_admin(ctx, session.is_admin);
    let api = ctx.api(&session)?;
    let users = api.admin_users(&session.email).await.map_err(forbidden)?;
    for user in users {
        if user.is_admin {
            println!("{} {}", user.email, ctx.out.yellow("(admin)"));
        } else {
            println!("{}", user.email);
        }
    }
    Ok(())
}

pub async fn admin_feedback(ctx: &Context, email: &str) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    warn_if_not_admin(ctx, session.is_admin);
    let api = ctx.api(&session)?;
    let log = api.admin_feedback(email).await.map_err(forbidden)?;
    if log.feedback.is_empty() {
        let msg = log
            .message
            .unwrap_or_else(|| format!("no feedback from {email}"));
        println!("{}", ctx.out.dim(msg));
        return Ok(());
    }
    ctx.out.heading(&format!("Feedback from {email}"));
    for (i, entry) in log.feedback.iter().enumerate() {
        println!("{:>3}. {entry}", i + 1);
    }
    Ok(())
}

// The stored admin flag is only a hint; the request still goes out and the
// backend decides.
fn warn_if_not_admin(ctx: &Context, is_admin: bool) {
    if !is_admin {
        ctx.out.warn("this account is not marked as admin");
    }
}

fn forbidden(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::Unauthorized { status, .. } => {
            anyhow::anyhow!("access denied by backend ({status})")
        }
        other => other.into(),
    }
}
