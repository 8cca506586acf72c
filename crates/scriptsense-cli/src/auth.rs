use anyhow::Context as _;

use scriptsense_core::{ApiError, Session};

use crate::context::Context;

pub async fn login(ctx: &Context, email: &str, password: &str) -> anyhow::Result<()> {
    let api = ctx.anonymous_api()?;
    let reply = api.login(email, password).await.map_err(describe)?;
    let session = Session::new(reply.token, reply.user.email, reply.user.is_admin);
    ctx.store()
        .create_session(&session)
        .context("could not store session")?;

    ctx.out.success(format!("logged in as {}", ctx.out.bold(&session.email)));
    if session.is_admin {
        println!("  {}", ctx.out.dim("admin views enabled"));
    }
    Ok(())
}

pub async fn signup(ctx: &Context, name: &str, email: &str, password: &str) -> anyhow::Result<()> {
    let api = ctx.anonymous_api()?;
    let reply = api.signup(name, email, password).await.map_err(describe)?;
    if let Some(error) = reply.error {
        anyhow::bail!("signup failed: {error}");
    }
    ctx.out.success(
        reply
            .message
            .unwrap_or_else(|| "account created; you can now log in".to_string()),
    );
    Ok(())
}

pub fn logout(ctx: &Context) -> anyhow::Result<()> {
    ctx.store().clear_session().context("could not clear session")?;
    ctx.out.success("logged out");
    Ok(())
}

pub async fn whoami(ctx: &Context) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    println!("{}", ctx.out.bold(&session.email));
    if session.is_admin {
        println!("  {}", ctx.out.dim("admin"));
    }
    println!("  {}", ctx.out.dim(&ctx.config.api_url));
    Ok(())
}

/// Turn auth failures into the message the backend sent.
fn describe(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::Unauthorized { message, .. } | ApiError::Backend { message, .. } => {
            anyhow::anyhow!(message)
        }
        other => other.into(),
    }
}

