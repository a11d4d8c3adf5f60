//! Account commands: register, login, logout, whoami, email verification,
//! password reset and profile settings.

use std::io::{self, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tally_api_client::{
    AbortSignal, ApiError, NewUser, PasswordChange, PasswordReset, ProfileUpdate,
};
use tally_core::User;

use crate::context::Context;
use crate::exit_codes::*;
use crate::{print_json, CliError};

// ── Password input ──────────────────────────────────────────────────

/// Flag/env value, else a prompt on a terminal, else a usage error.
fn resolve_password(value: Option<String>, prompt: &str, flag: &str) -> Result<String, CliError> {
    if let Some(p) = value.filter(|p| !p.is_empty()) {
        return Ok(p);
    }
    if !atty::is(atty::Stream::Stdin) {
        return Err(CliError::args(format!("No {} provided and stdin is not a TTY", prompt.to_lowercase()))
            .with_hint(format!("pass {} or set TALLY_PASSWORD", flag)));
    }

    eprint!("{}: ", prompt);
    io::stderr().flush().ok();
    let mut buf = String::new();
    io::stdin()
        .read_line(&mut buf)
        .map_err(|e| CliError::general(e.to_string()))?;
    let password = buf.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(CliError::args(format!("No {} provided", prompt.to_lowercase()))
            .with_hint(format!("pass {}", flag)));
    }
    Ok(password)
}

fn describe(user: &User) -> String {
    let verified = if user.is_verified() { "verified" } else { "unverified" };
    format!("{} <{}> ({})", user.name, user.email, verified)
}

/// With `auth.rememberToken` off nothing is written to disk, so hand the
/// token to the user for TALLY_TOKEN.
fn report_token(ctx: &Context, token: &str) {
    if !ctx.settings.remember_token {
        println!("{}", token);
        eprintln!("token not saved (auth.rememberToken is false); export it as TALLY_TOKEN");
    }
}

// ── Register / login / logout ───────────────────────────────────────

pub fn cmd_register(ctx: &Context, name: String, email: String, password: Option<String>) -> Result<(), CliError> {
    let password = resolve_password(password, "Password", "--password")?;
    let user = NewUser {
        name,
        email,
        password_confirmation: password.clone(),
        password,
    };

    let auth = ctx.client.register(&user)?;
    eprintln!("Registered {}", describe(&auth.user));
    if !auth.user.is_verified() {
        eprintln!("Check your inbox to verify the address (`tally verify-email` resends it)");
    }
    report_token(ctx, &auth.token);
    Ok(())
}

pub fn cmd_login(ctx: &Context, email: String, password: Option<String>) -> Result<(), CliError> {
    let password = resolve_password(password, "Password", "--password")?;
    let auth = ctx.client.login(&email, &password).map_err(|e| match e {
        ApiError::Unauthorized(msg) => CliError {
            code: EXIT_API_NOT_AUTH,
            message: msg,
            hint: Some("check the email and password".into()),
        },
        other => other.into(),
    })?;

    eprintln!("Logged in as {}", describe(&auth.user));
    report_token(ctx, &auth.token);
    Ok(())
}

pub fn cmd_logout(ctx: &Context) -> Result<(), CliError> {
    if !ctx.client.is_authenticated() {
        eprintln!("Not logged in");
        return Ok(());
    }
    // Token is gone locally either way; a failed call is only worth a warning.
    if let Err(e) = ctx.client.logout() {
        log::warn!("logout request failed: {}", e);
    }
    eprintln!("Logged out");
    Ok(())
}

// ── Whoami ──────────────────────────────────────────────────────────

/// Fetch the current user, giving up after `timeout`. The request thread is
/// left to finish on its own; its result is discarded.
fn current_user_within(ctx: &Context, timeout: Option<Duration>) -> Result<User, ApiError> {
    let Some(timeout) = timeout else {
        return ctx.client.current_user();
    };

    let signal = AbortSignal::new();
    let (tx, rx) = mpsc::channel();
    let client = ctx.client.clone();
    let worker_signal = signal.clone();
    thread::spawn(move || {
        let _ = tx.send(client.current_user_with_abort(&worker_signal));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            signal.abort();
            Err(ApiError::Aborted)
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ApiError::Network("request thread exited".into())),
    }
}

pub fn cmd_whoami(ctx: &Context, timeout: Option<u64>, json: bool) -> Result<(), CliError> {
    ctx.authed()?;
    let timeout = timeout.map(Duration::from_secs);
    let user = current_user_within(ctx, timeout).map_err(|e| match e {
        ApiError::Aborted => CliError {
            code: EXIT_API_NETWORK,
            message: "Timed out waiting for the server".into(),
            hint: Some("raise --timeout or check `api.base`".into()),
        },
        other => other.into(),
    })?;

    if json {
        return print_json(&user);
    }
    println!("{}", describe(&user));
    Ok(())
}

// ── Email verification / password reset ─────────────────────────────

pub fn cmd_verify_email(ctx: &Context, status: bool) -> Result<(), CliError> {
    let client = ctx.authed()?;
    if status {
        let status = client.verification_status()?;
        println!("{}", if status.verified { "verified" } else { "not verified" });
        return Ok(());
    }
    eprintln!("{}", client.send_verification_email()?);
    Ok(())
}

pub fn cmd_forgot_password(ctx: &Context, email: String) -> Result<(), CliError> {
    eprintln!("{}", ctx.client.forgot_password(&email)?);
    Ok(())
}

pub fn cmd_reset_password(
    ctx: &Context,
    token: String,
    email: String,
    password: Option<String>,
) -> Result<(), CliError> {
    let password = resolve_password(password, "New password", "--password")?;
    let reset = PasswordReset {
        token,
        email,
        password_confirmation: password.clone(),
        password,
    };
    eprintln!("{}", ctx.client.reset_password(&reset)?);
    Ok(())
}

// ── Profile ─────────────────────────────────────────────────────────

pub fn cmd_profile_update(ctx: &Context, name: Option<String>, email: Option<String>) -> Result<(), CliError> {
    if name.is_none() && email.is_none() {
        return Err(CliError::args("Nothing to update").with_hint("pass --name and/or --email"));
    }
    let client = ctx.authed()?;
    let user = client.update_profile(&ProfileUpdate { name, email })?;
    eprintln!("Updated {}", describe(&user));
    Ok(())
}

pub fn cmd_profile_password(
    ctx: &Context,
    current: Option<String>,
    new_password: Option<String>,
) -> Result<(), CliError> {
    let client = ctx.authed()?;
    let current_password = resolve_password(current, "Current password", "--current")?;
    let password = resolve_password(new_password, "New password", "--new")?;
    client.update_password(&PasswordChange {
        current_password,
        password_confirmation: password.clone(),
        password,
    })?;
    eprintln!("Password changed");
    Ok(())
}

pub fn cmd_profile_preferences(ctx: &Context, json: String) -> Result<(), CliError> {
    let preferences: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| CliError::args(format!("Invalid JSON: {}", e)))?;
    if !preferences.is_object() {
        return Err(CliError::args("Preferences must be a JSON object"));
    }
    let client = ctx.authed()?;
    let echoed = client.update_preferences(&preferences)?;
    if echoed.is_null() {
        eprintln!("Preferences saved");
        return Ok(());
    }
    print_json(&echoed)
}

pub fn cmd_profile_delete(ctx: &Context, password: Option<String>, yes: bool) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::args("Refusing to delete the account without --yes"));
    }
    let client = ctx.authed()?;
    let password = resolve_password(password, "Password", "--password")?;
    client.delete_account(&password)?;
    eprintln!("Account deleted");
    Ok(())
}
