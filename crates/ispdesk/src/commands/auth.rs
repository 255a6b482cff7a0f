//! Login, logout and whoami.

use std::path::Path;

use ispdesk_core::{Console, Session};
use serde::Serialize;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;
use crate::output;
use crate::session;

use super::util;

pub fn login(
    console: &Console,
    args: LoginArgs,
    session_file: &Path,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let password = match args.password {
        Some(p) => p,
        None => util::prompt_secret("Password: ", "password")?,
    };
    let token = console.login(&args.username, &password)?;
    session::save(session_file, &token)?;
    output::notice(
        &format!(
            "Logged in as {} (session valid until {})",
            token.username,
            token.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
        global,
    );
    Ok(())
}

pub fn logout(session_file: &Path, global: &GlobalOpts) -> Result<(), CliError> {
    if session::clear(session_file)? {
        output::notice("Logged out", global);
    } else {
        output::notice("Not logged in", global);
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WhoAmI<'a> {
    username: &'a str,
    expires_at: String,
}

pub fn whoami(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let me = WhoAmI {
        username: session.username(),
        expires_at: session.principal().expires_at.to_rfc3339(),
    };
    let out = output::render_single(
        global.format(),
        &me,
        |m| format!("User:     {}\nExpires:  {}", m.username, m.expires_at),
        |m| m.username.to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
