//! Admin login collection and InfluxDB user provisioning.

use std::process::Command;

use anyhow::{anyhow, Result};
use sppmon_core::credentials::is_storable_value;
use sppmon_core::keys;
use sppmon_core::util::{mask_secret, parse_flag};
use tracing::{info, warn};

use crate::prompt::InputRequest;

use super::{log_line, StepContext, StepEnv};

/// Connection settings staged by the datastore step.
struct InfluxClient {
    binary: String,
    address: String,
    port: String,
    ssl: bool,
    unsafe_ssl: bool,
}

impl InfluxClient {
    fn from_context(env: &StepEnv, ctx: &StepContext) -> Self {
        let datastore = &env.config.datastore;
        let stored = |key: &str| ctx.credentials.get(key).map(str::to_string);
        let flag = |key: &str| stored(key).and_then(|value| parse_flag(&value)).unwrap_or(false);
        Self {
            binary: datastore.client_binary.clone(),
            address: stored(keys::INFLUX_ADDRESS).unwrap_or_else(|| datastore.address.clone()),
            port: stored(keys::INFLUX_PORT).unwrap_or_else(|| datastore.port.to_string()),
            ssl: flag(keys::SSL_ENABLED),
            unsafe_ssl: flag(keys::UNSAFE_SSL),
        }
    }

    fn command(&self, login: Option<&Login>, statement: &str) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(["-host", &self.address, "-port", &self.port]);
        if self.ssl {
            command.arg("-ssl");
            if self.unsafe_ssl {
                command.arg("-unsafeSsl");
            }
        }
        if let Some(login) = login {
            command.args(["-username", &login.name, "-password", &login.password]);
        }
        command.args(["-execute", statement]);
        command
    }
}

struct Login {
    name: String,
    password: String,
}

pub fn collect_credentials(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    let max_attempts = env.config.datastore.max_user_attempts;
    let client = InfluxClient::from_context(env, ctx);
    if !ctx.credentials.contains(keys::INFLUX_ADDRESS) {
        ctx.stage(keys::INFLUX_ADDRESS, &client.address)?;
        ctx.stage(keys::INFLUX_PORT, &client.port)?;
    }

    let mut login = read_login(env, ctx, false)?;
    if env
        .runner
        .probe(client.command(Some(&login), "SHOW USERS"))
    {
        log_line(
            ctx,
            format!("InfluxDB admin {} already exists, skipping creation.", login.name),
        );
        return stage_login(ctx, &login);
    }

    let mut attempt = 1;
    loop {
        let statement = create_user_statement(&login);
        info!(user = %login.name, password = %mask_secret(&login.password), attempt, "creating influx admin");
        match env
            .runner
            .run(ctx, "influx: CREATE USER", client.command(None, &statement))
        {
            Ok(()) => {
                log_line(ctx, format!("Created InfluxDB admin {}.", login.name));
                return stage_login(ctx, &login);
            }
            Err(err) => {
                warn!(attempt, "influx admin creation failed: {err:#}");
                if attempt >= max_attempts {
                    return Err(anyhow!(
                        "could not create InfluxDB admin after {attempt} attempts: {err}"
                    ));
                }
            }
        }
        if !ctx.confirm("Creating the InfluxDB admin failed. Try again?", true)? {
            return Err(anyhow!("InfluxDB admin creation was cancelled"));
        }
        if ctx.confirm("Do you want to re-enter the admin credentials?", false)? {
            login = read_login(env, ctx, true)?;
        }
        attempt += 1;
    }
}

/// Stored login unless `fresh`; nothing is staged until the login works.
fn read_login(env: &StepEnv, ctx: &mut StepContext, fresh: bool) -> Result<Login> {
    let default_admin = env.config.datastore.default_admin.as_str();
    let name_request = InputRequest::new("Please enter the desired InfluxDB admin name")
        .with_default(default_admin)
        .validate(&is_valid_user_name);
    let password_request = InputRequest::new(
        "Please enter the desired InfluxDB admin password (no \\, \", $ or `)",
    )
    .secret()
    .validate(&is_storable_value);

    let stored = |ctx: &StepContext, key: &str| {
        (!fresh)
            .then(|| ctx.credentials.get(key).map(str::to_string))
            .flatten()
    };
    let name = match stored(&*ctx, keys::INFLUX_ADMIN_NAME) {
        Some(name) => name,
        None => ctx.input(&name_request)?,
    };
    let password = match stored(&*ctx, keys::INFLUX_ADMIN_PASSWORD) {
        Some(password) => password,
        None => ctx.input(&password_request)?,
    };
    Ok(Login { name, password })
}

// Unchanged values are not appended again, so a reused login leaves the file as is.
fn stage_login(ctx: &mut StepContext, login: &Login) -> Result<()> {
    ctx.stage(keys::INFLUX_ADMIN_NAME, &login.name)?;
    ctx.stage(keys::INFLUX_ADMIN_PASSWORD, &login.password)
}

fn is_valid_user_name(value: &str) -> bool {
    !value.is_empty()
        && is_storable_value(value)
        && !value
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '"' | '\'' | '\\'))
}

fn create_user_statement(login: &Login) -> String {
    let password = login.password.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "CREATE USER \"{}\" WITH PASSWORD '{}' WITH ALL PRIVILEGES",
        login.name, password
    )
}
