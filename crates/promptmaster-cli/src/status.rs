use std::fmt::Write as _;

use anyhow::Result;
use promptmaster_contracts::session::AuthStrategy;

use crate::app::{readiness_label, App};

/// Credential state, models and file locations. Never prints the full key.
pub fn render(app: &App) -> Result<String> {
    let mut out = String::new();
    let readiness = app.session.readiness()?;
    match app.session.strategy() {
        AuthStrategy::SelfSupplied => {
            writeln!(out, "auth:      self-supplied key")?;
            match app.session.get_active() {
                Some(credential) => {
                    writeln!(
                        out,
                        "key:       {} ({})",
                        credential.masked_token(),
                        credential.flavour().label()
                    )?;
                    writeln!(out, "endpoint:  {}", credential.endpoint())?;
                }
                None => writeln!(out, "key:       none (run `promptmaster login <key>`)")?,
            }
        }
        AuthStrategy::HostDelegated => {
            writeln!(out, "auth:      host-delegated via ${}", app.config.host_key_env())?;
        }
    }
    writeln!(out, "status:    {}", readiness_label(readiness))?;
    writeln!(
        out,
        "models:    text={} vision={} image={} edit={} speech={}",
        app.models.text, app.models.vision, app.models.image, app.models.edit, app.models.speech
    )?;
    writeln!(out, "config:    {}", app.paths.config.display())?;
    writeln!(out, "events:    {}", app.paths.events.display())?;
    Ok(out)
}
