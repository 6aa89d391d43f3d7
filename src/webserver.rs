//! Web server virtual host and lifecycle control.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use tracing::info;

use crate::context::RunContext;
use crate::executor::CommandSpec;
use crate::step::{ServiceAction, StepOutcome};
use crate::template::{self, Templates, Vars};

pub struct WebServer<'a> {
    ctx: RunContext<'a>,
}

impl<'a> WebServer<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// Path of the rendered virtual host file.
    pub fn vhost_path(&self) -> Utf8PathBuf {
        let profile = self.ctx.profile;
        profile
            .webserver
            .sites_dir
            .join(format!("{}.conf", profile.project.name))
    }

    fn vhost_vars(&self) -> Vars {
        let profile = self.ctx.profile;
        let name = profile.project.name.clone();
        Vars::from([
            ("project_name", name.clone()),
            ("server_name", name.clone()),
            ("server_aliases", name),
            ("port", profile.webserver.port.to_string()),
            ("docroot", profile.site_root().into_string()),
        ])
    }

    /// Renders the virtual host and enables the site when the file changed.
    pub fn configure_vhost(&self) -> Result<StepOutcome> {
        let templates = Templates::new(self.ctx.profile.templates_dir.as_deref());
        let content = templates.render(template::VHOST, &self.vhost_vars())?;
        let path = self.vhost_path();

        if !self.ctx.write_if_changed(&path, &content)? {
            info!("virtual host {} unchanged", path);
            return Ok(StepOutcome::skipped());
        }

        if let Some(enable) = &self.ctx.profile.webserver.enable_command {
            let spec = CommandSpec::new(enable.clone(), vec![self.ctx.profile.project.name.clone()]);
            self.ctx
                .run(&spec)
                .with_context(|| format!("failed to enable site {}", self.ctx.profile.project.name))?;
        }

        Ok(StepOutcome::notifying(ServiceAction::Restart))
    }

    /// Issues a lifecycle command to the web server service.
    pub fn apply(&self, action: ServiceAction) -> Result<()> {
        let webserver = &self.ctx.profile.webserver;
        info!("{} {}", action, webserver.service);
        let spec = CommandSpec::new(
            webserver.control_command.clone(),
            vec![webserver.service.clone(), action.to_string()],
        );
        self.ctx
            .run(&spec)
            .with_context(|| format!("failed to {} {}", action, webserver.service))?;
        Ok(())
    }
}
