//! Interactive flow for the install command.
//!
//! Collects install options interactively when `-i` is passed.
//! Uses dialoguer for terminal prompts.

use std::io::{self, Write};

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, MultiSelect, Select, theme::ColorfulTheme};

use conduit_core::client::ClientRegistry;
use conduit_core::commands::InstallOptions;
use conduit_core::types::Scope;

/// Values given on the command line; each one skips its prompt.
#[derive(Debug, Clone, Default)]
pub struct PrefilledOptions {
    pub source: Option<String>,
    pub scope: Option<Scope>,
    /// Agent ids; `None` prompts for a selection.
    pub agents: Option<Vec<String>>,
    pub name: Option<String>,
    /// Skip the confirmation prompt
    pub yes: bool,
}

#[derive(Debug, Clone)]
pub struct InteractiveResult {
    pub source: String,
    pub options: InstallOptions,
    pub confirmed: bool,
}

pub struct InteractiveFlow<'a, W: Write = io::Stdout> {
    registry: &'a ClientRegistry,
    prefilled: PrefilledOptions,
    writer: W,
    theme: ColorfulTheme,
}

impl<'a> InteractiveFlow<'a, io::Stdout> {
    pub fn new(registry: &'a ClientRegistry, prefilled: PrefilledOptions) -> Self {
        Self::with_writer(registry, prefilled, io::stdout())
    }
}

impl<'a, W: Write> InteractiveFlow<'a, W> {
    pub fn with_writer(registry: &'a ClientRegistry, prefilled: PrefilledOptions, writer: W) -> Self {
        Self {
            registry,
            prefilled,
            writer,
            theme: ColorfulTheme::default(),
        }
    }

    /// Prompt for source, scope and agents, then confirm.
    pub fn collect(&mut self) -> Result<InteractiveResult> {
        self.print_header()?;

        let source = self.prompt_source()?;
        let scope = self.prompt_scope()?;
        let agents = self.prompt_agents(scope)?;

        let mut options = InstallOptions::new(scope).with_agents(agents);
        if let Some(name) = &self.prefilled.name {
            options = options.with_name(name);
        }

        let confirmed = self.show_summary_and_confirm(&source, &options)?;
        Ok(InteractiveResult {
            source,
            options,
            confirmed,
        })
    }

    fn print_header(&mut self) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", style("  Conduit Install").bold().cyan())?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn prompt_source(&self) -> Result<String> {
        if let Some(source) = &self.prefilled.source {
            return Ok(source.clone());
        }
        let source: String = Input::with_theme(&self.theme)
            .with_prompt("Server source (path, registry:<id>, github:<owner>/<repo>)")
            .interact_text()?;
        Ok(source)
    }

    fn prompt_scope(&self) -> Result<Scope> {
        if let Some(scope) = self.prefilled.scope {
            return Ok(scope);
        }

        let options = [
            "Project  - This directory only",
            "User     - Every project for this account",
        ];
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Scope")
            .items(&options)
            .default(0)
            .interact()?;

        Ok(match selection {
            0 => Scope::Project,
            _ => Scope::User,
        })
    }

    /// Agents supporting `scope`; detected ones start selected.
    fn prompt_agents(&self, scope: Scope) -> Result<Vec<String>> {
        if let Some(agents) = &self.prefilled.agents {
            return Ok(agents.clone());
        }

        let available = self.registry.clients_for_scope(scope);
        if available.is_empty() {
            return Ok(Vec::new());
        }

        let detected: Vec<&str> = self.registry.detect_installed().iter().map(|c| c.id()).collect();
        let labels: Vec<String> = available
            .iter()
            .map(|c| format!("{} ({})", c.display_name(), c.id()))
            .collect();
        let defaults: Vec<bool> = available.iter().map(|c| detected.contains(&c.id())).collect();

        let selections = MultiSelect::with_theme(&self.theme)
            .with_prompt("Agents (space to toggle, enter to confirm)")
            .items(&labels)
            .defaults(&defaults)
            .interact()?;

        Ok(selections
            .into_iter()
            .map(|i| available[i].id().to_string())
            .collect())
    }

    fn show_summary_and_confirm(&mut self, source: &str, options: &InstallOptions) -> Result<bool> {
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", style("  Summary").bold())?;
        writeln!(self.writer, "  ───────────────────────────")?;
        writeln!(self.writer, "  Source:   {}", style(source).green())?;
        writeln!(self.writer, "  Scope:    {}", style(options.scope).green())?;
        if let Some(name) = &options.name {
            writeln!(self.writer, "  Name:     {}", style(name).green())?;
        }
        let agents = if options.agents.is_empty() {
            "detected agents".to_string()
        } else {
            options.agents.join(", ")
        };
        writeln!(self.writer, "  Agents:   {}", style(agents).green())?;
        writeln!(self.writer)?;

        if self.prefilled.yes {
            return Ok(true);
        }

        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt("Proceed with installation?")
            .default(true)
            .interact()?;
        Ok(confirmed)
    }
}
