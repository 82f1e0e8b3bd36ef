//! Markdown command definitions.
//!
//! A gameplay command is a markdown file whose YAML frontmatter declares the
//! dispatch metadata and whose body holds the rules the LLM interprets.

use serde::{Deserialize, Serialize};

use crate::config::StateModel;
use crate::error::GameError;

fn default_state_model_support() -> Vec<StateModel> {
    vec![StateModel::Shared, StateModel::Isolated]
}

/// Dispatch metadata parsed from a command file's frontmatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub command: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_location: bool,
    #[serde(default)]
    pub requires_target: bool,
    #[serde(default = "default_state_model_support")]
    pub state_model_support: Vec<StateModel>,
    #[serde(default)]
    pub requires_admin: bool,
}

impl CommandDefinition {
    pub fn supports(&self, model: StateModel) -> bool {
        self.state_model_support.contains(&model)
    }

    /// Canonical name plus aliases.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.command.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// A parsed command file: frontmatter + the markdown body handed to the LLM.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub definition: CommandDefinition,
    pub body: String,
}

/// Split a command markdown file into YAML frontmatter and body.
///
/// The file must start with a `---` fence; the frontmatter runs to the next
/// `---` line.
pub fn parse_command_markdown(text: &str) -> Result<ParsedCommand, GameError> {
    let trimmed = text.trim_start_matches('\u{feff}');
    let mut lines = trimmed.lines();
    match lines.next().map(str::trim) {
        Some("---") => {}
        _ => {
            return Err(GameError::config_invalid(
                "command file is missing a frontmatter fence",
            ))
        }
    }

    let mut frontmatter = String::new();
    let mut body = String::new();
    let mut in_frontmatter = true;
    for line in lines {
        if in_frontmatter && line.trim() == "---" {
            in_frontmatter = false;
            continue;
        }
        if in_frontmatter {
            frontmatter.push_str(line);
            frontmatter.push('\n');
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    if in_frontmatter {
        return Err(GameError::config_invalid(
            "command frontmatter is not terminated",
        ));
    }

    let definition: CommandDefinition = serde_yaml::from_str(&frontmatter)
        .map_err(|e| GameError::config_invalid(format!("bad command frontmatter: {e}")))?;
    if definition.command.trim().is_empty() {
        return Err(GameError::config_invalid("command name must not be empty"));
    }

    Ok(ParsedCommand {
        definition,
        body: body.trim().to_string(),
    })
}
