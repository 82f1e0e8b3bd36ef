//! Logical document layout.
//!
//! ```text
//! experiences/<id>/config.json
//! experiences/<id>/state/world.template.json   # pristine template
//! experiences/<id>/state/world.json            # live (shared model)
//! experiences/<id>/game-logic/*.md             # player commands
//! experiences/<id>/admin-logic/*.md            # admin commands
//! experiences/<id>/players/<pid>/world.json    # live (isolated model)
//! experiences/<id>/backups/<ts>/world.json     # reset backups
//! players/<pid>/profile.json
//! players/<pid>/<experience>/view.json
//! ```

use wayfarer_domain::{ExperienceId, PlayerId};

pub const EXPERIENCES_ROOT: &str = "experiences";
pub const PLAYERS_ROOT: &str = "players";

pub fn experience_dir(experience: &ExperienceId) -> String {
    format!("{EXPERIENCES_ROOT}/{experience}")
}

pub fn config_path(experience: &ExperienceId) -> String {
    format!("{}/config.json", experience_dir(experience))
}

pub fn world_template_path(experience: &ExperienceId) -> String {
    format!("{}/state/world.template.json", experience_dir(experience))
}

pub fn shared_world_path(experience: &ExperienceId) -> String {
    format!("{}/state/world.json", experience_dir(experience))
}

pub fn isolated_world_path(experience: &ExperienceId, player: &PlayerId) -> String {
    format!("{}/players/{player}/world.json", experience_dir(experience))
}

pub fn isolated_players_dir(experience: &ExperienceId) -> String {
    format!("{}/players", experience_dir(experience))
}

pub fn game_logic_dir(experience: &ExperienceId) -> String {
    format!("{}/game-logic", experience_dir(experience))
}

pub fn admin_logic_dir(experience: &ExperienceId) -> String {
    format!("{}/admin-logic", experience_dir(experience))
}

pub fn backup_dir(experience: &ExperienceId, timestamp: i64) -> String {
    format!("{}/backups/{timestamp}", experience_dir(experience))
}

pub fn backup_world_path(experience: &ExperienceId, timestamp: i64) -> String {
    format!("{}/world.json", backup_dir(experience, timestamp))
}

pub fn profile_path(player: &PlayerId) -> String {
    format!("{PLAYERS_ROOT}/{player}/profile.json")
}

pub fn player_dir(player: &PlayerId) -> String {
    format!("{PLAYERS_ROOT}/{player}")
}

pub fn view_path(player: &PlayerId, experience: &ExperienceId) -> String {
    format!("{PLAYERS_ROOT}/{player}/{experience}/view.json")
}
