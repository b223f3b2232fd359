//! Input validation for sudoprompt
//!
//! Everything the elevation strategies receive has passed through this crate:
//! [`Invocation::new`] checks the command and options and is the only way to
//! build an [`Invocation`]. The escaping helpers live here too because they are
//! the other half of keeping caller text from changing the meaning of the
//! generated scripts.

pub mod escape;
pub mod invocation;
pub mod rules;

pub use escape::{
    escape_applescript, escape_cmd_value, escape_double_quotes, escape_powershell_single_quoted,
};
pub use invocation::{DisplayName, EnvVars, Invocation, Options, SpawnOptions, StdioMode};
pub use rules::{is_valid_display_name, is_valid_env_key, validate_env_entry};
