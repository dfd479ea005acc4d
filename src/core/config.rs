mod parsing;
mod settings;
pub(crate) mod types;

pub(crate) use self::types::{ConfigError, Settings};
