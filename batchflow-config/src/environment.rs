use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Name of the environment variable holding the environment name.
pub const APP_ENVIRONMENT_ENV_NAME: &str = "APP_ENVIRONMENT";

const DEV_ENV_NAME: &str = "dev";

const PROD_ENV_NAME: &str = "prod";

/// Error returned when an environment name is not recognized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("`{0}` is not a supported environment, use either `dev` or `prod`")]
pub struct UnknownEnvironment(pub String);

/// Runtime environment of a batchflow process.
///
/// It selects which configuration file overrides the base one and how logs are formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    /// Loads the environment from `APP_ENVIRONMENT`, defaulting to [`Environment::Dev`] when unset.
    pub fn load() -> Result<Environment, UnknownEnvironment> {
        match std::env::var(APP_ENVIRONMENT_ENV_NAME) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Environment::Dev),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => DEV_ENV_NAME,
            Environment::Prod => PROD_ENV_NAME,
        }
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Environment::Prod)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    /// Parses `dev` or `prod`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            DEV_ENV_NAME => Ok(Self::Dev),
            PROD_ENV_NAME => Ok(Self::Prod),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}
