//! Configuration for the Switchboard dispatcher.
//!
//! Settings come from, in increasing priority: built-in defaults, an optional
//! TOML, JSON or `.env`-style file, a `.env` file in the working directory,
//! and `SWITCHBOARD_*` environment variables. The result is validated and
//! turned into a [`switchboard_core::DispatchConfig`].
//!
//! ```no_run
//! use switchboard_config::DispatchSettings;
//! use switchboard_core::FormatterCatalog;
//!
//! let settings = DispatchSettings::load(Some("switchboard.toml".as_ref()))?;
//! let config = settings.into_config(&FormatterCatalog::with_builtins())?;
//! # Ok::<(), switchboard_config::ConfigError>(())
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::{ENV_PREFIX, EnvLoader, load_dotenv};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::DispatchSettings;
pub use validation::{ConfigValidator, Validate};
