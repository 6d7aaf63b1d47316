use crate::auth::AuthError;
use config::builder::DefaultState;
use config::ConfigBuilder;
use directories::BaseDirs;
use notecase::notestore::BoxedNoteStore;
use notecase::{FlatFileStore, NoteStoreError, SQLiteStoreBuilder};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

const NOTES_ROOT_ENV: &str = "NOTES_ROOT";
const DEFAULT_NOTES_DIR: &str = ".notes";
const DATABASE_FILE: &str = "notes.sqlite";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:4444";

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStoreType {
    FlatFile,
    SQLite,
}

#[derive(Deserialize, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub notestoretype: NoteStoreType,
    notesroot: Option<PathBuf>,
    dbdir: Option<PathBuf>,
    pub disableauth: bool,
    /// Origin allowed to make cross-origin requests, empty to allow none.
    pub corsorigin: String,
    pub auth: Option<AuthSettings>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AuthSettings {
    /// Base URL of the OpenID Connect provider.
    pub providerurl: String,
    pub redirecturl: String,
    #[serde(default = "default_client_id")]
    pub clientid: String,
    pub clientsecret: Option<String>,
}

fn default_client_id() -> String {
    "notes-api".to_owned()
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),
    #[error("cannot open note store: {0}")]
    NoteStore(#[from] NoteStoreError),
    #[error("cannot set up authentication: {0}")]
    Auth(#[from] AuthError),
    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),
}

fn default_notes_dir() -> Result<PathBuf, config::ConfigError> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_NOTES_DIR))
        .ok_or_else(|| config::ConfigError::Message("cannot find the home directory".to_owned()))
}

impl Settings {
    /// Root of the flat-file store: `notesroot`, then `$NOTES_ROOT`, then `~/.notes`.
    pub fn notes_root(&self) -> Result<PathBuf, config::ConfigError> {
        if let Some(ref root) = self.notesroot {
            return Ok(root.clone());
        }
        match std::env::var_os(NOTES_ROOT_ENV) {
            Some(root) if !root.is_empty() => Ok(root.into()),
            _ => default_notes_dir(),
        }
    }

    /// Path of the SQLite database file.
    pub fn database_path(&self) -> Result<PathBuf, config::ConfigError> {
        let dir = match self.dbdir {
            Some(ref dir) => dir.clone(),
            None => default_notes_dir()?,
        };
        Ok(dir.join(DATABASE_FILE))
    }

    pub async fn get_note_store(&self) -> Result<BoxedNoteStore, SetupError> {
        match self.notestoretype {
            NoteStoreType::FlatFile => {
                let root = self.notes_root()?;
                info!(root = %root.display(), "Using the flat-file note store");
                Ok(Box::new(FlatFileStore::open(root)?))
            }
            NoteStoreType::SQLite => {
                let path = self.database_path()?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                if !path.exists() {
                    info!(path = %path.display(), "Database does not exist and will be created");
                }
                info!(path = %path.display(), "Using the SQLite note store");
                Ok(Box::new(SQLiteStoreBuilder::with_path(path).build().await?))
            }
        }
    }

    pub fn cors_origin(&self) -> Option<String> {
        Some(self.corsorigin.trim().to_owned()).filter(|o| !o.is_empty())
    }

    /// Settings of the auth provider, required unless auth is disabled.
    pub fn auth_settings(&self) -> Result<Option<&AuthSettings>, config::ConfigError> {
        if self.disableauth {
            return Ok(None);
        }
        self.auth.as_ref().map(Some).ok_or_else(|| {
            config::ConfigError::Message(
                "the keys under auth must be configured unless disableauth is set".to_owned(),
            )
        })
    }
}

lazy_static! {
    pub static ref CONFIGURATION: Settings =
        get_configuration().expect("Failed to read configuration.yml.");
}

/// Use the `NOTES_API_*` variables of older deployments as defaults.
fn legacy_env_defaults<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    if let Some(dir) = var("NOTES_API_DB_DIR") {
        builder = builder.set_default("dbdir", dir)?;
    }
    if let Some(port) = var("NOTES_API_PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
        builder = builder.set_default("port", i64::from(port))?;
    }
    if var("NOTES_API_DISABLE_AUTH").is_some() {
        builder = builder.set_default("disableauth", true)?;
    }
    if let Some(url) = var("NOTES_API_AUTH_PROVIDER_URL") {
        builder = builder.set_default("auth.providerurl", url)?;
    }
    if let Some(url) = var("NOTES_API_REDIRECT_URL") {
        builder = builder.set_default("auth.redirecturl", url)?;
    }
    Ok(builder)
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let builder = config::Config::builder()
        .set_default("debug", false)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 3333)?
        .set_default("notestoretype", "SQLite")?
        .set_default("disableauth", false)?
        .set_default("corsorigin", DEFAULT_CORS_ORIGIN)?;
    let config = legacy_env_defaults(builder, |name| std::env::var(name).ok())?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::default()
                .prefix("notecase")
                .separator("_"),
        )
        .build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(disableauth: bool) -> Settings {
        Settings {
            host: "127.0.0.1".to_owned(),
            port: 0,
            debug: false,
            notestoretype: NoteStoreType::FlatFile,
            notesroot: Some("/srv/notes".into()),
            dbdir: Some("/srv/db".into()),
            disableauth,
            corsorigin: DEFAULT_CORS_ORIGIN.to_owned(),
            auth: None,
        }
    }

    #[test]
    fn explicit_directories() {
        let s = settings(true);
        assert_eq!(s.notes_root().unwrap(), PathBuf::from("/srv/notes"));
        assert_eq!(
            s.database_path().unwrap(),
            PathBuf::from("/srv/db/notes.sqlite")
        );
    }

    #[test]
    fn auth_settings_required_unless_disabled() {
        assert!(settings(true).auth_settings().unwrap().is_none());
        assert!(settings(false).auth_settings().is_err());
        let mut s = settings(false);
        s.auth = Some(AuthSettings {
            providerurl: "https://id.example.com/realms/notes".to_owned(),
            redirecturl: "http://localhost:3333/auth/callback".to_owned(),
            clientid: default_client_id(),
            clientsecret: None,
        });
        assert_eq!(s.auth_settings().unwrap().unwrap().clientid, "notes-api");
    }

    #[test]
    fn legacy_env_vars_are_defaults() {
        let env = [
            ("NOTES_API_DB_DIR", "/var/lib/notes"),
            ("NOTES_API_PORT", "4000"),
            ("NOTES_API_DISABLE_AUTH", " 1 "),
            ("NOTES_API_AUTH_PROVIDER_URL", "https://id.example.com/realms/notes"),
            ("NOTES_API_REDIRECT_URL", "http://localhost:4000/auth/callback"),
        ];
        let lookup = |name: &str| {
            env.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        };
        let builder = config::Config::builder()
            .set_default("port", 3333)
            .unwrap()
            .set_default("disableauth", false)
            .unwrap();
        let config = legacy_env_defaults(builder, lookup)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.get::<String>("dbdir").unwrap(), "/var/lib/notes");
        assert_eq!(config.get::<u16>("port").unwrap(), 4000);
        assert!(config.get::<bool>("disableauth").unwrap());
        assert_eq!(
            config.get::<String>("auth.providerurl").unwrap(),
            "https://id.example.com/realms/notes"
        );
        assert_eq!(
            config.get::<String>("auth.redirecturl").unwrap(),
            "http://localhost:4000/auth/callback"
        );
    }

    #[test]
    fn blank_or_invalid_legacy_env_vars_are_ignored() {
        let env = [
            ("NOTES_API_PORT", "not-a-port"),
            ("NOTES_API_DISABLE_AUTH", "  "),
        ];
        let lookup = |name: &str| {
            env.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        };
        let builder = config::Config::builder()
            .set_default("port", 3333)
            .unwrap()
            .set_default("disableauth", false)
            .unwrap();
        let config = legacy_env_defaults(builder, lookup)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.get::<u16>("port").unwrap(), 3333);
        assert!(!config.get::<bool>("disableauth").unwrap());
        assert!(config.get::<String>("dbdir").is_err());
    }

    #[test]
    fn blank_cors_origin_disables_cors() {
        let mut s = settings(true);
        assert_eq!(s.cors_origin().as_deref(), Some("http://localhost:4444"));
        s.corsorigin = " ".to_owned();
        assert_eq!(s.cors_origin(), None);
    }
}
