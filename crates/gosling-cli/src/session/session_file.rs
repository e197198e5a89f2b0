use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use gosling::models::message::Message;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("Failed to open {path} for writing")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open {path} for reading")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path} ({source})")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid save file format in {path}")]
    Format { path: String },
}

#[derive(Serialize)]
struct SavedSession<'a> {
    model: &'a str,
    messages: &'a [Message],
}

/// What a save file held
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedSession {
    /// `{"model": ..., "messages": [...]}`; either field may be missing
    Current {
        model: Option<String>,
        messages: Option<Vec<Message>>,
    },
    /// A bare message array from before the model was recorded
    Legacy(Vec<Message>),
}

pub fn save(path: &Path, model: &str, messages: &[Message]) -> Result<(), SessionFileError> {
    let write_error = |source| SessionFileError::Write {
        path: path.display().to_string(),
        source,
    };

    let file = fs::File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &SavedSession { model, messages })
        .map_err(|e| write_error(e.into()))?;
    writer.flush().map_err(write_error)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<LoadedSession, SessionFileError> {
    let shown = || path.display().to_string();

    let content = fs::read_to_string(path).map_err(|source| SessionFileError::Read {
        path: shown(),
        source,
    })?;
    let parsed: Value = serde_json::from_str(&content).map_err(|source| SessionFileError::Parse {
        path: shown(),
        source,
    })?;
    let invalid = |_| SessionFileError::Format { path: shown() };

    match parsed {
        Value::Object(mut object) => {
            let model = object
                .get("model")
                .and_then(Value::as_str)
                .map(str::to_string);
            let messages = match object.remove("messages") {
                Some(value @ Value::Array(_)) => Some(serde_json::from_value(value).map_err(invalid)?),
                _ => None,
            };
            Ok(LoadedSession::Current { model, messages })
        }
        value @ Value::Array(_) => Ok(LoadedSession::Legacy(
            serde_json::from_value(value).map_err(invalid)?,
        )),
        _ => Err(SessionFileError::Format { path: shown() }),
    }
}
