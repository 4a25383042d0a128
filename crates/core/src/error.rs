/// Result alias that carries the custom [`McError`] type.
pub type Result<T> = std::result::Result<T, McError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum McError {
    /// Free-form message for failures that do not deserve their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The machine config could not be parsed as YAML.
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A BCP payload could not be encoded or decoded.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// A sound file could not be decoded.
    #[error("{0}")]
    Decode(#[from] hound::Error),
    /// A configuration section is malformed. Raised while the config is
    /// validated, never while events are played.
    #[error("invalid `{section}` config: {message}")]
    Config { section: String, message: String },
    /// A sound asset could not be created or loaded.
    #[error("sound `{sound}`: {message}")]
    Audio { sound: String, message: String },
    #[error("unknown display target `{0}`")]
    UnknownTarget(String),
    #[error("unknown slide `{0}`")]
    UnknownSlide(String),
    #[error("unknown mode `{0}`")]
    UnknownMode(String),
    /// The asset loader thread has gone away.
    #[error("asset loader thread is no longer running")]
    LoaderDisconnected,
}

impl McError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a configuration error for the named section.
    pub fn config(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            section: section.into(),
            message: message.into(),
        }
    }

    pub fn audio(sound: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Audio {
            sound: sound.into(),
            message: message.into(),
        }
    }
}

impl From<&str> for McError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for McError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_name_their_section() {
        let err = McError::config("slide_player:show_slide_1", "transition requires a type");
        let text = format!("{err}");
        assert!(text.contains("slide_player:show_slide_1"));
        assert!(text.contains("transition requires a type"));
    }

    #[test]
    fn audio_errors_name_the_sound() {
        let err = McError::audio("boing", "no such track");
        assert_eq!(format!("{err}"), "sound `boing`: no such track");
    }
}
