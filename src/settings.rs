use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const APP_FOLDER_NAME: &str = "Classroom-Guard";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PasteGuardConfig {
    #[serde(default = "default_true")]
    pub warn_on_paste: bool,
    #[serde(default = "default_paste_warning_min_chars")]
    pub paste_warning_min_chars: usize,
    #[serde(default = "default_true")]
    pub record_large_pastes: bool,
}

fn default_true() -> bool {
    true
}

fn default_paste_warning_min_chars() -> usize {
    50
}

impl Default for PasteGuardConfig {
    fn default() -> Self {
        Self {
            warn_on_paste: true,
            paste_warning_min_chars: default_paste_warning_min_chars(),
            record_large_pastes: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StudentProfile {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub class_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    pub version: String,
    pub base_path: String,
    #[serde(default)]
    pub student: StudentProfile,
    #[serde(default)]
    pub paste_guard: PasteGuardConfig,
}

pub fn default_base_path() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));

    if let Some(dir) = exe_dir {
        return dir.join("data");
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_FOLDER_NAME)
}

pub fn ensure_base_folders(base: &Path) -> io::Result<()> {
    let dirs = [
        base.to_path_buf(),
        base.join("submissions"),
        base.join("config"),
        base.join("logs"),
    ];

    for d in dirs {
        if !d.exists() {
            fs::create_dir_all(&d)?;
        }
    }

    Ok(())
}

pub fn settings_path(base: &Path) -> PathBuf {
    base.join("config").join("settings.json")
}

fn default_settings(base: &Path) -> Settings {
    Settings {
        version: env!("CARGO_PKG_VERSION").to_string(),
        base_path: base.to_string_lossy().to_string(),
        student: StudentProfile {
            student_id: "student-id-placeholder".to_string(),
            student_name: "Student".to_string(),
            class_id: "class-placeholder".to_string(),
        },
        paste_guard: PasteGuardConfig::default(),
    }
}

pub fn load_or_init_settings(base: &Path) -> io::Result<Settings> {
    let config_path = settings_path(base);

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let mut settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON parse error: {e}")))?;

        // Ensure base_path stays in sync with the current base
        if settings.base_path != base.to_string_lossy() {
            settings.base_path = base.to_string_lossy().to_string();
        }
        return Ok(settings);
    }

    let settings = default_settings(base);
    save_settings(&settings, base)?;
    tracing::info!(path = %config_path.display(), "wrote default settings");
    Ok(settings)
}

pub fn save_settings(settings: &Settings, base: &Path) -> io::Result<()> {
    let config_path = settings_path(base);
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON encode error: {e}")))?;
    fs::write(&config_path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        ensure_base_folders(dir.path()).unwrap();

        let settings = load_or_init_settings(dir.path()).unwrap();
        assert!(settings_path(dir.path()).exists());
        assert!(settings.paste_guard.warn_on_paste);
        assert_eq!(settings.paste_guard.paste_warning_min_chars, 50);

        let again = load_or_init_settings(dir.path()).unwrap();
        assert_eq!(settings, again);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        ensure_base_folders(dir.path()).unwrap();
        fs::write(
            settings_path(dir.path()),
            r#"{ "version": "0.1.0", "base_path": "/somewhere/else" }"#,
        )
        .unwrap();

        let settings = load_or_init_settings(dir.path()).unwrap();
        assert_eq!(settings.paste_guard, PasteGuardConfig::default());
        assert_eq!(settings.student, StudentProfile::default());
        assert_eq!(settings.base_path, dir.path().to_string_lossy());
    }

    #[test]
    fn broken_settings_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        ensure_base_folders(dir.path()).unwrap();
        fs::write(settings_path(dir.path()), "{ not json").unwrap();

        let err = load_or_init_settings(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
