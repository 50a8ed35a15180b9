use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    osc: OscConfig,
    #[serde(default)]
    surface: SurfaceConfig,
    #[serde(default)]
    clip_engine: ClipEngineConfig,
}

#[derive(Deserialize, Default)]
struct OscConfig {
    reaper_ip: Option<String>,
    reaper_port: Option<u16>,
    listen_port: Option<u16>,
}

#[derive(Deserialize, Default)]
struct SurfaceConfig {
    fps: Option<u32>,
    midi_port: Option<String>,
    use_user_port: Option<bool>,
}

#[derive(Deserialize, Default)]
struct ClipEngineConfig {
    enabled: Option<bool>,
    host: Option<String>,
    port: Option<u16>,
    matrix_id: Option<u32>,
}

pub struct Config {
    osc: OscConfig,
    surface: SurfaceConfig,
    clip_engine: ClipEngineConfig,
}

impl Config {
    /// Embedded defaults, then the user file (or `path` when given), then
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Self {
        let file = path.map(Path::to_path_buf).or_else(user_config_path);
        Self::load_with(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Layering with an explicit file and environment lookup.
    pub fn load_with(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = path.filter(|p| p.exists()) {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => {
                        merge_osc(&mut base.osc, user.osc);
                        merge_surface(&mut base.surface, user.surface);
                        merge_clip_engine(&mut base.clip_engine, user.clip_engine);
                        log::info!(target: "config", "loaded {}", path.display());
                    }
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }

        apply_env(&mut base, env);

        Config {
            osc: base.osc,
            surface: base.surface,
            clip_engine: base.clip_engine,
        }
    }

    pub fn reaper_ip(&self) -> &str {
        self.osc.reaper_ip.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn reaper_port(&self) -> u16 {
        self.osc.reaper_port.unwrap_or(8000)
    }

    pub fn listen_port(&self) -> u16 {
        self.osc.listen_port.unwrap_or(9000)
    }

    /// Render rate (clamped to 1..=120).
    pub fn fps(&self) -> u32 {
        self.surface.fps.unwrap_or(30).clamp(1, 120)
    }

    /// Substring matched against MIDI port names.
    pub fn midi_port(&self) -> &str {
        self.surface.midi_port.as_deref().unwrap_or("Ableton Push 2")
    }

    /// Use the surface's user port rather than its live port.
    pub fn use_user_port(&self) -> bool {
        self.surface.use_user_port.unwrap_or(false)
    }

    pub fn clip_engine_enabled(&self) -> bool {
        self.clip_engine.enabled.unwrap_or(true)
    }

    pub fn clip_engine_host(&self) -> &str {
        self.clip_engine.host.as_deref().unwrap_or("localhost")
    }

    pub fn clip_engine_port(&self) -> u16 {
        self.clip_engine.port.unwrap_or(39051)
    }

    pub fn matrix_id(&self) -> u32 {
        self.clip_engine.matrix_id.unwrap_or(0)
    }
}

/// `<config dir>/padbridge`, also home of the log file.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("padbridge"))
}

fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

fn apply_env(base: &mut ConfigFile, env: impl Fn(&str) -> Option<String>) {
    fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
        let raw = raw?;
        match raw.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!(target: "config", "ignoring {}={:?}: not a number", key, raw);
                None
            }
        }
    }

    if let Some(ip) = env("REAPER_OSC_IP") {
        base.osc.reaper_ip = Some(ip);
    }
    if let Some(port) = parsed("REAPER_OSC_PORT", env("REAPER_OSC_PORT")) {
        base.osc.reaper_port = Some(port);
    }
    if let Some(port) = parsed("LISTEN_PORT", env("LISTEN_PORT")) {
        base.osc.listen_port = Some(port);
    }
    if let Some(fps) = parsed("DISPLAY_FPS", env("DISPLAY_FPS")) {
        base.surface.fps = Some(fps);
    }
    if let Some(host) = env("PLAYTIME_HOST") {
        base.clip_engine.host = Some(host);
    }
    if let Some(port) = parsed("PLAYTIME_PORT", env("PLAYTIME_PORT")) {
        base.clip_engine.port = Some(port);
    }
}

fn merge_osc(base: &mut OscConfig, user: OscConfig) {
    if user.reaper_ip.is_some() {
        base.reaper_ip = user.reaper_ip;
    }
    if user.reaper_port.is_some() {
        base.reaper_port = user.reaper_port;
    }
    if user.listen_port.is_some() {
        base.listen_port = user.listen_port;
    }
}

fn merge_surface(base: &mut SurfaceConfig, user: SurfaceConfig) {
    if user.fps.is_some() {
        base.fps = user.fps;
    }
    if user.midi_port.is_some() {
        base.midi_port = user.midi_port;
    }
    if user.use_user_port.is_some() {
        base.use_user_port = user.use_user_port;
    }
}

fn merge_clip_engine(base: &mut ClipEngineConfig, user: ClipEngineConfig) {
    if user.enabled.is_some() {
        base.enabled = user.enabled;
    }
    if user.host.is_some() {
        base.host = user.host;
    }
    if user.port.is_some() {
        base.port = user.port;
    }
    if user.matrix_id.is_some() {
        base.matrix_id = user.matrix_id;
    }
}
