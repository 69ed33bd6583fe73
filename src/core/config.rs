//! Process-wide configuration parsed from the environment (§6), and the
//! lazily-initialized global "factory" singleton (§9: "Global mutable state").
//!
//! This mirrors the teacher's `AppSettings`/`AppBuilder` pair: a frozen
//! settings struct built once, here sourced from environment variables
//! instead of caller-supplied fields, plus a process-wide instance/loader
//! state with an `init-on-first-device` / `shutdown-on-last-device-release`
//! lifecycle.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use log::LevelFilter;

/// Parsed `VKD3D_CONFIG` flags (comma-separated).
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigFlag {
    VkDebug,
    Dxr,
    SingleQueue,
    ForceStaticCbv,
    UploadHvv,
    #[default]
    Unknown,
}

impl From<&str> for ConfigFlag {
    fn from(value: &str) -> Self {
        match value {
            "vk_debug" => ConfigFlag::VkDebug,
            "dxr" => ConfigFlag::Dxr,
            "single_queue" => ConfigFlag::SingleQueue,
            "force_static_cbv" => ConfigFlag::ForceStaticCbv,
            "upload_hvv" => ConfigFlag::UploadHvv,
            _ => ConfigFlag::Unknown,
        }
    }
}

/// Process-wide configuration, parsed once from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed `VKD3D_CONFIG` comma-list.
    pub flags: HashSet<ConfigFlag>,
    /// `VKD3D_DEBUG` log level, also used as a fallback for `VKD3D_SHADER_DEBUG`.
    pub debug_level: LevelFilter,
    /// `VKD3D_SHADER_DUMP_PATH`: directory DXBC blobs get dumped to before
    /// being handed to the (external) shader compiler.
    pub shader_dump_path: Option<PathBuf>,
    /// `VKD3D_PROFILE_PATH`: chrome-trace JSON sink for the submission engine.
    pub profile_path: Option<PathBuf>,
    /// `VKD3D_QUEUE_PROFILE`: file path to write the per-queue timeline trace
    /// to, if set (§6; the queue-timeline observer's output, distinct from
    /// `profile_path` which sinks the submission engine's own trace).
    pub queue_profile_path: Option<PathBuf>,
    /// `VKD3D_HUD`: comma list of HUD element names. Parsed but otherwise
    /// inert here -- HUD rendering is a Non-goal; this only keeps the
    /// environment contract intact for whatever external HUD collaborator
    /// reads it.
    pub hud: Option<String>,
    /// `VKD3D_AFTERMATH`: enables the (external) Aftermath integration hook.
    pub aftermath: bool,
    /// `VKD3D_AUTO_CAPTURE_SHADER` / `VKD3D_AUTO_CAPTURE_COUNTS`: RenderDoc
    /// auto-capture triggers, forwarded to the (external) RenderDoc collaborator.
    pub auto_capture_shader_hash: Option<u64>,
    pub auto_capture_count: Option<u32>,
}

fn parse_env_flags(raw: &str) -> HashSet<ConfigFlag> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ConfigFlag::from)
        .collect()
}

fn parse_level(raw: &str) -> LevelFilter {
    match raw.to_ascii_lowercase().as_str() {
        "none" => LevelFilter::Off,
        "err" | "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "fixme" | "info" => LevelFilter::Info,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    }
}

impl Config {
    /// Build configuration from the current process environment. Unset
    /// variables fall back to vkd3d-proton's documented defaults.
    pub fn from_env() -> Self {
        let flags = std::env::var("VKD3D_CONFIG")
            .map(|raw| parse_env_flags(&raw))
            .unwrap_or_default();
        let debug_level = std::env::var("VKD3D_DEBUG")
            .map(|raw| parse_level(&raw))
            .unwrap_or(LevelFilter::Warn);
        Config {
            flags,
            debug_level,
            shader_dump_path: std::env::var_os("VKD3D_SHADER_DUMP_PATH").map(PathBuf::from),
            profile_path: std::env::var_os("VKD3D_PROFILE_PATH").map(PathBuf::from),
            queue_profile_path: std::env::var_os("VKD3D_QUEUE_PROFILE").map(PathBuf::from),
            hud: std::env::var("VKD3D_HUD").ok(),
            aftermath: std::env::var_os("VKD3D_AFTERMATH").is_some(),
            auto_capture_shader_hash: std::env::var("VKD3D_AUTO_CAPTURE_SHADER")
                .ok()
                .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()),
            auto_capture_count: std::env::var("VKD3D_AUTO_CAPTURE_COUNTS")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    pub fn has_flag(&self, flag: ConfigFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Process-wide "factory" state: the parsed config plus anything else that
/// must exist exactly once regardless of how many devices get created and
/// torn down (§9). Created on first access, torn down explicitly by
/// [`shutdown`].
struct Factory {
    config: Config,
}

static FACTORY: OnceLock<Mutex<Option<Factory>>> = OnceLock::new();

fn factory_cell() -> &'static Mutex<Option<Factory>> {
    FACTORY.get_or_init(|| Mutex::new(None))
}

/// Returns the process-wide configuration, parsing the environment on first call.
pub fn global_config() -> Config {
    let mut guard = factory_cell().lock().unwrap();
    if guard.is_none() {
        *guard = Some(Factory {
            config: Config::from_env(),
        });
    }
    guard.as_ref().unwrap().config.clone()
}

/// Tears down the process-wide factory state. Call this after the last
/// device has been released; a subsequent call to [`global_config`] will
/// re-parse the environment and create a fresh factory.
pub fn shutdown() {
    let mut guard = factory_cell().lock().unwrap();
    *guard = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_flags() {
        let flags = parse_env_flags("vk_debug,dxr,single_queue");
        assert!(flags.contains(&ConfigFlag::VkDebug));
        assert!(flags.contains(&ConfigFlag::Dxr));
        assert!(flags.contains(&ConfigFlag::SingleQueue));
    }

    #[test]
    fn unknown_flags_are_tolerated() {
        let flags = parse_env_flags("not_a_real_flag");
        assert!(flags.contains(&ConfigFlag::Unknown));
    }
}
