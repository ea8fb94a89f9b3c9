use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::carousel::CarouselSettings;
use crate::scan::{ImageSource, ManifestSource, PatternSource};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Page title shown in the browser tab and header.
    pub site_title: String,
    /// Directory scanned for carousel images.
    pub image_dir: PathBuf,
    /// JSON side file holding edited captions.
    pub captions_path: PathBuf,
    /// Listen address for `serve`.
    pub bind_address: SocketAddr,
    /// Delay between autoplay checks when nothing was due.
    #[serde(with = "humantime_serde")]
    pub autoplay_poll: Duration,
    /// Web sessions untouched for this long are dropped.
    #[serde(with = "humantime_serde")]
    pub session_idle: Duration,
    /// Upper bound on live web sessions; the least recently seen go first.
    pub max_sessions: usize,
    /// Carousels rendered on the page, in display order.
    pub carousels: Vec<CarouselConfig>,
    pub contact: ContactConfig,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.carousels.is_empty(),
            "at least one carousel must be configured"
        );
        ensure!(
            self.autoplay_poll > Duration::ZERO,
            "autoplay-poll must be positive"
        );
        ensure!(
            self.session_idle > Duration::ZERO,
            "session-idle must be positive"
        );
        ensure!(self.max_sessions > 0, "max-sessions must be at least 1");
        let mut names = HashSet::new();
        let mut params = HashSet::new();
        for carousel in &self.carousels {
            carousel.validate()?;
            ensure!(
                names.insert(carousel.name.as_str()),
                "duplicate carousel name '{}'",
                carousel.name
            );
            ensure!(
                params.insert(carousel.param()),
                "duplicate carousel param '{}'",
                carousel.param()
            );
        }
        ensure!(
            !self.contact.recipient.trim().is_empty(),
            "contact.recipient must not be empty"
        );
        Ok(self)
    }

    pub fn carousel(&self, name: &str) -> Option<&CarouselConfig> {
        self.carousels.iter().find(|c| c.name == name)
    }

    /// Image source for `carousel`; manifest paths are relative to the image dir.
    pub fn image_source(&self, carousel: &CarouselConfig) -> Box<dyn ImageSource> {
        match &carousel.manifest {
            Some(manifest) => Box::new(ManifestSource {
                manifest: self.image_dir.join(manifest),
                max_count: carousel.max_items,
            }),
            None => Box::new(PatternSource::new(
                self.image_dir.clone(),
                carousel.prefix.clone(),
                carousel.max_items,
            )),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            site_title: "Showcase".to_string(),
            image_dir: PathBuf::from("assets"),
            captions_path: PathBuf::from("captions.json"),
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            autoplay_poll: Duration::from_millis(50),
            session_idle: Duration::from_secs(30 * 60),
            max_sessions: 1024,
            carousels: Vec::new(),
            contact: ContactConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CarouselConfig {
    pub name: String,
    /// Filename prefix used to discover images (`prefix1.jpg`, `prefix*.png`).
    #[serde(default)]
    pub prefix: String,
    /// Query parameter that selects an index; defaults to the carousel name.
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default = "CarouselConfig::default_max_items")]
    pub max_items: usize,
    #[serde(
        default = "CarouselConfig::default_interval",
        with = "humantime_serde"
    )]
    pub interval: Duration,
    #[serde(default = "CarouselConfig::default_reset_timer")]
    pub reset_timer_on_manual_nav: bool,
    /// Optional JSON manifest listing images instead of scanning by prefix.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

impl CarouselConfig {
    const fn default_max_items() -> usize {
        24
    }

    const fn default_interval() -> Duration {
        Duration::from_secs(3)
    }

    const fn default_reset_timer() -> bool {
        true
    }

    pub fn param(&self) -> &str {
        self.param.as_deref().unwrap_or(&self.name)
    }

    pub fn settings(&self) -> CarouselSettings {
        CarouselSettings {
            interval: self.interval,
            reset_timer_on_manual_nav: self.reset_timer_on_manual_nav,
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.name.trim().is_empty(), "carousel name must not be empty");
        ensure!(
            self.name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')),
            "carousel name '{}' may only contain ASCII letters, digits, '-' and '_'",
            self.name
        );
        ensure!(
            self.manifest.is_some() || !self.prefix.is_empty(),
            "carousel '{}' needs a prefix or a manifest",
            self.name
        );
        ensure!(
            self.max_items > 0,
            "carousel '{}': max-items must be greater than zero",
            self.name
        );
        ensure!(
            self.interval > Duration::ZERO,
            "carousel '{}': interval must be positive",
            self.name
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ContactConfig {
    pub recipient: String,
    pub subject: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            recipient: "contato@dapsat.com".to_string(),
            subject: "Contact".to_string(),
        }
    }
}
