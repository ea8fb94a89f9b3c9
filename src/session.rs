//! Per-visitor state: every carousel on the page plus the caption overrides.
//!
//! A session is built fresh on each page load (or `play` run) and discarded
//! afterwards; carousel position is never persisted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::caption::{caption_for, CaptionOverrides};
use crate::caption_store::{CaptionStore, ExportBlob};
use crate::carousel::CarouselController;
use crate::config::Configuration;
use crate::error::Error;
use crate::scan::ImageAsset;

#[derive(Debug, Clone)]
pub struct NamedCarousel {
    pub name: String,
    pub param: String,
    pub controller: CarouselController,
}

/// Result of an explicit caption save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The store refused the write; overrides stay in memory and can be
    /// downloaded instead.
    Fallback(ExportBlob),
}

/// Message left by the last caption save for the next render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Saved,
    SaveFailed,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Self::Saved => "Captions saved.",
            Self::SaveFailed => {
                "Captions could not be written here. Download captions.json and place it next to the site."
            }
        }
    }

    /// Only a failed save needs the export link.
    pub fn offers_download(self) -> bool {
        matches!(self, Self::SaveFailed)
    }
}

pub struct Session {
    carousels: Vec<NamedCarousel>,
    overrides: CaptionOverrides,
    store: Arc<dyn CaptionStore>,
    notice: Option<Notice>,
}

impl Session {
    /// Resolve every configured carousel and load caption overrides.
    pub fn start(cfg: &Configuration, store: Arc<dyn CaptionStore>, now: Instant) -> Self {
        let carousels = cfg
            .carousels
            .iter()
            .map(|c| {
                let items = cfg.image_source(c).list();
                debug!(carousel = %c.name, count = items.len(), "resolved carousel images");
                NamedCarousel {
                    name: c.name.clone(),
                    param: c.param().to_string(),
                    controller: CarouselController::new(items, c.settings(), now),
                }
            })
            .collect();
        Self::with_carousels(carousels, store)
    }

    pub fn with_carousels(carousels: Vec<NamedCarousel>, store: Arc<dyn CaptionStore>) -> Self {
        let overrides = store.load();
        Self {
            carousels,
            overrides,
            store,
            notice: None,
        }
    }

    pub fn carousels(&self) -> &[NamedCarousel] {
        &self.carousels
    }

    pub fn carousel(&self, name: &str) -> Result<&CarouselController, Error> {
        self.carousels
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.controller)
            .ok_or_else(|| Error::UnknownCarousel(name.to_string()))
    }

    pub fn carousel_mut(&mut self, name: &str) -> Result<&mut CarouselController, Error> {
        self.carousels
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.controller)
            .ok_or_else(|| Error::UnknownCarousel(name.to_string()))
    }

    /// Autoplay check run at the top of every render pass. Returns the names
    /// of the carousels that advanced.
    pub fn render_pass(&mut self, now: Instant) -> Vec<String> {
        self.carousels
            .iter_mut()
            .filter_map(|c| c.controller.tick(now).then(|| c.name.clone()))
            .collect()
    }

    /// Apply navigation query parameters. Returns `true` if any parameter
    /// named a carousel; malformed values are ignored.
    pub fn apply_query(&mut self, query: &HashMap<String, String>, now: Instant) -> bool {
        let mut matched = false;
        for c in &mut self.carousels {
            if let Some(raw) = query.get(&c.param) {
                c.controller.jump_to_param(raw, now);
                matched = true;
            }
        }
        matched
    }

    /// Shortest wait before any carousel is due to advance.
    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        self.carousels
            .iter()
            .filter_map(|c| c.controller.until_due(now))
            .min()
    }

    pub fn caption_for(&self, asset: &ImageAsset) -> String {
        caption_for(asset, &self.overrides)
    }

    pub fn overrides(&self) -> &CaptionOverrides {
        &self.overrides
    }

    pub fn edit_caption(&mut self, stem: &str, caption: &str) {
        debug!(stem, "caption edited");
        self.overrides.edit(stem, caption);
    }

    /// Persist overrides; on failure keep them and hand back a download.
    pub fn save_captions(&mut self) -> Result<SaveOutcome, Error> {
        match self.store.save(&self.overrides) {
            Ok(()) => {
                self.notice = Some(Notice::Saved);
                Ok(SaveOutcome::Saved)
            }
            Err(err) => {
                warn!(%err, "caption save failed; offering download");
                self.notice = Some(Notice::SaveFailed);
                Ok(SaveOutcome::Fallback(self.export_captions()?))
            }
        }
    }

    pub fn export_captions(&self) -> Result<ExportBlob, Error> {
        ExportBlob::from_overrides(&self.overrides)
    }

    pub fn log_summary(&self) {
        for c in &self.carousels {
            info!(
                carousel = %c.name,
                param = %c.param,
                images = c.controller.len(),
                "carousel ready"
            );
        }
    }

    /// Informational message from the last save, cleared once read.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("carousels", &self.carousels)
            .field("overrides", &self.overrides)
            .field("notice", &self.notice)
            .finish_non_exhaustive()
    }
}

