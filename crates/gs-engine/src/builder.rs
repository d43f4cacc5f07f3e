//! Fluent builder for constructing an [`Engine`].

use gs_core::EngineConfig;
use gs_platform::{Platform, Router, ShortestPathRouter};
use gs_resource::ModelSet;
use tracing::info;

use crate::{Engine, EngineResult};

/// Fluent builder for [`Engine<R>`].
///
/// # Required inputs
///
/// - [`Platform`]: a sealed platform from [`gs_platform::PlatformBuilder`]
///
/// # Optional inputs (have defaults)
///
/// | Method         | Default                    |
/// |----------------|----------------------------|
/// | `.config(c)`   | `EngineConfig::default()`  |
/// | `.router(r)`   | `ShortestPathRouter`       |
///
/// # Example
///
/// ```rust,ignore
/// let mut engine = EngineBuilder::new(platform)
///     .config(EngineConfig { stop_on_veto: true, ..Default::default() })
///     .build()?;
/// engine.run(&mut NoopObserver)?;
/// ```
pub struct EngineBuilder<R: Router = ShortestPathRouter> {
    platform: Platform,
    config:   EngineConfig,
    router:   R,
}

impl EngineBuilder<ShortestPathRouter> {
    pub fn new(platform: Platform) -> Self {
        Self { platform, config: EngineConfig::default(), router: ShortestPathRouter }
    }
}

impl<R: Router> EngineBuilder<R> {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve routes that have no explicit entry with `router` instead.
    pub fn router<R2: Router>(self, router: R2) -> EngineBuilder<R2> {
        EngineBuilder { platform: self.platform, config: self.config, router }
    }

    /// Validate the configuration, create the resource models and return a
    /// ready-to-run [`Engine`] at date zero.
    pub fn build(self) -> EngineResult<Engine<R>> {
        self.config.validate()?;
        let models = ModelSet::new(&self.config, self.platform, self.router)?;
        info!(
            resources = models.table().len(),
            models = models.models().len(),
            update = ?self.config.update_algorithm,
            layout = ?self.config.layout,
            "engine built"
        );
        Ok(Engine::new(self.config, models))
    }
}
