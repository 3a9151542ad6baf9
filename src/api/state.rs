use std::sync::Arc;

use crate::config::Config;
use crate::convert::Converter;
use crate::observability::Metrics;
use crate::render::TemplateRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub converter: Arc<Converter>,
    pub templates: Arc<TemplateRegistry>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        converter: Converter,
        templates: TemplateRegistry,
    ) -> Self {
        Self {
            config: Arc::new(config),
            converter: Arc::new(converter),
            templates: Arc::new(templates),
            metrics: Arc::new(Metrics::new()),
        }
    }
}
