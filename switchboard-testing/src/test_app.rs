// Test application builder

use crate::TestClient;
use std::num::NonZeroUsize;
use std::sync::Arc;
use switchboard_core::{
    DispatchConfig, Dispatcher, HandlerClass, HandlerRegistry, RegistrationError,
};

/// A sealed registry and a dispatcher over it, ready to take requests.
#[derive(Debug, Clone)]
pub struct TestApp {
    pub dispatcher: Dispatcher,
}

impl TestApp {
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        self.dispatcher.registry()
    }

    /// Create a test client for making requests
    pub fn client(&self) -> TestClient {
        TestClient::new(self.dispatcher.clone())
    }
}

/// Builder for test applications
pub struct TestAppBuilder {
    classes: Vec<HandlerClass>,
    config: DispatchConfig,
    workers: Option<NonZeroUsize>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            config: DispatchConfig::default(),
            workers: None,
        }
    }

    /// Add a handler class to the registration batch.
    pub fn class(mut self, class: HandlerClass) -> Self {
        self.classes.push(class);
        self
    }

    pub fn classes(mut self, classes: impl IntoIterator<Item = HandlerClass>) -> Self {
        self.classes.extend(classes);
        self
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of discovery workers used when sealing the registry.
    pub fn workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Register every class and seal the registry.
    pub fn try_build(self) -> Result<TestApp, RegistrationError> {
        let registry = match self.workers {
            Some(workers) => HandlerRegistry::new().with_workers(workers),
            None => HandlerRegistry::new(),
        };
        let registry = Arc::new(registry);
        registry.register(self.classes)?;
        Ok(TestApp {
            dispatcher: Dispatcher::new(registry, Arc::new(self.config)),
        })
    }

    /// Like [`try_build`](Self::try_build), panicking on a registration error.
    pub fn build(self) -> TestApp {
        match self.try_build() {
            Ok(app) => app,
            Err(err) => panic!("test app registration failed: {}", err),
        }
    }
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
