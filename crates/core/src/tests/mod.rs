use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::callback::CallbackError;
use crate::callback::Delivery;
use crate::callback::OverlayCallback;
use crate::callback::RouteFailure;
use crate::config::OverlayConfig;
use crate::error::Result;
use crate::identity::Identity;
use crate::overlay::Overlay;

pub mod default;

#[allow(dead_code)]
pub fn setup_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    // another test may have installed it already
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Records everything an overlay reports.
#[derive(Default)]
pub struct Recorder {
    deliveries: Mutex<Vec<Delivery>>,
    failures: Mutex<Vec<RouteFailure>>,
    inserted: Mutex<Vec<Identity>>,
}

impl Recorder {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<RouteFailure> {
        self.failures.lock().unwrap().clone()
    }

    pub fn inserted(&self) -> Vec<Identity> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl OverlayCallback for Recorder {
    async fn on_delivered(&self, delivery: &Delivery) -> std::result::Result<(), CallbackError> {
        self.deliveries.lock().unwrap().push(delivery.clone());
        Ok(())
    }

    async fn on_failed(&self, failure: &RouteFailure) -> std::result::Result<(), CallbackError> {
        self.failures.lock().unwrap().push(failure.clone());
        Ok(())
    }

    async fn on_inserted(&self, node: Identity) -> std::result::Result<(), CallbackError> {
        self.inserted.lock().unwrap().push(node);
        Ok(())
    }
}

/// An overlay of `n` settled nodes, with a recorder installed.
pub async fn prepare_overlay(n: usize, config: OverlayConfig) -> Result<(Overlay, Arc<Recorder>)> {
    let mut overlay = Overlay::new(config)?;
    let recorder = Arc::new(Recorder::default());
    overlay.set_callback(recorder.clone())?;
    overlay.populate(n).await?;
    Ok((overlay, recorder))
}
