//! Alert subscribers.

use shared_types::Alert;

/// Receives every newly raised alert.
///
/// Called synchronously from the sweep, after the `Alert` event is queued.
pub trait AlertHandler: Send + Sync {
    fn on_alert(&self, alert: &Alert);

    fn name(&self) -> &str {
        "alert-handler"
    }
}

/// Adapts a closure into an [`AlertHandler`].
pub struct FnAlertHandler<F> {
    name: String,
    f: F,
}

impl<F> FnAlertHandler<F>
where
    F: Fn(&Alert) + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> AlertHandler for FnAlertHandler<F>
where
    F: Fn(&Alert) + Send + Sync,
{
    fn on_alert(&self, alert: &Alert) {
        (self.f)(alert)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
