//! The blocking "working" indicator shown while a job runs.

/// Something that can signal a running export to the user.
pub trait ProgressIndicator: Send + Sync {
    fn show(&self, job_id: &str, label: &str);
    fn hide(&self, job_id: &str);
}

/// Logs indicator changes; the default when nothing is drawn on screen.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingIndicator;

impl ProgressIndicator for TracingIndicator {
    fn show(&self, job_id: &str, label: &str) {
        tracing::info!("[{}] {}", job_id, label);
    }

    fn hide(&self, job_id: &str) {
        tracing::debug!("[{}] indicator hidden", job_id);
    }
}

/// Shows an indicator on creation and hides it when dropped.
///
/// Because hiding happens in `Drop`, it runs on every exit path of the
/// scope holding the guard, including `?` returns and panics.
pub struct IndicatorGuard<'a> {
    indicator: &'a dyn ProgressIndicator,
    job_id: String,
}

impl<'a> IndicatorGuard<'a> {
    pub fn show(indicator: &'a dyn ProgressIndicator, job_id: &str, label: &str) -> Self {
        indicator.show(job_id, label);
        Self {
            indicator,
            job_id: job_id.to_string(),
        }
    }
}

impl Drop for IndicatorGuard<'_> {
    fn drop(&mut self) {
        self.indicator.hide(&self.job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl ProgressIndicator for Recorder {
        fn show(&self, job_id: &str, _label: &str) {
            self.calls.lock().unwrap().push(format!("show {}", job_id));
        }

        fn hide(&self, job_id: &str) {
            self.calls.lock().unwrap().push(format!("hide {}", job_id));
        }
    }

    fn fallible(indicator: &dyn ProgressIndicator, fail: bool) -> Result<(), String> {
        let _guard = IndicatorGuard::show(indicator, "job", "Exporting");
        if fail {
            return Err("boom".to_string());
        }
        Ok(())
    }

    #[test]
    fn test_hidden_on_success_and_early_return() {
        let recorder = Recorder::default();
        assert!(fallible(&recorder, false).is_ok());
        assert!(fallible(&recorder, true).is_err());

        assert_eq!(
            *recorder.calls.lock().unwrap(),
            ["show job", "hide job", "show job", "hide job"]
        );
    }

    #[test]
    fn test_hidden_on_panic() {
        let recorder = Recorder::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = IndicatorGuard::show(&recorder, "job", "Exporting");
            panic!("emitter exploded");
        }));

        assert!(result.is_err());
        assert_eq!(*recorder.calls.lock().unwrap(), ["show job", "hide job"]);
    }
}
