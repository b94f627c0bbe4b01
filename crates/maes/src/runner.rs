use std::time::Duration;

use maes_agents::{BehaviorSource, PopulationSimulator, SimError};
use tokio_util::sync::CancellationToken;

use crate::session::{Session, TickReport};

/// Steps a session on a fixed interval until cancelled or a tick limit is
/// reached.
pub struct Runner<S = PopulationSimulator> {
    session: Session<S>,
    interval: Duration,
    cancel: CancellationToken,
}

impl<S: BehaviorSource> Runner<S> {
    pub fn new(session: Session<S>, interval: Duration) -> Self {
        Self {
            session,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Get a cancellation token for stopping the run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run ticks until cancelled, or until `max_ticks` ticks have completed.
    /// `on_tick` sees every report. The session is handed back when the run
    /// ends; a tick failure stops the run and is returned.
    pub async fn run<F>(
        mut self,
        max_ticks: Option<u64>,
        mut on_tick: F,
    ) -> Result<Session<S>, SimError>
    where
        F: FnMut(&TickReport),
    {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            max_ticks,
            "Auto-run starting"
        );

        let mut completed = 0u64;
        while !self.cancel.is_cancelled() && max_ticks.map_or(true, |max| completed < max) {
            let report = self.session.step()?;
            on_tick(&report);
            completed += 1;

            if max_ticks.is_some_and(|max| completed >= max) {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!(completed, "Auto-run shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(completed, "Auto-run stopped");
        Ok(self.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maes_agents::test_support::ScriptedBehaviorSource;
    use maes_models::config::SimConfig;

    fn scripted_session() -> Session<ScriptedBehaviorSource> {
        Session::with_source(&SimConfig::default(), ScriptedBehaviorSource::new(vec![]), Some(3))
            .unwrap()
    }

    #[tokio::test]
    async fn stops_after_max_ticks() {
        let runner = Runner::new(scripted_session(), Duration::from_millis(1));
        let mut seen = Vec::new();
        let session = runner
            .run(Some(4), |report| seen.push(report.tick))
            .await
            .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(session.ticks_run(), 4);
    }

    #[tokio::test]
    async fn cancellation_stops_an_unbounded_run() {
        let runner = Runner::new(scripted_session(), Duration::from_secs(3600));
        let cancel = runner.cancel_token();
        let session = runner
            .run(None, move |_| cancel.cancel())
            .await
            .unwrap();
        assert_eq!(session.ticks_run(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_runner_does_nothing() {
        let runner = Runner::new(scripted_session(), Duration::from_millis(1));
        runner.cancel_token().cancel();
        let session = runner.run(None, |_| {}).await.unwrap();
        assert_eq!(session.ticks_run(), 0);
    }
}
