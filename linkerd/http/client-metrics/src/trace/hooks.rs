use super::Phase;
use crate::{
    labels::{self, LabelError},
    sink::ObserverVec,
};
use std::{fmt, sync::Arc};

type Hook = Arc<dyn Fn(f64) + Send + Sync>;

/// Callbacks invoked with the number of seconds since a request began when
/// a lifecycle [`Phase`] occurs.
///
/// Any subset of phases may be instrumented; phases without a hook are
/// ignored.
#[derive(Clone, Default)]
pub struct TraceHooks {
    hooks: [Option<Hook>; Phase::ALL.len()],
}

// === impl TraceHooks ===

impl TraceHooks {
    /// Sets the hook invoked when `phase` occurs, replacing any prior hook.
    pub fn on(mut self, phase: Phase, hook: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.hooks[phase.index()] = Some(Arc::new(hook));
        self
    }

    /// Returns the hook for `phase`, if one is set.
    pub fn hook(&self, phase: Phase) -> Option<&(dyn Fn(f64) + Send + Sync)> {
        self.hooks[phase.index()].as_deref()
    }

    /// Returns the phases that have hooks.
    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL
            .into_iter()
            .filter(|p| self.hooks[p.index()].is_some())
    }

    /// Returns hooks that record every phase into `observer`, labeled by
    /// the phase's name.
    ///
    /// Fails unless `observer` is partitioned by exactly one `event` label.
    pub fn observe_events<O>(observer: O) -> Result<Self, LabelError>
    where
        O: ObserverVec + Clone + Send + Sync + 'static,
    {
        labels::check_event_label(&observer)?;
        Ok(Self::observe_unchecked(observer))
    }

    /// Like [`TraceHooks::observe_events`], for an observer whose labels are
    /// known to be valid.
    pub(crate) fn observe_unchecked<O>(observer: O) -> Self
    where
        O: ObserverVec + Clone + Send + Sync + 'static,
    {
        Phase::ALL.into_iter().fold(Self::default(), |hooks, phase| {
            let observer = observer.clone();
            hooks.on(phase, move |secs| observer.observe(secs, &[phase.as_str()]))
        })
    }
}

impl fmt::Debug for TraceHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.phases()).finish()
    }
}
