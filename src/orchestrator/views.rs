//! View switcher state.
//!
//! A transition deactivates the current view at once and activates the next
//! one after the configured delay. Each transition gets an epoch so a delayed
//! activation that was superseded by a newer transition is dropped.

use crate::model::View;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ViewState {
    active: Option<View>,
    pending: Option<(View, u64)>,
    epoch: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            active: Some(View::Input),
            pending: None,
            epoch: 0,
        }
    }
}

impl ViewState {
    #[cfg(test)]
    pub fn active(&self) -> Option<View> {
        self.active
    }

    /// The view the user is on or about to be on.
    pub fn current(&self) -> Option<View> {
        self.pending.map(|(v, _)| v).or(self.active)
    }

    /// Start a transition to `to`. Returns the deactivated view (if any) and the
    /// epoch the delayed activation must present.
    pub fn begin(&mut self, to: View) -> (Option<View>, u64) {
        self.epoch += 1;
        let left = self.active.take();
        self.pending = Some((to, self.epoch));
        (left, self.epoch)
    }

    /// Complete a delayed activation. Returns `false` for stale epochs.
    pub fn activate(&mut self, view: View, epoch: u64) -> bool {
        match self.pending {
            Some((v, e)) if v == view && e == epoch => {
                self.pending = None;
                self.active = Some(view);
                true
            }
            _ => false,
        }
    }
}
