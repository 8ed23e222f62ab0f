/// Fraction of the sentinel that must be on screen to count as visible.
pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// List flags the trigger needs to decide whether to ask for more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadState {
    pub has_next_page: bool,
    pub is_fetching_next_page: bool,
}

/// Watches the end-of-list sentinel and asks for the next page when it comes into view.
///
/// Fires at most once per invisible -> visible transition. [`ScrollTrigger::rearm`]
/// forgets the last visibility so a sentinel that is still on screen after the
/// list grew counts as newly visible.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    threshold: f32,
    visible: bool,
    observing: bool,
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ScrollTrigger {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            visible: false,
            observing: true,
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Report the sentinel's visible ratio. Returns true when the next page should be fetched.
    pub fn on_intersection(&mut self, ratio: f32, state: LoadState) -> bool {
        if !self.observing {
            return false;
        }
        let now_visible = ratio > 0.0 && ratio >= self.threshold;
        let entered = now_visible && !self.visible;
        self.visible = now_visible;
        entered && state.has_next_page && !state.is_fetching_next_page
    }

    /// The sentinel moved (pages were appended or replaced).
    pub fn rearm(&mut self) {
        self.visible = false;
    }

    pub fn observe(&mut self) {
        self.observing = true;
        self.visible = false;
    }

    /// Stop observing. Later reports are ignored.
    pub fn disconnect(&mut self) {
        self.observing = false;
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MORE: LoadState = LoadState {
        has_next_page: true,
        is_fetching_next_page: false,
    };

    #[test]
    fn fires_once_per_visibility_transition() {
        let mut trigger = ScrollTrigger::default();
        assert!(trigger.on_intersection(0.5, MORE));
        assert!(!trigger.on_intersection(0.8, MORE));
        assert!(!trigger.on_intersection(0.0, MORE));
        assert!(trigger.on_intersection(0.2, MORE));
    }

    #[test]
    fn below_threshold_is_invisible() {
        let mut trigger = ScrollTrigger::default();
        assert!(!trigger.on_intersection(0.05, MORE));
        assert!(trigger.on_intersection(0.1, MORE));
    }

    #[test]
    fn respects_list_flags() {
        let mut trigger = ScrollTrigger::default();
        let done = LoadState {
            has_next_page: false,
            is_fetching_next_page: false,
        };
        assert!(!trigger.on_intersection(1.0, done));
        trigger.rearm();
        let busy = LoadState {
            has_next_page: true,
            is_fetching_next_page: true,
        };
        assert!(!trigger.on_intersection(1.0, busy));
    }

    #[test]
    fn rearm_lets_a_visible_sentinel_fire_again() {
        let mut trigger = ScrollTrigger::default();
        assert!(trigger.on_intersection(1.0, MORE));
        trigger.rearm();
        assert!(trigger.on_intersection(1.0, MORE));
    }

    #[test]
    fn disconnected_trigger_is_silent() {
        let mut trigger = ScrollTrigger::default();
        trigger.disconnect();
        assert!(!trigger.is_observing());
        assert!(!trigger.on_intersection(1.0, MORE));
        trigger.observe();
        assert!(trigger.on_intersection(1.0, MORE));
    }
}
