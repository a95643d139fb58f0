//! Coalescing of repaint requests into display frames.

/// Host hook that arranges for a paint callback on the next display frame.
///
/// On the web this wraps `requestAnimationFrame`; native hosts usually ask
/// their window for a redraw. The host must call [`RenderScheduler::begin_frame`]
/// and [`RenderScheduler::finish_frame`] around the paint it performs.
pub trait FrameRequester {
    fn request_frame(&mut self);
}

impl<F: FnMut()> FrameRequester for F {
    fn request_frame(&mut self) {
        self()
    }
}

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    /// A frame callback has been requested but has not fired yet.
    Scheduled,
    /// The paint routine is running.
    Painting,
}

/// Ensures at most one paint is pending and no request is lost.
///
/// Any number of requests before a frame fires collapse into that frame. A
/// request that arrives while the paint is running schedules exactly one
/// follow-up frame.
pub struct RenderScheduler {
    requester: Box<dyn FrameRequester>,
    state: FrameState,
    needs_render: bool,
    frames_requested: u64,
}

impl RenderScheduler {
    pub fn new(requester: Box<dyn FrameRequester>) -> Self {
        Self {
            requester,
            state: FrameState::Idle,
            needs_render: false,
            frames_requested: 0,
        }
    }

    /// Ask for a repaint.
    pub fn request_render(&mut self) {
        match self.state {
            FrameState::Idle => {
                self.state = FrameState::Scheduled;
                self.needs_render = false;
                self.frames_requested += 1;
                self.requester.request_frame();
            }
            FrameState::Scheduled | FrameState::Painting => {
                self.needs_render = true;
            }
        }
    }

    /// Called by the host when the frame callback fires, just before painting.
    ///
    /// Returns false for a callback that was not requested by this scheduler.
    pub fn begin_frame(&mut self) -> bool {
        if self.state != FrameState::Scheduled {
            return false;
        }
        self.state = FrameState::Painting;
        // the paint about to run reflects every request made so far
        self.needs_render = false;
        true
    }

    /// Called by the host after painting. Schedules a follow-up frame if a
    /// request arrived during the paint.
    pub fn finish_frame(&mut self) {
        if self.state != FrameState::Painting {
            return;
        }
        self.state = FrameState::Idle;
        if self.needs_render {
            self.request_render();
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn is_frame_pending(&self) -> bool {
        self.state != FrameState::Idle
    }

    /// Total frame callbacks requested from the host.
    pub fn frames_requested(&self) -> u64 {
        self.frames_requested
    }
}

impl std::fmt::Debug for RenderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderScheduler")
            .field("state", &self.state)
            .field("needs_render", &self.needs_render)
            .field("frames_requested", &self.frames_requested)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting() -> (RenderScheduler, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let scheduler = RenderScheduler::new(Box::new(move || counter.set(counter.get() + 1)));
        (scheduler, count)
    }

    #[test]
    fn test_requests_coalesce_into_one_frame() {
        let (mut scheduler, count) = counting();
        for _ in 0..5 {
            scheduler.request_render();
        }
        assert_eq!(count.get(), 1);

        assert!(scheduler.begin_frame());
        scheduler.finish_frame();
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.state(), FrameState::Idle);
    }

    #[test]
    fn test_request_during_paint_schedules_follow_up() {
        let (mut scheduler, count) = counting();
        for _ in 0..5 {
            scheduler.request_render();
        }
        assert!(scheduler.begin_frame());
        scheduler.request_render();
        assert_eq!(count.get(), 1);

        scheduler.finish_frame();
        assert_eq!(count.get(), 2);
        assert_eq!(scheduler.state(), FrameState::Scheduled);

        assert!(scheduler.begin_frame());
        scheduler.finish_frame();
        assert_eq!(count.get(), 2);
        assert!(!scheduler.is_frame_pending());
    }

    #[test]
    fn test_unrequested_frame_is_ignored() {
        let (mut scheduler, count) = counting();
        assert!(!scheduler.begin_frame());
        scheduler.finish_frame();
        assert_eq!(count.get(), 0);
        assert_eq!(scheduler.state(), FrameState::Idle);
    }

    #[test]
    fn test_request_after_frame_schedules_again() {
        let (mut scheduler, count) = counting();
        scheduler.request_render();
        scheduler.begin_frame();
        scheduler.finish_frame();
        scheduler.request_render();
        assert_eq!(count.get(), 2);
        assert_eq!(scheduler.frames_requested(), 2);
    }
}
