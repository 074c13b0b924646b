use {
    crate::{
        backend::{Mode, OutputId, WakeupTimer},
        config::{LatencyPolicy, RenderTimeEstimator},
        state::State,
        time::{Clock, Time},
        utils::{clonecell::CloneCell, numcell::NumCell},
    },
    num_traits::ToPrimitive,
    std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
        rc::Rc,
        time::Duration,
    },
};

/// Headroom subtracted from the computed wakeup to absorb event-loop
/// jitter.
const SAFETY_MARGIN_NSEC: u64 = 500_000;

/// Assumed vblank interval while the real refresh rate is unknown.
const NOMINAL_REFRESH_NSEC: u64 = 16_666_666;

const JOURNAL_LENGTH: usize = 32;

/// Notified once the real presentation time of a frame is known.
pub trait PresentationListener {
    fn presented(&self, output: OutputId, time: Time);
}

/// The per-output frame scheduler.
///
/// Decides when compositing for the next frame starts: late enough to
/// minimize the time between compositing and presentation, early enough
/// that the expected render time still fits before the next vblank.
pub struct RenderLoop {
    state: Rc<State>,
    output_id: OutputId,
    refresh_nsec: Cell<u64>,
    last_present_nsec: Cell<u64>,
    next_present_nsec: Cell<u64>,
    pending_frames: NumCell<u32>,
    inhibit_count: NumCell<u32>,
    timer_armed: Cell<bool>,
    repaint_delayed: Cell<bool>,
    removed: Cell<bool>,
    latency_policy: Cell<LatencyPolicy>,
    estimator: Cell<RenderTimeEstimator>,
    journal: RefCell<RenderJournal>,
    frame_start: Cell<Option<Time>>,
    listener: CloneCell<Option<Rc<dyn PresentationListener>>>,
}

impl RenderLoop {
    pub fn new(state: &Rc<State>, output_id: OutputId) -> Rc<Self> {
        Rc::new(Self {
            state: state.clone(),
            output_id,
            refresh_nsec: Cell::new(0),
            last_present_nsec: Cell::new(0),
            next_present_nsec: Cell::new(0),
            pending_frames: Default::default(),
            inhibit_count: Default::default(),
            timer_armed: Cell::new(false),
            repaint_delayed: Cell::new(false),
            removed: Cell::new(false),
            latency_policy: Default::default(),
            estimator: Default::default(),
            journal: Default::default(),
            frame_start: Cell::new(None),
            listener: Default::default(),
        })
    }

    pub fn set_mode(&self, mode: Mode) {
        let nsec = match refresh_to_interval(mode.refresh_rate_millihz) {
            Some(n) => n,
            None => {
                if mode.refresh_rate_millihz != 0 {
                    log::warn!(
                        "Output {}: cannot derive a refresh interval from {} mHz",
                        self.output_id,
                        mode.refresh_rate_millihz,
                    );
                }
                0
            }
        };
        self.refresh_nsec.set(nsec);
    }

    pub fn set_latency_policy(&self, policy: LatencyPolicy) {
        self.latency_policy.set(policy);
    }

    pub fn set_render_time_estimator(&self, estimator: RenderTimeEstimator) {
        self.estimator.set(estimator);
    }

    pub fn set_presentation_listener(&self, listener: Option<Rc<dyn PresentationListener>>) {
        self.listener.set(listener);
    }

    pub fn inhibited(&self) -> bool {
        self.inhibit_count.get() > 0
    }

    pub fn pending_frames(&self) -> u32 {
        self.pending_frames.get()
    }

    pub fn last_presentation(&self) -> Time {
        Time::from_nsec(self.last_present_nsec.get())
    }

    pub fn next_presentation(&self) -> Time {
        Time::from_nsec(self.next_present_nsec.get())
    }

    /// Suspends frame scheduling. Reentrant.
    pub fn inhibit(&self) {
        if self.inhibit_count.fetch_add(1) == 0 && self.timer_armed.replace(false) {
            self.state.timer.get().program(self.output_id, None);
            self.repaint_delayed.set(true);
        }
    }

    pub fn uninhibit(&self) {
        if self.inhibit_count.get() == 0 {
            log::error!(
                "Output {}: uninhibit called without a matching inhibit",
                self.output_id,
            );
            return;
        }
        if self.inhibit_count.fetch_sub(1) == 1 {
            self.maybe_schedule_repaint();
        }
    }

    /// Requests that a frame be composited soon. While a frame is in flight
    /// or the loop is inhibited, the request is remembered and replayed
    /// once the guard clears. Idempotent.
    pub fn schedule_repaint(&self) {
        if self.removed.get() {
            return;
        }
        if self.inhibited() || self.pending_frames.get() > 0 {
            self.repaint_delayed.set(true);
            return;
        }
        if self.timer_armed.replace(true) {
            return;
        }
        let wakeup = self.compute_wakeup();
        self.state.timer.get().program(self.output_id, Some(wakeup));
    }

    fn maybe_schedule_repaint(&self) {
        if self.removed.get() {
            self.repaint_delayed.set(false);
            return;
        }
        if self.repaint_delayed.replace(false) {
            self.schedule_repaint();
        }
    }

    fn compute_wakeup(&self) -> Time {
        let now = self.state.clock.now().nsec();
        let vblank = self.vblank_interval();
        let last = self.last_present_nsec.get();
        let next_present = if last == 0 || now <= last {
            now
        } else {
            last + align(now - last, vblank)
        };
        self.next_present_nsec.set(next_present);
        let budget = self.render_budget(vblank);
        let wakeup = now.max(next_present.saturating_sub(budget + SAFETY_MARGIN_NSEC));
        Time::from_nsec(wakeup)
    }

    fn vblank_interval(&self) -> u64 {
        match self.refresh_nsec.get() {
            0 => NOMINAL_REFRESH_NSEC,
            n => n,
        }
    }

    fn render_budget(&self, vblank: u64) -> u64 {
        let fraction = (self.latency_policy.get().factor() * vblank as f64)
            .to_u64()
            .unwrap_or(0);
        let estimated = self.journal.borrow().estimate(self.estimator.get());
        fraction.max(estimated)
    }

    /// Brackets the start of a paint pass.
    pub fn begin_frame(&self) {
        self.timer_armed.set(false);
        self.pending_frames.fetch_add(1);
        self.frame_start.set(Some(self.state.clock.now()));
    }

    /// Brackets the end of a paint pass and feeds the render-time journal.
    pub fn end_frame(&self) {
        if let Some(start) = self.frame_start.replace(None) {
            let duration = self.state.clock.now() - start;
            self.journal.borrow_mut().add(duration);
        }
    }

    /// Unwinds `begin_frame` when the frame died before a present was
    /// submitted, so the pending counter does not leak.
    pub fn cancel_frame(&self) {
        self.frame_start.set(None);
        if self.pending_frames.get() == 0 {
            log::error!(
                "Output {}: cancel_frame without a pending frame",
                self.output_id,
            );
        } else {
            self.pending_frames.fetch_sub(1);
        }
        self.maybe_schedule_repaint();
    }

    /// Called by the backend once the real presentation time of a submitted
    /// frame is known. A timestamp that moves backwards is a backend error;
    /// the clock is resynchronized instead of accepted.
    pub fn notify_frame_completed(&self, time: Time) {
        if self.pending_frames.get() == 0 {
            log::warn!(
                "Output {}: frame completion without a pending frame",
                self.output_id,
            );
        } else {
            self.pending_frames.fetch_sub(1);
        }
        let nsec = time.nsec();
        if nsec < self.last_present_nsec.get() {
            log::warn!(
                "Output {}: presentation time moved backwards, resynchronizing",
                self.output_id,
            );
            self.last_present_nsec.set(self.state.clock.now().nsec());
        } else {
            self.last_present_nsec.set(nsec);
        }
        if let Some(listener) = self.listener.get() {
            listener.presented(self.output_id, self.last_presentation());
        }
        self.maybe_schedule_repaint();
    }

    /// Marks the output as removed. Any deferred repaint request is dropped
    /// and the wakeup timer disarmed.
    pub fn set_removed(&self) {
        self.removed.set(true);
        self.repaint_delayed.set(false);
        if self.timer_armed.replace(false) {
            self.state.timer.get().program(self.output_id, None);
        }
    }
}

/// Rounds `n` up to the next multiple of `m`.
fn align(n: u64, m: u64) -> u64 {
    n.div_ceil(m) * m
}

fn refresh_to_interval(millihz: u32) -> Option<u64> {
    if millihz == 0 {
        return None;
    }
    (1_000_000_000_000f64 / millihz as f64)
        .to_u64()
        .filter(|n| *n > 0)
}

#[derive(Default)]
struct RenderJournal {
    samples: VecDeque<Duration>,
}

impl RenderJournal {
    fn add(&mut self, sample: Duration) {
        if self.samples.len() == JOURNAL_LENGTH {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    fn estimate(&self, estimator: RenderTimeEstimator) -> u64 {
        let nsec = |d: &Duration| d.as_nanos() as u64;
        match estimator {
            RenderTimeEstimator::Minimum => self.samples.iter().map(nsec).min().unwrap_or(0),
            RenderTimeEstimator::Maximum => self.samples.iter().map(nsec).max().unwrap_or(0),
            RenderTimeEstimator::Average => {
                if self.samples.is_empty() {
                    0
                } else {
                    self.samples.iter().map(nsec).sum::<u64>() / self.samples.len() as u64
                }
            }
        }
    }
}
