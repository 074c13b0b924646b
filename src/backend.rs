use {
    crate::{rect::Region, state::OutputData, time::Time},
    std::rc::Rc,
    thiserror::Error,
};

linear_ids!(OutputIds, OutputId);

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Mode {
    pub width: i32,
    pub height: i32,
    pub refresh_rate_millihz: u32,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("The backend could not allocate a render target")]
    AllocateRenderTarget,
    #[error("The backend could not submit the frame for presentation")]
    Present,
    #[error("The backend lost access to the graphics device")]
    DeviceLost,
}

/// The presentation side of an output.
///
/// Implementations turn the regions computed by the paint pipeline into
/// actual buffer swaps and report presentation timing back to the render
/// loop.
pub trait PresentationBackend {
    /// Prepares the next frame and returns the age of the back buffer: the
    /// number of damage-history entries that must be replayed to bring its
    /// content up to date. 0 means the content is unknown and the entire
    /// output will be repainted.
    fn begin_frame(&self, output: &Rc<OutputData>) -> Result<usize, BackendError>;

    /// Submits the frame. `rendered` is everything that was painted,
    /// `damaged` the part whose content actually changed.
    ///
    /// On success the implementation must record `damaged` in the output's
    /// damage history, in submission order. If `damaged` is empty but
    /// `rendered` is not, the swap may be skipped, but the next
    /// `begin_frame` must then report an age of 1.
    ///
    /// Once the frame has been presented, the implementation must call
    /// `notify_frame_completed` on the output's render loop with the real
    /// presentation time. Completions must arrive in submission order but
    /// may arrive after the next frame has already started.
    fn end_frame(
        &self,
        output: &Rc<OutputData>,
        rendered: &Rc<Region>,
        damaged: &Rc<Region>,
    ) -> Result<(), BackendError>;
}

/// Arms the wakeup timers that drive the render loops.
///
/// The embedding event loop must call `Compositor::dispatch` with the
/// output id when a programmed timer expires. Programming `None` disarms
/// the timer.
pub trait WakeupTimer {
    fn program(&self, output: OutputId, expiration: Option<Time>);
}
