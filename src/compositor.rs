use {
    crate::{
        backend::{OutputId, PresentationBackend},
        rect::Region,
        scene::Scene,
        state::{OutputData, State},
        utils::errorfmt::ErrorFmt,
    },
    std::rc::Rc,
};

/// Drives one frame per wakeup: buffer-age accumulation, the three paint
/// phases, and the backend submission, keeping the render loop consistent
/// on every error path.
pub struct Compositor {
    state: Rc<State>,
    scene: Rc<Scene>,
}

impl Compositor {
    pub fn new(state: &Rc<State>) -> Rc<Self> {
        Rc::new(Self {
            state: state.clone(),
            scene: Scene::new(state),
        })
    }

    pub fn scene(&self) -> &Rc<Scene> {
        &self.scene
    }

    /// Entry point for the event loop when the wakeup timer of `output`
    /// expires. Unknown outputs are ignored; they have been removed while
    /// the timer was in flight.
    pub fn dispatch(&self, output: OutputId) {
        if let Some(output) = self.state.outputs.get(&output) {
            self.composite(&output);
        }
    }

    pub fn composite(&self, output: &Rc<OutputData>) {
        let rl = &output.render_loop;
        if rl.inhibited() {
            rl.schedule_repaint();
            return;
        }
        rl.begin_frame();
        let backend = self.state.backend.get();
        let age = match backend.begin_frame(output) {
            Ok(age) => age,
            Err(e) => {
                log::error!(
                    "Output {}: could not begin a frame: {}",
                    output.id,
                    ErrorFmt(e),
                );
                rl.cancel_frame();
                return;
            }
        };
        let full = Region::new(output.device_rect());
        let buffer_damage = output.damage_history.accumulate(age, &full);
        self.scene.pre_paint(output, &buffer_damage);
        let res = self.scene.paint(output);
        if let Err(e) = backend.end_frame(output, &res.painted, &res.damaged) {
            log::error!(
                "Output {}: could not submit the frame: {}",
                output.id,
                ErrorFmt(e),
            );
            self.scene.post_paint(output);
            rl.cancel_frame();
            return;
        }
        self.scene.post_paint(output);
        rl.end_frame();
    }
}
