use {
    crate::{
        backend::{Mode, OutputId, OutputIds, PresentationBackend, WakeupTimer},
        damage::DamageHistory,
        effect::EffectsHandler,
        rect::{Rect, Region, RegionBuilder},
        render_loop::RenderLoop,
        time::Clock,
        tree::SceneGraph,
        utils::{clonecell::CloneCell, copyhashmap::CopyHashMap},
    },
    std::{
        cell::{Cell, RefCell},
        rc::Rc,
    },
};

const DAMAGE_HISTORY_LENGTH: usize = 10;

/// The shared state of the compositing core. Constructed once at startup
/// and threaded through every component.
pub struct State {
    pub clock: Rc<dyn Clock>,
    pub backend: CloneCell<Rc<dyn PresentationBackend>>,
    pub timer: CloneCell<Rc<dyn WakeupTimer>>,
    pub graph: CloneCell<Rc<dyn SceneGraph>>,
    pub effects: Rc<EffectsHandler>,
    pub output_ids: OutputIds,
    pub outputs: CopyHashMap<OutputId, Rc<OutputData>>,
}

impl State {
    pub fn new(
        clock: Rc<dyn Clock>,
        backend: Rc<dyn PresentationBackend>,
        timer: Rc<dyn WakeupTimer>,
        graph: Rc<dyn SceneGraph>,
    ) -> Rc<Self> {
        Rc::new(Self {
            clock,
            backend: CloneCell::new(backend),
            timer: CloneCell::new(timer),
            graph: CloneCell::new(graph),
            effects: Rc::new(EffectsHandler::default()),
            output_ids: Default::default(),
            outputs: Default::default(),
        })
    }

    pub fn add_output(self: &Rc<Self>, mode: Mode) -> Rc<OutputData> {
        let id = self.output_ids.next();
        let output = Rc::new(OutputData {
            id,
            state: self.clone(),
            mode: Cell::new(mode),
            scale: Cell::new(1.0),
            pending_damage: RefCell::new(RegionBuilder::default()),
            damage_history: DamageHistory::new(DAMAGE_HISTORY_LENGTH),
            render_loop: RenderLoop::new(self, id),
        });
        output.render_loop.set_mode(mode);
        self.outputs.set(id, output.clone());
        output.add_damage_full();
        output
    }

    pub fn remove_output(&self, id: OutputId) {
        if let Some(output) = self.outputs.remove(&id) {
            output.render_loop.set_removed();
        }
    }
}

/// One display sink with its own frame scheduler and damage history.
pub struct OutputData {
    pub id: OutputId,
    pub state: Rc<State>,
    pub mode: Cell<Mode>,
    pub scale: Cell<f64>,
    pub pending_damage: RefCell<RegionBuilder>,
    pub damage_history: DamageHistory,
    pub render_loop: Rc<RenderLoop>,
}

impl OutputData {
    /// The output extents in device pixels.
    pub fn device_rect(&self) -> Rect {
        let mode = self.mode.get();
        Rect::new_sized(0, 0, mode.width, mode.height).unwrap_or_default()
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.set(mode);
        self.render_loop.set_mode(mode);
        // The buffer contents recorded so far describe the old mode.
        self.damage_history.clear();
        self.add_damage_full();
    }

    /// Requests that `rect` be repainted with the next frame.
    pub fn add_damage(&self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.pending_damage.borrow_mut().add(rect);
        self.render_loop.schedule_repaint();
    }

    pub fn add_damage_full(&self) {
        self.add_damage(self.device_rect());
    }

    pub fn take_pending_damage(&self) -> Rc<Region> {
        let pending = &mut *self.pending_damage.borrow_mut();
        let region = pending.get();
        pending.clear();
        region
    }
}
