use {
    crate::{
        backend::{BackendError, Mode, OutputId, PresentationBackend, WakeupTimer},
        effect::WindowPaintData,
        rect::{Rect, Region, RegionBuilder},
        state::{OutputData, State},
        time::{Clock, Time},
        tree::{NodeId, PaintNode, SceneGraph},
    },
    std::{
        cell::{Cell, RefCell},
        rc::Rc,
    },
};

pub struct TestClock {
    now: Cell<u64>,
}

impl TestClock {
    pub fn set(&self, nsec: u64) {
        self.now.set(nsec);
    }

    pub fn advance(&self, nsec: u64) {
        self.now.set(self.now.get() + nsec);
    }

    pub fn get(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Time {
        Time::from_nsec(self.now.get())
    }
}

#[derive(Default)]
pub struct TestTimer {
    programmed: RefCell<Vec<(OutputId, Option<Time>)>>,
}

impl TestTimer {
    pub fn last(&self) -> Option<(OutputId, Option<Time>)> {
        self.programmed.borrow().last().cloned()
    }

    pub fn programmed(&self) -> Vec<(OutputId, Option<Time>)> {
        self.programmed.borrow().clone()
    }

    pub fn clear(&self) {
        self.programmed.borrow_mut().clear();
    }
}

impl WakeupTimer for TestTimer {
    fn program(&self, output: OutputId, expiration: Option<Time>) {
        self.programmed.borrow_mut().push((output, expiration));
    }
}

#[derive(Default)]
pub struct TestBackend {
    pub age: Cell<usize>,
    pub fail_begin: Cell<bool>,
    pub fail_end: Cell<bool>,
    pub frames: RefCell<Vec<(Rc<Region>, Rc<Region>)>>,
}

impl TestBackend {
    pub fn last_frame(&self) -> Option<(Rc<Region>, Rc<Region>)> {
        self.frames.borrow().last().cloned()
    }
}

impl PresentationBackend for TestBackend {
    fn begin_frame(&self, _output: &Rc<OutputData>) -> Result<usize, BackendError> {
        if self.fail_begin.get() {
            return Err(BackendError::AllocateRenderTarget);
        }
        Ok(self.age.get())
    }

    fn end_frame(
        &self,
        output: &Rc<OutputData>,
        rendered: &Rc<Region>,
        damaged: &Rc<Region>,
    ) -> Result<(), BackendError> {
        if self.fail_end.get() {
            return Err(BackendError::Present);
        }
        output.damage_history.add(damaged);
        self.frames
            .borrow_mut()
            .push((rendered.clone(), damaged.clone()));
        Ok(())
    }
}

pub struct TestNode {
    pub id: NodeId,
    pub rect: Cell<Rect>,
    pub visible: Cell<bool>,
    pub opaque: Cell<bool>,
    pub damage: RefCell<RegionBuilder>,
    pub painted: RefCell<Vec<Rc<Region>>>,
}

impl TestNode {
    pub fn new(id: u32, rect: Rect, opaque: bool) -> Rc<Self> {
        Rc::new(Self {
            id: NodeId(id),
            rect: Cell::new(rect),
            visible: Cell::new(true),
            opaque: Cell::new(opaque),
            damage: Default::default(),
            painted: Default::default(),
        })
    }

    pub fn add_damage(&self, rect: Rect) {
        self.damage.borrow_mut().add(rect);
    }

    pub fn last_painted(&self) -> Option<Rc<Region>> {
        self.painted.borrow().last().cloned()
    }

    pub fn paint_count(&self) -> usize {
        self.painted.borrow().len()
    }
}

impl PaintNode for TestNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn bounding_rect(&self) -> Rect {
        self.rect.get()
    }

    fn visible(&self) -> bool {
        self.visible.get()
    }

    fn opaque_region(&self) -> Rc<Region> {
        match self.opaque.get() {
            true => Region::new(self.rect.get()),
            false => Region::empty(),
        }
    }

    fn is_opaque(&self) -> bool {
        self.opaque.get()
    }

    fn take_damage(&self) -> Rc<Region> {
        let damage = &mut *self.damage.borrow_mut();
        let region = damage.get();
        damage.clear();
        region
    }

    fn render(&self, _output: &Rc<OutputData>, region: &Rc<Region>, _data: &WindowPaintData) {
        self.painted.borrow_mut().push(region.clone());
    }
}

#[derive(Default)]
pub struct TestGraph {
    pub nodes: RefCell<Vec<Rc<TestNode>>>,
    pub overlays: RefCell<Vec<Rc<TestNode>>>,
    pub background: RefCell<Vec<Rc<Region>>>,
}

impl SceneGraph for TestGraph {
    fn sorted_stacking_order(&self, _output: OutputId) -> Vec<Rc<dyn PaintNode>> {
        self.nodes
            .borrow()
            .iter()
            .map(|n| n.clone() as Rc<dyn PaintNode>)
            .collect()
    }

    fn render_background(&self, _output: &Rc<OutputData>, region: &Rc<Region>) {
        self.background.borrow_mut().push(region.clone());
    }

    fn overlay_order(&self, _output: OutputId) -> Vec<Rc<dyn PaintNode>> {
        self.overlays
            .borrow()
            .iter()
            .map(|n| n.clone() as Rc<dyn PaintNode>)
            .collect()
    }
}

pub struct TestSetup {
    pub state: Rc<State>,
    pub clock: Rc<TestClock>,
    pub timer: Rc<TestTimer>,
    pub backend: Rc<TestBackend>,
    pub graph: Rc<TestGraph>,
}

impl TestSetup {
    pub fn new() -> Self {
        let clock = Rc::new(TestClock {
            now: Cell::new(1_000_000),
        });
        let timer = Rc::new(TestTimer::default());
        let backend = Rc::new(TestBackend::default());
        let graph = Rc::new(TestGraph::default());
        let state = State::new(clock.clone(), backend.clone(), timer.clone(), graph.clone());
        Self {
            state,
            clock,
            timer,
            backend,
            graph,
        }
    }
}

pub fn mode(width: i32, height: i32, refresh_rate_millihz: u32) -> Mode {
    Mode {
        width,
        height,
        refresh_rate_millihz,
    }
}

pub fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Rect {
    Rect::new(x1, y1, x2, y2).unwrap()
}

pub fn region(x1: i32, y1: i32, x2: i32, y2: i32) -> Rc<Region> {
    Region::new(rect(x1, y1, x2, y2))
}
