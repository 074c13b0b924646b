use {
    crate::{rect::Region, scene::Scene, state::OutputData, tree::PaintNode},
    std::{
        cell::{Cell, RefCell},
        mem,
        rc::Rc,
    },
};

pub const PAINT_WINDOW_OPAQUE: u32 = 1 << 0;
pub const PAINT_WINDOW_TRANSLUCENT: u32 = 1 << 1;
pub const PAINT_WINDOW_TRANSFORMED: u32 = 1 << 2;
pub const PAINT_SCREEN_REGION: u32 = 1 << 3;
pub const PAINT_SCREEN_TRANSFORMED: u32 = 1 << 4;
pub const PAINT_SCREEN_WITH_TRANSFORMED_WINDOWS: u32 = 1 << 5;
pub const PAINT_SCREEN_BACKGROUND_FIRST: u32 = 1 << 6;

pub const DEFAULT_EFFECT_PRIORITY: i32 = 50;

pub struct ScreenPrePaintData {
    pub mask: u32,
    pub region: Rc<Region>,
}

pub struct ScreenPaintData {
    pub mask: u32,
    pub region: Rc<Region>,
}

pub struct WindowPrePaintData {
    pub mask: u32,
    /// The region the window will be painted with. Effects may grow it.
    pub paint: Rc<Region>,
    /// The region the window is guaranteed to cover opaquely. Overstating
    /// it breaks occlusion culling below this window.
    pub opaque: Rc<Region>,
}

pub struct WindowPaintData {
    pub mask: u32,
    pub region: Rc<Region>,
    pub opacity: f64,
}

/// A pluggable paint hook.
///
/// Every hook receives the continuation of the chain and must invoke it to
/// keep the effects behind it working, unless it intends to suppress the
/// stage entirely. Not forwarding is an authoring error and is not detected
/// at runtime.
pub trait Effect {
    fn pre_paint_screen(&self, chain: EffectChain<'_>, data: &mut ScreenPrePaintData) {
        chain.pre_paint_screen(data);
    }

    fn paint_screen(&self, chain: EffectChain<'_>, data: &mut ScreenPaintData) {
        chain.paint_screen(data);
    }

    fn post_paint_screen(&self, chain: EffectChain<'_>) {
        chain.post_paint_screen();
    }

    fn pre_paint_window(
        &self,
        chain: EffectChain<'_>,
        node: &Rc<dyn PaintNode>,
        data: &mut WindowPrePaintData,
    ) {
        chain.pre_paint_window(node, data);
    }

    fn paint_window(
        &self,
        chain: EffectChain<'_>,
        node: &Rc<dyn PaintNode>,
        data: &mut WindowPaintData,
    ) {
        chain.paint_window(node, data);
    }

    fn draw_window(
        &self,
        chain: EffectChain<'_>,
        node: &Rc<dyn PaintNode>,
        data: &mut WindowPaintData,
    ) {
        chain.draw_window(node, data);
    }

    fn post_paint_window(&self, chain: EffectChain<'_>, node: &Rc<dyn PaintNode>) {
        chain.post_paint_window(node);
    }

    /// While any loaded effect returns true, occlusion culling is skipped
    /// and every frame repaints the entire output.
    fn requires_full_repaint(&self) -> bool {
        false
    }
}

/// The continuation of the effect chain for one hook invocation.
///
/// The cursor is copied at every dispatch, so re-entrant walks (an
/// overridden `paint_window` calling back into `draw_window`, or an effect
/// painting the screen a second time via `restart`) cannot corrupt the
/// position of an outer walk.
#[derive(Copy, Clone)]
pub struct EffectChain<'a> {
    pub(crate) effects: &'a [Rc<dyn Effect>],
    pub(crate) pos: usize,
    pub(crate) scene: &'a Scene,
    pub(crate) output: &'a Rc<OutputData>,
}

impl<'a> EffectChain<'a> {
    fn split(&self) -> Option<(&'a Rc<dyn Effect>, EffectChain<'a>)> {
        let effect = self.effects.get(self.pos)?;
        let mut next = *self;
        next.pos += 1;
        Some((effect, next))
    }

    /// A chain re-entering at the first effect.
    pub fn restart(&self) -> EffectChain<'a> {
        let mut chain = *self;
        chain.pos = 0;
        chain
    }

    pub fn pre_paint_screen(self, data: &mut ScreenPrePaintData) {
        if let Some((effect, next)) = self.split() {
            effect.pre_paint_screen(next, data);
        }
    }

    pub fn paint_screen(self, data: &mut ScreenPaintData) {
        match self.split() {
            Some((effect, next)) => effect.paint_screen(next, data),
            _ => self.scene.final_paint_screen(self.restart(), self.output, data),
        }
    }

    pub fn post_paint_screen(self) {
        if let Some((effect, next)) = self.split() {
            effect.post_paint_screen(next);
        }
    }

    pub fn pre_paint_window(self, node: &Rc<dyn PaintNode>, data: &mut WindowPrePaintData) {
        if let Some((effect, next)) = self.split() {
            effect.pre_paint_window(next, node, data);
        }
    }

    pub fn paint_window(self, node: &Rc<dyn PaintNode>, data: &mut WindowPaintData) {
        match self.split() {
            Some((effect, next)) => effect.paint_window(next, node, data),
            _ => self.scene.final_paint_window(self.restart(), node, data),
        }
    }

    pub fn draw_window(self, node: &Rc<dyn PaintNode>, data: &mut WindowPaintData) {
        match self.split() {
            Some((effect, next)) => effect.draw_window(next, node, data),
            _ => self.scene.final_draw_window(self.output, node, data),
        }
    }

    pub fn post_paint_window(self, node: &Rc<dyn PaintNode>) {
        if let Some((effect, next)) = self.split() {
            effect.post_paint_window(next, node);
        }
    }
}

struct LoadedEffect {
    name: String,
    priority: i32,
    effect: Rc<dyn Effect>,
}

/// The ordered set of loaded effects.
///
/// The registry is mutated only between frames; each frame dispatches
/// through a snapshot taken at its start. Unloading during a frame is
/// deferred until the frame finishes.
#[derive(Default)]
pub struct EffectsHandler {
    registered: RefCell<Vec<LoadedEffect>>,
    active: RefCell<Vec<Rc<dyn Effect>>>,
    in_frame: Cell<bool>,
    pending_unloads: RefCell<Vec<String>>,
}

impl EffectsHandler {
    /// Lower priorities run closer to the raw scene. Effects with equal
    /// priority keep their load order.
    pub fn load(&self, name: &str, priority: i32, effect: Rc<dyn Effect>) {
        let registered = &mut *self.registered.borrow_mut();
        if registered.iter().any(|e| e.name == name) {
            log::warn!("Effect {} is already loaded", name);
            return;
        }
        registered.push(LoadedEffect {
            name: name.to_string(),
            priority,
            effect,
        });
        registered.sort_by_key(|e| e.priority);
    }

    pub fn unload(&self, name: &str) {
        if self.in_frame.get() {
            self.pending_unloads.borrow_mut().push(name.to_string());
            return;
        }
        self.unload_(name);
    }

    fn unload_(&self, name: &str) {
        let registered = &mut *self.registered.borrow_mut();
        let len = registered.len();
        registered.retain(|e| e.name != name);
        if registered.len() == len {
            log::warn!("Effect {} is not loaded", name);
        }
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.registered.borrow().iter().any(|e| e.name == name)
    }

    pub fn requires_full_repaint(&self) -> bool {
        self.registered
            .borrow()
            .iter()
            .any(|e| e.effect.requires_full_repaint())
    }

    pub(crate) fn start_paint(&self) {
        let active = &mut *self.active.borrow_mut();
        active.clear();
        active.extend(self.registered.borrow().iter().map(|e| e.effect.clone()));
        self.in_frame.set(true);
    }

    pub(crate) fn finish_paint(&self) {
        self.in_frame.set(false);
        self.active.borrow_mut().clear();
        let pending = mem::take(&mut *self.pending_unloads.borrow_mut());
        for name in pending {
            self.unload_(&name);
        }
    }

    pub(crate) fn active_effects(&self) -> Vec<Rc<dyn Effect>> {
        self.active.borrow().clone()
    }
}
