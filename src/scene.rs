use {
    crate::{
        effect::{
            EffectChain, PAINT_SCREEN_BACKGROUND_FIRST, PAINT_SCREEN_REGION,
            PAINT_SCREEN_TRANSFORMED, PAINT_SCREEN_WITH_TRANSFORMED_WINDOWS, PAINT_WINDOW_OPAQUE,
            PAINT_WINDOW_TRANSFORMED, PAINT_WINDOW_TRANSLUCENT, ScreenPaintData,
            ScreenPrePaintData, WindowPaintData, WindowPrePaintData,
        },
        rect::Region,
        state::{OutputData, State},
        tree::{PaintNode, SceneGraph},
        utils::bitflags::BitflagsExt,
    },
    std::{cell::RefCell, rc::Rc},
};

/// One node of the stacking order for the current frame. `region` is the
/// area the node still repaints after occlusion culling, `opaque` the area
/// it occludes from nodes below it.
pub struct StackingItem {
    pub node: Rc<dyn PaintNode>,
    pub region: Rc<Region>,
    pub opaque: Rc<Region>,
    pub mask: u32,
}

struct FrameState {
    mask: u32,
    /// Everything that gets repainted this frame, including buffer repairs.
    region: Rc<Region>,
    /// The part painted only to bring an aged buffer up to date. Excluded
    /// from the damage submitted to the history, so buffer repairs do not
    /// snowball into perpetual full repaints.
    repaint_clip: Rc<Region>,
    background: Rc<Region>,
    output_region: Rc<Region>,
    full_repaint: bool,
    painted: Rc<Region>,
    damaged: Rc<Region>,
    paint_screen_count: u32,
}

pub struct PaintResult {
    pub painted: Rc<Region>,
    pub damaged: Rc<Region>,
}

impl Default for PaintResult {
    fn default() -> Self {
        Self {
            painted: Region::empty(),
            damaged: Region::empty(),
        }
    }
}

/// The three-phase paint pipeline. One instance drives all outputs; the
/// per-frame state lives only between `pre_paint` and `post_paint` of a
/// single output.
pub struct Scene {
    state: Rc<State>,
    stacking: RefCell<Vec<StackingItem>>,
    frame: RefCell<Option<FrameState>>,
}

impl Scene {
    pub fn new(state: &Rc<State>) -> Rc<Self> {
        Rc::new(Self {
            state: state.clone(),
            stacking: RefCell::new(Vec::new()),
            frame: RefCell::new(None),
        })
    }

    /// Builds the stacking order, runs the pre-paint hooks and computes the
    /// repaint region for this frame. `buffer_damage` is the accumulated
    /// damage the backend needs replayed onto its back buffer.
    pub fn pre_paint(&self, output: &Rc<OutputData>, buffer_damage: &Rc<Region>) {
        let effects = &self.state.effects;
        effects.start_paint();
        let active = effects.active_effects();
        let chain = EffectChain {
            effects: &active,
            pos: 0,
            scene: self,
            output,
        };
        let graph = self.state.graph.get();
        let output_region = Region::new(output.device_rect());

        let mut damage = output.take_pending_damage();
        if effects.requires_full_repaint() {
            damage = output_region.clone();
        }

        let mut data = ScreenPrePaintData {
            mask: match *damage == *output_region {
                true => 0,
                false => PAINT_SCREEN_REGION,
            },
            region: damage,
        };
        chain.pre_paint_screen(&mut data);
        let mut mask = data.mask;
        let mut damage = data.region;

        let transformed =
            mask.intersects(PAINT_SCREEN_TRANSFORMED | PAINT_SCREEN_WITH_TRANSFORMED_WINDOWS);
        if transformed {
            // Screen damage does not match transformed positions, so region
            // painting is not possible.
            mask &= !PAINT_SCREEN_REGION;
            damage = output_region.clone();
        } else if mask.contains(PAINT_SCREEN_REGION) {
            damage = damage.intersect(&output_region);
        } else {
            damage = output_region.clone();
        }

        let stacking = &mut *self.stacking.borrow_mut();
        stacking.clear();
        let mut dirty = damage.clone();
        for node in graph.sorted_stacking_order(output.id) {
            if !node.visible() {
                continue;
            }
            let node_damage = node.take_damage();
            let mut wdata = WindowPrePaintData {
                mask: mask
                    | match node.is_opaque() {
                        true => PAINT_WINDOW_OPAQUE,
                        false => PAINT_WINDOW_TRANSLUCENT,
                    },
                paint: match transformed {
                    true => output_region.clone(),
                    false => damage.union(&node_damage),
                },
                opaque: match transformed {
                    true => Region::empty(),
                    false => node.opaque_region(),
                },
            };
            chain.pre_paint_window(&node, &mut wdata);
            dirty = dirty.union(&wdata.paint);
            stacking.push(StackingItem {
                node,
                region: wdata.paint,
                opaque: wdata.opaque,
                mask: wdata.mask,
            });
        }

        if transformed {
            for item in stacking.iter_mut() {
                item.region = output_region.clone();
            }
            *self.frame.borrow_mut() = Some(FrameState {
                mask,
                region: output_region.clone(),
                repaint_clip: Region::empty(),
                background: output_region.clone(),
                output_region,
                full_repaint: true,
                painted: Region::empty(),
                damaged: Region::empty(),
                paint_screen_count: 0,
            });
            return;
        }

        let dirty = dirty.intersect(&output_region);
        let repaint = buffer_damage.intersect(&output_region);
        // The part of the buffer repair that no current damage covers is
        // rendered but did not change content-wise.
        let repaint_clip = repaint.subtract(&dirty);
        let dirty = dirty.union(&repaint);
        let full_repaint = *dirty == *output_region;

        // The occlusion culling pass, top to bottom.
        let mut allclips = Region::empty();
        let mut upper_translucent = repaint;
        for item in stacking.iter_mut().rev() {
            if full_repaint {
                item.region = output_region.clone();
            } else {
                item.region = item.region.union(&upper_translucent);
            }
            // parts drawn by an opaque node higher in the stack
            item.region = item.region.subtract(&allclips);
            let opaque_trusted = item.opaque.is_not_empty()
                && !item
                    .mask
                    .intersects(PAINT_WINDOW_TRANSLUCENT | PAINT_WINDOW_TRANSFORMED);
            if opaque_trusted {
                allclips = allclips.union(&item.opaque);
                if !full_repaint {
                    upper_translucent = upper_translucent.union(&item.region.subtract(&item.opaque));
                }
            } else if !full_repaint {
                upper_translucent = upper_translucent.union(&item.region);
            }
        }

        let background = dirty.subtract(&allclips);
        *self.frame.borrow_mut() = Some(FrameState {
            mask,
            region: dirty,
            repaint_clip,
            background,
            output_region,
            full_repaint,
            painted: Region::empty(),
            damaged: Region::empty(),
            paint_screen_count: 0,
        });
    }

    /// Paints the frame prepared by `pre_paint` through the effect chain and
    /// returns the painted region and the content damage to submit.
    pub fn paint(&self, output: &Rc<OutputData>) -> PaintResult {
        let active = self.state.effects.active_effects();
        let (mask, region) = match &*self.frame.borrow() {
            Some(frame) => (frame.mask, frame.region.clone()),
            _ => {
                log::error!(
                    "Output {}: paint called without a pre-painted frame",
                    output.id,
                );
                return PaintResult::default();
            }
        };
        let chain = EffectChain {
            effects: &active,
            pos: 0,
            scene: self,
            output,
        };
        let mut data = ScreenPaintData { mask, region };
        chain.paint_screen(&mut data);
        match &*self.frame.borrow() {
            Some(frame) => PaintResult {
                painted: frame.painted.clone(),
                damaged: frame.damaged.clone(),
            },
            _ => PaintResult::default(),
        }
    }

    /// Runs the post-paint hooks and clears the per-frame state. Effects
    /// schedule their follow-up repaints from here.
    pub fn post_paint(&self, output: &Rc<OutputData>) {
        let active = self.state.effects.active_effects();
        let chain = EffectChain {
            effects: &active,
            pos: 0,
            scene: self,
            output,
        };
        {
            let stacking = self.stacking.borrow();
            for item in stacking.iter() {
                chain.post_paint_window(&item.node);
            }
        }
        chain.post_paint_screen();
        self.stacking.borrow_mut().clear();
        self.frame.borrow_mut().take();
        self.state.effects.finish_paint();
    }

    pub(crate) fn final_paint_screen(
        &self,
        chain: EffectChain<'_>,
        output: &Rc<OutputData>,
        data: &mut ScreenPaintData,
    ) {
        let graph = self.state.graph.get();
        let state = {
            let mut frame = self.frame.borrow_mut();
            match &mut *frame {
                Some(frame) => {
                    frame.paint_screen_count += 1;
                    Some((
                        frame.paint_screen_count == 1,
                        frame.full_repaint,
                        frame.background.clone(),
                        frame.output_region.clone(),
                        frame.repaint_clip.clone(),
                    ))
                }
                _ => None,
            }
        };
        let Some((first_pass, full_repaint, background, output_region, repaint_clip)) = state
        else {
            return;
        };

        let mut painted = Region::empty();
        if data
            .mask
            .intersects(PAINT_SCREEN_TRANSFORMED | PAINT_SCREEN_WITH_TRANSFORMED_WINDOWS)
        {
            graph.render_background(output, &output_region);
            let stacking = self.stacking.borrow();
            for item in stacking.iter() {
                let mut wdata = WindowPaintData {
                    mask: item.mask,
                    region: output_region.clone(),
                    opacity: 1.0,
                };
                chain.paint_window(&item.node, &mut wdata);
            }
            painted = output_region.clone();
        } else {
            if data.mask.contains(PAINT_SCREEN_BACKGROUND_FIRST) {
                if first_pass {
                    graph.render_background(output, &output_region);
                }
            } else {
                painted = background;
                graph.render_background(output, &painted);
            }
            let stacking = self.stacking.borrow();
            for item in stacking.iter() {
                painted = painted.union(&item.region);
                let mut wdata = WindowPaintData {
                    mask: item.mask,
                    region: painted.clone(),
                    opacity: 1.0,
                };
                chain.paint_window(&item.node, &mut wdata);
            }
        }
        for node in graph.overlay_order(output.id) {
            if !node.visible() {
                continue;
            }
            let mut wdata = WindowPaintData {
                mask: PAINT_WINDOW_TRANSLUCENT,
                region: painted.clone(),
                opacity: 1.0,
            };
            chain.paint_window(&node, &mut wdata);
        }
        let mut frame = self.frame.borrow_mut();
        if let Some(frame) = &mut *frame {
            if full_repaint {
                frame.painted = output_region.clone();
                frame.damaged = output_region.subtract(&repaint_clip);
            } else {
                // Effects may have painted outside the output; the backend
                // only cares about the part on screen.
                frame.painted = frame.painted.union(&painted).intersect(&output_region);
                frame.damaged = painted.subtract(&repaint_clip).intersect(&output_region);
            }
        }
    }

    pub(crate) fn final_paint_window(
        &self,
        chain: EffectChain<'_>,
        node: &Rc<dyn PaintNode>,
        data: &mut WindowPaintData,
    ) {
        chain.draw_window(node, data);
    }

    pub(crate) fn final_draw_window(
        &self,
        output: &Rc<OutputData>,
        node: &Rc<dyn PaintNode>,
        data: &WindowPaintData,
    ) {
        if data.region.is_empty() {
            return;
        }
        let region = data.region.clone();
        node.render(output, &region, data);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            effect::{DEFAULT_EFFECT_PRIORITY, Effect, EffectChain},
            test_utils::{TestNode, TestSetup, mode, rect, region},
        },
    };

    fn scene_setup() -> (TestSetup, Rc<OutputData>, Rc<Scene>) {
        let setup = TestSetup::new();
        let output = setup.state.add_output(mode(100, 100, 60_000));
        output.take_pending_damage();
        let scene = Scene::new(&setup.state);
        (setup, output, scene)
    }

    fn run_frame(
        scene: &Scene,
        output: &Rc<OutputData>,
        buffer_damage: &Rc<Region>,
    ) -> PaintResult {
        scene.pre_paint(output, buffer_damage);
        let res = scene.paint(output);
        scene.post_paint(output);
        res
    }

    #[test]
    fn occlusion_culls_lower_nodes() {
        let (setup, output, scene) = scene_setup();
        let bottom = TestNode::new(1, rect(0, 0, 100, 100), false);
        let top = TestNode::new(2, rect(20, 20, 80, 80), true);
        setup
            .graph
            .nodes
            .borrow_mut()
            .extend([bottom.clone(), top.clone()]);
        output.add_damage(rect(0, 0, 60, 100));
        let res = run_frame(&scene, &output, &Region::empty());
        let damage = region(0, 0, 60, 100);
        let culled = damage.subtract(&region(20, 20, 80, 80));
        assert_eq!(&*bottom.last_painted().unwrap(), &*culled);
        assert_eq!(&*top.last_painted().unwrap(), &*damage);
        assert_eq!(&*res.painted, &*damage);
        assert_eq!(&*res.damaged, &*damage);
    }

    #[test]
    fn translucent_windows_do_not_occlude() {
        let (setup, output, scene) = scene_setup();
        let bottom = TestNode::new(1, rect(0, 0, 100, 100), false);
        let top = TestNode::new(2, rect(20, 20, 80, 80), false);
        setup
            .graph
            .nodes
            .borrow_mut()
            .extend([bottom.clone(), top.clone()]);
        output.add_damage(rect(0, 0, 60, 100));
        run_frame(&scene, &output, &Region::empty());
        assert_eq!(&*bottom.last_painted().unwrap(), &*region(0, 0, 60, 100));
    }

    #[test]
    fn translucent_mask_overrides_opaque_region() {
        struct Translucify;
        impl Effect for Translucify {
            fn pre_paint_window(
                &self,
                chain: EffectChain<'_>,
                node: &Rc<dyn PaintNode>,
                data: &mut WindowPrePaintData,
            ) {
                data.mask = (data.mask & !PAINT_WINDOW_OPAQUE) | PAINT_WINDOW_TRANSLUCENT;
                chain.pre_paint_window(node, data);
            }
        }
        let (setup, output, scene) = scene_setup();
        let bottom = TestNode::new(1, rect(0, 0, 100, 100), false);
        let top = TestNode::new(2, rect(20, 20, 80, 80), true);
        setup
            .graph
            .nodes
            .borrow_mut()
            .extend([bottom.clone(), top.clone()]);
        setup
            .state
            .effects
            .load("translucify", DEFAULT_EFFECT_PRIORITY, Rc::new(Translucify));
        output.add_damage(rect(0, 0, 60, 100));
        run_frame(&scene, &output, &Region::empty());
        // the opaque region is still reported but must not be trusted
        assert_eq!(&*bottom.last_painted().unwrap(), &*region(0, 0, 60, 100));
    }

    #[test]
    fn transformed_screen_disables_culling() {
        struct Transform;
        impl Effect for Transform {
            fn pre_paint_screen(&self, chain: EffectChain<'_>, data: &mut ScreenPrePaintData) {
                data.mask |= PAINT_SCREEN_TRANSFORMED;
                chain.pre_paint_screen(data);
            }
        }
        let (setup, output, scene) = scene_setup();
        let bottom = TestNode::new(1, rect(0, 0, 100, 100), false);
        let top = TestNode::new(2, rect(20, 20, 80, 80), true);
        setup
            .graph
            .nodes
            .borrow_mut()
            .extend([bottom.clone(), top.clone()]);
        setup
            .state
            .effects
            .load("transform", DEFAULT_EFFECT_PRIORITY, Rc::new(Transform));
        output.add_damage(rect(0, 0, 10, 10));
        let res = run_frame(&scene, &output, &Region::empty());
        let full = region(0, 0, 100, 100);
        assert_eq!(&*bottom.last_painted().unwrap(), &*full);
        assert_eq!(&*top.last_painted().unwrap(), &*full);
        assert_eq!(&*res.painted, &*full);
        assert_eq!(&*res.damaged, &*full);
    }

    #[test]
    fn full_repaint_capability_flag() {
        struct Magnifier;
        impl Effect for Magnifier {
            fn requires_full_repaint(&self) -> bool {
                true
            }
        }
        let (setup, output, scene) = scene_setup();
        let node = TestNode::new(1, rect(0, 0, 100, 100), false);
        setup.graph.nodes.borrow_mut().push(node.clone());
        setup
            .state
            .effects
            .load("magnifier", DEFAULT_EFFECT_PRIORITY, Rc::new(Magnifier));
        output.add_damage(rect(0, 0, 10, 10));
        let res = run_frame(&scene, &output, &Region::empty());
        assert_eq!(&*res.painted, &*region(0, 0, 100, 100));
    }

    #[test]
    fn effects_can_widen_window_damage() {
        struct Widen;
        impl Effect for Widen {
            fn pre_paint_window(
                &self,
                chain: EffectChain<'_>,
                node: &Rc<dyn PaintNode>,
                data: &mut WindowPrePaintData,
            ) {
                data.paint = data.paint.union(&region(40, 40, 70, 70));
                chain.pre_paint_window(node, data);
            }
        }
        let (setup, output, scene) = scene_setup();
        let node = TestNode::new(1, rect(0, 0, 100, 100), false);
        setup.graph.nodes.borrow_mut().push(node.clone());
        setup
            .state
            .effects
            .load("widen", DEFAULT_EFFECT_PRIORITY, Rc::new(Widen));
        output.add_damage(rect(0, 0, 20, 20));
        let res = run_frame(&scene, &output, &Region::empty());
        let expected = region(0, 0, 20, 20).union(&region(40, 40, 70, 70));
        assert_eq!(&*node.last_painted().unwrap(), &*expected);
        assert_eq!(&*res.damaged, &*expected);
    }

    #[test]
    fn buffer_repairs_are_not_reported_as_damage() {
        let (setup, output, scene) = scene_setup();
        let node = TestNode::new(1, rect(0, 0, 100, 100), false);
        setup.graph.nodes.borrow_mut().push(node.clone());
        output.add_damage(rect(0, 0, 30, 30));
        let repair = region(50, 50, 90, 90);
        let res = run_frame(&scene, &output, &repair);
        let expected = region(0, 0, 30, 30).union(&repair);
        assert_eq!(&*node.last_painted().unwrap(), &*expected);
        assert_eq!(&*res.painted, &*expected);
        assert_eq!(&*res.damaged, &*region(0, 0, 30, 30));
    }

    #[test]
    fn overlays_and_background_are_painted() {
        let (setup, output, scene) = scene_setup();
        let node = TestNode::new(1, rect(0, 0, 100, 100), false);
        let cursor = TestNode::new(2, rect(10, 10, 20, 20), false);
        setup.graph.nodes.borrow_mut().push(node.clone());
        setup.graph.overlays.borrow_mut().push(cursor.clone());
        output.add_damage(rect(0, 0, 50, 50));
        run_frame(&scene, &output, &Region::empty());
        assert_eq!(&*cursor.last_painted().unwrap(), &*region(0, 0, 50, 50));
        assert_eq!(
            &*setup.graph.background.borrow().last().unwrap().clone(),
            &*region(0, 0, 50, 50),
        );
    }

    #[test]
    fn invisible_nodes_are_skipped() {
        let (setup, output, scene) = scene_setup();
        let node = TestNode::new(1, rect(0, 0, 100, 100), false);
        node.visible.set(false);
        setup.graph.nodes.borrow_mut().push(node.clone());
        output.add_damage_full();
        run_frame(&scene, &output, &Region::empty());
        assert_eq!(node.paint_count(), 0);
    }

    #[test]
    fn frame_state_is_cleared_after_post_paint() {
        let (setup, output, scene) = scene_setup();
        let node = TestNode::new(1, rect(0, 0, 100, 100), false);
        setup.graph.nodes.borrow_mut().push(node.clone());
        output.add_damage_full();
        run_frame(&scene, &output, &Region::empty());
        assert!(scene.stacking.borrow().is_empty());
        assert!(scene.frame.borrow().is_none());
    }
}
