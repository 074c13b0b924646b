use {
    crate::{
        backend::OutputId,
        effect::WindowPaintData,
        rect::{Rect, Region},
        state::OutputData,
    },
    std::rc::Rc,
};

linear_ids!(NodeIds, NodeId);

/// One paintable node of the scene graph. How its pixels are produced is
/// not this crate's concern; `render` is invoked with the final clip
/// region during the paint phase.
///
/// All coordinates are output-local device pixels.
pub trait PaintNode {
    fn id(&self) -> NodeId;

    fn bounding_rect(&self) -> Rect;

    fn visible(&self) -> bool;

    /// The region this node is guaranteed to cover with fully opaque
    /// content. Occlusion culling trusts this blindly.
    fn opaque_region(&self) -> Rc<Region> {
        Region::empty()
    }

    fn is_opaque(&self) -> bool {
        false
    }

    /// Returns the damage accumulated since the last paint and clears it.
    fn take_damage(&self) -> Rc<Region> {
        Region::empty()
    }

    fn render(&self, output: &Rc<OutputData>, region: &Rc<Region>, data: &WindowPaintData);
}

/// The live scene graph consumed by the paint pipeline.
pub trait SceneGraph {
    /// The paintable nodes on `output` in back-to-front order.
    fn sorted_stacking_order(&self, output: OutputId) -> Vec<Rc<dyn PaintNode>>;

    fn render_background(&self, output: &Rc<OutputData>, region: &Rc<Region>) {
        let _ = output;
        let _ = region;
    }

    /// Nodes composited above the scene, such as cursors and drag icons.
    fn overlay_order(&self, output: OutputId) -> Vec<Rc<dyn PaintNode>> {
        let _ = output;
        Vec::new()
    }
}
