//! Property tests: after any full render or diff the surface mirrors the
//! shadow tree, and unchanged trees cost nothing.

use proptest::prelude::*;
use proptest::sample::Index;
use remote_ui_protocol::{Rect, RenderingDom, RenderingDomContent, RenderingDomDiff};
use remote_ui_web::images::ImageStore;
use remote_ui_web::registry::ElementRegistry;
use remote_ui_web::shadow::ShadowTree;
use remote_ui_web::surface::SurfaceOp;
use remote_ui_web::{Projector, RecordingSurface};

/// Parent choice for nodes 1..n; node 0 is the root
fn shape_strategy(max: usize) -> impl Strategy<Value = Vec<Index>> {
    (1..max).prop_flat_map(|n| proptest::collection::vec(any::<Index>(), n - 1))
}

fn build(parents: &[Index], offset: i64) -> RenderingDom {
    fn node(i: usize, children: &[Vec<usize>], offset: i64) -> RenderingDom {
        let at = i64::try_from(i).unwrap();
        let bounds = Rect::new(at, at, at + 10, at + 10);
        RenderingDom {
            id: at + offset,
            content: Some(RenderingDomContent {
                bounds,
                valid_area: bounds,
                ..RenderingDomContent::default()
            }),
            children: Some(
                children[i]
                    .iter()
                    .map(|&c| Box::new(node(c, children, offset)))
                    .collect(),
            ),
        }
    }

    let mut children = vec![Vec::new(); parents.len() + 1];
    for (i, parent) in parents.iter().enumerate() {
        children[parent.index(i + 1)].push(i + 1);
    }
    node(0, &children, offset)
}

fn check_mirror(tree: &ShadowTree, surface: &RecordingSurface) -> Result<(), TestCaseError> {
    prop_assert_eq!(surface.len(), tree.len());
    for (id, parent, index) in tree.preorder() {
        prop_assert_eq!(surface.children(parent).get(index), Some(&id));
        prop_assert_eq!(surface.primitive(id).map(|p| p.parent), Some(parent));
    }
    Ok(())
}

proptest! {
    #[test]
    fn surface_follows_successive_renders(
        first in shape_strategy(24),
        second in shape_strategy(24),
        offset in 0i64..12,
    ) {
        let (elements, images) = (ElementRegistry::new(), ImageStore::default());
        let mut tree = ShadowTree::new();
        let mut projector = Projector::new(RecordingSurface::new());

        tree.replace(Some(&build(&first, 0))).unwrap();
        projector.project(&tree, &elements, &images);
        check_mirror(&tree, projector.surface())?;

        tree.replace(Some(&build(&second, offset))).unwrap();
        projector.project(&tree, &elements, &images);
        check_mirror(&tree, projector.surface())?;
    }

    #[test]
    fn unchanged_tree_issues_no_calls(shape in shape_strategy(24)) {
        let (elements, images) = (ElementRegistry::new(), ImageStore::default());
        let mut tree = ShadowTree::new();
        let mut projector = Projector::new(RecordingSurface::with_log());
        tree.replace(Some(&build(&shape, 0))).unwrap();
        projector.project(&tree, &elements, &images);
        projector.surface_mut().take_ops();

        let stats = projector.project(&tree, &elements, &images);
        prop_assert_eq!(stats.changes(), 0);
        prop_assert!(projector.surface().ops().is_empty());
    }

    #[test]
    fn reordering_children_keeps_primitives(shape in shape_strategy(24)) {
        let (elements, images) = (ElementRegistry::new(), ImageStore::default());
        let mut tree = ShadowTree::new();
        let mut projector = Projector::new(RecordingSurface::with_log());
        tree.replace(Some(&build(&shape, 0))).unwrap();
        projector.project(&tree, &elements, &images);
        projector.surface_mut().take_ops();

        let root = tree.root_id().unwrap();
        let mut reversed = tree.get(root).unwrap().children.clone();
        reversed.reverse();
        tree.apply_batch(&[RenderingDomDiff::modified(root, None, Some(reversed))]).unwrap();
        projector.project(&tree, &elements, &images);

        prop_assert!(!projector
            .surface()
            .ops()
            .iter()
            .any(|op| matches!(op, SurfaceOp::Create(_) | SurfaceOp::Remove(_))));
        check_mirror(&tree, projector.surface())?;
    }
}
