use {
    crate::rect::{Rect, Region, RegionBuilder},
    veery_algorithms::rect::RectRaw,
};

#[test]
fn union1() {
    let r1 = Region::new(Rect::new(0, 0, 10, 10).unwrap());
    let r2_ = Region::new(Rect::new(5, 5, 15, 15).unwrap());
    let r2 = Region::new(Rect::new(10, 10, 20, 20).unwrap());
    let r3 = r1.union(&r2);
    let r3 = r3.union(&r2_);
    assert_eq!(r3.extents, Rect::new(0, 0, 20, 20).unwrap());
    assert_eq!(
        &r3.rects[..],
        &[
            Rect::new(0, 0, 10, 5).unwrap().raw,
            Rect::new(0, 5, 15, 10).unwrap().raw,
            Rect::new(5, 10, 20, 15).unwrap().raw,
            Rect::new(10, 15, 20, 20).unwrap().raw,
        ]
    );
}

#[test]
fn union2() {
    let r1 = Region::new(Rect::new(0, 0, 10, 10).unwrap());
    let r2 = Region::new(Rect::new(0, 10, 10, 20).unwrap());
    let r3 = r1.union(&r2);
    assert_eq!(r3.extents, Rect::new(0, 0, 10, 20).unwrap());
    assert_eq!(&r3.rects[..], &[Rect::new(0, 0, 10, 20).unwrap().raw,]);
}

#[test]
fn subtract1() {
    let r1 = Region::new(Rect::new(0, 0, 20, 20).unwrap());
    let r2 = Region::new(Rect::new(5, 5, 15, 15).unwrap());
    let r3 = r1.subtract(&r2);
    assert_eq!(r3.extents, Rect::new(0, 0, 20, 20).unwrap());
    assert_eq!(
        &r3.rects[..],
        &[
            RectRaw {
                x1: 0,
                y1: 0,
                x2: 20,
                y2: 5,
            },
            RectRaw {
                x1: 0,
                y1: 5,
                x2: 5,
                y2: 15,
            },
            RectRaw {
                x1: 15,
                y1: 5,
                x2: 20,
                y2: 15,
            },
            RectRaw {
                x1: 0,
                y1: 15,
                x2: 20,
                y2: 20,
            },
        ]
    );
}

#[test]
fn subtract2() {
    let r1 = Region::new(Rect::new(0, 0, 20, 20).unwrap());
    let r2 = Region::new(Rect::new(0, 0, 20, 20).unwrap());
    let r3 = r1.subtract(&r2);
    assert!(r3.is_empty());
    assert_eq!(&r3.rects[..], &[]);
}

#[test]
fn subtract_disjoint() {
    let r1 = Region::new(Rect::new(0, 0, 10, 10).unwrap());
    let r2 = Region::new(Rect::new(20, 20, 30, 30).unwrap());
    let r3 = r1.subtract(&r2);
    assert_eq!(&r3.rects[..], &r1.rects[..]);
}

#[test]
fn intersect1() {
    let r1 = Region::new(Rect::new(0, 0, 10, 10).unwrap());
    let r2 = Region::new(Rect::new(5, 5, 15, 15).unwrap());
    let r3 = r1.intersect(&r2);
    assert_eq!(&r3.rects[..], &[Rect::new(5, 5, 10, 10).unwrap().raw,]);
}

#[test]
fn intersect2() {
    let l_shape = Region::from_rects(&[
        Rect::new(0, 0, 10, 30).unwrap(),
        Rect::new(10, 20, 30, 30).unwrap(),
    ]);
    let r2 = Region::new(Rect::new(5, 5, 25, 25).unwrap());
    let r3 = l_shape.intersect(&r2);
    assert_eq!(
        &r3.rects[..],
        &[
            Rect::new(5, 5, 10, 20).unwrap().raw,
            Rect::new(5, 20, 25, 25).unwrap().raw,
        ]
    );
}

#[test]
fn intersect_disjoint() {
    let r1 = Region::new(Rect::new(0, 0, 10, 10).unwrap());
    let r2 = Region::new(Rect::new(10, 0, 20, 10).unwrap());
    let r3 = r1.intersect(&r2);
    assert!(r3.is_empty());
}

#[test]
fn rects_to_bands() {
    let rects = [
        Rect::new(0, 0, 10, 10).unwrap(),
        Rect::new(5, 0, 30, 10).unwrap(),
        Rect::new(30, 5, 50, 15).unwrap(),
    ];
    let r = Region::from_rects(&rects[..]);
    assert_eq!(
        &r.rects[..],
        &[
            RectRaw {
                x1: 0,
                y1: 0,
                x2: 30,
                y2: 5,
            },
            RectRaw {
                x1: 0,
                y1: 5,
                x2: 50,
                y2: 10,
            },
            RectRaw {
                x1: 30,
                y1: 10,
                x2: 50,
                y2: 15,
            },
        ]
    );
}

#[test]
fn rects_to_bands2() {
    let rects = [
        Rect::new(0, 0, 10, 10).unwrap(),
        Rect::new(0, 10, 10, 20).unwrap(),
    ];
    let r = Region::from_rects(&rects[..]);
    assert_eq!(&r.rects[..], &[Rect::new(0, 0, 10, 20).unwrap().raw,]);
}

#[test]
fn region_equality() {
    let a = Region::from_rects(&[
        Rect::new(0, 0, 10, 10).unwrap(),
        Rect::new(10, 0, 20, 10).unwrap(),
    ]);
    let b = Region::new(Rect::new(0, 0, 20, 10).unwrap());
    assert_eq!(&*a, &*b);
}

#[test]
fn empty_region() {
    let r = Region::new(Rect::new_empty(5, 5));
    assert!(r.is_empty());
    let full = Region::new(Rect::new(0, 0, 10, 10).unwrap());
    assert_eq!(&*full.union(&r), &*full);
    assert!(full.intersect(&r).is_empty());
}

#[test]
fn builder() {
    let mut builder = RegionBuilder::default();
    builder.add(Rect::new(0, 0, 20, 20).unwrap());
    builder.add(Rect::new(10, 0, 30, 20).unwrap());
    builder.sub(Rect::new(0, 0, 5, 20).unwrap());
    let r = builder.get();
    assert_eq!(&r.rects[..], &[Rect::new(5, 0, 30, 20).unwrap().raw,]);
    builder.clear();
    assert!(builder.get().is_empty());
}

#[test]
fn contains() {
    let r = Region::from_rects(&[
        Rect::new(0, 0, 10, 10).unwrap(),
        Rect::new(20, 20, 30, 30).unwrap(),
    ]);
    assert!(r.contains(5, 5));
    assert!(r.contains(20, 29));
    assert!(!r.contains(15, 15));
    assert!(!r.contains(10, 5));
}
